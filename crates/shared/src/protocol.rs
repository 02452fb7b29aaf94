use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{AuthOutcome, ReleaseFilter, ReleasePage, ReleaseRecord};

/// Marker the auth endpoints use in `result` for a successful attempt.
pub const AUTH_SUCCESS_MARKER: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseListQuery {
    pub view: u8,
    pub slide: u8,
    pub page: u32,
    pub limit: u32,
    pub offset: usize,
}

impl ReleaseListQuery {
    pub fn new(filter: ReleaseFilter, page: u32, limit: u32, offset: usize) -> Self {
        Self {
            view: filter.scope.wire_index(),
            slide: filter.slide.wire_index(),
            page,
            limit,
            offset,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseListResponse {
    #[serde(deserialize_with = "number_or_string")]
    pub current_page: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub total_pages: u32,
    #[serde(default)]
    pub results: Vec<ReleaseRecord>,
}

impl From<ReleaseListResponse> for ReleasePage {
    fn from(value: ReleaseListResponse) -> Self {
        Self {
            current_page: value.current_page,
            total_pages: value.total_pages,
            items: value.results,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenToggleResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub result: String,
}

impl From<AuthResponse> for AuthOutcome {
    fn from(value: AuthResponse) -> Self {
        if value.result == AUTH_SUCCESS_MARKER {
            AuthOutcome::Success
        } else {
            AuthOutcome::Failure(value.result)
        }
    }
}

/// Page counters have been served both as JSON numbers and as numeric strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
