use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(ReleaseId);
id_newtype!(ArtistId);

/// Whether a release list is restricted to followed artists or global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    All,
    Mine,
}

impl Scope {
    /// Index the release endpoint expects in its `view` parameter.
    pub fn wire_index(self) -> u8 {
        match self {
            Scope::All => 0,
            Scope::Mine => 1,
        }
    }
}

/// Category dimension of the release list (the segmented control).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slide {
    Unheard,
    Released,
    Upcoming,
    Fresh,
}

impl Slide {
    pub fn wire_index(self) -> u8 {
        match self {
            Slide::Unheard => 0,
            Slide::Released => 1,
            Slide::Upcoming => 2,
            Slide::Fresh => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseFilter {
    pub scope: Scope,
    pub slide: Slide,
}

impl ReleaseFilter {
    pub fn new(scope: Scope, slide: Slide) -> Self {
        Self { scope, slide }
    }

    /// Analytics event name for a screen showing this filter.
    ///
    /// Fresh releases only exist for followed artists, so `(All, Fresh)` has no
    /// name of its own and reports as `"Error"`.
    pub fn view_name(self) -> &'static str {
        match (self.scope, self.slide) {
            (Scope::All, Slide::Unheard) => "All Unlistened",
            (Scope::All, Slide::Released) => "All Released",
            (Scope::All, Slide::Upcoming) => "All Upcoming",
            (Scope::All, Slide::Fresh) => "Error",
            (Scope::Mine, Slide::Unheard) => "Your Unlistened",
            (Scope::Mine, Slide::Released) => "Your Released",
            (Scope::Mine, Slide::Upcoming) => "Your Upcoming",
            (Scope::Mine, Slide::Fresh) => "Your Fresh",
        }
    }
}

impl Default for ReleaseFilter {
    fn default() -> Self {
        Self::new(Scope::Mine, Slide::Unheard)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub id: ReleaseId,
    pub artist_id: ArtistId,
    pub artist_name: String,
    #[serde(default)]
    pub title: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub listened: bool,
}

/// One page of releases as returned by the release endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReleasePage {
    pub current_page: u32,
    pub total_pages: u32,
    pub items: Vec<ReleaseRecord>,
}

impl ReleasePage {
    /// Zero total pages is the server's "nothing to show" answer, not a failure.
    pub fn is_empty_result(&self) -> bool {
        self.total_pages == 0
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRef {
    pub artist_id: ArtistId,
    pub artist_name: String,
}

impl From<&ReleaseRecord> for ArtistRef {
    fn from(record: &ReleaseRecord) -> Self {
        Self {
            artist_id: record.artist_id.clone(),
            artist_name: record.artist_name.clone(),
        }
    }
}

/// Result of a log in or registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    /// User-facing message from the auth service, shown verbatim.
    Failure(String),
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success)
    }
}
