use async_trait::async_trait;
use shared::domain::{AuthOutcome, ReleaseFilter, ReleaseId, ReleasePage};

pub mod analytics;
pub mod artwork;
pub mod auth_prompt;
pub mod carousel;
pub mod error;
pub mod http;
pub mod releases;
pub mod session;
pub mod settings;

pub use analytics::{AnalyticsSink, NoopAnalytics, TracingAnalytics};
pub use artwork::ArtworkCache;
pub use auth_prompt::{AuthPromptController, Panel, SignupValidationError};
pub use carousel::{Carousel, CarouselGeometry, CarouselOffsets, CarouselTicker, ScrollTrack};
pub use error::ClientError;
pub use http::HttpTrackerClient;
pub use releases::{
    ReleaseListController, ReleaseListEvent, ReleaseListHandle, ReleaseListSnapshot,
    ReleaseListState,
};
pub use session::{FileSessionStore, MemorySessionStore, SessionEvent, SessionState};
pub use settings::{load_settings, ClientSettings};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Parameters of one release list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseQuery {
    pub filter: ReleaseFilter,
    pub page: u32,
    pub page_size: u32,
    pub offset: usize,
}

impl ReleaseQuery {
    pub fn first_page(filter: ReleaseFilter) -> Self {
        Self::first_page_with_size(filter, DEFAULT_PAGE_SIZE)
    }

    pub fn first_page_with_size(filter: ReleaseFilter, page_size: u32) -> Self {
        Self {
            filter,
            page: 1,
            page_size,
            offset: 0,
        }
    }
}

#[async_trait]
pub trait ReleaseService: Send + Sync {
    async fn fetch_releases(&self, query: &ReleaseQuery) -> Result<ReleasePage, ClientError>;
    /// Flips the remote listened status; `Ok(false)` means the server declined.
    async fn toggle_listen_status(&self, release_id: &ReleaseId) -> Result<bool, ClientError>;
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str)
        -> Result<AuthOutcome, ClientError>;
    async fn register(&self, username: &str, password: &str) -> Result<AuthOutcome, ClientError>;
}

#[async_trait]
pub trait ArtworkService: Send + Sync {
    /// Artwork urls for the log in prompt's carousels.
    async fn fetch_art_urls(&self) -> Result<Vec<String>, ClientError>;
    async fn fetch_artwork(&self, url: &str) -> Result<Vec<u8>, ClientError>;
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
