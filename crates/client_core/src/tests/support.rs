//! Hand-written fakes for the service traits, shared by the unit tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use shared::{
    domain::{ArtistId, AuthOutcome, ReleaseId, ReleasePage, ReleaseRecord},
    error::{ApiError, ErrorCode},
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    analytics::{AnalyticsSink, EventAttributes},
    ArtworkService, AuthService, ClientError, ReleaseQuery, ReleaseService,
};

pub fn record(id: &str) -> ReleaseRecord {
    ReleaseRecord {
        id: ReleaseId::new(id),
        artist_id: ArtistId::new(format!("artist-{id}")),
        artist_name: format!("Artist {id}"),
        title: format!("Release {id}"),
        thumbnail_url: format!("https://img.example/{id}.jpg"),
        release_date: None,
        listened: false,
    }
}

pub fn catalog(prefix: &str, count: usize) -> Vec<ReleaseRecord> {
    (0..count).map(|i| record(&format!("{prefix}-{i}"))).collect()
}

pub fn page(current_page: u32, total_pages: u32, items: Vec<ReleaseRecord>) -> ReleasePage {
    ReleasePage {
        current_page,
        total_pages,
        items,
    }
}

pub fn api_failure(message: &str) -> ClientError {
    ClientError::Api(ApiError::new(ErrorCode::Internal, message))
}

#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<(String, Option<EventAttributes>)>>,
}

impl RecordingAnalytics {
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("analytics lock")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<(String, Option<EventAttributes>)> {
        self.events.lock().expect("analytics lock").clone()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn log_event(&self, name: &str, attributes: Option<&EventAttributes>) {
        self.events
            .lock()
            .expect("analytics lock")
            .push((name.to_string(), attributes.cloned()));
    }
}

/// Serves a fixed catalog, slicing pages from the query offset.
pub struct CatalogReleaseService {
    catalog: Vec<ReleaseRecord>,
    queries: Mutex<Vec<ReleaseQuery>>,
    toggle_succeeds: AtomicBool,
    toggle_calls: AtomicUsize,
}

impl CatalogReleaseService {
    pub fn new(catalog: Vec<ReleaseRecord>) -> Self {
        Self {
            catalog,
            queries: Mutex::new(Vec::new()),
            toggle_succeeds: AtomicBool::new(true),
            toggle_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_toggle_succeeds(&self, succeeds: bool) {
        self.toggle_succeeds.store(succeeds, Ordering::SeqCst);
    }

    pub fn queries(&self) -> Vec<ReleaseQuery> {
        self.queries.lock().expect("queries lock").clone()
    }

    pub fn toggle_calls(&self) -> usize {
        self.toggle_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseService for CatalogReleaseService {
    async fn fetch_releases(&self, query: &ReleaseQuery) -> Result<ReleasePage, ClientError> {
        self.queries.lock().expect("queries lock").push(*query);
        let size = query.page_size as usize;
        let total_pages = self.catalog.len().div_ceil(size) as u32;
        let items = self
            .catalog
            .iter()
            .skip(query.offset)
            .take(size)
            .cloned()
            .collect();
        Ok(page(query.page, total_pages, items))
    }

    async fn toggle_listen_status(&self, _release_id: &ReleaseId) -> Result<bool, ClientError> {
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);
        if self.toggle_succeeds.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(api_failure("toggle rejected"))
        }
    }
}

pub struct PendingFetch {
    pub query: ReleaseQuery,
    pub respond: oneshot::Sender<Result<ReleasePage, ClientError>>,
}

/// Hands every fetch to the test, which decides when and how it completes.
pub struct GatedReleaseService {
    requests: mpsc::UnboundedSender<PendingFetch>,
}

impl GatedReleaseService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingFetch>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (Self { requests }, rx)
    }
}

#[async_trait]
impl ReleaseService for GatedReleaseService {
    async fn fetch_releases(&self, query: &ReleaseQuery) -> Result<ReleasePage, ClientError> {
        let (respond, rx) = oneshot::channel();
        let _ = self.requests.send(PendingFetch {
            query: *query,
            respond,
        });
        rx.await
            .unwrap_or_else(|_| Err(api_failure("test dropped pending fetch")))
    }

    async fn toggle_listen_status(&self, _release_id: &ReleaseId) -> Result<bool, ClientError> {
        Ok(true)
    }
}

pub struct PendingToggle {
    pub release_id: ReleaseId,
    pub respond: oneshot::Sender<Result<bool, ClientError>>,
}

/// Keeps a live catalog. A toggle flips the stored flag at once, then waits
/// for the test to release the response.
pub struct HeldToggleService {
    catalog: Mutex<Vec<ReleaseRecord>>,
    toggles: mpsc::UnboundedSender<PendingToggle>,
}

impl HeldToggleService {
    pub fn new(catalog: Vec<ReleaseRecord>) -> (Self, mpsc::UnboundedReceiver<PendingToggle>) {
        let (toggles, rx) = mpsc::unbounded_channel();
        let service = Self {
            catalog: Mutex::new(catalog),
            toggles,
        };
        (service, rx)
    }

    pub fn listened(&self, release_id: &ReleaseId) -> Option<bool> {
        self.catalog
            .lock()
            .expect("catalog lock")
            .iter()
            .find(|record| &record.id == release_id)
            .map(|record| record.listened)
    }
}

#[async_trait]
impl ReleaseService for HeldToggleService {
    async fn fetch_releases(&self, query: &ReleaseQuery) -> Result<ReleasePage, ClientError> {
        let catalog = self.catalog.lock().expect("catalog lock").clone();
        let items = catalog
            .into_iter()
            .skip(query.offset)
            .take(query.page_size as usize)
            .collect();
        Ok(page(query.page, 1, items))
    }

    async fn toggle_listen_status(&self, release_id: &ReleaseId) -> Result<bool, ClientError> {
        if let Some(record) = self
            .catalog
            .lock()
            .expect("catalog lock")
            .iter_mut()
            .find(|record| &record.id == release_id)
        {
            record.listened = !record.listened;
        }
        let (respond, rx) = oneshot::channel();
        let _ = self.toggles.send(PendingToggle {
            release_id: release_id.clone(),
            respond,
        });
        rx.await
            .unwrap_or_else(|_| Err(api_failure("test dropped pending toggle")))
    }
}

pub struct FakeAuthService {
    outcome: AuthOutcome,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeAuthService {
    pub fn succeeding() -> Self {
        Self::with_outcome(AuthOutcome::Success)
    }

    pub fn failing(message: &str) -> Self {
        Self::with_outcome(AuthOutcome::Failure(message.to_string()))
    }

    fn with_outcome(outcome: AuthOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(operation, username, password)` per call.
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, operation: &str, username: &str, password: &str) -> AuthOutcome {
        self.calls.lock().expect("calls lock").push((
            operation.to_string(),
            username.to_string(),
            password.to_string(),
        ));
        self.outcome.clone()
    }
}

#[async_trait]
impl AuthService for FakeAuthService {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, ClientError> {
        Ok(self.record("authenticate", username, password))
    }

    async fn register(&self, username: &str, password: &str) -> Result<AuthOutcome, ClientError> {
        Ok(self.record("register", username, password))
    }
}

#[derive(Default)]
pub struct FakeArtworkService {
    fetches: AtomicUsize,
}

impl FakeArtworkService {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtworkService for FakeArtworkService {
    async fn fetch_art_urls(&self) -> Result<Vec<String>, ClientError> {
        Ok((0..30).map(|i| format!("https://img.example/art-{i}.jpg")).collect())
    }

    async fn fetch_artwork(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if url.contains("broken") {
            return Err(api_failure("missing artwork"));
        }
        Ok(url.as_bytes().to_vec())
    }
}
