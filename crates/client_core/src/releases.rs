//! Paged release list: a synchronous reducer ([`ReleaseListState`]) and the
//! actor task that owns it ([`ReleaseListController`]).
//!
//! Every fetch the reducer issues carries a [`FetchTicket`]. A completion is
//! only applied when its ticket is still the one in flight, so results that
//! arrive after a filter switch, refresh or session change are discarded.

use std::sync::Arc;

use shared::domain::{
    ArtistRef, ReleaseFilter, ReleaseId, ReleasePage, ReleaseRecord, Scope, Slide,
};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, oneshot,
};
use tracing::{debug, info, warn};

use crate::{
    analytics::{single_attribute, AnalyticsSink},
    session::{SessionEvent, SessionState},
    ClientError, ReleaseQuery, ReleaseService, DEFAULT_PAGE_SIZE,
};

pub const DEFAULT_PREFETCH_ROWS: usize = 20;
const RELEASE_EVENT_CAPACITY: usize = 256;

const EMPTY_FRESH_MESSAGE: &str = "After you've followed some artists, any releases (upcoming or past) added to the system will show up here.\n\nCheck back later.";
const EMPTY_UPCOMING_MESSAGE: &str = "Any upcoming releases will appear here.";
const EMPTY_DEFAULT_MESSAGE: &str =
    "No results.\n\nHave you followed some artists?\n\nPull to refresh when you have.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    FirstPage,
    NextPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub kind: FetchKind,
    pub query: ReleaseQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    Idle,
    Fetching,
    FetchingMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub current_page: u32,
    pub total_pages: u32,
}

impl Paging {
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FailedFetch {
    kind: FetchKind,
    message: String,
}

/// Swipe action label for a release row.
pub fn listen_action_title(record: &ReleaseRecord) -> &'static str {
    if record.listened {
        "Didn't Listen"
    } else {
        "Listened"
    }
}

fn empty_state_message(slide: Slide) -> &'static str {
    match slide {
        Slide::Fresh => EMPTY_FRESH_MESSAGE,
        Slide::Upcoming => EMPTY_UPCOMING_MESSAGE,
        Slide::Unheard | Slide::Released => EMPTY_DEFAULT_MESSAGE,
    }
}

#[derive(Debug)]
pub struct ReleaseListState {
    page_size: u32,
    prefetch_rows: usize,
    filter: ReleaseFilter,
    items: Vec<ReleaseRecord>,
    paging: Option<Paging>,
    in_flight: Option<FetchTicket>,
    selected: Option<ReleaseId>,
    last_artist: Option<ArtistRef>,
    failed: Option<FailedFetch>,
    generation: u64,
}

impl Default for ReleaseListState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_PREFETCH_ROWS)
    }
}

impl ReleaseListState {
    pub fn new(page_size: u32, prefetch_rows: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            prefetch_rows,
            filter: ReleaseFilter::default(),
            items: Vec::new(),
            paging: None,
            in_flight: None,
            selected: None,
            last_artist: None,
            failed: None,
            generation: 0,
        }
    }

    pub fn filter(&self) -> ReleaseFilter {
        self.filter
    }

    pub fn items(&self) -> &[ReleaseRecord] {
        &self.items
    }

    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    pub fn selected(&self) -> Option<&ReleaseId> {
        self.selected.as_ref()
    }

    pub fn is_fetch_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Bumped whenever loaded rows are dropped or page 1 is re-issued.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> Option<&FetchTicket> {
        self.in_flight.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.failed.as_ref().map(|failed| failed.message.as_str())
    }

    pub fn phase(&self) -> ListPhase {
        match self.in_flight.as_ref().map(|ticket| ticket.kind) {
            None => ListPhase::Idle,
            Some(FetchKind::FirstPage) => ListPhase::Fetching,
            Some(FetchKind::NextPage) => ListPhase::FetchingMore,
        }
    }

    pub fn record(&self, release_id: &ReleaseId) -> Option<&ReleaseRecord> {
        self.items.iter().find(|record| &record.id == release_id)
    }

    /// Message for the "nothing here" header, once the server reported zero pages.
    pub fn empty_state_message(&self) -> Option<&'static str> {
        match self.paging {
            Some(paging) if paging.total_pages == 0 && self.in_flight.is_none() => {
                Some(empty_state_message(self.filter.slide))
            }
            _ => None,
        }
    }

    /// Drops loaded rows and forgets any in-flight fetch.
    pub fn reset(&mut self) {
        self.items.clear();
        self.selected = None;
        self.paging = None;
        self.in_flight = None;
        self.failed = None;
        self.generation += 1;
    }

    pub fn select_filter(
        &mut self,
        filter: ReleaseFilter,
        logged_in: bool,
    ) -> Option<FetchTicket> {
        self.filter = filter;
        self.reset();
        self.load_first_page(logged_in)
    }

    /// Issues page 1 for the current filter. Without a session nothing is
    /// fetched and the list stays empty.
    pub fn load_first_page(&mut self, logged_in: bool) -> Option<FetchTicket> {
        if !logged_in {
            return None;
        }
        self.generation += 1;
        let ticket = FetchTicket {
            generation: self.generation,
            kind: FetchKind::FirstPage,
            query: ReleaseQuery::first_page_with_size(self.filter, self.page_size),
        };
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    pub fn load_next_page(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        let paging = self.paging.filter(Paging::has_more)?;
        let ticket = FetchTicket {
            generation: self.generation,
            kind: FetchKind::NextPage,
            query: ReleaseQuery {
                filter: self.filter,
                page: paging.current_page + 1,
                page_size: self.page_size,
                offset: self.items.len(),
            },
        };
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Prefetch trigger for a row becoming visible within the trailing window.
    pub fn row_visible(&mut self, index: usize) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        if index < self.items.len().saturating_sub(self.prefetch_rows) {
            return None;
        }
        self.load_next_page()
    }

    pub fn retry(&mut self, logged_in: bool) -> Option<FetchTicket> {
        let kind = self.failed.as_ref()?.kind;
        if self.in_flight.is_some() {
            return None;
        }
        match kind {
            FetchKind::FirstPage => self.load_first_page(logged_in),
            FetchKind::NextPage => self.load_next_page(),
        }
    }

    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<ReleasePage, String>,
    ) -> Completion {
        if self.in_flight != Some(ticket) {
            return Completion::Discarded;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                match ticket.kind {
                    FetchKind::FirstPage => self.items = page.items,
                    FetchKind::NextPage => self.items.extend(page.items),
                }
                self.paging = Some(Paging {
                    current_page: page.current_page,
                    total_pages: page.total_pages,
                });
                self.failed = None;
            }
            Err(message) => {
                self.failed = Some(FailedFetch {
                    kind: ticket.kind,
                    message,
                });
            }
        }
        Completion::Applied
    }

    /// Flips the local listened flag; returns the new value if the row is loaded.
    pub fn apply_listen_toggle(&mut self, release_id: &ReleaseId) -> Option<bool> {
        let record = self
            .items
            .iter_mut()
            .find(|record| &record.id == release_id)?;
        record.listened = !record.listened;
        Some(record.listened)
    }

    /// Selecting the selected row collapses it.
    pub fn select_row(&mut self, release_id: &ReleaseId) -> Option<&ReleaseId> {
        if self.selected.as_ref() == Some(release_id) {
            self.selected = None;
        } else if self.record(release_id).is_some() {
            self.selected = Some(release_id.clone());
        }
        self.selected.as_ref()
    }

    /// Artist to navigate to for a row, falling back to the last one opened.
    pub fn open_artist(&mut self, release_id: &ReleaseId) -> Option<ArtistRef> {
        if let Some(artist) = self.record(release_id).map(ArtistRef::from) {
            self.last_artist = Some(artist);
        }
        self.last_artist.clone()
    }

    pub fn snapshot(&self) -> ReleaseListSnapshot {
        ReleaseListSnapshot {
            filter: self.filter,
            items: self.items.clone(),
            phase: self.phase(),
            paging: self.paging,
            selected: self.selected.clone(),
            empty_message: self.empty_state_message(),
            last_error: self.last_error().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseListSnapshot {
    pub filter: ReleaseFilter,
    pub items: Vec<ReleaseRecord>,
    pub phase: ListPhase,
    pub paging: Option<Paging>,
    pub selected: Option<ReleaseId>,
    pub empty_message: Option<&'static str>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseListEvent {
    FetchStarted {
        filter: ReleaseFilter,
        kind: FetchKind,
        page: u32,
    },
    ItemsChanged {
        filter: ReleaseFilter,
        len: usize,
        paging: Paging,
    },
    EmptyResult {
        filter: ReleaseFilter,
        message: &'static str,
    },
    Cleared {
        filter: ReleaseFilter,
    },
    FetchFailed {
        filter: ReleaseFilter,
        message: String,
        retryable: bool,
    },
    StaleResultDiscarded {
        filter: ReleaseFilter,
    },
    ListenToggled {
        release_id: ReleaseId,
        listened: bool,
    },
    ListenToggleFailed {
        release_id: ReleaseId,
        message: String,
    },
    SelectionChanged(Option<ReleaseId>),
}

enum Command {
    SelectFilter(ReleaseFilter),
    Refresh,
    RowVisible(usize),
    ToggleListened(ReleaseId),
    SelectRow(ReleaseId),
    Retry,
    OpenArtist(ReleaseId, oneshot::Sender<Option<ArtistRef>>),
    Snapshot(oneshot::Sender<ReleaseListSnapshot>),
}

enum Finished {
    Fetch(FetchTicket, Result<ReleasePage, ClientError>),
    Toggle(ReleaseId, u64, Result<bool, ClientError>),
}

pub struct ReleaseListController {
    state: ReleaseListState,
    service: Arc<dyn ReleaseService>,
    session: Arc<SessionState>,
    analytics: Arc<dyn AnalyticsSink>,
    events: broadcast::Sender<ReleaseListEvent>,
    finished_tx: mpsc::UnboundedSender<Finished>,
}

impl ReleaseListController {
    /// Starts the controller task and issues the first page for `filter`.
    pub fn spawn(
        state: ReleaseListState,
        filter: ReleaseFilter,
        service: Arc<dyn ReleaseService>,
        session: Arc<SessionState>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> ReleaseListHandle {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(RELEASE_EVENT_CAPACITY);
        let session_rx = session.subscribe();

        let mut controller = Self {
            state,
            service,
            session,
            analytics,
            events: events.clone(),
            finished_tx,
        };
        controller.select_filter(filter);
        tokio::spawn(controller.run(command_rx, finished_rx, session_rx));

        ReleaseListHandle { commands, events }
    }

    async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<Command>,
        mut finished_rx: mpsc::UnboundedReceiver<Finished>,
        mut session_rx: broadcast::Receiver<SessionEvent>,
    ) {
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(finished) = finished_rx.recv() => self.handle_finished(finished),
                event = session_rx.recv() => match event {
                    Ok(SessionEvent::LoggedIn) | Ok(SessionEvent::LoggedOut) => self.reload(),
                    Ok(SessionEvent::ArtistsUpdated) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "releases: session events lagged, reloading");
                        self.reload();
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!("releases: controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SelectFilter(filter) => self.select_filter(filter),
            Command::Refresh => self.reload(),
            Command::RowVisible(index) => {
                let ticket = self.state.row_visible(index);
                self.issue(ticket);
            }
            Command::ToggleListened(release_id) => self.toggle_listened(release_id),
            Command::SelectRow(release_id) => {
                let selected = self.state.select_row(&release_id).cloned();
                let _ = self.events.send(ReleaseListEvent::SelectionChanged(selected));
            }
            Command::Retry => {
                let ticket = self.state.retry(self.session.is_logged_in());
                self.issue(ticket);
            }
            Command::OpenArtist(release_id, reply) => {
                let _ = reply.send(self.state.open_artist(&release_id));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.snapshot());
            }
        }
    }

    fn select_filter(&mut self, filter: ReleaseFilter) {
        info!(scope = ?filter.scope, slide = ?filter.slide, "releases: filter selected");
        let ticket = self
            .state
            .select_filter(filter, self.session.is_logged_in());
        let _ = self.events.send(ReleaseListEvent::Cleared { filter });
        self.issue(ticket);
    }

    /// Pull to refresh and session transitions: start over on the current filter.
    fn reload(&mut self) {
        self.state.reset();
        let filter = self.state.filter();
        let _ = self.events.send(ReleaseListEvent::Cleared { filter });
        let ticket = self.state.load_first_page(self.session.is_logged_in());
        self.issue(ticket);
    }

    /// Starts the fetch for `ticket`. The screen's view name is logged here,
    /// when page 1 is requested, not when its result arrives.
    fn issue(&self, ticket: Option<FetchTicket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let filter = ticket.query.filter;
        if ticket.kind == FetchKind::FirstPage {
            self.analytics.log_event(filter.view_name(), None);
        }
        debug!(
            scope = ?filter.scope,
            slide = ?filter.slide,
            page = ticket.query.page,
            offset = ticket.query.offset,
            "releases: fetching"
        );
        let _ = self.events.send(ReleaseListEvent::FetchStarted {
            filter,
            kind: ticket.kind,
            page: ticket.query.page,
        });

        let service = Arc::clone(&self.service);
        let finished_tx = self.finished_tx.clone();
        tokio::spawn(async move {
            let result = service.fetch_releases(&ticket.query).await;
            let _ = finished_tx.send(Finished::Fetch(ticket, result));
        });
    }

    fn toggle_listened(&self, release_id: ReleaseId) {
        if self.state.record(&release_id).is_none() {
            warn!(release_id = %release_id, "releases: toggle requested for unknown release");
            return;
        }
        let generation = self.state.generation();
        let service = Arc::clone(&self.service);
        let finished_tx = self.finished_tx.clone();
        tokio::spawn(async move {
            let result = service.toggle_listen_status(&release_id).await;
            let _ = finished_tx.send(Finished::Toggle(release_id, generation, result));
        });
    }

    fn handle_finished(&mut self, finished: Finished) {
        match finished {
            Finished::Fetch(ticket, result) => self.finish_fetch(ticket, result),
            Finished::Toggle(release_id, generation, result) => {
                self.finish_toggle(release_id, generation, result)
            }
        }
    }

    fn finish_fetch(&mut self, ticket: FetchTicket, result: Result<ReleasePage, ClientError>) {
        let filter = ticket.query.filter;
        let failure = result.as_ref().err().map(ClientError::user_message);
        if let Err(err) = &result {
            warn!(scope = ?filter.scope, slide = ?filter.slide, "releases: fetch failed: {err}");
        }

        let result = result.map_err(|err| err.user_message());
        if self.state.complete(ticket, result) == Completion::Discarded {
            debug!(
                scope = ?filter.scope,
                slide = ?filter.slide,
                generation = ticket.generation,
                "releases: discarding stale result"
            );
            let _ = self
                .events
                .send(ReleaseListEvent::StaleResultDiscarded { filter });
            return;
        }

        if let Some(message) = failure {
            let _ = self.events.send(ReleaseListEvent::FetchFailed {
                filter,
                message,
                retryable: true,
            });
            return;
        }

        if let Some(message) = self.state.empty_state_message() {
            let _ = self
                .events
                .send(ReleaseListEvent::EmptyResult { filter, message });
        }
        if let Some(paging) = self.state.paging() {
            let _ = self.events.send(ReleaseListEvent::ItemsChanged {
                filter,
                len: self.state.items().len(),
                paging,
            });
        }
    }

    /// Rows reloaded since the toggle was issued already carry the server's
    /// flag, so a completion from an older generation must not flip them again.
    fn finish_toggle(
        &mut self,
        release_id: ReleaseId,
        generation: u64,
        result: Result<bool, ClientError>,
    ) {
        if generation != self.state.generation() {
            debug!(
                release_id = %release_id,
                generation,
                "releases: discarding listen toggle from before reload"
            );
            let filter = self.state.filter();
            let _ = self
                .events
                .send(ReleaseListEvent::StaleResultDiscarded { filter });
            return;
        }

        let message = match result {
            Ok(true) => None,
            Ok(false) => Some("listen status was not changed".to_string()),
            Err(err) => Some(err.user_message()),
        };
        if let Some(message) = message {
            warn!(release_id = %release_id, "releases: listen toggle failed: {message}");
            let _ = self.events.send(ReleaseListEvent::ListenToggleFailed {
                release_id,
                message,
            });
            return;
        }

        let Some(listened) = self.state.apply_listen_toggle(&release_id) else {
            debug!(release_id = %release_id, "releases: toggled release is no longer loaded");
            return;
        };
        let name = if listened { "Listened" } else { "Unlistened" };
        self.analytics.log_event(
            name,
            Some(&single_attribute("Release ID", release_id.as_str())),
        );
        let _ = self.events.send(ReleaseListEvent::ListenToggled {
            release_id,
            listened,
        });
    }
}

/// Cloneable front door to a running [`ReleaseListController`].
#[derive(Clone)]
pub struct ReleaseListHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<ReleaseListEvent>,
}

impl ReleaseListHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ReleaseListEvent> {
        self.events.subscribe()
    }

    pub fn select_filter(&self, scope: Scope, slide: Slide) -> Result<(), ClientError> {
        self.send(Command::SelectFilter(ReleaseFilter::new(scope, slide)))
    }

    pub fn refresh(&self) -> Result<(), ClientError> {
        self.send(Command::Refresh)
    }

    pub fn row_visible(&self, index: usize) -> Result<(), ClientError> {
        self.send(Command::RowVisible(index))
    }

    pub fn toggle_listened(&self, release_id: ReleaseId) -> Result<(), ClientError> {
        self.send(Command::ToggleListened(release_id))
    }

    pub fn select_row(&self, release_id: ReleaseId) -> Result<(), ClientError> {
        self.send(Command::SelectRow(release_id))
    }

    pub fn retry(&self) -> Result<(), ClientError> {
        self.send(Command::Retry)
    }

    pub async fn open_artist(
        &self,
        release_id: ReleaseId,
    ) -> Result<Option<ArtistRef>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::OpenArtist(release_id, reply))?;
        rx.await
            .map_err(|_| ClientError::ControllerStopped("release list"))
    }

    pub async fn snapshot(&self) -> Result<ReleaseListSnapshot, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await
            .map_err(|_| ClientError::ControllerStopped("release list"))
    }

    fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::ControllerStopped("release list"))
    }
}

#[cfg(test)]
#[path = "tests/releases_tests.rs"]
mod tests;
