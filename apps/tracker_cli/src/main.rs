use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    carousel::split_artwork,
    load_settings,
    releases::{listen_action_title, ListPhase},
    session::SessionStore,
    settings::load_settings_from,
    AnalyticsSink, ArtworkCache, ArtworkService, AuthPromptController, Carousel,
    CarouselGeometry, CarouselTicker, ClientSettings, FileSessionStore, HttpTrackerClient,
    MemorySessionStore, NoopAnalytics, Panel, ReleaseListController, ReleaseListEvent,
    ReleaseListHandle, ReleaseListSnapshot, ReleaseListState, SessionState, TracingAnalytics,
};
use shared::domain::{ReleaseFilter, ReleaseId, Scope, Slide};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tracker", about = "Follow new releases from your artists")]
struct Cli {
    /// Settings file; defaults to `tracker.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the api url from settings and environment.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    no_analytics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        password: String,
    },
    Signup {
        email: String,
        password: String,
    },
    Logout,
    Releases {
        #[arg(long, value_enum, default_value_t = ScopeArg::Mine)]
        scope: ScopeArg,
        #[arg(long, value_enum, default_value_t = SlideArg::Unheard)]
        slide: SlideArg,
        /// Number of pages to load by scrolling to the end of the list.
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Flip the listened flag of a loaded release.
        #[arg(long)]
        toggle: Option<String>,
    },
    Carousel {
        #[arg(long, default_value_t = 390.0)]
        width: f64,
        #[arg(long, default_value_t = 40)]
        ticks: u32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    All,
    Mine,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::All => Scope::All,
            ScopeArg::Mine => Scope::Mine,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SlideArg {
    Unheard,
    Released,
    Upcoming,
    Fresh,
}

impl From<SlideArg> for Slide {
    fn from(value: SlideArg) -> Self {
        match value {
            SlideArg::Unheard => Slide::Unheard,
            SlideArg::Released => Slide::Released,
            SlideArg::Upcoming => Slide::Upcoming,
            SlideArg::Fresh => Slide::Fresh,
        }
    }
}

struct App {
    settings: ClientSettings,
    client: Arc<HttpTrackerClient>,
    session: Arc<SessionState>,
    analytics: Arc<dyn AnalyticsSink>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    let store: Arc<dyn SessionStore> = match &settings.session_file {
        Some(path) => Arc::new(FileSessionStore::new(path)),
        None => Arc::new(MemorySessionStore::default()),
    };
    let analytics: Arc<dyn AnalyticsSink> = if cli.no_analytics {
        Arc::new(NoopAnalytics)
    } else {
        Arc::new(TracingAnalytics)
    };
    let client = Arc::new(
        HttpTrackerClient::new(&settings)
            .with_context(|| format!("invalid api url {}", settings.api_url))?,
    );
    info!(api_url = %client.base_url(), "tracker client ready");

    let app = App {
        session: SessionState::new(store),
        settings,
        client,
        analytics,
    };

    match cli.command {
        Command::Login { username, password } => login(&app, &username, &password).await,
        Command::Signup { email, password } => signup(&app, &email, &password).await,
        Command::Logout => {
            app.session.log_out();
            println!("Logged out.");
            Ok(())
        }
        Command::Releases {
            scope,
            slide,
            pages,
            toggle,
        } => {
            let filter = ReleaseFilter::new(scope.into(), slide.into());
            releases(&app, filter, pages, toggle.map(ReleaseId::new)).await
        }
        Command::Carousel { width, ticks } => carousel(&app, width, ticks).await,
    }
}

fn auth_prompt(app: &App) -> AuthPromptController {
    let prompt = AuthPromptController::new(
        app.client.clone(),
        app.session.clone(),
        app.analytics.clone(),
    );
    prompt.on_appear();
    prompt
}

async fn login(app: &App, username: &str, password: &str) -> Result<()> {
    let mut prompt = auth_prompt(app);
    prompt.toggle_login_panel();
    prompt.submit_login(username, password).await;
    println!("{}", prompt.status(Panel::LogIn));
    if !prompt.is_closed() {
        bail!("log in failed");
    }
    Ok(())
}

async fn signup(app: &App, email: &str, password: &str) -> Result<()> {
    let mut prompt = auth_prompt(app);
    prompt.toggle_signup_panel();
    let submitted = prompt.submit_signup(email, password).await;
    println!("{}", prompt.status(Panel::SignUp));
    if submitted.is_err() || !prompt.is_closed() {
        bail!("sign up failed");
    }
    Ok(())
}

async fn releases(
    app: &App,
    filter: ReleaseFilter,
    pages: u32,
    toggle: Option<ReleaseId>,
) -> Result<()> {
    if !app.session.is_logged_in() {
        bail!(
            "not logged in; run `tracker login` first (session file: {})",
            session_file_label(&app.settings)
        );
    }

    let state = ReleaseListState::new(app.settings.page_size, app.settings.prefetch_rows);
    let handle = ReleaseListController::spawn(
        state,
        filter,
        app.client.clone(),
        app.session.clone(),
        app.analytics.clone(),
    );
    let mut events = handle.subscribe();

    let mut snapshot = settle(&handle, &mut events).await?;
    for _ in 1..pages {
        let has_more = snapshot.paging.is_some_and(|paging| paging.has_more());
        if !has_more || snapshot.items.is_empty() {
            break;
        }
        handle.row_visible(snapshot.items.len() - 1)?;
        snapshot = settle(&handle, &mut events).await?;
    }

    if let Some(release_id) = toggle {
        if !snapshot.items.iter().any(|record| record.id == release_id) {
            bail!("release {release_id} is not in the loaded list");
        }
        handle.toggle_listened(release_id.clone())?;
        wait_for_toggle(&mut events, &release_id).await?;
        snapshot = handle.snapshot().await?;
    }

    print_releases(&snapshot);
    Ok(())
}

fn session_file_label(settings: &ClientSettings) -> String {
    match &settings.session_file {
        Some(path) => path.display().to_string(),
        None => "none, set APP__SESSION_FILE to keep the session".to_string(),
    }
}

/// Waits until the controller has no fetch in flight.
async fn settle(
    handle: &ReleaseListHandle,
    events: &mut broadcast::Receiver<ReleaseListEvent>,
) -> Result<ReleaseListSnapshot> {
    loop {
        let snapshot = handle.snapshot().await?;
        if snapshot.phase == ListPhase::Idle {
            return Ok(snapshot);
        }
        match events.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => bail!("release list stopped"),
        }
    }
}

async fn wait_for_toggle(
    events: &mut broadcast::Receiver<ReleaseListEvent>,
    release_id: &ReleaseId,
) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(ReleaseListEvent::ListenToggled {
                release_id: toggled,
                ..
            }) if &toggled == release_id => return Ok(()),
            Ok(ReleaseListEvent::ListenToggleFailed {
                release_id: failed,
                message,
            }) if &failed == release_id => bail!("{message}"),
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => bail!("release list stopped"),
        }
    }
}

fn print_releases(snapshot: &ReleaseListSnapshot) {
    println!("{}", snapshot.filter.view_name());
    if let Some(error) = &snapshot.last_error {
        println!("  error: {error}");
        return;
    }
    if let Some(message) = snapshot.empty_message {
        println!("  {message}");
        return;
    }
    for (index, record) in snapshot.items.iter().enumerate() {
        let date = record
            .release_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "undated".to_string());
        println!(
            "{:>4}  {:<24} {:<32} {}  [{}]  id={}",
            index + 1,
            record.artist_name,
            record.title,
            date,
            listen_action_title(record),
            record.id
        );
    }
    if let Some(paging) = snapshot.paging {
        println!(
            "  page {} of {}",
            paging.current_page, paging.total_pages
        );
    }
}

async fn carousel(app: &App, width: f64, ticks: u32) -> Result<()> {
    let urls = app
        .client
        .fetch_art_urls()
        .await
        .context("fetching artwork urls")?;
    let (top, bottom) = split_artwork(&urls);

    let cache = ArtworkCache::new(app.client.clone());
    let loaded_top = cache.preload(&top).await.iter().flatten().count();
    let loaded_bottom = cache.preload(&bottom).await.iter().flatten().count();
    println!(
        "artwork: top {loaded_top}/{}, bottom {loaded_bottom}/{}",
        top.len(),
        bottom.len()
    );

    let carousel = Carousel::new(CarouselGeometry::from_viewport(width));
    let ticker = CarouselTicker::start(
        carousel,
        app.settings.carousel_period(),
        app.settings.carousel_step,
    );
    let mut offsets = ticker.subscribe();
    for _ in 0..ticks {
        offsets
            .changed()
            .await
            .context("carousel ticker stopped")?;
        let current = *offsets.borrow_and_update();
        println!("top {:>8.2}  bottom {:>8.2}", current.top, current.bottom);
    }
    ticker.stop();
    Ok(())
}
