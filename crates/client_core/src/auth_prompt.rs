//! Log in / sign up prompt: two mutually exclusive form panels, client-side
//! sign up validation and submission to the [`AuthService`].

use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use regex::Regex;
use shared::domain::AuthOutcome;
use thiserror::Error;
use tracing::{info, warn};

use crate::{analytics::AnalyticsSink, session::SessionState, AuthService};

pub const AUTH_METHOD: &str = "LogRegPrompt";
pub const PROMPT_SCREEN_EVENT: &str = "Login / Signup Screen";
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const PANEL_FADE: Duration = Duration::from_millis(500);

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9a-z._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignupValidationError {
    #[error("Please enter a password.")]
    EmptyPassword,
    #[error("Password needs to be at least 8 characters.")]
    PasswordTooShort,
    #[error("Please enter a valid email.")]
    InvalidEmail,
}

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

/// Checks run in order; the first failing rule is reported.
pub fn validate_signup(email: &str, password: &str) -> Result<(), SignupValidationError> {
    if password.is_empty() {
        return Err(SignupValidationError::EmptyPassword);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(SignupValidationError::PasswordTooShort);
    }
    if !is_valid_email(email) {
        return Err(SignupValidationError::InvalidEmail);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    LogIn,
    SignUp,
}

impl Panel {
    fn other(self) -> Self {
        match self {
            Panel::LogIn => Panel::SignUp,
            Panel::SignUp => Panel::LogIn,
        }
    }
}

#[derive(Debug, Default)]
struct PanelState {
    visible: bool,
    status: String,
}

pub struct AuthPromptController {
    auth: Arc<dyn AuthService>,
    session: Arc<SessionState>,
    analytics: Arc<dyn AnalyticsSink>,
    log_in: PanelState,
    sign_up: PanelState,
    closed: bool,
}

impl AuthPromptController {
    pub fn new(
        auth: Arc<dyn AuthService>,
        session: Arc<SessionState>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            auth,
            session,
            analytics,
            log_in: PanelState::default(),
            sign_up: PanelState::default(),
            closed: false,
        }
    }

    pub fn on_appear(&self) {
        self.analytics.log_event(PROMPT_SCREEN_EVENT, None);
    }

    pub fn is_visible(&self, panel: Panel) -> bool {
        self.panel(panel).visible
    }

    pub fn status(&self, panel: Panel) -> &str {
        &self.panel(panel).status
    }

    /// True once a log in or sign up succeeded and the prompt should dismiss.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn toggle_login_panel(&mut self) -> Duration {
        self.toggle_panel(Panel::LogIn)
    }

    pub fn toggle_signup_panel(&mut self) -> Duration {
        self.toggle_panel(Panel::SignUp)
    }

    /// Returns the fade duration for the change. When the other panel was
    /// open it is hidden at once and the swap happens without a fade.
    fn toggle_panel(&mut self, panel: Panel) -> Duration {
        let mut fade = PANEL_FADE;
        let other = self.panel_mut(panel.other());
        if other.visible {
            other.visible = false;
            fade = Duration::ZERO;
        }
        let target = self.panel_mut(panel);
        target.visible = !target.visible;
        fade
    }

    pub async fn submit_login(&mut self, username: &str, password: &str) -> AuthOutcome {
        self.set_status(Panel::LogIn, "Logging in...");
        let outcome = match self.auth.authenticate(username, password).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("auth: log in request failed: {err}");
                AuthOutcome::Failure(err.user_message())
            }
        };

        self.analytics.log_login(AUTH_METHOD, outcome.is_success());
        self.finish(Panel::LogIn, &outcome, "Logged in!");
        outcome
    }

    pub async fn submit_signup(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, SignupValidationError> {
        if let Err(err) = validate_signup(email, password) {
            self.set_status(Panel::SignUp, err.to_string());
            return Err(err);
        }

        self.set_status(Panel::SignUp, "Signing up...\nPlease wait...");
        let outcome = match self.auth.register(email, password).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("auth: registration request failed: {err}");
                AuthOutcome::Failure(err.user_message())
            }
        };

        self.analytics.log_signup(AUTH_METHOD, outcome.is_success());
        self.finish(Panel::SignUp, &outcome, "Registration Successful!");
        Ok(outcome)
    }

    fn finish(&mut self, panel: Panel, outcome: &AuthOutcome, success_status: &str) {
        match outcome {
            AuthOutcome::Success => {
                info!(panel = ?panel, "auth: accepted");
                self.set_status(panel, success_status);
                self.session.log_in();
                self.closed = true;
            }
            AuthOutcome::Failure(message) => {
                info!(panel = ?panel, "auth: rejected");
                self.set_status(panel, message.clone());
            }
        }
    }

    fn set_status(&mut self, panel: Panel, status: impl Into<String>) {
        self.panel_mut(panel).status = status.into();
    }

    fn panel(&self, panel: Panel) -> &PanelState {
        match panel {
            Panel::LogIn => &self.log_in,
            Panel::SignUp => &self.sign_up,
        }
    }

    fn panel_mut(&mut self, panel: Panel) -> &mut PanelState {
        match panel {
            Panel::LogIn => &mut self.log_in,
            Panel::SignUp => &mut self.sign_up,
        }
    }
}

#[cfg(test)]
#[path = "tests/auth_prompt_tests.rs"]
mod tests;
