//! Attendance submitter
//!
//! Drives one browser session through the portal:
//! `NotStarted -> Authenticating -> Navigating -> Confirming -> {Done, Failed}`.
//! Every stage runs under its own budget, and the session is closed on every
//! exit path. If the submission future itself unwinds, the boxed session is
//! dropped and the driver's drop handler releases it.

use rollcall_core::models::{Credentials, SubmissionError};
use rollcall_core::{AttendanceLink, Config};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::browser::{BrowserLauncher, BrowserSession, FormField, Selector};

const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(5);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    NotStarted,
    Authenticating,
    Navigating,
    Confirming,
    Done,
    Failed,
}

impl Display for SubmissionStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SubmissionStage::NotStarted => write!(f, "not_started"),
            SubmissionStage::Authenticating => write!(f, "authenticating"),
            SubmissionStage::Navigating => write!(f, "navigating"),
            SubmissionStage::Confirming => write!(f, "confirming"),
            SubmissionStage::Done => write!(f, "done"),
            SubmissionStage::Failed => write!(f, "failed"),
        }
    }
}

/// Element locators on the portal pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSelectors {
    pub username: Selector,
    pub password: Selector,
    pub login_button: Selector,
    /// Shown by the login page when the credentials are refused.
    pub login_failure: Selector,
    pub confirm_button: Selector,
    /// Confirmation marker shown once attendance is recorded.
    pub confirmation: Selector,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            username: Selector::css("input[name='username']"),
            password: Selector::css("input[name='password']"),
            login_button: Selector::css("button[type='submit'].btn.btn-primary"),
            login_failure: Selector::css(".alert-danger"),
            confirm_button: Selector::css("button.btn.btn-primary[onclick='load_win();']"),
            confirmation: Selector::xpath("//h2[contains(text(), 'Thank you')]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitterTimeouts {
    pub auth: Duration,
    pub navigation: Duration,
    pub confirmation: Duration,
    pub poll_initial: Duration,
    pub poll_max: Duration,
}

impl Default for SubmitterTimeouts {
    fn default() -> Self {
        Self {
            auth: Duration::from_secs(30),
            navigation: Duration::from_secs(30),
            confirmation: Duration::from_secs(20),
            poll_initial: Duration::from_millis(250),
            poll_max: Duration::from_secs(2),
        }
    }
}

impl SubmitterTimeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auth: Duration::from_secs(config.auth_timeout_secs()),
            navigation: Duration::from_secs(config.navigation_timeout_secs()),
            confirmation: Duration::from_secs(config.confirmation_timeout_secs()),
            ..Self::default()
        }
    }
}

/// A confirmed submission.
#[derive(Debug, Clone, Default)]
pub struct Confirmation {
    /// PNG of the confirmation page, when it could be captured.
    pub screenshot: Option<Vec<u8>>,
}

/// A failed submission with the stage it failed in.
#[derive(Debug, Clone)]
pub struct FailedSubmission {
    pub stage: SubmissionStage,
    pub error: SubmissionError,
    /// PNG of the failing page, when a session was open.
    pub screenshot: Option<Vec<u8>>,
}

impl FailedSubmission {
    fn before_session(error: SubmissionError) -> Self {
        Self {
            stage: SubmissionStage::Authenticating,
            error,
            screenshot: None,
        }
    }
}

pub struct AttendanceSubmitter {
    launcher: Arc<dyn BrowserLauncher>,
    selectors: PortalSelectors,
    timeouts: SubmitterTimeouts,
}

impl AttendanceSubmitter {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        selectors: PortalSelectors,
        timeouts: SubmitterTimeouts,
    ) -> Self {
        Self {
            launcher,
            selectors,
            timeouts,
        }
    }

    pub fn timeouts(&self) -> &SubmitterTimeouts {
        &self.timeouts
    }

    /// Log in, open `link`, confirm and wait for the portal's confirmation
    /// marker. Uses a fresh browser session that is closed before returning.
    #[tracing::instrument(skip(self, link, credentials), fields(link = %link, username = %credentials.username))]
    pub async fn submit(
        &self,
        link: &AttendanceLink,
        credentials: &Credentials,
    ) -> Result<Confirmation, FailedSubmission> {
        if !credentials.is_complete() {
            return Err(FailedSubmission::before_session(SubmissionError::Auth {
                message: "portal credentials are missing".to_string(),
            }));
        }

        enter(SubmissionStage::Authenticating);
        let mut session = match timeout(self.timeouts.auth, self.launcher.launch()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                return Err(FailedSubmission::before_session(SubmissionError::Auth {
                    message: e.to_string(),
                }))
            }
            Err(_) => {
                return Err(FailedSubmission::before_session(SubmissionError::Auth {
                    message: format!(
                        "browser session did not start within {}s",
                        self.timeouts.auth.as_secs()
                    ),
                }))
            }
        };

        let outcome = self.drive(session.as_mut(), link, credentials).await;
        let screenshot = capture(session.as_mut()).await;
        release(session).await;

        match outcome {
            Ok(()) => {
                enter(SubmissionStage::Done);
                Ok(Confirmation { screenshot })
            }
            Err((stage, error)) => {
                tracing::warn!(stage = %stage, error = %error, "Attendance submission failed");
                enter(SubmissionStage::Failed);
                Err(FailedSubmission {
                    stage,
                    error,
                    screenshot,
                })
            }
        }
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        link: &AttendanceLink,
        credentials: &Credentials,
    ) -> Result<(), (SubmissionStage, SubmissionError)> {
        self.authenticate(session, link, credentials)
            .await
            .map_err(|e| (SubmissionStage::Authenticating, e))?;

        enter(SubmissionStage::Navigating);
        self.navigate(session, link)
            .await
            .map_err(|e| (SubmissionStage::Navigating, e))?;

        enter(SubmissionStage::Confirming);
        self.confirm(session)
            .await
            .map_err(|e| (SubmissionStage::Confirming, e))
    }

    async fn authenticate(
        &self,
        session: &mut dyn BrowserSession,
        link: &AttendanceLink,
        credentials: &Credentials,
    ) -> Result<(), SubmissionError> {
        let budget = self.timeouts.auth;
        let selectors = &self.selectors;

        let login = async {
            // The portal answers an unauthenticated attendance link with its login form.
            session.open(link.raw()).await?;
            session.wait_for(&selectors.username, budget).await?;
            session
                .fill_form(&[
                    FormField::new(selectors.username.clone(), credentials.username.clone()),
                    FormField::new(selectors.password.clone(), credentials.password.clone()),
                ])
                .await?;
            session.click(&selectors.login_button).await?;
            session.is_present(&selectors.login_failure).await
        };

        match timeout(budget, login).await {
            Err(_) => Err(SubmissionError::Auth {
                message: format!("login did not complete within {}s", budget.as_secs()),
            }),
            Ok(Err(e)) => Err(SubmissionError::Auth {
                message: e.to_string(),
            }),
            Ok(Ok(true)) => Err(SubmissionError::Auth {
                message: "portal rejected the credentials".to_string(),
            }),
            Ok(Ok(false)) => Ok(()),
        }
    }

    async fn navigate(
        &self,
        session: &mut dyn BrowserSession,
        link: &AttendanceLink,
    ) -> Result<(), SubmissionError> {
        let budget = self.timeouts.navigation;
        let confirm_button = &self.selectors.confirm_button;

        let load = async {
            session.open(link.raw()).await?;
            session.wait_for(confirm_button, budget).await?;
            session.click(confirm_button).await
        };

        match timeout(budget, load).await {
            Err(_) => Err(SubmissionError::Navigation {
                message: format!("page did not load within {}s", budget.as_secs()),
            }),
            Ok(Err(e)) => Err(SubmissionError::Navigation {
                message: e.to_string(),
            }),
            Ok(Ok(())) => Ok(()),
        }
    }

    async fn confirm(&self, session: &mut dyn BrowserSession) -> Result<(), SubmissionError> {
        let budget = self.timeouts.confirmation;
        let marker = &self.selectors.confirmation;
        let (initial, max) = (self.timeouts.poll_initial, self.timeouts.poll_max);

        let poll = async {
            let mut delay = initial;
            loop {
                match session.is_present(marker).await {
                    Ok(true) => return,
                    Ok(false) => {}
                    Err(e) => tracing::debug!(error = %e, "Confirmation probe failed, retrying"),
                }
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max);
            }
        };

        timeout(budget, poll)
            .await
            .map_err(|_| SubmissionError::ConfirmationTimeout {
                waited_secs: budget.as_secs(),
            })
    }
}

fn enter(stage: SubmissionStage) {
    tracing::debug!(stage = %stage, "Submission stage");
}

async fn capture(session: &mut dyn BrowserSession) -> Option<Vec<u8>> {
    match timeout(SCREENSHOT_TIMEOUT, session.screenshot()).await {
        Ok(Ok(png)) => Some(png),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Screenshot capture failed");
            None
        }
        Err(_) => {
            tracing::warn!("Screenshot capture timed out");
            None
        }
    }
}

/// Close the session within [`CLOSE_TIMEOUT`]. On expiry the close future is
/// dropped with the session inside it, and the driver's drop handler takes over.
async fn release(session: Box<dyn BrowserSession>) {
    match timeout(CLOSE_TIMEOUT, session.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to close browser session"),
        Err(_) => tracing::warn!(
            waited_secs = CLOSE_TIMEOUT.as_secs(),
            "Browser session did not close in time, dropping it"
        ),
    }
}
