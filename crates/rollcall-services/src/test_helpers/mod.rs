//! Test fakes for the browser driver and the reasoning service.
//!
//! Enabled for this crate's tests and, through the `test-helpers` feature,
//! for downstream crates.

use async_trait::async_trait;
use rollcall_reasoning::ReasoningService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::browser::{BrowserError, BrowserLauncher, BrowserSession, FormField, Selector};
use crate::submitter::PortalSelectors;

/// Bytes returned by scripted screenshots.
pub const SCRIPTED_SCREENSHOT: &[u8] = b"\x89PNG\r\n\x1a\nscripted";

/// How the scripted portal behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedPortal {
    Confirms,
    RejectsLogin,
    MissingConfirmButton,
    NeverConfirms,
    LaunchFails,
    HangsOnLogin,
    /// Confirms, but screenshots never return.
    HangsOnScreenshot,
    /// Confirms, but closing the session never returns.
    HangsOnClose,
    Panics,
}

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    releases: AtomicUsize,
    opened: Mutex<Vec<String>>,
}

/// A [`BrowserLauncher`] whose sessions follow a [`ScriptedPortal`] script
/// and count how many sessions were started and released.
pub struct ScriptedLauncher {
    portal: ScriptedPortal,
    step_delay: Option<Duration>,
    counters: Arc<Counters>,
}

impl ScriptedLauncher {
    pub fn new(portal: ScriptedPortal) -> Self {
        Self {
            portal,
            step_delay: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Sleep before every browser command.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    pub fn launches(&self) -> usize {
        self.counters.launches.load(Ordering::SeqCst)
    }

    /// Sessions closed explicitly or dropped.
    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }

    pub fn active_sessions(&self) -> usize {
        self.launches().saturating_sub(self.releases())
    }

    pub fn opened_urls(&self) -> Vec<String> {
        match self.counters.opened.lock() {
            Ok(opened) => opened.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if self.portal == ScriptedPortal::LaunchFails {
            return Err(BrowserError::Launch("no browser available".to_string()));
        }
        self.counters.launches.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScriptedSession {
            portal: self.portal,
            selectors: PortalSelectors::default(),
            step_delay: self.step_delay,
            counters: self.counters.clone(),
            confirmed: false,
            released: false,
        }))
    }
}

struct ScriptedSession {
    portal: ScriptedPortal,
    selectors: PortalSelectors,
    step_delay: Option<Duration>,
    counters: Arc<Counters>,
    confirmed: bool,
    released: bool,
}

impl ScriptedSession {
    async fn step(&self) {
        if let Some(delay) = self.step_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn open(&mut self, url: &str) -> Result<(), BrowserError> {
        self.step().await;
        if let Ok(mut opened) = self.counters.opened.lock() {
            opened.push(url.to_string());
        }
        Ok(())
    }

    async fn fill_form(&mut self, _fields: &[FormField]) -> Result<(), BrowserError> {
        self.step().await;
        if self.portal == ScriptedPortal::Panics {
            panic!("scripted browser crashed");
        }
        Ok(())
    }

    async fn click(&mut self, selector: &Selector) -> Result<(), BrowserError> {
        self.step().await;
        if *selector == self.selectors.confirm_button {
            if self.portal == ScriptedPortal::MissingConfirmButton {
                return Err(BrowserError::NotFound(selector.to_string()));
            }
            self.confirmed = true;
        }
        Ok(())
    }

    async fn wait_for(
        &mut self,
        selector: &Selector,
        _timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.step().await;
        if self.portal == ScriptedPortal::HangsOnLogin && *selector == self.selectors.username {
            std::future::pending::<()>().await;
        }
        if self.portal == ScriptedPortal::MissingConfirmButton
            && *selector == self.selectors.confirm_button
        {
            return Err(BrowserError::Timeout(selector.to_string()));
        }
        Ok(())
    }

    async fn is_present(&mut self, selector: &Selector) -> Result<bool, BrowserError> {
        self.step().await;
        if *selector == self.selectors.login_failure {
            return Ok(self.portal == ScriptedPortal::RejectsLogin);
        }
        if *selector == self.selectors.confirmation {
            return Ok(self.confirmed && self.portal != ScriptedPortal::NeverConfirms);
        }
        Ok(true)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BrowserError> {
        if self.portal == ScriptedPortal::HangsOnScreenshot {
            std::future::pending::<()>().await;
        }
        Ok(SCRIPTED_SCREENSHOT.to_vec())
    }

    async fn close(mut self: Box<Self>) -> Result<(), BrowserError> {
        if self.portal == ScriptedPortal::HangsOnClose {
            // Released by `Drop` once the caller gives up.
            std::future::pending::<()>().await;
        }
        self.release();
        Ok(())
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// A [`ReasoningService`] that replays canned answers in order, repeating the
/// last one once the script runs out.
pub struct StaticReasoning {
    answers: Vec<Result<String, String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StaticReasoning {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::scripted(answers.into_iter().map(|a| Ok(a.into())).collect())
    }

    /// Every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::scripted(vec![Err(message.into())])
    }

    fn scripted(answers: Vec<Result<String, String>>) -> Self {
        Self {
            answers,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        match self.prompts.lock() {
            Ok(prompts) => prompts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ReasoningService for StaticReasoning {
    fn name(&self) -> &str {
        "static"
    }

    async fn infer(&self, prompt: &str) -> anyhow::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.answers.get(call).or_else(|| self.answers.last()) {
            Some(Ok(answer)) => Ok(answer.clone()),
            Some(Err(message)) => Err(anyhow::anyhow!("{}", message)),
            None => Err(anyhow::anyhow!("no scripted answer")),
        }
    }
}
