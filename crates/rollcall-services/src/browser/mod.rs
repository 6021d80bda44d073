//! Browser automation driver abstraction
//!
//! A [`BrowserLauncher`] hands out one isolated [`BrowserSession`] per
//! submission. Sessions are exclusively owned and must be released with
//! [`BrowserSession::close`]; implementations also release on drop so an
//! unwinding task never leaks a session.

#[cfg(feature = "webdriver")]
pub mod webdriver;

use async_trait::async_trait;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;
use thiserror::Error;

/// Element locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(selector: impl Into<String>) -> Self {
        Selector::Css(selector.into())
    }

    pub fn xpath(selector: impl Into<String>) -> Self {
        Selector::XPath(selector.into())
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Selector::Css(s) => write!(f, "css:{}", s),
            Selector::XPath(s) => write!(f, "xpath:{}", s),
        }
    }
}

/// One input to fill.
#[derive(Clone, PartialEq, Eq)]
pub struct FormField {
    pub selector: Selector,
    pub value: String,
}

impl FormField {
    pub fn new(selector: Selector, value: impl Into<String>) -> Self {
        Self {
            selector,
            value: value.into(),
        }
    }
}

// Values may be passwords.
impl std::fmt::Debug for FormField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FormField")
            .field("selector", &self.selector)
            .field("value", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to start browser session: {0}")]
    Launch(String),

    #[error("page load failed: {0}")]
    Navigation(String),

    #[error("element not found: {0}")]
    NotFound(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("browser command failed: {0}")]
    Command(String),
}

#[async_trait]
pub trait BrowserSession: Send {
    async fn open(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn fill_form(&mut self, fields: &[FormField]) -> Result<(), BrowserError>;

    async fn click(&mut self, selector: &Selector) -> Result<(), BrowserError>;

    /// Wait until `selector` matches an element, at most `timeout`.
    async fn wait_for(&mut self, selector: &Selector, timeout: Duration)
        -> Result<(), BrowserError>;

    /// Non-blocking presence probe.
    async fn is_present(&mut self, selector: &Selector) -> Result<bool, BrowserError>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a fresh, isolated session.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}
