//! WebDriver-backed browser sessions (chromedriver, selenium, etc.)

use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{BrowserError, BrowserLauncher, BrowserSession, FormField, Selector};

const PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// WebDriver endpoint, e.g. `http://localhost:4444`
    pub webdriver_url: String,
    pub headless: bool,
    pub page_load_timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: rollcall_core::config::DEFAULT_WEBDRIVER_URL.to_string(),
            headless: true,
            page_load_timeout: Duration::from_secs(PAGE_LOAD_TIMEOUT_SECS),
        }
    }
}

/// Starts one Chrome session per call.
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    config: WebDriverConfig,
}

impl WebDriverLauncher {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut args = vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--window-size=1920,1080",
            "--disable-blink-features=AutomationControlled",
        ];
        if self.config.headless {
            args.insert(0, "--headless=new");
        }

        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": args,
                "excludeSwitches": ["enable-logging", "enable-automation"],
                "prefs": {
                    "profile.managed_default_content_settings.images": 2,
                    "profile.default_content_setting_values.notifications": 2
                }
            }),
        );
        caps
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());

        let client = builder
            .connect(&self.config.webdriver_url)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let timeouts = TimeoutConfiguration::new(None, Some(self.config.page_load_timeout), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            let _ = client.close().await;
            return Err(BrowserError::Launch(format!(
                "failed to set page load timeout: {}",
                e
            )));
        }

        tracing::debug!(webdriver_url = %self.config.webdriver_url, "WebDriver session started");

        Ok(Box::new(WebDriverSession {
            client: Some(client),
        }))
    }
}

/// A live WebDriver session. Closed explicitly, or on drop as a fallback.
pub struct WebDriverSession {
    client: Option<Client>,
}

impl WebDriverSession {
    fn client(&self) -> Result<&Client, BrowserError> {
        self.client
            .as_ref()
            .ok_or_else(|| BrowserError::Command("session already closed".to_string()))
    }
}

fn locator(selector: &Selector) -> Locator<'_> {
    match selector {
        Selector::Css(s) => Locator::Css(s.as_str()),
        Selector::XPath(s) => Locator::XPath(s.as_str()),
    }
}

fn element_error(selector: &Selector, err: CmdError) -> BrowserError {
    if err.is_no_such_element() {
        BrowserError::NotFound(selector.to_string())
    } else {
        BrowserError::Command(err.to_string())
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn open(&mut self, url: &str) -> Result<(), BrowserError> {
        self.client()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation(format!("{}: {}", url, e)))
    }

    async fn fill_form(&mut self, fields: &[FormField]) -> Result<(), BrowserError> {
        let client = self.client()?;
        for field in fields {
            let element = client
                .find(locator(&field.selector))
                .await
                .map_err(|e| element_error(&field.selector, e))?;
            element
                .clear()
                .await
                .map_err(|e| BrowserError::Command(e.to_string()))?;
            element
                .send_keys(&field.value)
                .await
                .map_err(|e| BrowserError::Command(e.to_string()))?;
        }
        Ok(())
    }

    async fn click(&mut self, selector: &Selector) -> Result<(), BrowserError> {
        let element = self
            .client()?
            .find(locator(selector))
            .await
            .map_err(|e| element_error(selector, e))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))
    }

    async fn wait_for(
        &mut self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        match self
            .client()?
            .wait()
            .at_most(timeout)
            .for_element(locator(selector))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(BrowserError::Timeout(selector.to_string())),
            Err(e) => Err(element_error(selector, e)),
        }
    }

    async fn is_present(&mut self, selector: &Selector) -> Result<bool, BrowserError> {
        let found = self
            .client()?
            .find_all(locator(selector))
            .await
            .map_err(|e| element_error(selector, e))?;
        Ok(!found.is_empty())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BrowserError> {
        self.client()?
            .screenshot()
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))
    }

    async fn close(mut self: Box<Self>) -> Result<(), BrowserError> {
        match self.client.take() {
            Some(client) => client
                .close()
                .await
                .map_err(|e| BrowserError::Command(e.to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!("Browser session dropped without close; closing in background");
                handle.spawn(async move {
                    if let Err(e) = client.close().await {
                        tracing::warn!(error = %e, "Background browser close failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("Browser session dropped outside a runtime; webdriver may keep it open");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_capabilities() {
        let launcher = WebDriverLauncher::new(WebDriverConfig::default());
        let caps = launcher.capabilities();
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();

        assert_eq!(args[0], "--headless=new");
        assert!(args.iter().any(|a| a == "--no-sandbox"));
        assert!(args.iter().any(|a| a == "--window-size=1920,1080"));
    }

    #[test]
    fn test_headed_capabilities() {
        let launcher = WebDriverLauncher::new(WebDriverConfig {
            headless: false,
            ..WebDriverConfig::default()
        });
        let caps = launcher.capabilities();
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(!args.iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn test_other_command_errors_are_not_missing_elements() {
        let selector = Selector::css(".alert-danger");
        match element_error(&selector, CmdError::WaitTimeout) {
            BrowserError::Command(message) => assert!(!message.is_empty()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_launch_against_missing_endpoint_fails() {
        let launcher = WebDriverLauncher::new(WebDriverConfig {
            webdriver_url: "http://127.0.0.1:1".to_string(),
            ..WebDriverConfig::default()
        });
        let result = launcher.launch().await;
        assert!(matches!(result, Err(BrowserError::Launch(_))));
    }
}
