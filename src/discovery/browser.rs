//! Portal page rendering.
//!
//! The eScribe portal builds its meeting lists with script: committee
//! sections start collapsed and older meetings load lazily on scroll. The
//! renderer drives a headless Chrome through those interactions and hands
//! back the final DOM markup; when the `browser` feature is disabled or
//! Chrome cannot be launched it degrades to a plain HTTP fetch, which may
//! miss lazily-loaded content.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
#[cfg(feature = "browser")]
use std::sync::Arc;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;

/// Renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Run Chrome in headless mode.
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Page load timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Maximum expansion/scroll rounds before giving up on a page.
    #[serde(default = "default_scroll_rounds")]
    pub scroll_rounds: u32,
    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

fn default_headless() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_scroll_rounds() -> u32 {
    5
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            timeout: default_timeout(),
            scroll_rounds: default_scroll_rounds(),
            chrome_args: Vec::new(),
        }
    }
}

/// Wait for the document to be ready instead of sleeping a fixed interval.
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Click anything that looks like a collapsed-section toggle.
#[cfg(feature = "browser")]
const EXPAND_SECTIONS_SCRIPT: &str = r#"
    document.querySelectorAll('[aria-expanded="false"], a[data-toggle="collapse"], .collapsed > a')
        .forEach((el) => { try { el.click(); } catch (e) {} });
    true
"#;

/// Scroll to the bottom and report the new document height.
#[cfg(feature = "browser")]
const SCROLL_TO_BOTTOM_SCRIPT: &str = r#"
    window.scrollTo(0, document.body.scrollHeight);
    document.body.scrollHeight
"#;

/// Renders portal pages, preferring a headless browser.
pub struct PageRenderer {
    config: RendererConfig,
    http: reqwest::Client,
    #[cfg(feature = "browser")]
    browser: Option<Arc<Mutex<Browser>>>,
}

impl PageRenderer {
    /// Common Chrome executable paths to check.
    #[cfg(feature = "browser")]
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    /// Create a new renderer.
    ///
    /// The fallback HTTP client accepts the portal's incomplete certificate
    /// chain; this is scoped to portal page fetches only.
    pub fn new(config: RendererConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http,
            #[cfg(feature = "browser")]
            browser: None,
        }
    }

    /// Render a page to markup, expanding sections and triggering lazy loads.
    pub async fn render(&mut self, url: &str) -> Result<String> {
        #[cfg(feature = "browser")]
        {
            match self.render_with_browser(url).await {
                Ok(html) => return Ok(html),
                Err(e) => tracing::warn!(
                    "Browser rendering failed for {}: {}; falling back to plain fetch",
                    url, e
                ),
            }
        }

        self.fetch_plain(url).await
    }

    /// Plain HTTP fetch of the page markup.
    async fn fetch_plain(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {} fetching {}", response.status(), url);
        }
        Ok(response.text().await?)
    }

    /// Find a Chrome executable on this machine.
    #[cfg(feature = "browser")]
    fn find_chrome() -> Result<std::path::PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        info!("Found Chrome in PATH: {}", path);
                        return Ok(std::path::PathBuf::from(path));
                    }
                }
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found; install it or build without the 'browser' feature"
        ))
    }

    /// Launch the browser if not already running.
    #[cfg(feature = "browser")]
    async fn ensure_browser(&mut self) -> Result<()> {
        if self.browser.is_some() {
            return Ok(());
        }

        info!("Launching browser (headless={})", self.config.headless);

        let chrome_path = Self::find_chrome()?;
        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless, confusingly
        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--disable-background-networking")
            .arg("--ignore-certificate-errors");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // Drive the CDP event loop until the browser goes away
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        self.browser = Some(Arc::new(Mutex::new(browser)));

        Ok(())
    }

    /// Render a page with the browser, expanding and scrolling until the
    /// document height stabilizes or the round budget runs out.
    #[cfg(feature = "browser")]
    async fn render_with_browser(&mut self, url: &str) -> Result<String> {
        self.ensure_browser().await?;

        let browser = self.browser.as_ref().unwrap().lock().await;
        let page = browser.new_page("about:blank").await?;

        debug!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid URL: {}", e))?;
        page.execute(nav_params).await?;

        let ready_timeout = Duration::from_secs(self.config.timeout);
        match tokio::time::timeout(
            ready_timeout,
            page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()),
        )
        .await
        {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }

        // Expand sections and scroll until the height stops growing
        let mut last_height: i64 = 0;
        for round in 0..self.config.scroll_rounds {
            let _ = page.evaluate(EXPAND_SECTIONS_SCRIPT.to_string()).await;
            tokio::time::sleep(Duration::from_millis(500)).await;

            let height: i64 = page
                .evaluate(SCROLL_TO_BOTTOM_SCRIPT.to_string())
                .await
                .ok()
                .and_then(|v| v.into_value().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(500)).await;

            debug!("Scroll round {}: document height {}", round + 1, height);
            if height > 0 && height == last_height {
                break;
            }
            last_height = height;
        }

        let content = page.content().await?;

        // Close the page to prevent tab accumulation
        let _ = page.close().await;

        Ok(content)
    }
}
