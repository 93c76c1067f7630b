//! Chrome DevTools Protocol capture driver (uses the `headless_chrome` crate)
//!
//! Owns one headless Chrome process for the lifetime of a single check.
//! Never shared across checks: cookies, scroll position, and injected styles
//! must not leak from one capture into another. The driver is synchronous;
//! `session` runs it on a dedicated worker thread so checks against other
//! pages are not blocked.

use crate::{CaptureConfig, Error, Result, WaitCondition};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Interval of the `document.readyState` poll after navigation.
const READY_POLL_MS: u64 = 100;

pub struct CdpCapturer {
    browser: Browser,
    tab: Arc<Tab>,
    config: CaptureConfig,
}

impl CdpCapturer {
    /// Launch a fresh browser with the configured viewport and user agent.
    pub fn new(config: CaptureConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(Duration::from_millis(config.nav_timeout_ms * 2))
            .args(vec![
                // Rendering determinism: scale, scrollbars, and GPU raster
                // paths all vary across hosts and must not reach the capture.
                OsStr::new("--force-device-scale-factor=1"),
                OsStr::new("--hide-scrollbars"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-background-networking"),
                OsStr::new("--disable-sync"),
            ])
            .build()
            .map_err(|e| Error::Launch(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Launch(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::Launch(format!("Failed to create tab: {}", e)))?;

        tab.set_default_timeout(Duration::from_millis(config.nav_timeout_ms));

        // Sites that serve reduced markup to unrecognized agents must render
        // the same content a desktop visitor sees.
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| Error::Launch(format!("Failed to set user agent: {}", e)))?;

        Ok(Self {
            browser,
            tab,
            config,
        })
    }

    /// Navigate and block until the document reaches the configured
    /// readiness state, all under the navigation deadline.
    pub fn navigate(&self, url: &str) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(self.config.nav_timeout_ms);

        self.tab
            .navigate_to(url)
            .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))?;

        // Bounded readiness poll instead of a fixed sleep.
        loop {
            let state = self.eval_string("document.readyState")?;
            let ready = match self.config.wait {
                WaitCondition::DomReady => state == "interactive" || state == "complete",
                WaitCondition::Complete => state == "complete",
            };
            if ready {
                debug!("{} reached readyState={}", url, state);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout(self.config.nav_timeout_ms));
            }
            std::thread::sleep(Duration::from_millis(READY_POLL_MS));
        }
    }

    /// Run a script in the page for its side effects, discarding the result.
    pub fn run_script(&self, script: &str) -> Result<()> {
        self.tab
            .evaluate(script, true)
            .map_err(|e| Error::Capture(format!("Script failed: {}", e)))?;
        Ok(())
    }

    fn eval_string(&self, script: &str) -> Result<String> {
        let eval = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::Capture(format!("Evaluation failed: {}", e)))?;

        match eval.value {
            Some(val) => Ok(val
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| val.to_string())),
            None => Err(Error::Capture("No value returned from evaluation".into())),
        }
    }

    /// Full content height of the loaded document.
    ///
    /// Falls back to the viewport height when the probe fails; that yields a
    /// partial capture rather than a crash further down the pipeline.
    pub fn content_height(&self) -> u32 {
        const PROBE: &str = r#"
            Math.max(
                document.body.scrollHeight,
                document.body.offsetHeight,
                document.documentElement.clientHeight,
                document.documentElement.scrollHeight,
                document.documentElement.offsetHeight
            )
        "#;

        match self.tab.evaluate(PROBE, false) {
            Ok(eval) => match eval.value.as_ref().and_then(|v| v.as_f64()) {
                Some(h) if h.is_finite() && h >= 1.0 => h as u32,
                _ => {
                    warn!("content height probe returned no number, using viewport height");
                    self.config.viewport.height
                }
            },
            Err(e) => {
                warn!("content height probe failed ({}), using viewport height", e);
                self.config.viewport.height
            }
        }
    }

    /// One PNG screenshot clipped to the full page extent.
    ///
    /// The clip may exceed the window height; the browser stitches content
    /// beyond the viewport into a single image.
    pub fn screenshot(&self, height: u32) -> Result<Vec<u8>> {
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.config.viewport.width as f64,
            height: height as f64,
            scale: 1.0,
        };

        self.tab
            .capture_screenshot(
                Page::CaptureScreenshotFormatOption::Png,
                None,
                Some(clip),
                true,
            )
            .map_err(|e| Error::Capture(format!("Screenshot failed: {}", e)))
    }

    /// Release the browser. Dropping the handle terminates the child Chrome
    /// process; the tab only holds a reference into it.
    pub fn close(self) {
        drop(self.tab);
        drop(self.browser);
    }
}
