//! Pagewatch Visual Regression Engine
//!
//! A checking engine for monitored web pages: captures a deterministic
//! full-page screenshot through a headless browser, compares it against a
//! stored baseline image, and reports a quantified difference together with a
//! visual diff overlay.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives headless Chrome over the DevTools
//!   Protocol, one freshly launched instance per check
//! - **Stabilization**: animation/video freezing and scroll choreography so
//!   two captures of an unchanged page are pixel-identical
//! - **Diff Engine**: per-pixel perceptual comparison usable without any
//!   browser at all
//!
//! # Example
//!
//! ```no_run
//! use pagewatch::check::Checker;
//! use pagewatch::diff::DiffConfig;
//! use pagewatch::CaptureConfig;
//!
//! # async fn demo() -> pagewatch::Result<()> {
//! let checker = Checker::new(CaptureConfig::default(), DiffConfig::default());
//!
//! // First check of a page: the capture becomes the baseline.
//! let outcome = checker.check(1, "example.com/pricing", None).await?;
//! assert_eq!(outcome.diff_percent, 0.0);
//! assert!(outcome.new_baseline_png.is_some());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

// Target URL repair (pure string work, no network)
pub mod target;

// Image diff engine (works without a browser)
pub mod diff;

#[cfg(feature = "cdp")]
pub mod cdp;

// Worker-backed async facade over the sync CDP driver
#[cfg(feature = "cdp")]
pub mod session;

// Render stabilization choreography
#[cfg(feature = "cdp")]
pub mod stabilize;

// Capture pipeline: launch, navigate, stabilize, screenshot, teardown
#[cfg(feature = "cdp")]
pub mod capture;

// Check orchestration: capture + diff with per-page serialization
#[cfg(feature = "cdp")]
pub mod check;

#[cfg(feature = "cdp")]
pub use check::{Approval, CheckOutcome, Checker, PageId};
pub use diff::{DiffConfig, DiffReport, Status};

/// Page readiness state to wait for after navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// `document.readyState` reached "interactive" (DOM parsed)
    DomReady,
    /// `document.readyState` reached "complete" (subresources done)
    Complete,
}

/// Configuration for one capture.
///
/// The defaults reproduce production checking behavior: a fixed desktop
/// viewport, a user agent that real sites serve full content to, and the
/// settle timings the stabilization choreography was tuned with.
///
/// # Examples
///
/// ```
/// let cfg = pagewatch::CaptureConfig::default();
/// assert_eq!(cfg.viewport.width, 1440);
/// assert!(cfg.user_agent.contains("Chrome"));
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// User agent string to present to the target site
    pub user_agent: String,
    /// Viewport the page is laid out at; the capture height may exceed it
    pub viewport: Viewport,
    /// Hard deadline for navigation plus readiness, in milliseconds
    pub nav_timeout_ms: u64,
    /// Readiness state to wait for after the navigation settles
    pub wait: WaitCondition,
    /// Scroll increment used to trigger lazy loading, in pixels
    pub scroll_step_px: u32,
    /// Pause between scroll increments, in milliseconds
    pub scroll_pause_ms: u64,
    /// Upper bound on scroll increments, so pages that grow while being
    /// scrolled (infinite feeds) cannot stall a check
    pub max_scroll_steps: u32,
    /// Settle delay after the scroll pass for in-flight loads, in milliseconds
    pub settle_ms: u64,
    /// Settle delay after freezing videos, so frame seeks complete
    pub video_settle_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            viewport: Viewport::default(),
            nav_timeout_ms: 60_000,
            wait: WaitCondition::Complete,
            scroll_step_px: 500,
            scroll_pause_ms: 50,
            max_scroll_steps: 200,
            settle_ms: 1_500,
            video_settle_ms: 500,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 1080,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CaptureConfig::default();
        assert_eq!(config.viewport.width, 1440);
        assert_eq!(config.viewport.height, 1080);
        assert_eq!(config.nav_timeout_ms, 60_000);
        assert_eq!(config.wait, WaitCondition::Complete);
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport {
            width: 1920,
            height: 1080,
        };
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
    }
}
