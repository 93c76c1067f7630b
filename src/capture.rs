//! Capture pipeline
//!
//! One call, one browser: launch, navigate, stabilize, screenshot, teardown.
//! A failed step aborts the rest and no partial image is returned; teardown
//! runs on every exit path.

use crate::session::CaptureSession;
use crate::stabilize::stabilize;
use crate::{CaptureConfig, Result};
use log::{debug, info, warn};

/// Produce one deterministic full-page PNG of `url`.
///
/// The URL must already be normalized (`target::normalize`).
pub async fn capture_page(config: &CaptureConfig, url: &str) -> Result<Vec<u8>> {
    let session = CaptureSession::launch(config.clone()).await?;

    let result = drive(&session, config, url).await;

    // Unconditional teardown. A close hiccup after a successful capture is
    // logged, not fatal: the worker drop still kills the browser process.
    if let Err(close_err) = session.close().await {
        warn!("browser teardown reported: {}", close_err);
    }

    result
}

async fn drive(session: &CaptureSession, config: &CaptureConfig, url: &str) -> Result<Vec<u8>> {
    info!("navigating to {}", url);
    session.navigate(url).await?;

    stabilize(session, config).await?;

    let height = session.content_height().await?;
    debug!("full page height for {}: {}px", url, height);

    let png = session.screenshot(height).await?;
    info!("captured {} bytes from {}", png.len(), url);
    Ok(png)
}
