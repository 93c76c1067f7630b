//! Render stabilization
//!
//! Two captures of an unchanged page must be pixel-identical, so everything
//! time-dependent in the rendering has to be pinned down before the
//! screenshot: CSS animations caught mid-transition, scroll-triggered lazy
//! loading, autoplaying background video, and sticky elements resting away
//! from their top-of-page position.
//!
//! The choreography is a strict sequence of awaited steps with bounded
//! iteration. Timings come from the capture config, not from timer callbacks
//! inside the page.

use crate::session::CaptureSession;
use crate::{CaptureConfig, Result};
use log::debug;
use std::time::Duration;

/// Style override that resolves transitions and animations to a fixed state
/// and makes programmatic scrolling instant. `caret-color` hides the
/// blinking text cursor in autofocused inputs.
const FREEZE_STYLE: &str = r#"
(function () {
    const style = document.createElement('style');
    style.innerHTML = `
        *, *::before, *::after {
            animation-play-state: paused !important;
            transition: none !important;
            transform: none !important;
            caret-color: transparent !important;
        }
        html {
            scroll-behavior: auto !important;
        }
    `;
    document.head.appendChild(style);
})()
"#;

/// Pause every `<video>` on its first frame. `preload = 'auto'` makes sure
/// that frame is actually fetched for lazily loaded sources.
const FREEZE_VIDEO: &str = r#"
(function () {
    document.querySelectorAll('video').forEach((v) => {
        v.pause();
        v.currentTime = 0;
        v.preload = 'auto';
    });
})()
"#;

/// Run the full stabilization choreography against a live session.
///
/// Order matters: the style override goes in before the scroll pass so
/// scrolling is instant and scroll-triggered entrance animations land
/// directly in their end state; videos are frozen last so late-mounting
/// players are caught too.
pub async fn stabilize(session: &CaptureSession, config: &CaptureConfig) -> Result<()> {
    session.run_script(FREEZE_STYLE).await?;

    scroll_page(session, config).await?;

    session.run_script(FREEZE_VIDEO).await?;
    tokio::time::sleep(Duration::from_millis(config.video_settle_ms)).await;

    // Let image and network loads triggered by the scroll pass finish.
    tokio::time::sleep(Duration::from_millis(config.settle_ms)).await;

    Ok(())
}

/// Scroll top to bottom in fixed increments, pausing at each step so
/// intersection observers and lazy loaders fire, then return to the top so
/// sticky and fixed elements re-settle before the capture.
///
/// The content height is re-probed every step because triggered loads grow
/// the page; `max_scroll_steps` bounds the walk on infinite feeds.
async fn scroll_page(session: &CaptureSession, config: &CaptureConfig) -> Result<()> {
    let step = config.scroll_step_px.max(1);
    let mut offset: u64 = 0;

    for _ in 0..config.max_scroll_steps {
        let total = session.content_height().await?;
        if offset >= total as u64 {
            break;
        }
        session
            .run_script(&format!("window.scrollBy(0, {})", step))
            .await?;
        offset += step as u64;
        tokio::time::sleep(Duration::from_millis(config.scroll_pause_ms)).await;
    }

    debug!("scroll pass covered {}px in {}px steps", offset, step);

    session.run_script("window.scrollTo(0, 0)").await?;
    tokio::time::sleep(Duration::from_millis(config.scroll_pause_ms.max(100))).await;

    Ok(())
}
