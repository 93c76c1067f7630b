//! Worker-backed capture session
//!
//! The CDP driver is synchronous, so each check spawns a dedicated worker
//! thread that owns a `CdpCapturer` and executes commands sent from async
//! tasks. Callers get an async interface without the driver needing to be
//! `Send` across await points, and concurrent checks against different pages
//! never block each other.
//!
//! One session per check. The browser dies with the worker: either through
//! an explicit `close`, or when the session handle is dropped and the command
//! channel disconnects.

use crate::cdp::CdpCapturer;
use crate::{CaptureConfig, Error, Result};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Navigate(String, oneshot::Sender<Result<()>>),
    RunScript(String, oneshot::Sender<Result<()>>),
    ContentHeight(oneshot::Sender<u32>),
    Screenshot(u32, oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<()>),
}

/// Async handle to a browser owned by a worker thread.
pub struct CaptureSession {
    cmd_tx: Sender<Command>,
}

impl CaptureSession {
    /// Launch a browser on a fresh worker thread.
    pub async fn launch(config: CaptureConfig) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            let capturer = match CdpCapturer::new(config) {
                Ok(c) => c,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };

            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Navigate(url, resp) => {
                        let _ = resp.send(capturer.navigate(&url));
                    }
                    Command::RunScript(script, resp) => {
                        let _ = resp.send(capturer.run_script(&script));
                    }
                    Command::ContentHeight(resp) => {
                        let _ = resp.send(capturer.content_height());
                    }
                    Command::Screenshot(height, resp) => {
                        let _ = resp.send(capturer.screenshot(height));
                    }
                    Command::Close(resp) => {
                        capturer.close();
                        let _ = resp.send(());
                        break;
                    }
                }
            }
            // A channel disconnect (session handle dropped mid-check) falls
            // through here; the capturer drop still tears the browser down.
        });

        let init_res = init_rx
            .await
            .map_err(|e| Error::Launch(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Navigate to a URL and wait for readiness.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Navigate(url.to_string(), tx));
        rx.await
            .map_err(|e| Error::Navigation(format!("Navigate canceled: {}", e)))?
    }

    /// Run a script for its side effects.
    pub async fn run_script(&self, script: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::RunScript(script.to_string(), tx));
        rx.await
            .map_err(|e| Error::Capture(format!("RunScript canceled: {}", e)))?
    }

    /// Current full content height (viewport height when it cannot be probed).
    pub async fn content_height(&self) -> Result<u32> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::ContentHeight(tx));
        rx.await
            .map_err(|e| Error::Capture(format!("ContentHeight canceled: {}", e)))
    }

    /// Take a full-page screenshot clipped to `height`.
    pub async fn screenshot(&self, height: u32) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Screenshot(height, tx));
        rx.await
            .map_err(|e| Error::Capture(format!("Screenshot canceled: {}", e)))?
    }

    /// Shut the worker down and release the browser.
    ///
    /// Dropping the session releases the browser as well; the explicit call
    /// keeps teardown observable on the success path.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Close(tx));
        rx.await
            .map_err(|e| Error::Capture(format!("Close canceled: {}", e)))
    }
}
