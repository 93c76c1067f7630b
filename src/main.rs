//! pagewatch CLI
//!
//! The thin collaborator around the checking core: stores baselines and
//! snapshot history on the local filesystem and prints a JSON report per
//! check. State layout under `--state-dir`:
//!
//! ```text
//! baselines/<page>.png          current baseline per page
//! latest/<page>.png             most recent capture per page
//! snapshots/<page>-<hash>.png   append-only capture history
//! snapshots/<page>-<hash>.overlay.png
//! ```
//!
//! The page key is derived from the SHA-256 of the normalized URL, so the
//! same logical page maps to the same baseline regardless of how the
//! address was typed.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pagewatch::diff::{self, DiffConfig};

#[cfg(feature = "cdp")]
use log::error;
#[cfg(feature = "cdp")]
use pagewatch::check::{CheckOutcome, Checker, PageId};
#[cfg(feature = "cdp")]
use pagewatch::{target, CaptureConfig};
#[cfg(feature = "cdp")]
use serde::Serialize;
#[cfg(feature = "cdp")]
use sha2::{Digest, Sha256};
#[cfg(feature = "cdp")]
use std::fs;
#[cfg(feature = "cdp")]
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pagewatch", version, about = "Visual regression checks for live pages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture the given URLs and compare each against its stored baseline
    #[cfg(feature = "cdp")]
    Check {
        /// Pages to check (raw URLs; normalized before navigation)
        #[arg(required = true)]
        urls: Vec<String>,
        /// Directory holding baselines and snapshot history
        #[arg(long, default_value = ".pagewatch")]
        state_dir: PathBuf,
        /// Navigation timeout in milliseconds
        #[arg(long, default_value_t = 60_000)]
        timeout_ms: u64,
        /// Per-pixel color distance threshold
        #[arg(long, default_value_t = 0.1)]
        threshold: f64,
        /// Change percentage still reported as clean
        #[arg(long, default_value_t = 0.01)]
        epsilon: f64,
    },
    /// Promote the most recent capture of a URL to its baseline
    #[cfg(feature = "cdp")]
    Approve {
        url: String,
        #[arg(long, default_value = ".pagewatch")]
        state_dir: PathBuf,
    },
    /// Compare two PNG files without touching a browser
    Diff {
        baseline: PathBuf,
        capture: PathBuf,
        /// Write the highlight overlay here when pixels differ
        #[arg(long)]
        overlay: Option<PathBuf>,
        #[arg(long, default_value_t = 0.1)]
        threshold: f64,
        #[arg(long, default_value_t = 0.01)]
        epsilon: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "cdp")]
        Command::Check {
            urls,
            state_dir,
            timeout_ms,
            threshold,
            epsilon,
        } => run_checks(urls, state_dir, timeout_ms, threshold, epsilon).await,
        #[cfg(feature = "cdp")]
        Command::Approve { url, state_dir } => run_approve(&url, &state_dir).await,
        Command::Diff {
            baseline,
            capture,
            overlay,
            threshold,
            epsilon,
        } => run_diff(&baseline, &capture, overlay.as_deref(), threshold, epsilon),
    }
}

#[cfg(feature = "cdp")]
#[derive(Serialize)]
struct CheckReport {
    url: String,
    diff_percent: f64,
    status: pagewatch::Status,
    snapshot: PathBuf,
    overlay: Option<PathBuf>,
    baseline_created: bool,
}

/// Page key and serialization id, both derived from the normalized URL.
#[cfg(feature = "cdp")]
fn page_identity(url: &str) -> (String, PageId) {
    let digest = Sha256::digest(url.as_bytes());
    let mut id_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&digest[..8]);
    (hex::encode(&digest[..6]), PageId::from_be_bytes(id_bytes))
}

#[cfg(feature = "cdp")]
fn content_name(png: &[u8]) -> String {
    let digest = Sha256::digest(png);
    hex::encode(&digest[..6])
}

#[cfg(feature = "cdp")]
async fn run_checks(
    urls: Vec<String>,
    state_dir: PathBuf,
    timeout_ms: u64,
    threshold: f64,
    epsilon: f64,
) -> Result<()> {
    let capture_config = CaptureConfig {
        nav_timeout_ms: timeout_ms,
        ..Default::default()
    };
    let diff_config = DiffConfig::default()
        .with_pixel_threshold(threshold)
        .with_epsilon_percent(epsilon);

    let checker = Arc::new(Checker::new(capture_config, diff_config));
    // One browser per in-flight check; bound the fleet to the host's cores.
    let limiter = Arc::new(tokio::sync::Semaphore::new(num_cpus::get()));

    let tasks = urls.iter().map(|url| {
        let checker = checker.clone();
        let limiter = limiter.clone();
        let state_dir = state_dir.clone();
        let url = url.clone();
        async move {
            let _permit = limiter.acquire().await.context("check limiter closed")?;
            run_one_check(&checker, &state_dir, &url).await
        }
    });

    let mut failures = 0usize;
    for (url, result) in urls.iter().zip(futures::future::join_all(tasks).await) {
        match result {
            Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            Err(err) => {
                failures += 1;
                error!("check failed for {}: {:#}", url, err);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} checks failed", failures, urls.len());
    }
    Ok(())
}

#[cfg(feature = "cdp")]
async fn run_one_check(checker: &Checker, state_dir: &PathBuf, raw_url: &str) -> Result<CheckReport> {
    let url = target::normalize(raw_url);
    let (key, page_id) = page_identity(&url);

    let baseline_path = state_dir.join("baselines").join(format!("{key}.png"));
    let baseline = match fs::read(&baseline_path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e).context(format!("reading baseline {}", baseline_path.display())),
    };

    let outcome = checker.check(page_id, raw_url, baseline.as_deref()).await?;

    persist_outcome(state_dir, &url, &key, &baseline_path, outcome)
}

#[cfg(feature = "cdp")]
fn persist_outcome(
    state_dir: &PathBuf,
    url: &str,
    key: &str,
    baseline_path: &std::path::Path,
    outcome: CheckOutcome,
) -> Result<CheckReport> {
    let snapshots = state_dir.join("snapshots");
    let latest = state_dir.join("latest");
    fs::create_dir_all(&snapshots)?;
    fs::create_dir_all(&latest)?;
    fs::create_dir_all(state_dir.join("baselines"))?;

    let hash = content_name(&outcome.capture_png);
    let snapshot_path = snapshots.join(format!("{key}-{hash}.png"));
    fs::write(&snapshot_path, &outcome.capture_png)?;
    fs::write(latest.join(format!("{key}.png")), &outcome.capture_png)?;

    let overlay_path = match outcome.overlay_png {
        Some(ref bytes) => {
            let path = snapshots.join(format!("{key}-{hash}.overlay.png"));
            fs::write(&path, bytes)?;
            Some(path)
        }
        None => None,
    };

    let baseline_created = outcome.new_baseline_png.is_some();
    if let Some(ref bytes) = outcome.new_baseline_png {
        fs::write(baseline_path, bytes)?;
    }

    Ok(CheckReport {
        url: url.to_string(),
        diff_percent: outcome.diff_percent,
        status: outcome.status,
        snapshot: snapshot_path,
        overlay: overlay_path,
        baseline_created,
    })
}

#[cfg(feature = "cdp")]
async fn run_approve(raw_url: &str, state_dir: &PathBuf) -> Result<()> {
    let url = target::normalize(raw_url);
    let (key, page_id) = page_identity(&url);

    let latest_path = state_dir.join("latest").join(format!("{key}.png"));
    let capture = fs::read(&latest_path).with_context(|| {
        format!(
            "no capture to approve for {} (expected {})",
            url,
            latest_path.display()
        )
    })?;

    let checker = Checker::new(CaptureConfig::default(), DiffConfig::default());
    let approval = checker.approve(page_id, &capture).await?;

    fs::create_dir_all(state_dir.join("baselines"))?;
    let baseline_path = state_dir.join("baselines").join(format!("{key}.png"));
    fs::write(&baseline_path, &approval.baseline_png)?;

    println!(
        "{}",
        serde_json::json!({
            "url": url,
            "diff_percent": approval.diff_percent,
            "status": approval.status,
            "baseline": baseline_path,
        })
    );
    Ok(())
}

fn run_diff(
    baseline: &std::path::Path,
    capture: &std::path::Path,
    overlay_out: Option<&std::path::Path>,
    threshold: f64,
    epsilon: f64,
) -> Result<()> {
    let baseline_bytes =
        std::fs::read(baseline).with_context(|| format!("reading {}", baseline.display()))?;
    let capture_bytes =
        std::fs::read(capture).with_context(|| format!("reading {}", capture.display()))?;

    let config = DiffConfig::default()
        .with_pixel_threshold(threshold)
        .with_epsilon_percent(epsilon);
    let report = diff::compare_or_failsafe(&baseline_bytes, &capture_bytes, &config);

    if let (Some(out), Some(ref img)) = (overlay_out, report.overlay.as_ref()) {
        std::fs::write(out, diff::encode_png(img)?)
            .with_context(|| format!("writing {}", out.display()))?;
    }

    println!(
        "{}",
        serde_json::json!({
            "diff_percent": report.diff_percent,
            "status": report.status,
            "differing_pixels": report.differing_pixels,
            "compared": format!("{}x{}", report.compared_width, report.compared_height),
        })
    );
    Ok(())
}
