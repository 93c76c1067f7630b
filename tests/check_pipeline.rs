//! Integration tests for the full check pipeline
//!
//! Tests that drive a real browser are `#[ignore]`d; run them locally with
//! `cargo test -- --ignored` on a machine with Chrome installed.

#![cfg(feature = "cdp")]

use pagewatch::check::Checker;
use pagewatch::diff::DiffConfig;
use pagewatch::{CaptureConfig, Status};
use sha2::{Digest, Sha256};
use std::sync::Once;
use tiny_http::{Response, Server};

static INIT: Once = Once::new();

const STABLE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Stable Page</title>
<style>body { margin: 0; background: #ffffff; } .hero { width: 600px; height: 200px; background: #2244aa; }</style>
</head>
<body><div class="hero"></div><p>Nothing here ever moves.</p></body>
</html>"#;

const CHANGED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Stable Page</title>
<style>body { margin: 0; background: #ffffff; } .hero { width: 600px; height: 200px; background: #aa2222; }</style>
</head>
<body><div class="hero"></div><p>Nothing here ever moves.</p></body>
</html>"#;

/// Start a simple test HTTP server
fn start_test_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18090").unwrap();
            for request in server.incoming_requests() {
                let path = request.url().to_string();
                let response = match path.as_str() {
                    "/" => Response::from_string(STABLE_PAGE).with_header(
                        "Content-Type: text/html; charset=utf-8"
                            .parse::<tiny_http::Header>()
                            .unwrap(),
                    ),
                    "/changed" => Response::from_string(CHANGED_PAGE).with_header(
                        "Content-Type: text/html; charset=utf-8"
                            .parse::<tiny_http::Header>()
                            .unwrap(),
                    ),
                    _ => Response::from_string("Not Found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18090".to_string()
}

fn quick_config() -> CaptureConfig {
    CaptureConfig {
        nav_timeout_ms: 30_000,
        settle_ms: 200,
        video_settle_ms: 0,
        ..Default::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn first_check_adopts_the_capture_as_baseline() {
    let base_url = start_test_server();
    let checker = Checker::new(quick_config(), DiffConfig::default());

    let outcome = checker.check(1, &base_url, None).await.expect("check failed");

    assert_eq!(outcome.diff_percent, 0.0);
    assert_eq!(outcome.status, Status::Clean);
    assert!(outcome.overlay_png.is_none());

    let baseline = outcome.new_baseline_png.expect("first run sets a baseline");
    assert_eq!(baseline, outcome.capture_png);
    assert_eq!(&baseline[0..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn unchanged_page_reads_clean_against_its_baseline() {
    let base_url = start_test_server();
    let checker = Checker::new(quick_config(), DiffConfig::default());

    let first = checker.check(2, &base_url, None).await.expect("first check");
    let baseline = first.new_baseline_png.expect("baseline");

    let second = checker
        .check(2, &base_url, Some(&baseline))
        .await
        .expect("second check");

    assert_eq!(second.status, Status::Clean);
    assert_eq!(second.diff_percent, 0.0);
    assert!(second.overlay_png.is_none());
    assert!(second.new_baseline_png.is_none());
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn changed_page_is_flagged_with_an_overlay() {
    let base_url = start_test_server();
    let checker = Checker::new(quick_config(), DiffConfig::default());

    let first = checker.check(3, &base_url, None).await.expect("first check");
    let baseline = first.new_baseline_png.expect("baseline");

    let changed_url = format!("{}/changed", base_url);
    let second = checker
        .check(3, &changed_url, Some(&baseline))
        .await
        .expect("changed check");

    assert_eq!(second.status, Status::Changed);
    assert!(second.diff_percent > 0.0);
    let overlay = second.overlay_png.expect("overlay for a changed page");
    assert_eq!(&overlay[0..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn two_captures_of_a_static_page_are_identical() {
    let base_url = start_test_server();
    let config = quick_config();

    let first = pagewatch::capture::capture_page(&config, &base_url)
        .await
        .expect("first capture");
    let second = pagewatch::capture::capture_page(&config, &base_url)
        .await
        .expect("second capture");

    let h1 = hex::encode(Sha256::digest(&first));
    let h2 = hex::encode(Sha256::digest(&second));
    assert_eq!(h1, h2, "captures of an unchanged page must be byte-identical");
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn unreachable_host_surfaces_as_a_typed_failure() {
    let checker = Checker::new(
        CaptureConfig {
            nav_timeout_ms: 10_000,
            ..quick_config()
        },
        DiffConfig::default(),
    );

    // Nothing listens on this port; navigation must fail, not panic, and
    // must not produce a partial outcome.
    let result = checker.check(4, "http://127.0.0.1:59999/", None).await;
    match result {
        Err(pagewatch::Error::Navigation(_))
        | Err(pagewatch::Error::Timeout(_))
        | Err(pagewatch::Error::Capture(_)) => {}
        other => panic!("expected a capture-stage failure, got {:?}", other.map(|o| o.status)),
    }
}
