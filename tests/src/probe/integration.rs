use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gmf_common::config::ScanConfig;
use gmf_core::{Body, HttpProber, Outcome, Prober, Severity};
use tokio::net::TcpListener;

use crate::utils::{proxy, server};
use crate::utils::server::Reply;

const LOCALHOST: Ipv4Addr = Ipv4Addr::LOCALHOST;
const BASELINE: &str = "/qwertyui";
const TARGET: &str = "/.git/HEAD";

fn config(port: u16) -> ScanConfig {
    ScanConfig::new(TARGET)
        .unwrap()
        .with_port(port)
        .with_timeout(Duration::from_secs(2))
}

fn prober(config: ScanConfig) -> HttpProber {
    HttpProber::new(Arc::new(config)).unwrap()
}

/// Answers `body` on the target path and 404 everywhere else.
fn only_target(body: &'static [u8]) -> impl Fn(&str) -> Reply + Send + Sync + 'static {
    move |path: &str| {
        if path == TARGET {
            Reply::ok(body)
        } else {
            Reply::not_found()
        }
    }
}

#[tokio::test]
async fn catch_all_host_is_skipped() {
    let server = server::serve(|_| Reply::ok(b"welcome")).await.unwrap();

    let outcome = prober(config(server.port)).probe(LOCALHOST, BASELINE).await.unwrap();

    assert_eq!(outcome, Outcome::Skip);
    assert_eq!(server.requests(), vec![BASELINE.to_string()]);
}

#[tokio::test]
async fn streaming_catch_all_is_skipped_without_reading_the_body() {
    let server = server::serve(|_| Reply::streaming(b"--frame\r\n")).await.unwrap();
    let config = config(server.port).with_timeout(Duration::from_millis(300));

    let started = Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        prober(config).probe(LOCALHOST, BASELINE),
    )
    .await
    .expect("baseline body was read to the end")
    .unwrap();

    assert_eq!(outcome, Outcome::Skip);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(server.requests(), vec![BASELINE.to_string()]);
}

#[tokio::test]
async fn target_only_host_is_positive() {
    let server = server::serve(only_target(b"ref: refs/heads/main\n")).await.unwrap();

    let outcome = prober(config(server.port)).probe(LOCALHOST, BASELINE).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Positive(Body::Text("ref: refs/heads/main\n".into()))
    );
    assert_eq!(server.requests(), vec![BASELINE.to_string(), TARGET.to_string()]);
    assert_eq!(server.connections(), 1, "keep-alive connection should be reused");
}

#[tokio::test]
async fn markup_body_is_negative() {
    let server = server::serve(only_target(b"<html>ok</html>")).await.unwrap();

    let outcome = prober(config(server.port)).probe(LOCALHOST, BASELINE).await.unwrap();

    assert_eq!(outcome, Outcome::Negative);
}

#[tokio::test]
async fn markup_body_is_positive_without_exclusion() {
    let server = server::serve(only_target(b"<html>ok</html>")).await.unwrap();
    let config = config(server.port).with_exclude("").unwrap();

    let outcome = prober(config).probe(LOCALHOST, BASELINE).await.unwrap();

    assert_eq!(outcome, Outcome::Positive(Body::Text("<html>ok</html>".into())));
}

#[tokio::test]
async fn missing_target_is_negative() {
    let server = server::serve(|_| Reply::not_found()).await.unwrap();

    let outcome = prober(config(server.port)).probe(LOCALHOST, BASELINE).await.unwrap();

    assert_eq!(outcome, Outcome::Negative);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn png_body_is_binary_positive() {
    let server = server::serve(only_target(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR")).await.unwrap();

    let outcome = prober(config(server.port)).probe(LOCALHOST, BASELINE).await.unwrap();

    assert_eq!(outcome, Outcome::Positive(Body::Binary));
}

#[tokio::test]
async fn closed_baseline_connection_is_reopened() {
    let server = server::serve(|path: &str| {
        if path == TARGET {
            Reply::ok(b"found")
        } else {
            Reply::not_found().closing()
        }
    })
    .await
    .unwrap();

    let outcome = prober(config(server.port)).probe(LOCALHOST, BASELINE).await.unwrap();

    assert_eq!(outcome, Outcome::Positive(Body::Text("found".into())));
    assert_eq!(server.connections(), 2);
}

#[tokio::test]
async fn refused_connection_is_transient() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port: u16 = listener.local_addr().unwrap().port();
    drop(listener);

    let err = prober(config(port)).probe(LOCALHOST, BASELINE).await.unwrap_err();

    assert_eq!(err.severity(), Severity::Transient, "{err}");
}

#[tokio::test]
async fn silent_host_times_out() {
    let port: u16 = server::silent().await.unwrap();
    let config = config(port).with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = prober(config).probe(LOCALHOST, BASELINE).await.unwrap_err();

    assert_eq!(err.severity(), Severity::Transient, "{err}");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn probe_through_forwarding_proxy() {
    let server = server::serve(only_target(b"ref: refs/heads/main\n")).await.unwrap();
    let proxy = proxy::forwarding().await.unwrap();
    let config = config(server.port).with_proxy(Some(proxy.addr.clone()));

    let outcome = prober(config).probe(LOCALHOST, BASELINE).await.unwrap();

    assert!(matches!(outcome, Outcome::Positive(Body::Text(_))));
    assert_eq!(proxy.tunnels(), 1);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn proxy_refusal_is_fatal() {
    let proxy = proxy::refusing(403).await.unwrap();
    let config = config(80).with_proxy(Some(proxy.addr.clone()));

    let err = prober(config)
        .probe(Ipv4Addr::new(93, 184, 216, 34), BASELINE)
        .await
        .unwrap_err();

    assert_eq!(err.severity(), Severity::Fatal, "{err}");
}
