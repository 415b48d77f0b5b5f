//! End-to-end mirror scenarios
//!
//! Every test gets its own mock server, destination and state directory.
//! Pacing and retry delays are zeroed unless the test is about pacing.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sumi_mirror::config::{Config, OverwritePolicy, WriteFailureAction};
use sumi_mirror::output::{write_check_report, FixedAnswer, SIDECAR_FILE, STYLES_DIR};
use sumi_mirror::{mirror, CheckStatus, MirrorError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast, non-interactive configuration writing into temp dirs
fn create_test_config(dest: &Path, state: &Path) -> Config {
    let mut config = Config::default();
    config.crawl.interval = 0.0;
    config.crawl.jitter = 0.0;
    config.crawl.retry_delay = 0.0;
    config.crawl.reconnect_attempts = 0;
    config.http.user_agent = "TestBot/1.0".to_string();
    config.output.destination = dest.display().to_string();
    config.output.history_dir = state.join("history").display().to_string();
    config.output.cache_dir = state.join("cache").display().to_string();
    config.output.overwrite = OverwritePolicy::Always;
    config.output.on_write_error = WriteFailureAction::Abort;
    config
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: impl Into<String>, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

fn confirm() -> Arc<FixedAnswer> {
    Arc::new(FixedAnswer(false))
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap_or_else(|e| panic!("{}: {}", name, e))
}

#[tokio::test]
async fn test_external_links_excluded_at_depth_one() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/index.html",
        r#"<html><body>
            <a href="/2.html">two</a>
            <a href="http://external.invalid/">elsewhere</a>
        </body></html>"#,
        1,
    )
    .await;
    mount_page(&server, "/2.html", "<html><body>two</body></html>", 1).await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let config = create_test_config(dest.path(), state.path());
    let seed = format!("{}/index.html", server.uri());

    let outcome = mirror(config, &seed, confirm()).await.unwrap();

    assert_eq!(outcome.site_map.get("/2.html"), Some("2.html"));
    assert_eq!(outcome.site_map.get(&seed), Some("index.html"));
    assert!(!outcome
        .site_map
        .iter()
        .any(|(reference, _)| reference.contains("external.invalid")));
    assert!(dest.path().join("index.html").is_file());
    assert!(dest.path().join("2.html").is_file());
    assert_eq!(outcome.stats.pages_saved, 2);

    // The saved seed now points at the local copy
    let index = read(dest.path(), "index.html");
    assert!(index.contains(r#"<a href="2.html">"#), "{}", index);
    assert!(index.contains("http://external.invalid/"));
    assert!(outcome.rewrite.is_some());
}

#[tokio::test]
async fn test_check_only_reports_missing_target() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/ok.html">ok</a><a href="/missing.html">missing</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/ok.html", "fine", 1).await;
    Mock::given(method("GET"))
        .and(path("/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let mut config = create_test_config(&dest.path().join("never-created"), state.path());
    config.crawl.check_only = true;

    let seed = format!("{}/", server.uri());
    let outcome = mirror(config, &seed, confirm()).await.unwrap();

    let missing = format!("{}/missing.html", server.uri());
    let ok = format!("{}/ok.html", server.uri());
    assert!(outcome.checks.contains(&(missing.clone(), CheckStatus::Not)));
    assert!(outcome.checks.contains(&(ok.clone(), CheckStatus::Exists)));
    assert_eq!(outcome.site_map.get(&missing), Some("Not"));
    assert!(outcome.rewrite.is_none());

    // Nothing is written in check mode
    assert!(!dest.path().join("never-created").exists());

    let mut report = Vec::new();
    write_check_report(&mut report, &outcome.checks).unwrap();
    let report = String::from_utf8(report).unwrap();
    assert!(report.contains(&format!("{} ... Not", missing)));
    assert!(report.contains(&format!("{} ... Exists", ok)));
}

#[tokio::test]
async fn test_check_only_failed_seed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let mut config = create_test_config(dest.path(), state.path());
    config.crawl.check_only = true;

    let seed = format!("{}/gone", server.uri());
    let outcome = mirror(config, &seed, confirm()).await.unwrap();

    assert_eq!(outcome.checks, vec![(seed, CheckStatus::Not)]);
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", r#"<a href="/a.html">a</a>"#, 1).await;
    mount_page(&server, "/a.html", "a", 1).await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let config = create_test_config(dest.path(), state.path());

    let outcome = mirror(config, &format!("{}/", server.uri()), confirm())
        .await
        .unwrap();

    assert_eq!(outcome.site_map.get("/a.html"), Some("a.html"));
}

#[tokio::test]
async fn test_robots_disallow_is_respected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<a href="/private/secret.html">no</a><a href="/public.html">yes</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/private/secret.html", "secret", 0).await;
    mount_page(&server, "/public.html", "public", 1).await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let config = create_test_config(dest.path(), state.path());

    let outcome = mirror(config, &format!("{}/", server.uri()), confirm())
        .await
        .unwrap();

    assert!(outcome.site_map.get("/private/secret.html").is_none());
    assert_eq!(outcome.site_map.get("/public.html"), Some("public.html"));
}

#[tokio::test]
async fn test_item_cap_limits_each_page() {
    let server = MockServer::start().await;
    let links: String = (1..=5)
        .map(|i| format!(r#"<a href="/{}.html">{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", links, 1).await;
    for i in 1..=5 {
        let expected = if i <= 2 { 1 } else { 0 };
        mount_page(&server, &format!("/{}.html", i), "page", expected).await;
    }

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let mut config = create_test_config(dest.path(), state.path());
    config.crawl.max_items = 2;

    let outcome = mirror(config, &format!("{}/", server.uri()), confirm())
        .await
        .unwrap();

    assert!(outcome.site_map.contains_reference("/1.html"));
    assert!(outcome.site_map.contains_reference("/2.html"));
    assert!(!outcome.site_map.contains_reference("/3.html"));
}

#[tokio::test]
async fn test_depth_bound() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a.html">a</a>"#, 1).await;
    mount_page(&server, "/a.html", r#"<a href="/b.html">b</a>"#, 1).await;
    mount_page(&server, "/b.html", r#"<a href="/c.html">c</a>"#, 1).await;
    mount_page(&server, "/c.html", "too deep", 0).await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let mut config = create_test_config(dest.path(), state.path());
    config.crawl.max_depth = 2;

    let outcome = mirror(config, &format!("{}/", server.uri()), confirm())
        .await
        .unwrap();

    assert_eq!(outcome.stats.levels, 2);
    assert!(dest.path().join("b.html").is_file());
    assert!(!dest.path().join("c.html").exists());
}

#[tokio::test]
async fn test_zero_depth_saves_only_the_seed() {
    let server = MockServer::start().await;
    mount_page(&server, "/start.html", r#"<a href="/a.html">a</a>"#, 1).await;
    mount_page(&server, "/a.html", "a", 0).await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let mut config = create_test_config(dest.path(), state.path());
    config.crawl.max_depth = 0;

    let outcome = mirror(config, &format!("{}/start.html", server.uri()), confirm())
        .await
        .unwrap();

    assert_eq!(outcome.site_map.len(), 1);
    assert!(dest.path().join("start.html").is_file());
}

#[tokio::test]
async fn test_requests_are_spaced_by_interval() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/a.html">a</a><a href="/b.html">b</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/a.html", "a", 1).await;
    mount_page(&server, "/b.html", "b", 1).await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let mut config = create_test_config(dest.path(), state.path());
    config.crawl.interval = 0.3;

    let started = Instant::now();
    mirror(config, &format!("{}/", server.uri()), confirm())
        .await
        .unwrap();

    // Three dispatches, two gaps
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn test_stylesheets_and_images_are_saved_and_rewritten() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/index.html",
        r#"<html><head><link rel="stylesheet" href="/css/site.css"></head>
        <body><img src="/img/logo.png"></body></html>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("body { color: black }", "text/css"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .expect(1)
        .mount(&server)
        .await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let config = create_test_config(dest.path(), state.path());

    let outcome = mirror(config, &format!("{}/index.html", server.uri()), confirm())
        .await
        .unwrap();

    assert_eq!(outcome.site_map.get("/css/site.css"), Some("styles/site.css"));
    assert_eq!(outcome.site_map.get("/img/logo.png"), Some("logo.png"));
    assert_eq!(outcome.images, vec!["logo.png".to_string()]);
    assert_eq!(
        fs::read(dest.path().join("logo.png")).unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );

    let index = read(dest.path(), "index.html");
    assert!(index.contains(r#"href="styles/site.css""#), "{}", index);
    assert!(index.contains(r#"src="logo.png""#), "{}", index);

    assert!(dest.path().join(STYLES_DIR).join(SIDECAR_FILE).is_file());
    assert!(state.path().join("cache").join("127.0.0.1").join("site.css").is_file());
}

#[tokio::test]
async fn test_cached_stylesheet_is_not_fetched_again() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<link rel="stylesheet" href="/site.css">"#,
        2,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("p {}", "text/css"))
        .expect(1)
        .mount(&server)
        .await;

    let state = TempDir::new().unwrap();
    let seed = format!("{}/", server.uri());

    let first = TempDir::new().unwrap();
    mirror(create_test_config(first.path(), state.path()), &seed, confirm())
        .await
        .unwrap();

    let second = TempDir::new().unwrap();
    let outcome = mirror(create_test_config(second.path(), state.path()), &seed, confirm())
        .await
        .unwrap();

    assert_eq!(outcome.stats.stylesheets_reused, 1);
    assert_eq!(read(second.path(), "styles/site.css"), "p {}");
}

#[tokio::test]
async fn test_history_skips_downloaded_pages() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/old.html">old</a>"#, 2).await;
    mount_page(&server, "/old.html", "old", 1).await;

    let state = TempDir::new().unwrap();
    let seed = format!("{}/", server.uri());

    let first = TempDir::new().unwrap();
    mirror(create_test_config(first.path(), state.path()), &seed, confirm())
        .await
        .unwrap();

    let second = TempDir::new().unwrap();
    let mut config = create_test_config(second.path(), state.path());
    config.crawl.skip_downloaded = true;
    let outcome = mirror(config, &seed, confirm()).await.unwrap();

    assert!(!outcome.site_map.contains_reference("/old.html"));
}

#[tokio::test]
async fn test_numbered_save_format() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a">a</a>"#, 1).await;
    mount_page(&server, "/a", "a", 1).await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    fs::write(dest.path().join("7.html"), "from an earlier run").unwrap();

    let mut config = create_test_config(dest.path(), state.path());
    config.crawl.save_format = "%(num)d.%(ext)s".to_string();

    let outcome = mirror(config, &format!("{}/", server.uri()), confirm())
        .await
        .unwrap();

    assert_eq!(outcome.site_map.get("/a"), Some("9.html"));
    assert_eq!(read(dest.path(), "7.html"), "from an earlier run");
    assert!(dest.path().join("8.html").is_file());
}

#[tokio::test]
async fn test_parallel_rewrite() {
    let server = MockServer::start().await;
    let links: String = (1..=6)
        .map(|i| format!(r#"<a href="/p{}.html">{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", links.clone(), 1).await;
    for i in 1..=6 {
        mount_page(&server, &format!("/p{}.html", i), links.clone(), 1).await;
    }

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let mut config = create_test_config(dest.path(), state.path());
    config.crawl.rewrite_workers = 4;

    let outcome = mirror(config, &format!("{}/", server.uri()), confirm())
        .await
        .unwrap();

    let summary = outcome.rewrite.unwrap();
    assert_eq!(summary.failed, 0);
    for i in 1..=6 {
        let page = read(dest.path(), &format!("p{}.html", i));
        assert!(!page.contains(r#"href="/p"#), "{}", page);
        assert!(page.contains(r#"href="p1.html""#));
    }
}

#[tokio::test]
async fn test_destination_file_aborts_before_fetching() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "never fetched", 0).await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    fs::write(&file, "x").unwrap();
    let config = create_test_config(&file, dir.path());

    let result = mirror(config, &format!("{}/", server.uri()), confirm()).await;
    assert!(matches!(result, Err(MirrorError::NotADirectory { .. })));
}

#[tokio::test]
async fn test_history_records_every_fetch() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a.html">a</a><a href="/b.html">b</a>"#, 1).await;
    mount_page(&server, "/a.html", "a", 1).await;
    Mock::given(method("GET"))
        .and(path("/b.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dest = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let config = create_test_config(dest.path(), state.path());

    let outcome = mirror(config, &format!("{}/", server.uri()), confirm())
        .await
        .unwrap();
    assert_eq!(outcome.stats.status_failures, 1);

    let history_dir = state.path().join("history");
    let file = fs::read_dir(&history_dir)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let lines = fs::read_to_string(file).unwrap();
    assert!(lines.contains(&format!("{}/a.html", server.uri())));
    assert!(lines.contains(&format!("{}/b.html", server.uri())));
    assert!(lines.lines().any(|l| l == server.uri()));
}
