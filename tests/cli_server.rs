use assert_cmd::cargo::{cargo_bin_cmd, CommandCargoExt};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;

const FIXTURE: &str = "tests/fixtures/channels.json";

struct TestDaemon {
    base_url: String,
    child: Child,
}

impl TestDaemon {
    fn spawn() -> Self {
        Self::spawn_with(&[])
    }

    fn spawn_with(extra_args: &[&str]) -> Self {
        // Bind an ephemeral port first so we know which port to pass
        // to `chanlist serve`.
        let listener =
            TcpListener::bind("127.0.0.1:0").expect("bind ephemeral TCP listener for daemon");
        let port = listener
            .local_addr()
            .expect("local_addr for daemon listener")
            .port();
        drop(listener);

        let addr_arg = format!("127.0.0.1:{port}");
        let base_url = format!("http://{addr_arg}");

        let log_dir = std::env::temp_dir();
        let stdout_file = std::fs::File::create(log_dir.join(format!("chanlist_{port}_stdout.log")))
            .expect("create daemon stdout log file");
        let stderr_file = std::fs::File::create(log_dir.join(format!("chanlist_{port}_stderr.log")))
            .expect("create daemon stderr log file");

        let mut cmd = Command::cargo_bin("chanlist").expect("locate chanlist binary");
        cmd.args(["serve", "--addr", &addr_arg, "--data", FIXTURE])
            .args(extra_args)
            .stdout(stdout_file)
            .stderr(stderr_file);
        let child = cmd.spawn().expect("spawn chanlist serve daemon");

        wait_for_health(&base_url);

        Self { base_url, child }
    }

    fn channels_url(&self) -> String {
        format!("{}/api/channels", self.base_url)
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn wait_for_health(base_url: &str) {
    let client = Client::new();
    let url = format!("{}/api/health", base_url);

    let mut last_err = None;
    for _ in 0..150 {
        match client.get(&url).send() {
            Ok(resp) if resp.status().is_success() => return,
            Err(e) => {
                last_err = Some(format!("HTTP error: {}", e));
                thread::sleep(Duration::from_millis(100));
            }
            Ok(resp) => {
                last_err = Some(format!("unexpected status: {}", resp.status()));
                thread::sleep(Duration::from_millis(100));
            }
        }
    }

    panic!(
        "chanlist HTTP daemon did not become healthy in time. Last error: {}",
        last_err.unwrap_or_else(|| "unknown".to_string())
    );
}

fn ids(value: &Value) -> Vec<i64> {
    value["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|c| c["id"].as_i64().expect("id"))
        .collect()
}

#[test]
fn health_endpoint_reports_catalog_size() {
    let daemon = TestDaemon::spawn();
    let resp = Client::new()
        .get(format!("{}/api/health", daemon.base_url))
        .send()
        .expect("health response");
    assert!(resp.status().is_success());

    let value: Value = resp.json().expect("valid health JSON body");
    assert_eq!(value["status"], "ok");
    assert_eq!(value["channels"], 25);
}

#[test]
fn channels_endpoint_filters_sorts_and_paginates() {
    let daemon = TestDaemon::spawn();
    let client = Client::new();

    let value: Value = client
        .post(daemon.channels_url())
        .json(&json!({
            "channelCountry": ["US", "FR"],
            "sort": { "views": -1 },
            "limit": 3
        }))
        .send()
        .expect("channels response")
        .json()
        .expect("valid JSON body");

    assert_eq!(value["total"], 15);
    assert_eq!(ids(&value), vec![18, 4, 15]);
}

#[test]
fn channels_endpoint_accepts_empty_body() {
    let daemon = TestDaemon::spawn();
    let resp = Client::new()
        .post(daemon.channels_url())
        .send()
        .expect("channels response");
    assert!(resp.status().is_success());

    let value: Value = resp.json().expect("valid JSON body");
    assert_eq!(value["total"], 24);
    assert_eq!(value["data"].as_array().expect("data").len(), 16);
}

#[test]
fn channels_endpoint_rejects_malformed_json() {
    let daemon = TestDaemon::spawn();
    let resp = Client::new()
        .post(daemon.channels_url())
        .header("content-type", "application/json")
        .body("{\"search\": ")
        .send()
        .expect("channels response");

    assert_eq!(resp.status().as_u16(), 400);
    let value: Value = resp.json().expect("JSON error body");
    assert!(value["error"].is_string());
}

#[test]
fn channels_endpoint_allows_any_origin() {
    let daemon = TestDaemon::spawn();
    let resp = Client::new()
        .post(daemon.channels_url())
        .header("origin", "http://example.test")
        .json(&json!({}))
        .send()
        .expect("channels response");

    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[test]
fn strict_daemon_rejects_uncoercible_fields() {
    let daemon = TestDaemon::spawn_with(&["--strict"]);
    let client = Client::new();

    let resp = client
        .post(daemon.channels_url())
        .json(&json!({ "viewsFrom": "many" }))
        .send()
        .expect("channels response");
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client
        .post(daemon.channels_url())
        .json(&json!({ "search": "alpha" }))
        .send()
        .expect("channels response");
    assert!(resp.status().is_success());
}

#[test]
fn cli_query_via_server_matches_local_query() {
    let daemon = TestDaemon::spawn();
    let query_args = [
        "query",
        "--search",
        "a",
        "--sort",
        "name",
        "--order",
        "desc",
        "--limit",
        "5",
        "--page",
        "2",
        "--format",
        "json",
    ];

    let mut local_cmd = cargo_bin_cmd!("chanlist");
    local_cmd.env_remove("CHANLIST_SERVER_URL");
    local_cmd.args(query_args).args(["--data", FIXTURE]);
    let local_assert = local_cmd.assert().success();
    let local_value: Value =
        serde_json::from_slice(&local_assert.get_output().stdout).expect("valid local json");

    let mut server_cmd = cargo_bin_cmd!("chanlist");
    server_cmd.args(query_args).args(["--server", &daemon.base_url]);
    let server_assert = server_cmd.assert().success();
    let server_value: Value =
        serde_json::from_slice(&server_assert.get_output().stdout).expect("valid server json");

    assert_eq!(
        local_value, server_value,
        "daemon-backed query should match local CLI query"
    );
}

#[test]
fn serve_fails_fast_when_catalog_is_missing() {
    let mut cmd = cargo_bin_cmd!("chanlist");
    cmd.args([
        "serve",
        "--addr",
        "127.0.0.1:0",
        "--data",
        "tests/fixtures/does-not-exist.json",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("failed to read catalog file"));
}
