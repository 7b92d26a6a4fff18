//! End-to-end crawls over temporary record trees against a wiremock server

use core::time::Duration;
use repo_census_lib::crawl::{CrawlOptions, NoProgress, run_crawl};
use repo_census_lib::github::{CallCounter, ClientSettings, CredentialPool, GitHubClient};
use repo_census_lib::records::load_record;
use repo_census_lib::{Host, run};
use serde_json::{Value, json};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Host that captures output in memory
#[derive(Debug, Default)]
struct CaptureHost {
    output: Vec<u8>,
    error: Vec<u8>,
    exit_code: Option<i32>,
}

impl Host for CaptureHost {
    fn output(&mut self) -> impl Write {
        &mut self.output
    }

    fn error(&mut self) -> impl Write {
        &mut self.error
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}

async fn mount_repo_api(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/[^/]+/[^/]+/languages$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Rust": 2048, "Python": 512})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/[^/]+/[^/]+/topics$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"names": ["crawler"]})))
        .mount(server)
        .await;

    for (endpoint, n) in [("issues", 9), ("commits", 12), ("contributors", 2)] {
        let items: Vec<Value> = (0..n).map(|i| json!({"id": i})).collect();
        Mock::given(method("GET"))
            .and(path_regex(format!(r"^/repos/[^/]+/[^/]+/{endpoint}$")))
            .respond_with(ResponseTemplate::new(200).set_body_json(items))
            .mount(server)
            .await;
    }
}

fn client(server: &MockServer) -> Arc<GitHubClient> {
    let settings = ClientSettings {
        base_url: server.uri(),
        max_retries: 1,
        retry_delay: Duration::from_millis(10),
        busy_delay: Duration::from_millis(10),
        ..ClientSettings::default()
    };

    let pool = Arc::new(CredentialPool::new(["a", "b"]).unwrap());
    Arc::new(GitHubClient::new(settings, pool, Arc::new(CallCounter::new())).unwrap())
}

fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
}

#[tokio::test]
async fn test_crawl_updates_records_on_disk() {
    let server = MockServer::start().await;
    mount_repo_api(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let fresh = dir.path().join("o").join("fresh.json");
    let partial = dir.path().join("o").join("partial.json");
    let broken = dir.path().join("p").join("broken.json");

    write_json(
        &fresh,
        &json!({
            "metadata": {
                "full_name": "o/fresh",
                "open_issues": 3,
                "issues_url": format!("{}/repos/o/fresh/issues{{/number}}", server.uri()),
                "html_url": "https://github.com/o/fresh",
            },
            "packageJson": {"name": "fresh"},
        }),
    );
    write_json(
        &partial,
        &json!({
            "metadata": {"full_name": "o/partial", "topics": ["kept"]},
            "languages": {"C": 1},
            "commits": {"total": 100},
        }),
    );
    write_json(&broken, &json!({"languages": {"C": 1}}));

    let client = client(&server);
    let options = CrawlOptions {
        concurrency: 2,
        ..CrawlOptions::default()
    };

    let stats = run_crawl(Arc::clone(&client), dir.path(), &options, &NoProgress).await.unwrap();

    assert_eq!(stats.completed, 2);
    assert_eq!(stats.written, 2);
    assert_eq!(stats.failures.len(), 1);
    assert!(stats.failures[0].path.ends_with("broken.json"));
    // 5 calls for the fresh record, 2 for the partial one
    assert_eq!(stats.calls, 7);

    let fresh_record = load_record(&fresh).unwrap();
    assert_eq!(fresh_record.languages.as_ref().unwrap().get("Rust"), Some(&2048));
    assert_eq!(fresh_record.issues.as_ref().unwrap().total, 9);
    assert_eq!(fresh_record.issues.as_ref().unwrap().open, Some(3));
    assert_eq!(fresh_record.contributors.unwrap().total, 2);
    assert_eq!(fresh_record.commits.unwrap().total, 12);
    assert_eq!(fresh_record.topics(), Some(&json!(["crawler"])));
    assert!(!fresh_record.metadata.contains_key("issues_url"));
    assert!(fresh_record.metadata.contains_key("html_url"));
    assert!(fresh_record.other.contains_key("packageJson"));

    let partial_record = load_record(&partial).unwrap();
    assert_eq!(partial_record.languages.as_ref().unwrap().get("C"), Some(&1));
    assert_eq!(partial_record.commits.unwrap().total, 100);
    assert_eq!(partial_record.topics(), Some(&json!(["kept"])));
    assert_eq!(partial_record.contributors.unwrap().total, 2);

    // Nothing left to fetch
    let again = run_crawl(Arc::clone(&client), dir.path(), &options, &NoProgress).await.unwrap();
    assert_eq!(again.calls, 0);
    assert_eq!(again.written, 0);
    assert_eq!(again.completed, 2);
}

fn write_config(dir: &Path, server: &MockServer, records: &Path) -> String {
    let config_path = dir.join("census.toml");
    fs::write(
        &config_path,
        format!(
            "records_dir = {:?}\napi_base_url = {:?}\nmax_retries = 0\nretry_delay = \"10ms\"\n",
            records.display().to_string(),
            server.uri()
        ),
    )
    .unwrap();
    config_path.display().to_string()
}

#[tokio::test]
async fn test_crawl_command_reports_summary() {
    let server = MockServer::start().await;
    mount_repo_api(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("records");
    write_json(&records.join("a.json"), &json!({"metadata": {"full_name": "o/a"}}));
    fs::write(records.join("bad.json"), "not json").unwrap();
    let config = write_config(dir.path(), &server, &records);

    let mut host = CaptureHost::default();
    run(
        &mut host,
        [
            "repo-census",
            "crawl",
            "--github-token",
            "t",
            "--config",
            config.as_str(),
            "--log-level",
            "none",
            "--error-if-failures",
        ],
    )
    .await
    .unwrap();

    let output = String::from_utf8(host.output).unwrap();
    assert!(output.contains("Processed 1 of 2 records"));
    assert!(output.contains("1 written, 1 failed"));
    assert!(String::from_utf8(host.error).unwrap().contains("bad.json"));
    assert_eq!(host.exit_code, Some(1));
}

#[tokio::test]
async fn test_update_command() {
    let server = MockServer::start().await;
    mount_repo_api(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("one.json");
    write_json(&record, &json!({"metadata": {"full_name": "o/one"}}));
    let config = write_config(dir.path(), &server, dir.path());
    let record_arg = record.display().to_string();

    let args = [
        "repo-census",
        "update",
        record_arg.as_str(),
        "--github-token",
        "t",
        "-c",
        config.as_str(),
        "--log-level",
        "none",
    ];

    let mut host = CaptureHost::default();
    run(&mut host, args).await.unwrap();
    assert!(String::from_utf8(host.output).unwrap().starts_with("Updated"));

    let mut host = CaptureHost::default();
    run(&mut host, args).await.unwrap();
    assert!(String::from_utf8(host.output).unwrap().contains("already up to date"));
}

#[tokio::test]
async fn test_count_command() {
    let server = MockServer::start().await;
    mount_repo_api(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server, dir.path());

    let mut host = CaptureHost::default();
    run(
        &mut host,
        [
            "repo-census",
            "count",
            "o/r",
            "commits",
            "--github-token",
            "t",
            "-c",
            config.as_str(),
            "--log-level",
            "none",
        ],
    )
    .await
    .unwrap();

    assert_eq!(String::from_utf8(host.output).unwrap(), "12\n");
}

#[tokio::test]
async fn test_network_command_requires_a_token() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("census.toml");
    fs::write(&config_path, "").unwrap();
    let config = config_path.display().to_string();

    // An explicit flag takes precedence over GITHUB_TOKENS, so the environment cannot supply one
    let mut host = CaptureHost::default();
    let err = run(
        &mut host,
        [
            "repo-census",
            "count",
            "o/r",
            "issues",
            "--github-token=",
            "-c",
            config.as_str(),
            "--log-level",
            "none",
        ],
    )
    .await
    .unwrap_err();

    assert!(format!("{err:#}").contains("no GitHub API tokens"));
    assert!(host.output.is_empty());
}
