//! JSON API served over a real socket, backed by a temporary repository.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use gitter_access::git::{AccessConfig, GitContext, GitRepository};
use gitter_access::routes::create_router;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {:?} failed", args);
}

fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    run_git(dir.path(), &["init", "-q"]);
    run_git(dir.path(), &["config", "user.email", "test@example.com"]);
    run_git(dir.path(), &["config", "user.name", "Test User"]);
    run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
    std::fs::write(dir.path().join("README.md"), "# Test\n").unwrap();
    run_git(dir.path(), &["add", "README.md"]);
    run_git(dir.path(), &["commit", "-q", "-m", "Initial commit"]);
    run_git(dir.path(), &["tag", "v1"]);
    dir
}

/// Minimal HTTP/1.1 client: returns status code and parsed JSON body.
async fn request(addr: &str, method: &str, path: &str, body: Option<&str>) -> (u16, Value) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let body = body.unwrap_or("");
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    let status = response[9..12].parse().unwrap();
    let json = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.trim())
        .filter(|body| !body.is_empty())
        .map(|body| serde_json::from_str(body).unwrap())
        .unwrap_or(Value::Null);
    (status, json)
}

async fn spawn_server(path: &Path) -> String {
    let context = GitContext::new(AccessConfig::default());
    let repo = Arc::new(GitRepository::open(path, context).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        axum::serve(listener, create_router(repo)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn serves_repository_tags_and_commits() {
    if !git_available() {
        return;
    }
    let dir = init_repo();
    let addr = spawn_server(dir.path()).await;

    let (status, info) = request(&addr, "GET", "/api/v1/repository", None).await;
    assert_eq!(status, 200);
    assert_eq!(info["head_commit"]["message"], "Initial commit");

    let (status, tags) = request(&addr, "GET", "/api/v1/tags", None).await;
    assert_eq!(status, 200);
    assert_eq!(tags[0]["name"], "v1");
    assert_eq!(tags[0]["tag_type"], "lightweight");

    let (status, commits) = request(&addr, "GET", "/api/v1/commits?limit=5", None).await;
    assert_eq!(status, 200);
    assert_eq!(commits.as_array().unwrap().len(), 1);

    let (status, _) = request(&addr, "GET", "/api/v1/commits/nope", None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn rejects_option_like_revisions() {
    if !git_available() {
        return;
    }
    let dir = init_repo();
    let outside = TempDir::new().unwrap();
    let target = outside.path().join("written");
    let addr = spawn_server(dir.path()).await;

    let injected = format!("--output%3D{}", target.display());
    let (status, error) =
        request(&addr, "GET", &format!("/api/v1/commits?rev={}", injected), None).await;
    assert_eq!(status, 400);
    assert!(error["error"].as_str().unwrap().contains("revision"));

    let (status, _) = request(
        &addr,
        "GET",
        &format!("/api/v1/diff?from={}&to=HEAD", injected),
        None,
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = request(&addr, "GET", "/api/v1/commits/-p", None).await;
    assert_eq!(status, 400);
    assert!(!target.exists());
}

#[tokio::test]
async fn edits_configuration() {
    if !git_available() {
        return;
    }
    let dir = init_repo();
    let addr = spawn_server(dir.path()).await;

    let (status, parameter) = request(
        &addr,
        "PUT",
        "/api/v1/config/gitter.mode",
        Some(r#"{"value":"fast"}"#),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(parameter["value"], "fast");

    let (status, parameter) = request(&addr, "GET", "/api/v1/config/gitter.mode", None).await;
    assert_eq!(status, 200);
    assert_eq!(parameter["config_file"]["scope"], "repository");

    let (status, _) = request(&addr, "DELETE", "/api/v1/config/gitter.mode", None).await;
    assert_eq!(status, 204);

    let (status, error) = request(&addr, "GET", "/api/v1/config/gitter.mode", None).await;
    assert_eq!(status, 404);
    assert!(error["error"].as_str().unwrap().contains("gitter.mode"));
}
