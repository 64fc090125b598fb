//! End-to-end tests for the `oam-apiserver` binary.
//!
//! The suite writes an access policy to a temporary file, spawns the real
//! binary with the in-memory backend on a free port, and drives the
//! application lifecycle over HTTP.

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::{
    io::Write,
    net::TcpListener,
    process::{Child, Command, Stdio},
    time::Duration,
};
use tempfile::NamedTempFile;
use tokio::time::sleep;

const POLICY: &str = r#"{
    "subjects": [
        { "name": "admin", "token": "admin-token",
          "permissions": [ { "resource": "*", "actions": ["*"] } ] },
        { "name": "viewer", "token": "viewer-token",
          "permissions": [ { "resource": "application", "actions": ["detail"] } ] }
    ]
}"#;

struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

struct TestServer {
    _child: ChildGuard,
    _policy: NamedTempFile,
    base_url: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Result<Self> {
        let mut policy = NamedTempFile::new().context("create policy file")?;
        policy
            .write_all(POLICY.as_bytes())
            .context("write policy file")?;

        let port = free_port()?;
        let child = Command::new(env!("CARGO_BIN_EXE_oam-apiserver"))
            .arg("--port")
            .arg(port.to_string())
            .arg("--policy")
            .arg(policy.path())
            .env_remove("OAM_APISERVER_DSN")
            .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
            .env("OAM_APISERVER_ERROR_DETAIL", "redact")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("spawn oam-apiserver")?;

        let server = Self {
            _child: ChildGuard(child),
            _policy: policy,
            base_url: format!("http://127.0.0.1:{port}"),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()?,
        };
        server.wait_until_ready().await?;
        Ok(server)
    }

    async fn wait_until_ready(&self) -> Result<()> {
        for _ in 0..100 {
            if let Ok(response) = self.client.get(self.url("/health")).send().await {
                if response.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            sleep(Duration::from_millis(100)).await;
        }
        bail!("oam-apiserver did not become ready")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, self.url(path)).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.context("send request")?;
        let status = response.status();
        let body = response.json::<Value>().await.context("decode body")?;
        Ok((status, body))
    }
}

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

#[tokio::test]
async fn application_lifecycle_over_http() -> Result<()> {
    let server = TestServer::start().await?;
    let path = "/v1/namespaces/default/applications/web";
    let manifest = json!({
        "components": [
            { "name": "web", "type": "webservice", "properties": { "image": "nginx:1" } }
        ]
    });

    let (status, body) = server.call(reqwest::Method::GET, path, "viewer-token", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 10012);

    let dry_run = format!("{path}?dryRun=All");
    let (status, _) = server
        .call(reqwest::Method::POST, &dry_run, "admin-token", Some(&manifest))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.call(reqwest::Method::GET, path, "viewer-token", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server
        .call(reqwest::Method::POST, path, "admin-token", Some(&manifest))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = server.call(reqwest::Method::GET, path, "viewer-token", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["name"], "web");
    assert_eq!(body["spec"]["components"][0]["type"], "webservice");

    let (status, body) = server.call(reqwest::Method::DELETE, path, "viewer-token", None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 11017);

    let (status, _) = server.call(reqwest::Method::DELETE, path, "admin-token", None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.call(reqwest::Method::GET, path, "admin-token", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn health_and_openapi_are_public() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let health: Value = response.json().await?;
    assert_eq!(health["name"], "oam-apiserver");
    assert_eq!(health["backend"], "memory");

    let doc: Value = server
        .client
        .get(server.url("/openapi.json"))
        .send()
        .await?
        .json()
        .await?;
    assert!(
        doc["paths"]["/v1/namespaces/{namespace}/applications/{appname}"]["post"].is_object()
    );
    Ok(())
}
