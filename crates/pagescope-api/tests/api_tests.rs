// Pagescope
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! End-to-end tests over a real listener
//!
//! The analyzed site is a local TCP fixture and the rendering engine points at
//! a binary that does not exist, so the audit always degrades.

use pagescope_api::config::Config;
use pagescope_api::router::Router;
use pagescope_api::server::ApiServer;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const SITE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Fixture site for testing</title>
</head>
<body>
  <h1>Welcome</h1>
  <img src="logo.png">
  <p>Hello there.</p>
</body>
</html>"#;

async fn serve_site(status_line: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    SITE.len(),
                    SITE
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

async fn start_api(max_streams: usize) -> SocketAddr {
    let mut config = Config::from_lookup(|_| None);
    config.bind_address = "127.0.0.1:0".to_string();
    config.max_streams = max_streams;
    config.analysis.audit_enabled = true;
    config.analysis.audit_timeout_secs = 10;
    config.analysis.chrome_path = "/nonexistent/pagescope-chrome".into();
    config.analysis.fetch_timeout_secs = 5;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = ApiServer::with_router(listener, Router::from_config(config).unwrap());
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

/// Split an SSE body into (event, data) pairs
fn parse_events(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| {
            let mut name = String::new();
            let mut data = Value::Null;
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("event: ") {
                    name = rest.to_string();
                } else if let Some(rest) = line.strip_prefix("data: ") {
                    data = serde_json::from_str(rest).unwrap();
                }
            }
            (name, data)
        })
        .collect()
}

/// Run one analysis, returning the status, content type and parsed events
async fn analyze(api: SocketAddr, target: Option<&str>) -> (u16, String, Vec<(String, Value)>) {
    let client = reqwest::Client::new();
    let mut request = client.get(format!("http://{}/analyze", api));
    if let Some(target) = target {
        request = request.query(&[("url", target)]);
    }

    let response = request.send().await.unwrap();
    let status = response.status().as_u16();
    let content_type = response.headers().get("content-type").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    let body = response.text().await.unwrap();
    (status, content_type, parse_events(&body))
}

async fn get_json(client: &reqwest::Client, url: &str) -> Value {
    let body = client.get(url).send().await.unwrap().text().await.unwrap();
    serde_json::from_str(&body).unwrap()
}

#[tokio::test]
async fn test_full_analysis_stream() {
    let site = serve_site("200 OK").await;
    let api = start_api(8).await;

    let (status, content_type, events) = analyze(api, Some(&format!("http://{}/", site))).await;

    assert_eq!(status, 200);
    assert_eq!(content_type, "text/event-stream");

    let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names.len(), 4, "{:?}", names);
    assert!(names.contains(&"head_checks_complete"));
    assert!(names.contains(&"body_checks_complete"));
    assert!(names.contains(&"audit_complete"));
    assert_eq!(names[3], "analysis_complete");

    let total: u64 = events[..3].iter().map(|(_, data)| data["results"].as_array().unwrap().len() as u64).sum();
    assert_eq!(events[3].1["totalResults"], total);
    assert_eq!(events[3].1["message"], "All analysis complete!");

    let (_, audit) = events.iter().find(|(name, _)| name == "audit_complete").unwrap();
    assert_eq!(audit["source"], "audit");
    for category in ["performance", "accessibility", "best-practices", "seo"] {
        assert_eq!(audit["report"]["scores"][category], 0, "{}", category);
    }

    let (_, body) = events.iter().find(|(name, _)| name == "body_checks_complete").unwrap();
    let images = body["results"].as_array().unwrap().iter().find(|r| r["title"] == "Images with Alt Attributes").unwrap();
    assert_eq!(images["pass"], false);
}

#[tokio::test]
async fn test_missing_url_stream() {
    let api = start_api(8).await;

    let (status, _, events) = analyze(api, None).await;

    assert_eq!(status, 200);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "analysis_error");
    assert_eq!(events[0].1["type"], "missing_url");
}

#[tokio::test]
async fn test_target_not_found_stream() {
    let site = serve_site("404 Not Found").await;
    let api = start_api(8).await;

    let (_, _, events) = analyze(api, Some(&format!("http://{}/missing", site))).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "analysis_error");
    assert_eq!(events[0].1["type"], "not_found");
    assert_eq!(events[0].1["url"], format!("http://{}/missing", site));
}

#[tokio::test]
async fn test_unknown_route_and_health() {
    let api = start_api(8).await;
    let client = reqwest::Client::new();

    let missing = client.get(format!("http://{}/does-not-exist", api)).send().await.unwrap();
    assert_eq!(missing.status(), 404);
    assert_eq!(missing.headers()["content-type"], "application/problem+json");
    assert_eq!(missing.headers()["access-control-allow-origin"], "*");
    let problem: Value = serde_json::from_str(&missing.text().await.unwrap()).unwrap();
    assert_eq!(problem["status"], 404);

    let health = get_json(&client, &format!("http://{}/api/v1/health", api)).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["audit_enabled"], true);

    let streams = get_json(&client, &format!("http://{}/api/v1/streams", api)).await;
    assert_eq!(streams["active_streams"], 0);
    assert_eq!(streams["max_streams"], 8);
}
