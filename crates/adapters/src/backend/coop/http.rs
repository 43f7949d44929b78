// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 client for coop's TCP API.
//!
//! Hand-rolled over `TcpStream` with optional bearer authentication; the
//! coop sidecar speaks plain HTTP with small JSON bodies, so a full client
//! stack buys nothing here.

use crate::backend::BackendError;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Per-request timeout.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest body excerpt carried inside a transport error.
const BODY_EXCERPT: usize = 200;

/// Parsed response: status plus raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 2xx or a typed transport error with a body excerpt.
    pub fn into_success(self) -> Result<Self, BackendError> {
        if self.is_success() {
            Ok(self)
        } else {
            let mut body = self.body;
            body.truncate(BODY_EXCERPT);
            Err(BackendError::Transport { status: self.status, body })
        }
    }

    pub fn json(&self) -> Result<serde_json::Value, BackendError> {
        serde_json::from_str(&self.body).map_err(|e| BackendError::Transport {
            status: self.status,
            body: format!("invalid JSON: {}", e),
        })
    }
}

/// Extract `host:port` from a base URL, tolerating a scheme and path.
pub(crate) fn host_of(base_url: &str) -> Result<String, BackendError> {
    let rest = base_url
        .strip_prefix("http://")
        .or_else(|| base_url.strip_prefix("ws://"))
        .unwrap_or(base_url);
    let host = rest.split('/').next().unwrap_or("");
    if host.is_empty() {
        return Err(BackendError::Connect(format!("no host in URL: {base_url:?}")));
    }
    if host.contains(':') {
        Ok(host.to_string())
    } else {
        Ok(format!("{}:80", host))
    }
}

pub(crate) async fn get(
    base_url: &str,
    path: &str,
    token: Option<&str>,
) -> Result<HttpResponse, BackendError> {
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n{}\r\n", path, auth(token));
    timed_request(base_url, &request).await
}

pub(crate) async fn post(
    base_url: &str,
    path: &str,
    body: &str,
    token: Option<&str>,
) -> Result<HttpResponse, BackendError> {
    send_with_body("POST", base_url, path, body, token).await
}

pub(crate) async fn put(
    base_url: &str,
    path: &str,
    body: &str,
    token: Option<&str>,
) -> Result<HttpResponse, BackendError> {
    send_with_body("PUT", base_url, path, body, token).await
}

async fn send_with_body(
    method: &str,
    base_url: &str,
    path: &str,
    body: &str,
    token: Option<&str>,
) -> Result<HttpResponse, BackendError> {
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\n{}Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        method,
        path,
        auth(token),
        body.len(),
        body
    );
    timed_request(base_url, &request).await
}

fn auth(token: Option<&str>) -> String {
    match token {
        Some(t) => format!("Authorization: Bearer {}\r\n", t),
        None => String::new(),
    }
}

async fn timed_request(base_url: &str, request: &str) -> Result<HttpResponse, BackendError> {
    let addr = host_of(base_url)?;
    tokio::time::timeout(HTTP_TIMEOUT, send_request(&addr, request))
        .await
        .map_err(|_| BackendError::Connect(format!("request to {} timed out", addr)))?
}

async fn send_request(addr: &str, request: &str) -> Result<HttpResponse, BackendError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| BackendError::Connect(format!("TCP connect to {} failed: {}", addr, e)))?;
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| BackendError::Connect(format!("write failed: {}", e)))?;

    let mut reader = BufReader::new(&mut stream);
    read_http_response(&mut reader).await
}

/// Read a status line, headers, and a content-length (or to-EOF) body.
pub(crate) async fn read_http_response<R>(reader: &mut R) -> Result<HttpResponse, BackendError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut status_line = String::new();
    reader
        .read_line(&mut status_line)
        .await
        .map_err(|e| BackendError::Connect(format!("read failed: {}", e)))?;
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| BackendError::Transport {
            status: 0,
            body: format!("malformed status line: {:?}", status_line.trim()),
        })?;

    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(|e| BackendError::Connect(format!("read failed: {}", e)))?;
        if n == 0 || line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok();
            }
        }
    }

    let body = match content_length {
        Some(length) => {
            let mut buf = vec![0u8; length];
            reader
                .read_exact(&mut buf)
                .await
                .map_err(|e| BackendError::Connect(format!("body read failed: {}", e)))?;
            String::from_utf8_lossy(&buf).to_string()
        }
        None => {
            let mut buf = String::new();
            reader
                .read_to_string(&mut buf)
                .await
                .map_err(|e| BackendError::Connect(format!("body read failed: {}", e)))?;
            buf
        }
    };

    Ok(HttpResponse { status, body })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
