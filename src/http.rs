//! Shared reqwest helpers for registry and worker calls.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{CoordinatorError, Result};

/// Builds an HTTP client with a request timeout.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Passes successful responses through and turns the rest into `UnexpectedStatus`.
pub async fn ensure_success(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(CoordinatorError::UnexpectedStatus {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Checks the status, then decodes the body as JSON.
pub async fn decode_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    let response = ensure_success(response, url).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// A throwaway HTTP/1.1 responder for client tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// One received request: `"METHOD /path"` and the body.
    pub(crate) type Recorded = Arc<Mutex<Vec<(String, String)>>>;

    /// Answers every request with `status` and `body`, recording what it got.
    pub(crate) async fn serve(status: &'static str, body: &'static str) -> (String, Recorded) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let recorded: Recorded = Arc::default();
        let log = recorded.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                if let Some(request) = read_request(&mut socket).await {
                    log.lock().expect("lock").push(request);
                }
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), recorded)
    }

    async fn read_request(socket: &mut TcpStream) -> Option<(String, String)> {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        let head_end = loop {
            let n = socket.read(&mut buf).await.ok()?;
            if n == 0 {
                return None;
            }
            data.extend_from_slice(&buf[..n]);
            if let Some(i) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                break i;
            }
        };

        let head = String::from_utf8_lossy(&data[..head_end]).to_string();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while data.len() < head_end + 4 + length {
            let n = socket.read(&mut buf).await.ok()?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
        }

        let mut request_line = head.lines().next()?.split_whitespace();
        let method = request_line.next()?;
        let path = request_line.next()?;
        let body = String::from_utf8_lossy(&data[head_end + 4..]).to_string();
        Some((format!("{method} {path}"), body))
    }
}
