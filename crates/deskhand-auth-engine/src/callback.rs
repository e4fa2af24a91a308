//! Loopback HTTP listener for the OAuth redirect.
//!
//! Google redirects the browser to `http://127.0.0.1:<port>/?code=..&state=..`
//! once the user consents. [`CallbackServer`] binds first (so that port 0
//! can be resolved into a concrete redirect URI), then waits for exactly one
//! request, answers it with a short HTML page and hands back the code.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::{AuthEngineError, Result};

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif;
               display: flex; justify-content: center; align-items: center;
               height: 100vh; margin: 0; background: #f5f5f5; color: #333; }
        .card { text-align: center; padding: 3rem; background: white;
                border-radius: 12px; box-shadow: 0 2px 10px rgba(0,0,0,0.08); }
    </style>
</head>
<body>
    <div class="card">
        <h1>{title}</h1>
        <p>{message}</p>
    </div>
</body>
</html>"#;

fn render_page(title: &str, message: &str) -> String {
    PAGE_TEMPLATE
        .replace("{title}", title)
        .replace("{message}", message)
}

/// A bound loopback listener waiting for a single OAuth redirect.
pub struct CallbackServer {
    listener: TcpListener,
    port: u16,
}

impl CallbackServer {
    /// Bind `127.0.0.1:{port}`. Port 0 lets the OS choose.
    ///
    /// # Errors
    ///
    /// Returns [`AuthEngineError::Io`] if the port cannot be bound.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "callback server listening for OAuth redirect");
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The redirect URI to register in the consent URL.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    /// Wait for the redirect and return `(code, state)`.
    ///
    /// # Errors
    ///
    /// - [`AuthEngineError::CallbackTimeout`] if nothing arrives within
    ///   `timeout_secs`.
    /// - [`AuthEngineError::FlowFailed`] if the user denied consent or the
    ///   request lacks `code`/`state`.
    pub async fn wait_for_code(self, timeout_secs: u64) -> Result<(String, String)> {
        let timeout = tokio::time::Duration::from_secs(timeout_secs);
        match tokio::time::timeout(timeout, Self::accept_one(&self.listener)).await {
            Ok(inner) => inner,
            Err(_) => Err(AuthEngineError::CallbackTimeout { timeout_secs }),
        }
    }

    async fn accept_one(listener: &TcpListener) -> Result<(String, String)> {
        let (mut stream, peer) = listener.accept().await?;
        tracing::debug!(peer = %peer, "accepted callback connection");

        // A redirect is a single small GET.
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]);

        let result = parse_callback_request(&request);

        let body = match &result {
            Ok(_) => render_page(
                "Authorization Successful",
                "You can close this tab and return to Deskhand.",
            ),
            Err(_) => render_page(
                "Authorization Failed",
                "Deskhand did not receive an authorization code. Check the terminal for details.",
            ),
        };
        let status = if result.is_ok() {
            "200 OK"
        } else {
            "400 Bad Request"
        };
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        stream.write_all(response.as_bytes()).await?;
        stream.flush().await?;

        if result.is_ok() {
            tracing::info!("callback received, authorization code extracted");
        }
        result
    }
}

/// Extract `(code, state)` from the request line of an HTTP GET.
///
/// Expected format: `GET /?code=xxx&state=yyy HTTP/1.1`
fn parse_callback_request(request: &str) -> Result<(String, String)> {
    let request_line = request
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| AuthEngineError::FlowFailed {
            reason: "empty HTTP request".to_string(),
        })?;

    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| AuthEngineError::FlowFailed {
            reason: format!("malformed HTTP request line: {request_line}"),
        })?;

    let (_, query) = target
        .split_once('?')
        .ok_or_else(|| AuthEngineError::FlowFailed {
            reason: "callback request has no query string".to_string(),
        })?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(AuthEngineError::FlowFailed {
            reason: format!("authorization server returned error: {error}"),
        });
    }

    let code = code.ok_or_else(|| AuthEngineError::FlowFailed {
        reason: "callback missing 'code' parameter".to_string(),
    })?;
    let state = state.ok_or_else(|| AuthEngineError::FlowFailed {
        reason: "callback missing 'state' parameter".to_string(),
    })?;

    Ok((code, state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_and_state() {
        let request = "GET /?state=xyz&code=4%2F0Ab&scope=a+b HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n";
        let (code, state) = parse_callback_request(request).unwrap();
        assert_eq!(code, "4/0Ab");
        assert_eq!(state, "xyz");
    }

    #[test]
    fn plus_decodes_as_space() {
        let request = "GET /?code=hello+world&state=foo HTTP/1.1\r\n\r\n";
        let (code, _) = parse_callback_request(request).unwrap();
        assert_eq!(code, "hello world");
    }

    #[test]
    fn missing_code() {
        let err = parse_callback_request("GET /?state=xyz HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(err.to_string().contains("missing 'code' parameter"));
    }

    #[test]
    fn missing_state() {
        let err = parse_callback_request("GET /?code=abc HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(err.to_string().contains("missing 'state' parameter"));
    }

    #[test]
    fn no_query() {
        let err = parse_callback_request("GET /favicon.ico HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(err.to_string().contains("no query string"));
    }

    #[test]
    fn denied_consent() {
        let err =
            parse_callback_request("GET /?error=access_denied&state=xyz HTTP/1.1\r\n\r\n")
                .unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn empty_and_malformed() {
        assert!(parse_callback_request("").is_err());
        assert!(parse_callback_request("NOTHTTP").is_err());
    }

    #[tokio::test]
    async fn bind_port_zero_resolves_redirect_uri() {
        let server = CallbackServer::bind(0).await.unwrap();
        assert_ne!(server.port(), 0);
        assert_eq!(
            server.redirect_uri(),
            format!("http://127.0.0.1:{}/", server.port())
        );
    }

    #[tokio::test]
    async fn receives_redirect() {
        let server = CallbackServer::bind(0).await.unwrap();
        let port = server.port();

        let client = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .unwrap();
            let request = format!(
                "GET /?code=test_code_42&state=test_state_99 HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n\r\n"
            );
            stream.write_all(request.as_bytes()).await.unwrap();

            let mut response = Vec::new();
            stream.read_to_end(&mut response).await.unwrap();
            String::from_utf8_lossy(&response).into_owned()
        });

        let (code, state) = server.wait_for_code(5).await.unwrap();
        let response = client.await.unwrap();

        assert_eq!(code, "test_code_42");
        assert_eq!(state, "test_state_99");
        assert!(response.contains("200 OK"));
        assert!(response.contains("Authorization Successful"));
    }

    #[tokio::test]
    async fn times_out_without_redirect() {
        let server = CallbackServer::bind(0).await.unwrap();
        let result = server.wait_for_code(1).await;
        assert!(matches!(
            result,
            Err(AuthEngineError::CallbackTimeout { timeout_secs: 1 })
        ));
    }
}
