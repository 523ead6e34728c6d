//! OAuth callback server for browser-based sign-in.
//!
//! The sign-in page redirects the browser back to a short-lived local HTTP
//! listener with the session tokens in the query string. The listener
//! captures exactly one callback and shuts down.

use crate::{AuthError, AuthResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Default callback port.
pub const DEFAULT_CALLBACK_PORT: u16 = 8417;

/// Default callback timeout in seconds.
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 180;

/// Outcome of the OAuth round trip.
#[derive(Debug, Clone)]
pub enum CallbackResult {
    /// The provider redirected back with a full token set.
    Tokens {
        access_token: String,
        refresh_token: String,
        user_id: String,
        email: Option<String>,
        expires_in: i64,
    },
    /// The provider reported an error, or the redirect was malformed.
    Failed(String),
}

/// Local HTTP listener that captures the sign-in redirect.
pub struct CallbackServer {
    port: u16,
    timeout_secs: u64,
}

impl CallbackServer {
    /// Create a new callback server.
    pub fn new(port: u16, timeout_secs: u64) -> Self {
        Self { port, timeout_secs }
    }

    /// Create with default settings.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT_SECS)
    }

    /// The redirect target the provider must send the browser back to.
    pub fn callback_url(&self) -> String {
        format!("http://localhost:{}/callback", self.port)
    }

    /// The provider sign-in URL to open in the browser.
    pub fn sign_in_url(&self, api_url: &str, provider: &str) -> String {
        let redirect: String =
            url::form_urlencoded::byte_serialize(self.callback_url().as_bytes()).collect();
        format!(
            "{}/auth/v1/authorize?provider={}&redirect_to={}",
            api_url, provider, redirect
        )
    }

    /// Listen for one callback and return its outcome.
    ///
    /// Binds the local port, waits up to the configured timeout for the
    /// redirect, answers the browser with a small HTML page, and tears the
    /// listener down. The caller is responsible for opening the browser.
    pub async fn wait_for_callback(&self) -> AuthResult<CallbackResult> {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AuthError::OAuth(format!("Failed to bind {}: {}", addr, e)))?;

        info!(port = self.port, "OAuth callback server listening");

        let (tx, rx) = oneshot::channel::<CallbackResult>();
        let tx = Arc::new(tokio::sync::Mutex::new(Some(tx)));

        let accept_task = tokio::spawn({
            let tx = tx.clone();
            async move {
                loop {
                    match listener.accept().await {
                        Ok((mut socket, _)) => {
                            let tx = tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(&mut socket, tx).await {
                                    error!(error = %e, "Callback connection failed");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept failed");
                            break;
                        }
                    }
                }
            }
        });

        let timeout = tokio::time::Duration::from_secs(self.timeout_secs);
        let result = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => CallbackResult::Failed("Callback channel closed".to_string()),
            Err(_) => CallbackResult::Failed("Sign-in timed out".to_string()),
        };

        accept_task.abort();
        Ok(result)
    }
}

/// Handle one incoming HTTP connection on the callback port.
async fn handle_connection(
    socket: &mut tokio::net::TcpStream,
    tx: Arc<tokio::sync::Mutex<Option<oneshot::Sender<CallbackResult>>>>,
) -> AuthResult<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    debug!(request = %request_line.trim(), "Callback request");

    let Some(path) = request_path(&request_line) else {
        respond(&mut writer, 405, "Method Not Allowed", "Method Not Allowed").await?;
        return Ok(());
    };

    if !path.starts_with("/callback") {
        respond(&mut writer, 404, "Not Found", "Not Found").await?;
        return Ok(());
    }

    let query = path.split_once('?').map(|(_, q)| q).unwrap_or("");
    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    let result = match parse_callback(&params) {
        CallbackResult::Failed(reason) => {
            respond(&mut writer, 200, "OK", &failure_page(&reason)).await?;
            CallbackResult::Failed(reason)
        }
        tokens => {
            respond(&mut writer, 200, "OK", SUCCESS_PAGE).await?;
            tokens
        }
    };

    if let Some(tx) = tx.lock().await.take() {
        let _ = tx.send(result);
    }

    Ok(())
}

/// Extract the request path from a `GET <path> HTTP/1.1` request line.
fn request_path(request_line: &str) -> Option<&str> {
    let rest = request_line.strip_prefix("GET ")?;
    let end = rest.find(" HTTP/").unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Interpret the callback query parameters.
fn parse_callback(params: &HashMap<String, String>) -> CallbackResult {
    if let Some(err) = params.get("error") {
        return CallbackResult::Failed(err.clone());
    }

    match (
        params.get("access_token"),
        params.get("refresh_token"),
        params.get("user_id"),
    ) {
        (Some(access), Some(refresh), Some(uid)) => CallbackResult::Tokens {
            access_token: access.clone(),
            refresh_token: refresh.clone(),
            user_id: uid.clone(),
            email: params.get("email").cloned(),
            expires_in: params
                .get("expires_in")
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
        },
        _ => CallbackResult::Failed("Missing required parameters".to_string()),
    }
}

async fn respond(
    writer: &mut tokio::net::tcp::WriteHalf<'_>,
    status_code: u16,
    status_text: &str,
    body: &str,
) -> AuthResult<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_code,
        status_text,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

const SUCCESS_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>Linkstash - Signed In</title></head>\
<body style=\"font-family: system-ui; text-align: center; padding: 48px;\">\
<h1>Signed in</h1>\
<p>You can close this window and return to the terminal.</p>\
</body></html>";

fn failure_page(reason: &str) -> String {
    format!(
        "<!DOCTYPE html>\
<html><head><title>Linkstash - Sign In Failed</title></head>\
<body style=\"font-family: system-ui; text-align: center; padding: 48px;\">\
<h1>Sign in failed</h1>\
<p>{}</p>\
<p>You can close this window and try again.</p>\
</body></html>",
        reason
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_url_uses_configured_port() {
        let server = CallbackServer::new(8417, 180);
        assert_eq!(server.callback_url(), "http://localhost:8417/callback");
    }

    #[test]
    fn sign_in_url_encodes_redirect() {
        let server = CallbackServer::with_defaults();
        let url = server.sign_in_url("https://xyz.supabase.co", "github");
        assert!(url.starts_with("https://xyz.supabase.co/auth/v1/authorize?provider=github"));
        assert!(url.contains("redirect_to=http%3A%2F%2Flocalhost%3A8417%2Fcallback"));
    }

    #[test]
    fn request_path_parses_get_lines() {
        assert_eq!(
            request_path("GET /callback?a=1 HTTP/1.1\r\n"),
            Some("/callback?a=1")
        );
        assert_eq!(request_path("POST /callback HTTP/1.1\r\n"), None);
    }

    #[test]
    fn parse_callback_with_full_token_set() {
        let params: HashMap<String, String> = [
            ("access_token", "at"),
            ("refresh_token", "rt"),
            ("user_id", "u1"),
            ("email", "u@example.com"),
            ("expires_in", "7200"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        match parse_callback(&params) {
            CallbackResult::Tokens {
                access_token,
                refresh_token,
                user_id,
                email,
                expires_in,
            } => {
                assert_eq!(access_token, "at");
                assert_eq!(refresh_token, "rt");
                assert_eq!(user_id, "u1");
                assert_eq!(email.as_deref(), Some("u@example.com"));
                assert_eq!(expires_in, 7200);
            }
            CallbackResult::Failed(reason) => panic!("unexpected failure: {}", reason),
        }
    }

    #[test]
    fn parse_callback_provider_error_wins() {
        let params: HashMap<String, String> =
            [("error", "access_denied"), ("access_token", "at")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();

        match parse_callback(&params) {
            CallbackResult::Failed(reason) => assert_eq!(reason, "access_denied"),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn parse_callback_missing_tokens_fails() {
        let params: HashMap<String, String> = [("access_token", "at")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert!(matches!(
            parse_callback(&params),
            CallbackResult::Failed(_)
        ));
    }

    #[test]
    fn parse_callback_defaults_expires_in() {
        let params: HashMap<String, String> = [
            ("access_token", "at"),
            ("refresh_token", "rt"),
            ("user_id", "u1"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        match parse_callback(&params) {
            CallbackResult::Tokens { expires_in, email, .. } => {
                assert_eq!(expires_in, 3600);
                assert!(email.is_none());
            }
            CallbackResult::Failed(reason) => panic!("unexpected failure: {}", reason),
        }
    }
}
