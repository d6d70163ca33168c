use super::{log_auth_result, AuthResult};
use crate::error::{Result, WalletError};
use futures_lite::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use smol::net::TcpListener;
use std::time::Duration;

const CALLBACK_TIMEOUT_SECS: u64 = 120;
const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Run the browser callback auth flow.
/// Binds a local TCP server, opens the hosted login page, waits for the POST
/// callback carrying `expected_state`. `page_params` are appended to the page
/// URL alongside the callback address.
pub async fn run_auth_callback_server(
    auth_page_url: &str,
    page_params: &[(&str, String)],
    expected_state: &str,
) -> Result<AuthResult> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    log::info!("[Auth] callback server on port {}", port);

    let callback_url = format!("http://127.0.0.1:{port}/callback");
    let auth_url = build_auth_url(auth_page_url, &callback_url, expected_state, page_params);

    log::info!("[Auth] opening browser to: {}", auth_page_url);
    open::that(&auth_url).map_err(|e| WalletError::Auth(format!("failed to open browser: {e}")))?;

    let expected_state = expected_state.to_string();
    smol::future::race(handle_auth_callback(listener, expected_state), async {
        smol::Timer::after(Duration::from_secs(CALLBACK_TIMEOUT_SECS)).await;
        Err(WalletError::Auth(
            "authentication timed out after 2 minutes".to_string(),
        ))
    })
    .await
}

fn build_auth_url(
    auth_page_url: &str,
    callback_url: &str,
    state: &str,
    page_params: &[(&str, String)],
) -> String {
    let separator = if auth_page_url.contains('?') { '&' } else { '?' };
    let mut url = format!(
        "{}{}callback={}&state={}",
        auth_page_url,
        separator,
        urlencoding::encode(callback_url),
        urlencoding::encode(state)
    );
    for (key, value) in page_params {
        url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
    }
    url
}

async fn handle_auth_callback(listener: TcpListener, expected_state: String) -> Result<AuthResult> {
    loop {
        let (mut stream, _) = listener.accept().await?;

        let request = match read_request(&mut stream).await {
            Ok(request) => request,
            Err(err) => {
                log::warn!("[Auth] dropping callback connection: {}", err);
                continue;
            }
        };
        log::info!(
            "[Auth] received callback: {}",
            request.lines().next().unwrap_or("")
        );

        if request.starts_with("OPTIONS") {
            let response = build_cors_preflight();
            let _ = stream.write_all(response.as_bytes()).await;
            continue;
        }

        if !request.starts_with("POST") {
            let response =
                "HTTP/1.1 404 Not Found\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
            let _ = stream.write_all(response.as_bytes()).await;
            continue;
        }

        let Some(result) = parse_callback(&request) else {
            log::error!("[Auth] failed to parse callback body");
            let response = build_json_response(false);
            let _ = stream.write_all(response.as_bytes()).await;
            continue;
        };

        if result.callback_state.as_deref() != Some(expected_state.as_str()) {
            log::warn!("[Auth] ignoring callback with mismatched state");
            let response = build_json_response(false);
            let _ = stream.write_all(response.as_bytes()).await;
            continue;
        }

        log_auth_result("Parsed callback", &result);
        let response = build_json_response(true);
        let _ = stream.write_all(response.as_bytes()).await;

        if let Some(err) = result.error.clone() {
            return Err(WalletError::Auth(err));
        }
        return Ok(result);
    }
}

/// Read one HTTP request: headers, then `Content-Length` bytes of body.
/// Headers and body may arrive in separate segments.
async fn read_request<R: AsyncRead + Unpin>(stream: &mut R) -> Result<String> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
        if request_complete(&request) {
            break;
        }
        if request.len() > MAX_REQUEST_BYTES {
            return Err(WalletError::Auth(format!(
                "callback request exceeds {MAX_REQUEST_BYTES} bytes"
            )));
        }
    }
    Ok(String::from_utf8_lossy(&request).into_owned())
}

fn request_complete(request: &[u8]) -> bool {
    let Some(header_end) = header_end(request) else {
        return false;
    };
    let headers = String::from_utf8_lossy(&request[..header_end]);
    let content_length = headers
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() - header_end >= content_length
}

/// Offset just past the blank line ending the headers.
fn header_end(request: &[u8]) -> Option<usize> {
    request
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4)
        .or_else(|| request.windows(2).position(|w| w == b"\n\n").map(|i| i + 2))
}

fn parse_callback(request: &str) -> Option<AuthResult> {
    let first_line = request.lines().next()?;
    if !first_line.starts_with("POST /callback") {
        return None;
    }

    let body = if let Some(body_start) = request.find("\r\n\r\n") {
        &request[body_start + 4..]
    } else {
        let body_start = request.find("\n\n")?;
        &request[body_start + 2..]
    };
    serde_json::from_str(body.trim()).ok()
}

fn build_cors_preflight() -> String {
    "HTTP/1.1 204 No Content\r\n\
     Access-Control-Allow-Origin: *\r\n\
     Access-Control-Allow-Methods: POST, OPTIONS\r\n\
     Access-Control-Allow-Headers: Content-Type\r\n\
     Access-Control-Max-Age: 86400\r\n\
     Connection: close\r\n\r\n"
        .to_string()
}

fn build_json_response(success: bool) -> String {
    let body = if success {
        r#"{"ok":true}"#
    } else {
        r#"{"ok":false}"#
    };

    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Connection: close\r\n\
         Content-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}
