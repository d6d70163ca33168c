use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{Result, WalletError};

const HTTP_TIMEOUT_SECS: u64 = 20;

pub fn read_json_or_text(resp: &mut ureq::http::Response<ureq::Body>) -> Value {
    let text = resp
        .body_mut()
        .read_to_string()
        .unwrap_or_else(|_| String::new());
    serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// Strip `apikey=` query values so relay URLs can be logged.
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let redacted: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key.eq_ignore_ascii_case("apikey") => format!("{key}=***"),
            _ => pair.to_string(),
        })
        .collect();
    format!("{base}?{}", redacted.join("&"))
}

/// Turn a JSON-RPC response envelope into its `result`, mapping `error`
/// objects to [`WalletError::Rpc`].
pub fn unwrap_rpc_response(body: Value) -> Result<Value> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
        let mut message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        if let Some(data) = err.get("data").filter(|d| !d.is_null()) {
            message = format!("{message} ({data})");
        }
        return Err(WalletError::Rpc { code, message });
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| WalletError::decode("RPC response missing result"))
}

/// A JSON-RPC 2.0 endpoint reached over blocking HTTP.
#[derive(Debug)]
pub struct RpcEndpoint {
    url: String,
    headers: Vec<(String, String)>,
    next_id: AtomicU64,
}

impl RpcEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.call_with_headers(method, params, &[])
    }

    pub fn call_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let result = self.call(method, params)?;
        serde_json::from_value(result)
            .map_err(|e| WalletError::decode(format!("{method} result: {e}")))
    }

    /// Same as [`call`](Self::call) with extra per-request headers, e.g. a
    /// bearer token that changes over the endpoint's lifetime.
    pub fn call_with_headers(
        &self,
        method: &str,
        params: Value,
        extra_headers: &[(&str, String)],
    ) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = ureq::post(&self.url)
            .header("content-type", "application/json")
            .config()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .http_status_as_error(false)
            .build();
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        for (name, value) in extra_headers {
            request = request.header(*name, value.as_str());
        }

        log::trace!("[Rpc] {} -> {}", method, redact_url(&self.url));
        let mut resp = request.send_json(payload).map_err(|e| WalletError::Http {
            url: redact_url(&self.url),
            detail: e.to_string(),
        })?;
        let status = resp.status().as_u16();
        let body = read_json_or_text(&mut resp);
        if status >= 400 && body.get("error").is_none() {
            return Err(WalletError::Http {
                url: redact_url(&self.url),
                detail: format!("status {status}: {body}"),
            });
        }
        unwrap_rpc_response(body)
    }
}
