//! HTTP request executor.
//!
//! One call in, one classified result out. The executor knows nothing about
//! credentials or retries, which is what lets the refresh call use it
//! without re-entering the client's 401 handling.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, trace};

use opsdash_core::error::{ApiError, Error, InvalidInputError, TransportError};
use opsdash_core::{ApiUrl, Body, FormPart, Method, RequestConfig, Result};

use crate::config::ClientConfig;

fn map_reqwest(err: reqwest::Error) -> Error {
    let err = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else if err.is_decode() {
        TransportError::Decode {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(err)
}

/// Performs single HTTP calls against the API base URL.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: reqwest::Client,
    base_url: ApiUrl,
}

impl RequestExecutor {
    /// Create a new executor for the configured base URL.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(map_reqwest)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Perform one call.
    ///
    /// Resolves to `Value::Null` for 204 or an empty body, the parsed JSON body for any
    /// other success, and [`Error::Api`] for a non-success status.
    #[instrument(skip(self, config), fields(api = %self.base_url, method = %config.method))]
    pub async fn execute(&self, path: &str, config: &RequestConfig) -> Result<Value> {
        let url = self.base_url.endpoint(path)?;
        debug!(path, "API request");

        let mut request = self
            .client
            .request(reqwest_method(config.method), &url)
            .headers(build_headers(config)?);

        request = match &config.body {
            Some(Body::Json(value)) => request.body(
                serde_json::to_vec(value).map_err(|e| InvalidInputError::Other {
                    message: e.to_string(),
                })?,
            ),
            Some(Body::Form(parts)) => request.multipart(build_form(parts)?),
            None => request,
        };

        let response = request.send().await.map_err(map_reqwest)?;

        self.handle_response(response).await
    }

    /// Classify a response, parsing the body or error.
    async fn handle_response(&self, response: Response) -> Result<Value> {
        let status = response.status();
        trace!(status = %status, "API response");

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        if status.is_success() {
            let bytes = response.bytes().await.map_err(map_reqwest)?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            Err(Error::Api(parse_error_response(response).await))
        }
    }
}

/// Parse a non-success response into an [`ApiError`].
async fn parse_error_response(response: Response) -> ApiError {
    let status = response.status();

    // A body that cannot be read is treated like an empty one.
    let text = response.text().await.unwrap_or_default();
    let body = if text.trim().is_empty() {
        None
    } else {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(_) => Some(Value::String(text)),
        }
    };

    let message = error_message(status, body.as_ref());
    ApiError::new(status.as_u16(), body, message)
}

/// The body's `message` field, else the status reason, else `HTTP <code>`.
fn error_message(status: StatusCode, body: Option<&Value>) -> String {
    body.and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Default headers first, caller headers last so they win.
///
/// A multipart body owns its `Content-Type` (it carries the boundary), so a
/// caller-supplied one is dropped.
fn build_headers(config: &RequestConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let multipart = config.body.as_ref().is_some_and(Body::is_multipart);
    if config.body.is_some() && !multipart {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for (name, value) in &config.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidInputError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        if multipart && header_name == CONTENT_TYPE {
            debug!(value = %value, "Ignoring Content-Type for multipart body");
            continue;
        }
        let header_value = HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

fn build_form(parts: &[FormPart]) -> Result<Form> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File {
                name,
                file_name,
                mime,
                data,
            } => {
                let mut file = Part::bytes(data.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file
                        .mime_str(mime)
                        .map_err(|e| InvalidInputError::Other {
                            message: format!("invalid MIME type '{}': {}", mime, e),
                        })?;
                }
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn executor_creation() {
        let config = ClientConfig::new(ApiUrl::new("https://ops.example.com").unwrap());
        let executor = RequestExecutor::new(&config).unwrap();
        assert!(format!("{:?}", executor).contains("ops.example.com"));
    }

    #[test]
    fn error_message_prefers_body_message() {
        let body = json!({ "message": "ticket not found" });
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, Some(&body)),
            "ticket not found"
        );
    }

    #[test]
    fn error_message_falls_back_to_status_text() {
        let body = Value::String("<html>oops</html>".into());
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, Some(&body)),
            "Bad Gateway"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, None),
            "Internal Server Error"
        );
        let non_string = json!({ "message": 42 });
        assert_eq!(
            error_message(StatusCode::CONFLICT, Some(&non_string)),
            "Conflict"
        );
    }

    #[test]
    fn error_message_for_unknown_status() {
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(error_message(status, None), "HTTP 599");
    }

    #[test]
    fn json_bodies_get_json_content_type() {
        let headers = build_headers(&RequestConfig::post(json!({ "a": 1 }))).unwrap();
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn form_bodies_leave_content_type_to_transport() {
        let config = RequestConfig::new(Method::Post).with_form(vec![FormPart::File {
            name: "attachment".into(),
            file_name: "log.txt".into(),
            mime: Some("text/plain".into()),
            data: b"hello".to_vec(),
        }]);
        let headers = build_headers(&config).unwrap();
        assert!(headers.get(CONTENT_TYPE).is_none());
        assert_eq!(headers[ACCEPT], "application/json");
    }

    #[test]
    fn caller_content_type_is_dropped_for_form_bodies() {
        let config = RequestConfig::new(Method::Post)
            .with_form(vec![FormPart::Text {
                name: "version".into(),
                value: "1.4.0".into(),
            }])
            .with_header("Content-Type", "application/json")
            .with_header("X-Request-Id", "42");
        let headers = build_headers(&config).unwrap();
        assert!(headers.get(CONTENT_TYPE).is_none());
        assert_eq!(headers["x-request-id"], "42");
    }

    #[test]
    fn caller_content_type_wins_for_json_bodies() {
        let config = RequestConfig::post(json!({ "a": 1 }))
            .with_header("content-type", "application/merge-patch+json");
        let headers = build_headers(&config).unwrap();
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(headers[CONTENT_TYPE], "application/merge-patch+json");
    }

    #[test]
    fn caller_headers_override_defaults() {
        let config = RequestConfig::get()
            .with_header("Accept", "text/csv")
            .with_header("X-Request-Id", "42");
        let headers = build_headers(&config).unwrap();
        assert_eq!(headers[ACCEPT], "text/csv");
        assert_eq!(headers["x-request-id"], "42");
    }

    #[test]
    fn invalid_header_is_an_input_error() {
        let config = RequestConfig::get().with_header("bad header", "x");
        let err = build_headers(&config).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidInput(InvalidInputError::Header { .. })
        ));
    }

    #[test]
    fn invalid_mime_is_an_input_error() {
        let parts = vec![FormPart::File {
            name: "f".into(),
            file_name: "f.bin".into(),
            mime: Some("not a mime".into()),
            data: vec![1, 2, 3],
        }];
        assert!(build_form(&parts).is_err());
    }
}
