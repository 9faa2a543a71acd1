use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use thiserror::Error;

const JSON_MEDIA_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("reading response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(StatusCode),
    #[error(transparent)]
    MediaType(#[from] MediaTypeError),
    #[error("decoding JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("media type not set")]
    Missing,
    #[error("invalid media type '{0}'")]
    Invalid(String),
    #[error("media type is '{0}', 'application/json' expected")]
    Unexpected(String),
}

/// A completed HTTP exchange with its body fully read.
#[derive(Debug, Clone)]
pub struct ResponseData {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ResponseData {
    fn ensure_ok(&self) -> Result<(), FetchError> {
        if self.status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus(self.status));
        }
        Ok(())
    }

    /// Decodes a 200 `application/json` body.
    pub fn into_json(self) -> Result<Value, FetchError> {
        self.ensure_ok()?;
        let media_type = media_type(self.content_type.as_deref())?;
        if media_type != JSON_MEDIA_TYPE {
            return Err(MediaTypeError::Unexpected(media_type).into());
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Returns a 200 body byte for byte, whatever its media type.
    pub fn into_bytes(self) -> Result<Vec<u8>, FetchError> {
        self.ensure_ok()?;
        Ok(self.body)
    }
}

/// Parses a `Content-Type` value and returns its lowercased media type.
///
/// Parameters are checked for `attribute=value` syntax, where the value is a
/// token or a quoted string, and then dropped. A single trailing `;` is
/// tolerated.
pub fn media_type(content_type: Option<&str>) -> Result<String, MediaTypeError> {
    let value = content_type.unwrap_or_default();
    let (essence, params) = value.split_at(value.find(';').unwrap_or(value.len()));
    let essence = essence.trim();
    if essence.is_empty() {
        return Err(MediaTypeError::Missing);
    }

    match essence.split_once('/') {
        Some((kind, subtype)) if is_token(kind) && is_token(subtype) => {}
        _ => return Err(MediaTypeError::Invalid(essence.to_string())),
    }
    if !valid_params(params) {
        return Err(MediaTypeError::Invalid(value.trim().to_string()));
    }
    Ok(essence.to_ascii_lowercase())
}

fn valid_params(mut rest: &str) -> bool {
    let mut seen: Vec<String> = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return true;
        }
        let Some(param) = rest.strip_prefix(';') else {
            return false;
        };
        let param = param.trim_start();
        if param.is_empty() {
            return true;
        }

        let (attribute, after) = split_token(param);
        if attribute.is_empty() {
            return false;
        }
        let attribute = attribute.to_ascii_lowercase();
        if seen.contains(&attribute) {
            return false;
        }
        seen.push(attribute);

        let Some(after) = after.trim_start().strip_prefix('=') else {
            return false;
        };
        match param_value(after.trim_start()) {
            Some(remaining) => rest = remaining,
            None => return false,
        }
    }
}

/// Consumes a token or quoted-string value, returning what follows it.
fn param_value(s: &str) -> Option<&str> {
    if let Some(quoted) = s.strip_prefix('"') {
        let mut escaped = false;
        for (i, c) in quoted.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return Some(&quoted[i + 1..]),
                _ => {}
            }
        }
        return None;
    }
    let (token, rest) = split_token(s);
    (!token.is_empty()).then_some(rest)
}

fn split_token(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !is_token_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

// RFC 2045 token: printable ASCII minus tspecials.
fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    trace: bool,
}

impl ApiClient {
    pub fn new(trace: bool) -> Result<Self> {
        let http = Client::builder()
            .user_agent(HeaderValue::from_static(concat!(
                "elastic/",
                env!("CARGO_PKG_VERSION")
            )))
            .build()
            .context("building HTTP client")?;

        Ok(Self { http, trace })
    }

    /// Issues one GET and reads the whole body. Non-2xx statuses are returned,
    /// not treated as errors.
    pub fn fetch(&self, url: &str) -> Result<ResponseData, FetchError> {
        if self.trace {
            eprintln!("GET: {url}");
        }
        tracing::debug!(url, "sending request");

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })?
            .to_vec();
        tracing::debug!(%status, bytes = body.len(), "received response");

        Ok(ResponseData {
            status,
            content_type,
            body,
        })
    }

    pub fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.fetch(url)?.into_json()
    }

    pub fn get_raw(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch(url)?.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client() -> ApiClient {
        ApiClient::new(false).unwrap()
    }

    #[test]
    fn decodes_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/_cluster/health");
            then.status(200)
                .header("content-type", "application/json; charset=UTF-8")
                .body(r#"{"status":"green","number_of_nodes":3}"#);
        });

        let value = client()
            .get_json(&server.url("/_cluster/health"))
            .unwrap();

        mock.assert();
        assert_eq!(value, json!({"status": "green", "number_of_nodes": 3}));
    }

    #[test]
    fn non_200_fails_both_paths() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404)
                .header("content-type", "application/json")
                .body(r#"{"error":"not found"}"#);
        });

        let url = server.url("/missing");
        let json_err = client().get_json(&url).unwrap_err();
        assert!(matches!(json_err, FetchError::UnexpectedStatus(s) if s == StatusCode::NOT_FOUND));
        assert!(json_err.to_string().contains("404"));

        let raw_err = client().get_raw(&url).unwrap_err();
        assert_eq!(raw_err.to_string(), "unexpected status code: 404 Not Found");
    }

    #[test]
    fn created_is_not_ok() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(201).header("content-type", "application/json").body("{}");
        });
        let err = client().get_json(&server.url("/")).unwrap_err();
        assert!(err.to_string().contains("201"));
    }

    #[test]
    fn text_plain_is_raw_only() {
        let server = MockServer::start();
        let body = "health status index\ngreen open logs\n";
        server.mock(|when, then| {
            when.method(GET).path("/_cat/indices").query_param_exists("v");
            then.status(200).header("content-type", "text/plain; charset=UTF-8").body(body);
        });

        let url = server.url("/_cat/indices?v");
        let err = client().get_json(&url).unwrap_err();
        assert!(matches!(
            err,
            FetchError::MediaType(MediaTypeError::Unexpected(ref m)) if m == "text/plain"
        ));
        assert_eq!(client().get_raw(&url).unwrap(), body.as_bytes());
    }

    #[test]
    fn missing_content_type_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bare");
            then.status(200).body("{}");
        });
        let err = client().get_json(&server.url("/bare")).unwrap_err();
        assert!(matches!(err, FetchError::MediaType(MediaTypeError::Missing)));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"status": "gre"#);
        });
        let err = client().get_json(&server.url("/broken")).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn connection_failure_is_transport_error() {
        let err = client().get_raw("http://127.0.0.1:1/").unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
        assert!(err.to_string().contains("http://127.0.0.1:1/"));
    }

    #[test]
    fn parses_media_types() {
        assert_eq!(
            media_type(Some("Application/JSON; charset=utf-8")).unwrap(),
            "application/json"
        );
        assert_eq!(media_type(Some(" text/plain ")).unwrap(), "text/plain");
        assert_eq!(media_type(None), Err(MediaTypeError::Missing));
        assert_eq!(media_type(Some("")), Err(MediaTypeError::Missing));
        assert_eq!(media_type(Some("; charset=utf-8")), Err(MediaTypeError::Missing));
        assert_eq!(
            media_type(Some("json")),
            Err(MediaTypeError::Invalid("json".into()))
        );
        assert_eq!(
            media_type(Some("application/")),
            Err(MediaTypeError::Invalid("application/".into()))
        );
    }

    #[test]
    fn checks_media_type_parameters() {
        for ok in [
            "application/json;",
            "application/json ; charset = utf-8",
            "application/json; charset=utf-8; compatible-with=8",
            r#"application/json; profile="a;b \"c\"""#,
        ] {
            assert_eq!(media_type(Some(ok)).unwrap(), "application/json", "{ok}");
        }
        for bad in [
            "application/json; charset",
            "application/json; charset=",
            "application/json; =utf-8",
            "application/json; ;",
            "application/json; charset=utf-8 extra",
            "application/json; charset=a; Charset=b",
            r#"application/json; profile="unterminated"#,
        ] {
            assert_eq!(
                media_type(Some(bad)),
                Err(MediaTypeError::Invalid(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn raw_body_keeps_invalid_utf8() {
        let response = ResponseData {
            status: StatusCode::OK,
            content_type: Some("text/plain".into()),
            body: vec![b'a', 0xff, b'b'],
        };
        assert_eq!(response.into_bytes().unwrap(), vec![b'a', 0xff, b'b']);
    }

    #[test]
    fn classifier_works_on_read_responses() {
        let response = ResponseData {
            status: StatusCode::OK,
            content_type: Some("application/json".into()),
            body: br#"[1, "two", null]"#.to_vec(),
        };
        assert_eq!(response.into_json().unwrap(), json!([1, "two", null]));

        let failed = ResponseData {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            content_type: Some("text/plain".into()),
            body: b"boom".to_vec(),
        };
        assert_eq!(
            failed.into_bytes().unwrap_err().to_string(),
            "unexpected status code: 500 Internal Server Error"
        );
    }
}
