use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_TYPE;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;
use std::str::FromStr;
use tracing::warn;

pub const APPLICATION_JSON: &str = "application/json";

/// Builds a fully materialized `Response<Full<Bytes>>`.
///
/// Headers are inserted in call order, so a later header with the same name
/// replaces an earlier one.
pub struct ResponseBuilder {
    status: StatusCode,
    body: Bytes,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn new(status_code: StatusCode) -> Self {
        ResponseBuilder {
            status: status_code,
            body: Bytes::new(),
            headers: Default::default(),
        }
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the body and default the content type to JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Bytes::from(bytes);
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
            }
            Err(e) => {
                warn!("Failed to serialize response body: {}", e);
                self.status = StatusCode::INTERNAL_SERVER_ERROR;
            }
        }
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!("Skipping invalid response header '{}'", name),
        }
        self
    }

    /// Insert every header from `headers` in iteration order.
    pub fn headers<'a, I>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        headers
            .into_iter()
            .fold(self, |builder, (name, value)| builder.header(name, value))
    }

    /// Append a relayed header map as-is, keeping repeated values.
    pub fn relay_headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.append(name.clone(), value.clone());
        }
        self
    }

    pub fn build_full(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
