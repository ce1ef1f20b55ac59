//! Inbound request abstraction handed to the dispatcher by the hosting layer.

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::{HeaderMap, Method, Request, Uri};
use std::collections::HashMap;

/// A fully materialized inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Opaque request body. Empty when the client sent none.
    pub body: Bytes,
}

impl InboundRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Collect a hyper request's body and capture its parts.
    pub async fn from_hyper<B>(req: Request<B>) -> Result<Self, B::Error>
    where
        B: Body,
    {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        })
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw query string, exactly as received.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Query parameters flattened to a single value per name.
    pub fn query_params(&self) -> HashMap<String, String> {
        first_value_query_params(self.query().unwrap_or(""))
    }
}

/// Parse a query string keeping only the first value for each name.
///
/// `?tag=a&tag=b` yields `tag -> a`. A name without `=` maps to an empty
/// value. Names and values are percent-decoded, with `+` read as a space.
pub fn first_value_query_params(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        params.entry(key).or_insert_with(|| decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
