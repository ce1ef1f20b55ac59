//! Path templates with named segments, e.g. `/api/product/{id}`.
//!
//! A template is split on `/` into segments; each segment is either a literal
//! or a whole-segment `{name}` capture. One leading and one trailing slash are
//! ignored; any other empty segment is significant, so `/api//product` does
//! not match `/api/product`.

use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        for part in split_segments(raw) {
            if part.is_empty() {
                return Err(format!("empty segment in '{raw}'"));
            }
            if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if inner.is_empty() {
                    return Err(format!("empty parameter name in '{raw}'"));
                }
                if inner.contains(['{', '}']) {
                    return Err(format!("nested braces in segment '{part}' of '{raw}'"));
                }
                segments.push(Segment::Param(inner.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(format!(
                    "segment '{part}' of '{raw}' mixes literal text and a parameter"
                ));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of literal segments; used to rank otherwise equal matches.
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }

    /// Match `path` against the template, returning the named captures.
    /// Request segments are percent-decoded before comparison.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let actual: Vec<Cow<'_, str>> = split_segments(path).map(decode_segment).collect();
        if actual.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, value) in self.segments.iter().zip(actual) {
            match segment {
                Segment::Literal(literal) => {
                    if literal.as_str() != value {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if value.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), value.into_owned());
                }
            }
        }
        Some(params)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    (!path.is_empty()).then(|| path.split('/')).into_iter().flatten()
}

fn decode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}
