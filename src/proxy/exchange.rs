//! Data captured per proxied call
//!
//! An exchange starts as a [`PendingExchange`] holding the request side. It
//! is consumed exactly once, either by [`PendingExchange::complete`] with the
//! backend's reply or by [`PendingExchange::fail`], which yields the immutable
//! [`ExchangeRecord`] that is appended to the history store.

use crate::proxy::capture::CapturedBody;
use crate::proxy::types::ProxyError;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};

/// Ordered mapping from key to every value seen for it
///
/// Keys keep first-seen order and values keep arrival order; repeated keys
/// are never collapsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiMap(Vec<(String, Vec<String>)>);

impl MultiMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a value under `key`, after any values already present
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, values)) => values.push(value),
            None => self.0.push((key, vec![value])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, values)| values.as_slice())
    }

    /// First value for `key`
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Capture headers as received; non UTF-8 values are decoded lossily.
    ///
    /// Names come out lowercase: `http::HeaderMap` normalizes them on parse,
    /// so the case the client sent is not recoverable here.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut map = Self::new();
        for (name, value) in headers {
            map.append(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        map
    }

    /// Decode a raw query string (`a=1&a=2&b`) into its pairs.
    ///
    /// `+` decodes to a space; a pair that fails percent-decoding is kept raw.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut map = Self::new();
        let Some(query) = query else {
            return map;
        };

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            map.append(decode_component(key), decode_component(value));
        }
        map
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

impl Serialize for MultiMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, values) in &self.0 {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

/// What the backend sent back
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResponseRecord {
    pub status_code: u16,
    pub headers: MultiMap,
    pub body: CapturedBody,
}

/// Terminal state of an exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ExchangeOutcome {
    Completed,
    Failed,
}

/// One proxied call as stored in history
#[derive(Clone, Debug, Serialize)]
pub struct ExchangeRecord {
    /// Caller supplied correlation id, empty when absent
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    /// Path as received, before rewriting
    pub path: String,
    pub request_headers: MultiMap,
    pub request_query: MultiMap,
    pub request_body: CapturedBody,
    pub forwarded_url: String,
    pub response: Option<ResponseRecord>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Option<Duration>,
    pub error: Option<String>,
}

impl ExchangeRecord {
    pub fn outcome(&self) -> ExchangeOutcome {
        if self.response.is_some() {
            ExchangeOutcome::Completed
        } else {
            ExchangeOutcome::Failed
        }
    }
}

fn serialize_millis<S: Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match duration {
        Some(duration) => serializer.serialize_some(&(duration.as_secs_f64() * 1000.0)),
        None => serializer.serialize_none(),
    }
}

/// Request side of an exchange, captured before dispatch
#[derive(Clone, Debug)]
pub struct RequestCapture {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub headers: MultiMap,
    pub query: MultiMap,
    pub body: CapturedBody,
    pub forwarded_url: String,
}

/// An exchange whose request has been dispatched but not yet resolved
#[derive(Debug)]
pub struct PendingExchange {
    record: ExchangeRecord,
    started: Instant,
}

impl PendingExchange {
    /// `started` is the instant the request was received
    pub fn new(request: RequestCapture, started: Instant) -> Self {
        Self {
            record: ExchangeRecord {
                id: request.id,
                timestamp: request.timestamp,
                method: request.method,
                path: request.path,
                request_headers: request.headers,
                request_query: request.query,
                request_body: request.body,
                forwarded_url: request.forwarded_url,
                response: None,
                duration: None,
                error: None,
            },
            started,
        }
    }

    pub fn request(&self) -> &ExchangeRecord {
        &self.record
    }

    /// Attach the backend reply
    pub fn complete(self, response: ResponseRecord) -> ExchangeRecord {
        let mut record = self.record;
        record.response = Some(response);
        record.duration = Some(self.started.elapsed());
        record
    }

    /// Close the exchange without a reply
    pub fn fail(self, error: &ProxyError) -> ExchangeRecord {
        let mut record = self.record;
        record.error = Some(error.to_string());
        record.duration = Some(self.started.elapsed());
        record
    }
}
