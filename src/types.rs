//! Core data types shared across the crate.
//!
//! Defines the capture record model and the severity scale used by the
//! finding-backed columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a captured transaction. Assigned externally, unique and
/// monotonically increasing.
pub type RecordId = u64;

/// Current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Severity of a finding associated with a captured transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "Info",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        };
        write!(f, "{}", label)
    }
}

/// Immutable snapshot of one captured HTTP transaction.
///
/// The table never mutates a record; refreshed copies come from the
/// [`RecordSource`](crate::sources::RecordSource).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub id: RecordId,
    /// Unix ms when the request was sent.
    pub request_timestamp: u64,
    /// Unix ms when the response completed. Zero when no response arrived.
    pub response_timestamp: u64,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub status_reason: String,
    pub round_trip_ms: u64,
    pub request_header_size: u64,
    pub request_body_size: u64,
    pub response_header_size: u64,
    pub response_body_size: u64,
    /// Highest finding severity known to the producer at capture time.
    pub highest_severity: Option<Severity>,
    pub tags: Vec<String>,
}

impl CaptureRecord {
    /// Creates a record with the given identity and request line; remaining
    /// fields start empty and can be filled in by the producer.
    pub fn new(id: RecordId, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            request_timestamp: now_ms(),
            response_timestamp: 0,
            method: method.into(),
            url: url.into(),
            status_code: 0,
            status_reason: String::new(),
            round_trip_ms: 0,
            request_header_size: 0,
            request_body_size: 0,
            response_header_size: 0,
            response_body_size: 0,
            highest_severity: None,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_scale_orders_by_risk() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn record_roundtrips_through_json() {
        let mut record = CaptureRecord::new(7, "GET", "http://example.com/login");
        record.status_code = 200;
        record.status_reason = "OK".to_string();
        record.highest_severity = Some(Severity::Medium);
        record.tags.push("form".to_string());

        let json = serde_json::to_string(&record).unwrap();
        let back: CaptureRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert_eq!(back.url, "http://example.com/login");
        assert_eq!(back.highest_severity, Some(Severity::Medium));
        assert_eq!(back.tags, vec!["form".to_string()]);
    }
}
