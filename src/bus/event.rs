//! Finding change events carried by the bus.

use serde::{Deserialize, Serialize};

use crate::types::{RecordId, Severity};

/// Kind of change reported by the findings publisher.
///
/// Kinds this crate does not recognize deserialize to [`Unknown`]
/// (`AlertEventKind::Unknown`) and are handled as bulk invalidations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertEventKind {
    FindingAdded,
    FindingChanged,
    FindingRemoved,
    AllFindingsRemoved,
    #[serde(other)]
    Unknown,
}

/// One change event from the findings publisher.
///
/// Single-finding kinds carry the affected record's id; the payload may
/// reference ids the table has never seen, which consumers treat as normal
/// misses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertEventKind,
    #[serde(default)]
    pub record_id: Option<RecordId>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl AlertEvent {
    pub fn finding_added(record_id: RecordId, severity: Severity) -> Self {
        Self {
            kind: AlertEventKind::FindingAdded,
            record_id: Some(record_id),
            severity: Some(severity),
        }
    }

    pub fn finding_changed(record_id: RecordId, severity: Severity) -> Self {
        Self {
            kind: AlertEventKind::FindingChanged,
            record_id: Some(record_id),
            severity: Some(severity),
        }
    }

    pub fn finding_removed(record_id: RecordId) -> Self {
        Self {
            kind: AlertEventKind::FindingRemoved,
            record_id: Some(record_id),
            severity: None,
        }
    }

    pub fn all_findings_removed() -> Self {
        Self {
            kind: AlertEventKind::AllFindingsRemoved,
            record_id: None,
            severity: None,
        }
    }

    /// Parses the JSON wire form published on the bus.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("failed to parse alert event: {}", e))
    }
}
