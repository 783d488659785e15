//! On-disk queue document and lenient record decoding.
//!
//! A queue file written by an older build, edited by hand, or cut short by a
//! crash must never stop the store from opening. Decoding therefore works on
//! `serde_json::Value` and repairs or drops individual records instead of
//! failing the whole document.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::submission::{normalize_optional_text, PendingSubmission, ResultRef, SubmissionStatus};
use crate::constants::QUEUE_FILE_VERSION;
use crate::errors::{LinkstashError, Result};
use crate::utils::url::dedup_key;

const UNKNOWN_STATUS_MESSAGE: &str = "stored record had an unrecognized status";

#[derive(Serialize)]
struct QueueDocument<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    submissions: &'a [PendingSubmission],
}

/// Result of decoding a queue document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedQueue {
    pub entries: Vec<PendingSubmission>,
    /// Records discarded (unusable or duplicate).
    pub dropped: usize,
    /// Records kept after one or more fields were repaired.
    pub repaired: usize,
}

/// Serialize entries into the versioned queue document.
///
/// # Errors
///
/// Returns [`LinkstashError::Internal`] if serialization fails.
pub fn encode_queue_document(
    entries: &[PendingSubmission],
    saved_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let document = QueueDocument { version: QUEUE_FILE_VERSION, saved_at, submissions: entries };
    serde_json::to_vec_pretty(&document)
        .map_err(|e| LinkstashError::Internal(format!("failed to encode queue document: {e}")))
}

/// Decode a queue document, accepting either the versioned object or a bare
/// array of records.
///
/// # Errors
///
/// Returns [`LinkstashError::Storage`] when the bytes are not JSON or the
/// top-level shape is unrecognizable. Individual bad records never error.
pub fn decode_queue_document(bytes: &[u8], now: DateTime<Utc>) -> Result<LoadedQueue> {
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| LinkstashError::Storage(format!("queue document is not valid JSON: {e}")))?;

    let records = match root {
        Value::Array(records) => records,
        Value::Object(mut map) => {
            if let Some(version) = map.get("version").and_then(Value::as_u64) {
                if version > u64::from(QUEUE_FILE_VERSION) {
                    warn!(version, "queue document written by a newer version, loading leniently");
                }
            }
            match map.remove("submissions") {
                Some(Value::Array(records)) => records,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(LinkstashError::Storage(format!(
                        "queue document has non-array submissions ({})",
                        json_kind(&other)
                    )))
                }
            }
        }
        other => {
            return Err(LinkstashError::Storage(format!(
                "queue document has unexpected top-level {}",
                json_kind(&other)
            )))
        }
    };

    Ok(sanitize_records(&records, now))
}

fn sanitize_records(records: &[Value], now: DateTime<Utc>) -> LoadedQueue {
    let mut dropped = 0;
    let mut repaired_ids = HashSet::new();
    let mut by_id: HashMap<Uuid, PendingSubmission> = HashMap::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let Some((entry, repaired)) = PendingSubmission::from_json_lenient(record, now) else {
            warn!(index, "dropping unusable queue record");
            dropped += 1;
            continue;
        };
        if repaired {
            repaired_ids.insert(entry.id);
        }
        match by_id.get(&entry.id) {
            Some(existing) if existing.updated_at >= entry.updated_at => {
                warn!(id = %entry.id, "dropping older duplicate queue record");
                dropped += 1;
            }
            Some(_) => {
                warn!(id = %entry.id, "replacing older duplicate queue record");
                dropped += 1;
                by_id.insert(entry.id, entry);
            }
            None => {
                by_id.insert(entry.id, entry);
            }
        }
    }

    let mut entries: Vec<PendingSubmission> = by_id.into_values().collect();
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let mut active_keys = HashSet::new();
    entries.retain(|entry| {
        if !entry.is_active() || active_keys.insert(dedup_key(&entry.url)) {
            return true;
        }
        warn!(id = %entry.id, url = %entry.url, "dropping second active record for the same url");
        dropped += 1;
        false
    });

    let repaired = entries.iter().filter(|e| repaired_ids.contains(&e.id)).count();
    LoadedQueue { entries, dropped, repaired }
}

impl PendingSubmission {
    /// Decode one stored record, repairing what can be repaired.
    ///
    /// Returns `None` when the record is not an object or has no usable URL.
    /// The boolean is `true` when any field had to be repaired.
    #[must_use]
    pub fn from_json_lenient(value: &Value, now: DateTime<Utc>) -> Option<(Self, bool)> {
        let object = value.as_object()?;
        let url = object.get("url").and_then(Value::as_str).map(str::trim).filter(|u| !u.is_empty())?;
        let mut repaired = false;

        let id = match object.get("id").and_then(Value::as_str).map(Uuid::parse_str) {
            Some(Ok(id)) => id,
            _ => {
                repaired = true;
                Uuid::now_v7()
            }
        };

        let parsed_status = object
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<SubmissionStatus>().ok());
        let status = parsed_status.unwrap_or_else(|| {
            repaired = true;
            SubmissionStatus::Failed
        });

        let attempt_count = match object.get("attempt_count").and_then(Value::as_u64) {
            Some(count) => u32::try_from(count).unwrap_or(u32::MAX),
            None => {
                repaired |= object.contains_key("attempt_count");
                0
            }
        };

        let created = timestamp(object.get("created_at"));
        let updated = timestamp(object.get("updated_at"));
        repaired |= created.is_none() || updated.is_none();
        let created_at = created.or(updated).unwrap_or(now);
        let updated_at = updated.or(created).unwrap_or(now);

        let mut next_attempt_at = timestamp(object.get("next_attempt_at"));
        let mut can_retry = object.get("can_retry").and_then(Value::as_bool).unwrap_or(true);
        let mut last_error = object
            .get("last_error")
            .and_then(Value::as_str)
            .and_then(|s| normalize_optional_text(Some(s)));

        if status.is_terminal() {
            can_retry = false;
            next_attempt_at = None;
        } else {
            // Active entries stay deliverable until a transition makes them terminal.
            repaired |= !can_retry;
            can_retry = true;
            if status == SubmissionStatus::Syncing {
                next_attempt_at = None;
            }
        }
        if parsed_status.is_none() {
            last_error.get_or_insert_with(|| UNKNOWN_STATUS_MESSAGE.to_string());
        }

        let result_ref = object
            .get("result_ref")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value::<ResultRef>(v.clone()).ok());

        let entry = Self {
            id,
            url: url.to_string(),
            shared_text: object
                .get("shared_text")
                .and_then(Value::as_str)
                .and_then(|s| normalize_optional_text(Some(s))),
            source_app: object
                .get("source_app")
                .and_then(Value::as_str)
                .and_then(|s| normalize_optional_text(Some(s))),
            created_at,
            updated_at,
            status,
            attempt_count,
            next_attempt_at,
            can_retry,
            last_error,
            result_ref,
        };
        Some((entry, repaired))
    }
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
