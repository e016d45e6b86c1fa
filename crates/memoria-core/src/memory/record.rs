//! Mapping between [`Memory`] and vector-index payloads.
//!
//! The payload schema is owned here: `user_id`, `memory_type`, `content` and
//! `timestamp` are required, `metadata` is optional. A point missing a
//! required field, or carrying one that does not parse, is corrupt.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use memoria_types::error::RepositoryError;
use memoria_types::memory::{Memory, MemoryType, Metadata, payload_keys};
use memoria_types::vector::{Payload, PointFilter, format_timestamp};

/// Serialize a memory into its stored payload.
pub fn to_payload(memory: &Memory) -> Payload {
    let mut payload = Payload::new();
    payload.insert(payload_keys::USER_ID.into(), Value::String(memory.user_id.clone()));
    payload.insert(
        payload_keys::MEMORY_TYPE.into(),
        Value::String(memory.memory_type.to_string()),
    );
    payload.insert(payload_keys::CONTENT.into(), Value::String(memory.content.clone()));
    payload.insert(
        payload_keys::TIMESTAMP.into(),
        Value::String(format_timestamp(&memory.timestamp)),
    );
    payload.insert(
        payload_keys::METADATA.into(),
        Value::Object(memory.metadata.clone()),
    );
    payload
}

/// Rebuild a memory from a stored point.
pub fn from_payload(id: Uuid, payload: &Payload) -> Result<Memory, RepositoryError> {
    let corrupt = |reason: String| RepositoryError::CorruptPayload {
        id: id.to_string(),
        reason,
    };

    let user_id = required_str(payload, payload_keys::USER_ID).map_err(&corrupt)?;
    let content = required_str(payload, payload_keys::CONTENT).map_err(&corrupt)?;
    let memory_type: MemoryType = required_str(payload, payload_keys::MEMORY_TYPE)
        .map_err(&corrupt)?
        .parse()
        .map_err(&corrupt)?;
    let raw_timestamp = required_str(payload, payload_keys::TIMESTAMP).map_err(&corrupt)?;
    let timestamp = DateTime::parse_from_rfc3339(raw_timestamp)
        .map_err(|e| corrupt(format!("bad timestamp: {e}")))?
        .with_timezone(&Utc);
    let metadata = match payload.get(payload_keys::METADATA) {
        Some(Value::Object(map)) => map.clone(),
        _ => Metadata::new(),
    };

    Ok(Memory {
        id,
        content: content.to_string(),
        memory_type,
        user_id: user_id.to_string(),
        metadata,
        timestamp,
    })
}

fn required_str<'p>(payload: &'p Payload, key: &str) -> Result<&'p str, String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing or non-string field '{key}'"))
}

/// Filter scoping a query to one owner and, optionally, one memory type.
pub fn owner_filter(user_id: &str, memory_type: Option<MemoryType>) -> PointFilter {
    let filter = PointFilter::new().eq(payload_keys::USER_ID, user_id);
    match memory_type {
        Some(kind) => filter.eq(payload_keys::MEMORY_TYPE, kind.to_string()),
        None => filter,
    }
}

/// Owner filter plus an inclusive timestamp window. Open bounds are allowed.
pub fn time_window_filter(
    user_id: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> PointFilter {
    owner_filter(user_id, None).range(
        payload_keys::TIMESTAMP,
        start.as_ref().map(format_timestamp),
        end.as_ref().map(format_timestamp),
    )
}
