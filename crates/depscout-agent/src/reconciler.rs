// ABOUTME: Turns a session's terminal payload into a validated DependencyRecord
// ABOUTME: Never fails: anything that does not validate is reported as unresolved

use depscout_core::{DepScoutError, DependencyRecord, Payload};

/// Result of reconciling one terminal payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Resolved(DependencyRecord),
    Unresolved(String),
}

impl Reconciliation {
    pub fn into_record(self) -> Option<DependencyRecord> {
        match self {
            Reconciliation::Resolved(record) => Some(record),
            Reconciliation::Unresolved(_) => None,
        }
    }
}

/// Normalize a structured or JSON-text payload into a record.
///
/// A record is produced whole or not at all.
pub fn reconcile(payload: &Payload) -> Reconciliation {
    let decoded = match payload {
        Payload::Structured(value) => {
            DependencyRecord::from_value(value).map_err(DepScoutError::from)
        }
        Payload::Text(text) => decode_record(text),
        Payload::Empty => {
            return Reconciliation::Unresolved("final answer is empty".to_string());
        }
    };
    match decoded {
        Ok(record) => Reconciliation::Resolved(record),
        // Field errors are reported bare, without the "Validation error" prefix
        Err(DepScoutError::Validation(e)) => Reconciliation::Unresolved(e.to_string()),
        Err(e) => Reconciliation::Unresolved(e.to_string()),
    }
}

/// Decode text that should hold one record.
///
/// Accepts the bare object, the object inside a markdown code fence, or the
/// outermost `{...}` slice of surrounding prose.
fn decode_record(text: &str) -> Result<DependencyRecord, DepScoutError> {
    let trimmed = strip_code_fence(text.trim());
    match DependencyRecord::from_json(trimmed) {
        Err(DepScoutError::Serialization(e)) => match outermost_object(trimmed) {
            Some(slice) if slice.len() < trimmed.len() => DependencyRecord::from_json(slice),
            _ => Err(DepScoutError::Serialization(e)),
        },
        decoded => decoded,
    }
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
