use crate::determinism::json_canonical;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEvent {
    pub ts_utc: String, // RFC3339 UTC string
    pub event_type: String,
    pub session_id: String,
    pub actor: Actor,
    pub details: serde_json::Value,
    pub prev_event_hash: String, // hex 64
    pub event_hash: String,      // hex 64
}

impl AuditEvent {
    /// Unchained event; the trail fills both hashes on append.
    pub fn new(
        ts_utc: &str,
        event_type: &str,
        session_id: &str,
        actor: Actor,
        details: serde_json::Value,
    ) -> Self {
        Self {
            ts_utc: ts_utc.to_string(),
            event_type: event_type.to_string(),
            session_id: session_id.to_string(),
            actor,
            details,
            prev_event_hash: String::new(),
            event_hash: String::new(),
        }
    }
}

pub const ZERO_HASH_64: &str = "0000000000000000000000000000000000000000000000000000000000000000";

// event_hash = SHA-256 of the canonical envelope with event_hash zeroed.
pub fn compute_event_hash(event: &AuditEvent) -> CoreResult<String> {
    let mut e = event.clone();
    e.event_hash = ZERO_HASH_64.to_string();
    let bytes = json_canonical::to_canonical_bytes(&e)?;
    let mut h = Sha256::new();
    h.update(bytes);
    Ok(hex::encode(h.finalize()))
}

pub fn finalize_event(mut event: AuditEvent) -> CoreResult<AuditEvent> {
    if !is_hex64(&event.prev_event_hash) {
        return Err(CoreError::InvalidInput(
            "prev_event_hash must be 64 hex chars".to_string(),
        ));
    }
    if time::OffsetDateTime::parse(
        &event.ts_utc,
        &time::format_description::well_known::Rfc3339,
    )
    .is_err()
    {
        return Err(CoreError::InvalidInput(format!(
            "ts_utc is not RFC3339: {}",
            event.ts_utc
        )));
    }
    validate_event_taxonomy(&event)?;
    event.event_hash = compute_event_hash(&event)?;
    Ok(event)
}

pub(crate) fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn validate_event_taxonomy(event: &AuditEvent) -> CoreResult<()> {
    let allowed = [
        "USER_SIGNED_IN",
        "USER_SIGNED_OUT",
        "URS_INGESTED",
        "GENERATION_REQUESTED",
        "GENERATION_COMPLETED",
        "GENERATION_FAILED",
        "ARTIFACTS_NORMALIZED",
        "EXPORT_COMPLETED",
    ];
    if !allowed.contains(&event.event_type.as_str()) {
        return Err(CoreError::InvalidInput(format!(
            "unknown event_type {}",
            event.event_type
        )));
    }
    for k in required_detail_keys(&event.event_type) {
        if event.details.get(k).is_none() {
            return Err(CoreError::InvalidInput(format!(
                "event {} missing details.{}",
                event.event_type, k
            )));
        }
    }
    Ok(())
}

fn required_detail_keys(event_type: &str) -> &'static [&'static str] {
    match event_type {
        "USER_SIGNED_IN" => &["user"],
        "USER_SIGNED_OUT" => &["user"],
        "URS_INGESTED" => &["source_name", "sha256", "page_count", "chars"],
        "GENERATION_REQUESTED" => &["provider", "model", "prompt_sha256", "urs_sha256"],
        "GENERATION_COMPLETED" => &["generation_id", "response_sha256", "duration_ms", "version"],
        "GENERATION_FAILED" => &["error_category", "error_code", "retryable"],
        "ARTIFACTS_NORMALIZED" => &["generation_id", "sections_present", "tables", "coverage"],
        "EXPORT_COMPLETED" => &["path", "sha256", "sheets"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> AuditEvent {
        let mut e = AuditEvent::new(
            "2026-10-19T08:00:00Z",
            "USER_SIGNED_IN",
            "s_test",
            Actor::User,
            json!({"user": "qa.lead"}),
        );
        e.prev_event_hash = ZERO_HASH_64.to_string();
        e
    }

    #[test]
    fn finalize_sets_hash() {
        let e = finalize_event(sample()).unwrap();
        assert!(is_hex64(&e.event_hash));
        assert_eq!(e.event_hash, compute_event_hash(&e).unwrap());
    }

    #[test]
    fn unknown_event_type_rejected() {
        let mut e = sample();
        e.event_type = "PAGE_VIEWED".to_string();
        assert!(finalize_event(e).is_err());
    }

    #[test]
    fn missing_detail_key_rejected() {
        let mut e = sample();
        e.details = json!({});
        assert!(finalize_event(e).is_err());
    }

    #[test]
    fn bad_timestamp_rejected() {
        let mut e = sample();
        e.ts_utc = "yesterday".to_string();
        assert!(finalize_event(e).is_err());
    }
}
