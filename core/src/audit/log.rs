use crate::audit::event::{compute_event_hash, finalize_event, AuditEvent, ZERO_HASH_64};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Append-only, hash-chained list of actions taken in one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_hash(&self) -> &str {
        self.events
            .last()
            .map(|e| e.event_hash.as_str())
            .unwrap_or(ZERO_HASH_64)
    }

    pub fn append(&mut self, mut event: AuditEvent) -> CoreResult<&AuditEvent> {
        event.prev_event_hash = self.last_hash().to_string();
        let event = finalize_event(event)?;
        self.events.push(event);
        let idx = self.events.len() - 1;
        Ok(&self.events[idx])
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Re-check every hash and link of the chain.
    pub fn verify(&self) -> CoreResult<()> {
        let mut prev = ZERO_HASH_64.to_string();
        for (idx, e) in self.events.iter().enumerate() {
            if e.prev_event_hash != prev {
                return Err(CoreError::InvalidInput(format!(
                    "audit event {} does not chain to its predecessor",
                    idx
                )));
            }
            if compute_event_hash(e)? != e.event_hash {
                return Err(CoreError::InvalidInput(format!(
                    "audit event {} hash mismatch",
                    idx
                )));
            }
            prev = e.event_hash.clone();
        }
        Ok(())
    }

    pub fn to_ndjson(&self) -> CoreResult<String> {
        let mut out = String::new();
        for e in &self.events {
            out.push_str(&serde_json::to_string(e)?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn from_ndjson(ndjson: &str) -> CoreResult<Self> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let e: AuditEvent = serde_json::from_str(line).map_err(|e| {
                CoreError::InvalidInput(format!("audit line {}: {}", line_num + 1, e))
            })?;
            events.push(e);
        }
        let trail = Self { events };
        trail.verify()?;
        Ok(trail)
    }

    pub fn write_ndjson(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_ndjson()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::event::Actor;
    use serde_json::json;

    fn trail_with_two() -> AuditTrail {
        let mut trail = AuditTrail::new();
        trail
            .append(AuditEvent::new(
                "2026-10-19T08:00:00Z",
                "USER_SIGNED_IN",
                "s_1",
                Actor::User,
                json!({"user": "qa"}),
            ))
            .unwrap();
        trail
            .append(AuditEvent::new(
                "2026-10-19T08:05:00Z",
                "USER_SIGNED_OUT",
                "s_1",
                Actor::User,
                json!({"user": "qa"}),
            ))
            .unwrap();
        trail
    }

    #[test]
    fn events_chain() {
        let trail = trail_with_two();
        assert_eq!(trail.events()[0].prev_event_hash, ZERO_HASH_64);
        assert_eq!(trail.events()[1].prev_event_hash, trail.events()[0].event_hash);
        trail.verify().unwrap();
    }

    #[test]
    fn tampering_is_detected() {
        let mut trail = trail_with_two();
        trail.events[0].details = json!({"user": "someone-else"});
        assert!(trail.verify().is_err());
    }

    #[test]
    fn rejected_event_does_not_advance_chain() {
        let mut trail = trail_with_two();
        let before = trail.last_hash().to_string();
        let bad = AuditEvent::new("2026-10-19T08:06:00Z", "NOPE", "s_1", Actor::System, json!({}));
        assert!(trail.append(bad).is_err());
        assert_eq!(trail.last_hash(), before);
        assert_eq!(trail.len(), 2);
    }

    #[test]
    fn ndjson_round_trip_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let trail = trail_with_two();
        let path = dir.path().join("audit").join("audit_log.ndjson");
        trail.write_ndjson(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(AuditTrail::from_ndjson(&text).unwrap(), trail);
    }
}
