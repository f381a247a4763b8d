use crate::adapters::interface::AdapterError;
use crate::audit::event::{Actor, AuditEvent};
use crate::audit::log::AuditTrail;
use crate::determinism::run_id::{generation_id_from_completion, session_id_ulid, sha256_hex};
use crate::error::{CoreError, CoreResult};
use crate::ingest::pdf::UrsDocument;
use crate::suite::workflow::SuiteArtifacts;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionPhase {
    SIGNED_OUT,
    READY,
    GENERATED,
}

/// Everything one user session carries between actions.
///
/// Transitions borrow the current state and return the next one, so a
/// rejected transition leaves the caller's state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub session_id: String,
    pub user: Option<String>,
    pub phase: SessionPhase,
    /// Last full completion, kept so re-rendering never re-calls the model.
    pub last_analysis: Option<String>,
    pub version: u64,
    pub audit: AuditTrail,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_session_id(&session_id_ulid())
    }

    pub fn with_session_id(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            user: None,
            phase: SessionPhase::SIGNED_OUT,
            last_analysis: None,
            version: 0,
            audit: AuditTrail::new(),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.phase != SessionPhase::SIGNED_OUT
    }

    /// Username-only gate; no credential is checked.
    pub fn login(&self, user: &str, ts_utc: &str) -> CoreResult<Self> {
        let user = user.trim();
        if user.is_empty() {
            return Err(CoreError::InvalidInput("username cannot be empty".to_string()));
        }
        let mut next = self.transition(SessionPhase::READY)?;
        next.user = Some(user.to_string());
        next.append(ts_utc, "USER_SIGNED_IN", Actor::User, json!({ "user": user }))?;
        info!(session = %next.session_id, user, "signed in");
        Ok(next)
    }

    pub fn logout(&self, ts_utc: &str) -> CoreResult<Self> {
        let user = self.current_user()?.to_string();
        let mut next = self.transition(SessionPhase::SIGNED_OUT)?;
        next.user = None;
        next.last_analysis = None;
        next.append(ts_utc, "USER_SIGNED_OUT", Actor::User, json!({ "user": user }))?;
        Ok(next)
    }

    pub fn record_ingest(&self, doc: &UrsDocument, ts_utc: &str) -> CoreResult<Self> {
        self.current_user()?;
        let mut next = self.clone();
        next.append(
            ts_utc,
            "URS_INGESTED",
            Actor::User,
            json!({
                "source_name": doc.source_name,
                "sha256": doc.sha256,
                "page_count": doc.page_count,
                "chars": doc.text.chars().count(),
            }),
        )?;
        Ok(next)
    }

    pub fn record_request(
        &self,
        provider: &str,
        model: &str,
        prompt: &str,
        urs_sha256: &str,
        ts_utc: &str,
    ) -> CoreResult<Self> {
        self.current_user()?;
        let mut next = self.clone();
        next.append(
            ts_utc,
            "GENERATION_REQUESTED",
            Actor::User,
            json!({
                "provider": provider,
                "model": model,
                "prompt_sha256": sha256_hex(prompt.as_bytes()),
                "urs_sha256": urs_sha256,
            }),
        )?;
        Ok(next)
    }

    /// Store a completion as the current analysis and bump the version.
    pub fn record_generation(
        &self,
        completion: &str,
        duration_ms: u64,
        ts_utc: &str,
    ) -> CoreResult<Self> {
        let mut next = self.transition(SessionPhase::GENERATED)?;
        next.version += 1;
        next.last_analysis = Some(completion.to_string());
        let version = next.version;
        next.append(
            ts_utc,
            "GENERATION_COMPLETED",
            Actor::System,
            json!({
                "generation_id": generation_id_from_completion(completion),
                "response_sha256": sha256_hex(completion.as_bytes()),
                "duration_ms": duration_ms,
                "version": version,
            }),
        )?;
        Ok(next)
    }

    /// A failed call keeps the previous analysis.
    pub fn record_failure(&self, err: &AdapterError, ts_utc: &str) -> CoreResult<Self> {
        self.current_user()?;
        let mut next = self.clone();
        next.append(
            ts_utc,
            "GENERATION_FAILED",
            Actor::System,
            json!({
                "error_category": err.category,
                "error_code": err.code,
                "retryable": err.retryable,
            }),
        )?;
        Ok(next)
    }

    pub fn record_artifacts(&self, artifacts: &SuiteArtifacts, ts_utc: &str) -> CoreResult<Self> {
        let mut next = self.clone();
        let tables: Vec<&str> = artifacts.sheets().iter().map(|(name, _)| *name).collect();
        next.append(
            ts_utc,
            "ARTIFACTS_NORMALIZED",
            Actor::System,
            json!({
                "generation_id": artifacts.generation_id,
                "sections_present": artifacts.sections_present(),
                "tables": tables,
                "coverage": artifacts.coverage,
            }),
        )?;
        Ok(next)
    }

    pub fn record_export(
        &self,
        path: &str,
        sha256: &str,
        sheets: &[String],
        ts_utc: &str,
    ) -> CoreResult<Self> {
        self.current_user()?;
        let mut next = self.clone();
        next.append(
            ts_utc,
            "EXPORT_COMPLETED",
            Actor::User,
            json!({ "path": path, "sha256": sha256, "sheets": sheets }),
        )?;
        Ok(next)
    }

    fn current_user(&self) -> CoreResult<&str> {
        match (&self.phase, &self.user) {
            (SessionPhase::SIGNED_OUT, _) | (_, None) => {
                Err(CoreError::PolicyBlocked("sign in required".to_string()))
            }
            (_, Some(user)) => Ok(user),
        }
    }

    fn transition(&self, to: SessionPhase) -> CoreResult<Self> {
        if !valid_transition(self.phase, to) {
            return Err(CoreError::PolicyBlocked(format!(
                "invalid session transition {:?} -> {:?}",
                self.phase, to
            )));
        }
        let mut next = self.clone();
        next.phase = to;
        Ok(next)
    }

    fn append(
        &mut self,
        ts_utc: &str,
        event_type: &str,
        actor: Actor,
        details: serde_json::Value,
    ) -> CoreResult<()> {
        self.audit.append(AuditEvent::new(
            ts_utc,
            event_type,
            &self.session_id,
            actor,
            details,
        ))?;
        Ok(())
    }
}

fn valid_transition(from: SessionPhase, to: SessionPhase) -> bool {
    use SessionPhase::*;
    matches!(
        (from, to),
        (SIGNED_OUT, READY)
            | (READY, GENERATED)
            | (GENERATED, GENERATED)
            | (READY, SIGNED_OUT)
            | (GENERATED, SIGNED_OUT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2026-10-19T09:00:00Z";

    #[test]
    fn state_machine_blocks_invalid_edges() {
        assert!(valid_transition(SessionPhase::SIGNED_OUT, SessionPhase::READY));
        assert!(!valid_transition(SessionPhase::SIGNED_OUT, SessionPhase::GENERATED));
        assert!(!valid_transition(SessionPhase::READY, SessionPhase::READY));
    }

    #[test]
    fn login_then_generation_bumps_version() {
        let s0 = AppState::with_session_id("s_test");
        let s1 = s0.login("qa.lead", TS).unwrap();
        assert_eq!(s1.phase, SessionPhase::READY);
        let s2 = s1.record_generation("| A |", 1200, TS).unwrap();
        let s3 = s2.record_generation("| B |", 900, TS).unwrap();
        assert_eq!(s3.version, 2);
        assert_eq!(s3.last_analysis.as_deref(), Some("| B |"));
        assert_eq!(s3.audit.len(), 3);
        s3.audit.verify().unwrap();
        // earlier states are untouched
        assert_eq!(s1.version, 0);
        assert!(s0.audit.is_empty());
    }

    #[test]
    fn generation_requires_sign_in() {
        let s0 = AppState::with_session_id("s_test");
        assert!(matches!(
            s0.record_generation("x", 1, TS),
            Err(CoreError::PolicyBlocked(_))
        ));
        let err = AdapterError::invalid_response("empty");
        assert!(s0.record_failure(&err, TS).is_err());
    }

    #[test]
    fn blank_username_rejected() {
        let s0 = AppState::with_session_id("s_test");
        assert!(matches!(s0.login("   ", TS), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn logout_clears_user_and_analysis() {
        let s = AppState::with_session_id("s_test")
            .login("qa", TS)
            .unwrap()
            .record_generation("| A |", 1, TS)
            .unwrap()
            .logout(TS)
            .unwrap();
        assert_eq!(s.phase, SessionPhase::SIGNED_OUT);
        assert!(s.user.is_none());
        assert!(s.last_analysis.is_none());
        assert_eq!(s.version, 1);
        assert!(s.logout(TS).is_err());
    }

    #[test]
    fn failure_keeps_previous_analysis() {
        let s = AppState::with_session_id("s_test")
            .login("qa", TS)
            .unwrap()
            .record_generation("| A |", 1, TS)
            .unwrap();
        let err = AdapterError::invalid_response("empty");
        let failed = s.record_failure(&err, TS).unwrap();
        assert_eq!(failed.last_analysis.as_deref(), Some("| A |"));
        assert_eq!(failed.audit.events().last().unwrap().event_type, "GENERATION_FAILED");
    }
}
