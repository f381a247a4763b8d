use crate::adapters::interface::{AdapterError, TextGenerator};
use crate::config::SuiteConfig;
use crate::determinism::run_id::now_rfc3339_utc;
use crate::error::{CoreError, CoreResult};
use crate::ingest::pdf::UrsDocument;
use crate::suite::prompt::build_master_prompt;
use crate::suite::workflow::{generate_suite_artifacts, SuiteArtifacts, SuiteRequest};
use std::time::Instant;
use tracing::{info, warn};

use super::state::AppState;

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub state: AppState,
    pub result: Result<SuiteArtifacts, AdapterError>,
}

impl GenerationOutcome {
    pub fn artifacts(&self) -> Option<&SuiteArtifacts> {
        self.result.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&AdapterError> {
        self.result.as_ref().err()
    }
}

/// One prompt -> completion -> artifacts cycle against `generator`.
///
/// Provider failures are recorded and returned in the outcome; only session
/// policy and rendering problems are `Err`.
pub fn run_generation(
    state: &AppState,
    generator: &dyn TextGenerator,
    urs: &UrsDocument,
    cfg: &SuiteConfig,
) -> CoreResult<GenerationOutcome> {
    let prompt = build_master_prompt(&cfg.project_name, &urs.text, cfg.prompt.max_urs_chars);
    let state = state.record_request(
        generator.provider_label(),
        generator.model(),
        &prompt,
        &urs.sha256,
        &now_rfc3339_utc(),
    )?;

    info!(
        provider = generator.provider_label(),
        model = generator.model(),
        urs = %urs.source_name,
        "generation requested"
    );
    let started = Instant::now();
    // A blank completion is still a completion; its sections render as absent.
    let completion = match generator.generate(&prompt) {
        Ok(c) => c,
        Err(err) => return fail(state, err),
    };
    let duration_ms = started.elapsed().as_millis() as u64;

    let state = state.record_generation(&completion, duration_ms, &now_rfc3339_utc())?;
    let artifacts = render_last_analysis(&state, cfg)?;
    let state = state.record_artifacts(&artifacts, &now_rfc3339_utc())?;
    info!(
        version = state.version,
        duration_ms,
        generation_id = %artifacts.generation_id,
        "generation completed"
    );
    Ok(GenerationOutcome {
        state,
        result: Ok(artifacts),
    })
}

/// Rebuild artifacts from the stored completion without calling a model.
pub fn render_last_analysis(state: &AppState, cfg: &SuiteConfig) -> CoreResult<SuiteArtifacts> {
    let completion = state
        .last_analysis
        .as_ref()
        .ok_or_else(|| CoreError::InvalidInput("no analysis generated yet".to_string()))?;
    generate_suite_artifacts(&SuiteRequest {
        project_name: cfg.project_name.clone(),
        completion: completion.clone(),
        normalize: cfg.normalize.clone(),
        test_id_column: cfg.coverage.test_id_column.clone(),
    })
}

fn fail(state: AppState, err: AdapterError) -> CoreResult<GenerationOutcome> {
    warn!(code = %err.code, category = %err.category, retryable = err.retryable, "generation failed");
    let state = state.record_failure(&err, &now_rfc3339_utc())?;
    Ok(GenerationOutcome {
        state,
        result: Err(err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixed::FixedResponseGenerator;
    use crate::adapters::interface::classify_adapter_error;
    use crate::ingest::pdf::urs_from_text;
    use crate::session::state::SessionPhase;
    use crate::suite::model::{SectionKind, TableAbsent};
    use crate::suite::workflow::SectionOutcome;

    const TS: &str = "2026-10-19T09:00:00Z";

    fn signed_in() -> AppState {
        AppState::with_session_id("s_cycle").login("qa", TS).unwrap()
    }

    fn urs() -> UrsDocument {
        urs_from_text("urs.pdf", "URS-01 The system shall require login.").unwrap()
    }

    #[test]
    fn successful_cycle_records_and_renders() {
        let generator = FixedResponseGenerator::new(
            "| ReqID | Feature |\n|---|---|\n| FRS-01 | Login |---SECTION_SPLIT---| Test ID | Step |\n|---|---|\n| OQ-01 | Log in |---SECTION_SPLIT---| URS ID | Test ID |\n|---|---|\n| URS-01 | OQ-01 |",
        );
        let out = run_generation(&signed_in(), &generator, &urs(), &SuiteConfig::default()).unwrap();
        let artifacts = out.artifacts().unwrap();
        assert_eq!(artifacts.sheets().len(), 3);
        assert_eq!(artifacts.coverage.unwrap().percentage, Some(100));
        assert_eq!(out.state.phase, SessionPhase::GENERATED);
        assert_eq!(out.state.version, 1);
        let types: Vec<&str> = out
            .state
            .audit
            .events()
            .iter()
            .map(|e| e.event_type.as_str())
            .collect();
        assert_eq!(
            types,
            vec![
                "USER_SIGNED_IN",
                "GENERATION_REQUESTED",
                "GENERATION_COMPLETED",
                "ARTIFACTS_NORMALIZED"
            ]
        );
        out.state.audit.verify().unwrap();
        assert!(generator.prompts()[0].contains("URS-01 The system shall require login."));
    }

    #[test]
    fn provider_failure_is_returned_with_state() {
        let generator = FixedResponseGenerator::failing(classify_adapter_error(Some(429), "slow down"));
        let before = signed_in();
        let out = run_generation(&before, &generator, &urs(), &SuiteConfig::default()).unwrap();
        assert_eq!(out.failure().unwrap().category, "RATE_LIMITED");
        assert_eq!(out.state.phase, SessionPhase::READY);
        assert!(out.state.last_analysis.is_none());
        assert_eq!(
            out.state.audit.events().last().unwrap().event_type,
            "GENERATION_FAILED"
        );
    }

    #[test]
    fn blank_completion_renders_every_section_absent() {
        let generator = FixedResponseGenerator::new("   ");
        let out = run_generation(&signed_in(), &generator, &urs(), &SuiteConfig::default()).unwrap();
        let artifacts = out.artifacts().unwrap();
        assert!(artifacts.sheets().is_empty());
        assert!(artifacts.coverage.is_none());
        assert!(matches!(
            artifacts.section(SectionKind::Frs).outcome,
            SectionOutcome::TableAbsent {
                reason: TableAbsent::TooFewTableLines { found: 0 },
                ..
            }
        ));
        assert_eq!(
            artifacts.section(SectionKind::Rtm).outcome,
            SectionOutcome::SectionAbsent
        );
        assert_eq!(out.state.version, 1);
        assert_eq!(out.state.phase, SessionPhase::GENERATED);
    }

    #[test]
    fn signed_out_session_never_calls_the_model() {
        let generator = FixedResponseGenerator::new("x");
        let state = AppState::with_session_id("s_cycle");
        let err = run_generation(&state, &generator, &urs(), &SuiteConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::PolicyBlocked(_)));
        assert!(generator.prompts().is_empty());
    }

    #[test]
    fn rerender_requires_an_analysis() {
        assert!(matches!(
            render_last_analysis(&signed_in(), &SuiteConfig::default()),
            Err(CoreError::InvalidInput(_))
        ));
    }
}
