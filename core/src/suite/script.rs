use crate::adapters::interface::TextGenerator;
use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use tracing::info;

use super::model::{CanonicalTable, NormalizeConfig, RowOrder, TableAbsent};
use super::prompt::{build_brainstorm_prompt, build_format_prompt};
use super::table::normalize_with;

/// Validation script for one requirement.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationScript {
    pub requirement: String,
    pub brainstormed_steps: String,
    pub script_markdown: String,
    pub table: Result<CanonicalTable, TableAbsent>,
}

/// Two-stage generation: one model brainstorms test steps, another formats them.
pub fn generate_validation_script(
    brainstorm: &dyn TextGenerator,
    formatter: &dyn TextGenerator,
    requirement: &str,
) -> CoreResult<ValidationScript> {
    let requirement = requirement.trim();
    if requirement.is_empty() {
        return Err(CoreError::InvalidInput("requirement cannot be empty".to_string()));
    }

    info!(provider = brainstorm.provider_label(), model = brainstorm.model(), "brainstorming test steps");
    let steps = brainstorm.generate(&build_brainstorm_prompt(requirement))?;

    info!(provider = formatter.provider_label(), model = formatter.model(), "formatting validation script");
    let script_markdown = formatter.generate(&build_format_prompt(&steps))?;

    // Keep the model's step order.
    let cfg = NormalizeConfig {
        row_order: RowOrder::FirstSeen,
        ..NormalizeConfig::default()
    };
    let table = normalize_with(&script_markdown, &cfg).map(|(t, _)| t);

    Ok(ValidationScript {
        requirement: requirement.to_string(),
        brainstormed_steps: steps,
        script_markdown,
        table,
    })
}
