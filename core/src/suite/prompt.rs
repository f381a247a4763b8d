use super::model::SECTION_SENTINEL;

pub const DEFAULT_MAX_URS_CHARS: usize = 12_000;

/// First `max_chars` characters of the URS text, cut on a char boundary.
pub fn truncate_urs(urs_text: &str, max_chars: usize) -> &str {
    match urs_text.char_indices().nth(max_chars) {
        Some((idx, _)) => &urs_text[..idx],
        None => urs_text,
    }
}

pub fn build_master_prompt(project_name: &str, urs_text: &str, max_urs_chars: usize) -> String {
    let urs = truncate_urs(urs_text, max_urs_chars);
    format!(
        "You are a Senior CSV Consultant. Generate three sections for {project}.\n\
         \n\
         SECTION 1: FUNCTIONAL REQUIREMENTS SPECIFICATION (FRS)\n\
         Detailed technical description of design features, as a markdown table whose first column is the requirement ID.\n\
         \n\
         SECTION 2: OPERATIONAL QUALIFICATION (OQ) PROTOCOL\n\
         Test instructions as a markdown table with 'Test ID', 'Step', 'Expected Result', and 'Pass/Fail' columns.\n\
         \n\
         SECTION 3: TRACEABILITY MATRIX (RTM)\n\
         Table mapping URS ID | Description | FRS Reference | Test ID.\n\
         \n\
         URS TEXT: {urs}\n\
         Separate sections with '{sentinel}'.\n",
        project = project_name,
        urs = urs,
        sentinel = SECTION_SENTINEL,
    )
}

/// Stage one of the single-requirement script: brainstorm test steps.
pub fn build_brainstorm_prompt(requirement: &str) -> String {
    format!(
        "List 3 technical test steps for this pharma software requirement: {}",
        requirement
    )
}

/// Stage two: format brainstormed steps into a validation table.
pub fn build_format_prompt(steps: &str) -> String {
    format!(
        "Convert these steps into a formal Validation Script markdown table with columns: \
         Step # | Test Procedure | Expected Result | Pass/Fail.\n\nSteps: {}",
        steps
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_sentinel_and_project() {
        let p = build_master_prompt("LIMS Upgrade", "URS-01 The system shall log in.", 100);
        assert!(p.contains("LIMS Upgrade"));
        assert!(p.contains("---SECTION_SPLIT---"));
        assert!(p.contains("URS-01 The system shall log in."));
    }

    #[test]
    fn urs_is_truncated_by_chars() {
        assert_eq!(truncate_urs("abcdef", 3), "abc");
        assert_eq!(truncate_urs("ab", 3), "ab");
        assert_eq!(truncate_urs("ééé", 2), "éé");
    }
}
