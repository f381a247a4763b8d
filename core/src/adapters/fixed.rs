use crate::adapters::interface::{AdapterError, TextGenerator};
use std::cell::RefCell;

/// Replays stored completions in order, then keeps returning the last one.
///
/// Used to re-parse a saved completion without calling a provider.
pub struct FixedResponseGenerator {
    responses: Vec<Result<String, AdapterError>>,
    cursor: RefCell<usize>,
    prompts: RefCell<Vec<String>>,
}

impl FixedResponseGenerator {
    pub fn new(completion: impl Into<String>) -> Self {
        Self::sequence(vec![Ok(completion.into())])
    }

    pub fn failing(err: AdapterError) -> Self {
        Self::sequence(vec![Err(err)])
    }

    pub fn sequence(responses: Vec<Result<String, AdapterError>>) -> Self {
        Self {
            responses,
            cursor: RefCell::new(0),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl TextGenerator for FixedResponseGenerator {
    fn provider_label(&self) -> &str {
        "fixed"
    }

    fn model(&self) -> &str {
        "fixed-response"
    }

    fn generate(&self, prompt: &str) -> Result<String, AdapterError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        let mut cursor = self.cursor.borrow_mut();
        let idx = (*cursor).min(self.responses.len().saturating_sub(1));
        *cursor += 1;
        match self.responses.get(idx) {
            Some(r) => r.clone(),
            None => Err(AdapterError::invalid_response("no stored completion")),
        }
    }
}
