use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category}/{code}: {message}")]
pub struct AdapterError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    pub category: String, // TIMEOUT|AUTH|RATE_LIMITED|MODEL_NOT_FOUND|INVALID_RESPONSE|RUNTIME_ERROR
}

impl AdapterError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_RESPONSE".to_string(),
            message: message.into(),
            retryable: false,
            category: "INVALID_RESPONSE".to_string(),
        }
    }
}

/// Capability: given a prompt, return a text completion or fail.
pub trait TextGenerator {
    /// Short provider name recorded in audit details.
    fn provider_label(&self) -> &str;
    fn model(&self) -> &str;
    fn generate(&self, prompt: &str) -> Result<String, AdapterError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn provider_label(&self) -> &str {
        (**self).provider_label()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    fn generate(&self, prompt: &str) -> Result<String, AdapterError> {
        (**self).generate(prompt)
    }
}

/// Map an HTTP status (if any) and error text onto a stable error envelope.
pub fn classify_adapter_error(status: Option<u16>, err: &str) -> AdapterError {
    let lowered = err.to_ascii_lowercase();
    let (category, code, retryable) = match status {
        Some(401) | Some(403) => ("AUTH", "AUTH_REJECTED", false),
        Some(404) => ("MODEL_NOT_FOUND", "MODEL_NOT_FOUND", false),
        Some(408) | Some(504) => ("TIMEOUT", "ADAPTER_TIMEOUT", true),
        Some(429) => ("RATE_LIMITED", "RATE_LIMITED", true),
        Some(s) if s >= 500 => ("RUNTIME_ERROR", "UPSTREAM_ERROR", true),
        _ if lowered.contains("timed out") || lowered.contains("timeout") => {
            ("TIMEOUT", "ADAPTER_TIMEOUT", true)
        }
        _ if lowered.contains("not found") => ("MODEL_NOT_FOUND", "MODEL_NOT_FOUND", false),
        _ => ("RUNTIME_ERROR", "RUNTIME_ERROR", false),
    };
    AdapterError {
        code: code.to_string(),
        message: err.to_string(),
        retryable,
        category: category.to_string(),
    }
}
