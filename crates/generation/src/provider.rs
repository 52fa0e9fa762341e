// Boundary to whatever composes new DNA

use serde_json::Value;
use thiserror::Error;

/// What the provider is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub bpm: u32,
    pub pattern_length: usize,
    /// Minimum number of sounding lead notes per section
    pub min_melody_notes: usize,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider returned malformed DNA: {0}")]
    Malformed(String),
}

/// Produces a complete or partial DNA payload in the JSON shape of
/// `MasterDna`. May be slow and may fail; callers run it off the
/// scheduling thread.
pub trait DnaProvider: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<Value, ProviderError>;
}

impl<F> DnaProvider for F
where
    F: Fn(&GenerationRequest) -> Result<Value, ProviderError> + Send + Sync,
{
    fn generate(&self, request: &GenerationRequest) -> Result<Value, ProviderError> {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_is_a_provider() {
        let provider = |request: &GenerationRequest| -> Result<Value, ProviderError> {
            Ok(json!({ "genre": format!("AT {}", request.bpm) }))
        };
        let request = GenerationRequest {
            bpm: 128,
            pattern_length: 16,
            min_melody_notes: 4,
        };
        let payload = provider.generate(&request).unwrap();
        assert_eq!(payload["genre"], "AT 128");
    }

    #[test]
    fn test_error_messages() {
        let err = ProviderError::Unavailable("timeout".to_string());
        assert_eq!(err.to_string(), "Provider unavailable: timeout");
    }
}
