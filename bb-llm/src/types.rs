use crate::error::GenerationErrorKind;

pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Token budget used by `generate_with_context` when the caller gives none.
pub const CONTEXT_MAX_TOKENS: u32 = 1000;

pub const DEFAULT_SYSTEM_MESSAGE: &str = "Ты - профессиональный помощник для владельцев малого бизнеса. \
Твоя задача - создавать качественный коммерческий контент и давать практические советы. \
Будь конкретным, полезным и дружелюбным. Отвечай на русском языке.";

/// One generation call. Nothing here outlives the call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub system_message: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), GenerationErrorKind> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(GenerationErrorKind::InvalidRequest(format!(
                "temperature must be within [0.0, 1.0], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(GenerationErrorKind::InvalidRequest(
                "max_tokens must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Prefixes `prompt` with a context block. Empty or absent context leaves the
/// prompt untouched.
pub fn with_context(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) if !ctx.is_empty() => format!("Context: {ctx}\n\n{prompt}"),
        _ => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let req = GenerationRequest::new("hi");
        assert_eq!(req.max_tokens, 2000);
        assert_eq!(req.temperature, 0.7);
        assert_eq!(req.system_message, DEFAULT_SYSTEM_MESSAGE);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn temperature_bounds_are_inclusive() {
        assert!(GenerationRequest::new("x").temperature(0.0).validate().is_ok());
        assert!(GenerationRequest::new("x").temperature(1.0).validate().is_ok());
        assert!(GenerationRequest::new("x").temperature(1.01).validate().is_err());
        assert!(GenerationRequest::new("x").temperature(-0.1).validate().is_err());
        assert!(GenerationRequest::new("x").temperature(f64::NAN).validate().is_err());
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let err = GenerationRequest::new("x").max_tokens(0).validate().unwrap_err();
        assert!(matches!(err, GenerationErrorKind::InvalidRequest(_)));
    }

    #[test]
    fn context_prefix_only_when_non_empty() {
        assert_eq!(with_context("X", Some("Y")), "Context: Y\n\nX");
        assert_eq!(with_context("X", None), "X");
        assert_eq!(with_context("X", Some("")), "X");
    }
}
