use crate::capability::Capability;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const MODEL_VAR: &str = "ADVISOR_MODEL";
pub const ENDPOINT_VAR: &str = "ADVISOR_ENDPOINT";

/// Output cap and sampling temperature are fixed for every call.
pub const MAX_OUTPUT_TOKENS: u32 = 4000;
pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub capability: Capability,
    pub model: String,
    pub endpoint: String,
}

impl AdvisorConfig {
    pub fn from_env() -> Self {
        Self {
            capability: Capability::detect(),
            model: env_or(MODEL_VAR, DEFAULT_MODEL),
            endpoint: env_or(ENDPOINT_VAR, DEFAULT_ENDPOINT),
        }
    }

    pub fn with_capability(capability: Capability) -> Self {
        Self {
            capability,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_capability_uses_default_target() {
        let config = AdvisorConfig::with_capability(Capability::unavailable());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(!config.capability.is_available());
    }
}
