use std::fmt;

/// Failure kinds of the model path. None of these reach callers of the
/// advisory operations; the orchestrator converts each into a heuristic run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvisorError {
    #[error("Google Gemini API key not configured")]
    Unavailable,

    #[error("AI service is temporarily at capacity. Please try again in a few minutes.")]
    Quota,

    #[error("AI service configuration error. Please check your API key.")]
    AuthConfig,

    #[error("AI response could not be parsed: {0}")]
    MalformedResponse(String),

    #[error("AI service temporarily unavailable. Please try again.")]
    Unknown,
}

impl AdvisorError {
    pub fn malformed(detail: impl fmt::Display) -> Self {
        AdvisorError::MalformedResponse(detail.to_string())
    }

    /// Missing credentials are an expected state, not a fault.
    pub fn is_expected(&self) -> bool {
        matches!(self, AdvisorError::Unavailable)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AdvisorError::Unavailable => "unavailable",
            AdvisorError::Quota => "quota",
            AdvisorError::AuthConfig => "auth_config",
            AdvisorError::MalformedResponse(_) => "malformed_response",
            AdvisorError::Unknown => "unknown",
        }
    }
}

/// Raw failure reported by a model transport. Carries provider detail that
/// must never be shown to end users.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Structured signals first; the message substring match is a
    /// best-effort fallback tied to provider wording.
    pub fn classify(&self) -> AdvisorError {
        let code = self.code.as_deref().unwrap_or_default();

        if self.status == Some(429) || code == "RESOURCE_EXHAUSTED" {
            return AdvisorError::Quota;
        }
        if matches!(self.status, Some(401) | Some(403))
            || code == "UNAUTHENTICATED"
            || code == "PERMISSION_DENIED"
        {
            return AdvisorError::AuthConfig;
        }

        let message = self.message.to_ascii_lowercase();
        if message.contains("quota") || message.contains("rate limit") {
            AdvisorError::Quota
        } else if message.contains("api key") {
            AdvisorError::AuthConfig
        } else {
            AdvisorError::Unknown
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.code.as_deref()) {
            (Some(status), Some(code)) => write!(f, "HTTP {status} {code}: {}", self.message),
            (Some(status), None) => write!(f, "HTTP {status}: {}", self.message),
            (None, Some(code)) => write!(f, "{code}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProviderError {}
