//! Whether the AI path may be attempted at all.

/// Keys shipped in sample env files; treated as absent.
const PLACEHOLDER_KEYS: &[&str] = &[
    "your-openai-api-key",
    "your_openai_api_key",
    "your-api-key-here",
    "sk-your-key-here",
    "sk-placeholder",
    "changeme",
];

/// Shortest key accepted as plausibly real.
const MIN_KEY_LEN: usize = 10;

/// Capability value computed once per request context and handed to the
/// orchestrator, so call sites never re-inspect the key themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAvailability {
    Available,
    Unavailable(UnavailableReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    MissingKey,
    PlaceholderKey,
    KeyTooShort,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::MissingKey => "API key not set",
            UnavailableReason::PlaceholderKey => "API key is a placeholder",
            UnavailableReason::KeyTooShort => "API key too short",
        }
    }
}

impl AiAvailability {
    pub fn from_key(key: Option<&str>) -> Self {
        let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
            return AiAvailability::Unavailable(UnavailableReason::MissingKey);
        };
        if PLACEHOLDER_KEYS
            .iter()
            .any(|p| p.eq_ignore_ascii_case(key))
        {
            return AiAvailability::Unavailable(UnavailableReason::PlaceholderKey);
        }
        if key.chars().count() < MIN_KEY_LEN {
            return AiAvailability::Unavailable(UnavailableReason::KeyTooShort);
        }
        AiAvailability::Available
    }

    pub fn is_available(&self) -> bool {
        matches!(self, AiAvailability::Available)
    }
}
