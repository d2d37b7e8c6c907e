use regex::{Captures, Regex};
use std::fmt;
use std::sync::OnceLock;

/// Masks credentials in messages shown to users.
///
/// Error strings from HTTP backends can echo request headers or bodies, so
/// every user-visible failure line passes through [`SecretScrubber::scrub_message`].
pub struct SecretScrubber {
    key_pattern: Regex,
    bearer_pattern: Regex,
    header_pattern: Regex,
    field_pattern: Regex,
}

impl SecretScrubber {
    /// Shared instance; patterns are compiled once.
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<SecretScrubber> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("scrubber pattern is valid");
        Self {
            // OpenAI/Groq style keys and Pinecone keys
            key_pattern: compile(r"\b(?:sk-[A-Za-z0-9_-]{16,}|gsk_[A-Za-z0-9]{16,}|pcsk_[A-Za-z0-9_]{16,})"),
            bearer_pattern: compile(r"Bearer\s+[A-Za-z0-9._~+/=-]+"),
            header_pattern: compile(r"(?i)\b(api-key|x-api-key)(\s*[:=]\s*)[^\s,;]+"),
            field_pattern: compile(r#"(?i)(["']?(?:api_key|apikey|token|secret)["']?\s*[:=]\s*["']?)[^"'\s,}]+"#),
        }
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        let scrubbed = self.key_pattern.replace_all(message, "[API_KEY_REDACTED]");
        let scrubbed = self
            .bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        let scrubbed = self
            .header_pattern
            .replace_all(&scrubbed, |caps: &Captures| {
                format!("{}{}[REDACTED]", &caps[1], &caps[2])
            });
        self.field_pattern
            .replace_all(&scrubbed, |caps: &Captures| format!("{}[REDACTED]", &caps[1]))
            .into_owned()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
