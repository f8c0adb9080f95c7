//! Deterministic cache keys.
//!
//! A fingerprint is the canonical JSON serialization of everything that
//! affects the remote output: operation, model, input and, for generation,
//! the effective settings. Struct fields serialize in declaration order and
//! safety settings live in a `BTreeSet`, so logically equal requests produce
//! byte-identical keys no matter how their settings were assembled.

use std::fmt;

use serde::Serialize;

use crate::types::{GenerationSettings, SafetySetting};

/// Cache key for one request. Never sent to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    /// Key for a text generation request.
    pub fn generate(model: &str, prompt: &str, settings: &GenerationSettings) -> Self {
        Self::canonical(&CanonicalRequest {
            operation: "generate",
            model,
            input: prompt,
            settings: Some(CanonicalSettings::from(settings)),
        })
    }

    /// Key for an embedding request.
    pub fn embed(model: &str, text: &str) -> Self {
        Self::canonical(&CanonicalRequest {
            operation: "embed",
            model,
            input: text,
            settings: None,
        })
    }

    fn canonical(request: &CanonicalRequest<'_>) -> Self {
        // Serializing plain structs of strings, integers and finite floats
        // cannot fail.
        let key = serde_json::to_string(request).unwrap_or_default();
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct CanonicalRequest<'a> {
    operation: &'static str,
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<CanonicalSettings<'a>>,
}

#[derive(Serialize)]
struct CanonicalSettings<'a> {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
    candidate_count: u32,
    stop_sequences: &'a [String],
    safety_settings: Vec<&'a SafetySetting>,
}

impl<'a> From<&'a GenerationSettings> for CanonicalSettings<'a> {
    fn from(settings: &'a GenerationSettings) -> Self {
        Self {
            temperature: unsigned_zero(settings.temperature),
            max_output_tokens: settings.max_output_tokens,
            top_p: unsigned_zero(settings.top_p),
            top_k: settings.top_k,
            candidate_count: settings.candidate_count,
            stop_sequences: &settings.stop_sequences,
            safety_settings: settings.safety_settings.iter().collect(),
        }
    }
}

/// `-0.0` and `0.0` compare equal but serialize differently.
fn unsigned_zero(value: f32) -> f32 {
    if value == 0.0 { 0.0 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SettingsOverrides;
    use crate::types::settings::validate;

    fn settings(overrides: SettingsOverrides) -> GenerationSettings {
        validate(&overrides).unwrap()
    }

    #[test]
    fn identical_requests_share_a_key() {
        let s = settings(SettingsOverrides::new().temperature(0.7));
        assert_eq!(
            RequestFingerprint::generate("gemini-pro", "hello", &s),
            RequestFingerprint::generate("gemini-pro", "hello", &s)
        );
    }

    #[test]
    fn construction_order_is_irrelevant() {
        let a = settings(
            SettingsOverrides::new()
                .top_k(10)
                .temperature(0.3)
                .safety_setting("HARM_CATEGORY_HATE_SPEECH", "BLOCK_NONE")
                .safety_setting("HARM_CATEGORY_HARASSMENT", "BLOCK_NONE"),
        );
        let b = settings(
            SettingsOverrides::new()
                .safety_setting("HARM_CATEGORY_HARASSMENT", "BLOCK_NONE")
                .temperature(0.3)
                .safety_setting("HARM_CATEGORY_HATE_SPEECH", "BLOCK_NONE")
                .top_k(10),
        );
        assert_eq!(
            RequestFingerprint::generate("m", "p", &a),
            RequestFingerprint::generate("m", "p", &b)
        );
    }

    #[test]
    fn explicit_default_equals_absent_field() {
        let explicit = settings(SettingsOverrides::new().temperature(0.7));
        let implicit = settings(SettingsOverrides::new());
        assert_eq!(
            RequestFingerprint::generate("m", "p", &explicit),
            RequestFingerprint::generate("m", "p", &implicit)
        );
    }

    #[test]
    fn negative_zero_matches_zero() {
        let neg = settings(SettingsOverrides::new().temperature(-0.0));
        let pos = settings(SettingsOverrides::new().temperature(0.0));
        assert_eq!(
            RequestFingerprint::generate("m", "p", &neg),
            RequestFingerprint::generate("m", "p", &pos)
        );
    }

    #[test]
    fn differs_on_prompt_settings_and_model() {
        let s = settings(SettingsOverrides::new());
        let base = RequestFingerprint::generate("m", "p", &s);
        assert_ne!(base, RequestFingerprint::generate("m", "q", &s));
        assert_ne!(base, RequestFingerprint::generate("n", "p", &s));
        assert_ne!(
            base,
            RequestFingerprint::generate("m", "p", &settings(SettingsOverrides::new().top_k(5)))
        );
    }

    #[test]
    fn stop_sequence_order_matters() {
        let ab = settings(SettingsOverrides::new().stop_sequence("a").stop_sequence("b"));
        let ba = settings(SettingsOverrides::new().stop_sequence("b").stop_sequence("a"));
        assert_ne!(
            RequestFingerprint::generate("m", "p", &ab),
            RequestFingerprint::generate("m", "p", &ba)
        );
    }

    #[test]
    fn prompt_cannot_collide_with_separator_tricks() {
        let s = settings(SettingsOverrides::new());
        assert_ne!(
            RequestFingerprint::generate("m", "a-{}", &s),
            RequestFingerprint::generate("m", "a", &s)
        );
    }

    #[test]
    fn embed_and_generate_namespaces_differ() {
        let s = settings(SettingsOverrides::new());
        assert_ne!(
            RequestFingerprint::embed("m", "p").as_str(),
            RequestFingerprint::generate("m", "p", &s).as_str()
        );
    }
}
