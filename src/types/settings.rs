//! Generation settings: caller overrides, documented defaults, and bounds.
//!
//! Callers supply a [`SettingsOverrides`] with only the fields they care
//! about. [`GenerationSettings::resolve`] overlays it onto the defaults field
//! by field (an explicit value always wins, including `0.0`), then checks
//! every field against its bound.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{GenkitError, Result};

pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const MAX_OUTPUT_TOKENS_RANGE: RangeInclusive<u32> = 1..=1024;
pub const TOP_P_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const TOP_K_RANGE: RangeInclusive<u32> = 1..=100;
pub const CANDIDATE_COUNT_RANGE: RangeInclusive<u32> = 1..=8;

/// How out-of-range settings are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsPolicy {
    /// Fail the request with a configuration error naming the field.
    #[default]
    Reject,

    /// Clamp numeric values into bounds (non-finite values fall back to the
    /// default) and drop blank safety settings, logging each adjustment.
    Clamp,
}

/// A single (harm category, block threshold) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }
}

/// Fully resolved generation settings. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    pub candidate_count: u32,
    pub stop_sequences: Vec<String>,
    /// A set: ordering of the caller's input is irrelevant.
    pub safety_settings: BTreeSet<SafetySetting>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 1024,
            top_p: 0.95,
            top_k: 40,
            candidate_count: 1,
            stop_sequences: Vec::new(),
            safety_settings: BTreeSet::from([
                SafetySetting::new("HARM_CATEGORY_HARASSMENT", "BLOCK_HIGH_AND_ABOVE"),
                SafetySetting::new("HARM_CATEGORY_HATE_SPEECH", "BLOCK_HIGH_AND_ABOVE"),
            ]),
        }
    }
}

impl GenerationSettings {
    /// Overlay `overrides` onto the defaults and reject out-of-range fields.
    pub fn resolve(overrides: &SettingsOverrides) -> Result<Self> {
        Self::resolve_with(overrides, SettingsPolicy::Reject)
    }

    /// Like [`resolve`](Self::resolve), with an explicit out-of-range policy.
    pub fn resolve_with(overrides: &SettingsOverrides, policy: SettingsPolicy) -> Result<Self> {
        let defaults = Self::default();

        let safety_settings = match &overrides.safety_settings {
            None => defaults.safety_settings,
            Some(settings) => resolve_safety_settings(settings, policy)?,
        };

        Ok(Self {
            temperature: bounded_f32(
                "temperature",
                overrides.temperature,
                defaults.temperature,
                TEMPERATURE_RANGE,
                policy,
            )?,
            max_output_tokens: bounded_u32(
                "max_output_tokens",
                overrides.max_output_tokens,
                defaults.max_output_tokens,
                MAX_OUTPUT_TOKENS_RANGE,
                policy,
            )?,
            top_p: bounded_f32(
                "top_p",
                overrides.top_p,
                defaults.top_p,
                TOP_P_RANGE,
                policy,
            )?,
            top_k: bounded_u32(
                "top_k",
                overrides.top_k,
                defaults.top_k,
                TOP_K_RANGE,
                policy,
            )?,
            candidate_count: bounded_u32(
                "candidate_count",
                overrides.candidate_count,
                defaults.candidate_count,
                CANDIDATE_COUNT_RANGE,
                policy,
            )?,
            stop_sequences: overrides
                .stop_sequences
                .clone()
                .unwrap_or(defaults.stop_sequences),
            safety_settings,
        })
    }
}

/// Resolve overrides against the defaults, rejecting out-of-range values.
pub fn validate(overrides: &SettingsOverrides) -> Result<GenerationSettings> {
    GenerationSettings::resolve(overrides)
}

fn bounded_f32(
    field: &str,
    value: Option<f32>,
    default: f32,
    range: RangeInclusive<f32>,
    policy: SettingsPolicy,
) -> Result<f32> {
    let Some(v) = value else {
        return Ok(default);
    };
    if v.is_finite() && range.contains(&v) {
        return Ok(v);
    }
    match policy {
        SettingsPolicy::Reject => Err(GenkitError::configuration(
            field,
            format!(
                "must be within [{}, {}], got {v}",
                range.start(),
                range.end()
            ),
        )),
        SettingsPolicy::Clamp => {
            let adjusted = if v.is_finite() {
                v.clamp(*range.start(), *range.end())
            } else {
                default
            };
            warn!(field, requested = %v, adjusted, "clamped generation setting");
            Ok(adjusted)
        }
    }
}

fn bounded_u32(
    field: &str,
    value: Option<u32>,
    default: u32,
    range: RangeInclusive<u32>,
    policy: SettingsPolicy,
) -> Result<u32> {
    let Some(v) = value else {
        return Ok(default);
    };
    if range.contains(&v) {
        return Ok(v);
    }
    match policy {
        SettingsPolicy::Reject => Err(GenkitError::configuration(
            field,
            format!(
                "must be within [{}, {}], got {v}",
                range.start(),
                range.end()
            ),
        )),
        SettingsPolicy::Clamp => {
            let adjusted = v.clamp(*range.start(), *range.end());
            warn!(field, requested = v, adjusted, "clamped generation setting");
            Ok(adjusted)
        }
    }
}

fn resolve_safety_settings(
    settings: &[SafetySetting],
    policy: SettingsPolicy,
) -> Result<BTreeSet<SafetySetting>> {
    let mut resolved = BTreeSet::new();
    for setting in settings {
        let blank = setting.category.trim().is_empty() || setting.threshold.trim().is_empty();
        if !blank {
            resolved.insert(setting.clone());
            continue;
        }
        match policy {
            SettingsPolicy::Reject => {
                return Err(GenkitError::configuration(
                    "safety_settings",
                    "category and threshold must be non-empty",
                ));
            }
            SettingsPolicy::Clamp => {
                warn!(?setting, "dropped blank safety setting");
            }
        }
    }
    Ok(resolved)
}

/// Caller-supplied partial settings. Absent fields take the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,

    /// Replaces the default stop sequences when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    /// Replaces the default safety settings when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_settings: Option<Vec<SafetySetting>>,
}

impl SettingsOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn candidate_count(mut self, candidate_count: u32) -> Self {
        self.candidate_count = Some(candidate_count);
        self
    }

    /// Append a stop sequence.
    pub fn stop_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.stop_sequences
            .get_or_insert_with(Vec::new)
            .push(sequence.into());
        self
    }

    /// Add a safety setting. The first call replaces the defaults.
    pub fn safety_setting(
        mut self,
        category: impl Into<String>,
        threshold: impl Into<String>,
    ) -> Self {
        self.safety_settings
            .get_or_insert_with(Vec::new)
            .push(SafetySetting::new(category, threshold));
        self
    }
}
