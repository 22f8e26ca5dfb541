//! Pattern store and admission.
//!
//! Placement patterns arrive from the host as JSON. Admission is the only
//! place they are checked and compiled:
//!
//! ```text
//! JSON value ── validate_pattern ──┬─ identity: slotPattern / divPattern (≥ 1)
//!                                  ├─ mediaTypes.banner.sizes (coerce / drop)
//!                                  └─ typed PatternSpec
//!            ── compile ───────────── case-insensitive regexes
//!            ── resolve media types ─ mtoRevId → registered config
//!            ── push (registration order = PatternId)
//! ```
//!
//! Rejected patterns never enter the store; each rejection is logged and
//! reported in the [`AdmissionReport`].
//!
//! ## Invariants
//!
//! - Every stored pattern has at least one identity predicate.
//! - `PatternId` equals the pattern's index in `patterns`; the store is
//!   append-only so ids stay stable for the life of the engine.
//! - Stored patterns are never mutated except to fill in media types from a
//!   media-type config registered after the pattern.

use super::sizes::parse_size_list;
use crate::MediaTypes;
use crate::error::PatternError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, error};

/// Registration index of a stored pattern.
pub type PatternId = usize;

/// The serializable body of a placement pattern.
///
/// Everything the engine does not interpret (bid configuration, arbitrary
/// extra keys) passes through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub div_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_types: Option<MediaTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mto_rev_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bids: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An admitted pattern with its identity regexes compiled.
#[derive(Debug, Clone)]
pub struct AdUnitPattern {
    id: PatternId,
    spec: PatternSpec,
    slot_regex: Option<Regex>,
    div_regex: Option<Regex>,
}

impl AdUnitPattern {
    fn compile(id: PatternId, spec: PatternSpec) -> Result<Self, PatternError> {
        let slot_regex = compile_identity(spec.slot_pattern.as_deref(), "slotPattern")?;
        let div_regex = compile_identity(spec.div_pattern.as_deref(), "divPattern")?;
        Ok(Self { id, spec, slot_regex, div_regex })
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn spec(&self) -> &PatternSpec {
        &self.spec
    }

    pub fn code(&self) -> Option<&str> {
        self.spec.code.as_deref()
    }

    pub fn slot_pattern(&self) -> Option<&str> {
        self.spec.slot_pattern.as_deref()
    }

    pub fn div_pattern(&self) -> Option<&str> {
        self.spec.div_pattern.as_deref()
    }

    /// Test the slot predicate; `None` when the pattern has none.
    pub fn test_slot(&self, path: &str) -> Option<bool> {
        self.slot_regex.as_ref().map(|re| re.is_match(path))
    }

    /// Test the div predicate; `None` when the pattern has none.
    pub fn test_div(&self, id: &str) -> Option<bool> {
        self.div_regex.as_ref().map(|re| re.is_match(id))
    }

    /// Whether the pattern still waits for a media-type config.
    pub fn has_unresolved_media_types(&self) -> bool {
        self.spec.media_types.is_none() && self.spec.mto_rev_id.is_some()
    }

    /// Short human label for logs.
    pub(crate) fn label(&self) -> String {
        match (&self.spec.code, &self.spec.slot_pattern, &self.spec.div_pattern) {
            (Some(code), _, _) => code.clone(),
            (None, Some(slot), _) => format!("#{} slot:{}", self.id, slot),
            (None, None, Some(div)) => format!("#{} div:{}", self.id, div),
            (None, None, None) => format!("#{}", self.id),
        }
    }

    #[cfg(test)]
    pub(crate) fn compile_for_test(raw: Value) -> Self {
        let spec = validate_pattern(raw).expect("valid test pattern");
        Self::compile(0, spec).expect("compilable test pattern")
    }
}

fn compile_identity(source: Option<&str>, field: &'static str) -> Result<Option<Regex>, PatternError> {
    let Some(source) = source else {
        return Ok(None);
    };
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| PatternError::InvalidRegex { field, reason: e.to_string() })
}

/// Outcome of one `add_patterns` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdmissionReport {
    pub admitted: Vec<PatternId>,
    /// `(position in the submitted batch, reason)`.
    pub rejected: Vec<(usize, PatternError)>,
}

/// Registered placement patterns, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PatternStore {
    patterns: Vec<AdUnitPattern>,
    media_type_configs: HashMap<u64, MediaTypes>,
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patterns(&self) -> &[AdUnitPattern] {
        &self.patterns
    }

    pub fn get(&self, id: PatternId) -> Option<&AdUnitPattern> {
        self.patterns.get(id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Validate, compile and append every pattern in `raw`. Invalid entries
    /// are dropped with a logged reason; valid ones are admitted regardless.
    pub fn add_patterns(&mut self, raw: impl IntoIterator<Item = Value>) -> AdmissionReport {
        let mut report = AdmissionReport::default();
        for (position, value) in raw.into_iter().enumerate() {
            match self.admit(value) {
                Ok(id) => report.admitted.push(id),
                Err(err) => {
                    error!(position, %err, "error creating placement pattern");
                    report.rejected.push((position, err));
                }
            }
        }
        report
    }

    fn admit(&mut self, raw: Value) -> Result<PatternId, PatternError> {
        let mut spec = validate_pattern(raw)?;
        self.resolve_media_types(&mut spec);
        let pattern = AdUnitPattern::compile(self.patterns.len(), spec)?;
        debug!(pattern = %pattern.label(), "placement pattern admitted");
        let id = pattern.id;
        self.patterns.push(pattern);
        Ok(id)
    }

    /// Register media-type configs keyed by revision id and fill them into
    /// any stored pattern still waiting for one.
    pub fn add_media_type_configs(&mut self, configs: HashMap<u64, MediaTypes>) {
        self.media_type_configs.extend(configs);
        let configs = &self.media_type_configs;
        for pattern in &mut self.patterns {
            if let Some(media_types) = pattern.spec.mto_rev_id.and_then(|rev| configs.get(&rev)) {
                if pattern.spec.media_types.is_none() {
                    pattern.spec.media_types = Some(media_types.clone());
                    pattern.spec.mto_rev_id = None;
                }
            }
        }
    }

    fn resolve_media_types(&self, spec: &mut PatternSpec) {
        if spec.media_types.is_some() {
            return;
        }
        if let Some(media_types) = spec.mto_rev_id.and_then(|rev| self.media_type_configs.get(&rev)) {
            spec.media_types = Some(media_types.clone());
            spec.mto_rev_id = None;
        }
    }
}

/// Check a raw pattern and turn it into a [`PatternSpec`].
pub(crate) fn validate_pattern(mut raw: Value) -> Result<PatternSpec, PatternError> {
    let object = raw.as_object_mut().ok_or(PatternError::NotAnObject)?;

    let slot = identity_field(object, "slotPattern")?;
    let div = identity_field(object, "divPattern")?;
    if !slot && !div {
        return Err(PatternError::MissingIdentity);
    }

    if let Some(sizes) = object.get_mut("mediaTypes").and_then(|m| m.get_mut("banner")).and_then(|b| b.get_mut("sizes"))
    {
        let list = parse_size_list(sizes).ok_or(PatternError::SizesNotArray)?;
        for bad in &list.malformed {
            error!(size = %bad, "invalid pattern size dropped");
        }
        *sizes = serde_json::to_value(&list.sizes).map_err(|e| PatternError::Malformed(e.to_string()))?;
    }

    serde_json::from_value(raw).map_err(|e| PatternError::Malformed(e.to_string()))
}

/// Normalize one identity field: empty strings count as absent. Returns
/// whether the field is present.
fn identity_field(object: &mut Map<String, Value>, field: &'static str) -> Result<bool, PatternError> {
    match object.get(field) {
        None | Some(Value::Null) => {
            object.remove(field);
            Ok(false)
        }
        Some(Value::String(s)) if s.is_empty() => {
            object.remove(field);
            Ok(false)
        }
        Some(Value::String(_)) => Ok(true),
        Some(_) => Err(PatternError::IdentityNotString { field }),
    }
}
