//! Declarative study configuration.
//!
//! The document shape mirrors what study authors write in YAML: camelCase keys,
//! optional sections for every optional phase, and categories given either as
//! bare strings or as `{label, key}` pairs.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{ErrorInfo, StudyError};

/// Complete, immutable description of one study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyConfig {
    /// Study identity.
    pub study: StudyInfo,
    /// Consent copy. The consent phase is always shown; a document without
    /// this section gets [`ConsentConfig::default`].
    #[serde(default)]
    pub consent: ConsentConfig,
    /// Comprehension checks, visited in order.
    #[serde(default)]
    pub comprehension_checks: Vec<ComprehensionCheck>,
    /// Optional stimulus-exposure block shown before the rating blocks.
    #[serde(
        default,
        rename = "memeExamples",
        alias = "stimulus",
        skip_serializing_if = "Option::is_none"
    )]
    pub stimulus: Option<StimulusExposure>,
    /// Optional free-text instructions screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Rated categories.
    pub categories: Vec<Category>,
    /// Dependent variables; one is assigned to each rating block.
    pub dependent_variables: Vec<DependentVariable>,
    /// Experimental design descriptor.
    pub design: DesignConfig,
    /// Optional free-response phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_response: Option<FreeResponseConfig>,
    /// Optional demographics phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<DemographicsConfig>,
    /// Base address of the external survey platform.
    #[serde(rename = "qualtricsReturnUrl", alias = "returnUrl")]
    pub return_url: String,
    /// Destination shown to participants who decline consent.
    #[serde(default = "default_declined_path")]
    pub declined_path: String,
}

fn default_declined_path() -> String {
    "/no-consent".to_string()
}

/// Study identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyInfo {
    /// Stable identifier; scopes the completion marker.
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
}

/// Consent screen copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    /// Heading.
    pub title: String,
    /// Body text.
    pub body: String,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            title: "Informed Consent".to_string(),
            body: "Participation is voluntary. You may stop at any time without \
                   consequence, and no information that could identify you is collected."
                .to_string(),
        }
    }
}

/// One answer option of a comprehension check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComprehensionOption {
    /// Option text.
    pub text: String,
    /// Whether choosing this option passes the check.
    pub correct: bool,
}

/// A multiple-choice comprehension check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensionCheck {
    /// Identifier, unique within the study.
    pub id: String,
    /// Definition text shown above the question.
    pub definition: String,
    /// The question.
    pub question: String,
    /// Answer options in authoring order.
    pub options: Vec<ComprehensionOption>,
    /// Message shown after a wrong answer.
    pub retry_message: String,
    /// Wrong answers allowed before the participant is removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Message shown when exactly one attempt remains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kick_warning: Option<String>,
}

/// Image shown during stimulus exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusImage {
    /// Image source path or URL.
    pub src: String,
    /// Alternative text.
    #[serde(default)]
    pub alt: String,
}

/// Stimulus-exposure block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusExposure {
    /// Introductory text.
    pub introduction: String,
    /// Stimulus images in display order.
    #[serde(default)]
    pub images: Vec<StimulusImage>,
    /// Seconds the screen must be shown before continuing.
    #[serde(default)]
    pub min_viewing_seconds: u32,
}

/// A rated category with a stable machine key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "CategorySpec")]
pub struct Category {
    /// Display label.
    pub label: String,
    /// Key used in the rating map and the payload.
    pub key: String,
}

impl Category {
    /// Builds a category from a bare label, deriving its key.
    pub fn from_label(label: impl Into<String>) -> Self {
        let label = label.into();
        let key = canonical_key(&label);
        Self { label, key }
    }

    /// Builds a category with an explicit key.
    pub fn keyed(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategorySpec {
    Bare(String),
    Structured {
        label: String,
        #[serde(default)]
        key: Option<String>,
    },
}

impl From<CategorySpec> for Category {
    fn from(spec: CategorySpec) -> Self {
        match spec {
            CategorySpec::Bare(label) => Category::from_label(label),
            CategorySpec::Structured {
                label,
                key: Some(key),
            } => Category::keyed(label, key),
            CategorySpec::Structured { label, key: None } => Category::from_label(label),
        }
    }
}

/// Derives a rating-map key from a display label.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `_`, and trims underscores from both ends: `"Category A"` becomes
/// `category_a`.
pub fn canonical_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut pending_separator = false;
    for ch in label.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.push(ch);
        } else {
            pending_separator = true;
        }
    }
    key
}

/// Normalizes bare category labels into label/key pairs.
pub fn normalize_categories<S: AsRef<str>>(labels: &[S]) -> Vec<Category> {
    labels
        .iter()
        .map(|label| Category::from_label(label.as_ref()))
        .collect()
}

/// A rated dependent variable with a bounded integer scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependentVariable {
    /// Identifier used in the rating map and payload.
    pub id: String,
    /// Display label, when different from `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Question text containing a `{category}` placeholder.
    pub question_template: String,
    /// Lowest scale point.
    pub scale_min: i64,
    /// Highest scale point.
    pub scale_max: i64,
    /// Label of the lowest scale point.
    #[serde(default)]
    pub min_label: String,
    /// Label of the highest scale point.
    #[serde(default)]
    pub max_label: String,
}

impl DependentVariable {
    /// Label shown to participants, falling back to the id.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    /// Whether `value` is a point of this variable's scale.
    pub fn accepts(&self, value: i64) -> bool {
        (self.scale_min..=self.scale_max).contains(&value)
    }
}

/// Within- or between-subjects assignment of dependent variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DesignType {
    /// Every participant rates every dependent variable.
    WithinSubjects,
    /// The condition string selects the dependent variables.
    BetweenSubjects,
}

/// Whether an ordering is kept as authored or randomized per participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderPolicy {
    /// Keep configuration order.
    Fixed,
    /// Shuffle per participant.
    #[default]
    Randomized,
}

/// How a rating block collects answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RatingMode {
    /// One category per screen.
    #[default]
    Individual,
    /// All categories of the block on one screen.
    Batch,
}

/// Experimental design descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignConfig {
    /// Design type.
    #[serde(rename = "type")]
    pub kind: DesignType,
    /// Category ordering policy.
    #[serde(default)]
    pub category_order: OrderPolicy,
    /// Dependent-variable to block assignment policy.
    #[serde(default)]
    pub dv_blocking: OrderPolicy,
    /// Text of the screen between the blocks; may contain `{trait}`.
    #[serde(default)]
    pub transition_text: String,
    /// Optional intro before block 1; may contain `{trait}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_intro_template: Option<String>,
    /// Optional intro before block 2; may contain `{trait}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block2_intro_template: Option<String>,
    /// Rating mode.
    #[serde(default)]
    pub rating_mode: RatingMode,
}

/// Free-response phase settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeResponseConfig {
    /// The prompt.
    pub question: String,
    /// Warning shown next to the text box.
    #[serde(default)]
    pub ai_warning: String,
    /// Minimum answer length in characters.
    #[serde(default)]
    pub min_chars: usize,
    /// Maximum answer length in characters.
    pub max_chars: usize,
    /// Seconds before the answer can be submitted.
    #[serde(default)]
    pub min_seconds: u32,
    /// Placeholder text.
    #[serde(default)]
    pub placeholder: String,
}

/// Age question settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeField {
    /// Question label.
    pub label: String,
    /// Placeholder text.
    #[serde(default)]
    pub placeholder: String,
    /// Lowest accepted age.
    #[serde(default = "default_min_age")]
    pub min_age: u32,
    /// Highest accepted age.
    #[serde(default = "default_max_age")]
    pub max_age: u32,
}

fn default_min_age() -> u32 {
    18
}

fn default_max_age() -> u32 {
    120
}

/// Gender question settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderField {
    /// Question label.
    pub label: String,
    /// Selectable answers.
    pub options: Vec<String>,
}

/// Demographics phase settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicsConfig {
    /// Age question.
    pub age: AgeField,
    /// Gender question.
    pub gender: GenderField,
}

impl StudyConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, StudyError> {
        serde_yaml::from_str(text).map_err(|err| {
            StudyError::Config(
                ErrorInfo::new("config-parse-yaml", "failed to parse YAML study config")
                    .with_hint(err.to_string()),
            )
        })
    }

    /// Parses a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, StudyError> {
        serde_json::from_str(text).map_err(|err| {
            StudyError::Config(
                ErrorInfo::new("config-parse-json", "failed to parse JSON study config")
                    .with_hint(err.to_string()),
            )
        })
    }

    /// Loads and validates a config file; `.yaml`/`.yml` are read as YAML, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StudyError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            StudyError::Config(
                ErrorInfo::new("config-read", "failed to read study config")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text)?,
            _ => Self::from_json_str(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Looks up a dependent variable by id.
    pub fn dependent_variable(&self, id: &str) -> Option<&DependentVariable> {
        self.dependent_variables.iter().find(|dv| dv.id == id)
    }

    /// Looks up a category by key.
    pub fn category(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.key == key)
    }

    /// Checks the invariants the session relies on.
    pub fn validate(&self) -> Result<(), StudyError> {
        if self.study.id.trim().is_empty() {
            return Err(StudyError::config("config-empty-study-id", "study id is empty"));
        }
        if self.categories.is_empty() {
            return Err(StudyError::config("config-no-categories", "no categories configured"));
        }
        let mut keys = BTreeSet::new();
        for category in &self.categories {
            if category.key.is_empty() {
                return Err(StudyError::Config(
                    ErrorInfo::new("config-empty-category-key", "category key is empty")
                        .with_context("label", category.label.clone())
                        .with_hint("give the category an explicit key"),
                ));
            }
            if !keys.insert(category.key.as_str()) {
                return Err(StudyError::Config(
                    ErrorInfo::new("config-duplicate-category", "duplicate category key")
                        .with_context("key", category.key.clone()),
                ));
            }
        }
        if self.dependent_variables.is_empty() {
            return Err(StudyError::config(
                "config-no-dependent-variables",
                "no dependent variables configured",
            ));
        }
        let mut ids = BTreeSet::new();
        for dv in &self.dependent_variables {
            if !ids.insert(dv.id.as_str()) {
                return Err(StudyError::Config(
                    ErrorInfo::new("config-duplicate-dv", "duplicate dependent variable id")
                        .with_context("id", dv.id.clone()),
                ));
            }
            if dv.scale_min >= dv.scale_max {
                return Err(StudyError::Config(
                    ErrorInfo::new("config-invalid-scale", "scaleMin must be below scaleMax")
                        .with_context("id", dv.id.clone())
                        .with_context("scaleMin", dv.scale_min.to_string())
                        .with_context("scaleMax", dv.scale_max.to_string()),
                ));
            }
        }
        if self.design.kind == DesignType::WithinSubjects && self.dependent_variables.len() > 2 {
            return Err(StudyError::Config(
                ErrorInfo::new(
                    "config-too-many-dvs",
                    "within-subjects designs rate at most two dependent variables",
                )
                .with_context("count", self.dependent_variables.len().to_string())
                .with_hint("use a between-subjects design to select two per participant"),
            ));
        }
        for check in &self.comprehension_checks {
            if !check.options.iter().any(|option| option.correct) {
                return Err(StudyError::Config(
                    ErrorInfo::new("config-no-correct-option", "check has no correct option")
                        .with_context("check", check.id.clone()),
                ));
            }
            if check.max_attempts == Some(0) {
                return Err(StudyError::Config(
                    ErrorInfo::new("config-zero-attempts", "maxAttempts must be positive")
                        .with_context("check", check.id.clone()),
                ));
            }
        }
        if let Some(free) = &self.free_response {
            if free.min_chars > free.max_chars {
                return Err(StudyError::Config(
                    ErrorInfo::new("config-invalid-char-bounds", "minChars exceeds maxChars")
                        .with_context("minChars", free.min_chars.to_string())
                        .with_context("maxChars", free.max_chars.to_string()),
                ));
            }
        }
        if let Some(demographics) = &self.demographics {
            if demographics.age.min_age > demographics.age.max_age {
                return Err(StudyError::config(
                    "config-invalid-age-bounds",
                    "minAge exceeds maxAge",
                ));
            }
        }
        Url::parse(&self.return_url).map_err(|err| {
            StudyError::Config(
                ErrorInfo::new("config-invalid-return-url", "return URL does not parse")
                    .with_context("url", self.return_url.clone())
                    .with_hint(err.to_string()),
            )
        })?;
        Ok(())
    }
}
