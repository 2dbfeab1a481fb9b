use std::fs;

use study_core::{ConsentConfig, DesignType, OrderPolicy, RatingMode, StudyConfig};

const STUDY_YAML: &str = r#"
study:
  id: study1
  title: Meme perceptions
comprehensionChecks:
  - id: meme-def
    definition: A meme is a humorous image.
    question: What is a meme?
    options:
      - text: A recipe
        correct: false
      - text: A humorous image
        correct: true
    retryMessage: Please try again.
    maxAttempts: 2
    kickWarning: One attempt left.
memeExamples:
  introduction: Here are some examples.
  images:
    - src: /memes/1.png
      alt: first
  minViewingSeconds: 5
categories:
  - Video games
  - label: Snack foods
    key: snacks
dependentVariables:
  - id: appropriateness
    questionTemplate: How appropriate is it for {category} to post memes?
    scaleMin: 1
    scaleMax: 7
    minLabel: Not at all
    maxLabel: Very
  - id: cringe
    label: cringeworthy
    questionTemplate: How cringe is it for {category} to post memes?
    scaleMin: 1
    scaleMax: 7
design:
  type: within-subjects
  categoryOrder: randomized
  dvBlocking: fixed
  transitionText: Now rate how {trait} it is.
qualtricsReturnUrl: https://uni.qualtrics.com/jfe/form/SV_1
"#;

#[test]
fn yaml_config_parses_with_defaults() {
    let config = StudyConfig::from_yaml_str(STUDY_YAML).expect("parse");
    config.validate().expect("valid");
    assert_eq!(config.study.id, "study1");
    assert_eq!(config.categories[0].key, "video_games");
    assert_eq!(config.categories[1].key, "snacks");
    assert_eq!(config.design.kind, DesignType::WithinSubjects);
    assert_eq!(config.design.category_order, OrderPolicy::Randomized);
    assert_eq!(config.design.dv_blocking, OrderPolicy::Fixed);
    assert_eq!(config.design.rating_mode, RatingMode::Individual);
    assert_eq!(config.declined_path, "/no-consent");
    assert_eq!(config.consent, ConsentConfig::default());
    assert_eq!(config.stimulus.as_ref().unwrap().min_viewing_seconds, 5);
    assert_eq!(config.dependent_variables[1].display_label(), "cringeworthy");
    assert_eq!(config.dependent_variables[0].display_label(), "appropriateness");
    assert!(config.instructions.is_none());
}

#[test]
fn load_dispatches_on_extension() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_path = dir.path().join("study.yaml");
    fs::write(&yaml_path, STUDY_YAML).unwrap();
    let from_yaml = StudyConfig::load(&yaml_path).unwrap();

    let json_path = dir.path().join("study.json");
    fs::write(&json_path, serde_json::to_string(&from_yaml).unwrap()).unwrap();
    let from_json = StudyConfig::load(&json_path).unwrap();
    assert_eq!(from_yaml, from_json);
}

#[test]
fn validation_rejects_duplicate_category_keys() {
    let mut config = StudyConfig::from_yaml_str(STUDY_YAML).unwrap();
    config.categories[1].key = "video_games".into();
    let err = config.validate().unwrap_err();
    assert_eq!(err.code(), "config-duplicate-category");
}

#[test]
fn validation_rejects_checks_without_correct_option() {
    let mut config = StudyConfig::from_yaml_str(STUDY_YAML).unwrap();
    for option in &mut config.comprehension_checks[0].options {
        option.correct = false;
    }
    assert_eq!(config.validate().unwrap_err().code(), "config-no-correct-option");
}

#[test]
fn validation_rejects_inverted_scale_and_bad_url() {
    let mut config = StudyConfig::from_yaml_str(STUDY_YAML).unwrap();
    config.dependent_variables[0].scale_max = 1;
    assert_eq!(config.validate().unwrap_err().code(), "config-invalid-scale");

    let mut config = StudyConfig::from_yaml_str(STUDY_YAML).unwrap();
    config.return_url = "not a url".into();
    assert_eq!(config.validate().unwrap_err().code(), "config-invalid-return-url");
}

#[test]
fn malformed_yaml_is_a_config_error() {
    let err = StudyConfig::from_yaml_str("study: [unterminated").unwrap_err();
    assert_eq!(err.code(), "config-parse-yaml");
}

#[test]
fn partial_consent_section_keeps_default_copy() {
    let yaml = format!("{STUDY_YAML}\nconsent:\n  body: Custom terms.\n");
    let config = StudyConfig::from_yaml_str(&yaml).unwrap();
    assert_eq!(config.consent.title, ConsentConfig::default().title);
    assert_eq!(config.consent.body, "Custom terms.");
}
