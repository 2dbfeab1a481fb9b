#![allow(dead_code)]

use std::rc::Rc;

use serde_json::{json, Value};
use study_core::{ManualClock, RngHandle, StudyConfig, StudyError};
use study_flow::{
    CheckOutcome, InboundParams, MemoryStore, RecordingNavigator, SessionEnv, StudySession,
};

pub const STUDY_ID: &str = "memes-v1";
pub const START_MS: i64 = 1_700_000_000_000;

pub fn base_config() -> Value {
    json!({
        "study": { "id": STUDY_ID, "title": "Brand memes" },
        "consent": { "title": "Consent", "body": "You may stop at any time." },
        "comprehensionChecks": [
            {
                "id": "meme-definition",
                "definition": "A meme is an image with a caption.",
                "question": "Which of these is a meme?",
                "options": [
                    { "text": "A press release", "correct": false },
                    { "text": "A captioned image", "correct": true },
                    { "text": "A logo", "correct": false }
                ],
                "retryMessage": "Not quite, try again."
            },
            {
                "id": "brand-definition",
                "definition": "Brands post memes on social media.",
                "question": "Who posts the memes in this study?",
                "options": [
                    { "text": "Brands", "correct": true },
                    { "text": "Friends", "correct": false }
                ],
                "retryMessage": "Please reread the definition.",
                "maxAttempts": 2,
                "kickWarning": "One attempt left."
            }
        ],
        "memeExamples": {
            "introduction": "Here are some examples.",
            "images": [{ "src": "/memes/1.png", "alt": "Example" }],
            "minViewingSeconds": 5
        },
        "categories": ["Video games", "Snack foods"],
        "dependentVariables": [
            {
                "id": "appropriateness",
                "label": "appropriate",
                "questionTemplate": "How {trait} is it for {category} to post memes?",
                "scaleMin": 1,
                "scaleMax": 7,
                "minLabel": "Not at all",
                "maxLabel": "Very"
            },
            {
                "id": "cringe",
                "questionTemplate": "How {trait} is it when {category} post memes?",
                "scaleMin": 1,
                "scaleMax": 7
            }
        ],
        "design": {
            "type": "within-subjects",
            "transitionText": "Next you will rate how {trait} the posts are."
        },
        "qualtricsReturnUrl": "https://survey.example.com/jfe/form/SV_abc?source=lab"
    })
}

pub fn config_from(value: Value) -> Rc<StudyConfig> {
    Rc::new(StudyConfig::from_json_str(&value.to_string()).expect("fixture config parses"))
}

/// Shared handles onto the collaborators a session was started with.
#[derive(Debug, Clone)]
pub struct Harness {
    pub clock: ManualClock,
    pub store: MemoryStore,
    pub navigator: RecordingNavigator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            clock: ManualClock::new(START_MS),
            store,
            navigator: RecordingNavigator::new(),
        }
    }

    pub fn env(&self) -> SessionEnv {
        SessionEnv {
            clock: Box::new(self.clock.clone()),
            store: Box::new(self.store.clone()),
            navigator: Box::new(self.navigator.clone()),
        }
    }

    pub fn try_start(
        &self,
        config: Rc<StudyConfig>,
        query: &str,
        seed: u64,
    ) -> Result<StudySession, StudyError> {
        StudySession::start(
            config,
            &InboundParams::from_query(query),
            self.env(),
            RngHandle::from_seed(seed),
        )
    }

    pub fn start(&self, config: Rc<StudyConfig>, query: &str) -> StudySession {
        self.try_start(config, query, 7).expect("session starts")
    }
}

pub fn displayed_position(session: &StudySession, correct: bool) -> usize {
    session
        .check()
        .expect("a check is on screen")
        .options()
        .iter()
        .position(|entry| entry.item.correct == correct)
        .expect("option exists")
}

pub fn answer_check(session: &mut StudySession, correct: bool) -> CheckOutcome {
    let position = displayed_position(session, correct);
    session.select_option(position).unwrap();
    session.submit_check().unwrap()
}

/// Consent, both checks and the stimulus screen.
pub fn through_preamble(session: &mut StudySession, clock: &ManualClock) {
    session.accept_consent().unwrap();
    assert_eq!(answer_check(session, true), CheckOutcome::Passed);
    assert_eq!(answer_check(session, true), CheckOutcome::Passed);
    clock.advance(5_000);
    session.continue_stimulus().unwrap();
}

/// Rates every category of the current block with `value`.
pub fn rate_block(session: &mut StudySession, value: i64) {
    let block = session.phase().block().expect("in a block");
    let count = session.state().block_order(block).len();
    for _ in 0..count {
        session.submit_rating(value).unwrap();
    }
}
