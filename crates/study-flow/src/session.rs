//! The study-session orchestrator.
//!
//! A [`StudySession`] owns the per-participant state and is the only thing
//! that mutates it. Every participant action is a method; each checks that it
//! is legal in the current phase, validates its input and either applies the
//! whole transition or returns an error without touching state.

use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use study_core::rng::COMPREHENSION_STREAM_BASE;
use study_core::{
    Category, Clock, DependentVariable, ErrorInfo, RatingMode, RngHandle, StudyConfig, StudyError,
};
use url::Url;

use crate::assignment::Assignment;
use crate::codec::encode_payload;
use crate::comprehension::{CheckAttempt, CheckOutcome};
use crate::gate::DwellGate;
use crate::handoff::{HandoffDispatcher, HandoffRequest, Navigator};
use crate::params::ParamSource;
use crate::payload::{build_payload, StudyPayload, Timestamps};
use crate::phase::{Block, Phase};
use crate::ratings::{RatingMap, ResponseRecord};
use crate::screen::{self, Screen};
use crate::store::CompletionStore;

/// Everything the session captures about one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// `pid` from the study link.
    pub participant_id: Option<String>,
    /// `cond` from the study link.
    pub condition: Option<String>,
    /// Current phase.
    pub phase: Phase,
    /// Realized DV order; one per block.
    pub dv_order: Vec<String>,
    /// Categories in block 1 order.
    pub block1_order: Vec<Category>,
    /// Categories in block 2 order.
    pub block2_order: Vec<Category>,
    /// Position within the current block's category order.
    pub cursor: usize,
    /// Answers so far.
    pub responses: ResponseRecord,
    /// Session and block start times.
    pub timestamps: Timestamps,
}

impl SessionState {
    fn loading() -> Self {
        Self {
            participant_id: None,
            condition: None,
            phase: Phase::Loading,
            dv_order: Vec::new(),
            block1_order: Vec::new(),
            block2_order: Vec::new(),
            cursor: 0,
            responses: ResponseRecord::default(),
            timestamps: Timestamps::default(),
        }
    }

    /// Category order of `block`.
    pub fn block_order(&self, block: Block) -> &[Category] {
        match block {
            Block::First => &self.block1_order,
            Block::Second => &self.block2_order,
        }
    }
}

/// Side-effecting collaborators of a session.
#[derive(Debug)]
pub struct SessionEnv {
    /// Time source for timestamps and gates.
    pub clock: Box<dyn Clock>,
    /// Where the completion marker lives.
    pub store: Box<dyn CompletionStore>,
    /// Performs the final handoff.
    pub navigator: Box<dyn Navigator>,
}

/// Phases a session with `dv_count` dependent variables visits, in order.
///
/// Consent always comes first. Optional phases appear only when their
/// configuration section is present; the transition and block 2 appear only
/// when a second DV is assigned.
pub fn phase_chain(config: &StudyConfig, dv_count: usize) -> Vec<Phase> {
    let two_blocks = dv_count > 1;
    let mut chain = vec![Phase::Consent];
    chain.extend((0..config.comprehension_checks.len()).map(|index| Phase::Comprehension { index }));
    if config.stimulus.is_some() {
        chain.push(Phase::Stimulus);
    }
    if config.instructions.is_some() {
        chain.push(Phase::Instructions);
    }
    if config.design.block_intro_template.is_some() {
        chain.push(Phase::Block1Intro);
    }
    chain.push(Phase::Block1);
    if two_blocks {
        chain.push(Phase::Transition);
        if config.design.block2_intro_template.is_some() {
            chain.push(Phase::Block2Intro);
        }
        chain.push(Phase::Block2);
    }
    if config.free_response.is_some() {
        chain.push(Phase::FreeResponse);
    }
    if config.demographics.is_some() {
        chain.push(Phase::Demographics);
    }
    chain.push(Phase::Redirect);
    chain
}

/// One participant's pass through the study.
#[derive(Debug)]
pub struct StudySession {
    config: Rc<StudyConfig>,
    clock: Box<dyn Clock>,
    store: Box<dyn CompletionStore>,
    dispatcher: HandoffDispatcher,
    rng: RngHandle,
    state: SessionState,
    chain: Vec<Phase>,
    check: Option<CheckAttempt>,
    gate: Option<DwellGate>,
    payload: Option<StudyPayload>,
    handoff: Option<Url>,
}

impl StudySession {
    /// Enters the study.
    ///
    /// A study already completed in `env.store` lands on
    /// [`Phase::AlreadyCompleted`] without reading `params` or drawing any
    /// randomness. Otherwise the participant's assignment is drawn from `rng`
    /// and the first phase of the chain is entered.
    pub fn start(
        config: Rc<StudyConfig>,
        params: &dyn ParamSource,
        env: SessionEnv,
        rng: RngHandle,
    ) -> Result<Self, StudyError> {
        config.validate()?;
        let SessionEnv {
            clock,
            store,
            navigator,
        } = env;
        let mut session = Self {
            config,
            clock,
            store,
            dispatcher: HandoffDispatcher::new(navigator),
            rng,
            state: SessionState::loading(),
            chain: Vec::new(),
            check: None,
            gate: None,
            payload: None,
            handoff: None,
        };

        let study_id = session.config.study.id.clone();
        let completed = session.store.is_completed(&study_id).unwrap_or_else(|err| {
            warn!("completion marker for {study_id} unreadable, continuing: {err}");
            false
        });
        if completed {
            info!("study {study_id} already completed on this device");
            session.enter(Phase::AlreadyCompleted)?;
            return Ok(session);
        }

        let inbound = params.read();
        let assignment =
            Assignment::draw(&session.config, inbound.condition.as_deref(), &session.rng)?;
        info!(
            "starting study {study_id} ({:?}) for participant {:?}, dv order {:?}, seed {}",
            session.config.design.kind,
            inbound.participant_id,
            assignment.dv_order,
            session.rng.seed()
        );
        session.chain = phase_chain(&session.config, assignment.dv_order.len());
        session.state.responses = ResponseRecord::new(RatingMap::with_buckets(assignment.selected));
        session.state.participant_id = inbound.participant_id;
        session.state.condition = inbound.condition;
        session.state.dv_order = assignment.dv_order;
        session.state.block1_order = assignment.block1_order;
        session.state.block2_order = assignment.block2_order;
        session.state.timestamps.session_start = Some(session.clock.now_ms());

        let first = session.chain.first().copied().unwrap_or(Phase::Redirect);
        session.enter(first)?;
        Ok(session)
    }

    /// The study being run.
    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Everything captured so far.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Phases this session visits, as fixed at entry.
    pub fn chain(&self) -> &[Phase] {
        &self.chain
    }

    /// The comprehension check on screen, if any.
    pub fn check(&self) -> Option<&CheckAttempt> {
        self.check.as_ref()
    }

    /// Seconds until the current screen's gate opens; zero when ungated.
    pub fn gate_remaining_seconds(&self) -> u32 {
        self.gate
            .as_ref()
            .map_or(0, |gate| gate.remaining_seconds(self.clock.now_ms()))
    }

    /// The record handed off on entering [`Phase::Redirect`].
    pub fn payload(&self) -> Option<&StudyPayload> {
        self.payload.as_ref()
    }

    /// Outbound URL, once the handoff succeeded.
    pub fn redirect_url(&self) -> Option<&Url> {
        self.handoff.as_ref()
    }

    /// DV assigned to `block`.
    pub fn block_variable(&self, block: Block) -> Result<&DependentVariable, StudyError> {
        let id = self.state.dv_order.get(block.dv_index()).ok_or_else(|| {
            StudyError::Session(
                ErrorInfo::new("session-no-block-variable", "no variable assigned to block")
                    .with_context("block", format!("{block:?}")),
            )
        })?;
        self.config.dependent_variable(id).ok_or_else(|| {
            StudyError::Session(
                ErrorInfo::new("session-unknown-variable", "assigned variable is not configured")
                    .with_context("id", id.clone()),
            )
        })
    }

    /// What the current phase shows.
    pub fn screen(&self) -> Result<Screen<'_>, StudyError> {
        screen::project(self)
    }

    /// Consent given; moves to the next phase of the chain.
    pub fn accept_consent(&mut self) -> Result<(), StudyError> {
        self.require(matches!(self.state.phase, Phase::Consent), "accept-consent")?;
        self.advance()
    }

    /// Leaves the study for the declined destination; nothing else is recorded.
    pub fn decline_consent(&mut self) -> Result<(), StudyError> {
        self.require(matches!(self.state.phase, Phase::Consent), "decline-consent")?;
        info!("participant {:?} declined consent", self.state.participant_id);
        self.enter(Phase::Declined)
    }

    /// Selects the option shown at `displayed` on the current check.
    pub fn select_option(&mut self, displayed: usize) -> Result<(), StudyError> {
        self.require(
            matches!(self.state.phase, Phase::Comprehension { .. }),
            "select-option",
        )?;
        self.current_check_mut("select-option")?.select(displayed)
    }

    /// Grades the selected option of the current check.
    pub fn submit_check(&mut self) -> Result<CheckOutcome, StudyError> {
        let index = match self.state.phase {
            Phase::Comprehension { index } => index,
            _ => return Err(self.invalid_phase("submit-check")),
        };
        let config = Rc::clone(&self.config);
        let check = config.comprehension_checks.get(index).ok_or_else(|| {
            StudyError::Session(
                ErrorInfo::new("session-unknown-check", "no comprehension check at index")
                    .with_context("index", index.to_string()),
            )
        })?;
        let outcome = self.current_check_mut("submit-check")?.submit(check)?;
        match outcome {
            CheckOutcome::Passed => self.advance()?,
            CheckOutcome::Retry => debug!("check {} answered wrong, retrying", check.id),
            CheckOutcome::Failed => {
                info!(
                    "participant {:?} failed check {}",
                    self.state.participant_id, check.id
                );
                self.enter(Phase::FailedCheck)?;
            }
        }
        Ok(outcome)
    }

    /// Leaves the stimulus screen once its gate is open.
    pub fn continue_stimulus(&mut self) -> Result<(), StudyError> {
        self.require(matches!(self.state.phase, Phase::Stimulus), "continue-stimulus")?;
        self.require_gate_open()?;
        self.advance()
    }

    /// Leaves the instructions.
    pub fn continue_instructions(&mut self) -> Result<(), StudyError> {
        self.require(
            matches!(self.state.phase, Phase::Instructions),
            "continue-instructions",
        )?;
        self.advance()
    }

    /// Leaves either block intro screen.
    pub fn continue_intro(&mut self) -> Result<(), StudyError> {
        self.require(
            matches!(self.state.phase, Phase::Block1Intro | Phase::Block2Intro),
            "continue-intro",
        )?;
        self.advance()
    }

    /// Leaves the transition screen.
    pub fn continue_transition(&mut self) -> Result<(), StudyError> {
        self.require(matches!(self.state.phase, Phase::Transition), "continue-transition")?;
        self.advance()
    }

    /// Rates the category at the cursor, in individual rating mode.
    pub fn submit_rating(&mut self, value: i64) -> Result<(), StudyError> {
        let block = self.rating_block("submit-rating", RatingMode::Individual)?;
        let dv = self.block_variable(block)?;
        check_scale(dv, value)?;
        let dv_id = dv.id.clone();
        let category = self
            .state
            .block_order(block)
            .get(self.state.cursor)
            .cloned()
            .ok_or_else(|| self.invalid_phase("submit-rating"))?;

        debug!("rating {dv_id}/{} = {value}", category.key);
        self.state.responses.record_rating(&dv_id, &category.key, value);
        self.state.cursor += 1;
        if self.state.cursor == self.state.block_order(block).len() {
            self.advance()?;
        }
        Ok(())
    }

    /// Rates every category of the current block at once, in batch mode.
    ///
    /// `ratings` is keyed by category key and must cover the block exactly.
    pub fn submit_batch(&mut self, ratings: &BTreeMap<String, i64>) -> Result<(), StudyError> {
        let block = self.rating_block("submit-batch", RatingMode::Batch)?;
        let dv = self.block_variable(block)?;
        let order = self.state.block_order(block);

        if let Some(unknown) = ratings
            .keys()
            .find(|key| !order.iter().any(|category| &category.key == *key))
        {
            return Err(StudyError::Session(
                ErrorInfo::new("session-batch-unknown-category", "rating for a category not in the block")
                    .with_context("category", unknown.clone()),
            ));
        }
        let mut cells = Vec::with_capacity(order.len());
        for category in order {
            let value = *ratings.get(&category.key).ok_or_else(|| {
                StudyError::Session(
                    ErrorInfo::new("session-batch-incomplete", "every category must be rated")
                        .with_context("missing", category.key.clone())
                        .with_context("dv", dv.id.clone()),
                )
            })?;
            check_scale(dv, value)?;
            cells.push((category.key.clone(), value));
        }

        let dv_id = dv.id.clone();
        debug!("batch of {} ratings for {dv_id}", cells.len());
        self.state
            .responses
            .record_batch(&dv_id, cells.iter().map(|(key, value)| (key.as_str(), *value)));
        self.state.cursor = cells.len();
        self.advance()
    }

    /// Records the open-ended answer.
    ///
    /// Requires the dwell gate to be open and the trimmed text to be within
    /// `[minChars, maxChars]` characters.
    pub fn submit_free_response(&mut self, text: &str) -> Result<(), StudyError> {
        self.require(
            matches!(self.state.phase, Phase::FreeResponse),
            "submit-free-response",
        )?;
        let settings = self
            .config
            .free_response
            .as_ref()
            .ok_or_else(|| self.invalid_phase("submit-free-response"))?;
        self.require_gate_open()?;
        let length = text.trim().chars().count();
        if length < settings.min_chars || length > settings.max_chars {
            return Err(StudyError::Session(
                ErrorInfo::new("session-free-response-length", "response length out of bounds")
                    .with_context("length", length.to_string())
                    .with_context("min", settings.min_chars.to_string())
                    .with_context("max", settings.max_chars.to_string()),
            ));
        }
        self.state.responses.record_free_response(text);
        self.advance()
    }

    /// Records age and gender, then hands off.
    pub fn submit_demographics(&mut self, age: &str, gender: &str) -> Result<(), StudyError> {
        self.require(
            matches!(self.state.phase, Phase::Demographics),
            "submit-demographics",
        )?;
        let fields = self
            .config
            .demographics
            .as_ref()
            .ok_or_else(|| self.invalid_phase("submit-demographics"))?;
        let age = age.trim();
        let in_range = age
            .parse::<u32>()
            .is_ok_and(|years| (fields.age.min_age..=fields.age.max_age).contains(&years));
        if !in_range {
            return Err(StudyError::Session(
                ErrorInfo::new("session-invalid-age", "age must be a whole number in range")
                    .with_context("age", age)
                    .with_context("min", fields.age.min_age.to_string())
                    .with_context("max", fields.age.max_age.to_string()),
            ));
        }
        if !fields.gender.options.iter().any(|option| option == gender) {
            return Err(StudyError::Session(
                ErrorInfo::new("session-invalid-gender", "gender must be one of the options")
                    .with_context("gender", gender),
            ));
        }
        self.state.responses.record_demographics(age, gender);
        self.advance()
    }

    /// Polls the current gate, firing its callback once it opens.
    ///
    /// Returns whether the current screen may continue.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.gate.as_mut().map_or(true, |gate| gate.poll(now))
    }

    /// Registers a callback for when the current screen's gate opens.
    ///
    /// The callback is dropped unfired if the screen is left first.
    pub fn on_gate_open(&mut self, callback: impl FnOnce() + 'static) -> Result<(), StudyError> {
        match self.gate.as_mut() {
            Some(gate) => {
                gate.on_open(callback);
                Ok(())
            }
            None => Err(StudyError::Session(
                ErrorInfo::new("session-no-gate", "the current screen has no countdown")
                    .with_context("phase", self.state.phase.name()),
            )),
        }
    }

    /// Runs the handoff if the session is in [`Phase::Redirect`].
    ///
    /// Repeated calls return the URL of the first dispatch without navigating again.
    pub fn redirect(&mut self) -> Result<Url, StudyError> {
        self.require(matches!(self.state.phase, Phase::Redirect), "redirect")?;
        self.complete()
    }

    fn advance(&mut self) -> Result<(), StudyError> {
        let current = self.state.phase;
        let next = self
            .chain
            .iter()
            .position(|phase| *phase == current)
            .and_then(|position| self.chain.get(position + 1))
            .copied()
            .ok_or_else(|| self.invalid_phase("advance"))?;
        self.enter(next)
    }

    fn enter(&mut self, phase: Phase) -> Result<(), StudyError> {
        debug!("{} -> {}", self.state.phase.name(), phase.name());
        if let Some(mut gate) = self.gate.take() {
            gate.cancel();
        }
        self.check = None;
        self.state.phase = phase;

        let now = self.clock.now_ms();
        match phase {
            Phase::Comprehension { index } => {
                if let Some(check) = self.config.comprehension_checks.get(index) {
                    let mut stream = self.rng.substream(COMPREHENSION_STREAM_BASE + index as u64);
                    self.check = Some(CheckAttempt::new(index, check, &mut stream));
                }
            }
            Phase::Stimulus => {
                if let Some(stimulus) = &self.config.stimulus {
                    self.gate = Some(DwellGate::arm(now, stimulus.min_viewing_seconds));
                }
            }
            Phase::FreeResponse => {
                if let Some(settings) = &self.config.free_response {
                    self.gate = Some(DwellGate::arm(now, settings.min_seconds));
                }
            }
            Phase::Block1 => {
                self.state.cursor = 0;
                self.state.timestamps.block1_start = Some(now);
            }
            Phase::Block2 => {
                self.state.cursor = 0;
                self.state.timestamps.block2_start = Some(now);
            }
            Phase::Redirect => {
                self.complete()?;
            }
            Phase::Loading
            | Phase::AlreadyCompleted
            | Phase::Consent
            | Phase::Declined
            | Phase::FailedCheck
            | Phase::Instructions
            | Phase::Block1Intro
            | Phase::Transition
            | Phase::Block2Intro
            | Phase::Demographics => {}
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<Url, StudyError> {
        if let Some(url) = &self.handoff {
            return Ok(url.clone());
        }
        let study_id = &self.config.study.id;
        if let Err(err) = self.store.mark_completed(study_id) {
            warn!("could not persist completion of {study_id}: {err}");
        }
        let payload = build_payload(&self.state, self.clock.now_ms());
        let data = encode_payload(&payload)?;
        let responses = &self.state.responses;
        let request = HandoffRequest::new(
            self.config.return_url.as_str(),
            self.state.participant_id.clone(),
            data,
        )
        .with_field("free_response", responses.free_response.as_deref())
        .with_field("age", responses.age.as_deref())
        .with_field("gender", responses.gender.as_deref());
        let url = self.dispatcher.dispatch(&request)?;
        self.payload = Some(payload);
        self.handoff = Some(url.clone());
        Ok(url)
    }

    fn rating_block(&self, action: &str, mode: RatingMode) -> Result<Block, StudyError> {
        let block = self
            .state
            .phase
            .block()
            .ok_or_else(|| self.invalid_phase(action))?;
        if self.config.design.rating_mode != mode {
            return Err(StudyError::Session(
                ErrorInfo::new("session-wrong-rating-mode", "action does not match the rating mode")
                    .with_context("action", action)
                    .with_context("mode", format!("{:?}", self.config.design.rating_mode)),
            ));
        }
        Ok(block)
    }

    fn current_check_mut(&mut self, action: &str) -> Result<&mut CheckAttempt, StudyError> {
        let phase = self.state.phase;
        self.check
            .as_mut()
            .ok_or_else(|| invalid_phase(phase, action))
    }

    fn require_gate_open(&self) -> Result<(), StudyError> {
        let now = self.clock.now_ms();
        match &self.gate {
            Some(gate) if !gate.is_open(now) => Err(StudyError::Session(
                ErrorInfo::new("session-gate-closed", "continue is not available yet")
                    .with_context("phase", self.state.phase.name())
                    .with_context("remaining_seconds", gate.remaining_seconds(now).to_string()),
            )),
            _ => Ok(()),
        }
    }

    fn require(&self, legal: bool, action: &str) -> Result<(), StudyError> {
        if legal {
            Ok(())
        } else {
            Err(self.invalid_phase(action))
        }
    }

    fn invalid_phase(&self, action: &str) -> StudyError {
        invalid_phase(self.state.phase, action)
    }
}

fn invalid_phase(phase: Phase, action: &str) -> StudyError {
    StudyError::Session(
        ErrorInfo::new("session-invalid-phase", "action is not available in this phase")
            .with_context("action", action)
            .with_context("phase", phase.name()),
    )
}

fn check_scale(dv: &DependentVariable, value: i64) -> Result<(), StudyError> {
    if dv.accepts(value) {
        return Ok(());
    }
    Err(StudyError::Session(
        ErrorInfo::new("session-rating-out-of-range", "rating outside the scale")
            .with_context("dv", dv.id.clone())
            .with_context("value", value.to_string())
            .with_context("min", dv.scale_min.to_string())
            .with_context("max", dv.scale_max.to_string()),
    ))
}
