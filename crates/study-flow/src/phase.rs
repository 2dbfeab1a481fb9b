//! The enumerated phases of a session.

use serde::{Deserialize, Serialize};

/// Every state the study can be in.
///
/// The happy path is linear; bracketed phases in the chain below are skipped
/// when their configuration section is absent:
/// `loading → consent → [comprehension]* → [stimulus] → [instructions] →
/// [block1-intro] → block1 → transition → [block2-intro] → block2 →
/// [free-response] → [demographics] → redirect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Before [`crate::StudySession::start`] has decided where to go.
    Loading,
    /// The completion marker was already set for this study.
    AlreadyCompleted,
    /// Informed consent; always the first phase of a fresh session.
    Consent,
    /// Consent was declined.
    Declined,
    /// A comprehension check.
    Comprehension {
        /// Position of the check in the configuration.
        index: usize,
    },
    /// A comprehension check ran out of attempts.
    FailedCheck,
    /// Stimulus exposure, gated by a minimum viewing time.
    Stimulus,
    /// Free-text instructions.
    Instructions,
    /// Introduction to block 1.
    Block1Intro,
    /// Ratings for the first assigned variable.
    Block1,
    /// Between the blocks.
    Transition,
    /// Introduction to block 2.
    Block2Intro,
    /// Ratings for the second assigned variable.
    Block2,
    /// Open-ended response, gated by a minimum dwell time.
    FreeResponse,
    /// Age and gender.
    Demographics,
    /// Completion marker written and handoff dispatched.
    Redirect,
}

impl Phase {
    /// Stable name used in logs and error context.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Loading => "loading",
            Phase::AlreadyCompleted => "already-completed",
            Phase::Consent => "consent",
            Phase::Declined => "declined",
            Phase::Comprehension { .. } => "comprehension",
            Phase::FailedCheck => "failed-check",
            Phase::Stimulus => "stimulus",
            Phase::Instructions => "instructions",
            Phase::Block1Intro => "block1-intro",
            Phase::Block1 => "block1",
            Phase::Transition => "transition",
            Phase::Block2Intro => "block2-intro",
            Phase::Block2 => "block2",
            Phase::FreeResponse => "free-response",
            Phase::Demographics => "demographics",
            Phase::Redirect => "redirect",
        }
    }

    /// Whether no participant action can leave this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::AlreadyCompleted | Phase::Declined | Phase::FailedCheck | Phase::Redirect
        )
    }

    /// The rating block this phase collects ratings for, if any.
    pub fn block(&self) -> Option<Block> {
        match self {
            Phase::Block1 => Some(Block::First),
            Phase::Block2 => Some(Block::Second),
            _ => None,
        }
    }
}

/// One of the two repeated-measures rating blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Block {
    /// Block 1.
    First,
    /// Block 2.
    Second,
}

impl Block {
    /// Index into `dvOrder` of the variable rated in this block.
    pub fn dv_index(&self) -> usize {
        match self {
            Block::First => 0,
            Block::Second => 1,
        }
    }
}
