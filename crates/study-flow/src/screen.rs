//! What each phase renders, as data.
//!
//! Rendering itself lives outside this crate; a front end matches on
//! [`Screen`] and draws one variant per phase.

use study_core::{
    Category, DemographicsConfig, DependentVariable, StimulusImage, StudyError,
};
use url::Url;

use crate::comprehension::CheckMessage;
use crate::phase::{Block, Phase};
use crate::session::StudySession;
use crate::template::{render_question, substitute_trait};

/// "n of m" position within a sequence; `current` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based position.
    pub current: usize,
    /// Sequence length.
    pub total: usize,
}

/// A category with its rendered question, for batch rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingItem<'a> {
    /// The rated category.
    pub category: &'a Category,
    /// Question template with the category substituted.
    pub question: String,
}

/// Render data for the current phase; one variant per [`Phase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen<'a> {
    /// Nothing to show yet.
    Loading,
    /// The participant already finished this study.
    AlreadyCompleted,
    /// Informed consent with accept and decline actions.
    Consent {
        /// Heading.
        title: &'a str,
        /// Body text.
        body: &'a str,
    },
    /// Consent was declined; the front end navigates to `destination`.
    Declined {
        /// Path of the declined page.
        destination: &'a str,
    },
    /// A comprehension check.
    Comprehension {
        /// Position among the configured checks.
        progress: Progress,
        /// Definition shown above the question.
        definition: &'a str,
        /// The question.
        question: &'a str,
        /// Option texts in display order.
        options: Vec<&'a str>,
        /// Displayed position of the current selection.
        selected: Option<usize>,
        /// Retry or warning line after a wrong answer.
        message: Option<CheckMessage<'a>>,
    },
    /// Ran out of comprehension attempts.
    FailedCheck,
    /// Stimulus exposure.
    Stimulus {
        /// Introductory text.
        introduction: &'a str,
        /// Example images.
        images: &'a [StimulusImage],
        /// Whole seconds until "Continue" is enabled.
        remaining_seconds: u32,
    },
    /// Free-text instructions.
    Instructions {
        /// Instruction text.
        text: &'a str,
    },
    /// Introduction to a rating block.
    BlockIntro {
        /// The block being introduced.
        block: Block,
        /// Intro template with `{trait}` substituted.
        text: String,
    },
    /// One category at a time.
    Rating {
        /// Current block.
        block: Block,
        /// Variable rated in this block.
        variable: &'a DependentVariable,
        /// Category under the cursor.
        category: &'a Category,
        /// Question with the category substituted.
        question: String,
        /// Position within the block.
        progress: Progress,
    },
    /// Every category of the block on one screen.
    BatchRating {
        /// Current block.
        block: Block,
        /// Variable rated in this block.
        variable: &'a DependentVariable,
        /// Categories in block order.
        items: Vec<RatingItem<'a>>,
    },
    /// Between the blocks.
    Transition {
        /// Transition text with `{trait}` substituted.
        text: String,
    },
    /// Open-ended response.
    FreeResponse {
        /// The prompt.
        question: &'a str,
        /// Notice about AI tools.
        ai_warning: &'a str,
        /// Input placeholder.
        placeholder: &'a str,
        /// Minimum length in characters.
        min_chars: usize,
        /// Maximum length in characters.
        max_chars: usize,
        /// Whole seconds until submission is enabled.
        remaining_seconds: u32,
    },
    /// Age and gender form.
    Demographics {
        /// Field configuration.
        fields: &'a DemographicsConfig,
    },
    /// The session is finished.
    Redirect {
        /// `None` until the handoff has been dispatched.
        url: Option<&'a Url>,
    },
}

pub(crate) fn project(session: &StudySession) -> Result<Screen<'_>, StudyError> {
    let config = session.config();
    let state = session.state();
    let missing = || {
        StudyError::Session(
            study_core::ErrorInfo::new("session-missing-section", "phase has no configuration")
                .with_context("phase", state.phase.name()),
        )
    };

    let screen = match state.phase {
        Phase::Loading => Screen::Loading,
        Phase::AlreadyCompleted => Screen::AlreadyCompleted,
        Phase::Consent => Screen::Consent {
            title: &config.consent.title,
            body: &config.consent.body,
        },
        Phase::Declined => Screen::Declined {
            destination: &config.declined_path,
        },
        Phase::Comprehension { index } => {
            let check = config.comprehension_checks.get(index).ok_or_else(missing)?;
            let attempt = session.check().ok_or_else(missing)?;
            Screen::Comprehension {
                progress: Progress {
                    current: index + 1,
                    total: config.comprehension_checks.len(),
                },
                definition: &check.definition,
                question: &check.question,
                options: attempt
                    .options()
                    .iter()
                    .map(|entry| entry.item.text.as_str())
                    .collect(),
                selected: attempt.selected(),
                message: attempt.message(check),
            }
        }
        Phase::FailedCheck => Screen::FailedCheck,
        Phase::Stimulus => {
            let stimulus = config.stimulus.as_ref().ok_or_else(missing)?;
            Screen::Stimulus {
                introduction: &stimulus.introduction,
                images: &stimulus.images,
                remaining_seconds: session.gate_remaining_seconds(),
            }
        }
        Phase::Instructions => Screen::Instructions {
            text: config.instructions.as_deref().ok_or_else(missing)?,
        },
        Phase::Block1Intro | Phase::Block2Intro => {
            let block = if state.phase == Phase::Block1Intro {
                Block::First
            } else {
                Block::Second
            };
            let template = match block {
                Block::First => config.design.block_intro_template.as_deref(),
                Block::Second => config.design.block2_intro_template.as_deref(),
            }
            .ok_or_else(missing)?;
            let variable = session.block_variable(block)?;
            Screen::BlockIntro {
                block,
                text: substitute_trait(template, variable.display_label()),
            }
        }
        Phase::Block1 | Phase::Block2 => {
            let block = state.phase.block().ok_or_else(missing)?;
            let variable = session.block_variable(block)?;
            let order = state.block_order(block);
            match config.design.rating_mode {
                study_core::RatingMode::Individual => {
                    let category = order.get(state.cursor).ok_or_else(missing)?;
                    Screen::Rating {
                        block,
                        variable,
                        category,
                        question: render_question(
                            &variable.question_template,
                            variable.display_label(),
                            &category.label,
                        ),
                        progress: Progress {
                            current: state.cursor + 1,
                            total: order.len(),
                        },
                    }
                }
                study_core::RatingMode::Batch => Screen::BatchRating {
                    block,
                    variable,
                    items: order
                        .iter()
                        .map(|category| RatingItem {
                            category,
                            question: render_question(
                                &variable.question_template,
                                variable.display_label(),
                                &category.label,
                            ),
                        })
                        .collect(),
                },
            }
        }
        Phase::Transition => {
            let next = session.block_variable(Block::Second)?;
            Screen::Transition {
                text: substitute_trait(&config.design.transition_text, next.display_label()),
            }
        }
        Phase::FreeResponse => {
            let settings = config.free_response.as_ref().ok_or_else(missing)?;
            Screen::FreeResponse {
                question: &settings.question,
                ai_warning: &settings.ai_warning,
                placeholder: &settings.placeholder,
                min_chars: settings.min_chars,
                max_chars: settings.max_chars,
                remaining_seconds: session.gate_remaining_seconds(),
            }
        }
        Phase::Demographics => Screen::Demographics {
            fields: config.demographics.as_ref().ok_or_else(missing)?,
        },
        Phase::Redirect => Screen::Redirect {
            url: session.redirect_url(),
        },
    };
    Ok(screen)
}
