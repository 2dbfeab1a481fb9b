#![deny(missing_docs)]
//! Session orchestration for the study runner.
//!
//! [`StudySession`] walks a participant through the configured phases,
//! aggregates their answers into a [`RatingMap`], and on completion encodes a
//! [`StudyPayload`] and hands it to the survey platform through a
//! [`Navigator`].

pub mod assignment;
pub mod codec;
pub mod comprehension;
pub mod flatten;
pub mod gate;
pub mod handoff;
pub mod params;
pub mod payload;
pub mod phase;
pub mod ratings;
pub mod screen;
pub mod session;
pub mod store;
pub mod template;

pub use assignment::{parse_condition, select_dependent_variables, Assignment};
pub use codec::{decode_json, decode_payload, encode_json, encode_payload};
pub use comprehension::{CheckAttempt, CheckMessage, CheckOutcome};
pub use flatten::{cell_to_string, flatten_encoded, flatten_payload, FlatRow, FIXED_COLUMNS};
pub use gate::DwellGate;
pub use handoff::{build_redirect_url, HandoffDispatcher, HandoffRequest, Navigator, RecordingNavigator};
pub use params::{InboundParams, ParamSource};
pub use payload::{build_payload, StudyPayload, Timestamps, Timing};
pub use phase::{Block, Phase};
pub use ratings::{CategoryRatings, RatingMap, ResponseRecord};
pub use screen::{Progress, RatingItem, Screen};
pub use session::{phase_chain, SessionEnv, SessionState, StudySession};
pub use store::{completion_key, CompletionStore, FileStore, MemoryStore, COMPLETED_VALUE};
pub use template::{lowercase_first, render_question, substitute_trait};
