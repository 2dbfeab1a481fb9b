//! Projection of the session into the record handed to the survey platform.
//!
//! Field names and nesting are consumed by an independently maintained
//! decoder and must not change without updating it in lockstep.

use serde::{Deserialize, Serialize};

use crate::ratings::RatingMap;
use crate::session::SessionState;

/// The record encoded into the `data` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPayload {
    /// Participant id, empty when absent.
    pub pid: String,
    /// Raw condition string, empty when absent.
    pub cond: String,
    /// Realized DV order.
    pub dv_order: Vec<String>,
    /// Category keys in block 1 order.
    pub block1_category_order: Vec<String>,
    /// Category keys in block 2 order.
    pub block2_category_order: Vec<String>,
    /// DV id → category key → rating.
    pub ratings: RatingMap,
    /// Durations at encode time.
    pub timing: Timing,
    /// Always `true` for a finished session.
    pub completed: bool,
    /// Present once demographics were collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    /// Present once demographics were collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// Elapsed durations derived from the recorded timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    /// Since session start.
    pub total_ms: i64,
    /// Block 1 duration; 0 if never entered.
    pub block1_ms: i64,
    /// Block 2 duration; 0 if never entered.
    pub block2_ms: i64,
}

/// Session-relative timestamps in epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Assignment drawn.
    pub session_start: Option<i64>,
    /// Block 1 entered.
    pub block1_start: Option<i64>,
    /// Block 2 entered.
    pub block2_start: Option<i64>,
}

impl Timestamps {
    /// Durations as of `now_ms`.
    ///
    /// Block 1 runs until block 2 starts, or until now if it has not.
    pub fn timing_at(&self, now_ms: i64) -> Timing {
        let total_ms = self.session_start.map_or(0, |start| now_ms - start);
        let block1_ms = match (self.block1_start, self.block2_start) {
            (Some(b1), Some(b2)) => b2 - b1,
            (Some(b1), None) => now_ms - b1,
            (None, _) => 0,
        };
        let block2_ms = self.block2_start.map_or(0, |start| now_ms - start);
        Timing {
            total_ms,
            block1_ms,
            block2_ms,
        }
    }
}

/// Builds the outbound record from the session state as of `now_ms`.
///
/// Pure: called once when the redirect phase is entered.
pub fn build_payload(state: &SessionState, now_ms: i64) -> StudyPayload {
    let keys = |order: &[study_core::Category]| order.iter().map(|c| c.key.clone()).collect();
    StudyPayload {
        pid: state.participant_id.clone().unwrap_or_default(),
        cond: state.condition.clone().unwrap_or_default(),
        dv_order: state.dv_order.clone(),
        block1_category_order: keys(&state.block1_order),
        block2_category_order: keys(&state.block2_order),
        ratings: state.responses.ratings.clone(),
        timing: state.timestamps.timing_at(now_ms),
        completed: true,
        age: state.responses.age.clone().filter(|age| !age.is_empty()),
        gender: state.responses.gender.clone().filter(|gender| !gender.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_before_any_block() {
        let stamps = Timestamps {
            session_start: Some(1_000),
            ..Timestamps::default()
        };
        assert_eq!(
            stamps.timing_at(4_000),
            Timing {
                total_ms: 3_000,
                block1_ms: 0,
                block2_ms: 0
            }
        );
    }

    #[test]
    fn timing_inside_block1() {
        let stamps = Timestamps {
            session_start: Some(0),
            block1_start: Some(500),
            block2_start: None,
        };
        assert_eq!(stamps.timing_at(2_000).block1_ms, 1_500);
        assert_eq!(stamps.timing_at(2_000).block2_ms, 0);
    }

    #[test]
    fn timing_after_block2_started() {
        let stamps = Timestamps {
            session_start: Some(0),
            block1_start: Some(1_000),
            block2_start: Some(61_000),
        };
        assert_eq!(
            stamps.timing_at(116_000),
            Timing {
                total_ms: 116_000,
                block1_ms: 60_000,
                block2_ms: 55_000
            }
        );
    }

    #[test]
    fn unstarted_session_reports_zero() {
        assert_eq!(Timestamps::default().timing_at(9_999), Timing::default());
    }
}
