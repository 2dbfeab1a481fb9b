//! Per-participant randomized assignment of variables and category orders.

use log::warn;
use serde::{Deserialize, Serialize};
use study_core::rng::{BLOCK1_STREAM, BLOCK2_STREAM, DV_ORDER_STREAM};
use study_core::{
    shuffle, Category, DesignType, ErrorInfo, OrderPolicy, RngHandle, StudyConfig, StudyError,
};

/// Dependent variables rated per participant; one per block.
pub const MAX_BLOCKS: usize = 2;

/// The randomized part of a session, drawn once at entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Selected DV ids in configuration order, before shuffling.
    pub selected: Vec<String>,
    /// Realized DV order; block 1 rates index 0, block 2 index 1.
    pub dv_order: Vec<String>,
    /// Categories in block 1 order.
    pub block1_order: Vec<Category>,
    /// Categories in block 2 order, drawn independently of block 1.
    pub block2_order: Vec<Category>,
}

impl Assignment {
    /// Selects the DVs for `condition` and draws every order from independent substreams of `rng`.
    pub fn draw(
        config: &StudyConfig,
        condition: Option<&str>,
        rng: &RngHandle,
    ) -> Result<Self, StudyError> {
        let mut selected = select_dependent_variables(config, condition)?;
        let mut dv_order = match config.design.dv_blocking {
            OrderPolicy::Fixed => selected.clone(),
            OrderPolicy::Randomized => shuffle(&selected, &mut rng.substream(DV_ORDER_STREAM)),
        };
        if dv_order.len() > MAX_BLOCKS {
            // Only reachable without a condition in a between-subjects design.
            warn!(
                "no condition given for {} variables; keeping {:?}",
                dv_order.len(),
                &dv_order[..MAX_BLOCKS]
            );
            dv_order.truncate(MAX_BLOCKS);
            selected.retain(|id| dv_order.contains(id));
        }
        let order = |stream: u64| match config.design.category_order {
            OrderPolicy::Fixed => config.categories.clone(),
            OrderPolicy::Randomized => shuffle(&config.categories, &mut rng.substream(stream)),
        };
        Ok(Self {
            selected,
            dv_order,
            block1_order: order(BLOCK1_STREAM),
            block2_order: order(BLOCK2_STREAM),
        })
    }
}

/// Parses a condition string such as `"0,3"` into DV indices.
pub fn parse_condition(condition: &str) -> Result<Vec<usize>, StudyError> {
    condition
        .split(',')
        .map(|part| {
            part.trim().parse::<usize>().map_err(|_| {
                StudyError::Session(
                    ErrorInfo::new("session-invalid-condition", "condition is not a list of indices")
                        .with_context("cond", condition)
                        .with_context("part", part),
                )
            })
        })
        .collect()
}

/// DV ids a participant rates, in configuration order.
///
/// Within-subjects designs use every configured DV. Between-subjects designs
/// use the indices listed in `condition`; without a condition they fall back
/// to every configured DV.
pub fn select_dependent_variables(
    config: &StudyConfig,
    condition: Option<&str>,
) -> Result<Vec<String>, StudyError> {
    let all = || config.dependent_variables.iter().map(|dv| dv.id.clone()).collect();
    let condition = match (config.design.kind, condition.map(str::trim)) {
        (DesignType::BetweenSubjects, Some(cond)) if !cond.is_empty() => cond,
        _ => return Ok(all()),
    };
    let indices = parse_condition(condition)?;
    if indices.len() > MAX_BLOCKS {
        return Err(StudyError::Session(
            ErrorInfo::new("session-condition-too-many", "condition selects more than two variables")
                .with_context("cond", condition),
        ));
    }
    let mut selected: Vec<String> = Vec::with_capacity(indices.len());
    for index in indices {
        let dv = config.dependent_variables.get(index).ok_or_else(|| {
            StudyError::Session(
                ErrorInfo::new("session-condition-out-of-range", "condition index has no variable")
                    .with_context("cond", condition)
                    .with_context("index", index.to_string())
                    .with_context("configured", config.dependent_variables.len().to_string()),
            )
        })?;
        if selected.contains(&dv.id) {
            return Err(StudyError::Session(
                ErrorInfo::new("session-condition-duplicate", "condition repeats a variable")
                    .with_context("cond", condition)
                    .with_context("id", dv.id.clone()),
            ));
        }
        selected.push(dv.id.clone());
    }
    // Configuration order, whatever order the condition listed them in.
    selected.sort_by_key(|id| {
        config
            .dependent_variables
            .iter()
            .position(|dv| &dv.id == id)
            .unwrap_or(usize::MAX)
    });
    Ok(selected)
}
