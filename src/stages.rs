//! Expansion of coarse recipe stages into the alternating pour/wait sequence
//! the timer and the brewing UI run on.

use crate::types::{ExpandedStage, ExpandedStageKind, Stage, DEFAULT_POUR_TIME_DIVISOR, WAITING_LABEL};

/// Expand coarse stages into a strictly time-ordered, gap-free sequence of
/// pour/wait sub-stages covering `[0, last.time)`.
///
/// A stage with an explicit `pour_time` of 0 is a real zero (instantaneous,
/// pure wait), distinct from an unset `pour_time` which defaults to a third
/// of the stage interval.
pub fn expand(stages: &[Stage]) -> Vec<ExpandedStage> {
    let mut expanded = Vec::with_capacity(stages.len() * 2);
    let mut prev_time = 0u32;

    for (index, stage) in stages.iter().enumerate() {
        let duration = stage.time.saturating_sub(prev_time);
        let effective_pour = stage
            .pour_time
            .unwrap_or(duration / DEFAULT_POUR_TIME_DIVISOR);

        if stage.pour_time == Some(0) {
            expanded.push(wait_stage(stage, index, prev_time, stage.time, true));
        } else if effective_pour > 0 {
            let pour_end = (prev_time + effective_pour).min(stage.time);
            expanded.push(ExpandedStage {
                kind: ExpandedStageKind::Pour,
                label: stage.label.clone(),
                water: stage.water.clone(),
                detail: stage.detail.clone(),
                start_time: prev_time,
                end_time: pour_end,
                pour_type: stage.pour_type.clone(),
                valve_status: stage.valve_status,
                original_index: index,
            });
            if pour_end < stage.time {
                expanded.push(wait_stage(stage, index, pour_end, stage.time, false));
            }
        } else {
            expanded.push(wait_stage(stage, index, prev_time, stage.time, true));
        }

        prev_time = stage.time;
    }

    expanded
}

/// Wait sub-stage. The trailing wait after a pour keeps the stage's pour type
/// and valve status for visual continuity but takes a generic label.
fn wait_stage(stage: &Stage, index: usize, start: u32, end: u32, own_label: bool) -> ExpandedStage {
    ExpandedStage {
        kind: ExpandedStageKind::Wait,
        label: if own_label {
            stage.label.clone()
        } else {
            WAITING_LABEL.to_string()
        },
        water: stage.water.clone(),
        detail: if own_label {
            stage.detail.clone()
        } else {
            String::new()
        },
        start_time: start,
        end_time: end,
        pour_type: stage.pour_type.clone(),
        valve_status: stage.valve_status,
        original_index: index,
    }
}

/// Index of the expanded stage containing second `t`, if any.
pub fn stage_at(expanded: &[ExpandedStage], t: u32) -> Option<usize> {
    expanded
        .iter()
        .position(|s| s.start_time <= t && t < s.end_time)
}
