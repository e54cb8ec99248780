//! Pure loop checks over a session's step log.

use super::types::{ExecutionStep, LoopCheckResult, LoopType};
use std::collections::HashMap;

/// More steps than `max_depth`.
pub(super) fn depth(steps: &[ExecutionStep], max_depth: usize) -> Option<LoopCheckResult> {
    (steps.len() > max_depth).then(|| {
        LoopCheckResult::detected(
            LoopType::Depth,
            format!(
                "Execution depth {} exceeds maximum of {max_depth}",
                steps.len()
            ),
        )
    })
}

/// Some skill occurs more than `max_repeats` times.
///
/// Skills are considered in order of first appearance.
pub(super) fn cycle(steps: &[ExecutionStep], max_repeats: usize) -> Option<LoopCheckResult> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for step in steps {
        let count = counts.entry(step.skill_id.as_str()).or_insert(0);
        if *count == 0 {
            order.push(step.skill_id.as_str());
        }
        *count += 1;
    }

    order.into_iter().find_map(|skill| {
        let count = counts.get(skill).copied().unwrap_or(0);
        (count > max_repeats).then(|| {
            LoopCheckResult::detected(
                LoopType::Cycle,
                format!("Skill '{skill}' executed {count} times (maximum {max_repeats})"),
            )
        })
    })
}

/// The last `L` skills repeat back-to-back at least `max_repeats` times.
///
/// Shorter patterns are tried first.
pub(super) fn pattern(steps: &[ExecutionStep], max_repeats: usize) -> Option<LoopCheckResult> {
    let ids: Vec<&str> = steps.iter().map(|s| s.skill_id.as_str()).collect();
    let n = ids.len();

    for len in 2..=n / 2 {
        let tail = &ids[n - len..];
        let repeats = ids
            .rchunks_exact(len)
            .take_while(|window| *window == tail)
            .count();
        if repeats >= max_repeats {
            return Some(LoopCheckResult::detected(
                LoopType::Pattern,
                format!(
                    "Repeating pattern detected: [{}] repeated {repeats} times",
                    tail.join(" -> ")
                ),
            ));
        }
    }
    None
}

/// First and last step are more than `max_duration_ms` apart.
pub(super) fn duration(steps: &[ExecutionStep], max_duration_ms: u64) -> Option<LoopCheckResult> {
    let (first, last) = match steps {
        [first, .., last] => (first, last),
        _ => return None,
    };
    let elapsed = last.timestamp.saturating_sub(first.timestamp);
    (elapsed > max_duration_ms).then(|| {
        LoopCheckResult::detected(
            LoopType::Duration,
            format!("Execution duration {elapsed}ms exceeds maximum of {max_duration_ms}ms"),
        )
    })
}
