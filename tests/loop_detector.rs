use oxide_guard::loop_detection::hash_input;
use oxide_guard::{ExecutionStep, LoopDetector, LoopDetectorConfig, LoopType};
use serde_json::json;

fn step(skill: &str, timestamp: u64) -> ExecutionStep {
    ExecutionStep::new(skill, timestamp, hash_input(&json!({ "skill": skill })))
}

fn reason(detector: &LoopDetector, session: &str) -> String {
    detector
        .check_for_loop(session)
        .reason
        .unwrap_or_default()
}

#[test]
fn depth_limit_reports_count_and_limit() {
    let mut detector = LoopDetector::default();
    for i in 0..11 {
        detector.record_step("depth", step(&format!("skill-{i}"), i));
    }
    let result = detector.check_for_loop("depth");
    assert!(result.detected);
    assert_eq!(result.loop_type, Some(LoopType::Depth));
    let reason = reason(&detector, "depth");
    assert!(reason.contains("11") && reason.contains("10"), "{reason}");
}

#[test]
fn repeated_skill_is_a_cycle() {
    let mut detector = LoopDetector::default();
    for i in 0..4 {
        detector.record_step("cycle", step("A", i));
    }
    let result = detector.check_for_loop("cycle");
    assert!(result.detected);
    assert_eq!(result.loop_type, Some(LoopType::Cycle));
    let reason = reason(&detector, "cycle");
    assert!(reason.contains('A') && reason.contains('4'), "{reason}");
}

#[test]
fn alternating_skills_are_a_pattern() {
    let mut detector = LoopDetector::default();
    for (i, skill) in ["A", "B", "A", "B", "A", "B"].into_iter().enumerate() {
        detector.record_step("pattern", step(skill, i as u64));
    }
    let result = detector.check_for_loop("pattern");
    assert!(result.detected);
    assert_eq!(result.loop_type, Some(LoopType::Pattern));
    assert!(reason(&detector, "pattern").contains("A -> B"));
}

#[test]
fn long_running_session_exceeds_duration() {
    let mut detector = LoopDetector::new(LoopDetectorConfig {
        max_duration_ms: 60_000,
        ..LoopDetectorConfig::default()
    });
    detector.record_step("slow", step("plan", 0));
    detector.record_step("slow", step("act", 70_000));

    let result = detector.check_for_loop("slow");
    assert!(result.detected);
    assert_eq!(result.loop_type, Some(LoopType::Duration));
    let reason = reason(&detector, "slow");
    assert!(reason.contains("70000") && reason.contains("60000"), "{reason}");
}

#[test]
fn distinct_progress_is_not_a_loop() {
    let mut detector = LoopDetector::default();
    for (i, skill) in ["search", "read", "summarize", "search", "write"]
        .into_iter()
        .enumerate()
    {
        detector.record_step("ok", step(skill, i as u64 * 1_000));
    }
    let result = detector.check_for_loop("ok");
    assert!(!result.detected);
    assert!(result.reason.is_none());
    assert!(result.loop_type.is_none());
}

#[test]
fn reset_clears_detection() {
    let mut detector = LoopDetector::default();
    for i in 0..4 {
        detector.record_step("s", step("A", i));
    }
    assert!(detector.check_for_loop("s").detected);

    detector.reset("s");
    assert!(!detector.check_for_loop("s").detected);
    assert!(detector.get_execution_path("s").is_empty());
}

#[test]
fn execution_path_keeps_insertion_order() {
    let mut detector = LoopDetector::default();
    let input = json!({ "query": "weather" });
    detector.record_step("s", ExecutionStep::record("search", &input));
    detector.record_step("s", ExecutionStep::record("answer", &input));

    let path = detector.get_execution_path("s");
    let skills: Vec<&str> = path.iter().map(|s| s.skill_id.as_str()).collect();
    assert_eq!(skills, vec!["search", "answer"]);
    assert_eq!(path[0].input_hash, hash_input(&input));
    assert!(path[1].timestamp >= path[0].timestamp);
}
