//! Full pipeline runs with real analyzer processes (echo/sh stand-ins) and a
//! JSON feedback file, finishing in the apply engine.

use kaizen_engine::analyzer::{AnalyzerDescriptor, AnalyzerRegistry, ParserKind};
use kaizen_engine::{
    ApplyEngine, ApplyMode, AutoSafeSource, EngineConfig, Fix, Issue, JsonFeedbackSource, Safety,
    Severity,
};
use kaizen_engine::ReviewPipeline;
use std::path::{Path, PathBuf};

fn echo_registry(line: &str) -> AnalyzerRegistry {
    let mut registry = AnalyzerRegistry::new();
    registry.register(
        AnalyzerDescriptor::new("echo-lint", "echo")
            .with_args([line])
            .with_extensions(["py"])
            .with_parser(ParserKind::Colon),
    );
    registry
}

fn write_feedback(dir: &Path, issues: &[Issue]) -> PathBuf {
    let path = dir.join("feedback.json");
    std::fs::write(&path, serde_json::to_string(issues).unwrap()).unwrap();
    path
}

#[tokio::test]
async fn analyzer_finding_and_llm_suggestion_collapse_into_one_issue() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("sample.py");
    std::fs::write(&target, "x = cache[key]\n").unwrap();

    let suggestion = Issue::new(
        &target,
        1,
        1,
        Severity::Medium,
        "llm",
        "null deref risk",
    )
    .with_fix(Fix::new(
        "use get",
        "x = cache[key]",
        "x = cache.get(key)",
        0.9,
    ));
    let feedback = write_feedback(dir.path(), &[suggestion]);

    let pipeline = ReviewPipeline::new(EngineConfig::default())
        .with_registry(echo_registry("{file}:1:1: high: possible null dereference"))
        .with_feedback(Box::new(JsonFeedbackSource::new(&feedback)));

    let outcome = pipeline.run(&[target.clone()]).await.unwrap();

    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.merge_stats.input_count, 2);
    assert_eq!(outcome.merge_stats.collapsed_count, 1);
    assert_eq!(outcome.issues[0].severity, Severity::High);
    assert!(outcome.issues[0].source_tools.contains(&"llm".to_string()));
    assert!(outcome.issues[0]
        .source_tools
        .contains(&"echo-lint".to_string()));
    assert_eq!(outcome.issues[0].id, "KZ-0001");
    assert_eq!(outcome.issues[0].fixes.len(), 1);
    // Untrusted safety claims were discarded and re-classified locally.
    assert_ne!(outcome.issues[0].fixes[0].safety, Safety::Safe);
}

#[tokio::test]
async fn pipeline_output_feeds_batch_apply() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("sample.py");
    std::fs::write(&target, "level = warn\nrest = 1\n").unwrap();

    // A mechanical quoting fix with high confidence classifies as safe, so
    // batch mode applies it unattended.
    let suggestion = Issue::new(&target, 1, 1, Severity::Medium, "llm", "unquoted literal")
        .with_fix(Fix::new(
            "quote literal",
            "level = warn",
            "level = \"warn\"",
            0.95,
        ));
    let feedback = write_feedback(dir.path(), &[suggestion]);

    let config = EngineConfig::default().with_backup_root(dir.path().join("backups"));
    let pipeline = ReviewPipeline::new(config.clone())
        .with_registry(AnalyzerRegistry::new())
        .with_feedback(Box::new(JsonFeedbackSource::new(&feedback)));
    let outcome = pipeline.run(&[target.clone()]).await.unwrap();

    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].fixes[0].safety, Safety::Safe);

    let mut engine = ApplyEngine::new(&config, ApplyMode::BatchSafeOnly, outcome.issues);
    engine.run(&mut AutoSafeSource);

    let content = std::fs::read_to_string(&target).unwrap();
    assert_eq!(content, "level = \"warn\"\nrest = 1\n");

    let report = engine.into_report(outcome.warnings, outcome.merge_stats);
    assert_eq!(report.counts.applied, 1);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn degraded_analyzer_still_produces_a_ranked_list() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("sample.py");
    std::fs::write(&target, "x = 1\n").unwrap();

    let mut registry = echo_registry("{file}:1:1: medium: unused variable x");
    registry.register(
        AnalyzerDescriptor::new("ghost", "/nonexistent/analyzer-binary").with_extensions(["py"]),
    );

    let pipeline = ReviewPipeline::new(EngineConfig::default()).with_registry(registry);
    let outcome = pipeline.run(&[target]).await.unwrap();

    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].tool, "ghost");
}
