use forge_validate::validators::{
    ImportOrderValidator, OutputContractValidator, ProjectLocalImportPathValidator, SyntaxValidator,
    UnusedImportValidator,
};
use forge_validate::{Mode, ValidatorPipeline};

fn full_pipeline() -> ValidatorPipeline {
    let mut pipeline = ValidatorPipeline::new();
    pipeline.add(Box::new(SyntaxValidator));
    pipeline.add(Box::new(UnusedImportValidator));
    pipeline.add(Box::new(ImportOrderValidator));
    pipeline.add(Box::new(ProjectLocalImportPathValidator));
    pipeline.add(Box::new(OutputContractValidator));
    pipeline
}

#[tokio::test]
async fn full_mode_runs_every_validator_and_aggregates() {
    let pipeline = full_pipeline();
    let source = r#"
use serde_json;
fn main() {
    println!("{}", serde_json::to_string(&42).unwrap());
}
"#;
    let report = pipeline.run(source, Mode::Full).await;
    assert_eq!(report.summary.total, 5);
    assert!(report.passed, "unexpected failures: {:?}", report.per_validator);
}

#[tokio::test]
async fn full_mode_surfaces_a_failing_validator() {
    let pipeline = full_pipeline();
    let source = "fn main() { println!(\"no json here\"); }";
    let report = pipeline.run(source, Mode::Full).await;
    assert!(!report.passed);
    let failing: Vec<_> = report.per_validator.iter().filter(|o| !o.passed).collect();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].category.to_string(), "output_contract");
}

#[tokio::test]
async fn retry_failed_mode_reuses_passing_outcomes() {
    let pipeline = full_pipeline();
    let bad_source = "fn main() { println!(\"no json here\"); }";
    let first = pipeline.run(bad_source, Mode::Full).await;
    assert!(!first.passed);
    assert_eq!(first.summary.failed, 1);
    let cached: Vec<(String, String)> = first
        .per_validator
        .iter()
        .filter(|o| o.passed)
        .map(|o| (o.category.to_string(), o.output.clone()))
        .collect();
    assert_eq!(cached.len(), 4);

    let fixed_source = "fn main() { println!(\"{}\", serde_json::to_string(&1).unwrap()); }";
    let second = pipeline.run(fixed_source, Mode::RetryFailed(first)).await;
    assert!(second.passed);
    for (category, output) in cached {
        let reused = second.per_validator.iter().find(|o| o.category.to_string() == category).unwrap();
        assert_eq!(reused.output, output, "category {category} should reuse its cached outcome verbatim");
    }
}

#[tokio::test]
async fn import_order_and_path_validators_auto_fix_together() {
    let pipeline = full_pipeline();
    let source = "use local_helpers::fmt;\nuse zeta;\nuse alpha;\nsetup_import_path();\nfn main() { let _ = (fmt::x(), zeta::y(), alpha::z()); println!(\"{}\", serde_json::to_string(&1).unwrap()); }";
    let report = pipeline.run(source, Mode::Full).await;
    assert!(report.passed, "unexpected failures: {:?}", report.per_validator);
    assert!(report.final_source.find("setup_import_path").unwrap() < report.final_source.find("local_helpers").unwrap());
}
