//! End-to-end generation-loop scenarios, run against a scripted completion
//! provider and an in-memory validator so outcomes are fully deterministic.
//! Each test reproduces one literal scenario and checks the invariants it
//! names.

use std::sync::Arc;

use async_trait::async_trait;
use genforge::collector::{TestCollector, TestOutcome};
use genforge::generator::generate_and_validate;
use genforge::llm::ScriptedProvider;
use genforge::model::FunctionUnderTest;
use genforge::snippets::SnippetMap;
use genforge::validator::{CoverageSummary, TestValidator};

/// Classifies an assembled test source by the first matching substring rule;
/// falls back to `Other` when nothing matches.
struct MockValidator {
    rules: Vec<(&'static str, TestOutcome)>,
}

impl MockValidator {
    fn new(rules: Vec<(&'static str, TestOutcome)>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl TestValidator for MockValidator {
    async fn validate(&self, _name: &str, source: &str) -> TestOutcome {
        for (needle, outcome) in &self.rules {
            if source.contains(needle) {
                return outcome.clone();
            }
        }
        TestOutcome::Other
    }

    fn coverage_summary(&self) -> CoverageSummary {
        CoverageSummary::default()
    }

    async fn cleanup(&self) {}
}

struct FixedSnippets(Vec<String>);

impl SnippetMap for FixedSnippets {
    fn snippets_for(&self, _function_name: &str) -> Option<Vec<String>> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

fn passed() -> TestOutcome {
    TestOutcome::Passed { coverage_report: None, coverage_data: None }
}

fn failed(message: &str) -> TestOutcome {
    TestOutcome::Failed { message: message.to_string(), code: None, stack: None }
}

fn titlecase_function(doc: Option<&str>, body: Option<&str>) -> Arc<FunctionUnderTest> {
    Arc::new(
        FunctionUnderTest::parse(
            "string-utils",
            "string-utils.titleCase(string)",
            doc.map(str::to_string),
            body.map(str::to_string),
        )
        .expect("valid signature"),
    )
}

fn far_future() -> std::time::Instant {
    std::time::Instant::now() + std::time::Duration::from_secs(30)
}

#[tokio::test]
async fn s1_straight_through_pass() {
    let function = titlecase_function(None, None);
    let provider = ScriptedProvider::new(vec![vec![
        "assert(stringUtils.titleCase('hello world') === 'Hello World');".to_string(),
    ]]);
    let validator = MockValidator::new(vec![("Hello World", passed())]);
    let snippets = FixedSnippets(vec![]);
    let mut collector = TestCollector::new();

    generate_and_validate(
        function,
        &[0.2],
        &snippets,
        &provider,
        &validator,
        &mut collector,
        far_future(),
    )
    .await;

    assert_eq!(collector.prompts().count(), 1, "only the initial prompt should be queried");
    assert_eq!(collector.tests().count(), 1);
    let test = collector.tests().next().unwrap();
    assert!(test.outcome.is_passed());
}

#[tokio::test]
async fn s2_fail_then_retry() {
    let function = titlecase_function(None, None);
    let passing = "assert(stringUtils.titleCase('hello world') === 'Hello World');".to_string();
    let failing = "assert(stringUtils.titleCase('x') === 'bad');".to_string();
    let provider = ScriptedProvider::new(vec![vec![passing.clone(), failing.clone()], vec![]]);
    let validator = MockValidator::new(vec![
        ("Hello World", passed()),
        ("bad", failed("test failed")),
    ]);
    let snippets = FixedSnippets(vec![]);
    let mut collector = TestCollector::new();

    generate_and_validate(
        function,
        &[0.2],
        &snippets,
        &provider,
        &validator,
        &mut collector,
        far_future(),
    )
    .await;

    assert_eq!(collector.tests().count(), 2, "c1 and c2 assemble to distinct sources");
    assert_eq!(collector.prompts().count(), 2, "initial prompt plus exactly one retry prompt");

    let failing_test = collector
        .tests()
        .find(|t| t.outcome.is_failed())
        .expect("one failing test-info");
    let initial_key_id = collector
        .prompts()
        .find(|p| p.prompt.provenance.is_empty())
        .expect("the initial prompt has no provenance")
        .id;

    let retry_prompt = collector
        .prompts()
        .find(|p| !p.prompt.provenance.is_empty())
        .expect("a retry prompt was recorded");
    assert_eq!(retry_prompt.prompt.provenance.len(), 1);
    let record = &retry_prompt.prompt.provenance[0];
    assert_eq!(record.refiner, "RetryWithError");
    assert_eq!(record.test_id, failing_test.id);
    let by_key = collector.prompt_id_by_key();
    assert_eq!(by_key.get(&record.original_prompt_key).copied(), Some(initial_key_id));
}

#[tokio::test]
async fn s3_snippet_rescue() {
    let function = titlecase_function(None, None);
    let passing = "assert(stringUtils.titleCase('hello world') === 'Hello World');".to_string();
    let rescued_failure = "assert(stringUtils.titleCase('x') === 'Nope');".to_string();
    let provider = ScriptedProvider::new(vec![
        vec![passing],
        vec![rescued_failure],
        vec![],
    ]);
    let validator = MockValidator::new(vec![
        ("Hello World", passed()),
        ("Nope", failed("snippet rescue failed")),
    ]);
    let snippets = FixedSnippets(vec!["stringUtils.titleCase('hello world').result".to_string()]);
    let mut collector = TestCollector::new();

    generate_and_validate(
        function,
        &[0.2],
        &snippets,
        &provider,
        &validator,
        &mut collector,
        far_future(),
    )
    .await;

    assert_eq!(collector.prompts().count(), 3, "initial, snippet-enabled, and retry prompts");
    assert_eq!(
        collector.tests().count(),
        2,
        "the snippet-enabled test source is distinct from the initial one"
    );
}

#[tokio::test]
async fn s4_duplicate_refinement_merges_provenance() {
    let function = titlecase_function(None, None);
    let c1 = "assert(stringUtils.titleCase('a') === 'A');".to_string();
    let c2 = "assert(stringUtils.titleCase('b') === 'B');".to_string();
    let provider = ScriptedProvider::new(vec![vec![c1.clone(), c2.clone()], vec![]]);
    let validator = MockValidator::new(vec![("A", passed()), ("B", passed())]);
    let snippets = FixedSnippets(vec!["example usage".to_string()]);
    let mut collector = TestCollector::new();

    generate_and_validate(
        function,
        &[0.2],
        &snippets,
        &provider,
        &validator,
        &mut collector,
        far_future(),
    )
    .await;

    assert_eq!(collector.tests().count(), 2, "two distinct passing completions");

    let refined = collector
        .prompts()
        .find(|p| !p.prompt.provenance.is_empty())
        .expect("the snippet-enabled prompt was recorded exactly once");
    assert_eq!(
        collector.prompts().filter(|p| !p.prompt.provenance.is_empty()).count(),
        1,
        "the two SnippetIncluder successors collapse into one prompt-info"
    );
    assert_eq!(refined.prompt.provenance.len(), 2);
    let mut test_ids: Vec<u64> = refined.prompt.provenance.iter().map(|p| p.test_id).collect();
    test_ids.sort_unstable();
    let mut expected: Vec<u64> = collector.tests().map(|t| t.id).collect();
    expected.sort_unstable();
    assert_eq!(test_ids, expected);
}

#[tokio::test]
async fn s5_syntax_error_does_not_stop_refinement() {
    let function = titlecase_function(
        Some("Title-cases a string."),
        Some("return s.split(' ').map(capitalize).join(' ');"),
    );
    // The stray apostrophe in "isn't" leaves a dangling string literal, so
    // `closeBrackets` cannot repair this into valid structure.
    let invalid = "this isn't a valid completion".to_string();
    let provider = ScriptedProvider::new(vec![
        vec![invalid],
        vec![], // FunctionBodyIncluder successor
        vec![], // DocCommentIncluder successor
        vec![], // RetryWithError successor
        vec![], // SnippetIncluder successor
    ]);
    let validator = MockValidator::new(vec![]);
    let snippets = FixedSnippets(vec!["stringUtils.titleCase('a')".to_string()]);
    let mut collector = TestCollector::new();

    generate_and_validate(
        function,
        &[0.2],
        &snippets,
        &provider,
        &validator,
        &mut collector,
        far_future(),
    )
    .await;

    assert_eq!(collector.tests().count(), 1);
    let test = collector.tests().next().unwrap();
    match &test.outcome {
        TestOutcome::Failed { message, .. } => assert_eq!(message, "Invalid syntax"),
        other => panic!("expected Failed, got {other:?}"),
    }

    assert_eq!(collector.prompts().count(), 5, "initial plus all four refiners fired");
    let fired: Vec<&str> = collector
        .prompts()
        .flat_map(|p| p.prompt.provenance.iter().map(|prov| prov.refiner))
        .collect();
    for expected in ["SnippetIncluder", "RetryWithError", "DocCommentIncluder", "FunctionBodyIncluder"] {
        assert!(fired.contains(&expected), "expected {expected} to have fired, got {fired:?}");
    }
}

#[tokio::test]
async fn s6_empty_test_rejection() {
    let function = titlecase_function(None, None);
    let provider = ScriptedProvider::new(vec![vec![String::new()], vec![]]);
    let validator = MockValidator::new(vec![]);
    let snippets = FixedSnippets(vec![]);
    let mut collector = TestCollector::new();

    generate_and_validate(
        function,
        &[0.2],
        &snippets,
        &provider,
        &validator,
        &mut collector,
        far_future(),
    )
    .await;

    assert_eq!(collector.tests().count(), 1);
    let test = collector.tests().next().unwrap();
    match &test.outcome {
        TestOutcome::Failed { message, .. } => assert_eq!(message, "Empty test"),
        other => panic!("expected Failed, got {other:?}"),
    }

    assert_eq!(collector.prompts().count(), 2, "initial prompt plus the RetryWithError successor");
    let retry = collector
        .prompts()
        .find(|p| !p.prompt.provenance.is_empty())
        .expect("a retry prompt was recorded");
    assert_eq!(retry.prompt.provenance.len(), 1);
    assert_eq!(retry.prompt.provenance[0].refiner, "RetryWithError");
}
