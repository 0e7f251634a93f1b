//! Run reports: per-function records of prompts and tests, rendered to
//! Markdown and diffable against a prior run (spec.md §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::collector::{TestCollector, TestOutcome};
use crate::validator::CoverageSummary;

/// One test entry within a function's report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEntry {
    pub name: String,
    pub api: String,
    pub prompt_ids: Vec<u64>,
    pub status: String,
    pub err: Option<String>,
    pub covered_statements: Option<f64>,
}

/// One distinct prompt's record, with provenance translated back to
/// integer prompt ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRecord {
    pub id: u64,
    pub file: String,
    pub temperature: f64,
    pub completions: usize,
    pub tests: Vec<u64>,
    pub provenance: Vec<ProvenanceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub original_prompt_id: u64,
    pub test_id: u64,
    pub refiner: String,
}

/// The per-function report entry: metadata, test entries, and a coverage
/// summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionReport {
    pub package_name: String,
    pub access_path: String,
    pub module_path: Option<String>,
    pub num_snippets: usize,
    pub num_completions_per_request: u32,
    pub tests: Vec<TestEntry>,
    pub prompts: Vec<PromptRecord>,
    pub passed: usize,
    pub failed: usize,
    pub coverage: CoverageSummary,
}

/// The full report for one engine run, one entry per function processed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunReport {
    pub functions: Vec<FunctionReport>,
}

fn outcome_status(outcome: &TestOutcome) -> (&'static str, Option<String>) {
    match outcome {
        TestOutcome::Passed { .. } => ("passed", None),
        TestOutcome::Failed { message, .. } => ("failed", Some(message.clone())),
        TestOutcome::Pending => ("pending", None),
        TestOutcome::Other => ("other", None),
    }
}

/// Extract the per-test statement count a passing validator run attached to
/// its outcome, if any (src/validator/node.rs populates this from the
/// single-test coverage run it just performed).
fn covered_statements_of(outcome: &TestOutcome) -> Option<f64> {
    match outcome {
        TestOutcome::Passed { coverage_data: Some(v), .. } => v.as_f64(),
        _ => None,
    }
}

/// Build a [`FunctionReport`] from a collector's accumulated state for one
/// function. `prompt_id_by_key` maps each distinct assembled prompt text to
/// its collector-assigned id, used to translate provenance back to ids.
/// `num_snippets` is the count of usage snippets the snippet map returned
/// for this function (spec.md §6, "snippet policy flags").
pub fn build_function_report(
    package_name: &str,
    access_path: &str,
    module_path: Option<&str>,
    num_snippets: usize,
    completions_per_request: u32,
    collector: &TestCollector,
    prompt_id_by_key: &HashMap<String, u64>,
) -> FunctionReport {
    let mut passed = 0;
    let mut failed = 0;
    let mut tests = Vec::new();
    let mut tests_by_prompt: HashMap<u64, Vec<u64>> = HashMap::new();

    for info in collector.tests() {
        let (status, err) = outcome_status(&info.outcome);
        match &info.outcome {
            TestOutcome::Passed { .. } => passed += 1,
            TestOutcome::Failed { .. } => failed += 1,
            _ => {}
        }
        let prompt_ids: Vec<u64> = info
            .prompts
            .iter()
            .filter_map(|p| prompt_id_by_key.get(&p.assemble()).copied())
            .collect();
        for &prompt_id in &prompt_ids {
            tests_by_prompt.entry(prompt_id).or_default().push(info.id);
        }
        tests.push(TestEntry {
            name: info.name.clone(),
            api: info.api.clone(),
            prompt_ids,
            status: status.to_string(),
            err,
            covered_statements: covered_statements_of(&info.outcome),
        });
    }

    let mut prompts: Vec<PromptRecord> = collector
        .prompts()
        .map(|info| {
            let provenance = info
                .prompt
                .provenance
                .iter()
                .map(|prov| ProvenanceRecord {
                    original_prompt_id: prompt_id_by_key
                        .get(&prov.original_prompt_key)
                        .copied()
                        .unwrap_or(0),
                    test_id: prov.test_id,
                    refiner: prov.refiner.to_string(),
                })
                .collect();
            PromptRecord {
                id: info.id,
                file: info.file.clone(),
                temperature: info.temperature,
                completions: info.completions.len(),
                tests: tests_by_prompt.get(&info.id).cloned().unwrap_or_default(),
                provenance,
            }
        })
        .collect();
    prompts.sort_by_key(|p| p.id);

    FunctionReport {
        package_name: package_name.to_string(),
        access_path: access_path.to_string(),
        module_path: module_path.map(str::to_string),
        num_snippets,
        num_completions_per_request: completions_per_request,
        tests,
        prompts,
        passed,
        failed,
        coverage: CoverageSummary::default(),
    }
}

/// Render a run report as a Markdown summary table, one row per function.
pub fn render_markdown(report: &RunReport) -> String {
    let mut out = String::from("| function | passed | failed | lines % |\n|---|---|---|---|\n");
    for f in &report.functions {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            f.access_path,
            f.passed,
            f.failed,
            f.coverage
                .lines_pct
                .map(|p| format!("{p:.1}"))
                .unwrap_or_else(|| "-".to_string()),
        ));
    }
    out
}

/// A per-function delta between a baseline report and the current run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDiff {
    pub access_path: String,
    pub passed_delta: i64,
    pub failed_delta: i64,
}

/// Compare `current` against `baseline`, keyed by access path. Functions
/// present only in one report are reported with the other side at zero.
pub fn diff_against_baseline(baseline: &RunReport, current: &RunReport) -> Vec<FunctionDiff> {
    let baseline_by_path: HashMap<&str, &FunctionReport> = baseline
        .functions
        .iter()
        .map(|f| (f.access_path.as_str(), f))
        .collect();

    let mut diffs = Vec::new();
    for f in &current.functions {
        let before = baseline_by_path.get(f.access_path.as_str());
        let passed_delta = f.passed as i64 - before.map(|b| b.passed as i64).unwrap_or(0);
        let failed_delta = f.failed as i64 - before.map(|b| b.failed as i64).unwrap_or(0);
        if passed_delta != 0 || failed_delta != 0 {
            diffs.push(FunctionDiff { access_path: f.access_path.clone(), passed_delta, failed_delta });
        }
    }
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(access_path: &str, passed: usize, failed: usize) -> FunctionReport {
        FunctionReport {
            package_name: "string-utils".to_string(),
            access_path: access_path.to_string(),
            module_path: None,
            num_snippets: 0,
            num_completions_per_request: 5,
            tests: Vec::new(),
            prompts: Vec::new(),
            passed,
            failed,
            coverage: CoverageSummary::default(),
        }
    }

    #[test]
    fn covered_statements_reads_passed_coverage_data() {
        let passed = TestOutcome::Passed {
            coverage_report: Some("coverage/coverage-summary.json".to_string()),
            coverage_data: Some(serde_json::json!(12.0)),
        };
        assert_eq!(covered_statements_of(&passed), Some(12.0));
    }

    #[test]
    fn covered_statements_is_none_for_non_passing_outcomes() {
        let failed = TestOutcome::Failed { message: "x".to_string(), code: None, stack: None };
        assert_eq!(covered_statements_of(&failed), None);
    }

    #[test]
    fn render_markdown_includes_one_row_per_function() {
        let run = RunReport { functions: vec![report("pkg.a", 1, 0), report("pkg.b", 0, 2)] };
        let md = render_markdown(&run);
        assert!(md.contains("pkg.a"));
        assert!(md.contains("pkg.b"));
    }

    #[test]
    fn diff_reports_only_functions_that_changed() {
        let baseline = RunReport { functions: vec![report("pkg.a", 1, 0), report("pkg.b", 1, 0)] };
        let current = RunReport { functions: vec![report("pkg.a", 1, 0), report("pkg.b", 0, 1)] };
        let diffs = diff_against_baseline(&baseline, &current);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].access_path, "pkg.b");
        assert_eq!(diffs[0].passed_delta, -1);
        assert_eq!(diffs[0].failed_delta, 1);
    }

    #[test]
    fn diff_treats_new_function_as_delta_from_zero() {
        let baseline = RunReport { functions: vec![] };
        let current = RunReport { functions: vec![report("pkg.a", 2, 0)] };
        let diffs = diff_against_baseline(&baseline, &current);
        assert_eq!(diffs[0].passed_delta, 2);
    }
}
