//! The test collector: deduplicates assembled test sources and prompt
//! objects, assigns ids, and accumulates outcomes (spec.md §3, §4.5).

use std::collections::HashMap;

use crate::prompt::{Prompt, Provenance};

/// The target ecosystem's exported API identifier a test info was produced
/// against; opaque to the collector beyond being carried through.
pub type ApiName = String;

/// A validation result. Only `Passed` contributes to coverage.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    Passed {
        coverage_report: Option<String>,
        coverage_data: Option<serde_json::Value>,
    },
    Failed {
        message: String,
        code: Option<String>,
        stack: Option<String>,
    },
    Pending,
    Other,
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TestOutcome::Failed { .. })
    }
}

/// One distinct assembled test source, keyed by that source text.
#[derive(Debug, Clone)]
pub struct TestInfo {
    pub id: u64,
    pub name: String,
    pub source: String,
    pub outcome: TestOutcome,
    pub prompts: Vec<Prompt>,
    pub api: ApiName,
}

impl TestInfo {
    fn new(id: u64, source: String, prompt: Prompt, api: ApiName) -> Self {
        Self {
            id,
            name: format!("test_{id}.js"),
            source,
            outcome: TestOutcome::Other,
            prompts: vec![prompt],
            api,
        }
    }
}

/// One distinct assembled prompt, recorded the first time the collector
/// sees it.
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: u64,
    pub prompt: Prompt,
    pub file: String,
    pub temperature: f64,
    pub completions: Vec<String>,
}

/// Outcome of [`TestCollector::record_test_info`]: whether the validator
/// must still be invoked for this source, per the engine's "already
/// validated" short-circuit (spec.md §9 Open Questions).
pub struct RecordedTest<'a> {
    pub info: &'a TestInfo,
    pub needs_validation: bool,
}

/// Holds every keyed structure the engine needs across a function's
/// generation run: test infos by source, prompt infos by assembled text,
/// and the latest coverage summary.
#[derive(Debug, Default)]
pub struct TestCollector {
    tests_by_source: HashMap<String, TestInfo>,
    prompts_by_key: HashMap<String, PromptInfo>,
    next_test_id: u64,
    next_prompt_id: u64,
    coverage_summary: Option<serde_json::Value>,
}

impl TestCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an assembled test source paired with the prompt that produced
    /// it. If the source is already known, `prompt` is appended to the
    /// existing test-info's `prompts` list and `needs_validation` is false
    /// exactly when this is the second or later distinct prompt recorded
    /// against that source (the engine's validator short-circuit: the
    /// source itself, not the prompt identity, has already been judged).
    pub fn record_test_info(&mut self, source: &str, prompt: Prompt, api: ApiName) -> RecordedTest<'_> {
        if let Some(existing) = self.tests_by_source.get_mut(source) {
            existing.prompts.push(prompt);
            let needs_validation = existing.prompts.len() <= 1;
            let info = self.tests_by_source.get(source).expect("just inserted");
            return RecordedTest { info, needs_validation };
        }

        let id = self.next_test_id;
        self.next_test_id += 1;
        let info = TestInfo::new(id, source.to_string(), prompt, api);
        self.tests_by_source.insert(source.to_string(), info);
        let info = self.tests_by_source.get(source).expect("just inserted");
        RecordedTest { info, needs_validation: true }
    }

    /// Overwrite a test-info's outcome. `temperature` is accepted for
    /// external bookkeeping only; the test-info itself does not store it.
    pub fn record_test_result(&mut self, test_id: u64, _temperature: f64, outcome: TestOutcome) {
        if let Some(info) = self.tests_by_source.values_mut().find(|t| t.id == test_id) {
            info.outcome = outcome;
        }
    }

    /// Register a prompt by its assembled text exactly once. Returns the
    /// existing entry's id on a repeat call.
    pub fn record_prompt_info(&mut self, key: &str, prompt: Prompt, temperature: f64) -> u64 {
        if let Some(existing) = self.prompts_by_key.get(key) {
            return existing.id;
        }
        let id = self.next_prompt_id;
        self.next_prompt_id += 1;
        self.prompts_by_key.insert(
            key.to_string(),
            PromptInfo {
                id,
                prompt,
                file: format!("prompt_{id}.js"),
                temperature,
                completions: Vec::new(),
            },
        );
        id
    }

    /// Append a completion to a previously-registered prompt info.
    pub fn record_completion(&mut self, key: &str, completion: String) {
        if let Some(info) = self.prompts_by_key.get_mut(key) {
            info.completions.push(completion);
        }
    }

    /// Drain `provenance` into the prompt-info already registered under
    /// `key`. Used when a refiner produces two successors that assemble to
    /// the same text from two distinct completions: the duplicate carries
    /// its own provenance record, and it must land on the one surviving
    /// prompt-info rather than being discarded with the duplicate prompt
    /// (spec.md §8, S4 "duplicate refinement").
    pub fn append_prompt_provenance(&mut self, key: &str, provenance: &mut Vec<Provenance>) {
        if let Some(info) = self.prompts_by_key.get_mut(key) {
            info.prompt.provenance.append(provenance);
        }
    }

    pub fn record_coverage_info(&mut self, summary: serde_json::Value) {
        self.coverage_summary = Some(summary);
    }

    pub fn coverage_summary(&self) -> Option<&serde_json::Value> {
        self.coverage_summary.as_ref()
    }

    pub fn test_by_source(&self, source: &str) -> Option<&TestInfo> {
        self.tests_by_source.get(source)
    }

    pub fn tests(&self) -> impl Iterator<Item = &TestInfo> {
        self.tests_by_source.values()
    }

    pub fn passing_tests(&self) -> impl Iterator<Item = &TestInfo> {
        self.tests_by_source.values().filter(|t| t.outcome.is_passed())
    }

    /// Every distinct prompt recorded so far, in no particular order.
    pub fn prompts(&self) -> impl Iterator<Item = &PromptInfo> {
        self.prompts_by_key.values()
    }

    /// A snapshot of assembled-text to prompt-id, for translating a prompt's
    /// provenance (keyed by its producing prompt's text) back to the id the
    /// report layer needs (spec.md §6, "Prompt record").
    pub fn prompt_id_by_key(&self) -> HashMap<String, u64> {
        self.prompts_by_key.iter().map(|(k, v)| (k.clone(), v.id)).collect()
    }
}
