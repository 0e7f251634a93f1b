//! The prompt data model: options, provenance, and the retry-prompt
//! specialization (spec.md §3).

mod assembly;

use std::sync::Arc;

use crate::model::FunctionUnderTest;

pub use assembly::{STABLE_CASE_HEADER, STABLE_SUITE_HEADER};

/// A configuration of which optional sections to include in a prompt. All
/// default to `false` for the initial prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptOptions {
    pub include_snippets: bool,
    pub include_doc_comment: bool,
    pub include_function_body: bool,
}

/// The triple that caused a prompt to be produced: `{originalPrompt, testId,
/// refiner}`. `original_prompt_key` is the producing prompt's assembled
/// text, not a live reference — prompt identity is textual (DESIGN NOTES §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub original_prompt_key: String,
    pub test_id: u64,
    pub refiner: &'static str,
}

/// The extra payload a retry prompt carries: the failing completion body and
/// the error message that caused the retry (spec.md §3, "Retry prompt").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryInfo {
    pub failing_body: String,
    pub error_message: String,
}

/// A prompt candidate: the target function, its snippets, its option flags,
/// an optional retry payload, and the provenance records explaining how it
/// was produced. Prompts are produced by the initial step and by refiners;
/// they are never mutated after first assembly except by appending
/// provenance records (spec.md §3, invariant "Lifecycles").
#[derive(Debug, Clone)]
pub struct Prompt {
    pub function: Arc<FunctionUnderTest>,
    pub snippets: Vec<String>,
    pub options: PromptOptions,
    pub retry: Option<RetryInfo>,
    pub provenance: Vec<Provenance>,
}

impl Prompt {
    /// The initial prompt for a function: no snippets included even if some
    /// are available, all options false, no provenance.
    pub fn initial(function: Arc<FunctionUnderTest>, snippets: Vec<String>) -> Self {
        Self {
            function,
            snippets,
            options: PromptOptions::default(),
            retry: None,
            provenance: Vec::new(),
        }
    }

    /// A copy of `self` with different options and no retry payload, used by
    /// the non-retry refiners. Provenance starts empty; the generation loop
    /// tags it after the refiner returns (spec.md §4.6).
    pub fn with_options(&self, options: PromptOptions) -> Self {
        Self {
            function: Arc::clone(&self.function),
            snippets: self.snippets.clone(),
            options,
            retry: None,
            provenance: Vec::new(),
        }
    }

    /// A retry prompt derived from `self`, carrying the failing completion
    /// and its error message. Retry is non-chaining: `self` must not already
    /// be a retry prompt (enforced by the `RetryWithError` refiner, spec.md
    /// §4.4, and checked again here defensively).
    pub fn as_retry(&self, failing_body: String, error_message: String) -> Option<Self> {
        if self.retry.is_some() {
            return None;
        }
        Some(Self {
            function: Arc::clone(&self.function),
            snippets: self.snippets.clone(),
            options: self.options,
            retry: Some(RetryInfo {
                failing_body,
                error_message,
            }),
            provenance: Vec::new(),
        })
    }

    pub fn is_retry(&self) -> bool {
        self.retry.is_some()
    }

    /// Append a provenance record. The only mutation a prompt undergoes
    /// after first assembly (spec.md §3, invariant 3).
    pub fn push_provenance(&mut self, provenance: Provenance) {
        self.provenance.push(provenance);
    }
}
