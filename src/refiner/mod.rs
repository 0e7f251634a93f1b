//! The refiner protocol: named strategies that propose successor prompts
//! from a `(prompt, completion, outcome)` triple (spec.md §4.4).
//!
//! Refiners are pure functions over their arguments — no shared mutable
//! state — expressed as an ordered set of capability impls rather than a
//! class hierarchy (DESIGN NOTES §9).

use crate::collector::TestOutcome;
use crate::prompt::{Prompt, PromptOptions};

/// A named strategy producing zero or more successor prompts. Implementors
/// must not read or write anything but their arguments.
pub trait Refiner: Send + Sync {
    fn name(&self) -> &'static str;
    fn refine(&self, prompt: &Prompt, completion: &str, outcome: &TestOutcome) -> Vec<Prompt>;
}

pub struct SnippetIncluder;

impl Refiner for SnippetIncluder {
    fn name(&self) -> &'static str {
        "SnippetIncluder"
    }

    fn refine(&self, prompt: &Prompt, _completion: &str, _outcome: &TestOutcome) -> Vec<Prompt> {
        if !prompt.options.include_snippets && !prompt.snippets.is_empty() {
            vec![prompt.with_options(PromptOptions {
                include_snippets: true,
                ..prompt.options
            })]
        } else {
            Vec::new()
        }
    }
}

pub struct RetryWithError;

impl Refiner for RetryWithError {
    fn name(&self) -> &'static str {
        "RetryWithError"
    }

    fn refine(&self, prompt: &Prompt, completion: &str, outcome: &TestOutcome) -> Vec<Prompt> {
        if prompt.is_retry() {
            return Vec::new();
        }
        let TestOutcome::Failed { message, .. } = outcome else {
            return Vec::new();
        };
        prompt
            .as_retry(completion.to_string(), message.clone())
            .into_iter()
            .collect()
    }
}

pub struct DocCommentIncluder;

impl Refiner for DocCommentIncluder {
    fn name(&self) -> &'static str {
        "DocCommentIncluder"
    }

    fn refine(&self, prompt: &Prompt, _completion: &str, _outcome: &TestOutcome) -> Vec<Prompt> {
        if !prompt.options.include_doc_comment && prompt.function.has_doc_comment() {
            vec![prompt.with_options(PromptOptions {
                include_doc_comment: true,
                ..prompt.options
            })]
        } else {
            Vec::new()
        }
    }
}

pub struct FunctionBodyIncluder;

impl Refiner for FunctionBodyIncluder {
    fn name(&self) -> &'static str {
        "FunctionBodyIncluder"
    }

    fn refine(&self, prompt: &Prompt, _completion: &str, _outcome: &TestOutcome) -> Vec<Prompt> {
        if !prompt.options.include_function_body && prompt.function.has_body() {
            vec![prompt.with_options(PromptOptions {
                include_function_body: true,
                ..prompt.options
            })]
        } else {
            Vec::new()
        }
    }
}

/// The fixed refiner order the generation loop applies (spec.md §4.4):
/// snippets, then retry, then doc comment, then function body.
pub fn refiner_chain() -> Vec<Box<dyn Refiner>> {
    vec![
        Box::new(SnippetIncluder),
        Box::new(RetryWithError),
        Box::new(DocCommentIncluder),
        Box::new(FunctionBodyIncluder),
    ]
}
