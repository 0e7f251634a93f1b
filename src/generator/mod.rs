//! The generation loop: drives the worklist, per temperature, for one
//! function under test (spec.md §4.6).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::collector::{TestCollector, TestOutcome};
use crate::llm::CompletionProvider;
use crate::model::FunctionUnderTest;
use crate::prompt::{Prompt, Provenance};
use crate::refiner::refiner_chain;
use crate::snippets::SnippetMap;
use crate::validator::TestValidator;

/// Drive generation for one function across every configured temperature,
/// stopping early at the first temperature that yields a passing test.
/// Returns cleanly (discarding the pending worklist, keeping everything
/// already recorded) if `deadline` passes before the worklist is drained.
pub async fn generate_and_validate(
    function: Arc<FunctionUnderTest>,
    temperatures: &[f64],
    snippet_map: &dyn SnippetMap,
    provider: &dyn CompletionProvider,
    validator: &dyn TestValidator,
    collector: &mut TestCollector,
    deadline: Instant,
) {
    let refiners = refiner_chain();
    let snippets = snippet_map.snippets_for(&function.name).unwrap_or_default();

    for &temperature in temperatures {
        let mut generated_passing = false;
        let mut seen: HashSet<String> = HashSet::new();
        let mut worklist: Vec<Prompt> = vec![Prompt::initial(Arc::clone(&function), snippets.clone())];

        while let Some(mut p) = worklist.pop() {
            if Instant::now() >= deadline {
                return;
            }

            let key = p.assemble();
            if seen.contains(&key) {
                // Two successors that assemble to the same text: the
                // surviving prompt-info was already recorded under `key`,
                // so this duplicate only contributes its provenance record
                // (spec.md §8, S4).
                collector.append_prompt_provenance(&key, &mut p.provenance);
                continue;
            }
            seen.insert(key.clone());

            let completions = match provider.completions(&key, temperature).await {
                Ok(c) => c,
                Err(_) => Default::default(),
            };

            collector.record_prompt_info(&key, p.clone(), temperature);

            for completion in &completions {
                collector.record_completion(&key, completion.clone());

                let info_id;
                let outcome;
                {
                    let info = validate_completion(&p, completion, temperature, validator, collector).await;
                    info_id = info.0;
                    outcome = info.1;
                }
                if outcome.is_passed() {
                    generated_passing = true;
                }

                for refiner in &refiners {
                    for mut successor in refiner.refine(&p, completion, &outcome) {
                        successor.push_provenance(Provenance {
                            original_prompt_key: key.clone(),
                            test_id: info_id,
                            refiner: refiner.name(),
                        });
                        worklist.push(successor);
                    }
                }
            }
        }

        if generated_passing {
            break;
        }
    }
}

/// `validateCompletion(p, c, T)` (spec.md §4.6): assembles the candidate
/// test, short-circuits revalidation of an already-known source, and
/// otherwise classifies empty/unrepairable completions before delegating
/// to the validator. Returns the test id and the outcome recorded for it.
async fn validate_completion(
    p: &Prompt,
    completion: &str,
    temperature: f64,
    validator: &dyn TestValidator,
    collector: &mut TestCollector,
) -> (u64, TestOutcome) {
    let assembled = p.complete_test(completion, true);
    let key = assembled.clone().unwrap_or_else(|| completion.to_string());

    let recorded = collector.record_test_info(&key, p.clone(), p.function.access_path.clone());
    let test_id = recorded.info.id;
    let needs_validation = recorded.needs_validation;
    let test_name = recorded.info.name.clone();

    if !needs_validation {
        return (test_id, recorded.info.outcome.clone());
    }

    let outcome = if completion.is_empty() {
        TestOutcome::Failed { message: "Empty test".to_string(), code: None, stack: None }
    } else {
        match assembled {
            None => TestOutcome::Failed { message: "Invalid syntax".to_string(), code: None, stack: None },
            Some(src) => validator.validate(&test_name, &src).await,
        }
    };

    collector.record_test_result(test_id, temperature, outcome.clone());
    (test_id, outcome)
}
