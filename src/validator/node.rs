//! A validator that runs candidate tests with `node`/`npx mocha` in a
//! per-run temp directory, grounded on the teacher's sandboxed exec
//! pattern (`swe::test_generator::execute_shell`) adapted to a local
//! process instead of a container.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::TempDir;

use super::{CoverageSummary, TestValidator};
use crate::collector::TestOutcome;
use crate::error::ValidatorError;

pub struct NodeProcessValidator {
    workdir: TempDir,
    package_dir: PathBuf,
    timeout: Duration,
    command: Vec<String>,
    coverage: Mutex<CoverageSummary>,
}

impl NodeProcessValidator {
    /// Set up a scratch workspace that `require`s the package under test
    /// from `package_dir` and depends on mocha. `timeout` bounds each
    /// individual test run. `command` is the validator invocation template
    /// (program followed by its fixed arguments); the candidate test's path
    /// is appended as the final argument on each call.
    pub async fn new(package_dir: PathBuf, timeout: Duration, command: Vec<String>) -> Result<Self, ValidatorError> {
        let workdir = tempfile::tempdir().map_err(ValidatorError::Io)?;

        let package_json = serde_json::json!({
            "name": "genforge-validation-workspace",
            "private": true,
            "dependencies": { "mocha": "*" },
        });
        tokio::fs::write(
            workdir.path().join("package.json"),
            serde_json::to_vec_pretty(&package_json).map_err(|e| {
                ValidatorError::WorkspaceSetup(format!("failed to serialize package.json: {e}"))
            })?,
        )
        .await
        .map_err(ValidatorError::Io)?;

        let link_status = tokio::process::Command::new("npm")
            .args(["link", &package_dir.display().to_string()])
            .current_dir(workdir.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| ValidatorError::SpawnFailed(e.to_string()))?;
        if !link_status.success() {
            return Err(ValidatorError::WorkspaceSetup(
                "npm link of target package failed".to_string(),
            ));
        }

        Ok(Self {
            workdir,
            package_dir,
            timeout,
            command,
            coverage: Mutex::new(CoverageSummary::default()),
        })
    }

    fn test_path(&self, name: &str) -> PathBuf {
        self.workdir.path().join(name)
    }

    async fn run_mocha(&self, path: &std::path::Path) -> Result<MochaRun, ValidatorError> {
        let (program, fixed_args) = self
            .command
            .split_first()
            .ok_or_else(|| ValidatorError::SpawnFailed("validator command is empty".to_string()))?;

        let run = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(program)
                .args(fixed_args)
                .arg(path.display().to_string())
                .current_dir(self.workdir.path())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| ValidatorError::Timeout { millis: self.timeout.as_millis() as u64 })?
        .map_err(|e| ValidatorError::SpawnFailed(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&run.stdout).to_string();
        let stderr = String::from_utf8_lossy(&run.stderr).to_string();
        Ok(MochaRun { stdout, stderr })
    }

    /// Each `validate` call runs exactly one candidate test in isolation, so
    /// the coverage this reads back is that single test's own coverage, not
    /// a cumulative project figure.
    async fn read_coverage(&self) -> Option<(CoverageSummary, Option<f64>)> {
        let path = self.workdir.path().join("coverage").join("coverage-summary.json");
        let bytes = tokio::fs::read(&path).await.ok()?;
        let parsed: NycSummary = serde_json::from_slice(&bytes).ok()?;
        let summary = CoverageSummary {
            lines_pct: parsed.total.lines.map(|m| m.pct),
            functions_pct: parsed.total.functions.map(|m| m.pct),
            branches_pct: parsed.total.branches.map(|m| m.pct),
            statements_pct: parsed.total.statements.as_ref().map(|m| m.pct),
        };
        let statements_covered = parsed.total.statements.map(|m| m.covered as f64);
        Some((summary, statements_covered))
    }
}

struct MochaRun {
    stdout: String,
    stderr: String,
}

#[derive(Debug, Deserialize)]
struct MochaJsonReport {
    #[serde(default)]
    failures: Vec<MochaTestResult>,
    #[serde(default)]
    passes: Vec<MochaTestResult>,
    #[serde(default)]
    pending: Vec<MochaTestResult>,
}

#[derive(Debug, Deserialize)]
struct MochaTestResult {
    #[serde(default)]
    err: Option<MochaErr>,
}

#[derive(Debug, Deserialize, Default)]
struct MochaErr {
    #[serde(default)]
    message: String,
    #[serde(default)]
    stack: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NycSummary {
    total: NycTotals,
}

#[derive(Debug, Deserialize, Default)]
struct NycTotals {
    #[serde(default)]
    lines: Option<NycMetric>,
    #[serde(default)]
    functions: Option<NycMetric>,
    #[serde(default)]
    branches: Option<NycMetric>,
    #[serde(default)]
    statements: Option<NycMetric>,
}

#[derive(Debug, Deserialize)]
struct NycMetric {
    pct: f64,
    #[serde(default)]
    covered: u64,
}

fn classify(run: &MochaRun) -> TestOutcome {
    match serde_json::from_str::<MochaJsonReport>(&run.stdout) {
        Ok(report) => {
            if let Some(failure) = report.failures.first() {
                let err = failure.err.as_ref();
                return TestOutcome::Failed {
                    message: err.map(|e| e.message.clone()).unwrap_or_default(),
                    code: None,
                    stack: err.and_then(|e| e.stack.clone()),
                };
            }
            if !report.passes.is_empty() {
                return TestOutcome::Passed { coverage_report: None, coverage_data: None };
            }
            if !report.pending.is_empty() {
                return TestOutcome::Pending;
            }
            TestOutcome::Other
        }
        Err(_) => {
            if run.stderr.trim().is_empty() {
                TestOutcome::Other
            } else {
                TestOutcome::Failed {
                    message: run.stderr.trim().to_string(),
                    code: None,
                    stack: None,
                }
            }
        }
    }
}

#[async_trait]
impl TestValidator for NodeProcessValidator {
    async fn validate(&self, name: &str, source: &str) -> TestOutcome {
        let path = self.test_path(name);
        if let Err(e) = tokio::fs::write(&path, source).await {
            return TestOutcome::Failed {
                message: format!("failed to write test source: {e}"),
                code: None,
                stack: None,
            };
        }

        let run = match self.run_mocha(&path).await {
            Ok(run) => run,
            Err(ValidatorError::Timeout { millis }) => {
                return TestOutcome::Failed {
                    message: format!("validator timed out after {millis}ms"),
                    code: None,
                    stack: None,
                };
            }
            Err(e) => {
                return TestOutcome::Failed { message: e.to_string(), code: None, stack: None };
            }
        };

        let outcome = classify(&run);
        if !outcome.is_passed() {
            return outcome;
        }
        match self.read_coverage().await {
            Some((summary, statements_covered)) => {
                *self.coverage.lock().expect("coverage mutex poisoned") = summary;
                TestOutcome::Passed {
                    coverage_report: Some("coverage/coverage-summary.json".to_string()),
                    coverage_data: statements_covered.map(|c| serde_json::json!(c)),
                }
            }
            None => outcome,
        }
    }

    fn coverage_summary(&self) -> CoverageSummary {
        self.coverage.lock().expect("coverage mutex poisoned").clone()
    }

    async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(self.workdir.path()).await;
        let _ = &self.package_dir;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_reads_failure_message_from_json_report() {
        let run = MochaRun {
            stdout: r#"{"failures":[{"err":{"message":"expected true"}}],"passes":[],"pending":[]}"#.to_string(),
            stderr: String::new(),
        };
        match classify(&run) {
            TestOutcome::Failed { message, .. } => assert_eq!(message, "expected true"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn classify_passed_when_passes_non_empty_and_no_failures() {
        let run = MochaRun {
            stdout: r#"{"failures":[],"passes":[{}],"pending":[]}"#.to_string(),
            stderr: String::new(),
        };
        assert!(classify(&run).is_passed());
    }

    #[test]
    fn classify_pending_when_only_pending_tests() {
        let run = MochaRun {
            stdout: r#"{"failures":[],"passes":[],"pending":[{}]}"#.to_string(),
            stderr: String::new(),
        };
        assert!(matches!(classify(&run), TestOutcome::Pending));
    }

    #[test]
    fn classify_falls_back_to_stderr_on_unparsable_report() {
        let run = MochaRun { stdout: "not json".to_string(), stderr: "segfault".to_string() };
        match classify(&run) {
            TestOutcome::Failed { message, .. } => assert_eq!(message, "segfault"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn classify_other_when_report_empty_and_stderr_empty() {
        let run = MochaRun {
            stdout: r#"{"failures":[],"passes":[],"pending":[]}"#.to_string(),
            stderr: String::new(),
        };
        assert!(matches!(classify(&run), TestOutcome::Other));
    }

    // Real process integration: requires a local `node`/`npm`/`npx` on PATH
    // and a throwaway npm package to link against.
    #[ignore]
    #[tokio::test]
    async fn validates_a_real_passing_test() {
        let pkg_dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            pkg_dir.path().join("package.json"),
            r#"{"name":"fixture-pkg","version":"1.0.0","main":"index.js"}"#,
        )
        .await
        .unwrap();
        tokio::fs::write(
            pkg_dir.path().join("index.js"),
            "module.exports.identity = x => x;",
        )
        .await
        .unwrap();

        let command = vec![
            "npx".to_string(),
            "mocha".to_string(),
            "--reporter".to_string(),
            "json".to_string(),
        ];
        let validator = NodeProcessValidator::new(pkg_dir.path().to_path_buf(), Duration::from_secs(30), command)
            .await
            .unwrap();
        let outcome = validator
            .validate(
                "test_0.js",
                "const assert = require('assert');\nconst fixturePkg = require('fixture-pkg');\ndescribe('t', function() {\n    it('c', function() {\n        assert.strictEqual(fixturePkg.identity(1), 1);\n    });\n});\n",
            )
            .await;
        assert!(outcome.is_passed());
        validator.cleanup().await;
    }
}
