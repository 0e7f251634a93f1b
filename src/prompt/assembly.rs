//! Prompt text assembly (spec.md §4.3).

use super::Prompt;
use crate::model::sanitize;
use crate::syntax::{close_brackets, comment_out, trim_and_combine_doc_comment};

/// Stable suite-header stub used when assembling a candidate test for
/// dedup, so differently-named API functions whose bodies coincide collapse
/// to the same test source.
pub const STABLE_SUITE_HEADER: &str = "describe('test suite', function() {\n";
/// Stable test-case-header stub, paired with [`STABLE_SUITE_HEADER`].
pub const STABLE_CASE_HEADER: &str = "    it('test case', function(done) {\n";

const BODY_INDENT: &str = "        ";

impl Prompt {
    /// The prompt's identity for deduplication: its assembled text.
    pub fn assemble(&self) -> String {
        match &self.retry {
            None => self.assemble_sections(false),
            Some(retry) => {
                let mut text = self.assemble_sections(true);
                text.push_str(&retry.failing_body);
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str("// the test above fails with the following error:\n");
                text.push_str(&format!("//   {}\n", retry.error_message));
                text.push_str("// fixed test:\n");
                text.push_str(&self.case_header(false));
                text
            }
        }
    }

    fn assemble_sections(&self, stub_headers: bool) -> String {
        let mut out = self.imports_header();

        if self.options.include_snippets && !self.snippets.is_empty() {
            out.push_str(&self.snippets_section());
        }

        if self.options.include_doc_comment {
            if let Some(doc) = self.function.doc_comment.as_deref() {
                if !doc.trim().is_empty() {
                    out.push_str(&trim_and_combine_doc_comment(doc));
                }
            }
        }

        out.push_str(&comment_out(&self.signature_line()));

        if self.options.include_function_body {
            if let Some(body) = self.function.body.as_deref() {
                if !body.trim().is_empty() {
                    out.push_str(&comment_out(body));
                }
            }
        }

        out.push_str(&self.suite_header(stub_headers));
        out.push_str(&self.case_header(stub_headers));
        out
    }

    fn imports_header(&self) -> String {
        let sanitized = sanitize(&self.function.package_name);
        format!(
            "const {{ describe, it }} = require('mocha');\nconst assert = require('assert');\nconst {sanitized} = require('{pkg}');\n",
            sanitized = sanitized,
            pkg = self.function.package_name,
        )
    }

    fn snippets_section(&self) -> String {
        let mut out = String::new();
        for (idx, snippet) in self.snippets.iter().enumerate() {
            out.push_str(&format!("// usage #{}\n", idx + 1));
            out.push_str(&comment_out(snippet));
        }
        out
    }

    fn signature_line(&self) -> String {
        let prefix = if self.function.is_constructor { "class " } else { "" };
        let suffix = if self.function.is_async { " async" } else { "" };
        format!(
            "{prefix}{path}{sig}{suffix}",
            prefix = prefix,
            path = self.function.access_path,
            sig = self.function.signature,
            suffix = suffix,
        )
    }

    fn suite_header(&self, stub: bool) -> String {
        if stub {
            STABLE_SUITE_HEADER.to_string()
        } else {
            format!(
                "describe('test {}', function() {{\n",
                sanitize(&self.function.package_name)
            )
        }
    }

    fn case_header(&self, stub: bool) -> String {
        if stub {
            STABLE_CASE_HEADER.to_string()
        } else {
            format!(
                "    it('test {}', function(done) {{\n",
                self.function.access_path
            )
        }
    }

    /// Build a candidate test from a completion body. Replaces the
    /// suite/case headers with stable stubs when `stub_headers` is true,
    /// appends the body at a fixed 8-space indent, closes any unbalanced
    /// brackets, and normalizes the trailing closers to a pretty two-line
    /// form. Returns `None` if the body cannot be repaired into valid
    /// structure (spec.md §4.3).
    pub fn complete_test(&self, body: &str, stub_headers: bool) -> Option<String> {
        let mut combined = self.assemble_sections(stub_headers);
        combined.push_str(BODY_INDENT);
        combined.push_str(body.trim_start());
        if !combined.ends_with('\n') {
            combined.push('\n');
        }
        let closed = close_brackets(&combined)?;
        Some(pretty_close_trailer(closed.source))
    }
}

fn pretty_close_trailer(src: String) -> String {
    match src.strip_suffix("})})") {
        Some(prefix) => format!("{prefix}    }})\n}})"),
        None => src,
    }
}
