//! Parsed representation of one exported function under test.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SignatureError;

/// `[class ]<accessPath>(<params>)[ async]` where `accessPath` is
/// `ident(.ident)*` and the first `ident` may contain hyphens.
static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<class>class\s+)?
        (?P<path>[A-Za-z0-9_$-]+(?:\.[A-Za-z0-9_$]+)*)
        \((?P<params>[^)]*)\)
        (?P<async>\s+async)?$
        ",
    )
    .expect("static signature regex is valid")
});

/// An immutable, read-only-inside-the-engine record describing one exported
/// function, produced externally by API exploration (spec.md §1, §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionUnderTest {
    /// The package the function belongs to.
    pub package_name: String,
    /// Dotted identifier chain rooted at the package name.
    pub access_path: String,
    /// The last access-path segment.
    pub name: String,
    /// Parenthesized parameter-list string, e.g. `"(a, b)"`.
    pub signature: String,
    /// Whether the signature was annotated `async`.
    pub is_async: bool,
    /// Whether the signature was annotated `class` (a constructor).
    pub is_constructor: bool,
    /// Optional doc comment attached to the function.
    pub doc_comment: Option<String>,
    /// Optional source body, when available.
    pub body: Option<String>,
    /// Module-path hint carried for report metadata only; plays no role in
    /// prompt assembly or dedup.
    pub module_path: Option<String>,
}

impl FunctionUnderTest {
    /// Parse a raw signature string into a [`FunctionUnderTest`].
    ///
    /// `package_name` is used only to validate that `access_path` is rooted
    /// at it; the parser does not require the caller to repeat the package
    /// name in `raw_signature` beyond what the access path already encodes.
    pub fn parse(
        package_name: impl Into<String>,
        raw_signature: &str,
        doc_comment: Option<String>,
        body: Option<String>,
    ) -> Result<Self, SignatureError> {
        let package_name = package_name.into();
        let caps = SIGNATURE_RE
            .captures(raw_signature.trim())
            .ok_or_else(|| SignatureError::InvalidSignature(raw_signature.to_string()))?;

        let access_path = caps["path"].to_string();
        let params = caps.name("params").map(|m| m.as_str()).unwrap_or("");
        let is_async = caps.name("async").is_some();
        let is_constructor = caps.name("class").is_some();
        let name = access_path
            .rsplit('.')
            .next()
            .unwrap_or(access_path.as_str())
            .to_string();

        Ok(Self {
            package_name,
            access_path,
            name,
            signature: format!("({})", params),
            is_async,
            is_constructor,
            doc_comment,
            body,
            module_path: None,
        })
    }

    /// Attach a module-path hint, for report metadata only.
    pub fn with_module_path(mut self, module_path: impl Into<String>) -> Self {
        self.module_path = Some(module_path.into());
        self
    }

    /// Whether this function has a non-empty source body.
    pub fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.trim().is_empty())
    }

    /// Whether this function has a non-empty doc comment.
    pub fn has_doc_comment(&self) -> bool {
        self.doc_comment
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// Replace every character not in `[A-Za-z0-9_$]` with `_`, producing a valid
/// binding identifier for the prompt's imports header.
pub fn sanitize(package_name: &str) -> String {
    package_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Collapse runs of whitespace into one space and remove whitespace adjacent
/// to non-word boundaries (punctuation). Used only to compare two function
/// body strings for equality inside the engine.
pub fn normalize(source: &str) -> String {
    static WHITESPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    static PUNCT_SPACING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s*([^\w\s])\s*").expect("valid regex"));

    let collapsed = WHITESPACE_RE.replace_all(source.trim(), " ");
    let squeezed = PUNCT_SPACING_RE.replace_all(&collapsed, "$1");
    squeezed.trim().to_string()
}
