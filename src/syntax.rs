//! Pure syntactic helpers over candidate test source: bracket closing,
//! completion trimming, comment-out, and doc-comment reflow (spec.md §4.2).
//!
//! These are intentionally narrow: `close_brackets`'s "permissive
//! expression-statement parser" is a structural check (balanced delimiters
//! outside strings/comments, no dangling string literal, no trailing binary
//! operator), not a full ECMAScript grammar — see DESIGN.md.

/// Opaque marker standing in for the AST spec.md's `closeBrackets` returns
/// alongside the repaired source. The engine never inspects it; its only
/// role is signalling that the permissive parser accepted the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAst;

/// The result of a successful [`close_brackets`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSource {
    pub source: String,
    pub ast: ParsedAst,
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '{' => '}',
        '[' => ']',
        _ => unreachable!("closer_for called with non-opening char"),
    }
}

/// Scan `code` left to right, maintaining a stack of expected closers for
/// `( { [`. Characters inside a `// ...` line comment are ignored. Appends
/// any still-open closers (in stack order) and accepts the result only if
/// it passes the permissive structural check.
pub fn close_brackets(code: &str) -> Option<ClosedSource> {
    let mut stack: Vec<char> = Vec::new();
    let mut chars = code.chars().peekable();
    let mut in_line_comment = false;

    while let Some(c) = chars.next() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }
        match c {
            '/' if chars.peek() == Some(&'/') => {
                in_line_comment = true;
                chars.next();
            }
            '(' | '{' | '[' => stack.push(closer_for(c)),
            ')' | '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
            }
            _ => {}
        }
    }

    // A dangling binary operator makes the statement incomplete regardless
    // of bracket balance; check the original text before any suffixing.
    if ends_with_trailing_operator(code.trim_end()) {
        return None;
    }

    let mut suffixed = code.to_string();
    while let Some(closer) = stack.pop() {
        suffixed.push(closer);
    }

    if permissive_parse(&suffixed) {
        Some(ClosedSource {
            source: suffixed,
            ast: ParsedAst,
        })
    } else {
        None
    }
}

fn permissive_parse(source: &str) -> bool {
    let mut depth: i32 = 0;
    let mut chars = source.chars().peekable();
    let mut in_line_comment = false;
    let mut string_delim: Option<char> = None;

    while let Some(c) = chars.next() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }
        if let Some(delim) = string_delim {
            if c == '\\' {
                chars.next();
                continue;
            }
            if c == delim {
                string_delim = None;
            }
            continue;
        }
        match c {
            '/' if chars.peek() == Some(&'/') => {
                in_line_comment = true;
                chars.next();
            }
            '\'' | '"' | '`' => string_delim = Some(c),
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }

    depth == 0 && string_delim.is_none()
}

const TRAILING_OPERATORS: &[&str] = &[
    "===", "==", "&&", "||", "<=", ">=", "+", "-", "*", "/", "%", "=", "<", ">", "!", "?", ":", ",",
];

fn ends_with_trailing_operator(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    TRAILING_OPERATORS.iter().any(|op| s.ends_with(op))
}

fn line_is_complete(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.is_empty() || trimmed.ends_with(';') || trimmed.ends_with('}') || trimmed.ends_with(')')
}

/// Drop an incomplete trailing line, then truncate at the first position
/// where the running count of closers `} )` would drop below zero
/// (defensive against a model breaking out of the surrounding scope).
/// Idempotent: iterates both passes to a fixed point before returning.
pub fn trim_completion(code: &str) -> String {
    let mut current = code.to_string();
    loop {
        let after_lines = drop_incomplete_trailing_lines(&current);
        let after_closers = truncate_negative_closers(&after_lines);
        if after_closers == current {
            current = after_closers;
            break;
        }
        current = after_closers;
    }
    current.trim().to_string()
}

fn drop_incomplete_trailing_lines(code: &str) -> String {
    let mut lines: Vec<&str> = code.split('\n').collect();
    while lines.len() > 1 {
        let last = *lines.last().expect("non-empty");
        if line_is_complete(last) {
            break;
        }
        lines.pop();
    }
    lines.join("\n")
}

fn truncate_negative_closers(code: &str) -> String {
    let mut count: i32 = 0;
    for (idx, c) in code.char_indices() {
        match c {
            '{' | '(' => count += 1,
            '}' | ')' => {
                count -= 1;
                if count < 0 {
                    return code[..idx].to_string();
                }
            }
            _ => {}
        }
    }
    code.to_string()
}

/// Prefix every non-trailing-empty line with `// ` and ensure every line
/// ends with `\n`. Empty input returns empty output.
pub fn comment_out(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    let mut lines: Vec<&str> = code.split('\n').collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let mut out = String::with_capacity(code.len() + lines.len() * 3);
    for line in lines {
        out.push_str("// ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Split on newlines, strip a leading `*` per line, trim whitespace, drop
/// empty lines, then comment out the result.
pub fn trim_and_combine_doc_comment(raw: &str) -> String {
    let cleaned: Vec<String> = raw
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            trimmed.strip_prefix('*').unwrap_or(trimmed).trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect();
    comment_out(&cleaned.join("\n"))
}
