//! Code-execution fallback for providers that can't emit native tool
//! calls: pull fenced code blocks out of the model's text response and
//! hand them to a [`Sandbox`].
//!
//! The only implementation shipped here is [`NullSandbox`], a test
//! double that never actually executes anything — it echoes the
//! source back, truncated to a configured budget. A real sandbox
//! (subprocess, WASM, remote execution service) is a concrete
//! collaborator the host application provides.

use async_trait::async_trait;
use regex::Regex;

/// Executes a single extracted code block and reports what happened.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Run `code` (of the given `language`, best-effort hint — may be
    /// empty if the fence had no language tag) and return its output.
    async fn execute(&self, code: &str, language: &str) -> SandboxResult;
}

/// Result of one sandbox invocation.
#[derive(Debug, Clone)]
pub struct SandboxResult {
    /// Captured output (stdout, a return value, or an echo).
    pub output: String,
    /// Whether the sandbox considers this a successful run.
    pub success: bool,
}

/// A sandbox that runs nothing. Truncates the source to
/// `budget_chars` and reports it back as a successful "execution" —
/// useful for exercising the code-execution fallback path in tests
/// without shelling out or spinning up an interpreter.
#[derive(Debug, Clone)]
pub struct NullSandbox {
    /// Maximum number of characters of source echoed back.
    pub budget_chars: usize,
}

impl NullSandbox {
    /// Create a null sandbox with the given echo budget.
    pub fn new(budget_chars: usize) -> Self {
        Self { budget_chars }
    }
}

impl Default for NullSandbox {
    fn default() -> Self {
        Self::new(1500)
    }
}

#[async_trait]
impl Sandbox for NullSandbox {
    async fn execute(&self, code: &str, _language: &str) -> SandboxResult {
        let truncated: String = code.chars().take(self.budget_chars).collect();
        SandboxResult { output: truncated, success: true }
    }
}

/// Identifiers the adapter knows are async and rewrites bare calls to
/// as `await <call>` when they aren't already awaited. Kept small and
/// explicit rather than inferred — the sandbox's host-injected tool
/// functions are exactly this set plus whatever the caller adds.
const KNOWN_ASYNC_CALLS: &[&str] = &["fetch", "tool", "sleep", "delay"];

/// Rewrites a fenced code block pulled out of a non-native-tool-calling
/// model's response into something the worker-based sandbox can run
/// directly, per spec.md §4.5's dynamic-language adapter list: literal
/// booleans/null, f-string-to-template-literal conversion, and
/// auto-`await` insertion for known async identifiers. Every pass is
/// string-literal-aware — it walks the source tracking whether it's
/// inside a `'`/`"`/backtick-quoted span (respecting `\`-escapes) and
/// only rewrites text outside one, except f-strings, whose body is a
/// string literal that the adapter deliberately reaches into.
#[derive(Debug, Clone)]
pub struct DynamicLanguageAdapter {
    ident_boundary: Regex,
}

impl DynamicLanguageAdapter {
    /// Compile the adapter's identifier-boundary pattern once.
    pub fn new() -> Self {
        Self {
            ident_boundary: Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("static pattern"),
        }
    }

    /// Apply every transform pass in order: literals, f-strings, then
    /// auto-await (which needs the f-string pass done first so a
    /// template-literal's `${...}` interpolation is already plain code).
    pub fn transform(&self, code: &str) -> String {
        let code = self.rewrite_literals(code);
        let code = self.rewrite_fstrings(&code);
        self.insert_auto_await(&code)
    }

    /// `True`/`False`/`None` → `true`/`false`/`null`, skipping matches
    /// inside string literals.
    fn rewrite_literals(&self, code: &str) -> String {
        let mut out = String::with_capacity(code.len());
        for_each_span(code, |segment, in_string| {
            if in_string {
                out.push_str(segment);
                return;
            }
            let segment = rewrite_literal_word(segment, "True", "true");
            let segment = rewrite_literal_word(&segment, "False", "false");
            let segment = rewrite_literal_word(&segment, "None", "null");
            out.push_str(&segment);
        });
        out
    }

    /// `f"...{expr}..."`/`f'...{expr}...'` → `` `...${expr}...` ``.
    /// Leaves ordinary (non-`f`-prefixed) string literals untouched.
    fn rewrite_fstrings(&self, code: &str) -> String {
        let mut out = String::with_capacity(code.len());
        let bytes: Vec<char> = code.chars().collect();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            let is_fstring_start = c == 'f'
                && i + 1 < bytes.len()
                && (bytes[i + 1] == '"' || bytes[i + 1] == '\'')
                && (i == 0 || !bytes[i - 1].is_alphanumeric() && bytes[i - 1] != '_');
            if is_fstring_start {
                let quote = bytes[i + 1];
                let mut j = i + 2;
                let mut body = String::new();
                let mut closed = false;
                while j < bytes.len() {
                    if bytes[j] == '\\' && j + 1 < bytes.len() {
                        body.push(bytes[j]);
                        body.push(bytes[j + 1]);
                        j += 2;
                        continue;
                    }
                    if bytes[j] == quote {
                        closed = true;
                        j += 1;
                        break;
                    }
                    body.push(bytes[j]);
                    j += 1;
                }
                if closed {
                    out.push('`');
                    out.push_str(&body.replace('`', "\\`"));
                    out.push('`');
                    i = j;
                    continue;
                }
            }
            out.push(c);
            i += 1;
        }
        out
    }

    /// Prefix a call to a [`KNOWN_ASYNC_CALLS`] identifier with `await `
    /// unless it's already awaited, skipping matches inside strings.
    fn insert_auto_await(&self, code: &str) -> String {
        let mut out = String::with_capacity(code.len());
        for_each_span(code, |segment, in_string| {
            if in_string {
                out.push_str(segment);
                return;
            }
            let mut last_end = 0;
            for m in self.ident_boundary.find_iter(segment) {
                out.push_str(&segment[last_end..m.start()]);
                let word = m.as_str();
                let followed_by_call = segment[m.end()..].trim_start().starts_with('(');
                let already_awaited = segment[..m.start()].trim_end().ends_with("await");
                if KNOWN_ASYNC_CALLS.contains(&word) && followed_by_call && !already_awaited {
                    out.push_str("await ");
                }
                out.push_str(word);
                last_end = m.end();
            }
            out.push_str(&segment[last_end..]);
        });
        out
    }
}

impl Default for DynamicLanguageAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk `code`, invoking `f(segment, in_string)` once per maximal run of
/// characters that's either entirely outside or entirely inside a
/// `'`/`"`/backtick-quoted string literal (backslash-escapes respected,
/// unterminated strings run to the end of input).
fn for_each_span(code: &str, mut f: impl FnMut(&str, bool)) {
    let chars: Vec<char> = code.chars().collect();
    let mut i = 0;
    let mut start = 0;
    let mut in_string = false;
    let mut quote = '"';
    while i < chars.len() {
        if in_string {
            if chars[i] == '\\' && i + 1 < chars.len() {
                i += 2;
                continue;
            }
            if chars[i] == quote {
                i += 1;
                f(&chars[start..i].iter().collect::<String>(), true);
                start = i;
                in_string = false;
                continue;
            }
            i += 1;
        } else if chars[i] == '"' || chars[i] == '\'' || chars[i] == '`' {
            if i > start {
                f(&chars[start..i].iter().collect::<String>(), false);
            }
            start = i;
            quote = chars[i];
            in_string = true;
            i += 1;
        } else {
            i += 1;
        }
    }
    if start < chars.len() {
        f(&chars[start..].iter().collect::<String>(), in_string);
    }
}

fn rewrite_literal_word(code: &str, from: &str, to: &str) -> String {
    let pattern = Regex::new(&format!(r"\b{from}\b")).expect("static pattern");
    pattern.replace_all(code, to).into_owned()
}

/// Pulls fenced code blocks (```lang\n...\n```) out of model text.
pub struct CodeBlockExtractor {
    pattern: Regex,
}

impl CodeBlockExtractor {
    /// Compile the extractor's pattern once.
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?s)```([A-Za-z0-9_+-]*)\n(.*?)```").expect("static pattern"),
        }
    }

    /// Extract `(language, code)` pairs in document order. `language`
    /// is empty when the fence had no tag.
    pub fn extract(&self, text: &str) -> Vec<(String, String)> {
        self.pattern
            .captures_iter(text)
            .map(|c| {
                let language = c.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
                let code = c.get(2).map(|m| m.as_str()).unwrap_or("").trim_end().to_string();
                (language, code)
            })
            .collect()
    }
}

impl Default for CodeBlockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_sandbox_truncates_and_succeeds() {
        let sandbox = NullSandbox::new(5);
        let result = sandbox.execute("print('hello world')", "python").await;
        assert_eq!(result.output, "print");
        assert!(result.success);
    }

    #[test]
    fn extractor_finds_tagged_and_untagged_blocks() {
        let text = "before\n```python\nprint(1)\n```\nmiddle\n```\nraw()\n```\nafter";
        let blocks = CodeBlockExtractor::new().extract(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, "python");
        assert_eq!(blocks[0].1, "print(1)");
        assert_eq!(blocks[1].0, "");
        assert_eq!(blocks[1].1, "raw()");
    }

    #[test]
    fn extractor_returns_empty_for_no_blocks() {
        assert!(CodeBlockExtractor::new().extract("just text").is_empty());
    }

    #[test]
    fn adapter_rewrites_literals_outside_strings() {
        let adapter = DynamicLanguageAdapter::new();
        assert_eq!(adapter.transform("x = True"), "x = true");
        assert_eq!(adapter.transform("y = False"), "y = false");
        assert_eq!(adapter.transform("z = None"), "z = null");
    }

    #[test]
    fn adapter_leaves_literals_inside_strings_alone() {
        let adapter = DynamicLanguageAdapter::new();
        assert_eq!(adapter.transform(r#"msg = "True or False, None of it matters""#), r#"msg = "True or False, None of it matters""#);
    }

    #[test]
    fn adapter_converts_fstring_to_template_literal() {
        let adapter = DynamicLanguageAdapter::new();
        assert_eq!(adapter.transform(r#"greeting = f"hi {name}!""#), "greeting = `hi ${name}!`");
    }

    #[test]
    fn adapter_leaves_plain_strings_alone() {
        let adapter = DynamicLanguageAdapter::new();
        assert_eq!(adapter.transform(r#"x = "hi {name}""#), r#"x = "hi {name}""#);
    }

    #[test]
    fn adapter_inserts_await_for_known_async_calls() {
        let adapter = DynamicLanguageAdapter::new();
        assert_eq!(adapter.transform("result = fetch(url)"), "result = await fetch(url)");
    }

    #[test]
    fn adapter_does_not_double_await() {
        let adapter = DynamicLanguageAdapter::new();
        assert_eq!(adapter.transform("result = await fetch(url)"), "result = await fetch(url)");
    }

    #[test]
    fn adapter_ignores_async_identifiers_inside_strings() {
        let adapter = DynamicLanguageAdapter::new();
        assert_eq!(adapter.transform(r#"log = "call fetch(url) to retrieve""#), r#"log = "call fetch(url) to retrieve""#);
    }

    #[test]
    fn adapter_does_not_await_bare_identifier_without_call() {
        let adapter = DynamicLanguageAdapter::new();
        assert_eq!(adapter.transform("handler = fetch"), "handler = fetch");
    }

    #[test]
    fn adapter_combines_all_passes() {
        let adapter = DynamicLanguageAdapter::new();
        let input = r#"enabled = True
name = None
msg = f"status is {enabled}"
data = fetch(url)"#;
        let output = adapter.transform(input);
        assert!(output.contains("enabled = true"));
        assert!(output.contains("name = null"));
        assert!(output.contains("msg = `status is ${enabled}`"));
        assert!(output.contains("data = await fetch(url)"));
    }
}
