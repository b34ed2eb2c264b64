//! Heuristic lookup of declarations and functions in minified player code
//!
//! The player bundle is never parsed. Declarations are found with bounded
//! windows around a marker string, functions with regexes that tolerate two
//! levels of nested braces, and, when those give up, with a brace-depth scan
//! outward from the marker. The scan is the only path that balances braces
//! exactly; the regexes are fast paths.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Identifier pattern used by every player regex
pub const IDENT: &str = r"[a-zA-Z_$][a-zA-Z0-9_$]*";

/// Up to two levels of `{...}` nesting without a `{` or `}` at the outer level
const NESTED_BODY: &str = r"[^{}]*(?:\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}[^{}]*)*";

static DECLARATION_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"var\s+({IDENT})\s*=\s*[\["']"#)).expect("declaration head regex")
});

static FUNCTION_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(function\s*(?:{IDENT})?)\s*\([^)]*\)\s*$")).expect("function head regex")
});

static FUNCTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^function\s*({IDENT})?")).expect("function name regex")
});

/// A fragment of player source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Declared identifier, `None` for an anonymous function
    pub name: Option<String>,
    /// Source text of the declaration or function
    pub code: String,
}

impl Snippet {
    pub fn new(name: Option<String>, code: String) -> Self {
        Self { name, code }
    }
}

/// Search bounds for the locator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorConfig {
    /// Max characters between a declaration's literal and the marker, on
    /// either side of the marker
    pub declaration_window: usize,
    /// How far before an enclosing `{` the brace scan looks for `function`
    pub function_lookback: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            declaration_window: 5000,
            function_lookback: 100,
        }
    }
}

/// Finds source fragments by the strings they contain
pub trait SnippetLocator: Send + Sync {
    /// Find `var <name> = <literal containing marker>;`
    fn find_declaration_by_content(&self, text: &str, markers: &[&str]) -> Option<Snippet>;

    /// Find the function whose body contains a marker
    fn find_function_by_content(&self, text: &str, markers: &[&str]) -> Option<Snippet>;
}

/// Regex and brace-scan based locator
#[derive(Debug, Clone, Default)]
pub struct PatternLocator {
    config: LocatorConfig,
}

impl PatternLocator {
    /// Create a new locator with default bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new locator with custom bounds
    pub fn with_config(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Named function: `function name(...) { ...marker... }`
    fn find_named_function(&self, text: &str, marker: &str) -> Option<Snippet> {
        let pattern = format!(
            r"(function\s+({IDENT})\s*\([^)]*\)\s*\{{{NESTED_BODY}{}{NESTED_BODY}\}})",
            regex::escape(marker)
        );
        capture_function(text, &pattern)
    }

    /// Function expression: `var name = function(...) { ...marker... }`
    fn find_assigned_function(&self, text: &str, marker: &str) -> Option<Snippet> {
        let pattern = format!(
            r"(var\s+({IDENT})\s*=\s*function\s*\([^)]*\)\s*\{{{NESTED_BODY}{}{NESTED_BODY}\}})",
            regex::escape(marker)
        );
        capture_function(text, &pattern)
    }
}

impl SnippetLocator for PatternLocator {
    fn find_declaration_by_content(&self, text: &str, markers: &[&str]) -> Option<Snippet> {
        markers.iter().find_map(|marker| {
            let found = find_declaration(text, marker, self.config.declaration_window);
            if let Some(snippet) = &found {
                debug!(
                    "Declaration {:?} located by marker {:?}",
                    snippet.name, marker
                );
            }
            found
        })
    }

    fn find_function_by_content(&self, text: &str, markers: &[&str]) -> Option<Snippet> {
        for marker in markers.iter().filter(|m| !m.is_empty()) {
            if !text.contains(marker) {
                continue;
            }

            if let Some(snippet) = self.find_named_function(text, marker) {
                debug!("Named function {:?} located by {:?}", snippet.name, marker);
                return Some(snippet);
            }

            if let Some(snippet) = self.find_assigned_function(text, marker) {
                debug!("Assigned function {:?} located by {:?}", snippet.name, marker);
                return Some(snippet);
            }

            if let Some(snippet) =
                find_enclosing_function(text, marker, self.config.function_lookback)
            {
                debug!(
                    "Enclosing function {:?} located by brace scan for {:?}",
                    snippet.name, marker
                );
                return Some(snippet);
            }
        }

        None
    }
}

fn capture_function(text: &str, pattern: &str) -> Option<Snippet> {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => {
            debug!("Function pattern rejected: {}", e);
            return None;
        }
    };

    let captures = regex.captures(text)?;
    let code = captures.get(1)?.as_str().to_string();
    let name = captures.get(2).map(|m| m.as_str().to_string());
    Some(Snippet::new(name, code))
}

/// Find `var <name> = <bracketed or quoted literal>;` whose literal contains
/// `marker`, looking at most `window` characters either side of the marker.
///
/// The literal may not contain `;` between its opening character and the end
/// of the declaration.
pub fn find_declaration(text: &str, marker: &str, window: usize) -> Option<Snippet> {
    if marker.is_empty() {
        return None;
    }

    for (idx, _) in text.match_indices(marker) {
        let start = floor_char_boundary(text, idx.saturating_sub(window));
        let region_start = text[start..idx]
            .rfind(';')
            .map(|p| start + p + 1)
            .unwrap_or(start);

        let head = match DECLARATION_HEAD.captures(&text[region_start..idx]) {
            Some(head) => head,
            None => continue,
        };
        let (Some(whole), Some(name)) = (head.get(0), head.get(1)) else {
            continue;
        };
        // opening bracket or quote
        let literal_start = region_start + whole.end() - 1;

        let tail_start = idx + marker.len();
        let tail_end = match text[tail_start..].find(';') {
            Some(p) if p <= window => tail_start + p,
            _ => continue,
        };

        let name = name.as_str().to_string();
        let code = format!("var {} = {};", name, &text[literal_start..tail_end]);
        return Some(Snippet::new(Some(name), code));
    }

    None
}

/// Locate the function enclosing the first occurrence of `marker`.
///
/// Scans backwards tracking brace depth to the first unmatched `{`, which must
/// be preceded by a `function(...)` head within `lookback` characters. A marker
/// sitting in a plain block or object literal yields `None`.
/// The end of the function is found by balancing braces forward from the head.
pub fn find_enclosing_function(text: &str, marker: &str, lookback: usize) -> Option<Snippet> {
    if marker.is_empty() {
        return None;
    }
    let idx = text.find(marker)?;
    let bytes = text.as_bytes();

    let mut depth: i64 = 0;
    let mut func_start = None;
    let mut i = idx;
    while i > 0 {
        match bytes[i] {
            b'}' => depth += 1,
            b'{' => {
                depth -= 1;
                if depth < 0 {
                    let before_start = floor_char_boundary(text, i.saturating_sub(lookback));
                    let before = &text[before_start..i];
                    func_start = FUNCTION_HEAD
                        .captures(before)
                        .and_then(|c| c.get(1))
                        .map(|m| before_start + m.start());
                    break;
                }
            }
            _ => {}
        }
        i -= 1;
    }

    let func_start = func_start?;
    let func_end = balanced_end(text, func_start)?;
    let code = &text[func_start..func_end];
    let name = FUNCTION_NAME
        .captures(code)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Some(Snippet::new(name, code.to_string()))
}

/// Byte offset just past the `}` that closes the first `{` at or after `from`
pub fn balanced_end(text: &str, from: usize) -> Option<usize> {
    let mut depth: i64 = 0;
    for (offset, byte) in text.as_bytes()[from..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
