//! Removal of environment-detection short-circuit guards
//!
//! The player returns its input unchanged from the n transform when it
//! thinks it runs outside a browser, with statements such as
//! `;if(typeof Xy==="undefined")return a;`. Each guard is replaced by a bare
//! `;` so execution falls through into the real transform.

use super::locator::IDENT;
use regex::Regex;
use std::sync::LazyLock;

static SHORT_CIRCUIT_GUARDS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // if (typeof X === "undefined") return Y;
        format!(
            r#"(?i);\s*if\s*\(\s*typeof\s+{IDENT}\s*===?\s*["']undefined["']\s*\)\s*return\s+{IDENT}\s*;?"#
        ),
        // if (typeof X === Y[N]) return Z;
        format!(
            r"(?i);\s*if\s*\(\s*typeof\s+{IDENT}\s*===?\s*{IDENT}\[\d+\]\s*\)\s*return\s+{IDENT}\s*;?"
        ),
        // if (typeof X === void 0) return Y;
        format!(
            r"(?i);\s*if\s*\(\s*typeof\s+{IDENT}\s*===?\s*void\s+0\s*\)\s*return\s+{IDENT}\s*;?"
        ),
        r"(?i);\s*if\s*\([^)]*enhanced_except[^)]*\)\s*return\s+[^;]+;".to_string(),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("short-circuit guard regex"))
    .collect()
});

/// Strip every short-circuit guard from `code`
pub fn strip_short_circuits(code: &str) -> String {
    SHORT_CIRCUIT_GUARDS
        .iter()
        .fold(code.to_string(), |acc, guard| {
            guard.replace_all(&acc, ";").into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_typeof_undefined() {
        let code = r#"function f(a){var b=a.split("");if(typeof foo==="undefined")return foo;b.reverse();return b.join("")}"#;
        assert_eq!(
            strip_short_circuits(code),
            r#"function f(a){var b=a.split("");b.reverse();return b.join("")}"#
        );
    }

    #[test]
    fn test_guard_needs_separator() {
        let code = r#"function f(a){if(typeof foo==="undefined")return foo;return a}"#;
        assert_eq!(strip_short_circuits(code), code);
    }

    #[test]
    fn test_strip_exact_guard() {
        let code = "var b=1;if(typeof foo===\"undefined\")return foo;b++";
        assert_eq!(strip_short_circuits(code), "var b=1;b++");
    }

    #[test]
    fn test_strip_guard_variants() {
        assert_eq!(
            strip_short_circuits("x=1; if ( typeof Q == 'undefined' ) return a ; y=2"),
            "x=1; y=2"
        );
        assert_eq!(
            strip_short_circuits("x=1;if(typeof Q===T7[12])return a;y=2"),
            "x=1;y=2"
        );
        assert_eq!(
            strip_short_circuits("x=1;if(typeof Q===void 0)return a;y=2"),
            "x=1;y=2"
        );
        assert_eq!(
            strip_short_circuits("x=1;IF(TYPEOF Q===\"UNDEFINED\")RETURN a;y=2"),
            "x=1;y=2"
        );
    }

    #[test]
    fn test_strip_exception_flag_guard() {
        assert_eq!(
            strip_short_circuits("x=1;if(c==\"enhanced_except_\"+d)return c+\"x\";y=2"),
            "x=1;y=2"
        );
    }

    #[test]
    fn test_leaves_other_typeof_checks() {
        let code = "x=1;if(typeof Q===\"function\")return a;y=2";
        assert_eq!(strip_short_circuits(code), code);
    }
}
