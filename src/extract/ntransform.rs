//! N-parameter transform program builder

use super::guards::strip_short_circuits;
use super::locator::{Snippet, SnippetLocator};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Name the `n` value is bound to when the n-transform program runs
pub const N_ARGUMENT: &str = "ncode";
/// Entry point of an assembled n-transform program
pub const N_TRANSFORM_FUNC_NAME: &str = "SigtractNTransformFunc";

/// Content found inside the n transform, in search priority order
pub const N_TRANSFORM_MARKERS: &[&str] = &[
    // error tag suffix
    "-_w8_",
    "1969-12-31",
    "1970-01-01",
    "enhanced_except",
    ".push(String.fromCharCode(",
    ".reverse().forEach(function",
    "new Date(",
];

static ANONYMOUS_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^function\s*\(").expect("anonymous function regex"));

/// Build the standalone n-transform program, or `None` when no marker leads
/// to a function.
pub fn extract_n_transform_func(
    text: &str,
    global_table: Option<&Snippet>,
    locator: &dyn SnippetLocator,
) -> Option<String> {
    let function = match locator.find_function_by_content(text, N_TRANSFORM_MARKERS) {
        Some(function) => function,
        None => {
            debug!("N transform function not found");
            return None;
        }
    };

    let cleaned = strip_short_circuits(&function.code);
    let global_code = global_table.map(|t| t.code.as_str()).unwrap_or_default();

    let program = match function.name.as_deref() {
        Some(name) => format!(
            "{global_code}\n{cleaned}\nvar {N_TRANSFORM_FUNC_NAME}={name};\n{N_TRANSFORM_FUNC_NAME}({N_ARGUMENT});"
        ),
        None => {
            let renamed = ANONYMOUS_HEAD
                .replace(&cleaned, format!("function {N_TRANSFORM_FUNC_NAME}(").as_str())
                .into_owned();
            format!("{global_code}\n{renamed}\n{N_TRANSFORM_FUNC_NAME}({N_ARGUMENT});")
        }
    };

    debug!(
        "N transform program assembled from {:?} ({} chars)",
        function.name,
        program.len()
    );
    Some(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::locator::PatternLocator;

    #[test]
    fn test_named_function_is_aliased() {
        let text = r#"var a=0;function Pq(a){var b=a.split("");if(typeof foo==="undefined")return foo;b.reverse();return b.join("")+"1969-12-31".slice(0,0)}"#;
        let program = extract_n_transform_func(text, None, &PatternLocator::new()).unwrap();
        assert!(!program.contains("typeof foo"));
        assert!(program.contains(r#"var b=a.split("");b.reverse();"#));
        assert!(program.ends_with("var SigtractNTransformFunc=Pq;\nSigtractNTransformFunc(ncode);"));
    }

    #[test]
    fn test_anonymous_function_is_renamed() {
        let text = r#"g.N=function(a){if(a){if(a){if(a){a++}}}return a+"-_w8_"};"#;
        let table = Snippet::new(Some("T".to_string()), "var T = [1];".to_string());
        let program = extract_n_transform_func(text, Some(&table), &PatternLocator::new()).unwrap();
        assert_eq!(
            program,
            "var T = [1];\nfunction SigtractNTransformFunc(a){if(a){if(a){if(a){a++}}}return a+\"-_w8_\"}\nSigtractNTransformFunc(ncode);"
        );
    }

    #[test]
    fn test_assigned_function_is_aliased() {
        let text = r#"var Hk=function(a){return a+"enhanced_except"};"#;
        let program = extract_n_transform_func(text, None, &PatternLocator::new()).unwrap();
        assert_eq!(
            program,
            "\nvar Hk=function(a){return a+\"enhanced_except\"}\nvar SigtractNTransformFunc=Hk;\nSigtractNTransformFunc(ncode);"
        );
    }

    #[test]
    fn test_no_marker() {
        assert!(extract_n_transform_func("function a(b){return b}", None, &PatternLocator::new()).is_none());
    }
}
