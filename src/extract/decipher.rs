//! Signature decipher program builder

use super::locator::{Snippet, IDENT};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Name the signature is bound to when the decipher program runs
pub const DECIPHER_ARGUMENT: &str = "sig";
/// Entry point of an assembled decipher program
pub const DECIPHER_FUNC_NAME: &str = "SigtractDecipherFunc";

/// `function(a){a=a.split("");...;return a.join("")}`, with the empty string
/// optionally replaced by a table lookup such as `T7[3]`.
///
/// Groups: 1 parameter, 2 body, 3 assignment target, 4 split receiver,
/// 5 statements between split and join.
static DECIPHER_IDIOM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"function\(({IDENT})\)\{{(({IDENT})=({IDENT})\.split\((?:""|{IDENT}\[\d+\])\)(.+?)\.join\((?:""|{IDENT}\[\d+\])\))\}}"#
    ))
    .expect("decipher idiom regex")
});

/// First `helper.method` or `helper["method"]` receiver in the decipher body
static HELPER_RECEIVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"({IDENT})(?:\.|\[")(?:{IDENT})(?:"\])?"#))
        .expect("helper receiver regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
struct DecipherIdiom<'a> {
    param: &'a str,
    body: &'a str,
    calls: &'a str,
}

/// The regex crate has no backreferences, so the "same parameter in all
/// three places" constraint is checked per candidate.
fn find_decipher_idiom(text: &str) -> Option<DecipherIdiom<'_>> {
    let mut pos = 0;
    while pos < text.len() {
        let captures = DECIPHER_IDIOM.captures_at(text, pos)?;
        let (whole, param, body, target, receiver, calls) = (
            captures.get(0)?,
            captures.get(1)?,
            captures.get(2)?,
            captures.get(3)?,
            captures.get(4)?,
            captures.get(5)?,
        );

        if target.as_str() == param.as_str() && receiver.as_str() == param.as_str() {
            return Some(DecipherIdiom {
                param: param.as_str(),
                body: body.as_str(),
                calls: calls.as_str(),
            });
        }

        // `function` starts with an ASCII byte
        pos = whole.start() + 1;
    }
    None
}

/// Body of `var <name> = { ... }`, tolerating one level of nested braces
fn find_helper_object<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!(
        r"var\s+{}\s*=\s*\{{([^{{}}]*(?:\{{[^{{}}]*\}}[^{{}}]*)*)\}}",
        regex::escape(name)
    );
    let regex = Regex::new(&pattern).ok()?;
    regex
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Build the standalone decipher program, or `None` when either the decipher
/// idiom or its helper object cannot be found.
pub fn extract_sig_decipher_func(text: &str, global_table: Option<&Snippet>) -> Option<String> {
    let idiom = match find_decipher_idiom(text) {
        Some(idiom) => idiom,
        None => {
            debug!("Decipher idiom not found");
            return None;
        }
    };

    let helper_name = match HELPER_RECEIVER.captures(idiom.calls).and_then(|c| c.get(1)) {
        Some(name) => name.as_str(),
        None => {
            debug!("No helper call in decipher body");
            return None;
        }
    };

    let helper_body = match find_helper_object(text, helper_name) {
        Some(body) => body,
        None => {
            debug!("Helper object {} not declared", helper_name);
            return None;
        }
    };

    debug!(
        "Decipher function uses parameter {} and helper {}",
        idiom.param, helper_name
    );

    let global_code = global_table.map(|t| t.code.as_str()).unwrap_or_default();
    Some(format!(
        "{global_code}\nvar {helper_name}={{{helper_body}}};\nfunction {DECIPHER_FUNC_NAME}({param}){{{body}}}\n{DECIPHER_FUNC_NAME}({DECIPHER_ARGUMENT});",
        param = idiom.param,
        body = idiom.body,
    ))
}
