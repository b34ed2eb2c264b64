//! Shared obfuscation table lookup

use super::locator::{Snippet, SnippetLocator};

/// Strings known to live inside the player's shared string/array table,
/// in search priority order
pub const GLOBAL_TABLE_MARKERS: &[&str] = &[
    "-_w8_",
    "Untrusted URL{",
    "1969",
    "1970",
    "playerfallback",
];

/// Find the declaration of the table the obfuscated helpers index into
pub fn extract_global_table(text: &str, locator: &dyn SnippetLocator) -> Option<Snippet> {
    locator.find_declaration_by_content(text, GLOBAL_TABLE_MARKERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::locator::PatternLocator;

    #[test]
    fn test_extract_global_table() {
        let text = r#"var x=1;var Yw="abc,playerfallback,1970,-_w8_".split(",");function f(){}"#;
        let table = extract_global_table(text, &PatternLocator::new()).unwrap();
        assert_eq!(table.name.as_deref(), Some("Yw"));
        assert_eq!(
            table.code,
            r#"var Yw = "abc,playerfallback,1970,-_w8_".split(",");"#
        );
    }

    #[test]
    fn test_global_table_absent() {
        let text = "var x=1;function f(){return 2}";
        assert!(extract_global_table(text, &PatternLocator::new()).is_none());
    }
}
