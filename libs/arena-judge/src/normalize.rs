//! Output Normalizer
//!
//! Canonicalizes program output so that print-formatting differences
//! between language runtimes do not affect the verdict.
//!
//! **Rules, applied in order:**
//! 1. Trim the whole text
//! 2. Split into lines on `\n`
//! 3. Per line: trim, drop whitespace right after `[` and right before `]`,
//!    then drop whitespace around commas
//! 4. Drop empty lines
//! 5. Re-join with `\n`
//!
//! **Preserves:**
//! - Line order and token order
//! - Case
//! - Digits, brackets and every other non-whitespace character
//!
//! The comma and bracket rules target array-like output. Other shapes
//! (objects, several values per line) are compared on a best-effort basis.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref OPEN_BRACKET_SPACE: Regex = Regex::new(r"\[\s+").unwrap();
    static ref CLOSE_BRACKET_SPACE: Regex = Regex::new(r"\s+\]").unwrap();
    static ref COMMA_SPACE: Regex = Regex::new(r"\s*,\s*").unwrap();
}

/// Normalize a whole block of program output.
pub fn normalize_output(text: &str) -> String {
    text.trim()
        .split('\n')
        .map(normalize_line)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_line(line: &str) -> String {
    let line = line.trim();
    // bracket rule must run before the comma rule
    let line = OPEN_BRACKET_SPACE.replace_all(line, "[");
    let line = CLOSE_BRACKET_SPACE.replace_all(&line, "]");
    COMMA_SPACE.replace_all(&line, ",").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_common::types::Verdict;
    use proptest::prelude::*;

    #[test]
    fn test_trims_whole_text() {
        assert_eq!(normalize_output("  hello  \n"), "hello");
        assert_eq!(normalize_output("\n\nhello\n\n"), "hello");
        assert_eq!(normalize_output(""), "");
        assert_eq!(normalize_output("   \n  \t "), "");
    }

    #[test]
    fn test_trims_each_line() {
        assert_eq!(normalize_output("  a  \n\t b\t"), "a\nb");
    }

    #[test]
    fn test_handles_crlf() {
        assert_eq!(normalize_output("line1\r\nline2\r\n"), "line1\nline2");
    }

    #[test]
    fn test_bracket_spacing() {
        assert_eq!(normalize_output("[ 1 ]"), "[1]");
        assert_eq!(normalize_output("[  [ 1 ] ]"), "[[1]]");
        assert_eq!(normalize_output("[]"), "[]");
        assert_eq!(normalize_output("[ ]"), "[]");
    }

    #[test]
    fn test_comma_spacing() {
        assert_eq!(normalize_output("[1 , 2]"), "[1,2]");
        assert_eq!(normalize_output("[1,  2]"), "[1,2]");
        assert_eq!(normalize_output("[1,2]"), "[1,2]");
        assert_eq!(normalize_output("a ,b,   c"), "a,b,c");
    }

    #[test]
    fn test_bracket_and_comma_rules_combined() {
        assert_eq!(normalize_output("[ 1 , 2 ]"), "[1,2]");
        assert_eq!(normalize_output(" [ 0 , 1 ]\n"), "[0,1]");
        assert_eq!(normalize_output("[ 'o', 'l', 'l' ]"), "['o','l','l']");
    }

    #[test]
    fn test_drops_blank_lines() {
        assert_eq!(normalize_output("a\n\nb"), "a\nb");
        assert_eq!(normalize_output("a\n   \nb\n\n\nc"), "a\nb\nc");
    }

    #[test]
    fn test_preserves_content() {
        assert_eq!(normalize_output("Hello World"), "Hello World");
        assert_eq!(normalize_output("[2,1]"), "[2,1]");
        assert_eq!(normalize_output("b\na"), "b\na");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "   ",
            "[ 1 , 2 ]",
            " [ 0 , 1 ] \n\n [ 1, 2 ]\r\n",
            "a ,  ]",
            "[ , x",
            "[\t[ 1 ,\t2 ] ]",
            "{ \"a\" : 1 , \"b\" : [ 2 , 3 ] }",
            "x\n\n\ny ,z\n",
            "\u{a0}[\u{2003}1\u{a0},\u{2003}2 ]\u{a0}",
        ];
        for sample in samples {
            let once = normalize_output(sample);
            let twice = normalize_output(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }

    /// Text drawn from the characters normalization cares about, including
    /// Unicode spaces
    fn output_text() -> impl Strategy<Value = String> {
        let alphabet = vec![
            ' ', '\t', '\r', '\n', '\u{a0}', '\u{2003}', '\u{3000}', '[', ']', ',', 'a', 'Z',
            '0', '7',
        ];
        prop::collection::vec(prop::sample::select(alphabet), 0..64)
            .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        #[test]
        fn test_normalize_idempotent_property(text in output_text()) {
            let once = normalize_output(&text);
            prop_assert_eq!(normalize_output(&once), once);
        }

        #[test]
        fn test_output_matches_itself_property(text in output_text()) {
            prop_assert_eq!(crate::evaluator::evaluate(&text, &text), Verdict::Pass);
        }
    }
}
