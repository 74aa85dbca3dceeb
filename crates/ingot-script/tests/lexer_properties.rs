//! Property suites for the tokenizer and the cleanup pass.

use ingot_script::lexer::tokenize;
use ingot_script::postprocess::normalize_whitespace;
use ingot_script::token::TokenKind;
use ingot_script::{transpile, TranspileOptions};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn prop_tokenize_lossless(s in ".*") {
        let joined: String = tokenize(&s).iter().map(|t| t.text.as_str()).collect();
        prop_assert_eq!(joined, s, "concatenated token text must reproduce the input");
    }

    #[test]
    fn prop_tokenize_lossless_scriptlike(s in r#"[ -~\n\t]{0,200}"#) {
        let joined: String = tokenize(&s).iter().map(|t| t.text.as_str()).collect();
        prop_assert_eq!(joined, s);
    }

    #[test]
    fn prop_stream_ends_with_eof(s in ".*") {
        let tokens = tokenize(&s);
        prop_assert!(!tokens.is_empty());
        prop_assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        prop_assert!(tokens.last().unwrap().text.is_empty());
    }

    #[test]
    fn prop_transpile_is_total(s in r#"[ -~\n]{0,200}"#) {
        // Any input produces a value: Lua text or an error string, never
        // a panic across the boundary
        let _ = transpile(&s, &TranspileOptions::default());
    }

    #[test]
    fn prop_normalize_whitespace_idempotent(s in r#"[ -~\n\t]{0,300}"#) {
        let once = normalize_whitespace(&s);
        let twice = normalize_whitespace(&once);
        prop_assert_eq!(once, twice, "whitespace normalization must be idempotent");
    }

    #[test]
    fn prop_transpiled_output_is_normalized(s in r#"[a-z =+0-9\n]{0,100}"#) {
        // Whatever the pipeline emits is already whitespace-normal
        if let Ok(out) = transpile(&s, &TranspileOptions::default()) {
            prop_assert_eq!(normalize_whitespace(&out), out);
        }
    }
}
