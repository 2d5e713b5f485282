//! Property-based tests for command classification

use super::{parse, Command, UsageError};
use proptest::prelude::*;

/// Argument-like token: no whitespace, never empty
fn arb_token() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.$€-]{1,12}"
}

/// Keyword spelled with arbitrary casing
fn arb_cased(word: &'static str) -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
        word.chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

proptest! {
    #[test]
    fn add_extracts_arguments_verbatim(
        kw in arb_cased("add"),
        category in arb_token(),
        amount in arb_token(),
        extra in proptest::collection::vec(arb_token(), 0..3),
    ) {
        let mut text = format!("{kw} {category} {amount}");
        for e in &extra {
            text.push(' ');
            text.push_str(e);
        }
        prop_assert_eq!(parse(&text), Ok(Command::Add { category, amount }));
    }

    #[test]
    fn edit_accepts_digit_rows(
        kw in arb_cased("edit"),
        row in 0usize..100_000,
        category in arb_token(),
        amount in arb_token(),
    ) {
        let text = format!("{kw} {row} {category} {amount}");
        prop_assert_eq!(parse(&text), Ok(Command::Edit { row: row.into(), category, amount }));
    }

    #[test]
    fn edit_rejects_non_digit_rows(
        row in "[A-Za-z][A-Za-z0-9]{0,5}",
        category in arb_token(),
        amount in arb_token(),
    ) {
        let text = format!("Edit {row} {category} {amount}");
        prop_assert_eq!(parse(&text), Err(UsageError::Edit));
    }

    #[test]
    fn remove_accepts_digit_rows(kw in arb_cased("remove"), row in 0usize..100_000) {
        prop_assert_eq!(parse(&format!("{kw} {row}")), Ok(Command::Remove { row: row.into() }));
    }

    #[test]
    fn show_matches_any_casing(kw in arb_cased("show"), pad in " {0,3}") {
        prop_assert_eq!(parse(&format!("{pad}{kw}{pad}")), Ok(Command::Show));
    }

    #[test]
    fn other_text_is_freeform(text in "[a-z][a-z ?]{0,40}") {
        let first = text.split_whitespace().next().unwrap_or_default();
        prop_assume!(!matches!(first, "add" | "edit" | "remove" | "show"));
        let parsed = parse(&text);
        prop_assert_eq!(parsed, Ok(Command::Freeform(text.trim().to_string())));
    }
}
