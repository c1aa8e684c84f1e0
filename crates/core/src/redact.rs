use std::sync::LazyLock;

use regex::Regex;

pub const REDACTED_EMAIL: &str = "[REDACTED_EMAIL]";
pub const REDACTED_NUMBER: &str = "[REDACTED_NUMBER]";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email pattern is valid")
});

static LONG_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{8,}").expect("long number pattern is valid"));

/// Replaces email-shaped substrings and digit runs of length eight or more.
///
/// Emails are replaced first so a digit run inside an address does not split
/// it into a partially redacted fragment. The replacement markers contain
/// neither `@` nor digits, which keeps the function idempotent.
pub fn redact_pii(text: &str) -> String {
    let without_emails = EMAIL_PATTERN.replace_all(text, REDACTED_EMAIL);
    LONG_NUMBER_PATTERN.replace_all(&without_emails, REDACTED_NUMBER).into_owned()
}

/// Truncates to at most `max_chars` characters without splitting a code point.
pub fn bounded(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        bounded, redact_pii, EMAIL_PATTERN, LONG_NUMBER_PATTERN, REDACTED_EMAIL, REDACTED_NUMBER,
    };

    #[test]
    fn redaction_patterns_compile_and_match() {
        assert!(EMAIL_PATTERN.is_match("ops@boots.example"));
        assert!(LONG_NUMBER_PATTERN.is_match("12345678"));
        assert!(!LONG_NUMBER_PATTERN.is_match("1234567"));
    }

    #[test]
    fn emails_and_long_numbers_are_redacted() {
        let redacted =
            redact_pii("contact Jane.Doe+pos@Example.co.uk or call 0812345678 about order 1234567");

        assert!(!redacted.contains('@'));
        assert!(redacted.contains(REDACTED_EMAIL));
        assert!(redacted.contains(REDACTED_NUMBER));
        assert!(redacted.contains("order 1234567"), "seven digits stay visible: {redacted}");
    }

    #[test]
    fn digit_runs_glued_to_letters_are_still_redacted() {
        let redacted = redact_pii("member-id:A123456789B");

        assert_eq!(redacted, format!("member-id:A{REDACTED_NUMBER}B"));
    }

    #[test]
    fn redaction_is_idempotent() {
        let inputs = [
            "ops@boots.example 987654321012",
            "x@12345678.com and 11112222@mail.example",
            "a@b.c12345678om",
            "plain text without identifiers",
        ];

        for input in inputs {
            let once = redact_pii(input);
            assert_eq!(redact_pii(&once), once, "second pass changed `{input}`");
        }
    }

    #[test]
    fn no_long_digit_run_survives_one_pass() {
        let redacted = redact_pii("123456789012345678901234567890 and 00000000");

        assert!(!redacted.chars().collect::<Vec<_>>().windows(8).any(|window| window
            .iter()
            .all(char::is_ascii_digit)));
    }

    #[test]
    fn bounded_respects_char_boundaries() {
        assert_eq!(bounded("héllo", 2), "hé");
        assert_eq!(bounded("short", 50), "short");
        assert_eq!(bounded("", 0), "");
    }
}
