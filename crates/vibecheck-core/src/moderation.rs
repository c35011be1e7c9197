//! Content safety checks for user-submitted text.
//!
//! The local checks here are deterministic and always apply. The
//! AI-assisted check lives at the server boundary and fails open: an
//! infrastructure hiccup must never block legitimate content.

use serde::Serialize;

/// Maximum accepted content length, in characters.
pub const MAX_CONTENT_LEN: usize = 5000;

/// A single character repeating more than this many times consecutively
/// is treated as spam.
pub const MAX_CHAR_RUN: usize = 10;

/// How much of the content the AI moderation prompt quotes.
const AI_EXCERPT_LEN: usize = 500;

/// Words flagged when they appear as whole words, case-insensitive.
const BANNED_WORDS: [&str; 3] = ["explicit", "harmful", "hate"];

pub const MODERATION_SYSTEM_PROMPT: &str = "You are a content moderation AI. Be strict but fair.";

/// Result of a moderation check. `content` echoes the original text
/// when safe and is withheld when flagged.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub safe: bool,
    pub reason: Option<String>,
    pub content: Option<String>,
}

impl ModerationVerdict {
    pub fn safe(content: &str) -> Self {
        Self {
            safe: true,
            reason: None,
            content: Some(content.to_string()),
        }
    }

    pub fn flagged(reason: impl Into<String>) -> Self {
        Self {
            safe: false,
            reason: Some(reason.into()),
            content: None,
        }
    }
}

/// Run the deterministic local checks, short-circuiting in order:
/// length, repeated-character spam, banned patterns.
pub fn check_local(content: &str) -> ModerationVerdict {
    if content.chars().count() > MAX_CONTENT_LEN {
        return ModerationVerdict::flagged("Content too long");
    }

    if has_char_run(content, MAX_CHAR_RUN + 1) {
        return ModerationVerdict::flagged("Potential spam detected");
    }

    if contains_banned_word(content) {
        return ModerationVerdict::flagged("Contains inappropriate content");
    }

    ModerationVerdict::safe(content)
}

fn has_char_run(content: &str, run_len: usize) -> bool {
    let mut prev: Option<char> = None;
    let mut run = 0;
    for c in content.chars() {
        if Some(c) == prev {
            run += 1;
            if run >= run_len {
                return true;
            }
        } else {
            prev = Some(c);
            run = 1;
        }
    }
    false
}

fn contains_banned_word(content: &str) -> bool {
    let lower = content.to_lowercase();
    BANNED_WORDS.iter().any(|word| contains_word(&lower, word))
}

/// Whole-word match: the characters on either side of the hit must not
/// be alphanumeric.
fn contains_word(haystack: &str, word: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(word) {
        let abs = start + pos;
        let end = abs + word.len();
        let before_ok = haystack[..abs]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = end;
    }
    false
}

/// Build the constrained prompt for the AI-assisted check. Only the
/// first 500 characters of content are quoted.
pub fn moderation_prompt(content: &str) -> String {
    let excerpt: String = content.chars().take(AI_EXCERPT_LEN).collect();
    format!(
        "Analyze if this content is appropriate for a social platform.\n\
         Reply with only \"SAFE\" or \"UNSAFE: [reason]\".\n\n\
         Content: {excerpt}"
    )
}

/// Parse the model's verdict. Returns the flag reason for an `UNSAFE`
/// reply, `None` for anything else (including malformed replies, which
/// the caller treats as safe).
pub fn parse_ai_verdict(reply: &str) -> Option<String> {
    let reply = reply.trim();
    let rest = reply.strip_prefix("UNSAFE")?;
    Some(rest.trim_start_matches(':').trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_text_is_safe() {
        let v = check_local("Just a regular bio about hiking and coffee.");
        assert!(v.safe);
        assert_eq!(v.reason, None);
        assert_eq!(
            v.content.as_deref(),
            Some("Just a regular bio about hiking and coffee.")
        );
    }

    #[test]
    fn over_length_flagged() {
        let long = "a b".repeat(1667); // 5001 chars
        assert_eq!(long.chars().count(), 5001);
        let v = check_local(&long);
        assert!(!v.safe);
        assert_eq!(v.reason.as_deref(), Some("Content too long"));
        assert_eq!(v.content, None);
    }

    #[test]
    fn exactly_max_length_passes() {
        let text = "ab".repeat(2500);
        assert!(check_local(&text).safe);
    }

    #[test]
    fn repeated_chars_flagged() {
        let v = check_local(&format!("nice {}", "!".repeat(11)));
        assert!(!v.safe);
        assert_eq!(v.reason.as_deref(), Some("Potential spam detected"));

        // Ten in a row is still fine.
        assert!(check_local(&format!("ok {}", "!".repeat(10))).safe);
    }

    #[test]
    fn banned_words_whole_word_only() {
        assert!(!check_local("I hate Mondays").safe);
        assert!(!check_local("HATE is loud").safe);
        // Substring inside a larger word does not count.
        assert!(check_local("whatever, hateful is a different token? no: hates").safe);
    }

    #[test]
    fn empty_content_is_safe_locally() {
        assert!(check_local("").safe);
    }

    #[test]
    fn prompt_truncates_content() {
        let prompt = moderation_prompt(&"x".repeat(2000));
        assert!(prompt.len() < 700);
        assert!(prompt.contains("SAFE"));
    }

    #[test]
    fn verdict_parsing() {
        assert_eq!(parse_ai_verdict("SAFE"), None);
        assert_eq!(
            parse_ai_verdict("UNSAFE: contains slurs"),
            Some("contains slurs".to_string())
        );
        assert_eq!(parse_ai_verdict("  UNSAFE:spam  "), Some("spam".to_string()));
        assert_eq!(parse_ai_verdict("UNSAFE"), Some(String::new()));
        assert_eq!(parse_ai_verdict("gibberish"), None);
    }
}
