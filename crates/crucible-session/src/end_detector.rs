//! Termination phrase detection.
//!
//! Detects when the candidate wants to end the interview, with some fuzz for
//! speech-to-text noise.

use crucible_core::persona::CandidateProfile;
use once_cell::sync::Lazy;
use regex::Regex;

/// Phrases that indicate the candidate wants to end the interview.
const END_PHRASES: &[&str] = &[
    "can we end the interview",
    "let's end the interview",
    "end the interview",
    "let's end it",
    "i want to stop",
    "i want to end",
    "let's stop here",
    "that's all for today",
    "i think we're done",
    "we can stop now",
    "can we stop",
    "let's wrap up",
    "wrap it up",
    "finish the interview",
    "conclude the interview",
    "ok i'm done",
    "okay i'm done",
    "i'm finished",
    "let's call it",
    "that's enough",
    "end interview",
    "stop interview",
];

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").unwrap_or_else(|_| unreachable!("static regex is valid")));

/// Checks whether the transcript contains an end phrase.
///
/// The transcript is lowercased and stripped of punctuation, then matched by
/// substring containment, or by an 80%-token-overlap rule for multi-word
/// phrases to tolerate transcription noise.
pub fn check_end_phrase(transcript: &str) -> bool {
    if transcript.trim().is_empty() {
        return false;
    }

    let normalized = PUNCTUATION
        .replace_all(&transcript.to_lowercase(), "")
        .trim()
        .to_string();
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    for phrase in END_PHRASES {
        // Phrases carry apostrophes; strip them the same way as the
        // transcript so "let's wrap up" matches "lets wrap up".
        let phrase = PUNCTUATION.replace_all(phrase, "");
        if normalized.contains(phrase.as_ref()) {
            return true;
        }

        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.len() >= 2 {
            let matches = words.iter().filter(|w| tokens.contains(w)).count();
            if (matches as f64) >= (words.len() as f64) * 0.8 {
                return true;
            }
        }
    }

    false
}

/// Builds the goodbye line, personalized when a real name is known.
pub fn goodbye_message(candidate: &CandidateProfile) -> String {
    if candidate.has_name() {
        format!(
            "Thank you {} for your time today. It was great speaking with you. \
             We'll be in touch with the next steps. Have a great day!",
            candidate.name
        )
    } else {
        "Thank you for your time today. It was great speaking with you. \
         We'll be in touch with the next steps. Have a great day!"
            .to_string()
    }
}
