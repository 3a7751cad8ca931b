//! Frontend signal payloads.
//!
//! Signals ride the transport's out-of-band data channel as JSON with a
//! `type` discriminator the frontend switches on.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A signal published to the frontend over the data channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FrontendSignal {
    /// Visual crisis popup.
    #[serde(rename = "CRISIS_POPUP")]
    CrisisPopup { title: String, message: String },
    /// Snapshot of the code the candidate is editing.
    #[serde(rename = "CODE_SNAPSHOT")]
    CodeSnapshot { code: String },
    /// A transcript line broadcast for display.
    #[serde(rename = "TRANSCRIPT")]
    Transcript { sender: String, text: String },
    /// Show or hide the coding notepad overlay.
    #[serde(rename = "TOGGLE_NOTEPAD")]
    ToggleNotepad { visible: bool },
    /// Banner-level crisis alert.
    #[serde(rename = "CRISIS_ALERT")]
    CrisisAlert { message: String },
    /// The interview is over.
    #[serde(rename = "INTERVIEW_END")]
    InterviewEnd { reason: String },
}

impl FrontendSignal {
    /// Serializes the signal to the JSON bytes the data channel carries.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Builds a crisis popup, truncating the message for display.
    pub fn crisis_popup(question: &str) -> Self {
        let message = if question.len() > 100 {
            let cut = question
                .char_indices()
                .take_while(|(i, _)| *i < 100)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            format!("{}...", &question[..cut])
        } else {
            question.to_string()
        };
        FrontendSignal::CrisisPopup {
            title: "INCOMING CRISIS".to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_discriminators() {
        let cases = [
            (
                FrontendSignal::CrisisPopup {
                    title: "t".into(),
                    message: "m".into(),
                },
                "CRISIS_POPUP",
            ),
            (
                FrontendSignal::Transcript {
                    sender: "SYSTEM".into(),
                    text: "x".into(),
                },
                "TRANSCRIPT",
            ),
            (FrontendSignal::ToggleNotepad { visible: true }, "TOGGLE_NOTEPAD"),
            (
                FrontendSignal::InterviewEnd {
                    reason: "timeout".into(),
                },
                "INTERVIEW_END",
            ),
        ];

        for (signal, expected) in cases {
            let value: serde_json::Value =
                serde_json::from_slice(&signal.to_bytes().unwrap()).unwrap();
            assert_eq!(value["type"], expected);
        }
    }

    #[test]
    fn test_crisis_popup_truncates_long_messages() {
        let long = "x".repeat(300);
        match FrontendSignal::crisis_popup(&long) {
            FrontendSignal::CrisisPopup { message, .. } => {
                assert!(message.len() <= 103);
                assert!(message.ends_with("..."));
            }
            _ => unreachable!(),
        }

        let short = "brief crisis";
        match FrontendSignal::crisis_popup(short) {
            FrontendSignal::CrisisPopup { message, .. } => assert_eq!(message, short),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_round_trip() {
        let signal = FrontendSignal::CodeSnapshot {
            code: "fn main() {}".to_string(),
        };
        let bytes = signal.to_bytes().unwrap();
        let back: FrontendSignal = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, signal);
    }
}
