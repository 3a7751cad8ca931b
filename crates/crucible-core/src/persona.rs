//! Persona domain model.
//!
//! Represents the AI personas that drive one voice each in an interview
//! session. Every field an agent looks up is explicit and defaulted; there
//! are no optional duck-typed attributes.

use serde::{Deserialize, Serialize};

/// A persona with a fixed tone and instruction template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Display name of the persona.
    pub name: String,
    /// Role or title describing the persona (e.g. "VP of Engineering").
    pub role: String,
    /// Speaking tone characteristics.
    #[serde(default = "default_tone")]
    pub tone: String,
    /// Behavioral instructions injected into the system prompt.
    #[serde(default)]
    pub instructions: String,
    /// Canned interjection lines (used by the stakeholder persona).
    #[serde(default)]
    pub interjections: Vec<String>,
    /// Phrases that prompt this persona to speak up.
    #[serde(default)]
    pub trigger_phrases: Vec<String>,
}

fn default_tone() -> String {
    "Professional".to_string()
}

impl Persona {
    /// Creates a persona with just a name and role; other fields defaulted.
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            tone: default_tone(),
            instructions: String::new(),
            interjections: Vec::new(),
            trigger_phrases: Vec::new(),
        }
    }
}

/// The candidate being interviewed.
///
/// All fields degrade to generic defaults when no profile was loaded; a
/// missing profile never fails the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    /// Candidate display name.
    #[serde(default = "default_candidate_name")]
    pub name: String,
    /// The role being screened for.
    #[serde(default)]
    pub role: String,
    /// Topics the interview should lean into.
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

fn default_candidate_name() -> String {
    "Candidate".to_string()
}

impl Default for CandidateProfile {
    fn default() -> Self {
        Self {
            name: default_candidate_name(),
            role: String::new(),
            focus_areas: Vec::new(),
        }
    }
}

impl CandidateProfile {
    /// Whether this profile carries a real name (not the generic default).
    pub fn has_name(&self) -> bool {
        !self.name.is_empty() && self.name != default_candidate_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_deserializes_with_defaults() {
        let persona: Persona =
            serde_json::from_str(r#"{"name": "Vikram", "role": "Stakeholder"}"#).unwrap();
        assert_eq!(persona.tone, "Professional");
        assert!(persona.interjections.is_empty());
    }

    #[test]
    fn test_candidate_profile_default_name() {
        let profile = CandidateProfile::default();
        assert_eq!(profile.name, "Candidate");
        assert!(!profile.has_name());

        let named = CandidateProfile {
            name: "Ada".to_string(),
            ..Default::default()
        };
        assert!(named.has_name());
    }
}
