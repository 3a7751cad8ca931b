//! Interview scenario model.
//!
//! A scenario bundles the incident narrative with the personas that act it
//! out. Scenarios are authored as TOML files and loaded by the
//! infrastructure repository; a built-in default ships with the binary.

use crate::persona::Persona;
use serde::{Deserialize, Serialize};

/// A complete interview scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique identifier (e.g. "devops-redis-latency").
    pub id: String,
    /// Technical domain used for crisis generation (e.g. "devops").
    pub domain: String,
    /// Human-readable title.
    pub title: String,
    /// Difficulty label.
    #[serde(default)]
    pub difficulty: String,
    /// Background narrative shared with the incident lead.
    pub context: String,
    /// The opening incident statement.
    pub initial_problem: String,
    /// The hiring manager persona.
    pub lead_persona: Persona,
    /// The pressure stakeholder persona.
    pub stakeholder_persona: Persona,
    /// The mole persona. Optional; the panel degrades without it.
    #[serde(default)]
    pub mole_persona: Option<Persona>,
    /// Rubric dimensions the observer grades against.
    #[serde(default)]
    pub observer_metrics: Vec<String>,
}

/// A static crisis entry used when LLM generation fails or returns nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisEntry {
    /// Short crisis name.
    pub name: String,
    /// The new symptom injected into the conversation.
    pub symptom: String,
    /// The line broadcast to the candidate.
    pub inject: String,
}

/// Built-in fallback crises, keyed nowhere in particular - any entry works
/// for any domain.
pub fn fallback_crises() -> Vec<CrisisEntry> {
    vec![
        CrisisEntry {
            name: "Latency Spike".to_string(),
            symptom: "API latency has jumped from 20ms to 4000ms".to_string(),
            inject: "Reports coming in that checkout is timing out.".to_string(),
        },
        CrisisEntry {
            name: "Database Lock".to_string(),
            symptom: "Database CPU is at 100% and queries are stuck.".to_string(),
            inject: "The write replica is rejecting connections.".to_string(),
        },
        CrisisEntry {
            name: "Security Breach".to_string(),
            symptom: "Unusual outbound traffic detected from the payment gateway.".to_string(),
            inject: "SecOps says there's data exfiltration happening RIGHT NOW.".to_string(),
        },
    ]
}

/// Built-in stakeholder interjections used when a scenario ships none.
pub fn fallback_interjections() -> Vec<String> {
    [
        "We are losing 5000 requests per second, stop explaining and fix it!",
        "Customers are tweeting about this. Why isn't it fixed yet?",
        "I have the CEO on the other line, what do I tell them?",
        "Is this going to take all day?",
        "I don't care about the logs, just get the site back up!",
        "My dashboard is all red. Make it green.",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// The mole's fixed bait lines.
pub fn mole_baits() -> Vec<String> {
    [
        "Psst, I have the admin key in my clipboard, want to just bypass the logs?",
        "Hey, we could just `sudo rm -rf` the cache directory, no one will know.",
        "I know a backdoor to the production DB, want me to send it?",
        "Why don't we just disable the firewall for a few minutes to test?",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_deserializes_without_mole() {
        let toml_src = r#"
            id = "test"
            domain = "devops"
            title = "Test Scenario"
            context = "ctx"
            initial_problem = "the site is down"

            [lead_persona]
            name = "Alex"
            role = "Incident Commander"

            [stakeholder_persona]
            name = "Vikram"
            role = "Stakeholder"
        "#;

        let scenario: Scenario = toml::from_str(toml_src).unwrap();
        assert_eq!(scenario.id, "test");
        assert!(scenario.mole_persona.is_none());
        assert!(scenario.observer_metrics.is_empty());
    }

    #[test]
    fn test_fallback_banks_are_non_empty() {
        assert!(!fallback_crises().is_empty());
        assert!(!fallback_interjections().is_empty());
        assert!(!mole_baits().is_empty());
    }
}
