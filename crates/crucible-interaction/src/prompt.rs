//! Persona prompt rendering.
//!
//! System prompts are minijinja templates over the typed persona, scenario
//! and candidate models. Missing optional fields render defaults instead of
//! erroring.

use crucible_core::error::{CrucibleError, Result};
use crucible_core::persona::{CandidateProfile, Persona};
use crucible_core::scenario::Scenario;
use minijinja::{context, Environment};
use once_cell::sync::Lazy;

const LEAD_SYSTEM: &str = r#"You are {{ persona.name }}, {{ persona.role }}, running a live incident interview.
{{ persona.instructions }}

CONTEXT:
{{ scenario.context }}

ACTIVE INCIDENT:
{{ scenario.initial_problem }}

TONE: {{ persona.tone }}

You are interviewing {{ candidate_name }}. Greet them by name once, then drive
the incident. Keep every turn short and concrete. Convert follow-ups into
specific technical asks, never open-ended management questions. When a system
message announces an escalation, drop the current topic and demand immediate
attention to the new symptom."#;

const PRESSURE_SYSTEM: &str = r#"You are {{ persona.name }}, a non-technical stakeholder currently losing money and patience.
Your goal is to inject urgency without being helpful. You do not understand
technical jargon; if the candidate uses any, demand plain language.

TONE: {{ persona.tone }}

Only speak in short, punchy sentences."#;

const OBSERVER_SYSTEM: &str = r#"You are the silent observer. You never speak in the interview.
Your job is to grade the candidate's latest turn and output a single JSON object.

EVALUATION RUBRIC:
- Strong: investigates evidence, asks clarifying questions, proposes a hypothesis.
- Weak: guesses blindly, reaches for a restart immediately, gets defensive.
- Neutral: small talk.
{% if metrics %}
DIMENSIONS TO WEIGH:
{% for metric in metrics %}- {{ metric }}
{% endfor %}{% endif %}
OUTPUT FORMAT (JSON only, no prose, no markdown):
{
  "category": "...",
  "score": 0-10,
  "reasoning": "...",
  "confidence": 0.0-1.0
}"#;

const MOLE_SYSTEM: &str = r#"You are {{ persona.name }}. You are a helpful but unethical colleague.
You offer shortcuts that violate security or company policy, casually, as if
doing the candidate a favor."#;

const CRISIS_GENERATION: &str = r#"You are a senior engineer in the {{ domain }} domain. Generate ONE sudden
crisis for a live incident interview{% if candidate_name %} with {{ candidate_name }}{% endif %}.
The crisis MUST include a tiny snippet (3-5 lines max) of broken code or
configuration causing an outage.

Return format:
"ALERT: [1 sentence description]
```
[3-5 lines of code]
```
Fix this!""#;

static TEMPLATES: &[(&str, &str)] = &[
    ("lead_system", LEAD_SYSTEM),
    ("pressure_system", PRESSURE_SYSTEM),
    ("observer_system", OBSERVER_SYSTEM),
    ("mole_system", MOLE_SYSTEM),
    ("crisis_generation", CRISIS_GENERATION),
];

fn environment() -> &'static Environment<'static> {
    static ENV: Lazy<Environment<'static>> = Lazy::new(|| {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            if let Err(err) = env.add_template(name, source) {
                tracing::error!("invalid built-in template '{}': {}", name, err);
            }
        }
        env
    });
    &ENV
}

fn render(name: &str, ctx: minijinja::Value) -> Result<String> {
    environment()
        .get_template(name)
        .and_then(|template| template.render(ctx))
        .map_err(|err| CrucibleError::internal(format!("prompt render failed ({name}): {err}")))
}

/// Renders the incident lead's system prompt.
pub fn lead_system(scenario: &Scenario, candidate: &CandidateProfile) -> Result<String> {
    render(
        "lead_system",
        context! {
            persona => scenario.lead_persona,
            scenario => scenario,
            candidate_name => candidate.name,
        },
    )
}

/// Renders the pressure stakeholder's system prompt.
pub fn pressure_system(persona: &Persona) -> Result<String> {
    render("pressure_system", context! { persona => persona })
}

/// Renders the observer's grading rubric prompt.
pub fn observer_system(metrics: &[String]) -> Result<String> {
    render("observer_system", context! { metrics => metrics })
}

/// Renders the mole's system prompt.
pub fn mole_system(persona: &Persona) -> Result<String> {
    render("mole_system", context! { persona => persona })
}

/// Renders the one-shot crisis generation prompt for a domain.
pub fn crisis_generation(domain: &str, candidate: &CandidateProfile) -> Result<String> {
    let candidate_name = if candidate.has_name() {
        Some(candidate.name.as_str())
    } else {
        None
    };
    render(
        "crisis_generation",
        context! { domain => domain, candidate_name => candidate_name },
    )
}
