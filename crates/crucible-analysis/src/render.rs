//! Report rendering.
//!
//! The PDF layout engine is an external collaborator; the core only knows
//! the [`ReportRenderer`] trait, which takes the composite report and
//! returns opaque document bytes. A markdown renderer ships built in.

use crucible_core::error::{CrucibleError, Result};
use crucible_core::report::CompositeReport;
use minijinja::{context, Environment};
use once_cell::sync::Lazy;

/// Renders a composite report into an opaque document.
pub trait ReportRenderer: Send + Sync {
    /// Returns the rendered document bytes.
    fn render(&self, report: &CompositeReport) -> Result<Vec<u8>>;

    /// File extension of the produced document (without dot).
    fn extension(&self) -> &'static str;
}

const REPORT_TEMPLATE: &str = r#"# Final Session Interview Report

- **Session:** {{ report.session_id }}
- **Candidate:** {{ report.candidate_id }}
- **Decision:** {{ report.decision }}
- **Overall score:** {{ report.overall_score }} / 10 ({{ score_percent }}%)

{{ report.summary }}

## Category breakdown
{% if report.categories %}
| Category | Score | Entries | Reasoning |
|---|---|---|---|
{% for c in report.categories %}| {{ c.category }} | {{ c.score }} | {{ c.entries }} | {{ c.reasoning }} |
{% endfor %}{% else %}
No graded turns.
{% endif %}
## Timeline
{% if report.timeline %}
| Time | Actor | Event | Details |
|---|---|---|---|
{% for t in report.timeline %}| {{ t.time }} | {{ t.actor }} | {{ t.kind }} | {{ t.details }} |
{% endfor %}{% else %}
No timeline events recorded.
{% endif %}
## Integrity signals
{% for signal in report.integrity_signals %}- {{ signal }}
{% endfor %}
---
{{ report.evaluated_turns }} turns evaluated, {{ report.parse_failures }} grading outputs unparseable.
Generated at {{ report.generated_at }}.
"#;

/// The built-in markdown renderer.
#[derive(Default)]
pub struct MarkdownReportRenderer;

impl MarkdownReportRenderer {
    /// Creates the renderer.
    pub fn new() -> Self {
        Self
    }
}

fn environment() -> &'static Environment<'static> {
    static ENV: Lazy<Environment<'static>> = Lazy::new(|| {
        let mut env = Environment::new();
        if let Err(err) = env.add_template("report", REPORT_TEMPLATE) {
            tracing::error!("invalid built-in report template: {}", err);
        }
        env
    });
    &ENV
}

impl ReportRenderer for MarkdownReportRenderer {
    fn render(&self, report: &CompositeReport) -> Result<Vec<u8>> {
        // The one and only place the 0-10 score becomes a percentage.
        let score_percent = (report.overall_score * 10.0).round() as i64;

        let text = environment()
            .get_template("report")
            .and_then(|template| {
                template.render(context! {
                    report => report,
                    score_percent => score_percent,
                })
            })
            .map_err(|err| CrucibleError::internal(format!("report render failed: {err}")))?;

        Ok(text.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "md"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::report::{CategoryScore, Decision, TimelineEntry};

    fn test_report() -> CompositeReport {
        CompositeReport {
            session_id: "s-1".into(),
            candidate_id: "cand-9".into(),
            overall_score: 7.25,
            decision: Decision::Advance,
            summary: "Evaluated 4 interaction points.".into(),
            categories: vec![CategoryScore {
                category: "General Performance".into(),
                score: 7.25,
                reasoning: "steady hands".into(),
                entries: 4,
            }],
            timeline: vec![TimelineEntry {
                time: "125s".into(),
                actor: "CrisisPopupAgent".into(),
                kind: "CRISIS_TRIGGERED".into(),
                details: "stage 1".into(),
            }],
            integrity_signals: vec!["No integrity flags observed.".into()],
            evaluated_turns: 4,
            parse_failures: 0,
            generated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_render_includes_both_scales_consistently() {
        let renderer = MarkdownReportRenderer::new();
        let bytes = renderer.render(&test_report()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("7.25 / 10"));
        assert!(text.contains("(73%)"));
        assert!(text.contains("ADVANCE"));
        assert!(text.contains("125s"));
        assert!(text.contains("steady hands"));
    }

    #[test]
    fn test_render_empty_report_sections() {
        let mut report = test_report();
        report.categories.clear();
        report.timeline.clear();

        let text = String::from_utf8(
            MarkdownReportRenderer::new().render(&report).unwrap(),
        )
        .unwrap();
        assert!(text.contains("No graded turns."));
        assert!(text.contains("No timeline events recorded."));
    }

    #[test]
    fn test_extension() {
        assert_eq!(MarkdownReportRenderer::new().extension(), "md");
    }
}
