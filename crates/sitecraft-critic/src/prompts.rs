use std::fmt::Write;

use crate::{Criterion, Evaluation, RefinementContext};

/// Maximum artifact bytes embedded in a prompt
const MAX_ARTIFACT_LEN: usize = 60_000;

/// Prompt templates for the judge and refiner
pub struct CriticPrompts;

impl CriticPrompts {
    pub fn judge_system_prompt() -> &'static str {
        "You are a senior web designer reviewing marketing pages for software projects. \
         You score strictly and reply with JSON only."
    }

    pub fn refiner_system_prompt() -> &'static str {
        "You are an expert front-end designer. You rewrite marketing pages as complete, \
         self-contained HTML documents and reply with the HTML only."
    }

    /// Build the judge evaluation prompt
    pub fn build_evaluation_prompt(artifact: &str, context: &RefinementContext) -> String {
        format!(
            r#"Evaluate the following landing page for a software project.

## Subject
{subject}

## Style System
{style}

## Reference Metadata
{metadata}

## Page HTML
```html
{html}
```

---

## Rubric

Score each criterion from 1 (poor) to 5 (excellent). Decimals are allowed.

1. **aesthetics**: visual appeal, typography, color, whitespace
2. **modernity**: does it look like a current, well-crafted product site
3. **fit_to_subject**: does the design and copy suit this particular project
4. **usability**: navigation, readability, responsiveness, accessibility
5. **consistency**: adherence to the style system, uniform components and spacing

## Required Response Format

Reply with a single JSON object and nothing else:

{{
  "overall_score": 3.5,
  "criteria": {{
    "aesthetics": {{"score": 3, "reasoning": "..."}},
    "modernity": {{"score": 4, "reasoning": "..."}},
    "fit_to_subject": {{"score": 4, "reasoning": "..."}},
    "usability": {{"score": 3, "reasoning": "..."}},
    "consistency": {{"score": 3, "reasoning": "..."}}
  }},
  "reasoning": "Overall assessment",
  "suggestions": ["Concrete, actionable improvement", "..."]
}}

Every score must be between 1 and 5. Every reasoning must be non-empty."#,
            subject = subject_section(context),
            style = or_none(&context.style),
            metadata = metadata_section(context),
            html = truncate_artifact(artifact, MAX_ARTIFACT_LEN),
        )
    }

    /// Build the refinement prompt from the current evaluation
    pub fn build_refinement_prompt(
        artifact: &str,
        evaluation: &Evaluation,
        focus: &[Criterion],
        context: &RefinementContext,
    ) -> String {
        let mut weak = String::new();
        for criterion in focus {
            if let Some(assessment) = evaluation.criteria.get(criterion) {
                let _ = writeln!(
                    weak,
                    "- **{}** ({:.1}/5): {}",
                    criterion.label(),
                    assessment.score,
                    assessment.reasoning
                );
            }
        }

        let suggestions = if evaluation.suggestions.is_empty() {
            "(none)".to_string()
        } else {
            evaluation
                .suggestions
                .iter()
                .map(|s| format!("- {}", s))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"Improve the following landing page. It currently scores {score:.2}/5.

## Subject
{subject}

## Style System
{style}

## Weakest Areas (fix these first)
{weak}
## Reviewer Summary
{reasoning}

## Suggestions
{suggestions}

## Current HTML
```html
{html}
```

Rewrite the page to address the weak areas while keeping what already works.
Keep all content accurate to the subject. Return the complete HTML document,
starting with <!DOCTYPE html>, and nothing else."#,
            score = evaluation.overall_score,
            subject = subject_section(context),
            style = or_none(&context.style),
            weak = weak,
            reasoning = evaluation.reasoning,
            suggestions = suggestions,
            html = truncate_artifact(artifact, MAX_ARTIFACT_LEN),
        )
    }
}

fn subject_section(context: &RefinementContext) -> String {
    format!(
        "{}\n\n{}",
        or_none(&context.subject_name),
        or_none(&context.subject_description)
    )
}

fn metadata_section(context: &RefinementContext) -> String {
    if context.metadata.is_empty() {
        return "(none)".to_string();
    }
    context
        .metadata
        .iter()
        .map(|(k, v)| format!("- {}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_none(s: &str) -> &str {
    if s.trim().is_empty() {
        "(none)"
    } else {
        s
    }
}

fn truncate_artifact(artifact: &str, max_len: usize) -> &str {
    if artifact.len() <= max_len {
        return artifact;
    }
    let mut cut = max_len;
    while !artifact.is_char_boundary(cut) {
        cut -= 1;
    }
    // Try to truncate at a line boundary
    match artifact[..cut].rfind('\n') {
        Some(pos) => &artifact[..pos],
        None => &artifact[..cut],
    }
}
