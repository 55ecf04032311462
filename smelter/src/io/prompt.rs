//! Templates for the reviewer instruction and the pull-request body.

use anyhow::Result;
use minijinja::{Environment, context};

const REVIEWER_TEMPLATE: &str = include_str!("prompts/reviewer.md");
const PR_BODY_TEMPLATE: &str = include_str!("prompts/pr_body.md");

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("reviewer", REVIEWER_TEMPLATE)
            .expect("reviewer template should be valid");
        env.add_template("pr_body", PR_BODY_TEMPLATE)
            .expect("pr_body template should be valid");
        Self { env }
    }
}

/// Render the system instruction sent to the suggestion service.
pub fn reviewer_instruction(path: &str) -> Result<String> {
    let engine = PromptEngine::new();
    let template = engine.env.get_template("reviewer")?;
    let rendered = template.render(context! { path => path })?;
    Ok(rendered)
}

/// Render the pull-request body carrying the model's explanation.
pub fn pr_body(explanation: &str) -> Result<String> {
    let engine = PromptEngine::new();
    let template = engine.env.get_template("pr_body")?;
    let rendered = template.render(context! { explanation => explanation.trim() })?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewer_instruction_names_path_and_contract_fields() {
        let rendered = reviewer_instruction("src/agent.ts").expect("render");
        assert!(rendered.contains("src/agent.ts"));
        assert!(rendered.contains("\"explanation\""));
        assert!(rendered.contains("\"refactoredContent\""));
    }

    #[test]
    fn pr_body_contains_heading_and_explanation() {
        let rendered = pr_body("Replaced nested conditionals with guard clauses.\n").expect("render");
        assert!(rendered.starts_with("### AI Refactoring"));
        assert!(rendered.contains("guard clauses"));
    }
}
