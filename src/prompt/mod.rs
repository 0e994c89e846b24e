use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::session::FormState;

fn system_use_cases() -> &'static str {
r#"You are a UX design assistant, helping to create use cases and storyboards."#
}

fn system_user_stories() -> &'static str {
r#"You are a UX design assistant, helping to create user stories"#
}

fn persona_template() -> &'static str {
r#"Create a persona (UX design) (and only a persona) depicting a user based on the following data:

The user is described as following: {user}
The application solves the problem: {problem}
The application description: {application}
The context of use: {context}"#
}

fn persona_portrait_template() -> &'static str {
r#"Create a realistic illustration of a UX persona, based on the description:

{persona}"#
}

fn scenario_template() -> &'static str {
r#"Create a realistic use case (and only a use case) for the use of an application based on the following data:

The user is described as following: {user}
The application solves the problem: {problem}
The application description: {application}
The context of use: {context}

Create a use case scenario. Use numbered list to describe the steps in scenario. Describe each step in one sentence. Focus on interaction between the user and the application."#
}

fn image_prompts_template() -> &'static str {
r#"You are creating a storyboard for an application based on the following use-case scenario:

{scenario}

For each step in the scenario, create a prompt for dall-e to generate a frame of a storyboard.
In each step, include context, so dall-e would understand, what is needed.
Return a numbered list of prompts without additional comments."#
}

fn storyboard_style() -> &'static str {
r#"Create a visual depiction of a step in the use case scenario, suitable for a storyboard. Use semi-realistic style. The step description is the following: "#
}

fn user_stories_template() -> &'static str {
r#"Create user stories following the template “As a [persona], I [want to], [so that].” based on the following:

The user is described as following: {user}
The application solves the problem: {problem}
The application description: {application}
The context of use: {context}
The suggested scenario of use:
{scenario}

Use numbered list for user stories."#
}

/// Every instruction and template the tool sends. Any field can be
/// overridden from the `[prompts]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSet {
    pub system_use_cases: String,
    pub system_user_stories: String,
    pub persona: String,
    pub persona_portrait: String,
    pub scenario: String,
    pub image_prompts: String,
    pub storyboard_style: String,
    pub user_stories: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            system_use_cases: system_use_cases().into(),
            system_user_stories: system_user_stories().into(),
            persona: persona_template().into(),
            persona_portrait: persona_portrait_template().into(),
            scenario: scenario_template().into(),
            image_prompts: image_prompts_template().into(),
            storyboard_style: storyboard_style().into(),
            user_stories: user_stories_template().into(),
        }
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex"))
}

/// Substitute `{name}` placeholders in one pass over the template, so
/// substituted values are inserted literally. Unknown placeholders are left
/// as is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match vars.iter().find(|(n, _)| *n == name) {
                Some((_, value)) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn form_vars(form: &FormState) -> [(&str, &str); 4] {
    [
        ("user", form.user.as_str()),
        ("problem", form.problem.as_str()),
        ("application", form.application.as_str()),
        ("context", form.context.as_str()),
    ]
}

impl PromptSet {
    pub fn persona_prompt(&self, form: &FormState) -> String {
        render(&self.persona, &form_vars(form))
    }

    pub fn scenario_prompt(&self, form: &FormState) -> String {
        render(&self.scenario, &form_vars(form))
    }

    pub fn user_stories_prompt(&self, form: &FormState, scenario: &str) -> String {
        let mut vars = form_vars(form).to_vec();
        vars.push(("scenario", scenario));
        render(&self.user_stories, &vars)
    }

    pub fn image_prompts_prompt(&self, scenario: &str) -> String {
        render(&self.image_prompts, &[("scenario", scenario)])
    }

    pub fn portrait_prompt(&self, persona: &str) -> String {
        render(&self.persona_portrait, &[("persona", persona)])
    }

    /// Image prompt for one scenario step when steps are drawn directly.
    pub fn styled_step(&self, step: &str) -> String {
        format!("{}{}", self.storyboard_style, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> FormState {
        FormState {
            user: "a night-shift nurse".into(),
            problem: "lost handover notes".into(),
            application: "a shared ward notebook".into(),
            context: "hospital ward, tablet".into(),
        }
    }

    #[test]
    fn render_replaces_all_occurrences() {
        let s = render("{a} and {a} but not {b}", &[("a", "x")]);
        assert_eq!(s, "x and x but not {b}");
    }

    #[test]
    fn render_inserts_values_literally() {
        let s = render("{a} then {b}", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(s, "{b} then x");
    }

    #[test]
    fn braces_in_form_text_are_not_expanded() {
        let form = FormState {
            user: "devs who write {problem} in templates".into(),
            problem: "SECRET".into(),
            ..form()
        };
        let p = PromptSet::default().persona_prompt(&form);
        assert!(p.contains("The user is described as following: devs who write {problem} in templates"));
        assert!(p.contains("The application solves the problem: SECRET"));
    }

    #[test]
    fn scenario_text_with_placeholders_survives_stories_prompt() {
        let p = PromptSet::default().user_stories_prompt(&form(), "1. Type {context} into the search box");
        assert!(p.contains("1. Type {context} into the search box"));
        assert!(p.contains("The context of use: hospital ward, tablet"));
    }

    #[test]
    fn scenario_prompt_carries_every_field() {
        let p = PromptSet::default().scenario_prompt(&form());
        assert!(p.contains("The user is described as following: a night-shift nurse"));
        assert!(p.contains("The application solves the problem: lost handover notes"));
        assert!(p.contains("The application description: a shared ward notebook"));
        assert!(p.contains("The context of use: hospital ward, tablet"));
        assert!(!p.contains('{'));
    }

    #[test]
    fn user_stories_prompt_includes_scenario() {
        let p = PromptSet::default().user_stories_prompt(&form(), "1. Open the notebook");
        assert!(p.contains("The suggested scenario of use:\n1. Open the notebook"));
    }

    #[test]
    fn styled_step_prefixes_style() {
        let p = PromptSet { storyboard_style: "Sketch: ".into(), ..Default::default() };
        assert_eq!(p.styled_step("nurse opens tablet"), "Sketch: nurse opens tablet");
    }
}
