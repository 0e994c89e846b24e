use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::config::StoryboardMode;
use crate::provider::ProviderKind;
use crate::session::FormState;

#[derive(Parser, Debug)]
#[command(name = "ux_artefactor", version, about = "LLM-powered UX design artifacts: persona, scenario, storyboard, user stories")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// TOML config file (models, retry policy, prompt overrides)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = ProviderKind::OpenAI)]
    pub provider: ProviderKind,

    /// OpenAI API key; falls back to OPENAI_API_KEY
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Chat model
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub image_model: Option<String>,

    #[arg(long, global = true, value_enum)]
    pub storyboard_mode: Option<StoryboardMode>,

    /// Also illustrate the persona
    #[arg(long, global = true, default_value_t = false)]
    pub portrait: bool,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Save every request/response pair as JSON under this directory
    #[arg(long, global = true)]
    pub save_transcripts: Option<String>,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fill in the form and trigger artifacts from a menu (default)
    Interactive(FormArgs),
    Persona(FormArgs),
    Scenario(FormArgs),
    /// Generates the scenario first, then the storyboard
    Storyboard(FormArgs),
    /// Generates the scenario first, then the user stories
    Stories(FormArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct FormArgs {
    /// Who is the main user of the application?
    #[arg(long)]
    pub user: Option<String>,

    /// What problem does the application solve?
    #[arg(long)]
    pub problem: Option<String>,

    /// How does the application do it?
    #[arg(long = "app")]
    pub application: Option<String>,

    /// In what context?
    #[arg(long)]
    pub context: Option<String>,
}

impl FormArgs {
    pub fn to_form(&self) -> FormState {
        FormState {
            user: self.user.clone().unwrap_or_default(),
            problem: self.problem.clone().unwrap_or_default(),
            application: self.application.clone().unwrap_or_default(),
            context: self.context.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_shot_storyboard() {
        let args = Args::try_parse_from([
            "ux_artefactor",
            "storyboard",
            "--user",
            "a courier",
            "--problem",
            "missed deliveries",
            "--app",
            "delivery slots",
            "--provider",
            "mock",
            "--storyboard-mode",
            "scenario-steps",
        ])
        .unwrap();
        assert_eq!(args.provider, ProviderKind::Mock);
        assert_eq!(args.storyboard_mode, Some(StoryboardMode::ScenarioSteps));
        let Some(Command::Storyboard(form_args)) = args.command else {
            panic!("expected the storyboard subcommand");
        };
        let form = form_args.to_form();
        assert_eq!(form.application, "delivery slots");
        assert!(form.context.is_empty());
    }

    #[test]
    fn each_subcommand_parses_to_its_own_variant() {
        let parse = |name: &str| Args::try_parse_from(["ux_artefactor", name, "--user", "a nurse"]).unwrap().command;
        assert!(matches!(parse("interactive"), Some(Command::Interactive(_))));
        assert!(matches!(parse("persona"), Some(Command::Persona(_))));
        assert!(matches!(parse("scenario"), Some(Command::Scenario(_))));
        assert!(matches!(parse("stories"), Some(Command::Stories(ref f)) if f.user.as_deref() == Some("a nurse")));
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let args = Args::try_parse_from(["ux_artefactor"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.provider, ProviderKind::OpenAI);
    }
}
