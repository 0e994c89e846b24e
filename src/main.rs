use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::path::Path;

use ux_artefactor::cli::{Args, Command, FormArgs};
use ux_artefactor::config::Config;
use ux_artefactor::errors::ArtefactError;
use ux_artefactor::log::{Recording, Transcript};
use ux_artefactor::provider::{self, ProviderKind, Providers};
use ux_artefactor::session::Session;
use ux_artefactor::ux::{self, MenuChoice};

fn init_tracing(debug: bool) {
    let default = if debug { "ux_artefactor=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults, then the config file, then the environment, then flags.
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => Config::from_file(Path::new(path)).context("loading config")?,
        None => Config::default(),
    };
    cfg.apply_env();
    if let Some(k) = &args.api_key {
        cfg.api_key = Some(k.clone());
    }
    if let Some(m) = &args.model {
        cfg.chat_model = m.clone();
    }
    if let Some(m) = &args.image_model {
        cfg.image_model = m.clone();
    }
    if let Some(mode) = args.storyboard_mode {
        cfg.storyboard_mode = mode;
    }
    if let Some(t) = args.timeout_secs {
        cfg.timeout_secs = t;
    }
    cfg.portrait |= args.portrait;
    Ok(cfg)
}

fn build_providers(args: &Args, cfg: &Config, session: &Session) -> Result<Providers, ArtefactError> {
    let providers = provider::make_providers(args.provider, cfg)?;
    Ok(match &args.save_transcripts {
        Some(dir) => {
            let transcript = Transcript::new(Path::new(dir), session.id, args.debug);
            if args.debug {
                eprintln!("debug: transcripts directory: {}", transcript.dir().display());
            }
            Recording::wrap(providers, transcript)
        }
        None => providers,
    })
}

async fn persona(session: &mut Session, providers: &Providers, cfg: &Config) -> Result<(), ArtefactError> {
    let text = ux::with_spinner("persona", session.generate_persona(providers, cfg)).await?;
    ux::show_text("PERSONA", &text);
    if cfg.portrait {
        let url = ux::with_spinner("portrait", session.generate_persona_portrait(providers, cfg)).await?;
        println!("  portrait: {}\n", url.underline());
    }
    Ok(())
}

async fn scenario(session: &mut Session, providers: &Providers, cfg: &Config) -> Result<(), ArtefactError> {
    let text = ux::with_spinner("scenario", session.generate_scenario(providers, cfg)).await?;
    ux::show_text("SCENARIO", &text);
    Ok(())
}

async fn storyboard(session: &mut Session, providers: &Providers, cfg: &Config) -> Result<(), ArtefactError> {
    let sb = ux::with_spinner("storyboard", session.generate_storyboard(providers, cfg)).await?;
    ux::show_storyboard(&sb);
    Ok(())
}

async fn user_stories(session: &mut Session, providers: &Providers, cfg: &Config) -> Result<(), ArtefactError> {
    let stories = ux::with_spinner("user stories", session.generate_user_stories(providers, cfg)).await?;
    ux::show_user_stories(&stories);
    Ok(())
}

#[derive(Clone, Copy)]
enum OneShot {
    Persona,
    Scenario,
    Storyboard,
    Stories,
}

async fn run_one_shot(action: OneShot, form: &FormArgs, args: &Args, cfg: &Config) -> anyhow::Result<()> {
    let mut session = Session::new(form.to_form());
    let providers = build_providers(args, cfg, &session)?;
    match action {
        OneShot::Persona => persona(&mut session, &providers, cfg).await?,
        OneShot::Scenario => scenario(&mut session, &providers, cfg).await?,
        OneShot::Storyboard => {
            scenario(&mut session, &providers, cfg).await?;
            storyboard(&mut session, &providers, cfg).await?;
        }
        OneShot::Stories => {
            scenario(&mut session, &providers, cfg).await?;
            user_stories(&mut session, &providers, cfg).await?;
        }
    }
    Ok(())
}

/// Ask for a key until one is given. `false` on EOF.
fn ask_for_key(cfg: &mut Config) -> bool {
    println!("{}", "Please add your OpenAI API key to continue.".yellow());
    println!("Get an OpenAI API key: https://platform.openai.com/account/api-keys");
    loop {
        match ux::ask("OpenAI API Key:") {
            Some(k) if !k.trim().is_empty() => {
                cfg.api_key = Some(k.trim().to_string());
                return true;
            }
            Some(_) => continue,
            None => return false,
        }
    }
}

async fn run_interactive(form: &FormArgs, args: &Args, mut cfg: Config) -> anyhow::Result<()> {
    let mut session = Session::new(form.to_form());
    println!("{}", "LLM-powered User Experience Design".bold());

    if session.form.is_empty() && !ux::edit_form(&mut session.form) {
        return Ok(());
    }
    if args.provider == ProviderKind::OpenAI && !cfg.has_api_key() && !ask_for_key(&mut cfg) {
        return Ok(());
    }
    let providers = build_providers(args, &cfg, &session)?;

    loop {
        ux::show_menu();
        let Some(line) = ux::ask(">") else { break };
        let Some(choice) = ux::parse_choice(&line) else {
            println!("unknown choice: {}", line.trim());
            continue;
        };
        let outcome = match choice {
            MenuChoice::Persona => persona(&mut session, &providers, &cfg).await,
            MenuChoice::Scenario => scenario(&mut session, &providers, &cfg).await,
            MenuChoice::Storyboard => storyboard(&mut session, &providers, &cfg).await,
            MenuChoice::UserStories => user_stories(&mut session, &providers, &cfg).await,
            MenuChoice::EditForm => {
                ux::edit_form(&mut session.form);
                Ok(())
            }
            MenuChoice::ShowSession => {
                ux::show_session(&session);
                Ok(())
            }
            MenuChoice::Clear => {
                session.reset();
                println!("{}", "Session cleared.".dimmed());
                ux::edit_form(&mut session.form);
                Ok(())
            }
            MenuChoice::Quit => break,
        };
        if let Err(e) = outcome {
            ux::show_error(&e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);
    let cfg = load_config(&args)?;
    tracing::debug!(model = %cfg.chat_model, image_model = %cfg.image_model, "config loaded");

    match &args.command {
        None => run_interactive(&FormArgs::default(), &args, cfg).await,
        Some(Command::Interactive(form)) => run_interactive(form, &args, cfg).await,
        Some(Command::Persona(form)) => run_one_shot(OneShot::Persona, form, &args, &cfg).await,
        Some(Command::Scenario(form)) => run_one_shot(OneShot::Scenario, form, &args, &cfg).await,
        Some(Command::Storyboard(form)) => run_one_shot(OneShot::Storyboard, form, &args, &cfg).await,
        Some(Command::Stories(form)) => run_one_shot(OneShot::Stories, form, &args, &cfg).await,
    }
}
