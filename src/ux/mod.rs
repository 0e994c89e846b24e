use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::errors::ArtefactError;
use crate::session::{FormState, Session, UserStories};
use crate::wire::Storyboard;

/// Run `fut` behind a "Generating.." spinner.
pub async fn with_spinner<F: Future>(label: &str, fut: F) -> F::Output {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Generating {label}.."));
    pb.enable_steady_tick(Duration::from_millis(100));
    let out = fut.await;
    pb.finish_and_clear();
    out
}

pub fn header(title: &str) {
    println!("\n{}", format!("=== {title} ===").bold());
}

pub fn show_error(err: &ArtefactError) {
    eprintln!("{} {}", "error:".red().bold(), err);
}

pub fn show_text(title: &str, text: &str) {
    header(title);
    println!("{}\n", text.trim());
}

pub fn show_user_stories(stories: &UserStories) {
    header("USER STORIES");
    match stories.items() {
        Some(items) => {
            for (i, s) in items.iter().enumerate() {
                println!("{}. {}", i + 1, s);
            }
            println!();
        }
        None => println!("{}\n", stories.text.trim()),
    }
}

/// Storyboard grid width: three columns when the frames divide evenly by
/// three, otherwise four.
pub fn storyboard_columns(frames: usize) -> usize {
    if frames % 3 == 0 { 3 } else { 4 }
}

/// Frame indices laid out row by row.
pub fn storyboard_rows(frames: usize) -> Vec<Vec<usize>> {
    let cols = storyboard_columns(frames);
    (0..frames)
        .collect::<Vec<_>>()
        .chunks(cols)
        .map(|c| c.to_vec())
        .collect()
}

pub fn show_storyboard(sb: &Storyboard) {
    header("STORYBOARD");
    if sb.items.is_empty() {
        println!("(no frames)");
    }
    for (r, row) in storyboard_rows(sb.items.len()).iter().enumerate() {
        println!("{}", format!("-- row {} --", r + 1).dimmed());
        for &i in row {
            let item = &sb.items[i];
            println!("  {} {}", format!("[{}]", i + 1).cyan().bold(), item.description);
            println!("      {}", item.image_url.underline());
        }
    }
    if !sb.failures.is_empty() {
        println!("\n{}", "Frames that could not be generated:".red().bold());
        for f in &sb.failures {
            println!("  [{}] {} ({})", f.index + 1, f.description, f.reason.red());
        }
        println!("{}", "Trigger the storyboard again to retry them.".dimmed());
    }
    println!();
}

pub fn show_form(form: &FormState) {
    header("APP AND USER DETAILS");
    for (name, value) in form.fields() {
        let shown = if value.trim().is_empty() { "(empty)".dimmed().to_string() } else { value.to_string() };
        println!("  {:<12} {}", format!("{name}:").bold(), shown);
    }
}

pub fn show_session(session: &Session) {
    show_form(&session.form);
    if let Some(p) = &session.persona {
        show_text("PERSONA", p);
    }
    if let Some(url) = &session.persona_portrait {
        println!("  portrait: {}", url.underline());
    }
    if let Some(s) = &session.scenario {
        show_text("SCENARIO", s);
    }
    if let Some(sb) = &session.storyboard {
        show_storyboard(sb);
    }
    if let Some(us) = &session.user_stories {
        show_user_stories(us);
    }
    let (hits, misses) = session.cache_stats();
    let stored = session.cached_artifacts();
    println!("{}", format!("cache: {stored} artifacts, {hits} hits, {misses} misses").dimmed());
}

/// Read one line from stdin after printing `prompt`. `None` on EOF.
pub fn ask(prompt: &str) -> Option<String> {
    print!("{} ", prompt.bold());
    let _ = io::stdout().flush();
    let mut s = String::new();
    match io::stdin().lock().read_line(&mut s) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(s.trim_end_matches(['\r', '\n']).to_string()),
    }
}

/// Answer that empties a field.
pub const CLEAR_FIELD: &str = "-";

/// Apply one answer to the form: blank keeps the current value and
/// [`CLEAR_FIELD`] empties it.
pub fn apply_answer(form: &mut FormState, name: &str, answer: &str) {
    match answer.trim() {
        "" => {}
        CLEAR_FIELD => {
            form.set(name, "");
        }
        value => {
            form.set(name, value);
        }
    }
}

/// Ask every form question; an empty answer keeps the current value and `-`
/// clears it.
pub fn edit_form(form: &mut FormState) -> bool {
    for name in FormState::FIELDS {
        let current = form.get(name).unwrap_or("").to_string();
        let prompt = if current.is_empty() {
            FormState::question(name).to_string()
        } else {
            format!("{} [{}] ('{CLEAR_FIELD}' clears)", FormState::question(name), current)
        };
        match ask(&prompt) {
            Some(answer) => apply_answer(form, name, &answer),
            None => return false,
        }
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Persona,
    Scenario,
    Storyboard,
    UserStories,
    EditForm,
    ShowSession,
    Clear,
    Quit,
}

pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    match input.trim().to_lowercase().as_str() {
        "p" | "persona" => Some(MenuChoice::Persona),
        "s" | "scenario" => Some(MenuChoice::Scenario),
        "b" | "storyboard" => Some(MenuChoice::Storyboard),
        "u" | "stories" | "user stories" => Some(MenuChoice::UserStories),
        "e" | "edit" => Some(MenuChoice::EditForm),
        "v" | "view" => Some(MenuChoice::ShowSession),
        "c" | "clear" => Some(MenuChoice::Clear),
        "q" | "quit" | "exit" => Some(MenuChoice::Quit),
        _ => None,
    }
}

pub fn show_menu() {
    println!(
        "{}ersona  {}cenario  story{}oard  {}ser stories  {}dit form  {}iew session  {}lear data  {}uit",
        "[p]".green().bold(),
        "[s]".green().bold(),
        "[b]".green().bold(),
        "[u]".green().bold(),
        "[e]".yellow().bold(),
        "[v]".yellow().bold(),
        "[c]".red().bold(),
        "[q]".bold(),
    );
}
