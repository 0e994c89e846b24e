//! Per-session state and the four artifact pipelines.
//!
//! Every action takes `&mut Session` and either completes or returns an error
//! before touching any field, so a failed action leaves the previous
//! artifacts in place.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::{ArtifactCache, CacheKey};
use crate::config::{Config, StoryboardMode};
use crate::errors::{ArtefactError, Result};
use crate::extract::extract_numbered_list;
use crate::fanout::fan_out;
use crate::provider::Providers;
use crate::retry::retry_rate_limited;
use crate::wire::{ChatRequest, FailedFrame, ImageRequest, Storyboard, StoryboardItem};

/// Fields that must be filled before persona or scenario generation.
pub const REQUIRED_FIELDS: [&str; 3] = ["user", "problem", "application"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    pub user: String,
    pub problem: String,
    pub application: String,
    pub context: String,
}

impl FormState {
    pub const FIELDS: [&'static str; 4] = ["user", "problem", "application", "context"];

    /// Question shown for each field.
    pub fn question(name: &str) -> &'static str {
        match name {
            "user" => "Who is the main user of the application?",
            "problem" => "What problem does the application solve?",
            "application" => "How does the application do it?",
            "context" => "In what context?",
            _ => "",
        }
    }

    pub fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("user", self.user.as_str()),
            ("problem", self.problem.as_str()),
            ("application", self.application.as_str()),
            ("context", self.context.as_str()),
        ]
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields().into_iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Returns false for an unknown field name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        let slot = match name {
            "user" => &mut self.user,
            "problem" => &mut self.problem,
            "application" | "app" => &mut self.application,
            "context" => &mut self.context,
            _ => return false,
        };
        *slot = value.into();
        true
    }

    /// First empty field among `names`, as a `MissingInput` error.
    pub fn require(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if self.get(name).map(str::trim).unwrap_or("").is_empty() {
                return Err(ArtefactError::MissingInput(describe_field(name).into()));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.trim().is_empty())
    }
}

fn describe_field(name: &str) -> &'static str {
    match name {
        "user" => "user description",
        "problem" => "a description of the problem",
        "application" => "application description",
        "context" => "the context of use",
        _ => "a value",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStories {
    pub text: String,
}

impl UserStories {
    /// Individual stories, when the model answered with a numbered list.
    pub fn items(&self) -> Option<Vec<String>> {
        extract_numbered_list(&self.text).ok()
    }
}

#[derive(Debug, Clone)]
enum Cached {
    Text(String),
    Storyboard(Storyboard),
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub form: FormState,
    pub persona: Option<String>,
    pub persona_portrait: Option<String>,
    pub scenario: Option<String>,
    pub storyboard: Option<Storyboard>,
    pub user_stories: Option<UserStories>,
    cache: ArtifactCache<Cached>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(FormState::default())
    }
}

impl Session {
    pub fn new(form: FormState) -> Self {
        Self {
            id: Uuid::new_v4(),
            form,
            persona: None,
            persona_portrait: None,
            scenario: None,
            storyboard: None,
            user_stories: None,
            cache: ArtifactCache::default(),
        }
    }

    /// Clear the form, every artifact and the cache.
    pub fn reset(&mut self) {
        self.form = FormState::default();
        self.persona = None;
        self.persona_portrait = None;
        self.scenario = None;
        self.storyboard = None;
        self.user_stories = None;
        self.cache.clear();
        tracing::info!(session = %self.id, "session cleared");
    }

    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    /// Number of artifacts currently memoized.
    pub fn cached_artifacts(&self) -> usize {
        self.cache.len()
    }

    fn form_key(&self, artifact: &str, extra: &[(&str, &str)]) -> CacheKey {
        CacheKey::derive(
            self.form
                .fields()
                .into_iter()
                .chain([("artifact", artifact)])
                .chain(extra.iter().copied()),
        )
    }

    async fn cached_chat(
        &mut self,
        key: CacheKey,
        providers: &Providers,
        req: ChatRequest,
    ) -> Result<String> {
        if let Some(Cached::Text(t)) = self.cache.get(&key) {
            return Ok(t);
        }
        let text = providers.chat.complete(&req).await?;
        self.cache.insert(key, Cached::Text(text.clone()));
        Ok(text)
    }

    pub async fn generate_persona(&mut self, providers: &Providers, cfg: &Config) -> Result<String> {
        self.form.require(&REQUIRED_FIELDS)?;
        let p = &cfg.prompts;
        let key = self.form_key(
            "persona",
            &[
                ("system", p.system_use_cases.as_str()),
                ("template", p.persona.as_str()),
                ("model", cfg.chat_model.as_str()),
            ],
        );
        let req = ChatRequest::new(&cfg.chat_model, &p.system_use_cases, p.persona_prompt(&self.form));
        let persona = self.cached_chat(key, providers, req).await?;
        if self.persona.as_deref() != Some(persona.as_str()) {
            self.persona_portrait = None;
        }
        self.persona = Some(persona.clone());
        Ok(persona)
    }

    /// Illustrate the current persona with one generated image.
    pub async fn generate_persona_portrait(
        &mut self,
        providers: &Providers,
        cfg: &Config,
    ) -> Result<String> {
        let persona = non_empty(&self.persona)
            .ok_or_else(|| ArtefactError::MissingInput("a persona (generate the persona first)".into()))?;
        let key = CacheKey::derive([
            ("artifact", "portrait"),
            ("persona", persona.as_str()),
            ("template", cfg.prompts.persona_portrait.as_str()),
            ("image_model", cfg.image_model.as_str()),
            ("size", cfg.image_size.as_str()),
            ("quality", cfg.image_quality.as_str()),
        ]);
        let url = match self.cache.get(&key) {
            Some(Cached::Text(url)) => url,
            _ => {
                let url = generate_image(providers, cfg, cfg.prompts.portrait_prompt(&persona)).await?;
                self.cache.insert(key, Cached::Text(url.clone()));
                url
            }
        };
        self.persona_portrait = Some(url.clone());
        Ok(url)
    }

    pub async fn generate_scenario(&mut self, providers: &Providers, cfg: &Config) -> Result<String> {
        self.form.require(&REQUIRED_FIELDS)?;
        let p = &cfg.prompts;
        let key = self.form_key(
            "scenario",
            &[
                ("system", p.system_use_cases.as_str()),
                ("template", p.scenario.as_str()),
                ("model", cfg.chat_model.as_str()),
            ],
        );
        let req = ChatRequest::new(&cfg.chat_model, &p.system_use_cases, p.scenario_prompt(&self.form));
        let scenario = self.cached_chat(key, providers, req).await?;
        self.scenario = Some(scenario.clone());
        Ok(scenario)
    }

    pub async fn generate_user_stories(
        &mut self,
        providers: &Providers,
        cfg: &Config,
    ) -> Result<UserStories> {
        let scenario = self.require_scenario()?;
        let p = &cfg.prompts;
        let key = self.form_key(
            "user_stories",
            &[
                ("scenario", scenario.as_str()),
                ("system", p.system_user_stories.as_str()),
                ("template", p.user_stories.as_str()),
                ("model", cfg.chat_model.as_str()),
            ],
        );
        let req = ChatRequest::new(
            &cfg.chat_model,
            &p.system_user_stories,
            p.user_stories_prompt(&self.form, &scenario),
        );
        let text = self.cached_chat(key, providers, req).await?;
        let stories = UserStories { text };
        self.user_stories = Some(stories.clone());
        Ok(stories)
    }

    /// Extract the frames, then request one image per frame in order.
    ///
    /// An extraction failure stops here before any image request. Frames that
    /// fail after retries are reported in `Storyboard::failures`; if no frame
    /// succeeds the first failure is returned instead. Incomplete storyboards
    /// are not cached.
    pub async fn generate_storyboard(
        &mut self,
        providers: &Providers,
        cfg: &Config,
    ) -> Result<Storyboard> {
        let scenario = self.require_scenario()?;
        let p = &cfg.prompts;
        let key = CacheKey::derive([
            ("artifact", "storyboard"),
            ("scenario", scenario.as_str()),
            ("mode", cfg.storyboard_mode.as_str()),
            ("system", p.system_use_cases.as_str()),
            ("image_prompts", p.image_prompts.as_str()),
            ("style", p.storyboard_style.as_str()),
            ("model", cfg.chat_model.as_str()),
            ("image_model", cfg.image_model.as_str()),
            ("size", cfg.image_size.as_str()),
            ("quality", cfg.image_quality.as_str()),
        ]);
        if let Some(Cached::Storyboard(sb)) = self.cache.get(&key) {
            self.storyboard = Some(sb.clone());
            return Ok(sb);
        }

        // (caption, image prompt) per frame
        let frames: Vec<(String, String)> = match cfg.storyboard_mode {
            StoryboardMode::DerivedPrompts => {
                let req = ChatRequest::new(
                    &cfg.chat_model,
                    &p.system_use_cases,
                    p.image_prompts_prompt(&scenario),
                );
                let reply = providers.chat.complete(&req).await?;
                extract_numbered_list(&reply)?
                    .into_iter()
                    .map(|s| (s.clone(), s))
                    .collect()
            }
            StoryboardMode::ScenarioSteps => extract_numbered_list(&scenario)?
                .into_iter()
                .map(|s| {
                    let prompt = p.styled_step(&s);
                    (s, prompt)
                })
                .collect(),
        };
        tracing::info!(frames = frames.len(), mode = cfg.storyboard_mode.as_str(), "generating storyboard");

        let results = fan_out(&frames, |_, (_, prompt)| {
            generate_image(providers, cfg, prompt.clone())
        })
        .await;

        let mut storyboard = Storyboard::default();
        let mut first_err = None;
        for (index, ((caption, _), res)) in frames.into_iter().zip(results).enumerate() {
            match res {
                Ok(image_url) => storyboard.items.push(StoryboardItem { description: caption, image_url }),
                Err(e) => {
                    storyboard.failures.push(FailedFrame {
                        index,
                        description: caption,
                        reason: e.to_string(),
                    });
                    first_err.get_or_insert(e);
                }
            }
        }

        if storyboard.items.is_empty() {
            if let Some(e) = first_err {
                return Err(e);
            }
        }
        if storyboard.is_complete() {
            self.cache.insert(key, Cached::Storyboard(storyboard.clone()));
        }
        self.storyboard = Some(storyboard.clone());
        Ok(storyboard)
    }

    fn require_scenario(&self) -> Result<String> {
        non_empty(&self.scenario)
            .ok_or_else(|| ArtefactError::MissingInput("a scenario (generate the scenario first)".into()))
    }
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref().filter(|s| !s.trim().is_empty()).map(str::to_string)
}

/// One image through the rate-limit retry wrapper; returns the first URL.
async fn generate_image(providers: &Providers, cfg: &Config, prompt: String) -> Result<String> {
    let req = ImageRequest {
        model: cfg.image_model.clone(),
        prompt,
        size: cfg.image_size.clone(),
        quality: cfg.image_quality.clone(),
        n: 1,
    };
    let urls = retry_rate_limited(&cfg.retry, || providers.image.generate(&req)).await?;
    urls.into_iter()
        .next()
        .ok_or_else(|| ArtefactError::InvalidResponse("no image URL returned".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use std::sync::Arc;

    fn filled() -> FormState {
        FormState {
            user: "a first-year student".into(),
            problem: "finding a quiet place to study".into(),
            application: "a live map of free library seats".into(),
            context: "on campus, on a phone".into(),
        }
    }

    #[test]
    fn require_reports_first_missing_field() {
        let mut form = filled();
        form.problem = "  ".into();
        let err = form.require(&REQUIRED_FIELDS).unwrap_err();
        assert!(matches!(err, ArtefactError::MissingInput(ref f) if f.contains("problem")));
    }

    #[test]
    fn context_is_optional() {
        let mut form = filled();
        form.context.clear();
        assert!(form.require(&REQUIRED_FIELDS).is_ok());
    }

    #[test]
    fn set_accepts_known_fields_only() {
        let mut form = FormState::default();
        assert!(form.set("app", "seat map"));
        assert_eq!(form.application, "seat map");
        assert!(!form.set("budget", "none"));
    }

    #[tokio::test]
    async fn missing_input_makes_no_call() {
        let mock = Arc::new(MockProvider::default());
        let providers = Providers { chat: mock.clone(), image: mock.clone() };
        let mut session = Session::default();
        let err = session.generate_scenario(&providers, &Config::default()).await.unwrap_err();
        assert!(matches!(err, ArtefactError::MissingInput(_)));
        assert_eq!(mock.chat_calls(), 0);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let providers = Providers::new(MockProvider::default());
        let cfg = Config::default();
        let mut session = Session::new(filled());
        session.generate_scenario(&providers, &cfg).await.unwrap();
        assert_eq!(session.cached_artifacts(), 1);
        session.reset();
        assert!(session.form.is_empty());
        assert!(session.scenario.is_none());
        assert_eq!(session.cache_stats(), (0, 0));
        assert_eq!(session.cached_artifacts(), 0);
    }

    #[test]
    fn user_stories_items_are_optional() {
        let s = UserStories { text: "1. As a student, I want X, so that Y.".into() };
        assert_eq!(s.items().unwrap().len(), 1);
        assert!(UserStories { text: "no list".into() }.items().is_none());
    }
}
