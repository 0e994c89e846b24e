use async_trait::async_trait;
use chrono::Utc;
use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::Result;
use crate::provider::{ChatProvider, ImageProvider, Providers};
use crate::wire::{ChatRequest, ImageRequest};

pub struct SavedPaths {
    pub request: PathBuf,
    pub response: PathBuf,
}

/// Writes each collaborator exchange as a pair of JSON files under
/// `<root>/<session>/`.
pub struct Transcript {
    dir: PathBuf,
    seq: AtomicUsize,
    debug: bool,
}

fn session_dir(root: &Path, session: Uuid) -> PathBuf {
    root.join(session.to_string())
}

#[derive(Serialize)]
struct Failure<'a> {
    error: &'a str,
}

impl Transcript {
    pub fn new(root: &Path, session: Uuid, debug: bool) -> Self {
        Self { dir: session_dir(root, session), seq: AtomicUsize::new(0), debug }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_stage<Req: Serialize, Resp: Serialize>(
        &self,
        stage: &str,
        req: &Req,
        resp: &Resp,
    ) -> anyhow::Result<SavedPaths> {
        fs::create_dir_all(&self.dir)?;
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let base = format!("{n:03}-{stamp}-{stage}");

        let request = self.dir.join(format!("{base}.request.json"));
        fs::write(&request, to_string_pretty(req)?)?;
        let response = self.dir.join(format!("{base}.response.json"));
        fs::write(&response, to_string_pretty(resp)?)?;

        let saved = SavedPaths { request, response };
        if self.debug {
            print_saved_paths(stage, &saved);
        }
        Ok(saved)
    }

    fn record<Req: Serialize, T: Serialize>(&self, stage: &str, req: &Req, res: &Result<T>) {
        let outcome = match res {
            Ok(v) => self.save_stage(stage, req, v),
            Err(e) => self.save_stage(stage, req, &Failure { error: &e.to_string() }),
        };
        if let Err(e) = outcome {
            tracing::warn!(stage, error = %e, "failed to save transcript");
        }
    }
}

pub fn print_saved_paths(stage: &str, saved: &SavedPaths) {
    eprintln!("debug[{stage}]: request saved at: {}", saved.request.display());
    eprintln!("debug[{stage}]: response saved at: {}", saved.response.display());
}

/// Provider wrapper that saves every exchange to a transcript.
pub struct Recording {
    inner: Providers,
    transcript: Arc<Transcript>,
}

impl Recording {
    pub fn wrap(inner: Providers, transcript: Transcript) -> Providers {
        let rec = Recording { inner, transcript: Arc::new(transcript) };
        Providers::new(rec)
    }
}

#[async_trait]
impl ChatProvider for Recording {
    async fn complete(&self, req: &ChatRequest) -> Result<String> {
        let res = self.inner.chat.complete(req).await;
        self.transcript.record("chat", req, &res);
        res
    }
}

#[async_trait]
impl ImageProvider for Recording {
    async fn generate(&self, req: &ImageRequest) -> Result<Vec<String>> {
        let res = self.inner.image.generate(req).await;
        self.transcript.record("image", req, &res);
        res
    }
}
