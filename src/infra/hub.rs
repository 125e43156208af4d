// ============================================================
// Layer 6 — Model Hub Store
// ============================================================
// Fetches pretrained model files (config, tokenizer, weights)
// from the Hugging Face hub through hf-hub's synchronous API.
//
// Files are downloaded on first use into the shared hub cache
// (~/.cache/huggingface/hub) and served from there afterwards,
// so the second run of `chat` or `caption` works offline.

use anyhow::{Context, Result};
use hf_hub::{api::sync::{Api, ApiRepo}, Repo, RepoType};
use std::path::PathBuf;
use tokenizers::Tokenizer;

pub struct HubStore {
    model_id: String,
    repo:     ApiRepo,
}

impl HubStore {
    /// Open `model_id` at `revision` (branch, tag or commit)
    pub fn new(model_id: impl Into<String>, revision: impl Into<String>) -> Result<Self> {
        let model_id = model_id.into();
        let api = Api::new().context("Cannot initialise the Hugging Face hub client")?;
        let repo = api.repo(Repo::with_revision(model_id.clone(), RepoType::Model, revision.into()));
        Ok(Self { model_id, repo })
    }

    /// Local path of `file`, downloading it if needed
    pub fn get(&self, file: &str) -> Result<PathBuf> {
        tracing::debug!("Resolving {}/{}", self.model_id, file);
        self.repo
            .get(file)
            .with_context(|| format!("Cannot fetch '{}' from '{}'", file, self.model_id))
    }

    /// Local path of `file`, or None when the repo does not provide it
    pub fn get_optional(&self, file: &str) -> Option<PathBuf> {
        match self.repo.get(file) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!("'{}' not available in '{}': {}", file, self.model_id, e);
                None
            }
        }
    }

    /// First of `candidates` that the repo provides, with its name
    pub fn first_available(&self, candidates: &[&str]) -> Result<(String, PathBuf)> {
        candidates
            .iter()
            .find_map(|name| self.get_optional(name).map(|path| (name.to_string(), path)))
            .ok_or_else(|| anyhow::anyhow!(
                "'{}' provides none of {:?}", self.model_id, candidates
            ))
    }

    /// Load the repo's `tokenizer.json`
    pub fn tokenizer(&self) -> Result<Tokenizer> {
        let path = self.get("tokenizer.json")?;
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}
