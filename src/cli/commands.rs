// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// One subcommand per pipeline, each with flags whose defaults
// reproduce the stock demo settings.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → usize, f64, PathBuf, enums)
//   - fallback to environment variables for credentials
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    caption_use_case::CaptionConfig,
    chat_use_case::ChatConfig,
    classification_use_case::ClassifyConfig,
    regression_use_case::RegressConfig,
};
use crate::infra::watsonx::{WatsonxConfig, DEFAULT_MODEL_ID, DEFAULT_URL, IAM_TOKEN_URL};
use crate::ml::backend::BackendType;
use crate::ml::captioner::CAPTION_MODEL_ID;
use crate::ml::chatbot::CHAT_MODEL_ID;

/// Counts that must be at least 1 (epochs, batch size)
fn positive(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0)  => Err("must be at least 1".to_string()),
        Ok(n)  => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// The five top-level subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one prompt to a hosted watsonx.ai model
    Generate(GenerateArgs),

    /// Chat with a local BlenderBot model (Ctrl-D to quit)
    Chat(ChatArgs),

    /// Caption an image with a local BLIP model
    Caption(CaptionArgs),

    /// Train and evaluate the MNIST digit classifier
    Classify(ClassifyArgs),

    /// Train and evaluate the Boston housing price regressor
    Regress(RegressArgs),
}

// ─── generate ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Text sent to the model
    #[arg(long, default_value = "How to be happy?")]
    pub prompt: String,

    /// IBM Cloud API key
    #[arg(long, env = "WATSONX_APIKEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// watsonx.ai project the request is billed to
    #[arg(long, env = "WATSONX_PROJECT_ID", default_value = "e1fedc37-01a2-43bb-a221-47452ae6051")]
    pub project_id: String,

    /// Regional service endpoint
    #[arg(long, env = "WATSONX_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// IAM endpoint that exchanges the API key for a bearer token
    #[arg(long, env = "WATSONX_IAM_URL", default_value = IAM_TOKEN_URL)]
    pub iam_url: String,

    /// Foundation model to query
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Upper bound on generated tokens
    #[arg(long, default_value_t = 250)]
    pub max_new_tokens: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

impl From<GenerateArgs> for WatsonxConfig {
    fn from(a: GenerateArgs) -> Self {
        WatsonxConfig {
            api_key:        a.api_key,
            project_id:     a.project_id,
            url:            a.url,
            iam_url:        a.iam_url,
            model_id:       a.model_id,
            max_new_tokens: a.max_new_tokens,
            timeout_secs:   a.timeout_secs,
        }
    }
}

// ─── chat ─────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Hugging Face model id
    #[arg(long, default_value = CHAT_MODEL_ID)]
    pub model_id: String,

    /// Branch, tag or commit of the model repo
    #[arg(long, default_value = "main")]
    pub revision: String,
}

impl From<ChatArgs> for ChatConfig {
    fn from(a: ChatArgs) -> Self {
        ChatConfig { model_id: a.model_id, revision: a.revision }
    }
}

// ─── caption ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Image to describe (any format the image crate reads)
    #[arg(long, default_value = "google.png")]
    pub image: PathBuf,

    /// Text the caption continues
    #[arg(long, default_value = "the image of")]
    pub prompt: String,

    /// Maximum caption length in tokens, prompt included
    #[arg(long, default_value_t = 50)]
    pub max_length: usize,

    /// Hugging Face model id
    #[arg(long, default_value = CAPTION_MODEL_ID)]
    pub model_id: String,

    /// Branch, tag or commit of the model repo
    #[arg(long, default_value = "main")]
    pub revision: String,
}

impl From<CaptionArgs> for CaptionConfig {
    fn from(a: CaptionArgs) -> Self {
        CaptionConfig {
            image_path: a.image,
            prompt:     a.prompt,
            max_length: a.max_length,
            model_id:   a.model_id,
            revision:   a.revision,
        }
    }
}

// ─── classify ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Directory for run_config.json, metrics.csv and plots
    #[arg(long, default_value = "runs/classification")]
    pub output_dir: String,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10, value_parser = positive)]
    pub epochs: usize,

    /// Samples per gradient step
    #[arg(long, default_value_t = 128, value_parser = positive)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Fraction of the training set (taken from its end) held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub validation_split: f64,

    /// Seed for the per-epoch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Tensor backend
    #[arg(long, value_enum, default_value_t = BackendType::Wgpu)]
    pub backend: BackendType,
}

impl From<ClassifyArgs> for ClassifyConfig {
    fn from(a: ClassifyArgs) -> Self {
        ClassifyConfig {
            output_dir:       a.output_dir,
            epochs:           a.epochs,
            batch_size:       a.batch_size,
            learning_rate:    a.lr,
            validation_split: a.validation_split,
            seed:             a.seed,
            backend:          a.backend,
        }
    }
}

// ─── regress ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct RegressArgs {
    /// Where boston_housing.npz is cached
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory for run_config.json, metrics.csv and plots
    #[arg(long, default_value = "runs/regression")]
    pub output_dir: String,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 100, value_parser = positive)]
    pub epochs: usize,

    /// Samples per gradient step
    #[arg(long, default_value_t = 16, value_parser = positive)]
    pub batch_size: usize,

    /// RMSprop learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Fraction of the training set (taken from its end) held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub validation_split: f64,

    /// Seed for the per-epoch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Tensor backend
    #[arg(long, value_enum, default_value_t = BackendType::Wgpu)]
    pub backend: BackendType,
}

impl From<RegressArgs> for RegressConfig {
    fn from(a: RegressArgs) -> Self {
        RegressConfig {
            data_dir:         a.data_dir,
            output_dir:       a.output_dir,
            epochs:           a.epochs,
            batch_size:       a.batch_size,
            learning_rate:    a.lr,
            validation_split: a.validation_split,
            seed:             a.seed,
            backend:          a.backend,
        }
    }
}
