// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// One prompt in, one generated text out, through whichever
// `TextGenerator` the caller hands in (the watsonx client in
// production).
//
//   Step 1: Build the client       (Layer 6 - infra)
//   Step 2: Send the prompt        (Layer 6 - infra)
//   Step 3: Return the first text

use anyhow::{Context, Result};

use crate::domain::traits::TextGenerator;
use crate::infra::watsonx::{WatsonxClient, WatsonxConfig};

pub struct GenerateUseCase<G: TextGenerator> {
    generator: G,
}

impl GenerateUseCase<WatsonxClient> {
    /// Validate credentials and connect to the hosted endpoint
    pub fn connect(config: WatsonxConfig) -> Result<Self> {
        tracing::info!("Using {} at {}", config.model_id, config.url);
        let client = WatsonxClient::new(config).context("Cannot create the watsonx client")?;
        Ok(Self::new(client))
    }
}

impl<G: TextGenerator> GenerateUseCase<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn execute(&self, prompt: &str) -> Result<String> {
        self.generator
            .generate(prompt)
            .with_context(|| format!("Generation failed for prompt {:?}", prompt))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::watsonx::HostedError;

    struct Echo;

    impl TextGenerator for Echo {
        fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {prompt}"))
        }
    }

    #[test]
    fn test_returns_generator_text() {
        let uc = GenerateUseCase::new(Echo);
        assert_eq!(uc.execute("How to be happy?").unwrap(), "echo: How to be happy?");
    }

    #[test]
    fn test_missing_key_fails_before_any_request() {
        let cfg = WatsonxConfig {
            api_key:        String::new(),
            project_id:     "p".into(),
            url:            "http://127.0.0.1:9".into(),
            iam_url:        "http://127.0.0.1:9/identity/token".into(),
            model_id:       "m".into(),
            max_new_tokens: 10,
            timeout_secs:   1,
        };
        let err = GenerateUseCase::connect(cfg).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<HostedError>(),
            Some(HostedError::MissingCredential(_))
        ));
    }
}
