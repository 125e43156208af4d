// ============================================================
// Layer 6 — Hosted Inference Client (IBM watsonx.ai)
// ============================================================
// Sends one prompt to a foundation model hosted on watsonx.ai
// and returns the generated text.
//
// Two HTTPS calls per generation:
//
//   1. POST {iam_url}   (default https://iam.cloud.ibm.com/identity/token)
//        form: grant_type=urn:ibm:params:oauth:grant-type:apikey
//              apikey=<API key>
//      → { "access_token": "...", ... }
//
//   2. POST {url}/ml/v1/text/generation?version=2023-05-29
//        bearer: access_token
//        json:   { model_id, input, project_id,
//                  parameters: { max_new_tokens } }
//      → { "results": [ { "generated_text": "...", ... } ] }
//
// Failures are returned as they happen: no retry, no streaming.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::traits::TextGenerator;

pub const DEFAULT_URL:      &str = "https://eu-gb.ml.cloud.ibm.com";
pub const DEFAULT_MODEL_ID: &str = "meta-llama/llama-2-70b-chat";
pub const IAM_TOKEN_URL:    &str = "https://iam.cloud.ibm.com/identity/token";
pub const API_VERSION:      &str = "2023-05-29";

const APIKEY_GRANT: &str = "urn:ibm:params:oauth:grant-type:apikey";

#[derive(Error, Debug)]
pub enum HostedError {
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status:   u16,
        body:     String,
    },

    #[error("Generation response contained no results")]
    EmptyResults,
}

pub type HostedResult<T> = std::result::Result<T, HostedError>;

/// Everything needed to reach one model in one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatsonxConfig {
    #[serde(skip_serializing, default)]
    pub api_key:        String,
    pub project_id:     String,
    pub url:            String,
    #[serde(default = "default_iam_url")]
    pub iam_url:        String,
    pub model_id:       String,
    pub max_new_tokens: usize,
    pub timeout_secs:   u64,
}

fn default_iam_url() -> String {
    IAM_TOKEN_URL.to_string()
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IamToken {
    access_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub max_new_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model_id:   String,
    pub input:      String,
    pub project_id: String,
    pub parameters: GenerationParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub generated_text: String,
    #[serde(default)]
    pub generated_token_count: Option<u64>,
    #[serde(default)]
    pub input_token_count: Option<u64>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub results:  Vec<GenerationResult>,
}

impl GenerationResponse {
    /// Text of the first result, the only one the caller prints
    pub fn first_text(self) -> HostedResult<String> {
        self.results
            .into_iter()
            .next()
            .map(|r| r.generated_text)
            .ok_or(HostedError::EmptyResults)
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

pub struct WatsonxClient {
    config: WatsonxConfig,
    http:   reqwest::blocking::Client,
}

impl WatsonxClient {
    /// Validate credentials and build the HTTP client.
    pub fn new(config: WatsonxConfig) -> HostedResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(HostedError::MissingCredential("API key (set WATSONX_APIKEY or --api-key)"));
        }
        if config.project_id.trim().is_empty() {
            return Err(HostedError::MissingCredential("project id (set WATSONX_PROJECT_ID or --project-id)"));
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, http })
    }

    pub fn request_for(&self, prompt: &str) -> GenerationRequest {
        GenerationRequest {
            model_id:   self.config.model_id.clone(),
            input:      prompt.to_string(),
            project_id: self.config.project_id.clone(),
            parameters: GenerationParameters { max_new_tokens: self.config.max_new_tokens },
        }
    }

    pub fn generation_url(&self) -> String {
        format!(
            "{}/ml/v1/text/generation?version={}",
            self.config.url.trim_end_matches('/'),
            API_VERSION
        )
    }

    /// Exchange the API key for a short-lived bearer token
    fn access_token(&self) -> HostedResult<String> {
        let response = self
            .http
            .post(&self.config.iam_url)
            .header("Accept", "application/json")
            .form(&[("grant_type", APIKEY_GRANT), ("apikey", self.config.api_key.as_str())])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HostedError::Api { endpoint: "IAM token", status: status.as_u16(), body });
        }

        Ok(response.json::<IamToken>()?.access_token)
    }

    /// Send `prompt` and return the first generated text
    pub fn generate_text(&self, prompt: &str) -> HostedResult<String> {
        let token = self.access_token()?;
        tracing::debug!("Obtained IAM access token");

        let request = self.request_for(prompt);
        tracing::info!(
            "Requesting {} (max_new_tokens={})",
            request.model_id,
            request.parameters.max_new_tokens
        );

        let response = self
            .http
            .post(self.generation_url())
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HostedError::Api { endpoint: "text generation", status: status.as_u16(), body });
        }

        response.json::<GenerationResponse>()?.first_text()
    }
}

impl TextGenerator for WatsonxClient {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.generate_text(prompt)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    fn config(api_key: &str) -> WatsonxConfig {
        WatsonxConfig {
            api_key:        api_key.to_string(),
            project_id:     "proj-123".to_string(),
            url:            "https://eu-gb.ml.cloud.ibm.com/".to_string(),
            iam_url:        IAM_TOKEN_URL.to_string(),
            model_id:       DEFAULT_MODEL_ID.to_string(),
            max_new_tokens: 250,
            timeout_secs:   30,
        }
    }

    /// Request line, headers and body of one HTTP/1.1 request, lowercased
    fn read_request(stream: &TcpStream) -> String {
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
            let lower = line.to_ascii_lowercase();
            if let Some(v) = lower.strip_prefix("content-length:") {
                content_length = v.trim().parse().unwrap();
            }
            head.push_str(&lower);
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();
        format!("{head}\n{}", String::from_utf8_lossy(&body))
    }

    /// Answer one connection per canned (status, body), in order.
    /// The join handle yields every request that was received.
    fn serve(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in replies {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request(&stream));
                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            seen
        });
        (base, handle)
    }

    fn local_client(base: &str) -> WatsonxClient {
        WatsonxClient::new(WatsonxConfig {
            url:          base.to_string(),
            iam_url:      format!("{base}/identity/token"),
            timeout_secs: 5,
            ..config("key-abc")
        })
        .unwrap()
    }

    const TOKEN_OK: &str = r#"{"access_token":"tok-1","token_type":"Bearer","expires_in":3600}"#;

    #[test]
    fn test_rejected_api_key_reports_iam_status() {
        let (base, server) = serve(vec![(401, r#"{"errorMessage":"Provided API key could not be found."}"#)]);
        let err = local_client(&base).generate_text("hi").unwrap_err();

        match err {
            HostedError::Api { endpoint, status, body } => {
                assert_eq!(endpoint, "IAM token");
                assert_eq!(status, 401);
                assert!(body.contains("could not be found"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // No generation request after a failed token exchange
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[test]
    fn test_generation_failure_carries_status_and_body() {
        let (base, server) = serve(vec![(200, TOKEN_OK), (500, r#"{"errors":["model overloaded"]}"#)]);
        let err = local_client(&base).generate_text("hi").unwrap_err();

        match err {
            HostedError::Api { endpoint, status, body } => {
                assert_eq!(endpoint, "text generation");
                assert_eq!(status, 500);
                assert_eq!(body, r#"{"errors":["model overloaded"]}"#);
            }
            other => panic!("unexpected error: {other}"),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_token_exchange_then_generation() {
        let (base, server) = serve(vec![
            (200, TOKEN_OK),
            (200, r#"{"results":[{"generated_text":" Be kind."},{"generated_text":"ignored"}]}"#),
        ]);
        let text = local_client(&base).generate_text("How to be happy?").unwrap();
        assert_eq!(text, " Be kind.");

        let seen = server.join().unwrap();
        assert!(seen[0].starts_with("post /identity/token "));
        assert!(seen[0].contains("grant_type=urn%3aibm%3aparams%3aoauth%3agrant-type%3aapikey"));
        assert!(seen[0].contains("apikey=key-abc"));

        assert!(seen[1].starts_with("post /ml/v1/text/generation?version=2023-05-29 "));
        assert!(seen[1].contains("authorization: bearer tok-1"));
        assert!(seen[1].contains(r#""input":"how to be happy?""#));
    }

    #[test]
    fn test_iam_url_defaults_when_absent_from_json() {
        let json = r#"{"project_id":"p","url":"u","model_id":"m","max_new_tokens":1,"timeout_secs":1}"#;
        let cfg: WatsonxConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.iam_url, IAM_TOKEN_URL);
    }

    #[test]
    fn test_missing_api_key_rejected_before_network() {
        let err = WatsonxClient::new(config("  ")).err().unwrap();
        assert!(matches!(err, HostedError::MissingCredential(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let client = WatsonxClient::new(config("key")).unwrap();
        let body   = serde_json::to_value(client.request_for("How to be happy?")).unwrap();

        assert_eq!(body["model_id"], "meta-llama/llama-2-70b-chat");
        assert_eq!(body["input"], "How to be happy?");
        assert_eq!(body["project_id"], "proj-123");
        assert_eq!(body["parameters"]["max_new_tokens"], 250);
    }

    #[test]
    fn test_generation_url_strips_trailing_slash() {
        let client = WatsonxClient::new(config("key")).unwrap();
        assert_eq!(
            client.generation_url(),
            "https://eu-gb.ml.cloud.ibm.com/ml/v1/text/generation?version=2023-05-29"
        );
    }

    #[test]
    fn test_first_result_text() {
        let json = r#"{
            "model_id": "meta-llama/llama-2-70b-chat",
            "results": [
                {"generated_text": " Be kind.", "generated_token_count": 4,
                 "input_token_count": 6, "stop_reason": "eos_token"},
                {"generated_text": "ignored"}
            ]
        }"#;
        let response: GenerationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_text().unwrap(), " Be kind.");
    }

    #[test]
    fn test_empty_results_is_an_error() {
        let response: GenerationResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(matches!(response.first_text(), Err(HostedError::EmptyResults)));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let json = serde_json::to_string(&config("secret")).unwrap();
        assert!(!json.contains("secret"));
    }
}
