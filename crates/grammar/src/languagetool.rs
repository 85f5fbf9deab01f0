//! Corrector backed by a LanguageTool server's HTTP API.

use async_trait::async_trait;
use deckfix_core::{Corrector, Error, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::matches::{apply_matches, RuleMatch};

/// Where the LanguageTool server lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct LanguageToolConfig {
    /// Base URL, e.g. `http://localhost:8081`.
    pub base_url: String,
    /// Language code passed with every check, e.g. `en-US`.
    pub language: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for LanguageToolConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            language: "en-US".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<RuleMatch>,
}

/// Checks text with LanguageTool and applies the first suggestion of every
/// match.
///
/// The HTTP client is pooled and safe to share between requests.
#[derive(Debug, Clone)]
pub struct LanguageToolCorrector {
    client: reqwest::Client,
    config: LanguageToolConfig,
}

impl LanguageToolCorrector {
    pub fn new(config: LanguageToolConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::CorrectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LanguageToolConfig {
        &self.config
    }

    fn check_url(&self) -> String {
        format!("{}/v2/check", self.config.base_url.trim_end_matches('/'))
    }

    /// Ask the server for rule matches in `text`.
    pub async fn check(&self, text: &str) -> Result<Vec<RuleMatch>> {
        let url = self.check_url();
        let form = [("text", text), ("language", self.config.language.as_str())];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::CorrectionError(format!(
                        "LanguageTool timed out after {}s at {}",
                        self.config.timeout.as_secs(),
                        url
                    ))
                } else {
                    Error::CorrectionError(format!("LanguageTool request to {} failed: {}", url, e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::CorrectionError(format!("Failed to read LanguageTool reply: {}", e)))?;

        if !status.is_success() {
            return Err(Error::CorrectionError(format!(
                "LanguageTool returned HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        parse_check_response(&body)
    }
}

fn parse_check_response(body: &str) -> Result<Vec<RuleMatch>> {
    let parsed: CheckResponse = serde_json::from_str(body)
        .map_err(|e| Error::CorrectionError(format!("Unexpected LanguageTool reply: {}", e)))?;
    Ok(parsed.matches)
}

#[async_trait]
impl Corrector for LanguageToolCorrector {
    async fn correct(&self, text: &str) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let matches = self.check(text).await?;
        log::debug!("LanguageTool found {} issue(s) in {:?}", matches.len(), text);
        Ok(apply_matches(text, &matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_url_joins_cleanly() {
        let corrector = LanguageToolCorrector::new(LanguageToolConfig {
            base_url: "http://lt.local:8010/".to_string(),
            ..LanguageToolConfig::default()
        })
        .unwrap();
        assert_eq!(corrector.check_url(), "http://lt.local:8010/v2/check");
    }

    #[test]
    fn test_parse_check_response() {
        let body = r#"{"software":{"name":"LanguageTool"},"language":{"code":"en-US"},"matches":[{"message":"Possible spelling mistake found.","offset":0,"length":4,"replacements":[{"value":"Hello"}],"rule":{"id":"MORFOLOGIK_RULE_EN_US"}}]}"#;
        let matches = parse_check_response(body).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(apply_matches("Helo there", &matches), "Hello there");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_check_response("<html>502</html>").unwrap_err();
        assert!(matches!(err, Error::CorrectionError(_)));
    }

    #[tokio::test]
    async fn test_empty_text_skips_the_server() {
        // Nothing listens here; an attempted request would fail.
        let corrector = LanguageToolCorrector::new(LanguageToolConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..LanguageToolConfig::default()
        })
        .unwrap();
        assert_eq!(corrector.correct("").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_correction_error() {
        let corrector = LanguageToolCorrector::new(LanguageToolConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..LanguageToolConfig::default()
        })
        .unwrap();
        let err = corrector.correct("Helo").await.unwrap_err();
        assert!(err.to_string().contains("LanguageTool"));
    }
}
