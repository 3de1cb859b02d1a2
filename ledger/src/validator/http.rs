//! HTTP-based LLM validator client.
//!
//! Talks to an external LLM-mediation service over a blocking `reqwest`
//! client. Transient failures are retried with bounded exponential
//! backoff; once the retry budget is exhausted the entry is rejected
//! with [`ErrorKind::ValidatorUnavailable`] rather than left hanging.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::contract::ContractTerms;
use crate::error::ErrorKind;
use crate::types::Decision;

use super::{DecisionRequest, ValidationRecord, ValidatorPort};

/// Request payload sent to the LLM-mediation service.
#[derive(Debug, Serialize)]
struct DecideRequest<'a> {
    content: &'a str,
    intent: &'a str,
    author: &'a str,
}

/// Response payload returned by the LLM-mediation service.
///
/// `decision` is parsed strictly against the closed `Decision` enum;
/// unrecognized fields are dropped by `serde` during deserialization and
/// unrecognized `decision` strings surface as `ErrorKind::ValidatorProtocol`.
#[derive(Debug, Deserialize)]
struct DecideResponse {
    decision: String,
    #[serde(default)]
    paraphrase: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    model_version: String,
}

/// Request payload sent to the extraction endpoint.
#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    content: &'a str,
}

/// Response payload for contract-term extraction. Every field optional:
/// the service may only have confidence in a subset of the terms.
#[derive(Debug, Deserialize, Default)]
struct ExtractResponse {
    #[serde(default)]
    parties: Vec<String>,
    #[serde(default)]
    obligations: Vec<String>,
    #[serde(default)]
    conditions: Vec<String>,
    #[serde(default)]
    timeline: Option<String>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
}

fn parse_decision(raw: &str) -> Option<Decision> {
    match raw {
        "VALID" => Some(Decision::Valid),
        "NEEDS_CLARIFICATION" => Some(Decision::NeedsClarification),
        "INVALID" => Some(Decision::Invalid),
        _ => None,
    }
}

/// HTTP-based LLM validator. Thread-safe (`Send + Sync`); shares one
/// underlying connection pool across callers.
pub struct HttpLlmValidator {
    base_url: String,
    client: Client,
    max_retries: u32,
    backoff_base: Duration,
    validator_id: String,
}

impl HttpLlmValidator {
    /// Constructs a new client pointing at `base_url` (no trailing slash
    /// required). `timeout` bounds a single attempt; `max_retries` bounds
    /// the number of retries after a transient failure; `backoff_base` is
    /// doubled on each subsequent retry.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
        backoff_base: Duration,
    ) -> Result<Self, ErrorKind> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ErrorKind::ValidatorTransient(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            max_retries,
            backoff_base,
            validator_id: "http-llm".to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/decide", self.base_url.trim_end_matches('/'))
    }

    fn extract_endpoint(&self) -> String {
        format!("{}/extract", self.base_url.trim_end_matches('/'))
    }

    fn attempt(&self, request: &DecisionRequest) -> Result<ValidationRecord, ErrorKind> {
        let body = DecideRequest {
            content: &request.content,
            intent: &request.intent,
            author: &request.author,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .map_err(|e| ErrorKind::ValidatorTransient(format!("request failed: {e}")))?;

        let status = resp.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ErrorKind::ValidatorTransient(format!("status {status}")));
        }
        if !status.is_success() {
            return Err(ErrorKind::ValidatorProtocol(format!("unexpected status {status}")));
        }

        let parsed: DecideResponse = resp
            .json()
            .map_err(|e| ErrorKind::ValidatorProtocol(format!("invalid JSON response: {e}")))?;

        let decision = parse_decision(&parsed.decision)
            .ok_or_else(|| ErrorKind::ValidatorProtocol(format!("unrecognized decision {:?}", parsed.decision)))?;

        Ok(ValidationRecord {
            decision,
            paraphrase: parsed.paraphrase,
            reasoning: parsed.reasoning,
            validator_id: self.validator_id.clone(),
            model_version: parsed.model_version,
        })
    }
}

impl ValidatorPort for HttpLlmValidator {
    fn decide(&self, request: &DecisionRequest) -> Result<ValidationRecord, ErrorKind> {
        let mut backoff = self.backoff_base;
        for attempt in 0..=self.max_retries {
            match self.attempt(request) {
                Ok(record) => return Ok(record),
                Err(ErrorKind::ValidatorTransient(reason)) => {
                    if attempt == self.max_retries {
                        tracing::warn!(attempts = attempt + 1, %reason, "validator retries exhausted");
                        return Err(ErrorKind::ValidatorUnavailable);
                    }
                    tracing::debug!(attempt, %reason, "retrying validator call after transient error");
                    thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(other) => return Err(other),
            }
        }
        Err(ErrorKind::ValidatorUnavailable)
    }

    /// Best-effort, single-attempt call to the extraction endpoint. No
    /// retries here: a failed extraction is not a rejection, it just
    /// means the caller falls back to the line heuristic.
    fn extract_contract_terms(&self, content: &str) -> Option<ContractTerms> {
        let resp = self
            .client
            .post(self.extract_endpoint())
            .json(&ExtractRequest { content })
            .send()
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }

        let parsed: ExtractResponse = resp.json().ok()?;
        Some(ContractTerms {
            parties: parsed.parties,
            obligations: parsed.obligations,
            conditions: parsed.conditions,
            timeline: parsed.timeline,
            value: parsed.value,
            currency: parsed.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decision_accepts_closed_set_only() {
        assert_eq!(parse_decision("VALID"), Some(Decision::Valid));
        assert_eq!(parse_decision("NEEDS_CLARIFICATION"), Some(Decision::NeedsClarification));
        assert_eq!(parse_decision("INVALID"), Some(Decision::Invalid));
        assert_eq!(parse_decision("MAYBE"), None);
    }

    #[test]
    fn decide_response_tolerates_unknown_fields() {
        let json = r#"{"decision":"VALID","paraphrase":"p","reasoning":"r","model_version":"v1","extra_field":123}"#;
        let parsed: DecideResponse = serde_json::from_str(json).expect("should parse");
        assert_eq!(parsed.decision, "VALID");
    }

    #[test]
    fn decide_response_defaults_missing_optional_fields() {
        let json = r#"{"decision":"INVALID"}"#;
        let parsed: DecideResponse = serde_json::from_str(json).expect("should parse");
        assert_eq!(parsed.paraphrase, "");
        assert_eq!(parsed.reasoning, "");
    }

    #[test]
    fn extract_response_defaults_missing_fields_to_empty() {
        let json = r#"{"parties":["alice","bob"]}"#;
        let parsed: ExtractResponse = serde_json::from_str(json).expect("should parse");
        assert_eq!(parsed.parties, vec!["alice", "bob"]);
        assert!(parsed.obligations.is_empty());
        assert_eq!(parsed.timeline, None);
    }
}
