//! Produce-slot grading
//!
//! A [`GradingService`] scores one recorded performance on the 0-4 scale.
//! [`HttpGrader`] talks to the sign evaluation endpoint; the
//! [`GradingDispatcher`] runs grading calls as background tasks and hands
//! the results back tagged with their plan position.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use signpath_algo::{ProduceGrade, QualityScore};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{GraderConfig, MAX_GRADER_RETRIES};

const EVALUATE_PATH: &str = "/api/evaluate-sign";
const BASE_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_MS: u64 = 5_000;
/// Score awarded when the service has no reference recording for a word
const MISSING_REFERENCE_SCORE: u8 = 4;

#[derive(Debug, Error)]
pub enum GradingError {
    #[error("grader not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("score out of range: {0}")]
    InvalidScore(u8),
    #[error("grading task ended without a result")]
    Cancelled,
    #[error("grading task panicked")]
    Panicked,
}

/// One recorded performance to be graded
#[derive(Debug, Clone)]
pub struct GradeRequest {
    pub word: String,
    pub video: Vec<u8>,
}

impl GradeRequest {
    pub fn new(word: impl Into<String>, video: Vec<u8>) -> Self {
        Self {
            word: word.into(),
            video,
        }
    }

    /// Word as the service expects it: lowercase, no whitespace
    pub fn normalized_word(&self) -> String {
        self.word
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    }
}

pub trait GradingService: Send + Sync {
    /// Evaluate one performance; the score is validated by the dispatcher
    fn grade(&self, request: GradeRequest) -> BoxFuture<'_, Result<Evaluation, GradingError>>;
}

// ==================== Evaluation Payload ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Points {
    #[serde(default)]
    pub points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub overall_score_0_to_4: u8,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub pros: Points,
    #[serde(default)]
    pub cons: Points,
}

impl Evaluation {
    pub fn new(score: u8, summary: impl Into<String>) -> Self {
        Self {
            overall_score_0_to_4: score,
            summary: summary.into(),
            pros: Points::default(),
            cons: Points::default(),
        }
    }

    fn missing_reference() -> Self {
        Self {
            overall_score_0_to_4: MISSING_REFERENCE_SCORE,
            summary: "No reference recording for this word yet.".to_string(),
            pros: Points {
                points: vec!["Recording submitted successfully".to_string()],
            },
            cons: Points::default(),
        }
    }

    pub fn score(&self) -> Result<QualityScore, GradingError> {
        QualityScore::new(self.overall_score_0_to_4)
            .map_err(|_| GradingError::InvalidScore(self.overall_score_0_to_4))
    }
}

/// The service answers either `{"evaluation": {...}}` or the bare evaluation
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EvaluationBody {
    Wrapped { evaluation: Evaluation },
    Bare(Evaluation),
}

impl From<EvaluationBody> for Evaluation {
    fn from(body: EvaluationBody) -> Self {
        match body {
            EvaluationBody::Wrapped { evaluation } => evaluation,
            EvaluationBody::Bare(evaluation) => evaluation,
        }
    }
}

pub fn parse_evaluation(bytes: &[u8]) -> Result<Evaluation, GradingError> {
    let body: EvaluationBody = serde_json::from_slice(bytes)?;
    Ok(body.into())
}

// ==================== HTTP Grader ====================

#[derive(Clone)]
pub struct HttpGrader {
    config: GraderConfig,
    client: reqwest::Client,
}

impl HttpGrader {
    pub fn new(config: GraderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let config = GraderConfig {
            max_retries: config.max_retries.min(MAX_GRADER_RETRIES),
            ..config
        };
        Self { config, client }
    }

    /// Full evaluation with feedback, retrying transport errors and 5xx
    pub async fn evaluate(&self, request: &GradeRequest) -> Result<Evaluation, GradingError> {
        let word = request.normalized_word();
        let url = format!("{}{}", self.config.endpoint, EVALUATE_PATH);
        let max_retries = self.config.max_retries;
        let mut last_error: Option<GradingError> = None;

        for retry in 0..=max_retries {
            let video = reqwest::multipart::Part::bytes(request.video.clone())
                .file_name(format!("{word}.webm"))
                .mime_str("video/webm")?;
            let form = reqwest::multipart::Form::new()
                .text("word", word.clone())
                .part("video", video);

            let err = match self
                .client
                .post(&url)
                .query(&[("word", word.as_str())])
                .multipart(form)
                .send()
                .await
            {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        debug!(word = %word, "no reference recording, auto-pass");
                        return Ok(Evaluation::missing_reference());
                    }
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        return parse_evaluation(&bytes);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = GradingError::HttpStatus { status, body };
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => GradingError::Request(e),
            };

            if retry < max_retries {
                let backoff = backoff_delay(retry);
                warn!(retry, word = %word, error = %err, "grading request failed, retrying");
                sleep(backoff).await;
            }
            last_error = Some(err);
        }
        Err(last_error.unwrap_or(GradingError::Cancelled))
    }
}

impl GradingService for HttpGrader {
    fn grade(&self, request: GradeRequest) -> BoxFuture<'_, Result<Evaluation, GradingError>> {
        Box::pin(async move { self.evaluate(&request).await })
    }
}

/// Exponential backoff from `BASE_BACKOFF_MS`, capped at `MAX_BACKOFF_MS`
fn backoff_delay(retry: usize) -> Duration {
    let factor = u32::try_from(retry)
        .ok()
        .and_then(|shift| 1u64.checked_shl(shift))
        .unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

// ==================== Dispatcher ====================

/// A resolved grade for the produce slot at `position`
#[derive(Debug, Clone, PartialEq)]
pub struct GradeResult {
    pub position: usize,
    pub grade: ProduceGrade,
    /// Feedback from the service when the call succeeded
    pub evaluation: Option<Evaluation>,
}

impl GradeResult {
    fn errored(position: usize, err: &GradingError) -> Self {
        Self {
            position,
            grade: ProduceGrade::errored(err.to_string()),
            evaluation: None,
        }
    }
}

/// Runs grading calls concurrently; results come back in completion order.
///
/// Every dispatched call yields exactly one result, even when the grader
/// panics. Dropping the dispatcher drops the receiver, so grades that arrive
/// for an abandoned attempt are discarded.
pub struct GradingDispatcher {
    grader: Option<Arc<dyn GradingService>>,
    tx: mpsc::UnboundedSender<GradeResult>,
    rx: mpsc::UnboundedReceiver<GradeResult>,
    in_flight: usize,
}

impl GradingDispatcher {
    pub fn new(grader: Option<Arc<dyn GradingService>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            grader,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start grading the submission for plan position `position`
    pub fn dispatch(&mut self, position: usize, request: GradeRequest) {
        self.in_flight += 1;
        let tx = self.tx.clone();

        let Some(grader) = self.grader.clone() else {
            let _ = tx.send(GradeResult::errored(position, &GradingError::NotConfigured));
            return;
        };

        tokio::spawn(async move {
            let word = request.word.clone();
            let outcome = AssertUnwindSafe(async move { grader.grade(request).await })
                .catch_unwind()
                .await
                .unwrap_or(Err(GradingError::Panicked))
                .and_then(|evaluation| Ok((evaluation.score()?, evaluation)));

            let result = match outcome {
                Ok((score, evaluation)) => {
                    debug!(position, word = %word, score = score.value(), "produce graded");
                    GradeResult {
                        position,
                        grade: ProduceGrade::graded(score),
                        evaluation: Some(evaluation),
                    }
                }
                Err(err) => {
                    warn!(position, word = %word, error = %err, "grading failed");
                    GradeResult::errored(position, &err)
                }
            };
            // receiver gone means the attempt was abandoned
            let _ = tx.send(result);
        });
    }

    /// Grades that have already arrived, without waiting
    pub fn try_drain(&mut self) -> Vec<GradeResult> {
        let mut ready = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            ready.push(result);
        }
        ready
    }

    /// Wait for the next grade; `None` when nothing is in flight
    pub async fn next(&mut self) -> Option<GradeResult> {
        if self.in_flight == 0 {
            return None;
        }
        let result = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(result)
    }
}
