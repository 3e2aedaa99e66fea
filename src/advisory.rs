//! The oracle: an outside voice that reads the session and offers a prophecy.
//!
//! Nothing here can fail the game. [`consult`] turns every error, and even a
//! panicking oracle, into [`Prophecy::fallback`]. Requests run as detached
//! tasks through [`AdvisoryWorker`]; whichever answer lands last is the one
//! [`OracleSlot`] keeps.

use crate::{
    palette::ColorCategory,
    resolver::ElementalBalance,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use futures::{
    FutureExt,
    future::BoxFuture,
};
use itertools::Itertools;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::{
    fmt,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};
use tokio::sync::mpsc;
use tracing::{
    debug,
    warn,
};

pub const DEFAULT_ORACLE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const PROMPT_HISTORY_LEN: usize = 10;
pub const WAITING_LINE: &str = "The colors whisper of a great shift...";

const FALLBACK_MESSAGE: &str = "The mists are thick... Trust your instincts.";
const FALLBACK_RATIONALE: &str = "Connection to the Chromatic Kingdom is weak.";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AdviceRequest {
    pub seq: u64,
    pub history: Vec<ColorCategory>,
    pub boss_hp: u64,
    pub elemental_balance: ElementalBalance,
}

impl AdviceRequest {
    pub fn recent_history(&self) -> &[ColorCategory] {
        let start = self.history.len().saturating_sub(PROMPT_HISTORY_LEN);
        &self.history[start..]
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DangerLevel {
    Low,
    Medium,
    High,
}

impl DangerLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(DangerLevel::Low),
            "medium" => Some(DangerLevel::Medium),
            "high" => Some(DangerLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DangerLevel::Low => "Low",
            DangerLevel::Medium => "Medium",
            DangerLevel::High => "High",
        };
        write!(f, "{name}")
    }
}

/// Fields the oracle left out stay `None`; the UI skips them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Prophecy {
    pub message: Option<String>,
    pub rationale: Option<String>,
    pub recommended_color: Option<String>,
    pub danger_level: Option<DangerLevel>,
}

impl Prophecy {
    pub fn fallback() -> Self {
        Self {
            message: Some(FALLBACK_MESSAGE.to_string()),
            rationale: Some(FALLBACK_RATIONALE.to_string()),
            recommended_color: Some(ColorCategory::Red.id().to_string()),
            danger_level: Some(DangerLevel::Medium),
        }
    }

    /// Parses the oracle's JSON answer. Empty text reads as `{}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let text = if text.trim().is_empty() { "{}" } else { text };
        let dto: ProphecyDto =
            serde_json::from_str(text).wrap_err("oracle answer is not a JSON object")?;
        Ok(dto.into())
    }

    /// The recommendation as a board color, when it names one.
    pub fn recommended_category(&self) -> Option<ColorCategory> {
        self.recommended_color.as_deref()?.parse().ok()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProphecyDto {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    rationale: Option<Value>,
    #[serde(default, rename = "recommendedColor")]
    recommended_color: Option<Value>,
    #[serde(default, rename = "dangerLevel")]
    danger_level: Option<Value>,
}

fn non_empty_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

impl From<ProphecyDto> for Prophecy {
    fn from(dto: ProphecyDto) -> Self {
        let danger_level = non_empty_string(dto.danger_level)
            .as_deref()
            .and_then(DangerLevel::parse);
        Prophecy {
            message: non_empty_string(dto.message),
            rationale: non_empty_string(dto.rationale),
            recommended_color: non_empty_string(dto.recommended_color),
            danger_level,
        }
    }
}

pub trait Oracle: Send + Sync {
    fn prophesy<'a>(&'a self, request: &'a AdviceRequest) -> BoxFuture<'a, Result<Prophecy>>;
}

/// Always answers with the same prophecy. Used when no API key is set.
#[derive(Clone, Debug)]
pub struct StaticOracle {
    prophecy: Prophecy,
}

impl StaticOracle {
    pub fn new(prophecy: Prophecy) -> Self {
        Self { prophecy }
    }
}

impl Default for StaticOracle {
    fn default() -> Self {
        Self::new(Prophecy::fallback())
    }
}

impl Oracle for StaticOracle {
    fn prophesy<'a>(&'a self, _request: &'a AdviceRequest) -> BoxFuture<'a, Result<Prophecy>> {
        let prophecy = self.prophecy.clone();
        async move { Ok(prophecy) }.boxed()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<ContentDto>,
    generation_config: GenerationConfigDto,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct ContentDto {
    #[serde(default)]
    parts: Vec<PartDto>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct PartDto {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigDto {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<CandidateDto>,
}

#[derive(Debug, Deserialize, Default)]
struct CandidateDto {
    #[serde(default)]
    content: ContentDto,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .parts
            .iter()
            .find_map(|p| p.text.as_deref())
    }
}

/// Talks to a Gemini-style `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiOracle {
    endpoint: String,
    api_key: String,
    http: reqwest::Client,
}

impl GeminiOracle {
    pub fn new(
        base_url: impl Into<String>,
        model: &str,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let endpoint = format!("{base_url}/v1beta/models/{model}:generateContent");
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for oracle")?;
        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn ask(&self, request: &AdviceRequest) -> Result<Prophecy> {
        let body = GenerateContentRequest {
            contents: vec![ContentDto {
                parts: vec![PartDto {
                    text: Some(prompt(request)),
                }],
            }],
            generation_config: GenerationConfigDto {
                response_mime_type: "application/json",
            },
        };
        let res = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .wrap_err("oracle request failed")?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .wrap_err("failed to read oracle response body")?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(eyre!("oracle responded with {status}: {body}"));
        }
        let dto: GenerateContentResponse =
            serde_json::from_slice(&bytes).wrap_err("invalid oracle payload")?;
        Prophecy::from_json(dto.text().unwrap_or_default())
    }
}

impl fmt::Debug for GeminiOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiOracle")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Oracle for GeminiOracle {
    fn prophesy<'a>(&'a self, request: &'a AdviceRequest) -> BoxFuture<'a, Result<Prophecy>> {
        self.ask(request).boxed()
    }
}

pub fn prompt(request: &AdviceRequest) -> String {
    let recent = request.recent_history().iter().map(|c| c.id()).join(", ");
    let balance = serde_json::to_string(&request.elemental_balance)
        .unwrap_or_else(|_| String::from("{}"));
    format!(
        "You are the Chromatic Oracle in the arcade RPG Color Game Royale, a take on \
         the Filipino Color Game where three color dice are dropped each round.\n\
         \n\
         CURRENT STATE:\n\
         - Recent rolls: {recent}\n\
         - Umbra (boss) HP: {boss_hp}\n\
         - Elemental balance: {balance}\n\
         \n\
         FACTIONS: Red is Fire, Blue is Water, Green is Nature, Yellow is Light.\n\
         \n\
         Give a short prophecy for the next roll as JSON:\n\
         {{\"message\": string, \"rationale\": string, \
         \"recommendedColor\": \"red|blue|green|yellow\", \
         \"dangerLevel\": \"Low|Medium|High\"}}",
        boss_hp = request.boss_hp,
    )
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Consultation {
    pub seq: u64,
    pub prophecy: Prophecy,
    pub latency: Duration,
    pub fell_back: bool,
}

/// Asks the oracle once. Errors and panics become the fallback prophecy.
pub async fn consult(oracle: &dyn Oracle, request: &AdviceRequest) -> Consultation {
    let started = Instant::now();
    let answer = AssertUnwindSafe(oracle.prophesy(request))
        .catch_unwind()
        .await;
    let latency = started.elapsed();
    let (prophecy, fell_back) = match answer {
        Ok(Ok(prophecy)) => (prophecy, false),
        Ok(Err(err)) => {
            warn!(seq = request.seq, ?err, "oracle consultation failed");
            (Prophecy::fallback(), true)
        }
        Err(_) => {
            warn!(seq = request.seq, "oracle panicked");
            (Prophecy::fallback(), true)
        }
    };
    debug!(
        seq = request.seq,
        latency_ms = latency.as_millis() as u64,
        fell_back,
        "oracle answered"
    );
    Consultation {
        seq: request.seq,
        prophecy,
        latency,
        fell_back,
    }
}

/// Fires oracle requests as detached tasks and reports their answers.
#[derive(Clone)]
pub struct AdvisoryWorker {
    oracle: Arc<dyn Oracle>,
    answers: mpsc::UnboundedSender<Consultation>,
}

impl AdvisoryWorker {
    pub fn new(oracle: Arc<dyn Oracle>) -> (Self, mpsc::UnboundedReceiver<Consultation>) {
        let (answers, rx) = mpsc::unbounded_channel();
        (Self { oracle, answers }, rx)
    }

    /// Must be called from inside a tokio runtime.
    pub fn request(&self, request: AdviceRequest) {
        let oracle = self.oracle.clone();
        let answers = self.answers.clone();
        debug!(seq = request.seq, "oracle request sent");
        tokio::spawn(async move {
            let consultation = consult(oracle.as_ref(), &request).await;
            if answers.send(consultation).is_err() {
                debug!(seq = request.seq, "oracle answer dropped, receiver closed");
            }
        });
    }
}

/// The displayed prophecy. No fencing: the answer that arrives last wins,
/// even when it belongs to an older request.
#[derive(Clone, Debug, Default)]
pub struct OracleSlot {
    latest: Option<Consultation>,
    pending: usize,
}

impl OracleSlot {
    pub fn requested(&mut self) {
        self.pending += 1;
    }

    pub fn received(&mut self, consultation: Consultation) {
        self.pending = self.pending.saturating_sub(1);
        self.latest = Some(consultation);
    }

    pub fn is_thinking(&self) -> bool {
        self.pending > 0
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn latest(&self) -> Option<&Consultation> {
        self.latest.as_ref()
    }
}
