pub mod http;
pub mod local;
pub mod sanitize;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::metrics::PerformanceSummary;
use crate::engine::problematic::ProblematicKeyEntry;
use crate::error::OracleError;
use crate::session::round::CompletedRound;

pub const WELCOME_SENTENCE: &str = "Welcome! Each time you finish typing, your keystrokes are analyzed to craft the next sentence based on your weaknesses. You must finish without errors.";
pub const FALLBACK_SENTENCE: &str = "The coach could not be reached, so here is a plain sentence to keep your fingers warm while we try again.";
pub const FALLBACK_NOTE: &str = "No feedback this round; the coach was unavailable.";

/// Practice topics longer than this are clipped before leaving the process.
pub const MAX_TOPIC_CHARS: usize = 30;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub reference_text: String,
    pub problematic_keys: Vec<ProblematicKeyEntry>,
    pub performance_summary: PerformanceSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_topic: Option<String>,
    /// Most recent first.
    pub performance_history: Vec<PerformanceSummary>,
    #[serde(default)]
    pub include_symbols: bool,
    #[serde(default)]
    pub include_numbers: bool,
}

impl OracleRequest {
    pub fn from_round(
        round: &CompletedRound,
        practice_topic: Option<&str>,
        performance_history: Vec<PerformanceSummary>,
    ) -> Self {
        let practice_topic = practice_topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| t.chars().take(MAX_TOPIC_CHARS).collect());
        Self {
            reference_text: round.reference_text.clone(),
            problematic_keys: round.problematic_keys.clone(),
            performance_summary: round.summary.clone(),
            practice_topic,
            performance_history,
            include_symbols: true,
            include_numbers: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleResponse {
    pub next_sentence: String,
    #[serde(default)]
    pub note: String,
}

/// The external sentence and feedback generator. Implementations may block.
pub trait SentenceOracle: Send + Sync {
    fn next_round(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError>;
}

/// What the round machine installs: always a usable sentence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleReply {
    pub sentence: String,
    pub note: String,
    pub fallback: bool,
}

impl OracleReply {
    pub fn fallback() -> Self {
        Self {
            sentence: FALLBACK_SENTENCE.to_string(),
            note: FALLBACK_NOTE.to_string(),
            fallback: true,
        }
    }
}

/// Turn an oracle result into something safe to display. Failures and
/// sentences that sanitize to nothing become the fixed fallback.
pub fn resolve(result: Result<OracleResponse, OracleError>, max_chars: usize) -> OracleReply {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "oracle failed; using fallback sentence");
            return OracleReply::fallback();
        }
    };

    let sentence = sanitize::sanitize_sentence(&response.next_sentence, max_chars);
    if sentence.is_empty() {
        warn!(error = %OracleError::EmptySentence, "oracle reply unusable; using fallback sentence");
        return OracleReply::fallback();
    }
    let note = sanitize::sanitize_sentence(&response.note, max_chars * 2);
    info!(chars = sentence.chars().count(), "oracle supplied next sentence");
    OracleReply {
        sentence,
        note,
        fallback: false,
    }
}

/// A completed round waiting for its oracle call. Runs off the input thread.
pub struct OracleJob {
    pub round_id: u64,
    pub request: OracleRequest,
    pub max_chars: usize,
}

#[derive(Clone, Debug)]
pub struct OracleOutcome {
    pub round_id: u64,
    pub reply: OracleReply,
}

impl OracleJob {
    pub fn run(self, oracle: &dyn SentenceOracle) -> OracleOutcome {
        let result = oracle.next_round(&self.request);
        OracleOutcome {
            round_id: self.round_id,
            reply: resolve(result, self.max_chars),
        }
    }
}
