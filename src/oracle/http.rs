use std::time::Duration;

use tracing::debug;

use crate::error::OracleError;
use crate::oracle::{OracleRequest, OracleResponse, SentenceOracle};

/// Posts the round report as JSON to a remote endpoint and reads back the
/// next sentence. A 429 answer still carries a usable sentence body.
pub struct HttpOracle {
    #[cfg_attr(not(feature = "network"), allow(dead_code))]
    url: String,
    #[cfg_attr(not(feature = "network"), allow(dead_code))]
    timeout: Duration,
}

impl HttpOracle {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

fn parse_body(body: &str) -> Result<OracleResponse, OracleError> {
    Ok(serde_json::from_str(body)?)
}

fn accepts_status(code: u16) -> bool {
    (200..300).contains(&code) || code == 429
}

#[cfg(feature = "network")]
impl SentenceOracle for HttpOracle {
    fn next_round(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        let body = serde_json::to_string(request)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        debug!(url = %self.url, bytes = body.len(), "posting round report");
        let response = client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let code = response.status().as_u16();
        if !accepts_status(code) {
            return Err(OracleError::Status(code));
        }
        let text = response
            .text()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        parse_body(&text)
    }
}

#[cfg(not(feature = "network"))]
impl SentenceOracle for HttpOracle {
    fn next_round(&self, _request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        Err(OracleError::Disabled)
    }
}
