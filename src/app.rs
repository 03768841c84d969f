use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::Config;
use crate::engine::metrics::PerformanceSummary;
use crate::engine::problematic::ProblematicKeyEntry;
use crate::oracle::sanitize::sanitize_sentence;
use crate::oracle::{MAX_TOPIC_CHARS, OracleJob, OracleOutcome, OracleRequest, WELCOME_SENTENCE};
use crate::session::field::EditAction;
use crate::session::round::{InputOutcome, RoundController};
use crate::store::PersistenceAdapter;
use crate::store::kv::KeyValueStore;
use crate::store::schema::Preferences;
use crate::ui::theme::Theme;

/// Everything the terminal loop needs, independent of the terminal itself.
/// Oracle jobs are handed back to the caller to run off the input thread.
pub struct App<S: KeyValueStore> {
    pub config: Config,
    pub theme: Theme,
    pub controller: RoundController,
    pub preferences: Preferences,
    pub last_summary: Option<PerformanceSummary>,
    pub last_problems: Vec<ProblematicKeyEntry>,
    pub last_note: Option<String>,
    pub should_quit: bool,
    persistence: PersistenceAdapter<S>,
    /// Summaries of finished rounds still waiting for their oracle note.
    pending: BTreeMap<u64, PerformanceSummary>,
    /// Round id of the oracle call currently running. At most one at a time.
    in_flight: Option<u64>,
    /// Completion that arrived while a stale call was still running.
    queued: Option<OracleJob>,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(config: Config, store: S) -> Self {
        let persistence = PersistenceAdapter::new(store, config.history_limit);
        let preferences = persistence.load_preferences();
        let theme = Theme::load(&config.theme).unwrap_or_default();

        let first = persistence
            .load_next_sentence()
            .map(|s| sanitize_sentence(&s, config.max_sentence_chars))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| WELCOME_SENTENCE.to_string());

        Self {
            controller: RoundController::new(&first),
            config,
            theme,
            preferences,
            last_summary: None,
            last_problems: Vec::new(),
            last_note: None,
            should_quit: false,
            persistence,
            pending: BTreeMap::new(),
            in_flight: None,
            queued: None,
        }
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    /// Run one edit through the round. A completed round yields the oracle
    /// job for the next sentence, unless another call is still running; the
    /// job then waits in the queue until [`App::take_queued_job`].
    pub fn handle(&mut self, action: &EditAction, now: Instant) -> Option<OracleJob> {
        match self.controller.handle(action, now) {
            InputOutcome::Completed(done) => {
                let topic = self.preferences.topic_key().to_string();
                let history = self.persistence.recent_history(&topic);
                let mut request = OracleRequest::from_round(
                    &done,
                    self.preferences.practice_topic.as_deref(),
                    history,
                );
                request.include_symbols = self.preferences.include_symbols;
                request.include_numbers = self.preferences.include_numbers;

                self.last_summary = Some(done.summary.clone());
                self.last_problems = done.problematic_keys.clone();
                self.pending.insert(done.round_id, done.summary);

                let job = OracleJob {
                    round_id: done.round_id,
                    request,
                    max_chars: self.config.max_sentence_chars,
                };
                if let Some(running) = self.in_flight {
                    info!(round = done.round_id, running, "oracle busy; queueing round");
                    if let Some(dropped) = self.queued.replace(job) {
                        self.record_without_note(dropped.round_id);
                    }
                    return None;
                }
                info!(
                    round = done.round_id,
                    problems = self.last_problems.len(),
                    "dispatching round to oracle"
                );
                self.in_flight = Some(done.round_id);
                Some(job)
            }
            InputOutcome::Abandoned => {
                debug!("buffer cleared; round restarted");
                None
            }
            _ => None,
        }
    }

    /// Enter: abandon the current attempt and start over on the same text.
    pub fn reset_round(&mut self) {
        info!(round = self.controller.round_id(), "round reset by user");
        self.controller.reset();
    }

    /// Record the finished round with the oracle's note, then install the
    /// next sentence if the reply still belongs to the current round.
    pub fn apply_oracle_outcome(&mut self, outcome: OracleOutcome) -> bool {
        let OracleOutcome { round_id, reply } = outcome;
        if self.in_flight == Some(round_id) {
            self.in_flight = None;
        }

        if let Some(mut summary) = self.pending.remove(&round_id) {
            summary.notes = reply.note.clone();
            let topic = self.preferences.topic_key().to_string();
            self.persistence.record_summary(&topic, summary);
            self.last_note = Some(reply.note.clone());
        }

        if !self.controller.install_next_round(round_id, &reply.sentence) {
            return false;
        }
        if !reply.fallback {
            self.persistence.save_next_sentence(&reply.sentence);
        }
        true
    }

    /// The queued completion, once no oracle call is running. The caller
    /// dispatches it exactly like a job returned from [`App::handle`].
    pub fn take_queued_job(&mut self) -> Option<OracleJob> {
        if self.in_flight.is_some() {
            return None;
        }
        let job = self.queued.take()?;
        info!(round = job.round_id, "dispatching queued round to oracle");
        self.in_flight = Some(job.round_id);
        Some(job)
    }

    fn record_without_note(&mut self, round_id: u64) {
        if let Some(summary) = self.pending.remove(&round_id) {
            debug!(round = round_id, "superseded before dispatch; recording without note");
            let topic = self.preferences.topic_key().to_string();
            self.persistence.record_summary(&topic, summary);
        }
    }

    pub fn set_topic(&mut self, topic: Option<&str>) {
        self.preferences.practice_topic = topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| t.chars().take(MAX_TOPIC_CHARS).collect());
        self.persistence.save_preferences(&self.preferences);
    }

    pub fn toggle_symbols(&mut self) {
        self.preferences.include_symbols = !self.preferences.include_symbols;
        self.persistence.save_preferences(&self.preferences);
    }

    pub fn toggle_numbers(&mut self) {
        self.preferences.include_numbers = !self.preferences.include_numbers;
        self.persistence.save_preferences(&self.preferences);
    }
}
