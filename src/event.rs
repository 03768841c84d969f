use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent};

use crate::oracle::OracleOutcome;

pub enum AppEvent {
    Key(KeyEvent),
    /// Bracketed paste; always refused by the round but still routed through it.
    Paste(String),
    Tick,
    Resize(#[allow(dead_code)] u16, #[allow(dead_code)] u16),
    OracleReply(OracleOutcome),
}

pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        thread::spawn(move || {
            loop {
                let app_event = if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key)) => AppEvent::Key(key),
                        Ok(Event::Paste(text)) => AppEvent::Paste(text),
                        Ok(Event::Resize(w, h)) => AppEvent::Resize(w, h),
                        _ => continue,
                    }
                } else {
                    AppEvent::Tick
                };
                if input_tx.send(app_event).is_err() {
                    return;
                }
            }
        });

        Self { rx, tx }
    }

    /// Sender for background work (oracle calls) to report back on.
    pub fn sender(&self) -> mpsc::Sender<AppEvent> {
        self.tx.clone()
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}
