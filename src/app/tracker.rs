use thiserror::Error;

use crate::app::services::{SessionStore, StoreError};
use crate::domain::format::format_history;
use crate::domain::models::{Clock, NewSleepSession, SleepSession, open_session};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
    #[error("a sleep session is already being tracked")]
    SessionAlreadyOpen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerView {
    pub start_visible: bool,
    pub stop_visible: bool,
    pub clear_visible: bool,
    pub history_text: String,
}

pub struct SleepTracker<S, C> {
    store: S,
    clock: C,
    current: Option<SleepSession>,
    pending_rating: Option<SleepSession>,
    pending_clear_notice: bool,
}

impl<S, C> SleepTracker<S, C>
where
    S: SessionStore,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Result<Self, TrackerError> {
        // Adopt a session left open by a previous process run.
        let current = open_session(store.latest()?);

        Ok(Self {
            store,
            clock,
            current,
            pending_rating: None,
            pending_clear_notice: false,
        })
    }

    pub fn start(&mut self) -> Result<(), TrackerError> {
        if self.current.is_some() {
            return Err(TrackerError::SessionAlreadyOpen);
        }

        let new_session = NewSleepSession::started_now(&self.clock);
        self.store.insert(&new_session)?;

        // Re-read through the store so `current` carries the store-assigned id.
        self.current = open_session(self.store.latest()?);

        if let Some(session) = &self.current {
            tracing::info!(
                session_id = session.id,
                started_at_ms = session.started_at.0,
                "sleep session started"
            );
        }

        Ok(())
    }

    pub fn stop(&mut self) -> Result<Option<SleepSession>, TrackerError> {
        let Some(current) = self.current.as_ref() else {
            return Ok(None);
        };

        let mut closed = current.clone();
        closed.ended_at = self.clock.now();

        self.store.update(&closed)?;

        self.current = None;
        self.pending_rating = Some(closed.clone());

        tracing::info!(
            session_id = closed.id,
            started_at_ms = closed.started_at.0,
            ended_at_ms = closed.ended_at.0,
            "sleep session closed"
        );

        Ok(Some(closed))
    }

    pub fn clear(&mut self) -> Result<(), TrackerError> {
        let removed = self.store.clear()?;

        self.current = None;
        self.pending_clear_notice = true;

        tracing::info!(removed, "sleep log cleared");

        Ok(())
    }

    pub fn current(&self) -> Option<&SleepSession> {
        self.current.as_ref()
    }

    pub fn start_visible(&self) -> bool {
        self.current.is_none()
    }

    pub fn stop_visible(&self) -> bool {
        self.current.is_some()
    }

    pub fn view(&self) -> Result<TrackerView, TrackerError> {
        let sessions = self.store.list_all()?;

        Ok(TrackerView {
            start_visible: self.start_visible(),
            stop_visible: self.stop_visible(),
            clear_visible: !sessions.is_empty(),
            history_text: format_history(&sessions),
        })
    }

    pub fn navigate_to_rating(&self) -> Option<&SleepSession> {
        self.pending_rating.as_ref()
    }

    pub fn done_navigating(&mut self) {
        self.pending_rating = None;
    }

    pub fn show_cleared_notice(&self) -> bool {
        self.pending_clear_notice
    }

    pub fn done_showing_cleared(&mut self) {
        self.pending_clear_notice = false;
    }
}
