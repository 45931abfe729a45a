use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Local;
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc::UnboundedSender, Mutex};
use uuid::Uuid;

use crate::{
    bank::QuestionBank,
    results::{persist_results, ResultBatch, ResultStore},
    settings::ExamSettings,
    timer::{format_remaining, TickOutcome, Ticker},
};

use super::{
    error::{ExamError, ExamResult},
    scoring::{compute_scores, review, ScoreReport, SectionReview},
    state::{Direction, ExamSession, ExamSnapshot, FlaggedQuestion, NavOutcome},
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SubmitTrigger {
    Manual,
    TimeExpired,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub candidate_id: String,
    pub report: ScoreReport,
    pub elapsed_secs: u64,
    pub trigger: SubmitTrigger,
    pub results_location: String,
    /// Set when the result log could not be written; the scores are still valid.
    pub persistence_warning: Option<String>,
}

/// Notifications pushed to the presentation layer from the ticker.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExamEvent {
    Heartbeat {
        remaining_secs: u64,
        remaining_display: String,
        low_time: bool,
    },
    LowTime {
        remaining_secs: u64,
    },
    TimeExpired {
        outcome: SubmissionOutcome,
    },
}

/// Owns the single exam session and every mutation of it.
///
/// Intents and ticks both go through `session`'s lock, and submission checks the
/// lifecycle under that lock, so a late tick can never score a session twice.
#[derive(Clone)]
pub struct ExamController {
    session: Arc<Mutex<Option<ExamSession>>>,
    bank: Arc<QuestionBank>,
    store: Arc<dyn ResultStore>,
    events: UnboundedSender<ExamEvent>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
    heartbeat_every_secs: u64,
    duration_secs: u64,
    warning_threshold_secs: u64,
}

impl ExamController {
    pub fn new(
        bank: Arc<QuestionBank>,
        store: Arc<dyn ResultStore>,
        settings: &ExamSettings,
        events: UnboundedSender<ExamEvent>,
    ) -> Self {
        let debug_mode = std::env::var("SMARTEXAM_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            session: Arc::new(Mutex::new(None)),
            bank,
            store,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_secs: if debug_mode { 1 } else { 60 },
            duration_secs: settings.duration_secs(),
            warning_threshold_secs: settings.warning_threshold_secs,
        }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Starts a fresh session, replacing any previous one.
    pub async fn start_exam(
        &self,
        name: &str,
        id: &str,
        sections: &[String],
    ) -> ExamResult<ExamSnapshot> {
        let session = ExamSession::start(
            self.bank.clone(),
            name,
            id,
            sections,
            self.duration_secs,
            self.warning_threshold_secs,
        )?;

        self.stop_ticker().await;

        let session_id = session.id();
        let snapshot = session.snapshot();
        {
            let mut guard = self.session.lock().await;
            if let Some(previous) = guard.replace(session) {
                info!("Replacing exam session {}", previous.id());
            }
        }

        self.spawn_ticker(session_id).await;

        info!(
            "Exam session {} started for {} ({}) with sections {:?}",
            session_id, snapshot.candidate_name, snapshot.candidate_id, sections
        );
        Ok(snapshot)
    }

    pub async fn snapshot(&self) -> Option<ExamSnapshot> {
        self.session.lock().await.as_ref().map(ExamSession::snapshot)
    }

    async fn with_session<T>(
        &self,
        f: impl FnOnce(&mut ExamSession) -> ExamResult<T>,
    ) -> ExamResult<T> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ExamError::NoActiveSession)?;
        f(session)
    }

    pub async fn choose(&self, option: Option<usize>) -> ExamResult<ExamSnapshot> {
        self.with_session(|session| {
            session.choose(option)?;
            Ok(session.snapshot())
        })
        .await
    }

    pub async fn record_answer(&self, option: Option<usize>) -> ExamResult<ExamSnapshot> {
        self.with_session(|session| {
            session.record_answer(option)?;
            Ok(session.snapshot())
        })
        .await
    }

    pub async fn navigate(&self, direction: Direction) -> ExamResult<(NavOutcome, ExamSnapshot)> {
        self.with_session(|session| {
            let outcome = session.navigate(direction)?;
            Ok((outcome, session.snapshot()))
        })
        .await
    }

    pub async fn switch_section(&self, section: &str) -> ExamResult<(bool, ExamSnapshot)> {
        self.with_session(|session| {
            let switched = session.switch_section(section)?;
            Ok((switched, session.snapshot()))
        })
        .await
    }

    pub async fn jump_to(&self, section: &str, index: usize) -> ExamResult<ExamSnapshot> {
        self.with_session(|session| {
            session.jump_to(section, index)?;
            Ok(session.snapshot())
        })
        .await
    }

    pub async fn toggle_flag(&self, section: &str, index: usize) -> ExamResult<bool> {
        self.with_session(|session| session.toggle_flag(section, index))
            .await
    }

    pub async fn toggle_current_flag(&self) -> ExamResult<bool> {
        self.with_session(|session| session.toggle_current_flag())
            .await
    }

    pub async fn flagged_questions(&self) -> ExamResult<Vec<FlaggedQuestion>> {
        self.with_session(|session| Ok(session.flagged_questions()))
            .await
    }

    pub async fn scores(&self) -> ExamResult<ScoreReport> {
        self.with_session(|session| Ok(compute_scores(session)))
            .await
    }

    pub async fn review(&self) -> ExamResult<Vec<SectionReview>> {
        self.with_session(|session| {
            review(session).ok_or_else(|| {
                ExamError::Validation("Answers can be reviewed after the exam is submitted.".into())
            })
        })
        .await
    }

    /// Manual submission. `Ok(None)` means the session was already submitted.
    pub async fn submit(&self) -> ExamResult<Option<SubmissionOutcome>> {
        self.stop_ticker().await;

        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ExamError::NoActiveSession)?;
        Ok(finalize(session, SubmitTrigger::Manual, &self.store).await)
    }

    /// Return-to-login: drops the session without scoring it.
    pub async fn reset(&self) {
        self.stop_ticker().await;
        if let Some(session) = self.session.lock().await.take() {
            info!("Exam session {} discarded", session.id());
        }
    }

    /// Process teardown: stops the clock but keeps the session as it is.
    pub async fn shutdown(&self) {
        self.stop_ticker().await;
    }

    async fn spawn_ticker(&self, session_id: Uuid) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            if let Err(err) = previous.stop().await {
                error!("Failed to stop previous exam ticker: {err:?}");
            }
        }

        let state = self.session.clone();
        let store = self.store.clone();
        let events = self.events.clone();
        let heartbeat_every = self.heartbeat_every_secs.max(1);
        let low_time_sent = Arc::new(AtomicBool::new(false));

        let ticker = Ticker::spawn(self.tick_interval, move || {
            let state = state.clone();
            let store = store.clone();
            let events = events.clone();
            let low_time_sent = low_time_sent.clone();

            async move {
                let mut guard = state.lock().await;
                let Some(session) = guard.as_mut().filter(|s| s.id() == session_id) else {
                    return ControlFlow::Break(());
                };

                match session.tick() {
                    None => ControlFlow::Break(()),
                    Some(TickOutcome::Running {
                        remaining_secs,
                        low_time,
                    }) => {
                        if low_time && !low_time_sent.swap(true, Ordering::SeqCst) {
                            warn!("Exam session {session_id}: {remaining_secs}s remaining");
                            let _ = events.send(ExamEvent::LowTime { remaining_secs });
                        }
                        if remaining_secs % heartbeat_every == 0 {
                            let _ = events.send(ExamEvent::Heartbeat {
                                remaining_secs,
                                remaining_display: format_remaining(remaining_secs),
                                low_time,
                            });
                        }
                        ControlFlow::Continue(())
                    }
                    Some(TickOutcome::Expired) => {
                        info!("Time is over for exam session {session_id}; submitting automatically");
                        if let Some(outcome) =
                            finalize(session, SubmitTrigger::TimeExpired, &store).await
                        {
                            let _ = events.send(ExamEvent::TimeExpired { outcome });
                        }
                        ControlFlow::Break(())
                    }
                }
            }
        });

        *ticker_guard = Some(ticker);
    }

    async fn stop_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            if let Err(err) = ticker.stop().await {
                error!("Failed to stop exam ticker: {err:?}");
            }
        }
    }
}

/// `Running -> Submitted`, then score and persist exactly once.
async fn finalize(
    session: &mut ExamSession,
    trigger: SubmitTrigger,
    store: &Arc<dyn ResultStore>,
) -> Option<SubmissionOutcome> {
    if !session.close() {
        return None;
    }

    let report = compute_scores(session);
    let elapsed_secs = session.elapsed_secs();
    let batch = ResultBatch {
        submitted_at: Local::now(),
        name: session.candidate_name().to_string(),
        roll: session.candidate_id().to_string(),
        elapsed_secs,
        report: report.clone(),
    };

    let writer = store.clone();
    let persistence_warning =
        match tokio::task::spawn_blocking(move || persist_results(writer.as_ref(), &batch)).await {
            Ok(warning) => warning,
            Err(err) => {
                error!("Result writer task failed: {err}");
                Some(format!("failed to save results: {err}"))
            }
        };

    info!(
        "Exam session {} submitted ({:?}): {}/{} in {}s",
        session.id(),
        trigger,
        report.overall_score,
        report.overall_total,
        elapsed_secs
    );

    Some(SubmissionOutcome {
        session_id: session.id(),
        candidate_name: session.candidate_name().to_string(),
        candidate_id: session.candidate_id().to_string(),
        report,
        elapsed_secs,
        trigger,
        results_location: store.location(),
        persistence_warning,
    })
}
