//! The lesson progression state machine.
//!
//! One session plays one lesson (or one daily challenge): each sign is
//! shown as clip → revealed name → two-option quiz, progress is written
//! through after every phase transition, and wrong quiz answers burn
//! hearts until the budget runs out. All mutation happens behind one
//! lock, driven by the UI event loop; persistence runs fire-and-forget
//! except at completion, where the next screen needs the receipt.

use std::{sync::Arc, time::Duration};

use rand::{rngs::StdRng, SeedableRng};
use shared::{
    domain::LessonId,
    protocol::{LessonDetail, ProgressUpdate},
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    progress::{self, LessonPosition, Phase},
    quiz::{self, QuizPrompt},
    AccountGateway, LessonCatalog, ProgressStore,
};

/// Hold time on a correct answer before the next sign's clip starts.
pub const CORRECT_ADVANCE_DELAY: Duration = Duration::from_millis(1200);
/// Hold time on a wrong answer before the same quiz re-arms.
pub const INCORRECT_RETRY_DELAY: Duration = Duration::from_millis(1500);
pub const MAX_HEARTS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Lesson,
    /// Daily challenge: saved progress is neither read nor written;
    /// completion is reported only to the caller.
    DailyChallenge,
}

#[derive(Debug, Error)]
pub enum SessionLoadError {
    #[error("failed to load lesson {lesson_id}: {source}")]
    LessonFetch {
        lesson_id: i64,
        source: anyhow::Error,
    },
    #[error("lesson {0} has no signs")]
    EmptyLesson(i64),
    #[error("failed to load saved progress for lesson {lesson_id}: {source}")]
    ProgressFetch {
        lesson_id: i64,
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already ended")]
    Ended,
    #[error("expected phase {expected:?}, session is in {actual:?}")]
    WrongPhase { expected: Phase, actual: Phase },
    #[error("answer feedback still pending")]
    FeedbackPending,
    #[error("no answer feedback pending")]
    NoFeedbackPending,
    #[error("out of hearts")]
    OutOfHearts,
    #[error("option index {0} out of range")]
    InvalidOption(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerVerdict {
    pub correct: bool,
    pub hearts_remaining: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed { rubies_earned: i64, streak: i64 },
    Exited { percent: u8 },
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged {
        sign_index: usize,
        phase: Phase,
        percent: u8,
    },
    QuizPresented {
        options: [String; 2],
    },
    AnswerJudged {
        correct: bool,
    },
    HeartLost {
        remaining: u8,
    },
    HeartsDepleted,
    HeartsRestored {
        hearts: u8,
    },
    ProgressPersisted {
        percent: u8,
    },
    ExitRequested,
    SessionEnded(SessionOutcome),
}

/// UI-facing view of the current session state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub lesson_id: LessonId,
    pub sign_index: usize,
    pub sign_count: usize,
    pub phase: Phase,
    pub percent: u8,
    pub hearts: u8,
    pub rubies: i64,
    pub blocked: bool,
    pub exit_requested: bool,
    pub sign_label: String,
    pub video_url: Option<String>,
    pub quiz_options: Option<[String; 2]>,
}

enum PendingFeedback {
    Advance,
    Retry,
}

struct SessionState {
    position: LessonPosition,
    hearts: u8,
    rubies: i64,
    streak: i64,
    /// Lesson was already completed before this session; progress
    /// writes are suppressed, completion still re-reports 100.
    previously_completed: bool,
    blocked: bool,
    ended: bool,
    exit_requested: bool,
    prompt: Option<QuizPrompt>,
    pending: Option<PendingFeedback>,
    rng: StdRng,
}

pub struct LessonSession {
    session_id: Uuid,
    lesson: LessonDetail,
    mode: SessionMode,
    progress_store: Arc<dyn ProgressStore>,
    account: Arc<dyn AccountGateway>,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl LessonSession {
    /// Load the lesson, the saved position (regular lessons only) and
    /// the heart budget, then build the session at the derived start
    /// position. A lesson without signs is a fatal load error.
    pub async fn open(
        catalog: Arc<dyn LessonCatalog>,
        progress_store: Arc<dyn ProgressStore>,
        account: Arc<dyn AccountGateway>,
        lesson_id: LessonId,
        mode: SessionMode,
    ) -> Result<Arc<Self>, SessionLoadError> {
        Self::open_with_rng(
            catalog,
            progress_store,
            account,
            lesson_id,
            mode,
            StdRng::from_entropy(),
        )
        .await
    }

    pub async fn open_with_rng(
        catalog: Arc<dyn LessonCatalog>,
        progress_store: Arc<dyn ProgressStore>,
        account: Arc<dyn AccountGateway>,
        lesson_id: LessonId,
        mode: SessionMode,
        mut rng: StdRng,
    ) -> Result<Arc<Self>, SessionLoadError> {
        let lesson = catalog
            .fetch_lesson(lesson_id)
            .await
            .map_err(|source| SessionLoadError::LessonFetch {
                lesson_id: lesson_id.0,
                source,
            })?;
        if lesson.signs.is_empty() {
            return Err(SessionLoadError::EmptyLesson(lesson_id.0));
        }

        let saved = match mode {
            SessionMode::Lesson => Some(
                progress_store
                    .fetch_progress(lesson_id)
                    .await
                    .map_err(|source| SessionLoadError::ProgressFetch {
                        lesson_id: lesson_id.0,
                        source,
                    })?,
            ),
            SessionMode::DailyChallenge => None,
        };
        let position = match saved {
            Some(snapshot) if snapshot.progress > 0 => {
                progress::resume(snapshot.progress, lesson.signs.len())
            }
            _ => LessonPosition::start(),
        };
        let previously_completed = saved.map(|snapshot| snapshot.completed).unwrap_or(false);

        // A failed status fetch is not fatal; the lesson plays with a
        // full heart budget until a receipt says otherwise.
        let (hearts, rubies, streak) = match account.fetch_status().await {
            Ok(status) => (
                status.hearts.clamp(0, i64::from(MAX_HEARTS)) as u8,
                status.rubies,
                status.streak,
            ),
            Err(error) => {
                warn!(lesson_id = lesson_id.0, %error, "status fetch failed; assuming full hearts");
                (MAX_HEARTS, 0, 0)
            }
        };

        let prompt = match position.phase {
            Phase::Quiz => Some(quiz::draw_prompt(
                &lesson.signs,
                position.sign_index,
                &mut rng,
            )),
            _ => None,
        };

        let session_id = Uuid::new_v4();
        info!(
            session = %session_id,
            lesson_id = lesson_id.0,
            sign_count = lesson.signs.len(),
            sign_index = position.sign_index,
            challenge = matches!(mode, SessionMode::DailyChallenge),
            "lesson session opened"
        );

        let blocked = hearts == 0;
        let (events, _) = broadcast::channel(64);
        let session = Arc::new(Self {
            session_id,
            lesson,
            mode,
            progress_store,
            account,
            inner: Mutex::new(SessionState {
                position,
                hearts,
                rubies,
                streak,
                previously_completed,
                blocked,
                ended: false,
                exit_requested: false,
                prompt,
                pending: None,
                rng,
            }),
            events,
        });
        if blocked {
            let _ = session.events.send(SessionEvent::HeartsDepleted);
        }
        Ok(session)
    }

    pub fn lesson(&self) -> &LessonDetail {
        &self.lesson
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.lock().await;
        let sign = &self.lesson.signs[guard.position.sign_index];
        SessionSnapshot {
            lesson_id: self.lesson.lesson_id,
            sign_index: guard.position.sign_index,
            sign_count: self.lesson.signs.len(),
            phase: guard.position.phase,
            percent: progress::percent(guard.position, self.lesson.signs.len()),
            hearts: guard.hearts,
            rubies: guard.rubies,
            blocked: guard.blocked,
            exit_requested: guard.exit_requested,
            sign_label: sign.text.clone(),
            video_url: if sign.video_url.is_empty() {
                self.lesson.video_url.clone()
            } else {
                Some(sign.video_url.clone())
            },
            quiz_options: guard.prompt.as_ref().map(|prompt| prompt.options.clone()),
        }
    }

    /// Clip finished playing: move to the reveal screen.
    pub async fn video_ended(self: &Arc<Self>) -> Result<(), SessionError> {
        let update = {
            let mut guard = self.inner.lock().await;
            Self::ensure_open(&guard)?;
            Self::ensure_phase(&guard, Phase::Video)?;
            guard.position.phase = Phase::Reveal;
            self.emit_phase(&guard);
            self.progress_update(&guard, true, 0)
        };
        self.spawn_persist(update);
        Ok(())
    }

    /// Learner confirmed the revealed name: arm the quiz.
    pub async fn continue_from_reveal(self: &Arc<Self>) -> Result<(), SessionError> {
        let update = {
            let mut guard = self.inner.lock().await;
            Self::ensure_open(&guard)?;
            Self::ensure_phase(&guard, Phase::Reveal)?;
            guard.position.phase = Phase::Quiz;
            let sign_index = guard.position.sign_index;
            let prompt = quiz::draw_prompt(&self.lesson.signs, sign_index, &mut guard.rng);
            let options = prompt.options.clone();
            guard.prompt = Some(prompt);
            self.emit_phase(&guard);
            let _ = self.events.send(SessionEvent::QuizPresented { options });
            self.progress_update(&guard, true, 0)
        };
        self.spawn_persist(update);
        Ok(())
    }

    /// Judge a quiz answer. The caller shows the feedback for the fixed
    /// delay and then calls [`advance_after_feedback`].
    ///
    /// [`advance_after_feedback`]: LessonSession::advance_after_feedback
    pub async fn select_option(
        self: &Arc<Self>,
        option_index: usize,
    ) -> Result<AnswerVerdict, SessionError> {
        let (verdict, update) = {
            let mut guard = self.inner.lock().await;
            Self::ensure_open(&guard)?;
            Self::ensure_phase(&guard, Phase::Quiz)?;
            if guard.pending.is_some() {
                return Err(SessionError::FeedbackPending);
            }
            if guard.blocked {
                return Err(SessionError::OutOfHearts);
            }
            let correct_index = match guard.prompt.as_ref() {
                Some(prompt) if option_index < prompt.options.len() => prompt.correct,
                Some(_) => return Err(SessionError::InvalidOption(option_index)),
                None => {
                    return Err(SessionError::WrongPhase {
                        expected: Phase::Quiz,
                        actual: guard.position.phase,
                    })
                }
            };

            let correct = correct_index == option_index;
            let _ = self.events.send(SessionEvent::AnswerJudged { correct });

            if correct {
                guard.pending = Some(PendingFeedback::Advance);
                (
                    AnswerVerdict {
                        correct: true,
                        hearts_remaining: guard.hearts,
                    },
                    None,
                )
            } else {
                guard.pending = Some(PendingFeedback::Retry);
                guard.hearts = guard.hearts.saturating_sub(1);
                let _ = self.events.send(SessionEvent::HeartLost {
                    remaining: guard.hearts,
                });
                if guard.hearts == 0 {
                    guard.blocked = true;
                    let _ = self.events.send(SessionEvent::HeartsDepleted);
                }
                let update = self.progress_update(&guard, false, 1);
                (
                    AnswerVerdict {
                        correct: false,
                        hearts_remaining: guard.hearts,
                    },
                    Some(update),
                )
            }
        };
        if let Some(update) = update {
            self.spawn_persist(update);
        }
        Ok(verdict)
    }

    /// The fixed feedback delay elapsed: advance past a correct answer
    /// (next sign, or completion on the last one) or re-arm the quiz
    /// after a wrong one.
    pub async fn advance_after_feedback(
        self: &Arc<Self>,
    ) -> Result<Option<SessionOutcome>, SessionError> {
        enum Next {
            Retry,
            Advance(ProgressUpdate),
            Complete,
        }

        let next = {
            let mut guard = self.inner.lock().await;
            Self::ensure_open(&guard)?;
            match guard.pending.take() {
                None => return Err(SessionError::NoFeedbackPending),
                Some(PendingFeedback::Retry) => {
                    let sign_index = guard.position.sign_index;
                    let prompt = quiz::draw_prompt(&self.lesson.signs, sign_index, &mut guard.rng);
                    let options = prompt.options.clone();
                    guard.prompt = Some(prompt);
                    let _ = self.events.send(SessionEvent::QuizPresented { options });
                    Next::Retry
                }
                Some(PendingFeedback::Advance) => {
                    if guard.position.sign_index + 1 < self.lesson.signs.len() {
                        guard.position.sign_index += 1;
                        guard.position.phase = Phase::Video;
                        guard.prompt = None;
                        self.emit_phase(&guard);
                        Next::Advance(self.progress_update(&guard, true, 0))
                    } else {
                        Next::Complete
                    }
                }
            }
        };

        match next {
            Next::Retry => Ok(None),
            Next::Advance(update) => {
                self.spawn_persist(update);
                Ok(None)
            }
            Next::Complete => Ok(Some(self.complete().await)),
        }
    }

    /// Learner asked to leave; the UI shows a confirmation first.
    pub async fn request_exit(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        Self::ensure_open(&guard)?;
        guard.exit_requested = true;
        let _ = self.events.send(SessionEvent::ExitRequested);
        Ok(())
    }

    pub async fn cancel_exit(&self) {
        let mut guard = self.inner.lock().await;
        guard.exit_requested = false;
    }

    /// Confirmed exit: write the current position through (regular,
    /// not-yet-completed lessons only) and end the session.
    pub async fn confirm_exit(self: &Arc<Self>) -> Result<SessionOutcome, SessionError> {
        let (percent, update) = {
            let mut guard = self.inner.lock().await;
            Self::ensure_open(&guard)?;
            guard.ended = true;
            guard.exit_requested = false;
            (
                progress::percent(guard.position, self.lesson.signs.len()),
                self.progress_update(&guard, true, 0),
            )
        };

        if self.persists_progress().await {
            if let Err(error) = self
                .progress_store
                .persist_progress(self.lesson.lesson_id, update)
                .await
            {
                warn!(
                    session = %self.session_id,
                    lesson_id = self.lesson.lesson_id.0,
                    %error,
                    "progress write on exit failed"
                );
            }
        }

        let outcome = SessionOutcome::Exited { percent };
        let _ = self
            .events
            .send(SessionEvent::SessionEnded(outcome.clone()));
        info!(session = %self.session_id, percent, "lesson session exited");
        Ok(outcome)
    }

    /// Re-read the heart budget after external replenishment; unblocks
    /// the quiz when the server reports hearts again.
    pub async fn refresh_hearts(&self) -> anyhow::Result<u8> {
        let refreshed = self.account.refresh_hearts().await?;
        let mut guard = self.inner.lock().await;
        guard.hearts = refreshed.hearts.clamp(0, i64::from(MAX_HEARTS)) as u8;
        if guard.hearts > 0 && guard.blocked {
            guard.blocked = false;
            let _ = self.events.send(SessionEvent::HeartsRestored {
                hearts: guard.hearts,
            });
        }
        Ok(guard.hearts)
    }

    async fn complete(self: &Arc<Self>) -> SessionOutcome {
        let final_update = {
            let mut guard = self.inner.lock().await;
            guard.ended = true;
            guard.prompt = None;
            ProgressUpdate {
                progress: progress::completion_percent(),
                is_correct: true,
                current_question: guard.position.sign_index,
                hearts_used: 0,
            }
        };

        let mut rubies_earned = self.lesson.rubies_reward;
        if matches!(self.mode, SessionMode::Lesson) {
            // The completion write is the one persistence call the
            // machine waits on: the congratulation screen shows the
            // server's reward, not the local estimate.
            match self
                .progress_store
                .persist_progress(self.lesson.lesson_id, final_update)
                .await
            {
                Ok(receipt) => {
                    rubies_earned = receipt.rubies_earned;
                    let mut guard = self.inner.lock().await;
                    guard.hearts = receipt.hearts_remaining.clamp(0, i64::from(MAX_HEARTS)) as u8;
                    guard.rubies += receipt.rubies_earned;
                    guard.previously_completed = true;
                }
                Err(error) => {
                    warn!(
                        session = %self.session_id,
                        lesson_id = self.lesson.lesson_id.0,
                        %error,
                        "completion write failed; falling back to the lesson's listed reward"
                    );
                }
            }

            match self.account.fetch_status().await {
                Ok(status) => {
                    let mut guard = self.inner.lock().await;
                    guard.streak = status.streak;
                }
                Err(error) => {
                    warn!(session = %self.session_id, %error, "status refresh after completion failed");
                }
            }
        }

        let streak = self.inner.lock().await.streak;
        let outcome = SessionOutcome::Completed {
            rubies_earned,
            streak,
        };
        let _ = self
            .events
            .send(SessionEvent::SessionEnded(outcome.clone()));
        info!(
            session = %self.session_id,
            lesson_id = self.lesson.lesson_id.0,
            rubies_earned,
            "lesson session completed"
        );
        outcome
    }

    fn ensure_open(state: &SessionState) -> Result<(), SessionError> {
        if state.ended {
            return Err(SessionError::Ended);
        }
        Ok(())
    }

    fn ensure_phase(state: &SessionState, expected: Phase) -> Result<(), SessionError> {
        if state.position.phase != expected {
            return Err(SessionError::WrongPhase {
                expected,
                actual: state.position.phase,
            });
        }
        Ok(())
    }

    fn emit_phase(&self, state: &SessionState) {
        let _ = self.events.send(SessionEvent::PhaseChanged {
            sign_index: state.position.sign_index,
            phase: state.position.phase,
            percent: progress::percent(state.position, self.lesson.signs.len()),
        });
    }

    fn progress_update(
        &self,
        state: &SessionState,
        is_correct: bool,
        hearts_used: u8,
    ) -> ProgressUpdate {
        ProgressUpdate {
            progress: progress::percent(state.position, self.lesson.signs.len()),
            is_correct,
            current_question: state.position.sign_index,
            hearts_used,
        }
    }

    async fn persists_progress(&self) -> bool {
        if matches!(self.mode, SessionMode::DailyChallenge) {
            return false;
        }
        !self.inner.lock().await.previously_completed
    }

    /// Fire-and-forget progress write. Failures are logged and
    /// swallowed; a successful receipt's heart count overwrites the
    /// local estimate.
    fn spawn_persist(self: &Arc<Self>, update: ProgressUpdate) {
        if matches!(self.mode, SessionMode::DailyChallenge) {
            return;
        }
        let session = Arc::clone(self);
        tokio::spawn(async move {
            if !session.persists_progress().await {
                return;
            }
            match session
                .progress_store
                .persist_progress(session.lesson.lesson_id, update)
                .await
            {
                Ok(receipt) => {
                    let mut guard = session.inner.lock().await;
                    guard.hearts = receipt.hearts_remaining.clamp(0, i64::from(MAX_HEARTS)) as u8;
                    if guard.hearts == 0 && !guard.blocked && !guard.ended {
                        guard.blocked = true;
                        let _ = session.events.send(SessionEvent::HeartsDepleted);
                    }
                    let _ = session.events.send(SessionEvent::ProgressPersisted {
                        percent: update.progress,
                    });
                }
                Err(error) => {
                    warn!(
                        session = %session.session_id,
                        lesson_id = session.lesson.lesson_id.0,
                        percent = update.progress,
                        %error,
                        "progress write failed"
                    );
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
