use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{Difficulty, LessonId, UnitId},
    protocol::{
        ChallengeCompletion, DailyChallenge, HeartPackage, HeartPurchaseReceipt, HeartRefresh,
        LessonDetail, PracticeLevels, PracticeReceipt, PracticeReport, PracticeWallet,
        ProgressReceipt, ProgressSnapshot, ProgressUpdate, SignSummary, UnitProgress, UnitSummary,
        UnlockStatus, UserStatus,
    },
};

mod http;
pub mod practice;
pub mod progress;
pub mod quiz;
mod session;

pub use http::HttpApi;
pub use session::{
    AnswerVerdict, LessonSession, SessionError, SessionEvent, SessionLoadError, SessionMode,
    SessionOutcome, SessionSnapshot, CORRECT_ADVANCE_DELAY, INCORRECT_RETRY_DELAY, MAX_HEARTS,
};

/// Read side of the lesson catalog: units, lessons and their unlock state.
#[async_trait]
pub trait LessonCatalog: Send + Sync {
    async fn fetch_lesson(&self, lesson_id: LessonId) -> Result<LessonDetail>;
    async fn list_units(&self) -> Result<Vec<UnitSummary>>;
    async fn unit_status(&self, unit_id: UnitId) -> Result<UnlockStatus>;
    async fn lesson_status(&self, lesson_id: LessonId) -> Result<UnlockStatus>;
    async fn unit_progress(&self, unit_id: UnitId) -> Result<UnitProgress>;
}

/// Saved lesson progress. The session machine writes through this after
/// every phase transition and reads it once, when resuming.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn fetch_progress(&self, lesson_id: LessonId) -> Result<ProgressSnapshot>;
    async fn persist_progress(
        &self,
        lesson_id: LessonId,
        update: ProgressUpdate,
    ) -> Result<ProgressReceipt>;
}

/// Heart/ruby economy and account status. All amounts are
/// server-authoritative; the client never computes them itself.
#[async_trait]
pub trait AccountGateway: Send + Sync {
    async fn fetch_status(&self) -> Result<UserStatus>;
    async fn refresh_hearts(&self) -> Result<HeartRefresh>;
    async fn heart_packages(&self) -> Result<Vec<HeartPackage>>;
    async fn purchase_hearts(&self, package_id: i64) -> Result<HeartPurchaseReceipt>;
}

#[async_trait]
pub trait ChallengeGateway: Send + Sync {
    async fn daily_challenge(&self) -> Result<DailyChallenge>;
    async fn complete_daily_challenge(&self) -> Result<ChallengeCompletion>;
}

#[async_trait]
pub trait PracticeGateway: Send + Sync {
    async fn practice_signs(&self, difficulty: Difficulty) -> Result<Vec<SignSummary>>;
    async fn practice_levels(&self) -> Result<PracticeLevels>;
    async fn practice_wallet(&self) -> Result<PracticeWallet>;
    async fn report_outcome(&self, report: PracticeReport) -> Result<PracticeReceipt>;
}

/// Null store for sessions that must never touch saved progress
/// (daily challenges).
pub struct MissingProgressStore;

#[async_trait]
impl ProgressStore for MissingProgressStore {
    async fn fetch_progress(&self, lesson_id: LessonId) -> Result<ProgressSnapshot> {
        Err(anyhow!(
            "progress store unavailable for lesson {}",
            lesson_id.0
        ))
    }

    async fn persist_progress(
        &self,
        lesson_id: LessonId,
        _update: ProgressUpdate,
    ) -> Result<ProgressReceipt> {
        Err(anyhow!(
            "progress store unavailable for lesson {}",
            lesson_id.0
        ))
    }
}

pub struct MissingAccountGateway;

#[async_trait]
impl AccountGateway for MissingAccountGateway {
    async fn fetch_status(&self) -> Result<UserStatus> {
        Err(anyhow!("account gateway is unavailable"))
    }

    async fn refresh_hearts(&self) -> Result<HeartRefresh> {
        Err(anyhow!("account gateway is unavailable"))
    }

    async fn heart_packages(&self) -> Result<Vec<HeartPackage>> {
        Err(anyhow!("account gateway is unavailable"))
    }

    async fn purchase_hearts(&self, _package_id: i64) -> Result<HeartPurchaseReceipt> {
        Err(anyhow!("account gateway is unavailable"))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
