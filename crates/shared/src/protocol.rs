use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ChallengeId, GameId, GameKind, LessonId, LevelId, SignId, UnitId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignSummary {
    #[serde(rename = "id")]
    pub sign_id: SignId,
    pub text: String,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonDetail {
    #[serde(rename = "id")]
    pub lesson_id: LessonId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub signs: Vec<SignSummary>,
    #[serde(default)]
    pub rubies_reward: i64,
    /// Lesson-level fallback used when a sign carries no clip of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSummary {
    #[serde(rename = "id")]
    pub lesson_id: LessonId,
    pub title: String,
    #[serde(default)]
    pub rubies_reward: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSummary {
    #[serde(rename = "id")]
    pub unit_id: UnitId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub lessons: Vec<LessonSummary>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnlockStatus {
    pub unlocked: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnitProgress {
    pub progress_percentage: f64,
    pub completed_lessons: u32,
    pub total_lessons: u32,
}

/// Saved lesson progress as the backend reports it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub progress: u8,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub progress: u8,
    pub is_correct: bool,
    pub current_question: usize,
    #[serde(default)]
    pub hearts_used: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProgressReceipt {
    pub progress: u8,
    pub completed: bool,
    pub hearts_remaining: i64,
    #[serde(default)]
    pub rubies_earned: i64,
    #[serde(default)]
    pub next_lesson_unlocked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatus {
    pub user_id: UserId,
    pub rubies: i64,
    pub hearts: i64,
    pub streak: i64,
    #[serde(default)]
    pub certificate: bool,
    /// Per-unit progress blob; opaque to this client.
    #[serde(default)]
    pub progress: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeartRefresh {
    pub hearts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartPackage {
    #[serde(rename = "id")]
    pub package_id: i64,
    pub name: String,
    pub hearts_amount: i64,
    pub ruby_cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartPurchaseReceipt {
    pub user_id: UserId,
    pub hearts: i64,
    pub rubies: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyChallenge {
    #[serde(rename = "id")]
    pub challenge_id: ChallengeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeCompletion {
    #[serde(default)]
    pub rubies_earned: i64,
    #[serde(default)]
    pub streak: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeWallet {
    pub hearts: i64,
    pub rubies: i64,
    /// Keyed by "{level_id}_{game_id}", as the backend stores them.
    #[serde(default, rename = "highScores")]
    pub high_scores: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeReport {
    pub level_id: LevelId,
    pub game_id: GameKind,
    pub score: u32,
    #[serde(default)]
    pub hearts_lost: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubies_earned: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rubies: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hearts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_high_score: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeGameInfo {
    #[serde(rename = "id")]
    pub game_id: GameId,
    pub game_identifier: GameKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeLevel {
    #[serde(rename = "id")]
    pub level_id: LevelId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required_progress: i64,
    #[serde(default)]
    pub games: Vec<PracticeGameInfo>,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub progress: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeLevels {
    #[serde(default)]
    pub levels: Vec<PracticeLevel>,
    #[serde(default)]
    pub overall_progress: f64,
}
