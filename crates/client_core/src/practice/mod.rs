//! Practice mini-games.
//!
//! Six engines sharing one contract: built from a batch of practice
//! signs, advanced by a 1 Hz `tick`, finished with either a score or a
//! heart loss. Each engine owns its own countdown and scoring state;
//! time only advances through `tick`, never from the wall clock.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    domain::{Difficulty, GameKind, LevelId},
    protocol::{PracticeLevel, PracticeReceipt, PracticeReport, PracticeWallet, SignSummary},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::PracticeGateway;

mod advanced_matching;
mod identification;
mod matching;
mod sentence_building;
mod sequence;
mod speed;
#[cfg(test)]
pub(crate) mod test_support;

pub use advanced_matching::{AdvancedMatchingGame, Phrase};
pub use identification::IdentificationGame;
pub use matching::{Card, CardFace, FlipOutcome, MatchingGame};
pub use sentence_building::{Sentence, SentenceBuildingGame};
pub use sequence::{SelectResult, SequenceGame, SequencePhase};
pub use speed::SpeedChallenge;

/// Hearts lost when a game runs out of time.
pub const TIMEOUT_HEART_COST: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Success { score: u32 },
    Failure { hearts_lost: u8 },
}

#[derive(Debug, Error)]
pub enum GameSetupError {
    #[error("{kind:?} needs at least {required} signs, got {got}")]
    NotEnoughSigns {
        kind: GameKind,
        required: usize,
        got: usize,
    },
}

/// The variant type over all six engines; UIs that only need the shared
/// surface (countdown, score, outcome) drive it through this enum and
/// match on the variant for game-specific input.
pub enum PracticeGame {
    Matching(MatchingGame),
    Identification(IdentificationGame),
    Speed(SpeedChallenge),
    Sequence(SequenceGame),
    AdvancedMatching(AdvancedMatchingGame),
    SentenceBuilding(SentenceBuildingGame),
}

impl PracticeGame {
    pub fn new(
        kind: GameKind,
        signs: &[SignSummary],
        mut rng: StdRng,
    ) -> Result<Self, GameSetupError> {
        match kind {
            GameKind::Matching => Ok(Self::Matching(MatchingGame::new(signs, &mut rng)?)),
            GameKind::Identification => {
                Ok(Self::Identification(IdentificationGame::new(signs, rng)?))
            }
            GameKind::Speed => Ok(Self::Speed(SpeedChallenge::new(signs, rng)?)),
            GameKind::Sequence => Ok(Self::Sequence(SequenceGame::new(signs, rng)?)),
            GameKind::AdvancedMatching => Ok(Self::AdvancedMatching(AdvancedMatchingGame::new(
                signs, &mut rng,
            )?)),
            GameKind::SentenceBuilding => Ok(Self::SentenceBuilding(SentenceBuildingGame::new(
                signs, &mut rng,
            )?)),
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            Self::Matching(_) => GameKind::Matching,
            Self::Identification(_) => GameKind::Identification,
            Self::Speed(_) => GameKind::Speed,
            Self::Sequence(_) => GameKind::Sequence,
            Self::AdvancedMatching(_) => GameKind::AdvancedMatching,
            Self::SentenceBuilding(_) => GameKind::SentenceBuilding,
        }
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Option<GameOutcome> {
        match self {
            Self::Matching(game) => game.tick(),
            Self::Identification(game) => game.tick(),
            Self::Speed(game) => game.tick(),
            Self::Sequence(game) => game.tick(),
            Self::AdvancedMatching(game) => game.tick(),
            Self::SentenceBuilding(game) => game.tick(),
        }
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        match self {
            Self::Matching(game) => game.outcome(),
            Self::Identification(game) => game.outcome(),
            Self::Speed(game) => game.outcome(),
            Self::Sequence(game) => game.outcome(),
            Self::AdvancedMatching(game) => game.outcome(),
            Self::SentenceBuilding(game) => game.outcome(),
        }
    }

    pub fn time_left(&self) -> u32 {
        match self {
            Self::Matching(game) => game.time_left(),
            Self::Identification(game) => game.time_left(),
            Self::Speed(game) => game.time_left(),
            Self::Sequence(game) => game.time_left(),
            Self::AdvancedMatching(game) => game.time_left(),
            Self::SentenceBuilding(game) => game.time_left(),
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            Self::Matching(game) => game.score(),
            Self::Identification(game) => game.score(),
            Self::Speed(game) => game.score(),
            Self::Sequence(game) => game.score(),
            Self::AdvancedMatching(game) => game.score(),
            Self::SentenceBuilding(game) => game.score(),
        }
    }
}

/// Difficulty is encoded in the level name on the backend.
pub fn difficulty_for_level(level_name: &str) -> Difficulty {
    let name = level_name.to_ascii_lowercase();
    if name.contains("advanced") {
        Difficulty::Advanced
    } else if name.contains("intermediate") {
        Difficulty::Intermediate
    } else {
        Difficulty::Beginner
    }
}

pub fn high_score_key(level_id: LevelId, kind: GameKind) -> String {
    format!("{}_{}", level_id.0, kind.identifier())
}

/// One play-through of one game: loads the level's signs and the
/// learner's wallet, runs the engine, and reports the outcome with the
/// level's difficulty multiplier applied. Rubies, hearts and high
/// scores in the receipt are server-authoritative.
pub struct PracticeRound {
    gateway: Arc<dyn PracticeGateway>,
    level_id: LevelId,
    difficulty: Difficulty,
    wallet: PracticeWallet,
    high_score: u32,
    game: PracticeGame,
}

impl PracticeRound {
    pub async fn begin(
        gateway: Arc<dyn PracticeGateway>,
        level: &PracticeLevel,
        kind: GameKind,
    ) -> anyhow::Result<Self> {
        Self::begin_with_rng(gateway, level, kind, StdRng::from_entropy()).await
    }

    pub async fn begin_with_rng(
        gateway: Arc<dyn PracticeGateway>,
        level: &PracticeLevel,
        kind: GameKind,
        rng: StdRng,
    ) -> anyhow::Result<Self> {
        let difficulty = difficulty_for_level(&level.name);
        let signs = gateway.practice_signs(difficulty).await?;
        // The wallet is display data; start from an empty one if the
        // fetch fails, exactly as the web client does.
        let wallet = match gateway.practice_wallet().await {
            Ok(wallet) => wallet,
            Err(error) => {
                warn!(level_id = level.level_id.0, %error, "wallet fetch failed");
                PracticeWallet {
                    hearts: 5,
                    rubies: 0,
                    high_scores: Default::default(),
                }
            }
        };
        let high_score = wallet
            .high_scores
            .get(&high_score_key(level.level_id, kind))
            .copied()
            .unwrap_or(0);
        let game = PracticeGame::new(kind, &signs, rng)?;
        info!(
            level_id = level.level_id.0,
            game = kind.identifier(),
            signs = signs.len(),
            "practice round started"
        );
        Ok(Self {
            gateway,
            level_id: level.level_id,
            difficulty,
            wallet,
            high_score,
            game,
        })
    }

    pub fn game_mut(&mut self) -> &mut PracticeGame {
        &mut self.game
    }

    pub fn game(&self) -> &PracticeGame {
        &self.game
    }

    pub fn wallet(&self) -> &PracticeWallet {
        &self.wallet
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub async fn finish(self, outcome: GameOutcome) -> anyhow::Result<PracticeReceipt> {
        let (score, hearts_lost) = match outcome {
            GameOutcome::Success { score } => (score * self.difficulty.multiplier(), 0),
            GameOutcome::Failure { hearts_lost } => (0, hearts_lost),
        };
        let receipt = self
            .gateway
            .report_outcome(PracticeReport {
                level_id: self.level_id,
                game_id: self.game.kind(),
                score,
                hearts_lost,
            })
            .await?;
        info!(
            level_id = self.level_id.0,
            game = self.game.kind().identifier(),
            score,
            hearts_lost,
            "practice round reported"
        );
        Ok(receipt)
    }
}
