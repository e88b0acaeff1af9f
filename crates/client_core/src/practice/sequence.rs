//! Watch a sequence of signs, then reproduce it in order. Sequences
//! grow by one sign each round.

use rand::{rngs::StdRng, Rng};
use shared::{
    domain::{GameKind, SignId},
    protocol::SignSummary,
};

use super::{GameOutcome, GameSetupError, TIMEOUT_HEART_COST};

pub const TIME_LIMIT_SECS: u32 = 90;
pub const TOTAL_ROUNDS: u32 = 5;
/// How long the driver shows each demonstrated sign.
pub const DEMO_STEP: std::time::Duration = std::time::Duration::from_millis(1500);
const MIN_SIGNS: usize = 5;
const POOL_SIGNS: usize = 10;
const ROUND_POINTS: u32 = 10;
const WRONG_PENALTY_SECS: u32 = 5;
const TIME_BONUS_DIVISOR: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePhase {
    /// The target sequence is being demonstrated one sign at a time.
    Showing,
    /// Waiting for the learner to reproduce it.
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectResult {
    Ignored,
    /// Accepted into the partial reproduction.
    Accepted,
    /// The reproduction is complete and was judged.
    Judged(bool),
}

pub struct SequenceGame {
    pool: Vec<SignSummary>,
    sequence: Vec<SignId>,
    player: Vec<SignId>,
    shown: usize,
    round: u32,
    phase: SequencePhase,
    time_left: u32,
    score: u32,
    outcome: Option<GameOutcome>,
    rng: StdRng,
}

impl SequenceGame {
    pub fn new(signs: &[SignSummary], mut rng: StdRng) -> Result<Self, GameSetupError> {
        if signs.len() < MIN_SIGNS {
            return Err(GameSetupError::NotEnoughSigns {
                kind: GameKind::Sequence,
                required: MIN_SIGNS,
                got: signs.len(),
            });
        }
        let pool: Vec<SignSummary> = signs.iter().take(POOL_SIGNS).cloned().collect();
        let sequence = Self::draw_sequence(&pool, 1, &mut rng);
        Ok(Self {
            pool,
            sequence,
            player: Vec::new(),
            shown: 0,
            round: 1,
            phase: SequencePhase::Showing,
            time_left: TIME_LIMIT_SECS,
            score: 0,
            outcome: None,
            rng,
        })
    }

    fn draw_sequence(pool: &[SignSummary], round: u32, rng: &mut StdRng) -> Vec<SignId> {
        let length = 1 + round as usize;
        (0..length)
            .map(|_| pool[rng.gen_range(0..pool.len())].sign_id)
            .collect()
    }

    pub fn phase(&self) -> SequencePhase {
        self.phase
    }

    pub fn round(&self) -> (u32, u32) {
        (self.round, TOTAL_ROUNDS)
    }

    pub fn pool(&self) -> &[SignSummary] {
        &self.pool
    }

    /// The sign currently being demonstrated, if any.
    pub fn showing(&self) -> Option<&SignSummary> {
        if self.phase != SequencePhase::Showing || self.outcome.is_some() {
            return None;
        }
        let sign_id = *self.sequence.get(self.shown)?;
        self.pool.iter().find(|sign| sign.sign_id == sign_id)
    }

    /// Demonstration step elapsed: show the next sign, or open input
    /// once the whole sequence has been shown.
    pub fn advance_demo(&mut self) {
        if self.phase != SequencePhase::Showing || self.outcome.is_some() {
            return;
        }
        self.shown += 1;
        if self.shown >= self.sequence.len() {
            self.shown = 0;
            self.phase = SequencePhase::Input;
        }
    }

    pub fn select(&mut self, sign_id: SignId) -> SelectResult {
        if self.outcome.is_some() || self.phase != SequencePhase::Input {
            return SelectResult::Ignored;
        }
        self.player.push(sign_id);
        if self.player.len() < self.sequence.len() {
            return SelectResult::Accepted;
        }

        let correct = self.player == self.sequence;
        self.player.clear();
        if correct {
            self.score += ROUND_POINTS * self.round;
            if self.round >= TOTAL_ROUNDS {
                self.outcome = Some(GameOutcome::Success {
                    score: self.score + self.time_left / TIME_BONUS_DIVISOR,
                });
            } else {
                self.round += 1;
                self.sequence = Self::draw_sequence(&self.pool, self.round, &mut self.rng);
                self.shown = 0;
                self.phase = SequencePhase::Showing;
            }
        } else {
            self.time_left = self.time_left.saturating_sub(WRONG_PENALTY_SECS);
            if self.time_left == 0 {
                self.outcome = Some(GameOutcome::Failure {
                    hearts_lost: TIMEOUT_HEART_COST,
                });
            } else {
                // Same sequence is demonstrated again.
                self.shown = 0;
                self.phase = SequencePhase::Showing;
            }
        }
        SelectResult::Judged(correct)
    }

    pub fn tick(&mut self) -> Option<GameOutcome> {
        if self.outcome.is_none() {
            self.time_left = self.time_left.saturating_sub(1);
            if self.time_left == 0 {
                self.outcome = Some(GameOutcome::Failure {
                    hearts_lost: TIMEOUT_HEART_COST,
                });
            }
        }
        self.outcome
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    #[cfg(test)]
    fn target(&self) -> Vec<SignId> {
        self.sequence.clone()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::practice::test_support::practice_signs;

    fn game(seed: u64) -> SequenceGame {
        SequenceGame::new(&practice_signs(8), StdRng::seed_from_u64(seed)).expect("setup")
    }

    fn watch_demo(game: &mut SequenceGame) {
        while game.phase() == SequencePhase::Showing {
            assert!(game.showing().is_some());
            game.advance_demo();
        }
    }

    #[test]
    fn sequences_grow_by_one_each_round() {
        let mut game = game(1);
        for round in 1..=TOTAL_ROUNDS {
            assert_eq!(game.round().0, round);
            assert_eq!(game.target().len(), 1 + round as usize);
            watch_demo(&mut game);
            for sign_id in game.target() {
                game.select(sign_id);
            }
            if round < TOTAL_ROUNDS {
                assert!(game.outcome().is_none());
            }
        }
        // 10+20+30+40+50 plus the untouched clock bonus.
        assert_eq!(
            game.outcome(),
            Some(GameOutcome::Success {
                score: 150 + TIME_LIMIT_SECS / 3
            })
        );
    }

    #[test]
    fn selections_are_ignored_during_the_demo() {
        let mut game = game(2);
        let sign_id = game.pool()[0].sign_id;
        assert_eq!(game.select(sign_id), SelectResult::Ignored);
    }

    #[test]
    fn wrong_reproduction_replays_the_same_sequence() {
        let mut game = game(3);
        let target = game.target();
        watch_demo(&mut game);
        // Reproduce the sequence with the last element wrong.
        for sign_id in &target[..target.len() - 1] {
            assert_eq!(game.select(*sign_id), SelectResult::Accepted);
        }
        let wrong = game
            .pool()
            .iter()
            .map(|sign| sign.sign_id)
            .find(|id| *id != target[target.len() - 1])
            .expect("a wrong sign");
        assert_eq!(game.select(wrong), SelectResult::Judged(false));
        assert_eq!(game.time_left(), TIME_LIMIT_SECS - 5);
        assert_eq!(game.round().0, 1);
        assert_eq!(game.target(), target);
        assert_eq!(game.phase(), SequencePhase::Showing);
    }
}
