//! Ten rapid-fire rounds; faster answers score higher, misses burn
//! time.

use std::time::Duration;

use rand::{rngs::StdRng, seq::SliceRandom, Rng};
use shared::{domain::GameKind, protocol::SignSummary};

use super::{GameOutcome, GameSetupError, TIMEOUT_HEART_COST};

pub const TIME_LIMIT_SECS: u32 = 60;
pub const TOTAL_ROUNDS: u32 = 10;
const MIN_SIGNS: usize = 5;
const POOL_SIGNS: usize = 10;
const WRONG_OPTIONS: usize = 3;
const BASE_POINTS: u32 = 10;
const FAST_BONUS: u32 = 10;
const QUICK_BONUS: u32 = 5;
const FAST_CUTOFF: Duration = Duration::from_millis(1500);
const QUICK_CUTOFF: Duration = Duration::from_millis(2500);
const WRONG_PENALTY_SECS: u32 = 3;
const TIME_BONUS_DIVISOR: u32 = 2;

#[derive(Debug)]
pub struct SpeedChallenge {
    pool: Vec<SignSummary>,
    current: usize,
    options: Vec<String>,
    round: u32,
    time_left: u32,
    score: u32,
    total_response: Duration,
    answers: u32,
    outcome: Option<GameOutcome>,
    rng: StdRng,
}

impl SpeedChallenge {
    pub fn new(signs: &[SignSummary], mut rng: StdRng) -> Result<Self, GameSetupError> {
        if signs.len() < MIN_SIGNS {
            return Err(GameSetupError::NotEnoughSigns {
                kind: GameKind::Speed,
                required: MIN_SIGNS,
                got: signs.len(),
            });
        }
        let pool: Vec<SignSummary> = signs.iter().take(POOL_SIGNS).cloned().collect();
        let (current, options) = Self::draw_round(&pool, &mut rng);
        Ok(Self {
            pool,
            current,
            options,
            round: 1,
            time_left: TIME_LIMIT_SECS,
            score: 0,
            total_response: Duration::ZERO,
            answers: 0,
            outcome: None,
            rng,
        })
    }

    fn draw_round(pool: &[SignSummary], rng: &mut StdRng) -> (usize, Vec<String>) {
        let current = rng.gen_range(0..pool.len());
        let mut wrong: Vec<String> = pool
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != current)
            .map(|(_, sign)| sign.text.clone())
            .collect();
        wrong.shuffle(rng);
        wrong.truncate(WRONG_OPTIONS);
        let mut options = wrong;
        options.push(pool[current].text.clone());
        options.shuffle(rng);
        (current, options)
    }

    pub fn current_sign(&self) -> Option<&SignSummary> {
        if self.outcome.is_some() {
            return None;
        }
        self.pool.get(self.current)
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn round(&self) -> (u32, u32) {
        (self.round, TOTAL_ROUNDS)
    }

    /// Judge an answer together with its measured response time (the
    /// driver owns the stopwatch). Returns `None` once the game ended.
    pub fn answer(&mut self, option_index: usize, response: Duration) -> Option<bool> {
        if self.outcome.is_some() || option_index >= self.options.len() {
            return None;
        }
        self.total_response += response;
        self.answers += 1;

        let correct = self.options[option_index] == self.pool[self.current].text;
        if correct {
            let mut points = BASE_POINTS;
            if response < FAST_CUTOFF {
                points += FAST_BONUS;
            }
            if response < QUICK_CUTOFF {
                points += QUICK_BONUS;
            }
            self.score += points;
        } else {
            self.time_left = self.time_left.saturating_sub(WRONG_PENALTY_SECS);
            if self.time_left == 0 {
                self.outcome = Some(GameOutcome::Failure {
                    hearts_lost: TIMEOUT_HEART_COST,
                });
                return Some(correct);
            }
        }

        if self.round >= TOTAL_ROUNDS {
            self.outcome = Some(GameOutcome::Success {
                score: self.score + self.time_left / TIME_BONUS_DIVISOR + self.speed_bonus(),
            });
        } else {
            self.round += 1;
            let (current, options) = Self::draw_round(&self.pool, &mut self.rng);
            self.current = current;
            self.options = options;
        }
        Some(correct)
    }

    fn average_response(&self) -> Duration {
        if self.answers == 0 {
            return Duration::ZERO;
        }
        self.total_response / self.answers
    }

    fn speed_bonus(&self) -> u32 {
        let average = self.average_response();
        if average < Duration::from_secs(2) {
            50
        } else if average < Duration::from_secs(3) {
            30
        } else if average < Duration::from_secs(4) {
            10
        } else {
            0
        }
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
}
