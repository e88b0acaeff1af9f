//! Identify each sign from four labels, against the clock.

use rand::{rngs::StdRng, seq::SliceRandom};
use shared::{domain::GameKind, protocol::SignSummary};

use super::{GameOutcome, GameSetupError, TIMEOUT_HEART_COST};

pub const TIME_LIMIT_SECS: u32 = 75;
const MIN_SIGNS: usize = 2;
const ROUND_SIGNS: usize = 10;
const WRONG_OPTIONS: usize = 3;
const CORRECT_POINTS: u32 = 10;
const WRONG_PENALTY_SECS: u32 = 5;
const TIME_BONUS_DIVISOR: u32 = 3;

pub struct IdentificationGame {
    signs: Vec<SignSummary>,
    current: usize,
    options: Vec<String>,
    time_left: u32,
    score: u32,
    outcome: Option<GameOutcome>,
    rng: StdRng,
}

impl IdentificationGame {
    pub fn new(signs: &[SignSummary], mut rng: StdRng) -> Result<Self, GameSetupError> {
        if signs.len() < MIN_SIGNS {
            return Err(GameSetupError::NotEnoughSigns {
                kind: GameKind::Identification,
                required: MIN_SIGNS,
                got: signs.len(),
            });
        }
        let signs: Vec<SignSummary> = signs.iter().take(ROUND_SIGNS).cloned().collect();
        let options = Self::draw_options(&signs, 0, &mut rng);
        Ok(Self {
            signs,
            current: 0,
            options,
            time_left: TIME_LIMIT_SECS,
            score: 0,
            outcome: None,
            rng,
        })
    }

    fn draw_options(signs: &[SignSummary], current: usize, rng: &mut StdRng) -> Vec<String> {
        let mut wrong: Vec<String> = signs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != current)
            .map(|(_, sign)| sign.text.clone())
            .collect();
        wrong.shuffle(rng);
        wrong.truncate(WRONG_OPTIONS);
        let mut options = wrong;
        options.push(signs[current].text.clone());
        options.shuffle(rng);
        options
    }

    pub fn current_sign(&self) -> Option<&SignSummary> {
        if self.outcome.is_some() {
            return None;
        }
        self.signs.get(self.current)
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn round(&self) -> (usize, usize) {
        (self.current + 1, self.signs.len())
    }

    /// Judge the picked option and move to the next sign. Returns
    /// `None` when the game is already over.
    pub fn answer(&mut self, option_index: usize) -> Option<bool> {
        if self.outcome.is_some() || option_index >= self.options.len() {
            return None;
        }
        let correct = self.options[option_index] == self.signs[self.current].text;
        if correct {
            self.score += CORRECT_POINTS;
        } else {
            self.time_left = self.time_left.saturating_sub(WRONG_PENALTY_SECS);
            if self.time_left == 0 {
                self.outcome = Some(GameOutcome::Failure {
                    hearts_lost: TIMEOUT_HEART_COST,
                });
                return Some(correct);
            }
        }

        self.current += 1;
        if self.current >= self.signs.len() {
            self.outcome = Some(GameOutcome::Success {
                score: self.score + self.time_left / TIME_BONUS_DIVISOR,
            });
        } else {
            self.options = Self::draw_options(&self.signs, self.current, &mut self.rng);
        }
        Some(correct)
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

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::practice::test_support::practice_signs;

    fn game(sign_count: usize, seed: u64) -> IdentificationGame {
        IdentificationGame::new(&practice_signs(sign_count), StdRng::seed_from_u64(seed))
            .expect("setup")
    }

    fn correct_index(game: &IdentificationGame) -> usize {
        let label = game.current_sign().expect("sign").text.clone();
        game.options()
            .iter()
            .position(|option| *option == label)
            .expect("correct option present")
    }

    #[test]
    fn options_contain_the_current_label_and_three_others() {
        let game = game(10, 1);
        assert_eq!(game.options().len(), 4);
        let label = &game.current_sign().expect("sign").text;
        assert_eq!(
            game.options().iter().filter(|o| *o == label).count(),
            1
        );
    }

    #[test]
    fn answering_every_sign_correctly_wins_with_time_bonus() {
        let mut game = game(10, 2);
        for _ in 0..10 {
            let index = correct_index(&game);
            assert_eq!(game.answer(index), Some(true));
        }
        assert_eq!(
            game.outcome(),
            Some(GameOutcome::Success {
                score: 100 + TIME_LIMIT_SECS / 3
            })
        );
    }

    #[test]
    fn wrong_answer_burns_five_seconds_and_advances() {
        let mut game = game(10, 3);
        let wrong = (correct_index(&game) + 1) % game.options().len();
        assert_eq!(game.answer(wrong), Some(false));
        assert_eq!(game.time_left(), TIME_LIMIT_SECS - 5);
        assert_eq!(game.round().0, 2);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn penalties_can_run_the_clock_out() {
        let mut game = game(3, 4);
        // 75 s / 5 s per miss = 15 misses, but the round advances past
        // the last sign first; drain the clock with ticks instead, then
        // check a final penalty can no longer be applied.
        for _ in 0..TIME_LIMIT_SECS {
            game.tick();
        }
        assert_eq!(
            game.outcome(),
            Some(GameOutcome::Failure { hearts_lost: 1 })
        );
        assert_eq!(game.answer(0), None);
    }
}
