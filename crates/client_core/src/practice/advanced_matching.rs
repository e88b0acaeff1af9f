//! Match short phrases to the set of signs that spell them.

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use shared::{
    domain::{GameKind, SignId},
    protocol::SignSummary,
};

use super::{GameOutcome, GameSetupError, TIMEOUT_HEART_COST};

pub const TIME_LIMIT_SECS: u32 = 180;
const MIN_SIGNS: usize = 6;
const POOL_SIGNS: usize = 8;
const PHRASE_COUNT: usize = 5;
const POINTS_PER_SIGN: u32 = 10;
const WRONG_PENALTY_SECS: u32 = 5;
const TIME_BONUS_DIVISOR: u32 = 3;

#[derive(Debug, Clone)]
pub struct Phrase {
    pub text: String,
    sign_ids: Vec<SignId>,
}

impl Phrase {
    pub fn len(&self) -> usize {
        self.sign_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sign_ids.is_empty()
    }
}

pub struct AdvancedMatchingGame {
    pool: Vec<SignSummary>,
    phrases: Vec<Phrase>,
    selected_phrase: Option<usize>,
    selected_signs: Vec<SignId>,
    matched: HashSet<usize>,
    time_left: u32,
    score: u32,
    outcome: Option<GameOutcome>,
}

impl AdvancedMatchingGame {
    pub fn new<R: Rng + ?Sized>(
        signs: &[SignSummary],
        rng: &mut R,
    ) -> Result<Self, GameSetupError> {
        if signs.len() < MIN_SIGNS {
            return Err(GameSetupError::NotEnoughSigns {
                kind: GameKind::AdvancedMatching,
                required: MIN_SIGNS,
                got: signs.len(),
            });
        }
        let pool: Vec<SignSummary> = signs.iter().take(POOL_SIGNS).cloned().collect();
        let phrases = (0..PHRASE_COUNT)
            .map(|_| Self::draw_phrase(&pool, rng))
            .collect();
        Ok(Self {
            pool,
            phrases,
            selected_phrase: None,
            selected_signs: Vec::new(),
            matched: HashSet::new(),
            time_left: TIME_LIMIT_SECS,
            score: 0,
            outcome: None,
        })
    }

    /// Two or three distinct signs joined into a phrase. Drawing
    /// without replacement keeps every phrase reproducible by toggling
    /// signs, which can be picked at most once each.
    fn draw_phrase<R: Rng + ?Sized>(pool: &[SignSummary], rng: &mut R) -> Phrase {
        let length = if rng.gen_bool(0.5) { 2 } else { 3 };
        let picked: Vec<&SignSummary> = pool.choose_multiple(rng, length).collect();
        Phrase {
            text: picked
                .iter()
                .map(|sign| sign.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            sign_ids: picked.iter().map(|sign| sign.sign_id).collect(),
        }
    }

    pub fn pool(&self) -> &[SignSummary] {
        &self.pool
    }

    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    pub fn is_matched(&self, phrase_index: usize) -> bool {
        self.matched.contains(&phrase_index)
    }

    pub fn select_phrase(&mut self, phrase_index: usize) {
        if self.outcome.is_some()
            || phrase_index >= self.phrases.len()
            || self.matched.contains(&phrase_index)
        {
            return;
        }
        self.selected_phrase = Some(phrase_index);
        self.selected_signs.clear();
    }

    /// Toggle a sign in or out of the candidate set, capped at the
    /// selected phrase's length.
    pub fn toggle_sign(&mut self, sign_id: SignId) {
        if self.outcome.is_some() {
            return;
        }
        let Some(phrase_index) = self.selected_phrase else {
            return;
        };
        if let Some(position) = self.selected_signs.iter().position(|id| *id == sign_id) {
            self.selected_signs.remove(position);
        } else if self.selected_signs.len() < self.phrases[phrase_index].len() {
            self.selected_signs.push(sign_id);
        }
    }

    /// Judge the candidate set against the selected phrase,
    /// order-insensitively. Returns `None` when no full candidate set
    /// is selected.
    pub fn check_match(&mut self) -> Option<bool> {
        if self.outcome.is_some() {
            return None;
        }
        let phrase_index = self.selected_phrase?;
        let phrase = &self.phrases[phrase_index];
        if self.selected_signs.len() != phrase.len() {
            return None;
        }

        let mut expected: Vec<i64> = phrase.sign_ids.iter().map(|id| id.0).collect();
        let mut picked: Vec<i64> = self.selected_signs.iter().map(|id| id.0).collect();
        expected.sort_unstable();
        picked.sort_unstable();

        let correct = expected == picked;
        if correct {
            self.score += POINTS_PER_SIGN * phrase.len() as u32;
            self.matched.insert(phrase_index);
            self.selected_phrase = None;
            self.selected_signs.clear();
            if self.matched.len() == self.phrases.len() {
                self.outcome = Some(GameOutcome::Success {
                    score: self.score + self.time_left / TIME_BONUS_DIVISOR,
                });
            }
        } else {
            self.selected_signs.clear();
            self.time_left = self.time_left.saturating_sub(WRONG_PENALTY_SECS);
            if self.time_left == 0 {
                self.outcome = Some(GameOutcome::Failure {
                    hearts_lost: TIMEOUT_HEART_COST,
                });
            }
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

    #[cfg(test)]
    fn phrase_signs(&self, phrase_index: usize) -> Vec<SignId> {
        self.phrases[phrase_index].sign_ids.clone()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::practice::test_support::practice_signs;

    fn game(seed: u64) -> AdvancedMatchingGame {
        AdvancedMatchingGame::new(&practice_signs(8), &mut StdRng::seed_from_u64(seed))
            .expect("setup")
    }

    #[test]
    fn phrases_use_distinct_signs() {
        let game = game(1);
        for index in 0..game.phrases().len() {
            let mut ids: Vec<i64> = game.phrase_signs(index).iter().map(|id| id.0).collect();
            let before = ids.len();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), before);
            assert!(before == 2 || before == 3);
        }
    }

    #[test]
    fn matching_every_phrase_wins_with_time_bonus() {
        let mut game = game(2);
        let mut expected_score = 0;
        for index in 0..game.phrases().len() {
            game.select_phrase(index);
            for sign_id in game.phrase_signs(index) {
                game.toggle_sign(sign_id);
            }
            assert_eq!(game.check_match(), Some(true));
            expected_score += 10 * game.phrases()[index].len() as u32;
        }
        assert_eq!(
            game.outcome(),
            Some(GameOutcome::Success {
                score: expected_score + TIME_LIMIT_SECS / 3
            })
        );
    }

    #[test]
    fn order_of_selection_does_not_matter() {
        let mut game = game(3);
        game.select_phrase(0);
        let mut ids = game.phrase_signs(0);
        ids.reverse();
        for sign_id in ids {
            game.toggle_sign(sign_id);
        }
        assert_eq!(game.check_match(), Some(true));
    }

    #[test]
    fn wrong_candidate_set_burns_time_and_clears_selection() {
        let mut game = game(4);
        game.select_phrase(0);
        let target = game.phrase_signs(0);
        let decoy = game
            .pool()
            .iter()
            .map(|sign| sign.sign_id)
            .find(|id| !target.contains(id))
            .expect("a sign outside the phrase");
        game.toggle_sign(decoy);
        for sign_id in &target[..target.len() - 1] {
            game.toggle_sign(*sign_id);
        }
        assert_eq!(game.check_match(), Some(false));
        assert_eq!(game.time_left(), TIME_LIMIT_SECS - 5);
        assert!(!game.is_matched(0));
    }

    #[test]
    fn incomplete_candidate_set_is_not_judged() {
        let mut game = game(5);
        game.select_phrase(0);
        game.toggle_sign(game.phrase_signs(0)[0]);
        assert_eq!(game.check_match(), None);
        assert_eq!(game.time_left(), TIME_LIMIT_SECS);
    }
}
