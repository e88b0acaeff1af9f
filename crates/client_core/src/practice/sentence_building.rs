//! Build each target sentence by picking the signs that compose it.

use rand::{seq::SliceRandom, Rng};
use shared::{
    domain::{GameKind, SignId},
    protocol::SignSummary,
};

use super::{GameOutcome, GameSetupError, TIMEOUT_HEART_COST};

pub const TIME_LIMIT_SECS: u32 = 180;
const MIN_SIGNS: usize = 8;
const POOL_SIGNS: usize = 12;
const SENTENCE_COUNT: usize = 5;
/// Sentence lengths follow the template cycle of the original
/// exercise set (subject+verb, subject+verb+object, ...).
const SENTENCE_LENGTHS: [usize; SENTENCE_COUNT] = [2, 3, 3, 2, 3];
const POINTS_PER_SIGN: u32 = 10;
const TIME_BONUS_DIVISOR: u32 = 5;

#[derive(Debug, Clone)]
pub struct Sentence {
    pub text: String,
    sign_ids: Vec<SignId>,
}

impl Sentence {
    pub fn len(&self) -> usize {
        self.sign_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sign_ids.is_empty()
    }
}

#[derive(Debug)]
pub struct SentenceBuildingGame {
    pool: Vec<SignSummary>,
    sentences: Vec<Sentence>,
    current: usize,
    selected: Vec<SignId>,
    time_left: u32,
    score: u32,
    outcome: Option<GameOutcome>,
}

impl SentenceBuildingGame {
    pub fn new<R: Rng + ?Sized>(
        signs: &[SignSummary],
        rng: &mut R,
    ) -> Result<Self, GameSetupError> {
        if signs.len() < MIN_SIGNS {
            return Err(GameSetupError::NotEnoughSigns {
                kind: GameKind::SentenceBuilding,
                required: MIN_SIGNS,
                got: signs.len(),
            });
        }
        let pool: Vec<SignSummary> = signs.iter().take(POOL_SIGNS).cloned().collect();
        let sentences = SENTENCE_LENGTHS
            .iter()
            .map(|length| {
                let picked: Vec<&SignSummary> = pool.choose_multiple(rng, *length).collect();
                Sentence {
                    text: picked
                        .iter()
                        .map(|sign| sign.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                    sign_ids: picked.iter().map(|sign| sign.sign_id).collect(),
                }
            })
            .collect();
        Ok(Self {
            pool,
            sentences,
            current: 0,
            selected: Vec::new(),
            time_left: TIME_LIMIT_SECS,
            score: 0,
            outcome: None,
        })
    }

    pub fn pool(&self) -> &[SignSummary] {
        &self.pool
    }

    pub fn current_sentence(&self) -> Option<&Sentence> {
        if self.outcome.is_some() {
            return None;
        }
        self.sentences.get(self.current)
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.current + 1, self.sentences.len())
    }

    pub fn selected(&self) -> &[SignId] {
        &self.selected
    }

    pub fn toggle_sign(&mut self, sign_id: SignId) {
        if self.outcome.is_some() {
            return;
        }
        if let Some(position) = self.selected.iter().position(|id| *id == sign_id) {
            self.selected.remove(position);
        } else {
            self.selected.push(sign_id);
        }
    }

    /// Judge the picked signs against the current sentence,
    /// order-insensitively. A miss clears the picks and stays on the
    /// same sentence; there is no time penalty in this game.
    pub fn check_sentence(&mut self) -> Option<bool> {
        if self.outcome.is_some() {
            return None;
        }
        let sentence = self.sentences.get(self.current)?;

        let mut expected: Vec<i64> = sentence.sign_ids.iter().map(|id| id.0).collect();
        let mut picked: Vec<i64> = self.selected.iter().map(|id| id.0).collect();
        expected.sort_unstable();
        picked.sort_unstable();

        let correct = expected == picked;
        self.selected.clear();
        if correct {
            self.score += POINTS_PER_SIGN * sentence.len() as u32;
            self.current += 1;
            if self.current >= self.sentences.len() {
                self.outcome = Some(GameOutcome::Success {
                    score: self.score + self.time_left / TIME_BONUS_DIVISOR,
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
    fn sentence_signs(&self, index: usize) -> Vec<SignId> {
        self.sentences[index].sign_ids.clone()
    }
}
