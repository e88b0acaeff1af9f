//! Memory-style pairing of sign clips with their labels.

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use shared::{
    domain::{GameKind, SignId},
    protocol::SignSummary,
};

use super::{GameOutcome, GameSetupError, TIMEOUT_HEART_COST};

pub const TIME_LIMIT_SECS: u32 = 90;
const MIN_SIGNS: usize = 6;
const BOARD_SIGNS: usize = 8;
const MATCH_POINTS: u32 = 20;
const TIME_BONUS_DIVISOR: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardFace {
    Clip,
    Label,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub sign_id: SignId,
    pub face: CardFace,
    /// Video URL for clip cards, label text for label cards.
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// First card of a pair turned up.
    FaceUp,
    Matched,
    /// Pair stays up until [`MatchingGame::resolve_mismatch`].
    Mismatched,
}

#[derive(Debug)]
pub struct MatchingGame {
    cards: Vec<Card>,
    face_up: Option<usize>,
    mismatch: Option<(usize, usize)>,
    matched: HashSet<usize>,
    time_left: u32,
    score: u32,
    outcome: Option<GameOutcome>,
}

impl MatchingGame {
    pub fn new<R: Rng + ?Sized>(
        signs: &[SignSummary],
        rng: &mut R,
    ) -> Result<Self, GameSetupError> {
        if signs.len() < MIN_SIGNS {
            return Err(GameSetupError::NotEnoughSigns {
                kind: GameKind::Matching,
                required: MIN_SIGNS,
                got: signs.len(),
            });
        }

        let mut cards: Vec<Card> = signs
            .iter()
            .take(BOARD_SIGNS)
            .flat_map(|sign| {
                [
                    Card {
                        sign_id: sign.sign_id,
                        face: CardFace::Clip,
                        content: sign.video_url.clone(),
                    },
                    Card {
                        sign_id: sign.sign_id,
                        face: CardFace::Label,
                        content: sign.text.clone(),
                    },
                ]
            })
            .collect();
        cards.shuffle(rng);

        Ok(Self {
            cards,
            face_up: None,
            mismatch: None,
            matched: HashSet::new(),
            time_left: TIME_LIMIT_SECS,
            score: 0,
            outcome: None,
        })
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn is_matched(&self, index: usize) -> bool {
        self.matched.contains(&index)
    }

    /// Turn a card up. Returns `None` when the input is ignored: game
    /// over, board locked on a mismatch, or the card is already up.
    pub fn flip(&mut self, index: usize) -> Option<FlipOutcome> {
        if self.outcome.is_some() || self.mismatch.is_some() {
            return None;
        }
        if index >= self.cards.len() || self.matched.contains(&index) || self.face_up == Some(index)
        {
            return None;
        }

        let Some(first) = self.face_up.take() else {
            self.face_up = Some(index);
            return Some(FlipOutcome::FaceUp);
        };

        if self.cards[first].sign_id == self.cards[index].sign_id {
            self.matched.insert(first);
            self.matched.insert(index);
            self.score += MATCH_POINTS;
            if self.matched.len() == self.cards.len() {
                self.outcome = Some(GameOutcome::Success {
                    score: self.score + self.time_left / TIME_BONUS_DIVISOR,
                });
            }
            Some(FlipOutcome::Matched)
        } else {
            self.mismatch = Some((first, index));
            Some(FlipOutcome::Mismatched)
        }
    }

    /// Flip-back delay elapsed: turn the mismatched pair down and
    /// unlock the board.
    pub fn resolve_mismatch(&mut self) {
        self.mismatch = None;
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
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::practice::test_support::practice_signs;

    fn game(sign_count: usize, seed: u64) -> MatchingGame {
        let signs = practice_signs(sign_count);
        MatchingGame::new(&signs, &mut StdRng::seed_from_u64(seed)).expect("setup")
    }

    fn pair_indices(game: &MatchingGame, sign_id: SignId) -> (usize, usize) {
        let indices: Vec<usize> = game
            .cards()
            .iter()
            .enumerate()
            .filter(|(_, card)| card.sign_id == sign_id)
            .map(|(i, _)| i)
            .collect();
        (indices[0], indices[1])
    }

    #[test]
    fn rejects_fewer_than_six_signs() {
        let signs = practice_signs(5);
        let err = MatchingGame::new(&signs, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(
            err,
            GameSetupError::NotEnoughSigns { required: 6, .. }
        ));
    }

    #[test]
    fn caps_board_at_eight_pairs() {
        assert_eq!(game(12, 2).cards().len(), 16);
    }

    #[test]
    fn matching_all_pairs_wins_with_time_bonus() {
        let mut game = game(6, 3);
        let mut sign_ids: Vec<i64> = game.cards().iter().map(|card| card.sign_id.0).collect();
        sign_ids.sort_unstable();
        sign_ids.dedup();
        for raw in sign_ids {
            let (a, b) = pair_indices(&game, SignId(raw));
            assert_eq!(game.flip(a), Some(FlipOutcome::FaceUp));
            assert_eq!(game.flip(b), Some(FlipOutcome::Matched));
        }
        // 6 pairs at 20 points plus the full 90 s bonus.
        assert_eq!(
            game.outcome(),
            Some(GameOutcome::Success { score: 120 + 90 / 4 })
        );
    }

    #[test]
    fn mismatch_locks_the_board_until_resolved() {
        let mut game = game(6, 4);
        let first_sign = game.cards()[0].sign_id;
        let other = game
            .cards()
            .iter()
            .position(|card| card.sign_id != first_sign)
            .expect("a second sign");
        assert_eq!(game.flip(0), Some(FlipOutcome::FaceUp));
        assert_eq!(game.flip(other), Some(FlipOutcome::Mismatched));
        assert_eq!(game.flip(1), None);
        game.resolve_mismatch();
        assert_eq!(game.flip(1), Some(FlipOutcome::FaceUp));
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn running_out_of_time_costs_a_heart() {
        let mut game = game(6, 5);
        for _ in 0..TIME_LIMIT_SECS - 1 {
            assert_eq!(game.tick(), None);
        }
        assert_eq!(
            game.tick(),
            Some(GameOutcome::Failure { hearts_lost: 1 })
        );
        assert_eq!(game.flip(0), None);
    }
}
