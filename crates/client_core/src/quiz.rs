//! Two-option quiz prompt generation for the lesson player.

use rand::{seq::SliceRandom, Rng};
use shared::protocol::SignSummary;

/// Distractor label for lessons with a single sign, where no other
/// label exists to draw from.
pub const FALLBACK_DISTRACTOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizPrompt {
    /// Both labels in presentation order.
    pub options: [String; 2],
    /// Index into `options` of the correct label.
    pub correct: usize,
}

impl QuizPrompt {
    pub fn correct_label(&self) -> &str {
        &self.options[self.correct]
    }
}

/// Draw a prompt for the sign at `sign_index`: its label plus one label
/// picked uniformly from the rest of the lesson, in random order.
pub fn draw_prompt<R: Rng + ?Sized>(
    signs: &[SignSummary],
    sign_index: usize,
    rng: &mut R,
) -> QuizPrompt {
    let correct = signs[sign_index].text.clone();
    let others: Vec<&SignSummary> = signs
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != sign_index)
        .map(|(_, sign)| sign)
        .collect();
    let wrong = others
        .choose(rng)
        .map(|sign| sign.text.clone())
        .unwrap_or_else(|| FALLBACK_DISTRACTOR.to_string());

    if rng.gen_bool(0.5) {
        QuizPrompt {
            options: [correct, wrong],
            correct: 0,
        }
    } else {
        QuizPrompt {
            options: [wrong, correct],
            correct: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};
    use shared::domain::SignId;

    use super::*;

    fn signs(labels: &[&str]) -> Vec<SignSummary> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| SignSummary {
                sign_id: SignId(i as i64),
                text: label.to_string(),
                video_url: format!("https://cdn.example/{i}.mp4"),
                thumbnail_url: None,
                difficulty_level: None,
            })
            .collect()
    }

    #[test]
    fn prompt_contains_correct_label_and_one_other() {
        let signs = signs(&["hello", "thanks", "please"]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let prompt = draw_prompt(&signs, 1, &mut rng);
            assert_eq!(prompt.correct_label(), "thanks");
            let wrong = &prompt.options[1 - prompt.correct];
            assert!(wrong == "hello" || wrong == "please");
        }
    }

    #[test]
    fn wrong_label_never_repeats_the_correct_one() {
        let signs = signs(&["hello", "thanks"]);
        let mut rng = StdRng::seed_from_u64(11);
        for index in 0..signs.len() {
            for _ in 0..20 {
                let prompt = draw_prompt(&signs, index, &mut rng);
                assert_ne!(prompt.options[0], prompt.options[1]);
            }
        }
    }

    #[test]
    fn both_orderings_occur() {
        let signs = signs(&["hello", "thanks", "please"]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false, false];
        for _ in 0..100 {
            seen[draw_prompt(&signs, 0, &mut rng).correct] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn single_sign_lesson_falls_back_to_fixed_distractor() {
        let signs = signs(&["hello"]);
        let mut rng = StdRng::seed_from_u64(5);
        let prompt = draw_prompt(&signs, 0, &mut rng);
        assert_eq!(prompt.correct_label(), "hello");
        assert_eq!(prompt.options[1 - prompt.correct], FALLBACK_DISTRACTOR);
    }
}
