//! Lesson progress arithmetic.
//!
//! Every sign contributes three equal-weight steps (clip watched, name
//! revealed, quiz answered); the saved percentage is derived from the
//! position and inverted again when a session resumes.

pub const STEPS_PER_SIGN: usize = 3;

/// Playback phase for the sign at the current index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Video,
    Reveal,
    Quiz,
}

impl Phase {
    fn step_offset(self) -> usize {
        match self {
            Phase::Video => 0,
            Phase::Reveal => 1,
            Phase::Quiz => 2,
        }
    }

    fn from_step_offset(offset: usize) -> Self {
        match offset {
            0 => Phase::Video,
            1 => Phase::Reveal,
            _ => Phase::Quiz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonPosition {
    pub sign_index: usize,
    pub phase: Phase,
}

impl LessonPosition {
    pub fn start() -> Self {
        Self {
            sign_index: 0,
            phase: Phase::Video,
        }
    }
}

pub fn completed_steps(position: LessonPosition) -> usize {
    position.sign_index * STEPS_PER_SIGN + position.phase.step_offset()
}

/// Percentage of the lesson completed at `position`, rounded to the
/// nearest integer.
pub fn percent(position: LessonPosition, sign_count: usize) -> u8 {
    debug_assert!(sign_count > 0);
    let total = (sign_count * STEPS_PER_SIGN) as f64;
    let completed = completed_steps(position) as f64;
    (100.0 * completed / total).round() as u8
}

/// Percentage reported after the last sign's quiz is answered.
pub fn completion_percent() -> u8 {
    100
}

/// Invert a saved percentage back into a playable position. The result
/// never lands past the last sign; a fully-completed percentage resumes
/// at the last sign's clip.
pub fn resume(saved_percent: u8, sign_count: usize) -> LessonPosition {
    debug_assert!(sign_count > 0);
    let total = sign_count * STEPS_PER_SIGN;
    let completed = ((f64::from(saved_percent) / 100.0) * total as f64).floor() as usize;
    let sign_index = (completed / STEPS_PER_SIGN).min(sign_count - 1);
    let phase = Phase::from_step_offset(completed % STEPS_PER_SIGN);
    LessonPosition { sign_index, phase }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(sign_index: usize, phase: Phase) -> LessonPosition {
        LessonPosition { sign_index, phase }
    }

    #[test]
    fn three_sign_lesson_reports_33_67_100_after_each_quiz() {
        // Position after each correct quiz answer is the next sign's
        // clip; the final answer completes the lesson.
        assert_eq!(percent(pos(1, Phase::Video), 3), 33);
        assert_eq!(percent(pos(2, Phase::Video), 3), 67);
        assert_eq!(completion_percent(), 100);
    }

    #[test]
    fn percent_after_each_step_matches_rounded_step_ratio() {
        for sign_count in 1..=7 {
            let total = sign_count * STEPS_PER_SIGN;
            for step in 0..total {
                let position = pos(step / STEPS_PER_SIGN, Phase::from_step_offset(step % 3));
                let expected = (100.0 * step as f64 / total as f64).round() as u8;
                assert_eq!(percent(position, sign_count), expected);
            }
        }
    }

    #[test]
    fn resume_round_trip_never_overshoots() {
        for sign_count in 1..=7 {
            let total = sign_count * STEPS_PER_SIGN;
            for step in 0..=total {
                let saved = (100.0 * step as f64 / total as f64).round() as u8;
                let resumed = resume(saved, sign_count);
                assert!(resumed.sign_index < sign_count);
                assert!(percent(resumed, sign_count) <= saved);
            }
        }
    }

    #[test]
    fn full_percentage_resumes_at_last_sign_clip() {
        assert_eq!(resume(100, 4), pos(3, Phase::Video));
    }

    #[test]
    fn mid_lesson_percentage_resumes_phase_from_remainder() {
        // 33% of a 3-sign lesson is 2.97 steps; flooring lands on the
        // first sign's quiz.
        assert_eq!(resume(33, 3), pos(0, Phase::Quiz));
        assert_eq!(resume(67, 3), pos(2, Phase::Video));
    }

    #[test]
    fn zero_percent_resumes_at_start() {
        assert_eq!(resume(0, 5), LessonPosition::start());
    }
}
