//! Scoring: a flat base for being right, plus a bonus for being fast.

use std::time::{Duration, SystemTime};

/// Points any correct answer earns, no matter how slow.
pub const BASE_POINTS: u32 = 1000;

/// Additional points awarded in proportion to the time remaining.
pub const SPEED_BONUS: u32 = 500;

/// Compute the points earned by an answer.
///
/// Incorrect answers earn 0. Correct answers earn
/// `floor(1000 + 500 * remaining / total)` where `remaining` is the time
/// left on the clock when the answer landed, clamped to `[0, total]`. The
/// result is monotonic non-increasing in elapsed time: an instant answer is
/// worth 1500, one at the buzzer 1000, and a late one (clock already ran
/// out) still exactly 1000.
pub fn score(
    correct: bool,
    question_started_at: SystemTime,
    answered_at: SystemTime,
    total_seconds: u32,
) -> u32 {
    if !correct {
        return 0;
    }
    if total_seconds == 0 {
        return BASE_POINTS;
    }

    // A clock skewed so the answer predates the question counts as instant.
    let elapsed = answered_at
        .duration_since(question_started_at)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64();
    let total = f64::from(total_seconds);
    let remaining = (total - elapsed).max(0.0);

    (f64::from(BASE_POINTS) + f64::from(SPEED_BONUS) * remaining / total).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOTAL: u32 = 20;

    fn at(start: SystemTime, elapsed_secs: u64) -> SystemTime {
        start + Duration::from_secs(elapsed_secs)
    }

    #[test]
    fn incorrect_answers_earn_nothing() {
        let start = SystemTime::UNIX_EPOCH;
        assert_eq!(score(false, start, at(start, 0), TOTAL), 0);
        assert_eq!(score(false, start, at(start, 30), TOTAL), 0);
    }

    #[test]
    fn speed_bonus_decays_linearly() {
        let start = SystemTime::UNIX_EPOCH;
        assert_eq!(score(true, start, at(start, 0), TOTAL), 1500);
        assert_eq!(score(true, start, at(start, 2), TOTAL), 1450);
        assert_eq!(score(true, start, at(start, 10), TOTAL), 1250);
        assert_eq!(score(true, start, at(start, 20), TOTAL), 1000);
    }

    #[test]
    fn late_answers_are_clamped_to_the_base() {
        let start = SystemTime::UNIX_EPOCH;
        assert_eq!(score(true, start, at(start, 25), TOTAL), 1000);
        assert_eq!(score(true, start, at(start, 1000), TOTAL), 1000);
    }

    #[test]
    fn answer_before_question_counts_as_instant() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let answered = SystemTime::UNIX_EPOCH + Duration::from_secs(90);
        assert_eq!(score(true, start, answered, TOTAL), 1500);
    }

    #[test]
    fn monotonic_in_elapsed_time() {
        let start = SystemTime::UNIX_EPOCH;
        let mut previous = u32::MAX;
        for elapsed in 0..30 {
            let points = score(true, start, at(start, elapsed), TOTAL);
            assert!(points <= previous, "score increased at elapsed={elapsed}");
            previous = points;
        }
        assert_eq!(previous, BASE_POINTS);
    }

    #[test]
    fn zero_total_still_pays_the_base() {
        let start = SystemTime::UNIX_EPOCH;
        assert_eq!(score(true, start, at(start, 0), 0), BASE_POINTS);
    }
}
