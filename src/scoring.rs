//! Point awards for both play modes.

/// Maximum points for an instant correct answer in multiplayer.
pub const MULTI_MAX_POINTS: f64 = 1000.0;

/// Base points for a correct answer in local mode.
pub const LOCAL_BASE_POINTS: u32 = 100;

/// Local-mode time bonus starts here and decrements once per second.
pub const LOCAL_TIME_BONUS_START: u32 = 10;

/// Consecutive correct answers needed before the streak bonus kicks in.
pub const LOCAL_STREAK_THRESHOLD: u32 = 3;

/// Points for a correct multiplayer answer: linear decay from
/// `MULTI_MAX_POINTS` at t = 0 to zero at the answer deadline.
///
/// The only contract callers may rely on is that the value is
/// monotonically non-increasing in `response_time_ms` and zero at or
/// past the deadline; the linear shape itself is an implementation
/// choice.
pub fn multiplayer_points(response_time_ms: u64, answer_time_sec: u64) -> u32 {
    let window_ms = answer_time_sec.saturating_mul(1000).max(1);
    let t = response_time_ms.min(window_ms) as f64;
    let points = MULTI_MAX_POINTS * (1.0 - t / window_ms as f64);
    points.round().max(0.0) as u32
}

/// Remaining local-mode time bonus after `elapsed_secs` of clip playback.
pub fn local_time_bonus(elapsed_secs: u64) -> u32 {
    (LOCAL_TIME_BONUS_START as u64).saturating_sub(elapsed_secs) as u32
}

/// Streak-aware scorer for single-player / local mode.
///
/// Correct: 100 base + 10 per remaining time-bonus tick, plus
/// `5 * streak` once the consecutive-correct streak reaches 3.
/// Wrong: zero points and the streak resets.
#[derive(Debug, Default, Clone)]
pub struct LocalScorer {
    streak: u32,
}

impl LocalScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn award(&mut self, correct: bool, time_bonus_remaining: u32) -> u32 {
        if !correct {
            self.streak = 0;
            return 0;
        }
        self.streak += 1;
        let mut points =
            LOCAL_BASE_POINTS + 10 * time_bonus_remaining.min(LOCAL_TIME_BONUS_START);
        if self.streak >= LOCAL_STREAK_THRESHOLD {
            points += 5 * self.streak;
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplayer_points_monotone_non_increasing() {
        let window = 20;
        let mut last = u32::MAX;
        for t in (0..=21_000).step_by(250) {
            let p = multiplayer_points(t, window);
            assert!(p <= last, "points rose from {} to {} at t={}", last, p, t);
            last = p;
        }
    }

    #[test]
    fn multiplayer_points_bounds() {
        assert_eq!(multiplayer_points(0, 20), 1000);
        assert_eq!(multiplayer_points(20_000, 20), 0);
        assert_eq!(multiplayer_points(25_000, 20), 0);
        assert_eq!(multiplayer_points(10_000, 20), 500);
    }

    #[test]
    fn local_time_bonus_counts_down() {
        assert_eq!(local_time_bonus(0), 10);
        assert_eq!(local_time_bonus(4), 6);
        assert_eq!(local_time_bonus(10), 0);
        assert_eq!(local_time_bonus(99), 0);
    }

    #[test]
    fn local_scorer_base_and_time_bonus() {
        let mut scorer = LocalScorer::new();
        assert_eq!(scorer.award(true, 10), 200);
        assert_eq!(scorer.award(true, 0), 100);
    }

    #[test]
    fn local_scorer_streak_bonus_from_third_correct() {
        let mut scorer = LocalScorer::new();
        assert_eq!(scorer.award(true, 0), 100); // streak 1
        assert_eq!(scorer.award(true, 0), 100); // streak 2
        assert_eq!(scorer.award(true, 0), 115); // streak 3: +5*3
        assert_eq!(scorer.award(true, 0), 120); // streak 4: +5*4
    }

    #[test]
    fn local_scorer_wrong_answer_resets_streak() {
        let mut scorer = LocalScorer::new();
        for _ in 0..3 {
            scorer.award(true, 0);
        }
        assert_eq!(scorer.streak(), 3);
        assert_eq!(scorer.award(false, 10), 0);
        assert_eq!(scorer.streak(), 0);
        assert_eq!(scorer.award(true, 0), 100);
    }
}
