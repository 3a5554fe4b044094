use media_retention_models::{ItemKind, Policy, RatingMode, Ratings, SkipReason};

/// Why `evaluate` reached its decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EligibilityReason {
    /// Score is under the threshold
    RatingBelowThreshold { score: f64, threshold: f64 },
    /// Score is at or over the threshold; the item is worth keeping
    RatingAboveThreshold { score: f64, threshold: f64 },
    /// Nobody rated the item
    InsufficientRatings,
    /// Watch gate not met for the item kind and series mode
    NotWatchedEnough { watch_fraction: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityResult {
    pub eligible: bool,
    pub reason: EligibilityReason,
}

impl EligibilityResult {
    fn eligible(reason: EligibilityReason) -> Self {
        Self { eligible: true, reason }
    }

    fn keep(reason: EligibilityReason) -> Self {
        Self { eligible: false, reason }
    }

    /// `Ok(score)` when the item should be acted on, otherwise why it is kept.
    pub fn decision(&self) -> Result<f64, SkipReason> {
        match self.reason {
            EligibilityReason::RatingBelowThreshold { score, .. } => Ok(score),
            EligibilityReason::RatingAboveThreshold { score, threshold } => {
                Err(SkipReason::RatingAboveThreshold { score, threshold })
            }
            EligibilityReason::InsufficientRatings => Err(SkipReason::InsufficientRatings),
            EligibilityReason::NotWatchedEnough { watch_fraction } => {
                Err(SkipReason::NotWatchedEnough { watch_fraction })
            }
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.decision().err()
    }
}

/// Whether the watch state is enough to act on an item at all.
///
/// Movies must be watched to the end. Series follow the configured series watch mode.
pub fn watch_gate_met(kind: ItemKind, watch_fraction: f64, policy: &Policy) -> bool {
    match kind {
        ItemKind::Movie => watch_fraction >= 1.0,
        ItemKind::Series => policy.series_watch_mode.is_satisfied_by(watch_fraction),
    }
}

/// Score the ratings are compared against: mean for `average`, highest for `any_high`.
pub fn score(ratings: &Ratings, mode: RatingMode) -> Option<f64> {
    match mode {
        RatingMode::Average => ratings.mean(),
        RatingMode::AnyHigh => ratings.max(),
    }
}

/// Decide whether an item should be acted on.
///
/// The threshold is exclusive: a score equal to it keeps the item. Pure and
/// deterministic.
pub fn evaluate(ratings: &Ratings, watch_fraction: f64, kind: ItemKind, policy: &Policy) -> EligibilityResult {
    if !watch_gate_met(kind, watch_fraction, policy) {
        return EligibilityResult::keep(EligibilityReason::NotWatchedEnough { watch_fraction });
    }

    let threshold = policy.rating_threshold;
    match score(ratings, policy.rating_mode) {
        None => EligibilityResult::keep(EligibilityReason::InsufficientRatings),
        Some(score) if score < threshold => {
            EligibilityResult::eligible(EligibilityReason::RatingBelowThreshold { score, threshold })
        }
        Some(score) => EligibilityResult::keep(EligibilityReason::RatingAboveThreshold { score, threshold }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_retention_models::SeriesWatchMode;

    fn policy(mode: RatingMode) -> Policy {
        Policy {
            rating_mode: mode,
            ..Policy::default()
        }
    }

    fn ratings(values: &[f64]) -> Ratings {
        values
            .iter()
            .enumerate()
            .map(|(i, r)| (format!("user{}", i), *r))
            .collect()
    }

    #[test]
    fn test_average_mode() {
        let alice_bob: Ratings = [("alice", 5.0), ("bob", 7.9)].into_iter().collect();
        let result = evaluate(&alice_bob, 1.0, ItemKind::Movie, &policy(RatingMode::Average));
        assert!(result.eligible);
        assert_eq!(result.skip_reason(), None);
        assert!((result.decision().unwrap() - 6.45).abs() < 1e-9);

        // 5 and 8 average to exactly 6.5, which keeps the item
        let alice_bob: Ratings = [("alice", 5.0), ("bob", 8.0)].into_iter().collect();
        let result = evaluate(&alice_bob, 1.0, ItemKind::Movie, &policy(RatingMode::Average));
        assert!(!result.eligible);
        assert_eq!(
            result.reason,
            EligibilityReason::RatingAboveThreshold { score: 6.5, threshold: 6.5 }
        );
    }

    #[test]
    fn test_any_high_mode() {
        let alice_bob: Ratings = [("alice", 5.0), ("bob", 8.0)].into_iter().collect();
        let result = evaluate(&alice_bob, 1.0, ItemKind::Movie, &policy(RatingMode::AnyHigh));
        assert!(!result.eligible);
        assert_eq!(
            result.skip_reason(),
            Some(SkipReason::RatingAboveThreshold { score: 8.0, threshold: 6.5 })
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let exact = ratings(&[6.5]);
        assert!(!evaluate(&exact, 1.0, ItemKind::Movie, &policy(RatingMode::Average)).eligible);
        assert!(!evaluate(&exact, 1.0, ItemKind::Movie, &policy(RatingMode::AnyHigh)).eligible);

        let just_under = ratings(&[6.49]);
        assert!(evaluate(&just_under, 1.0, ItemKind::Movie, &policy(RatingMode::Average)).eligible);
    }

    #[test]
    fn test_no_ratings_is_its_own_reason() {
        for mode in [RatingMode::Average, RatingMode::AnyHigh] {
            let result = evaluate(&Ratings::new(), 1.0, ItemKind::Movie, &policy(mode));
            assert!(!result.eligible);
            assert_eq!(result.reason, EligibilityReason::InsufficientRatings);
            assert_eq!(result.skip_reason(), Some(SkipReason::InsufficientRatings));
        }
    }

    #[test]
    fn test_modes_against_mean_and_max() {
        let sets: &[&[f64]] = &[
            &[1.0],
            &[6.5],
            &[2.0, 9.0],
            &[6.0, 6.9],
            &[3.0, 4.0, 10.0],
            &[7.0, 7.0, 7.0],
            &[0.0, 6.4, 6.49],
        ];
        for threshold in [1.0, 5.0, 6.5, 8.0, 10.0] {
            for values in sets {
                let r = ratings(values);
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                let max = values.iter().cloned().fold(f64::MIN, f64::max);

                let mut p = policy(RatingMode::Average);
                p.rating_threshold = threshold;
                assert_eq!(evaluate(&r, 1.0, ItemKind::Movie, &p).eligible, mean < threshold);

                p.rating_mode = RatingMode::AnyHigh;
                let any_high = evaluate(&r, 1.0, ItemKind::Movie, &p).eligible;
                assert_eq!(any_high, max < threshold);

                // max >= mean, so clearing the any_high bar always clears the average bar
                if any_high {
                    p.rating_mode = RatingMode::Average;
                    assert!(evaluate(&r, 1.0, ItemKind::Movie, &p).eligible);
                }
            }
        }
    }

    #[test]
    fn test_single_rater_modes_agree() {
        for value in [0.0, 3.3, 6.5, 9.9] {
            let r = ratings(&[value]);
            assert_eq!(
                evaluate(&r, 1.0, ItemKind::Movie, &policy(RatingMode::Average)),
                evaluate(&r, 1.0, ItemKind::Movie, &policy(RatingMode::AnyHigh))
            );
        }
    }

    #[test]
    fn test_watch_gate() {
        let low = ratings(&[2.0]);
        let full = Policy::default();
        let bored = Policy {
            series_watch_mode: SeriesWatchMode::Bored,
            ..Policy::default()
        };

        // partially watched movie is never eligible, even in bored mode
        let result = evaluate(&low, 0.6, ItemKind::Movie, &bored);
        assert_eq!(result.reason, EligibilityReason::NotWatchedEnough { watch_fraction: 0.6 });

        assert!(!evaluate(&low, 0.5, ItemKind::Series, &full).eligible);
        assert!(evaluate(&low, 1.0, ItemKind::Series, &full).eligible);
        assert!(evaluate(&low, 0.1, ItemKind::Series, &bored).eligible);
        assert!(!evaluate(&low, 0.0, ItemKind::Series, &bored).eligible);
    }
}
