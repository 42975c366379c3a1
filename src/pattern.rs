use std::collections::BTreeMap;

use crate::models::{AggregatedStat, DomainPattern, PatternLabel, Term};

/// First-to-last band, in Tier-3 percentage points, inside which an
/// otherwise shapeless series reads as Stable.
pub const STABLE_BAND_PP: f64 = 5.0;

/// Classify the trajectory of the first three Tier-3 shares in a series.
/// Shape checks run before the stable band, so a genuine dip-and-recover
/// that ends near its starting point is still labeled by its shape.
pub fn detect_pattern(tier3_series: &[f64]) -> Option<PatternLabel> {
    if tier3_series.len() < 3 {
        return None;
    }

    let (a, b, c) = (tier3_series[0], tier3_series[1], tier3_series[2]);

    let label = if b < a && c > b && c >= a {
        PatternLabel::UShapeRecovery
    } else if c > b && b > a {
        PatternLabel::ConsistentGrowth
    } else if a > b && b > c {
        PatternLabel::SteadyDecline
    } else if (a - c).abs() < STABLE_BAND_PP {
        PatternLabel::Stable
    } else {
        PatternLabel::Volatile
    };

    Some(label)
}

/// Read each (domain, segment) key's Tier-3 shares over its first three
/// present terms and label the trajectory. Keys with fewer than three
/// terms are skipped.
pub fn detect_domain_patterns(
    stats: &[AggregatedStat],
    term_order: &[Term],
) -> Vec<DomainPattern> {
    let position = |term: Term| term_order.iter().position(|t| *t == term);

    let mut by_key: BTreeMap<(&str, Option<&str>), Vec<&AggregatedStat>> = BTreeMap::new();
    for stat in stats {
        if position(stat.term).is_none() {
            continue;
        }
        by_key
            .entry((stat.domain.as_str(), stat.segment.as_deref()))
            .or_default()
            .push(stat);
    }

    let mut patterns = Vec::new();

    for ((domain, segment), mut rows) in by_key {
        rows.sort_by_key(|stat| position(stat.term));
        let series: Vec<f64> = rows.iter().map(|stat| stat.tier_pct[2]).collect();

        if let Some(label) = detect_pattern(&series) {
            patterns.push(DomainPattern {
                domain: domain.to_string(),
                segment: segment.map(str::to_string),
                tier3_series: [series[0], series[1], series[2]],
                label,
            });
        }
    }

    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_the_five_shapes() {
        assert_eq!(
            detect_pattern(&[20.0, 10.0, 30.0]),
            Some(PatternLabel::UShapeRecovery)
        );
        assert_eq!(
            detect_pattern(&[10.0, 20.0, 30.0]),
            Some(PatternLabel::ConsistentGrowth)
        );
        assert_eq!(
            detect_pattern(&[30.0, 20.0, 10.0]),
            Some(PatternLabel::SteadyDecline)
        );
        assert_eq!(detect_pattern(&[40.0, 41.0, 42.0]), Some(PatternLabel::Stable));
        assert_eq!(detect_pattern(&[10.0, 40.0, 15.0]), Some(PatternLabel::Volatile));
    }

    #[test]
    fn short_series_is_not_computable() {
        assert_eq!(detect_pattern(&[]), None);
        assert_eq!(detect_pattern(&[20.0, 30.0]), None);
    }

    #[test]
    fn terms_beyond_the_third_are_ignored() {
        assert_eq!(
            detect_pattern(&[10.0, 20.0, 30.0, 5.0]),
            Some(PatternLabel::ConsistentGrowth)
        );
    }

    #[test]
    fn recovery_beats_the_stable_band_when_both_hold() {
        // Ends within 5pp of the start, yet the dip-and-recover shape wins.
        assert_eq!(
            detect_pattern(&[20.0, 10.0, 21.0]),
            Some(PatternLabel::UShapeRecovery)
        );
    }

    #[test]
    fn partial_recovery_within_band_is_stable() {
        // Recovers but stays below the start, so the U-shape test fails
        // and the narrow first-to-last band applies.
        assert_eq!(detect_pattern(&[20.0, 10.0, 18.0]), Some(PatternLabel::Stable));
    }

    #[test]
    fn flat_series_is_stable_not_growth() {
        assert_eq!(detect_pattern(&[10.0, 10.0, 10.0]), Some(PatternLabel::Stable));
    }

    #[test]
    fn every_series_gets_exactly_one_label() {
        let cases: [[f64; 3]; 6] = [
            [0.0, 0.0, 0.0],
            [50.0, 25.0, 75.0],
            [25.0, 50.0, 10.0],
            [100.0, 0.0, 100.0],
            [33.3, 33.4, 33.5],
            [60.0, 60.0, 20.0],
        ];
        for case in cases {
            assert!(detect_pattern(&case).is_some(), "{case:?} returned None");
        }
    }

    #[test]
    fn labels_each_domain_key_with_three_terms() {
        fn stat(term: Term, domain: &str, tier3_pct: f64) -> AggregatedStat {
            AggregatedStat {
                term,
                domain: domain.to_string(),
                segment: None,
                count: 5,
                tier_pct: [100.0 - tier3_pct, 0.0, tier3_pct],
                tier_avg_score: [Some(1.5), None, Some(3.5)],
                domain_avg: 2.5,
                dominant_index: 2.0,
            }
        }

        let stats = vec![
            stat(Term::Term1, "LE", 20.0),
            stat(Term::Term2, "LE", 10.0),
            stat(Term::Term3, "LE", 30.0),
            stat(Term::Term1, "SE", 15.0),
            stat(Term::Term2, "SE", 25.0),
        ];

        let patterns = detect_domain_patterns(&stats, &Term::ORDER);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].domain, "LE");
        assert_eq!(patterns[0].label, PatternLabel::UShapeRecovery);
        assert_eq!(patterns[0].tier3_series, [20.0, 10.0, 30.0]);
    }
}
