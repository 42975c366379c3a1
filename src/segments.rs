use std::collections::BTreeMap;

use crate::models::{AggregatedStat, SegmentGap, Term};

/// Minimum Tier-3 spread, in percentage points, before a domain's segment
/// difference is worth calling out. The threshold is exclusive.
pub const SEGMENT_GAP_THRESHOLD_PP: f64 = 10.0;

/// Compare segment values within each domain at one term and report the
/// domains whose Tier-3 spread exceeds the threshold. Unsegmented rows
/// carry no segment value and are ignored; a domain needs at least two
/// segment values present to be comparable.
pub fn compare_segments(stats: &[AggregatedStat], term: Term) -> Vec<SegmentGap> {
    let mut by_domain: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();

    for stat in stats.iter().filter(|s| s.term == term) {
        if let Some(segment) = stat.segment.as_deref() {
            by_domain
                .entry(stat.domain.as_str())
                .or_default()
                .push((segment, stat.tier_pct[2]));
        }
    }

    let mut gaps = Vec::new();

    for (domain, entries) in by_domain {
        if entries.len() < 2 {
            continue;
        }

        let mut leader = entries[0];
        let mut laggard = entries[0];
        for &entry in &entries[1..] {
            if entry.1 > leader.1 {
                leader = entry;
            }
            if entry.1 < laggard.1 {
                laggard = entry;
            }
        }

        let gap = leader.1 - laggard.1;
        if gap > SEGMENT_GAP_THRESHOLD_PP {
            gaps.push(SegmentGap {
                domain: domain.to_string(),
                leader: leader.0.to_string(),
                leader_pct: leader.1,
                laggard: laggard.0.to_string(),
                laggard_pct: laggard.1,
                gap,
            });
        }
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(term: Term, domain: &str, segment: Option<&str>, tier3_pct: f64) -> AggregatedStat {
        AggregatedStat {
            term,
            domain: domain.to_string(),
            segment: segment.map(str::to_string),
            count: 8,
            tier_pct: [100.0 - tier3_pct, 0.0, tier3_pct],
            tier_avg_score: [Some(1.4), None, Some(3.4)],
            domain_avg: 2.4,
            dominant_index: 2.0,
        }
    }

    #[test]
    fn reports_the_leader_and_laggard_for_wide_spreads() {
        let stats = vec![
            stat(Term::Term2, "LE", Some("Primary School"), 55.0),
            stat(Term::Term2, "LE", Some("High School"), 30.0),
            stat(Term::Term2, "LE", Some("Combined School"), 42.0),
        ];

        let gaps = compare_segments(&stats, Term::Term2);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].leader, "Primary School");
        assert_eq!(gaps[0].laggard, "High School");
        assert!((gaps[0].gap - 25.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_is_exclusive() {
        let exactly = vec![
            stat(Term::Term1, "LE", Some("Primary School"), 50.0),
            stat(Term::Term1, "LE", Some("High School"), 40.0),
        ];
        assert!(compare_segments(&exactly, Term::Term1).is_empty());

        let just_over = vec![
            stat(Term::Term1, "LE", Some("Primary School"), 50.01),
            stat(Term::Term1, "LE", Some("High School"), 40.0),
        ];
        assert_eq!(compare_segments(&just_over, Term::Term1).len(), 1);
    }

    #[test]
    fn single_segment_domains_are_skipped() {
        let stats = vec![stat(Term::Term1, "SE", Some("Primary School"), 60.0)];
        assert!(compare_segments(&stats, Term::Term1).is_empty());
    }

    #[test]
    fn other_terms_and_unsegmented_rows_are_ignored() {
        let stats = vec![
            stat(Term::Term1, "LE", Some("Primary School"), 80.0),
            stat(Term::Term1, "LE", None, 10.0),
            stat(Term::Term2, "LE", Some("High School"), 10.0),
        ];
        assert!(compare_segments(&stats, Term::Term1).is_empty());
    }
}
