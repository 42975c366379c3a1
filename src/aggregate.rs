use std::collections::BTreeMap;

use crate::models::{AggregatedStat, ObservationRecord, SegmentScheme, Term};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no observation carries a {0} value")]
    InvalidSegmentKey(SegmentScheme),
}

struct Bucket {
    count: usize,
    tier_counts: [usize; 3],
    tier_score_sums: [f64; 3],
    score_sum: f64,
}

/// Group observations into (term, domain, segment) buckets and compute the
/// tier mix, per-tier mean scores, overall mean score, and dominant index
/// for each. Records lacking the requested segment attribute are skipped;
/// if no record carries it at all, the scheme name is wrong and the call
/// fails rather than returning an empty table.
pub fn aggregate(
    records: &[ObservationRecord],
    scheme: Option<SegmentScheme>,
) -> Result<Vec<AggregatedStat>, EngineError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(scheme) = scheme {
        if records.iter().all(|r| r.segment_value(scheme).is_none()) {
            return Err(EngineError::InvalidSegmentKey(scheme));
        }
    }

    let mut buckets: BTreeMap<(Term, String, Option<String>), Bucket> = BTreeMap::new();

    for record in records {
        let segment = match scheme {
            Some(scheme) => match record.segment_value(scheme) {
                Some(value) => Some(value.to_string()),
                None => continue,
            },
            None => None,
        };

        let bucket = buckets
            .entry((record.term, record.domain.clone(), segment))
            .or_insert_with(|| Bucket {
                count: 0,
                tier_counts: [0; 3],
                tier_score_sums: [0.0; 3],
                score_sum: 0.0,
            });

        let tier = record.tier.index();
        bucket.count += 1;
        bucket.tier_counts[tier] += 1;
        bucket.tier_score_sums[tier] += record.score;
        bucket.score_sum += record.score;
    }

    let stats = buckets
        .into_iter()
        .map(|((term, domain, segment), bucket)| {
            let total = bucket.count as f64;
            let mut tier_pct = [0.0; 3];
            let mut tier_avg_score = [None; 3];

            for tier in 0..3 {
                tier_pct[tier] = 100.0 * bucket.tier_counts[tier] as f64 / total;
                if bucket.tier_counts[tier] > 0 {
                    tier_avg_score[tier] =
                        Some(bucket.tier_score_sums[tier] / bucket.tier_counts[tier] as f64);
                }
            }

            let dominant_index =
                (1.0 * tier_pct[0] + 2.0 * tier_pct[1] + 3.0 * tier_pct[2]) / 100.0;

            AggregatedStat {
                term,
                domain,
                segment,
                count: bucket.count,
                tier_pct,
                tier_avg_score,
                domain_avg: bucket.score_sum / total,
                dominant_index,
            }
        })
        .collect();

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tier;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn observation(term: Term, domain: &str, tier: Tier, score: f64) -> ObservationRecord {
        ObservationRecord {
            fellow_id: Uuid::new_v4(),
            fellow_name: "Thandi Nkosi".to_string(),
            term,
            domain: domain.to_string(),
            tier,
            score,
            school_level: Some("Primary School".to_string()),
            fellowship_year: None,
            observed_at: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
        }
    }

    #[test]
    fn empty_input_yields_empty_table() {
        let stats = aggregate(&[], None).unwrap();
        assert!(stats.is_empty());
    }

    #[test]
    fn splits_tier_mix_and_averages_scores() {
        let records = vec![
            observation(Term::Term1, "LE", Tier::Tier3, 3.5),
            observation(Term::Term1, "LE", Tier::Tier1, 1.2),
        ];

        let stats = aggregate(&records, None).unwrap();
        assert_eq!(stats.len(), 1);

        let stat = &stats[0];
        assert_eq!(stat.count, 2);
        assert_eq!(stat.tier_pct, [50.0, 0.0, 50.0]);
        assert_eq!(stat.tier_avg_score, [Some(1.2), None, Some(3.5)]);
        assert!((stat.dominant_index - 2.0).abs() < 1e-9);
        assert!((stat.domain_avg - 2.35).abs() < 1e-9);
    }

    #[test]
    fn tier_percentages_sum_to_one_hundred() {
        let records = vec![
            observation(Term::Term1, "SE", Tier::Tier1, 1.0),
            observation(Term::Term1, "SE", Tier::Tier2, 2.0),
            observation(Term::Term1, "SE", Tier::Tier2, 2.5),
            observation(Term::Term2, "SE", Tier::Tier3, 3.0),
            observation(Term::Term2, "KPC", Tier::Tier1, 1.5),
        ];

        for stat in aggregate(&records, None).unwrap() {
            let sum: f64 = stat.tier_pct.iter().sum();
            assert!((sum - 100.0).abs() < 1e-6, "{} sums to {sum}", stat.domain);
            assert!(stat.dominant_index >= 1.0 && stat.dominant_index <= 3.0);
        }
    }

    #[test]
    fn dominant_index_hits_bounds_at_pure_tiers() {
        let all_t3 = vec![
            observation(Term::Term1, "LE", Tier::Tier3, 3.2),
            observation(Term::Term1, "LE", Tier::Tier3, 3.8),
        ];
        let stats = aggregate(&all_t3, None).unwrap();
        assert_eq!(stats[0].tier_pct[2], 100.0);
        assert_eq!(stats[0].dominant_index, 3.0);

        let all_t1 = vec![observation(Term::Term1, "LE", Tier::Tier1, 1.1)];
        let stats = aggregate(&all_t1, None).unwrap();
        assert_eq!(stats[0].tier_pct[0], 100.0);
        assert_eq!(stats[0].dominant_index, 1.0);
    }

    #[test]
    fn groups_by_segment_when_scheme_given() {
        let mut records = vec![
            observation(Term::Term1, "LE", Tier::Tier3, 3.0),
            observation(Term::Term1, "LE", Tier::Tier1, 1.0),
        ];
        records[1].school_level = Some("High School".to_string());

        let stats = aggregate(&records, Some(SegmentScheme::SchoolLevel)).unwrap();
        assert_eq!(stats.len(), 2);
        assert!(stats
            .iter()
            .any(|s| s.segment.as_deref() == Some("Primary School") && s.tier_pct[2] == 100.0));
        assert!(stats
            .iter()
            .any(|s| s.segment.as_deref() == Some("High School") && s.tier_pct[0] == 100.0));
    }

    #[test]
    fn skips_records_missing_the_segment_attribute() {
        let mut records = vec![
            observation(Term::Term1, "LE", Tier::Tier3, 3.0),
            observation(Term::Term1, "LE", Tier::Tier1, 1.0),
        ];
        records[1].school_level = None;

        let stats = aggregate(&records, Some(SegmentScheme::SchoolLevel)).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].count, 1);
    }

    #[test]
    fn rejects_a_scheme_absent_from_every_record() {
        let records = vec![observation(Term::Term1, "LE", Tier::Tier2, 2.0)];
        let err = aggregate(&records, Some(SegmentScheme::FellowshipYear)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSegmentKey(_)));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let records = vec![
            observation(Term::Term1, "LE", Tier::Tier3, 3.5),
            observation(Term::Term2, "LE", Tier::Tier2, 2.4),
            observation(Term::Term2, "SE", Tier::Tier1, 1.6),
        ];

        let first = aggregate(&records, None).unwrap();
        let second = aggregate(&records, None).unwrap();
        assert_eq!(first, second);
    }
}
