use crate::models::{
    AggregatedStat, Movement, MovementRecord, Recommendation, RecommendationCategory, SegmentGap,
};

/// Tier-1 share above which a domain needs baseline reinforcement.
pub const HIGH_TIER1_PCT: f64 = 40.0;
/// Dominant index below which learners are pooled in the lower tiers.
pub const LOW_INDEX: f64 = 2.0;
/// Tier-3 gain, in percentage points, that qualifies as an exceptional
/// term-to-term recovery.
pub const RECOVERY_CHAMPION_PP: f64 = 10.0;

/// Turn the latest term's aggregated table, the movement history, and any
/// segment gaps into an ordered list of strategic statements. Ties on the
/// best/worst Tier-3 share go to the first row in input order.
pub fn generate_recommendations(
    latest: &[AggregatedStat],
    movements: &[MovementRecord],
    gaps: &[SegmentGap],
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let mut best: Option<&AggregatedStat> = None;
    let mut worst: Option<&AggregatedStat> = None;
    for stat in latest {
        if best.map_or(true, |b| stat.tier_pct[2] > b.tier_pct[2]) {
            best = Some(stat);
        }
        if worst.map_or(true, |w| stat.tier_pct[2] < w.tier_pct[2]) {
            worst = Some(stat);
        }
    }

    if let Some(best) = best {
        recommendations.push(Recommendation {
            category: RecommendationCategory::ReplicateSuccess,
            text: format!(
                "Study {} (Tier 3 {:.1}%) and scale practices.",
                best.domain, best.tier_pct[2]
            ),
        });
    }

    if let Some(worst) = worst {
        recommendations.push(Recommendation {
            category: RecommendationCategory::TargetedSupport,
            text: format!(
                "{} needs intensive coaching (Tier 3 {:.1}%).",
                worst.domain, worst.tier_pct[2]
            ),
        });
    }

    let high_tier1: Vec<&str> = latest
        .iter()
        .filter(|stat| stat.tier_pct[0] > HIGH_TIER1_PCT)
        .map(|stat| stat.domain.as_str())
        .collect();
    if !high_tier1.is_empty() {
        recommendations.push(Recommendation {
            category: RecommendationCategory::FoundationalFocus,
            text: format!(
                "{} require baseline skill reinforcement (high Tier 1 share).",
                high_tier1.join(", ")
            ),
        });
    }

    let low_index: Vec<&str> = latest
        .iter()
        .filter(|stat| stat.dominant_index < LOW_INDEX)
        .map(|stat| stat.domain.as_str())
        .collect();
    if !low_index.is_empty() {
        recommendations.push(Recommendation {
            category: RecommendationCategory::ProgressionAcceleration,
            text: format!(
                "{} need strategies to move learners up tiers (index below 2.0).",
                low_index.join(", ")
            ),
        });
    }

    for gap in gaps {
        recommendations.push(Recommendation {
            category: RecommendationCategory::SegmentGap,
            text: format!(
                "Address the {:.1} pt Tier-3 gap in {} between {} ({:.1}%) and {} ({:.1}%).",
                gap.gap, gap.domain, gap.leader, gap.leader_pct, gap.laggard, gap.laggard_pct
            ),
        });
    }

    let mut champion: Option<&MovementRecord> = None;
    for movement in movements {
        if movement.movement != Movement::Improvement
            || movement.tier3_delta <= RECOVERY_CHAMPION_PP
        {
            continue;
        }
        if champion.map_or(true, |c| movement.tier3_delta > c.tier3_delta) {
            champion = Some(movement);
        }
    }
    if let Some(champion) = champion {
        recommendations.push(Recommendation {
            category: RecommendationCategory::RecoveryChampion,
            text: format!(
                "{} showed excellent recovery (+{:.1} pp in Tier 3). Document recovery strategies.",
                champion.domain, champion.tier3_delta
            ),
        });
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Term;

    fn stat(domain: &str, tier1_pct: f64, tier3_pct: f64) -> AggregatedStat {
        let tier2_pct = 100.0 - tier1_pct - tier3_pct;
        AggregatedStat {
            term: Term::Term3,
            domain: domain.to_string(),
            segment: None,
            count: 12,
            tier_pct: [tier1_pct, tier2_pct, tier3_pct],
            tier_avg_score: [Some(1.4), Some(2.4), Some(3.4)],
            domain_avg: 2.4,
            dominant_index: (tier1_pct + 2.0 * tier2_pct + 3.0 * tier3_pct) / 100.0,
        }
    }

    fn movement(domain: &str, tier3_delta: f64) -> MovementRecord {
        MovementRecord {
            domain: domain.to_string(),
            segment: None,
            from_term: Term::Term2,
            to_term: Term::Term3,
            tier3_delta,
            index_delta: tier3_delta / 50.0,
            movement: if tier3_delta > 2.0 {
                Movement::Improvement
            } else if tier3_delta < -2.0 {
                Movement::Decline
            } else {
                Movement::Stable
            },
        }
    }

    #[test]
    fn orders_the_rule_table() {
        let latest = vec![
            stat("LE", 20.0, 55.0),
            stat("SE", 50.0, 15.0),
            stat("KPC", 30.0, 35.0),
        ];
        let movements = vec![movement("KPC", 12.0)];
        let gaps = vec![SegmentGap {
            domain: "SE".to_string(),
            leader: "Primary School".to_string(),
            leader_pct: 30.0,
            laggard: "High School".to_string(),
            laggard_pct: 10.0,
            gap: 20.0,
        }];

        let recommendations = generate_recommendations(&latest, &movements, &gaps);
        let categories: Vec<_> = recommendations.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec![
                RecommendationCategory::ReplicateSuccess,
                RecommendationCategory::TargetedSupport,
                RecommendationCategory::FoundationalFocus,
                RecommendationCategory::ProgressionAcceleration,
                RecommendationCategory::SegmentGap,
                RecommendationCategory::RecoveryChampion,
            ]
        );
        assert!(recommendations[0].text.contains("LE"));
        assert!(recommendations[1].text.contains("SE"));
    }

    #[test]
    fn ties_go_to_the_first_domain_in_input_order() {
        let latest = vec![stat("AII", 25.0, 40.0), stat("IAL", 25.0, 40.0)];

        let recommendations = generate_recommendations(&latest, &[], &[]);
        assert!(recommendations[0].text.starts_with("Study AII"));
        assert!(recommendations[1].text.starts_with("AII "));
    }

    #[test]
    fn conditional_rules_stay_silent_without_triggers() {
        // Healthy mix: no high Tier-1 share, index above 2, no gaps.
        let latest = vec![stat("LE", 10.0, 60.0), stat("SE", 15.0, 50.0)];

        let recommendations = generate_recommendations(&latest, &[], &[]);
        let categories: Vec<_> = recommendations.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec![
                RecommendationCategory::ReplicateSuccess,
                RecommendationCategory::TargetedSupport,
            ]
        );
    }

    #[test]
    fn recovery_champion_needs_more_than_ten_points() {
        let latest = vec![stat("LE", 10.0, 60.0)];

        let at_threshold = vec![movement("LE", 10.0)];
        let recommendations = generate_recommendations(&latest, &at_threshold, &[]);
        assert!(recommendations
            .iter()
            .all(|r| r.category != RecommendationCategory::RecoveryChampion));

        let over = vec![movement("LE", 10.5), movement("SE", 14.0)];
        let recommendations = generate_recommendations(&latest, &over, &[]);
        let champion = recommendations
            .iter()
            .find(|r| r.category == RecommendationCategory::RecoveryChampion)
            .unwrap();
        assert!(champion.text.starts_with("SE"));
    }

    #[test]
    fn empty_latest_table_yields_no_recommendations() {
        assert!(generate_recommendations(&[], &[], &[]).is_empty());
    }
}
