use std::collections::BTreeMap;

use crate::models::{AggregatedStat, Movement, MovementRecord, Term};

/// Tier-3 percentage-point change beyond which a transition counts as
/// Improvement or Decline. Exactly on the threshold is Stable.
pub const MOVEMENT_THRESHOLD_PP: f64 = 2.0;

/// Pair up consecutive terms for every (domain, segment) key and classify
/// each transition. Keys with a single term emit nothing, and a pair is
/// only formed when the two terms sit next to each other in `term_order`
/// (a missing middle term is a data gap, not a transition).
pub fn classify_movements(stats: &[AggregatedStat], term_order: &[Term]) -> Vec<MovementRecord> {
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

    let mut movements = Vec::new();

    for ((domain, segment), mut rows) in by_key {
        rows.sort_by_key(|stat| position(stat.term));

        for pair in rows.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let gap_free = match (position(from.term), position(to.term)) {
                (Some(a), Some(b)) => b == a + 1,
                _ => false,
            };
            if !gap_free {
                continue;
            }

            let tier3_delta = to.tier_pct[2] - from.tier_pct[2];
            let movement = if tier3_delta > MOVEMENT_THRESHOLD_PP {
                Movement::Improvement
            } else if tier3_delta < -MOVEMENT_THRESHOLD_PP {
                Movement::Decline
            } else {
                Movement::Stable
            };

            movements.push(MovementRecord {
                domain: domain.to_string(),
                segment: segment.map(str::to_string),
                from_term: from.term,
                to_term: to.term,
                tier3_delta,
                index_delta: to.dominant_index - from.dominant_index,
                movement,
            });
        }
    }

    movements
}
