use std::collections::BTreeMap;

use crate::models::{AggregatedStat, ProgressionSummary, Term, TermSnapshot};

/// Lay out each (domain, segment) key's tier mix term by term with its
/// first-to-last Tier-3 and index change. Keys seen in a single term have
/// no progression to show and are skipped.
pub fn summarize_progression(
    stats: &[AggregatedStat],
    term_order: &[Term],
) -> Vec<ProgressionSummary> {
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

    let mut summaries = Vec::new();

    for ((domain, segment), mut rows) in by_key {
        if rows.len() < 2 {
            continue;
        }
        rows.sort_by_key(|stat| position(stat.term));

        let terms: Vec<TermSnapshot> = rows
            .iter()
            .map(|stat| TermSnapshot {
                term: stat.term,
                tier_pct: stat.tier_pct,
                dominant_index: stat.dominant_index,
            })
            .collect();

        let first = rows[0];
        let last = rows[rows.len() - 1];

        summaries.push(ProgressionSummary {
            domain: domain.to_string(),
            segment: segment.map(str::to_string),
            terms,
            tier3_change: last.tier_pct[2] - first.tier_pct[2],
            index_change: last.dominant_index - first.dominant_index,
        });
    }

    summaries
}
