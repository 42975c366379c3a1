use std::collections::HashSet;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{AggregatedStat, ObservationRecord, SegmentScheme, Term};
use crate::{movement, pattern, recommend, segments, summaries, trend};

fn segment_label(segment: Option<&str>) -> &str {
    segment.unwrap_or("Overall")
}

fn latest_term(stats: &[AggregatedStat], term_order: &[Term]) -> Option<Term> {
    term_order
        .iter()
        .rev()
        .copied()
        .find(|term| stats.iter().any(|stat| stat.term == *term))
}

/// Compose the full Markdown report from the overall aggregation and, when
/// a segment scheme is active, the segmented aggregation of the same
/// records.
pub fn build_report(
    scheme: Option<SegmentScheme>,
    generated_on: NaiveDate,
    records: &[ObservationRecord],
    overall: &[AggregatedStat],
    segmented: Option<&[AggregatedStat]>,
) -> String {
    let term_order = &Term::ORDER;
    let active = segmented.unwrap_or(overall);

    let mut output = String::new();
    let view = match scheme {
        Some(scheme) => format!("{scheme} view"),
        None => "overall view".to_string(),
    };
    let fellow_count = records
        .iter()
        .map(|record| record.fellow_id)
        .collect::<HashSet<_>>()
        .len();

    let _ = writeln!(output, "# Tier Progression Report");
    let _ = writeln!(
        output,
        "Generated {generated_on} ({view}, {} observations from {fellow_count} fellows)",
        records.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Tier Mix by Term");
    let progression = summaries::summarize_progression(active, term_order);
    if progression.is_empty() {
        let _ = writeln!(output, "Insufficient data: tier mix needs at least two terms.");
    } else {
        for summary in &progression {
            let _ = writeln!(
                output,
                "- {} ({})",
                summary.domain,
                segment_label(summary.segment.as_deref())
            );
            for snapshot in &summary.terms {
                let _ = writeln!(
                    output,
                    "  - {}: T1 {:.1}% / T2 {:.1}% / T3 {:.1}% (index {:.2})",
                    snapshot.term,
                    snapshot.tier_pct[0],
                    snapshot.tier_pct[1],
                    snapshot.tier_pct[2],
                    snapshot.dominant_index
                );
            }
            let _ = writeln!(
                output,
                "  - Change: T3 {:+.1} pp, index {:+.2}",
                summary.tier3_change, summary.index_change
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Term-to-Term Movements");
    let movements = movement::classify_movements(active, term_order);
    if movements.is_empty() {
        let _ = writeln!(
            output,
            "Insufficient data: movements need two consecutive terms."
        );
    } else {
        for record in &movements {
            let _ = writeln!(
                output,
                "- {} ({}) {} → {}: {} (T3 {:+.1} pp, index {:+.2})",
                record.domain,
                segment_label(record.segment.as_deref()),
                record.from_term,
                record.to_term,
                record.movement,
                record.tier3_delta,
                record.index_delta
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trajectory Patterns");
    let patterns = pattern::detect_domain_patterns(active, term_order);
    if patterns.is_empty() {
        let _ = writeln!(output, "Insufficient data: patterns need three terms.");
    } else {
        for domain_pattern in &patterns {
            let _ = writeln!(
                output,
                "- {} ({}): {} ({:.1}% → {:.1}% → {:.1}%)",
                domain_pattern.domain,
                segment_label(domain_pattern.segment.as_deref()),
                domain_pattern.label,
                domain_pattern.tier3_series[0],
                domain_pattern.tier3_series[1],
                domain_pattern.tier3_series[2]
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trends");
    let trends = trend::analyze_trends(active, term_order);
    if trends.is_empty() {
        let _ = writeln!(output, "Insufficient data: trends need three terms.");
    } else {
        for trend_stat in &trends {
            let _ = writeln!(
                output,
                "- {} ({}): {} ({:+.2} pp/term, volatility {:.1}, latest T3 {:.1}%)",
                trend_stat.domain,
                segment_label(trend_stat.segment.as_deref()),
                trend_stat.class,
                trend_stat.slope,
                trend_stat.volatility,
                trend_stat.latest_tier3
            );
        }
    }

    let mut gaps = Vec::new();
    if let Some(segmented) = segmented {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Segment Gaps");
        match latest_term(segmented, term_order) {
            Some(term) => {
                gaps = segments::compare_segments(segmented, term);
                if gaps.is_empty() {
                    let _ = writeln!(output, "No segment gaps above threshold at {term}.");
                } else {
                    for gap in &gaps {
                        let _ = writeln!(
                            output,
                            "- {}: {} leads by {:.1} pts ({:.1}% vs {:.1}%).",
                            gap.domain, gap.leader, gap.gap, gap.leader_pct, gap.laggard_pct
                        );
                    }
                }
            }
            None => {
                let _ = writeln!(output, "Insufficient data: no terms present.");
            }
        }
    }

    let mut recent = records.to_vec();
    recent.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Observations");
    if recent.is_empty() {
        let _ = writeln!(output, "No observations recorded.");
    } else {
        for record in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({} {}) scored {:.1} on {}",
                record.fellow_name, record.domain, record.tier, record.score, record.observed_at
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Strategic Recommendations");
    let latest: Vec<AggregatedStat> = match latest_term(overall, term_order) {
        Some(term) => overall
            .iter()
            .filter(|stat| stat.term == term)
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    let overall_movements = movement::classify_movements(overall, term_order);
    let recommendations =
        recommend::generate_recommendations(&latest, &overall_movements, &gaps);
    if recommendations.is_empty() {
        let _ = writeln!(output, "No recommendations: no data in the latest term.");
    } else {
        for (i, recommendation) in recommendations.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. **{}**: {}",
                i + 1,
                recommendation.category,
                recommendation.text
            );
        }
    }

    output
}
