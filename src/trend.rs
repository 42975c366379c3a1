use std::collections::BTreeMap;

use crate::models::{AggregatedStat, Term, TrendClass, TrendStat};

/// Slope cutoffs in Tier-3 percentage points per term.
pub const STRONG_TREND_PP: f64 = 5.0;
pub const MODERATE_TREND_PP: f64 = 2.0;

fn classify_slope(slope: f64) -> TrendClass {
    if slope > STRONG_TREND_PP {
        TrendClass::StrongUpward
    } else if slope > MODERATE_TREND_PP {
        TrendClass::ModerateUpward
    } else if slope > -MODERATE_TREND_PP {
        TrendClass::Flat
    } else if slope > -STRONG_TREND_PP {
        TrendClass::ModerateDownward
    } else {
        TrendClass::StrongDownward
    }
}

fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_x = (values.len() - 1) as f64 / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }

    numerator / denominator
}

fn population_std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Fit a least-squares line through each (domain, segment) key's Tier-3
/// share across its present terms and classify the slope. Keys with fewer
/// than three terms are skipped; two points always fit perfectly and say
/// nothing about a trend.
pub fn analyze_trends(stats: &[AggregatedStat], term_order: &[Term]) -> Vec<TrendStat> {
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

    let mut trends = Vec::new();

    for ((domain, segment), mut rows) in by_key {
        if rows.len() < 3 {
            continue;
        }
        rows.sort_by_key(|stat| position(stat.term));

        let series: Vec<f64> = rows.iter().map(|stat| stat.tier_pct[2]).collect();
        let slope = least_squares_slope(&series);

        trends.push(TrendStat {
            domain: domain.to_string(),
            segment: segment.map(str::to_string),
            slope,
            volatility: population_std_dev(&series),
            latest_tier3: series[series.len() - 1],
            class: classify_slope(slope),
        });
    }

    trends
}
