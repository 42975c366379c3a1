use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Academic terms in canonical order. All time-series logic sorts by this
/// ordering, never by string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Term {
    Term1,
    Term2,
    Term3,
    Term4,
}

impl Term {
    pub const ORDER: [Term; 4] = [Term::Term1, Term::Term2, Term::Term3, Term::Term4];
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Term::Term1 => "Term 1",
            Term::Term2 => "Term 2",
            Term::Term3 => "Term 3",
            Term::Term4 => "Term 4",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized term: {0}")]
pub struct ParseTermError(String);

impl FromStr for Term {
    type Err = ParseTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "term 1" | "t1" | "1" => Ok(Term::Term1),
            "term 2" | "t2" | "2" => Ok(Term::Term2),
            "term 3" | "t3" | "3" => Ok(Term::Term3),
            "term 4" | "t4" | "4" => Ok(Term::Term4),
            _ => Err(ParseTermError(s.to_string())),
        }
    }
}

/// Proficiency bands assigned to an observation. Tier 3 is most advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
}

impl Tier {
    /// Zero-based position for indexing `[_; 3]` tier arrays.
    pub fn index(self) -> usize {
        match self {
            Tier::Tier1 => 0,
            Tier::Tier2 => 1,
            Tier::Tier3 => 2,
        }
    }

    /// Parse the 1..=3 level stored in the database.
    pub fn from_level(level: i32) -> Option<Tier> {
        match level {
            1 => Some(Tier::Tier1),
            2 => Some(Tier::Tier2),
            3 => Some(Tier::Tier3),
            _ => None,
        }
    }

    pub fn level(self) -> i32 {
        self.index() as i32 + 1
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tier {}", self.level())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized tier: {0}")]
pub struct ParseTierError(String);

impl FromStr for Tier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tier 1" | "t1" | "1" => Ok(Tier::Tier1),
            "tier 2" | "t2" | "2" => Ok(Tier::Tier2),
            "tier 3" | "t3" | "3" => Ok(Tier::Tier3),
            _ => Err(ParseTierError(s.to_string())),
        }
    }
}

/// The attribute an aggregation pass slices by. `None` at the call site is
/// the overall view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentScheme {
    SchoolLevel,
    FellowshipYear,
}

impl fmt::Display for SegmentScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SegmentScheme::SchoolLevel => "school level",
            SegmentScheme::FellowshipYear => "fellowship year",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized segment scheme: {0} (expected school-level or fellowship-year)")]
pub struct ParseSegmentSchemeError(String);

impl FromStr for SegmentScheme {
    type Err = ParseSegmentSchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "school-level" | "school_level" | "school level" => Ok(SegmentScheme::SchoolLevel),
            "fellowship-year" | "fellowship_year" | "fellowship year" => {
                Ok(SegmentScheme::FellowshipYear)
            }
            _ => Err(ParseSegmentSchemeError(s.to_string())),
        }
    }
}

/// One classroom observation scored for one domain.
#[derive(Debug, Clone)]
pub struct ObservationRecord {
    pub fellow_id: Uuid,
    pub fellow_name: String,
    pub term: Term,
    pub domain: String,
    pub tier: Tier,
    pub score: f64,
    pub school_level: Option<String>,
    pub fellowship_year: Option<String>,
    pub observed_at: NaiveDate,
}

impl ObservationRecord {
    pub fn segment_value(&self, scheme: SegmentScheme) -> Option<&str> {
        match scheme {
            SegmentScheme::SchoolLevel => self.school_level.as_deref(),
            SegmentScheme::FellowshipYear => self.fellowship_year.as_deref(),
        }
    }
}

/// Tier mix for one (term, domain, segment) bucket. Buckets without records
/// are never materialized, so `count >= 1` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedStat {
    pub term: Term,
    pub domain: String,
    pub segment: Option<String>,
    pub count: usize,
    /// Share of records per tier, summing to 100 within rounding.
    pub tier_pct: [f64; 3],
    /// Mean score within each tier; `None` when the tier has no records.
    pub tier_avg_score: [Option<f64>; 3],
    pub domain_avg: f64,
    /// Tier-weighted average share, 1.0 (all Tier 1) to 3.0 (all Tier 3).
    pub dominant_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Movement {
    Improvement,
    Decline,
    Stable,
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Movement::Improvement => "Improvement",
            Movement::Decline => "Decline",
            Movement::Stable => "Stable",
        };
        f.write_str(label)
    }
}

/// Classified change between two adjacent terms for one domain/segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementRecord {
    pub domain: String,
    pub segment: Option<String>,
    pub from_term: Term,
    pub to_term: Term,
    pub tier3_delta: f64,
    pub index_delta: f64,
    pub movement: Movement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatternLabel {
    UShapeRecovery,
    ConsistentGrowth,
    SteadyDecline,
    Stable,
    Volatile,
}

impl fmt::Display for PatternLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PatternLabel::UShapeRecovery => "U-Shape Recovery",
            PatternLabel::ConsistentGrowth => "Consistent Growth",
            PatternLabel::SteadyDecline => "Steady Decline",
            PatternLabel::Stable => "Stable",
            PatternLabel::Volatile => "Volatile",
        };
        f.write_str(label)
    }
}

/// Trajectory read over the first three terms of a domain/segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainPattern {
    pub domain: String,
    pub segment: Option<String>,
    pub tier3_series: [f64; 3],
    pub label: PatternLabel,
}

/// Spread of Tier-3 share across segment values for one domain at one term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentGap {
    pub domain: String,
    pub leader: String,
    pub leader_pct: f64,
    pub laggard: String,
    pub laggard_pct: f64,
    pub gap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendClass {
    StrongUpward,
    ModerateUpward,
    Flat,
    ModerateDownward,
    StrongDownward,
}

impl fmt::Display for TrendClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendClass::StrongUpward => "Strong Upward",
            TrendClass::ModerateUpward => "Moderate Upward",
            TrendClass::Flat => "Flat",
            TrendClass::ModerateDownward => "Moderate Downward",
            TrendClass::StrongDownward => "Strong Downward",
        };
        f.write_str(label)
    }
}

/// Least-squares trend of Tier-3 share per term for one domain/segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStat {
    pub domain: String,
    pub segment: Option<String>,
    pub slope: f64,
    pub volatility: f64,
    pub latest_tier3: f64,
    pub class: TrendClass,
}

/// Tier mix and index at one term, as seen in a progression summary row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermSnapshot {
    pub term: Term,
    pub tier_pct: [f64; 3],
    pub dominant_index: f64,
}

/// First-to-last progression of a domain/segment over its present terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionSummary {
    pub domain: String,
    pub segment: Option<String>,
    pub terms: Vec<TermSnapshot>,
    pub tier3_change: f64,
    pub index_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecommendationCategory {
    ReplicateSuccess,
    TargetedSupport,
    FoundationalFocus,
    ProgressionAcceleration,
    SegmentGap,
    RecoveryChampion,
}

impl fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecommendationCategory::ReplicateSuccess => "Replicate Success",
            RecommendationCategory::TargetedSupport => "Targeted Support",
            RecommendationCategory::FoundationalFocus => "Foundational Focus",
            RecommendationCategory::ProgressionAcceleration => "Progression Acceleration",
            RecommendationCategory::SegmentGap => "Segment Gap",
            RecommendationCategory::RecoveryChampion => "Recovery Champion",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub text: String,
}
