//! Segment classifier: ordered rule tree over (R, F, V) scores.
//!
//! RULE: first matching rule wins. Rule order is significant and is
//! preserved exactly as listed (or as loaded from configuration).
//! `Other` is never a rule: it is the fallback, so every score triple
//! maps to exactly one segment.

use crate::types::Score;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed marketing taxonomy.
/// Declaration order is the reporting order of per-segment summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Champions,
    Loyal,
    PotentialLoyal,
    Promising,
    New,
    NeedAttention,
    AboutToSleep,
    AtRisk,
    Hibernating,
    Dormant,
    Lost,
    Other,
}

impl Segment {
    pub const ALL: [Segment; 12] = [
        Segment::Champions,
        Segment::Loyal,
        Segment::PotentialLoyal,
        Segment::Promising,
        Segment::New,
        Segment::NeedAttention,
        Segment::AboutToSleep,
        Segment::AtRisk,
        Segment::Hibernating,
        Segment::Dormant,
        Segment::Lost,
        Segment::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Champions      => "champions",
            Self::Loyal          => "loyal",
            Self::PotentialLoyal => "potential_loyal",
            Self::Promising      => "promising",
            Self::New            => "new",
            Self::NeedAttention  => "need_attention",
            Self::AboutToSleep   => "about_to_sleep",
            Self::AtRisk         => "at_risk",
            Self::Hibernating    => "hibernating",
            Self::Dormant        => "dormant",
            Self::Lost           => "lost",
            Self::Other          => "other",
        }
    }

    /// Display label for dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Champions      => "Champions",
            Self::Loyal          => "Loyal customers",
            Self::PotentialLoyal => "Potential loyalists",
            Self::Promising      => "Promising",
            Self::New            => "New customers",
            Self::NeedAttention  => "Need attention",
            Self::AboutToSleep   => "About to sleep",
            Self::AtRisk         => "At risk",
            Self::Hibernating    => "Hibernating",
            Self::Dormant        => "Dormant",
            Self::Lost           => "Lost",
            Self::Other          => "Other",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive score interval. `ScoreRange::ANY` matches every score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: u8,
    pub max: u8,
}

impl ScoreRange {
    pub const ANY: ScoreRange = ScoreRange { min: 1, max: 5 };

    pub const fn between(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub const fn at_least(min: u8) -> Self {
        Self { min, max: 5 }
    }

    pub const fn at_most(max: u8) -> Self {
        Self { min: 1, max }
    }

    pub const fn exactly(value: u8) -> Self {
        Self { min: value, max: value }
    }

    pub fn contains(&self, score: Score) -> bool {
        (self.min..=self.max).contains(&score.get())
    }

    fn is_valid(&self) -> bool {
        Score::new(self.min).is_some() && Score::new(self.max).is_some() && self.min <= self.max
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::ANY
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRule {
    pub segment: Segment,
    #[serde(default)]
    pub recency: ScoreRange,
    #[serde(default)]
    pub frequency: ScoreRange,
    #[serde(default)]
    pub monetary: ScoreRange,
}

impl SegmentRule {
    const fn new(segment: Segment, recency: ScoreRange, frequency: ScoreRange, monetary: ScoreRange) -> Self {
        Self { segment, recency, frequency, monetary }
    }

    pub fn matches(&self, r: Score, f: Score, v: Score) -> bool {
        self.recency.contains(r) && self.frequency.contains(f) && self.monetary.contains(v)
    }
}

/// The ordered rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentRules(Vec<SegmentRule>);

impl SegmentRules {
    pub fn new(rules: Vec<SegmentRule>) -> Self {
        Self(rules)
    }

    pub fn rules(&self) -> &[SegmentRule] {
        &self.0
    }

    /// First matching rule wins; no match falls through to `Other`.
    pub fn classify(&self, r: Score, f: Score, v: Score) -> Segment {
        self.0
            .iter()
            .find(|rule| rule.matches(r, f, v))
            .map(|rule| rule.segment)
            .unwrap_or(Segment::Other)
    }

    /// Every range must sit inside 1..=5 with min <= max, and `Other`
    /// may not appear as an explicit rule.
    pub fn validate(&self) -> Result<(), String> {
        for (i, rule) in self.0.iter().enumerate() {
            if rule.segment == Segment::Other {
                return Err(format!("rule {i}: 'other' is the fallback and cannot be a rule"));
            }
            for (dim, range) in [
                ("recency", rule.recency),
                ("frequency", rule.frequency),
                ("monetary", rule.monetary),
            ] {
                if !range.is_valid() {
                    return Err(format!(
                        "rule {i} ({}): {dim} range {}..={} is not inside 1..=5",
                        rule.segment, range.min, range.max
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Default for SegmentRules {
    fn default() -> Self {
        use ScoreRange as S;
        Self(vec![
            SegmentRule::new(Segment::Champions,      S::at_least(4), S::at_least(4), S::at_least(4)),
            SegmentRule::new(Segment::Loyal,          S::at_least(4), S::at_least(3), S::at_least(3)),
            SegmentRule::new(Segment::AtRisk,         S::at_most(2),  S::at_least(3), S::at_least(3)),
            SegmentRule::new(Segment::Promising,      S::at_least(4), S::at_most(2),  S::at_least(3)),
            SegmentRule::new(Segment::New,            S::at_least(4), S::at_most(2),  S::at_most(2)),
            SegmentRule::new(Segment::Lost,           S::exactly(1),  S::at_most(2),  S::ANY),
            SegmentRule::new(Segment::Dormant,        S::exactly(2),  S::at_most(2),  S::ANY),
            SegmentRule::new(Segment::PotentialLoyal, S::at_least(4), S::at_least(3), S::at_most(2)),
            SegmentRule::new(Segment::NeedAttention,  S::exactly(3),  S::at_least(3), S::at_least(3)),
            SegmentRule::new(Segment::AboutToSleep,   S::exactly(3),  S::at_most(2),  S::ANY),
            SegmentRule::new(Segment::Hibernating,    S::at_most(2),  S::at_least(3), S::at_most(2)),
        ])
    }
}
