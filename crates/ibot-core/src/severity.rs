//! Title-based severity classification.

/// Injury status tiers, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Out,
    Doubtful,
    Questionable,
    Other,
}

/// Evaluated top-down; the first keyword found in the title wins.
///
/// Matching is a plain case-insensitive substring test, so `OUT` also matches
/// words like "without". Kept as-is to preserve the classification users know.
pub const SEVERITY_RULES: &[(&str, Severity)] = &[
    ("OUT", Severity::Out),
    ("DOUBTFUL", Severity::Doubtful),
    ("QUESTIONABLE", Severity::Questionable),
];

impl Severity {
    pub fn classify(title: &str) -> Self {
        let upper = title.to_uppercase();
        SEVERITY_RULES
            .iter()
            .find(|(keyword, _)| upper.contains(keyword))
            .map(|(_, tier)| *tier)
            .unwrap_or(Severity::Other)
    }

    /// Notice colour (0xRRGGBB).
    pub fn color(self) -> u32 {
        match self {
            Severity::Out => 0xD93030,
            Severity::Doubtful => 0xE67E22,
            Severity::Questionable => 0xF1C40F,
            Severity::Other => 0x2ECC71,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Out => "OUT",
            Severity::Doubtful => "DOUBTFUL",
            Severity::Questionable => "QUESTIONABLE",
            Severity::Other => "UPDATE",
        }
    }
}
