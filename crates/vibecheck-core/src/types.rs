use serde::{Deserialize, Serialize};

// User identity = opaque key issued by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The kind of content an analysis request targets.
///
/// `Chat` covers uploaded chat screenshots (the wire value `screenshot`
/// is an alias); `GenericChat` is the free-form AI companion chat that
/// produces no scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    Selfie,
    Chat,
    Linkedin,
    Instagram,
    Dating,
    GenericChat,
}

/// The five analyzer kinds that produce a score (everything except the
/// generic companion chat). Trying all of them unlocks a badge.
pub const SCORED_KINDS: [AnalyzerKind; 5] = [
    AnalyzerKind::Selfie,
    AnalyzerKind::Chat,
    AnalyzerKind::Linkedin,
    AnalyzerKind::Instagram,
    AnalyzerKind::Dating,
];

impl AnalyzerKind {
    /// Parse a wire string. Unknown values fall back to the generic
    /// chat handler rather than erroring, matching the public API.
    pub fn parse(s: &str) -> Self {
        match s {
            "selfie" => Self::Selfie,
            "chat" | "screenshot" => Self::Chat,
            "linkedin" => Self::Linkedin,
            "instagram" => Self::Instagram,
            "dating" => Self::Dating,
            _ => Self::GenericChat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selfie => "selfie",
            Self::Chat => "chat",
            Self::Linkedin => "linkedin",
            Self::Instagram => "instagram",
            Self::Dating => "dating",
            Self::GenericChat => "generic-chat",
        }
    }

    pub fn is_scored(&self) -> bool {
        !matches!(self, Self::GenericChat)
    }
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A display rank tier derived from a score by fixed thresholds.
///
/// Purely presentational: the tier number, color and emoji are part of
/// the product contract and never change at runtime.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Rank {
    pub name: &'static str,
    pub emoji: &'static str,
    pub color: &'static str,
    /// Ordinal 1 (lowest) through 7 (highest).
    pub tier: u8,
    /// Minimum score for this tier.
    #[serde(skip)]
    pub min_score: f64,
}

/// Achievement rarity, lowest to highest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    /// Fixed display color for badges of this rarity.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Common => "#9CA3AF",
            Self::Rare => "#3B82F6",
            Self::Epic => "#A855F7",
            Self::Legendary => "#F59E0B",
            Self::Mythic => "#EF4444",
        }
    }
}
