//! Score normalization.
//!
//! Turns a free-text AI response into bounded numeric scores, a rank
//! tier, and a per-category breakdown. The AI phrases its answer
//! however it likes, so extraction is keyword-anchored and every value
//! has a randomized or fixed fallback; the no-match path is a primary
//! case, not an edge case. All displayed scores land in [0, 100].

use rand::Rng;
use serde::Serialize;

use crate::types::{AnalyzerKind, Rank};

/// Rank tiers, highest first. Lookup walks the table and takes the
/// first threshold the score clears.
pub const RANKS: [Rank; 7] = [
    Rank { name: "Rizz God", emoji: "🔥", color: "#FF0080", tier: 7, min_score: 95.0 },
    Rank { name: "Rizz Legend", emoji: "⭐", color: "#FFD700", tier: 6, min_score: 90.0 },
    Rank { name: "S-Tier", emoji: "💎", color: "#00D4FF", tier: 5, min_score: 85.0 },
    Rank { name: "A-Tier", emoji: "💫", color: "#9D4EDD", tier: 4, min_score: 80.0 },
    Rank { name: "B-Tier", emoji: "✨", color: "#06FFA5", tier: 3, min_score: 75.0 },
    Rank { name: "C-Tier", emoji: "🌟", color: "#FFB627", tier: 2, min_score: 70.0 },
    Rank { name: "Rising Star", emoji: "⭐", color: "#888888", tier: 1, min_score: 0.0 },
];

pub fn rank_from_score(score: f64) -> &'static Rank {
    RANKS
        .iter()
        .find(|r| score >= r.min_score)
        .unwrap_or(&RANKS[RANKS.len() - 1])
}

/// Small randomized weights applied on top of the base score so that
/// repeated scans of similar inputs don't collapse onto one value.
#[derive(Debug, Clone, Default)]
pub struct ScoreFactors {
    /// Additive, weight 5.
    pub confidence: f64,
    /// Additive, weight 3.
    pub creativity: f64,
    /// Additive, weight 4.
    pub authenticity: f64,
    /// Additive, weight 3.
    pub humor: f64,
    /// Flat -10 penalty.
    pub trying_too_hard: bool,
    /// Flat -15 penalty.
    pub generic: bool,
    /// Subtractive, weight 2.
    pub cringe: f64,
}

impl ScoreFactors {
    /// The factor bundle the analysis flow draws for each scan:
    /// confidence, creativity and authenticity each in [0, 2).
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            confidence: rng.gen::<f64>() * 2.0,
            creativity: rng.gen::<f64>() * 2.0,
            authenticity: rng.gen::<f64>() * 2.0,
            ..Self::default()
        }
    }
}

/// Apply factor adjustments to a base score, clamp to [0, 100], then
/// add a symmetric jitter in (-1, 1) and round to two decimals.
///
/// The jitter is an anti-collision measure so leaderboard ties stay
/// rare; it is bounded noise, not a scoring signal.
pub fn calculate_rizz_score(base: f64, factors: &ScoreFactors) -> f64 {
    let mut score = base;

    score += factors.confidence * 5.0;
    score += factors.creativity * 3.0;
    score += factors.authenticity * 4.0;
    score += factors.humor * 3.0;

    if factors.trying_too_hard {
        score -= 10.0;
    }
    if factors.generic {
        score -= 15.0;
    }
    score -= factors.cringe * 2.0;

    score = score.clamp(0.0, 100.0);

    let jitter = (rand::thread_rng().gen::<f64>() - 0.5) * 2.0;
    round2(score + jitter).clamp(0.0, 100.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Keyword-anchored numeric extraction: find `keyword` in the text
/// (case-insensitive), skip any `:` and whitespace, and parse the
/// digits that follow. Returns the first usable match.
pub fn extract_number(text: &str, keyword: &str) -> Option<f64> {
    let haystack = text.to_lowercase();
    let needle = keyword.to_lowercase();

    let mut rest = haystack.as_str();
    while let Some(pos) = rest.find(&needle) {
        rest = &rest[pos + needle.len()..];
        let after = rest.trim_start_matches(|c: char| c == ':' || c.is_whitespace());
        let digits: String = after
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if let Ok(v) = digits.parse::<f64>() {
            return Some(v);
        }
    }
    None
}

/// One scored category in a breakdown.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Category {
    pub name: &'static str,
    pub score: f64,
}

impl Category {
    fn extracted(name: &'static str, text: &str, keyword: &str, fallback: f64) -> Self {
        Self {
            name,
            score: extract_number(text, keyword).unwrap_or(fallback),
        }
    }
}

/// Per-kind category breakdown plus sentiment-derived feedback lists.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub overall: f64,
    pub categories: Vec<Category>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvements: Vec<String>,
}

const POSITIVE_KEYWORDS: [&str; 5] = ["good", "great", "strong", "impressive", "works"];
const NEGATIVE_KEYWORDS: [&str; 5] = ["weak", "lacking", "needs", "wrong", "avoid"];
const ACTIONABLE_KEYWORDS: [&str; 5] = ["improve", "fix", "change", "try", "consider"];

/// Build the breakdown for an analyzer kind from the raw AI text.
///
/// Each category defaults to a fixed fallback when the keyword is not
/// found; chat kinds have no category table.
pub fn score_breakdown(kind: AnalyzerKind, text: &str) -> ScoreBreakdown {
    let categories = match kind {
        AnalyzerKind::Linkedin => vec![
            Category::extracted("professionalism", text, "professional", 75.0),
            Category::extracted("clarity", text, "clarity", 70.0),
            Category::extracted("impact", text, "impact", 65.0),
            Category::extracted("authenticity", text, "authentic", 80.0),
        ],
        AnalyzerKind::Instagram => vec![
            // Originality is the inverse of the cringe rating.
            Category {
                name: "originality",
                score: 100.0 - extract_number(text, "cringe").unwrap_or(30.0),
            },
            Category::extracted("personality", text, "personality", 70.0),
            Category::extracted("appeal", text, "appeal", 75.0),
            Category::extracted("brevity", text, "concise", 80.0),
        ],
        AnalyzerKind::Dating => vec![
            Category::extracted("attraction", text, "swipe-right", 70.0),
            Category::extracted("personality", text, "personality", 75.0),
            Category::extracted("humor", text, "funny", 65.0),
            Category::extracted("authenticity", text, "genuine", 80.0),
        ],
        AnalyzerKind::Selfie => vec![
            Category::extracted("confidence", text, "confidence", 75.0),
            Category::extracted("style", text, "style", 70.0),
            Category::extracted("energy", text, "energy", 80.0),
            Category::extracted("vibe", text, "vibe", 75.0),
        ],
        AnalyzerKind::Chat | AnalyzerKind::GenericChat => Vec::new(),
    };

    let overall = if categories.is_empty() {
        0.0
    } else {
        let sum: f64 = categories.iter().map(|c| c.score).sum();
        (sum / categories.len() as f64).round()
    };

    ScoreBreakdown {
        overall,
        categories,
        strengths: extract_list_items(text, &POSITIVE_KEYWORDS),
        weaknesses: extract_list_items(text, &NEGATIVE_KEYWORDS),
        improvements: extract_list_items(text, &ACTIONABLE_KEYWORDS),
    }
}

/// Collect up to 3 lines containing any of the keywords, in source
/// order, with leading list markers stripped. Short lines are noise.
fn extract_list_items(text: &str, keywords: &[&str]) -> Vec<String> {
    let mut items = Vec::new();

    for line in text.lines() {
        if items.len() == 3 {
            break;
        }
        if line.trim().len() <= 10 {
            continue;
        }
        let lower = line.to_lowercase();
        if !keywords.iter().any(|kw| lower.contains(kw)) {
            continue;
        }
        let cleaned = line
            .trim_start_matches(|c: char| {
                matches!(c, '-' | '•' | '*' | '.' | ' ') || c.is_ascii_digit()
            })
            .trim();
        if !cleaned.is_empty() {
            items.push(cleaned.to_string());
        }
    }

    items
}

/// The fully normalized result of one analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub kind: AnalyzerKind,
    pub rizz_score: f64,
    pub main_character_score: f64,
    pub npc_level: f64,
    pub overall_score: f64,
    pub rank: &'static Rank,
    pub one_liner: String,
    pub breakdown: ScoreBreakdown,
}

impl Analysis {
    /// Normalize an AI response into scores.
    ///
    /// `upstream_overall` is the score the gateway already extracted
    /// from the response, if any; without it the base falls back to a
    /// randomized baseline in [65, 98). Never panics and never yields
    /// NaN or out-of-range values, even for empty or garbage text.
    pub fn from_ai(kind: AnalyzerKind, message: &str, upstream_overall: Option<f64>) -> Self {
        let base = upstream_overall
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or_else(|| rand::thread_rng().gen_range(65.0..98.0));

        let rizz_score = calculate_rizz_score(base, &ScoreFactors::random());

        let mut rng = rand::thread_rng();
        let main_character_score = round2(rng.gen_range(70.0..98.0));
        let npc_level = round2(rng.gen_range(5.0..35.0));
        let overall_score =
            round2((main_character_score + rizz_score + (100.0 - npc_level)) / 3.0);

        let rank = rank_from_score(rizz_score);

        let one_liner = message
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("AI is impressed! 🔥")
            .to_string();

        let mut breakdown = score_breakdown(kind, message);
        breakdown.overall = overall_score;

        Self {
            kind,
            rizz_score,
            main_character_score,
            npc_level,
            overall_score,
            rank,
            one_liner,
            breakdown,
        }
    }
}

/// Score movement between two scans, for the progress display.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreProgress {
    pub difference: f64,
    pub percent_change: f64,
    pub direction: &'static str,
}

pub fn score_progress(old_score: f64, new_score: f64) -> ScoreProgress {
    let difference = new_score - old_score;
    let percent_change = if old_score > 0.0 {
        round1(difference / old_score * 100.0)
    } else {
        0.0
    };
    let direction = if difference > 0.0 {
        "up"
    } else if difference < 0.0 {
        "down"
    } else {
        "same"
    };
    ScoreProgress {
        difference,
        percent_change,
        direction,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Fixed per-band encouragement line shown with the result.
pub fn motivational_message(score: f64) -> &'static str {
    if score >= 95.0 {
        "You're absolutely crushing it! Keep that energy! 🔥"
    } else if score >= 90.0 {
        "Top tier rizz! You're in the elite club! ⭐"
    } else if score >= 85.0 {
        "Impressive! Just a few tweaks to perfection! 💎"
    } else if score >= 80.0 {
        "Solid game! Keep pushing! 💪"
    } else if score >= 75.0 {
        "Good foundation! Room for growth! 🌱"
    } else if score >= 70.0 {
        "You're on the right track! Keep improving! ✨"
    } else {
        "Everyone starts somewhere! Let's level up! 🚀"
    }
}
