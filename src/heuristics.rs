// WHY: Recall-oriented gate for phrase-level analysis, independent of the model's own flag
// False positives only cost an extra Stage 2 call; false negatives mis-render mixed sentences

use anyhow::Result;
use regex_automata::meta::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Numbers with a percent sign, euro or dollar amounts, multipliers
const NUMERIC_PATTERN: &str = r"(?i)\d[\d,.]*\s*%|\d[\d,.]*\s*€|€\s*\d|\$\s*\d|\d[\d,.]*\s*(times|x|multiplier)\b";

/// Parenthesized or bracketed content
const PARENTHETICAL_PATTERN: &str = r"\([^)]+\)|\[[^\]]+\]";

/// Sentences longer than this many words count as structurally complex
pub const LONG_SENTENCE_WORDS: usize = 25;

pub const ACTION_WORDS: &[&str] = &[
    "sign", "signup", "register", "join", "get", "claim", "grab", "take", "receive",
    "download", "play", "start", "begin", "try", "test", "experience", "discover",
    "unlock", "access", "enter", "visit", "browse", "explore", "check", "view",
    "trade", "invest", "deposit", "withdraw", "bet", "wager", "gamble",
    "buy", "purchase", "order", "subscribe", "upgrade", "contact", "call", "email",
    "book", "reserve", "schedule", "apply", "submit", "send", "share", "follow",
    "click", "tap", "press", "select", "choose", "pick", "open", "close", "save",
];

pub const DISCLAIMER_WORDS: &[&str] = &[
    "terms", "conditions", "apply", "subject to", "restrictions", "limitations",
    "minimum", "maximum", "required", "eligible", "qualification", "criteria",
    "wagering", "rollover", "playthrough", "valid", "expires", "expiry",
    "age", "jurisdiction", "country", "region", "location", "residence",
    "void", "prohibited", "excluded", "available", "offer", "promotion",
];

pub const INFO_WORDS: &[&str] = &[
    "features", "benefits", "how", "what", "when", "where", "why", "information",
    "details", "specifications", "description", "overview", "summary", "guide",
    "tutorial", "instructions", "steps", "process", "method", "system",
    "platform", "technology", "service", "product", "solution", "tool",
    "analysis", "research", "study", "report", "data", "statistics",
    "includes", "contains", "provides", "offers", "supports", "enables",
];

pub const PROMO_WORDS: &[&str] = &[
    "bonus", "free", "offer", "deal", "discount", "save", "special", "exclusive",
    "limited", "time", "hurry", "now", "today", "immediate", "instant", "fast",
    "best", "top", "premium", "ultimate", "amazing", "incredible", "fantastic",
    "welcome", "new", "first", "deposit", "match", "double", "triple",
    "win", "prize", "reward", "gift", "surprise", "extra", "additional",
    "promotion", "campaign", "event", "contest", "competition", "tournament",
];

pub const RISK_WORDS: &[&str] = &[
    "risk", "warning", "caution", "danger", "loss", "lose", "liability",
    "responsible", "addiction", "problem", "gambling", "help", "support",
    "age", "limit", "restrict", "control", "self-exclusion", "cool-off",
    "deposit limit", "loss limit", "time limit", "session limit",
    "regulated", "license", "authority", "commission", "compliance",
    "legal", "lawful", "jurisdiction", "prohibited", "forbidden",
    "terms", "conditions", "rules", "policy", "agreement", "disclaimer",
];

const CONTRAST_CONJUNCTIONS: &[&str] = &[
    " but ", " however ", " although ", " while ", " whereas ", " nevertheless ", " nonetheless ",
];

const CLAUSE_DASHES: &[&str] = &[" - ", " \u{2013} ", " \u{2014} "];

/// Pattern family that flagged a sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRule {
    NumbersWithActions,
    ParentheticalDisclaimers,
    MixedContentIndicators,
    EmbeddedRiskWarnings,
    ComplexMixedStructure,
}

impl GateRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NumbersWithActions => "numbers_with_actions",
            Self::ParentheticalDisclaimers => "parenthetical_disclaimers",
            Self::MixedContentIndicators => "mixed_content_indicators",
            Self::EmbeddedRiskWarnings => "embedded_risk_warnings",
            Self::ComplexMixedStructure => "complex_mixed_structure",
        }
    }
}

impl fmt::Display for GateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules that fired for one sentence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub rules: Vec<GateRule>,
}

impl GateDecision {
    pub fn needs_phrase_level(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn fired(&self, rule: GateRule) -> bool {
        self.rules.contains(&rule)
    }
}

pub struct HeuristicGate {
    numeric: Regex,
    parenthetical: Regex,
}

impl HeuristicGate {
    pub fn new() -> Result<Self> {
        Ok(Self {
            numeric: Regex::new(NUMERIC_PATTERN)?,
            parenthetical: Regex::new(PARENTHETICAL_PATTERN)?,
        })
    }

    pub fn needs_phrase_level(&self, text: &str) -> bool {
        self.evaluate(text).needs_phrase_level()
    }

    /// Evaluate every rule family; rules are reported in declaration order
    pub fn evaluate(&self, text: &str) -> GateDecision {
        let lower = text.to_lowercase();
        let has_info = contains_any(&lower, INFO_WORDS);
        let has_promo = contains_any(&lower, PROMO_WORDS);
        let has_risk = contains_any(&lower, RISK_WORDS);

        let mut rules = Vec::new();

        if self.numeric.is_match(text) && contains_any(&lower, ACTION_WORDS) {
            rules.push(GateRule::NumbersWithActions);
        }
        if self.has_parenthetical_disclaimer(&lower) {
            rules.push(GateRule::ParentheticalDisclaimers);
        }
        if has_info && has_promo {
            rules.push(GateRule::MixedContentIndicators);
        }
        if has_risk && has_promo {
            rules.push(GateRule::EmbeddedRiskWarnings);
        }
        if has_complex_mixed_structure(text, &lower) {
            rules.push(GateRule::ComplexMixedStructure);
        }

        if !rules.is_empty() {
            debug!(rules = ?rules, "Heuristic gate flagged sentence");
        }
        GateDecision { rules }
    }

    fn has_parenthetical_disclaimer(&self, lower: &str) -> bool {
        self.parenthetical
            .find_iter(lower)
            .any(|mat| contains_any(&lower[mat.start()..mat.end()], DISCLAIMER_WORDS))
    }
}

fn contains_any(lower: &str, words: &[&str]) -> bool {
    words.iter().any(|word| lower.contains(word))
}

fn has_complex_mixed_structure(text: &str, lower: &str) -> bool {
    let structural = CONTRAST_CONJUNCTIONS.iter().any(|c| lower.contains(c))
        || CLAUSE_DASHES.iter().any(|d| text.contains(d))
        || text.contains(';');
    if !structural {
        return false;
    }

    let distinct_hits: BTreeSet<&str> = INFO_WORDS
        .iter()
        .chain(PROMO_WORDS)
        .chain(RISK_WORDS)
        .copied()
        .filter(|word| lower.contains(word))
        .collect();

    distinct_hits.len() >= 2 || text.split_whitespace().count() > LONG_SENTENCE_WORDS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> HeuristicGate {
        HeuristicGate::new().unwrap()
    }

    #[test]
    fn test_numbers_with_actions() {
        let decision = gate().evaluate("Deposit 100€ and get 50 free spins.");
        assert!(decision.fired(GateRule::NumbersWithActions));

        let decision = gate().evaluate("Claim your 100% bonus.");
        assert!(decision.fired(GateRule::NumbersWithActions));

        // Quantity without a call to action
        let decision = gate().evaluate("The river is 100 km long.");
        assert!(!decision.fired(GateRule::NumbersWithActions));
    }

    #[test]
    fn test_parenthetical_disclaimers() {
        let decision = gate().evaluate("Enjoy the show (terms and conditions apply).");
        assert!(decision.fired(GateRule::ParentheticalDisclaimers));

        let decision = gate().evaluate("Enjoy the show [18+, wagering 35x].");
        assert!(decision.fired(GateRule::ParentheticalDisclaimers));

        let decision = gate().evaluate("Enjoy the show (it is great).");
        assert!(!decision.fired(GateRule::ParentheticalDisclaimers));
    }

    #[test]
    fn test_mixed_and_embedded_risk() {
        let decision = gate().evaluate("Our platform gives every player a bonus.");
        assert!(decision.fired(GateRule::MixedContentIndicators));

        let decision = gate().evaluate("Grab the bonus, but gambling involves risk.");
        assert!(decision.fired(GateRule::EmbeddedRiskWarnings));
    }

    #[test]
    fn test_complex_structure_needs_content_variety_or_length() {
        let decision = gate().evaluate("Spins are great; bonus rules are in the policy.");
        assert!(decision.fired(GateRule::ComplexMixedStructure));

        // Structure alone, no vocabulary, short
        let decision = gate().evaluate("The cat sat; the dog slept.");
        assert!(!decision.fired(GateRule::ComplexMixedStructure));

        let long = format!("The cat sat; {}", "and then it slept ".repeat(6));
        assert!(long.split_whitespace().count() > LONG_SENTENCE_WORDS);
        assert!(gate().evaluate(&long).fired(GateRule::ComplexMixedStructure));
    }

    #[test]
    fn test_plain_sentence_is_not_flagged() {
        let g = gate();
        assert!(!g.needs_phrase_level("The cat sat on the mat."));
        assert!(g.evaluate("The cat sat on the mat.").rules.is_empty());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert!(gate().needs_phrase_level("DEPOSIT 50 € AND WIN!"));
    }
}
