// Test fixtures with known documents and their expected segmentation
// WHY: Scenario tests need deterministic inputs whose gate decisions are known up front

/// Promo headline, mixed offer sentence, risk notice
pub const SCENARIO_TEXT: &str = "Win big! Deposit now and claim your 100% bonus. Terms and conditions apply.";

pub const SCENARIO_SENTENCES: [&str; 3] = [
    "Win big!",
    "Deposit now and claim your 100% bonus.",
    "Terms and conditions apply.",
];

/// Sentences none of the heuristic rules fire on
pub const PLAIN_TEXT: &str =
    "The cat sat on the mat. The dog slept by the door. Our shop opens at nine. Prices are listed below. The river is long.";

/// Messy whitespace that normalizes to SCENARIO_TEXT
pub const MESSY_SCENARIO_TEXT: &str =
    "  Win  big!   Deposit now and claim your 100% bonus.\r\nTerms   and conditions apply.  ";
