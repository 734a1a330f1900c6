//! Headline sentiment scoring with VADER plus an equity-market lexicon.
//!
//! VADER's general-purpose lexicon misses most market jargon ("beats
//! estimates", "downgrade", "guidance cut"), so matched phrases nudge the
//! compound score before it is clamped back into [-1, 1].

use vader_sentiment::SentimentIntensityAnalyzer;

const LEXICON_WEIGHT: f64 = 0.5;

const BULLISH_PHRASES: &[(&str, f64)] = &[
    ("beats estimates", 0.4),
    ("beat estimates", 0.4),
    ("record revenue", 0.4),
    ("record high", 0.4),
    ("all-time high", 0.5),
    ("raises guidance", 0.4),
    ("upgrade", 0.3),
    ("upgraded", 0.3),
    ("outperform", 0.3),
    ("buyback", 0.2),
    ("surge", 0.4),
    ("surges", 0.4),
    ("rally", 0.4),
    ("rallies", 0.4),
    ("soars", 0.5),
    ("bullish", 0.5),
    ("breakout", 0.3),
    ("partnership", 0.2),
    ("adoption", 0.2),
];

const BEARISH_PHRASES: &[(&str, f64)] = &[
    ("misses estimates", -0.4),
    ("missed estimates", -0.4),
    ("cuts guidance", -0.4),
    ("guidance cut", -0.4),
    ("downgrade", -0.3),
    ("downgraded", -0.3),
    ("underperform", -0.3),
    ("layoffs", -0.3),
    ("recall", -0.3),
    ("investigation", -0.3),
    ("lawsuit", -0.4),
    ("plunge", -0.5),
    ("plunges", -0.5),
    ("crash", -0.5),
    ("sell-off", -0.4),
    ("selloff", -0.4),
    ("bearish", -0.5),
    ("bankruptcy", -0.6),
    ("fraud", -0.5),
    ("hacked", -0.5),
];

/// Scores free text in [-1, 1].
pub struct HeadlineScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl HeadlineScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Sum of matched phrase weights. Phrases match on word boundaries so
    /// "recall" does not fire inside "recalled".
    fn lexicon_boost(&self, text: &str) -> f64 {
        let normalized: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
            .collect();
        let padded = format!(" {} ", normalized.split_whitespace().collect::<Vec<_>>().join(" "));

        BULLISH_PHRASES
            .iter()
            .chain(BEARISH_PHRASES)
            .filter(|(phrase, _)| padded.contains(&format!(" {} ", phrase)))
            .map(|(_, weight)| weight)
            .sum()
    }

    pub fn score(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let compound = self.analyzer.polarity_scores(text)["compound"];
        (compound + self.lexicon_boost(text) * LEXICON_WEIGHT).clamp(-1.0, 1.0)
    }

    /// Mean score over `texts`, `None` when there is nothing to score.
    pub fn mean_score<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Option<f64> {
        let scores: Vec<f64> = texts.into_iter().map(|t| self.score(t)).collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

impl Default for HeadlineScorer {
    fn default() -> Self {
        Self::new()
    }
}
