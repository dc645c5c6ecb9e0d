//! Lexical sentiment analysis over user input, plus the static mental-health
//! resource lists surfaced when negative affect is detected.
//!
//! `analyze` is pure and infallible: trivial input and scorer misses both
//! fall back to a neutral reading, so classification can never abort a turn.

use serde::{Deserialize, Serialize};

/// Resources are surfaced when mood is negative and confidence crosses this.
pub const SUPPORT_CONFIDENCE_THRESHOLD: f32 = 0.5;

const NEGATIVE_THRESHOLD: f32 = -0.3;
const POSITIVE_THRESHOLD: f32 = 0.3;
const MIN_SCORED_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Positive,
    Neutral,
    Negative,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Positive => "positive",
            Mood::Neutral => "neutral",
            Mood::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub mood: Mood,
    /// In [0, 1]; scaled from polarity magnitude.
    pub confidence: f32,
    /// In [-1, 1].
    pub polarity: f32,
    /// In [0, 1]; how opinion-laden the scored words are.
    pub subjectivity: f32,
}

impl SentimentReading {
    fn neutral_default() -> Self {
        Self {
            mood: Mood::Neutral,
            confidence: 0.5,
            polarity: 0.0,
            subjectivity: 0.5,
        }
    }
}

/// Classify a user turn. Same text always yields the same reading.
pub fn analyze(text: &str) -> SentimentReading {
    let cleaned = clean_text(text);

    // Trivial input would only produce classifier noise
    if cleaned.chars().count() < MIN_SCORED_LEN {
        return SentimentReading::neutral_default();
    }

    let (polarity, subjectivity) = score(&cleaned);
    SentimentReading {
        mood: mood_for_polarity(polarity),
        confidence: (polarity.abs() * 2.0).min(1.0),
        polarity,
        subjectivity,
    }
}

/// Thresholds are inclusive: exactly -0.3 is negative, exactly 0.3 positive.
pub fn mood_for_polarity(polarity: f32) -> Mood {
    if polarity <= NEGATIVE_THRESHOLD {
        Mood::Negative
    } else if polarity >= POSITIVE_THRESHOLD {
        Mood::Positive
    } else {
        Mood::Neutral
    }
}

/// True when the reading warrants surfacing crisis resources.
pub fn needs_support(reading: &SentimentReading) -> bool {
    reading.mood == Mood::Negative && reading.confidence > SUPPORT_CONFIDENCE_THRESHOLD
}

/// Strip `:shortcode:` emoji tokens, drop punctuation, lowercase, trim.
fn clean_text(text: &str) -> String {
    let stripped = strip_emoji_tokens(text);
    let filtered: String = stripped
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    filtered.to_lowercase().trim().to_string()
}

fn strip_emoji_tokens(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ':' {
            if let Some(offset) = chars[i + 1..].iter().position(|c| *c == ':') {
                let end = i + 1 + offset;
                let inner = &chars[i + 1..end];
                if !inner.is_empty()
                    && inner.iter().all(|c| c.is_ascii_alphanumeric() || *c == '_')
                {
                    i = end + 1;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

const NEGATORS: &[&str] = &[
    "not", "no", "never", "dont", "cant", "wont", "isnt", "arent", "wasnt", "werent", "couldnt",
    "shouldnt", "didnt", "doesnt",
];

const INTENSIFIERS: &[&str] = &["very", "really", "so", "extremely", "totally", "completely"];

/// Word → (polarity, subjectivity). Values follow the ranges of the pattern
/// lexicon: polarity in [-1, 1], subjectivity in [0, 1].
const LEXICON: &[(&str, f32, f32)] = &[
    // positive affect
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("happy", 0.8, 1.0),
    ("joy", 0.8, 0.9),
    ("joyful", 0.85, 0.95),
    ("glad", 0.5, 1.0),
    ("wonderful", 1.0, 1.0),
    ("amazing", 0.6, 0.9),
    ("awesome", 1.0, 1.0),
    ("excellent", 1.0, 1.0),
    ("fantastic", 0.9, 0.9),
    ("love", 0.5, 0.6),
    ("loved", 0.7, 0.8),
    ("better", 0.5, 0.5),
    ("best", 1.0, 0.3),
    ("calm", 0.3, 0.75),
    ("peaceful", 0.65, 0.85),
    ("relaxed", 0.45, 0.7),
    ("hopeful", 0.5, 0.75),
    ("grateful", 0.7, 0.8),
    ("thankful", 0.65, 0.8),
    ("proud", 0.6, 0.8),
    ("excited", 0.4, 0.8),
    ("confident", 0.5, 0.7),
    ("strong", 0.45, 0.55),
    ("motivated", 0.5, 0.7),
    ("energized", 0.5, 0.7),
    ("optimistic", 0.55, 0.75),
    ("content", 0.4, 0.6),
    ("cheerful", 0.7, 0.85),
    ("safe", 0.4, 0.5),
    ("supported", 0.45, 0.6),
    ("rested", 0.4, 0.6),
    ("fine", 0.4, 0.45),
    ("okay", 0.2, 0.5),
    ("nice", 0.6, 0.9),
    ("fun", 0.3, 0.2),
    ("enjoy", 0.5, 0.6),
    ("enjoyed", 0.5, 0.6),
    ("smile", 0.45, 0.65),
    ("progress", 0.35, 0.4),
    // negative affect
    ("bad", -0.7, 0.65),
    ("terrible", -1.0, 1.0),
    ("horrible", -1.0, 1.0),
    ("awful", -1.0, 1.0),
    ("worst", -1.0, 0.3),
    ("worse", -0.6, 0.6),
    ("sad", -0.5, 1.0),
    ("unhappy", -0.6, 0.9),
    ("miserable", -0.85, 0.95),
    ("depressed", -0.75, 0.9),
    ("depressing", -0.7, 0.9),
    ("hopeless", -0.85, 0.9),
    ("helpless", -0.7, 0.85),
    ("worthless", -0.8, 0.9),
    ("useless", -0.65, 0.8),
    ("lonely", -0.6, 0.85),
    ("alone", -0.35, 0.5),
    ("isolated", -0.5, 0.7),
    ("anxious", -0.6, 0.85),
    ("anxiety", -0.55, 0.8),
    ("panic", -0.65, 0.8),
    ("afraid", -0.6, 0.85),
    ("scared", -0.6, 0.85),
    ("fear", -0.55, 0.7),
    ("worried", -0.5, 0.75),
    ("stressed", -0.6, 0.8),
    ("stress", -0.5, 0.7),
    ("overwhelmed", -0.6, 0.8),
    ("exhausted", -0.55, 0.75),
    ("tired", -0.4, 0.6),
    ("drained", -0.5, 0.7),
    ("angry", -0.7, 0.9),
    ("furious", -0.85, 0.95),
    ("upset", -0.55, 0.8),
    ("hurt", -0.5, 0.7),
    ("pain", -0.55, 0.65),
    ("crying", -0.5, 0.75),
    ("cry", -0.45, 0.7),
    ("broken", -0.6, 0.7),
    ("lost", -0.45, 0.6),
    ("empty", -0.45, 0.6),
    ("numb", -0.45, 0.6),
    ("guilty", -0.55, 0.75),
    ("ashamed", -0.6, 0.8),
    ("failure", -0.65, 0.75),
    ("failing", -0.6, 0.7),
    ("hate", -0.8, 0.9),
    ("hated", -0.8, 0.9),
    ("struggling", -0.5, 0.65),
    ("suffering", -0.65, 0.75),
    ("desperate", -0.65, 0.8),
    ("suicidal", -0.9, 0.95),
];

fn score(cleaned: &str) -> (f32, f32) {
    let mut polarity_sum = 0.0f32;
    let mut subjectivity_sum = 0.0f32;
    let mut hits = 0usize;

    let mut negated = false;
    let mut boost = 1.0f32;

    for token in cleaned.split_whitespace() {
        if NEGATORS.contains(&token) {
            negated = true;
            continue;
        }
        if INTENSIFIERS.contains(&token) {
            boost = 1.3;
            continue;
        }

        if let Some((_, polarity, subjectivity)) = LEXICON.iter().find(|(w, _, _)| *w == token) {
            let mut p = polarity * boost;
            if negated {
                // Negation dampens and flips rather than mirroring outright
                p *= -0.5;
            }
            polarity_sum += p.clamp(-1.0, 1.0);
            subjectivity_sum += subjectivity;
            hits += 1;
        }

        negated = false;
        boost = 1.0;
    }

    if hits == 0 {
        return (0.0, 0.0);
    }
    (polarity_sum / hits as f32, subjectivity_sum / hits as f32)
}

// --- Support resources ---

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Resource {
    pub title: &'static str,
    pub description: &'static str,
    pub url: &'static str,
    pub contact: Option<&'static str>,
}

const NEGATIVE_RESOURCES: &[Resource] = &[
    Resource {
        title: "Crisis Helpline",
        description: "24/7 support for emotional crisis",
        url: "https://www.crisistextline.org/",
        contact: Some("1-800-273-8255"),
    },
    Resource {
        title: "Therapy Resources",
        description: "Find licensed therapists in your area",
        url: "https://www.psychologytoday.com/us/therapists",
        contact: None,
    },
    Resource {
        title: "Mindfulness Exercises",
        description: "Simple exercises to help manage stress and anxiety",
        url: "https://www.mindful.org/meditation/mindfulness-getting-started/",
        contact: None,
    },
];

const NEUTRAL_RESOURCES: &[Resource] = &[
    Resource {
        title: "Self-Care Tips",
        description: "Daily practices for mental wellness",
        url: "https://www.verywellmind.com/self-care-strategies-overall-stress-reduction-3144729",
        contact: None,
    },
    Resource {
        title: "Mental Health Apps",
        description: "Recommended apps for mental wellness",
        url: "https://www.psycom.net/25-best-mental-health-apps",
        contact: None,
    },
];

const POSITIVE_RESOURCES: &[Resource] = &[
    Resource {
        title: "Wellness Activities",
        description: "Activities to maintain positive mental health",
        url: "https://www.healthline.com/health/mental-health/mental-health-activities",
        contact: None,
    },
    Resource {
        title: "Gratitude Practices",
        description: "Ways to cultivate gratitude and joy",
        url: "https://greatergood.berkeley.edu/topic/gratitude",
        contact: None,
    },
];

pub fn resources_for(mood: Mood) -> &'static [Resource] {
    match mood {
        Mood::Negative => NEGATIVE_RESOURCES,
        Mood::Neutral => NEUTRAL_RESOURCES,
        Mood::Positive => POSITIVE_RESOURCES,
    }
}

/// Mood-conditioned opening line for the support page.
pub fn supportive_preamble(reading: &SentimentReading) -> &'static str {
    if reading.mood == Mood::Negative && reading.confidence > SUPPORT_CONFIDENCE_THRESHOLD {
        "I notice you might be feeling down. I'm here to listen and help. Would you like to talk about what's troubling you, or would you prefer some suggestions for feeling better?"
    } else if reading.mood == Mood::Positive && reading.confidence > SUPPORT_CONFIDENCE_THRESHOLD {
        "I'm glad you're feeling positive! Would you like to explore ways to maintain this positive energy?"
    } else {
        "How can I support you today? I'm here to listen and chat about whatever's on your mind."
    }
}

// --- Session analytics ---

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MoodSummary {
    pub average_polarity: f32,
    pub average_subjectivity: f32,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

/// Aggregate a session's sentiment log for the analytics view.
pub fn summarize(readings: &[SentimentReading]) -> MoodSummary {
    if readings.is_empty() {
        return MoodSummary::default();
    }

    let mut summary = MoodSummary::default();
    for reading in readings {
        summary.average_polarity += reading.polarity;
        summary.average_subjectivity += reading.subjectivity;
        match reading.mood {
            Mood::Positive => summary.positive += 1,
            Mood::Neutral => summary.neutral += 1,
            Mood::Negative => summary.negative += 1,
        }
    }
    summary.average_polarity /= readings.len() as f32;
    summary.average_subjectivity /= readings.len() as f32;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_is_deterministic() {
        let a = analyze("I feel hopeless today");
        let b = analyze("I feel hopeless today");
        assert_eq!(a, b);
    }

    #[test]
    fn short_input_short_circuits_to_neutral() {
        for text in ["", "ok", "a", "  hi  ", ":smile:", "!?."] {
            let reading = analyze(text);
            assert_eq!(reading.mood, Mood::Neutral, "input: {text:?}");
            assert_eq!(reading.confidence, 0.5);
            assert_eq!(reading.polarity, 0.0);
            assert_eq!(reading.subjectivity, 0.5);
        }
    }

    #[test]
    fn threshold_boundaries_are_inclusive() {
        assert_eq!(mood_for_polarity(-0.3), Mood::Negative);
        assert_eq!(mood_for_polarity(0.3), Mood::Positive);
        assert_eq!(mood_for_polarity(-0.29), Mood::Neutral);
        assert_eq!(mood_for_polarity(0.29), Mood::Neutral);
        assert_eq!(mood_for_polarity(0.0), Mood::Neutral);
    }

    #[test]
    fn hopeless_reads_strongly_negative() {
        let reading = analyze("I feel hopeless today");
        assert_eq!(reading.mood, Mood::Negative);
        assert!(reading.confidence > SUPPORT_CONFIDENCE_THRESHOLD);
        assert!(needs_support(&reading));
    }

    #[test]
    fn happy_reads_positive() {
        let reading = analyze("I am so happy with my progress");
        assert_eq!(reading.mood, Mood::Positive);
        assert!(reading.polarity >= 0.3);
    }

    #[test]
    fn negation_flips_and_dampens() {
        let plain = analyze("I am happy today");
        let negated = analyze("I am not happy today");
        assert!(negated.polarity < 0.0);
        assert!((negated.polarity.abs() - plain.polarity / 2.0).abs() < 1e-6);
    }

    #[test]
    fn intensifier_raises_magnitude() {
        let plain = analyze("I am happy today");
        let boosted = analyze("I am very happy today");
        assert!(boosted.polarity > plain.polarity);
        assert!(boosted.polarity <= 1.0);
    }

    #[test]
    fn emoji_shortcodes_are_ignored() {
        let with_emoji = analyze("I feel hopeless today :sob: :broken_heart:");
        let without = analyze("I feel hopeless today");
        assert_eq!(with_emoji, without);
    }

    #[test]
    fn unscored_text_is_neutral_with_zero_confidence() {
        let reading = analyze("the quarterly report arrives on tuesday");
        assert_eq!(reading.mood, Mood::Neutral);
        assert_eq!(reading.polarity, 0.0);
        assert_eq!(reading.confidence, 0.0);
    }

    #[test]
    fn support_threshold_is_strict() {
        let reading = SentimentReading {
            mood: Mood::Negative,
            confidence: 0.5,
            polarity: -0.25,
            subjectivity: 0.5,
        };
        assert!(!needs_support(&reading));
    }

    #[test]
    fn negative_resources_lead_with_crisis_line() {
        let resources = resources_for(Mood::Negative);
        assert_eq!(resources.len(), 3);
        assert_eq!(resources[0].title, "Crisis Helpline");
        assert!(resources[0].contact.is_some());
        assert_eq!(resources_for(Mood::Neutral).len(), 2);
        assert_eq!(resources_for(Mood::Positive).len(), 2);
    }

    #[test]
    fn preamble_tracks_mood() {
        let down = analyze("I feel hopeless today");
        assert!(supportive_preamble(&down).starts_with("I notice"));
        let up = analyze("I am so happy and grateful");
        assert!(supportive_preamble(&up).starts_with("I'm glad"));
        let flat = analyze("the report arrives tuesday");
        assert!(supportive_preamble(&flat).starts_with("How can I"));
    }

    #[test]
    fn summary_averages_and_counts() {
        let log = vec![
            analyze("I feel hopeless today"),
            analyze("I am so happy and grateful"),
            analyze("the report arrives tuesday"),
        ];
        let summary = summarize(&log);
        assert_eq!(summary.negative, 1);
        assert_eq!(summary.positive, 1);
        assert_eq!(summary.neutral, 1);
        let expected = (log[0].polarity + log[1].polarity + log[2].polarity) / 3.0;
        assert!((summary.average_polarity - expected).abs() < 1e-6);
        assert_eq!(summarize(&[]).positive, 0);
    }
}
