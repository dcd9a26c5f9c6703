//! Tone classification for reflection text
//!
//! Maps free text to one of three tones with an ordered table of keyword
//! rules. The first matching rule wins; text that matches nothing (including
//! empty text) is `Reflective`. The dashboard and the memory service build
//! their classifier from the same rule table so both sides agree.

use crate::config::ToneRule;
use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Tone of a reflection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Reflective,
    Directive,
    Creative,
}

impl Tone {
    /// All tones, in display order
    pub const ALL: [Tone; 3] = [Tone::Reflective, Tone::Directive, Tone::Creative];

    /// Node color used when rendering memory cards
    pub fn color(&self) -> &'static str {
        match self {
            Self::Directive => "orange",
            Self::Creative => "yellow",
            Self::Reflective => "blue",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reflective => write!(f, "Reflective"),
            Self::Directive => write!(f, "Directive"),
            Self::Creative => write!(f, "Creative"),
        }
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Reflective" => Ok(Self::Reflective),
            "Directive" => Ok(Self::Directive),
            "Creative" => Ok(Self::Creative),
            other => Err(format!("unknown tone: {}", other)),
        }
    }
}

/// Deserialize a tone written by any client: names match case-insensitively
/// and anything else (unknown names, `null`, numbers) reads as `Reflective`
pub fn deserialize_lenient<'de, D>(deserializer: D) -> std::result::Result<Tone, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .map(str::trim)
        .and_then(|name| {
            Tone::ALL
                .into_iter()
                .find(|tone| tone.to_string().eq_ignore_ascii_case(name))
        })
        .unwrap_or_default())
}

struct CompiledRule {
    name: String,
    pattern: Regex,
    tone: Tone,
}

/// Keyword-based tone classifier
pub struct ToneClassifier {
    rules: Vec<CompiledRule>,
}

impl ToneClassifier {
    /// Compile the given rules, keeping their order
    pub fn new(rules: Vec<ToneRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let pattern = Regex::new(&rule.pattern).map_err(|e| {
                    Error::Config(format!(
                        "Invalid regex pattern for tone rule '{}': {}",
                        rule.name, e
                    ))
                })?;
                Ok(CompiledRule {
                    name: rule.name,
                    pattern,
                    tone: rule.tone,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Classify a piece of text
    pub fn classify(&self, text: &str) -> Tone {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| {
                tracing::trace!(rule = %rule.name, tone = %rule.tone, "Tone rule matched");
                rule.tone
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_tone_rules;

    fn classifier() -> ToneClassifier {
        ToneClassifier::new(default_tone_rules()).unwrap()
    }

    #[test]
    fn test_directive_keywords() {
        let c = classifier();
        assert_eq!(c.classify("Ship the release today"), Tone::Directive);
        assert_eq!(c.classify("need to FIX the roof"), Tone::Directive);
        assert_eq!(c.classify("merge"), Tone::Directive);
    }

    #[test]
    fn test_creative_keywords() {
        let c = classifier();
        assert_eq!(c.classify("An idea about gardens"), Tone::Creative);
        assert_eq!(c.classify("I IMAGINE a quiet lake"), Tone::Creative);
        assert_eq!(c.classify("sketch"), Tone::Creative);
    }

    #[test]
    fn test_directive_wins_over_creative() {
        let c = classifier();
        assert_eq!(c.classify("plan a new vision board"), Tone::Directive);
        assert_eq!(c.classify("design then deploy"), Tone::Directive);
    }

    #[test]
    fn test_matching_is_substring_based() {
        let c = classifier();
        // "do" inside "window" counts as a directive keyword
        assert_eq!(c.classify("rain on the window"), Tone::Directive);
        assert_eq!(c.classify("daydreaming"), Tone::Creative);
    }

    #[test]
    fn test_fallback_is_reflective() {
        let c = classifier();
        assert_eq!(c.classify(""), Tone::Reflective);
        assert_eq!(c.classify("feeling calm and grateful"), Tone::Reflective);
        assert_eq!(c.classify("1234 !!"), Tone::Reflective);
    }

    #[test]
    fn test_empty_rule_table_is_total() {
        let c = ToneClassifier::new(Vec::new()).unwrap();
        assert_eq!(c.classify("ship it"), Tone::Reflective);
    }

    #[test]
    fn test_invalid_pattern() {
        let result = ToneClassifier::new(vec![ToneRule {
            name: "bad".to_string(),
            pattern: "[".to_string(),
            tone: Tone::Creative,
        }]);
        assert!(result.is_err());
    }

    #[test]
    fn test_tone_parse_and_display() {
        for tone in Tone::ALL {
            assert_eq!(tone.to_string().parse::<Tone>().unwrap(), tone);
        }
        assert!("calm".parse::<Tone>().is_err());
        assert_eq!(Tone::default(), Tone::Reflective);
    }

    #[derive(Deserialize)]
    struct Tagged {
        #[serde(default, deserialize_with = "deserialize_lenient")]
        tone: Tone,
    }

    #[test]
    fn test_lenient_tone() {
        let decode = |raw: &str| serde_json::from_str::<Tagged>(raw).unwrap().tone;
        assert_eq!(decode(r#"{"tone":"Creative"}"#), Tone::Creative);
        assert_eq!(decode(r#"{"tone":"directive"}"#), Tone::Directive);
        assert_eq!(decode(r#"{"tone":"Calm"}"#), Tone::Reflective);
        assert_eq!(decode(r#"{"tone":null}"#), Tone::Reflective);
        assert_eq!(decode(r#"{"tone":7}"#), Tone::Reflective);
        assert_eq!(decode(r#"{}"#), Tone::Reflective);
    }

    #[test]
    fn test_tone_colors() {
        assert_eq!(Tone::Directive.color(), "orange");
        assert_eq!(Tone::Creative.color(), "yellow");
        assert_eq!(Tone::Reflective.color(), "blue");
    }
}
