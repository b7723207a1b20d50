//! Temporal pattern detection over note text.
//!
//! This analysis works on the raw notes rather than the graph: temporal
//! markers live in prose that often never became structured relations.
//! The marker table and stopword list are injected configuration so tests
//! can substitute fixtures; the defaults carry the French investigation
//! vocabulary the notation was designed around.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use trellis_core::extract_first_subject;

/// A detected temporal marker with its occurrences and suggested
/// normalizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalPattern {
    pub pattern: String,
    pub occurrences: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Marker vocabulary driving the detection.
///
/// `markers` is ordered: the first entry matching a line wins, and each
/// line reports at most one marker.
#[derive(Debug, Clone)]
pub struct TemporalLexicon {
    /// Marker word → canonical relation label.
    pub markers: Vec<(String, String)>,
    /// Words too common to anchor a suggestion.
    pub stopwords: Vec<String>,
}

impl Default for TemporalLexicon {
    fn default() -> Self {
        let markers = [
            ("avant", "précède"),
            ("après", "suit"),
            ("puis", "puis"),
            ("ensuite", "ensuite"),
            ("pendant", "pendant"),
            ("durant", "durant"),
            ("alors que", "en parallèle de"),
            ("jusqu'à", "jusqu'à"),
            ("depuis", "depuis"),
            ("vers", "vers"),
            ("lorsque", "au moment où"),
            ("quand", "quand"),
            // Deliberately late in the list: the bare preposition only
            // wins when no specific marker matched first.
            ("à", "à"),
            ("lendemain", "suit"),
            ("veille", "précède"),
            ("soirée", "pendant"),
            ("matin", "au début de"),
            ("soir", "à la fin de"),
        ];
        let stopwords = ["les", "une", "des", "dans", "sur", "avec", "pour", "par"];

        Self {
            markers: markers
                .iter()
                .map(|(m, r)| (m.to_string(), r.to_string()))
                .collect(),
            stopwords: stopwords.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Detects temporal patterns in a notes-by-context map.
pub struct TemporalAnalyzer {
    lexicon: TemporalLexicon,
    relation: Regex,
    time: Regex,
    date: Regex,
}

impl Default for TemporalAnalyzer {
    fn default() -> Self {
        Self::new(TemporalLexicon::default())
    }
}

impl TemporalAnalyzer {
    /// Creates an analyzer over the given vocabulary.
    pub fn new(lexicon: TemporalLexicon) -> Self {
        Self {
            lexicon,
            relation: Regex::new(r"^(.*) -> (.*) -> (.*)$").unwrap(),
            time: Regex::new(r"(\d{1,2}h\d{0,2}|\d{1,2}:\d{2})").unwrap(),
            date: Regex::new(r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|lendemain|veille|matin|soir|soirée|midi|minuit)")
                .unwrap(),
        }
    }

    /// Scans every note for temporal markers, then for explicit clock
    /// times and date tokens. Patterns sharing a marker are merged:
    /// occurrences concatenate, suggestions de-duplicate.
    pub fn detect_patterns(&self, notes: &BTreeMap<String, Vec<String>>) -> Vec<TemporalPattern> {
        let mut patterns: Vec<TemporalPattern> = Vec::new();
        let mut detected: HashSet<String> = HashSet::new();

        for list in notes.values() {
            for note in list {
                let clean = note.trim();
                let lower = clean.to_lowercase();

                for (marker, relation) in &self.lexicon.markers {
                    if lower.contains(marker.as_str()) && !detected.contains(clean) {
                        detected.insert(clean.to_string());
                        let suggestions = self.analyze_context(clean, marker, relation);
                        merge_or_add(
                            &mut patterns,
                            TemporalPattern {
                                pattern: marker.clone(),
                                occurrences: vec![clean.to_string()],
                                suggestions,
                            },
                        );
                        break;
                    }
                }
            }
        }

        self.detect_time_and_date_patterns(notes, &mut patterns);

        patterns
    }

    /// Builds suggestions for one marked line.
    ///
    /// A line that is already an arrow relation gets its label replaced by
    /// the canonical relation; otherwise the words immediately around the
    /// marker serve as heuristic subject and object.
    fn analyze_context(&self, text: &str, marker: &str, relation: &str) -> Vec<String> {
        let mut suggestions = Vec::new();
        let clean = text.trim();

        if let Some(caps) = self.relation.captures(clean) {
            let source = caps[1].trim();
            let target = caps[3].trim();
            suggestions.push(format!("{} -> {} -> {}", source, relation, target));
            suggestions.push(format!("Ajouter au contexte 'Chronologie': {}", clean));
            return suggestions;
        }

        let lower = text.to_lowercase();
        if let Some(index) = lower.find(marker) {
            if index > 0 {
                let before = &text[..index];
                let after = &text[index + marker.len()..];

                let before_words = self.significant_words(before);
                let after_words = self.significant_words(after);

                if let (Some(subject), Some(object)) =
                    (before_words.last(), after_words.first())
                {
                    suggestions.push(format!("{} -> {} -> {}", subject, relation, object));
                }
            }
        }

        suggestions.push(format!("Annoter comme événement temporel avec '{}'", marker));
        suggestions.push(format!("Ajouter au contexte 'Chronologie': {}", text));

        suggestions
    }

    /// Words long enough and rare enough to anchor a suggestion.
    fn significant_words(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|w| w.trim_matches(|c| ".,;:!?()[]{}\"'".contains(c)))
            .filter(|w| w.chars().count() >= 3)
            .filter(|w| {
                let lower = w.to_lowercase();
                !self.lexicon.stopwords.iter().any(|s| *s == lower)
            })
            .map(str::to_string)
            .collect()
    }

    /// Second pass: explicit clock times and date tokens.
    fn detect_time_and_date_patterns(
        &self,
        notes: &BTreeMap<String, Vec<String>>,
        patterns: &mut Vec<TemporalPattern>,
    ) {
        for list in notes.values() {
            for note in list {
                let clean = note.trim();

                for m in self.time.find_iter(clean) {
                    let mut suggestions =
                        vec![format!("Créer un événement temporel à {}", m.as_str())];
                    let subject = extract_first_subject(clean);
                    if !subject.is_empty() {
                        suggestions.push(format!("{} -> se passe à -> {}", subject, m.as_str()));
                    }
                    merge_or_add(
                        patterns,
                        TemporalPattern {
                            pattern: "heure".to_string(),
                            occurrences: vec![clean.to_string()],
                            suggestions,
                        },
                    );
                }

                for m in self.date.find_iter(&clean.to_lowercase()) {
                    let mut suggestions =
                        vec![format!("Marquer '{}' comme repère temporel", m.as_str())];
                    let subject = extract_first_subject(clean);
                    if !subject.is_empty() {
                        suggestions.push(format!("{} -> a lieu le -> {}", subject, m.as_str()));
                    }
                    merge_or_add(
                        patterns,
                        TemporalPattern {
                            pattern: "date/moment".to_string(),
                            occurrences: vec![clean.to_string()],
                            suggestions,
                        },
                    );
                }
            }
        }
    }
}

/// Merges a new pattern into an existing entry with the same marker, or
/// appends it.
fn merge_or_add(patterns: &mut Vec<TemporalPattern>, new: TemporalPattern) {
    for existing in patterns.iter_mut() {
        if existing.pattern == new.pattern {
            existing.occurrences.extend(new.occurrences);
            for suggestion in new.suggestions {
                if !existing.suggestions.contains(&suggestion) {
                    existing.suggestions.push(suggestion);
                }
            }
            return;
        }
    }
    patterns.push(new);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes_with(lines: &[&str]) -> BTreeMap<String, Vec<String>> {
        let mut notes = BTreeMap::new();
        notes.insert(
            "general".to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        notes
    }

    #[test]
    fn test_marker_detected_with_suggestion() {
        let analyzer = TemporalAnalyzer::default();
        let patterns =
            analyzer.detect_patterns(&notes_with(&["Victor arrive avant Elodie au manoir"]));

        let marker = patterns.iter().find(|p| p.pattern == "avant").unwrap();
        assert_eq!(marker.occurrences.len(), 1);
        assert!(marker
            .suggestions
            .iter()
            .any(|s| s == "arrive -> précède -> Elodie"));
    }

    #[test]
    fn test_one_marker_per_line() {
        let analyzer = TemporalAnalyzer::default();
        // Contains both "avant" and "après"; only the first lexicon match
        // may report the line.
        let patterns =
            analyzer.detect_patterns(&notes_with(&["Jean part avant midi et revient après"]));

        let reporting: Vec<&TemporalPattern> = patterns
            .iter()
            .filter(|p| p.pattern == "avant" || p.pattern == "après")
            .collect();
        assert_eq!(reporting.len(), 1);
        assert_eq!(reporting[0].pattern, "avant");
    }

    #[test]
    fn test_relation_line_gets_canonical_rewrite() {
        let analyzer = TemporalAnalyzer::default();
        let patterns =
            analyzer.detect_patterns(&notes_with(&["Dîner -> avant -> Découverte"]));

        let marker = patterns.iter().find(|p| p.pattern == "avant").unwrap();
        assert!(marker
            .suggestions
            .contains(&"Dîner -> précède -> Découverte".to_string()));
    }

    #[test]
    fn test_clock_time_detected() {
        let analyzer = TemporalAnalyzer::default();
        let patterns = analyzer.detect_patterns(&notes_with(&["Victor sort à 21h30"]));

        let hour = patterns.iter().find(|p| p.pattern == "heure").unwrap();
        assert!(hour
            .suggestions
            .contains(&"Victor -> se passe à -> 21h30".to_string()));
    }

    #[test]
    fn test_same_marker_merged_across_notes() {
        let analyzer = TemporalAnalyzer::default();
        let patterns = analyzer.detect_patterns(&notes_with(&[
            "Jean part avant le dîner",
            "Marc arrive avant la nuit",
        ]));

        let marker = patterns.iter().find(|p| p.pattern == "avant").unwrap();
        assert_eq!(marker.occurrences.len(), 2);
    }

    #[test]
    fn test_custom_lexicon() {
        let lexicon = TemporalLexicon {
            markers: vec![("before".to_string(), "precedes".to_string())],
            stopwords: vec!["the".to_string()],
        };
        let analyzer = TemporalAnalyzer::new(lexicon);
        let patterns = analyzer.detect_patterns(&notes_with(&["Alice leaves before Bob"]));

        let marker = patterns.iter().find(|p| p.pattern == "before").unwrap();
        assert!(marker
            .suggestions
            .contains(&"leaves -> precedes -> Bob".to_string()));
    }

    #[test]
    fn test_no_markers_yields_empty() {
        let analyzer = TemporalAnalyzer::default();
        let patterns = analyzer.detect_patterns(&notes_with(&["Un fait sans chronologie"]));
        assert!(patterns.is_empty());
    }
}
