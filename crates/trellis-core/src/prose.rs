//! Free-text helpers shared by the parser and the analysis surfaces.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn relation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*) -> (.*) -> (.*)$").unwrap())
}

fn group_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*) => \{(.*)\}$").unwrap())
}

/// Extracts the first plausible subject token of a note: the first
/// whitespace-delimited word longer than two characters that is not an
/// arrow, quotes trimmed.
pub fn extract_first_subject(note: &str) -> String {
    for part in note.split_whitespace() {
        let part = part.trim_matches(|c| c == '"' || c == '\'');
        if part.chars().count() > 2 && !part.contains("->") && !part.contains("<->") {
            return part.to_string();
        }
    }
    String::new()
}

/// Splits raw prose into sentences on `.`, `!` and `?`.
pub fn extract_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Renders the notes backing each consecutive pair of a path as a
/// numbered fact list, for briefing the generative service.
///
/// For every hop the first relation or group note connecting the two
/// endpoints (in either direction) is used; hops with no backing note
/// are skipped.
pub fn build_path_story(path: &[String], notes: &BTreeMap<String, Vec<String>>) -> String {
    let relation = relation_pattern();
    let group = group_pattern();
    let mut story = String::new();

    for (i, pair) in path.windows(2).enumerate() {
        let (from, to) = (&pair[0], &pair[1]);
        let mut found = false;

        'contexts: for list in notes.values() {
            for note in list {
                if let Some(caps) = relation.captures(note) {
                    let source = caps[1].trim();
                    let target = caps[3].trim();
                    if (source == from && target == to) || (source == to && target == from) {
                        story.push_str(&format!("Fait {}: {}.\n", i + 1, note));
                        found = true;
                    }
                } else if let Some(caps) = group.captures(note) {
                    let parent = caps[1].trim();
                    for child in caps[2].split(';') {
                        let child = child.trim();
                        if (parent == from && child == to) || (parent == to && child == from) {
                            story.push_str(&format!("Fait {}: {}.\n", i + 1, note));
                            found = true;
                            break;
                        }
                    }
                }
                if found {
                    break 'contexts;
                }
            }
        }
    }

    story
}
