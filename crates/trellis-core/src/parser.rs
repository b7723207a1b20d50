//! NotationParser - line-oriented N4L parsing.
//!
//! The parser walks notation text line by line, normalizing every
//! recognized form into one of three canonical shapes:
//!
//! - relation: `Subject -> label -> Object`
//! - equivalence: `A <-> B`
//! - group: `Parent => { child1; child2 }`
//!
//! Nothing is ever rejected: a line matching no form is stored as an
//! opaque note in the current context. A second pass
//! ([`NotationParser::parse_to_graph`]) turns the stored notes into a
//! [`GraphData`].

use crate::model::{is_noise_token, Edge, EdgeKind, GraphData, Node, ParsedNotes};
use crate::prose::extract_first_subject;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::trace;

/// Default context for lines appearing before any `:: name ::` header.
pub const DEFAULT_CONTEXT: &str = "general";

/// Parses N4L notation into notes-by-context maps and graph snapshots.
///
/// All patterns are compiled once at construction; the parser itself is
/// immutable and safe to share across threads.
pub struct NotationParser {
    context: Regex,
    relation: Regex,
    equivalence: Regex,
    group: Regex,
    parentheses: Regex,
    annotation: Regex,
    reference: Regex,
    alt_equivalence: Regex,
}

impl Default for NotationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NotationParser {
    /// Creates a parser with all patterns compiled.
    pub fn new() -> Self {
        Self {
            context: Regex::new(r"^:{2,}\s*(.*?)\s*:{2,}$").unwrap(),
            relation: Regex::new(r"^(.*) -> (.*) -> (.*)$").unwrap(),
            equivalence: Regex::new(r"^(.*) <-> (.*)$").unwrap(),
            group: Regex::new(r"^(.*) => \{(.*)\}$").unwrap(),
            parentheses: Regex::new(r"^([^()]+)\s*\(([^)]+)\)\s*(.+)$").unwrap(),
            annotation: Regex::new(r#">"([^"]+)""#).unwrap(),
            reference: Regex::new(r"\$(\w+)\.(\d+)").unwrap(),
            alt_equivalence: Regex::new(r"^(.+?)\s*\(=\)\s*(.+)$").unwrap(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Text → notes
    // ─────────────────────────────────────────────────────────────────────

    /// Parses raw notation text into subjects and notes-by-context.
    ///
    /// Line forms are tried in a fixed precedence order; see the module
    /// docs. `lastSubject` continuation (`"` in subject position) and
    /// `$goal.N` / `$PREV.N` references resolve against the most recent
    /// successfully parsed subject.
    pub fn parse(&self, content: &str) -> ParsedNotes {
        let mut notes: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut subjects: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current_context = DEFAULT_CONTEXT.to_string();
        let mut last_subject = String::new();

        let mut collect = |subject: &str, subjects: &mut Vec<String>, seen: &mut HashSet<String>| {
            if !is_noise_token(subject) && seen.insert(subject.to_string()) {
                subjects.push(subject.to_string());
            }
        };

        for raw in content.lines() {
            let line = raw.trim();

            // Blank lines, comments and block delimiters are structural noise.
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("+::")
                || line.starts_with("-::")
            {
                continue;
            }

            // Context headers. Reserved sequence names do not switch context;
            // their lines fall through to the previous one.
            if let Some(caps) = self.context.captures(line) {
                let name = caps[1].trim();
                if name != "_sequence_" && name != "sequence" {
                    current_context = name.to_string();
                    notes.entry(current_context.clone()).or_default();
                }
                continue;
            }

            let (cleaned, extracted) = self.clean_annotations(line);
            for subject in &extracted {
                collect(subject, &mut subjects, &mut seen);
            }

            let cleaned = self.resolve_references(&cleaned, &last_subject);

            let current_notes = notes.entry(current_context.clone()).or_default();
            if let Some((note, subs)) =
                self.parse_parentheses_syntax(&cleaned, &last_subject, current_notes)
            {
                trace!(context = %current_context, "normalized parenthetical line");
                current_notes.push(note);
                if let Some(first) = subs.first() {
                    last_subject = first.clone();
                }
                for s in &subs {
                    collect(s, &mut subjects, &mut seen);
                }
                continue;
            }

            if let Some((note, subs)) = self.parse_standard_syntax(&cleaned) {
                current_notes.push(note);
                if let Some(first) = subs.first() {
                    last_subject = first.clone();
                }
                for s in &subs {
                    collect(s, &mut subjects, &mut seen);
                }
                continue;
            }

            // Unstructured line: harvest capitalized words as subject
            // candidates and keep the line verbatim.
            if !cleaned.is_empty() && !cleaned.starts_with("::") {
                for word in cleaned.split_whitespace() {
                    let word = word.trim_matches(|c| "\"'.,;:!?".contains(c));
                    if word.chars().count() > 2
                        && word.chars().next().is_some_and(|c| c.is_uppercase())
                    {
                        collect(word, &mut subjects, &mut seen);
                    }
                }
                notes
                    .entry(current_context.clone())
                    .or_default()
                    .push(cleaned);
            }
        }

        ParsedNotes { subjects, notes }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notes → graph
    // ─────────────────────────────────────────────────────────────────────

    /// Converts a notes-by-context map into a graph snapshot.
    ///
    /// Only structured notes contribute nodes and edges; an opaque note
    /// yields nothing. A token mentioned from several contexts keeps the
    /// context of the last edge that touched it.
    pub fn parse_to_graph(&self, notes: &BTreeMap<String, Vec<String>>) -> GraphData {
        let mut edges: Vec<Edge> = Vec::new();
        let mut node_order: Vec<String> = Vec::new();
        let mut node_context: HashMap<String, String> = HashMap::new();

        for (context, list) in notes {
            for note in list {
                let (cleaned, _) = self.clean_annotations(note);
                if let Some((note_edges, tokens)) = self.note_to_edges(&cleaned, context) {
                    edges.extend(note_edges);
                    for token in tokens {
                        if !node_context.contains_key(&token) {
                            node_order.push(token.clone());
                        }
                        node_context.insert(token, context.clone());
                    }
                }
            }
        }

        let nodes = node_order
            .into_iter()
            .filter(|id| !is_noise_token(id))
            .map(|id| {
                let context = node_context.get(&id).cloned().unwrap_or_default();
                Node::new(id, context)
            })
            .collect();

        GraphData {
            nodes,
            edges,
            positions: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Line forms
    // ─────────────────────────────────────────────────────────────────────

    /// Replaces `>"text"` annotations with their inner text, collecting
    /// each inner text as a subject.
    fn clean_annotations(&self, line: &str) -> (String, Vec<String>) {
        let mut cleaned = line.to_string();
        let mut subjects = Vec::new();

        for caps in self.annotation.captures_iter(line) {
            let concept = caps[1].to_string();
            cleaned = cleaned.replace(&caps[0], &concept);
            subjects.push(concept);
        }

        (cleaned, subjects)
    }

    /// Substitutes `$goal.N` / `$PREV.N` references with the last subject,
    /// or a `[REF:name]` placeholder when none is established yet.
    fn resolve_references(&self, line: &str, last_subject: &str) -> String {
        let mut resolved = line.to_string();
        for caps in self.reference.captures_iter(line) {
            let name = &caps[1];
            if name == "goal" || name == "PREV" {
                let replacement = if last_subject.is_empty() {
                    format!("[REF:{}]", name)
                } else {
                    last_subject.to_string()
                };
                resolved = resolved.replace(&caps[0], &replacement);
            }
        }
        resolved
    }

    /// Normalizes `Subject (relation) Object` into arrow form and
    /// `A (=) B` into `A <-> B`.
    ///
    /// An empty or bare-quote subject position is a continuation: it is
    /// filled from the last subject, falling back to the first token of
    /// the most recent note in the current context.
    fn parse_parentheses_syntax(
        &self,
        line: &str,
        last_subject: &str,
        current_notes: &[String],
    ) -> Option<(String, Vec<String>)> {
        if let Some(caps) = self.parentheses.captures(line) {
            let mut source = caps[1].trim().to_string();
            let relation = caps[2].trim().to_string();
            let target = caps[3].trim().to_string();

            // `(=)` is the alternate equivalence form, not a relation.
            if relation != "=" {
                if source == "\"\"" || source == "\"" || source.is_empty() {
                    if !last_subject.is_empty() {
                        source = last_subject.to_string();
                    } else if let Some(previous) = current_notes.last() {
                        source = extract_first_subject(previous);
                    }
                }

                if !source.is_empty() && source != "\"\"" && !target.is_empty() {
                    let source = source.trim_matches('"').to_string();
                    let target = target.trim_matches('"').to_string();
                    let note = format!("{} -> {} -> {}", source, relation, target);
                    return Some((note, vec![source, target]));
                }
                return None;
            }
        }

        if let Some(caps) = self.alt_equivalence.captures(line) {
            let source = caps[1].trim().trim_matches('"').to_string();
            let target = caps[2].trim().trim_matches('"').to_string();

            if !source.is_empty() && !target.is_empty() {
                let note = format!("{} <-> {}", source, target);
                return Some((note, vec![source, target]));
            }
        }

        None
    }

    /// Accepts already-normalized arrow, equivalence and group lines.
    fn parse_standard_syntax(&self, line: &str) -> Option<(String, Vec<String>)> {
        if let Some(caps) = self.relation.captures(line) {
            let source = caps[1].trim().to_string();
            let target = caps[3].trim().to_string();
            return Some((line.to_string(), vec![source, target]));
        }

        if let Some(caps) = self.equivalence.captures(line) {
            let source = caps[1].trim().to_string();
            let target = caps[2].trim().to_string();
            return Some((line.to_string(), vec![source, target]));
        }

        if let Some(caps) = self.group.captures(line) {
            let parent = caps[1].trim().to_string();
            let mut subjects = vec![parent];
            for child in caps[2].split(';') {
                let child = child.trim().trim_matches('"');
                if !child.is_empty() {
                    subjects.push(child.to_string());
                }
            }
            return Some((line.to_string(), subjects));
        }

        None
    }

    /// Classifies one stored note into edges plus the tokens it mentions.
    fn note_to_edges(&self, note: &str, context: &str) -> Option<(Vec<Edge>, Vec<String>)> {
        if let Some(caps) = self.relation.captures(note) {
            let source = strip_reference(caps[1].trim());
            let label = caps[2].trim().to_string();
            let target = strip_reference(caps[3].trim());

            if !source.is_empty() && !target.is_empty() {
                let edge = Edge::new(EdgeKind::Relation, source.clone(), target.clone())
                    .with_label(label)
                    .with_context(context);
                return Some((vec![edge], vec![source, target]));
            }
            return None;
        }

        if let Some(caps) = self.equivalence.captures(note) {
            let source = caps[1].trim().to_string();
            let target = caps[2].trim().to_string();
            if !source.is_empty() && !target.is_empty() {
                let edge = Edge::new(EdgeKind::Equivalence, source.clone(), target.clone())
                    .with_context(context);
                return Some((vec![edge], vec![source, target]));
            }
            return None;
        }

        if let Some(caps) = self.group.captures(note) {
            let parent = caps[1].trim().to_string();
            if parent.is_empty() {
                return None;
            }

            let mut tokens = vec![parent.clone()];
            let mut edges = Vec::new();
            for child in caps[2].split(';') {
                let child = child.trim().trim_matches('"');
                if child.is_empty() {
                    continue;
                }
                edges.push(
                    Edge::new(EdgeKind::Group, parent.clone(), child)
                        .with_label("contient")
                        .with_context(context),
                );
                tokens.push(child.to_string());
            }
            if !edges.is_empty() {
                return Some((edges, tokens));
            }
            return None;
        }

        None
    }
}

/// Strips a leftover `[REF:name]` wrapper down to the bare name.
///
/// Unresolved references become literal node identities; this is a
/// documented quirk, not a resolution.
fn strip_reference(token: &str) -> String {
    token
        .strip_suffix(']')
        .unwrap_or(token)
        .strip_prefix("[REF:")
        .unwrap_or(token)
        .to_string()
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parenthetical_relation_normalized() {
        let parser = NotationParser::new();
        let parsed = parser.parse("Victor (âge) 67 ans\n");

        let general = &parsed.notes[DEFAULT_CONTEXT];
        assert_eq!(general, &vec!["Victor -> âge -> 67 ans".to_string()]);
        assert!(parsed.subjects.contains(&"Victor".to_string()));
        assert!(parsed.subjects.contains(&"67 ans".to_string()));
    }

    #[test]
    fn test_parenthetical_relation_to_graph() {
        let parser = NotationParser::new();
        let parsed = parser.parse("Victor (âge) 67 ans\n");
        let graph = parser.parse_to_graph(&parsed.notes);

        assert_eq!(graph.nodes.len(), 2);
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&"Victor"));
        assert!(ids.contains(&"67 ans"));

        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!(edge.from, "Victor");
        assert_eq!(edge.to, "67 ans");
        assert_eq!(edge.label, "âge");
        assert_eq!(edge.kind, EdgeKind::Relation);
    }

    #[test]
    fn test_group_note_emits_edge_per_child() {
        let parser = NotationParser::new();
        let parsed = parser.parse("Suspects => { Jean; Elodie }\n");
        let graph = parser.parse_to_graph(&parsed.notes);

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        for edge in &graph.edges {
            assert_eq!(edge.from, "Suspects");
            assert_eq!(edge.kind, EdgeKind::Group);
            assert_eq!(edge.label, "contient");
        }
        let targets: Vec<&str> = graph.edges.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(targets, vec!["Jean", "Elodie"]);
    }

    #[test]
    fn test_arrow_relation_round_trip() {
        let parser = NotationParser::new();
        let parsed = parser.parse("Jean -> connaît -> Elodie\n");
        let graph = parser.parse_to_graph(&parsed.notes);

        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!(
            (edge.from.as_str(), edge.label.as_str(), edge.to.as_str()),
            ("Jean", "connaît", "Elodie")
        );
    }

    #[test]
    fn test_context_switching() {
        let parser = NotationParser::new();
        let input = ":: Personnages ::\nJean -> habite -> Paris\n:: Lieux ::\nParis -> contient -> Louvre\n";
        let parsed = parser.parse(input);

        assert_eq!(parsed.notes["Personnages"].len(), 1);
        assert_eq!(parsed.notes["Lieux"].len(), 1);
    }

    #[test]
    fn test_sequence_context_not_switched() {
        let parser = NotationParser::new();
        let input = ":: Faits ::\n:: _sequence_ ::\nA -> puis -> B\n";
        let parsed = parser.parse(input);

        // The reserved header leaves lines in the previous context.
        assert_eq!(parsed.notes["Faits"].len(), 1);
        assert!(!parsed.notes.contains_key("_sequence_"));
    }

    #[test]
    fn test_comments_and_delimiters_skipped() {
        let parser = NotationParser::new();
        let parsed = parser.parse("# commentaire\n+::\n-::\n\nA -> lie -> B\n");

        assert_eq!(parsed.notes[DEFAULT_CONTEXT].len(), 1);
    }

    #[test]
    fn test_continuation_quote_inherits_subject() {
        let parser = NotationParser::new();
        let input = "Victor (âge) 67 ans\n\" (habite) Manoir\n";
        let parsed = parser.parse(input);

        let general = &parsed.notes[DEFAULT_CONTEXT];
        assert_eq!(general[1], "Victor -> habite -> Manoir");
    }

    #[test]
    fn test_alternate_equivalence() {
        let parser = NotationParser::new();
        let parsed = parser.parse("Le majordome (=) James\n");

        assert_eq!(parsed.notes[DEFAULT_CONTEXT][0], "Le majordome <-> James");

        let graph = parser.parse_to_graph(&parsed.notes);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].kind, EdgeKind::Equivalence);
        assert!(graph.edges[0].label.is_empty());
    }

    #[test]
    fn test_reference_resolution() {
        let parser = NotationParser::new();
        let input = "Victor (possède) Manoir\n$PREV.1 -> connaît -> Jean\n";
        let parsed = parser.parse(input);

        assert_eq!(
            parsed.notes[DEFAULT_CONTEXT][1],
            "Victor -> connaît -> Jean"
        );
    }

    #[test]
    fn test_unresolved_reference_becomes_placeholder_then_bare_name() {
        let parser = NotationParser::new();
        let parsed = parser.parse("$goal.1 -> demande -> aide\n");

        assert_eq!(
            parsed.notes[DEFAULT_CONTEXT][0],
            "[REF:goal] -> demande -> aide"
        );

        let graph = parser.parse_to_graph(&parsed.notes);
        assert!(graph.nodes.iter().any(|n| n.id == "goal"));
    }

    #[test]
    fn test_annotation_collected_and_inlined() {
        let parser = NotationParser::new();
        let parsed = parser.parse(">\"Indice clé\" -> trouve -> Jean\n");

        assert!(parsed.subjects.contains(&"Indice clé".to_string()));
        assert_eq!(parsed.notes[DEFAULT_CONTEXT][0], "Indice clé -> trouve -> Jean");
    }

    #[test]
    fn test_opaque_line_harvests_capitalized_words() {
        let parser = NotationParser::new();
        let parsed = parser.parse("Victor rencontre Elodie au manoir\n");

        assert!(parsed.subjects.contains(&"Victor".to_string()));
        assert!(parsed.subjects.contains(&"Elodie".to_string()));
        // Short or lowercase words are not subjects.
        assert!(!parsed.subjects.contains(&"au".to_string()));
        assert!(!parsed.subjects.contains(&"manoir".to_string()));
        // The line itself is stored verbatim.
        assert_eq!(parsed.notes[DEFAULT_CONTEXT].len(), 1);
    }

    #[test]
    fn test_opaque_note_contributes_no_graph_elements() {
        let parser = NotationParser::new();
        let parsed = parser.parse("Victor rencontre Elodie au manoir\n");
        let graph = parser.parse_to_graph(&parsed.notes);

        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_empty_input_yields_empty_structures() {
        let parser = NotationParser::new();
        let parsed = parser.parse("");

        assert!(parsed.subjects.is_empty());
        assert!(parsed.notes.is_empty());

        let graph = parser.parse_to_graph(&parsed.notes);
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_later_context_overwrites_node_context() {
        let parser = NotationParser::new();
        let input = ":: Alpha ::\nX -> lie -> Y\n:: Beta ::\nX -> lie -> Z\n";
        let parsed = parser.parse(input);
        let graph = parser.parse_to_graph(&parsed.notes);

        let x = graph.nodes.iter().find(|n| n.id == "X").unwrap();
        // Contexts iterate in lexicographic order; Beta mentions X last.
        assert_eq!(x.context, "Beta");
    }
}
