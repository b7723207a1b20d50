//! Semantic consistency checks.
//!
//! Five independent detectors, each appending its findings: temporal
//! cycles (error), contradictory relations (warning), inconsistent
//! equivalences, important orphans and disconnected groups (info).
//! The keyword tables are injected configuration with French defaults.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use trellis_core::{Edge, EdgeKind, GraphData, Node};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// The detector that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    TemporalCycle,
    ContradictoryRelations,
    InconsistentEquivalence,
    OrphanNode,
    DisconnectedGroup,
}

/// One detected inconsistency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inconsistency {
    #[serde(rename = "type")]
    pub kind: InconsistencyKind,
    pub description: String,
    pub nodes: Vec<String>,
    pub severity: Severity,
    pub suggestion: String,
}

/// Keyword tables driving the detectors.
#[derive(Debug, Clone)]
pub struct ConsistencyRules {
    /// Substrings marking a relation label as temporal ordering.
    pub temporal_keywords: Vec<String>,
    /// Antonym word pairs; a label pair matching one in either direction
    /// is contradictory.
    pub antonym_pairs: Vec<(String, String)>,
    /// Substrings marking a label as important.
    pub importance_keywords: Vec<String>,
}

impl Default for ConsistencyRules {
    fn default() -> Self {
        Self {
            temporal_keywords: ["précède", "avant", "puis", "ensuite"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            antonym_pairs: [
                ("cause", "empêche"),
                ("contient", "exclut"),
                ("précède", "suit"),
                ("identique", "différent"),
                ("ami", "ennemi"),
            ]
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect(),
            importance_keywords: ["principal", "important", "clé", "central", "critique", "essentiel"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Runs the consistency detectors over a snapshot.
pub struct ConsistencyChecker {
    rules: ConsistencyRules,
}

impl Default for ConsistencyChecker {
    fn default() -> Self {
        Self::new(ConsistencyRules::default())
    }
}

impl ConsistencyChecker {
    /// Creates a checker over the given rule tables.
    pub fn new(rules: ConsistencyRules) -> Self {
        Self { rules }
    }

    /// Runs every detector and concatenates the findings.
    pub fn check(&self, graph: &GraphData) -> Vec<Inconsistency> {
        let mut findings = Vec::new();
        findings.extend(self.detect_temporal_cycles(graph));
        findings.extend(self.detect_contradictory_relations(graph));
        findings.extend(self.detect_inconsistent_equivalences(graph));
        findings.extend(self.detect_important_orphans(graph));
        findings.extend(self.detect_disconnected_groups(graph));
        findings
    }

    /// Directed cycle detection restricted to temporally-labeled relation
    /// edges. Only the first cycle found is reported.
    fn detect_temporal_cycles(&self, graph: &GraphData) -> Vec<Inconsistency> {
        let mut temporal_edges: HashMap<&str, Vec<&Edge>> = HashMap::new();
        let mut starts: Vec<&str> = Vec::new();

        for edge in &graph.edges {
            if edge.kind != EdgeKind::Relation {
                continue;
            }
            let label = edge.label.to_lowercase();
            if self.rules.temporal_keywords.iter().any(|k| label.contains(k.as_str())) {
                if !temporal_edges.contains_key(edge.from.as_str()) {
                    starts.push(edge.from.as_str());
                }
                temporal_edges.entry(edge.from.as_str()).or_default().push(edge);
            }
        }

        let mut visited: HashSet<&str> = HashSet::new();
        for start in starts {
            if visited.contains(start) {
                continue;
            }
            if let Some(cycle) = find_cycle(start, &temporal_edges, &mut visited) {
                return vec![Inconsistency {
                    kind: InconsistencyKind::TemporalCycle,
                    description: format!("Boucle temporelle détectée : {}", cycle.join(" → ")),
                    nodes: cycle,
                    severity: Severity::Error,
                    suggestion: "Vérifiez l'ordre chronologique des événements. Un événement ne peut pas précéder et suivre le même élément.".to_string(),
                }];
            }
        }

        Vec::new()
    }

    /// Flags node pairs carrying antonym relation labels.
    fn detect_contradictory_relations(&self, graph: &GraphData) -> Vec<Inconsistency> {
        let mut relation_map: BTreeMap<&str, BTreeMap<&str, Vec<&str>>> = BTreeMap::new();
        for edge in &graph.edges {
            if edge.kind == EdgeKind::Relation {
                relation_map
                    .entry(edge.from.as_str())
                    .or_default()
                    .entry(edge.to.as_str())
                    .or_default()
                    .push(edge.label.as_str());
            }
        }

        let mut findings = Vec::new();
        for (from, targets) in &relation_map {
            for (to, labels) in targets {
                for i in 0..labels.len() {
                    for j in (i + 1)..labels.len() {
                        let l1 = labels[i].to_lowercase();
                        let l2 = labels[j].to_lowercase();

                        for (word1, word2) in &self.rules.antonym_pairs {
                            let clash = (l1.contains(word1.as_str()) && l2.contains(word2.as_str()))
                                || (l1.contains(word2.as_str()) && l2.contains(word1.as_str()));
                            if clash {
                                findings.push(Inconsistency {
                                    kind: InconsistencyKind::ContradictoryRelations,
                                    description: format!(
                                        "{} a des relations contradictoires avec {} : '{}' et '{}'",
                                        from, to, labels[i], labels[j]
                                    ),
                                    nodes: vec![from.to_string(), to.to_string()],
                                    severity: Severity::Warning,
                                    suggestion:
                                        "Clarifiez la nature de la relation entre ces éléments."
                                            .to_string(),
                                });
                            }
                        }
                    }
                }
            }
        }
        findings
    }

    /// Flags equivalence-class members whose outgoing relations diverge.
    fn detect_inconsistent_equivalences(&self, graph: &GraphData) -> Vec<Inconsistency> {
        // Incremental grouping: an equivalence edge joins the first group
        // containing either endpoint, else starts a new one.
        let mut groups: Vec<Vec<String>> = Vec::new();
        for edge in &graph.edges {
            if edge.kind != EdgeKind::Equivalence {
                continue;
            }
            let position = groups
                .iter()
                .position(|g| g.contains(&edge.from) || g.contains(&edge.to));
            match position {
                Some(i) => {
                    if !groups[i].contains(&edge.from) {
                        groups[i].push(edge.from.clone());
                    }
                    if !groups[i].contains(&edge.to) {
                        groups[i].push(edge.to.clone());
                    }
                }
                None => groups.push(vec![edge.from.clone(), edge.to.clone()]),
            }
        }

        let relations_of = |node: &str| -> HashSet<String> {
            graph
                .edges
                .iter()
                .filter(|e| e.kind == EdgeKind::Relation && e.from == node)
                .map(|e| format!("{}:{}", e.to, e.label))
                .collect()
        };

        let mut findings = Vec::new();
        for group in groups.iter().filter(|g| g.len() > 1) {
            let relation_sets: Vec<HashSet<String>> =
                group.iter().map(|n| relations_of(n)).collect();

            for i in 0..group.len() {
                for j in (i + 1)..group.len() {
                    let diff = relation_sets[i]
                        .symmetric_difference(&relation_sets[j])
                        .count();
                    if diff > 2 {
                        findings.push(Inconsistency {
                            kind: InconsistencyKind::InconsistentEquivalence,
                            description: format!(
                                "{} et {} sont marqués comme équivalents mais ont des relations très différentes",
                                group[i], group[j]
                            ),
                            nodes: vec![group[i].clone(), group[j].clone()],
                            severity: Severity::Info,
                            suggestion: "Vérifiez si ces éléments sont vraiment équivalents ou s'il s'agit d'une relation différente.".to_string(),
                        });
                    }
                }
            }
        }
        findings
    }

    /// Flags degree-0 nodes that look too important to leave unconnected.
    fn detect_important_orphans(&self, graph: &GraphData) -> Vec<Inconsistency> {
        let mut connected: HashSet<&str> = HashSet::new();
        for edge in &graph.edges {
            connected.insert(edge.from.as_str());
            connected.insert(edge.to.as_str());
        }

        graph
            .nodes
            .iter()
            .filter(|n| !connected.contains(n.id.as_str()))
            .filter(|n| self.is_likely_important(n))
            .map(|n| Inconsistency {
                kind: InconsistencyKind::OrphanNode,
                description: format!("'{}' semble important mais n'a aucune connexion", n.label),
                nodes: vec![n.id.clone()],
                severity: Severity::Info,
                suggestion:
                    "Considérez ajouter des relations pour connecter cet élément au reste du graphe."
                        .to_string(),
            })
            .collect()
    }

    /// Importance heuristic: capitalized label, a long label from a
    /// non-default context, or an importance keyword.
    fn is_likely_important(&self, node: &Node) -> bool {
        let label = &node.label;
        if label.chars().count() < 3 {
            return false;
        }
        if label.chars().next().is_some_and(|c| c.is_uppercase()) {
            return true;
        }
        if label.chars().count() > 10 && !node.context.is_empty() && node.context != "general" {
            return true;
        }

        let lower = label.to_lowercase();
        self.rules
            .importance_keywords
            .iter()
            .any(|k| lower.contains(k.as_str()))
    }

    /// Flags groups of more than three members with no relation between
    /// any pair of them.
    fn detect_disconnected_groups(&self, graph: &GraphData) -> Vec<Inconsistency> {
        let mut seen_parents: HashSet<&str> = HashSet::new();
        let mut findings = Vec::new();

        for edge in &graph.edges {
            if edge.kind != EdgeKind::Group || !seen_parents.insert(edge.from.as_str()) {
                continue;
            }

            let members: Vec<&str> = graph
                .edges
                .iter()
                .filter(|e| e.kind == EdgeKind::Group && e.from == edge.from)
                .map(|e| e.to.as_str())
                .collect();

            if members.len() <= 3 {
                continue;
            }

            let has_internal_relations = members.iter().any(|m1| {
                members.iter().any(|m2| {
                    m1 != m2
                        && graph.edges.iter().any(|e| {
                            (e.from == *m1 && e.to == *m2) || (e.from == *m2 && e.to == *m1)
                        })
                })
            });

            if !has_internal_relations {
                let mut nodes = vec![edge.from.clone()];
                nodes.extend(members.iter().map(|m| m.to_string()));
                findings.push(Inconsistency {
                    kind: InconsistencyKind::DisconnectedGroup,
                    description: format!(
                        "Le groupe '{}' contient des éléments sans relations entre eux",
                        edge.from
                    ),
                    nodes,
                    severity: Severity::Info,
                    suggestion:
                        "Les membres d'un groupe devraient avoir des relations ou propriétés communes."
                            .to_string(),
                });
            }
        }
        findings
    }
}

/// Iterative depth-first cycle search with an explicit stack.
///
/// Visit order matches the recursive formulation: neighbors are explored
/// in edge order, and a back edge onto the active path yields the cycle
/// from the re-entered node to the current one.
fn find_cycle<'a>(
    start: &'a str,
    edges_by_from: &HashMap<&'a str, Vec<&'a Edge>>,
    visited: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
    let mut path: Vec<&str> = vec![start];
    let mut on_path: HashSet<&str> = HashSet::from([start]);
    visited.insert(start);

    loop {
        let (node, next) = match stack.last_mut() {
            Some(frame) => {
                let current = (frame.0, frame.1);
                frame.1 += 1;
                current
            }
            None => return None,
        };

        let neighbors = edges_by_from.get(node).map(Vec::as_slice).unwrap_or(&[]);
        if next < neighbors.len() {
            let to = neighbors[next].to.as_str();

            if !visited.contains(to) {
                visited.insert(to);
                on_path.insert(to);
                path.push(to);
                stack.push((to, 0));
            } else if on_path.contains(to) {
                let entry = path.iter().position(|n| *n == to).expect("on active path");
                let mut cycle: Vec<String> = path[entry..].iter().map(|s| s.to_string()).collect();
                cycle.push(to.to_string());
                return Some(cycle);
            }
        } else {
            stack.pop();
            on_path.remove(node);
            path.pop();
        }
    }
}
