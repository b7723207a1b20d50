//! Investigation question generation.
//!
//! Turns structural gaps into prompts: orphans that look important,
//! nodes under-connected for their structural class, and disconnected
//! clusters that might hide a missing link.

use crate::adjacency::node_degree;
use crate::cluster::{find_orphans, identify_clusters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trellis_core::{GraphData, Node};

/// Question urgency; ordering is high first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// The structural gap a question points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Orphan,
    Pattern,
    MissingLink,
}

/// One generated investigation question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub priority: Priority,
    pub context: String,
    pub nodes: Vec<String>,
    pub hint: String,
}

/// Maximum questions returned per call.
const MAX_QUESTIONS: usize = 10;

/// Generates investigation questions, sorted by priority and capped.
pub fn generate_investigation_questions(graph: &GraphData) -> Vec<InvestigationQuestion> {
    let mut questions = Vec::new();

    // Orphans whose labels suggest they matter.
    for orphan in find_orphans(graph) {
        let importance = node_importance(&orphan, graph);
        if importance > 0.5 {
            questions.push(InvestigationQuestion {
                question: format!("Comment '{}' est-il lié aux autres éléments ?", orphan),
                kind: QuestionKind::Orphan,
                priority: priority_from_importance(importance),
                context: "Connexions manquantes".to_string(),
                nodes: vec![orphan],
                hint: "Cet élément semble isolé. Cherchez des relations possibles.".to_string(),
            });
        }
    }

    questions.extend(pattern_questions(graph));
    questions.extend(missing_link_questions(graph));

    questions.sort_by_key(|q| q.priority);
    questions.truncate(MAX_QUESTIONS);
    questions
}

/// Importance score of a node: 0.3 base, +0.3 capitalized label,
/// +0.2 label longer than ten characters, +0.2 non-default context.
fn node_importance(node_id: &str, graph: &GraphData) -> f64 {
    let node = graph
        .nodes
        .iter()
        .find(|n| n.id == node_id)
        .cloned()
        .unwrap_or_else(|| Node::new(node_id, ""));

    let mut importance = 0.3;
    if node.label.chars().next().is_some_and(|c| c.is_uppercase()) {
        importance += 0.3;
    }
    if node.label.chars().count() > 10 {
        importance += 0.2;
    }
    if !node.context.is_empty() && node.context != "general" {
        importance += 0.2;
    }
    importance
}

fn priority_from_importance(importance: f64) -> Priority {
    if importance > 0.7 {
        Priority::High
    } else if importance > 0.5 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Questions for nodes with less than half the average degree of their
/// structural class.
fn pattern_questions(graph: &GraphData) -> Vec<InvestigationQuestion> {
    let mut classified: BTreeMap<&'static str, Vec<&str>> = BTreeMap::new();
    for node in &graph.nodes {
        classified
            .entry(connection_pattern(&node.id, graph))
            .or_default()
            .push(node.id.as_str());
    }

    let mut questions = Vec::new();
    for nodes in classified.values() {
        if nodes.is_empty() {
            continue;
        }
        let average = nodes
            .iter()
            .map(|n| node_degree(graph, n))
            .sum::<usize>() as f64
            / nodes.len() as f64;

        for node in nodes {
            let connections = node_degree(graph, node);
            if (connections as f64) < average * 0.5 {
                questions.push(InvestigationQuestion {
                    question: format!(
                        "Pourquoi '{}' a-t-il moins de connexions que les autres éléments similaires ?",
                        node
                    ),
                    kind: QuestionKind::Pattern,
                    priority: Priority::Medium,
                    context: "Pattern incomplet".to_string(),
                    nodes: vec![node.to_string()],
                    hint: format!(
                        "Cet élément a {} connexions alors que la moyenne est {:.1}",
                        connections, average
                    ),
                });
            }
        }
    }
    questions
}

/// Classifies a node by its in/out-degree ratio.
///
/// Rule order is the contract: receiver, emitter, hub, isolated,
/// standard — first match wins.
fn connection_pattern(node_id: &str, graph: &GraphData) -> &'static str {
    let incoming = graph.edges.iter().filter(|e| e.to == node_id).count();
    let outgoing = graph.edges.iter().filter(|e| e.from == node_id).count();

    if incoming > outgoing * 2 {
        "receiver"
    } else if outgoing > incoming * 2 {
        "emitter"
    } else if incoming + outgoing > 5 {
        "hub"
    } else if incoming + outgoing == 0 {
        "isolated"
    } else {
        "standard"
    }
}

/// One question per pair of disconnected clusters of more than one node.
fn missing_link_questions(graph: &GraphData) -> Vec<InvestigationQuestion> {
    let sized: Vec<Vec<String>> = identify_clusters(graph)
        .into_iter()
        .filter(|c| c.len() > 1)
        .collect();

    let mut questions = Vec::new();
    for i in 0..sized.len() {
        for j in (i + 1)..sized.len() {
            let mut nodes = sized[i].clone();
            nodes.extend(sized[j].iter().cloned());
            questions.push(InvestigationQuestion {
                question: format!(
                    "Quelle connexion existe entre ces groupes : {} et {} ?",
                    sized[i][0], sized[j][0]
                ),
                kind: QuestionKind::MissingLink,
                priority: Priority::Medium,
                context: "Groupes isolés".to_string(),
                nodes,
                hint: "Ces éléments forment des groupes séparés qui pourraient être liés."
                    .to_string(),
            });
        }
    }
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Edge, EdgeKind};

    fn make_graph(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> GraphData {
        GraphData {
            nodes: nodes.iter().map(|(id, ctx)| Node::new(*id, *ctx)).collect(),
            edges: edges
                .iter()
                .map(|(a, b)| Edge::new(EdgeKind::Relation, *a, *b))
                .collect(),
            positions: None,
        }
    }

    #[test]
    fn test_important_orphan_generates_question() {
        // Capitalized + non-default context: 0.3 + 0.3 + 0.2 = 0.8 → high.
        let graph = make_graph(
            &[("Inspecteur", "Personnages"), ("a", "general"), ("b", "general")],
            &[("a", "b")],
        );
        let questions = generate_investigation_questions(&graph);

        let orphan = questions
            .iter()
            .find(|q| q.kind == QuestionKind::Orphan)
            .unwrap();
        assert_eq!(orphan.priority, Priority::High);
        assert_eq!(orphan.nodes, vec!["Inspecteur"]);
    }

    #[test]
    fn test_unimportant_orphan_skipped() {
        // Lowercase, short, default context: 0.3 only.
        let graph = make_graph(
            &[("truc", "general"), ("a", "general"), ("b", "general")],
            &[("a", "b")],
        );
        let questions = generate_investigation_questions(&graph);
        assert!(questions.iter().all(|q| q.kind != QuestionKind::Orphan));
    }

    #[test]
    fn test_missing_link_between_sized_clusters() {
        let graph = make_graph(
            &[
                ("a", "general"),
                ("b", "general"),
                ("c", "general"),
                ("d", "general"),
            ],
            &[("a", "b"), ("c", "d")],
        );
        let questions = generate_investigation_questions(&graph);

        let links: Vec<&InvestigationQuestion> = questions
            .iter()
            .filter(|q| q.kind == QuestionKind::MissingLink)
            .collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].nodes.len(), 4);
    }

    #[test]
    fn test_connection_pattern_rule_order() {
        let graph = make_graph(
            &[("sink", "general"), ("s1", "general"), ("s2", "general"), ("s3", "general")],
            &[("s1", "sink"), ("s2", "sink"), ("s3", "sink")],
        );
        // 3 incoming, 0 outgoing: receiver before anything else.
        assert_eq!(connection_pattern("sink", &graph), "receiver");
        assert_eq!(connection_pattern("s1", &graph), "emitter");
        assert_eq!(connection_pattern("ghost", &graph), "isolated");
    }

    #[test]
    fn test_sorted_by_priority_and_capped() {
        // Many two-node components make many medium missing-link pairs,
        // plus one high orphan that must come first.
        let mut nodes: Vec<(String, String)> = Vec::new();
        let mut edges = Vec::new();
        for i in 0..7 {
            let a = format!("a{}", i);
            let b = format!("b{}", i);
            edges.push((a.clone(), b.clone()));
            nodes.push((a, "general".to_string()));
            nodes.push((b, "general".to_string()));
        }
        let mut graph = GraphData {
            nodes: nodes
                .iter()
                .map(|(id, ctx)| Node::new(id.clone(), ctx.clone()))
                .collect(),
            edges: edges
                .iter()
                .map(|(a, b)| Edge::new(EdgeKind::Relation, a.clone(), b.clone()))
                .collect(),
            positions: None,
        };
        graph.nodes.push(Node::new("Personnage Important", "Enquête"));

        let questions = generate_investigation_questions(&graph);
        assert_eq!(questions.len(), MAX_QUESTIONS);
        assert_eq!(questions[0].priority, Priority::High);
        assert_eq!(questions[0].kind, QuestionKind::Orphan);
    }

    #[test]
    fn test_empty_graph_no_questions() {
        assert!(generate_investigation_questions(&GraphData::default()).is_empty());
    }
}
