//! Client for the external generative-text service.
//!
//! The service is a black box behind one call: given a prompt and an
//! optional output-format hint, return text. It is treated as
//! unreliable: transport failures, non-success statuses and malformed
//! structured output are all distinct errors surfaced to the caller,
//! never silently turned into empty results. Requests carry a bounded
//! timeout; there are no retries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use trellis_core::{EdgeKind, GraphData};

/// Default request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("generative service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generative service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generative service returned no extractable JSON")]
    MalformedJson,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Handle on the generative-text endpoint.
pub struct Oracle {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

impl Oracle {
    /// Creates a client for the given endpoint and model.
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            model: model.into(),
        }
    }

    /// Sends one prompt. `format` may be `""` (free text) or `"json"`,
    /// in which case the response must contain an extractable JSON span.
    pub async fn generate(&self, prompt: &str, format: &str) -> Result<String, OracleError> {
        debug!(url = %self.api_url, format, "generative request");

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
        };

        let response = self
            .client
            .post(&self.api_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Some deployments envelope the text, some return it raw.
        let text = match serde_json::from_str::<GenerateResponse>(&body) {
            Ok(parsed) => parsed.response,
            Err(_) => body,
        };

        if format == "json" && clean_json(&text).is_none() {
            return Err(OracleError::MalformedJson);
        }

        Ok(text)
    }

    /// Briefs the service on every edge as a fact list and asks for a
    /// situation summary.
    pub async fn analyze_graph(&self, graph: &GraphData) -> Result<String, OracleError> {
        let mut facts = String::from("Faits connus:\n");
        for edge in &graph.edges {
            match edge.kind {
                EdgeKind::Relation => {
                    facts.push_str(&format!("- {} {} {}.\n", edge.from, edge.label, edge.to))
                }
                EdgeKind::Equivalence => {
                    facts.push_str(&format!("- {} est équivalent à {}.\n", edge.from, edge.to))
                }
                EdgeKind::Group => facts.push_str(&format!(
                    "- Le groupe '{}' contient {}.\n",
                    edge.from, edge.to
                )),
            }
        }

        let prompt = format!(
            "Vous êtes un assistant d'enquête intelligent.\n\
             En vous basant uniquement sur les faits suivants, rédigez un résumé de la situation.\n\
             Quels sont les points clés, les principaux suspects et les pistes à explorer ?\n\
             Soyez concis et direct.\n\n{}",
            facts
        );

        self.generate(&prompt, "").await
    }

    /// Asks whether a discovered path reads as causal chain, correlation
    /// or contradiction.
    pub async fn analyze_path(
        &self,
        path: &[String],
        notes: &BTreeMap<String, Vec<String>>,
    ) -> Result<String, OracleError> {
        let story = trellis_core::build_path_story(path, notes);

        let prompt = format!(
            "Vous êtes un analyste sémantique.\n\
             La séquence de faits suivante représente un chemin logique découvert dans un graphe de connaissances :\n\
             {}\n\
             Analysez cette séquence et déterminez s'il s'agit principalement d'une chaîne causale,\n\
             d'une simple corrélation, ou si elle révèle une possible contradiction.\n\
             Justifiez votre réponse en une ou deux phrases.",
            story
        );

        self.generate(&prompt, "").await
    }

    /// Asks for an interpretation of a cluster partition.
    pub async fn analyze_clusters(
        &self,
        clusters: &BTreeMap<String, Vec<String>>,
        graph: &GraphData,
    ) -> Result<String, OracleError> {
        let mut prompt = String::from(
            "Analyse les clusters de nœuds suivants et leur signification dans le contexte du graphe global.\n\
             Sois concis et va droit au but. Explique ce que chaque cluster représente et comment ils sont liés les uns aux autres.\n\n",
        );

        for (name, nodes) in clusters {
            prompt.push_str(&format!("Cluster '{}':\n", name));
            for node in nodes {
                prompt.push_str(&format!("- {}\n", node));
            }
        }

        prompt.push_str("\nContexte du graphe global (relations):\n");
        for edge in &graph.edges {
            prompt.push_str(&format!("- {} {} {}\n", edge.from, edge.label, edge.to));
        }

        self.generate(&prompt, "").await
    }
}

/// Extracts the outermost JSON object or array span from free text.
pub fn clean_json(raw: &str) -> Option<&str> {
    let span = |open: char, close: char| {
        let start = raw.find(open)?;
        let end = raw.rfind(close)?;
        if start > end {
            return None;
        }
        Some(&raw[start..=end])
    };

    span('{', '}').or_else(|| span('[', ']'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_json_extracts_object() {
        let raw = "Voici la réponse :\n```json\n{\"a\": 1}\n```";
        assert_eq!(clean_json(raw), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_clean_json_extracts_array() {
        assert_eq!(clean_json("résultat: [1, 2, 3]."), Some("[1, 2, 3]"));
    }

    #[test]
    fn test_clean_json_rejects_plain_text() {
        assert_eq!(clean_json("pas de structure ici"), None);
        assert_eq!(clean_json("} inversé {"), None);
    }

    #[test]
    fn test_generate_request_omits_empty_format() {
        let request = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            format: "",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("format").is_none());

        let with_format = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            format: "json",
        };
        let json = serde_json::to_value(&with_format).unwrap();
        assert_eq!(json["format"], "json");
    }
}
