//! Command implementations.

use colored::Colorize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use trellis_core::{NotationParser, ParsedNotes};
use trellis_graph::{
    density_metrics, generate_investigation_questions, timeline_events, ConsistencyChecker,
    NoteGraph, Priority, Severity,
};
use trellis_history::HistoryStore;
use trellis_server::{AppState, Oracle, ServerConfig, TrellisServer};

type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn load_notes(file: &Path) -> Result<ParsedNotes, Box<dyn std::error::Error + Send + Sync>> {
    let content = fs::read_to_string(file)?;
    Ok(NotationParser::new().parse(&content))
}

/// `trellis parse` — show contexts, notes and harvested subjects.
pub fn parse(file: &Path, json: bool) -> CommandResult {
    let parsed = load_notes(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    for (context, notes) in &parsed.notes {
        println!("{}", format!(":: {} ::", context).cyan().bold());
        for note in notes {
            println!("  {}", note);
        }
    }
    println!();
    println!(
        "{} {}",
        "subjects:".green().bold(),
        parsed.subjects.join(", ")
    );

    Ok(())
}

/// `trellis graph` — build and emit a graph snapshot.
pub fn graph(file: &Path, output: Option<&Path>) -> CommandResult {
    let parsed = load_notes(file)?;
    let graph = NotationParser::new().parse_to_graph(&parsed.notes);

    let json = serde_json::to_string_pretty(&graph)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            println!(
                "{} {} nodes, {} edges -> {}",
                "graph:".green().bold(),
                graph.nodes.len(),
                graph.edges.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// `trellis query` — substring search over node labels.
pub fn query(file: &Path, query: &str) -> CommandResult {
    let parsed = load_notes(file)?;
    let data = NotationParser::new().parse_to_graph(&parsed.notes);
    let graph = NoteGraph::from_graph_data(&data);

    let matches = graph.search(query);
    if matches.is_empty() {
        println!("no nodes match '{}'", query);
        return Ok(());
    }

    for node in matches {
        let neighbors = graph.neighbors(&node.id);
        println!(
            "{} {} ({} connections)",
            "•".cyan(),
            node.label.bold(),
            neighbors.len()
        );
        for (neighbor, edge) in neighbors {
            let label = if edge.label.is_empty() {
                edge.kind.to_string()
            } else {
                edge.label.clone()
            };
            println!("    {} {} {}", label.dimmed(), "→".dimmed(), neighbor.label);
        }
    }

    Ok(())
}

/// `trellis analyze` — consistency findings and investigation questions.
pub fn analyze(file: &Path, json: bool) -> CommandResult {
    let parsed = load_notes(file)?;
    let graph = NotationParser::new().parse_to_graph(&parsed.notes);

    let findings = ConsistencyChecker::default().check(&graph);
    let questions = generate_investigation_questions(&graph);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "inconsistencies": findings,
                "questions": questions,
            }))?
        );
        return Ok(());
    }

    println!("{}", "Inconsistencies".bold().underline());
    if findings.is_empty() {
        println!("  {}", "none found".green());
    }
    for finding in &findings {
        let severity = match finding.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".cyan(),
        };
        println!("  [{}] {}", severity, finding.description);
        println!("        {}", finding.suggestion.dimmed());
    }

    println!();
    println!("{}", "Questions".bold().underline());
    if questions.is_empty() {
        println!("  {}", "none generated".green());
    }
    for question in &questions {
        let priority = match question.priority {
            Priority::High => "high".red(),
            Priority::Medium => "medium".yellow(),
            Priority::Low => "low".dimmed(),
        };
        println!("  [{}] {}", priority, question.question);
        println!("        {}", question.hint.dimmed());
    }

    Ok(())
}

/// `trellis metrics` — the density metric report as JSON.
pub fn metrics(file: &Path) -> CommandResult {
    let parsed = load_notes(file)?;
    let graph = NotationParser::new().parse_to_graph(&parsed.notes);
    println!("{}", serde_json::to_string_pretty(&density_metrics(&graph))?);
    Ok(())
}

/// `trellis timeline` — chronological events from dated notes.
pub fn timeline(file: &Path) -> CommandResult {
    let parsed = load_notes(file)?;
    let events = timeline_events(&parsed.notes);

    if events.is_empty() {
        println!("no dated events found");
        return Ok(());
    }

    for event in &events {
        let stamp = event
            .date_time
            .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| event.time.clone());
        println!(
            "{} {} {} {} {}",
            event.icon,
            stamp.cyan(),
            event.actor.bold(),
            "→".dimmed(),
            event.action
        );
    }

    Ok(())
}

/// `trellis serve` — run the WebSocket server.
pub async fn serve(
    port: u16,
    history_file: &Path,
    oracle_url: &str,
    oracle_model: &str,
) -> CommandResult {
    let state = Arc::new(AppState {
        parser: NotationParser::new(),
        history: HistoryStore::open(history_file)?,
        oracle: Oracle::new(oracle_url, oracle_model),
    });

    let config = ServerConfig {
        addr: ([127, 0, 0, 1], port).into(),
    };

    println!(
        "{} ws://127.0.0.1:{}",
        "Trellis server listening on".green().bold(),
        port
    );

    TrellisServer::new(state, config).run().await
}
