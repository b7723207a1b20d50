//! Timeline extraction from dated notes.
//!
//! Recognizes the structured form `DD/MM/YYYY HHhMM -> actor -> action`
//! and tags each event with a heuristic importance, color and icon.
//! Events sort by parsed datetime when available, else by encounter
//! order.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Heuristic weight of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

/// One extracted chronological event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub raw_description: String,
    pub context: String,
    pub order: usize,
    pub time: String,
    pub actor: String,
    pub action: String,
    pub summary: String,
    pub importance: Importance,
    pub color: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<NaiveDateTime>,
    pub is_absolute: bool,
}

fn event_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{2}/\d{2}/\d{4})\s+(\d{1,2}h\d{0,2})\s*->\s*([^->]+)\s*->\s*(.+)$")
            .unwrap()
    })
}

/// Extracts and sorts timeline events from a notes-by-context map.
pub fn timeline_events(notes: &BTreeMap<String, Vec<String>>) -> Vec<TimelineEvent> {
    let pattern = event_pattern();
    let mut events = Vec::new();
    let mut event_id = 0usize;

    for (context, list) in notes {
        for note in list {
            let note = note.trim();
            if note.is_empty() || note.contains("---") {
                continue;
            }

            let Some(caps) = pattern.captures(note) else {
                continue;
            };
            event_id += 1;

            let date_str = &caps[1];
            let time_str = caps[2].to_string();
            let actor = caps[3].trim().to_string();
            let action = caps[4].trim().to_string();

            let date_time = parse_date_time(date_str, &time_str);
            let (importance, color, icon) = style_event(&actor, &action);

            events.push(TimelineEvent {
                id: format!("event_{}", event_id),
                raw_description: note.to_string(),
                context: context.clone(),
                order: event_id,
                time: time_str,
                summary: format!("{} → {}", actor, action),
                actor,
                action,
                importance,
                color: color.to_string(),
                icon: icon.to_string(),
                is_absolute: date_time.is_some(),
                date_time,
            });
        }
    }

    events.sort_by(|a, b| match (&a.date_time, &b.date_time) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => a.order.cmp(&b.order),
    });

    events
}

/// Parses `DD/MM/YYYY` plus `HHhMM`, trying the full timestamp first
/// and falling back to the date alone at midnight.
fn parse_date_time(date: &str, time: &str) -> Option<NaiveDateTime> {
    let normalized = {
        let mut t = time.replacen('h', ":", 1);
        if t.ends_with(':') {
            t.push_str("00");
        }
        t
    };

    let combined = format!("{} {}", date, normalized);
    for format in ["%d/%m/%Y %H:%M", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&combined, format) {
            return Some(dt);
        }
    }

    for format in ["%d/%m/%Y", "%-d/%-m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(date, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Keyword styling, first match wins. The keyword set mirrors the
/// investigation vocabulary the notation was built for.
fn style_event(actor: &str, action: &str) -> (Importance, &'static str, &'static str) {
    let combined = format!("{} {}", actor.to_lowercase(), action.to_lowercase());
    let has = |words: &[&str]| words.iter().any(|w| combined.contains(w));

    if has(&["décès", "mort"]) {
        (Importance::High, "#ef4444", "💀")
    } else if has(&["découv", "corps"]) {
        (Importance::High, "#f97316", "🔍")
    } else if has(&["arrive", "visite"]) {
        (Importance::Medium, "#3b82f6", "📍")
    } else if has(&["quitte", "part"]) {
        (Importance::Medium, "#10b981", "🚪")
    } else if has(&["appel", "téléphone"]) {
        (Importance::Medium, "#6366f1", "📞")
    } else if has(&["police", "détective", "enquête"]) {
        (Importance::Medium, "#6366f1", "👮")
    } else if has(&["fenêtre", "ouvre"]) {
        (Importance::Medium, "#6366f1", "🪟")
    } else if has(&["thé", "boit"]) {
        (Importance::Medium, "#6366f1", "☕")
    } else {
        (Importance::Medium, "#6366f1", "📅")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes_with(lines: &[&str]) -> BTreeMap<String, Vec<String>> {
        let mut notes = BTreeMap::new();
        notes.insert(
            "Chronologie".to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        notes
    }

    #[test]
    fn test_structured_event_extracted() {
        let events = timeline_events(&notes_with(&[
            "12/03/2024 21h30 -> Victor -> quitte le salon",
        ]));

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.actor, "Victor");
        assert_eq!(event.action, "quitte le salon");
        assert_eq!(event.time, "21h30");
        assert!(event.is_absolute);

        let dt = event.date_time.unwrap();
        assert_eq!(
            dt,
            NaiveDate::from_ymd_opt(2024, 3, 12)
                .unwrap()
                .and_hms_opt(21, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_unstructured_notes_ignored() {
        let events = timeline_events(&notes_with(&[
            "Victor -> connaît -> Elodie",
            "une note libre",
            "--- séparateur ---",
        ]));
        assert!(events.is_empty());
    }

    #[test]
    fn test_events_sorted_by_datetime() {
        let events = timeline_events(&notes_with(&[
            "12/03/2024 22h00 -> Elodie -> arrive au manoir",
            "12/03/2024 09h15 -> Victor -> boit son thé",
        ]));

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].actor, "Victor");
        assert_eq!(events[1].actor, "Elodie");
    }

    #[test]
    fn test_hour_without_minutes() {
        let events = timeline_events(&notes_with(&[
            "12/03/2024 9h -> Victor -> ouvre la fenêtre",
        ]));

        let dt = events[0].date_time.unwrap();
        assert_eq!(
            dt,
            NaiveDate::from_ymd_opt(2024, 3, 12)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_keyword_styling() {
        let events = timeline_events(&notes_with(&[
            "12/03/2024 23h00 -> Inconnu -> découverte du corps",
            "12/03/2024 10h00 -> Victor -> appel téléphonique",
        ]));

        let discovery = events.iter().find(|e| e.actor == "Inconnu").unwrap();
        assert_eq!(discovery.importance, Importance::High);
        assert_eq!(discovery.icon, "🔍");

        let call = events.iter().find(|e| e.actor == "Victor").unwrap();
        assert_eq!(call.icon, "📞");
        assert_eq!(call.importance, Importance::Medium);
    }

    #[test]
    fn test_death_outranks_other_keywords() {
        let events = timeline_events(&notes_with(&[
            "12/03/2024 23h30 -> Victor -> mort découverte dans le bureau",
        ]));
        assert_eq!(events[0].icon, "💀");
        assert_eq!(events[0].importance, Importance::High);
    }

    #[test]
    fn test_empty_notes() {
        assert!(timeline_events(&BTreeMap::new()).is_empty());
    }
}
