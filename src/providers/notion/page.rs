//! Typed view of Notion pages and their conversion into task records.
//!
//! Notion returns every property as a tagged object whose payload key
//! matches its `type`. Properties are decoded one at a time so that a column
//! of an unexpected shape only loses that column, not the whole page.

use std::collections::HashMap;

use notion_gcal_core::task::{parse_weekday, ExplicitDate, Frequency, Priority, TaskRecord};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

// Notion property names (adjust if your database differs)
pub const TITLE_PROP: &str = "Name";
pub const DATE_PROP: &str = "Date";
pub const EVENT_ID_PROP: &str = "Google Event ID";
pub const DAYS_PROP: &str = "Day of the Week";
pub const TIME_SLOT_PROP: &str = "Time Slot";
pub const DURATION_PROP: &str = "Duration";
pub const PRIORITY_PROP: &str = "Priority";
pub const FREQUENCY_PROP: &str = "Frequency";

/// Response of `POST /v1/databases/{id}/query`.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<NotionPage>,
    #[serde(default)]
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotionPage {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

/// The property value types this tool reads.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title { title: Vec<RichText> },
    RichText { rich_text: Vec<RichText> },
    Date { date: Option<ExplicitDate> },
    MultiSelect { multi_select: Vec<SelectOption> },
    Select { select: Option<SelectOption> },
    Number { number: Option<f64> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct RichText {
    pub plain_text: Option<String>,
    pub text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

impl RichText {
    fn as_str(&self) -> &str {
        match (&self.plain_text, &self.text) {
            (Some(plain), _) if !plain.is_empty() => plain,
            (_, Some(text)) => &text.content,
            _ => "",
        }
    }
}

fn join_text(segments: &[RichText]) -> String {
    segments.iter().map(RichText::as_str).collect::<String>()
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl NotionPage {
    fn property(&self, name: &str) -> Option<PropertyValue> {
        let raw = self.properties.get(name)?;
        match serde_json::from_value(raw.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(page_id = %self.id, "Unreadable property '{}': {}", name, e);
                None
            }
        }
    }

    /// Title text, or an empty string when the title is missing.
    pub fn title(&self) -> String {
        match self.property(TITLE_PROP) {
            Some(PropertyValue::Title { title }) => join_text(&title).trim().to_string(),
            _ => String::new(),
        }
    }

    pub fn explicit_date(&self) -> Option<ExplicitDate> {
        match self.property(DATE_PROP)? {
            PropertyValue::Date { date } => date.filter(|d| !d.start.trim().is_empty()),
            _ => None,
        }
    }

    /// Event id previously written back, from a rich text or title column.
    pub fn linked_event_id(&self) -> Option<String> {
        match self.property(EVENT_ID_PROP)? {
            PropertyValue::RichText { rich_text } => non_empty(join_text(&rich_text)),
            PropertyValue::Title { title } => non_empty(join_text(&title)),
            _ => None,
        }
    }

    fn time_slot(&self) -> Option<String> {
        match self.property(TIME_SLOT_PROP)? {
            PropertyValue::RichText { rich_text } => non_empty(join_text(&rich_text)),
            _ => None,
        }
    }

    fn days_of_week(&self) -> Vec<chrono::Weekday> {
        let Some(PropertyValue::MultiSelect { multi_select }) = self.property(DAYS_PROP) else {
            return Vec::new();
        };

        let mut days = Vec::new();
        for option in &multi_select {
            match parse_weekday(&option.name) {
                Some(day) if !days.contains(&day) => days.push(day),
                Some(_) => {}
                None => warn!(page_id = %self.id, "Unknown day '{}', ignoring", option.name),
            }
        }
        days
    }

    fn duration_minutes(&self) -> Option<f64> {
        match self.property(DURATION_PROP)? {
            PropertyValue::Number { number } => number,
            _ => None,
        }
    }

    fn select_name(&self, name: &str) -> Option<String> {
        match self.property(name)? {
            PropertyValue::Select { select } => select.map(|s| s.name),
            _ => None,
        }
    }

    fn priority(&self) -> Option<Priority> {
        let label = self.select_name(PRIORITY_PROP)?;
        match label.parse() {
            Ok(priority) => Some(priority),
            Err(e) => {
                warn!(page_id = %self.id, "{}, no color applied", e);
                None
            }
        }
    }

    fn frequency(&self) -> Option<Frequency> {
        let label = self.select_name(FREQUENCY_PROP)?;
        match label.parse() {
            Ok(frequency) => Some(frequency),
            Err(e) => {
                warn!(page_id = %self.id, "{}, treating as Weekly", e);
                None
            }
        }
    }

    pub fn into_task_record(self) -> TaskRecord {
        TaskRecord {
            title: self.title(),
            explicit_date: self.explicit_date(),
            days_of_week: self.days_of_week(),
            time_slot: self.time_slot(),
            duration_minutes: self.duration_minutes(),
            priority: self.priority(),
            frequency: self.frequency(),
            linked_event_id: self.linked_event_id(),
            id: self.id,
        }
    }
}

/// `PATCH /v1/pages/{id}` body storing the calendar event id.
pub fn linked_event_id_update(event_id: &str) -> Value {
    json!({
        "properties": {
            EVENT_ID_PROP: {
                "rich_text": [{ "text": { "content": event_id } }]
            }
        }
    })
}
