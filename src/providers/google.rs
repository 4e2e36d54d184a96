//! Google Calendar client.
//!
//! Authorizes with an `authorized_user` credentials file (the format written
//! by `gcloud auth application-default login`): the stored refresh token is
//! exchanged for an access token once, when the client is created.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_calendar::types::{EventDateTime, SendUpdates};
use google_calendar::{Client, ClientError};
use notion_gcal_core::error::{SyncError, SyncResult};
use notion_gcal_core::event::{EventPayload, EventTime};
use notion_gcal_core::provider::CalendarService;
use serde::Deserialize;
use tracing::debug;

const REDIRECT_URI: &str = "http://localhost:8085/callback";

/// OAuth client credentials plus a long-lived refresh token.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl GoogleCredentials {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read Google credentials from {}", path.display()))?;

        let creds: GoogleCredentials = serde_json::from_str(&contents).with_context(|| {
            format!(
                "Failed to parse Google credentials from {}\n\
                Expected an authorized_user file with client_id, client_secret and refresh_token.",
                path.display()
            )
        })?;

        if let Some(kind) = creds.kind.as_deref() {
            if kind != "authorized_user" {
                anyhow::bail!(
                    "Unsupported Google credentials type '{}' in {} (expected authorized_user)",
                    kind,
                    path.display()
                );
            }
        }

        Ok(creds)
    }
}

pub struct GoogleCalendar {
    client: Client,
}

impl GoogleCalendar {
    /// Load credentials and obtain a fresh access token.
    pub async fn connect(credentials_path: &Path) -> Result<Self> {
        let creds = GoogleCredentials::load(credentials_path)?;

        let auth_client = Client::new(
            creds.client_id.clone(),
            creds.client_secret.clone(),
            REDIRECT_URI.to_string(),
            String::new(),
            creds.refresh_token.clone(),
        );

        let access_token = auth_client
            .refresh_access_token()
            .await
            .context("Failed to refresh Google access token")?;
        debug!(expires_in = access_token.expires_in, "Obtained Google access token");

        // Google usually omits the refresh token on refresh responses
        let refresh_token = if access_token.refresh_token.is_empty() {
            creds.refresh_token
        } else {
            access_token.refresh_token
        };

        Ok(GoogleCalendar {
            client: Client::new(
                creds.client_id,
                creds.client_secret,
                REDIRECT_URI.to_string(),
                access_token.access_token,
                refresh_token,
            ),
        })
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn create_event(&self, calendar_id: &str, event: &EventPayload) -> SyncResult<String> {
        let google_event = to_google_event(event);

        let response = self
            .client
            .events()
            .insert(
                calendar_id,
                0,
                0,
                false,
                SendUpdates::None,
                false,
                &google_event,
            )
            .await
            .map_err(|e| api_error(e, &format!("Failed to create event '{}'", event.summary)))?;

        Ok(response.body.id)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &EventPayload,
    ) -> SyncResult<String> {
        let google_event = to_google_event(event);

        let response = self
            .client
            .events()
            .update(
                calendar_id,
                event_id,
                0,
                0,
                false,
                SendUpdates::None,
                false,
                &google_event,
            )
            .await
            .map_err(|e| api_error(e, &format!("Failed to update event {}", event_id)))?;

        if response.body.id.is_empty() {
            Ok(event_id.to_string())
        } else {
            Ok(response.body.id)
        }
    }
}

/// Classify a Google API failure. Deleted events answer 404, or 410 once purged.
fn api_error(err: ClientError, context: &str) -> SyncError {
    let status = match &err {
        ClientError::HttpError { status, .. } => Some(status.as_u16()),
        _ => None,
    };
    classify_error(status, &err.to_string(), context)
}

fn classify_error(status: Option<u16>, message: &str, context: &str) -> SyncError {
    let not_found = match status {
        Some(code) => code == 404 || code == 410,
        None => message.contains("404 Not Found") || message.contains("410 Gone"),
    };

    if not_found {
        SyncError::NotFound(format!("{}: {}", context, message))
    } else {
        SyncError::Provider(format!("{}: {}", context, message))
    }
}

fn event_time_to_google(time: &EventTime) -> EventDateTime {
    match time {
        EventTime::Date(d) => EventDateTime {
            date: Some(*d),
            date_time: None,
            time_zone: String::new(),
        },
        EventTime::DateTime(dt) => EventDateTime {
            date: None,
            date_time: Some(dt.with_timezone(&chrono::Utc)),
            time_zone: dt.timezone().name().to_string(),
        },
    }
}

/// Convert an event description into a Google Calendar API event.
pub fn to_google_event(event: &EventPayload) -> google_calendar::types::Event {
    google_calendar::types::Event {
        summary: event.summary.clone(),
        start: Some(event_time_to_google(&event.start)),
        end: Some(event_time_to_google(&event.end)),
        color_id: event
            .color
            .map(|c| c.color_id().to_string())
            .unwrap_or_default(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::America::New_York;
    use notion_gcal_core::event::EventColor;

    #[test]
    fn timed_event_carries_zone_and_color() {
        let start = New_York.with_ymd_and_hms(2025, 3, 24, 6, 0, 0).unwrap();
        let event = EventPayload {
            summary: "Gym".to_string(),
            start: EventTime::DateTime(start),
            end: EventTime::DateTime(start + chrono::Duration::hours(1)),
            color: Some(EventColor::Tomato),
        };

        let google = to_google_event(&event);
        let google_start = google.start.unwrap();

        assert_eq!(google.summary, "Gym");
        assert_eq!(google.color_id, "11");
        assert_eq!(google_start.time_zone, "America/New_York");
        assert_eq!(
            google_start.date_time,
            Some(Utc.with_ymd_and_hms(2025, 3, 24, 10, 0, 0).unwrap())
        );
        assert!(google_start.date.is_none());
    }

    #[test]
    fn all_day_event_uses_dates_without_color() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let event = EventPayload {
            summary: "Trip".to_string(),
            start: EventTime::Date(day),
            end: EventTime::Date(day.succ_opt().unwrap()),
            color: None,
        };

        let google = to_google_event(&event);

        assert_eq!(google.start.unwrap().date, Some(day));
        assert_eq!(google.end.unwrap().date, day.succ_opt());
        assert!(google.color_id.is_empty());
    }

    #[test]
    fn classifies_missing_events_by_status() {
        assert!(classify_error(Some(404), "HTTP Error. Code: 404 Not Found", "update").is_not_found());
        assert!(classify_error(Some(410), "HTTP Error. Code: 410 Gone", "update").is_not_found());
        assert!(matches!(
            classify_error(Some(403), "HTTP Error. Code: 403 Forbidden", "update"),
            SyncError::Provider(_)
        ));
    }

    #[test]
    fn status_digits_in_message_body_are_not_not_found() {
        let err = classify_error(
            Some(400),
            "HTTP Error. Code: 400 Bad Request, message: event 404 has an invalid colorId 410",
            "update",
        );
        assert!(matches!(err, SyncError::Provider(_)));

        let err = classify_error(None, "error decoding response body: expected 404 items", "update");
        assert!(matches!(err, SyncError::Provider(_)));
        assert!(classify_error(None, "status 404 Not Found", "update").is_not_found());
    }
}
