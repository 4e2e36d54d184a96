//! Concrete clients for the task database and the calendar.

pub mod google;
pub mod notion;

pub use google::GoogleCalendar;
pub use notion::NotionClient;
