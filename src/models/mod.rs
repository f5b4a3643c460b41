//! Data models for harvested events.

mod document;
mod event;

pub use document::{render_document, FrontMatter, DATE_FORMAT};
pub use event::{EventRecord, EventRef};
