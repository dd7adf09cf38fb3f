//! Paper editor state engine.
//!
//! The [`EditorEngine`] owns the paper being edited together with its undo
//! history, dirty flag and auto-save timer, and persists it through a
//! [`PersistenceGateway`]. [`HttpGateway`] is the REST implementation.

pub mod autosave;
pub mod change;
pub mod clock;
pub mod config;
mod engine;
pub mod error;
mod gateway;
mod http_gateway;
pub mod history;
pub mod validation;

pub use change::{PaperChange, PaperPatch};
pub use clock::{Clock, SystemClock};
pub use config::EditorConfig;
pub use engine::{EditorEngine, EditorEvent};
pub use error::EditorError;
pub use gateway::{AssignmentGateway, PersistenceGateway};
pub use http_gateway::HttpGateway;
pub use validation::{has_errors, validate, Severity, ValidationIssue};
