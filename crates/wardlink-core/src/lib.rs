pub mod alert;
pub mod error;
pub mod identity;
pub mod message;
pub mod task;
pub mod triage;

pub use alert::Alert;
pub use error::{CoreError, Result};
pub use identity::{Identity, PresenceStatus, PresenceSummary, StaffRole};
pub use message::Message;
pub use task::Task;
pub use triage::{Priority, VitalSigns, classify, code_priority};
