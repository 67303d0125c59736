//! Alerting for wxalert
//!
//! Rule evaluation over weather readings and best-effort notification delivery.

mod evaluator;
mod notifier;

pub use evaluator::{AlertEngine, TriggerCatalog};
pub use notifier::{render_email_body, render_subject, NotificationResult, NotificationSender};
