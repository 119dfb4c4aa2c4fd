//! Review event bus and notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ReviewEvent`]: the domain event envelope published by every
//!   workflow transition.
//! - [`delivery`]: outbound channels (SMTP email).
//! - [`AssignmentNotifier`]: background service turning assignment and
//!   reopen events into notices.

pub mod bus;
pub mod delivery;
pub mod notifier;

pub use bus::{EventBus, ReviewEvent, ReviewEventKind};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError, Notice};
pub use notifier::{AssignmentNotifier, Mailer};
