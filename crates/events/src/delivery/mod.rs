//! External delivery channels for review notifications.

pub mod email;
