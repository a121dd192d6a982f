//! `headsync-middleware` – Event routing.
//!
//! Moves frame reports, aim updates, prop events and alerts between the
//! reconciler, gameplay props and whatever is watching (the CLI, a debug
//! overlay, a recorder) without any of them knowing about each other.
//!
//! # Modules
//!
//! - [`bus`] – Topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
