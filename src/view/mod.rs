//! UI-side state.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ChatView`] | Owner of one chat screen's state |
//! | [`MessageLog`] | Append-only received messages |

/// Headless chat view.
pub mod chat;

/// Append-only message log.
pub mod log;

pub use chat::ChatView;
pub use log::MessageLog;
