//! Message channel module.
//!
//! The UI-facing side of the chat: configuration, the message type, and the
//! facade that hides reconnect churn.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MessageChannel`] | Submit / subscribe / dispose surface |
//! | [`MessageLink`] | Transport seam under the channel |
//! | [`ChannelConfig`] | Validated endpoint and reconnect policy |
//! | [`ChannelConfigBuilder`] | Fluent configuration builder |
//! | [`Message`] | Immutable chat text |
//!
//! # Example
//!
//! ```no_run
//! use resilient_chat::{ChannelConfig, MessageChannel, Result};
//!
//! # async fn example() -> Result<()> {
//! let config = ChannelConfig::from_env()?;
//! let channel = MessageChannel::initialize(&config);
//!
//! channel.subscribe(|message| println!("{message}"));
//! channel.submit("hello");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Channel configuration and builder.
pub mod builder;

/// Message channel facade.
pub mod facade;

/// Chat message type.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ChannelConfig, ChannelConfigBuilder, DEFAULT_ENDPOINT, ENDPOINT_ENV};
pub use facade::{MessageChannel, MessageLink};
pub use message::{Direction, Message};
