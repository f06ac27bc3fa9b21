//! Update notification for store mutations.
//!
//! Every statement inserted into or removed from a store produces one
//! [`UpdateEvent`]. In-process code attaches listeners to the store's
//! [`UpdateBus`]; code on other threads can drain an [`UpdateStream`] instead.

/// Listener registry and fan-out.
pub mod bus;
/// Event and id types.
pub mod events;
/// Channel subscriber handle.
pub mod stream;

pub use bus::UpdateBus;
pub use events::{ListenerId, SubscriptionId, UpdateEvent, UpdateKind};
pub use stream::UpdateStream;
