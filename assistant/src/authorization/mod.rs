//! Group moderation authorization.
//!
//! [`AuthorizationCore`] decides which groups the operator may moderate and
//! is the only writer of the [`AuthorizationStore`]. Everything else reads
//! the decision through [`crate::gate::AccessGate`].

mod core;
mod error;
pub mod events;
pub mod refresher;
pub mod store;

pub use self::core::AuthorizationCore;
pub use error::AuthorizeError;
pub use events::{AuthorizationEvent, EventBus};
pub use refresher::{PredictiveRefresher, RefreshSettings, RefreshTargets};
pub use store::{AuthorizationStore, STORAGE_KEY};
