//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! the canonical `Event`, the `ShardBackend` egress trait, the transport
//! acknowledgement and the service blueprint.
//! Business crates depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - `Event::date_time` is always UTC
//! - Stored documents carry millisecond precision

mod ack;
mod backend;
mod blueprint;
mod error;
mod event;
mod shard_name;

pub use ack::*;
pub use backend::*;
pub use blueprint::*;
pub use error::*;
pub use event::*;
pub use shard_name::ShardName;
