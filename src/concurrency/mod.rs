//! Completion tokens and deferred disposal.
//!
//! The containers themselves are single-writer values with no internal
//! synchronization; this module only covers freeing memory after concurrent
//! readers are done with it.

pub mod deferred;
pub mod fence;

pub use deferred::{DisposeQueue, PendingDisposal};
pub use fence::{Completion, Fence, FenceGuard, Ready};
