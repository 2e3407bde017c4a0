#![deny(unsafe_code)]
#![deny(clippy::all)]
#![deny(deprecated)]

//!
//! Fuzz-Objects is the object lifecycle registry of a kernel-interface fuzzer.
//!
//! Worker processes fire randomised system calls at the kernel. Every resource
//! such a call hands back (descriptors, mappings, futexes, System-V segments,
//! sockets) is recorded here, so that later calls can be fed existing objects
//! as arguments and so that a long campaign never exhausts system-wide limits.
//!
//! Objects live either in the campaign-wide global store or in a worker's
//! private local store. Local stores are pruned at random after insertions;
//! the global store is curated by the supervisor and emptied at shutdown.

// Module for shared identifiers (ObjectKind, Scope, ObjectId).
pub mod types;

// Module for the tracked Object and its payloads.
pub mod primitives;

// Re-export the Object types at the crate root.
pub use primitives::*;

// Module for the pluggable randomness helpers.
pub mod random;

// Module for registry error types.
pub mod error;

// Module for campaign configuration.
pub mod config;

// Module for registry heads, stores and the pruning engine.
pub mod registry;

// Module for the default OS destructors.
pub mod os;

// Module for the campaign-wide shared state.
pub mod campaign;

// Module for the worker control block.
pub mod worker;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use campaign::Campaign;
pub use config::{CampaignConfig, ObjectPolicy};
pub use error::RegistryError;
pub use registry::{Destructor, ObjectHead, ObjectStore};
pub use types::{ObjectId, ObjectKind, Scope, MAX_OBJECT_TYPES};
pub use worker::WorkerContext;
