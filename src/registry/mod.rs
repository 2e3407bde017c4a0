pub mod head;
pub mod prune;
pub mod store;


// Re-export the primary types so callers can use `crate::registry::*` paths.
pub use head::{Destructor, ObjectHead};
pub use prune::{prune_kind, prune_objects};
pub use store::ObjectStore;
