//! Shared and weak pointers over a detached control block.
//!
//! `Shared<T>` owns a heap allocation together with every other `Shared` on
//! the same object; the object is dropped exactly when the last of them goes
//! away. `Weak<T>` observes the object without keeping it alive, can tell
//! when it has been dropped, and can `lock` it back into a `Shared` while it
//! is still alive.
//!
//! The strong and weak counts live in a control block allocated next to the
//! object. Each block is registered with a `Registry`, a tracking context
//! that serves as a leak safety net and inspection point; every thread has a
//! default one, and the `_in` constructors take an explicit one.
//!
//! `Unique<T>` is the move-only single owner, the safe way to hand an
//! allocation over to shared ownership.
//!
//! Caveat: everything here is single-threaded. The counts are plain cells
//! and the handle types are neither `Send` nor `Sync`.
//!
//! ```
//! use sharedref::Shared;
//!
//! let a = Shared::new(String::from("hello"));
//! let w = a.downgrade();
//! assert_eq!(w.lock().use_count(), 2);
//! drop(a);
//! assert!(w.expired());
//! ```

pub mod axioms;
pub(crate) mod control;
pub mod error;
pub mod length;
pub mod pointers;
pub mod registry;
pub mod stats;
pub mod unique;

pub use axioms::Axioms;
pub use control::BlockId;
pub use error::AllocError;
pub use length::Length;
pub use pointers::{Shared, Weak};
pub use registry::Registry;
#[cfg(feature = "global")]
pub use stats::global_stats;
pub use stats::Stats;
pub use unique::Unique;
