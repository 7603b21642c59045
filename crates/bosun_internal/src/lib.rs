//! # Bosun Internal Library
//!
//! Re-exports the core Bosun crates for convenience.

/// Layer 1: service, hook, and pipeline primitives.
pub use bosun_system;

/// Layer 2: built-in lifecycle hooks.
pub use bosun_hooks;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use bosun_hooks::prelude::*;
    pub use bosun_system::prelude::*;
}
