//! A runtime IoC container for wiring object graphs in Rust.
//!

pub use ravel_container::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use ravel_container::prelude::*;
}
