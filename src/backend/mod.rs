//! Backend abstraction layer
//!
//! Provides the low-level trait a GPU API binding implements, the types it
//! shares with the renderer, and a headless implementation used by tests and
//! tooling.

pub mod headless;
pub mod traits;
pub mod types;

pub use headless::*;
pub use traits::*;
pub use types::*;
