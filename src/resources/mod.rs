//! Resource management
//!
//! CPU-side resources (buffers, textures, frame buffers, programs), the asset
//! store that owns them, and the catalogs that map them to backend identities.

mod assets;
mod buffer;
mod catalog;
mod frame_buffer;
mod material;
mod primitive;
mod program;
mod texture;

pub use assets::*;
pub use buffer::*;
pub use catalog::*;
pub use frame_buffer::*;
pub use material::*;
pub use primitive::*;
pub use program::*;
pub use texture::*;
