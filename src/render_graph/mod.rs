//! Render Graph System
//!
//! A declarative system for defining render passes as a directed acyclic graph (DAG).
//! Passes declare the attachments they read and write; the graph orders them,
//! groups their writes into frame buffers, shares backing storage between
//! attachments whose lifetimes don't overlap, and executes them every frame.

mod attachment;
pub mod compiler;
mod description;
mod graph;
mod pass;

pub use attachment::*;
pub use compiler::{
    AttachmentLifetime, CompiledGraph, FrameBufferGroup, GraphError, StorageSlot,
};
pub use description::*;
pub use graph::*;
pub use pass::*;
