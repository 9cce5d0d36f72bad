//! Frame-graph compilation and execution.
//!
//! A frame is declared as a set of passes and virtual textures
//! ([`graph::FrameGraphBuilder`]), compiled into a dependency-ordered
//! plan with transient-texture aliasing and explicit image barriers
//! ([`graph::FrameGraph`]), and replayed each frame against a backend
//! command buffer. The backend itself is external: [`backend`] only
//! defines the vocabulary (formats, layouts, stage and access flags)
//! and the traits the graph records through.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_crate_dependencies)]

pub mod backend;
pub mod color;
pub mod graph;
