//! Shader abstract syntax tree and stage reflection.
//!
//! The AST is the canonical in-memory representation of a shader module
//! for a C-like shading language with options, external resources and
//! per-stage entry points. Parsing and code generation both operate on
//! it; this crate owns the data model ([`ast`]), the traversal
//! machinery ([`ast::visit`]), constant folding ([`eval`]) and the
//! stage reflector ([`reflect`]) which reduces a module to the minimal
//! self-contained AST required by a single pipeline stage.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_crate_dependencies)]

pub mod ast;
pub mod eval;
pub mod reflect;
