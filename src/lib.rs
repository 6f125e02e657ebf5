//! # ETS to JavaScript compiler core
//!
//! ## Pipeline
//!
//! `parse` → `decorators` → `build_method` → `codegen`, strictly in that order,
//! over one mutable tree per file. Batch compilation runs independent
//! pipelines on a worker pool and shares nothing but the read-only config.
//!
//! ## Output Invariants
//!
//! 1. **Create/Pop Pairing**: every `X.create(...)` has exactly one matching
//!    `X.pop()` at the same nesting level, with attribute calls and children
//!    strictly between them.
//!
//! 2. **Render Entry Point**: `build()` becomes `initialRender()` in partial
//!    update mode and `render()` otherwise, nothing else affects the name.
//!
//! 3. **Branch Identity**: reactive `If` emission always reports branch id 0
//!    for the then-arm and 1 for the else-arm, at every nesting depth.
//!
//! 4. **Reactive Scope**: `ForEach`/`If` runtime bookkeeping is emitted only
//!    inside component classes and never in pure JavaScript mode.
//!
//! 5. **Passthrough**: anything the recognizers do not understand is emitted
//!    as its original text.

pub mod ast;
pub mod batch;
pub mod build_method;
pub mod cache;
pub mod codegen;
mod control_flow;
pub mod config;
pub mod decorators;
pub mod discovery;
pub mod parse;
pub mod pipeline;
pub mod recognizer;
pub mod registry;
mod scan;
pub mod source_map;
pub mod transform;
pub mod validate;
pub mod visitor;


pub use ast::SourceFile;
pub use config::CompilerConfig;
pub use parse::{EtsParser, JsonAstParser, SourceParser};
pub use pipeline::{compile_ast, compile_source, CompileOutput};
pub use validate::*;
