//! Exception exit code generation and conditional IR nodes for an
//! ahead-of-time compiler emitting C for a reference-counted runtime.

pub mod span;
pub mod diagnostics;
pub mod config;
pub mod analysis;
pub mod ir;
pub mod optimize;
pub mod codegen;

pub use config::RuntimeProfile;
pub use diagnostics::CompileError;
