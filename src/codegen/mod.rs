//! C text emission for the exception paths of compiled functions.
//!
//! Every emitter takes the enclosing function's [`CodeBuffer`] and the
//! per-scope [`CodeGenContext`], appends fragments, and returns nothing.

pub mod constants;
pub mod context;
pub mod errors;
pub mod release;
mod templates;
pub mod values;

pub use context::{CodeGenContext, ExceptionSlots};
pub use errors::{
    emit_error_exit, emit_error_exit_bool, emit_error_format_exit_bool, emit_local_variable_reference_error,
    emit_name_reference_error, ErrorExit, ExceptionMessage,
};
pub use values::{CType, Ownership, TempName};

/// Ordered text fragments making up a function body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CodeBuffer {
    fragments: Vec<String>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The fragments joined into one block of C text.
    pub fn to_code(&self) -> String {
        self.fragments.join("\n")
    }
}
