use std::path::PathBuf;
use thiserror::Error;

/// Recoverable failures at the crate boundary.
///
/// Defects in the compiler itself (unpaired escape labels, conflicting emitter
/// arguments, unreachable code being reached) are not represented here; those
/// panic with an `ICE:` prefix at the point of detection.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Config error: {msg}")]
    Config { msg: String, path: PathBuf },

    #[error("Unknown C type: '{decl}'")]
    UnknownCType { decl: String },
}

impl CompileError {
    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    pub fn unknown_c_type(decl: impl Into<String>) -> Self {
        Self::UnknownCType { decl: decl.into() }
    }
}
