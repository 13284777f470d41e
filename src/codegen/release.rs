use super::context::CodeGenContext;
use super::values::TempName;
use super::CodeBuffer;

/// Release `name` if the scope still owes it a release, and drop it from the
/// cleanup registry. Handles that are not registered produce no code.
pub fn emit_release(name: &TempName, emit: &mut CodeBuffer, context: &mut CodeGenContext) {
    if !context.needs_cleanup(name) {
        return;
    }
    if let Some(code) = name.release_code() {
        emit.emit(code);
    }
    context.remove_cleanup_temp(name);
}

pub fn emit_releases(names: &[TempName], emit: &mut CodeBuffer, context: &mut CodeGenContext) {
    for name in names {
        emit_release(name, emit, context);
    }
}

pub fn emit_take_reference(name: &TempName, emit: &mut CodeBuffer) {
    if let Some(code) = name.take_reference_code() {
        emit.emit(code);
    }
}
