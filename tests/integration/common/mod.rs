#![allow(dead_code)]

use basalt::codegen::{CodeBuffer, CodeGenContext};
use basalt::config::RuntimeProfile;
use basalt::ir::Owner;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// A context for function `f` inside a protected region at line 10.
pub fn function_context(profile: RuntimeProfile) -> CodeGenContext {
    context_for(Owner::function("f"), profile)
}

pub fn context_for(owner: Owner, profile: RuntimeProfile) -> CodeGenContext {
    init_tracing();
    let mut context = CodeGenContext::new(owner, profile);
    context.push_exception_escape("frame_exception_exit_1");
    context.set_current_line(10);
    context
}

pub fn emitted(f: impl FnOnce(&mut CodeBuffer)) -> String {
    let mut buf = CodeBuffer::new();
    f(&mut buf);
    buf.to_code()
}
