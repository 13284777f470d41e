//! Error exit code.
//!
//! Emitters here turn a failure condition into C code that releases the
//! scope's pending temporaries, records where the error happened, and jumps
//! to the current exception escape target. The formatting variants also build
//! the exception object themselves instead of fetching one the runtime set.

use tracing::trace;

use super::context::CodeGenContext;
use super::release::{emit_release, emit_releases};
use super::templates::{self, ExitTail};
use super::values::TempName;
use super::CodeBuffer;
use crate::ir::{Constant, ExceptionKind, Variable};

/// Options for [`emit_error_exit_bool`] and [`emit_error_exit`].
///
/// `release_names` and `release_name` are two spellings of the same thing and
/// must not be combined.
#[derive(Debug, Clone, Copy)]
pub struct ErrorExit<'a> {
    pub release_names: &'a [TempName],
    pub release_name: Option<&'a TempName>,
    /// When false the condition is known to be impossible and only an
    /// assertion is emitted.
    pub needs_check: bool,
    /// Exception to raise when the failing operation did not set one. The
    /// type, value and traceback slots are left untouched; only the line slot
    /// is written.
    pub quick_exception: Option<&'a ExceptionKind>,
}

impl Default for ErrorExit<'_> {
    fn default() -> Self {
        Self { release_names: &[], release_name: None, needs_check: true, quick_exception: None }
    }
}

/// Payload of an exception built by generated code.
#[derive(Debug, Clone, Copy)]
pub enum ExceptionMessage<'a> {
    /// Stored as is, through the constant pool.
    Fixed(&'a str),
    /// A `%s` template filled in at runtime.
    Template { format: &'a str, args: &'a [&'a str] },
}

// ============================================================================
// Shared pieces
// ============================================================================

/// Releases owed on the error path: every registered temporary in
/// registration order, then the active keeper exception if there is one.
pub fn error_exit_release_code(context: &CodeGenContext) -> String {
    let mut lines: Vec<String> =
        context.cleanup_temp_names().iter().filter_map(TempName::release_code).collect();

    if let Some(keeper) = context.exception_keeper_variables() {
        lines.push(format!("Py_DECREF({});", keeper.exception_type));
        lines.push(format!("Py_XDECREF({});", keeper.exception_value));
        lines.push(format!("Py_XDECREF({});", keeper.exception_tb));
    }

    lines.join("\n")
}

pub fn frame_variable_type_description_code(context: &CodeGenContext) -> String {
    match context.frame_type_description() {
        Some(description) if !description.is_empty() => format!(
            "{} = {};",
            context.frame_type_description_declaration(),
            c_string_literal(description)
        ),
        _ => String::new(),
    }
}

pub fn error_line_number_update_code(context: &mut CodeGenContext) -> String {
    let slots = context.exception_variables();
    format!("{} = {};", slots.exception_lineno, context.current_line())
}

fn exit_tail(context: &mut CodeGenContext) -> ExitTail {
    ExitTail {
        release_temps: error_exit_release_code(context),
        var_description: frame_variable_type_description_code(context),
        line_number: error_line_number_update_code(context),
        exception_exit: context.exception_escape().to_string(),
    }
}

fn check_condition(condition: &str) {
    if condition.trim_end().ends_with(';') {
        panic!("ICE: error exit condition must be an expression, got statement '{condition}'");
    }
}

// ============================================================================
// Plain error exits
// ============================================================================

/// Emit the exit taken when `condition` holds after a fallible operation.
///
/// The handles in `exit` were consumed by that operation, so they are released
/// before the check on both paths.
pub fn emit_error_exit_bool(condition: &str, exit: ErrorExit<'_>, emit: &mut CodeBuffer, context: &mut CodeGenContext) {
    check_condition(condition);
    if !exit.release_names.is_empty() && exit.release_name.is_some() {
        panic!("ICE: error exit given both a release list and a single release name");
    }

    emit_releases(exit.release_names, emit, context);
    if let Some(name) = exit.release_name {
        emit_release(name, emit, context);
    }

    if !exit.needs_check {
        emit_assertion(&format!("!({condition})"), emit);
        return;
    }

    trace!(
        escape = context.exception_escape(),
        pending = context.cleanup_temp_names().len(),
        quick = exit.quick_exception.is_some(),
        "error exit"
    );

    let code = match exit.quick_exception {
        Some(kind) => {
            let tail = exit_tail(context);
            templates::error_catch_quick_exception(condition, &exception_identifier(kind), tail)
        }
        None => {
            let slots = context.exception_variables();
            let tail = exit_tail(context);
            templates::error_catch_exception(
                condition,
                &[slots.exception_type, slots.exception_value, slots.exception_tb],
                tail,
            )
        }
    };
    emit.emit(code);
}

/// [`emit_error_exit_bool`] with the condition derived from the C type of
/// `check_name`.
pub fn emit_error_exit(check_name: &TempName, exit: ErrorExit<'_>, emit: &mut CodeBuffer, context: &mut CodeGenContext) {
    emit_error_exit_bool(&check_name.exception_check_condition(), exit, emit, context);
}

// ============================================================================
// Building exceptions in generated code
// ============================================================================

/// Code linking a freshly built exception to the one being handled.
pub fn exception_chaining_code(context: &mut CodeGenContext) -> Vec<String> {
    if let Some(keeper) = context.exception_keeper_variables() {
        return vec![format!("ADD_EXCEPTION_CONTEXT(&{}, &{});", keeper.exception_type, keeper.exception_value)];
    }

    let slots = context.exception_variables();
    vec![
        format!(
            "NORMALIZE_EXCEPTION(&{}, &{}, &{});",
            slots.exception_type, slots.exception_value, slots.exception_tb
        ),
        format!("CHAIN_EXCEPTION({});", slots.exception_value),
    ]
}

/// Emit an exit that raises `exception` with `message` when `condition` holds.
pub fn emit_error_format_exit_bool(
    condition: &str,
    exception: &ExceptionKind,
    message: ExceptionMessage<'_>,
    emit: &mut CodeBuffer,
    context: &mut CodeGenContext,
) {
    check_condition(condition);

    let slots = context.exception_variables();
    let mut set_exception = vec![
        format!("{} = {};", slots.exception_type, exception_identifier(exception)),
        format!("Py_INCREF({});", slots.exception_type),
    ];

    match message {
        ExceptionMessage::Fixed(text) => {
            let constant = context.constant_code(&Constant::Str(text.to_string()));
            set_exception.push(format!("{} = {constant};", slots.exception_value));
            set_exception.push(format!("Py_INCREF({});", slots.exception_value));
        }
        ExceptionMessage::Template { format, args } => {
            let call_args: Vec<String> =
                std::iter::once(format).chain(args.iter().copied()).map(c_string_literal).collect();
            set_exception.push(format!(
                "{} = {}({});",
                slots.exception_value,
                context.profile().text_encoding.format_function(),
                call_args.join(", ")
            ));
        }
    }
    set_exception.push(format!("{} = NULL;", slots.exception_tb));

    if context.profile().supports_exception_chaining {
        set_exception.extend(exception_chaining_code(context));
    }

    let tail = exit_tail(context);
    emit.emit(templates::error_format_exception(condition, &set_exception, tail));
}

// ============================================================================
// Variable lookup failures
// ============================================================================

/// Exit for reading `variable` before it was assigned. Variables declared by an
/// enclosing scope report a `NameError`; the scope's own locals report an
/// `UnboundLocalError`.
pub fn emit_local_variable_reference_error(
    variable: &Variable,
    condition: &str,
    emit: &mut CodeBuffer,
    context: &mut CodeGenContext,
) {
    let (exception, format) = if variable.owner != context.owner().id {
        ("NameError", "free variable '%s' referenced before assignment in enclosing scope")
    } else {
        ("UnboundLocalError", "local variable '%s' referenced before assignment")
    };

    emit_error_format_exit_bool(
        condition,
        &ExceptionKind::new(exception),
        ExceptionMessage::Template { format, args: &[variable.name.as_str()] },
        emit,
        context,
    );
}

/// Exit for a module-level or builtin name that could not be found.
pub fn emit_name_reference_error(name: &str, condition: &str, emit: &mut CodeBuffer, context: &mut CodeGenContext) {
    check_condition(condition);

    let owner = context.owner();
    let helper = if context.profile().uses_legacy_global_name_error_helper
        && !owner.is_module()
        && !owner.is_class_body()
    {
        "FORMAT_GLOBAL_NAME_ERROR"
    } else {
        "FORMAT_NAME_ERROR"
    };

    let slots = context.exception_variables();
    let constant = context.constant_code(&Constant::Str(name.to_string()));
    let mut set_exception =
        vec![format!("{helper}(&{}, &{}, {constant});", slots.exception_type, slots.exception_value)];

    if context.profile().supports_exception_chaining {
        set_exception.extend(exception_chaining_code(context));
    }

    let tail = exit_tail(context);
    emit.emit(templates::error_format_exception(condition, &set_exception, tail));
}

// ============================================================================
// Small helpers
// ============================================================================

/// C expression naming the runtime's class object for `kind`.
pub fn exception_identifier(kind: &ExceptionKind) -> String {
    match kind.name() {
        "NotImplemented" => "Py_NotImplemented".to_string(),
        name => format!("PyExc_{name}"),
    }
}

pub fn emit_assertion(check: &str, emit: &mut CodeBuffer) {
    emit.emit(format!("assert({check});"));
}

pub fn emit_check_object(check_name: &TempName, emit: &mut CodeBuffer) {
    emit.emit(format!("CHECK_OBJECT({check_name});"));
}

/// Marks code the compiler proved unreachable.
pub fn emit_must_not_get_here(reason: &str, emit: &mut CodeBuffer) {
    emit.emit(format!("RT_CANNOT_GET_HERE({});\nreturn NULL;", c_string_literal(reason)));
}

/// Quote `s` as a C string literal.
pub fn c_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Octal, so a following hex digit is not absorbed into the escape.
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
