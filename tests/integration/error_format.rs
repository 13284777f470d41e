mod common;

use basalt::codegen::{emit_error_format_exit_bool, ExceptionMessage, TempName};
use basalt::config::RuntimeProfile;
use basalt::ir::ExceptionKind;
use common::{emitted, function_context};
use insta::assert_snapshot;

#[test]
fn fixed_message_uses_interned_constant() {
    let mut ctx = function_context(RuntimeProfile::modern());
    ctx.add_cleanup_temp(&TempName::owned("tmp_iter"));

    let code = emitted(|buf| {
        emit_error_format_exit_bool(
            "tmp_len < 0",
            &ExceptionKind::new("ValueError"),
            ExceptionMessage::Fixed("length"),
            buf,
            &mut ctx,
        )
    });

    assert_snapshot!(code, @r###"
    if (tmp_len < 0) {
        exception_type = PyExc_ValueError;
        Py_INCREF(exception_type);
        exception_value = const_str_plain_length;
        Py_INCREF(exception_value);
        exception_tb = NULL;
        NORMALIZE_EXCEPTION(&exception_type, &exception_value, &exception_tb);
        CHAIN_EXCEPTION(exception_value);
        Py_DECREF(tmp_iter);
        exception_lineno = 10;
        goto frame_exception_exit_1;
    }
    "###);
    assert_eq!(ctx.constants().len(), 1);
}

#[test]
fn templated_message_is_formatted_at_runtime() {
    let mut ctx = function_context(RuntimeProfile::modern());

    let code = emitted(|buf| {
        emit_error_format_exit_bool(
            "tmp_obj == NULL",
            &ExceptionKind::new("TypeError"),
            ExceptionMessage::Template { format: "'%s' object is not \"callable\"", args: &["int"] },
            buf,
            &mut ctx,
        )
    });

    assert_snapshot!(code, @r###"
    if (tmp_obj == NULL) {
        exception_type = PyExc_TypeError;
        Py_INCREF(exception_type);
        exception_value = PyUnicode_FromFormat("'%s' object is not \"callable\"", "int");
        exception_tb = NULL;
        NORMALIZE_EXCEPTION(&exception_type, &exception_value, &exception_tb);
        CHAIN_EXCEPTION(exception_value);
        exception_lineno = 10;
        goto frame_exception_exit_1;
    }
    "###);
}

#[test]
fn keeper_exception_becomes_context_and_is_released_after() {
    let mut ctx = function_context(RuntimeProfile::modern());
    ctx.enter_keeper_region();

    let code = emitted(|buf| {
        emit_error_format_exit_bool(
            "bad",
            &ExceptionKind::new("RuntimeError"),
            ExceptionMessage::Fixed("no active exception"),
            buf,
            &mut ctx,
        )
    });

    let add_context = code.find("ADD_EXCEPTION_CONTEXT(&exception_keeper_type_1, &exception_keeper_value_1);");
    let release = code.find("Py_DECREF(exception_keeper_type_1);");
    assert!(add_context.is_some() && release.is_some(), "{code}");
    assert!(add_context < release, "keeper released before use:\n{code}");
    assert!(!code.contains("CHAIN_EXCEPTION"));
}

#[test]
fn legacy_profile_skips_chaining() {
    let mut ctx = function_context(RuntimeProfile::legacy());

    let code = emitted(|buf| {
        emit_error_format_exit_bool(
            "x",
            &ExceptionKind::new("ValueError"),
            ExceptionMessage::Template { format: "%s", args: &["v"] },
            buf,
            &mut ctx,
        )
    });

    assert_snapshot!(code, @r###"
    if (x) {
        exception_type = PyExc_ValueError;
        Py_INCREF(exception_type);
        exception_value = PyString_FromFormat("%s", "v");
        exception_tb = NULL;
        exception_lineno = 10;
        goto frame_exception_exit_1;
    }
    "###);
}

#[test]
fn chaining_appears_iff_profile_supports_it() {
    for (profile, expected) in [(RuntimeProfile::modern(), true), (RuntimeProfile::legacy(), false)] {
        for keeper in [false, true] {
            let mut ctx = function_context(profile);
            if keeper {
                ctx.enter_keeper_region();
            }
            let code = emitted(|buf| {
                emit_error_format_exit_bool(
                    "c",
                    &ExceptionKind::new("ValueError"),
                    ExceptionMessage::Fixed("m"),
                    buf,
                    &mut ctx,
                )
            });
            let chained = code.contains("CHAIN_EXCEPTION") || code.contains("ADD_EXCEPTION_CONTEXT");
            assert_eq!(chained, expected, "{code}");
        }
    }
}

#[test]
#[should_panic(expected = "ICE: error exit condition must be an expression")]
fn statement_condition_is_rejected() {
    let mut ctx = function_context(RuntimeProfile::modern());
    emitted(|buf| {
        emit_error_format_exit_bool("x;", &ExceptionKind::new("ValueError"), ExceptionMessage::Fixed("m"), buf, &mut ctx)
    });
}
