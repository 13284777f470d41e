//! Property-based tests for release bookkeeping on error exits.
//!
//! 1. Every registered handle is released exactly once by an exit
//! 2. Consumed handles are released before the check, in the order given,
//!    and nothing else runs on the success path
//! 3. Still-pending handles are released inside the branch, in registration order
//! 4. An unneeded check never branches

use basalt::codegen::{emit_error_exit_bool, CodeBuffer, CodeGenContext, ErrorExit, TempName};
use basalt::config::RuntimeProfile;
use basalt::ir::Owner;
use proptest::prelude::*;

// Strategy: n handles, a mask of which ones the failing operation consumed,
// and the order the operation lists them in.
fn arb_scenario() -> impl Strategy<Value = (usize, Vec<bool>, Vec<usize>)> {
    (1usize..12).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(any::<bool>(), n),
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
        )
    })
}

fn handles(n: usize) -> Vec<TempName> {
    (0..n).map(|i| TempName::owned(format!("tmp_{i}"))).collect()
}

fn context_with(registered: &[TempName]) -> CodeGenContext {
    let mut ctx = CodeGenContext::new(Owner::function("f"), RuntimeProfile::modern());
    ctx.push_exception_escape("frame_exception_exit_1");
    for handle in registered {
        ctx.add_cleanup_temp(handle);
    }
    ctx
}

fn release_of(handle: &TempName) -> String {
    format!("Py_DECREF({handle});")
}

fn positions<'a>(code: &str, names: impl Iterator<Item = &'a TempName>) -> Vec<usize> {
    names.map(|h| code.find(&release_of(h)).unwrap()).collect()
}

proptest! {
    #[test]
    fn every_handle_released_exactly_once((n, consumed_mask, order) in arb_scenario()) {
        let all = handles(n);
        let mut ctx = context_with(&all);
        let consumed: Vec<TempName> =
            order.iter().filter(|&&i| consumed_mask[i]).map(|&i| all[i].clone()).collect();

        let mut buf = CodeBuffer::new();
        emit_error_exit_bool(
            "tmp_res == NULL",
            ErrorExit { release_names: &consumed, ..ErrorExit::default() },
            &mut buf,
            &mut ctx,
        );
        let code = buf.to_code();

        for handle in &all {
            prop_assert_eq!(code.matches(&release_of(handle)).count(), 1, "{}", code);
        }

        let check = code.find("if (").unwrap();
        let success_path: Vec<String> = code[..check].lines().map(str::to_string).collect();
        let expected: Vec<String> = consumed.iter().map(release_of).collect();
        prop_assert_eq!(success_path, expected);

        let before = positions(&code, consumed.iter());
        prop_assert!(before.iter().all(|&p| p < check));
        prop_assert!(before.windows(2).all(|w| w[0] < w[1]));

        let pending: Vec<&TempName> = all.iter().filter(|h| !consumed.contains(h)).collect();
        let inside = positions(&code, pending.iter().copied());
        prop_assert!(inside.iter().all(|&p| p > check));
        prop_assert!(inside.windows(2).all(|w| w[0] < w[1]));

        // The consumed handles left the registry, the pending ones did not.
        prop_assert_eq!(ctx.cleanup_temp_names().len(), pending.len());
    }

    #[test]
    fn unneeded_check_only_asserts((n, consumed_mask, _order) in arb_scenario()) {
        let all = handles(n);
        let mut ctx = context_with(&all);
        let consumed: Vec<TempName> =
            all.iter().zip(&consumed_mask).filter(|(_, c)| **c).map(|(h, _)| h.clone()).collect();

        let mut buf = CodeBuffer::new();
        emit_error_exit_bool(
            "tmp_res == NULL",
            ErrorExit { release_names: &consumed, needs_check: false, ..ErrorExit::default() },
            &mut buf,
            &mut ctx,
        );
        let code = buf.to_code();

        prop_assert!(!code.contains("if ("));
        prop_assert!(!code.contains("goto"));
        prop_assert_eq!(code.matches("assert(").count(), 1);
        prop_assert!(code.ends_with("assert(!(tmp_res == NULL));"));
        prop_assert_eq!(code.matches("Py_DECREF(").count(), consumed.len());
    }

    #[test]
    fn repeated_exits_release_pending_handles_each_time(n in 1usize..8, exits in 1usize..4) {
        let all = handles(n);
        let mut ctx = context_with(&all);

        for _ in 0..exits {
            let mut buf = CodeBuffer::new();
            emit_error_exit_bool("r == NULL", ErrorExit::default(), &mut buf, &mut ctx);
            let code = buf.to_code();
            // Each exit is its own path, so each must release everything pending.
            for handle in &all {
                prop_assert_eq!(code.matches(&release_of(handle)).count(), 1);
            }
        }
        prop_assert_eq!(ctx.cleanup_temp_names().len(), n);
    }
}
