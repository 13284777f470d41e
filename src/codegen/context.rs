use tracing::trace;

use super::constants::ConstantPool;
use super::values::TempName;
use crate::config::RuntimeProfile;
use crate::ir::{Constant, Owner};

/// The `{type, value, traceback, line}` slot group holding an exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionSlots {
    pub exception_type: String,
    pub exception_value: String,
    pub exception_tb: String,
    pub exception_lineno: String,
}

impl ExceptionSlots {
    fn with_prefix(prefix: &str, suffix: &str) -> Self {
        Self {
            exception_type: format!("{prefix}_type{suffix}"),
            exception_value: format!("{prefix}_value{suffix}"),
            exception_tb: format!("{prefix}_tb{suffix}"),
            exception_lineno: format!("{prefix}_lineno{suffix}"),
        }
    }
}

/// Per-scope code generation state. One is created for each function, class
/// body, or module being compiled and dropped when that scope is done.
#[derive(Debug)]
pub struct CodeGenContext {
    owner: Owner,
    profile: RuntimeProfile,
    cleanup_temps: Vec<TempName>,
    exception_variables: Option<ExceptionSlots>,
    keepers: Vec<ExceptionSlots>,
    keeper_count: usize,
    exception_escapes: Vec<String>,
    constants: ConstantPool,
    frame_type_description: Option<String>,
    current_line: u32,
}

impl CodeGenContext {
    pub fn new(owner: Owner, profile: RuntimeProfile) -> Self {
        Self {
            owner,
            profile,
            cleanup_temps: Vec::new(),
            exception_variables: None,
            keepers: Vec::new(),
            keeper_count: 0,
            exception_escapes: Vec::new(),
            constants: ConstantPool::new(),
            frame_type_description: None,
            current_line: 0,
        }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn profile(&self) -> RuntimeProfile {
        self.profile
    }

    // ── Cleanup registry ─────────────────────────────────────────────

    pub fn add_cleanup_temp(&mut self, name: &TempName) {
        if !name.has_cleanup_obligation() {
            panic!("ICE: '{name}' has no release obligation and cannot be registered for cleanup");
        }
        if self.cleanup_temps.contains(name) {
            panic!("ICE: '{name}' registered for cleanup twice");
        }
        self.cleanup_temps.push(name.clone());
    }

    pub fn needs_cleanup(&self, name: &TempName) -> bool {
        self.cleanup_temps.contains(name)
    }

    pub fn remove_cleanup_temp(&mut self, name: &TempName) {
        match self.cleanup_temps.iter().position(|t| t == name) {
            Some(idx) => {
                self.cleanup_temps.remove(idx);
            }
            None => panic!("ICE: '{name}' removed from cleanup but was never registered"),
        }
    }

    /// Handles still owed a release, in registration order.
    pub fn cleanup_temp_names(&self) -> &[TempName] {
        &self.cleanup_temps
    }

    // ── Exception slots ──────────────────────────────────────────────

    /// The scope's exception slots, allocated on first request.
    pub fn exception_variables(&mut self) -> ExceptionSlots {
        self.exception_variables
            .get_or_insert_with(|| ExceptionSlots::with_prefix("exception", ""))
            .clone()
    }

    /// Whether the exception slots have been handed out yet.
    pub fn has_exception_variables(&self) -> bool {
        self.exception_variables.is_some()
    }

    /// Start a handler region that keeps the previously raised exception in a
    /// fresh keeper slot group.
    pub fn enter_keeper_region(&mut self) -> ExceptionSlots {
        self.keeper_count += 1;
        let keeper = ExceptionSlots::with_prefix("exception_keeper", &format!("_{}", self.keeper_count));
        trace!(keeper = %keeper.exception_type, "entering keeper region");
        self.keepers.push(keeper.clone());
        keeper
    }

    pub fn leave_keeper_region(&mut self) -> ExceptionSlots {
        self.keepers
            .pop()
            .unwrap_or_else(|| panic!("ICE: leaving a keeper region that was never entered"))
    }

    pub fn exception_keeper_variables(&self) -> Option<&ExceptionSlots> {
        self.keepers.last()
    }

    // ── Escape targets ───────────────────────────────────────────────

    pub fn push_exception_escape(&mut self, label: impl Into<String>) {
        let label = label.into();
        trace!(%label, depth = self.exception_escapes.len() + 1, "push exception escape");
        self.exception_escapes.push(label);
    }

    pub fn pop_exception_escape(&mut self) -> String {
        self.exception_escapes
            .pop()
            .unwrap_or_else(|| panic!("ICE: exception escape stack popped while empty"))
    }

    /// Label that fallible code jumps to.
    pub fn exception_escape(&self) -> &str {
        match self.exception_escapes.last() {
            Some(label) => label,
            None => panic!("ICE: no exception escape target outside a protected region"),
        }
    }

    /// Run `f` with `label` as the escape target, restoring the previous
    /// target afterwards.
    pub fn with_exception_escape<R>(&mut self, label: impl Into<String>, f: impl FnOnce(&mut Self) -> R) -> R {
        let label = label.into();
        self.push_exception_escape(label.clone());
        let depth = self.exception_escapes.len();
        let result = f(self);
        if self.exception_escapes.len() != depth || self.exception_escapes.last() != Some(&label) {
            panic!("ICE: unbalanced exception escape stack inside region '{label}'");
        }
        self.pop_exception_escape();
        result
    }

    // ── Constants ────────────────────────────────────────────────────

    pub fn constant_code(&mut self, value: &Constant) -> String {
        self.constants.intern(value)
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    // ── Frame & source line ──────────────────────────────────────────

    pub fn set_frame_type_description(&mut self, description: Option<String>) {
        self.frame_type_description = description;
    }

    pub fn frame_type_description(&self) -> Option<&str> {
        self.frame_type_description.as_deref()
    }

    pub fn frame_type_description_declaration(&self) -> &'static str {
        "type_description_1"
    }

    pub fn set_current_line(&mut self, line: u32) {
        self.current_line = line;
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }
}
