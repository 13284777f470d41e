//! Interface to the value-flow analysis the optimizer consults.
//!
//! The analysis itself lives outside this crate. [`StructuralAnalysis`]
//! answers from node structure alone and is what the crate falls back to when
//! no richer analysis is wired in.

use crate::ir::{ExceptionKind, ExprNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruthValue {
    True,
    False,
    Unknown,
}

impl From<Option<bool>> for TruthValue {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => TruthValue::True,
            Some(false) => TruthValue::False,
            None => TruthValue::Unknown,
        }
    }
}

pub trait Analysis {
    /// Statically known truth value of `expr`.
    fn truth_value(&self, expr: &ExprNode) -> TruthValue;

    /// Whether evaluating `expr` may raise something `category` catches.
    fn may_raise(&self, expr: &ExprNode, category: &ExceptionKind) -> bool;

    /// Whether evaluating `expr` always raises something `category` catches.
    fn will_raise(&self, expr: &ExprNode, category: &ExceptionKind) -> bool {
        expr.will_raise_exception(category)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralAnalysis;

impl Analysis for StructuralAnalysis {
    fn truth_value(&self, expr: &ExprNode) -> TruthValue {
        expr.truth_value().into()
    }

    fn may_raise(&self, expr: &ExprNode, category: &ExceptionKind) -> bool {
        expr.may_raise_exception(category)
    }
}
