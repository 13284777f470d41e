//! Depth-first optimization pass over a statement tree.
//!
//! Children are optimized before their parents, so a conditional sees already
//! folded branches. Each rewritten node is stored back into its parent's slot.

use tracing::debug;

use crate::analysis::Analysis;
use crate::ir::visit::{walk_expr_mut, VisitMut};
use crate::ir::{Change, Computed, Constant, Expr, ExprNode, StmtNode};
use crate::span::Span;

pub struct Optimizer<'a> {
    analysis: &'a dyn Analysis,
    changes: Vec<Change>,
}

impl<'a> Optimizer<'a> {
    pub fn new(analysis: &'a dyn Analysis) -> Self {
        Self { analysis, changes: Vec::new() }
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

impl VisitMut for Optimizer<'_> {
    fn visit_expr_mut(&mut self, expr: &mut ExprNode) {
        walk_expr_mut(self, expr);

        if !matches!(expr.node, Expr::Conditional(_)) {
            return;
        }

        // Hole left in the slot while the step owns the old node.
        let hole = ExprNode::constant(Constant::None, Span::dummy());
        let old = std::mem::replace(expr, hole);
        let Computed { node, change } = old.compute_expression(self.analysis);
        *expr = node;

        if let Some(change) = change {
            debug!(
                tag = change.tag.as_str(),
                line = change.span.line,
                "{}",
                change.message
            );
            self.changes.push(change);
        }
    }
}

/// Run one optimization pass over `stmt`, returning the changes made.
pub fn optimize(stmt: &mut StmtNode, analysis: &dyn Analysis) -> Vec<Change> {
    let mut optimizer = Optimizer::new(analysis);
    optimizer.visit_stmt_mut(stmt);
    optimizer.into_changes()
}

/// Repeat [`optimize`] until a pass makes no change or `max_passes` is reached.
pub fn optimize_until_stable(stmt: &mut StmtNode, analysis: &dyn Analysis, max_passes: usize) -> Vec<Change> {
    let mut all = Vec::new();
    for pass in 1..=max_passes {
        let changes = optimize(stmt, analysis);
        debug!(pass, changes = changes.len(), "optimization pass finished");
        if changes.is_empty() {
            break;
        }
        all.extend(changes);
    }
    all
}
