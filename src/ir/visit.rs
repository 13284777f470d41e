//! Tree visitor infrastructure.
//!
//! - `Visitor`: immutable traversal (analysis/collection passes)
//! - `VisitMut`: mutable traversal (in-place rewriting passes)
//!
//! Override only the methods you need and call the matching `walk_*` function
//! inside the override to keep the default recursion. Omitting the walk call
//! prunes traversal at that node.

use super::{Expr, ExprNode, Stmt, StmtNode};

// ============================================================================
// Visitor Trait (Read-Only)
// ============================================================================

pub trait Visitor: Sized {
    fn visit_stmt(&mut self, stmt: &StmtNode) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &ExprNode) {
        walk_expr(self, expr);
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &StmtNode) {
    match &stmt.node {
        Stmt::Expression(expr) | Stmt::Return(Some(expr)) => v.visit_expr(expr),
        Stmt::Return(None) | Stmt::Raise(_) => {}
        Stmt::Sequence(stmts) => {
            for s in stmts {
                v.visit_stmt(s);
            }
        }
        Stmt::Conditional(c) => {
            v.visit_expr(&c.condition);
            v.visit_stmt(c.branch_yes());
            if let Some(no) = c.branch_no() {
                v.visit_stmt(no);
            }
        }
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &ExprNode) {
    match &expr.node {
        Expr::Constant(_) | Expr::VariableRef(_) | Expr::Raise(_) => {}
        Expr::Call { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::SideEffects { side_effects, expression } => {
            for e in side_effects {
                v.visit_expr(e);
            }
            v.visit_expr(expression);
        }
        Expr::Conditional(c) => {
            v.visit_expr(&c.condition);
            v.visit_expr(&c.expression_yes);
            v.visit_expr(&c.expression_no);
        }
    }
}

// ============================================================================
// VisitMut Trait (Mutable)
// ============================================================================

pub trait VisitMut: Sized {
    fn visit_stmt_mut(&mut self, stmt: &mut StmtNode) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut ExprNode) {
        walk_expr_mut(self, expr);
    }
}

pub fn walk_stmt_mut<V: VisitMut>(v: &mut V, stmt: &mut StmtNode) {
    match &mut stmt.node {
        Stmt::Expression(expr) | Stmt::Return(Some(expr)) => v.visit_expr_mut(expr),
        Stmt::Return(None) | Stmt::Raise(_) => {}
        Stmt::Sequence(stmts) => {
            for s in stmts {
                v.visit_stmt_mut(s);
            }
        }
        Stmt::Conditional(c) => {
            v.visit_expr_mut(&mut c.condition);
            v.visit_stmt_mut(c.branch_yes_mut());
            if let Some(no) = c.branch_no_mut() {
                v.visit_stmt_mut(no);
            }
        }
    }
}

pub fn walk_expr_mut<V: VisitMut>(v: &mut V, expr: &mut ExprNode) {
    match &mut expr.node {
        Expr::Constant(_) | Expr::VariableRef(_) | Expr::Raise(_) => {}
        Expr::Call { callee, args } => {
            v.visit_expr_mut(callee);
            for arg in args {
                v.visit_expr_mut(arg);
            }
        }
        Expr::SideEffects { side_effects, expression } => {
            for e in side_effects {
                v.visit_expr_mut(e);
            }
            v.visit_expr_mut(expression);
        }
        Expr::Conditional(c) => {
            v.visit_expr_mut(&mut c.condition);
            v.visit_expr_mut(&mut c.expression_yes);
            v.visit_expr_mut(&mut c.expression_no);
        }
    }
}
