mod common;

use std::collections::HashMap;

use basalt::analysis::{Analysis, StructuralAnalysis, TruthValue};
use basalt::ir::visit::{walk_expr, walk_stmt, Visitor};
use basalt::ir::{ChangeTag, Constant, ExceptionKind, Expr, ExprNode, NodeId, Owner, Stmt, StmtNode, Variable};
use basalt::optimize::{optimize, optimize_until_stable};
use basalt::span::Span;

// ============================================================
// Test helpers
// ============================================================

/// Analysis that knows facts about named variables, standing in for the
/// value-flow analysis.
#[derive(Default)]
struct Facts {
    truth: HashMap<&'static str, bool>,
    raising: Vec<&'static str>,
}

impl Facts {
    fn name_of(expr: &ExprNode) -> Option<&str> {
        match &expr.node {
            Expr::VariableRef(v) => Some(v.name.as_str()),
            _ => None,
        }
    }
}

impl Analysis for Facts {
    fn truth_value(&self, expr: &ExprNode) -> TruthValue {
        match Self::name_of(expr).and_then(|n| self.truth.get(n)) {
            Some(&b) => Some(b).into(),
            None => StructuralAnalysis.truth_value(expr),
        }
    }

    fn may_raise(&self, expr: &ExprNode, category: &ExceptionKind) -> bool {
        expr.may_raise_exception(category)
    }

    fn will_raise(&self, expr: &ExprNode, category: &ExceptionKind) -> bool {
        Self::name_of(expr).is_some_and(|n| self.raising.iter().any(|r| *r == n))
            || expr.will_raise_exception(category)
    }
}

#[derive(Default)]
struct Calls(Vec<String>);

impl Visitor for Calls {
    fn visit_expr(&mut self, expr: &ExprNode) {
        if let Expr::Call { callee, .. } = &expr.node {
            if let Expr::VariableRef(v) = &callee.node {
                self.0.push(v.name.clone());
            }
        }
        walk_expr(self, expr);
    }
}

#[derive(Default)]
struct ParentCheck {
    stack: Vec<NodeId>,
    broken: usize,
}

impl ParentCheck {
    fn check(&mut self, parent: Option<NodeId>) {
        if let Some(&expected) = self.stack.last() {
            if parent != Some(expected) {
                self.broken += 1;
            }
        }
    }
}

impl Visitor for ParentCheck {
    fn visit_stmt(&mut self, stmt: &StmtNode) {
        self.check(stmt.parent);
        self.stack.push(stmt.id);
        walk_stmt(self, stmt);
        self.stack.pop();
    }

    fn visit_expr(&mut self, expr: &ExprNode) {
        self.check(expr.parent);
        self.stack.push(expr.id);
        walk_expr(self, expr);
        self.stack.pop();
    }
}

fn s() -> Span {
    Span::at_line(3)
}

fn var(name: &str) -> ExprNode {
    ExprNode::variable_ref(Variable::new(name, &Owner::module("m")), s())
}

fn call(name: &str) -> ExprNode {
    ExprNode::call(var(name), vec![], s())
}

fn calls_in(stmt: &StmtNode) -> Vec<String> {
    let mut calls = Calls::default();
    calls.visit_stmt(stmt);
    calls.0
}

fn parents_consistent(stmt: &StmtNode) -> bool {
    let mut check = ParentCheck::default();
    check.visit_stmt(stmt);
    check.broken == 0
}

// ============================================================
// Conditional expression folding
// ============================================================

#[test]
fn raising_condition_replaces_whole_expression() {
    common::init_tracing();
    let raise = ExprNode::raise(ExceptionKind::new("ZeroDivisionError"), s());
    let mut stmt = StmtNode::expression(ExprNode::conditional(raise, call("yes_side"), call("no_side"), s()), s());
    let changes = optimize(&mut stmt, &StructuralAnalysis);

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].tag, ChangeTag::NewRaise);
    assert_eq!(changes[0].message, "Conditional expression raises in condition");
    assert!(calls_in(&stmt).is_empty());
    match &stmt.node {
        Stmt::Expression(e) => assert!(matches!(e.node, Expr::Raise(_))),
        other => panic!("unexpected {other:?}"),
    }
    assert!(parents_consistent(&stmt));
}

#[test]
fn analysis_reported_raise_drops_both_branches() {
    let facts = Facts { raising: vec!["exploding"], ..Facts::default() };
    let mut stmt =
        StmtNode::expression(ExprNode::conditional(var("exploding"), call("a"), call("b"), s()), s());

    let changes = optimize(&mut stmt, &facts);

    assert_eq!(changes[0].tag, ChangeTag::NewRaise);
    assert!(calls_in(&stmt).is_empty());
}

#[test]
fn true_condition_keeps_condition_side_effects_before_yes_branch() {
    let facts = Facts::default();
    // (yes_value() if (check(), True) else no_value())
    let cond = ExprNode::side_effects(vec![call("check")], ExprNode::constant(Constant::Bool(true), s()), s());
    let mut stmt =
        StmtNode::expression(ExprNode::conditional(cond, call("yes_value"), call("no_value"), s()), s());

    let changes = optimize(&mut stmt, &facts);

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].tag, ChangeTag::NewExpression);
    assert_eq!(changes[0].message, "Conditional expression predicted to yes case");
    assert_eq!(calls_in(&stmt), vec!["check", "yes_value"]);
    assert!(parents_consistent(&stmt));
}

#[test]
fn false_prediction_from_analysis_takes_no_branch() {
    let facts = Facts { truth: HashMap::from([("flag", false)]), ..Facts::default() };
    let mut stmt = StmtNode::expression(ExprNode::conditional(var("flag"), call("a"), call("b"), s()), s());

    let changes = optimize(&mut stmt, &facts);

    assert_eq!(changes[0].message, "Conditional expression predicted to no case");
    assert_eq!(calls_in(&stmt), vec!["b"]);
    // Reading a variable has no side effects, so nothing wraps the branch.
    match &stmt.node {
        Stmt::Expression(e) => assert!(matches!(e.node, Expr::Call { .. })),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_condition_is_left_alone_and_rerun_is_noop() {
    let mut stmt = StmtNode::expression(ExprNode::conditional(var("c"), call("a"), call("b"), s()), s());
    let before = match &stmt.node {
        Stmt::Expression(e) => e.id,
        _ => unreachable!(),
    };

    assert!(optimize(&mut stmt, &Facts::default()).is_empty());
    assert!(optimize(&mut stmt, &Facts::default()).is_empty());

    match &stmt.node {
        Stmt::Expression(e) => assert_eq!(e.id, before),
        _ => unreachable!(),
    }
    assert_eq!(calls_in(&stmt), vec!["a", "b"]);
}

#[test]
fn folding_inside_statement_condition_and_return() {
    let facts = Facts { truth: HashMap::from([("debug", true)]), ..Facts::default() };
    let mut stmt = StmtNode::conditional(
        ExprNode::conditional(var("debug"), var("x"), var("y"), s()),
        StmtNode::return_value(Some(ExprNode::conditional(var("debug"), call("fast"), call("slow"), s())), s()),
        None,
        s(),
    );

    let changes = optimize_until_stable(&mut stmt, &facts, 5);

    assert_eq!(changes.len(), 2);
    assert_eq!(calls_in(&stmt), vec!["fast"]);
    assert!(parents_consistent(&stmt));
}

// ============================================================
// Conditional statement termination
// ============================================================

#[test]
fn is_aborting_table() {
    let ret = || StmtNode::return_value(None, s());
    let expr = || StmtNode::expression(call("f"), s());
    let raise = || StmtNode::raise(ExceptionKind::new("ValueError"), s());

    let cases = [
        (ret(), None, false),
        (ret(), Some(raise()), true),
        (expr(), Some(ret()), false),
        (expr(), None, false),
        (StmtNode::sequence(vec![expr(), ret()], s()), Some(ret()), true),
        (StmtNode::sequence(vec![ret(), expr()], s()), Some(ret()), false),
    ];

    for (i, (yes, no, expected)) in cases.into_iter().enumerate() {
        let stmt = StmtNode::conditional(var("c"), yes, no, s());
        assert_eq!(stmt.is_aborting(), expected, "case {i}");
    }
}

#[test]
fn is_aborting_follows_branch_rewrites() {
    let mut stmt = StmtNode::conditional(
        var("c"),
        StmtNode::return_value(None, s()),
        Some(StmtNode::expression(call("f"), s())),
        s(),
    );
    assert!(!stmt.is_aborting());

    let old = stmt.set_branch_no(Some(StmtNode::raise(ExceptionKind::new("KeyError"), s())));
    assert!(old.is_some());
    assert!(stmt.is_aborting());

    stmt.set_branch_yes(StmtNode::expression(call("g"), s()));
    assert!(!stmt.is_aborting());
    assert!(parents_consistent(&stmt));

    stmt.set_branch_no(None);
    assert!(!stmt.is_aborting());
}

#[test]
fn nested_conditional_statement_is_aborting_only_when_both_levels_are() {
    let inner = StmtNode::conditional(
        var("d"),
        StmtNode::return_value(None, s()),
        Some(StmtNode::raise(ExceptionKind::new("ValueError"), s())),
        s(),
    );
    let outer = StmtNode::conditional(var("c"), inner, Some(StmtNode::return_value(None, s())), s());
    assert!(outer.is_aborting());
}
