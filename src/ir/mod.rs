//! Program tree consumed by the optimizer and the code generator.
//!
//! Only the conditional nodes carry real optimization logic. The remaining
//! expression and statement kinds are the minimal hosts the conditionals need:
//! literals, variable reads, calls, raises, and side-effect wrappers.
//!
//! Every node carries a stable [`NodeId`], its [`Span`], and a non-owning link
//! to its parent's id. Children are owned by their parent. Constructors set the
//! parent link of the children they receive.

pub mod conditional;
pub mod helpers;
pub mod visit;

use uuid::Uuid;

use crate::analysis::Analysis;
use crate::span::Span;

pub use conditional::{Change, ChangeTag, Computed, ConditionalExpression, ConditionalStatement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A tree node: identity, location, parent link, and payload.
#[derive(Debug, Clone)]
pub struct IrNode<T> {
    pub id: NodeId,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub node: T,
}

pub type ExprNode = IrNode<Expr>;
pub type StmtNode = IrNode<Stmt>;

// ============================================================================
// Owners, variables, exception kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    Module,
    /// A class body that is executed at runtime to build the class.
    ClassBody,
    Function,
}

/// The scope a variable is declared in, or the scope being compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: OwnerId,
    pub kind: OwnerKind,
    pub name: String,
}

impl Owner {
    pub fn new(kind: OwnerKind, name: impl Into<String>) -> Self {
        Self { id: OwnerId(Uuid::new_v4()), kind, name: name.into() }
    }

    pub fn module(name: impl Into<String>) -> Self {
        Self::new(OwnerKind::Module, name)
    }

    pub fn class_body(name: impl Into<String>) -> Self {
        Self::new(OwnerKind::ClassBody, name)
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::new(OwnerKind::Function, name)
    }

    pub fn is_module(&self) -> bool {
        self.kind == OwnerKind::Module
    }

    pub fn is_class_body(&self) -> bool {
        self.kind == OwnerKind::ClassBody
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub owner: OwnerId,
}

impl Variable {
    pub fn new(name: impl Into<String>, owner: &Owner) -> Self {
        Self { name: name.into(), owner: owner.id }
    }
}

/// An exception category of the target runtime, by class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionKind(String);

impl ExceptionKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The root category; every raise matches it.
    pub fn base() -> Self {
        Self::new("BaseException")
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Only the root split is modelled: a few categories sit directly under
    /// the root, everything else under `Exception`.
    fn parent(&self) -> Option<ExceptionKind> {
        let parent = match self.0.as_str() {
            "BaseException" => return None,
            "Exception" | "SystemExit" | "KeyboardInterrupt" | "GeneratorExit" => "BaseException",
            _ => "Exception",
        };
        Some(ExceptionKind::new(parent))
    }

    /// Whether a handler for `category` catches an exception of this kind.
    pub fn is_subclass_of(&self, category: &ExceptionKind) -> bool {
        let mut current = Some(self.clone());
        while let Some(kind) = current {
            if &kind == category {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Constant {
    pub fn truth_value(&self) -> bool {
        match self {
            Constant::None => false,
            Constant::Bool(b) => *b,
            Constant::Int(n) => *n != 0,
            Constant::Str(s) => !s.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Constant(Constant),
    VariableRef(Variable),
    Call {
        callee: Box<ExprNode>,
        args: Vec<ExprNode>,
    },
    /// Unconditionally raises an exception of the given kind.
    Raise(ExceptionKind),
    /// Evaluates `side_effects` in order, then yields `expression`.
    SideEffects {
        side_effects: Vec<ExprNode>,
        expression: Box<ExprNode>,
    },
    Conditional(ConditionalExpression),
}

/// Borrowed view of a child slot, for generic traversal.
#[derive(Debug, Clone, Copy)]
pub enum Child<'a> {
    Expr(&'a ExprNode),
    Stmt(&'a StmtNode),
}

impl Expr {
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Constant(_) => "EXPRESSION_CONSTANT_REF",
            Expr::VariableRef(_) => "EXPRESSION_VARIABLE_REF",
            Expr::Call { .. } => "EXPRESSION_CALL",
            Expr::Raise(_) => "EXPRESSION_RAISE_EXCEPTION",
            Expr::SideEffects { .. } => "EXPRESSION_SIDE_EFFECTS",
            Expr::Conditional(_) => "EXPRESSION_CONDITIONAL",
        }
    }

    /// Children in declaration order. List slots repeat their name per element.
    pub fn named_children(&self) -> Vec<(&'static str, Option<Child<'_>>)> {
        match self {
            Expr::Constant(_) | Expr::VariableRef(_) | Expr::Raise(_) => vec![],
            Expr::Call { callee, args } => {
                let mut out = vec![("callee", Some(Child::Expr(callee)))];
                out.extend(args.iter().map(|a| ("args", Some(Child::Expr(a)))));
                out
            }
            Expr::SideEffects { side_effects, expression } => {
                let mut out: Vec<_> = side_effects
                    .iter()
                    .map(|e| ("side_effects", Some(Child::Expr(e))))
                    .collect();
                out.push(("expression", Some(Child::Expr(expression))));
                out
            }
            Expr::Conditional(c) => vec![
                ("condition", Some(Child::Expr(&c.condition))),
                ("expression_yes", Some(Child::Expr(&c.expression_yes))),
                ("expression_no", Some(Child::Expr(&c.expression_no))),
            ],
        }
    }

    fn children_mut(&mut self) -> Vec<&mut ExprNode> {
        match self {
            Expr::Constant(_) | Expr::VariableRef(_) | Expr::Raise(_) => vec![],
            Expr::Call { callee, args } => {
                let mut out = vec![callee.as_mut()];
                out.extend(args.iter_mut());
                out
            }
            Expr::SideEffects { side_effects, expression } => {
                let mut out: Vec<_> = side_effects.iter_mut().collect();
                out.push(expression.as_mut());
                out
            }
            Expr::Conditional(c) => vec![
                c.condition.as_mut(),
                c.expression_yes.as_mut(),
                c.expression_no.as_mut(),
            ],
        }
    }
}

impl ExprNode {
    pub fn new(node: Expr, span: Span) -> Self {
        let mut expr = IrNode { id: NodeId::fresh(), span, parent: None, node };
        expr.adopt_children();
        expr
    }

    pub fn constant(value: Constant, span: Span) -> Self {
        Self::new(Expr::Constant(value), span)
    }

    pub fn variable_ref(variable: Variable, span: Span) -> Self {
        Self::new(Expr::VariableRef(variable), span)
    }

    pub fn call(callee: ExprNode, args: Vec<ExprNode>, span: Span) -> Self {
        Self::new(Expr::Call { callee: Box::new(callee), args }, span)
    }

    pub fn raise(kind: ExceptionKind, span: Span) -> Self {
        Self::new(Expr::Raise(kind), span)
    }

    pub fn side_effects(side_effects: Vec<ExprNode>, expression: ExprNode, span: Span) -> Self {
        Self::new(
            Expr::SideEffects { side_effects, expression: Box::new(expression) },
            span,
        )
    }

    pub fn conditional(condition: ExprNode, yes: ExprNode, no: ExprNode, span: Span) -> Self {
        Self::new(Expr::Conditional(ConditionalExpression::new(condition, yes, no)), span)
    }

    /// Point every direct child's parent link at this node.
    pub fn adopt_children(&mut self) {
        let id = self.id;
        for child in self.node.children_mut() {
            child.parent = Some(id);
        }
    }

    pub fn may_have_side_effects(&self) -> bool {
        match &self.node {
            Expr::Constant(_) | Expr::VariableRef(_) => false,
            Expr::Call { .. } | Expr::Raise(_) => true,
            Expr::SideEffects { side_effects, expression } => {
                !side_effects.is_empty() || expression.may_have_side_effects()
            }
            Expr::Conditional(c) => {
                c.condition.may_have_side_effects()
                    || c.expression_yes.may_have_side_effects()
                    || c.expression_no.may_have_side_effects()
            }
        }
    }

    /// Whether evaluating this node for its truth value may have side effects.
    pub fn may_have_side_effects_bool(&self) -> bool {
        match &self.node {
            Expr::Constant(_) | Expr::VariableRef(_) => false,
            Expr::Call { .. } | Expr::Raise(_) => true,
            Expr::SideEffects { side_effects, expression } => {
                !side_effects.is_empty() || expression.may_have_side_effects_bool()
            }
            Expr::Conditional(c) => c.may_have_side_effects_bool(),
        }
    }

    /// Whether the value handed back may be an owned reference.
    pub fn may_provide_reference(&self) -> bool {
        match &self.node {
            Expr::Constant(_) | Expr::VariableRef(_) | Expr::Raise(_) => false,
            Expr::Call { .. } => true,
            Expr::SideEffects { expression, .. } => expression.may_provide_reference(),
            Expr::Conditional(c) => c.may_provide_reference(),
        }
    }

    /// Whether evaluating this node always raises something `category` catches.
    pub fn will_raise_exception(&self, category: &ExceptionKind) -> bool {
        match &self.node {
            Expr::Constant(_) | Expr::VariableRef(_) => false,
            Expr::Raise(kind) => kind.is_subclass_of(category),
            Expr::Call { callee, args } => {
                callee.will_raise_exception(category)
                    || args.iter().any(|a| a.will_raise_exception(category))
            }
            Expr::SideEffects { side_effects, expression } => {
                side_effects.iter().any(|e| e.will_raise_exception(category))
                    || expression.will_raise_exception(category)
            }
            Expr::Conditional(c) => c.condition.will_raise_exception(category),
        }
    }

    /// Whether evaluating this node may raise something `category` catches.
    pub fn may_raise_exception(&self, category: &ExceptionKind) -> bool {
        match &self.node {
            Expr::Constant(_) => false,
            Expr::VariableRef(_) => ExceptionKind::new("NameError").is_subclass_of(category),
            Expr::Raise(kind) => kind.is_subclass_of(category),
            Expr::Call { .. } => true,
            Expr::SideEffects { side_effects, expression } => {
                side_effects.iter().any(|e| e.may_raise_exception(category))
                    || expression.may_raise_exception(category)
            }
            Expr::Conditional(c) => {
                c.condition.may_raise_exception(category)
                    || c.expression_yes.may_raise_exception(category)
                    || c.expression_no.may_raise_exception(category)
            }
        }
    }

    /// Truth value known from structure alone, if any.
    pub fn truth_value(&self) -> Option<bool> {
        match &self.node {
            Expr::Constant(c) => Some(c.truth_value()),
            Expr::SideEffects { expression, .. } => expression.truth_value(),
            Expr::Conditional(c) => match c.condition.truth_value() {
                Some(true) => c.expression_yes.truth_value(),
                Some(false) => c.expression_no.truth_value(),
                None => match (c.expression_yes.truth_value(), c.expression_no.truth_value()) {
                    (Some(a), Some(b)) if a == b => Some(a),
                    _ => None,
                },
            },
            Expr::VariableRef(_) | Expr::Call { .. } | Expr::Raise(_) => None,
        }
    }

    /// The parts of this node that must still be evaluated if its value is
    /// dropped.
    pub fn extract_side_effects(self) -> Vec<ExprNode> {
        match self.node {
            Expr::Constant(_) | Expr::VariableRef(_) => vec![],
            Expr::Call { .. } | Expr::Raise(_) => vec![self],
            Expr::SideEffects { side_effects, expression } => {
                let mut out = side_effects;
                out.extend(expression.extract_side_effects());
                out
            }
            Expr::Conditional(_) => {
                if self.may_have_side_effects() {
                    vec![self]
                } else {
                    vec![]
                }
            }
        }
    }

    /// Run this node's optimization step. Kinds without one come back
    /// unchanged.
    pub fn compute_expression(self, analysis: &dyn Analysis) -> Computed {
        match self.node {
            Expr::Conditional(_) => conditional::compute_conditional_expression(self, analysis),
            _ => Computed::unchanged(self),
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(ExprNode),
    Return(Option<ExprNode>),
    Raise(ExceptionKind),
    Sequence(Vec<StmtNode>),
    Conditional(ConditionalStatement),
}

impl Stmt {
    pub fn kind(&self) -> &'static str {
        match self {
            Stmt::Expression(_) => "STATEMENT_EXPRESSION_ONLY",
            Stmt::Return(_) => "STATEMENT_RETURN",
            Stmt::Raise(_) => "STATEMENT_RAISE_EXCEPTION",
            Stmt::Sequence(_) => "STATEMENTS_SEQUENCE",
            Stmt::Conditional(_) => "STATEMENT_CONDITIONAL",
        }
    }

    pub fn named_children(&self) -> Vec<(&'static str, Option<Child<'_>>)> {
        match self {
            Stmt::Expression(e) => vec![("expression", Some(Child::Expr(e)))],
            Stmt::Return(value) => vec![("expression", value.as_ref().map(Child::Expr))],
            Stmt::Raise(_) => vec![],
            Stmt::Sequence(stmts) => stmts
                .iter()
                .map(|s| ("statements", Some(Child::Stmt(s))))
                .collect(),
            Stmt::Conditional(c) => vec![
                ("condition", Some(Child::Expr(&c.condition))),
                ("yes_branch", Some(Child::Stmt(c.branch_yes()))),
                ("no_branch", c.branch_no().map(Child::Stmt)),
            ],
        }
    }
}

impl StmtNode {
    pub fn new(node: Stmt, span: Span) -> Self {
        let mut stmt = IrNode { id: NodeId::fresh(), span, parent: None, node };
        stmt.adopt_children();
        stmt
    }

    pub fn expression(expr: ExprNode, span: Span) -> Self {
        Self::new(Stmt::Expression(expr), span)
    }

    pub fn return_value(value: Option<ExprNode>, span: Span) -> Self {
        Self::new(Stmt::Return(value), span)
    }

    pub fn raise(kind: ExceptionKind, span: Span) -> Self {
        Self::new(Stmt::Raise(kind), span)
    }

    pub fn sequence(stmts: Vec<StmtNode>, span: Span) -> Self {
        Self::new(Stmt::Sequence(stmts), span)
    }

    pub fn conditional(condition: ExprNode, yes: StmtNode, no: Option<StmtNode>, span: Span) -> Self {
        Self::new(Stmt::Conditional(ConditionalStatement::new(condition, yes, no)), span)
    }

    pub fn adopt_children(&mut self) {
        let id = self.id;
        match &mut self.node {
            Stmt::Expression(e) | Stmt::Return(Some(e)) => e.parent = Some(id),
            Stmt::Return(None) | Stmt::Raise(_) => {}
            Stmt::Sequence(stmts) => {
                for s in stmts {
                    s.parent = Some(id);
                }
            }
            Stmt::Conditional(c) => c.adopt_children(id),
        }
    }

    /// Whether control never falls through past this statement.
    pub fn is_aborting(&self) -> bool {
        match &self.node {
            Stmt::Expression(_) => false,
            Stmt::Return(_) | Stmt::Raise(_) => true,
            Stmt::Sequence(stmts) => stmts.last().is_some_and(|s| s.is_aborting()),
            Stmt::Conditional(c) => c.is_aborting(),
        }
    }
}
