//! Conditional nodes.
//!
//! The conditional expression is `a if b else c`; the conditional statement is
//! `if b: ... else: ...`. There is no `elif`: it is expressed by nesting
//! conditional statements in the no branch.

use tracing::trace;

use super::helpers::wrap_expression_with_node_side_effects;
use super::{Expr, ExceptionKind, ExprNode, IrNode, NodeId, Stmt, StmtNode};
use crate::analysis::{Analysis, TruthValue};
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTag {
    /// The node was replaced by one that raises.
    NewRaise,
    /// The node was replaced by a different expression.
    NewExpression,
}

impl ChangeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeTag::NewRaise => "new_raise",
            ChangeTag::NewExpression => "new_expression",
        }
    }
}

/// A rewrite performed by an optimization step.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub tag: ChangeTag,
    pub message: &'static str,
    pub span: Span,
}

/// Result of an optimization step: the node to put in the parent's slot, and
/// what changed, if anything.
#[derive(Debug)]
pub struct Computed {
    pub node: ExprNode,
    pub change: Option<Change>,
}

impl Computed {
    pub fn unchanged(node: ExprNode) -> Self {
        Self { node, change: None }
    }

    fn replaced(mut node: ExprNode, parent: Option<NodeId>, tag: ChangeTag, message: &'static str, span: Span) -> Self {
        node.parent = parent;
        Self { node, change: Some(Change { tag, message, span }) }
    }
}

// ============================================================================
// Conditional expression
// ============================================================================

#[derive(Debug, Clone)]
pub struct ConditionalExpression {
    pub condition: Box<ExprNode>,
    pub expression_yes: Box<ExprNode>,
    pub expression_no: Box<ExprNode>,
}

impl ConditionalExpression {
    pub fn new(condition: ExprNode, expression_yes: ExprNode, expression_no: ExprNode) -> Self {
        Self {
            condition: Box::new(condition),
            expression_yes: Box::new(expression_yes),
            expression_no: Box::new(expression_no),
        }
    }

    pub fn may_have_side_effects_bool(&self) -> bool {
        self.condition.may_have_side_effects_bool()
            || self.expression_yes.may_have_side_effects_bool()
            || self.expression_no.may_have_side_effects_bool()
    }

    pub fn may_provide_reference(&self) -> bool {
        self.expression_yes.may_provide_reference() || self.expression_no.may_provide_reference()
    }
}

/// Fold a conditional expression using what `analysis` knows about its
/// condition. The replacement inherits the parent link of `node`.
pub(crate) fn compute_conditional_expression(node: ExprNode, analysis: &dyn Analysis) -> Computed {
    let IrNode { id, span, parent, node } = node;
    let Expr::Conditional(conditional) = node else {
        return Computed::unchanged(IrNode { id, span, parent, node });
    };

    // If the condition raises, that escapes and neither branch is reached.
    if analysis.will_raise(&conditional.condition, &ExceptionKind::base()) {
        return Computed::replaced(
            *conditional.condition,
            parent,
            ChangeTag::NewRaise,
            "Conditional expression raises in condition",
            span,
        );
    }

    match analysis.truth_value(&conditional.condition) {
        TruthValue::True => {
            let ConditionalExpression { condition, expression_yes, .. } = conditional;
            Computed::replaced(
                wrap_expression_with_node_side_effects(*expression_yes, *condition),
                parent,
                ChangeTag::NewExpression,
                "Conditional expression predicted to yes case",
                span,
            )
        }
        TruthValue::False => {
            let ConditionalExpression { condition, expression_no, .. } = conditional;
            Computed::replaced(
                wrap_expression_with_node_side_effects(*expression_no, *condition),
                parent,
                ChangeTag::NewExpression,
                "Conditional expression predicted to no case",
                span,
            )
        }
        TruthValue::Unknown => {
            trace!(line = span.line, "conditional expression kept, condition truth unknown");
            Computed::unchanged(IrNode { id, span, parent, node: Expr::Conditional(conditional) })
        }
    }
}

// ============================================================================
// Conditional statement
// ============================================================================

#[derive(Debug, Clone)]
pub struct ConditionalStatement {
    pub condition: Box<ExprNode>,
    yes_branch: Box<StmtNode>,
    no_branch: Option<Box<StmtNode>>,
}

impl ConditionalStatement {
    pub fn new(condition: ExprNode, yes_branch: StmtNode, no_branch: Option<StmtNode>) -> Self {
        Self {
            condition: Box::new(condition),
            yes_branch: Box::new(yes_branch),
            no_branch: no_branch.map(Box::new),
        }
    }

    pub fn branch_yes(&self) -> &StmtNode {
        &self.yes_branch
    }

    pub fn branch_no(&self) -> Option<&StmtNode> {
        self.no_branch.as_deref()
    }

    pub fn branch_yes_mut(&mut self) -> &mut StmtNode {
        &mut self.yes_branch
    }

    pub fn branch_no_mut(&mut self) -> Option<&mut StmtNode> {
        self.no_branch.as_deref_mut()
    }

    /// True iff both branches exist and both abort. A missing no branch is the
    /// implicit empty else, which falls through.
    pub fn is_aborting(&self) -> bool {
        self.yes_branch.is_aborting() && self.no_branch.as_ref().is_some_and(|no| no.is_aborting())
    }

    pub(super) fn adopt_children(&mut self, id: NodeId) {
        self.condition.parent = Some(id);
        self.yes_branch.parent = Some(id);
        if let Some(no) = &mut self.no_branch {
            no.parent = Some(id);
        }
    }
}

impl StmtNode {
    fn conditional_mut(&mut self, what: &str) -> (NodeId, &mut ConditionalStatement) {
        let id = self.id;
        match &mut self.node {
            Stmt::Conditional(c) => (id, c),
            other => panic!("ICE: {what} on {}", other.kind()),
        }
    }

    /// Replace the yes branch of a conditional statement, returning the old one.
    pub fn set_branch_yes(&mut self, mut branch: StmtNode) -> StmtNode {
        let (id, c) = self.conditional_mut("set_branch_yes");
        branch.parent = Some(id);
        *std::mem::replace(&mut c.yes_branch, Box::new(branch))
    }

    /// Replace (or remove) the no branch of a conditional statement, returning
    /// the old one.
    pub fn set_branch_no(&mut self, branch: Option<StmtNode>) -> Option<StmtNode> {
        let (id, c) = self.conditional_mut("set_branch_no");
        let branch = branch.map(|mut b| {
            b.parent = Some(id);
            Box::new(b)
        });
        std::mem::replace(&mut c.no_branch, branch).map(|b| *b)
    }
}
