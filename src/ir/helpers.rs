use super::{Expr, ExprNode};

/// Use `new_node` in place of `old_node`, keeping whatever side effects
/// `old_node` would have had.
///
/// When `old_node` has no side effects, `new_node` is returned as is.
/// Otherwise the result is a side-effects node located at `old_node`, whose
/// value is `new_node`. If `new_node` is itself a side-effects node the two
/// lists are merged instead of nested.
pub fn wrap_expression_with_node_side_effects(new_node: ExprNode, old_node: ExprNode) -> ExprNode {
    let span = old_node.span;
    let mut side_effects = old_node.extract_side_effects();
    if side_effects.is_empty() {
        return new_node;
    }

    match new_node.node {
        Expr::SideEffects { side_effects: inner, expression } => {
            side_effects.extend(inner);
            ExprNode::side_effects(side_effects, *expression, span)
        }
        node => {
            let new_node = ExprNode { node, ..new_node };
            ExprNode::side_effects(side_effects, new_node, span)
        }
    }
}
