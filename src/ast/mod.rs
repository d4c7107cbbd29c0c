//=====================================================
// File: ast/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: RuleScript Abstract Syntax Tree definitions
// Objective: Define the node variants produced by the parser and walked by
//            the evaluator, plus traversal helpers used by hosts
//=====================================================

mod display;

use crate::tokenizer::Position;

/// Binary operators, listed from loosest to tightest binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Greater => ">",
            BinaryOperator::Less => "<",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Not,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
        }
    }
}

/// One `else if <condition>:` clause of an if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub condition: Node,
    pub block: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    NumberLiteral {
        value: f64,
    },
    /// Raw text; `{{name}}` markers are resolved at evaluation time.
    StringLiteral {
        value: String,
    },
    BooleanLiteral {
        value: bool,
    },
    Identifier {
        name: String,
    },
    BinaryOp {
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryOp {
        operator: UnaryOperator,
        operand: Box<Node>,
    },
    Assignment {
        name: String,
        value: Box<Node>,
    },
    ArrayLiteral {
        elements: Vec<Node>,
    },
    ArrayAccess {
        object: Box<Node>,
        index: Box<Node>,
    },
    MemberAccess {
        object: Box<Node>,
        property: String,
    },
    MethodCall {
        object: Box<Node>,
        method: String,
        arguments: Vec<Node>,
    },
    FunctionCall {
        name: String,
        arguments: Vec<Node>,
    },
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Node>,
    },
    IfStatement {
        condition: Box<Node>,
        then_block: Vec<Node>,
        else_if_blocks: Vec<ElseIf>,
        else_block: Option<Vec<Node>>,
    },
    ForLoop {
        variable: String,
        iterable: Box<Node>,
        body: Vec<Node>,
    },
    ReturnStatement {
        value: Option<Box<Node>>,
    },
    SubscribeCall {
        arguments: Vec<Node>,
    },
}

/// An AST node plus the position of the token that introduced it.
///
/// Equality compares shape only: two trees parsed from differently laid out
/// source are equal when their node kinds and payloads match.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Position,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Node {
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self { kind, position }
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::NumberLiteral { .. } => "NumberLiteral",
            NodeKind::StringLiteral { .. } => "StringLiteral",
            NodeKind::BooleanLiteral { .. } => "BooleanLiteral",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::BinaryOp { .. } => "BinaryOp",
            NodeKind::UnaryOp { .. } => "UnaryOp",
            NodeKind::Assignment { .. } => "Assignment",
            NodeKind::ArrayLiteral { .. } => "ArrayLiteral",
            NodeKind::ArrayAccess { .. } => "ArrayAccess",
            NodeKind::MemberAccess { .. } => "MemberAccess",
            NodeKind::MethodCall { .. } => "MethodCall",
            NodeKind::FunctionCall { .. } => "FunctionCall",
            NodeKind::FunctionDef { .. } => "FunctionDef",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::ForLoop { .. } => "ForLoop",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::SubscribeCall { .. } => "SubscribeCall",
        }
    }

    /// Pre-order traversal of this node and all of its descendants.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        match &self.kind {
            NodeKind::NumberLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::Identifier { .. } => {}
            NodeKind::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            NodeKind::UnaryOp { operand, .. } => operand.walk(visit),
            NodeKind::Assignment { value, .. } => value.walk(visit),
            NodeKind::ArrayLiteral { elements } => walk_all(elements, visit),
            NodeKind::ArrayAccess { object, index } => {
                object.walk(visit);
                index.walk(visit);
            }
            NodeKind::MemberAccess { object, .. } => object.walk(visit),
            NodeKind::MethodCall {
                object, arguments, ..
            } => {
                object.walk(visit);
                walk_all(arguments, visit);
            }
            NodeKind::FunctionCall { arguments, .. } => walk_all(arguments, visit),
            NodeKind::FunctionDef { body, .. } => walk_all(body, visit),
            NodeKind::IfStatement {
                condition,
                then_block,
                else_if_blocks,
                else_block,
            } => {
                condition.walk(visit);
                walk_all(then_block, visit);
                for clause in else_if_blocks {
                    clause.condition.walk(visit);
                    walk_all(&clause.block, visit);
                }
                if let Some(block) = else_block {
                    walk_all(block, visit);
                }
            }
            NodeKind::ForLoop { iterable, body, .. } => {
                iterable.walk(visit);
                walk_all(body, visit);
            }
            NodeKind::ReturnStatement { value } => {
                if let Some(value) = value {
                    value.walk(visit);
                }
            }
            NodeKind::SubscribeCall { arguments } => walk_all(arguments, visit),
        }
    }
}

fn walk_all<'a>(nodes: &'a [Node], visit: &mut dyn FnMut(&'a Node)) {
    for node in nodes {
        node.walk(visit);
    }
}

/// A parsed script: the top-level statement list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Node>,
}

impl Program {
    pub fn new(statements: Vec<Node>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        walk_all(&self.statements, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(value: f64) -> Node {
        Node::new(NodeKind::NumberLiteral { value }, Position::default())
    }

    #[test]
    fn equality_ignores_positions() {
        let a = Node::new(NodeKind::NumberLiteral { value: 1.0 }, Position::new(1, 1));
        let b = Node::new(NodeKind::NumberLiteral { value: 1.0 }, Position::new(9, 4));
        assert_eq!(a, b);
        assert_ne!(a, number(2.0));
    }

    #[test]
    fn walk_visits_nested_nodes_in_pre_order() {
        let tree = Node::new(
            NodeKind::BinaryOp {
                operator: BinaryOperator::Add,
                left: Box::new(number(1.0)),
                right: Box::new(Node::new(
                    NodeKind::ArrayLiteral {
                        elements: vec![number(2.0), number(3.0)],
                    },
                    Position::default(),
                )),
            },
            Position::default(),
        );
        let mut seen = Vec::new();
        tree.walk(&mut |node| seen.push(node.type_name()));
        assert_eq!(
            seen,
            vec![
                "BinaryOp",
                "NumberLiteral",
                "ArrayLiteral",
                "NumberLiteral",
                "NumberLiteral"
            ]
        );
    }
}

//=====================================================
// End of file
//=====================================================
