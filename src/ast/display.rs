//=====================================================
// File: ast/display.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Canonical RuleScript source rendering
// Objective: Print a Program back to source text with four-space blocks and
//            fully parenthesized operators
//=====================================================

// Binary and unary expressions are always parenthesized so the output
// re-parses to a tree of identical shape.

use std::fmt;

use super::{Node, NodeKind, Program};
use crate::tokenizer::INDENT_UNIT;

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, &self.statements, 0)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::NumberLiteral { value } => write!(f, "{}", value),
            NodeKind::StringLiteral { value } => write_quoted(f, value),
            NodeKind::BooleanLiteral { value } => write!(f, "{}", value),
            NodeKind::Identifier { name } => f.write_str(name),
            NodeKind::BinaryOp {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator.symbol(), right),
            NodeKind::UnaryOp { operator, operand } => {
                write!(f, "({}{})", operator.symbol(), operand)
            }
            NodeKind::Assignment { name, value } => write!(f, "{} = {}", name, value),
            NodeKind::ArrayLiteral { elements } => {
                f.write_str("[")?;
                write_list(f, elements)?;
                f.write_str("]")
            }
            NodeKind::ArrayAccess { object, index } => write!(f, "{}[{}]", object, index),
            NodeKind::MemberAccess { object, property } => write!(f, "{}.{}", object, property),
            NodeKind::MethodCall {
                object,
                method,
                arguments,
            } => {
                write!(f, "{}.{}(", object, method)?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            NodeKind::FunctionCall { name, arguments } => {
                write!(f, "{}(", name)?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            NodeKind::SubscribeCall { arguments } => {
                f.write_str("subscribe(")?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            NodeKind::FunctionDef { .. }
            | NodeKind::IfStatement { .. }
            | NodeKind::ForLoop { .. }
            | NodeKind::ReturnStatement { .. } => write_statement(f, self, 0),
        }
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, statements: &[Node], depth: usize) -> fmt::Result {
    for statement in statements {
        write_statement(f, statement, depth)?;
    }
    Ok(())
}

fn write_statement(f: &mut fmt::Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
    let indent = " ".repeat(depth * INDENT_UNIT);
    match &node.kind {
        NodeKind::FunctionDef { name, params, body } => {
            writeln!(f, "{}{}({}):", indent, name, params.join(", "))?;
            write_block(f, body, depth + 1)
        }
        NodeKind::IfStatement {
            condition,
            then_block,
            else_if_blocks,
            else_block,
        } => {
            writeln!(f, "{}if {}:", indent, condition)?;
            write_block(f, then_block, depth + 1)?;
            for clause in else_if_blocks {
                writeln!(f, "{}else if {}:", indent, clause.condition)?;
                write_block(f, &clause.block, depth + 1)?;
            }
            if let Some(block) = else_block {
                writeln!(f, "{}else:", indent)?;
                write_block(f, block, depth + 1)?;
            }
            Ok(())
        }
        NodeKind::ForLoop {
            variable,
            iterable,
            body,
        } => {
            writeln!(f, "{}for {} in {}:", indent, variable, iterable)?;
            write_block(f, body, depth + 1)
        }
        NodeKind::ReturnStatement { value: Some(value) } => {
            writeln!(f, "{}return {}", indent, value)
        }
        NodeKind::ReturnStatement { value: None } => writeln!(f, "{}return", indent),
        _ => writeln!(f, "{}{}", indent, node),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in value.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str("\"")
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;
    use crate::tokenizer::tokenize;

    fn render(source: &str) -> String {
        parse(tokenize(source).unwrap()).unwrap().to_string()
    }

    #[test]
    fn renders_expressions_fully_parenthesized() {
        assert_eq!(render("x = 2 + 3 * -y"), "x = (2 + (3 * (-y)))\n");
    }

    #[test]
    fn renders_compound_statements_with_four_space_blocks() {
        let source = "f(a, b):\n    if a > b:\n        return a\n    else:\n        return b\n";
        assert_eq!(
            render(source),
            "f(a, b):\n    if (a > b):\n        return a\n    else:\n        return b\n"
        );
    }

    #[test]
    fn re_escapes_string_literals() {
        assert_eq!(render(r#"s = "a\"b\n\\""#), "s = \"a\\\"b\\n\\\\\"\n");
    }

    #[test]
    fn renders_postfix_chains() {
        assert_eq!(
            render("Owner.Attribute(\"HP\").add(m[0][1])"),
            "Owner.Attribute(\"HP\").add(m[0][1])\n"
        );
    }
}

//=====================================================
// End of file
//=====================================================
