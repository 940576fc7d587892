use tree_sitter::Node;

use crate::macros::MacroTable;

/// Maximum macro-to-macro indirection followed when evaluating a body.
const MAX_EXPANSION_DEPTH: usize = 16;

/// Hooks the evaluator needs from the preprocessor state.
pub(crate) trait ConditionContext {
    fn node_text(&self, node: Node<'_>) -> String;

    /// Value of macro `name` used at `node`, reporting the expansion.
    /// `None` if not defined.
    fn expand(&mut self, name: &str, node: Node<'_>) -> Option<i64>;

    /// Answer a `defined(name)` test at `node`, reporting it.
    fn defined(&mut self, name: &str, node: Node<'_>) -> bool;
}

/// Evaluate a `#if`/`#elif` condition. Anything not understood evaluates
/// to 0, like an undefined identifier.
pub(crate) fn evaluate(node: Node<'_>, ctx: &mut impl ConditionContext) -> i64 {
    match node.kind() {
        "number_literal" => parse_integer(&ctx.node_text(node)).unwrap_or(0),
        "char_literal" => char_value(&ctx.node_text(node)),
        "true" => 1,
        "false" | "null" | "nullptr" => 0,
        "identifier" => {
            let name = ctx.node_text(node);
            ctx.expand(&name, node).unwrap_or(0)
        }
        "preproc_defined" => {
            let mut cursor = node.walk();
            let name_node = node
                .named_children(&mut cursor)
                .find(|child| child.kind() == "identifier");
            match name_node {
                Some(name_node) => {
                    let name = ctx.node_text(name_node);
                    i64::from(ctx.defined(&name, name_node))
                }
                None => 0,
            }
        }
        "parenthesized_expression" => match node.named_child(0) {
            Some(inner) => evaluate(inner, ctx),
            None => 0,
        },
        "unary_expression" => {
            let Some(argument) = node.child_by_field_name("argument") else {
                return 0;
            };
            let value = evaluate(argument, ctx);
            match node.child_by_field_name("operator").map(|op| op.kind()) {
                Some("!") => i64::from(value == 0),
                Some("-") => value.wrapping_neg(),
                Some("~") => !value,
                _ => value,
            }
        }
        "binary_expression" => {
            let (Some(left), Some(right), Some(op)) = (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
                node.child_by_field_name("operator"),
            ) else {
                return 0;
            };
            // Both sides are evaluated so that every `defined` and macro use
            // is reported, as a preprocessor lexing the line would.
            let l = evaluate(left, ctx);
            let r = evaluate(right, ctx);
            binary(op.kind(), l, r)
        }
        "conditional_expression" => {
            let (Some(condition), Some(consequence), Some(alternative)) = (
                node.child_by_field_name("condition"),
                node.child_by_field_name("consequence"),
                node.child_by_field_name("alternative"),
            ) else {
                return 0;
            };
            let c = evaluate(condition, ctx);
            let t = evaluate(consequence, ctx);
            let f = evaluate(alternative, ctx);
            if c != 0 {
                t
            } else {
                f
            }
        }
        "call_expression" => {
            // Function-like macro in a condition; its value is not computed.
            if let Some(function) = node.child_by_field_name("function") {
                let name = ctx.node_text(function);
                ctx.expand(&name, function);
            }
            0
        }
        _ => 0,
    }
}

fn binary(op: &str, l: i64, r: i64) -> i64 {
    match op {
        "||" => i64::from(l != 0 || r != 0),
        "&&" => i64::from(l != 0 && r != 0),
        "|" => l | r,
        "^" => l ^ r,
        "&" => l & r,
        "==" => i64::from(l == r),
        "!=" => i64::from(l != r),
        "<" => i64::from(l < r),
        ">" => i64::from(l > r),
        "<=" => i64::from(l <= r),
        ">=" => i64::from(l >= r),
        "<<" => l.wrapping_shl(r as u32),
        ">>" => l.wrapping_shr(r as u32),
        "+" => l.wrapping_add(r),
        "-" => l.wrapping_sub(r),
        "*" => l.wrapping_mul(r),
        "/" => l.checked_div(r).unwrap_or(0),
        "%" => l.checked_rem(r).unwrap_or(0),
        _ => 0,
    }
}

/// Parse a C integer literal, ignoring `u`/`l` suffixes and `'` separators.
pub(crate) fn parse_integer(text: &str) -> Option<i64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '\'').collect();
    let digits = cleaned.trim_end_matches(['u', 'U', 'l', 'L']);
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

fn char_value(text: &str) -> i64 {
    let inner = text.trim_matches('\'');
    match inner {
        "\\n" => 10,
        "\\t" => 9,
        "\\0" => 0,
        "\\\\" => 92,
        _ => inner.chars().next().map_or(0, |c| c as i64),
    }
}

/// Value of a macro body in a condition: an integer literal, possibly
/// parenthesized or negated, or the name of another macro.
pub(crate) fn evaluate_body(body: &str, macros: &MacroTable) -> i64 {
    let mut text = body.trim().to_string();
    for _ in 0..MAX_EXPANSION_DEPTH {
        while text.starts_with('(') && text.ends_with(')') && text.len() >= 2 {
            text = text[1..text.len() - 1].trim().to_string();
        }
        if text.is_empty() {
            return 0;
        }
        if let Some(rest) = text.strip_prefix('-') {
            return parse_integer(rest).map_or(0, |v| -v);
        }
        if let Some(value) = parse_integer(&text) {
            return value;
        }
        match macros.definition(&text) {
            Some(definition) if !definition.is_function_like() => {
                text = definition.body.trim().to_string();
            }
            _ => return 0,
        }
    }
    0
}
