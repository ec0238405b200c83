//! Condition-clause expression evaluator.
//!
//! A clause's token sequence is reduced in two passes: a shunting-yard
//! rewrite into postfix order, then a stack reduction over the closed
//! runtime value domain. Runtime failures (type mismatches, missing
//! attributes, absent entity store) become first-class error values on the
//! stack; `&&`, `||`, and `if-then-else` suppress errors from operands that
//! could not affect the result when short-circuiting is enabled, and every
//! other operator propagates them.

mod decimal;
mod funcs;
mod ipaddr;
mod value;
mod wildcard;

use std::collections::BTreeMap;

use crate::error::PolicyError;
use crate::store::EntityStore;
use crate::token::{SequenceItem, Token};
use crate::types::AttrValue;

use value::{Branch, StackItem, Value};

/// Request-scoped inputs for one condition evaluation.
pub(crate) struct EvalContext<'a> {
    pub principal: &'a str,
    pub action: &'a str,
    pub resource: &'a str,
    pub context: &'a BTreeMap<String, AttrValue>,
    pub store: Option<&'a EntityStore>,
    pub allow_short_circuit: bool,
}

/// Operator precedence, low to high. Zero means "not a precedence-governed
/// operator": `has`, `if`, `then`, and `else` bind below everything.
const fn precedence(token: Token) -> u8 {
    match token {
        Token::And | Token::Or => 2,
        Token::Equality
        | Token::Inequality
        | Token::Lt
        | Token::Lte
        | Token::Gt
        | Token::Gte
        | Token::In
        | Token::Like => 3,
        Token::Plus | Token::Dash => 4,
        Token::Multiplier | Token::Exclamation => 5,
        Token::Period => 6,
        Token::Function | Token::RightSqb | Token::RightBrace => 7,
        _ => 0,
    }
}

/// The left-associative operators. `||` is left-associative so the left
/// operand settles first; `&&` is not, and `!` is excluded so stacked
/// negations (`!!e`) nest as operands of each other.
const fn is_left_associative(token: Token) -> bool {
    matches!(
        token,
        Token::Lt
            | Token::Lte
            | Token::Gt
            | Token::Gte
            | Token::In
            | Token::Like
            | Token::Dash
            | Token::Period
            | Token::Function
            | Token::Or
    )
}

/// Evaluate one condition clause to a boolean.
pub(crate) fn eval_condition(
    sequence: &[SequenceItem],
    ctx: &EvalContext<'_>,
) -> Result<bool, PolicyError> {
    let rewritten = parenthesize_if_then_else(sequence)?;
    let rpn = to_rpn(rewritten, ctx)?;
    reduce(rpn, ctx)
}

/// Open groups tracked while inserting `if-then-else` operand parentheses.
enum Group {
    Paren,
    Sqb,
    Brace,
    IfCond,
    ThenOp,
    ElseOp,
}

/// Rewrite the sequence so that the operands of `if`, `then`, and `else`
/// are explicitly parenthesized: `if C then T else E` becomes
/// `if ( C ) then ( T ) else ( E )`, with the else operand extending to the
/// end of its enclosing group. The ordinary shunting yard then handles
/// nested conditionals with no special cases.
fn parenthesize_if_then_else(
    sequence: &[SequenceItem],
) -> Result<Vec<SequenceItem>, PolicyError> {
    if !sequence.iter().any(|item| item.token == Token::If) {
        return Ok(sequence.to_vec());
    }

    let open = || SequenceItem::new(Token::LeftParen, "(");
    let close = || SequenceItem::new(Token::RightParen, ")");

    let mut out: Vec<SequenceItem> = Vec::with_capacity(sequence.len() + 8);
    let mut groups: Vec<Group> = Vec::new();

    for item in sequence {
        match item.token {
            Token::If => {
                out.push(item.clone());
                out.push(open());
                groups.push(Group::IfCond);
            }
            Token::Then => {
                while matches!(groups.last(), Some(Group::ElseOp)) {
                    out.push(close());
                    groups.pop();
                }
                match groups.pop() {
                    Some(Group::IfCond) => {
                        out.push(close());
                        out.push(item.clone());
                        out.push(open());
                        groups.push(Group::ThenOp);
                    }
                    _ => {
                        return Err(PolicyError::EvalError(
                            "found then without matching if".into(),
                        ))
                    }
                }
            }
            Token::Else => {
                while matches!(groups.last(), Some(Group::ElseOp)) {
                    out.push(close());
                    groups.pop();
                }
                match groups.pop() {
                    Some(Group::ThenOp) => {
                        out.push(close());
                        out.push(item.clone());
                        out.push(open());
                        groups.push(Group::ElseOp);
                    }
                    _ => {
                        return Err(PolicyError::EvalError(
                            "found else without matching then".into(),
                        ))
                    }
                }
            }
            Token::LeftParen => {
                out.push(item.clone());
                groups.push(Group::Paren);
            }
            Token::LeftSqb => {
                out.push(item.clone());
                groups.push(Group::Sqb);
            }
            Token::LeftBrace => {
                out.push(item.clone());
                groups.push(Group::Brace);
            }
            Token::RightParen | Token::RightSqb | Token::RightBrace => {
                while matches!(groups.last(), Some(Group::ElseOp)) {
                    out.push(close());
                    groups.pop();
                }
                let matches_opener = match item.token {
                    Token::RightParen => matches!(groups.last(), Some(Group::Paren)),
                    Token::RightSqb => matches!(groups.last(), Some(Group::Sqb)),
                    _ => matches!(groups.last(), Some(Group::Brace)),
                };
                if matches_opener {
                    groups.pop();
                }
                out.push(item.clone());
            }
            Token::Comma => {
                while matches!(groups.last(), Some(Group::ElseOp)) {
                    out.push(close());
                    groups.pop();
                }
                out.push(item.clone());
            }
            _ => out.push(item.clone()),
        }
    }

    while let Some(group) = groups.pop() {
        match group {
            Group::ElseOp => out.push(close()),
            Group::IfCond => {
                return Err(PolicyError::EvalError("found if without then".into()))
            }
            Group::ThenOp => {
                return Err(PolicyError::EvalError("found then without else".into()))
            }
            // Unbalanced user parentheses surface in the shunting pass.
            _ => {}
        }
    }

    Ok(out)
}

/// Shunting-yard rewrite into postfix order. The request slot keywords are
/// substituted with their concrete entity references here.
fn to_rpn(
    sequence: Vec<SequenceItem>,
    ctx: &EvalContext<'_>,
) -> Result<Vec<SequenceItem>, PolicyError> {
    let mut output: Vec<SequenceItem> = Vec::with_capacity(sequence.len());
    let mut operators: Vec<SequenceItem> = Vec::new();

    for mut item in sequence {
        match item.token {
            Token::True
            | Token::False
            | Token::Long
            | Token::DblQuoteStr
            | Token::Entity
            | Token::Attribute
            | Token::Context
            | Token::LeftSqb
            | Token::LeftBrace
            | Token::Comma
            | Token::Colon => output.push(item),
            // Collection closers go straight to the output queue: their
            // elements are literal pushes, so the closer follows them
            // immediately and nested collections reduce inside-out.
            Token::RightSqb | Token::RightBrace => output.push(item),
            Token::Principal => {
                item.token = Token::Entity;
                item.normalized = ctx.principal.to_string();
                output.push(item);
            }
            Token::Action => {
                item.token = Token::Entity;
                item.normalized = ctx.action.to_string();
                output.push(item);
            }
            Token::Resource => {
                item.token = Token::Entity;
                item.normalized = ctx.resource.to_string();
                output.push(item);
            }
            Token::Function | Token::LeftParen => {
                operators.push(item);
            }
            Token::RightParen => loop {
                match operators.pop() {
                    None => {
                        return Err(PolicyError::EvalError("mismatched parenthesis".into()))
                    }
                    Some(top) if top.token == Token::LeftParen => break,
                    Some(top) => output.push(top),
                }
            },
            Token::Equality
            | Token::Inequality
            | Token::And
            | Token::Or
            | Token::Lt
            | Token::Lte
            | Token::Gt
            | Token::Gte
            | Token::Plus
            | Token::Dash
            | Token::Multiplier
            | Token::In
            | Token::Has
            | Token::Like
            | Token::Period
            | Token::Exclamation
            | Token::If
            | Token::Then
            | Token::Else => {
                let incoming = precedence(item.token);
                loop {
                    let should_pop = match operators.last() {
                        Some(top) => {
                            let top_prec = precedence(top.token);
                            top_prec != 0
                                && (top_prec > incoming
                                    || (top_prec == incoming && is_left_associative(item.token)))
                        }
                        None => false,
                    };
                    if !should_pop {
                        break;
                    }
                    if let Some(popped) = operators.pop() {
                        output.push(popped);
                    }
                }
                operators.push(item);
            }
            _ => {
                return Err(PolicyError::EvalError(format!(
                    "unknown token: {:?}",
                    item.token
                )))
            }
        }
    }

    while let Some(top) = operators.pop() {
        if top.token == Token::LeftParen {
            return Err(PolicyError::EvalError("mismatched parenthesis".into()));
        }
        output.push(top);
    }

    Ok(output)
}

fn pop_item(stack: &mut Vec<StackItem>) -> Result<StackItem, PolicyError> {
    stack
        .pop()
        .ok_or_else(|| PolicyError::EvalError("invalid stack state".into()))
}

fn pop_value(stack: &mut Vec<StackItem>) -> Result<Value, PolicyError> {
    match pop_item(stack)? {
        StackItem::Value(v) => Ok(v),
        _ => Err(PolicyError::EvalError("invalid stack state".into())),
    }
}

fn merge_errors(a: String, b: String) -> String {
    format!("{a}; {b}")
}

fn access_attribute(lhs: Value, name: &str, ctx: &EvalContext<'_>) -> Value {
    match lhs {
        Value::Error(e) => Value::Error(e),
        Value::Entity(uid) => match ctx.store {
            None => Value::Error("invalid attribute access (no entities available)".into()),
            Some(store) => match store.attribute(&uid, name) {
                Some(attr) => Value::from_attr(attr),
                None => Value::Error("attribute not set".into()),
            },
        },
        Value::Record(map) => match map.get(name) {
            Some(v) => v.clone(),
            None => Value::Error("attribute not set".into()),
        },
        other => Value::Error(format!(
            "invalid attribute access on {} value",
            other.type_name()
        )),
    }
}

fn branch_of(v: Value) -> Result<Branch, PolicyError> {
    match v {
        Value::Bool(b) => Ok(Branch::Bool(b)),
        Value::Error(e) => Ok(Branch::Error(e)),
        other => Err(PolicyError::EvalError(format!(
            "invalid use of if-then-else block, got {}",
            other.type_name()
        ))),
    }
}

/// Reduce a postfix sequence to a single boolean.
fn reduce(rpn: Vec<SequenceItem>, ctx: &EvalContext<'_>) -> Result<bool, PolicyError> {
    let mut stack: Vec<StackItem> = Vec::new();

    for item in rpn {
        match item.token {
            Token::Comma => {}
            Token::True => stack.push(StackItem::Value(Value::Bool(true))),
            Token::False => stack.push(StackItem::Value(Value::Bool(false))),
            Token::Long => {
                let value: i64 = item
                    .normalized
                    .parse()
                    .map_err(|_| PolicyError::EvalError("error parsing long".into()))?;
                stack.push(StackItem::Value(Value::Long(value)));
            }
            Token::DblQuoteStr => {
                stack.push(StackItem::Value(Value::Str(item.normalized)));
            }
            Token::Entity => stack.push(StackItem::Value(Value::Entity(item.normalized))),
            Token::Attribute => stack.push(StackItem::AttrName(item.normalized)),
            Token::Context => stack.push(StackItem::Value(Value::Record(Value::from_attr_map(
                ctx.context,
            )))),
            Token::LeftSqb => stack.push(StackItem::SetOpen),
            Token::LeftBrace => stack.push(StackItem::RecordOpen),
            Token::Colon => stack.push(StackItem::Colon),

            Token::Exclamation => {
                let operand = pop_value(&mut stack)?;
                let result = match operand {
                    Value::Error(e) => Value::Error(e),
                    Value::Bool(b) => Value::Bool(!b),
                    other => Value::Error(format!(
                        "attempted to negate non-boolean value ({})",
                        other.type_name()
                    )),
                };
                stack.push(StackItem::Value(result));
            }

            Token::Else => {
                let operand = pop_value(&mut stack)?;
                let branch = branch_of(operand)?;
                stack.push(StackItem::Else(branch));
            }
            Token::Then => {
                let else_part = match pop_item(&mut stack)? {
                    StackItem::Else(branch) => branch,
                    _ => {
                        return Err(PolicyError::EvalError(
                            "invalid use of if-then-else block".into(),
                        ))
                    }
                };
                let then_part = branch_of(pop_value(&mut stack)?)?;
                stack.push(StackItem::ThenElse {
                    then: then_part,
                    other: else_part,
                });
            }
            Token::If => {
                let (then_part, else_part) = match pop_item(&mut stack)? {
                    StackItem::ThenElse { then, other } => (then, other),
                    _ => {
                        return Err(PolicyError::EvalError(
                            "invalid use of if-then-else block".into(),
                        ))
                    }
                };
                let condition = pop_value(&mut stack)?;
                let result = match condition {
                    Value::Error(e) => Value::Error(e),
                    Value::Bool(c) => {
                        let (chosen, unchosen) = if c {
                            (then_part, else_part)
                        } else {
                            (else_part, then_part)
                        };
                        match chosen {
                            Branch::Error(e) => Value::Error(e),
                            Branch::Bool(b) => {
                                if !ctx.allow_short_circuit {
                                    if let Branch::Error(e) = unchosen {
                                        Value::Error(e)
                                    } else {
                                        Value::Bool(b)
                                    }
                                } else {
                                    Value::Bool(b)
                                }
                            }
                        }
                    }
                    other => {
                        return Err(PolicyError::EvalError(format!(
                            "invalid use of if-then-else block, got {}",
                            other.type_name()
                        )))
                    }
                };
                stack.push(StackItem::Value(result));
            }

            Token::Function => {
                let name = item.normalized;
                if name == "ip" || name == "decimal" {
                    let arg = pop_value(&mut stack)?;
                    stack.push(StackItem::Value(funcs::call_constructor(&name, arg)));
                } else {
                    stack.push(StackItem::Func(name));
                }
            }

            Token::Period => match pop_item(&mut stack)? {
                StackItem::AttrName(name) => {
                    let lhs = pop_value(&mut stack)?;
                    stack.push(StackItem::Value(access_attribute(lhs, &name, ctx)));
                }
                StackItem::Func(name) => match funcs::method_arity(&name) {
                    Some(0) => {
                        let receiver = pop_value(&mut stack)?;
                        stack.push(StackItem::Value(funcs::apply_method(&name, receiver, None)));
                    }
                    Some(_) => {
                        let arg = pop_value(&mut stack)?;
                        let receiver = pop_value(&mut stack)?;
                        stack.push(StackItem::Value(funcs::apply_method(
                            &name,
                            receiver,
                            Some(arg),
                        )));
                    }
                    None => {
                        return Err(PolicyError::EvalError(format!("unknown function: {name}")))
                    }
                },
                _ => return Err(PolicyError::EvalError("invalid stack state".into())),
            },

            Token::RightSqb => {
                let mut elements: Vec<Value> = Vec::new();
                let mut first_error: Option<String> = None;
                loop {
                    match pop_item(&mut stack)? {
                        StackItem::SetOpen => break,
                        StackItem::Value(Value::Error(e)) => first_error = Some(e),
                        StackItem::Value(v) => elements.push(v),
                        _ => {
                            return Err(PolicyError::EvalError("invalid stack state".into()))
                        }
                    }
                }
                match first_error {
                    Some(e) => stack.push(StackItem::Value(Value::Error(e))),
                    None => {
                        elements.reverse();
                        stack.push(StackItem::Value(Value::Set(elements)));
                    }
                }
            }

            Token::RightBrace => {
                let mut collected: Vec<StackItem> = Vec::new();
                loop {
                    match pop_item(&mut stack)? {
                        StackItem::RecordOpen => break,
                        it @ (StackItem::Value(_) | StackItem::Colon) => collected.push(it),
                        _ => {
                            return Err(PolicyError::EvalError("invalid stack state".into()))
                        }
                    }
                }
                collected.reverse();
                let mut map: BTreeMap<String, Value> = BTreeMap::new();
                let mut first_error: Option<String> = None;
                let mut iter = collected.into_iter();
                loop {
                    let key = match iter.next() {
                        None => break,
                        Some(StackItem::Value(Value::Str(k))) => k,
                        Some(StackItem::Value(Value::Error(e))) => {
                            first_error = Some(e);
                            break;
                        }
                        Some(_) => {
                            return Err(PolicyError::EvalError(
                                "record keys must be strings".into(),
                            ))
                        }
                    };
                    match iter.next() {
                        Some(StackItem::Colon) => {}
                        _ => {
                            return Err(PolicyError::EvalError("invalid record literal".into()))
                        }
                    }
                    match iter.next() {
                        Some(StackItem::Value(Value::Error(e))) => {
                            first_error = Some(e);
                            break;
                        }
                        Some(StackItem::Value(v)) => {
                            map.insert(key, v);
                        }
                        _ => {
                            return Err(PolicyError::EvalError("invalid record literal".into()))
                        }
                    }
                }
                match first_error {
                    Some(e) => stack.push(StackItem::Value(Value::Error(e))),
                    None => stack.push(StackItem::Value(Value::Record(map))),
                }
            }

            Token::Like => {
                let rhs = pop_value(&mut stack)?;
                let lhs = pop_value(&mut stack)?;
                stack.push(StackItem::Value(funcs::like(lhs, rhs)));
            }

            Token::In => {
                let rhs = pop_value(&mut stack)?;
                let lhs = pop_value(&mut stack)?;
                let result = match (lhs, rhs) {
                    (Value::Error(a), Value::Error(b)) => Value::Error(merge_errors(a, b)),
                    (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e),
                    (Value::Entity(l), Value::Entity(r)) => {
                        if l == r {
                            Value::Bool(true)
                        } else {
                            match ctx.store {
                                None => Value::Bool(false),
                                Some(store) => Value::Bool(
                                    store
                                        .descendants(std::slice::from_ref(&r))
                                        .contains(&l),
                                ),
                            }
                        }
                    }
                    (Value::Entity(_), _) => Value::Bool(false),
                    (other, _) => Value::Error(format!(
                        "in requires an entity left operand, got {}",
                        other.type_name()
                    )),
                };
                stack.push(StackItem::Value(result));
            }

            Token::Has => {
                let name = match pop_item(&mut stack)? {
                    StackItem::AttrName(name) => name,
                    _ => return Err(PolicyError::EvalError("invalid stack state".into())),
                };
                let lhs = pop_value(&mut stack)?;
                let result = match lhs {
                    Value::Error(e) => Value::Error(e),
                    Value::Entity(uid) => match ctx.store {
                        None => Value::Bool(false),
                        Some(store) => Value::Bool(store.has_attribute(&uid, &name)),
                    },
                    other => Value::Error(format!(
                        "has requires an entity left operand, got {}",
                        other.type_name()
                    )),
                };
                stack.push(StackItem::Value(result));
            }

            Token::Lt
            | Token::Lte
            | Token::Gt
            | Token::Gte
            | Token::Plus
            | Token::Dash
            | Token::Multiplier => {
                let rhs = pop_value(&mut stack)?;
                let lhs = pop_value(&mut stack)?;
                let result = match (lhs, rhs) {
                    (Value::Error(a), Value::Error(b)) => Value::Error(merge_errors(a, b)),
                    (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e),
                    // Arithmetic wraps on 64-bit signed overflow.
                    (Value::Long(a), Value::Long(b)) => match item.token {
                        Token::Lt => Value::Bool(a < b),
                        Token::Lte => Value::Bool(a <= b),
                        Token::Gt => Value::Bool(a > b),
                        Token::Gte => Value::Bool(a >= b),
                        Token::Plus => Value::Long(a.wrapping_add(b)),
                        Token::Dash => Value::Long(a.wrapping_sub(b)),
                        _ => Value::Long(a.wrapping_mul(b)),
                    },
                    (a, b) => Value::Error(format!(
                        "operator {} requires long operands, got {} and {}",
                        item.literal,
                        a.type_name(),
                        b.type_name()
                    )),
                };
                stack.push(StackItem::Value(result));
            }

            Token::Equality | Token::Inequality => {
                let rhs = pop_value(&mut stack)?;
                let lhs = pop_value(&mut stack)?;
                let result = match (lhs, rhs) {
                    (Value::Error(a), Value::Error(b)) => Value::Error(merge_errors(a, b)),
                    (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e),
                    (lhs, rhs) => {
                        let equal = lhs == rhs;
                        Value::Bool(if item.token == Token::Equality {
                            equal
                        } else {
                            !equal
                        })
                    }
                };
                stack.push(StackItem::Value(result));
            }

            Token::And => {
                let rhs = pop_value(&mut stack)?;
                let lhs = pop_value(&mut stack)?;
                let result = if ctx.allow_short_circuit && lhs == Value::Bool(false) {
                    Value::Bool(false)
                } else {
                    match (lhs, rhs) {
                        (Value::Error(a), Value::Error(b)) => Value::Error(merge_errors(a, b)),
                        (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e),
                        (Value::Bool(a), Value::Bool(b)) => Value::Bool(a && b),
                        (a, b) => Value::Error(format!(
                            "logical && requires boolean operands, got {} and {}",
                            a.type_name(),
                            b.type_name()
                        )),
                    }
                };
                stack.push(StackItem::Value(result));
            }
            Token::Or => {
                let rhs = pop_value(&mut stack)?;
                let lhs = pop_value(&mut stack)?;
                let result = if ctx.allow_short_circuit && lhs == Value::Bool(true) {
                    Value::Bool(true)
                } else {
                    match (lhs, rhs) {
                        (Value::Error(a), Value::Error(b)) => Value::Error(merge_errors(a, b)),
                        (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e),
                        (Value::Bool(a), Value::Bool(b)) => Value::Bool(a || b),
                        (a, b) => Value::Error(format!(
                            "logical || requires boolean operands, got {} and {}",
                            a.type_name(),
                            b.type_name()
                        )),
                    }
                };
                stack.push(StackItem::Value(result));
            }

            _ => {
                return Err(PolicyError::EvalError(format!(
                    "unknown token: {:?}",
                    item.token
                )))
            }
        }
    }

    if stack.len() != 1 {
        return Err(PolicyError::EvalError("invalid stack state".into()));
    }
    match stack.pop() {
        Some(StackItem::Value(Value::Bool(b))) => Ok(b),
        Some(StackItem::Value(Value::Error(e))) => Err(PolicyError::EvalError(e)),
        _ => Err(PolicyError::EvalError("invalid stack state".into())),
    }
}
