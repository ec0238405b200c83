//! Policy statement parser.
//!
//! Consumes the scanner's token stream (skipping whitespace and comments)
//! and produces [`PolicyStatement`] values: an effect, one scope constraint
//! per slot, and the raw token sequence of each condition clause. Condition
//! contents are not type-checked here; identifiers are classified as entity
//! references, attribute names, or function names by one-token lookahead.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::PolicyError;
use crate::scanner::Scanner;
use crate::token::{SequenceItem, Token};

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Permit,
    Forbid,
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Effect::Permit => write!(f, "permit"),
            Effect::Forbid => write!(f, "forbid"),
        }
    }
}

/// Constraint on the principal or resource slot of a statement scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeConstraint {
    Any,
    Eq(String),
    In(String),
}

/// Constraint on the action slot. Only actions accept the list form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionConstraint {
    Any,
    Eq(String),
    In(Vec<String>),
}

/// Condition clause kind: `when` must hold, `unless` must not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    When,
    Unless,
}

impl Display for ConditionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConditionKind::When => write!(f, "when"),
            ConditionKind::Unless => write!(f, "unless"),
        }
    }
}

/// A `when { … }` or `unless { … }` clause with its raw token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionClause {
    pub kind: ConditionKind,
    pub sequence: Vec<SequenceItem>,
}

impl ConditionClause {
    /// Re-render the clause body from the collected literals.
    pub fn body_text(&self) -> String {
        render_sequence(&self.sequence)
    }
}

/// A single parsed policy statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub principal: ScopeConstraint,
    pub action: ActionConstraint,
    pub resource: ScopeConstraint,
    pub conditions: Vec<ConditionClause>,
}

impl PolicyStatement {
    /// Structured JSON rendering, used in decision metadata and listings.
    pub fn to_json(&self) -> serde_json::Value {
        let scope = |c: &ScopeConstraint| match c {
            ScopeConstraint::Any => serde_json::json!({ "op": "any" }),
            ScopeConstraint::Eq(e) => serde_json::json!({ "op": "==", "entity": e }),
            ScopeConstraint::In(e) => serde_json::json!({ "op": "in", "entity": e }),
        };
        let action = match &self.action {
            ActionConstraint::Any => serde_json::json!({ "op": "any" }),
            ActionConstraint::Eq(e) => serde_json::json!({ "op": "==", "entity": e }),
            ActionConstraint::In(es) => serde_json::json!({ "op": "in", "entities": es }),
        };
        let conditions: Vec<serde_json::Value> = self
            .conditions
            .iter()
            .map(|c| serde_json::json!({ "kind": c.kind.to_string(), "body": c.body_text() }))
            .collect();
        serde_json::json!({
            "effect": self.effect.to_string(),
            "principal": scope(&self.principal),
            "action": action,
            "resource": scope(&self.resource),
            "conditions": conditions,
        })
    }
}

impl Display for PolicyStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} (principal", self.effect)?;
        match &self.principal {
            ScopeConstraint::Any => {}
            ScopeConstraint::Eq(e) => write!(f, " == {e}")?,
            ScopeConstraint::In(e) => write!(f, " in {e}")?,
        }
        write!(f, ", action")?;
        match &self.action {
            ActionConstraint::Any => {}
            ActionConstraint::Eq(e) => write!(f, " == {e}")?,
            ActionConstraint::In(es) if es.len() == 1 => write!(f, " in {}", es[0])?,
            ActionConstraint::In(es) => write!(f, " in [{}]", es.join(", "))?,
        }
        write!(f, ", resource")?;
        match &self.resource {
            ScopeConstraint::Any => {}
            ScopeConstraint::Eq(e) => write!(f, " == {e}")?,
            ScopeConstraint::In(e) => write!(f, " in {e}")?,
        }
        write!(f, ")")?;
        for clause in &self.conditions {
            write!(f, " {} {{ {} }}", clause.kind, clause.body_text())?;
        }
        write!(f, ";")
    }
}

fn render_sequence(sequence: &[SequenceItem]) -> String {
    let mut out = String::new();
    let mut prev: Option<Token> = None;
    for item in sequence {
        let no_space_before = matches!(
            item.token,
            Token::Period | Token::Comma | Token::RightParen | Token::RightSqb | Token::Colon
        ) || prev == Some(Token::Period)
            || (prev == Some(Token::Function) && item.token == Token::LeftParen);
        let no_space_after_prev = matches!(prev, Some(Token::LeftParen) | Some(Token::LeftSqb));
        if !out.is_empty() && !no_space_before && !no_space_after_prev {
            out.push(' ');
        }
        out.push_str(&item.literal);
        prev = Some(item.token);
    }
    out
}

/// Strip the surrounding quotes of a double-quoted string literal and
/// resolve backslash escapes (a backslash makes the next character literal).
fn unquote(lit: &str) -> String {
    let inner: Vec<char> = lit.chars().collect();
    let body = if inner.len() >= 2 {
        &inner[1..inner.len() - 1]
    } else {
        &inner[..]
    };
    let mut out = String::with_capacity(body.len());
    let mut escaped = false;
    for &ch in body {
        if escaped {
            out.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Recursive-descent parser with a one-token pushback buffer.
pub struct Parser {
    scanner: Scanner,
    buf: Option<(Token, String)>,
    use_buf: bool,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Parser {
            scanner: Scanner::new(input),
            buf: None,
            use_buf: false,
        }
    }

    /// Parse the full policy text into statements. Empty input is a valid,
    /// empty policy set.
    pub fn parse(&mut self) -> Result<Vec<PolicyStatement>, PolicyError> {
        let mut statements = Vec::new();

        let (mut tok, mut lit) = self.scan_ignore_whitespace();
        while tok != Token::Eof {
            let effect = match tok {
                Token::Permit => Effect::Permit,
                Token::Forbid => Effect::Forbid,
                _ => {
                    return Err(PolicyError::ParseError(format!(
                        "found \"{lit}\", expected permit or forbid"
                    )))
                }
            };

            self.expect(Token::LeftParen, "left parentheses")?;
            self.expect(Token::Principal, "principal")?;

            let principal = self.parse_scope_slot(Token::Comma, "comma")?;

            self.expect(Token::Action, "action")?;
            let action = self.parse_action_slot()?;

            self.expect(Token::Resource, "resource")?;
            let resource = self.parse_scope_slot(Token::RightParen, "right parentheses")?;

            let mut conditions = Vec::new();
            let (mut next, next_lit) = self.scan_ignore_whitespace();
            let mut next_lit = next_lit;
            while next == Token::When || next == Token::Unless {
                let kind = if next == Token::When {
                    ConditionKind::When
                } else {
                    ConditionKind::Unless
                };
                conditions.push(self.parse_condition_clause(kind)?);
                let scanned = self.scan_ignore_whitespace();
                next = scanned.0;
                next_lit = scanned.1;
            }

            if next != Token::Semicolon {
                return Err(PolicyError::ParseError(format!(
                    "found \"{next_lit}\", expected semicolon"
                )));
            }

            statements.push(PolicyStatement {
                effect,
                principal,
                action,
                resource,
                conditions,
            });

            let scanned = self.scan_ignore_whitespace();
            tok = scanned.0;
            lit = scanned.1;
        }

        Ok(statements)
    }

    /// Parse the constraint of a principal or resource slot, consuming the
    /// closing token (`,` for principal, `)` for resource).
    fn parse_scope_slot(
        &mut self,
        closing: Token,
        closing_name: &str,
    ) -> Result<ScopeConstraint, PolicyError> {
        let (tok, lit) = self.scan_ignore_whitespace();
        match tok {
            _ if tok == closing => Ok(ScopeConstraint::Any),
            Token::Equality => {
                let entity = self.parse_entity()?;
                self.expect(closing, closing_name)?;
                Ok(ScopeConstraint::Eq(entity))
            }
            Token::In => {
                let entity = self.parse_entity()?;
                self.expect(closing, closing_name)?;
                Ok(ScopeConstraint::In(entity))
            }
            _ => Err(PolicyError::ParseError(format!(
                "found \"{lit}\", expected {closing_name}, equality operator, or in"
            ))),
        }
    }

    /// Parse the action constraint, consuming the trailing comma. Actions
    /// additionally accept `in [ E, E, … ]`.
    fn parse_action_slot(&mut self) -> Result<ActionConstraint, PolicyError> {
        let (tok, lit) = self.scan_ignore_whitespace();
        match tok {
            Token::Comma => Ok(ActionConstraint::Any),
            Token::Equality => {
                let entity = self.parse_entity()?;
                self.expect(Token::Comma, "comma")?;
                Ok(ActionConstraint::Eq(entity))
            }
            Token::In => {
                let (tok, lit) = self.scan_ignore_whitespace();
                let parents = if tok == Token::Ident {
                    self.unscan();
                    vec![self.parse_entity()?]
                } else if tok == Token::LeftSqb {
                    let mut parents = Vec::new();
                    let mut sep = Token::Comma;
                    let mut sep_lit = lit;
                    while sep != Token::RightSqb {
                        if sep != Token::Comma {
                            return Err(PolicyError::ParseError(format!(
                                "found \"{sep_lit}\", expected comma or right square bracket"
                            )));
                        }
                        parents.push(self.parse_entity()?);
                        let scanned = self.scan_ignore_whitespace();
                        sep = scanned.0;
                        sep_lit = scanned.1;
                    }
                    parents
                } else {
                    return Err(PolicyError::ParseError(format!(
                        "found \"{lit}\", expected entity or left square bracket"
                    )));
                };
                self.expect(Token::Comma, "comma")?;
                Ok(ActionConstraint::In(parents))
            }
            _ => Err(PolicyError::ParseError(format!(
                "found \"{lit}\", expected comma, equality operator, or in"
            ))),
        }
    }

    /// Collect the raw token sequence of a `when`/`unless` body between the
    /// matching braces, classifying identifiers along the way.
    fn parse_condition_clause(
        &mut self,
        kind: ConditionKind,
    ) -> Result<ConditionClause, PolicyError> {
        let (tok, lit) = self.scan_ignore_whitespace();
        if tok != Token::LeftBrace {
            return Err(PolicyError::ParseError(format!(
                "found \"{lit}\", expected left brace"
            )));
        }

        let mut sequence = Vec::new();
        let mut brace_level = 0u32;

        let (mut tok, mut lit) = self.scan_ignore_whitespace();
        while tok != Token::RightBrace || brace_level > 0 {
            match tok {
                Token::LeftBrace => {
                    sequence.push(SequenceItem::new(tok, lit));
                    brace_level += 1;
                }
                Token::RightBrace => {
                    sequence.push(SequenceItem::new(tok, lit));
                    brace_level -= 1;
                }
                Token::Ident => {
                    self.unscan();
                    sequence.push(self.parse_entity_or_callable()?);
                }
                Token::Period => {
                    sequence.push(SequenceItem::new(tok, lit));
                    let (tok, lit) = self.scan();
                    if tok != Token::Ident {
                        return Err(PolicyError::ParseError(format!(
                            "found \"{lit}\", expected attribute or function"
                        )));
                    }
                    let (peek, _) = self.scan();
                    self.unscan();
                    if peek == Token::LeftParen {
                        sequence.push(SequenceItem::new(Token::Function, lit));
                    } else {
                        sequence.push(SequenceItem::new(Token::Attribute, lit));
                    }
                }
                Token::Long => {
                    let value: i64 = lit
                        .parse()
                        .map_err(|_| PolicyError::ParseError("error parsing long".into()))?;
                    sequence.push(SequenceItem::with_normalized(tok, lit, value.to_string()));
                }
                Token::DblQuoteStr => {
                    let normalized = unquote(&lit);
                    sequence.push(SequenceItem::with_normalized(tok, lit, normalized));
                }
                Token::True
                | Token::False
                | Token::Principal
                | Token::Action
                | Token::Resource
                | Token::Context
                | Token::LeftSqb
                | Token::RightSqb
                | Token::LeftParen
                | Token::RightParen
                | Token::Comma
                | Token::Colon
                | Token::Has
                | Token::Like
                | Token::Equality
                | Token::Inequality
                | Token::Lt
                | Token::Lte
                | Token::Gt
                | Token::Gte
                | Token::In
                | Token::Exclamation
                | Token::Dash
                | Token::Plus
                | Token::Multiplier
                | Token::And
                | Token::Or
                | Token::If
                | Token::Then
                | Token::Else => {
                    sequence.push(SequenceItem::new(tok, lit));
                }
                _ => {
                    return Err(PolicyError::ParseError(format!(
                        "unexpected token found in condition clause \"{lit}\" ({tok:?})"
                    )));
                }
            }

            let scanned = self.scan_ignore_whitespace();
            tok = scanned.0;
            lit = scanned.1;
        }

        Ok(ConditionClause { kind, sequence })
    }

    /// Parse a full entity reference `Id(::Id)*::"name"`.
    fn parse_entity(&mut self) -> Result<String, PolicyError> {
        let (tok, lit) = self.scan_ignore_whitespace();
        if tok != Token::Ident {
            return Err(PolicyError::ParseError(format!(
                "found \"{lit}\", expected entity namespace"
            )));
        }
        let mut name = lit;

        let (tok, lit) = self.scan();
        if tok != Token::Namespace {
            return Err(PolicyError::ParseError(format!(
                "found \"{lit}\", expected namespace separator"
            )));
        }
        name.push_str("::");

        loop {
            let (tok, lit) = self.scan();
            match tok {
                Token::Ident => {
                    name.push_str(&lit);
                    let (tok, lit) = self.scan();
                    if tok != Token::Namespace {
                        return Err(PolicyError::ParseError(format!(
                            "found \"{lit}\", expected subnamespace separator"
                        )));
                    }
                    name.push_str("::");
                }
                Token::DblQuoteStr => {
                    name.push_str(&lit);
                    return Ok(name);
                }
                _ => {
                    return Err(PolicyError::ParseError(format!(
                        "found \"{lit}\", expected double quoted string or entity namespace"
                    )));
                }
            }
        }
    }

    /// Classify an identifier inside a condition clause: followed by `(` it
    /// is a function, by `::` an entity reference, otherwise an attribute.
    fn parse_entity_or_callable(&mut self) -> Result<SequenceItem, PolicyError> {
        let (tok, lit) = self.scan_ignore_whitespace();
        if tok != Token::Ident {
            return Err(PolicyError::ParseError(format!(
                "found \"{lit}\", expected identifier"
            )));
        }
        let name = lit;

        let (peek, _) = self.scan();
        match peek {
            Token::LeftParen => {
                self.unscan();
                Ok(SequenceItem::new(Token::Function, name))
            }
            Token::Namespace => {
                let mut full = name;
                full.push_str("::");
                loop {
                    let (tok, lit) = self.scan();
                    match tok {
                        Token::Ident => {
                            full.push_str(&lit);
                            let (tok, lit) = self.scan();
                            if tok != Token::Namespace {
                                return Err(PolicyError::ParseError(format!(
                                    "found \"{lit}\", expected subnamespace separator"
                                )));
                            }
                            full.push_str("::");
                        }
                        Token::DblQuoteStr => {
                            full.push_str(&lit);
                            return Ok(SequenceItem::new(Token::Entity, full));
                        }
                        _ => {
                            return Err(PolicyError::ParseError(format!(
                                "found \"{lit}\", expected double quoted string or entity namespace"
                            )));
                        }
                    }
                }
            }
            _ => {
                self.unscan();
                Ok(SequenceItem::new(Token::Attribute, name))
            }
        }
    }

    fn expect(&mut self, expected: Token, name: &str) -> Result<(), PolicyError> {
        let (tok, lit) = self.scan_ignore_whitespace();
        if tok != expected {
            return Err(PolicyError::ParseError(format!(
                "found \"{lit}\", expected {name}"
            )));
        }
        Ok(())
    }

    fn scan(&mut self) -> (Token, String) {
        if self.use_buf {
            self.use_buf = false;
            return self
                .buf
                .clone()
                .unwrap_or((Token::Eof, String::new()));
        }
        let scanned = self.scanner.scan();
        self.buf = Some(scanned.clone());
        scanned
    }

    fn scan_ignore_whitespace(&mut self) -> (Token, String) {
        loop {
            let (tok, lit) = self.scan();
            if tok != Token::Whitespace && tok != Token::Comment {
                return (tok, lit);
            }
        }
    }

    fn unscan(&mut self) {
        self.use_buf = true;
    }
}
