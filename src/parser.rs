//! Recursive-descent parser from the nested token structure to a [`Node`]
//! tree.
//!
//! Each precedence tier has its own function, loosest first:
//! `or`, `and`, comparison, additive, multiplicative, power, unary minus,
//! then primaries (literals, fields, brackets and function calls). Brackets
//! and function arguments are already grouped by the tokenizer, so each group
//! is parsed independently from its own inner tokens.

use tracing::{debug, trace};

use crate::{
    ast::{BinOp, Call, GroupKind, Node, Token, TokenGroup, TokenKind, TokenTree},
    context::ExpressionContext,
    error::{ParseError, ParseResult},
    expression::Expression,
    field_index::FieldIndex,
    functions::{FunctionDef, Signature, registry},
    lexer,
    value::{Val, parse_number},
};

/// Turns expression text into an [`Expression`].
///
/// # Examples
/// ```
/// use stroomql::{FieldIndex, Parser, Val};
///
/// let fields = FieldIndex::with_fields(["val1"]);
/// let expression = Parser::default().parse(&fields, "concat(${val1}, ' is ', 'it')").unwrap();
/// let mut generator = expression.create_generator();
/// generator.set(&[Val::from("this")]);
/// assert_eq!(generator.eval(), Val::from("this is it"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parser {
    context: ExpressionContext,
}

impl Parser {
    pub fn with_context(context: ExpressionContext) -> Self {
        Parser { context }
    }

    pub fn context(&self) -> &ExpressionContext {
        &self.context
    }

    /// Parse `input`, resolving `${name}` references against `fields`.
    pub fn parse(&self, fields: &FieldIndex, input: &str) -> ParseResult<Expression> {
        let result = lexer::tokenize(input)
            .map_err(ParseError::from)
            .and_then(|root| parse_group_inner(fields, &root));
        match result {
            Ok(root) => Ok(Expression::new(root, self.context.clone())),
            Err(e) => {
                debug!(input, error = %e, "failed to parse expression");
                Err(e)
            }
        }
    }
}

fn parse_group_inner(fields: &FieldIndex, group: &TokenGroup) -> ParseResult<Node> {
    parse_tokens(fields, group.inner())
}

/// Parse one complete expression from a run of tokens.
fn parse_tokens(fields: &FieldIndex, children: &[TokenTree]) -> ParseResult<Node> {
    let items: Vec<&TokenTree> = children.iter().filter(|c| !c.is_whitespace()).collect();
    if items.is_empty() {
        return Err(ParseError::EmptyExpression);
    }

    let mut cursor = Cursor { fields, items, pos: 0 };
    let node = cursor.parse_or()?;
    match cursor.peek() {
        None => Ok(node),
        Some(TokenTree::Token(t)) if t.kind == TokenKind::Comma => {
            Err(ParseError::UnexpectedComma { position: t.start })
        }
        Some(extra) => Err(unexpected(extra)),
    }
}

fn unexpected(tree: &TokenTree) -> ParseError {
    ParseError::UnexpectedToken {
        token: tree.to_string(),
        position: tree.start(),
    }
}

struct Cursor<'a> {
    fields: &'a FieldIndex,
    /// Non-whitespace items of the run being parsed
    items: Vec<&'a TokenTree>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a TokenTree> {
        self.items.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<&'a TokenTree> {
        let item = self.peek();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    /// Next token if it is a binary operator of the given precedence.
    fn peek_operator(&self, precedence: u8) -> Option<(BinOp, &'a Token)> {
        let token = self.peek()?.as_token()?;
        BinOp::from_token(token.kind)
            .filter(|op| op.precedence() == precedence)
            .map(|op| (op, token))
    }

    /// Operand following `operator`, which must not end the run.
    fn operand_after(
        &mut self,
        operator: &Token,
        operand: fn(&mut Self) -> ParseResult<Node>,
    ) -> ParseResult<Node> {
        if self.peek().is_none() {
            return Err(ParseError::TrailingOperator {
                token: operator.text.clone(),
                position: operator.start,
            });
        }
        operand(self)
    }

    /// Left-associative run of operators sharing one precedence.
    fn fold_left(&mut self, precedence: u8, operand: fn(&mut Self) -> ParseResult<Node>) -> ParseResult<Node> {
        let mut left = operand(self)?;
        while let Some((op, token)) = self.peek_operator(precedence) {
            self.pos += 1;
            let right = self.operand_after(token, operand)?;
            left = Node::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> ParseResult<Node> {
        self.fold_left(BinOp::Or.precedence(), Self::parse_and)
    }

    fn parse_and(&mut self) -> ParseResult<Node> {
        self.fold_left(BinOp::And.precedence(), Self::parse_comparison)
    }

    /// Comparisons do not chain: `a < b < c` is rejected.
    fn parse_comparison(&mut self) -> ParseResult<Node> {
        let precedence = BinOp::Equals.precedence();
        let left = self.parse_additive()?;
        let Some((op, token)) = self.peek_operator(precedence) else {
            return Ok(left);
        };
        self.pos += 1;
        let right = self.operand_after(token, Self::parse_additive)?;
        if let Some((_, next)) = self.peek_operator(precedence) {
            return Err(ParseError::UnexpectedToken {
                token: next.text.clone(),
                position: next.start,
            });
        }
        Ok(Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> ParseResult<Node> {
        self.fold_left(BinOp::Add.precedence(), Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Node> {
        self.fold_left(BinOp::Multiply.precedence(), Self::parse_power)
    }

    fn parse_power(&mut self) -> ParseResult<Node> {
        self.fold_left(BinOp::Power.precedence(), Self::parse_unary)
    }

    /// Unary minus. A minus directly before a number folds into the literal.
    fn parse_unary(&mut self) -> ParseResult<Node> {
        let Some(TokenTree::Token(minus)) = self.peek() else {
            return self.parse_primary();
        };
        if minus.kind != TokenKind::Negate {
            return self.parse_primary();
        }
        self.pos += 1;

        if let Some(TokenTree::Token(number)) = self.peek() {
            if number.kind == TokenKind::Number {
                self.pos += 1;
                let value = number_literal(number)?;
                return Ok(Node::Literal(Val::Double(-value)));
            }
        }
        let operand = self.operand_after(minus, Self::parse_unary)?;
        Ok(Node::Negate(Box::new(operand)))
    }

    fn parse_primary(&mut self) -> ParseResult<Node> {
        let Some(item) = self.advance() else {
            return Err(ParseError::EmptyExpression);
        };
        let token = match item {
            TokenTree::Group(group) => return self.parse_group(group),
            TokenTree::Token(token) => token,
        };

        match token.kind {
            TokenKind::Number => Ok(Node::Literal(Val::Double(number_literal(token)?))),
            TokenKind::SingleQuoted | TokenKind::DoubleQuoted => token
                .unquoted()
                .map(|s| Node::Literal(Val::String(s)))
                .ok_or_else(|| ParseError::MalformedLiteral {
                    text: token.text.clone(),
                    position: token.start,
                }),
            TokenKind::Field => {
                let name = token.field_name().unwrap_or_default();
                let index = self.fields.get(name).ok_or_else(|| ParseError::UnresolvedField {
                    name: name.to_string(),
                    position: token.start,
                })?;
                Ok(Node::Field {
                    name: name.to_string(),
                    index,
                })
            }
            TokenKind::Comma => Err(ParseError::UnexpectedComma { position: token.start }),
            kind if kind.is_binary_operator() => Err(ParseError::LeadingOperator {
                token: token.text.clone(),
                position: token.start,
            }),
            _ => Err(ParseError::UnexpectedToken {
                token: token.text.clone(),
                position: token.start,
            }),
        }
    }

    fn parse_group(&mut self, group: &'a TokenGroup) -> ParseResult<Node> {
        match &group.kind {
            GroupKind::Brackets => {
                if group.inner().iter().all(TokenTree::is_whitespace) {
                    return Err(ParseError::UnexpectedToken {
                        token: group.text(),
                        position: group.start,
                    });
                }
                let inner = parse_group_inner(self.fields, group)?;
                Ok(Node::Brackets(Box::new(inner)))
            }
            GroupKind::Function(name) => parse_call(self.fields, name, group),
            GroupKind::Root | GroupKind::Pipe => Err(ParseError::UnexpectedToken {
                token: group.text(),
                position: group.start,
            }),
        }
    }
}

fn number_literal(token: &Token) -> ParseResult<f64> {
    parse_number(&token.text)
        .filter(|d| d.is_finite())
        .ok_or_else(|| ParseError::MalformedLiteral {
            text: token.text.clone(),
            position: token.start,
        })
}

/// Comma-separated arguments of a call with their start offsets.
fn parse_arguments(fields: &FieldIndex, group: &TokenGroup) -> ParseResult<Vec<(Node, usize)>> {
    let inner = group.inner();
    if inner.iter().all(TokenTree::is_whitespace) {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    let mut segment_start = 0;
    for (i, child) in inner.iter().enumerate() {
        if let TokenTree::Token(t) = child {
            if t.kind == TokenKind::Comma {
                args.push(parse_argument(fields, &inner[segment_start..i], t.start)?);
                segment_start = i + 1;
            }
        }
    }
    let end = group.end.saturating_sub(1);
    args.push(parse_argument(fields, &inner[segment_start..], end)?);
    Ok(args)
}

/// `comma` is where the argument ends, reported when it is empty.
fn parse_argument(fields: &FieldIndex, tokens: &[TokenTree], comma: usize) -> ParseResult<(Node, usize)> {
    let Some(first) = tokens.iter().find(|t| !t.is_whitespace()) else {
        return Err(ParseError::UnexpectedComma { position: comma });
    };
    Ok((parse_tokens(fields, tokens)?, first.start()))
}

fn parse_call(fields: &FieldIndex, name: &str, group: &TokenGroup) -> ParseResult<Node> {
    let def = registry().get(name).ok_or_else(|| ParseError::UnknownFunction {
        name: name.to_string(),
        position: group.start,
    })?;
    let args = parse_arguments(fields, group)?;
    let signature = select_signature(def, name, &args, group.start)?;
    trace!(function = def.name, signature, args = args.len(), "resolved function");

    Ok(Node::Call(Call {
        name: name.to_string(),
        def,
        signature,
        args: args.into_iter().map(|(node, _)| node).collect(),
    }))
}

/// First signature, in registration order, that the arguments satisfy.
///
/// When signatures of the right arity exist but none fits, the failure of
/// the first one is reported.
fn select_signature(
    def: &FunctionDef,
    name: &str,
    args: &[(Node, usize)],
    position: usize,
) -> ParseResult<usize> {
    let mut first_failure = None;
    for (i, signature) in def.signatures.iter().enumerate() {
        if !signature.accepts_count(args.len()) {
            continue;
        }
        match check_arguments(signature, name, args) {
            Ok(()) => return Ok(i),
            Err(e) => {
                first_failure.get_or_insert(e);
            }
        }
    }
    Err(first_failure.unwrap_or_else(|| ParseError::WrongArgumentCount {
        name: name.to_string(),
        count: args.len(),
        position,
    }))
}

fn check_arguments(signature: &Signature, name: &str, args: &[(Node, usize)]) -> ParseResult<()> {
    for (i, (node, position)) in args.iter().enumerate() {
        let Some(declared) = signature.arg(i) else {
            continue;
        };
        match node.as_literal() {
            Some(val) if !declared.kind.accepts(val) => {
                return Err(ParseError::WrongArgumentType {
                    name: name.to_string(),
                    index: i + 1,
                    expected: declared.kind.name().to_string(),
                    found: val.to_string(),
                    position: *position,
                });
            }
            None if declared.constant => {
                return Err(ParseError::NonStaticArgument {
                    name: name.to_string(),
                    index: i + 1,
                    position: *position,
                });
            }
            _ => {}
        }
    }
    Ok(())
}
