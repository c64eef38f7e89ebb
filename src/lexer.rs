use tracing::trace;

use crate::{
    ast::{GroupKind, Token, TokenGroup, TokenKind, TokenTree, tokens::opening_len},
    error::TokenError,
};

/// Splits expression text into a flat list of tokens.
///
/// Whitespace is kept as tokens, so the concatenated text of the output is
/// identical to the input.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    position: usize,
    /// Kind of the last token that was not whitespace
    previous: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().collect(),
            position: 0,
            previous: None,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).map(|(_, c)| *c)
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).map(|(_, c)| *c)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Byte offset of the current character.
    fn offset(&self) -> usize {
        self.chars
            .get(self.position)
            .map_or(self.input.len(), |(i, _)| *i)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.current_char() {
            if !pred(ch) {
                break;
            }
            self.advance();
        }
    }

    fn read_quoted(&mut self, quote: char, start: usize) -> Result<TokenKind, TokenError> {
        self.advance(); // Opening quote
        loop {
            match self.current_char() {
                Some(c) if c == quote => {
                    self.advance();
                    // A doubled quote is an escaped quote
                    if self.current_char() == Some(quote) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(_) => self.advance(),
                None => {
                    return Err(TokenError::new(
                        "Unterminated string",
                        Some(self.input[start..].to_string()),
                        start,
                    ));
                }
            }
        }
        Ok(if quote == '\'' {
            TokenKind::SingleQuoted
        } else {
            TokenKind::DoubleQuoted
        })
    }

    fn read_field(&mut self, start: usize) -> Result<TokenKind, TokenError> {
        self.advance(); // $
        self.advance(); // {
        loop {
            match self.current_char() {
                Some('}') => {
                    self.advance();
                    return Ok(TokenKind::Field);
                }
                Some(_) => self.advance(),
                None => {
                    return Err(TokenError::new(
                        "Unterminated field reference",
                        Some(self.input[start..].to_string()),
                        start,
                    ));
                }
            }
        }
    }

    fn read_number(&mut self) {
        self.take_while(|c| c.is_ascii_digit());
        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.current_char(), Some('e' | 'E')) {
            let digits_at = match self.peek_char(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek_char(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digits_at {
                    self.advance();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
        }
    }

    fn operand_expected(&self) -> bool {
        match self.previous {
            None => true,
            Some(kind) => {
                kind.is_operator()
                    || matches!(kind, TokenKind::OpenBracket | TokenKind::Comma | TokenKind::Pipe)
            }
        }
    }

    /// Next token, or `None` at the end of the input.
    pub fn next_token(&mut self) -> Result<Option<Token>, TokenError> {
        let start = self.offset();
        let Some(ch) = self.current_char() else {
            return Ok(None);
        };

        let kind = match ch {
            c if c.is_whitespace() => {
                self.take_while(char::is_whitespace);
                TokenKind::Whitespace
            }
            '\'' | '"' => self.read_quoted(ch, start)?,
            '$' if self.peek_char(1) == Some('{') => self.read_field(start)?,
            c if c.is_ascii_digit() => {
                self.read_number();
                TokenKind::Number
            }
            '.' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number();
                TokenKind::Number
            }
            c if c.is_alphabetic() || c == '_' => {
                self.take_while(|c| c.is_alphanumeric() || c == '_');
                let word = &self.input[start..self.offset()];
                // and/or are operators only where an operator may appear
                let keyword_position = self.previous.is_some_and(|k| k.ends_operand());
                if keyword_position && word.eq_ignore_ascii_case("and") {
                    TokenKind::And
                } else if keyword_position && word.eq_ignore_ascii_case("or") {
                    TokenKind::Or
                } else {
                    TokenKind::Identifier
                }
            }
            _ => {
                self.advance();
                match (ch, self.current_char()) {
                    ('!', Some('=')) => {
                        self.advance();
                        TokenKind::NotEquals
                    }
                    ('<', Some('=')) => {
                        self.advance();
                        TokenKind::LessThanOrEqualTo
                    }
                    ('>', Some('=')) => {
                        self.advance();
                        TokenKind::GreaterThanOrEqualTo
                    }
                    ('(', _) => TokenKind::OpenBracket,
                    (')', _) => TokenKind::CloseBracket,
                    (',', _) => TokenKind::Comma,
                    ('|', _) => TokenKind::Pipe,
                    ('+', _) => TokenKind::Plus,
                    ('-', _) if self.operand_expected() => TokenKind::Negate,
                    ('-', _) => TokenKind::Minus,
                    ('*', _) => TokenKind::Multiply,
                    ('/', _) => TokenKind::Divide,
                    ('%', _) => TokenKind::Modulus,
                    ('^', _) => TokenKind::Power,
                    ('=', _) => TokenKind::Equals,
                    ('<', _) => TokenKind::LessThan,
                    ('>', _) => TokenKind::GreaterThan,
                    _ => TokenKind::Unknown,
                }
            }
        };

        if kind != TokenKind::Whitespace {
            self.previous = Some(kind);
        }
        Ok(Some(Token::new(kind, &self.input[start..self.offset()], start)))
    }

    /// Lex the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, TokenError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Tokenize an expression into its nested structure.
///
/// Function calls (`name(`), bracketed sub-expressions and pipe-delimited
/// segments become [`TokenGroup`]s. Unbalanced brackets and unterminated
/// quotes or field references are reported as a [`TokenError`].
pub fn tokenize(input: &str) -> Result<TokenGroup, TokenError> {
    let tokens = Lexer::new(input).tokenize()?;
    trace!(count = tokens.len(), "lexed expression");

    // A name is a call when the next token other than whitespace is `(`
    let calls: Vec<bool> = (0..tokens.len())
        .map(|i| {
            tokens[i].kind == TokenKind::Identifier
                && tokens[i + 1..]
                    .iter()
                    .find(|t| t.kind != TokenKind::Whitespace)
                    .is_some_and(|t| t.kind == TokenKind::OpenBracket)
        })
        .collect();

    // Each open group: kind, start, children so far
    let mut stack: Vec<(GroupKind, usize, Vec<TokenTree>)> = vec![(GroupKind::Root, 0, Vec::new())];
    // Set between a call's name and its opening bracket
    let mut awaiting_open = false;

    for (i, token) in tokens.into_iter().enumerate() {
        match token.kind {
            TokenKind::Identifier if calls[i] => {
                let start = token.start;
                let name = token.text.clone();
                stack.push((GroupKind::Function(name), start, vec![TokenTree::Token(token)]));
                awaiting_open = true;
            }
            TokenKind::OpenBracket if awaiting_open => {
                awaiting_open = false;
                if let Some((_, _, children)) = stack.last_mut() {
                    children.push(TokenTree::Token(token));
                }
            }
            TokenKind::OpenBracket => {
                let start = token.start;
                stack.push((GroupKind::Brackets, start, vec![TokenTree::Token(token)]));
            }
            TokenKind::CloseBracket => {
                if stack.len() == 1 {
                    return Err(TokenError::new(
                        "Unexpected close bracket",
                        Some(token.text.clone()),
                        token.start,
                    ));
                }
                let end = token.end;
                if let Some((kind, start, mut children)) = stack.pop() {
                    children.push(TokenTree::Token(token));
                    let children = split_pipes(children, &kind);
                    let group = TokenGroup {
                        kind,
                        children,
                        start,
                        end,
                    };
                    if let Some((_, _, parent)) = stack.last_mut() {
                        parent.push(TokenTree::Group(group));
                    }
                }
            }
            _ => {
                if let Some((_, _, children)) = stack.last_mut() {
                    children.push(TokenTree::Token(token));
                }
            }
        }
    }

    if stack.len() > 1 {
        let (_, start, children) = &stack[stack.len() - 1];
        let opener = children
            .iter()
            .filter_map(TokenTree::as_token)
            .find(|t| t.kind == TokenKind::OpenBracket)
            .map(|t| t.text.clone());
        return Err(TokenError::new("Unclosed bracket", opener, *start));
    }

    let (kind, _, children) = stack.remove(0);
    let children = split_pipes(children, &kind);
    Ok(TokenGroup {
        kind,
        children,
        start: 0,
        end: input.len(),
    })
}

/// Wrap each `|`-delimited segment of a group's inner tokens in a pipe group.
fn split_pipes(children: Vec<TokenTree>, kind: &GroupKind) -> Vec<TokenTree> {
    let has_pipe = children
        .iter()
        .any(|c| matches!(c, TokenTree::Token(t) if t.kind == TokenKind::Pipe));
    if !has_pipe {
        return children;
    }

    let (lead, trail) = match kind {
        GroupKind::Root | GroupKind::Pipe => (0, 0),
        GroupKind::Brackets => (1, 1),
        GroupKind::Function(_) => (opening_len(&children), 1),
    };
    let mut children = children;
    let tail = children.split_off(children.len() - trail);
    let inner = children.split_off(lead);
    let mut out = children;

    let mut segment: Vec<TokenTree> = Vec::new();
    let mut segment_start = inner.first().map_or(0, TokenTree::start);
    for child in inner {
        match child {
            TokenTree::Token(t) if t.kind == TokenKind::Pipe => {
                out.push(pipe_group(std::mem::take(&mut segment), segment_start, t.start));
                segment_start = t.end;
                out.push(TokenTree::Token(t));
            }
            other => segment.push(other),
        }
    }
    let end = segment.last().map_or(segment_start, |last| match last {
        TokenTree::Token(t) => t.end,
        TokenTree::Group(g) => g.end,
    });
    out.push(pipe_group(segment, segment_start, end));
    out.extend(tail);
    out
}

fn pipe_group(children: Vec<TokenTree>, start: usize, end: usize) -> TokenTree {
    TokenTree::Group(TokenGroup {
        kind: GroupKind::Pipe,
        children,
        start,
        end,
    })
}
