use std::fmt;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Run of whitespace, kept so token text reproduces the input
    Whitespace,

    /// Function name or keyword candidate
    ///
    /// # Examples
    /// ```text
    /// concat
    /// stDev
    /// ```
    Identifier,

    /// Unsigned numeric literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 1.234
    /// 1e-3
    /// ```
    Number,

    /// Single-quoted string, a doubled quote escapes an embedded quote
    ///
    /// # Examples
    /// ```text
    /// 'it''s'
    /// ```
    SingleQuoted,

    /// Double-quoted string, a doubled quote escapes an embedded quote
    DoubleQuoted,

    /// Field reference
    ///
    /// # Examples
    /// ```text
    /// ${val1}
    /// ${EventTime}
    /// ```
    Field,

    OpenBracket,
    CloseBracket,
    Comma,
    Pipe,

    // Arithmetic operators
    Plus,
    /// Binary subtraction
    Minus,
    /// Unary minus, a `-` at the start, after an operator, `(`, `,` or `|`
    Negate,
    Multiply,
    Divide,
    Modulus,
    Power,

    // Comparison operators
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,

    // Boolean keywords in operator position
    And,
    Or,

    /// Character with no meaning in the language
    Unknown,
}

impl TokenKind {
    pub fn is_binary_operator(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Plus | Minus
                | Multiply
                | Divide
                | Modulus
                | Power
                | Equals
                | NotEquals
                | LessThan
                | LessThanOrEqualTo
                | GreaterThan
                | GreaterThanOrEqualTo
                | And
                | Or
        )
    }

    pub fn is_operator(&self) -> bool {
        self.is_binary_operator() || *self == TokenKind::Negate
    }

    /// Whether a token of this kind can end an operand.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Number
                | TokenKind::SingleQuoted
                | TokenKind::DoubleQuoted
                | TokenKind::Field
                | TokenKind::CloseBracket
        )
    }
}

/// A lexical token with its exact source text and byte span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start: usize) -> Self {
        let text = text.into();
        let end = start + text.len();
        Token {
            kind,
            text,
            start,
            end,
        }
    }

    /// String literal content with the quotes removed and doubled quotes
    /// collapsed. `None` for tokens that are not quoted strings.
    pub fn unquoted(&self) -> Option<String> {
        let quote = match self.kind {
            TokenKind::SingleQuoted => "'",
            TokenKind::DoubleQuoted => "\"",
            _ => return None,
        };
        let inner = self
            .text
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))?;
        Some(inner.replace(&quote.repeat(2), quote))
    }

    /// Name inside a `${...}` field reference.
    pub fn field_name(&self) -> Option<&str> {
        if self.kind != TokenKind::Field {
            return None;
        }
        self.text.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// What a [`TokenGroup`] encloses.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKind {
    /// The whole expression
    Root,
    /// `( ... )`
    Brackets,
    /// `name( ... )`, holding the function name as written
    Function(String),
    /// One segment between `|` separators
    Pipe,
}

/// A node of the nested token structure.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenTree {
    Token(Token),
    Group(TokenGroup),
}

impl TokenTree {
    pub fn start(&self) -> usize {
        match self {
            TokenTree::Token(t) => t.start,
            TokenTree::Group(g) => g.start,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            TokenTree::Token(t) => Some(t),
            TokenTree::Group(_) => None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, TokenTree::Token(t) if t.kind == TokenKind::Whitespace)
    }

    fn write_text(&self, out: &mut String) {
        match self {
            TokenTree::Token(t) => out.push_str(&t.text),
            TokenTree::Group(g) => g.write_text(out),
        }
    }
}

impl fmt::Display for TokenTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::new();
        self.write_text(&mut text);
        f.write_str(&text)
    }
}

/// A bracketed, function-call or pipe-delimited run of tokens.
///
/// `children` holds every token of the group, including the function name
/// and the brackets, so concatenating the leaves gives back the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGroup {
    pub kind: GroupKind,
    pub children: Vec<TokenTree>,
    pub start: usize,
    pub end: usize,
}

impl TokenGroup {
    /// Children between the opening and closing brackets.
    pub fn inner(&self) -> &[TokenTree] {
        match self.kind {
            GroupKind::Root | GroupKind::Pipe => &self.children,
            // Brackets: open + inner + close
            GroupKind::Brackets => trim(&self.children, 1),
            // Function: name + any whitespace + open + inner + close
            GroupKind::Function(_) => trim(&self.children, opening_len(&self.children)),
        }
    }

    /// Source text reproduced from the leaves.
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.write_text(&mut text);
        text
    }

    fn write_text(&self, out: &mut String) {
        for child in &self.children {
            child.write_text(out);
        }
    }

    /// Leaf tokens in source order.
    pub fn leaves(&self) -> Vec<&Token> {
        let mut leaves = Vec::new();
        collect_leaves(&self.children, &mut leaves);
        leaves
    }
}

/// Number of leading children up to and including the first `(`.
pub(crate) fn opening_len(children: &[TokenTree]) -> usize {
    children
        .iter()
        .position(|c| matches!(c, TokenTree::Token(t) if t.kind == TokenKind::OpenBracket))
        .map_or(0, |i| i + 1)
}

fn trim(children: &[TokenTree], leading: usize) -> &[TokenTree] {
    if children.len() > leading {
        &children[leading..children.len() - 1]
    } else {
        &[]
    }
}

fn collect_leaves<'a>(children: &'a [TokenTree], out: &mut Vec<&'a Token>) {
    for child in children {
        match child {
            TokenTree::Token(t) => out.push(t),
            TokenTree::Group(g) => collect_leaves(&g.children, out),
        }
    }
}

impl fmt::Display for TokenGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquoted() {
        let token = Token::new(TokenKind::SingleQuoted, "'it''s'", 0);
        assert_eq!(token.unquoted().as_deref(), Some("it's"));
        let token = Token::new(TokenKind::DoubleQuoted, "\"say \"\"hi\"\"\"", 0);
        assert_eq!(token.unquoted().as_deref(), Some("say \"hi\""));
        assert_eq!(Token::new(TokenKind::Number, "1", 0).unquoted(), None);
    }

    #[test]
    fn test_field_name() {
        let token = Token::new(TokenKind::Field, "${val1}", 3);
        assert_eq!(token.field_name(), Some("val1"));
        assert_eq!(token.end, 10);
    }
}
