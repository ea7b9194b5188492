//! Recursive-descent parser producing an untyped syntax tree
//!
//! Precedence, lowest first: `or`, `and`, comparisons, `+ -`, `* / %`, unary, postfix.

use super::lexer::{Spanned, Token};
use super::SyntaxError;

/// Maximum nesting of parentheses, brackets, call arguments and unary operators
const MAX_NESTING: usize = 64;

/// Maximum height of the syntax tree
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Contains => "contains",
            BinaryOp::StartsWith => "startsWith",
            BinaryOp::EndsWith => "endsWith",
            BinaryOp::Matches => "matches",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Node>),
    Ident(String),
    Member(Box<Node>, String),
    Call(Box<Node>, Vec<Node>),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
}

/// Syntax tree node with the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub ast: Ast,
    pub pos: usize,
    /// Height of the subtree rooted here, leaves are 1
    pub depth: usize,
}

impl Node {
    fn new(ast: Ast, pos: usize) -> Self {
        let below = match &ast {
            Ast::List(items) => items.iter().map(|n| n.depth).max().unwrap_or(0),
            Ast::Member(object, _) => object.depth,
            Ast::Call(callee, args) => args.iter().map(|n| n.depth).fold(callee.depth, usize::max),
            Ast::Unary(_, operand) => operand.depth,
            Ast::Binary(_, left, right) => left.depth.max(right.depth),
            Ast::Int(_) | Ast::Float(_) | Ast::Str(_) | Ast::Bool(_) | Ast::Ident(_) => 0,
        };
        Self {
            ast,
            pos,
            depth: below + 1,
        }
    }
}

pub fn parse(tokens: &[Spanned], source_len: usize) -> Result<Node, SyntaxError> {
    let mut parser = Parser {
        tokens,
        index: 0,
        source_len,
        nesting: 0,
    };
    let node = parser.parse_or()?;
    if let Some(extra) = parser.peek() {
        return Err(SyntaxError::new(
            extra.pos,
            format!("unexpected token {}", describe(&extra.token)),
        ));
    }
    Ok(node)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    index: usize,
    source_len: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.index)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.index + offset).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let token = self.tokens.get(self.index);
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.peek().map(|s| s.pos).unwrap_or(self.source_len)
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek_at(0), Some(Token::Ident(w)) if w == word)
    }

    /// Run `inner` one nesting level down, failing at `pos` past the limit
    fn nested<T>(
        &mut self,
        pos: usize,
        inner: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.nesting >= MAX_NESTING {
            return Err(SyntaxError::new(pos, "rule nested too deeply"));
        }
        self.nesting += 1;
        let result = inner(self);
        self.nesting -= 1;
        result
    }

    fn expect(&mut self, expected: Token) -> Result<(), SyntaxError> {
        match self.advance() {
            Some(s) if s.token == expected => Ok(()),
            Some(s) => Err(SyntaxError::new(
                s.pos,
                format!("expected {}, found {}", describe(&expected), describe(&s.token)),
            )),
            None => Err(SyntaxError::new(
                self.source_len,
                format!("expected {}, found end of rule", describe(&expected)),
            )),
        }
    }

    fn parse_or(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek_at(0), Some(Token::OrOr)) || self.is_word("or") {
            self.advance();
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.parse_comparison()?;
        while matches!(self.peek_at(0), Some(Token::AndAnd)) || self.is_word("and") {
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(BinaryOp::And, left, right)?;
        }
        Ok(left)
    }

    fn comparison_op(&self) -> Option<(BinaryOp, usize)> {
        let op = match self.peek_at(0)? {
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            Token::Ident(word) => match word.as_str() {
                "in" => BinaryOp::In,
                "contains" => BinaryOp::Contains,
                "startsWith" => BinaryOp::StartsWith,
                "endsWith" => BinaryOp::EndsWith,
                "matches" => BinaryOp::Matches,
                "not" if matches!(self.peek_at(1), Some(Token::Ident(w)) if w == "in") => {
                    return Some((BinaryOp::NotIn, 2));
                }
                _ => return None,
            },
            _ => return None,
        };
        Some((op, 1))
    }

    fn parse_comparison(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.parse_additive()?;
        while let Some((op, width)) = self.comparison_op() {
            self.index += width;
            let right = self.parse_additive()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_at(0) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_at(0) {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, SyntaxError> {
        let pos = self.position();
        let op = match self.peek_at(0) {
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Ident(w)) if w == "not" => Some(UnaryOp::Not),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let operand = self.nested(pos, |p| p.parse_unary())?;
                limited(Node::new(Ast::Unary(op, Box::new(operand)), pos))
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Node, SyntaxError> {
        let mut node = self.parse_primary()?;
        loop {
            match self.peek_at(0) {
                Some(Token::Dot) => {
                    self.advance();
                    let pos = self.position();
                    match self.advance() {
                        Some(Spanned {
                            token: Token::Ident(name),
                            ..
                        }) => {
                            let start = node.pos;
                            node = limited(Node::new(Ast::Member(Box::new(node), name.clone()), start))?;
                        }
                        _ => return Err(SyntaxError::new(pos, "expected member name after '.'")),
                    }
                }
                Some(Token::LParen) => {
                    let open = self.position();
                    self.advance();
                    let args = self.nested(open, |p| p.parse_sequence(Token::RParen))?;
                    let start = node.pos;
                    node = limited(Node::new(Ast::Call(Box::new(node), args), start))?;
                }
                _ => return Ok(node),
            }
        }
    }

    /// Comma separated expressions up to and including `close`
    fn parse_sequence(&mut self, close: Token) -> Result<Vec<Node>, SyntaxError> {
        let mut items = Vec::new();
        if self.peek_at(0) == Some(&close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_or()?);
            if matches!(self.peek_at(0), Some(Token::Comma)) {
                self.advance();
                continue;
            }
            self.expect(close)?;
            return Ok(items);
        }
    }

    fn parse_primary(&mut self) -> Result<Node, SyntaxError> {
        let Some(spanned) = self.advance() else {
            return Err(SyntaxError::new(self.source_len, "unexpected end of rule"));
        };
        let pos = spanned.pos;
        let ast = match &spanned.token {
            Token::Int(v) => Ast::Int(*v),
            Token::Float(v) => Ast::Float(*v),
            Token::Str(s) => Ast::Str(s.clone()),
            Token::Ident(word) => match word.as_str() {
                "true" => Ast::Bool(true),
                "false" => Ast::Bool(false),
                "and" | "or" | "in" | "not" | "contains" | "startsWith" | "endsWith"
                | "matches" => {
                    return Err(SyntaxError::new(pos, format!("unexpected operator {}", word)));
                }
                _ => Ast::Ident(word.clone()),
            },
            Token::LParen => {
                let inner = self.nested(pos, |p| p.parse_or())?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            Token::LBracket => Ast::List(self.nested(pos, |p| p.parse_sequence(Token::RBracket))?),
            other => {
                return Err(SyntaxError::new(
                    pos,
                    format!("unexpected token {}", describe(other)),
                ))
            }
        };
        limited(Node::new(ast, pos))
    }
}

fn binary(op: BinaryOp, left: Node, right: Node) -> Result<Node, SyntaxError> {
    let pos = left.pos;
    limited(Node::new(Ast::Binary(op, Box::new(left), Box::new(right)), pos))
}

/// Reject trees too tall for the recursive checker and evaluator
fn limited(node: Node) -> Result<Node, SyntaxError> {
    if node.depth > MAX_DEPTH {
        return Err(SyntaxError::new(node.pos, "rule nested too deeply"));
    }
    Ok(node)
}

fn describe(token: &Token) -> String {
    match token {
        Token::Int(v) => v.to_string(),
        Token::Float(v) => v.to_string(),
        Token::Str(s) => format!("{:?}", s),
        Token::Ident(w) => w.clone(),
        Token::LParen => "'('".into(),
        Token::RParen => "')'".into(),
        Token::LBracket => "'['".into(),
        Token::RBracket => "']'".into(),
        Token::Comma => "','".into(),
        Token::Dot => "'.'".into(),
        Token::Plus => "'+'".into(),
        Token::Minus => "'-'".into(),
        Token::Star => "'*'".into(),
        Token::Slash => "'/'".into(),
        Token::Percent => "'%'".into(),
        Token::EqEq => "'=='".into(),
        Token::NotEq => "'!='".into(),
        Token::Lt => "'<'".into(),
        Token::Le => "'<='".into(),
        Token::Gt => "'>'".into(),
        Token::Ge => "'>='".into(),
        Token::Bang => "'!'".into(),
        Token::AndAnd => "'&&'".into(),
        Token::OrOr => "'||'".into(),
    }
}
