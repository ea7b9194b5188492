//! Type checking: resolves identifiers against the item schema and produces a typed
//! expression tree ready for evaluation.

use super::eval::Value;
use super::parser::{Ast, BinaryOp, Node, UnaryOp};
use super::SyntaxError;
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Bool,
    Int,
    Float,
    Str,
    Time,
    List(Box<Type>),
    /// Element type of an empty list literal
    Unknown,
}

impl Type {
    fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (Type::List(a), Type::List(b)) => a.compatible(b),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::Str => f.write_str("string"),
            Type::Time => f.write_str("time"),
            Type::List(inner) => write!(f, "[]{}", inner),
            Type::Unknown => f.write_str("any"),
        }
    }
}

/// Item fields addressable from a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Year,
    Imdb,
    Tmdb,
    ImdbVotes,
    Genre,
    Language,
    Runtime,
    CountRatings,
    RatingImdb,
    RatingMetacritic,
    RatingRottenTomatoes,
}

impl Field {
    fn lookup(name: &str) -> Option<Field> {
        let field = match name {
            "Title" => Field::Title,
            "Year" => Field::Year,
            "Imdb" => Field::Imdb,
            "Tmdb" => Field::Tmdb,
            "ImdbVotes" => Field::ImdbVotes,
            "Genre" => Field::Genre,
            "Language" => Field::Language,
            "Runtime" => Field::Runtime,
            "CountRatings" => Field::CountRatings,
            _ => return None,
        };
        Some(field)
    }

    fn rating(source: &str) -> Option<Field> {
        match source {
            "Imdb" => Some(Field::RatingImdb),
            "Metacritic" => Some(Field::RatingMetacritic),
            "RottenTomatoes" => Some(Field::RatingRottenTomatoes),
            _ => None,
        }
    }

    fn ty(self) -> Type {
        match self {
            Field::Title | Field::Imdb => Type::Str,
            Field::Genre | Field::Language => Type::List(Box::new(Type::Str)),
            Field::RatingImdb => Type::Float,
            Field::Year
            | Field::Tmdb
            | Field::ImdbVotes
            | Field::Runtime
            | Field::CountRatings
            | Field::RatingMetacritic
            | Field::RatingRottenTomatoes => Type::Int,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePart {
    Year,
    Month,
    Day,
    YearDay,
    Unix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

/// Typed expression tree
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Field(Field),
    Now,
    List(Vec<Expr>),
    TimePart(TimePart, Box<Expr>),
    Len(Box<Expr>),
    Lower(Box<Expr>),
    Upper(Box<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    In {
        needle: Box<Expr>,
        list: Box<Expr>,
        negate: bool,
    },
    Text(TextOp, Box<Expr>, Box<Expr>),
    Matches(Box<Expr>, Regex),
}

/// Check a whole rule: it must produce a boolean
pub fn check_rule(node: &Node) -> Result<Expr, SyntaxError> {
    let (expr, ty) = check(node)?;
    if ty != Type::Bool {
        return Err(SyntaxError::new(
            node.pos,
            format!("rule must evaluate to bool, found {}", ty),
        ));
    }
    Ok(expr)
}

fn check(node: &Node) -> Result<(Expr, Type), SyntaxError> {
    match &node.ast {
        Ast::Int(v) => Ok((Expr::Literal(Value::Int(*v)), Type::Int)),
        Ast::Float(v) => Ok((Expr::Literal(Value::Float(*v)), Type::Float)),
        Ast::Str(s) => Ok((Expr::Literal(Value::Str(s.clone())), Type::Str)),
        Ast::Bool(b) => Ok((Expr::Literal(Value::Bool(*b)), Type::Bool)),
        Ast::List(items) => check_list(items),
        Ast::Ident(name) => check_ident(node.pos, name),
        Ast::Member(object, name) => check_member(node.pos, object, name),
        Ast::Call(callee, args) => check_call(node.pos, callee, args),
        Ast::Unary(op, operand) => check_unary(node.pos, *op, operand),
        Ast::Binary(op, left, right) => check_binary(node.pos, *op, left, right),
    }
}

fn check_list(items: &[Node]) -> Result<(Expr, Type), SyntaxError> {
    let mut exprs = Vec::with_capacity(items.len());
    let mut element = Type::Unknown;
    for item in items {
        let (expr, ty) = check(item)?;
        if !element.compatible(&ty) {
            return Err(SyntaxError::new(
                item.pos,
                format!("list mixes {} and {} elements", element, ty),
            ));
        }
        if element == Type::Unknown || (element == Type::Int && ty == Type::Float) {
            element = ty;
        }
        exprs.push(expr);
    }
    Ok((Expr::List(exprs), Type::List(Box::new(element))))
}

fn check_ident(pos: usize, name: &str) -> Result<(Expr, Type), SyntaxError> {
    if let Some(field) = Field::lookup(name) {
        return Ok((Expr::Field(field), field.ty()));
    }
    let message = match name {
        "Ratings" => {
            "Ratings must be accessed by source: Ratings.Imdb, Ratings.Metacritic, Ratings.RottenTomatoes"
                .to_string()
        }
        "Now" | "len" | "lower" | "upper" => format!("{} is a function and must be called", name),
        _ => format!("unknown name {}", name),
    };
    Err(SyntaxError::new(pos, message))
}

fn check_member(pos: usize, object: &Node, name: &str) -> Result<(Expr, Type), SyntaxError> {
    if matches!(&object.ast, Ast::Ident(obj) if obj == "Ratings") {
        return Field::rating(name)
            .map(|field| (Expr::Field(field), field.ty()))
            .ok_or_else(|| SyntaxError::new(pos, format!("unknown rating source {}", name)));
    }
    let (_, ty) = check(object)?;
    Err(SyntaxError::new(
        pos,
        format!("{} has no field {}", ty, name),
    ))
}

fn check_call(pos: usize, callee: &Node, args: &[Node]) -> Result<(Expr, Type), SyntaxError> {
    match &callee.ast {
        Ast::Ident(name) => match name.as_str() {
            "Now" => {
                expect_arity(pos, name, args, 0)?;
                Ok((Expr::Now, Type::Time))
            }
            "len" => {
                expect_arity(pos, name, args, 1)?;
                let (arg, ty) = check(&args[0])?;
                match ty {
                    Type::Str | Type::List(_) => Ok((Expr::Len(Box::new(arg)), Type::Int)),
                    other => Err(SyntaxError::new(
                        args[0].pos,
                        format!("len expects string or list, found {}", other),
                    )),
                }
            }
            "lower" | "upper" => {
                expect_arity(pos, name, args, 1)?;
                let arg = expect_type(&args[0], Type::Str, name)?;
                let expr = if name == "lower" {
                    Expr::Lower(Box::new(arg))
                } else {
                    Expr::Upper(Box::new(arg))
                };
                Ok((expr, Type::Str))
            }
            _ => Err(SyntaxError::new(pos, format!("unknown function {}", name))),
        },
        Ast::Member(object, method) => {
            expect_arity(pos, method, args, 0)?;
            let (receiver, ty) = check(object)?;
            if ty != Type::Time {
                return Err(SyntaxError::new(
                    pos,
                    format!("{} has no method {}", ty, method),
                ));
            }
            let part = match method.as_str() {
                "Year" => TimePart::Year,
                "Month" => TimePart::Month,
                "Day" => TimePart::Day,
                "YearDay" => TimePart::YearDay,
                "Unix" => TimePart::Unix,
                _ => {
                    return Err(SyntaxError::new(
                        pos,
                        format!("time has no method {}", method),
                    ))
                }
            };
            Ok((Expr::TimePart(part, Box::new(receiver)), Type::Int))
        }
        _ => Err(SyntaxError::new(pos, "expression is not callable")),
    }
}

fn expect_arity(pos: usize, name: &str, args: &[Node], expected: usize) -> Result<(), SyntaxError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(SyntaxError::new(
            pos,
            format!(
                "{} expects {} argument(s), got {}",
                name,
                expected,
                args.len()
            ),
        ))
    }
}

fn expect_type(node: &Node, expected: Type, context: &str) -> Result<Expr, SyntaxError> {
    let (expr, ty) = check(node)?;
    if ty == expected {
        Ok(expr)
    } else {
        Err(SyntaxError::new(
            node.pos,
            format!("{} expects {}, found {}", context, expected, ty),
        ))
    }
}

fn check_unary(pos: usize, op: UnaryOp, operand: &Node) -> Result<(Expr, Type), SyntaxError> {
    let (expr, ty) = check(operand)?;
    match op {
        UnaryOp::Not if ty == Type::Bool => Ok((Expr::Not(Box::new(expr)), Type::Bool)),
        UnaryOp::Neg if ty.is_numeric() => Ok((Expr::Neg(Box::new(expr)), ty)),
        UnaryOp::Not => Err(SyntaxError::new(
            pos,
            format!("not expects bool, found {}", ty),
        )),
        UnaryOp::Neg => Err(SyntaxError::new(
            pos,
            format!("cannot negate {}", ty),
        )),
    }
}

fn check_binary(
    pos: usize,
    op: BinaryOp,
    left: &Node,
    right: &Node,
) -> Result<(Expr, Type), SyntaxError> {
    if op == BinaryOp::Matches {
        let subject = expect_type(left, Type::Str, "matches")?;
        let Ast::Str(pattern) = &right.ast else {
            return Err(SyntaxError::new(
                right.pos,
                "matches expects a string literal pattern",
            ));
        };
        let regex = Regex::new(pattern)
            .map_err(|e| SyntaxError::new(right.pos, format!("invalid pattern: {}", e)))?;
        return Ok((Expr::Matches(Box::new(subject), regex), Type::Bool));
    }

    let (lhs, lt) = check(left)?;
    let (rhs, rt) = check(right)?;
    let mismatch = || {
        SyntaxError::new(
            pos,
            format!(
                "invalid operation: {} {} {}",
                lt,
                op.symbol(),
                rt
            ),
        )
    };
    let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));

    match op {
        BinaryOp::And | BinaryOp::Or => {
            if lt != Type::Bool || rt != Type::Bool {
                return Err(mismatch());
            }
            let expr = if op == BinaryOp::And {
                Expr::And(lhs, rhs)
            } else {
                Expr::Or(lhs, rhs)
            };
            Ok((expr, Type::Bool))
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            if !lt.compatible(&rt) {
                return Err(mismatch());
            }
            let cmp = if op == BinaryOp::Eq {
                CompareOp::Eq
            } else {
                CompareOp::Ne
            };
            Ok((Expr::Compare(cmp, lhs, rhs), Type::Bool))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordered = (lt.is_numeric() && rt.is_numeric())
                || (lt == Type::Str && rt == Type::Str)
                || (lt == Type::Time && rt == Type::Time);
            if !ordered {
                return Err(mismatch());
            }
            let cmp = match op {
                BinaryOp::Lt => CompareOp::Lt,
                BinaryOp::Le => CompareOp::Le,
                BinaryOp::Gt => CompareOp::Gt,
                _ => CompareOp::Ge,
            };
            Ok((Expr::Compare(cmp, lhs, rhs), Type::Bool))
        }
        BinaryOp::In | BinaryOp::NotIn => match &rt {
            Type::List(element) if element.compatible(&lt) => Ok((
                Expr::In {
                    needle: lhs,
                    list: rhs,
                    negate: op == BinaryOp::NotIn,
                },
                Type::Bool,
            )),
            _ => Err(mismatch()),
        },
        BinaryOp::Contains => match &lt {
            Type::Str if rt == Type::Str => Ok((Expr::Text(TextOp::Contains, lhs, rhs), Type::Bool)),
            Type::List(element) if element.compatible(&rt) => Ok((
                Expr::In {
                    needle: rhs,
                    list: lhs,
                    negate: false,
                },
                Type::Bool,
            )),
            _ => Err(mismatch()),
        },
        BinaryOp::StartsWith | BinaryOp::EndsWith => {
            if lt != Type::Str || rt != Type::Str {
                return Err(mismatch());
            }
            let text = if op == BinaryOp::StartsWith {
                TextOp::StartsWith
            } else {
                TextOp::EndsWith
            };
            Ok((Expr::Text(text, lhs, rhs), Type::Bool))
        }
        BinaryOp::Add if lt == Type::Str && rt == Type::Str => {
            Ok((Expr::Arith(ArithOp::Add, lhs, rhs), Type::Str))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            if !lt.is_numeric() || !rt.is_numeric() {
                return Err(mismatch());
            }
            if op == BinaryOp::Mod && (lt != Type::Int || rt != Type::Int) {
                return Err(mismatch());
            }
            let result = if lt == Type::Int && rt == Type::Int {
                Type::Int
            } else {
                Type::Float
            };
            let arith = match op {
                BinaryOp::Add => ArithOp::Add,
                BinaryOp::Sub => ArithOp::Sub,
                BinaryOp::Mul => ArithOp::Mul,
                BinaryOp::Div => ArithOp::Div,
                _ => ArithOp::Mod,
            };
            Ok((Expr::Arith(arith, lhs, rhs), result))
        }
        BinaryOp::Matches => Err(mismatch()),
    }
}
