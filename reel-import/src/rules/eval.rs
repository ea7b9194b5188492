//! Evaluation of typed rule expressions against one item

use super::checker::{ArithOp, CompareOp, Expr, Field, TextOp, TimePart};
use super::RuleError;
use chrono::{DateTime, Datelike, Utc};
use reel_common::ListItem;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Time(DateTime<Utc>),
}

impl Value {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Time(_) => "time",
        }
    }
}

/// Evaluation environment: the item under test and the injected current time
pub struct Env<'a> {
    pub item: &'a ListItem,
    pub now: DateTime<Utc>,
}

pub fn eval(expr: &Expr, env: &Env<'_>) -> Result<Value, RuleError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(field) => Ok(field_value(*field, env.item)),
        Expr::Now => Ok(Value::Time(env.now)),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::TimePart(part, receiver) => {
            let Value::Time(t) = eval(receiver, env)? else {
                return Err(type_error("time method on non-time value"));
            };
            let value = match part {
                TimePart::Year => i64::from(t.year()),
                TimePart::Month => i64::from(t.month()),
                TimePart::Day => i64::from(t.day()),
                TimePart::YearDay => i64::from(t.ordinal()),
                TimePart::Unix => t.timestamp(),
            };
            Ok(Value::Int(value))
        }
        Expr::Len(arg) => match eval(arg, env)? {
            Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
            Value::List(items) => Ok(Value::Int(items.len() as i64)),
            other => Err(type_error(&format!("len of {}", other.type_name()))),
        },
        Expr::Lower(arg) => Ok(Value::Str(eval_str(arg, env)?.to_lowercase())),
        Expr::Upper(arg) => Ok(Value::Str(eval_str(arg, env)?.to_uppercase())),
        Expr::Not(arg) => Ok(Value::Bool(!eval_bool(arg, env)?)),
        Expr::Neg(arg) => match eval(arg, env)? {
            Value::Int(v) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| RuleError::Eval("integer overflow".to_string())),
            Value::Float(v) => Ok(Value::Float(-v)),
            other => Err(type_error(&format!("negate {}", other.type_name()))),
        },
        Expr::And(left, right) => {
            Ok(Value::Bool(eval_bool(left, env)? && eval_bool(right, env)?))
        }
        Expr::Or(left, right) => {
            Ok(Value::Bool(eval_bool(left, env)? || eval_bool(right, env)?))
        }
        Expr::Compare(op, left, right) => {
            let (l, r) = (eval(left, env)?, eval(right, env)?);
            compare(*op, &l, &r).map(Value::Bool)
        }
        Expr::Arith(op, left, right) => {
            let (l, r) = (eval(left, env)?, eval(right, env)?);
            arith(*op, l, r)
        }
        Expr::In {
            needle,
            list,
            negate,
        } => {
            let needle = eval(needle, env)?;
            let Value::List(items) = eval(list, env)? else {
                return Err(type_error("membership test on non-list value"));
            };
            let found = items.iter().any(|item| values_equal(&needle, item));
            Ok(Value::Bool(found != *negate))
        }
        Expr::Text(op, left, right) => {
            let (l, r) = (eval_str(left, env)?, eval_str(right, env)?);
            let result = match op {
                TextOp::Contains => l.contains(r.as_str()),
                TextOp::StartsWith => l.starts_with(r.as_str()),
                TextOp::EndsWith => l.ends_with(r.as_str()),
            };
            Ok(Value::Bool(result))
        }
        Expr::Matches(subject, regex) => Ok(Value::Bool(regex.is_match(&eval_str(subject, env)?))),
    }
}

pub fn eval_bool(expr: &Expr, env: &Env<'_>) -> Result<bool, RuleError> {
    match eval(expr, env)? {
        Value::Bool(b) => Ok(b),
        other => Err(RuleError::Eval(format!(
            "expected bool, got {}",
            other.type_name()
        ))),
    }
}

fn eval_str(expr: &Expr, env: &Env<'_>) -> Result<String, RuleError> {
    match eval(expr, env)? {
        Value::Str(s) => Ok(s),
        other => Err(RuleError::Eval(format!(
            "expected string, got {}",
            other.type_name()
        ))),
    }
}

fn type_error(what: &str) -> RuleError {
    RuleError::Eval(format!("type mismatch: {}", what))
}

fn field_value(field: Field, item: &ListItem) -> Value {
    match field {
        Field::Title => Value::Str(item.title.clone()),
        Field::Year => Value::Int(i64::from(item.year)),
        Field::Imdb => Value::Str(item.imdb.clone()),
        Field::Tmdb => Value::Int(i64::try_from(item.tmdb).unwrap_or(i64::MAX)),
        Field::ImdbVotes => Value::Int(item.imdb_votes),
        Field::Genre => Value::List(item.genre.iter().cloned().map(Value::Str).collect()),
        Field::Language => Value::List(item.language.iter().cloned().map(Value::Str).collect()),
        Field::Runtime => Value::Int(item.runtime),
        Field::CountRatings => Value::Int(item.count_ratings),
        Field::RatingImdb => Value::Float(item.ratings.imdb),
        Field::RatingMetacritic => Value::Int(item.ratings.metacritic),
        Field::RatingRottenTomatoes => Value::Int(item.ratings.rotten_tomatoes),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => left == right,
        },
    }
}

fn ordering(left: &Value, right: &Value) -> Result<Ordering, RuleError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    ordering.ok_or_else(|| {
        type_error(&format!(
            "cannot order {} and {}",
            left.type_name(),
            right.type_name()
        ))
    })
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, RuleError> {
    let result = match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => !values_equal(left, right),
        CompareOp::Lt => ordering(left, right)? == Ordering::Less,
        CompareOp::Le => ordering(left, right)? != Ordering::Greater,
        CompareOp::Gt => ordering(left, right)? == Ordering::Greater,
        CompareOp::Ge => ordering(left, right)? != Ordering::Less,
    };
    Ok(result)
}

fn arith(op: ArithOp, left: Value, right: Value) -> Result<Value, RuleError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                ArithOp::Add => a.checked_add(b),
                ArithOp::Sub => a.checked_sub(b),
                ArithOp::Mul => a.checked_mul(b),
                ArithOp::Div | ArithOp::Mod if b == 0 => {
                    return Err(RuleError::Eval("integer division by zero".to_string()))
                }
                ArithOp::Div => a.checked_div(b),
                ArithOp::Mod => a.checked_rem(b),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| RuleError::Eval("integer overflow".to_string()))
        }
        (Value::Str(a), Value::Str(b)) if op == ArithOp::Add => Ok(Value::Str(a + &b)),
        (left, right) => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(type_error(&format!(
                    "arithmetic on {} and {}",
                    left.type_name(),
                    right.type_name()
                )));
            };
            let result = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Mod => a % b,
            };
            Ok(Value::Float(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::checker::check_rule;
    use crate::rules::lexer::tokenize;
    use crate::rules::parser::parse;
    use chrono::TimeZone;
    use reel_common::Ratings;

    fn run(src: &str, item: &ListItem) -> Result<bool, RuleError> {
        let tokens = tokenize(src).unwrap();
        let expr = check_rule(&parse(&tokens, src.len()).unwrap()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        eval_bool(&expr, &Env { item, now })
    }

    fn arrival() -> ListItem {
        let mut item = ListItem::new("Arrival", 2016).with_imdb("tt2543164");
        item.genre = vec!["Drama".into(), "Sci-Fi".into()];
        item.language = vec!["English".into()];
        item.runtime = 116;
        item.imdb_votes = 750_000;
        item.ratings = Ratings {
            imdb: 7.9,
            metacritic: 81,
            rotten_tomatoes: 94,
        };
        item.count_ratings = 3;
        item
    }

    #[test]
    fn test_field_comparisons() {
        let item = arrival();
        assert!(!run("Year < 2000", &item).unwrap());
        assert!(run("Ratings.Imdb >= 7.9", &item).unwrap());
        assert!(run("Ratings.RottenTomatoes > Ratings.Metacritic", &item).unwrap());
        assert!(run("Imdb == 'tt2543164'", &item).unwrap());
        assert!(run("Year == 2016.0", &item).unwrap());
    }

    #[test]
    fn test_list_membership() {
        let item = arrival();
        assert!(run("'Drama' in Genre", &item).unwrap());
        assert!(!run("'Horror' in Genre", &item).unwrap());
        assert!(run("'French' not in Language", &item).unwrap());
        assert!(run("Genre contains 'Sci-Fi'", &item).unwrap());
        assert!(run("Year in [2015, 2016]", &item).unwrap());
    }

    #[test]
    fn test_string_operators() {
        let item = arrival();
        assert!(run("Title startsWith 'Arr'", &item).unwrap());
        assert!(run("upper(Title) endsWith 'VAL'", &item).unwrap());
        assert!(run("Title contains 'riv'", &item).unwrap());
        assert!(run("Title matches '^A.*l$'", &item).unwrap());
        assert!(run("len(Title) == 7", &item).unwrap());
    }

    #[test]
    fn test_now_is_injected() {
        let item = arrival();
        assert!(run("Now().Year() - Year == 8", &item).unwrap());
        assert!(run("Now().Month() == 3 and Now().Day() == 15", &item).unwrap());
        assert!(run("Now().YearDay() == 75", &item).unwrap());
        assert!(run("Now().Unix() > 0", &item).unwrap());
    }

    #[test]
    fn test_zero_valued_fields_are_not_errors() {
        let item = ListItem::new("Unknown Film", 0);
        assert!(run("Ratings.Imdb < 5", &item).unwrap());
        assert!(run("len(Genre) == 0", &item).unwrap());
        assert!(!run("'Drama' in Genre", &item).unwrap());
        assert!(run("Imdb == ''", &item).unwrap());
    }

    #[test]
    fn test_short_circuit_skips_failing_operand() {
        let item = arrival();
        assert!(!run("false and Runtime / 0 > 1", &item).unwrap());
        assert!(run("true or Runtime / 0 > 1", &item).unwrap());
    }

    #[test]
    fn test_division_by_zero_is_error() {
        let item = arrival();
        let err = run("Runtime / (Year - 2016) > 1", &item).unwrap_err();
        assert!(matches!(err, RuleError::Eval(_)));
        assert!(run("Runtime % 0 == 1", &item).is_err());
    }

    #[test]
    fn test_overflow_is_error() {
        let item = arrival();
        assert!(run("ImdbVotes * 9223372036854775807 > 0", &item).is_err());
    }

    #[test]
    fn test_float_arithmetic() {
        let item = arrival();
        assert!(run("Runtime / 60.0 > 1.9", &item).unwrap());
        assert!(run("-Ratings.Imdb < 0", &item).unwrap());
    }
}
