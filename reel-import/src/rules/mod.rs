//! Rule engine
//!
//! Rules are small boolean expressions over an item's fields plus `Now()`:
//!
//! ```text
//! Year < 2000
//! Ratings.Imdb < 6.5 and ImdbVotes > 1000
//! 'Horror' in Genre || 'English' not in Language
//! Now().Year() - Year > 30
//! Title matches '(?i)^untitled'
//! ```
//!
//! Rules are compiled and type-checked once per list run. A rule set rejects an item
//! when ANY of its rules is true; a rule that fails to evaluate counts as true.

mod checker;
mod eval;
mod lexer;
mod parser;

use chrono::{DateTime, Utc};
use reel_common::config::FilterConfig;
use reel_common::ListItem;
use thiserror::Error;
use tracing::{debug, warn};

use checker::Expr;
use eval::Env;

/// Rule engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// Lexing, parsing or type checking failed
    #[error("invalid rule {rule:?} at offset {position}: {message}")]
    Compile {
        rule: String,
        position: usize,
        message: String,
    },

    /// Runtime failure (division by zero, overflow)
    #[error("rule evaluation failed: {0}")]
    Eval(String),
}

/// Location-tagged failure from the compile stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub position: usize,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    fn into_rule_error(self, rule: &str) -> RuleError {
        RuleError::Compile {
            rule: rule.to_string(),
            position: self.position,
            message: self.message,
        }
    }
}

/// A single type-checked rule
#[derive(Debug, Clone)]
pub struct CompiledRule {
    source: String,
    expr: Expr,
}

impl CompiledRule {
    pub fn compile(source: &str) -> Result<Self, RuleError> {
        let tokens = lexer::tokenize(source).map_err(|e| e.into_rule_error(source))?;
        let ast = parser::parse(&tokens, source.len()).map_err(|e| e.into_rule_error(source))?;
        let expr = checker::check_rule(&ast).map_err(|e| e.into_rule_error(source))?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, item: &ListItem, now: DateTime<Utc>) -> Result<bool, RuleError> {
        eval::eval_bool(&self.expr, &Env { item, now })
    }
}

/// Ordered list of independently compiled rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile every rule; the first failure fails the whole set
    pub fn compile(sources: &[String]) -> Result<Self, RuleError> {
        let rules = sources
            .iter()
            .map(|source| CompiledRule::compile(source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// True when any rule matches the item or fails to evaluate
    pub fn excludes(&self, item: &ListItem, now: DateTime<Utc>) -> bool {
        self.first_match(item, now).is_some()
    }

    /// The first rule that matched (or errored) for this item
    pub fn first_match(&self, item: &ListItem, now: DateTime<Utc>) -> Option<&CompiledRule> {
        for rule in &self.rules {
            match rule.evaluate(item, now) {
                Ok(true) => {
                    debug!(item = %item.label(), rule = %rule.source(), "Rule matched");
                    return Some(rule);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        item = %item.label(),
                        rule = %rule.source(),
                        error = %e,
                        "Rule evaluation failed, treating as match"
                    );
                    return Some(rule);
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Exclusion and revision rule sets of one list
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    exclusion: RuleSet,
    revision: RuleSet,
}

impl RuleValidator {
    pub fn new(exclusion: RuleSet, revision: RuleSet) -> Self {
        Self {
            exclusion,
            revision,
        }
    }

    /// Compile both rule lists of a (merged) list filter
    pub fn from_filter(filter: &FilterConfig) -> Result<Self, RuleError> {
        Ok(Self::new(
            RuleSet::compile(&filter.exclude)?,
            RuleSet::compile(&filter.revision)?,
        ))
    }

    /// Approved iff no exclusion rule matches
    pub fn is_approved(&self, item: &ListItem, now: DateTime<Utc>) -> bool {
        !self.exclusion.excludes(item, now)
    }

    /// A rejected item goes to review iff no revision rule matches
    pub fn is_for_revision(&self, item: &ListItem, now: DateTime<Utc>) -> bool {
        !self.revision.excludes(item, now)
    }

    pub fn exclusion(&self) -> &RuleSet {
        &self.exclusion
    }

    pub fn revision(&self) -> &RuleSet {
        &self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(sources: &[&str]) -> Vec<String> {
        sources.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compile_error_names_rule_and_offset() {
        let err = RuleSet::compile(&rules(&["Year < 2000", "Year <> 2000"])).unwrap_err();
        match err {
            RuleError::Compile { rule, position, .. } => {
                assert_eq!(rule, "Year <> 2000");
                assert_eq!(position, 6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_rule_is_compile_error() {
        assert!(CompiledRule::compile("").is_err());
        assert!(CompiledRule::compile("   ").is_err());
    }

    #[test]
    fn test_empty_set_excludes_nothing() {
        let set = RuleSet::compile(&[]).unwrap();
        assert!(set.is_empty());
        assert!(!set.excludes(&ListItem::new("Any", 1999), Utc::now()));
    }

    #[test]
    fn test_first_match_reports_rule() {
        let set = RuleSet::compile(&rules(&["Runtime > 200", "Year < 2000"])).unwrap();
        let item = ListItem::new("Heat", 1995);
        let matched = set.first_match(&item, Utc::now()).unwrap();
        assert_eq!(matched.source(), "Year < 2000");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_validator_from_filter() {
        let filter = FilterConfig {
            limit: None,
            exclude: rules(&["Year < 2000"]),
            revision: rules(&["ImdbVotes < 100"]),
        };
        let validator = RuleValidator::from_filter(&filter).unwrap();
        let mut item = ListItem::new("Heat", 1995);
        item.imdb_votes = 700_000;

        assert!(!validator.is_approved(&item, Utc::now()));
        assert!(validator.is_for_revision(&item, Utc::now()));
        assert_eq!(validator.exclusion().len(), 1);
        assert_eq!(validator.revision().len(), 1);
    }

    #[test]
    fn test_validator_rejects_bad_revision_rule() {
        let filter = FilterConfig {
            limit: None,
            exclude: vec![],
            revision: rules(&["Votes < 100"]),
        };
        assert!(matches!(
            RuleValidator::from_filter(&filter),
            Err(RuleError::Compile { .. })
        ));
    }
}
