//! Condition and branch model
//!
//! A `Branch` is one reachable decision path through an if/elif/else chain,
//! represented as the conjunction of the atomic `Condition`s that guard
//! entry into its body. Conditions come in two kinds: a comparison against a
//! literal (`x > 5`) and a bare boolean test (`flag`, `!flag`). The kinds are
//! kept distinct because their negations differ: a comparison negates via
//! its operator complement, while a boolean test negates via logical NOT.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CovminError;

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// The operator whose truth table is the negation of this one
    pub fn complement(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }

    /// Apply the operator to an ordering between actual and expected value
    pub fn matches(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareOp {
    type Err = CovminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Ne),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Ge),
            other => Err(CovminError::ParseFailure(format!(
                "unsupported comparison operator '{other}'"
            ))),
        }
    }
}

/// A candidate value a variable may take in a generated test case
///
/// Variable domains mix booleans, numbers, and text in one collection, so
/// values are a tagged union rather than a dynamically typed blob. The
/// `total_order` method gives a deterministic ordering (type rank first,
/// then value) used to sort domains so test-case generation is reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Parse a literal's source text into a typed value
    ///
    /// Booleans accept `true`/`True`/`false`/`False`; integers before
    /// floats; anything else is text (surrounding quotes stripped).
    pub fn parse_literal(text: &str) -> Value {
        let trimmed = text.trim();
        match trimmed {
            "true" | "True" => return Value::Bool(true),
            "false" | "False" => return Value::Bool(false),
            _ => {}
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::Float(f);
        }
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
            .unwrap_or(trimmed);
        Value::Text(unquoted.to_string())
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::Text(_) => 3,
        }
    }

    /// Deterministic total ordering across all value types
    pub fn total_order(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(t) => write!(f, "{t}"),
        }
    }
}

/// One atomic test over a single variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// `variable op literal`, e.g. `x >= 10`
    Comparison {
        variable: String,
        op: CompareOp,
        /// Literal as it appeared in the source; coerced to the test
        /// value's type at evaluation time
        literal: String,
    },
    /// Bare boolean test, e.g. `flag` or `!flag`
    BooleanTest { variable: String, negated: bool },
}

impl Condition {
    pub fn comparison(variable: impl Into<String>, op: CompareOp, literal: impl Into<String>) -> Self {
        Condition::Comparison {
            variable: variable.into(),
            op,
            literal: literal.into(),
        }
    }

    pub fn boolean_test(variable: impl Into<String>) -> Self {
        Condition::BooleanTest {
            variable: variable.into(),
            negated: false,
        }
    }

    /// The variable this condition tests
    pub fn variable(&self) -> &str {
        match self {
            Condition::Comparison { variable, .. } => variable,
            Condition::BooleanTest { variable, .. } => variable,
        }
    }

    /// The logical negation of this condition
    ///
    /// Comparisons negate via the operator complement; boolean tests flip
    /// their NOT wrapper.
    pub fn negated(&self) -> Condition {
        match self {
            Condition::Comparison { variable, op, literal } => Condition::Comparison {
                variable: variable.clone(),
                op: op.complement(),
                literal: literal.clone(),
            },
            Condition::BooleanTest { variable, negated } => Condition::BooleanTest {
                variable: variable.clone(),
                negated: !negated,
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Comparison { variable, op, literal } => {
                write!(f, "{variable} {op} {literal}")
            }
            Condition::BooleanTest { variable, negated } => {
                if *negated {
                    write!(f, "!{variable}")
                } else {
                    f.write_str(variable)
                }
            }
        }
    }
}

/// One reachable decision branch: the conjunction of conditions guarding
/// entry into its body, plus an identifier unique within an extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub conditions: Vec<Condition>,
}

impl Branch {
    pub fn new(id: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Self {
            id: id.into(),
            conditions,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Branch {}: ", self.id)?;
        for (i, cond) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{cond}")?;
        }
        Ok(())
    }
}
