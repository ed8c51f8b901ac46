//! Building blocks shared by the parser, the builder and the renderer.

use std::fmt;

use crate::error::BuildResult;
use crate::fields::render_expression;
use crate::sanitize::{is_numeric, tick, trim_quotes, Sanitizer};

/// The statement a query produces. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    LtGt,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::LtGt => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// What a parsed condition does with its operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorKind {
    Comparison(CompareOp),
    IsNull,
    IsNotNull,
    /// Any other `IS ...` test; holds the upper-cased remainder.
    Is(String),
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    /// Pre-built SQL, emitted verbatim.
    Raw,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorKind::Comparison(op) => write!(f, "{}", op.as_str()),
            OperatorKind::IsNull => write!(f, "IS NULL"),
            OperatorKind::IsNotNull => write!(f, "IS NOT NULL"),
            OperatorKind::Is(rest) => write!(f, "{}", rest),
            OperatorKind::Like => write!(f, "LIKE"),
            OperatorKind::NotLike => write!(f, "NOT LIKE"),
            OperatorKind::In => write!(f, "IN"),
            OperatorKind::NotIn => write!(f, "NOT IN"),
            OperatorKind::Between => write!(f, "BETWEEN"),
            OperatorKind::Raw => write!(f, "RAW"),
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `?`, left for the executor to bind.
    Placeholder,
    Number(String),
    Text(String),
}

impl Operand {
    /// Classify a raw operand after stripping its quotes.
    pub fn parse(raw: &str) -> Self {
        let value = trim_quotes(raw);
        if value == "?" {
            Operand::Placeholder
        } else if is_numeric(value) {
            Operand::Number(value.to_string())
        } else {
            Operand::Text(value.to_string())
        }
    }

    /// Like [`Operand::parse`] but never treats the value as a number.
    pub fn text(raw: &str) -> Self {
        match trim_quotes(raw) {
            "?" => Operand::Placeholder,
            value => Operand::Text(value.to_string()),
        }
    }

    pub fn to_sql(&self, sanitizer: &Sanitizer) -> String {
        match self {
            Operand::Placeholder => "?".to_string(),
            Operand::Number(n) => n.clone(),
            Operand::Text(s) => sanitizer.quote(s),
        }
    }
}

/// A condition parsed out of a DSL string such as `"users.age > 18"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Ticked table qualifier with trailing dot, or empty.
    pub table_prefix: String,
    /// Bare field name (or the whole fragment for [`OperatorKind::Raw`]).
    pub field: String,
    pub kind: OperatorKind,
    pub operands: Vec<Operand>,
}

impl Condition {
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            table_prefix: String::new(),
            field: sql.into(),
            kind: OperatorKind::Raw,
            operands: vec![],
        }
    }

    /// Render the condition into a WHERE/HAVING fragment.
    pub fn to_sql(&self, sanitizer: &Sanitizer) -> BuildResult<String> {
        if self.kind == OperatorKind::Raw {
            return Ok(self.field.clone());
        }
        let col = if self.field.contains('(') {
            render_expression(&self.field)?
        } else {
            format!("{}{}", self.table_prefix, tick(&self.field))
        };
        let values: Vec<String> = self.operands.iter().map(|o| o.to_sql(sanitizer)).collect();

        Ok(match &self.kind {
            OperatorKind::Comparison(op) => {
                format!("{}{}{}", col, op.as_str(), values.first().map_or("", String::as_str))
            }
            OperatorKind::IsNull => format!("{} IS NULL", col),
            OperatorKind::IsNotNull => format!("{} IS NOT NULL", col),
            OperatorKind::Is(rest) => format!("{} {}", col, rest),
            OperatorKind::Like | OperatorKind::NotLike => {
                format!("{} {} {}", col, self.kind, values.first().map_or("''", String::as_str))
            }
            OperatorKind::In | OperatorKind::NotIn => {
                format!("{} {} ({})", col, self.kind, values.join(","))
            }
            OperatorKind::Between => format!(
                "{} BETWEEN {} AND {}",
                col,
                values.first().map_or("", String::as_str),
                values.get(1).map_or("", String::as_str)
            ),
            OperatorKind::Raw => self.field.clone(),
        })
    }
}

/// One entry of a WHERE or HAVING token list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Rendered condition fragment.
    Condition(String),
    Or,
    GroupOpen,
    GroupClose,
}

/// Join flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// A joined table, ticked and optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub table: String,
}

/// ON / USING attached to the join with the same index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinConstraint {
    On(String),
    Using(String),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_parse() {
        assert_eq!(Operand::parse("'john'"), Operand::Text("john".to_string()));
        assert_eq!(Operand::parse(" 18 "), Operand::Number("18".to_string()));
        assert_eq!(Operand::parse("?"), Operand::Placeholder);
        assert_eq!(Operand::text("5"), Operand::Text("5".to_string()));
    }

    #[test]
    fn test_condition_to_sql() {
        let cond = Condition {
            table_prefix: "`users`.".to_string(),
            field: "age".to_string(),
            kind: OperatorKind::Between,
            operands: vec![Operand::parse("18"), Operand::parse("30")],
        };
        assert_eq!(
            cond.to_sql(&Sanitizer::manual()).unwrap(),
            "`users`.`age` BETWEEN 18 AND 30"
        );
    }
}
