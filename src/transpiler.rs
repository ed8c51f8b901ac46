//! Render a [`Query`] into a MySQL statement.
//!
//! Clause order is fixed regardless of the order the builder was called in:
//! head, FROM, JOIN, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT.

use std::fmt;

use crate::ast::StatementKind;
use crate::error::{BuildError, BuildResult};
use crate::query::Query;

impl Query {
    /// Produce the SQL text, or the first error recorded while building.
    ///
    /// Rendering does not consume or change the query; calling it twice
    /// yields the same string.
    pub fn render(&self) -> BuildResult<String> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.validate()?;

        let mut sql = String::new();

        match self.kind {
            StatementKind::Select => {
                sql.push_str("SELECT ");
                if self.distinct {
                    sql.push_str("DISTINCT ");
                }
                sql.push_str(&self.select.join(", "));
                sql.push_str(" FROM ");
                sql.push_str(&self.from.join(", "));
            }
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete => {
                sql.push_str(&self.head);
            }
        }

        sql.push_str(&self.joins.render());

        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.render());
        }

        if !self.group.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group.join(", "));
        }

        if !self.havings.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.havings.render());
        }

        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }

        if let Some(limit) = &self.limit {
            sql.push(' ');
            sql.push_str(limit);
        }

        tracing::debug!(kind = %self.kind, sql = %sql, "rendered query");
        Ok(sql)
    }

    fn validate(&self) -> BuildResult<()> {
        match self.kind {
            StatementKind::Select if self.select.is_empty() => {
                Err(BuildError::config("SELECT without fields"))
            }
            StatementKind::Select if self.from.is_empty() => {
                Err(BuildError::config("SELECT without FROM"))
            }
            StatementKind::Update | StatementKind::Delete if self.wheres.is_empty() => {
                Err(BuildError::config(format!("{} without WHERE", self.kind)))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Query {
    /// Writes the rendered SQL; fails if the query cannot be rendered.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = self.render().map_err(|_| fmt::Error)?;
        f.write_str(&sql)
    }
}
