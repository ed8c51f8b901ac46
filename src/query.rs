//! The fluent statement builder.
//!
//! A [`Query`] holds one slot per SQL clause and is moved through a chain of
//! calls. Identifiers are ticked and values escaped as each call is made;
//! [`Query::render`] only concatenates the slots.
//!
//! ```
//! use quill::Query;
//!
//! let sql = Query::select("id, name")
//!     .from("users")
//!     .where_("age > 18")
//!     .where_group(|q| q.where_("role = admin").or().where_("role = mod"))
//!     .desc("created_at")
//!     .limit(10)
//!     .render()
//!     .unwrap();
//!
//! assert_eq!(
//!     sql,
//!     "SELECT `id`, `name` FROM `users` WHERE `age`>18 AND (`role`='admin' OR `role`='mod') \
//!      ORDER BY `created_at` DESC LIMIT 10"
//! );
//! ```
//!
//! A call that cannot be applied (unparseable condition, unknown aggregate,
//! a clause that does not fit the statement) leaves the clauses untouched
//! and records the error; every later call is ignored and `render()`
//! returns that first error.

use crate::ast::{Condition, JoinKind, SortOrder, StatementKind};
use crate::conditions::ConditionList;
use crate::error::{BuildError, BuildResult};
use crate::fields::{aggregate_sql, render_expression, render_field, render_table, IntoFields};
use crate::join::JoinClauses;
use crate::parser::parse_condition;
use crate::sanitize::{fix_dot, tick, Sanitizer};
use crate::value::Value;

/// Which condition list `or()` applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Where,
    Having,
}

/// A SQL statement under construction.
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) kind: StatementKind,
    pub(crate) sanitizer: Sanitizer,
    pub(crate) select: Vec<String>,
    pub(crate) distinct: bool,
    pub(crate) from: Vec<String>,
    /// Head fragment for INSERT / UPDATE / DELETE.
    pub(crate) head: String,
    pub(crate) joins: JoinClauses,
    pub(crate) wheres: ConditionList,
    pub(crate) havings: ConditionList,
    pub(crate) group: Vec<String>,
    pub(crate) order: Vec<String>,
    pub(crate) limit: Option<String>,
    pub(crate) bindings: Vec<Value>,
    pub(crate) error: Option<BuildError>,
    last: Target,
}

impl Query {
    fn empty(kind: StatementKind, sanitizer: Sanitizer) -> Self {
        Self {
            kind,
            sanitizer,
            select: Vec::new(),
            distinct: false,
            from: Vec::new(),
            head: String::new(),
            joins: JoinClauses::default(),
            wheres: ConditionList::new(),
            havings: ConditionList::new(),
            group: Vec::new(),
            order: Vec::new(),
            limit: None,
            bindings: Vec::new(),
            error: None,
            last: Target::Where,
        }
    }

    /// Start a SELECT. Accepts `"*"`, `"a, b AS c"`, `["t.a", "COUNT(*) n"]`.
    pub fn select(fields: impl IntoFields) -> Self {
        Self::select_with(Sanitizer::manual(), fields)
    }

    /// Start a SELECT whose values are escaped by `sanitizer`.
    pub fn select_with(sanitizer: Sanitizer, fields: impl IntoFields) -> Self {
        let fields = fields.into_fields();
        Self::empty(StatementKind::Select, sanitizer).apply(|q| {
            q.select = fields
                .iter()
                .map(|f| render_field(f))
                .collect::<BuildResult<_>>()?;
            Ok(())
        })
    }

    /// Start an `INSERT INTO table (cols) VALUES (vals)`.
    pub fn insert<I, K, V>(table: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        Self::insert_with(Sanitizer::manual(), table, fields)
    }

    pub fn insert_with<I, K, V>(sanitizer: Sanitizer, table: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let pairs = payload(&sanitizer, fields);
        Self::empty(StatementKind::Insert, sanitizer).apply(|q| {
            let table = render_table(table)?;
            if pairs.is_empty() {
                return Err(BuildError::config("INSERT without values"));
            }
            let (cols, vals): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
            q.head = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                cols.join(", "),
                vals.join(", ")
            );
            Ok(())
        })
    }

    /// Start an `UPDATE table SET col=val, ...`. Needs a WHERE to render.
    pub fn update<I, K, V>(table: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        Self::update_with(Sanitizer::manual(), table, fields)
    }

    pub fn update_with<I, K, V>(sanitizer: Sanitizer, table: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let pairs = payload(&sanitizer, fields);
        Self::empty(StatementKind::Update, sanitizer).apply(|q| {
            let table = render_table(table)?;
            if pairs.is_empty() {
                return Err(BuildError::config("UPDATE without values"));
            }
            let sets: Vec<String> = pairs
                .into_iter()
                .map(|(col, val)| format!("{}={}", col, val))
                .collect();
            q.head = format!("UPDATE {} SET {}", table, sets.join(", "));
            Ok(())
        })
    }

    /// Start a `DELETE FROM table`. Needs a WHERE to render.
    pub fn delete(table: &str) -> Self {
        Self::delete_with(Sanitizer::manual(), table)
    }

    pub fn delete_with(sanitizer: Sanitizer, table: &str) -> Self {
        Self::empty(StatementKind::Delete, sanitizer).apply(|q| {
            q.head = format!("DELETE FROM {}", render_table(table)?);
            Ok(())
        })
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// The first error recorded while building, if any.
    pub fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }

    /// Values bound with [`Query::bind`], in order.
    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    /// Run `f` unless an earlier call failed; record its error otherwise.
    fn apply(mut self, f: impl FnOnce(&mut Self) -> BuildResult<()>) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(e) = f(&mut self) {
            tracing::warn!(error = %e, kind = %self.kind, "query construction failed");
            self.error = Some(e);
        }
        self
    }

    fn require_select(&self, clause: &str) -> BuildResult<()> {
        if self.kind == StatementKind::Select {
            Ok(())
        } else {
            Err(BuildError::config(format!(
                "{} is only valid in a SELECT, not in {}",
                clause, self.kind
            )))
        }
    }

    fn require_filter(&self, clause: &str) -> BuildResult<()> {
        if self.kind == StatementKind::Insert {
            Err(BuildError::config(format!("{} is not valid in INSERT", clause)))
        } else {
            Ok(())
        }
    }

    fn require_target(&self, target: Target) -> BuildResult<()> {
        match target {
            Target::Where => self.require_filter("WHERE"),
            Target::Having => self.require_select("HAVING"),
        }
    }

    fn list_mut(&mut self, target: Target) -> &mut ConditionList {
        match target {
            Target::Where => &mut self.wheres,
            Target::Having => &mut self.havings,
        }
    }

    // ---------------------------------------------------------------
    // FROM
    // ---------------------------------------------------------------

    /// Set the FROM tables (`"users"`, `"users u, orders o"`).
    pub fn from(self, tables: impl IntoFields) -> Self {
        let tables = tables.into_fields();
        self.apply(|q| {
            q.require_select("FROM")?;
            let rendered = tables
                .iter()
                .map(|t| render_table(t))
                .collect::<BuildResult<Vec<_>>>()?;
            q.from.extend(rendered);
            Ok(())
        })
    }

    /// `SELECT DISTINCT`.
    pub fn distinct(self) -> Self {
        self.apply(|q| {
            q.require_select("DISTINCT")?;
            q.distinct = true;
            Ok(())
        })
    }

    // ---------------------------------------------------------------
    // WHERE / HAVING
    // ---------------------------------------------------------------

    fn condition(self, target: Target, input: &str) -> Self {
        self.apply(|q| {
            q.require_target(target)?;
            let fragment = parse_condition(input)?.to_sql(&q.sanitizer)?;
            q.list_mut(target).push(fragment);
            q.last = target;
            Ok(())
        })
    }

    fn grouped<F>(self, target: Target, build: F) -> Self
    where
        F: FnOnce(Query) -> Query,
    {
        let mut query = self.apply(|q| q.require_target(target));
        if query.error.is_some() {
            return query;
        }
        let open = query.list_mut(target).open_group();
        query.last = target;

        let mut query = build(query);
        if !query.list_mut(target).close_group(open) {
            return query.apply(|_| Err(BuildError::config("group closure replaced the query")));
        }
        query.last = target;
        query
    }

    /// Add a condition such as `"age > 18"` or `"name LIKE 'jo%'"`.
    /// Consecutive conditions are joined with AND.
    pub fn where_(self, condition: &str) -> Self {
        self.condition(Target::Where, condition)
    }

    /// Add a pre-built fragment verbatim. Nothing is quoted.
    pub fn where_raw(self, sql: &str) -> Self {
        self.apply(|q| {
            q.require_filter("WHERE")?;
            q.wheres.push(Condition::raw(sql).to_sql(&q.sanitizer)?);
            q.last = Target::Where;
            Ok(())
        })
    }

    /// Parenthesized group: `where_group(|q| q.where_("a = 1").or().where_("b = 2"))`.
    pub fn where_group<F>(self, build: F) -> Self
    where
        F: FnOnce(Query) -> Query,
    {
        self.grouped(Target::Where, build)
    }

    /// A group whose conditions are joined by OR.
    pub fn where_any<I, S>(self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.where_group(|mut q| {
            for (i, cond) in conditions.into_iter().enumerate() {
                if i > 0 {
                    q = q.or();
                }
                q = q.where_(cond.as_ref());
            }
            q
        })
    }

    /// Join the next condition or group with OR instead of AND.
    pub fn or(self) -> Self {
        self.apply(|q| {
            let target = q.last;
            q.list_mut(target).push_or();
            Ok(())
        })
    }

    /// AND is the default connector; kept for readable chains.
    pub fn and(self) -> Self {
        self
    }

    /// Add a HAVING condition (`"COUNT(id) > 5"`).
    pub fn having(self, condition: &str) -> Self {
        self.condition(Target::Having, condition)
    }

    /// Parenthesized HAVING group.
    pub fn having_group<F>(self, build: F) -> Self
    where
        F: FnOnce(Query) -> Query,
    {
        self.grouped(Target::Having, build)
    }

    /// Full-text search: adds `MATCH(..) AGAINST(..)` to WHERE and its
    /// relevance to the select list as `score`.
    pub fn match_against(self, fields: impl IntoFields, term: &str) -> Self {
        let fields = fields.into_fields();
        self.apply(|q| {
            q.require_select("MATCH")?;
            if fields.is_empty() {
                return Err(BuildError::parse(term, "MATCH needs at least one column"));
            }
            let cols = fields
                .iter()
                .map(|f| render_expression(f))
                .collect::<BuildResult<Vec<_>>>()?;
            let fragment = format!(
                "MATCH({}) AGAINST({})",
                cols.join(","),
                q.sanitizer.quote(term)
            );
            q.select.push(format!("{} AS `score`", fragment));
            q.wheres.push(fragment);
            q.last = Target::Where;
            Ok(())
        })
    }

    // ---------------------------------------------------------------
    // JOIN
    // ---------------------------------------------------------------

    fn add_join(self, kind: JoinKind, table: &str) -> Self {
        self.apply(|q| {
            q.require_select(kind.keyword())?;
            q.joins.add(kind, table)
        })
    }

    /// `JOIN table [AS alias]`.
    pub fn join(self, table: &str) -> Self {
        self.add_join(JoinKind::Inner, table)
    }

    pub fn left_join(self, table: &str) -> Self {
        self.add_join(JoinKind::Left, table)
    }

    pub fn right_join(self, table: &str) -> Self {
        self.add_join(JoinKind::Right, table)
    }

    /// ON clause for the join at the same position (`"orders.id = users.order_id"`).
    pub fn on(self, clause: &str) -> Self {
        self.apply(|q| q.joins.on(clause))
    }

    /// USING clause for the join at the same position.
    pub fn using(self, field: &str) -> Self {
        self.apply(|q| q.joins.using(field))
    }

    // ---------------------------------------------------------------
    // Aggregates
    // ---------------------------------------------------------------

    /// Append `FUNC(field)` to the select list, replacing a lone `*`.
    pub fn aggregate(self, func: &str, field: &str) -> Self {
        self.apply(|q| {
            q.require_select(func)?;
            let fragment = aggregate_sql(func, field)?;
            if q.select.len() == 1 && q.select[0] == "*" {
                q.select.clear();
            }
            q.select.push(fragment);
            Ok(())
        })
    }

    pub fn count(self, field: &str) -> Self {
        self.aggregate("COUNT", field)
    }

    pub fn sum(self, field: &str) -> Self {
        self.aggregate("SUM", field)
    }

    pub fn avg(self, field: &str) -> Self {
        self.aggregate("AVG", field)
    }

    pub fn min(self, field: &str) -> Self {
        self.aggregate("MIN", field)
    }

    pub fn max(self, field: &str) -> Self {
        self.aggregate("MAX", field)
    }

    // ---------------------------------------------------------------
    // GROUP BY / ORDER BY / LIMIT
    // ---------------------------------------------------------------

    /// `GROUP BY` fields.
    pub fn group(self, fields: impl IntoFields) -> Self {
        let fields = fields.into_fields();
        self.apply(|q| {
            q.require_select("GROUP BY")?;
            let rendered = fields
                .iter()
                .map(|f| render_expression(f))
                .collect::<BuildResult<Vec<_>>>()?;
            q.group.extend(rendered);
            Ok(())
        })
    }

    /// `ORDER BY field direction`; direction is `ASC` or `DESC`.
    pub fn order(self, field: &str, direction: &str) -> Self {
        self.apply(|q| {
            let dir = match direction.trim().to_ascii_uppercase().as_str() {
                "ASC" => SortOrder::Asc,
                "DESC" => SortOrder::Desc,
                _ => return Err(BuildError::Unsupported(direction.trim().to_string())),
            };
            q.push_order(field, dir)
        })
    }

    pub fn asc(self, field: &str) -> Self {
        self.apply(|q| q.push_order(field, SortOrder::Asc))
    }

    pub fn desc(self, field: &str) -> Self {
        self.apply(|q| q.push_order(field, SortOrder::Desc))
    }

    fn push_order(&mut self, field: &str, dir: SortOrder) -> BuildResult<()> {
        self.require_filter("ORDER BY")?;
        let field = render_expression(field)?;
        self.order.push(format!("{} {}", field, dir.as_str()));
        Ok(())
    }

    /// `LIMIT count`.
    pub fn limit(self, count: u64) -> Self {
        self.apply(|q| {
            q.require_filter("LIMIT")?;
            q.limit = Some(format!("LIMIT {}", count));
            Ok(())
        })
    }

    /// `LIMIT start, count`.
    pub fn limit_range(self, start: u64, count: u64) -> Self {
        self.apply(|q| {
            q.require_select("LIMIT with offset")?;
            q.limit = Some(format!("LIMIT {}, {}", start, count));
            Ok(())
        })
    }

    // ---------------------------------------------------------------
    // Parameters
    // ---------------------------------------------------------------

    /// Bind a value for the next `?` placeholder.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.bindings.push(value.into());
        self
    }
}

/// Tick every column and escape every value of an INSERT/UPDATE payload.
fn payload<I, K, V>(sanitizer: &Sanitizer, fields: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(col, val)| {
            let (name, prefix) = fix_dot(col.as_ref());
            (
                format!("{}{}", prefix, tick(&name)),
                val.into().to_sql(sanitizer),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_where_keeps_prior_state() {
        let q = Query::select("*").from("users").where_("a = 1");
        let before = q.wheres.clone();
        let q = q.where_("a ~ 1");
        assert_eq!(q.wheres, before);
        assert!(matches!(q.error(), Some(BuildError::Parse { .. })));
    }

    #[test]
    fn test_calls_after_error_are_ignored() {
        let q = Query::select("*").from("users").order("id", "sideways").where_("a = 1");
        assert_eq!(q.error(), Some(&BuildError::Unsupported("sideways".to_string())));
        assert!(q.wheres.is_empty());
    }

    #[test]
    fn test_from_on_insert_is_rejected() {
        let q = Query::insert("users", [("name", "Jo")]).from("other");
        assert!(matches!(q.error(), Some(BuildError::Config(_))));
    }

    #[test]
    fn test_or_applies_to_last_list() {
        let q = Query::select("*")
            .from("t")
            .where_("a = 1")
            .having("COUNT(id) > 1")
            .or()
            .having("SUM(x) > 2");
        assert_eq!(q.havings.render(), "COUNT(`id`)>1 OR SUM(`x`)>2");
        assert_eq!(q.wheres.render(), "`a`=1");
    }

    #[test]
    fn test_bind_collects_values() {
        let q = Query::select("*").from("users").where_("id = ?").bind(7);
        assert_eq!(q.bindings(), &[Value::Int(7)]);
    }

    #[test]
    fn test_insert_rejects_filters() {
        let q = Query::insert("users", [("a", 1)]).where_("id = 1");
        assert!(matches!(q.error(), Some(BuildError::Config(_))));
        assert!(q.wheres.is_empty());

        for q in [
            Query::insert("users", [("a", 1)]).asc("id"),
            Query::insert("users", [("a", 1)]).limit(1),
            Query::insert("users", [("a", 1)]).where_raw("1=1"),
            Query::insert("users", [("a", 1)]).where_group(|q| q.where_("id = 1")),
        ] {
            assert!(matches!(q.error(), Some(BuildError::Config(_))));
        }
    }

    #[test]
    fn test_having_is_select_only() {
        let q = Query::update("users", [("a", 1)]).having("COUNT(id) > 1");
        assert!(matches!(q.error(), Some(BuildError::Config(_))));
        let q = Query::delete("users").having_group(|q| q.having("COUNT(id) > 1"));
        assert!(matches!(q.error(), Some(BuildError::Config(_))));
    }

    #[test]
    fn test_group_closure_replacing_query() {
        let q = Query::select("*")
            .from("t")
            .where_("a = 1")
            .where_("b = 2")
            .where_group(|_| Query::select("*").from("x"));
        assert_eq!(
            q.error(),
            Some(&BuildError::Config("group closure replaced the query".to_string()))
        );
    }
}
