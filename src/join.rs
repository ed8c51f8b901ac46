//! JOIN / ON / USING assembly.
//!
//! Joins and their constraints are recorded in two lists and paired by
//! position: the n-th `on()`/`using()` call belongs to the n-th join,
//! whatever its kind. A join with no constraint at its index renders bare.

use crate::ast::{JoinConstraint, JoinKind, JoinSpec};
use crate::error::{BuildError, BuildResult};
use crate::fields::render_table;
use crate::parser::parse_on;
use crate::sanitize::{fix_dot, tick};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinClauses {
    joins: Vec<JoinSpec>,
    constraints: Vec<JoinConstraint>,
}

impl JoinClauses {
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    pub fn add(&mut self, kind: JoinKind, table: &str) -> BuildResult<()> {
        let table = render_table(table)?;
        self.joins.push(JoinSpec { kind, table });
        Ok(())
    }

    /// Record `a.x = b.y` as `` `a`.`x`=`b`.`y` ``.
    pub fn on(&mut self, clause: &str) -> BuildResult<()> {
        let (left, right) = parse_on(clause)?;
        self.constraints.push(JoinConstraint::On(format!(
            "{}={}",
            qualified(&left),
            qualified(&right)
        )));
        Ok(())
    }

    pub fn using(&mut self, field: &str) -> BuildResult<()> {
        let (name, prefix) = fix_dot(field);
        if name.is_empty() {
            return Err(BuildError::parse(field, "expected a column name"));
        }
        self.constraints
            .push(JoinConstraint::Using(format!("{}{}", prefix, tick(&name))));
        Ok(())
    }

    /// Render every join, each prefixed with a space.
    pub fn render(&self) -> String {
        let mut sql = String::new();
        for (i, join) in self.joins.iter().enumerate() {
            sql.push(' ');
            sql.push_str(join.kind.keyword());
            sql.push(' ');
            sql.push_str(&join.table);
            match self.constraints.get(i) {
                Some(JoinConstraint::On(on)) => {
                    sql.push_str(" ON ");
                    sql.push_str(on);
                }
                Some(JoinConstraint::Using(field)) => {
                    sql.push_str(" USING(");
                    sql.push_str(field);
                    sql.push(')');
                }
                None => {}
            }
        }
        sql
    }
}

fn qualified(field: &str) -> String {
    let (field, prefix) = fix_dot(field);
    format!("{}{}", prefix, tick(&field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_on() {
        let mut joins = JoinClauses::default();
        joins.add(JoinKind::Inner, "orders").unwrap();
        joins.on("orders.id = users.order_id").unwrap();
        assert_eq!(joins.render(), " JOIN `orders` ON `orders`.`id`=`users`.`order_id`");
    }

    #[test]
    fn test_positional_pairing_leaves_extra_join_bare() {
        let mut joins = JoinClauses::default();
        joins.add(JoinKind::Inner, "orders").unwrap();
        joins.add(JoinKind::Left, "payments p").unwrap();
        joins.on("orders.user_id = users.id").unwrap();
        assert_eq!(
            joins.render(),
            " JOIN `orders` ON `orders`.`user_id`=`users`.`id` LEFT JOIN `payments` AS `p`"
        );
    }

    #[test]
    fn test_using_and_on_mixed() {
        let mut joins = JoinClauses::default();
        joins.add(JoinKind::Right, "profiles").unwrap();
        joins.using("user_id").unwrap();
        joins.add(JoinKind::Inner, "roles r").unwrap();
        joins.on("r.id = profiles.role_id").unwrap();
        assert_eq!(
            joins.render(),
            " RIGHT JOIN `profiles` USING(`user_id`) JOIN `roles` AS `r` ON `r`.`id`=`profiles`.`role_id`"
        );
    }

    #[test]
    fn test_bad_on_clause() {
        let mut joins = JoinClauses::default();
        assert!(joins.on("orders.id").is_err());
        assert!(joins.render().is_empty());
    }
}
