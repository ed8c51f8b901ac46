//! WHERE / HAVING token lists with nested boolean groups.
//!
//! Conditions are stored in call order together with structural markers.
//! AND is implicit; an explicit `Or` marker switches the connector in front
//! of the next condition or group.

use crate::ast::Token;

/// An ordered list of condition tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionList {
    tokens: Vec<Token>,
}

impl ConditionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.tokens.iter().any(|t| matches!(t, Token::Condition(_)))
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Append a rendered condition fragment.
    pub fn push(&mut self, fragment: impl Into<String>) {
        self.tokens.push(Token::Condition(fragment.into()));
    }

    /// Make the next condition or group join with OR.
    pub fn push_or(&mut self) {
        self.tokens.push(Token::Or);
    }

    /// Open a group; returns the position to hand back to [`close_group`].
    ///
    /// [`close_group`]: ConditionList::close_group
    pub fn open_group(&mut self) -> usize {
        self.tokens.push(Token::GroupOpen);
        self.tokens.len() - 1
    }

    /// Close the group opened at `open`. A group that received no condition
    /// is removed together with any markers it collected.
    ///
    /// Returns `false`, leaving the list untouched, when `open` no longer
    /// points at a `GroupOpen`.
    pub fn close_group(&mut self, open: usize) -> bool {
        if self.tokens.get(open) != Some(&Token::GroupOpen) {
            return false;
        }
        let has_condition = self.tokens[open + 1..]
            .iter()
            .any(|t| matches!(t, Token::Condition(_)));
        if has_condition {
            self.tokens.push(Token::GroupClose);
        } else {
            self.tokens.truncate(open);
        }
        true
    }

    /// Join the tokens into a clause body (without the WHERE/HAVING keyword).
    pub fn render(&self) -> String {
        let mut sql = String::new();
        // Something has been written since the last `(` (or the start).
        let mut need_connector = false;
        let mut pending_or = false;

        for token in &self.tokens {
            match token {
                Token::Or => pending_or = true,
                Token::GroupClose => {
                    sql.push(')');
                    need_connector = true;
                    pending_or = false;
                }
                Token::GroupOpen | Token::Condition(_) => {
                    if need_connector {
                        sql.push_str(if pending_or { " OR " } else { " AND " });
                    }
                    pending_or = false;
                    match token {
                        Token::Condition(fragment) => {
                            sql.push_str(fragment);
                            need_connector = true;
                        }
                        _ => {
                            sql.push('(');
                            need_connector = false;
                        }
                    }
                }
            }
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implicit_and() {
        let mut list = ConditionList::new();
        list.push("`a`=1");
        list.push("`b`=2");
        assert_eq!(list.render(), "`a`=1 AND `b`=2");
    }

    #[test]
    fn test_or_marker() {
        let mut list = ConditionList::new();
        list.push("`a`=1");
        list.push_or();
        list.push("`b`=2");
        list.push("`c`=3");
        assert_eq!(list.render(), "`a`=1 OR `b`=2 AND `c`=3");
    }

    #[test]
    fn test_group_has_no_leading_connector() {
        let mut list = ConditionList::new();
        list.push("`a`=1");
        let open = list.open_group();
        list.push("`b`=2");
        list.push_or();
        list.push("`c`=3");
        list.close_group(open);
        assert_eq!(list.render(), "`a`=1 AND (`b`=2 OR `c`=3)");
    }

    #[test]
    fn test_or_before_group() {
        let mut list = ConditionList::new();
        list.push("`a`=1");
        list.push_or();
        let open = list.open_group();
        list.push("`b`=2");
        list.close_group(open);
        assert_eq!(list.render(), "`a`=1 OR (`b`=2)");
    }

    #[test]
    fn test_leading_or_is_ignored() {
        let mut list = ConditionList::new();
        list.push_or();
        list.push("`a`=1");
        assert_eq!(list.render(), "`a`=1");
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let mut list = ConditionList::new();
        list.push("`a`=1");
        let open = list.open_group();
        list.push_or();
        list.close_group(open);
        assert_eq!(list.tokens(), &[Token::Condition("`a`=1".to_string())]);
        assert_eq!(list.render(), "`a`=1");
    }

    #[test]
    fn test_nested_groups_balance() {
        let mut list = ConditionList::new();
        let outer = list.open_group();
        list.push("`a`=1");
        let inner = list.open_group();
        list.push("`b`=2");
        list.push_or();
        list.push("`c`=3");
        list.close_group(inner);
        list.close_group(outer);
        let sql = list.render();
        assert_eq!(sql, "(`a`=1 AND (`b`=2 OR `c`=3))");
        assert_eq!(sql.matches('(').count(), sql.matches(')').count());
    }

    #[test]
    fn test_close_group_with_stale_position() {
        let mut list = ConditionList::new();
        list.push("`a`=1");
        assert!(!list.close_group(4));
        assert!(!list.close_group(0));
        assert_eq!(list.render(), "`a`=1");
    }
}
