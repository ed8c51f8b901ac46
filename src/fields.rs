//! Field lists, SQL function calls and aggregates.
//!
//! Select lists arrive as loose text (`"users.id, name AS n, ROUND(AVG(price), 2)"`)
//! and leave with every identifier ticked. Function calls are re-wrapped with
//! their arguments rendered recursively, so nesting works to any depth.

use crate::error::{BuildError, BuildResult};
use crate::sanitize::{fix_as, fix_dot, is_numeric, tick};

/// Aggregate functions the MySQL dialect accepts through [`aggregate_sql`].
pub const AGGREGATES: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX", "GROUP_CONCAT"];

/// Anything that can be turned into a list of field specs.
pub trait IntoFields {
    fn into_fields(self) -> Vec<String>;
}

impl IntoFields for &str {
    fn into_fields(self) -> Vec<String> {
        split_fields(self).into_iter().map(str::to_string).collect()
    }
}

impl IntoFields for String {
    fn into_fields(self) -> Vec<String> {
        self.as_str().into_fields()
    }
}

impl IntoFields for &[&str] {
    fn into_fields(self) -> Vec<String> {
        self.iter().map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect()
    }
}

impl<const N: usize> IntoFields for [&str; N] {
    fn into_fields(self) -> Vec<String> {
        self.as_slice().into_fields()
    }
}

impl IntoFields for Vec<&str> {
    fn into_fields(self) -> Vec<String> {
        self.as_slice().into_fields()
    }
}

impl IntoFields for Vec<String> {
    fn into_fields(self) -> Vec<String> {
        self.into_iter().map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect()
    }
}

/// Split on commas that are not nested in parentheses or quotes.
pub fn split_fields(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match (c, quote) {
            ('\'' | '"' | '`', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            (_, Some(_)) => {}
            ('(', None) => depth += 1,
            (')', None) => depth -= 1,
            (',', None) if depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Render a select field, honoring `AS` aliases.
pub fn render_field(field: &str) -> BuildResult<String> {
    let (base, alias) = fix_as(field);
    Ok(format!("{}{}", render_expression(&base)?, alias))
}

/// Render a table reference for FROM / JOIN.
pub fn render_table(table: &str) -> BuildResult<String> {
    let (base, alias) = fix_as(table);
    if base.is_empty() || base.contains('(') {
        return Err(BuildError::parse(table, "expected a table name"));
    }
    let (name, prefix) = fix_dot(&base);
    Ok(format!("{}{}{}", prefix, tick(&name), alias))
}

/// Render a bare expression: `*`, `t.*`, `t.field`, a literal or a
/// function call.
pub fn render_expression(expr: &str) -> BuildResult<String> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(BuildError::parse(expr, "empty field"));
    }
    if expr.contains('(') {
        return render_function(expr);
    }
    if expr == "*" || expr == "?" || is_numeric(expr) || is_quoted(expr) || is_keyword(expr) {
        return Ok(expr.to_string());
    }
    let (field, prefix) = fix_dot(expr);
    Ok(format!("{}{}", prefix, tick(&field)))
}

/// Re-wrap `NAME(args...)` with each argument rendered.
fn render_function(expr: &str) -> BuildResult<String> {
    let open = expr
        .find('(')
        .ok_or_else(|| BuildError::parse(expr, "expected a function call"))?;
    let close = matching_paren(expr, open)
        .ok_or_else(|| BuildError::parse(expr, "unbalanced parentheses"))?;

    let name = expr[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(BuildError::parse(expr, format!("invalid function name '{}'", name)));
    }

    let args = split_fields(&expr[open + 1..close])
        .into_iter()
        .map(render_argument)
        .collect::<BuildResult<Vec<_>>>()?;

    Ok(format!("{}({}){}", name, args.join(", "), &expr[close + 1..]))
}

fn render_argument(arg: &str) -> BuildResult<String> {
    let (distinct, arg) = strip_distinct(arg);

    // CAST(x AS TYPE): the target type is not an identifier.
    let upper = arg.to_ascii_uppercase();
    let rendered = match upper.find(" AS ") {
        Some(pos) => format!("{} AS {}", render_expression(&arg[..pos])?, arg[pos + 4..].trim()),
        None => render_expression(arg)?,
    };

    Ok(if distinct {
        format!("DISTINCT {}", rendered)
    } else {
        rendered
    })
}

/// Build `FUNC([DISTINCT ]table.field)[ AS alias]`.
pub fn aggregate_sql(func: &str, field: &str) -> BuildResult<String> {
    let name = func.trim().to_ascii_uppercase();
    if !AGGREGATES.contains(&name.as_str()) {
        return Err(BuildError::Unsupported(func.trim().to_string()));
    }

    let (distinct, field) = strip_distinct(field);
    let (base, alias) = fix_as(field);
    let arg = render_expression(&base)?;

    Ok(format!(
        "{}({}{}){}",
        name,
        if distinct { "DISTINCT " } else { "" },
        arg,
        alias
    ))
}

/// Position of the `)` closing the `(` at `open`.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in s[open..].char_indices() {
        match (c, quote) {
            ('\'' | '"', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            (_, Some(_)) => {}
            ('(', None) => depth += 1,
            (')', None) => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_distinct(field: &str) -> (bool, &str) {
    let field = field.trim();
    match field.get(..9) {
        Some(head) if head.eq_ignore_ascii_case("DISTINCT ") => (true, field[9..].trim()),
        _ => (false, field),
    }
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
}

fn is_keyword(s: &str) -> bool {
    matches!(
        s.to_ascii_uppercase().as_str(),
        "NULL" | "TRUE" | "FALSE" | "CURRENT_TIMESTAMP"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("id, name"), vec!["id", "name"]);
        assert_eq!(
            split_fields("ROUND(AVG(price), 2) AS p, 'a,b'"),
            vec!["ROUND(AVG(price), 2) AS p", "'a,b'"]
        );
        assert!(split_fields(" ").is_empty());
    }

    #[test]
    fn test_render_field() {
        assert_eq!(render_field("*").unwrap(), "*");
        assert_eq!(render_field("name").unwrap(), "`name`");
        assert_eq!(render_field("users.name AS n").unwrap(), "`users`.`name` AS `n`");
        assert_eq!(render_field("users.*").unwrap(), "`users`.*");
    }

    #[test]
    fn test_nested_functions() {
        assert_eq!(
            render_field("ROUND(AVG(orders.total), 2) AS avg_total").unwrap(),
            "ROUND(AVG(`orders`.`total`), 2) AS `avg_total`"
        );
        assert_eq!(
            render_field("CONCAT(first, ' ', last) full_name").unwrap(),
            "CONCAT(`first`, ' ', `last`) AS `full_name`"
        );
        assert_eq!(render_field("NOW()").unwrap(), "NOW()");
        assert_eq!(
            render_field("CAST(price AS DECIMAL(10,2))").unwrap(),
            "CAST(`price` AS DECIMAL(10,2))"
        );
        assert_eq!(render_field("COUNT(DISTINCT user_id)").unwrap(), "COUNT(DISTINCT `user_id`)");
    }

    #[test]
    fn test_render_field_errors() {
        assert!(render_field("ROUND(AVG(price)").is_err());
        assert!(render_field("(a)").is_err());
    }

    #[test]
    fn test_render_table() {
        assert_eq!(render_table("users").unwrap(), "`users`");
        assert_eq!(render_table("users AS u").unwrap(), "`users` AS `u`");
        assert_eq!(render_table("shop.orders o").unwrap(), "`shop`.`orders` AS `o`");
        assert!(render_table("(SELECT 1)").is_err());
    }

    #[test]
    fn test_aggregate_sql() {
        assert_eq!(aggregate_sql("count", "*").unwrap(), "COUNT(*)");
        assert_eq!(aggregate_sql("SUM", "orders.total AS revenue").unwrap(), "SUM(`orders`.`total`) AS `revenue`");
        assert_eq!(aggregate_sql("count", "DISTINCT user_id").unwrap(), "COUNT(DISTINCT `user_id`)");
        assert_eq!(
            aggregate_sql("MEDIAN", "x"),
            Err(BuildError::Unsupported("MEDIAN".to_string()))
        );
    }
}
