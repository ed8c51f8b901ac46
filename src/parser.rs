//! Condition parser using nom.
//!
//! Turns loosely written condition strings into [`Condition`]s.
//!
//! # Grammar
//!
//! ```text
//! users.age >= 18
//! ────┬──── ─┬ ─┬
//!     │      │  └── Operand (number, 'text', or ? placeholder)
//!     │      └── Operator
//!     └── Field (optionally table-qualified, or a function call)
//! ```
//!
//! Operators are tried in a fixed priority order, first match wins:
//! `IS [NOT] ...`, `[NOT] LIKE`, `[NOT] IN (...)`, `BETWEEN a AND b`, and
//! finally the comparisons `>= <= != <> = > <`. Keyword operators must be
//! surrounded by whitespace; comparisons may be written without it.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{eof, map, opt, recognize, rest, value, verify},
    error::{Error, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::ast::{CompareOp, Condition, Operand, OperatorKind};
use crate::error::{BuildError, BuildResult};
use crate::sanitize::fix_dot;

/// Parse a single condition string.
pub fn parse_condition(input: &str) -> BuildResult<Condition> {
    let input = input.trim();
    if input.is_empty() {
        return Err(BuildError::parse(input, "empty condition"));
    }

    match condition(input) {
        Ok(("", cond)) => {
            tracing::trace!(input, kind = %cond.kind, "parsed condition");
            Ok(cond)
        }
        Ok((remaining, _)) => Err(BuildError::parse(
            input,
            format!("unexpected trailing content: '{}'", remaining),
        )),
        Err(_) => Err(BuildError::parse(
            input,
            "expected `field <operator> value` (operators: IS, LIKE, IN, BETWEEN, =, !=, <>, >, <, >=, <=)",
        )),
    }
}

/// Parse an ON clause of the form `a.x = b.y` into its two sides.
pub fn parse_on(input: &str) -> BuildResult<(String, String)> {
    let input = input.trim();
    let parsed: IResult<&str, (&str, &str)> = tuple((
        terminated(ident, multispace0),
        preceded(pair(char('='), multispace0), terminated(ident, pair(multispace0, eof))),
    ))(input);

    match parsed {
        Ok((_, (left, right))) => Ok((left.to_string(), right.to_string())),
        Err(_) => Err(BuildError::parse(input, "expected `table.field = table.field`")),
    }
}

/// Parse the complete condition.
fn condition(input: &str) -> IResult<&str, Condition> {
    let (input, field) = field(input)?;
    let (input, (kind, operands)) = alt((is_test, like, in_list, between, comparison))(input)?;

    let (field, table_prefix) = if field.contains('(') {
        (field.to_string(), String::new())
    } else {
        fix_dot(field)
    };

    Ok((
        input,
        Condition {
            table_prefix,
            field,
            kind,
            operands,
        },
    ))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '`' | '$' | '*')
}

/// Parse an identifier (field name, optionally table-qualified).
fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(is_ident_char)(input)
}

/// Parse the left-hand side: an identifier or a function call.
fn field(input: &str) -> IResult<&str, &str> {
    recognize(pair(ident, opt(balanced_parens)))(input)
}

/// Consume a parenthesized group, honoring nesting.
fn balanced_parens(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('(') {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    }
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], &input[..=i]));
                }
            }
            _ => {}
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil)))
}

/// `IS NULL`, `IS NOT NULL` or any other `IS ...` test.
fn is_test(input: &str) -> IResult<&str, (OperatorKind, Vec<Operand>)> {
    let (input, _) = multispace1(input)?;
    let (input, _) = terminated(tag_no_case("IS"), multispace1)(input)?;
    let (input, remainder) = verify(rest, |s: &str| !s.trim().is_empty())(input)?;

    let remainder: Vec<String> = remainder
        .split_whitespace()
        .map(|w| w.to_ascii_uppercase())
        .collect();
    let kind = match remainder.join(" ").as_str() {
        "NULL" => OperatorKind::IsNull,
        "NOT NULL" => OperatorKind::IsNotNull,
        other => OperatorKind::Is(format!("IS {}", other)),
    };
    Ok((input, (kind, vec![])))
}

/// `LIKE 'pattern'` / `NOT LIKE 'pattern'`.
fn like(input: &str) -> IResult<&str, (OperatorKind, Vec<Operand>)> {
    let (input, _) = multispace1(input)?;
    let (input, negated) = opt(terminated(tag_no_case("NOT"), multispace1))(input)?;
    let (input, _) = terminated(tag_no_case("LIKE"), multispace1)(input)?;
    let (input, pattern) = verify(rest, |s: &str| !s.trim().is_empty())(input)?;

    let kind = if negated.is_some() {
        OperatorKind::NotLike
    } else {
        OperatorKind::Like
    };
    Ok((input, (kind, vec![Operand::text(pattern)])))
}

/// `IN (a, b, c)` / `NOT IN (a, b, c)`.
fn in_list(input: &str) -> IResult<&str, (OperatorKind, Vec<Operand>)> {
    let (input, _) = multispace1(input)?;
    let (input, negated) = opt(terminated(tag_no_case("NOT"), multispace1))(input)?;
    let (input, _) = terminated(tag_no_case("IN"), multispace0)(input)?;
    let (input, items) = delimited(
        char('('),
        separated_list1(char(','), delimited(multispace0, list_item, multispace0)),
        char(')'),
    )(input)?;
    let (input, _) = multispace0(input)?;

    let kind = if negated.is_some() {
        OperatorKind::NotIn
    } else {
        OperatorKind::In
    };
    Ok((input, (kind, items)))
}

fn list_item(input: &str) -> IResult<&str, Operand> {
    alt((
        quoted,
        map(
            verify(take_while1(|c: char| c != ',' && c != ')'), |s: &str| !s.trim().is_empty()),
            |s: &str| Operand::parse(s.trim()),
        ),
    ))(input)
}

/// `BETWEEN low AND high`.
fn between(input: &str) -> IResult<&str, (OperatorKind, Vec<Operand>)> {
    let (input, _) = multispace1(input)?;
    let (input, _) = terminated(tag_no_case("BETWEEN"), multispace1)(input)?;
    let (input, low) = bound(input)?;
    let (input, _) = delimited(multispace1, tag_no_case("AND"), multispace1)(input)?;
    let (input, high) = bound(input)?;
    let (input, _) = multispace0(input)?;

    Ok((input, (OperatorKind::Between, vec![low, high])))
}

fn bound(input: &str) -> IResult<&str, Operand> {
    alt((
        quoted,
        map(take_while1(|c: char| !c.is_whitespace()), Operand::parse),
    ))(input)
}

/// A quoted string operand. Always text, never a number.
fn quoted(input: &str) -> IResult<&str, Operand> {
    alt((
        map(
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            |s: &str| Operand::Text(s.to_string()),
        ),
        map(
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
            |s: &str| Operand::Text(s.to_string()),
        ),
    ))(input)
}

/// `= > < >= <= != <>` followed by a single operand.
fn comparison(input: &str) -> IResult<&str, (OperatorKind, Vec<Operand>)> {
    let (input, _) = multispace0(input)?;
    let (input, op) = alt((
        value(CompareOp::Gte, tag(">=")),
        value(CompareOp::Lte, tag("<=")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::LtGt, tag("<>")),
        value(CompareOp::Eq, char('=')),
        value(CompareOp::Gt, char('>')),
        value(CompareOp::Lt, char('<')),
    ))(input)?;
    let (input, _) = multispace0(input)?;
    // A fully quoted operand stays text: `zip = '01234'` must not become a number.
    let (input, operand) = alt((
        terminated(quoted, pair(multispace0, eof)),
        map(verify(rest, |s: &str| !s.trim().is_empty()), Operand::parse),
    ))(input)?;

    Ok((input, (OperatorKind::Comparison(op), vec![operand])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::Sanitizer;

    fn sql(input: &str) -> String {
        parse_condition(input).unwrap().to_sql(&Sanitizer::manual()).unwrap()
    }

    #[test]
    fn test_simple_comparison() {
        let cond = parse_condition("age > 18").unwrap();
        assert_eq!(cond.field, "age");
        assert_eq!(cond.kind, OperatorKind::Comparison(CompareOp::Gt));
        assert_eq!(cond.operands, vec![Operand::Number("18".to_string())]);
        assert_eq!(sql("age > 18"), "`age`>18");
    }

    #[test]
    fn test_all_comparisons() {
        assert_eq!(sql("a = 1"), "`a`=1");
        assert_eq!(sql("a != 1"), "`a`!=1");
        assert_eq!(sql("a <> 1"), "`a`<>1");
        assert_eq!(sql("a >= 1"), "`a`>=1");
        assert_eq!(sql("a <= 1"), "`a`<=1");
        assert_eq!(sql("a < 1"), "`a`<1");
    }

    #[test]
    fn test_unspaced_comparison() {
        assert_eq!(sql("age>=18"), "`age`>=18");
        assert_eq!(sql("name='jo'"), "`name`='jo'");
    }

    #[test]
    fn test_string_value_is_quoted() {
        assert_eq!(sql("name = 'john'"), "`name`='john'");
        assert_eq!(sql("name = john"), "`name`='john'");
        assert_eq!(sql("name = \"john\""), "`name`='john'");
    }

    #[test]
    fn test_placeholder_untouched() {
        assert_eq!(sql("id = ?"), "`id`=?");
        assert_eq!(sql("id IN (?, ?)"), "`id` IN (?,?)");
    }

    #[test]
    fn test_table_qualified_field() {
        let cond = parse_condition("users.id = 5").unwrap();
        assert_eq!(cond.table_prefix, "`users`.");
        assert_eq!(cond.field, "id");
        assert_eq!(sql("users.id = 5"), "`users`.`id`=5");
    }

    #[test]
    fn test_is_null() {
        assert_eq!(parse_condition("deleted_at IS NULL").unwrap().kind, OperatorKind::IsNull);
        assert_eq!(sql("deleted_at is null"), "`deleted_at` IS NULL");
        assert_eq!(sql("deleted_at is  not null"), "`deleted_at` IS NOT NULL");
        assert_eq!(sql("flag IS true"), "`flag` IS TRUE");
    }

    #[test]
    fn test_like() {
        assert_eq!(sql("name LIKE 'john%'"), "`name` LIKE 'john%'");
        assert_eq!(sql("name not like '%doe'"), "`name` NOT LIKE '%doe'");
        assert_eq!(sql("code LIKE 12%"), "`code` LIKE '12%'");
    }

    #[test]
    fn test_like_value_containing_keywords() {
        assert_eq!(sql("title LIKE 'this IS IN'"), "`title` LIKE 'this IS IN'");
    }

    #[test]
    fn test_in_list() {
        assert_eq!(sql("status IN (1,2,3)"), "`status` IN (1,2,3)");
        assert_eq!(sql("status NOT IN (1, 2)"), "`status` NOT IN (1,2)");
        assert_eq!(sql("role in ('admin', 'a,b')"), "`role` IN ('admin','a,b')");
        assert_eq!(sql("role IN (admin, mod)"), "`role` IN ('admin','mod')");
    }

    #[test]
    fn test_between() {
        assert_eq!(sql("age BETWEEN 18 AND 30"), "`age` BETWEEN 18 AND 30");
        assert_eq!(
            sql("created between '2024-01-01' and '2024-12-31'"),
            "`created` BETWEEN '2024-01-01' AND '2024-12-31'"
        );
    }

    #[test]
    fn test_quoted_number_stays_text() {
        assert_eq!(sql("zip = '01234'"), "`zip`='01234'");
        assert_eq!(sql("zip = \"42\""), "`zip`='42'");
        assert_eq!(sql("zip = 01234"), "`zip`=01234");
        assert_eq!(
            parse_condition("code != '7'").unwrap().operands,
            vec![Operand::Text("7".to_string())]
        );
    }

    #[test]
    fn test_quote_breakout_is_escaped() {
        assert_eq!(sql("name = 'x' OR '1'='1'"), "`name`='x'' OR ''1''=''1'");
    }

    #[test]
    fn test_function_field() {
        assert_eq!(sql("COUNT(id) > 5"), "COUNT(`id`)>5");
    }

    #[test]
    fn test_injection_escaped() {
        assert_eq!(sql("name = O'Brien"), "`name`='O''Brien'");
        assert_eq!(sql("name = x' OR '1'='1"), "`name`='x'' OR ''1''=''1'");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_condition("").is_err());
        assert!(parse_condition("age").is_err());
        assert!(parse_condition("age ~ 5").is_err());
        assert!(parse_condition("age =").is_err());
        assert!(parse_condition("status IN ()").is_err());
        assert!(parse_condition("age BETWEEN 1").is_err());
    }

    #[test]
    fn test_parse_on() {
        let (l, r) = parse_on("orders.id = users.order_id").unwrap();
        assert_eq!(l, "orders.id");
        assert_eq!(r, "users.order_id");
        assert!(parse_on("orders.id").is_err());
        assert!(parse_on("a = b = c").is_err());
    }
}
