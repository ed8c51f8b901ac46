//! # quill
//!
//! A fluent query builder for MySQL. Conditions are written the way you
//! would say them (`"age > 18"`, `"name LIKE 'jo%'"`, `"id IN (1, 2, 3)"`)
//! and come out with every identifier backtick-quoted and every value
//! escaped.
//!
//! ## Quick Example
//!
//! ```
//! use quill::prelude::*;
//!
//! let sql = Query::select("users.id, users.name, COUNT(orders.id) AS orders")
//!     .from("users")
//!     .left_join("orders")
//!     .on("orders.user_id = users.id")
//!     .where_("users.active = 1")
//!     .group("users.id")
//!     .having("COUNT(orders.id) > 5")
//!     .render()?;
//!
//! assert_eq!(
//!     sql,
//!     "SELECT `users`.`id`, `users`.`name`, COUNT(`orders`.`id`) AS `orders` FROM `users` \
//!      LEFT JOIN `orders` ON `orders`.`user_id`=`users`.`id` WHERE `users`.`active`=1 \
//!      GROUP BY `users`.`id` HAVING COUNT(`orders`.`id`)>5"
//! );
//! # Ok::<(), quill::BuildError>(())
//! ```
//!
//! ## Conditions
//!
//! | Form                     | Example                          |
//! |--------------------------|----------------------------------|
//! | comparison               | `age >= 18`, `status != 'gone'`  |
//! | null test                | `deleted_at IS NULL`             |
//! | pattern                  | `name NOT LIKE '%bot%'`          |
//! | membership               | `id IN (1, 2, 3)`                |
//! | range                    | `age BETWEEN 18 AND 30`          |
//! | placeholder              | `id = ?`                         |

pub mod ast;
pub mod conditions;
pub mod config;
pub mod engine;
pub mod error;
pub mod fields;
pub mod join;
pub mod parser;
pub mod query;
pub mod sanitize;
pub mod transpiler;
pub mod value;

pub mod prelude {
    pub use crate::ast::{JoinKind, OperatorKind, SortOrder, StatementKind};
    pub use crate::config::{EscapeMode, QuillConfig};
    pub use crate::engine::{Executor, Outcome, QuillDb, Row};
    pub use crate::error::*;
    pub use crate::parser::parse_condition;
    pub use crate::query::Query;
    pub use crate::sanitize::{Escape, Sanitizer};
    pub use crate::value::Value;
}

pub use error::{BuildError, QuillError};
pub use query::Query;
pub use value::Value;
