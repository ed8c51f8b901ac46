//! quill: build MySQL statements from the command line
//!
//! # Usage
//!
//! ```bash
//! # Show the SQL only
//! quill --dry-run select "id, name" --from users --where "age > 18" --limit 10
//!
//! # Run it
//! QUILL_DATABASE_URL=mysql://root@localhost/shop quill select "*" --from users
//!
//! # What does the parser make of a condition?
//! quill explain "price BETWEEN 10 AND 20"
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use quill::prelude::*;

#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "Fluent MySQL query builder", long_about = None)]
#[command(after_help = "EXAMPLES:
    quill --dry-run select 'id, email' --from users --where 'active = 1' --order 'created_at DESC'
    quill update users --set name=Jo --set age=30 --where 'id = 5'
    quill select '*' --from orders --where 'user_id = ?' --bind 42")]
struct Cli {
    /// Don't execute, just show the generated SQL
    #[arg(short, long, global = true)]
    dry_run: bool,

    /// Values for `?` placeholders, in order
    #[arg(short, long, value_delimiter = ',', global = true)]
    bind: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Database connection URL
    #[arg(long, env = "QUILL_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Path to quill.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a SELECT
    Select(SelectArgs),
    /// Build an INSERT
    Insert {
        table: String,
        /// Column assignment, `col=value`
        #[arg(long = "set", required = true)]
        set: Vec<String>,
    },
    /// Build an UPDATE
    Update {
        table: String,
        #[arg(long = "set", required = true)]
        set: Vec<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Build a DELETE
    Delete {
        table: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show how a condition string is parsed
    Explain {
        /// e.g. "users.age >= 18"
        condition: String,
    },
    /// List the condition forms the parser understands
    Operators,
}

#[derive(Args)]
struct FilterArgs {
    /// Condition joined with AND
    #[arg(short = 'w', long = "where")]
    where_: Vec<String>,

    /// Condition joined with OR, applied after the --where conditions
    #[arg(long)]
    or_where: Vec<String>,
}

#[derive(Args)]
struct SelectArgs {
    /// Select list
    #[arg(default_value = "*")]
    fields: String,

    #[arg(long, required = true)]
    from: Vec<String>,

    #[arg(long)]
    distinct: bool,

    /// Inner join
    #[arg(long)]
    join: Vec<String>,

    #[arg(long)]
    left_join: Vec<String>,

    #[arg(long)]
    right_join: Vec<String>,

    /// Join condition; the n-th --on belongs to the n-th join
    /// (inner joins first, then left, then right)
    #[arg(long)]
    on: Vec<String>,

    #[command(flatten)]
    filter: FilterArgs,

    #[arg(long)]
    group: Vec<String>,

    #[arg(long)]
    having: Vec<String>,

    /// `field` or `field DESC`
    #[arg(long)]
    order: Vec<String>,

    #[arg(long)]
    limit: Option<u64>,

    #[arg(long, requires = "limit")]
    offset: Option<u64>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "quill=debug" } else { "quill=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Explain { condition } => {
            explain_condition(condition);
            Ok(())
        }
        Commands::Operators => {
            show_operators();
            Ok(())
        }
        _ => run(&cli).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = QuillConfig::load(cli.config.as_deref())?.with_url(cli.database_url.clone());
    let params: Vec<Value> = cli.bind.iter().map(|b| Value::infer(b)).collect();

    let url = match (&config.database.url, cli.dry_run) {
        (Some(url), false) => url.clone(),
        (url, _) => {
            let query = build(&cli.command, config.escape.sanitizer())?;
            print_sql(&query.render()?, &params);
            if url.is_none() && !cli.dry_run {
                println!();
                println!(
                    "{}",
                    "⚠ No database URL. Use --database-url, set QUILL_DATABASE_URL or add one to quill.toml"
                        .yellow()
                );
            }
            return Ok(());
        }
    };

    if cli.verbose {
        println!("{} {}", "Connecting to:".dimmed(), url);
    }
    let db = QuillDb::from_config(&config)
        .await
        .with_context(|| format!("connecting to {}", url))?;

    let query = build(&cli.command, db.sanitizer())?;
    if cli.verbose {
        println!("{} {}", "SQL:".dimmed(), query.render()?.yellow());
    }

    match query.query(&db, &params).await? {
        Outcome::Rows(rows) => format_output(&rows, &cli.format),
        Outcome::Affected(n) => {
            println!("{} {} rows affected", "✓".green(), n);
            if query.kind() == StatementKind::Insert {
                println!("{} {}", "last insert id:".dimmed(), db.last_insert_id());
            }
        }
    }

    Ok(())
}

/// Turn the subcommand into a query.
fn build(command: &Commands, sanitizer: Sanitizer) -> anyhow::Result<Query> {
    let query = match command {
        Commands::Select(args) => {
            let mut q = Query::select_with(sanitizer, args.fields.as_str())
                .from(args.from.iter().map(String::as_str).collect::<Vec<_>>());
            if args.distinct {
                q = q.distinct();
            }
            for table in &args.join {
                q = q.join(table);
            }
            for table in &args.left_join {
                q = q.left_join(table);
            }
            for table in &args.right_join {
                q = q.right_join(table);
            }
            for on in &args.on {
                q = q.on(on);
            }
            q = apply_filter(q, &args.filter);
            if !args.group.is_empty() {
                q = q.group(args.group.clone());
            }
            for cond in &args.having {
                q = q.having(cond);
            }
            for order in &args.order {
                q = match order.trim().rsplit_once(' ') {
                    Some((field, dir)) => q.order(field, dir),
                    None => q.asc(order),
                };
            }
            match (args.limit, args.offset) {
                (Some(limit), Some(offset)) => q.limit_range(offset, limit),
                (Some(limit), None) => q.limit(limit),
                _ => q,
            }
        }
        Commands::Insert { table, set } => Query::insert_with(sanitizer, table, parse_assignments(set)?),
        Commands::Update { table, set, filter } => {
            apply_filter(Query::update_with(sanitizer, table, parse_assignments(set)?), filter)
        }
        Commands::Delete { table, filter } => apply_filter(Query::delete_with(sanitizer, table), filter),
        Commands::Explain { .. } | Commands::Operators => {
            anyhow::bail!("this command does not build a query")
        }
    };

    if let Some(err) = query.error() {
        return Err(err.clone().into());
    }
    Ok(query)
}

fn apply_filter(mut q: Query, filter: &FilterArgs) -> Query {
    for cond in &filter.where_ {
        q = q.where_(cond);
    }
    for cond in &filter.or_where {
        q = q.or().where_(cond);
    }
    q
}

/// `name=Jo` → `("name", "Jo")`
fn parse_assignments(set: &[String]) -> anyhow::Result<Vec<(String, Value)>> {
    set.iter()
        .map(|pair| {
            let (col, val) = pair
                .split_once('=')
                .with_context(|| format!("expected col=value, got '{}'", pair))?;
            Ok((col.trim().to_string(), Value::infer(val.trim())))
        })
        .collect()
}

fn print_sql(sql: &str, params: &[Value]) {
    println!("{}", "Generated SQL:".green().bold());
    println!("{}", sql.white());

    if !params.is_empty() {
        println!();
        println!("{}", "Bindings:".cyan());
        for (i, p) in params.iter().enumerate() {
            println!("  ?{} = {}", i + 1, p.to_string().yellow());
        }
    }
}

fn format_output(results: &[Row], format: &OutputFormat) {
    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results).unwrap_or_default());
        }
        OutputFormat::Table => {
            let mut columns: Vec<&String> = results[0].keys().collect();
            columns.sort();

            let mut widths: HashMap<&String, usize> = columns.iter().map(|c| (*c, c.len())).collect();
            for row in results {
                for (col, val) in row {
                    let len = val_to_string(val).chars().count();
                    if let Some(w) = widths.get_mut(col) {
                        *w = (*w).max(len);
                    }
                }
            }

            let header: Vec<String> = columns
                .iter()
                .map(|c| format!("{:width$}", c, width = widths[*c]))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = columns.iter().map(|c| "─".repeat(widths[*c])).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in results {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| {
                        let val = row.get(*c).map(val_to_string).unwrap_or_default();
                        format!("{:width$}", val, width = widths[*c])
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", results.len().to_string().cyan());
        }
    }
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn explain_condition(input: &str) {
    println!("{} {}", "Condition:".dimmed(), input.yellow());
    println!();

    match parse_condition(input) {
        Ok(cond) => {
            println!("{}", "Parsed Structure:".green().bold());
            if !cond.table_prefix.is_empty() {
                println!("  {} {}", "Table:".dimmed(), cond.table_prefix.trim_end_matches('.').white());
            }
            println!("  {} {}", "Field:".dimmed(), cond.field.white());
            println!("  {} {}", "Operator:".dimmed(), cond.kind.to_string().cyan());
            for operand in &cond.operands {
                println!("    • {}", format!("{:?}", operand).white());
            }

            println!();
            println!("{}", "Generated SQL:".green().bold());
            match cond.to_sql(&Sanitizer::manual()) {
                Ok(sql) => println!("  {}", sql.white()),
                Err(e) => eprintln!("{} {}", "Render Error:".red().bold(), e),
            }
        }
        Err(e) => {
            eprintln!("{} {}", "Parse Error:".red().bold(), e);
        }
    }
}

fn show_operators() {
    println!("{}", "Condition forms, in matching order".cyan().bold());
    println!();

    let forms = [
        ("IS", "field IS [NOT] NULL", "`deleted_at` IS NULL"),
        ("LIKE", "field [NOT] LIKE 'pattern'", "`name` LIKE 'jo%'"),
        ("IN", "field [NOT] IN (a, b, ...)", "`id` IN (1,2,3)"),
        ("BETWEEN", "field BETWEEN a AND b", "`age` BETWEEN 18 AND 30"),
        ("compare", "field (>= <= != <> = > <) value", "`age`>18"),
        ("?", "field = ?", "`id`=?"),
    ];

    println!(
        "{:10} {:34} {}",
        "Form".white().bold(),
        "Input".white().bold(),
        "SQL".white().bold()
    );
    println!("{}", "─".repeat(72).dimmed());

    for (name, input, sql) in forms {
        println!("{:10} {:34} {}", name.cyan().bold(), input.yellow(), sql.dimmed());
    }
}
