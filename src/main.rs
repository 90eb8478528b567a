use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use std::env;

use finance_ledger::auth::hash_password;
use finance_ledger::entities::create_user;
use finance_ledger::{
    list_accounts, list_categories, open_database, AccountFilter, CategoryFilter, Config,
    QueryVariant,
};

const USAGE: &str = "usage:
  finance-ledger init
  finance-ledger add-user <username> <email> <password>
  finance-ledger accounts <user_id> <type> [category_id=N] [title=T] [description=D] [date=RFC3339]
  finance-ledger categories <user_id> <type> [title=T] [description=D]";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("init") => run_init(),
        Some("add-user") => run_add_user(&args[1..]),
        Some("accounts") => run_accounts(&args[1..]),
        Some("categories") => run_categories(&args[1..]),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
}

fn run_init() -> Result<()> {
    let path = Config::database_path_from_env();
    open_database(&path)?;
    println!("✓ Database initialized at {} (WAL mode)", path.display());
    Ok(())
}

fn run_add_user(args: &[String]) -> Result<()> {
    let [username, email, password] = args else {
        bail!("add-user needs <username> <email> <password>\n{USAGE}");
    };

    let conn = open_database(&Config::database_path_from_env())?;
    let user = create_user(&conn, username, &hash_password(password)?, email)?;
    println!("✓ Created user {} (id {})", user.username, user.id);
    Ok(())
}

/// Split `key=value` options following the two mandatory arguments
fn owner_and_options(args: &[String]) -> Result<(i64, String, Vec<(&str, &str)>)> {
    let (owner, kind, rest) = match args {
        [owner, kind, rest @ ..] => (owner, kind, rest),
        _ => bail!("expected <user_id> <type>\n{USAGE}"),
    };
    let owner = owner
        .parse::<i64>()
        .with_context(|| format!("user_id is not a number: {owner}"))?;

    let options = rest
        .iter()
        .map(|opt| {
            opt.split_once('=')
                .ok_or_else(|| anyhow!("expected key=value, got '{opt}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((owner, kind.clone(), options))
}

fn run_accounts(args: &[String]) -> Result<()> {
    let (owner, kind, options) = owner_and_options(args)?;
    let mut filter = AccountFilter {
        user_id: Some(owner),
        account_type: Some(kind),
        ..Default::default()
    };

    for (key, value) in options {
        match key {
            "category_id" => {
                filter.category_id = Some(value.parse().with_context(|| format!("bad category_id: {value}"))?)
            }
            "title" => filter.title = Some(value.to_string()),
            "description" => filter.description = Some(value.to_string()),
            "date" => {
                let date = DateTime::parse_from_rfc3339(value)
                    .with_context(|| format!("bad date: {value}"))?;
                filter.date = Some(date.with_timezone(&Utc));
            }
            other => bail!("unknown account filter '{other}'"),
        }
    }

    let selection = filter.evaluate()?;
    let conn = open_database(&Config::database_path_from_env())?;
    let accounts = list_accounts(&conn, &selection)?;

    println!("🔎 {} → {} account(s)", selection.variant.name(), accounts.len());
    for account in accounts {
        println!(
            "  #{:<5} {}  {:>10}  {:<24} {}",
            account.id,
            account.date.format("%Y-%m-%d"),
            account.value,
            account.title,
            account.description
        );
    }
    Ok(())
}

fn run_categories(args: &[String]) -> Result<()> {
    let (owner, kind, options) = owner_and_options(args)?;
    let mut filter = CategoryFilter {
        user_id: Some(owner),
        category_type: Some(kind),
        ..Default::default()
    };

    for (key, value) in options {
        match key {
            "title" => filter.title = Some(value.to_string()),
            "description" => filter.description = Some(value.to_string()),
            other => bail!("unknown category filter '{other}'"),
        }
    }

    let selection = filter.evaluate()?;
    let conn = open_database(&Config::database_path_from_env())?;
    let categories = list_categories(&conn, &selection)?;

    println!("🔎 {} → {} categor(y/ies)", selection.variant.name(), categories.len());
    for category in categories {
        println!("  #{:<5} {:<24} {}", category.id, category.title, category.description);
    }
    Ok(())
}
