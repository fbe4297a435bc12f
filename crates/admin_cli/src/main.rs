use std::error::Error;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{Engine, MoneyCents};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "divvy_admin")]
#[command(about = "Admin utilities for Divvy (bootstrap users/groups, record expenses)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./divvy.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Group(Group),
    Expense(Expense),
    /// Show every member's net balance in a group.
    Balances(GroupScoped),
    /// Show the transfers that would settle a group.
    Settlements(GroupScoped),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
}

#[derive(Args, Debug)]
struct Group {
    #[command(subcommand)]
    command: GroupCommand,
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    Create(GroupCreateArgs),
    AddMember(GroupMemberArgs),
    Members(GroupScoped),
    List(ListGroupsArgs),
}

#[derive(Args, Debug)]
struct GroupCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    /// Username of the creator (becomes the first member).
    #[arg(long)]
    creator: String,
}

#[derive(Args, Debug)]
struct GroupMemberArgs {
    #[arg(long)]
    group: String,
    /// Username of the user to add.
    #[arg(long)]
    username: String,
    /// Username of the acting member.
    #[arg(long)]
    caller: String,
}

#[derive(Args, Debug)]
struct GroupScoped {
    #[arg(long)]
    group: String,
    /// Username of the acting member.
    #[arg(long)]
    caller: String,
}

#[derive(Args, Debug)]
struct ListGroupsArgs {
    /// Username whose groups to list.
    #[arg(long)]
    caller: String,
}

#[derive(Args, Debug)]
struct Expense {
    #[command(subcommand)]
    command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    Add(ExpenseAddArgs),
    List(GroupScoped),
    /// Record a settlement payment between two members.
    Settle(SettleArgs),
}

#[derive(Args, Debug)]
struct ExpenseAddArgs {
    #[arg(long)]
    group: String,
    #[arg(long)]
    description: String,
    /// Amount, e.g. `12.50`.
    #[arg(long)]
    amount: String,
    /// Username of the payer.
    #[arg(long)]
    paid_by: String,
    /// Expense date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Comma-separated usernames to split between; defaults to all members.
    #[arg(long, value_delimiter = ',')]
    participants: Option<Vec<String>>,
    /// Username of the acting member.
    #[arg(long)]
    caller: String,
}

#[derive(Args, Debug)]
struct SettleArgs {
    #[arg(long)]
    group: String,
    /// Username of the debtor (who pays).
    #[arg(long)]
    from: String,
    /// Username of the creditor (who receives).
    #[arg(long)]
    to: String,
    /// Amount, e.g. `30.00`.
    #[arg(long)]
    amount: String,
    /// Username of the acting member.
    #[arg(long)]
    caller: String,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn resolve_users(
    engine: &Engine,
    usernames: &[String],
) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
    let mut ids = Vec::with_capacity(usernames.len());
    for username in usernames {
        ids.push(engine.user_id_by_username(username).await?);
    }
    Ok(ids)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "divvy_admin=info,engine=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let user_id = engine.new_user(&args.username, &args.password).await?;
            println!("created user: {} ({user_id})", args.username);
        }
        Command::Group(Group { command }) => match command {
            GroupCommand::Create(args) => {
                let creator = engine.user_id_by_username(&args.creator).await?;
                let group_id = engine
                    .new_group(&args.name, args.description.as_deref(), &creator)
                    .await?;
                println!("created group: {} ({group_id})", args.name);
            }
            GroupCommand::AddMember(args) => {
                let caller = engine.user_id_by_username(&args.caller).await?;
                let member = engine.user_id_by_username(&args.username).await?;
                engine.add_group_member(&args.group, &member, &caller).await?;
                println!("added {} to group {}", args.username, args.group);
            }
            GroupCommand::Members(args) => {
                let caller = engine.user_id_by_username(&args.caller).await?;
                for member in engine.group_members(&args.group, &caller).await? {
                    println!(
                        "{}\t{}\tjoined {}",
                        member.user_id, member.username, member.joined_at
                    );
                }
            }
            GroupCommand::List(args) => {
                let caller = engine.user_id_by_username(&args.caller).await?;
                for group in engine.groups_for_user(&caller).await? {
                    println!("{}\t{}", group.id, group.name);
                }
            }
        },
        Command::Expense(Expense { command }) => match command {
            ExpenseCommand::Add(args) => {
                let caller = engine.user_id_by_username(&args.caller).await?;
                let paid_by = engine.user_id_by_username(&args.paid_by).await?;
                let amount: MoneyCents = args.amount.parse()?;
                let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
                let participants = match &args.participants {
                    None => None,
                    Some(usernames) => Some(resolve_users(&engine, usernames).await?),
                };

                let expense = engine
                    .record_expense(
                        &args.group,
                        &args.description,
                        amount,
                        &paid_by,
                        date,
                        participants.as_deref(),
                        &caller,
                    )
                    .await?;
                println!("recorded expense: {} ({})", expense.description, expense.id);
            }
            ExpenseCommand::List(args) => {
                let caller = engine.user_id_by_username(&args.caller).await?;
                for expense in engine.group_expenses(&args.group, &caller).await? {
                    println!(
                        "{}\t{}\t{}\tpaid by {}",
                        expense.expense_date, expense.amount, expense.description, expense.paid_by
                    );
                }
            }
            ExpenseCommand::Settle(args) => {
                let caller = engine.user_id_by_username(&args.caller).await?;
                let from = engine.user_id_by_username(&args.from).await?;
                let to = engine.user_id_by_username(&args.to).await?;
                let amount: MoneyCents = args.amount.parse()?;
                engine
                    .record_settlement(&args.group, &from, &to, amount, &caller)
                    .await?;
                println!("recorded settlement: {} -> {} ({amount})", args.from, args.to);
            }
        },
        Command::Balances(args) => {
            let caller = engine.user_id_by_username(&args.caller).await?;
            for balance in engine.all_balances(&args.group, &caller).await? {
                println!("{}\t{}", balance.username, balance.balance);
            }
        }
        Command::Settlements(args) => {
            let caller = engine.user_id_by_username(&args.caller).await?;
            let settlements = engine.settlements(&args.group, &caller).await?;
            if settlements.is_empty() {
                println!("all settled");
            }
            for settlement in settlements {
                println!(
                    "{} pays {} {}",
                    settlement.from_username, settlement.to_username, settlement.amount
                );
            }
        }
    }

    Ok(())
}
