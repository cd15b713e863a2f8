use std::error::Error;

use clap::{Args, Parser, Subcommand};
use ledger::{
    Engine, EngineError, RequestChanges,
    details::Details,
    limit::{Identifier, Limit, LimitError, Value},
    requests::{RateDesignation, Request},
};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "accounts")]
#[command(about = "Transfer requests and limits of the accounts ledger")]
struct Cli {
    /// Settings file, `settings.toml` in the working directory otherwise.
    #[arg(long, env = "ACCOUNTS_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Request(RequestArgs),
    Limit(LimitArgs),
}

#[derive(Args, Debug)]
struct RequestArgs {
    #[command(subcommand)]
    command: RequestCommand,
}

#[derive(Subcommand, Debug)]
enum RequestCommand {
    Create(RequestCreateArgs),
    Show { id: i64 },
    Evaluate { id: i64 },
    DryRun { id: i64 },
    Pending { id: i64 },
    Execute { id: i64 },
    Modify(RequestModifyArgs),
    Cancel {
        id: i64,
        #[arg(long, default_value = "")]
        reason: String,
    },
}

#[derive(Args, Debug)]
struct RequestCreateArgs {
    #[arg(long)]
    user: String,
    /// TBA, TBU, OWT, CFT, CA, DA or DRA.
    #[arg(long)]
    subject: String,
    #[arg(long)]
    base: String,
    #[arg(long)]
    reference: Option<String>,
    #[arg(long)]
    amount: Option<Decimal>,
    #[arg(long)]
    input_amount: Option<Decimal>,
    #[arg(long)]
    rate: Option<Decimal>,
    /// The rate converts from the reference currency.
    #[arg(long)]
    reverse_rate: bool,
    #[arg(long)]
    description: Option<String>,
    /// Subject input as a JSON object, e.g. `{"accountIdFrom": 1}`.
    #[arg(long, default_value = "{}")]
    input: String,
}

#[derive(Args, Debug)]
struct RequestModifyArgs {
    id: i64,
    #[arg(long)]
    amount: Option<Decimal>,
    #[arg(long)]
    input_amount: Option<Decimal>,
    #[arg(long)]
    rate: Option<Decimal>,
}

#[derive(Args, Debug)]
struct LimitArgs {
    #[command(subcommand)]
    command: LimitCommand,
}

#[derive(Subcommand, Debug)]
enum LimitCommand {
    Set(LimitSetArgs),
    Show {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    Delete {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
    },
}

#[derive(Args, Debug)]
struct LimitSetArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    name: String,
    #[arg(long, required_unless_present = "no_limit")]
    amount: Option<Decimal>,
    #[arg(long, default_value = "EUR")]
    currency: String,
    #[arg(long)]
    no_limit: bool,
}

fn print_details(details: &Details) {
    for detail in details.iter() {
        println!(
            "{:<32} {:>16} {}",
            detail.purpose.to_string(),
            detail.amount,
            detail.currency_code
        );
    }
}

fn print_limit(limit: &Limit) {
    match &limit.value {
        Value::NoLimit => println!("{}: no limit", limit.id),
        Value::Max {
            amount,
            currency_code,
        } => println!("{}: {amount} {currency_code}", limit.id),
    }
}

fn new_request(args: RequestCreateArgs) -> Result<Request, EngineError> {
    let reference = args.reference.as_deref().unwrap_or(&args.base);
    let mut request = Request::new(&args.user, &args.subject, &args.base, reference);
    if let Some(amount) = args.amount {
        request = request.with_amount(amount);
    }
    if let Some(amount) = args.input_amount {
        request = request.with_input_amount(amount);
    }
    if let Some(rate) = args.rate {
        let designation = if args.reverse_rate {
            RateDesignation::ReferenceBase
        } else {
            RateDesignation::BaseReference
        };
        request = request.with_rate(rate, designation);
    }
    if let Some(description) = &args.description {
        request = request.with_description(description);
    }
    let input = serde_json::from_str(&args.input)
        .map_err(|err| EngineError::MissingInputData(format!("request input: {err}")))?;
    let serde_json::Value::Object(input) = input else {
        return Err(EngineError::MissingInputData(
            "request input must be a JSON object".to_string(),
        ));
    };
    request.input = input;
    Ok(request)
}

async fn run_request(engine: &Engine, command: RequestCommand) -> Result<(), EngineError> {
    match command {
        RequestCommand::Create(args) => {
            let request = engine.create_request(&new_request(args)?).await?;
            println!("created request #{}", request.id);
        }
        RequestCommand::Show { id } => {
            let request = engine.request(id).await?;
            println!(
                "#{} {} {} status={}",
                request.id, request.subject, request.user_id, request.status
            );
            for tx in engine.request_transactions(id).await? {
                println!(
                    "{:<32} {:>16} {}",
                    tx.purpose.to_string(),
                    tx.amount,
                    tx.kind.as_str()
                );
            }
        }
        RequestCommand::Evaluate { id } => print_details(&engine.evaluate_request(id).await?),
        RequestCommand::DryRun { id } => print_details(&engine.dry_run_request(id).await?),
        RequestCommand::Pending { id } => print_details(&engine.pending_request(id).await?),
        RequestCommand::Execute { id } => print_details(&engine.execute_request(id).await?),
        RequestCommand::Modify(args) => {
            let changes = RequestChanges {
                amount: args.amount,
                input_amount: args.input_amount,
                rate: args.rate,
            };
            print_details(&engine.modify_request(args.id, changes).await?);
        }
        RequestCommand::Cancel { id, reason } => {
            engine.cancel_request(id, &reason).await?;
            println!("cancelled request #{id}");
        }
    }
    Ok(())
}

async fn run_limit(engine: &Engine, command: LimitCommand) -> Result<(), EngineError> {
    match command {
        LimitCommand::Set(args) => {
            let id = Identifier::user(&args.name, &args.user);
            let value = match args.amount {
                Some(amount) if !args.no_limit => Value::max(amount, &args.currency),
                _ => Value::NoLimit,
            };
            let limit = match engine.find_limit(&id).await {
                Ok(_) => engine.update_limit(id, value).await?,
                Err(EngineError::Limit(LimitError::NotFound(_))) => {
                    engine.create_limit(id, value).await?
                }
                Err(err) => return Err(err),
            };
            print_limit(&limit);
        }
        LimitCommand::Show { user, name } => {
            let id = Identifier::user(&name, &user);
            for limit in engine.find_limits(&id).await? {
                print_limit(&limit);
            }
        }
        LimitCommand::Delete { user, name } => {
            let deleted = engine.delete_limit(&Identifier::user(&name, &user)).await?;
            println!("deleted {deleted} limit(s)");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "accounts={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let database = sea_orm::Database::connect(settings.database.url()).await?;
    Migrator::up(&database, None).await?;

    let engine = Engine::builder()
        .database(database)
        .settings(settings.ledger)
        .build()
        .await?;

    let result = match cli.command {
        Command::Request(RequestArgs { command }) => run_request(&engine, command).await,
        Command::Limit(LimitArgs { command }) => run_limit(&engine, command).await,
    };

    if let Err(err) = result {
        if err.is_business_rule() {
            tracing::warn!("request rejected: {err}");
        } else {
            tracing::error!("operation failed: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}
