//! portfolio-admin: account and schema maintenance for the portfolio API.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use portfolio_auth::hash_password;
use portfolio_core::{JobRepository, Role, User};
use portfolio_db::Database;

#[derive(Parser)]
#[command(name = "portfolio-admin")]
#[command(author, version, about = "Administration commands for the portfolio admin backend")]
#[command(propagate_version = true)]
struct Cli {
    /// PostgreSQL URL (default: $DATABASE_URL)
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Create a user account
    CreateUser {
        #[arg(short, long)]
        username: String,

        /// Password (min 8 characters)
        #[arg(short, long)]
        password: String,

        /// Roles to grant (admin, user, guest); repeatable
        #[arg(short, long = "role", value_parser = parse_role)]
        roles: Vec<Role>,
    },

    /// Grant a role to an existing user
    GrantRole {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, value_parser = parse_role)]
        role: Role,
    },

    /// Revoke a role from an existing user
    RevokeRole {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, value_parser = parse_role)]
        role: Role,
    },

    /// Show the state of a queued job
    Job {
        /// Job id (UUID)
        id: Uuid,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse::<Role>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db = Database::connect(&cli.database_url).await?;

    match cli.command {
        Commands::Migrate => {
            db.migrate().await?;
            println!("Migrations applied");
        }
        Commands::CreateUser {
            username,
            password,
            roles,
        } => {
            let hash = hash_password(&password)?;
            let user = db.users.create(&username, &hash).await?;
            for role in roles {
                db.users.grant_role(user.id, role).await?;
            }
            let roles = db.users.roles(user.id).await?;
            println!("Created user {} ({}) with roles {:?}", user.username, user.id, roles);
        }
        Commands::GrantRole { username, role } => {
            let user = find_user(&db, &username).await?;
            if db.users.grant_role(user.id, role).await? {
                println!("Granted {role} to {username}");
            } else {
                println!("{username} already has {role}");
            }
        }
        Commands::RevokeRole { username, role } => {
            let user = find_user(&db, &username).await?;
            if db.users.revoke_role(user.id, role).await? {
                println!("Revoked {role} from {username}");
            } else {
                println!("{username} did not have {role}");
            }
        }
        Commands::Job { id } => {
            let job = db
                .jobs
                .get(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no such job: {id}"))?;
            println!("{} {} {:?}", job.id, job.job_type.as_str(), job.status);
            println!(
                "progress: {}% {}",
                job.progress_percent,
                job.progress_message.as_deref().unwrap_or("")
            );
            if let Some(error) = &job.error_message {
                println!("error: {error}");
            }
        }
    }
    Ok(())
}

async fn find_user(db: &Database, username: &str) -> anyhow::Result<User> {
    db.users
        .get_by_username(username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no such user: {username}"))
}
