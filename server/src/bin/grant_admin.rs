// mapofus-server/src/bin/grant_admin.rs

//! Operator tool: `grant-admin <email>` gives an existing user the admin role.

use anyhow::Context;
use clap::Parser;
use mapofus_server::config::LogFormat;
use mapofus_server::db::admin_grants::{GrantOutcome, PgAdminGrants};
use mapofus_server::telemetry;
use sqlx::postgres::PgPoolOptions;

#[derive(Debug, Parser)]
#[command(name = "grant-admin", about = "Grant the admin role to an existing user")]
struct Args {
  /// Email address the user signed up with.
  email: String,

  /// Overrides DATABASE_URL.
  #[arg(long, env = "DATABASE_URL")]
  database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing(LogFormat::from_env());
  let args = Args::parse();

  let pool = PgPoolOptions::new()
    .max_connections(1)
    .connect(&args.database_url)
    .await
    .context("connecting to the database")?;
  let grants = PgAdminGrants::new(pool);

  match grants.grant_by_email(&args.email).await? {
    GrantOutcome::Granted { user_id } => {
      println!("Granted admin to {} ({})", args.email, user_id);
    }
    GrantOutcome::AlreadyAdmin { user_id } => {
      println!("{} ({}) is already an admin", args.email, user_id);
    }
    GrantOutcome::UnknownUser => {
      anyhow::bail!("No user found with email {}", args.email);
    }
  }
  Ok(())
}
