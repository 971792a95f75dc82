mod api_users;

use anyhow::Result;
use clap::{Parser, Subcommand};

use gym_manager::config::DatabaseConfig;
use gym_manager::store::PgGymStore;

pub use api_users::{AllowApiUserCreationCommand, AllowOutcome, ListApiUsersCommand};

#[derive(Parser)]
#[command(name = "gym-admin")]
#[command(about = "Administration commands for the gym manager", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database to operate on
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Allow a user to create new users through the REST API
    AllowApiUserCreation(AllowApiUserCreationCommand),

    /// List the users created through the REST API by a user
    ListApiUsers(ListApiUsersCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::AllowApiUserCreation(cmd) => {
                let store = connect(self.database_url).await?;
                cmd.execute(&store).await
            }
            Commands::ListApiUsers(cmd) => {
                let store = connect(self.database_url).await?;
                cmd.execute(&store).await
            }
            Commands::Completions { shell } => {
                generate_completions(shell);
                Ok(())
            }
        }
    }
}

async fn connect(database_url: Option<String>) -> Result<PgGymStore> {
    let config = DatabaseConfig::from_env()?.for_admin_command(database_url);
    let pool = config.create_pool().await?;
    Ok(PgGymStore::new(pool))
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
