use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use gym_manager::store::GymStore;

#[derive(Args)]
pub struct AllowApiUserCreationCommand {
    /// User whose profile gets the flag
    pub username: String,
}

/// Result of granting the API user creation flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowOutcome {
    Allowed,
    AlreadyAllowed,
}

impl AllowOutcome {
    pub fn message(&self, username: &str) -> String {
        match self {
            AllowOutcome::Allowed => {
                format!("Successfully allowed {username} to create users via the API")
            }
            AllowOutcome::AlreadyAllowed => {
                format!("{username} is already allowed to create users via the API")
            }
        }
    }
}

impl AllowApiUserCreationCommand {
    pub async fn execute(self, store: &dyn GymStore) -> Result<()> {
        let outcome = allow_api_user_creation(store, &self.username).await?;

        match outcome {
            AllowOutcome::Allowed => println!("{} {}", "✓".green(), outcome.message(&self.username)),
            AllowOutcome::AlreadyAllowed => println!("{}", outcome.message(&self.username)),
        }

        Ok(())
    }
}

/// Set `can_use_api_create` on the user's profile
pub async fn allow_api_user_creation(store: &dyn GymStore, username: &str) -> Result<AllowOutcome> {
    let Some(user) = store.get_user_by_username(username).await? else {
        bail!("User {username} not found");
    };
    let Some(mut profile) = store.get_profile(user.id).await? else {
        bail!("User {username} not found");
    };

    if profile.can_use_api_create {
        return Ok(AllowOutcome::AlreadyAllowed);
    }

    profile.can_use_api_create = true;
    store.update_profile(&profile).await?;
    tracing::info!(user_id = user.id, "allowed API user creation");

    Ok(AllowOutcome::Allowed)
}

#[derive(Args)]
pub struct ListApiUsersCommand {
    /// The API consumer whose users are listed
    pub username: String,
}

impl ListApiUsersCommand {
    pub async fn execute(self, store: &dyn GymStore) -> Result<()> {
        let users = store.list_profiles_created_by(&self.username).await?;
        let usernames: Vec<String> = users.into_iter().map(|user| user.username).collect();

        print!("{}", format_api_users(&self.username, &usernames));
        Ok(())
    }
}

pub fn format_api_users(creator: &str, usernames: &[String]) -> String {
    if usernames.is_empty() {
        return format!("No users created by {creator}\n");
    }

    let mut out = format!("The users created by {} are:\n", creator.bold());
    for username in usernames {
        out.push('\t');
        out.push_str(username);
        out.push('\n');
    }
    out
}
