//! CLI commands

use anyhow::{Result, anyhow, bail};
use clap::Subcommand;
use portal_client::auth::guard::{DASHBOARD_PATH, LOGIN_PATH};
use portal_client::{
    ClientError, CreateUserRequest, DirectoryView, GuardDecision, LoginRequest, RegisterRequest,
    Route, SessionGuard, UpdateUserRequest, UserDirectory, UserProfile,
};
use tracing::info;

/// Everything a command needs, built once in `main`
pub struct App {
    pub guard: SessionGuard,
    pub directory: UserDirectory,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log in to it
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        full_name: Option<String>,
    },

    /// Show the logged-in user
    Whoami,

    /// Forget the stored session
    Logout,

    /// Manage users (superusers only)
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
}

#[derive(Subcommand)]
pub enum UsersCommands {
    /// List all users
    List,

    /// Create a user
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        full_name: Option<String>,

        /// Create the account disabled
        #[arg(long)]
        inactive: bool,

        /// Grant superuser rights
        #[arg(long)]
        superuser: bool,
    },

    /// Update fields of a user; omitted fields are left unchanged
    Update {
        id: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        password: Option<String>,

        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        active: Option<bool>,

        #[arg(long)]
        superuser: Option<bool>,
    },

    /// Delete a user
    Delete { id: String },
}

impl Commands {
    pub async fn execute(self, app: &App) -> Result<()> {
        let auth = app.guard.auth();

        match self {
            Commands::Login { email, password } => {
                let user = auth
                    .login(&LoginRequest { email, password })
                    .await
                    .map_err(|e| failure(&e, "Unable to log in."))?;
                println!("Logged in as {}", user.display_name());
            }
            Commands::Register {
                email,
                password,
                full_name,
            } => {
                let request = RegisterRequest {
                    email,
                    password,
                    full_name: full_name.filter(|name| !name.trim().is_empty()),
                };
                let user = auth
                    .register(&request)
                    .await
                    .map_err(|e| failure(&e, "Unable to register."))?;
                println!("Registered and logged in as {}", user.display_name());
            }
            Commands::Whoami => {
                allow(app.guard.check(&Route::DASHBOARD))?;
                let user = auth
                    .user()
                    .ok_or_else(|| anyhow!("Not logged in. Run `portal login` first."))?;
                print_user(&user);
            }
            Commands::Logout => {
                auth.logout();
                println!("Logged out");
            }
            Commands::Users { command } => command.execute(app).await?,
        }

        Ok(())
    }
}

impl UsersCommands {
    pub async fn execute(self, app: &App) -> Result<()> {
        let directory = &app.directory;

        match self {
            UsersCommands::List => {
                let users = match directory.open().await {
                    Ok(DirectoryView::Ready(users)) => users,
                    Ok(DirectoryView::Blocked(decision)) => return allow(decision),
                    Err(e) => return Err(failure(&e, "Unable to load users.")),
                };
                for user in &users {
                    print_row(user);
                }
                info!(count = users.len(), "Listed users");
            }
            UsersCommands::Create {
                email,
                password,
                full_name,
                inactive,
                superuser,
            } => {
                allow(app.guard.check(&Route::USERS))?;
                let request = CreateUserRequest {
                    email: email.trim().to_string(),
                    password,
                    full_name: full_name
                        .map(|name| name.trim().to_string())
                        .filter(|name| !name.is_empty()),
                    is_active: Some(!inactive),
                    is_superuser: Some(superuser),
                };
                let user = directory
                    .create(&request)
                    .await
                    .map_err(|e| failure(&e, "Unable to create user."))?;
                println!("Created {} ({})", user.email, user.id);
            }
            UsersCommands::Update {
                id,
                email,
                password,
                full_name,
                active,
                superuser,
            } => {
                allow(app.guard.check(&Route::USERS))?;
                let request = UpdateUserRequest {
                    email: email.map(|email| email.trim().to_string()),
                    password: password.filter(|password| !password.is_empty()),
                    full_name: full_name.map(|name| name.trim().to_string()),
                    is_active: active,
                    is_superuser: superuser,
                };
                let user = directory
                    .update(&id, &request)
                    .await
                    .map_err(|e| failure(&e, "Unable to update user."))?;
                println!("Updated {} ({})", user.email, user.id);
            }
            UsersCommands::Delete { id } => {
                allow(app.guard.check(&Route::USERS))?;
                directory
                    .delete(&id)
                    .await
                    .map_err(|e| failure(&e, "Unable to delete user."))?;
                println!("Deleted {id}");
            }
        }

        Ok(())
    }
}

/// Turn a guard decision into an error unless the route renders
fn allow(decision: GuardDecision) -> Result<()> {
    match decision {
        GuardDecision::Render => Ok(()),
        GuardDecision::Redirect(LOGIN_PATH) => {
            bail!("Not logged in. Run `portal login` first.")
        }
        GuardDecision::Redirect(DASHBOARD_PATH) => {
            bail!("This command requires a superuser account.")
        }
        GuardDecision::Redirect(path) => bail!("Redirected to {path}"),
        GuardDecision::Loading => bail!("Session is still being resolved"),
    }
}

fn failure(error: &ClientError, fallback: &str) -> anyhow::Error {
    anyhow!(error.user_message(fallback))
}

fn print_user(user: &UserProfile) {
    println!("id:        {}", user.id);
    println!("email:     {}", user.email);
    println!("name:      {}", user.full_name.as_deref().unwrap_or("-"));
    println!("active:    {}", user.is_active);
    println!("superuser: {}", user.is_superuser);
    println!("created:   {}", user.created_at.to_rfc3339());
}

fn print_row(user: &UserProfile) {
    println!(
        "{:<38} {:<32} {:<24} {:<8} {}",
        user.id,
        user.email,
        user.full_name.as_deref().unwrap_or("-"),
        if user.is_active { "active" } else { "inactive" },
        if user.is_superuser { "superuser" } else { "" },
    );
}
