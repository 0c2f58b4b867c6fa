//! authctl - command-line front end for the auth session manager.

mod commands;
mod navigator;
mod output;

use auth_config_and_utils::init_logging;
use clap::{Parser, Subcommand};
use commands::Runtime;

/// authctl - Sign in, inspect and end sessions against the auth backend.
#[derive(Parser)]
#[command(name = "authctl")]
#[command(about = "Client-side session management for the auth backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Human-verification proof to send with login, register or OAuth completion
    #[arg(long, env = "AUTH_VERIFICATION_PROOF", global = true, hide_env_values = true)]
    proof: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login {
        #[arg(short, long)]
        email: Option<String>,
        /// Password (prompted without echo when omitted)
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and login
    Register {
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Logout and clear session
    Logout,

    /// Show local session status
    Status,

    /// Show the signed-in user
    Whoami,

    /// Request a password reset email
    ForgotPassword {
        email: Option<String>,
    },

    /// Set a new password from a reset token
    ResetPassword {
        /// Token from the reset email
        token: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Change the password of the signed-in user
    ChangePassword,

    /// Third-party login
    Oauth {
        #[command(subcommand)]
        command: OAuthCommands,
    },
}

#[derive(Subcommand)]
enum OAuthCommands {
    /// Open the provider's sign-in page
    Begin {
        /// Provider name (e.g. github, google)
        provider: String,
    },
    /// Finish sign-in from the URL the browser was sent back to
    Complete {
        /// Full callback URL, e.g. http://localhost:3000/auth/callback/github?code=...&state=...
        callback_url: String,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let runtime = Runtime::load(cli.proof)?;
    let format = &cli.format;

    match cli.command {
        Commands::Login { email, password } => {
            commands::login(&runtime, email, password, format).await
        }
        Commands::Register {
            email,
            name,
            password,
        } => commands::register(&runtime, email, name, password, format).await,
        Commands::Logout => commands::logout(&runtime, format),
        Commands::Status => commands::status(&runtime, format),
        Commands::Whoami => commands::whoami(&runtime, format).await,
        Commands::ForgotPassword { email } => {
            commands::forgot_password(&runtime, email, format).await
        }
        Commands::ResetPassword { token, password } => {
            commands::reset_password(&runtime, token, password, format).await
        }
        Commands::ChangePassword => commands::change_password(&runtime, format).await,
        Commands::Oauth { command } => match command {
            OAuthCommands::Begin { provider } => {
                commands::oauth_begin(&runtime, &provider, format).await
            }
            OAuthCommands::Complete { callback_url } => {
                commands::oauth_complete(&runtime, &callback_url, format).await
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let format = cli.format;
    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}
