use std::time::Duration;

use clap::Subcommand;
use habitloop_core::notify::keyring_store;
use habitloop_core::notify::telegram::{resolve_token, TokenSource, TOKEN_ENV, TOKEN_KEY};
use habitloop_core::{Config, TelegramNotifier};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Telegram bot: login / logout / status
    Telegram {
        #[command(subcommand)]
        action: AuthOp,
    },
}

#[derive(Subcommand)]
pub enum AuthOp {
    /// Store the bot token in the OS keyring
    Login {
        /// Bot token from @BotFather
        #[arg(long)]
        token: String,
        /// Store without checking the token against the API
        #[arg(long)]
        no_verify: bool,
    },
    /// Remove the stored token
    Logout,
    /// Check authentication status
    Status {
        /// Also call getMe to confirm the token works
        #[arg(long)]
        verify: bool,
    },
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Telegram { action: op } => handle_telegram(op),
    }
}

fn handle_telegram(op: AuthOp) -> Result<(), Box<dyn std::error::Error>> {
    match op {
        AuthOp::Login { token, no_verify } => {
            let token = token.trim();
            if !no_verify {
                let username = bot(token)?.bot_username()?;
                println!("token belongs to @{username}");
            }
            keyring_store::set(TOKEN_KEY, token)?;
            println!("Telegram authenticated");
        }
        AuthOp::Logout => {
            keyring_store::delete(TOKEN_KEY)?;
            println!("Telegram disconnected");
            if std::env::var_os(TOKEN_ENV).is_some() {
                println!("note: {TOKEN_ENV} is still set in the environment");
            }
        }
        AuthOp::Status { verify } => match resolve_token()? {
            Some((token, source)) => {
                let from = match source {
                    TokenSource::Env => TOKEN_ENV,
                    TokenSource::Keyring => "keyring",
                };
                println!("authenticated ({from})");
                if verify {
                    let username = bot(&token)?.bot_username()?;
                    println!("bot: @{username}");
                }
            }
            None => println!("not authenticated"),
        },
    }
    Ok(())
}

fn bot(token: &str) -> Result<TelegramNotifier, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    Ok(TelegramNotifier::new(
        &config.telegram.api_base,
        token,
        Duration::from_secs(config.telegram.timeout_secs),
    )?)
}
