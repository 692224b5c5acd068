//! `credulous` — CLI credential vault for cloud access keys.
//!
//! See `credulous::cli` for the command surface.

use std::process::ExitCode;

use credulous::cli::{self, Command};
use credulous::{CliError, NullCloudIdentity};
use credulous_envelope::keymaterial::PassphrasePrompt;

/// Reads a passphrase from the controlling terminal without echo.
struct TerminalPrompt;

impl PassphrasePrompt for TerminalPrompt {
    fn prompt(&self, key_path: &std::path::Path) -> std::io::Result<String> {
        rpassword::prompt_password(format!("Passphrase for {}: ", key_path.display()))
    }
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn run() -> Result<(), CliError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse(&args)?;

    match command {
        Command::Save {
            keys,
            username,
            account,
        } => credulous::cmd_save(&keys, username, account, &NullCloudIdentity),
        Command::Source {
            account,
            username,
            key,
        } => {
            let key = key.ok_or_else(|| CliError::Usage("--key is required".to_string()))?;
            let exports = credulous::cmd_source(account, username, &key, &TerminalPrompt)?;
            print!("{}", exports);
            Ok(())
        }
        Command::List => {
            for entry in credulous::cmd_list()? {
                println!("{}", entry);
            }
            Ok(())
        }
        Command::Current => {
            println!("{}", credulous::cmd_current(&NullCloudIdentity)?);
            Ok(())
        }
        Command::Rotate { keys } => {
            credulous::cmd_rotate(&keys, &NullCloudIdentity)?;
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    init_logging();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
