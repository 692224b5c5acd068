//! Hand-rolled flag parsing for the `credulous` command surface: a
//! `while i < args.len()` loop over `&[String]`, matching the style already
//! used for ad hoc flag parsing elsewhere in this codebase's lineage.

use crate::error::CliError;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Save {
        keys: Vec<String>,
        username: Option<String>,
        account: Option<String>,
    },
    Source {
        account: Option<String>,
        username: Option<String>,
        key: Option<String>,
    },
    List,
    Current,
    Rotate {
        keys: Vec<String>,
    },
}

pub fn usage_text() -> String {
    "Usage:\n\
     \x20 credulous save   [--key <authorized_keys-line-file>]... [--username <u>] [--account <a>]\n\
     \x20 credulous source [--account <a>] [--username <u>] [--key <private-key-file>]\n\
     \x20 credulous list\n\
     \x20 credulous current\n\
     \x20 credulous rotate [--key <authorized_keys-line-file>]...\n"
        .to_string()
}

fn require_value(args: &[String], i: usize, flag: &str) -> Result<String, CliError> {
    args.get(i)
        .cloned()
        .ok_or_else(|| CliError::Usage(format!("{} requires a value", flag)))
}

pub fn parse(args: &[String]) -> Result<Command, CliError> {
    let command = args
        .first()
        .ok_or_else(|| CliError::Usage(usage_text()))?
        .as_str();
    let rest = &args[1..];

    match command {
        "save" => parse_save(rest),
        "source" => parse_source(rest),
        "list" => Ok(Command::List),
        "current" => Ok(Command::Current),
        "rotate" => parse_rotate(rest),
        other => Err(CliError::Usage(format!(
            "unknown command: {}\n\n{}",
            other,
            usage_text()
        ))),
    }
}

fn parse_save(args: &[String]) -> Result<Command, CliError> {
    let mut keys = Vec::new();
    let mut username = None;
    let mut account = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--key" => {
                i += 1;
                keys.push(require_value(args, i, "--key")?);
            }
            "--username" => {
                i += 1;
                username = Some(require_value(args, i, "--username")?);
            }
            "--account" => {
                i += 1;
                account = Some(require_value(args, i, "--account")?);
            }
            other => return Err(CliError::Usage(format!("unknown flag: {}", other))),
        }
        i += 1;
    }

    Ok(Command::Save {
        keys,
        username,
        account,
    })
}

fn parse_source(args: &[String]) -> Result<Command, CliError> {
    let mut account = None;
    let mut username = None;
    let mut key = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--account" => {
                i += 1;
                account = Some(require_value(args, i, "--account")?);
            }
            "--username" => {
                i += 1;
                username = Some(require_value(args, i, "--username")?);
            }
            "--key" => {
                i += 1;
                key = Some(require_value(args, i, "--key")?);
            }
            other => return Err(CliError::Usage(format!("unknown flag: {}", other))),
        }
        i += 1;
    }

    Ok(Command::Source {
        account,
        username,
        key,
    })
}

fn parse_rotate(args: &[String]) -> Result<Command, CliError> {
    let mut keys = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--key" => {
                i += 1;
                keys.push(require_value(args, i, "--key")?);
            }
            other => return Err(CliError::Usage(format!("unknown flag: {}", other))),
        }
        i += 1;
    }

    Ok(Command::Rotate { keys })
}
