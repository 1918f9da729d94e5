use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use rostrum::config::Config;
use rostrum::security::Passwords;
use rostrum::storage::{DocStore, User};

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<String>,
    add_admin: bool,
    reset_password: bool,
    debug: bool,
    help: bool,
}

impl CliOptions {
    fn parse(args: &[String]) -> Result<Self> {
        let mut opts = CliOptions::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-c" | "--config-file" => {
                    let Some(path) = iter.next() else {
                        bail!("{arg} requires a path argument");
                    };
                    opts.config = Some(path.clone());
                }
                "-a" | "--add-admin" => opts.add_admin = true,
                "-r" | "--reset-password" => opts.reset_password = true,
                "-d" | "--debug" => opts.debug = true,
                "-h" | "--help" => opts.help = true,
                other => bail!("unknown option: {other}"),
            }
        }
        Ok(opts)
    }
}

fn print_help() {
    println!("usage: rostrum [ options... ]");
    println!("options:");
    println!("  -a, --add-admin            Adds an administrator and exits.");
    println!("  -r, --reset-password       Resets a user's password.");
    println!("  -c, --config-file <path>   Specifies the location of the configuration file.");
    println!("  -d, --debug                Enables debug logging.");
    println!("  -h, --help                 Prints a useful help message.");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = CliOptions::parse(&args)?;

    if opts.help {
        print_help();
        return Ok(());
    }

    // Init logging
    let default_filter = if opts.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config_path = opts.config.clone().or_else(|| std::env::var("ROSTRUM_CONFIG").ok());
    let config = Config::load(config_path.as_deref())?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "rostrum",
        "rostrum starting: RUST_LOG='{}', http_port={}, db_root='{}'",
        rust_log, config.net.port, config.db.root
    );

    if opts.add_admin {
        let store = DocStore::new(&config.db.root)?;
        let passwords = Passwords::new(config.auth.pepper.clone());
        return add_admin(&store, &passwords);
    }

    if opts.reset_password {
        let store = DocStore::new(&config.db.root)?;
        let passwords = Passwords::new(config.auth.pepper.clone());
        return reset_password(&store, &passwords);
    }

    rostrum::server::run_with_config(config).await
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).context("failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Interactively create an account, re-prompting until the username and
/// email are unique.
fn add_admin(store: &DocStore, passwords: &Passwords) -> Result<()> {
    let username = loop {
        let candidate = prompt("Enter username: ")?;
        if store.user_by_username(&candidate)?.is_none() {
            break candidate;
        }
        println!("That username already exists in the database!");
    };

    let email = loop {
        let candidate = prompt("Enter email: ")?;
        if store.user_by_email(&candidate)?.is_none() {
            break candidate;
        }
        println!("That email already exists in the database!");
    };

    let password = prompt("Enter password: ")?;

    let mut id = uuid::Uuid::new_v4();
    while store.user_by_id(id)?.is_some() {
        id = uuid::Uuid::new_v4();
    }

    store.set_user(&User { id, username, email, phash: passwords.hash(&password)? })?;
    println!("User created.");
    Ok(())
}

fn reset_password(store: &DocStore, passwords: &Passwords) -> Result<()> {
    let username = prompt("Enter username: ")?;
    let Some(mut user) = store.user_by_username(&username)? else {
        println!("That user doesn't exist.");
        return Ok(());
    };
    let password = prompt("Enter password: ")?;
    user.phash = passwords.hash(&password)?;
    store.set_user(&user)?;
    println!("User saved!");
    Ok(())
}
