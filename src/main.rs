use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use extdb_auth::auth::{AuthenticationRequest, LocalIdentity, PasswordRequest};
use extdb_auth::{
    AuthResponse, AuthenticationChain, Config, ExternalDatabaseProvider, HashAlgorithm,
};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("extdb-auth")
        .version("0.1.0")
        .about("Check passwords against an external user database")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("extdb-auth.yml"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .num_args(0)
                .help("Enable verbose logging")
                .action(clap::ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .num_args(0)
                .help("Suppress all output except errors")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .subcommand(
            Command::new("generate-config")
                .about("Write a default configuration file")
                .arg(Arg::new("file").value_name("FILE").required(true)),
        )
        .subcommand(
            Command::new("hash")
                .about("Hash a password read from stdin")
                .arg(
                    Arg::new("algorithm")
                        .short('a')
                        .long("algorithm")
                        .value_name("NAME")
                        .help("Hash algorithm (defaults to the configured one)"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Authenticate a user; the password is read from stdin")
                .arg(Arg::new("username").value_name("USERNAME").required(true)),
        )
        .get_matches();

    if let Some(sub) = matches.subcommand_matches("generate-config") {
        let path = sub.get_one::<String>("file").ok_or_else(|| anyhow!("missing FILE"))?;
        return generate_default_config(path);
    }

    let config_path = matches
        .get_one::<String>("config")
        .ok_or_else(|| anyhow!("missing configuration path"))?;
    let config_exists = Path::new(config_path).exists();
    let config = if config_exists {
        Config::load_from_file(config_path)?
    } else {
        Config::default()
    };

    let guard = setup_logging(&config, &matches)?;

    if config_exists {
        info!("Loaded configuration from {}", config_path);
    }

    match matches.subcommand() {
        Some(("hash", sub)) => hash_password(&config, sub),
        Some(("check", sub)) => {
            if !config_exists {
                return Err(anyhow!("Configuration file {} not found", config_path));
            }
            let username = sub
                .get_one::<String>("username")
                .ok_or_else(|| anyhow!("missing USERNAME"))?;
            let passed = check_user(&config, username).await?;
            if !passed {
                drop(guard);
                std::process::exit(1);
            }
            Ok(())
        }
        _ => Err(anyhow!("Unknown command")),
    }
}

fn generate_default_config(path: &str) -> Result<()> {
    let config = Config::default();
    config.save_to_file(path)?;

    println!("Generated default configuration file: {}", path);
    println!("Edit the database and fields sections to match your user table.");

    Ok(())
}

fn read_secret() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn hash_password(config: &Config, matches: &ArgMatches) -> Result<()> {
    let algorithm = match matches.get_one::<String>("algorithm") {
        Some(name) => name.parse::<HashAlgorithm>()?,
        None => config.hash,
    };

    let password = read_secret()?;
    println!("{}", algorithm.hash(&password)?);
    Ok(())
}

async fn check_user(config: &Config, username: &str) -> Result<bool> {
    let password = read_secret()?;
    let provider = ExternalDatabaseProvider::from_config(config).await?;
    let chain = AuthenticationChain::new().with_provider(Arc::new(provider));

    let reqs = vec![AuthenticationRequest::Password(PasswordRequest::new(username, &password))];
    let outcome = match chain.begin(&reqs).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Authentication failed with an error: {:#}", e);
            return Err(e);
        }
    };

    println!("{}", outcome.response);

    let AuthResponse::Pass { username, .. } = &outcome.response else {
        return Ok(false);
    };

    let mut identity = LocalIdentity::new(username);
    chain.finish(&mut identity, &outcome)?;
    print!("{}", serde_yaml::to_string(&identity)?);

    Ok(true)
}

fn setup_logging(config: &Config, matches: &ArgMatches) -> Result<Option<WorkerGuard>> {
    let log_level = if matches.get_flag("quiet") {
        Level::ERROR
    } else {
        match matches.get_count("verbose") {
            0 => match config.logging.level.as_str() {
                "trace" => Level::TRACE,
                "debug" => Level::DEBUG,
                "info" => Level::INFO,
                "warn" => Level::WARN,
                "error" => Level::ERROR,
                _ => Level::INFO,
            },
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if let Some(file) = &config.logging.file {
        let path = Path::new(file);
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("Invalid log file path: {}", file))?;

        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let subscriber = builder.with_ansi(false).with_writer(writer).finish();
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(Some(guard));
    }

    if config.logging.console {
        let subscriber = builder.with_writer(std::io::stderr).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = builder.with_writer(std::io::sink).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(None)
}
