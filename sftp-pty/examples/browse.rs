//! Connect to a host with the system `sftp` client and look around.
//!
//! # Usage
//!
//! With password authentication:
//! ```bash
//! cargo run --example browse -- --host localhost --user your_username --password your_password
//! ```
//!
//! With SSH key authentication:
//! ```bash
//! cargo run --example browse -- --host localhost --user your_username --key ~/.ssh/id_rsa
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use sftp_pty::{ConnectConfig, Error, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = ConnectConfig::builder(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout));
    if let Some(password) = &args.password {
        builder = builder.password(password);
    }
    if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    }

    println!("Connecting to {}@{}:{}...", args.user, args.host, args.port);
    let mut session = Session::new();
    session.connect(builder.build()).await?;
    println!("Connected!");

    let cwd = session.cwd().await?;
    println!("\nRemote working directory: {}", cwd);

    let target = args.path.unwrap_or(cwd);
    println!("\nListing {}", target);
    println!("{}", "-".repeat(50));
    match session.list(&target).await {
        Ok(entries) => {
            for entry in entries {
                let modified = entry
                    .modify_time
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}{:<3}{:<3}{:<3} {:>10} {:<16} {}",
                    entry.file_type,
                    entry.rights.user,
                    entry.rights.group,
                    entry.rights.other,
                    entry.size,
                    modified,
                    entry.name
                );
            }
        }
        Err(Error::NotFound { path, .. }) => eprintln!("{} does not exist", path),
        Err(e) => return Err(e.into()),
    }
    println!("{}", "-".repeat(50));

    println!("\nClosing connection...");
    session.end().await?;
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    path: Option<String>,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 22u16;
        let mut user = env::var("USER").unwrap_or_else(|_| "root".to_string());
        let mut password = None;
        let mut key = None;
        let mut path = None;
        let mut timeout = 30u64;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--key" | "-k" => {
                    i += 1;
                    if i < args.len() {
                        key = Some(PathBuf::from(&args[i]));
                    }
                }
                "--path" => {
                    i += 1;
                    if i < args.len() {
                        path = Some(args[i].clone());
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            key,
            path,
            timeout,
        }
    }

    fn print_help() {
        println!(
            r#"sftp-pty browse example

USAGE:
    cargo run --example browse -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Target host [default: localhost]
    -p, --port <PORT>        SSH port [default: 22]
    -u, --user <USER>        Username [default: $USER]
    -P, --password <PASS>    Password for authentication
    -k, --key <PATH>         Path to SSH private key
    --path <PATH>            Directory to list [default: remote working directory]
    -t, --timeout <SECS>     Response timeout [default: 30]
    --help                   Print this help message
"#
        );
    }
}
