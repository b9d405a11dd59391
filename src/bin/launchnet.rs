#![forbid(unsafe_code)]
//! Launchnet operator CLI: run a launch registry and join launches on it

use clap::{Parser, Subcommand};
use colored::*;
use launchnet::api::run_api_server;
use launchnet::builder::{Builder, JoinRequest};
use launchnet::chain::{BinaryCommands, Blockchain};
use launchnet::cli::{
    load_account, open_keyring, open_ledger, print_tx_response, requests_table, spawn_progress,
};
use launchnet::client::RegistryClient;
use launchnet::coin::Coin;
use launchnet::config::{load_config, Config};
use launchnet::events::EventBus;
use launchnet::gentx::GentxInfo;
use launchnet::launch::{LaunchId, LaunchQuery, TxResponse};
use launchnet::logging;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file (defaults to ./launchnet.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serves the launch registry over HTTP
    Serve {
        /// Listen address, e.g. 127.0.0.1:4500
        #[arg(long)]
        listen: Option<String>,
    },
    /// Manages registry accounts
    Keys {
        #[command(subcommand)]
        command: KeysCommands,
    },
    /// Requests to join a launch as a genesis validator
    Join {
        /// Launch to join
        launch_id: LaunchId,
        /// Gentx file of the validator
        #[arg(long)]
        gentx: PathBuf,
        /// Home directory of the local chain node
        #[arg(long)]
        home: PathBuf,
        /// Genesis account balance to request, defaults to the self-delegation
        #[arg(long)]
        amount: Option<String>,
        /// The gentx was produced outside the local node
        #[arg(long)]
        custom_gentx: bool,
        /// Peer address, defaults to the gentx memo
        #[arg(long)]
        peer: Option<String>,
        /// Registry account signing the requests
        #[arg(long)]
        from: Option<String>,
    },
    /// Lists the pending requests of a launch
    Requests { launch_id: LaunchId },
    /// Approves a pending request in the local registry database
    Approve { launch_id: LaunchId, request_id: u64 },
    /// Shows the address of an account on the local chain node
    ShowAccount {
        name: String,
        /// Home directory of the local chain node
        #[arg(long)]
        home: PathBuf,
        /// Chain binary to query
        #[arg(long)]
        binary: PathBuf,
        #[arg(long, default_value = "test")]
        keyring_backend: String,
    },
}

#[derive(Subcommand)]
enum KeysCommands {
    /// Creates an account, or imports one from a hex secret key
    Add {
        name: String,
        #[arg(long)]
        secret: Option<String>,
    },
    /// Shows an account address
    Show { name: Option<String> },
    /// Lists stored accounts
    List,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {}", "❌".red(), e.to_string().red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;
    logging::init(cli.log_level.as_deref().unwrap_or(&config.log.level))?;

    match cli.command {
        Commands::Serve { listen } => serve(&config, listen),
        Commands::Keys { command } => keys(&config, command),
        Commands::Join {
            launch_id,
            gentx,
            home,
            amount,
            custom_gentx,
            peer,
            from,
        } => {
            let response = join(
                &config,
                launch_id,
                &gentx,
                home,
                amount.as_deref(),
                custom_gentx,
                peer,
                from.as_deref(),
            )?;
            print_tx_response(&response);
            Ok(())
        }
        Commands::Requests { launch_id } => {
            let client = RegistryClient::new(&config.registry.url, config.registry.timeout())?;
            let requests = client.request_all(launch_id)?;
            if requests.is_empty() {
                println!("{}", format!("📭 No pending requests for launch {}", launch_id).yellow());
            } else {
                println!("{}", requests_table(&requests));
            }
            Ok(())
        }
        Commands::Approve {
            launch_id,
            request_id,
        } => {
            let ledger = open_ledger(&config)?;
            let request = ledger.approve(launch_id, request_id)?;
            println!(
                "{} {} {} for launch {}",
                "✅ Approved".bright_green().bold(),
                request.content.kind(),
                request.content.address().bright_white(),
                launch_id
            );
            Ok(())
        }
        Commands::ShowAccount {
            name,
            home,
            binary,
            keyring_backend,
        } => {
            let commands = BinaryCommands::new(binary, home.clone()).with_keyring_backend(keyring_backend);
            let chain = Blockchain::open(home, Box::new(commands));
            println!("{}", chain.get_account_address(&name)?);
            Ok(())
        }
    }
}

fn serve(config: &Config, listen: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = config.registry.clone();
    if let Some(listen) = listen {
        registry.listen = listen;
    }
    let addr = registry.listen_addr()?;
    let ledger = Arc::new(open_ledger(config)?);

    println!("{}", "🚀 Launch registry".bright_cyan().bold());
    println!("   {} {}", "Database:".bright_white(), registry.database);
    println!("   {} http://{}", "Listening:".bright_white(), addr);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_api_server(ledger, addr))?;
    Ok(())
}

fn keys(config: &Config, command: KeysCommands) -> Result<(), Box<dyn std::error::Error>> {
    let keyring = open_keyring(config)?;
    let prefix = &config.account.address_prefix;
    match command {
        KeysCommands::Add { name, secret } => {
            let account = match secret {
                Some(secret) => keyring.import(&name, &secret)?,
                None => keyring.create(&name)?,
            };
            println!("{} {}", "✅ Created account".bright_green().bold(), account.name);
            println!("   {} {}", "Address:".bright_white(), account.address(prefix));
        }
        KeysCommands::Show { name } => {
            let account = load_account(config, name.as_deref())?;
            println!("{}", account.address(prefix));
        }
        KeysCommands::List => {
            for name in keyring.list()? {
                let account = keyring.get(&name)?;
                println!("{}  {}", name.bright_white(), account.address(prefix));
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn join(
    config: &Config,
    launch_id: LaunchId,
    gentx_path: &std::path::Path,
    home: PathBuf,
    amount: Option<&str>,
    custom_gentx: bool,
    peer: Option<String>,
    from: Option<&str>,
) -> Result<TxResponse, Box<dyn std::error::Error>> {
    let account = load_account(config, from)?;
    let (gentx, info) = GentxInfo::from_path(gentx_path)?;
    let amount: Coin = match amount {
        Some(amount) => amount.parse()?,
        None => info.self_delegation.clone(),
    };

    let client = Arc::new(RegistryClient::new(
        &config.registry.url,
        config.registry.timeout(),
    )?);
    let (bus, rx) = EventBus::new();
    let progress = spawn_progress(rx);

    let builder = Builder::new(account, client.clone(), client, Arc::new(bus))
        .with_address_prefix(config.account.address_prefix.clone());
    let req = JoinRequest {
        launch_id,
        chain_home: home,
        peer: peer.unwrap_or(info.memo),
        val_address: builder.address(),
        custom_gentx,
        gentx,
        cons_pub_key: info.pub_key,
        self_delegation: info.self_delegation,
        amount,
    };

    let result = builder.join(&req);
    // dropping the builder closes the event channel
    drop(builder);
    let _ = progress.join();

    let out = result?;
    Ok(serde_json::from_str(&out)?)
}
