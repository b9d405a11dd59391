//! Shared helpers for the launchnet binary

use crate::account::{Account, Keyring};
use crate::config::Config;
use crate::error::NetworkError;
use crate::events::{Event, Status};
use crate::launch::{Request, RequestContent, TxResponse};
use crate::registry::{Database, Ledger};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::thread::JoinHandle;
use std::time::Duration;

/// Opens the registry database named in the config, creating its directory.
pub fn open_ledger(config: &Config) -> Result<Ledger, NetworkError> {
    let path = Path::new(&config.registry.database);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = Database::open(&config.registry.database)?;
    Ok(Ledger::new(Box::new(db)).with_address_prefix(config.account.address_prefix.clone()))
}

pub fn open_keyring(config: &Config) -> Result<Keyring, NetworkError> {
    Keyring::open(config.account.keyring_path())
}

/// Loads `name`, or the configured default account.
pub fn load_account(config: &Config, name: Option<&str>) -> Result<Account, NetworkError> {
    let keyring = open_keyring(config)?;
    keyring.get(name.unwrap_or(&config.account.name))
}

/// Shortens long addresses for table cells.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() > 24 {
        let head: String = chars[..12].iter().collect();
        let tail: String = chars[chars.len() - 8..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        address.to_string()
    }
}

fn request_details(content: &RequestContent) -> String {
    match content {
        RequestContent::GenesisAccount(acc) => acc.coins.to_string(),
        RequestContent::VestingAccount(acc) => format!(
            "{} vesting until {}",
            acc.vesting.vesting,
            format_timestamp(acc.vesting.end_time)
        ),
        RequestContent::GenesisValidator(val) => {
            format!("self-delegation {} | peer {}", val.self_delegation, val.peer)
        }
        RequestContent::AccountRemoval { .. } | RequestContent::ValidatorRemoval { .. } => {
            "-".to_string()
        }
    }
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn header(title: &str) -> Cell {
    Cell::new(title)
        .fg(TableColor::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Table of pending requests, one row per request.
pub fn requests_table(requests: &[Request]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            header("ID"),
            header("Kind"),
            header("Address"),
            header("Creator"),
            header("Details"),
            header("Created"),
        ]);

    for request in requests {
        let color = match &request.content {
            RequestContent::GenesisValidator(_) => TableColor::Magenta,
            RequestContent::AccountRemoval { .. } | RequestContent::ValidatorRemoval { .. } => {
                TableColor::Red
            }
            _ => TableColor::Green,
        };
        table.add_row(vec![
            Cell::new(request.request_id),
            Cell::new(request.content.kind()).fg(color),
            Cell::new(short_address(request.content.address())),
            Cell::new(short_address(&request.creator)),
            Cell::new(request_details(&request.content)),
            Cell::new(format_timestamp(request.created_at)),
        ]);
    }
    table
}

pub fn print_tx_response(response: &TxResponse) {
    println!("{}", "✅ Transaction committed".bright_green().bold());
    println!("   {} {}", "Height:".bright_white(), response.height);
    println!("   {} {}", "Tx hash:".bright_white(), response.txhash.bright_yellow());
    let ids: Vec<String> = response.request_ids.iter().map(|id| id.to_string()).collect();
    println!("   {} {}", "Request IDs:".bright_white(), ids.join(", "));
}

/// Renders join progress on a spinner until every sender is dropped.
pub fn spawn_progress(rx: Receiver<Event>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        for event in rx {
            match event.status {
                Status::Ongoing => spinner.set_message(event.message),
                Status::Done => spinner.println(format!("{} {}", "✔".green(), event.message)),
            }
        }
        spinner.finish_and_clear();
    })
}
