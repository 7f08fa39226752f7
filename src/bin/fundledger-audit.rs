#![forbid(unsafe_code)]
//! Offline audit tool: load the block log, re-verify the whole chain and
//! print the donation history.

use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use fundledger::config::load_config_from;
use fundledger::ledger::Ledger;
use fundledger::persistence::{Database, Persistence};
use fundledger::transaction::TransactionRecord;

#[derive(Parser)]
#[command(name = "fundledger-audit", about = "Verify the donation ledger")]
struct Args {
    /// Path to the service config file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Emit the exported ledger as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config_from(&args.config)?;
    let db = Database::open(&config.database.path)?;
    let blocks = db.load_chain()?;
    if blocks.is_empty() {
        println!("{}", "No ledger found - nothing to audit.".yellow());
        return Ok(());
    }

    let ledger = Ledger::from_blocks(blocks)?;
    let valid = ledger.verify();
    let entries = ledger.export();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!();
    println!("{}", "📒 FUNDLEDGER AUDIT".bright_cyan().bold());
    println!(
        "   chain height: {}   donations: {}",
        ledger.len(),
        entries.len()
    );
    if valid {
        println!("   integrity: {}", "OK - chain verifies".green().bold());
    } else {
        println!(
            "   integrity: {}",
            "FAILED - chain has been tampered with".red().bold()
        );
    }
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Block", "Donor", "Amount", "Campaign", "Payment ID", "Hash"]);

    let mut total: u64 = 0;
    for entry in &entries {
        let tx = match &entry.transaction {
            TransactionRecord::Donation(tx) => tx,
            TransactionRecord::Genesis(_) => continue,
        };
        total += tx.amount;

        let hash_short = if entry.hash.len() > 16 {
            format!("{}…", &entry.hash[..16])
        } else {
            entry.hash.clone()
        };

        table.add_row(vec![
            Cell::new(entry.index),
            Cell::new(&tx.donor_name),
            Cell::new(format!("{}.{:02}", tx.amount / 100, tx.amount % 100)),
            Cell::new(tx.campaign_id),
            Cell::new(&tx.payment_id),
            Cell::new(hash_short),
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "   total recorded: {}",
        format!("{}.{:02}", total / 100, total % 100).bright_green()
    );

    if !valid {
        std::process::exit(1);
    }
    Ok(())
}
