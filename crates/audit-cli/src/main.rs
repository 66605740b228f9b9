//! Audit chain CLI for operators.

#![deny(unsafe_code)]

use audit_log::{merkle_root, verify_entries};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "warden-audit", about = "Inspect and verify a persisted audit log")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show high-level stats for an audit JSONL file
    Inspect {
        #[arg(short, long)]
        log: PathBuf,
        #[arg(short = 'r', long)]
        rule_id: Option<String>,
    },
    /// Re-derive the hash chain and Merkle leaves, reporting divergences
    Verify {
        #[arg(short, long)]
        log: PathBuf,
    },
    /// Print the current Merkle root over all entries
    Proof {
        #[arg(short, long)]
        log: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect { log, rule_id } => cmd_inspect(&log, rule_id.as_deref())?,
        Command::Verify { log } => cmd_verify(&log)?,
        Command::Proof { log } => cmd_proof(&log)?,
    }
    Ok(())
}

fn cmd_inspect(log: &PathBuf, rule_id: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let mut entries = audit_log::read_entries(log)?;
    if let Some(rid) = rule_id {
        entries.retain(|e| e.rule_id == rid);
    }
    let mut by_effect: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_rule: BTreeMap<String, usize> = BTreeMap::new();
    for e in &entries {
        *by_effect.entry(e.effect.clone()).or_insert(0) += 1;
        *by_rule.entry(e.rule_id.clone()).or_insert(0) += 1;
    }
    let summary = json!({
        "entries": entries.len(),
        "first_timestamp": entries.first().map(|e| e.timestamp.clone()),
        "last_timestamp": entries.last().map(|e| e.timestamp.clone()),
        "by_effect": by_effect,
        "by_rule": by_rule,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_verify(log: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let entries = audit_log::read_entries(log)?;
    let report = verify_entries(&entries);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_proof(log: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let entries = audit_log::read_entries(log)?;
    let leaves: Vec<String> = entries.iter().map(|e| e.merkle_leaf.clone()).collect();
    let (root, height) = merkle_root(&leaves);
    let proof = json!({
        "merkle_root": root,
        "height": height,
        "last_index": entries.len() as i64 - 1,
    });
    println!("{}", serde_json::to_string_pretty(&proof)?);
    Ok(())
}
