use std::env;
use std::path::PathBuf;

use referral_core::journal::Journal;
use referral_core::ledger::{Ledger, DEFAULT_MAX_SEGMENT_BYTES};
use referral_core::model::rfc3339;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let Some(cmd) = args.next() else {
        print_usage();
        std::process::exit(2);
    };

    match cmd.as_str() {
        "stats" => run_stats(args.collect())?,
        "verify" => run_verify(args.collect())?,
        _ => {
            eprintln!("unknown subcommand: {cmd}");
            print_usage();
            std::process::exit(2);
        }
    }

    Ok(())
}

fn run_stats(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let opts = parse_common_args(args)?;
    let ledger = Ledger::open(&opts.ledger_dir, opts.max_segment_bytes)?;
    let counts = ledger.counts();

    println!("ledger_tool_action=stats");
    println!("ledger_tool_dir={}", opts.ledger_dir.display());
    println!("ledger_tool_seq={}", counts.seq);
    println!("ledger_tool_customers={}", counts.customers);
    println!("ledger_tool_referrals={}", counts.referrals);
    println!("ledger_tool_rewards={}", counts.rewards);
    println!("ledger_tool_clicks={}", counts.clicks);
    println!("ledger_tool_flags={}", counts.flags);
    Ok(())
}

fn run_verify(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let opts = parse_common_args(args)?;
    let journal = Journal::open(&opts.ledger_dir, opts.max_segment_bytes)?;
    let records = journal.replay_all()?;

    println!("ledger_tool_action=verify");
    println!("ledger_tool_dir={}", opts.ledger_dir.display());
    println!("ledger_tool_records={}", records.len());
    println!(
        "ledger_tool_last_seq={}",
        records.last().map(|r| r.seq).unwrap_or(0)
    );
    println!(
        "ledger_tool_last_at={}",
        records
            .last()
            .and_then(|r| rfc3339(r.at_ms))
            .unwrap_or_else(|| "-".to_string())
    );
    println!("ledger_tool_integrity=ok");
    Ok(())
}

struct ToolOpts {
    ledger_dir: PathBuf,
    max_segment_bytes: u64,
}

fn parse_common_args(args: Vec<String>) -> Result<ToolOpts, Box<dyn std::error::Error>> {
    let mut ledger_dir = None;
    let mut max_segment_bytes = DEFAULT_MAX_SEGMENT_BYTES;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--ledger" => {
                let value = iter.next().ok_or("--ledger requires a path")?;
                ledger_dir = Some(PathBuf::from(value));
            }
            "--max-segment-bytes" => {
                let value = iter.next().ok_or("--max-segment-bytes requires a value")?;
                max_segment_bytes = value.parse::<u64>()?;
            }
            other => return Err(format!("unknown argument: {other}").into()),
        }
    }

    Ok(ToolOpts {
        ledger_dir: ledger_dir.ok_or("--ledger <dir> is required")?,
        max_segment_bytes,
    })
}

fn print_usage() {
    eprintln!("usage: ledger-tool <stats|verify> --ledger <dir> [--max-segment-bytes <n>]");
}
