use std::env;
use std::thread;
use std::time::Duration;

use referral_core::discounts::HttpDiscountService;
use referral_core::ledger::{Ledger, DEFAULT_MAX_SEGMENT_BYTES};
use referral_core::model::now_millis;
use referral_core::rewards;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ledger_dir = getenv("CORE_LEDGER_DIR", "/tmp/referral-core/ledger");
    let max_segment_bytes = getenv_u64("CORE_MAX_SEGMENT_BYTES", DEFAULT_MAX_SEGMENT_BYTES);
    let discount_url = getenv("CORE_DISCOUNT_URL", "http://localhost:8090/discounts");
    let discount_token = getenv("CORE_DISCOUNT_TOKEN", "");
    let timeout_secs = getenv_u64("CORE_DISCOUNT_TIMEOUT_SECS", 10);
    let sweep_interval_secs = getenv_u64("CORE_SWEEP_INTERVAL_SECS", 3_600);
    let run_once = getenv_bool("CORE_RUN_ONCE", false);

    let mut ledger = Ledger::open(&ledger_dir, max_segment_bytes)?;
    let mut issuer = HttpDiscountService::new(
        &discount_url,
        &discount_token,
        Duration::from_secs(timeout_secs),
    )?;

    let counts = ledger.counts();
    println!(
        "referral_core_started ledger_dir={ledger_dir} customers={} referrals={} rewards={}",
        counts.customers, counts.referrals, counts.rewards
    );

    loop {
        let report = rewards::process_reward_queue(&mut ledger, &mut issuer, now_millis());
        println!(
            "queue_sweep processed={} total={}",
            report.processed, report.total
        );
        for failure in &report.failures {
            eprintln!("queue_sweep_failure {failure}");
        }

        if run_once {
            break;
        }
        thread::sleep(Duration::from_secs(sweep_interval_secs));
    }

    Ok(())
}

fn getenv(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn getenv_u64(key: &str, fallback: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn getenv_bool(key: &str, fallback: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(fallback)
}
