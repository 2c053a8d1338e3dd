use crate::ledger::Ledger;
use crate::model::{FlagReason, Settings, DAY_MS};

/// Strictly more clicks than this from one IP inside the window fires
/// `same_ip`.
pub const SAME_IP_CLICK_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudInput<'a> {
    pub referrer_code: &'a str,
    pub referee_email: &'a str,
    pub referee_ip: Option<&'a str>,
    pub order_total_cents: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudVerdict {
    pub passed: bool,
    pub flags: Vec<FlagReason>,
}

/// Score a conversion attempt against the enabled anti-abuse rules.
///
/// Every rule reads live ledger state at call time; flags are independent
/// and more than one may fire. The flag order carries no meaning beyond
/// reporting.
pub fn evaluate(
    ledger: &Ledger,
    settings: &Settings,
    input: &FraudInput<'_>,
    now_ms: i64,
) -> FraudVerdict {
    let mut flags = Vec::new();
    let window_start = now_ms - DAY_MS;
    let referrer = ledger.customer_by_code(input.referrer_code);

    if settings.block_self_referral {
        if let Some(referrer) = referrer {
            if referrer
                .email
                .eq_ignore_ascii_case(input.referee_email.trim())
            {
                flags.push(FlagReason::SelfReferral);
            }
        }
    }

    if settings.flag_same_ip {
        if let Some(ip) = input.referee_ip {
            let recent = ledger.clicks_from_ip_since(input.referrer_code, ip, window_start);
            if recent > SAME_IP_CLICK_LIMIT {
                flags.push(FlagReason::SameIp);
            }
        }
    }

    if settings.flag_low_order {
        if let Some(total) = input.order_total_cents {
            if total < settings.min_order_value_cents {
                flags.push(FlagReason::LowOrder);
            }
        }
    }

    if settings.flag_rate_limit {
        if let Some(referrer) = referrer {
            let today = ledger.referrals_created_since(referrer.id, window_start) as u64;
            if today >= settings.max_referrals_per_day {
                flags.push(FlagReason::RateLimit);
            }
        }
    }

    FraudVerdict {
        passed: flags.is_empty(),
        flags,
    }
}
