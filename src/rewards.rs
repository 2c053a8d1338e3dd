use crate::codes::{self, REFEREE_REWARD_PREFIX, REFERRER_REWARD_PREFIX};
use crate::discounts::{DiscountIssuer, DiscountRequest};
use crate::ledger::{Ledger, LedgerError};
use crate::model::{
    RecipientRole, Referral, ReferralStatus, Reward, RewardStatus, Settings, DAY_MS,
};

#[derive(Debug, thiserror::Error)]
pub enum RewardError {
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("referral not found")]
    NotFound,
    #[error("referral not eligible for rewards")]
    NotEligible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFailure {
    pub recipient: RecipientRole,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReport {
    pub referral_id: u64,
    pub rewards: Vec<Reward>,
    pub failures: Vec<IssueFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub processed: usize,
    pub total: usize,
    pub failures: Vec<String>,
}

/// Issue the rewards for one converted referral.
///
/// Each recipient's issuance is attempted independently: a discount-service
/// failure for one side is recorded in the report and does not block the
/// other side, and the referral is marked rewarded either way. Callers that
/// cannot accept a rewarded referral with missing reward rows must not call
/// this; the scheduler filters by status so an already-rewarded referral is
/// never re-driven.
pub fn issue_rewards(
    ledger: &mut Ledger,
    issuer: &mut dyn DiscountIssuer,
    referral_id: u64,
    now_ms: i64,
) -> Result<IssueReport, RewardError> {
    let settings = ledger.settings().clone();
    let referral = ledger
        .referral(referral_id)
        .cloned()
        .ok_or(RewardError::NotFound)?;
    if referral.status != ReferralStatus::Converted {
        return Err(RewardError::NotEligible);
    }

    let mut report = IssueReport {
        referral_id,
        rewards: Vec::new(),
        failures: Vec::new(),
    };

    attempt_reward(
        ledger,
        issuer,
        &settings,
        &referral,
        RecipientRole::Referrer,
        referral.referrer_id,
        settings.reward_amount_cents,
        REFERRER_REWARD_PREFIX,
        now_ms,
        &mut report,
    )?;

    if settings.double_sided {
        if let Some(referee_id) = referral.referee_id {
            attempt_reward(
                ledger,
                issuer,
                &settings,
                &referral,
                RecipientRole::Referee,
                referee_id,
                settings.referee_reward_amount_cents,
                REFEREE_REWARD_PREFIX,
                now_ms,
                &mut report,
            )?;
        }
    }

    ledger.set_referral_status(
        referral_id,
        ReferralStatus::Rewarded,
        None,
        Some(now_ms),
        now_ms,
    )?;
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn attempt_reward(
    ledger: &mut Ledger,
    issuer: &mut dyn DiscountIssuer,
    settings: &Settings,
    referral: &Referral,
    recipient: RecipientRole,
    customer_id: u64,
    amount_cents: i64,
    code_prefix: &str,
    now_ms: i64,
    report: &mut IssueReport,
) -> Result<(), RewardError> {
    let code = codes::generate_discount_code(code_prefix);
    let request = DiscountRequest {
        code,
        amount_cents,
        value_type: settings.reward_kind.into(),
        min_order_value_cents: settings.min_order_value_cents,
        expiry_days: settings.code_expiry_days,
    };

    match issuer.create_discount(&request) {
        Ok(issued) => {
            let reward = ledger.record_reward(
                Reward {
                    id: 0,
                    referral_id: referral.id,
                    recipient,
                    customer_id,
                    kind: settings.reward_kind,
                    amount_cents,
                    discount_id: issued.discount_id,
                    discount_code: issued.code,
                    status: RewardStatus::Sent,
                    sent_at_ms: Some(now_ms),
                    used_at_ms: None,
                    expires_at_ms: issued.expires_at_ms,
                    created_at_ms: now_ms,
                },
                now_ms,
            )?;
            ledger.add_earnings(customer_id, amount_cents, now_ms)?;
            report.rewards.push(reward);
        }
        Err(err) => report.failures.push(IssueFailure {
            recipient,
            reason: err.to_string(),
        }),
    }
    Ok(())
}

/// One reward-queue sweep: every converted referral past the cooldown gets
/// an issuer run, failures are caught per item. No progress is persisted —
/// an interrupted sweep is simply redone by the next one, which re-selects
/// whatever is still converted.
pub fn process_reward_queue(
    ledger: &mut Ledger,
    issuer: &mut dyn DiscountIssuer,
    now_ms: i64,
) -> SweepReport {
    let cutoff = now_ms - ledger.settings().cooldown_days.saturating_mul(DAY_MS);
    let eligible = ledger.converted_ready(cutoff);

    let mut report = SweepReport {
        processed: 0,
        total: eligible.len(),
        failures: Vec::new(),
    };
    for referral_id in eligible {
        match issue_rewards(ledger, issuer, referral_id, now_ms) {
            Ok(_) => report.processed += 1,
            Err(err) => report.failures.push(format!("referral {referral_id}: {err}")),
        }
    }
    report
}
