use crate::extract::extract_referral_code;
use crate::fraud::{self, FraudInput};
use crate::ledger::{Ledger, LedgerError, NewReferral, ReferralInsert};
use crate::model::{parse_money, FlagReason, OrderEvent, ReferralStatus};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoEmail,
    NoCode,
    UnknownCode,
    DuplicateOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Created {
        referral_id: u64,
        status: ReferralStatus,
        flags: Vec<FlagReason>,
    },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Upgraded { referral_id: u64 },
    NoPendingReferral,
}

/// Drive one order-created event through the conversion pipeline.
///
/// Unattributable events (no email, no code, unknown code) and replays of an
/// already-processed order are skipped without side effects. Fraud flags are
/// not an error: the referral is still created, at `Pending`, with one
/// recorded flag per fired rule. Rewards are deliberately not issued here —
/// the cooldown sweep picks converted referrals up later.
pub fn process_order_created(
    ledger: &mut Ledger,
    order: &OrderEvent,
    now_ms: i64,
) -> Result<ConversionOutcome, PipelineError> {
    let email = match order.email.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.to_lowercase(),
        _ => return Ok(ConversionOutcome::Skipped(SkipReason::NoEmail)),
    };

    let code = match extract_referral_code(order) {
        Some(code) => code,
        None => return Ok(ConversionOutcome::Skipped(SkipReason::NoCode)),
    };

    let referrer = match ledger.customer_by_code(&code) {
        Some(customer) => customer.clone(),
        None => return Ok(ConversionOutcome::Skipped(SkipReason::UnknownCode)),
    };

    if ledger.referral_by_order(order.id).is_some() {
        return Ok(ConversionOutcome::Skipped(SkipReason::DuplicateOrder));
    }

    let order_total_cents = order.total_price.as_deref().and_then(parse_money);

    // Resolve the referee, auto-enrolling when the event carries a
    // storefront customer identity.
    let referee_id = match ledger.customer_by_email(&email) {
        Some(customer) => Some(customer.id),
        None => match order.customer.as_ref().and_then(|c| c.id) {
            Some(external_id) => {
                let referee_code = ledger.mint_referral_code()?;
                let name = order
                    .customer
                    .as_ref()
                    .and_then(|c| c.first_name.clone())
                    .unwrap_or_default();
                let created = ledger.create_customer(
                    external_id,
                    &email,
                    &name,
                    referee_code,
                    Some(referrer.id),
                    now_ms,
                )?;
                Some(created.id)
            }
            None => None,
        },
    };

    let settings = ledger.settings().clone();
    let verdict = fraud::evaluate(
        ledger,
        &settings,
        &FraudInput {
            referrer_code: &code,
            referee_email: &email,
            referee_ip: order.browser_ip.as_deref(),
            order_total_cents,
        },
        now_ms,
    );

    let status = if verdict.passed {
        ReferralStatus::Converted
    } else {
        ReferralStatus::Pending
    };
    let inserted = ledger.insert_referral(
        NewReferral {
            referrer_id: referrer.id,
            referee_id,
            referee_email: email,
            order_id: order.id,
            order_total_cents,
            status,
            converted_at_ms: verdict.passed.then_some(now_ms),
        },
        now_ms,
    )?;
    let referral = match inserted {
        ReferralInsert::Created(referral) => referral,
        ReferralInsert::DuplicateOrder(_) => {
            return Ok(ConversionOutcome::Skipped(SkipReason::DuplicateOrder))
        }
    };

    ledger.bump_total_referrals(referrer.id, now_ms)?;

    for reason in &verdict.flags {
        ledger.raise_flag(
            referral.id,
            referrer.id,
            *reason,
            &format!("auto-flagged: {}", reason.as_str()),
            now_ms,
        )?;
    }

    Ok(ConversionOutcome::Created {
        referral_id: referral.id,
        status,
        flags: verdict.flags,
    })
}

/// Payment confirmation for an order: a pending referral for that order id
/// becomes converted. Anything else (no referral, already converted or
/// terminal) is left untouched.
pub fn process_order_paid(
    ledger: &mut Ledger,
    order_id: u64,
    now_ms: i64,
) -> Result<PaymentOutcome, PipelineError> {
    let referral_id = match ledger.referral_by_order(order_id) {
        Some(referral) if referral.status == ReferralStatus::Pending => referral.id,
        _ => return Ok(PaymentOutcome::NoPendingReferral),
    };
    ledger.set_referral_status(
        referral_id,
        ReferralStatus::Converted,
        Some(now_ms),
        None,
        now_ms,
    )?;
    Ok(PaymentOutcome::Upgraded { referral_id })
}
