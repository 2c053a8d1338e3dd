use crate::ledger::{Ledger, LedgerError};
use crate::model::{Click, ReferralStatus, Reward};

const RECENT_REWARD_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum StorefrontError {
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("unknown referral code")]
    UnknownCode,
    #[error("customer not enrolled")]
    NotEnrolled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollRequest {
    pub external_id: u64,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub referral_code: String,
    pub already_enrolled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBreakdown {
    pub pending: usize,
    pub converted: usize,
    pub rewarded: usize,
    pub rejected: usize,
    pub expired: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerStats {
    pub referral_code: String,
    pub total_referrals: u64,
    pub total_earned_cents: i64,
    pub breakdown: StatusBreakdown,
    pub recent_rewards: Vec<Reward>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickRequest {
    pub referral_code: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer_url: Option<String>,
}

/// Enroll a storefront customer into the program. Idempotent per external
/// customer id: re-enrolling returns the existing code.
pub fn enroll(
    ledger: &mut Ledger,
    request: &EnrollRequest,
    now_ms: i64,
) -> Result<Enrollment, StorefrontError> {
    if request.email.trim().is_empty() {
        return Err(StorefrontError::MissingField("email"));
    }

    if let Some(existing) = ledger.customer_by_external_id(request.external_id) {
        return Ok(Enrollment {
            referral_code: existing.referral_code.clone(),
            already_enrolled: true,
        });
    }

    let code = ledger.mint_referral_code()?;
    let customer = ledger.create_customer(
        request.external_id,
        &request.email,
        &request.name,
        code,
        None,
        now_ms,
    )?;
    Ok(Enrollment {
        referral_code: customer.referral_code,
        already_enrolled: false,
    })
}

/// A referrer's own dashboard numbers.
pub fn referrer_stats(
    ledger: &Ledger,
    external_id: u64,
) -> Result<ReferrerStats, StorefrontError> {
    let customer = ledger
        .customer_by_external_id(external_id)
        .ok_or(StorefrontError::NotEnrolled)?;

    let mut breakdown = StatusBreakdown::default();
    for referral in ledger.referrals_desc() {
        if referral.referrer_id != customer.id {
            continue;
        }
        match referral.status {
            ReferralStatus::Pending => breakdown.pending += 1,
            ReferralStatus::Converted => breakdown.converted += 1,
            ReferralStatus::Rewarded => breakdown.rewarded += 1,
            ReferralStatus::Rejected => breakdown.rejected += 1,
            ReferralStatus::Expired => breakdown.expired += 1,
        }
    }

    let recent_rewards = ledger
        .rewards_for_customer(customer.id)
        .into_iter()
        .take(RECENT_REWARD_LIMIT)
        .cloned()
        .collect();

    Ok(ReferrerStats {
        referral_code: customer.referral_code.clone(),
        total_referrals: customer.total_referrals,
        total_earned_cents: customer.total_earned_cents,
        breakdown,
        recent_rewards,
    })
}

/// Record a referral-link click. The code must belong to an enrolled
/// customer; nothing is written for unknown codes.
pub fn track_click(
    ledger: &mut Ledger,
    request: &ClickRequest,
    now_ms: i64,
) -> Result<Click, StorefrontError> {
    if request.referral_code.is_empty() {
        return Err(StorefrontError::MissingField("referral_code"));
    }
    if ledger.customer_by_code(&request.referral_code).is_none() {
        return Err(StorefrontError::UnknownCode);
    }

    let click = ledger.record_click(
        &request.referral_code,
        request.ip.clone(),
        request.user_agent.clone(),
        request.referrer_url.clone(),
        now_ms,
    )?;
    Ok(click)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DEFAULT_MAX_SEGMENT_BYTES;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000_000;

    fn request() -> EnrollRequest {
        EnrollRequest {
            external_id: 11,
            email: "anna@example.com".to_string(),
            name: "Anna".to_string(),
        }
    }

    #[test]
    fn enrolling_twice_returns_the_same_code() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();

        let first = enroll(&mut ledger, &request(), NOW).unwrap();
        assert!(!first.already_enrolled);
        assert!(first.referral_code.starts_with("OKURA-"));

        let second = enroll(&mut ledger, &request(), NOW + 10).unwrap();
        assert!(second.already_enrolled);
        assert_eq!(second.referral_code, first.referral_code);
        assert_eq!(ledger.counts().customers, 1);
    }

    #[test]
    fn enrollment_requires_an_email() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        let mut bad = request();
        bad.email = "  ".to_string();
        let err = enroll(&mut ledger, &bad, NOW).unwrap_err();
        assert!(matches!(err, StorefrontError::MissingField("email")));
        assert_eq!(ledger.counts().customers, 0);
    }

    #[test]
    fn clicks_require_a_known_code() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        let enrollment = enroll(&mut ledger, &request(), NOW).unwrap();

        let err = track_click(
            &mut ledger,
            &ClickRequest {
                referral_code: "OKURA-NOSUCH".to_string(),
                ..ClickRequest::default()
            },
            NOW,
        )
        .unwrap_err();
        assert!(matches!(err, StorefrontError::UnknownCode));
        assert_eq!(ledger.counts().clicks, 0);

        let click = track_click(
            &mut ledger,
            &ClickRequest {
                referral_code: enrollment.referral_code.clone(),
                ip: Some("10.1.1.1".to_string()),
                user_agent: Some("test-agent".to_string()),
                referrer_url: Some("https://social.example/post".to_string()),
            },
            NOW,
        )
        .unwrap();
        assert_eq!(click.referral_code, enrollment.referral_code);
        assert_eq!(ledger.counts().clicks, 1);
    }

    #[test]
    fn stats_cover_breakdown_and_recent_rewards() {
        use crate::ledger::{NewReferral, ReferralInsert};
        use crate::model::{RecipientRole, ReferralStatus, RewardKind, RewardStatus};

        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        enroll(&mut ledger, &request(), NOW).unwrap();
        let customer_id = ledger.customer_by_external_id(11).unwrap().id;

        for (order_id, status) in [
            (1_u64, ReferralStatus::Pending),
            (2, ReferralStatus::Converted),
            (3, ReferralStatus::Rewarded),
        ] {
            let inserted = ledger
                .insert_referral(
                    NewReferral {
                        referrer_id: customer_id,
                        referee_id: None,
                        referee_email: format!("r{order_id}@example.com"),
                        order_id,
                        order_total_cents: Some(8_000),
                        status,
                        converted_at_ms: None,
                    },
                    NOW,
                )
                .unwrap();
            assert!(matches!(inserted, ReferralInsert::Created(_)));
            ledger.bump_total_referrals(customer_id, NOW).unwrap();
        }
        ledger
            .record_reward(
                crate::model::Reward {
                    id: 0,
                    referral_id: 3,
                    recipient: RecipientRole::Referrer,
                    customer_id,
                    kind: RewardKind::Discount,
                    amount_cents: 1_500,
                    discount_id: "d-1".to_string(),
                    discount_code: "OKREF-AAAA2222".to_string(),
                    status: RewardStatus::Sent,
                    sent_at_ms: Some(NOW),
                    used_at_ms: None,
                    expires_at_ms: None,
                    created_at_ms: NOW,
                },
                NOW,
            )
            .unwrap();

        let stats = referrer_stats(&ledger, 11).unwrap();
        assert_eq!(stats.total_referrals, 3);
        assert_eq!(stats.breakdown.pending, 1);
        assert_eq!(stats.breakdown.converted, 1);
        assert_eq!(stats.breakdown.rewarded, 1);
        assert_eq!(stats.recent_rewards.len(), 1);

        let err = referrer_stats(&ledger, 999).unwrap_err();
        assert!(matches!(err, StorefrontError::NotEnrolled));
    }
}
