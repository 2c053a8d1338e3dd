use crate::ledger::{Ledger, LedgerError};
use crate::model::{FraudFlag, Referral, ReferralStatus, Settings, SettingsPatch};

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralFilter {
    pub status: Option<ReferralStatus>,
    pub search: Option<String>,
    pub page: usize,
    pub per_page: usize,
}

impl Default for ReferralFilter {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A referral joined with the participants an operator wants to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralSummary {
    pub referral: Referral,
    pub referrer_name: String,
    pub referrer_email: String,
    pub referrer_code: String,
    pub referee_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralPage {
    pub referrals: Vec<ReferralSummary>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagView {
    pub flag: FraudFlag,
    pub customer_name: String,
    pub customer_email: String,
}

/// Paginated referral listing, newest first, with an optional status filter
/// and a case-insensitive search over referrer name/email and referee email.
pub fn list_referrals(ledger: &Ledger, filter: &ReferralFilter) -> ReferralPage {
    let per_page = filter.per_page.max(1);
    let page = filter.page.max(1);
    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let matching: Vec<ReferralSummary> = ledger
        .referrals_desc()
        .into_iter()
        .filter(|r| filter.status.map(|s| r.status == s).unwrap_or(true))
        .filter_map(|referral| {
            let referrer = ledger.customer(referral.referrer_id)?;
            let summary = ReferralSummary {
                referral: referral.clone(),
                referrer_name: referrer.name.clone(),
                referrer_email: referrer.email.clone(),
                referrer_code: referrer.referral_code.clone(),
                referee_name: referral
                    .referee_id
                    .and_then(|id| ledger.customer(id))
                    .map(|c| c.name.clone()),
            };
            match &needle {
                Some(needle) if !summary_matches(&summary, needle) => None,
                _ => Some(summary),
            }
        })
        .collect();

    let total = matching.len();
    let pages = total.div_ceil(per_page);
    let referrals = matching
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    ReferralPage {
        referrals,
        total,
        page,
        pages,
    }
}

fn summary_matches(summary: &ReferralSummary, needle: &str) -> bool {
    summary.referrer_name.to_lowercase().contains(needle)
        || summary.referrer_email.contains(needle)
        || summary.referral.referee_email.contains(needle)
}

/// Manual status override. Any of the five statuses may be forced from any
/// current status — this is the operator escape hatch, and no transition
/// guard applies here. Forcing `Converted` stamps a fresh conversion time.
pub fn set_referral_status(
    ledger: &mut Ledger,
    referral_id: u64,
    status: ReferralStatus,
    now_ms: i64,
) -> Result<Referral, LedgerError> {
    let converted_at_ms = (status == ReferralStatus::Converted).then_some(now_ms);
    ledger.set_referral_status(referral_id, status, converted_at_ms, None, now_ms)
}

/// Open fraud flags, newest first, joined with the flagged customer.
pub fn unresolved_flags(ledger: &Ledger) -> Vec<FlagView> {
    ledger
        .unresolved_flags()
        .into_iter()
        .map(|flag| {
            let customer = ledger.customer(flag.customer_id);
            FlagView {
                flag: flag.clone(),
                customer_name: customer.map(|c| c.name.clone()).unwrap_or_default(),
                customer_email: customer.map(|c| c.email.clone()).unwrap_or_default(),
            }
        })
        .collect()
}

pub fn resolve_flag(
    ledger: &mut Ledger,
    flag_id: u64,
    now_ms: i64,
) -> Result<FraudFlag, LedgerError> {
    ledger.resolve_flag(flag_id, now_ms)
}

pub fn settings(ledger: &Ledger) -> Settings {
    ledger.settings().clone()
}

pub fn update_settings(
    ledger: &mut Ledger,
    patch: &SettingsPatch,
    now_ms: i64,
) -> Result<Settings, LedgerError> {
    ledger.update_settings(patch, now_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{NewReferral, ReferralInsert, DEFAULT_MAX_SEGMENT_BYTES};
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000_000;

    fn seeded_ledger(dir: &TempDir) -> (Ledger, u64) {
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        let code = ledger.mint_referral_code().unwrap();
        let referrer = ledger
            .create_customer(11, "anna@example.com", "Anna Larsen", code, None, NOW)
            .unwrap();
        for order_id in 1..=5_u64 {
            let status = if order_id % 2 == 0 {
                ReferralStatus::Converted
            } else {
                ReferralStatus::Pending
            };
            let inserted = ledger
                .insert_referral(
                    NewReferral {
                        referrer_id: referrer.id,
                        referee_id: None,
                        referee_email: format!("referee{order_id}@example.com"),
                        order_id,
                        order_total_cents: Some(8_000),
                        status,
                        converted_at_ms: None,
                    },
                    NOW + order_id as i64,
                )
                .unwrap();
            assert!(matches!(inserted, ReferralInsert::Created(_)));
        }
        (ledger, referrer.id)
    }

    #[test]
    fn listing_filters_by_status_and_search() {
        let dir = TempDir::new().unwrap();
        let (ledger, _) = seeded_ledger(&dir);

        let all = list_referrals(&ledger, &ReferralFilter::default());
        assert_eq!(all.total, 5);
        assert_eq!(all.referrals[0].referral.order_id, 5, "newest first");

        let converted = list_referrals(
            &ledger,
            &ReferralFilter {
                status: Some(ReferralStatus::Converted),
                ..ReferralFilter::default()
            },
        );
        assert_eq!(converted.total, 2);

        let searched = list_referrals(
            &ledger,
            &ReferralFilter {
                search: Some("referee3".to_string()),
                ..ReferralFilter::default()
            },
        );
        assert_eq!(searched.total, 1);
        assert_eq!(searched.referrals[0].referral.order_id, 3);

        let by_referrer = list_referrals(
            &ledger,
            &ReferralFilter {
                search: Some("LARSEN".to_string()),
                ..ReferralFilter::default()
            },
        );
        assert_eq!(by_referrer.total, 5);
    }

    #[test]
    fn listing_paginates() {
        let dir = TempDir::new().unwrap();
        let (ledger, _) = seeded_ledger(&dir);

        let page = list_referrals(
            &ledger,
            &ReferralFilter {
                page: 2,
                per_page: 2,
                ..ReferralFilter::default()
            },
        );
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(page.referrals.len(), 2);
        assert_eq!(page.referrals[0].referral.order_id, 3);
    }

    #[test]
    fn override_permits_any_transition() {
        let dir = TempDir::new().unwrap();
        let (mut ledger, _) = seeded_ledger(&dir);

        let rewarded = set_referral_status(&mut ledger, 1, ReferralStatus::Rewarded, NOW).unwrap();
        assert_eq!(rewarded.status, ReferralStatus::Rewarded);

        // Back out of a terminal status: allowed by design.
        let reverted = set_referral_status(&mut ledger, 1, ReferralStatus::Pending, NOW).unwrap();
        assert_eq!(reverted.status, ReferralStatus::Pending);

        let converted =
            set_referral_status(&mut ledger, 1, ReferralStatus::Converted, NOW + 7).unwrap();
        assert_eq!(converted.converted_at_ms, Some(NOW + 7));

        let err = set_referral_status(&mut ledger, 999, ReferralStatus::Rejected, NOW).unwrap_err();
        assert!(matches!(err, LedgerError::ReferralNotFound));
    }

    #[test]
    fn settings_update_is_partial_through_the_admin_surface() {
        let dir = TempDir::new().unwrap();
        let (mut ledger, _) = seeded_ledger(&dir);

        let updated = update_settings(
            &mut ledger,
            &SettingsPatch {
                double_sided: Some(false),
                reward_amount_cents: Some(2_000),
                ..SettingsPatch::default()
            },
            NOW,
        )
        .unwrap();
        assert!(!updated.double_sided);
        assert_eq!(updated.reward_amount_cents, 2_000);

        let current = settings(&ledger);
        assert_eq!(current.cooldown_days, 14, "untouched fields keep defaults");
        assert_eq!(current.reward_amount_cents, 2_000);
    }

    #[test]
    fn flag_views_join_the_customer_and_resolve() {
        let dir = TempDir::new().unwrap();
        let (mut ledger, referrer_id) = seeded_ledger(&dir);
        ledger
            .raise_flag(
                1,
                referrer_id,
                crate::model::FlagReason::SameIp,
                "auto-flagged: same_ip",
                NOW,
            )
            .unwrap();

        let open = unresolved_flags(&ledger);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].customer_email, "anna@example.com");

        resolve_flag(&mut ledger, open[0].flag.id, NOW + 1).unwrap();
        assert!(unresolved_flags(&ledger).is_empty());
    }
}
