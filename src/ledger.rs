use crate::codes;
use crate::journal::{Journal, JournalError, JournalRecord};
use crate::model::{
    Click, Customer, FlagReason, FraudFlag, Referral, ReferralStatus, Reward, Settings,
    SettingsPatch,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const DEFAULT_MAX_SEGMENT_BYTES: u64 = 8 * 1024 * 1024;
pub const MAX_MINT_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("journal: {0}")]
    Journal(#[from] JournalError),
    #[error("referral code space exhausted after {0} attempts")]
    CodeSpaceExhausted(usize),
    #[error("email already enrolled: {0}")]
    DuplicateEmail(String),
    #[error("storefront customer already enrolled: {0}")]
    DuplicateExternalId(u64),
    #[error("customer not found")]
    CustomerNotFound,
    #[error("referral not found")]
    ReferralNotFound,
    #[error("fraud flag not found")]
    FlagNotFound,
}

/// One replayable ledger mutation. The journal stores these; replaying them
/// in sequence rebuilds the full in-memory state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerEntry {
    CustomerCreated(Customer),
    ReferralCreated(Referral),
    ReferralStatusChanged {
        referral_id: u64,
        status: ReferralStatus,
        converted_at_ms: Option<i64>,
        rewarded_at_ms: Option<i64>,
        at_ms: i64,
    },
    ReferralCountBumped {
        customer_id: u64,
        at_ms: i64,
    },
    EarningsAdded {
        customer_id: u64,
        amount_cents: i64,
        at_ms: i64,
    },
    RewardRecorded(Reward),
    ClickRecorded(Click),
    FlagRaised(FraudFlag),
    FlagResolved {
        flag_id: u64,
        at_ms: i64,
    },
    SettingsUpdated(Settings),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReferral {
    pub referrer_id: u64,
    pub referee_id: Option<u64>,
    pub referee_email: String,
    pub order_id: u64,
    pub order_total_cents: Option<i64>,
    pub status: ReferralStatus,
    pub converted_at_ms: Option<i64>,
}

/// Conflict-tolerant insert result: the order id is the idempotency key, so
/// a second insert for the same order reports the existing row instead of
/// writing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralInsert {
    Created(Referral),
    DuplicateOrder(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerCounts {
    pub seq: u64,
    pub customers: usize,
    pub referrals: usize,
    pub rewards: usize,
    pub clicks: usize,
    pub flags: usize,
}

#[derive(Debug)]
pub struct Ledger {
    journal: Journal,
    seq: u64,
    customers: BTreeMap<u64, Customer>,
    referrals: BTreeMap<u64, Referral>,
    rewards: BTreeMap<u64, Reward>,
    clicks: Vec<Click>,
    flags: BTreeMap<u64, FraudFlag>,
    settings: Settings,
    code_index: HashMap<String, u64>,
    email_index: HashMap<String, u64>,
    external_index: HashMap<u64, u64>,
    order_index: HashMap<u64, u64>,
    next_customer_id: u64,
    next_referral_id: u64,
    next_reward_id: u64,
    next_click_id: u64,
    next_flag_id: u64,
}

impl Ledger {
    pub fn open<P: AsRef<Path>>(dir: P, max_segment_bytes: u64) -> Result<Self, LedgerError> {
        let journal = Journal::open(dir, max_segment_bytes)?;
        let records = journal.replay_all()?;

        let mut ledger = Self {
            journal,
            seq: 0,
            customers: BTreeMap::new(),
            referrals: BTreeMap::new(),
            rewards: BTreeMap::new(),
            clicks: Vec::new(),
            flags: BTreeMap::new(),
            settings: Settings::default(),
            code_index: HashMap::new(),
            email_index: HashMap::new(),
            external_index: HashMap::new(),
            order_index: HashMap::new(),
            next_customer_id: 1,
            next_referral_id: 1,
            next_reward_id: 1,
            next_click_id: 1,
            next_flag_id: 1,
        };

        for record in records {
            ledger.apply(&record.entry);
            ledger.seq = ledger.seq.max(record.seq);
        }
        Ok(ledger)
    }

    pub fn counts(&self) -> LedgerCounts {
        LedgerCounts {
            seq: self.seq,
            customers: self.customers.len(),
            referrals: self.referrals.len(),
            rewards: self.rewards.len(),
            clicks: self.clicks.len(),
            flags: self.flags.len(),
        }
    }

    // ---- customers ----

    /// Generate a referral code that no enrolled customer holds. Collisions
    /// are retried a bounded number of times; running out of attempts is an
    /// error for the caller, never a silently reused code.
    pub fn mint_referral_code(&self) -> Result<String, LedgerError> {
        for _ in 0..MAX_MINT_ATTEMPTS {
            let code = codes::generate_referral_code();
            if !self.code_index.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(LedgerError::CodeSpaceExhausted(MAX_MINT_ATTEMPTS))
    }

    pub fn create_customer(
        &mut self,
        external_id: u64,
        email: &str,
        name: &str,
        referral_code: String,
        referred_by: Option<u64>,
        now_ms: i64,
    ) -> Result<Customer, LedgerError> {
        let email = email.trim().to_lowercase();
        if self.email_index.contains_key(&email) {
            return Err(LedgerError::DuplicateEmail(email));
        }
        if self.external_index.contains_key(&external_id) {
            return Err(LedgerError::DuplicateExternalId(external_id));
        }

        let customer = Customer {
            id: self.next_customer_id,
            external_id,
            email,
            name: name.to_string(),
            referral_code,
            referred_by,
            total_referrals: 0,
            total_earned_cents: 0,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        self.commit(LedgerEntry::CustomerCreated(customer.clone()), now_ms)?;
        Ok(customer)
    }

    pub fn customer(&self, id: u64) -> Option<&Customer> {
        self.customers.get(&id)
    }

    pub fn customer_by_code(&self, code: &str) -> Option<&Customer> {
        self.code_index.get(code).and_then(|id| self.customers.get(id))
    }

    pub fn customer_by_email(&self, email: &str) -> Option<&Customer> {
        self.email_index
            .get(&email.trim().to_lowercase())
            .and_then(|id| self.customers.get(id))
    }

    pub fn customer_by_external_id(&self, external_id: u64) -> Option<&Customer> {
        self.external_index
            .get(&external_id)
            .and_then(|id| self.customers.get(id))
    }

    pub fn bump_total_referrals(&mut self, customer_id: u64, now_ms: i64) -> Result<(), LedgerError> {
        if !self.customers.contains_key(&customer_id) {
            return Err(LedgerError::CustomerNotFound);
        }
        self.commit(
            LedgerEntry::ReferralCountBumped {
                customer_id,
                at_ms: now_ms,
            },
            now_ms,
        )
    }

    pub fn add_earnings(
        &mut self,
        customer_id: u64,
        amount_cents: i64,
        now_ms: i64,
    ) -> Result<(), LedgerError> {
        if !self.customers.contains_key(&customer_id) {
            return Err(LedgerError::CustomerNotFound);
        }
        self.commit(
            LedgerEntry::EarningsAdded {
                customer_id,
                amount_cents,
                at_ms: now_ms,
            },
            now_ms,
        )
    }

    // ---- referrals ----

    pub fn insert_referral(
        &mut self,
        new: NewReferral,
        now_ms: i64,
    ) -> Result<ReferralInsert, LedgerError> {
        if let Some(existing) = self.order_index.get(&new.order_id) {
            return Ok(ReferralInsert::DuplicateOrder(*existing));
        }

        let referral = Referral {
            id: self.next_referral_id,
            referrer_id: new.referrer_id,
            referee_id: new.referee_id,
            referee_email: new.referee_email,
            order_id: new.order_id,
            order_total_cents: new.order_total_cents,
            status: new.status,
            converted_at_ms: new.converted_at_ms,
            rewarded_at_ms: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        self.commit(LedgerEntry::ReferralCreated(referral.clone()), now_ms)?;
        Ok(ReferralInsert::Created(referral))
    }

    pub fn referral(&self, id: u64) -> Option<&Referral> {
        self.referrals.get(&id)
    }

    pub fn referral_by_order(&self, order_id: u64) -> Option<&Referral> {
        self.order_index
            .get(&order_id)
            .and_then(|id| self.referrals.get(id))
    }

    pub fn set_referral_status(
        &mut self,
        referral_id: u64,
        status: ReferralStatus,
        converted_at_ms: Option<i64>,
        rewarded_at_ms: Option<i64>,
        now_ms: i64,
    ) -> Result<Referral, LedgerError> {
        if !self.referrals.contains_key(&referral_id) {
            return Err(LedgerError::ReferralNotFound);
        }
        self.commit(
            LedgerEntry::ReferralStatusChanged {
                referral_id,
                status,
                converted_at_ms,
                rewarded_at_ms,
                at_ms: now_ms,
            },
            now_ms,
        )?;
        self.referrals
            .get(&referral_id)
            .cloned()
            .ok_or(LedgerError::ReferralNotFound)
    }

    /// Referrals created by this referrer inside the trailing window.
    pub fn referrals_created_since(&self, referrer_id: u64, since_ms: i64) -> usize {
        self.referrals
            .values()
            .filter(|r| r.referrer_id == referrer_id && r.created_at_ms > since_ms)
            .count()
    }

    /// Converted referrals whose conversion predates the cutoff, i.e. the
    /// reward queue. Ascending id order.
    pub fn converted_ready(&self, cutoff_ms: i64) -> Vec<u64> {
        self.referrals
            .values()
            .filter(|r| {
                r.status == ReferralStatus::Converted
                    && r.converted_at_ms.map(|at| at < cutoff_ms).unwrap_or(false)
            })
            .map(|r| r.id)
            .collect()
    }

    /// All referrals, newest first.
    pub fn referrals_desc(&self) -> Vec<&Referral> {
        self.referrals.values().rev().collect()
    }

    // ---- rewards ----

    pub fn record_reward(&mut self, reward: Reward, now_ms: i64) -> Result<Reward, LedgerError> {
        let reward = Reward {
            id: self.next_reward_id,
            ..reward
        };
        self.commit(LedgerEntry::RewardRecorded(reward.clone()), now_ms)?;
        Ok(reward)
    }

    pub fn rewards_for_referral(&self, referral_id: u64) -> Vec<&Reward> {
        self.rewards
            .values()
            .filter(|r| r.referral_id == referral_id)
            .collect()
    }

    /// A customer's rewards, newest first.
    pub fn rewards_for_customer(&self, customer_id: u64) -> Vec<&Reward> {
        self.rewards
            .values()
            .rev()
            .filter(|r| r.customer_id == customer_id)
            .collect()
    }

    // ---- clicks ----

    pub fn record_click(
        &mut self,
        referral_code: &str,
        ip: Option<String>,
        user_agent: Option<String>,
        referrer_url: Option<String>,
        now_ms: i64,
    ) -> Result<Click, LedgerError> {
        let click = Click {
            id: self.next_click_id,
            referral_code: referral_code.to_string(),
            ip,
            user_agent,
            referrer_url,
            created_at_ms: now_ms,
        };
        self.commit(LedgerEntry::ClickRecorded(click.clone()), now_ms)?;
        Ok(click)
    }

    pub fn clicks_from_ip_since(&self, referral_code: &str, ip: &str, since_ms: i64) -> usize {
        self.clicks
            .iter()
            .filter(|c| {
                c.referral_code == referral_code
                    && c.ip.as_deref() == Some(ip)
                    && c.created_at_ms > since_ms
            })
            .count()
    }

    // ---- fraud flags ----

    pub fn raise_flag(
        &mut self,
        referral_id: u64,
        customer_id: u64,
        reason: FlagReason,
        details: &str,
        now_ms: i64,
    ) -> Result<FraudFlag, LedgerError> {
        let flag = FraudFlag {
            id: self.next_flag_id,
            referral_id,
            customer_id,
            reason,
            details: details.to_string(),
            resolved: false,
            resolved_at_ms: None,
            created_at_ms: now_ms,
        };
        self.commit(LedgerEntry::FlagRaised(flag.clone()), now_ms)?;
        Ok(flag)
    }

    pub fn unresolved_flags(&self) -> Vec<&FraudFlag> {
        self.flags.values().rev().filter(|f| !f.resolved).collect()
    }

    pub fn resolve_flag(&mut self, flag_id: u64, now_ms: i64) -> Result<FraudFlag, LedgerError> {
        if !self.flags.contains_key(&flag_id) {
            return Err(LedgerError::FlagNotFound);
        }
        self.commit(
            LedgerEntry::FlagResolved {
                flag_id,
                at_ms: now_ms,
            },
            now_ms,
        )?;
        self.flags
            .get(&flag_id)
            .cloned()
            .ok_or(LedgerError::FlagNotFound)
    }

    // ---- settings ----

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn update_settings(
        &mut self,
        patch: &SettingsPatch,
        now_ms: i64,
    ) -> Result<Settings, LedgerError> {
        let mut next = self.settings.clone();
        next.apply_patch(patch, now_ms);
        self.commit(LedgerEntry::SettingsUpdated(next.clone()), now_ms)?;
        Ok(next)
    }

    // ---- internals ----

    fn commit(&mut self, entry: LedgerEntry, at_ms: i64) -> Result<(), LedgerError> {
        self.apply(&entry);
        self.seq += 1;
        self.journal.append(&JournalRecord {
            seq: self.seq,
            at_ms,
            entry,
        })?;
        Ok(())
    }

    fn apply(&mut self, entry: &LedgerEntry) {
        match entry {
            LedgerEntry::CustomerCreated(customer) => {
                self.code_index
                    .insert(customer.referral_code.clone(), customer.id);
                self.email_index.insert(customer.email.clone(), customer.id);
                self.external_index.insert(customer.external_id, customer.id);
                self.next_customer_id = self.next_customer_id.max(customer.id + 1);
                self.customers.insert(customer.id, customer.clone());
            }
            LedgerEntry::ReferralCreated(referral) => {
                self.order_index.insert(referral.order_id, referral.id);
                self.next_referral_id = self.next_referral_id.max(referral.id + 1);
                self.referrals.insert(referral.id, referral.clone());
            }
            LedgerEntry::ReferralStatusChanged {
                referral_id,
                status,
                converted_at_ms,
                rewarded_at_ms,
                at_ms,
            } => {
                if let Some(referral) = self.referrals.get_mut(referral_id) {
                    referral.status = *status;
                    if converted_at_ms.is_some() {
                        referral.converted_at_ms = *converted_at_ms;
                    }
                    if rewarded_at_ms.is_some() {
                        referral.rewarded_at_ms = *rewarded_at_ms;
                    }
                    referral.updated_at_ms = *at_ms;
                }
            }
            LedgerEntry::ReferralCountBumped { customer_id, at_ms } => {
                if let Some(customer) = self.customers.get_mut(customer_id) {
                    customer.total_referrals += 1;
                    customer.updated_at_ms = *at_ms;
                }
            }
            LedgerEntry::EarningsAdded {
                customer_id,
                amount_cents,
                at_ms,
            } => {
                if let Some(customer) = self.customers.get_mut(customer_id) {
                    customer.total_earned_cents += amount_cents;
                    customer.updated_at_ms = *at_ms;
                }
            }
            LedgerEntry::RewardRecorded(reward) => {
                self.next_reward_id = self.next_reward_id.max(reward.id + 1);
                self.rewards.insert(reward.id, reward.clone());
            }
            LedgerEntry::ClickRecorded(click) => {
                self.next_click_id = self.next_click_id.max(click.id + 1);
                self.clicks.push(click.clone());
            }
            LedgerEntry::FlagRaised(flag) => {
                self.next_flag_id = self.next_flag_id.max(flag.id + 1);
                self.flags.insert(flag.id, flag.clone());
            }
            LedgerEntry::FlagResolved { flag_id, at_ms } => {
                if let Some(flag) = self.flags.get_mut(flag_id) {
                    flag.resolved = true;
                    flag.resolved_at_ms = Some(*at_ms);
                }
            }
            LedgerEntry::SettingsUpdated(settings) => {
                self.settings = settings.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RecipientRole, RewardKind, RewardStatus};
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000_000;

    fn enroll(ledger: &mut Ledger, external_id: u64, email: &str) -> Customer {
        let code = ledger.mint_referral_code().unwrap();
        ledger
            .create_customer(external_id, email, "Test", code, None, NOW)
            .unwrap()
    }

    #[test]
    fn reopen_replays_full_state() {
        let dir = TempDir::new().unwrap();
        let referrer_id;
        let referral_id;
        {
            let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
            let referrer = enroll(&mut ledger, 11, "anna@example.com");
            referrer_id = referrer.id;
            let inserted = ledger
                .insert_referral(
                    NewReferral {
                        referrer_id,
                        referee_id: None,
                        referee_email: "bob@example.com".to_string(),
                        order_id: 9001,
                        order_total_cents: Some(8_000),
                        status: ReferralStatus::Converted,
                        converted_at_ms: Some(NOW),
                    },
                    NOW,
                )
                .unwrap();
            referral_id = match inserted {
                ReferralInsert::Created(r) => r.id,
                ReferralInsert::DuplicateOrder(_) => panic!("fresh order id"),
            };
            ledger.bump_total_referrals(referrer_id, NOW).unwrap();
            ledger.add_earnings(referrer_id, 1_500, NOW).unwrap();
            ledger
                .update_settings(
                    &SettingsPatch {
                        cooldown_days: Some(7),
                        ..SettingsPatch::default()
                    },
                    NOW,
                )
                .unwrap();
        }

        let reopened = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        let referrer = reopened.customer(referrer_id).unwrap();
        assert_eq!(referrer.total_referrals, 1);
        assert_eq!(referrer.total_earned_cents, 1_500);
        assert_eq!(reopened.settings().cooldown_days, 7);
        let referral = reopened.referral(referral_id).unwrap();
        assert_eq!(referral.status, ReferralStatus::Converted);
        assert_eq!(reopened.referral_by_order(9001).unwrap().id, referral_id);
    }

    #[test]
    fn duplicate_order_id_is_a_conflict_not_a_row() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        let referrer = enroll(&mut ledger, 11, "anna@example.com");

        let new = |email: &str| NewReferral {
            referrer_id: referrer.id,
            referee_id: None,
            referee_email: email.to_string(),
            order_id: 4242,
            order_total_cents: None,
            status: ReferralStatus::Pending,
            converted_at_ms: None,
        };
        let first = ledger.insert_referral(new("x@example.com"), NOW).unwrap();
        let first_id = match first {
            ReferralInsert::Created(r) => r.id,
            ReferralInsert::DuplicateOrder(_) => panic!("fresh order id"),
        };
        let second = ledger.insert_referral(new("y@example.com"), NOW).unwrap();
        assert_eq!(second, ReferralInsert::DuplicateOrder(first_id));
        assert_eq!(ledger.counts().referrals, 1);
    }

    #[test]
    fn duplicate_email_and_external_id_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        enroll(&mut ledger, 11, "anna@example.com");

        let code = ledger.mint_referral_code().unwrap();
        let err = ledger
            .create_customer(12, "ANNA@example.com", "Shout", code, None, NOW)
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateEmail(_)));

        let code = ledger.mint_referral_code().unwrap();
        let err = ledger
            .create_customer(11, "other@example.com", "Same id", code, None, NOW)
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateExternalId(11)));
    }

    #[test]
    fn email_lookup_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        let customer = enroll(&mut ledger, 11, "Anna@Example.COM");
        assert_eq!(customer.email, "anna@example.com");
        assert_eq!(
            ledger.customer_by_email("ANNA@example.com").unwrap().id,
            customer.id
        );
    }

    #[test]
    fn minted_codes_carry_the_referral_prefix() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        let code = ledger.mint_referral_code().unwrap();
        assert!(code.starts_with("OKURA-"));
    }

    #[test]
    fn converted_ready_applies_a_strict_cutoff() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        let referrer = enroll(&mut ledger, 11, "anna@example.com");

        let mut insert = |order_id: u64, converted_at: Option<i64>, status: ReferralStatus| {
            ledger
                .insert_referral(
                    NewReferral {
                        referrer_id: referrer.id,
                        referee_id: None,
                        referee_email: "b@example.com".to_string(),
                        order_id,
                        order_total_cents: None,
                        status,
                        converted_at_ms: converted_at,
                    },
                    NOW,
                )
                .unwrap()
        };
        insert(1, Some(NOW - 10), ReferralStatus::Converted);
        insert(2, Some(NOW), ReferralStatus::Converted);
        insert(3, Some(NOW - 10), ReferralStatus::Rewarded);
        insert(4, None, ReferralStatus::Pending);

        let ready = ledger.converted_ready(NOW);
        assert_eq!(ready.len(), 1);
        let referral = ledger.referral(ready[0]).unwrap();
        assert_eq!(referral.order_id, 1);
    }

    #[test]
    fn flags_resolve_and_replay() {
        let dir = TempDir::new().unwrap();
        let flag_id;
        {
            let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
            let referrer = enroll(&mut ledger, 11, "anna@example.com");
            let flag = ledger
                .raise_flag(1, referrer.id, FlagReason::LowOrder, "auto-flagged: low_order", NOW)
                .unwrap();
            flag_id = flag.id;
            assert_eq!(ledger.unresolved_flags().len(), 1);
            ledger.resolve_flag(flag_id, NOW + 5).unwrap();
            assert!(ledger.unresolved_flags().is_empty());
        }
        let reopened = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        assert!(reopened.unresolved_flags().is_empty());
        assert_eq!(
            reopened.flags.get(&flag_id).unwrap().resolved_at_ms,
            Some(NOW + 5)
        );
    }

    #[test]
    fn rewards_are_listed_newest_first() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(dir.path(), DEFAULT_MAX_SEGMENT_BYTES).unwrap();
        let customer = enroll(&mut ledger, 11, "anna@example.com");

        for n in 0..3 {
            let reward = Reward {
                id: 0,
                referral_id: 1,
                recipient: RecipientRole::Referrer,
                customer_id: customer.id,
                kind: RewardKind::Discount,
                amount_cents: 1_500,
                discount_id: format!("d-{n}"),
                discount_code: format!("OKREF-CODE{n}AAA"),
                status: RewardStatus::Sent,
                sent_at_ms: Some(NOW + n),
                used_at_ms: None,
                expires_at_ms: None,
                created_at_ms: NOW + n,
            };
            ledger.record_reward(reward, NOW + n).unwrap();
        }
        let listed = ledger.rewards_for_customer(customer.id);
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].discount_id, "d-2");
    }
}
