use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Converted,
    Rewarded,
    Rejected,
    Expired,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::Converted => "converted",
            ReferralStatus::Rewarded => "rewarded",
            ReferralStatus::Rejected => "rejected",
            ReferralStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<ReferralStatus> {
        match value {
            "pending" => Some(ReferralStatus::Pending),
            "converted" => Some(ReferralStatus::Converted),
            "rewarded" => Some(ReferralStatus::Rewarded),
            "rejected" => Some(ReferralStatus::Rejected),
            "expired" => Some(ReferralStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Pending,
    Sent,
    Used,
    Expired,
}

impl RewardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardStatus::Pending => "pending",
            RewardStatus::Sent => "sent",
            RewardStatus::Used => "used",
            RewardStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRole {
    Referrer,
    Referee,
}

impl RecipientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientRole::Referrer => "referrer",
            RecipientRole::Referee => "referee",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Discount,
    Percentage,
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    SelfReferral,
    SameIp,
    LowOrder,
    RateLimit,
    SuspiciousPattern,
}

impl FlagReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagReason::SelfReferral => "self_referral",
            FlagReason::SameIp => "same_ip",
            FlagReason::LowOrder => "low_order",
            FlagReason::RateLimit => "rate_limit",
            FlagReason::SuspiciousPattern => "suspicious_pattern",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u64,
    pub external_id: u64,
    pub email: String,
    pub name: String,
    pub referral_code: String,
    pub referred_by: Option<u64>,
    pub total_referrals: u64,
    pub total_earned_cents: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: u64,
    pub referrer_id: u64,
    pub referee_id: Option<u64>,
    pub referee_email: String,
    pub order_id: u64,
    pub order_total_cents: Option<i64>,
    pub status: ReferralStatus,
    pub converted_at_ms: Option<i64>,
    pub rewarded_at_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: u64,
    pub referral_id: u64,
    pub recipient: RecipientRole,
    pub customer_id: u64,
    pub kind: RewardKind,
    pub amount_cents: i64,
    pub discount_id: String,
    pub discount_code: String,
    pub status: RewardStatus,
    pub sent_at_ms: Option<i64>,
    pub used_at_ms: Option<i64>,
    pub expires_at_ms: Option<i64>,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Click {
    pub id: u64,
    pub referral_code: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer_url: Option<String>,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudFlag {
    pub id: u64,
    pub referral_id: u64,
    pub customer_id: u64,
    pub reason: FlagReason,
    pub details: String,
    pub resolved: bool,
    pub resolved_at_ms: Option<i64>,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub reward_kind: RewardKind,
    pub reward_amount_cents: i64,
    pub min_order_value_cents: i64,
    pub cooldown_days: i64,
    pub double_sided: bool,
    pub referee_reward_amount_cents: i64,
    pub max_referrals_per_day: u64,
    pub code_expiry_days: u32,
    pub block_self_referral: bool,
    pub flag_same_ip: bool,
    pub flag_low_order: bool,
    pub flag_rate_limit: bool,
    pub updated_at_ms: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reward_kind: RewardKind::Discount,
            reward_amount_cents: 1_500,
            min_order_value_cents: 5_000,
            cooldown_days: 14,
            double_sided: true,
            referee_reward_amount_cents: 1_500,
            max_referrals_per_day: 5,
            code_expiry_days: 90,
            block_self_referral: true,
            flag_same_ip: true,
            flag_low_order: true,
            flag_rate_limit: true,
            updated_at_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub reward_kind: Option<RewardKind>,
    pub reward_amount_cents: Option<i64>,
    pub min_order_value_cents: Option<i64>,
    pub cooldown_days: Option<i64>,
    pub double_sided: Option<bool>,
    pub referee_reward_amount_cents: Option<i64>,
    pub max_referrals_per_day: Option<u64>,
    pub code_expiry_days: Option<u32>,
    pub block_self_referral: Option<bool>,
    pub flag_same_ip: Option<bool>,
    pub flag_low_order: Option<bool>,
    pub flag_rate_limit: Option<bool>,
}

impl Settings {
    /// Partial update: fields absent from the patch keep their value.
    pub fn apply_patch(&mut self, patch: &SettingsPatch, now_ms: i64) {
        if let Some(v) = patch.reward_kind {
            self.reward_kind = v;
        }
        if let Some(v) = patch.reward_amount_cents {
            self.reward_amount_cents = v;
        }
        if let Some(v) = patch.min_order_value_cents {
            self.min_order_value_cents = v;
        }
        if let Some(v) = patch.cooldown_days {
            self.cooldown_days = v;
        }
        if let Some(v) = patch.double_sided {
            self.double_sided = v;
        }
        if let Some(v) = patch.referee_reward_amount_cents {
            self.referee_reward_amount_cents = v;
        }
        if let Some(v) = patch.max_referrals_per_day {
            self.max_referrals_per_day = v;
        }
        if let Some(v) = patch.code_expiry_days {
            self.code_expiry_days = v;
        }
        if let Some(v) = patch.block_self_referral {
            self.block_self_referral = v;
        }
        if let Some(v) = patch.flag_same_ip {
            self.flag_same_ip = v;
        }
        if let Some(v) = patch.flag_low_order {
            self.flag_low_order = v;
        }
        if let Some(v) = patch.flag_rate_limit {
            self.flag_rate_limit = v;
        }
        self.updated_at_ms = now_ms;
    }
}

/// Inbound order event as delivered by the storefront platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub total_price: Option<String>,
    #[serde(default)]
    pub note_attributes: Vec<NoteAttribute>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub customer: Option<OrderCustomer>,
    #[serde(default)]
    pub browser_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderCustomer {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

pub fn now_millis() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Parse a decimal money string ("80", "80.5", "80.50") into cents.
/// More than two fractional digits, signs, or stray characters are rejected.
pub fn parse_money(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() || whole.chars().any(|c| !c.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 2 || frac.chars().any(|c| !c.is_ascii_digit()) {
        return None;
    }
    let whole_cents = whole.parse::<i64>().ok()?.checked_mul(100)?;
    let frac_cents = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse::<i64>().ok()?,
    };
    whole_cents.checked_add(frac_cents)
}

pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

pub fn rfc3339(ms: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

pub fn parse_rfc3339(value: &str) -> Option<i64> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339).ok()?;
    i64::try_from(parsed.unix_timestamp_nanos() / 1_000_000).ok()
}
