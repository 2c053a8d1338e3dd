use serde::{Deserialize, Serialize};

pub mod admin;
pub mod codes;
pub mod discounts;
pub mod extract;
pub mod fraud;
pub mod journal;
pub mod ledger;
pub mod model;
pub mod pipeline;
pub mod rewards;
pub mod storefront;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreHealth {
    pub service: String,
    pub status: String,
}

pub fn health() -> CoreHealth {
    CoreHealth {
        service: "referral-core".to_string(),
        status: "ok".to_string(),
    }
}
