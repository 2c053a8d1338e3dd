use crate::model::{format_money, parse_rfc3339, RewardKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("discount service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountValueType {
    FixedAmount,
    Percentage,
}

impl From<RewardKind> for DiscountValueType {
    fn from(kind: RewardKind) -> Self {
        match kind {
            RewardKind::Percentage => DiscountValueType::Percentage,
            RewardKind::Discount | RewardKind::Credit => DiscountValueType::FixedAmount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountRequest {
    pub code: String,
    pub amount_cents: i64,
    pub value_type: DiscountValueType,
    pub min_order_value_cents: i64,
    pub expiry_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedDiscount {
    pub discount_id: String,
    pub code: String,
    pub expires_at_ms: Option<i64>,
}

/// Seam to the external discount-issuing service. One call per reward
/// attempt, blocking, no retry: a failure is terminal for that attempt and
/// the caller decides what survives it.
pub trait DiscountIssuer {
    fn create_discount(&mut self, request: &DiscountRequest)
        -> Result<IssuedDiscount, IssueError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscountRequestPayload<'a> {
    code: &'a str,
    amount: String,
    #[serde(rename = "type")]
    value_type: DiscountValueType,
    min_order_value: String,
    expiry_days: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuedDiscountPayload {
    discount_identifier: String,
    code: String,
    expires_at: String,
}

/// Issues discount codes through the store platform's admin API.
#[derive(Debug)]
pub struct HttpDiscountService {
    client: reqwest::blocking::Client,
    endpoint: String,
    access_token: String,
}

impl HttpDiscountService {
    pub fn new(endpoint: &str, access_token: &str, timeout: Duration) -> Result<Self, IssueError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            access_token: access_token.to_string(),
        })
    }
}

impl DiscountIssuer for HttpDiscountService {
    fn create_discount(
        &mut self,
        request: &DiscountRequest,
    ) -> Result<IssuedDiscount, IssueError> {
        let payload = DiscountRequestPayload {
            code: &request.code,
            amount: format_money(request.amount_cents),
            value_type: request.value_type,
            min_order_value: format_money(request.min_order_value_cents),
            expiry_days: request.expiry_days,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(IssueError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: IssuedDiscountPayload = response
            .json()
            .map_err(|e| IssueError::MalformedResponse(e.to_string()))?;
        Ok(IssuedDiscount {
            discount_id: body.discount_identifier,
            code: body.code,
            expires_at_ms: parse_rfc3339(&body.expires_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_payload_uses_the_service_field_names() {
        let payload = DiscountRequestPayload {
            code: "OKREF-AAAA2222",
            amount: format_money(1_500),
            value_type: DiscountValueType::FixedAmount,
            min_order_value: format_money(5_000),
            expiry_days: 90,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["code"], "OKREF-AAAA2222");
        assert_eq!(json["amount"], "15.00");
        assert_eq!(json["type"], "fixed_amount");
        assert_eq!(json["minOrderValue"], "50.00");
        assert_eq!(json["expiryDays"], 90);
    }

    #[test]
    fn response_payload_parses_the_service_field_names() {
        let body: IssuedDiscountPayload = serde_json::from_str(
            r#"{"discountIdentifier":"d-991","code":"OKREF-AAAA2222","expiresAt":"2026-11-06T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(body.discount_identifier, "d-991");
        assert!(parse_rfc3339(&body.expires_at).is_some());
    }

    #[test]
    fn reward_kinds_map_to_wire_value_types() {
        assert_eq!(
            DiscountValueType::from(RewardKind::Percentage),
            DiscountValueType::Percentage
        );
        assert_eq!(
            DiscountValueType::from(RewardKind::Discount),
            DiscountValueType::FixedAmount
        );
        assert_eq!(
            DiscountValueType::from(RewardKind::Credit),
            DiscountValueType::FixedAmount
        );
    }
}
