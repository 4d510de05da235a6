//! Operation results and request payloads for the billing API.
//!
//! # Design
//! Response bodies are passed through untouched: the remote service owns
//! their shape, so an `OperationResult` is just a JSON object. Request
//! payloads, by contrast, are typed so callers cannot forget required fields.

use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Key that marks a synthetic error record.
pub const ERROR_KEY: &str = "error";

/// The uniform success-or-error value returned by every client operation.
///
/// Either the decoded JSON object returned by the API, or `{"error": msg}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationResult(Map<String, Value>);

impl OperationResult {
    pub fn success(body: Map<String, Value>) -> Self {
        Self(body)
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(ERROR_KEY.to_string(), Value::String(message.into()));
        Self(map)
    }

    pub fn is_error(&self) -> bool {
        self.0.contains_key(ERROR_KEY)
    }

    /// The error text, rendered as JSON if the server put a non-string there.
    pub fn error_message(&self) -> Option<String> {
        self.0.get(ERROR_KEY).map(value_text)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for OperationResult {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Result<Map<String, Value>, ApiError>> for OperationResult {
    fn from(result: Result<Map<String, Value>, ApiError>) -> Self {
        match result {
            Ok(body) => Self::success(body),
            Err(err) => Self::error(err.to_string()),
        }
    }
}

/// Render a JSON value for human-readable output: strings unquoted,
/// everything else as compact JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Postal address as the API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street1: String,
    pub city: String,
    pub region: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// Body of `PUT /accounts/{id}`. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// Card details attached to a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingInfo {
    pub address: Address,
    pub number: String,
    pub month: String,
    pub year: String,
}

/// The account created as part of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseAccount {
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub billing_info: BillingInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLine {
    pub plan_code: String,
    pub quantity: u32,
}

/// Body of `POST /purchases`: a new account plus its initial subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub currency: String,
    pub account: PurchaseAccount,
    pub subscriptions: Vec<SubscriptionLine>,
}

/// `"{prefix}_{unix_seconds}"`, unique enough for one-off account creation.
pub fn unique_account_code(prefix: &str) -> String {
    format!("{prefix}_{}", chrono::Utc::now().timestamp())
}
