//! Request builder, executor and response normalizer for the billing API.
//!
//! # Design
//! Every operation is split the same way: a pure `build_*` method produces an
//! `HttpRequest`, the `Transport` performs the round trip, and
//! `parse_response` maps the `HttpResponse` to the decoded body or an
//! `ApiError`. The public operation methods stitch those together and fold
//! any error into an `OperationResult`, so they never fail past their own
//! boundary.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{AccountUpdate, OperationResult, PurchaseRequest};

/// Currency used by `create_subscription` when the caller gives none.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Reserved `additional_params` key merged into the nested account object.
const ACCOUNT_KEY: &str = "account";

/// Synchronous client for the subscription-billing API.
///
/// Holds the process configuration by reference and a transport; carries no
/// state between calls.
#[derive(Debug, Clone)]
pub struct BillingClient<'a, T = UreqTransport> {
    config: &'a Config,
    transport: T,
}

impl<'a> BillingClient<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<'a, T: Transport> BillingClient<'a, T> {
    pub fn with_transport(config: &'a Config, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Fetch the configured account.
    pub fn get_account_info(&self) -> OperationResult {
        info!(account_id = self.config.account_id(), "fetching account info");
        let result = self.execute(self.build_get_account_info());
        if !result.is_error() {
            info!("account info retrieved");
        }
        result
    }

    /// Update name and/or address of the configured account.
    pub fn update_account_address(&self, update: &AccountUpdate) -> OperationResult {
        info!(account_id = self.config.account_id(), "updating account address");
        let result = self.execute_built(self.build_update_account_address(update));
        if !result.is_error() {
            info!("address updated");
        }
        result
    }

    /// Create a new account together with its initial subscriptions.
    pub fn create_account_and_subscribe(&self, purchase: &PurchaseRequest) -> OperationResult {
        info!(account_code = %purchase.account.code, "creating account with subscription");
        let result = self.execute_built(self.build_create_account_and_subscribe(purchase));
        if !result.is_error() {
            info!("account and subscription created");
        }
        result
    }

    /// List the plans defined on the site.
    pub fn get_available_plans(&self) -> OperationResult {
        info!(url = %self.url("/plans"), "fetching available plans");
        let result = self.execute(self.build_get_available_plans());
        if !result.is_error() {
            info!("plans retrieved");
        }
        result
    }

    /// Subscribe an existing account to a plan.
    ///
    /// `currency` defaults to [`DEFAULT_CURRENCY`]. See [`subscription_payload`]
    /// for how `additional_params` is merged.
    pub fn create_subscription(
        &self,
        account_code: &str,
        plan_code: &str,
        currency: Option<&str>,
        additional_params: Option<&Map<String, Value>>,
    ) -> OperationResult {
        info!(account_code, plan_code, "creating subscription");
        let request =
            self.build_create_subscription(account_code, plan_code, currency, additional_params);
        let result = self.execute_built(request);
        if !result.is_error() {
            info!("subscription created");
        }
        result
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_get_account_info(&self) -> HttpRequest {
        self.request(HttpMethod::Get, &self.account_path(), None)
    }

    pub fn build_update_account_address(&self, update: &AccountUpdate) -> Result<HttpRequest, ApiError> {
        let body = to_json(update)?;
        Ok(self.request(HttpMethod::Put, &self.account_path(), Some(body)))
    }

    pub fn build_create_account_and_subscribe(
        &self,
        purchase: &PurchaseRequest,
    ) -> Result<HttpRequest, ApiError> {
        require_non_empty("account.code", &purchase.account.code)?;
        for line in &purchase.subscriptions {
            require_non_empty("subscriptions.plan_code", &line.plan_code)?;
        }
        let body = to_json(purchase)?;
        Ok(self.request(HttpMethod::Post, "/purchases", Some(body)))
    }

    pub fn build_get_available_plans(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/plans", None)
    }

    pub fn build_create_subscription(
        &self,
        account_code: &str,
        plan_code: &str,
        currency: Option<&str>,
        additional_params: Option<&Map<String, Value>>,
    ) -> Result<HttpRequest, ApiError> {
        let payload = subscription_payload(account_code, plan_code, currency, additional_params)?;
        let body = to_json(&payload)?;
        Ok(self.request(HttpMethod::Post, "/subscriptions", Some(body)))
    }

    // -----------------------------------------------------------------------
    // Execution and response handling
    // -----------------------------------------------------------------------

    /// Send `request` and normalize the outcome. Never fails.
    pub fn execute(&self, request: HttpRequest) -> OperationResult {
        if let Some(body) = &request.body {
            info!(method = request.method.as_str(), url = %request.url, payload = %body, "sending request");
        }
        let outcome = self
            .transport
            .send(&request)
            .and_then(|response| self.parse_response(&request, response));
        if let Err(err) = &outcome {
            error!(method = request.method.as_str(), url = %request.url, "{err}");
        }
        outcome.into()
    }

    fn execute_built(&self, request: Result<HttpRequest, ApiError>) -> OperationResult {
        match request {
            Ok(request) => self.execute(request),
            Err(err) => {
                error!("{err}");
                OperationResult::error(err.to_string())
            }
        }
    }

    /// Map a raw response to the decoded JSON object, or an `ApiError` for
    /// non-2xx statuses and bodies that are not a JSON object.
    pub fn parse_response(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<Map<String, Value>, ApiError> {
        info!(status = response.status, body = %response.body, "response received");
        check_status(request, &response)?;
        match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(body)) => Ok(body),
            Ok(other) => Err(ApiError::Request(format!(
                "expected a JSON object in response body, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(ApiError::Request(format!("invalid JSON in response body: {e}"))),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn request(&self, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
        HttpRequest {
            method,
            url: self.url(path),
            headers: self.config.default_headers(),
            body,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url())
    }

    fn account_path(&self) -> String {
        format!("/accounts/{}", self.config.account_id())
    }
}

/// Build the `POST /subscriptions` payload.
///
/// Starts from `{plan_code, currency, account: {code}}`. Entries of
/// `additional_params` under `account` must be an object and are merged into
/// the nested account; every other entry is set at the top level. Explicit
/// entries override the defaults, including `currency`, `plan_code` and
/// `account.code`.
pub fn subscription_payload(
    account_code: &str,
    plan_code: &str,
    currency: Option<&str>,
    additional_params: Option<&Map<String, Value>>,
) -> Result<Map<String, Value>, ApiError> {
    require_non_empty("account_code", account_code)?;
    require_non_empty("plan_code", plan_code)?;

    let mut account = Map::new();
    account.insert("code".to_string(), Value::from(account_code));

    let mut payload = Map::new();
    payload.insert("plan_code".to_string(), Value::from(plan_code));
    payload.insert(
        "currency".to_string(),
        Value::from(currency.unwrap_or(DEFAULT_CURRENCY)),
    );

    for (key, value) in additional_params.into_iter().flatten() {
        if key == ACCOUNT_KEY {
            let Value::Object(fields) = value else {
                return Err(ApiError::InvalidParameter(
                    "additional_params.account must be an object".to_string(),
                ));
            };
            account.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        } else {
            payload.insert(key.clone(), value.clone());
        }
    }

    payload.insert(ACCOUNT_KEY.to_string(), Value::Object(account));
    Ok(payload)
}

/// Map non-success status codes to `ApiError::Http`.
fn check_status(request: &HttpRequest, response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let reason = ::http::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown Status");
    Err(ApiError::Http {
        status: response.status,
        reason: reason.to_string(),
        url: request.url.clone(),
    })
}

fn require_non_empty(name: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidParameter(format!("{name} must not be empty")));
    }
    Ok(())
}

fn to_json<S: Serialize + ?Sized>(value: &S) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
