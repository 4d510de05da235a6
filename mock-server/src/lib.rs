use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Account present in every freshly seeded store.
pub const DEMO_ACCOUNT_CODE: &str = "code-demo";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street1: String,
    pub city: String,
    pub region: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub object: String,
    pub code: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<Address>,
    pub has_billing_info: bool,
    pub created_at: String,
}

impl Account {
    fn new(code: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            object: "account".to_string(),
            code: code.to_string(),
            first_name: None,
            last_name: None,
            email: None,
            address: None,
            has_billing_info: false,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanPrice {
    pub currency: String,
    pub unit_amount: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub object: String,
    pub code: String,
    pub name: String,
    pub interval_length: u32,
    pub interval_unit: String,
    pub currencies: Vec<PlanPrice>,
}

impl Plan {
    fn new(code: &str, name: &str, interval_length: u32, prices: &[(&str, f64)]) -> Self {
        Self {
            id: Uuid::new_v4(),
            object: "plan".to_string(),
            code: code.to_string(),
            name: name.to_string(),
            interval_length,
            interval_unit: "months".to_string(),
            currencies: prices
                .iter()
                .map(|(currency, unit_amount)| PlanPrice {
                    currency: currency.to_string(),
                    unit_amount: *unit_amount,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanRef {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: Uuid,
    pub code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub object: String,
    pub state: String,
    pub plan: PlanRef,
    pub account: AccountRef,
    pub currency: String,
    pub quantity: u32,
    pub auto_renew: bool,
    pub customer_notes: Option<String>,
    pub current_period_ends_at: String,
}

#[derive(Deserialize)]
pub struct UpdateAccount {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<Address>,
}

#[derive(Deserialize)]
pub struct PurchaseAccount {
    pub code: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub billing_info: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct PurchaseLine {
    pub plan_code: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CreatePurchase {
    pub currency: String,
    pub account: PurchaseAccount,
    #[serde(default)]
    pub subscriptions: Vec<PurchaseLine>,
}

#[derive(Deserialize)]
pub struct SubscriptionAccount {
    pub code: String,
}

#[derive(Deserialize)]
pub struct CreateSubscription {
    pub plan_code: String,
    pub currency: String,
    pub account: SubscriptionAccount,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default = "yes")]
    pub auto_renew: bool,
    pub customer_notes: Option<String>,
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

/// In-memory state behind the mock API.
#[derive(Debug, Default)]
pub struct Store {
    pub accounts: HashMap<String, Account>,
    pub plans: Vec<Plan>,
    pub subscriptions: HashMap<Uuid, Subscription>,
}

impl Store {
    /// One demo account and two plans.
    pub fn seeded() -> Self {
        let mut store = Store::default();
        let mut account = Account::new(DEMO_ACCOUNT_CODE);
        account.first_name = Some("Demo".to_string());
        account.email = Some("demo@example.com".to_string());
        store.accounts.insert(account.code.clone(), account);
        store.plans = vec![
            Plan::new("test_plan_001", "Basic Monthly", 1, &[("USD", 9.99), ("COP", 40000.0)]),
            Plan::new("test_plan_002", "Premium Annual", 12, &[("USD", 99.0)]),
        ];
        store
    }

    fn plan(&self, code: &str) -> Result<&Plan, ApiFailure> {
        self.plans
            .iter()
            .find(|plan| plan.code == code)
            .ok_or_else(|| ApiFailure::validation(format!("plan_code '{code}' does not exist")))
    }

    fn priced_plan(&self, code: &str, currency: &str) -> Result<&Plan, ApiFailure> {
        let plan = self.plan(code)?;
        if !plan.currencies.iter().any(|price| price.currency == currency) {
            return Err(ApiFailure::validation(format!(
                "plan '{code}' has no price in {currency}"
            )));
        }
        Ok(plan)
    }

    fn subscribe(
        &mut self,
        account_code: &str,
        plan_code: &str,
        currency: &str,
        quantity: u32,
    ) -> Result<Subscription, ApiFailure> {
        let plan = self.priced_plan(plan_code, currency)?;
        let plan = PlanRef {
            id: plan.id,
            code: plan.code.clone(),
            name: plan.name.clone(),
        };
        let account = self
            .accounts
            .get(account_code)
            .ok_or_else(|| ApiFailure::not_found(format!("Couldn't find Account with code = {account_code}")))?;
        let subscription = Subscription {
            id: Uuid::new_v4(),
            object: "subscription".to_string(),
            state: "active".to_string(),
            plan,
            account: AccountRef {
                id: account.id,
                code: account.code.clone(),
            },
            currency: currency.to_string(),
            quantity,
            auto_renew: true,
            customer_notes: None,
            current_period_ends_at: (Utc::now() + chrono::Duration::days(30)).to_rfc3339(),
        };
        self.subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error response in the upstream API's `{"error": {"type", "message"}}` shape.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiFailure {
    fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message,
        }
    }

    fn validation(message: String) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            kind: "validation",
            message,
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            kind: "unauthorized",
            message: "Please provide a valid API key".to_string(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({"error": {"type": self.kind, "message": self.message}});
        (self.status, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/accounts/{code}", get(get_account).put(update_account))
        .route("/purchases", post(create_purchase))
        .route("/plans", get(list_plans))
        .route("/subscriptions", post(create_subscription))
        .layer(middleware::from_fn(require_basic_auth))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_basic_auth(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Basic ") && value.len() > "Basic ".len());
    if !authorized {
        return ApiFailure::unauthorized().into_response();
    }
    next.run(request).await
}

async fn get_account(
    State(db): State<Db>,
    Path(code): Path<String>,
) -> Result<Json<Account>, ApiFailure> {
    let store = db.read().await;
    store
        .accounts
        .get(&code)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found(format!("Couldn't find Account with code = {code}")))
}

async fn update_account(
    State(db): State<Db>,
    Path(code): Path<String>,
    Json(input): Json<UpdateAccount>,
) -> Result<Json<Account>, ApiFailure> {
    let mut store = db.write().await;
    let account = store
        .accounts
        .get_mut(&code)
        .ok_or_else(|| ApiFailure::not_found(format!("Couldn't find Account with code = {code}")))?;
    if let Some(first_name) = input.first_name {
        account.first_name = Some(first_name);
    }
    if let Some(last_name) = input.last_name {
        account.last_name = Some(last_name);
    }
    if let Some(address) = input.address {
        account.address = Some(address);
    }
    Ok(Json(account.clone()))
}

async fn list_plans(State(db): State<Db>) -> Json<serde_json::Value> {
    let store = db.read().await;
    Json(json!({
        "object": "list",
        "has_more": false,
        "next": null,
        "data": store.plans,
    }))
}

async fn create_purchase(
    State(db): State<Db>,
    Json(input): Json<CreatePurchase>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiFailure> {
    let mut store = db.write().await;
    let code = input.account.code.trim().to_string();
    if code.is_empty() {
        return Err(ApiFailure::validation("account.code can't be blank".to_string()));
    }
    if store.accounts.contains_key(&code) {
        return Err(ApiFailure::validation(format!("account.code '{code}' has already been taken")));
    }
    if input.subscriptions.is_empty() {
        return Err(ApiFailure::validation("subscriptions can't be empty".to_string()));
    }
    for line in &input.subscriptions {
        store.priced_plan(&line.plan_code, &input.currency)?;
    }

    let mut account = Account::new(&code);
    account.first_name = input.account.first_name;
    account.last_name = input.account.last_name;
    account.email = input.account.email;
    account.has_billing_info = input.account.billing_info.is_some();
    let account_ref = AccountRef {
        id: account.id,
        code: account.code.clone(),
    };
    store.accounts.insert(code.clone(), account);

    let mut subscription_ids = Vec::new();
    for line in &input.subscriptions {
        let subscription = store.subscribe(&code, &line.plan_code, &input.currency, line.quantity)?;
        subscription_ids.push(subscription.id);
    }

    let body = json!({
        "object": "invoice_collection",
        "charge_invoice": {
            "id": Uuid::new_v4(),
            "object": "invoice",
            "state": "paid",
            "currency": input.currency,
            "account": account_ref,
            "subscription_ids": subscription_ids,
        },
        "credit_invoices": [],
    });
    Ok((StatusCode::CREATED, Json(body)))
}

async fn create_subscription(
    State(db): State<Db>,
    Json(input): Json<CreateSubscription>,
) -> Result<(StatusCode, Json<Subscription>), ApiFailure> {
    let mut store = db.write().await;
    let mut subscription =
        store.subscribe(&input.account.code, &input.plan_code, &input.currency, input.quantity)?;
    subscription.auto_renew = input.auto_renew;
    subscription.customer_notes = input.customer_notes;
    store.subscriptions.insert(subscription.id, subscription.clone());
    Ok((StatusCode::CREATED, Json(subscription)))
}
