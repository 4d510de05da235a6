//! Subscribes the configured account to the first available plan.

use billing_cli::{available_plans, banner, init_tracing, load_config};
use billing_core::{BillingClient, ResponseRecorder};
use serde_json::{json, Value};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = load_config()?;
    let client = BillingClient::new(&config);
    let recorder = ResponseRecorder::from_config(&config);

    banner("SUBSCRIPTION CREATION EXAMPLE");

    println!("\n1. Retrieving account information...");
    let account = client.get_account_info();
    if let Some(message) = account.error_message() {
        println!("Error getting account info: {message}");
        return Ok(());
    }
    let Some(account_code) = account.get("code").and_then(Value::as_str) else {
        println!("Account response carries no code.");
        return Ok(());
    };
    println!("Account found: {account_code}");

    println!("\n2. Fetching available plans...");
    let plans = client.get_available_plans();
    if let Some(message) = plans.error_message() {
        println!("Error getting plans: {message}");
        return Ok(());
    }
    let available = available_plans(&plans);
    let Some((plan_code, _)) = available.first().copied() else {
        println!("No plans available. Please create a plan first.");
        return Ok(());
    };
    println!("Available plans:");
    for (i, (code, name)) in available.iter().enumerate() {
        println!("  {}. {name} (code: {code})", i + 1);
    }
    println!("\nSelected plan: {plan_code}");

    println!("\n3. Creating subscription...");
    let extra = json!({
        "quantity": 1,
        "auto_renew": true,
        "customer_notes": "Subscription created via API for testing purposes"
    });
    let subscription =
        client.create_subscription(account_code, plan_code, Some("USD"), extra.as_object());

    if let Some(message) = subscription.error_message() {
        println!("Error creating subscription: {message}");
    } else {
        println!("\nSubscription created successfully!");
        println!("Subscription ID: {}", text(subscription.get("id")));
        println!("State: {}", text(subscription.get("state")));
        println!("Plan: {}", text(subscription.get("plan").and_then(|plan| plan.get("name"))));
        println!("Next billing: {}", text(subscription.get("current_period_ends_at")));
    }

    let path = recorder.record("create_subscription", &subscription)?;
    println!("\nComplete response saved to {}", path.display());
    Ok(())
}

fn text(value: Option<&Value>) -> &str {
    value.and_then(Value::as_str).unwrap_or("-")
}
