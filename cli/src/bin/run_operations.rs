//! Runs every account/plan operation once, saving each response and logging
//! a summary line per call.

use billing_cli::{banner, init_tracing, load_config};
use billing_core::{
    unique_account_code, AccountUpdate, Address, BillingClient, BillingInfo, OperationResult,
    PurchaseAccount, PurchaseRequest, ResponseRecorder, SubscriptionLine,
};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = load_config()?;
    let client = BillingClient::new(&config);
    let recorder = ResponseRecorder::from_config(&config);

    banner("RUNNING BILLING API OPERATIONS");

    println!("\nGetting account information...");
    report(&recorder, "get_account_info", &client.get_account_info())?;

    println!("\nUpdating account address...");
    let result = client.update_account_address(&sample_address_update());
    report(&recorder, "update_account_address", &result)?;

    println!("\nCreating account with subscription...");
    let result = client.create_account_and_subscribe(&sample_purchase());
    report(&recorder, "create_account_and_subscribe", &result)?;

    println!("\nGetting available plans...");
    report(&recorder, "get_available_plans", &client.get_available_plans())?;

    println!();
    banner("OPERATIONS COMPLETED");
    println!("Responses saved at: {}/", recorder.responses_dir().display());
    println!("Operations log: {}", recorder.log_file().display());
    Ok(())
}

fn report(recorder: &ResponseRecorder, operation: &str, result: &OperationResult) -> anyhow::Result<()> {
    let path = recorder.record(operation, result)?;
    match result.error_message() {
        Some(message) => println!("  failed: {message}"),
        None => println!("  ok, saved at {}", path.display()),
    }
    Ok(())
}

fn sample_address_update() -> AccountUpdate {
    AccountUpdate {
        first_name: Some("Julian".to_string()),
        last_name: Some("Hincapié".to_string()),
        address: Some(Address {
            street1: "Calle 123".to_string(),
            city: "Medellín".to_string(),
            region: "Antioquia".to_string(),
            country: "CO".to_string(),
            postal_code: None,
        }),
    }
}

fn sample_purchase() -> PurchaseRequest {
    let code = unique_account_code("new_user");
    PurchaseRequest {
        currency: "COP".to_string(),
        account: PurchaseAccount {
            email: format!("{code}@example.com"),
            code,
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            billing_info: BillingInfo {
                address: Address {
                    street1: "Avenida Principal 123".to_string(),
                    city: "Medellín".to_string(),
                    region: "Antioquia".to_string(),
                    country: "CO".to_string(),
                    postal_code: Some("050001".to_string()),
                },
                // Test card number accepted by sandbox sites.
                number: "4111111111111111".to_string(),
                month: "12".to_string(),
                year: "2030".to_string(),
            },
        },
        subscriptions: vec![SubscriptionLine {
            plan_code: "test_plan_001".to_string(),
            quantity: 1,
        }],
    }
}
