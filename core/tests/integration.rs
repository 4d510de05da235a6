//! End-to-end tests against the live mock server.
//!
//! Starts the mock billing API on a random port in a background runtime, then
//! drives every client operation over real HTTP and records the results the
//! way the operator scripts do.

use std::fs;
use std::net::SocketAddr;

use billing_core::{
    unique_account_code, AccountUpdate, Address, BillingClient, BillingInfo, Config,
    OperationResult, PurchaseAccount, PurchaseRequest, ResponseRecorder, SubscriptionLine,
};
use serde_json::{json, Map, Value};

/// Start the mock server on an ephemeral port and return its address.
fn start_mock_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn purchase(code: &str) -> PurchaseRequest {
    PurchaseRequest {
        currency: "COP".to_string(),
        account: PurchaseAccount {
            code: code.to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            email: format!("{code}@example.com"),
            billing_info: BillingInfo {
                address: Address {
                    street1: "Avenida Principal 123".to_string(),
                    city: "Medellín".to_string(),
                    region: "Antioquia".to_string(),
                    country: "CO".to_string(),
                    postal_code: Some("050001".to_string()),
                },
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

#[test]
fn operations_round_trip_and_are_recorded() {
    let addr = start_mock_server();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new("test-key", &format!("http://{addr}"), mock_server::DEMO_ACCOUNT_CODE)
        .with_responses_dir(dir.path().join("responses"))
        .with_operations_log(dir.path().join("logs").join("operations.log"));
    let client = BillingClient::new(&config);
    let recorder = ResponseRecorder::from_config(&config);

    // Step 1: account info.
    let account = client.get_account_info();
    assert!(!account.is_error(), "{account:?}");
    assert_eq!(account["code"], mock_server::DEMO_ACCOUNT_CODE);
    let saved = recorder.record("get_account_info", &account).unwrap();
    let on_disk: OperationResult = serde_json::from_str(&fs::read_to_string(&saved).unwrap()).unwrap();
    assert_eq!(on_disk, account);

    // Step 2: address update.
    let update = AccountUpdate {
        first_name: Some("Julian".to_string()),
        last_name: Some("Hincapié".to_string()),
        address: Some(Address {
            street1: "Calle 123".to_string(),
            city: "Medellín".to_string(),
            region: "Antioquia".to_string(),
            country: "CO".to_string(),
            postal_code: None,
        }),
    };
    let updated = client.update_account_address(&update);
    assert_eq!(updated["last_name"], "Hincapié");
    assert_eq!(updated["address"]["city"], "Medellín");
    recorder.record("update_account_address", &updated).unwrap();

    // Step 3: new account with subscription.
    let code = unique_account_code("new_user");
    let created = client.create_account_and_subscribe(&purchase(&code));
    assert!(!created.is_error(), "{created:?}");
    assert_eq!(created["charge_invoice"]["account"]["code"], code.as_str());
    recorder.record("create_account_and_subscribe", &created).unwrap();

    // Step 4: plans.
    let plans = client.get_available_plans();
    assert_eq!(plans["data"][0]["code"], "test_plan_001");
    recorder.record("get_available_plans", &plans).unwrap();

    // Step 5: subscribe the demo account with extra parameters.
    let extra: Map<String, Value> = json!({
        "quantity": 3,
        "auto_renew": false,
        "customer_notes": "created by integration test",
        "account": {"first_name": "Julian"}
    })
    .as_object()
    .cloned()
    .unwrap();
    let subscription = client.create_subscription(
        mock_server::DEMO_ACCOUNT_CODE,
        "test_plan_001",
        None,
        Some(&extra),
    );
    assert!(!subscription.is_error(), "{subscription:?}");
    assert_eq!(subscription["quantity"], 3);
    assert_eq!(subscription["auto_renew"], false);
    assert_eq!(subscription["currency"], "USD");
    recorder.record("create_subscription", &subscription).unwrap();

    // Five artifacts, five log lines.
    let files = fs::read_dir(dir.path().join("responses")).unwrap().count();
    assert_eq!(files, 5);
    let log = fs::read_to_string(dir.path().join("logs").join("operations.log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines.iter().all(|line| line.contains("] SUCCESS | ")));
    assert!(lines[0].contains(&format!("get_account_info | ID: {}", account["id"].as_str().unwrap())));
    assert!(lines[3].ends_with("get_available_plans | Completed successfully"));
    assert!(lines[4].ends_with(&format!("create_subscription | Account: {}", mock_server::DEMO_ACCOUNT_CODE)));
}

#[test]
fn unknown_account_yields_http_error_record() {
    let addr = start_mock_server();
    let config = Config::new("test-key", &format!("http://{addr}"), "ghost");
    let client = BillingClient::new(&config);

    let result = client.get_account_info();
    assert_eq!(
        result.error_message().unwrap(),
        format!("HTTP error: 404 Client Error: Not Found for url: http://{addr}/accounts/ghost")
    );

    let result = client.update_account_address(&AccountUpdate::default());
    assert!(result.error_message().unwrap().starts_with("HTTP error: 404"));
}

#[test]
fn validation_failure_yields_http_error_record() {
    let addr = start_mock_server();
    let config = Config::new("test-key", &format!("http://{addr}"), mock_server::DEMO_ACCOUNT_CODE);
    let client = BillingClient::new(&config);

    let result = client.create_subscription(mock_server::DEMO_ACCOUNT_CODE, "no_such_plan", None, None);
    assert!(result
        .error_message()
        .unwrap()
        .starts_with("HTTP error: 422 Client Error: Unprocessable Entity"));
}

#[test]
fn unreachable_server_yields_request_error_record() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = Config::new("test-key", &format!("http://127.0.0.1:{port}"), "acct");
    let client = BillingClient::new(&config);

    for result in [client.get_account_info(), client.get_available_plans()] {
        assert!(result.error_message().unwrap().starts_with("Request error: "), "{result:?}");
    }
}
