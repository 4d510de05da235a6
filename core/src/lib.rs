//! Synchronous client core for a subscription-billing REST API.
//!
//! # Overview
//! Two cooperating pieces:
//! - `BillingClient` builds a request per named operation, sends it through a
//!   `Transport` and normalizes the outcome into an `OperationResult`: either
//!   the decoded JSON body or an `{"error": message}` record.
//! - `ResponseRecorder` persists each result as a timestamped JSON file and
//!   appends a one-line summary to an operations log.
//!
//! # Design
//! - `Config` is loaded once and borrowed by the client; nothing is global.
//! - Client operations never fail: HTTP and transport errors become error
//!   records. Configuration and file-system errors are ordinary `Result`s.
//! - Requests and responses are plain data (`HttpRequest` / `HttpResponse`),
//!   so building and parsing are testable without a network.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod recorder;
pub mod transport;
pub mod types;

pub use client::{subscription_payload, BillingClient, DEFAULT_CURRENCY};
pub use config::Config;
pub use error::{ApiError, ConfigError, RecorderError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use recorder::ResponseRecorder;
pub use transport::{Transport, UreqTransport};
pub use types::{
    unique_account_code, AccountUpdate, Address, BillingInfo, OperationResult, PurchaseAccount,
    PurchaseRequest, SubscriptionLine,
};
