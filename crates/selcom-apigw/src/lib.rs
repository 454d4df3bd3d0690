//! Selcom API gateway integration
//!
//! Signed, authenticated transport to the Selcom API gateway and the
//! classification of its result codes.
//!
//! - [`api::signer`] turns a payload into the `SELCOM` header set
//! - [`api::SelcomApi`] sends signed GET/POST/DELETE requests and wraps the
//!   utility, wallet, IMT and checkout endpoints
//! - [`outcome`] maps `resultcode` onto success / in progress / ambiguous /
//!   failed
//! - [`api::webhook`] authenticates inbound C2B and checkout notifications
//!
//! ```rust,no_run
//! use selcom_apigw::api::types::TransactionQuery;
//! use selcom_apigw::{Outcome, SelcomApi, SelcomConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SelcomConfig {
//!     api_key: "api-key".to_string(),
//!     api_secret: "api-secret".to_string(),
//!     vendor: "TILL61000".to_string(),
//!     pin: "0000".to_string(),
//!     webhook_token: "token".to_string(),
//!     ..Default::default()
//! };
//!
//! let api = SelcomApi::new(&config)?;
//! let response = api
//!     .utility_query(&TransactionQuery {
//!         transid: "T1".to_string(),
//!     })
//!     .await?;
//!
//! match response.outcome() {
//!     Outcome::Success => {}
//!     Outcome::InProgress => { /* query again after STATUS_QUERY_COOLDOWN */ }
//!     Outcome::Ambiguous => { /* wait for reconciliation */ }
//!     Outcome::Failed => { /* surface response.message */ }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod api;
pub mod config;
pub mod error;
pub mod outcome;

pub use api::types::{GatewayResponse, Payload};
pub use api::SelcomApi;
pub use config::{ConfigError, Credential, SelcomConfig};
pub use error::Error;
pub use outcome::{Outcome, STATUS_QUERY_COOLDOWN};
