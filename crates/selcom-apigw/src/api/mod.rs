//! Selcom API gateway client
//!
//! Signed transport for the Selcom API gateway plus typed wrappers for the
//! endpoints the merchant backend uses.
//!
//! # Endpoints
//!
//! ## Utility payments and wallet cash-in
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/v1/utilitypayment/process` | Pay a bill |
//! | GET | `/v1/utilitypayment/lookup` | Look up a biller reference |
//! | GET | `/v1/utilitypayment/query` | Query a payment |
//! | POST | `/v1/walletcashin/process` | Push money to a mobile wallet |
//! | GET | `/v1/walletcashin/namelookup` | Look up a wallet holder |
//! | GET | `/v1/walletcashin/query` | Query a cash-in |
//! | POST | `/v1/selcompesa/cashin` | Cash-in to Selcom Pesa |
//!
//! ## International money transfer
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/v1/imt/send-money` | Send money |
//! | GET | `/v1/imt/wallet-namelookup` | Wallet holder lookup |
//! | GET | `/v1/imt/bank-namelookup` | Bank account lookup |
//! | GET | `/v1/imt/query` | Query a transfer |
//!
//! ## Checkout
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/v1/checkout/initiate-pos-payment` | POS payment |
//! | POST | `/v1/checkout/create-order-minimal` | Create an order |
//! | GET | `/v1/checkout/order-status` | Order status |
//! | DELETE | `/v1/checkout/cancel-order` | Cancel an order |
//! | GET | `/v1/checkout/list-orders` | List orders in a date window |
//! | POST | `/v1/checkout/wallet-payment` | Push-USSD payment for an order |
//! | GET | `/v1/checkout/stored-cards` | Tokenized cards of a buyer |
//! | DELETE | `/v1/checkout/delete-card` | Remove a tokenized card |
//!
//! # Authentication
//!
//! Every request is signed by [`signer::Signer`]; see that module for the
//! header set. GET and DELETE carry the payload as query parameters, POST
//! as a JSON body.
//!
//! # Results
//!
//! The transport only fails on network, TLS, timeout or non-2xx status.
//! A decoded [`GatewayResponse`] must still be classified with
//! [`GatewayResponse::outcome`].

pub mod error;
pub mod signer;
pub mod types;
pub mod webhook;

use std::time::Duration;

use error::Error;
use reqwest::{Client, Method};
use serde::Serialize;
use signer::{canonical_value, Signer};
use tracing::{debug, error, warn};
use types::*;
use url::Url;

use crate::config::SelcomConfig;

/// Selcom API client
#[derive(Clone)]
pub struct SelcomApi {
    base_url: Url,
    client: Client,
    signer: Signer,
    vendor: String,
    pin: String,
}

impl std::fmt::Debug for SelcomApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelcomApi")
            .field("base_url", &self.base_url.as_str())
            .field("signer", &self.signer)
            .field("vendor", &self.vendor)
            .field("pin", &"<redacted>")
            .finish()
    }
}

impl SelcomApi {
    /// Create a new client from validated configuration
    pub fn new(config: &SelcomConfig) -> Result<Self, crate::Error> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url).map_err(Error::from)?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .http1_title_case_headers()
            .build()
            .map_err(Error::from)?;

        Ok(Self {
            base_url,
            client,
            signer: Signer::new(config.credential()),
            vendor: config.vendor.clone(),
            pin: config.pin.clone(),
        })
    }

    /// Signer bound to this client's credential
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }

    /// Sign and send a request, returning the raw response
    ///
    /// Fails only on transport problems and non-2xx statuses; the body is
    /// left untouched.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        payload: &Payload,
    ) -> Result<reqwest::Response, Error> {
        let url = self.endpoint(path);
        let headers = self.signer.sign(payload).to_header_map()?;

        debug!("{} {}", method, url);

        let request = self.client.request(method.clone(), url.clone()).headers(headers);
        let request = if method == Method::POST || method == Method::PUT {
            request.json(payload)
        } else {
            request.query(&query_pairs(payload))
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                error!("Selcom request to {} timed out", url);
            } else if e.is_connect() {
                error!("Selcom connection to {} failed: {}", url, e);
            } else {
                error!("Selcom request to {} failed: {}", url, e);
            }
            Error::from(e)
        })?;

        let status = response.status();
        debug!("{} {} -> {}", method, url, status);

        if status.is_success() {
            Ok(response)
        } else {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to read Selcom error body for {}: {}", url, e);
                    String::new()
                }
            };
            warn!("Selcom gateway error: {} - {}", status, body);
            Err(Error::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Send a request and decode the gateway response body
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        payload: &Payload,
    ) -> Result<GatewayResponse, Error> {
        let response = self.send(method, path, payload).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Like [`call`](Self::call), but the request keeps running if the
    /// returned future is dropped
    ///
    /// Used for money movement: once sent, the gateway may already have
    /// acted, so the request is allowed to finish and its result is
    /// discarded when nobody is waiting. Status must then be queried.
    pub async fn call_detached(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<GatewayResponse, Error> {
        let api = self.clone();
        let path = path.to_string();

        tokio::spawn(async move { api.call(method, &path, &payload).await })
            .await
            .map_err(|e| Error::Join(e.to_string()))?
    }

    async fn get<T: Serialize>(&self, path: &str, query: &T) -> Result<GatewayResponse, Error> {
        self.call(Method::GET, path, &to_payload(query)?).await
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<GatewayResponse, Error> {
        self.call(Method::POST, path, &to_payload(body)?).await
    }

    async fn post_detached<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<GatewayResponse, Error> {
        self.call_detached(Method::POST, path, to_payload(body)?)
            .await
    }

    async fn delete<T: Serialize>(&self, path: &str, query: &T) -> Result<GatewayResponse, Error> {
        self.call(Method::DELETE, path, &to_payload(query)?).await
    }

    // ==================== Utility Payment Endpoints ====================

    /// Pay a utility bill
    pub async fn utility_payment(
        &self,
        mut request: UtilityPaymentRequest,
    ) -> Result<GatewayResponse, Error> {
        request.vendor = self.vendor.clone();
        request.pin = self.pin.clone();
        self.post_detached("/v1/utilitypayment/process", &request)
            .await
    }

    /// Look up a biller reference
    pub async fn utility_lookup(&self, request: &LookupRequest) -> Result<GatewayResponse, Error> {
        self.get("/v1/utilitypayment/lookup", request).await
    }

    /// Query a utility payment
    pub async fn utility_query(
        &self,
        request: &TransactionQuery,
    ) -> Result<GatewayResponse, Error> {
        self.get("/v1/utilitypayment/query", request).await
    }

    // ==================== Wallet Cash-in Endpoints ====================

    /// Push money to a mobile wallet
    pub async fn wallet_cashin(
        &self,
        mut request: UtilityPaymentRequest,
    ) -> Result<GatewayResponse, Error> {
        request.vendor = self.vendor.clone();
        request.pin = self.pin.clone();
        self.post_detached("/v1/walletcashin/process", &request)
            .await
    }

    /// Look up a wallet holder's name
    pub async fn wallet_name_lookup(
        &self,
        request: &LookupRequest,
    ) -> Result<GatewayResponse, Error> {
        self.get("/v1/walletcashin/namelookup", request).await
    }

    /// Query a wallet cash-in
    pub async fn wallet_query(&self, request: &TransactionQuery) -> Result<GatewayResponse, Error> {
        self.get("/v1/walletcashin/query", request).await
    }

    /// Cash-in to a Selcom Pesa account
    pub async fn selcom_pesa_cashin(
        &self,
        mut request: SelcomPesaCashinRequest,
    ) -> Result<GatewayResponse, Error> {
        request.vendor = self.vendor.clone();
        request.pin = self.pin.clone();
        self.post_detached("/v1/selcompesa/cashin", &request).await
    }

    // ==================== IMT Endpoints ====================

    /// Send an international money transfer
    pub async fn imt_send_money(
        &self,
        mut request: ImtSendMoneyRequest,
    ) -> Result<GatewayResponse, Error> {
        request.vendor = self.vendor.clone();
        request.pin = self.pin.clone();
        self.post_detached("/v1/imt/send-money", &request).await
    }

    /// Look up a wallet holder for IMT
    pub async fn imt_wallet_name_lookup(
        &self,
        request: &LookupRequest,
    ) -> Result<GatewayResponse, Error> {
        self.get("/v1/imt/wallet-namelookup", request).await
    }

    /// Look up a bank account holder for IMT
    pub async fn imt_bank_name_lookup(
        &self,
        request: &BankLookupRequest,
    ) -> Result<GatewayResponse, Error> {
        self.get("/v1/imt/bank-namelookup", request).await
    }

    /// Query an IMT transfer
    pub async fn imt_query(&self, request: &ImtQuery) -> Result<GatewayResponse, Error> {
        self.get("/v1/imt/query", request).await
    }

    // ==================== Merchant C2B Endpoints ====================

    /// Relay a C2B validation
    pub async fn merchant_validation(
        &self,
        request: &MerchantValidationRequest,
    ) -> Result<GatewayResponse, Error> {
        self.post("/validation", request).await
    }

    /// Relay a C2B notification
    pub async fn merchant_notification(
        &self,
        request: &MerchantNotificationRequest,
    ) -> Result<GatewayResponse, Error> {
        self.post("/notification", request).await
    }

    // ==================== Checkout Endpoints ====================

    /// Initiate a POS payment
    pub async fn pos_payment(&self, request: &PosPaymentRequest) -> Result<GatewayResponse, Error> {
        self.post_detached("/v1/checkout/initiate-pos-payment", request)
            .await
    }

    /// Create a checkout order
    pub async fn create_order(
        &self,
        mut request: CreateOrderRequest,
    ) -> Result<GatewayResponse, Error> {
        request.vendor = self.vendor.clone();
        self.post("/v1/checkout/create-order-minimal", &request)
            .await
    }

    /// Get the status of an order
    pub async fn order_status(&self, request: &OrderQuery) -> Result<GatewayResponse, Error> {
        self.get("/v1/checkout/order-status", request).await
    }

    /// Cancel an unpaid order
    pub async fn cancel_order(&self, request: &OrderQuery) -> Result<GatewayResponse, Error> {
        self.delete("/v1/checkout/cancel-order", request).await
    }

    /// List orders created in a date window
    pub async fn list_orders(&self, request: &ListOrdersQuery) -> Result<GatewayResponse, Error> {
        self.get("/v1/checkout/list-orders", request).await
    }

    /// Push a wallet payment prompt for an order
    pub async fn wallet_payment(
        &self,
        request: &WalletPaymentRequest,
    ) -> Result<GatewayResponse, Error> {
        self.post_detached("/v1/checkout/wallet-payment", request)
            .await
    }

    /// List tokenized cards of a buyer
    pub async fn stored_cards(&self, request: &StoredCardsQuery) -> Result<GatewayResponse, Error> {
        self.get("/v1/checkout/stored-cards", request).await
    }

    /// Remove a tokenized card
    pub async fn delete_card(&self, request: &DeleteCardRequest) -> Result<GatewayResponse, Error> {
        self.delete("/v1/checkout/delete-card", request).await
    }
}

fn query_pairs(payload: &Payload) -> Vec<(&str, String)> {
    payload
        .iter()
        .map(|(key, value)| (key.as_str(), canonical_value(value)))
        .collect()
}
