//! Selcom API request and response types
//!
//! Request structs serialise to exactly the field set the gateway expects.
//! Optional fields are skipped when absent so the signed field list always
//! matches what is put on the wire.
//!
//! Fields marked "injected" are filled from configuration by
//! [`SelcomApi`](super::SelcomApi) rather than supplied by callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::Error;
use crate::outcome::Outcome;

/// Field set that gets signed and sent
pub type Payload = serde_json::Map<String, Value>;

/// Serialise a request struct into a [`Payload`]
pub fn to_payload<T: Serialize>(request: &T) -> Result<Payload, Error> {
    match serde_json::to_value(request)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Payload(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Decoded gateway response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Transaction reference assigned by the gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Echo of the caller's transaction id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transid: Option<String>,
    /// `SUCCESS`, `FAIL`, `PENDING`, `AMBIGUOUS`...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Three digit result code
    #[serde(default)]
    pub resultcode: String,
    /// Human readable message
    #[serde(default)]
    pub message: String,
    /// Operation specific data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Value>,
}

impl GatewayResponse {
    /// Classify this response
    pub fn outcome(&self) -> Outcome {
        Outcome::from_result_code(&self.resultcode)
    }
}

/// Utility payment or wallet cash-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityPaymentRequest {
    /// Caller transaction id
    pub transid: String,
    /// Product code (e.g. `LUKU`, `AZAMTV`, `VMCASHIN`)
    pub utilitycode: String,
    /// Account/meter/phone reference at the biller
    pub utilityref: String,
    /// Amount in minor-less TZS
    pub amount: u64,
    /// Injected vendor id
    #[serde(default)]
    pub vendor: String,
    /// Injected vendor PIN
    #[serde(default)]
    pub pin: String,
    /// Customer phone number
    pub msisdn: String,
}

/// Utility or wallet name lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Product code
    pub utilitycode: String,
    /// Reference to look up
    pub utilityref: String,
    /// Caller transaction id
    pub transid: String,
}

/// Status query by transaction id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    /// Transaction id of the original request
    pub transid: String,
}

/// Selcom Pesa cash-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelcomPesaCashinRequest {
    /// Caller transaction id
    pub transid: String,
    /// Selcom Pesa account
    pub utilityref: String,
    /// Amount
    pub amount: u64,
    /// Injected vendor id
    #[serde(default)]
    pub vendor: String,
    /// Injected vendor PIN
    #[serde(default)]
    pub pin: String,
    /// Customer phone number
    pub msisdn: String,
}

/// International money transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImtSendMoneyRequest {
    /// Unique message id
    pub message_id: String,
    /// End-to-end id
    pub end2end_id: String,
    /// Sender details
    pub sender: Value,
    /// Declared source of funds
    pub source_of_funds: String,
    /// Recipient details
    pub recipient: Value,
    /// Injected vendor id
    #[serde(default)]
    pub vendor: String,
    /// Injected vendor PIN
    #[serde(default)]
    pub pin: String,
    /// ISO currency code
    pub currency: String,
    /// Amount
    pub amount: u64,
    /// Purpose of the transfer
    pub purpose: String,
    /// Message shown to the recipient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_message: Option<String>,
    /// Secret message for pickup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_message: Option<String>,
    /// Sending financial institution
    #[serde(rename = "sourceFI")]
    pub source_fi: Value,
    /// Receiving financial institution
    #[serde(rename = "destinationFI")]
    pub destination_fi: Value,
}

/// Bank account name lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankLookupRequest {
    /// Bank code
    pub bank: String,
    /// Account number
    pub account: String,
    /// Caller transaction id
    pub transid: String,
}

/// IMT status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImtQuery {
    /// Message id of the transfer
    pub message_id: String,
}

/// Merchant C2B validation relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantValidationRequest {
    /// Gateway transaction id
    pub transid: String,
    /// Amount
    pub amount: u64,
    /// Merchant reference
    pub reference: String,
}

/// Merchant C2B notification relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantNotificationRequest {
    /// Gateway transaction id
    pub transid: String,
    /// Merchant reference
    pub reference: String,
    /// Amount
    pub amount: u64,
    /// Result label
    pub result: String,
    /// Result code
    pub resultcode: String,
    /// Message
    pub message: String,
}

/// POS payment initiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosPaymentRequest {
    /// Caller transaction id
    pub transid: String,
    /// ISO currency code
    pub currency: String,
    /// Amount
    pub amount: u64,
    /// Payment method
    pub payment_method: String,
    /// Customer phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msisdn: Option<String>,
    /// Invoice number
    pub invoice_no: String,
}

/// Minimal checkout order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Injected vendor id
    #[serde(default)]
    pub vendor: String,
    /// Merchant order id
    pub order_id: String,
    /// Buyer email
    pub buyer_email: String,
    /// Buyer name
    pub buyer_name: String,
    /// Buyer phone
    pub buyer_phone: String,
    /// Amount
    pub amount: u64,
    /// ISO currency code
    pub currency: String,
    /// Base64 callback URL for order updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    /// Free text from the buyer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_remarks: Option<String>,
    /// Free text from the merchant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_remarks: Option<String>,
    /// Number of items
    pub no_of_items: u32,
}

/// Order lookup or cancellation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuery {
    /// Merchant order id
    pub order_id: String,
}

/// Order listing window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    /// Start date (`YYYY-MM-DD`)
    pub fromdate: String,
    /// End date (`YYYY-MM-DD`)
    pub todate: String,
}

/// Push-USSD wallet payment for an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletPaymentRequest {
    /// Caller transaction id
    pub transid: String,
    /// Order to pay
    pub order_id: String,
    /// Wallet phone number
    pub msisdn: String,
}

/// Stored card listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCardsQuery {
    /// Merchant side buyer id
    pub buyer_userid: String,
    /// Gateway side buyer id
    pub gateway_buyer_uuid: String,
}

/// Stored card removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCardRequest {
    /// Card token id
    pub id: String,
    /// Gateway side buyer id
    pub gateway_buyer_uuid: String,
}
