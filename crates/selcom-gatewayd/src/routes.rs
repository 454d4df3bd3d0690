//! Merchant-facing business endpoints
//!
//! Each handler forwards to the matching [`SelcomApi`] call and maps the
//! classified outcome onto an HTTP status:
//!
//! | Outcome | Status |
//! |---------|--------|
//! | success | 200 |
//! | in progress, ambiguous | 202 |
//! | failed | 400 |
//! | transport error | 502 (504 on timeout) |

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use selcom_apigw::api::types::{
    BankLookupRequest, CreateOrderRequest, DeleteCardRequest, ImtQuery, ImtSendMoneyRequest,
    ListOrdersQuery, LookupRequest, MerchantNotificationRequest, MerchantValidationRequest,
    OrderQuery, PosPaymentRequest, SelcomPesaCashinRequest, StoredCardsQuery, TransactionQuery,
    UtilityPaymentRequest, WalletPaymentRequest,
};
use selcom_apigw::{GatewayResponse, Outcome, SelcomApi};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;

type ApiResult = Result<(StatusCode, Json<Value>), ApiError>;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Gateway client
    pub api: SelcomApi,
}

/// Checkout order as accepted from merchants
///
/// `order_id` is generated when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    order_id: Option<String>,
    buyer_email: String,
    buyer_name: String,
    buyer_phone: String,
    amount: u64,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default)]
    webhook: Option<String>,
    #[serde(default)]
    buyer_remarks: Option<String>,
    #[serde(default)]
    merchant_remarks: Option<String>,
    #[serde(default = "default_no_of_items")]
    no_of_items: u32,
}

fn default_currency() -> String {
    "TZS".to_string()
}

fn default_no_of_items() -> u32 {
    1
}

impl From<NewOrder> for CreateOrderRequest {
    fn from(order: NewOrder) -> Self {
        let order_id = order
            .order_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        CreateOrderRequest {
            vendor: String::new(),
            order_id,
            buyer_email: order.buyer_email,
            buyer_name: order.buyer_name,
            buyer_phone: order.buyer_phone,
            amount: order.amount,
            currency: order.currency,
            webhook: order.webhook,
            buyer_remarks: order.buyer_remarks,
            merchant_remarks: order.merchant_remarks,
            no_of_items: order.no_of_items,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct BuyerQuery {
    gateway_buyer_uuid: String,
}

/// Build the business router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/utility-payment", post(utility_payment))
        .route("/utility-lookup", get(utility_lookup))
        .route("/utility-query", get(utility_query))
        .route("/wallet-cashin", post(wallet_cashin))
        .route("/wallet-namelookup", get(wallet_name_lookup))
        .route("/wallet-query", get(wallet_query))
        .route("/selcom-pesa-cashin", post(selcom_pesa_cashin))
        .route("/imt/send-money", post(imt_send_money))
        .route("/imt/wallet-namelookup", get(imt_wallet_name_lookup))
        .route("/imt/bank-namelookup", get(imt_bank_name_lookup))
        .route("/imt/query", get(imt_query))
        .route("/merchant/validation", post(merchant_validation))
        .route("/merchant/notification", post(merchant_notification))
        .route("/checkout/pos-payment", post(pos_payment))
        .route("/checkout/orders", post(create_order).get(list_orders))
        .route(
            "/checkout/orders/{order_id}",
            get(order_status).delete(cancel_order),
        )
        .route("/checkout/wallet-payment", post(wallet_payment))
        .route("/checkout/stored-cards", get(stored_cards))
        .route("/checkout/stored-cards/{id}", delete(delete_card))
        .with_state(state)
}

/// Map a classified gateway response onto the HTTP answer
fn respond(reference: &str, response: GatewayResponse) -> ApiResult {
    let outcome = response.outcome();

    match outcome {
        Outcome::Success => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "response": response,
            })),
        )),
        Outcome::InProgress | Outcome::Ambiguous => {
            let message = outcome.caller_message(reference, &response.message);
            tracing::info!("{} (resultcode {})", message, response.resultcode);
            Ok((
                StatusCode::ACCEPTED,
                Json(json!({
                    "status": outcome,
                    "message": message,
                    "response": response,
                })),
            ))
        }
        Outcome::Failed => Err(ApiError::Business {
            transid: reference.to_string(),
            response,
        }),
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Selcom gateway service is running" }))
}

// ==================== Utility Payment ====================

async fn utility_payment(
    State(state): State<AppState>,
    Json(request): Json<UtilityPaymentRequest>,
) -> ApiResult {
    let transid = request.transid.clone();
    let response = state.api.utility_payment(request).await?;
    respond(&transid, response)
}

async fn utility_lookup(
    State(state): State<AppState>,
    Query(request): Query<LookupRequest>,
) -> ApiResult {
    let response = state.api.utility_lookup(&request).await?;
    respond(&request.transid, response)
}

async fn utility_query(
    State(state): State<AppState>,
    Query(request): Query<TransactionQuery>,
) -> ApiResult {
    let response = state.api.utility_query(&request).await?;
    respond(&request.transid, response)
}

// ==================== Wallet Cash-in ====================

async fn wallet_cashin(
    State(state): State<AppState>,
    Json(request): Json<UtilityPaymentRequest>,
) -> ApiResult {
    let transid = request.transid.clone();
    let response = state.api.wallet_cashin(request).await?;
    respond(&transid, response)
}

async fn wallet_name_lookup(
    State(state): State<AppState>,
    Query(request): Query<LookupRequest>,
) -> ApiResult {
    let response = state.api.wallet_name_lookup(&request).await?;
    respond(&request.transid, response)
}

async fn wallet_query(
    State(state): State<AppState>,
    Query(request): Query<TransactionQuery>,
) -> ApiResult {
    let response = state.api.wallet_query(&request).await?;
    respond(&request.transid, response)
}

async fn selcom_pesa_cashin(
    State(state): State<AppState>,
    Json(request): Json<SelcomPesaCashinRequest>,
) -> ApiResult {
    let transid = request.transid.clone();
    let response = state.api.selcom_pesa_cashin(request).await?;
    respond(&transid, response)
}

// ==================== IMT ====================

async fn imt_send_money(
    State(state): State<AppState>,
    Json(request): Json<ImtSendMoneyRequest>,
) -> ApiResult {
    let message_id = request.message_id.clone();
    let response = state.api.imt_send_money(request).await?;
    respond(&message_id, response)
}

async fn imt_wallet_name_lookup(
    State(state): State<AppState>,
    Query(request): Query<LookupRequest>,
) -> ApiResult {
    let response = state.api.imt_wallet_name_lookup(&request).await?;
    respond(&request.transid, response)
}

async fn imt_bank_name_lookup(
    State(state): State<AppState>,
    Query(request): Query<BankLookupRequest>,
) -> ApiResult {
    let response = state.api.imt_bank_name_lookup(&request).await?;
    respond(&request.transid, response)
}

async fn imt_query(State(state): State<AppState>, Query(request): Query<ImtQuery>) -> ApiResult {
    let response = state.api.imt_query(&request).await?;
    respond(&request.message_id, response)
}

// ==================== Merchant C2B ====================

async fn merchant_validation(
    State(state): State<AppState>,
    Json(request): Json<MerchantValidationRequest>,
) -> ApiResult {
    let response = state.api.merchant_validation(&request).await?;
    respond(&request.transid, response)
}

async fn merchant_notification(
    State(state): State<AppState>,
    Json(request): Json<MerchantNotificationRequest>,
) -> ApiResult {
    let response = state.api.merchant_notification(&request).await?;
    respond(&request.transid, response)
}

// ==================== Checkout ====================

async fn pos_payment(
    State(state): State<AppState>,
    Json(request): Json<PosPaymentRequest>,
) -> ApiResult {
    let response = state.api.pos_payment(&request).await?;
    respond(&request.transid, response)
}

async fn create_order(State(state): State<AppState>, Json(order): Json<NewOrder>) -> ApiResult {
    let request = CreateOrderRequest::from(order);
    let order_id = request.order_id.clone();
    let response = state.api.create_order(request).await?;
    respond(&order_id, response)
}

async fn order_status(State(state): State<AppState>, Path(order_id): Path<String>) -> ApiResult {
    let response = state
        .api
        .order_status(&OrderQuery {
            order_id: order_id.clone(),
        })
        .await?;
    respond(&order_id, response)
}

async fn cancel_order(State(state): State<AppState>, Path(order_id): Path<String>) -> ApiResult {
    let response = state
        .api
        .cancel_order(&OrderQuery {
            order_id: order_id.clone(),
        })
        .await?;
    respond(&order_id, response)
}

async fn list_orders(
    State(state): State<AppState>,
    Query(request): Query<ListOrdersQuery>,
) -> ApiResult {
    let response = state.api.list_orders(&request).await?;
    respond(
        &format!("orders {}..{}", request.fromdate, request.todate),
        response,
    )
}

async fn wallet_payment(
    State(state): State<AppState>,
    Json(request): Json<WalletPaymentRequest>,
) -> ApiResult {
    let response = state.api.wallet_payment(&request).await?;
    respond(&request.transid, response)
}

async fn stored_cards(
    State(state): State<AppState>,
    Query(request): Query<StoredCardsQuery>,
) -> ApiResult {
    let response = state.api.stored_cards(&request).await?;
    respond(&request.buyer_userid, response)
}

async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(buyer): Query<BuyerQuery>,
) -> ApiResult {
    let request = DeleteCardRequest {
        id,
        gateway_buyer_uuid: buyer.gateway_buyer_uuid,
    };
    let response = state.api.delete_card(&request).await?;
    respond(&request.id, response)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::body::Body;
    use axum::http::{Method, Request, Uri};
    use axum::response::{IntoResponse, Response};
    use http_body_util::BodyExt;
    use selcom_apigw::SelcomConfig;
    use tower::ServiceExt;

    use super::*;

    /// Answers according to markers found in the request:
    /// `WAIT` → 111, `LOST` → 999, `FAIL` → 051, `DOWN` → HTTP 503.
    /// The received fields are echoed back in `data`.
    async fn mock_gateway(
        uri: Uri,
        Query(query): Query<HashMap<String, String>>,
        body: String,
    ) -> Response {
        let haystack = format!("{}{}", uri.query().unwrap_or_default(), body);

        if haystack.contains("DOWN") {
            return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
        }

        let (result, resultcode, message) = if haystack.contains("WAIT") {
            ("PENDING", "111", "Request in progress")
        } else if haystack.contains("LOST") {
            ("AMBIGUOUS", "999", "Status unknown")
        } else if haystack.contains("FAIL") {
            ("FAIL", "051", "Insufficient balance")
        } else {
            ("SUCCESS", "000", "Successful")
        };

        let echo = if body.is_empty() {
            json!(query)
        } else {
            serde_json::from_str(&body).unwrap_or(Value::Null)
        };

        Json(json!({
            "reference": "REF1",
            "result": result,
            "resultcode": resultcode,
            "message": message,
            "data": [echo],
        }))
        .into_response()
    }

    fn config(base_url: String) -> SelcomConfig {
        SelcomConfig {
            api_key: "test-key".to_string(),
            api_secret: "s3cr3t".to_string(),
            base_url,
            vendor: "TILL1".to_string(),
            pin: "1234".to_string(),
            webhook_token: "token".to_string(),
            timeout_ms: 5_000,
        }
    }

    async fn app() -> Router {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().fallback(mock_gateway))
                .await
                .unwrap();
        });

        let api = SelcomApi::new(&config(format!("http://{}", addr))).unwrap();
        create_router(AppState { api })
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn utility_payment_body(transid: &str) -> Value {
        json!({
            "transid": transid,
            "utilitycode": "LUKU",
            "utilityref": "01234567891",
            "amount": 5000,
            "msisdn": "255712345678",
        })
    }

    #[tokio::test]
    async fn test_root() {
        let (status, body) = send(app().await, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Selcom gateway service is running");
    }

    #[tokio::test]
    async fn test_utility_payment_success() {
        let (status, body) = send(
            app().await,
            Method::POST,
            "/utility-payment",
            Some(utility_payment_body("T-OK-1")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["response"]["resultcode"], "000");
        let echoed = &body["response"]["data"][0];
        assert_eq!(echoed["vendor"], "TILL1");
        assert_eq!(echoed["pin"], "1234");
    }

    #[tokio::test]
    async fn test_in_progress_is_accepted() {
        let (status, body) = send(
            app().await,
            Method::POST,
            "/wallet-cashin",
            Some(utility_payment_body("T-WAIT-1")),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "in_progress");
        assert_eq!(
            body["message"],
            "Transaction T-WAIT-1 in progress. Query status after 3 minutes."
        );
    }

    #[tokio::test]
    async fn test_ambiguous_is_accepted() {
        let (status, body) = send(
            app().await,
            Method::POST,
            "/utility-payment",
            Some(utility_payment_body("T-LOST-1")),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "ambiguous");
        assert_eq!(
            body["message"],
            "Transaction T-LOST-1 status ambiguous. Wait for reconciliation."
        );
    }

    #[tokio::test]
    async fn test_failed_is_bad_request() {
        let (status, body) = send(
            app().await,
            Method::POST,
            "/utility-payment",
            Some(utility_payment_body("T-FAIL-1")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "failed");
        assert_eq!(
            body["detail"],
            "Transaction T-FAIL-1 failed: Insufficient balance"
        );
        assert_eq!(body["response"]["resultcode"], "051");
    }

    #[tokio::test]
    async fn test_gateway_down_is_bad_gateway() {
        let (status, body) = send(
            app().await,
            Method::GET,
            "/utility-query?transid=T-DOWN-1",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = SelcomApi::new(&config(format!("http://{}", addr))).unwrap();
        let app = create_router(AppState { api });

        let (status, _) = send(app, Method::GET, "/wallet-query?transid=T1", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_lookup_forwards_query() {
        let (status, body) = send(
            app().await,
            Method::GET,
            "/wallet-namelookup?utilitycode=VMCASHIN&utilityref=255712345678&transid=T2",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let echoed = &body["response"]["data"][0];
        assert_eq!(echoed["utilitycode"], "VMCASHIN");
        assert_eq!(echoed["transid"], "T2");
    }

    #[tokio::test]
    async fn test_create_order_generates_id() {
        let (status, body) = send(
            app().await,
            Method::POST,
            "/checkout/orders",
            Some(json!({
                "buyer_email": "asha@example.com",
                "buyer_name": "Asha",
                "buyer_phone": "255712345678",
                "amount": 15000,
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let echoed = &body["response"]["data"][0];
        assert_eq!(echoed["vendor"], "TILL1");
        assert_eq!(echoed["currency"], "TZS");
        assert_eq!(echoed["no_of_items"], 1);
        assert_eq!(echoed["order_id"].as_str().unwrap().len(), 32);
        assert!(echoed.get("webhook").is_none());
    }

    #[tokio::test]
    async fn test_order_status_and_cancel_use_path() {
        let (status, body) =
            send(app().await, Method::GET, "/checkout/orders/ORD-7", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"]["data"][0]["order_id"], "ORD-7");

        let (status, body) =
            send(app().await, Method::DELETE, "/checkout/orders/ORD-WAIT", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "in_progress");
    }

    #[tokio::test]
    async fn test_delete_card() {
        let (status, body) = send(
            app().await,
            Method::DELETE,
            "/checkout/stored-cards/CARD9?gateway_buyer_uuid=BUYER1",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let echoed = &body["response"]["data"][0];
        assert_eq!(echoed["id"], "CARD9");
        assert_eq!(echoed["gateway_buyer_uuid"], "BUYER1");
    }

    #[tokio::test]
    async fn test_invalid_body_is_rejected() {
        let (status, _) = send(
            app().await,
            Method::POST,
            "/utility-payment",
            Some(json!({"transid": "T1"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_new_order_keeps_supplied_id() {
        let order: NewOrder = serde_json::from_value(json!({
            "order_id": "ORD-1",
            "buyer_email": "a@b.c",
            "buyer_name": "A",
            "buyer_phone": "255700000000",
            "amount": 100,
            "currency": "USD",
            "no_of_items": 3,
        }))
        .unwrap();

        let request = CreateOrderRequest::from(order);
        assert_eq!(request.order_id, "ORD-1");
        assert_eq!(request.currency, "USD");
        assert_eq!(request.no_of_items, 3);
    }
}
