//! Inbound Selcom notifications
//!
//! Selcom calls back into the merchant for two kinds of events:
//!
//! - **C2B** (customer pays a merchant reference through a wallet): the
//!   gateway first asks the merchant to validate the reference, then
//!   notifies the final result. These calls carry a static
//!   `Authorization: Bearer <token>` agreed with Selcom.
//! - **Checkout** order updates: signed by Selcom with the same header set
//!   used for outbound requests (`Timestamp`, `Signed-Fields`, `Digest`)
//!   and the shared API secret.
//!
//! # Verification
//!
//! | Route | Check |
//! |-------|-------|
//! | `POST /webhooks/c2b/validation` | bearer token |
//! | `POST /webhooks/c2b/notification` | bearer token |
//! | `POST /webhooks/checkout` | HMAC-SHA256 digest over the signed fields |
//!
//! Both comparisons are constant-time. Checkout notifications must also
//! carry a `Timestamp` within five minutes of the receiver's clock and
//! sign every top-level body field. Missing or wrong credentials get a
//! 401, a body that is not the expected JSON gets a 400.
//!
//! Accepted events are forwarded to an `mpsc` channel; what the merchant
//! does with them is outside this crate.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::signer::{
    timestamp_is_fresh, Signer, DIGEST_HEADER, SIGNED_FIELDS_HEADER, TIMESTAMP_HEADER,
};
use super::types::Payload;
use crate::outcome::RESULT_SUCCESS;

/// C2B validation route
pub const C2B_VALIDATION_PATH: &str = "/webhooks/c2b/validation";
/// C2B notification route
pub const C2B_NOTIFICATION_PATH: &str = "/webhooks/c2b/notification";
/// Checkout order update route
pub const CHECKOUT_PATH: &str = "/webhooks/checkout";

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// C2B validation request from Selcom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct C2bValidation {
    /// Selcom transaction id
    pub transid: String,
    /// Reference the customer entered
    #[serde(default)]
    pub utilityref: Option<String>,
    /// Selcom reference
    #[serde(default)]
    pub reference: Option<String>,
    /// Amount paid
    pub amount: u64,
    /// Paying wallet
    #[serde(default)]
    pub msisdn: Option<String>,
    /// Wallet operator
    #[serde(default)]
    pub operator: Option<String>,
}

/// C2B result notification from Selcom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct C2bNotification {
    /// Selcom transaction id
    pub transid: String,
    /// Selcom reference
    pub reference: String,
    /// Reference the customer entered
    #[serde(default)]
    pub utilityref: Option<String>,
    /// Amount paid
    pub amount: u64,
    /// Result label
    #[serde(default)]
    pub result: Option<String>,
    /// Result code
    pub resultcode: String,
    /// Message
    #[serde(default)]
    pub message: Option<String>,
    /// Paying wallet
    #[serde(default)]
    pub msisdn: Option<String>,
}

/// Checkout order update from Selcom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutNotification {
    /// Order the update is for
    pub order_id: String,
    /// Selcom transaction id
    #[serde(default)]
    pub transid: Option<String>,
    /// Selcom reference
    #[serde(default)]
    pub reference: Option<String>,
    /// Result label
    #[serde(default)]
    pub result: Option<String>,
    /// Result code
    pub resultcode: String,
    /// `COMPLETED`, `CANCELLED`, `PENDING`, `USERCANCELED`...
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Channel used by the buyer
    #[serde(default)]
    pub channel: Option<String>,
}

/// Event forwarded to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Validation request
    C2bValidation(C2bValidation),
    /// Result notification
    C2bNotification(C2bNotification),
    /// Checkout order update
    Checkout(CheckoutNotification),
}

/// Acknowledgement returned to Selcom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    /// Echoed transaction or order id
    pub transid: String,
    /// Echoed reference if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Always `SUCCESS` for accepted events
    pub result: String,
    /// Always `000` for accepted events
    pub resultcode: String,
    /// Short message
    pub message: String,
}

impl WebhookAck {
    fn accepted(transid: String, reference: Option<String>, message: &str) -> Self {
        Self {
            transid,
            reference,
            result: "SUCCESS".to_string(),
            resultcode: RESULT_SUCCESS.to_string(),
            message: message.to_string(),
        }
    }
}

/// State for webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    /// Channel sender for forwarding events
    pub sender: mpsc::Sender<WebhookEvent>,
    /// Expected bearer token for C2B routes
    pub token: String,
    /// Signer holding the shared secret for checkout digests
    pub signer: Signer,
}

/// Compare two byte strings without short-circuiting on content
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware requiring the configured bearer token
async fn require_bearer(
    State(state): State<WebhookState>,
    request: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, Response> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            warn!("Missing bearer token on {}", request.uri().path());
            (StatusCode::UNAUTHORIZED, "Missing bearer token").into_response()
        })?;

    if !constant_time_eq(token.trim().as_bytes(), state.token.as_bytes()) {
        warn!("Invalid bearer token on {}", request.uri().path());
        return Err((StatusCode::UNAUTHORIZED, "Invalid bearer token").into_response());
    }

    Ok(next.run(request).await)
}

/// Middleware verifying a Selcom digest over the JSON body
///
/// Rejects with 401 when the timestamp is stale or unparsable, when any
/// top-level body field is left out of `Signed-Fields`, or when the digest
/// does not match.
async fn verify_digest(
    State(state): State<WebhookState>,
    request: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, Response> {
    let signature = {
        let headers = request.headers();
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        (
            header_str(TIMESTAMP_HEADER),
            header_str(SIGNED_FIELDS_HEADER),
            header_str(DIGEST_HEADER),
        )
    };

    let (Some(timestamp), Some(signed_fields), Some(digest)) = signature else {
        warn!("Missing Selcom signature headers");
        return Err((StatusCode::UNAUTHORIZED, "Missing signature").into_response());
    };

    if !timestamp_is_fresh(&timestamp, Utc::now()) {
        warn!("Rejected Selcom webhook with stale timestamp {}", timestamp);
        return Err((StatusCode::UNAUTHORIZED, "Stale or invalid timestamp").into_response());
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| {
            warn!("Failed to read request body: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid body").into_response()
        })?;

    let payload: Payload = serde_json::from_slice(&bytes).map_err(|e| {
        warn!("Webhook body is not a JSON object: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid JSON").into_response()
    })?;

    if !signs_every_field(&signed_fields, &payload) {
        warn!(
            "Selcom webhook leaves body fields unsigned (signed: {})",
            signed_fields
        );
        return Err((StatusCode::UNAUTHORIZED, "Unsigned fields").into_response());
    }

    if !state
        .signer
        .verify(&timestamp, &signed_fields, &payload, &digest)
    {
        warn!("Selcom webhook digest verification failed");
        return Err((StatusCode::UNAUTHORIZED, "Invalid signature").into_response());
    }

    debug!("Selcom webhook digest verified");

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

/// Every top-level key of `payload` is listed in `signed_fields`, and the
/// list is not empty
fn signs_every_field(signed_fields: &str, payload: &Payload) -> bool {
    let fields: Vec<&str> = signed_fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    !fields.is_empty() && payload.keys().all(|key| fields.contains(&key.as_str()))
}

async fn forward(state: &WebhookState, event: WebhookEvent) -> Result<(), StatusCode> {
    state.sender.send(event).await.map_err(|e| {
        warn!("Failed to send webhook event to channel: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

fn parse<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, StatusCode> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Failed to parse webhook event: {}", e);
        StatusCode::BAD_REQUEST
    })
}

/// Handle C2B validation requests
async fn handle_c2b_validation(
    State(state): State<WebhookState>,
    body: Bytes,
) -> Result<Json<WebhookAck>, StatusCode> {
    let event: C2bValidation = parse(&body)?;
    info!(
        "Received C2B validation: {} amount {}",
        event.transid, event.amount
    );

    let ack = WebhookAck::accepted(
        event.transid.clone(),
        event.reference.clone(),
        "Validation received",
    );
    forward(&state, WebhookEvent::C2bValidation(event)).await?;
    Ok(Json(ack))
}

/// Handle C2B result notifications
async fn handle_c2b_notification(
    State(state): State<WebhookState>,
    body: Bytes,
) -> Result<Json<WebhookAck>, StatusCode> {
    let event: C2bNotification = parse(&body)?;
    info!(
        "Received C2B notification: {} resultcode {}",
        event.transid, event.resultcode
    );

    let ack = WebhookAck::accepted(
        event.transid.clone(),
        Some(event.reference.clone()),
        "Notification received",
    );
    forward(&state, WebhookEvent::C2bNotification(event)).await?;
    Ok(Json(ack))
}

/// Handle checkout order updates
async fn handle_checkout(
    State(state): State<WebhookState>,
    body: Bytes,
) -> Result<Json<WebhookAck>, StatusCode> {
    let event: CheckoutNotification = parse(&body)?;
    info!(
        "Received checkout update: order {} resultcode {} status {:?}",
        event.order_id, event.resultcode, event.payment_status
    );

    let ack = WebhookAck::accepted(
        event.order_id.clone(),
        event.reference.clone(),
        "Order update received",
    );
    forward(&state, WebhookEvent::Checkout(event)).await?;
    Ok(Json(ack))
}

/// Create an Axum router for Selcom webhooks
///
/// C2B routes require the bearer token, the checkout route requires a valid
/// digest. Accepted events are sent to `sender`.
pub fn create_webhook_router(
    sender: mpsc::Sender<WebhookEvent>,
    token: String,
    signer: Signer,
) -> Router {
    let state = WebhookState {
        sender,
        token,
        signer,
    };

    let c2b = Router::new()
        .route(C2B_VALIDATION_PATH, post(handle_c2b_validation))
        .route(C2B_NOTIFICATION_PATH, post(handle_c2b_notification))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    let checkout = Router::new()
        .route(CHECKOUT_PATH, post(handle_checkout))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_digest));

    c2b.merge(checkout).with_state(state)
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::api::signer::{canonical_message, current_timestamp};
    use crate::config::Credential;

    const TOKEN: &str = "hook-token";

    fn router() -> (Router, mpsc::Receiver<WebhookEvent>) {
        let (sender, receiver) = mpsc::channel(8);
        let signer = Signer::new(Credential::new("k", "webhook-secret"));
        (
            create_webhook_router(sender, TOKEN.to_string(), signer),
            receiver,
        )
    }

    fn c2b_request(path: &str, auth: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn test_c2b_validation_accepted() {
        let (router, mut receiver) = router();
        let body = json!({
            "transid": "C2B1",
            "utilityref": "INV-77",
            "amount": 2500,
            "msisdn": "255700000000"
        })
        .to_string();

        let response = router
            .oneshot(c2b_request(
                C2B_VALIDATION_PATH,
                Some(&format!("Bearer {}", TOKEN)),
                &body,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let ack = body_json(response).await;
        assert_eq!(ack["resultcode"], "000");
        assert_eq!(ack["transid"], "C2B1");

        match receiver.recv().await.unwrap() {
            WebhookEvent::C2bValidation(event) => {
                assert_eq!(event.amount, 2500);
                assert_eq!(event.utilityref.as_deref(), Some("INV-77"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_c2b_requires_bearer() {
        let (router, _receiver) = router();
        let body = json!({"transid": "C2B1", "amount": 1}).to_string();

        let missing = router
            .clone()
            .oneshot(c2b_request(C2B_VALIDATION_PATH, None, &body))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = router
            .clone()
            .oneshot(c2b_request(
                C2B_NOTIFICATION_PATH,
                Some("Bearer nope"),
                &body,
            ))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let wrong_scheme = router
            .oneshot(c2b_request(
                C2B_VALIDATION_PATH,
                Some(&format!("Basic {}", TOKEN)),
                &body,
            ))
            .await
            .unwrap();
        assert_eq!(wrong_scheme.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_c2b_malformed_body() {
        let (router, _receiver) = router();
        let response = router
            .oneshot(c2b_request(
                C2B_NOTIFICATION_PATH,
                Some(&format!("Bearer {}", TOKEN)),
                "{\"transid\": 5",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    const CHECKOUT_FIELDS: &str = "order_id,payment_status,result,resultcode,transid";

    fn checkout_body() -> Payload {
        match json!({
            "transid": "T99",
            "order_id": "ORD-1",
            "result": "SUCCESS",
            "resultcode": "000",
            "payment_status": "COMPLETED"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn checkout_request(
        timestamp: &str,
        signed_fields: &str,
        body: &Payload,
        digest: &str,
    ) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(CHECKOUT_PATH)
            .header("content-type", "application/json")
            .header("Timestamp", timestamp)
            .header("Signed-Fields", signed_fields)
            .header("Digest", digest)
            .body(Body::from(Value::Object(body.clone()).to_string()))
            .unwrap()
    }

    /// Sign `fields` of `body` the way Selcom does
    fn signed_checkout(timestamp: &str, fields: &str, body: &Payload) -> Request<Body> {
        let fields_list: Vec<&str> = fields.split(',').filter(|f| !f.is_empty()).collect();
        let message = canonical_message(timestamp, &fields_list, body);
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, b"webhook-secret");
        let digest = STANDARD.encode(ring::hmac::sign(&key, message.as_bytes()).as_ref());
        checkout_request(timestamp, fields, body, &digest)
    }

    #[tokio::test]
    async fn test_checkout_digest_verified() {
        let (router, mut receiver) = router();
        let response = router
            .oneshot(signed_checkout(
                &current_timestamp(),
                CHECKOUT_FIELDS,
                &checkout_body(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["transid"], "ORD-1");

        match receiver.recv().await.unwrap() {
            WebhookEvent::Checkout(event) => {
                assert_eq!(event.order_id, "ORD-1");
                assert_eq!(event.payment_status.as_deref(), Some("COMPLETED"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_checkout_bad_digest_rejected() {
        let (router, mut receiver) = router();
        let response = router
            .oneshot(checkout_request(
                &current_timestamp(),
                CHECKOUT_FIELDS,
                &checkout_body(),
                "JUQvwwkvEEq8aLk3LGxGDHp0L/1NiU7lyW+A8h2Zhk4=",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_checkout_stale_timestamp_rejected() {
        let (router, mut receiver) = router();

        // Correctly signed, but replayed long after it was issued
        let response = router
            .clone()
            .oneshot(signed_checkout(
                "2019-01-01T00:00:00+00:00",
                CHECKOUT_FIELDS,
                &checkout_body(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let ahead = (Utc::now() + chrono::Duration::minutes(10))
            .to_rfc3339_opts(chrono::SecondsFormat::Micros, false);
        let response = router
            .oneshot(signed_checkout(&ahead, CHECKOUT_FIELDS, &checkout_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_checkout_unparsable_timestamp_rejected() {
        let (router, mut receiver) = router();
        let response = router
            .oneshot(signed_checkout(
                "not-a-timestamp",
                CHECKOUT_FIELDS,
                &checkout_body(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_checkout_unsigned_fields_rejected() {
        let (router, mut receiver) = router();
        let body = match json!({
            "order_id": "O1",
            "resultcode": "000",
            "payment_status": "COMPLETED"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        // Digest is valid for the listed field, the rest rides along unsigned
        let partial = router
            .clone()
            .oneshot(signed_checkout(&current_timestamp(), "order_id", &body))
            .await
            .unwrap();
        assert_eq!(partial.status(), StatusCode::UNAUTHORIZED);

        let empty = router
            .oneshot(signed_checkout(&current_timestamp(), "", &body))
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::UNAUTHORIZED);

        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_signs_every_field() {
        let body = checkout_body();
        assert!(signs_every_field(CHECKOUT_FIELDS, &body));
        assert!(signs_every_field(
            "transid, order_id,result,resultcode,payment_status,extra",
            &body
        ));
        assert!(!signs_every_field("order_id,transid", &body));
        assert!(!signs_every_field("", &body));
        assert!(!signs_every_field(",", &Payload::new()));
    }

    #[tokio::test]
    async fn test_checkout_without_headers_rejected() {
        let (router, _receiver) = router();
        let response = router
            .oneshot(c2b_request(
                CHECKOUT_PATH,
                Some(&format!("Bearer {}", TOKEN)),
                "{}",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
