//! HTTP API server for the node.
//!
//! Serves payment pages that forward customers to the gateway, receives the
//! gateway's payment notifications, and exposes the invoice ledger.

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Form, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use epay_core::{Currency, Language, PaymentOption, PaymentPage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use crate::ledger::{InvoiceEntry, LedgerError};
use crate::render;
use crate::state::NodeState;

// --- Request/response types ---

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub gateway_url: String,
    pub invoices: usize,
    pub uptime_secs: u64,
}

/// Parameters accepted by the payment page, from the query string or a form.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentPageParams {
    pub amount: Option<String>,
    pub description: Option<String>,
    pub invoice: Option<String>,
    pub language: Option<String>,
    pub currency: Option<String>,
    #[serde(rename = "type")]
    pub page: Option<String>,
    pub url_ok: Option<String>,
    pub url_cancel: Option<String>,
}

/// Fields posted by the gateway to the notification route.
#[derive(Debug, Default, Deserialize)]
pub struct NotifyForm {
    #[serde(default)]
    pub encoded: String,
    #[serde(default)]
    pub checksum: String,
}

impl NotifyForm {
    /// Field-wise merge where non-empty values in `self` win.
    fn or(self, fallback: NotifyForm) -> NotifyForm {
        NotifyForm {
            encoded: if self.encoded.is_empty() {
                fallback.encoded
            } else {
                self.encoded
            },
            checksum: if self.checksum.is_empty() {
                fallback.checksum
            } else {
                self.checksum
            },
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn bad_request(error: impl ToString) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, error)
}

// --- Handlers ---

async fn handle_health(State(state): State<Arc<NodeState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        gateway_url: state.client.url().to_string(),
        invoices: state.ledger.len(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn handle_payment_page_query(
    State(state): State<Arc<NodeState>>,
    Query(params): Query<PaymentPageParams>,
) -> Result<Html<String>, ApiError> {
    payment_page(&state, params)
}

async fn handle_payment_page_form(
    State(state): State<Arc<NodeState>>,
    Form(params): Form<PaymentPageParams>,
) -> Result<Html<String>, ApiError> {
    payment_page(&state, params)
}

fn payment_page(state: &NodeState, params: PaymentPageParams) -> Result<Html<String>, ApiError> {
    let amount = non_empty(params.amount.as_deref())
        .and_then(|s| Decimal::from_str(s).ok())
        .ok_or_else(|| bad_request("amount is invalid or missing"))?;
    let description = non_empty(params.description.as_deref())
        .ok_or_else(|| bad_request("description is empty"))?;
    let invoice = non_empty(params.invoice.as_deref())
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| bad_request("invoice is invalid or missing"))?;

    let mut options = vec![PaymentOption::Currency(state.default_currency)];
    if let Some(language) = non_empty(params.language.as_deref()) {
        options.push(PaymentOption::Language(
            Language::from_str(language).map_err(bad_request)?,
        ));
    }
    if let Some(currency) = non_empty(params.currency.as_deref()) {
        options.push(PaymentOption::Currency(
            Currency::from_str(currency).map_err(bad_request)?,
        ));
    }
    if let Some(page) = non_empty(params.page.as_deref()) {
        options.push(PaymentOption::Page(
            PaymentPage::from_str(page).map_err(bad_request)?,
        ));
    }
    if let Some(url) = non_empty(params.url_ok.as_deref()) {
        options.push(PaymentOption::UrlOk(url.to_string()));
    }
    if let Some(url) = non_empty(params.url_cancel.as_deref()) {
        options.push(PaymentOption::UrlCancel(url.to_string()));
    }

    let request = state
        .client
        .payment_request(amount, description, invoice)
        .options(options)
        .build()
        .map_err(bad_request)?;
    state.client.sign_request(&request).map_err(|e| {
        tracing::warn!(invoice, error = %e, "rejected payment request");
        bad_request(e)
    })?;
    state.ledger.register(&request).map_err(|e| {
        let status = match e {
            LedgerError::Settled(_) => StatusCode::CONFLICT,
            LedgerError::Full(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        api_error(status, e)
    })?;

    tracing::info!(invoice, %amount, page = %request.page(), "serving payment page");
    Ok(Html(render::payment_form(&request)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// The gateway expects a plain-text reply with status 200 whatever it sent.
/// Values are read from the form body and then the query string; anything
/// unreadable counts as missing and fails the checksum check.
async fn handle_notify(
    State(state): State<Arc<NodeState>>,
    query: Result<Query<NotifyForm>, QueryRejection>,
    form: Result<Form<NotifyForm>, FormRejection>,
) -> impl IntoResponse {
    let query = query.map(|Query(q)| q).unwrap_or_else(|rejection| {
        tracing::debug!(error = %rejection, "ignoring notification query string");
        NotifyForm::default()
    });
    let body = form.map(|Form(f)| f).unwrap_or_else(|rejection| {
        tracing::debug!(error = %rejection, "ignoring notification body");
        NotifyForm::default()
    });
    let fields = body.or(query);

    let reply = state
        .client
        .handle_callback(&fields.encoded, &fields.checksum, &state.ledger);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        reply.body(),
    )
}

async fn handle_invoice(
    State(state): State<Arc<NodeState>>,
    Path(invoice): Path<u64>,
) -> Result<Json<InvoiceEntry>, ApiError> {
    state.ledger.get(invoice).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("invoice {} not found", invoice),
            }),
        )
    })
}

// --- Server ---

pub fn build_router(state: Arc<NodeState>) -> Router {
    let notify_path = state.notify_path.clone();
    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/invoices/{invoice}", get(handle_invoice))
        .route(
            "/payments/request",
            get(handle_payment_page_query).post(handle_payment_page_form),
        )
        .route(&notify_path, post(handle_notify))
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    state: Arc<NodeState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let notify_path = state.notify_path.clone();
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, %notify_path, "HTTP API server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DEFAULT_MAX_INVOICES;
    use epay_core::{checksum, EpayClient, Payment, PaymentStatus};

    const SECRET: &str = "node-secret";

    fn limited_state(max_invoices: usize) -> Arc<NodeState> {
        let client = EpayClient::builder("D123456789", SECRET)
            .demo()
            .build()
            .unwrap();
        Arc::new(NodeState::new(
            client,
            Currency::EUR,
            "/epay/notify".into(),
            max_invoices,
        ))
    }

    fn test_state() -> Arc<NodeState> {
        limited_state(DEFAULT_MAX_INVOICES)
    }

    async fn spawn(state: Arc<NodeState>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn signed_notification(payment: &Payment) -> [(&'static str, String); 2] {
        let encoded = payment.encode();
        let checksum = checksum::sign(encoded.as_bytes(), SECRET.as_bytes());
        [("encoded", encoded), ("checksum", checksum)]
    }

    #[tokio::test]
    async fn test_health() {
        let addr = spawn(test_state()).await;
        let body: serde_json::Value = reqwest::get(format!("http://{}/api/v1/health", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["gateway_url"], "https://demo.epay.bg/");
    }

    #[tokio::test]
    async fn test_payment_page_get() {
        let state = test_state();
        let addr = spawn(state.clone()).await;
        let resp = reqwest::get(format!(
            "http://{}/payments/request?amount=12.5&description=Order%2055&invoice=55&currency=bgn",
            addr
        ))
        .await
        .unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html"));

        let html = resp.text().await.unwrap();
        assert!(html.contains(r#"action="https://demo.epay.bg/""#));
        assert!(html.contains(r#"name="PAGE" value="credit_paydirect""#));
        assert!(html.contains(r#"name="CHECKSUM""#));

        let entry = state.ledger.get(55).unwrap();
        assert_eq!(entry.currency, Some(Currency::BGN));
        assert_eq!(entry.amount, Decimal::new(125, 1));
    }

    #[tokio::test]
    async fn test_payment_page_form_login() {
        let addr = spawn(test_state()).await;
        let resp = reqwest::Client::new()
            .post(format!("http://{}/payments/request", addr))
            .form(&[
                ("amount", "10"),
                ("description", "Order"),
                ("invoice", "3"),
                ("type", "request"),
                ("language", "bg"),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let html = resp.text().await.unwrap();
        assert!(html.contains(r#"name="PAGE" value="paylogin""#));
    }

    #[tokio::test]
    async fn test_payment_page_rejects_bad_input() {
        let addr = spawn(test_state()).await;
        let cases = [
            "description=Order&invoice=1",
            "amount=abc&description=Order&invoice=1",
            "amount=10&invoice=1",
            "amount=10&description=&invoice=1",
            "amount=10&description=Order",
            "amount=10&description=Order&invoice=1&currency=jpy",
            "amount=10&description=Order&invoice=1&type=wire",
            "amount=10&description=Order&invoice=0",
            "amount=0.001&description=Order&invoice=1",
            "amount=10&description=Order&invoice=1&url_ok=ftp://x",
        ];
        for query in cases {
            let resp = reqwest::get(format!("http://{}/payments/request?{}", addr, query))
                .await
                .unwrap();
            assert_eq!(resp.status(), 400, "query: {}", query);
            let body: serde_json::Value = resp.json().await.unwrap();
            assert!(body["error"].is_string(), "query: {}", query);
        }
    }

    #[tokio::test]
    async fn test_notify_records_payment() {
        let state = test_state();
        let addr = spawn(state.clone()).await;
        let http = reqwest::Client::new();

        http.get(format!(
            "http://{}/payments/request?amount=10&description=Order&invoice=55",
            addr
        ))
        .send()
        .await
        .unwrap();

        let payment = Payment {
            invoice: 55,
            status: PaymentStatus::Paid,
            stan: 99,
            bcode: "ABC".into(),
            ..Payment::default()
        };
        let resp = http
            .post(format!("http://{}/epay/notify", addr))
            .form(&signed_notification(&payment))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "INVOICE=55:STATUS=OK\n");

        let body: serde_json::Value = http
            .get(format!("http://{}/api/v1/invoices/55", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "PAID");
        assert_eq!(body["stan"], 99);
    }

    #[tokio::test]
    async fn test_notify_unknown_invoice() {
        let addr = spawn(test_state()).await;
        let payment = Payment {
            invoice: 404,
            status: PaymentStatus::Paid,
            ..Payment::default()
        };
        let resp = reqwest::Client::new()
            .post(format!("http://{}/epay/notify", addr))
            .form(&signed_notification(&payment))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.text().await.unwrap(), "INVOICE=404:STATUS=NO\n");
    }

    #[tokio::test]
    async fn test_notify_bad_checksum() {
        let addr = spawn(test_state()).await;
        let payment = Payment {
            invoice: 55,
            status: PaymentStatus::Paid,
            ..Payment::default()
        };
        let resp = reqwest::Client::new()
            .post(format!("http://{}/epay/notify", addr))
            .form(&[("encoded", payment.encode()), ("checksum", "0".repeat(40))])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "INVOICE=0:STATUS=ERR\n");
    }

    #[tokio::test]
    async fn test_notify_without_form_content_type() {
        let addr = spawn(test_state()).await;
        let http = reqwest::Client::new();

        let resp = http
            .post(format!("http://{}/epay/notify", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "INVOICE=0:STATUS=ERR\n");

        let resp = http
            .post(format!("http://{}/epay/notify", addr))
            .body("encoded=abc&checksum=def")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(resp.text().await.unwrap(), "INVOICE=0:STATUS=ERR\n");
    }

    #[tokio::test]
    async fn test_notify_duplicate_field() {
        let addr = spawn(test_state()).await;
        let resp = reqwest::Client::new()
            .post(format!("http://{}/epay/notify", addr))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("encoded=a&encoded=b&checksum=c")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "INVOICE=0:STATUS=ERR\n");
    }

    #[tokio::test]
    async fn test_notify_query_parameters() {
        let state = test_state();
        let addr = spawn(state.clone()).await;
        let http = reqwest::Client::new();

        http.get(format!(
            "http://{}/payments/request?amount=10&description=Order&invoice=56",
            addr
        ))
        .send()
        .await
        .unwrap();

        let payment = Payment {
            invoice: 56,
            status: PaymentStatus::Paid,
            ..Payment::default()
        };
        let resp = http
            .post(format!("http://{}/epay/notify", addr))
            .query(&signed_notification(&payment))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "INVOICE=56:STATUS=OK\n");
        assert_eq!(
            state.ledger.get(56).unwrap().status,
            Some(PaymentStatus::Paid)
        );
    }

    #[tokio::test]
    async fn test_payment_page_reported_invoice_conflict() {
        let state = test_state();
        let addr = spawn(state.clone()).await;
        let http = reqwest::Client::new();
        let page = |amount: &str| {
            format!(
                "http://{}/payments/request?amount={}&description=Order&invoice=55",
                addr, amount
            )
        };

        let resp = http.get(page("0.01")).send().await.unwrap();
        assert_eq!(resp.status(), 200);

        let payment = Payment {
            invoice: 55,
            status: PaymentStatus::Paid,
            ..Payment::default()
        };
        http.post(format!("http://{}/epay/notify", addr))
            .form(&signed_notification(&payment))
            .send()
            .await
            .unwrap();

        let resp = http.get(page("500")).send().await.unwrap();
        assert_eq!(resp.status(), 409);
        let entry = state.ledger.get(55).unwrap();
        assert_eq!(entry.amount, Decimal::new(1, 2));
        assert_eq!(entry.status, Some(PaymentStatus::Paid));
    }

    #[tokio::test]
    async fn test_payment_page_ledger_full() {
        let addr = spawn(limited_state(1)).await;
        let page = |invoice: u64| {
            format!(
                "http://{}/payments/request?amount=10&description=Order&invoice={}",
                addr, invoice
            )
        };

        assert_eq!(reqwest::get(page(1)).await.unwrap().status(), 200);
        let resp = reqwest::get(page(2)).await.unwrap();
        assert_eq!(resp.status(), 503);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("full"));
        // Already known invoices are still served.
        assert_eq!(reqwest::get(page(1)).await.unwrap().status(), 200);
    }

    #[tokio::test]
    async fn test_invoice_not_found() {
        let addr = spawn(test_state()).await;
        let resp = reqwest::get(format!("http://{}/api/v1/invoices/1", addr))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }
}
