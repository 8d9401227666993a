//! Loopback driver for the hosted checkout page.
//!
//! The gateway's hosted checkout completes by redirecting the browser to
//! a `callback_url` with the payment receipt. This driver binds a
//! single-shot HTTP server on the loopback interface, prints the hosted
//! checkout URL, and resolves on the first callback or when the deadline
//! expires.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use tokio::{net::TcpListener, sync::oneshot};
use url::Url;

use crate::{
    checkout::{Checkout, CheckoutRequest},
    model::CheckoutReceipt,
};

const CHECKOUT_PAGE: &str = "https://api.razorpay.com/v1/checkout/embedded";

/// Checkout driver that collects the completion receipt over loopback.
pub struct LoopbackCheckout {
    deadline: Duration,
    verbose: bool,
}

impl LoopbackCheckout {
    pub fn new(deadline: Duration, verbose: bool) -> Self {
        Self { deadline, verbose }
    }

    /// Serve the callback endpoint on `listener` until the first receipt
    /// arrives or the deadline passes.
    async fn collect_on(
        &self,
        listener: TcpListener,
        request: &CheckoutRequest,
    ) -> Result<Option<CheckoutReceipt>> {
        let addr = listener.local_addr()?;
        let callback_url = format!("http://{addr}/callback");
        let page = checkout_page_url(request, &callback_url)?;

        let (tx, rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            tx: std::sync::Mutex::new(Some(tx)),
        });
        let app = Router::new()
            .route("/callback", get(complete_query).post(complete_form))
            .with_state(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        if self.verbose {
            println!("[checkout] callback server listening on {addr}");
        }

        println!(
            "Order {}: pay {:.2} {} in your browser:",
            request.order_id,
            request.amount as f64 / 100.0,
            request.currency
        );
        println!("  {page}");
        println!(
            "Waiting up to {}s for the payment gateway callback...",
            self.deadline.as_secs()
        );

        // First receipt wins; the deadline turns a dismissed checkout
        // into a clean "no payment" result instead of hanging.
        let result = tokio::time::timeout(self.deadline, rx).await;
        let _ = shutdown_tx.send(());
        let _ = server.await;
        match result {
            Ok(Ok(receipt)) => Ok(Some(receipt)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Checkout for LoopbackCheckout {
    async fn collect(&self, request: &CheckoutRequest) -> Result<Option<CheckoutReceipt>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        self.collect_on(listener, request).await
    }
}

/// Build the hosted checkout URL for `request` with our callback wired in.
fn checkout_page_url(request: &CheckoutRequest, callback_url: &str) -> Result<Url> {
    let amount = request.amount.to_string();
    Ok(Url::parse_with_params(
        CHECKOUT_PAGE,
        &[
            ("key_id", request.key.as_str()),
            ("order_id", request.order_id.as_str()),
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("name", request.merchant.as_str()),
            ("description", request.description.as_str()),
            ("prefill[name]", request.prefill.name.as_str()),
            ("prefill[email]", request.prefill.email.as_str()),
            ("prefill[contact]", request.prefill.contact.as_str()),
            ("theme[color]", request.theme_color.as_str()),
            ("callback_url", callback_url),
        ],
    )?)
}

struct CallbackState {
    tx: std::sync::Mutex<Option<oneshot::Sender<CheckoutReceipt>>>,
}

impl CallbackState {
    fn complete(&self, receipt: CheckoutReceipt) -> Html<&'static str> {
        match self.tx.lock().unwrap().take() {
            Some(tx) => {
                let _ = tx.send(receipt);
                Html("<h1>Payment received</h1><p>Return to your terminal.</p>")
            }
            None => Html("<h1>Already processed</h1>"),
        }
    }
}

/// Gateway redirect via GET with the receipt in the query string.
async fn complete_query(
    State(state): State<Arc<CallbackState>>,
    Query(receipt): Query<CheckoutReceipt>,
) -> Html<&'static str> {
    state.complete(receipt)
}

/// Gateway redirect via POST with the receipt as form fields.
async fn complete_form(
    State(state): State<Arc<CallbackState>>,
    axum::Form(receipt): axum::Form<CheckoutReceipt>,
) -> Html<&'static str> {
    state.complete(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::Prefill;
    use tokio::time::sleep;

    fn sample_request() -> CheckoutRequest {
        CheckoutRequest {
            key: "rzp_test_abc".into(),
            amount: 50_000,
            currency: "INR".into(),
            merchant: "Campus Connect".into(),
            description: "Registration for Hack Night".into(),
            order_id: "order_abc".into(),
            prefill: Prefill {
                name: "Priya Nair".into(),
                email: "priya@college.edu".into(),
                contact: "9876543210".into(),
            },
            theme_color: "#7c3aed".into(),
        }
    }

    fn receipt_form() -> [(&'static str, &'static str); 3] {
        [
            ("razorpay_payment_id", "pay_123"),
            ("razorpay_order_id", "order_abc"),
            ("razorpay_signature", "sig_456"),
        ]
    }

    #[test]
    fn page_url_carries_order_and_callback() {
        let url = checkout_page_url(&sample_request(), "http://127.0.0.1:9999/callback").unwrap();
        let s = url.as_str();
        assert!(s.starts_with(CHECKOUT_PAGE));
        assert!(s.contains("order_id=order_abc"));
        assert!(s.contains("amount=50000"));
        assert!(s.contains("key_id=rzp_test_abc"));
        assert!(s.contains("callback_url=http%3A%2F%2F127.0.0.1%3A9999%2Fcallback"));
    }

    #[tokio::test]
    async fn resolves_on_post_callback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let checkout = LoopbackCheckout::new(Duration::from_secs(5), false);
        let request = sample_request();
        let handle =
            tokio::spawn(async move { checkout.collect_on(listener, &request).await });

        sleep(Duration::from_millis(100)).await;
        let resp = reqwest::Client::new()
            .post(format!("http://{addr}/callback"))
            .form(&receipt_form())
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert!(resp.text().await.unwrap().contains("Payment received"));

        let receipt = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(receipt.razorpay_payment_id, "pay_123");
        assert_eq!(receipt.razorpay_order_id, "order_abc");
        assert_eq!(receipt.razorpay_signature, "sig_456");
    }

    #[tokio::test]
    async fn resolves_on_get_callback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let checkout = LoopbackCheckout::new(Duration::from_secs(5), false);
        let request = sample_request();
        let handle =
            tokio::spawn(async move { checkout.collect_on(listener, &request).await });

        sleep(Duration::from_millis(100)).await;
        let url = format!(
            "http://{addr}/callback?razorpay_payment_id=pay_123&razorpay_order_id=order_abc&razorpay_signature=sig_456"
        );
        let resp = reqwest::get(&url).await.unwrap();
        assert!(resp.status().is_success());

        let receipt = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(receipt.razorpay_order_id, "order_abc");
    }

    #[tokio::test]
    async fn times_out_as_dismissed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let checkout = LoopbackCheckout::new(Duration::from_millis(200), false);
        let request = sample_request();
        let result = checkout.collect_on(listener, &request).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn second_callback_is_ignored() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let checkout = LoopbackCheckout::new(Duration::from_secs(5), false);
        let request = sample_request();
        let handle =
            tokio::spawn(async move { checkout.collect_on(listener, &request).await });

        sleep(Duration::from_millis(100)).await;
        let client = reqwest::Client::new();
        let first = client
            .post(format!("http://{addr}/callback"))
            .form(&receipt_form())
            .send()
            .await
            .unwrap();
        assert!(first.text().await.unwrap().contains("Payment received"));
        // the collector may shut the server down right after the first
        // receipt; a second delivery either misses or is told so
        if let Ok(second) = client
            .post(format!("http://{addr}/callback"))
            .form(&receipt_form())
            .send()
            .await
        {
            let body = second.text().await.unwrap_or_default();
            assert!(body.contains("Already processed") || body.is_empty());
        }

        let receipt = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(receipt.razorpay_payment_id, "pay_123");
    }
}
