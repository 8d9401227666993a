//! Registration orchestration and the paid-checkout state machine.

use anyhow::{anyhow, ensure, Result};
use async_trait::async_trait;

use crate::{
    api::{Api, ApiError},
    config::Settings,
    model::{CheckoutReceipt, Event},
    session::Session,
};

/// Merchant display name shown on the checkout page.
pub const MERCHANT_NAME: &str = "Campus Connect";
/// Accent color handed to the checkout theme.
pub const THEME_COLOR: &str = "#7c3aed";

/// Contact details prefilled into the checkout form.
#[derive(Debug, Clone, PartialEq)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// Options the external checkout is opened with.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    /// Gateway key id.
    pub key: String,
    /// Amount in minor currency units (price × 100).
    pub amount: u64,
    pub currency: String,
    pub merchant: String,
    pub description: String,
    pub order_id: String,
    pub prefill: Prefill,
    pub theme_color: String,
}

/// Driver for the external checkout. `collect` resolves at most once per
/// attempt: `Some` with the completion receipt, or `None` when the
/// checkout was dismissed or timed out without a callback.
#[async_trait]
pub trait Checkout {
    async fn collect(&self, request: &CheckoutRequest) -> Result<Option<CheckoutReceipt>>;
}

/// Terminal result of one registration attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No session; nothing was sent to the server.
    LoginRequired,
    /// No spots remaining; nothing was sent to the server.
    EventFull,
    /// Free event registered.
    FreeConfirmed,
    /// Paid event registered and the payment verified.
    PaidConfirmed,
    /// The registration call itself failed; no order exists.
    RegistrationFailed(String),
    /// Verification failed after checkout; funds may have moved.
    PaymentFailed(String),
    /// Checkout closed without a completion callback; no payment
    /// captured, retry by registering again.
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Registering,
    AwaitingPayment,
}

/// One registration attempt at a time.
///
/// ```text
/// IDLE -> REGISTERING -> (FREE_CONFIRMED | AWAITING_PAYMENT)
///                     -> (PAID_CONFIRMED | PAYMENT_FAILED | DISMISSED)
/// ```
pub struct RegistrationFlow {
    phase: Phase,
}

impl RegistrationFlow {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    /// Run the flow for `event`. Exactly one registration call is issued
    /// per invocation; a second trigger while an attempt is in flight is
    /// rejected before reaching the server.
    pub async fn run(
        &mut self,
        api: &Api,
        session: Option<&Session>,
        checkout: &dyn Checkout,
        cfg: &Settings,
        event: &Event,
    ) -> Result<Outcome> {
        ensure!(
            self.phase == Phase::Idle,
            "registration already in progress"
        );
        // Both short-circuits stay local: no server call is made.
        let Some(session) = session else {
            return Ok(Outcome::LoginRequired);
        };
        if event.spots_remaining() == 0 {
            return Ok(Outcome::EventFull);
        }

        self.phase = Phase::Registering;
        let order = match api.register(event.id).await {
            Ok(order) => order,
            Err(ApiError::Unauthorized) => {
                self.phase = Phase::Idle;
                return Err(ApiError::Unauthorized.into());
            }
            Err(err) => {
                self.phase = Phase::Idle;
                return Ok(Outcome::RegistrationFailed(err.to_string()));
            }
        };

        // Free events (or a missing order id) are already confirmed.
        let order_id = match (event.is_paid(), order.payment_order()) {
            (true, Some(id)) => id.to_string(),
            _ => {
                self.phase = Phase::Idle;
                return Ok(Outcome::FreeConfirmed);
            }
        };

        let Some(key) = cfg.checkout_key_id.clone() else {
            self.phase = Phase::Idle;
            return Err(anyhow!(
                "CHECKOUT_KEY_ID is not configured; cannot open checkout for a paid event"
            ));
        };
        let request = CheckoutRequest {
            key,
            amount: to_minor_units(event.registration_price),
            currency: cfg.currency.clone(),
            merchant: MERCHANT_NAME.into(),
            description: format!("Registration for {}", event.name),
            order_id,
            prefill: Prefill {
                name: session.user.name.clone(),
                email: session.user.email.clone(),
                contact: session.user.mobile_number.clone(),
            },
            theme_color: THEME_COLOR.into(),
        };

        self.phase = Phase::AwaitingPayment;
        let receipt = match checkout.collect(&request).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                self.phase = Phase::Idle;
                return Ok(Outcome::Dismissed);
            }
            Err(err) => {
                self.phase = Phase::Idle;
                return Err(err);
            }
        };

        // The receipt triple goes to verification exactly as received.
        let outcome = match api.verify_payment(&receipt).await {
            Ok(()) => Outcome::PaidConfirmed,
            Err(err) => Outcome::PaymentFailed(err.to_string()),
        };
        self.phase = Phase::Idle;
        Ok(outcome)
    }
}

impl Default for RegistrationFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a price in major units to the gateway's minor units.
fn to_minor_units(price: f64) -> u64 {
    (price * 100.0).round() as u64
}
