//! Wire data model shared with the Campus Connect API.

use serde::{Deserialize, Serialize};

/// Account record returned by the auth and profile endpoints.
///
/// ```json
/// {
///   "id": 7,
///   "name": "Priya Nair",
///   "email": "priya@college.edu",
///   "mobileNumber": "9876543210",
///   "department": "CSE",
///   "registrationNumber": "21CS042",
///   "year": 3,
///   "gender": "Female",
///   "roles": ["ROLE_USER"]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub mobile_number: String,
    pub department: String,
    pub registration_number: String,
    pub year: u32,
    pub gender: String,
    /// Role markers, e.g. `ROLE_USER` or `ROLE_ADMIN`.
    pub roles: Vec<String>,
}

/// Token plus account record issued by login and signup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Credentials for `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

/// New-account payload for `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub mobile_number: String,
    pub department: String,
    pub registration_number: String,
    pub year: u32,
    pub gender: String,
}

/// Catalog event as served by the public and admin endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub organizing_club: String,
    /// ISO-8601 date-time rendered as received.
    pub date_time: String,
    pub venue: String,
    pub poster_url: String,
    pub max_attendees: u32,
    /// Registration fee in major currency units; `0` means free.
    pub registration_price: f64,
    pub category_name: String,
    pub registered_attendees_count: u32,
}

impl Event {
    /// Seats still open. The server enforces the capacity invariant; the
    /// count is floored at zero in case a response briefly overshoots.
    pub fn spots_remaining(&self) -> u32 {
        self.max_attendees
            .saturating_sub(self.registered_attendees_count)
    }

    /// Whether registration requires a paid checkout.
    pub fn is_paid(&self) -> bool {
        self.registration_price > 0.0
    }
}

/// Payload for creating or updating an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub name: String,
    pub description: String,
    pub organizing_club: String,
    pub date_time: String,
    pub venue: String,
    pub poster_url: String,
    pub max_attendees: u32,
    pub registration_price: f64,
    pub category_id: u64,
}

/// Event category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub description: String,
}

/// Payload for creating or updating a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub description: String,
}

/// Response of the registration call. The order id correlates a paid
/// registration with a gateway checkout; the server answers `"FREE"`
/// (or omits the field) for free events.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrationOrder {
    #[serde(rename = "orderId", default)]
    pub order_id: Option<String>,
}

impl RegistrationOrder {
    /// The gateway order id when a checkout is actually required.
    pub fn payment_order(&self) -> Option<&str> {
        self.order_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != "FREE")
    }
}

/// Completion receipt posted by the checkout. Field names follow the
/// gateway contract and are forwarded to verification unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutReceipt {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

/// Response of the poster upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}
