//! crates/court_booking_core/src/domain.rs
//!
//! Core data structures for courts, reservations, and recurring booking
//! patterns. These structs are independent of the HTTP layer and of any
//! particular database.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A bookable court. Rows are owned by catalog management; the booking
/// core only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Court {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub hourly_price: f64,
    pub active: bool,
}

/// How much of a reservation's total has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Full,
    Deposit,
    Pending,
    Complimentary,
}

impl PaymentState {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentState::Full => "full",
            PaymentState::Deposit => "deposit",
            PaymentState::Pending => "pending",
            PaymentState::Complimentary => "complimentary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(PaymentState::Full),
            "deposit" => Some(PaymentState::Deposit),
            "pending" => Some(PaymentState::Pending),
            "complimentary" => Some(PaymentState::Complimentary),
            _ => None,
        }
    }

    /// Amount considered paid for a reservation with the given total.
    /// A deposit is half the total, rounded to the nearest whole unit.
    pub fn amount_paid(self, total: f64) -> f64 {
        match self {
            PaymentState::Full => total,
            PaymentState::Deposit => (total * 0.5).round(),
            PaymentState::Pending | PaymentState::Complimentary => 0.0,
        }
    }
}

/// Which path created a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationKind {
    Customer,
    AdminManual,
    RecurringInstance,
}

impl ReservationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationKind::Customer => "customer",
            ReservationKind::AdminManual => "admin_manual",
            ReservationKind::RecurringInstance => "recurring_instance",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(ReservationKind::Customer),
            "admin_manual" => Some(ReservationKind::AdminManual),
            "recurring_instance" => Some(ReservationKind::RecurringInstance),
            _ => None,
        }
    }
}

/// One booked slot. Clock fields are stored as timezone-naive strings;
/// `start_time` may carry seconds depending on where it came from, so
/// comparisons go through [`crate::slots::to_hhmm`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub court_id: i64,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub client_name: String,
    pub client_contact: String,
    pub payment_state: PaymentState,
    pub amount_due: f64,
    pub amount_paid: f64,
    pub kind: ReservationKind,
    pub admin_notes: Option<String>,
    /// Set on recurring instances; points at the owning pattern row.
    pub pattern_id: Option<i64>,
}

/// A reservation draft, ready to insert. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub court_id: i64,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub client_name: String,
    pub client_contact: String,
    pub payment_state: PaymentState,
    pub amount_due: f64,
    pub amount_paid: f64,
    pub kind: ReservationKind,
    pub admin_notes: Option<String>,
    pub pattern_id: Option<i64>,
}

/// A weekly recurring booking pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub id: i64,
    pub court_id: i64,
    pub client_name: String,
    pub client_contact: String,
    /// 0 = Sunday .. 6 = Saturday. Always recomputed from `start_date`.
    pub weekday: u8,
    pub start_time: String,
    pub start_date: NaiveDate,
    pub notes: Option<String>,
    pub active: bool,
}

/// A pattern draft, ready to insert.
#[derive(Debug, Clone)]
pub struct NewPattern {
    pub court_id: i64,
    pub client_name: String,
    pub client_contact: String,
    pub weekday: u8,
    pub start_time: String,
    pub start_date: NaiveDate,
    pub notes: Option<String>,
    pub active: bool,
}

/// One slot of the daily availability grid.
#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub time: String,
    pub available: bool,
}

/// A reservation joined with the minimal court fields the admin
/// dashboard displays.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationWithCourt {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub court_name: String,
    pub court_category: String,
}

/// A pattern joined with the court name, for the recurring listing.
#[derive(Debug, Clone, Serialize)]
pub struct PatternWithCourt {
    #[serde(flatten)]
    pub pattern: RecurrencePattern,
    pub court_name: String,
}

/// Filters accepted by the reservation listing.
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub date: Option<NaiveDate>,
    pub court_id: Option<i64>,
}

/// Result of expanding a recurring pattern: the persisted pattern plus
/// the dates that were generated and the dates that collided with an
/// existing booking. A non-empty `failed` list is an expected operating
/// condition, not an error.
#[derive(Debug, Clone)]
pub struct RecurrenceOutcome {
    pub pattern: RecurrencePattern,
    pub generated: Vec<NaiveDate>,
    pub failed: Vec<NaiveDate>,
}

/// Input to customer reservation admission. Fields arrive from an
/// untrusted caller, so everything is optional until validated.
#[derive(Debug, Clone, Default)]
pub struct CreateReservation {
    pub court_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub client_name: Option<String>,
    pub client_contact: Option<String>,
    pub payment_state: Option<PaymentState>,
}

/// Input to admin-manual reservation admission.
#[derive(Debug, Clone, Default)]
pub struct CreateManualReservation {
    pub court_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub client_name: Option<String>,
    pub client_contact: Option<String>,
    pub admin_notes: Option<String>,
}

/// Input to recurring pattern creation. `weekday` must be present but is
/// never trusted; the service recomputes it from the start date.
#[derive(Debug, Clone, Default)]
pub struct CreateRecurring {
    pub court_id: Option<i64>,
    pub client_name: Option<String>,
    pub client_contact: Option<String>,
    pub weekday: Option<u8>,
    pub start_time: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub admin_notes: Option<String>,
}
