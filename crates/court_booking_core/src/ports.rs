//! crates/court_booking_core/src/ports.rs
//!
//! Service contracts (traits) at the boundary of the booking core. The
//! core depends only on these traits, so the HTTP service can plug in a
//! real Postgres store while tests substitute an in-memory one.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    Court, NewPattern, NewReservation, PatternWithCourt, PaymentState, RecurrencePattern,
    Reservation, ReservationFilter, ReservationWithCourt,
};

//=========================================================================================
// Error Taxonomy
//=========================================================================================

/// The error taxonomy shared by every booking operation.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// Required input was missing or unusable. Carries the offending
    /// field names so the caller can surface field-level detail.
    #[error("missing or invalid fields: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// The (court, date, start time) slot is already booked.
    #[error("this time slot is already booked")]
    Conflict,

    /// A referenced court, reservation, or pattern does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The underlying store call failed. Not retried here; the caller
    /// decides whether the whole operation is safe to retry.
    #[error("storage error: {0}")]
    Store(String),
}

/// A convenience alias for `Result<T, BookingError>`.
pub type BookingResult<T> = Result<T, BookingError>;

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ReservationStore: Send + Sync {
    // --- Reservations ---

    /// Point lookup by (court, date, start time). Start times are
    /// matched at hour:minute precision.
    async fn find_by_slot(
        &self,
        court_id: i64,
        date: NaiveDate,
        start_time: &str,
    ) -> BookingResult<Option<Reservation>>;

    async fn find_by_id(&self, id: i64) -> BookingResult<Option<Reservation>>;

    /// All reservations for one court on one day.
    async fn list_for_day(&self, court_id: i64, date: NaiveDate)
        -> BookingResult<Vec<Reservation>>;

    /// Insert with a store-assigned id. The store enforces slot
    /// uniqueness and reports a duplicate as [`BookingError::Conflict`];
    /// that signal is authoritative, the pre-insert check is only a fast
    /// path.
    async fn insert(&self, draft: NewReservation) -> BookingResult<Reservation>;

    async fn update_payment(
        &self,
        id: i64,
        state: PaymentState,
        amount_paid: f64,
    ) -> BookingResult<Reservation>;

    async fn delete(&self, id: i64) -> BookingResult<()>;

    /// Filtered listing, newest date first then by start time, joined
    /// with the court display fields.
    async fn list(&self, filter: &ReservationFilter) -> BookingResult<Vec<ReservationWithCourt>>;

    // --- Recurring patterns ---

    async fn insert_pattern(&self, draft: NewPattern) -> BookingResult<RecurrencePattern>;

    async fn find_pattern(&self, id: i64) -> BookingResult<Option<RecurrencePattern>>;

    async fn delete_pattern(&self, id: i64) -> BookingResult<()>;

    /// Remove the pattern's generated occurrences with `date >= from`.
    /// Past occurrences stay as historical record. Returns the number of
    /// rows removed.
    async fn delete_future_instances(
        &self,
        pattern: &RecurrencePattern,
        from: NaiveDate,
    ) -> BookingResult<u64>;

    /// Active patterns ordered by weekday, then start time.
    async fn list_active_patterns(&self) -> BookingResult<Vec<PatternWithCourt>>;
}

#[async_trait]
pub trait CourtCatalog: Send + Sync {
    async fn find_court(&self, id: i64) -> BookingResult<Option<Court>>;

    /// Active courts ordered by category, then name.
    async fn list_active(&self) -> BookingResult<Vec<Court>>;

    /// Active courts of one category, ordered by name.
    async fn list_active_by_category(&self, category: &str) -> BookingResult<Vec<Court>>;
}

//=========================================================================================
// Clock Port
//=========================================================================================

/// Source of "today" for recurrence start defaults and teardown scoping.
/// Injected so date-sensitive behavior is testable.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The production clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}
