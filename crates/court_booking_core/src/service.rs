//! crates/court_booking_core/src/service.rs
//!
//! The booking service: slot availability, reservation admission (customer
//! and admin-manual paths), weekly recurrence expansion and teardown,
//! payment updates, and the listings the admin dashboard reads.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use tracing::warn;

use crate::domain::{
    Court, CreateManualReservation, CreateRecurring, CreateReservation, NewPattern,
    NewReservation, PatternWithCourt, PaymentState, RecurrenceOutcome, Reservation,
    ReservationFilter, ReservationKind, ReservationWithCourt, SlotStatus,
};
use crate::ports::{BookingError, BookingResult, Clock, CourtCatalog, ReservationStore};
use crate::slots;

/// Weekly occurrences generated for a new pattern (about three months).
const WEEKS_GENERATED: usize = 12;

/// Marker appended to the client name of generated occurrences.
const RECURRING_SUFFIX: &str = " (Fijo)";

/// Note tag linking a generated occurrence back to its pattern.
fn pattern_tag(pattern_id: i64) -> String {
    format!("patrón recurrente #{pattern_id}")
}

fn require<T>(value: Option<T>, name: &str, missing: &mut Vec<String>) -> Option<T> {
    if value.is_none() {
        missing.push(name.to_string());
    }
    value
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// All booking operations behind one facade. Holds no state of its own;
/// every request is an independent unit of work against the injected
/// store and catalog.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn ReservationStore>,
    catalog: Arc<dyn CourtCatalog>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        catalog: Arc<dyn CourtCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
        }
    }

    //=====================================================================================
    // Slot Calendar
    //=====================================================================================

    /// The fixed daily window for one court, each slot flagged free or
    /// taken. Read-only; also used as the pre-insert check by admission.
    pub async fn check_availability(
        &self,
        court_id: i64,
        date: NaiveDate,
    ) -> BookingResult<Vec<SlotStatus>> {
        let day = self.store.list_for_day(court_id, date).await?;
        let statuses = slots::slot_times()
            .into_iter()
            .map(|time| {
                let taken = day
                    .iter()
                    .any(|r| slots::to_hhmm(&r.start_time) == time);
                SlotStatus {
                    available: !taken,
                    time,
                }
            })
            .collect();
        Ok(statuses)
    }

    //=====================================================================================
    // Reservation Admission
    //=====================================================================================

    /// Customer-initiated admission. Requires contact details and an
    /// up-front payment state (full or deposit).
    pub async fn create_reservation(
        &self,
        req: CreateReservation,
    ) -> BookingResult<Reservation> {
        let mut missing = Vec::new();
        let court_id = require(req.court_id, "court_id", &mut missing);
        let date = require(req.date, "date", &mut missing);
        let start_time = require(non_empty(req.start_time), "start_time", &mut missing);
        let client_name = require(non_empty(req.client_name), "client_name", &mut missing);
        let client_contact =
            require(non_empty(req.client_contact), "client_contact", &mut missing);
        let payment_state = require(req.payment_state, "payment_state", &mut missing);

        let (
            Some(court_id),
            Some(date),
            Some(start_time),
            Some(client_name),
            Some(client_contact),
            Some(payment_state),
        ) = (
            court_id,
            date,
            start_time,
            client_name,
            client_contact,
            payment_state,
        )
        else {
            return Err(BookingError::Validation(missing));
        };

        if !matches!(payment_state, PaymentState::Full | PaymentState::Deposit) {
            return Err(BookingError::Validation(vec!["payment_state".to_string()]));
        }

        let court = self
            .catalog
            .find_court(court_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("court {court_id}")))?;

        let start_time = slots::to_hhmm(start_time.trim()).to_string();
        let end_time = slots::slot_end(&start_time)
            .ok_or_else(|| BookingError::Validation(vec!["start_time".to_string()]))?;

        let amount_due = court.hourly_price;
        let amount_paid = payment_state.amount_paid(amount_due);

        self.admit(NewReservation {
            court_id,
            date,
            start_time,
            end_time,
            client_name,
            client_contact,
            payment_state,
            amount_due,
            amount_paid,
            kind: ReservationKind::Customer,
            admin_notes: None,
            pattern_id: None,
        })
        .await
    }

    /// Admin-manual admission. Only a client name is required; the slot
    /// is granted complimentary with nothing due.
    pub async fn create_manual_reservation(
        &self,
        req: CreateManualReservation,
    ) -> BookingResult<Reservation> {
        let mut missing = Vec::new();
        let court_id = require(req.court_id, "court_id", &mut missing);
        let date = require(req.date, "date", &mut missing);
        let start_time = require(non_empty(req.start_time), "start_time", &mut missing);
        let client_name = require(non_empty(req.client_name), "client_name", &mut missing);

        let (Some(court_id), Some(date), Some(start_time), Some(client_name)) =
            (court_id, date, start_time, client_name)
        else {
            return Err(BookingError::Validation(missing));
        };

        let client_contact =
            non_empty(req.client_contact).unwrap_or_else(|| "N/A".to_string());
        let start_time = slots::to_hhmm(start_time.trim()).to_string();
        let end_time = slots::slot_end(&start_time)
            .ok_or_else(|| BookingError::Validation(vec!["start_time".to_string()]))?;

        self.admit(NewReservation {
            court_id,
            date,
            start_time,
            end_time,
            client_name,
            client_contact,
            payment_state: PaymentState::Complimentary,
            amount_due: 0.0,
            amount_paid: 0.0,
            kind: ReservationKind::AdminManual,
            admin_notes: req.admin_notes,
            pattern_id: None,
        })
        .await
    }

    /// Shared admission tail: fast-path collision check, then insert.
    /// The store's uniqueness constraint stays authoritative for the
    /// no-double-booking invariant under concurrent writers.
    async fn admit(&self, draft: NewReservation) -> BookingResult<Reservation> {
        if self
            .store
            .find_by_slot(draft.court_id, draft.date, &draft.start_time)
            .await?
            .is_some()
        {
            return Err(BookingError::Conflict);
        }
        self.store.insert(draft).await
    }

    //=====================================================================================
    // Recurrence Expansion
    //=====================================================================================

    /// Persist a weekly pattern and generate its next twelve occurrences.
    /// Weeks whose slot is already booked are reported in `failed`;
    /// partial generation is an expected outcome, not an error.
    pub async fn create_recurring(
        &self,
        req: CreateRecurring,
    ) -> BookingResult<RecurrenceOutcome> {
        let mut missing = Vec::new();
        let court_id = require(req.court_id, "court_id", &mut missing);
        let client_name = require(non_empty(req.client_name), "client_name", &mut missing);
        let declared_weekday = require(req.weekday, "weekday", &mut missing);
        let start_time = require(non_empty(req.start_time), "start_time", &mut missing);

        let (Some(court_id), Some(client_name), Some(_declared), Some(start_time)) =
            (court_id, client_name, declared_weekday, start_time)
        else {
            return Err(BookingError::Validation(missing));
        };

        let start_date = req.start_date.unwrap_or_else(|| self.clock.today());
        // The submitted weekday is only checked for presence. The stored
        // value comes from the start date itself; callers have historically
        // sent a weekday shifted by their timezone.
        let weekday = slots::weekday_index(start_date);

        let client_contact =
            non_empty(req.client_contact).unwrap_or_else(|| "N/A".to_string());
        let start_time = slots::to_hhmm(start_time.trim()).to_string();
        let end_time = slots::slot_end(&start_time)
            .ok_or_else(|| BookingError::Validation(vec!["start_time".to_string()]))?;

        let pattern = self
            .store
            .insert_pattern(NewPattern {
                court_id,
                client_name: client_name.clone(),
                client_contact: client_contact.clone(),
                weekday,
                start_time: start_time.clone(),
                start_date,
                notes: req.admin_notes.clone(),
                active: true,
            })
            .await?;

        let tag = pattern_tag(pattern.id);
        let admin_notes = match req.admin_notes.as_deref() {
            Some(extra) if !extra.trim().is_empty() => format!("Generada por {tag}. {extra}"),
            _ => format!("Generada por {tag}."),
        };

        let mut generated = Vec::new();
        let mut failed = Vec::new();

        // Sequential on purpose: deterministic ordering of the generated
        // and failed lists, and no iteration's failure stops the rest.
        for week in 0..WEEKS_GENERATED {
            let date = start_date + Days::new(7 * week as u64);

            match self.store.find_by_slot(court_id, date, &start_time).await {
                Ok(Some(_)) => {
                    failed.push(date);
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(%date, error = %err, "collision check failed for weekly occurrence");
                    failed.push(date);
                    continue;
                }
            }

            let draft = NewReservation {
                court_id,
                date,
                start_time: start_time.clone(),
                end_time: end_time.clone(),
                client_name: format!("{client_name}{RECURRING_SUFFIX}"),
                client_contact: client_contact.clone(),
                payment_state: PaymentState::Complimentary,
                amount_due: 0.0,
                amount_paid: 0.0,
                kind: ReservationKind::RecurringInstance,
                admin_notes: Some(admin_notes.clone()),
                pattern_id: Some(pattern.id),
            };
            match self.store.insert(draft).await {
                Ok(_) => generated.push(date),
                Err(BookingError::Conflict) => failed.push(date),
                Err(err) => {
                    warn!(%date, error = %err, "could not generate weekly occurrence");
                    failed.push(date);
                }
            }
        }

        Ok(RecurrenceOutcome {
            pattern,
            generated,
            failed,
        })
    }

    //=====================================================================================
    // Recurrence Teardown
    //=====================================================================================

    /// Remove a pattern and its future generated occurrences. Past
    /// occurrences stay as historical record; a failure to release the
    /// future ones is logged but never blocks the pattern removal.
    pub async fn delete_recurring(&self, pattern_id: i64) -> BookingResult<()> {
        let pattern = self
            .store
            .find_pattern(pattern_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("pattern {pattern_id}")))?;

        // Instances go first: deleting the pattern row would clear the
        // pattern reference these rows are matched by.
        let today = self.clock.today();
        if let Err(err) = self.store.delete_future_instances(&pattern, today).await {
            warn!(pattern_id, error = %err, "failed to release future occurrences");
        }

        self.store.delete_pattern(pattern_id).await
    }

    pub async fn list_recurring_patterns(&self) -> BookingResult<Vec<PatternWithCourt>> {
        self.store.list_active_patterns().await
    }

    //=====================================================================================
    // Payment, Cancellation, Listing
    //=====================================================================================

    /// Change a reservation's payment state. The paid amount is
    /// recomputed from the reservation's stored total, not from the
    /// catalog's current price.
    pub async fn update_payment_state(
        &self,
        id: i64,
        new_state: Option<PaymentState>,
    ) -> BookingResult<Reservation> {
        let Some(new_state) = new_state else {
            return Err(BookingError::Validation(vec!["payment_state".to_string()]));
        };
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("reservation {id}")))?;

        let amount_paid = new_state.amount_paid(existing.amount_due);
        self.store.update_payment(id, new_state, amount_paid).await
    }

    pub async fn cancel_reservation(&self, id: i64) -> BookingResult<()> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("reservation {id}")))?;
        self.store.delete(id).await
    }

    pub async fn list_reservations(
        &self,
        filter: ReservationFilter,
    ) -> BookingResult<Vec<ReservationWithCourt>> {
        self.store.list(&filter).await
    }

    //=====================================================================================
    // Court Catalog (read-only facade)
    //=====================================================================================

    pub async fn get_court(&self, id: i64) -> BookingResult<Court> {
        match self.catalog.find_court(id).await? {
            Some(court) if court.active => Ok(court),
            _ => Err(BookingError::NotFound(format!("court {id}"))),
        }
    }

    pub async fn list_courts(&self) -> BookingResult<Vec<Court>> {
        self.catalog.list_active().await
    }

    pub async fn list_courts_by_category(&self, category: &str) -> BookingResult<Vec<Court>> {
        self.catalog.list_active_by_category(category).await
    }
}

//=========================================================================================
// Tests (against an in-memory store)
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecurrencePattern;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    struct FixedClock(NaiveDate);

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            self.0
        }
    }

    /// In-memory stand-in for the Postgres store, implementing both
    /// ports. Mirrors the store-level slot uniqueness rule.
    #[derive(Default)]
    struct InMemory {
        courts: Mutex<Vec<Court>>,
        reservations: Mutex<Vec<Reservation>>,
        patterns: Mutex<Vec<RecurrencePattern>>,
        next_id: AtomicI64,
    }

    impl InMemory {
        fn next(&self) -> i64 {
            self.next_id.fetch_add(1, Ordering::Relaxed) + 1
        }

        fn add_court(&self, id: i64, name: &str, category: &str, hourly_price: f64) {
            self.courts.lock().unwrap().push(Court {
                id,
                name: name.to_string(),
                category: category.to_string(),
                hourly_price,
                active: true,
            });
        }

        fn set_price(&self, id: i64, hourly_price: f64) {
            let mut courts = self.courts.lock().unwrap();
            if let Some(court) = courts.iter_mut().find(|c| c.id == id) {
                court.hourly_price = hourly_price;
            }
        }

        fn slot_taken(&self, court_id: i64, date: NaiveDate, start_time: &str) -> bool {
            self.reservations.lock().unwrap().iter().any(|r| {
                r.court_id == court_id
                    && r.date == date
                    && slots::to_hhmm(&r.start_time) == slots::to_hhmm(start_time)
            })
        }
    }

    #[async_trait]
    impl ReservationStore for InMemory {
        async fn find_by_slot(
            &self,
            court_id: i64,
            date: NaiveDate,
            start_time: &str,
        ) -> BookingResult<Option<Reservation>> {
            Ok(self
                .reservations
                .lock()
                .unwrap()
                .iter()
                .find(|r| {
                    r.court_id == court_id
                        && r.date == date
                        && slots::to_hhmm(&r.start_time) == slots::to_hhmm(start_time)
                })
                .cloned())
        }

        async fn find_by_id(&self, id: i64) -> BookingResult<Option<Reservation>> {
            Ok(self
                .reservations
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }

        async fn list_for_day(
            &self,
            court_id: i64,
            date: NaiveDate,
        ) -> BookingResult<Vec<Reservation>> {
            Ok(self
                .reservations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.court_id == court_id && r.date == date)
                .cloned()
                .collect())
        }

        async fn insert(&self, draft: NewReservation) -> BookingResult<Reservation> {
            if self.slot_taken(draft.court_id, draft.date, &draft.start_time) {
                return Err(BookingError::Conflict);
            }
            let reservation = Reservation {
                id: self.next(),
                court_id: draft.court_id,
                date: draft.date,
                start_time: draft.start_time,
                end_time: draft.end_time,
                client_name: draft.client_name,
                client_contact: draft.client_contact,
                payment_state: draft.payment_state,
                amount_due: draft.amount_due,
                amount_paid: draft.amount_paid,
                kind: draft.kind,
                admin_notes: draft.admin_notes,
                pattern_id: draft.pattern_id,
            };
            self.reservations.lock().unwrap().push(reservation.clone());
            Ok(reservation)
        }

        async fn update_payment(
            &self,
            id: i64,
            state: PaymentState,
            amount_paid: f64,
        ) -> BookingResult<Reservation> {
            let mut reservations = self.reservations.lock().unwrap();
            let reservation = reservations
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| BookingError::NotFound(format!("reservation {id}")))?;
            reservation.payment_state = state;
            reservation.amount_paid = amount_paid;
            Ok(reservation.clone())
        }

        async fn delete(&self, id: i64) -> BookingResult<()> {
            let mut reservations = self.reservations.lock().unwrap();
            let before = reservations.len();
            reservations.retain(|r| r.id != id);
            if reservations.len() == before {
                return Err(BookingError::NotFound(format!("reservation {id}")));
            }
            Ok(())
        }

        async fn list(
            &self,
            filter: &ReservationFilter,
        ) -> BookingResult<Vec<ReservationWithCourt>> {
            let courts = self.courts.lock().unwrap();
            let mut rows: Vec<ReservationWithCourt> = self
                .reservations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| filter.date.map_or(true, |date| r.date == date))
                .filter(|r| filter.court_id.map_or(true, |id| r.court_id == id))
                .map(|r| {
                    let court = courts.iter().find(|c| c.id == r.court_id);
                    ReservationWithCourt {
                        reservation: r.clone(),
                        court_name: court.map(|c| c.name.clone()).unwrap_or_default(),
                        court_category: court.map(|c| c.category.clone()).unwrap_or_default(),
                    }
                })
                .collect();
            rows.sort_by(|a, b| {
                b.reservation
                    .date
                    .cmp(&a.reservation.date)
                    .then(a.reservation.start_time.cmp(&b.reservation.start_time))
            });
            Ok(rows)
        }

        async fn insert_pattern(&self, draft: NewPattern) -> BookingResult<RecurrencePattern> {
            let pattern = RecurrencePattern {
                id: self.next(),
                court_id: draft.court_id,
                client_name: draft.client_name,
                client_contact: draft.client_contact,
                weekday: draft.weekday,
                start_time: draft.start_time,
                start_date: draft.start_date,
                notes: draft.notes,
                active: draft.active,
            };
            self.patterns.lock().unwrap().push(pattern.clone());
            Ok(pattern)
        }

        async fn find_pattern(&self, id: i64) -> BookingResult<Option<RecurrencePattern>> {
            Ok(self
                .patterns
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == id)
                .cloned())
        }

        async fn delete_pattern(&self, id: i64) -> BookingResult<()> {
            let mut patterns = self.patterns.lock().unwrap();
            let before = patterns.len();
            patterns.retain(|p| p.id != id);
            if patterns.len() == before {
                return Err(BookingError::NotFound(format!("pattern {id}")));
            }
            Ok(())
        }

        async fn delete_future_instances(
            &self,
            pattern: &RecurrencePattern,
            from: NaiveDate,
        ) -> BookingResult<u64> {
            let mut reservations = self.reservations.lock().unwrap();
            let before = reservations.len();
            reservations.retain(|r| {
                !(r.pattern_id == Some(pattern.id)
                    && r.kind == ReservationKind::RecurringInstance
                    && r.court_id == pattern.court_id
                    && slots::to_hhmm(&r.start_time) == slots::to_hhmm(&pattern.start_time)
                    && r.date >= from)
            });
            Ok((before - reservations.len()) as u64)
        }

        async fn list_active_patterns(&self) -> BookingResult<Vec<PatternWithCourt>> {
            let courts = self.courts.lock().unwrap();
            let mut rows: Vec<PatternWithCourt> = self
                .patterns
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.active)
                .map(|p| PatternWithCourt {
                    pattern: p.clone(),
                    court_name: courts
                        .iter()
                        .find(|c| c.id == p.court_id)
                        .map(|c| c.name.clone())
                        .unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| {
                a.pattern
                    .weekday
                    .cmp(&b.pattern.weekday)
                    .then(a.pattern.start_time.cmp(&b.pattern.start_time))
            });
            Ok(rows)
        }
    }

    #[async_trait]
    impl CourtCatalog for InMemory {
        async fn find_court(&self, id: i64) -> BookingResult<Option<Court>> {
            Ok(self.courts.lock().unwrap().iter().find(|c| c.id == id).cloned())
        }

        async fn list_active(&self) -> BookingResult<Vec<Court>> {
            let mut courts: Vec<Court> = self
                .courts
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.active)
                .cloned()
                .collect();
            courts.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
            Ok(courts)
        }

        async fn list_active_by_category(&self, category: &str) -> BookingResult<Vec<Court>> {
            let mut courts: Vec<Court> = self
                .courts
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.active && c.category == category)
                .cloned()
                .collect();
            courts.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(courts)
        }
    }

    fn fixture(today: &str) -> (BookingService, Arc<InMemory>) {
        let store = Arc::new(InMemory::default());
        store.add_court(1, "Court One", "padel", 10000.0);
        store.add_court(2, "Court Two", "tennis", 8000.0);
        store.add_court(3, "Court Three", "padel", 9999.0);
        let service = BookingService::new(
            store.clone(),
            store.clone(),
            Arc::new(FixedClock(d(today))),
        );
        (service, store)
    }

    fn customer_req(
        court: i64,
        date: &str,
        time: &str,
        state: PaymentState,
    ) -> CreateReservation {
        CreateReservation {
            court_id: Some(court),
            date: Some(d(date)),
            start_time: Some(time.to_string()),
            client_name: Some("Ana Suárez".to_string()),
            client_contact: Some("+549114440000".to_string()),
            payment_state: Some(state),
        }
    }

    fn recurring_req(court: i64, start_date: &str, time: &str, weekday: u8) -> CreateRecurring {
        CreateRecurring {
            court_id: Some(court),
            client_name: Some("Club Los Pinos".to_string()),
            client_contact: Some("+549115550000".to_string()),
            weekday: Some(weekday),
            start_time: Some(time.to_string()),
            start_date: Some(d(start_date)),
            admin_notes: None,
        }
    }

    // ── availability ─────────────────────────────────────────────────

    #[tokio::test]
    async fn availability_starts_fully_open() {
        let (service, _) = fixture("2024-06-01");
        let slots = service.check_availability(1, d("2024-06-10")).await.unwrap();
        assert_eq!(slots.len(), 6);
        assert!(slots.iter().all(|s| s.available));
        assert_eq!(slots[0].time, "17:00");
        assert_eq!(slots[5].time, "22:00");
    }

    #[tokio::test]
    async fn availability_reflects_new_booking() {
        let (service, _) = fixture("2024-06-01");
        service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Full))
            .await
            .unwrap();

        let slots = service.check_availability(1, d("2024-06-10")).await.unwrap();
        let eighteen = slots.iter().find(|s| s.time == "18:00").unwrap();
        assert!(!eighteen.available);
        assert_eq!(slots.iter().filter(|s| s.available).count(), 5);

        // Another court and another day stay open.
        let other_court = service.check_availability(2, d("2024-06-10")).await.unwrap();
        assert!(other_court.iter().all(|s| s.available));
        let other_day = service.check_availability(1, d("2024-06-11")).await.unwrap();
        assert!(other_day.iter().all(|s| s.available));
    }

    #[tokio::test]
    async fn availability_truncates_stored_seconds() {
        let (service, store) = fixture("2024-06-01");
        store
            .insert(NewReservation {
                court_id: 1,
                date: d("2024-06-10"),
                start_time: "19:00:00".to_string(),
                end_time: "20:00:00".to_string(),
                client_name: "Legacy Row".to_string(),
                client_contact: "N/A".to_string(),
                payment_state: PaymentState::Pending,
                amount_due: 0.0,
                amount_paid: 0.0,
                kind: ReservationKind::Customer,
                admin_notes: None,
                pattern_id: None,
            })
            .await
            .unwrap();

        let slots = service.check_availability(1, d("2024-06-10")).await.unwrap();
        let nineteen = slots.iter().find(|s| s.time == "19:00").unwrap();
        assert!(!nineteen.available);
    }

    // ── admission ────────────────────────────────────────────────────

    #[tokio::test]
    async fn full_payment_end_to_end() {
        let (service, _) = fixture("2024-06-01");
        let reservation = service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Full))
            .await
            .unwrap();

        assert_eq!(reservation.amount_due, 10000.0);
        assert_eq!(reservation.amount_paid, 10000.0);
        assert_eq!(reservation.end_time, "19:00");
        assert_eq!(reservation.kind, ReservationKind::Customer);

        let err = service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Full))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Conflict));
    }

    #[tokio::test]
    async fn deposit_pays_rounded_half() {
        let (service, _) = fixture("2024-06-01");
        let reservation = service
            .create_reservation(customer_req(3, "2024-06-10", "17:00", PaymentState::Deposit))
            .await
            .unwrap();
        assert_eq!(reservation.amount_due, 9999.0);
        assert_eq!(reservation.amount_paid, 5000.0);
        assert_eq!(reservation.payment_state, PaymentState::Deposit);
    }

    #[tokio::test]
    async fn pending_not_accepted_for_customers() {
        let (service, _) = fixture("2024-06-01");
        let err = service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Pending))
            .await
            .unwrap_err();
        match err {
            BookingError::Validation(fields) => assert_eq!(fields, vec!["payment_state"]),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_fields_are_listed() {
        let (service, _) = fixture("2024-06-01");
        let err = service
            .create_reservation(CreateReservation::default())
            .await
            .unwrap_err();
        match err {
            BookingError::Validation(fields) => assert_eq!(
                fields,
                vec![
                    "court_id",
                    "date",
                    "start_time",
                    "client_name",
                    "client_contact",
                    "payment_state",
                ]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_strings_count_as_missing() {
        let (service, _) = fixture("2024-06-01");
        let mut req = customer_req(1, "2024-06-10", "18:00", PaymentState::Full);
        req.client_name = Some("   ".to_string());
        let err = service.create_reservation(req).await.unwrap_err();
        match err {
            BookingError::Validation(fields) => assert_eq!(fields, vec!["client_name"]),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_court_is_not_found() {
        let (service, _) = fixture("2024-06-01");
        let err = service
            .create_reservation(customer_req(99, "2024-06-10", "18:00", PaymentState::Full))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }

    #[tokio::test]
    async fn manual_reservation_is_complimentary() {
        let (service, _) = fixture("2024-06-01");
        let reservation = service
            .create_manual_reservation(CreateManualReservation {
                court_id: Some(2),
                date: Some(d("2024-06-12")),
                start_time: Some("20:00".to_string()),
                client_name: Some("Escuela Municipal".to_string()),
                client_contact: None,
                admin_notes: Some("torneo interno".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(reservation.kind, ReservationKind::AdminManual);
        assert_eq!(reservation.payment_state, PaymentState::Complimentary);
        assert_eq!(reservation.amount_due, 0.0);
        assert_eq!(reservation.amount_paid, 0.0);
        assert_eq!(reservation.client_contact, "N/A");
        assert_eq!(reservation.end_time, "21:00");
        assert_eq!(reservation.admin_notes.as_deref(), Some("torneo interno"));
    }

    #[tokio::test]
    async fn manual_reservation_respects_existing_booking() {
        let (service, _) = fixture("2024-06-01");
        service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Full))
            .await
            .unwrap();
        let err = service
            .create_manual_reservation(CreateManualReservation {
                court_id: Some(1),
                date: Some(d("2024-06-10")),
                start_time: Some("18:00".to_string()),
                client_name: Some("Escuela Municipal".to_string()),
                client_contact: None,
                admin_notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Conflict));
    }

    #[tokio::test]
    async fn store_insert_is_the_authoritative_collision_check() {
        // Bypassing the service's fast-path check, the store itself must
        // refuse a duplicate slot.
        let (_, store) = fixture("2024-06-01");
        let draft = NewReservation {
            court_id: 1,
            date: d("2024-06-10"),
            start_time: "18:00".to_string(),
            end_time: "19:00".to_string(),
            client_name: "First".to_string(),
            client_contact: "N/A".to_string(),
            payment_state: PaymentState::Full,
            amount_due: 10000.0,
            amount_paid: 10000.0,
            kind: ReservationKind::Customer,
            admin_notes: None,
            pattern_id: None,
        };
        store.insert(draft.clone()).await.unwrap();
        let err = store.insert(draft).await.unwrap_err();
        assert!(matches!(err, BookingError::Conflict));
    }

    // ── recurrence expansion ─────────────────────────────────────────

    #[tokio::test]
    async fn pattern_weekday_recomputed_from_start_date() {
        let (service, _) = fixture("2024-03-01");
        // 2024-03-04 is a Monday; the declared Wednesday is wrong on
        // purpose and must be ignored.
        let outcome = service
            .create_recurring(recurring_req(1, "2024-03-04", "18:00", 3))
            .await
            .unwrap();
        assert_eq!(outcome.pattern.weekday, 1);
        assert_eq!(outcome.pattern.start_date, d("2024-03-04"));
    }

    #[tokio::test]
    async fn expansion_generates_twelve_weekly_dates() {
        let (service, store) = fixture("2024-03-01");
        let outcome = service
            .create_recurring(recurring_req(1, "2024-03-04", "18:00", 1))
            .await
            .unwrap();

        assert_eq!(outcome.generated.len(), 12);
        assert!(outcome.failed.is_empty());
        for window in outcome.generated.windows(2) {
            assert_eq!(window[1] - window[0], chrono::Duration::days(7));
        }
        assert_eq!(outcome.generated[0], d("2024-03-04"));
        assert_eq!(outcome.generated[11], d("2024-05-20"));

        let instance = store
            .find_by_slot(1, d("2024-03-11"), "18:00")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(instance.kind, ReservationKind::RecurringInstance);
        assert_eq!(instance.payment_state, PaymentState::Complimentary);
        assert_eq!(instance.amount_due, 0.0);
        assert_eq!(instance.amount_paid, 0.0);
        assert_eq!(instance.client_name, "Club Los Pinos (Fijo)");
        assert_eq!(instance.pattern_id, Some(outcome.pattern.id));
        let notes = instance.admin_notes.unwrap();
        assert!(notes.contains(&format!("patrón recurrente #{}", outcome.pattern.id)));
    }

    #[tokio::test]
    async fn expansion_skips_colliding_weeks() {
        let (service, _) = fixture("2024-03-01");
        // Week 2 of the series (2024-03-18) is already booked.
        service
            .create_reservation(customer_req(1, "2024-03-18", "18:00", PaymentState::Full))
            .await
            .unwrap();

        let outcome = service
            .create_recurring(recurring_req(1, "2024-03-04", "18:00", 1))
            .await
            .unwrap();

        assert_eq!(outcome.failed, vec![d("2024-03-18")]);
        assert_eq!(outcome.generated.len(), 11);
        assert_eq!(outcome.generated.len() + outcome.failed.len(), 12);
        assert!(!outcome.generated.contains(&d("2024-03-18")));
    }

    #[tokio::test]
    async fn expansion_with_every_week_taken_still_creates_the_pattern() {
        let (service, store) = fixture("2024-03-01");
        let first = service
            .create_recurring(recurring_req(1, "2024-03-04", "18:00", 1))
            .await
            .unwrap();
        assert_eq!(first.generated.len(), 12);

        let second = service
            .create_recurring(recurring_req(1, "2024-03-04", "18:00", 1))
            .await
            .unwrap();
        assert!(second.generated.is_empty());
        assert_eq!(second.failed.len(), 12);
        assert!(store
            .find_pattern(second.pattern.id)
            .await
            .unwrap()
            .is_some());
    }

    // ── recurrence teardown ──────────────────────────────────────────

    #[tokio::test]
    async fn teardown_removes_only_future_instances_of_the_pattern() {
        // 2024-01-01 is a Monday; "today" is 2024-02-01, five weeks in.
        let (service, store) = fixture("2024-02-01");
        let mondays = service
            .create_recurring(recurring_req(1, "2024-01-01", "18:00", 1))
            .await
            .unwrap();
        let evenings = service
            .create_recurring(recurring_req(1, "2024-01-01", "19:00", 1))
            .await
            .unwrap();
        // An independent booking on the same court must survive.
        let standalone = service
            .create_reservation(customer_req(1, "2024-02-06", "18:00", PaymentState::Full))
            .await
            .unwrap();

        service.delete_recurring(mondays.pattern.id).await.unwrap();

        assert!(store
            .find_pattern(mondays.pattern.id)
            .await
            .unwrap()
            .is_none());

        let remaining = store.list(&ReservationFilter::default()).await.unwrap();
        let monday_instances: Vec<_> = remaining
            .iter()
            .filter(|r| r.reservation.pattern_id == Some(mondays.pattern.id))
            .collect();
        // January instances (1, 8, 15, 22, 29) stay; Feb 5 onward is gone.
        assert_eq!(monday_instances.len(), 5);
        assert!(monday_instances
            .iter()
            .all(|r| r.reservation.date < d("2024-02-01")));

        let evening_instances = remaining
            .iter()
            .filter(|r| r.reservation.pattern_id == Some(evenings.pattern.id))
            .count();
        assert_eq!(evening_instances, 12);
        assert!(remaining
            .iter()
            .any(|r| r.reservation.id == standalone.id));
    }

    #[tokio::test]
    async fn teardown_of_unknown_pattern_is_not_found() {
        let (service, _) = fixture("2024-02-01");
        let err = service.delete_recurring(404).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }

    // ── payment updates ──────────────────────────────────────────────

    #[tokio::test]
    async fn payment_update_recomputes_from_stored_total() {
        let (service, store) = fixture("2024-06-01");
        let reservation = service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Full))
            .await
            .unwrap();

        // A later catalog price change must not affect the stored total.
        store.set_price(1, 20000.0);

        let updated = service
            .update_payment_state(reservation.id, Some(PaymentState::Deposit))
            .await
            .unwrap();
        assert_eq!(updated.payment_state, PaymentState::Deposit);
        assert_eq!(updated.amount_due, 10000.0);
        assert_eq!(updated.amount_paid, 5000.0);

        let cleared = service
            .update_payment_state(reservation.id, Some(PaymentState::Pending))
            .await
            .unwrap();
        assert_eq!(cleared.amount_paid, 0.0);
    }

    #[tokio::test]
    async fn payment_update_requires_a_state() {
        let (service, _) = fixture("2024-06-01");
        let reservation = service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Full))
            .await
            .unwrap();
        let err = service
            .update_payment_state(reservation.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));

        let err = service
            .update_payment_state(9999, Some(PaymentState::Full))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }

    // ── cancellation ─────────────────────────────────────────────────

    #[tokio::test]
    async fn cancellation_frees_the_slot() {
        let (service, _) = fixture("2024-06-01");
        let reservation = service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Full))
            .await
            .unwrap();

        service.cancel_reservation(reservation.id).await.unwrap();

        let slots = service.check_availability(1, d("2024-06-10")).await.unwrap();
        assert!(slots.iter().find(|s| s.time == "18:00").unwrap().available);
        service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Deposit))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelling_unknown_reservation_is_not_found() {
        let (service, _) = fixture("2024-06-01");
        let err = service.cancel_reservation(404).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }

    // ── listings ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn reservation_listing_orders_and_filters() {
        let (service, _) = fixture("2024-06-01");
        service
            .create_reservation(customer_req(1, "2024-06-10", "18:00", PaymentState::Full))
            .await
            .unwrap();
        service
            .create_reservation(customer_req(1, "2024-06-11", "19:00", PaymentState::Full))
            .await
            .unwrap();
        service
            .create_reservation(customer_req(2, "2024-06-11", "17:00", PaymentState::Deposit))
            .await
            .unwrap();

        let all = service
            .list_reservations(ReservationFilter::default())
            .await
            .unwrap();
        let keys: Vec<_> = all
            .iter()
            .map(|r| (r.reservation.date, r.reservation.start_time.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (d("2024-06-11"), "17:00".to_string()),
                (d("2024-06-11"), "19:00".to_string()),
                (d("2024-06-10"), "18:00".to_string()),
            ]
        );
        assert_eq!(all[0].court_name, "Court Two");
        assert_eq!(all[0].court_category, "tennis");

        let by_date = service
            .list_reservations(ReservationFilter {
                date: Some(d("2024-06-11")),
                court_id: None,
            })
            .await
            .unwrap();
        assert_eq!(by_date.len(), 2);

        let by_court = service
            .list_reservations(ReservationFilter {
                date: None,
                court_id: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(by_court.len(), 2);
    }

    #[tokio::test]
    async fn pattern_listing_orders_by_weekday_then_time() {
        let (service, store) = fixture("2024-03-01");
        // Friday evening, Monday evening, Monday afternoon.
        service
            .create_recurring(recurring_req(1, "2024-03-08", "20:00", 5))
            .await
            .unwrap();
        service
            .create_recurring(recurring_req(2, "2024-03-04", "19:00", 1))
            .await
            .unwrap();
        service
            .create_recurring(recurring_req(3, "2024-03-04", "17:00", 1))
            .await
            .unwrap();
        // A deactivated pattern must not be listed.
        store
            .insert_pattern(NewPattern {
                court_id: 1,
                client_name: "Dormant".to_string(),
                client_contact: "N/A".to_string(),
                weekday: 0,
                start_time: "17:00".to_string(),
                start_date: d("2024-03-03"),
                notes: None,
                active: false,
            })
            .await
            .unwrap();

        let patterns = service.list_recurring_patterns().await.unwrap();
        let keys: Vec<_> = patterns
            .iter()
            .map(|p| (p.pattern.weekday, p.pattern.start_time.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1, "17:00".to_string()),
                (1, "19:00".to_string()),
                (5, "20:00".to_string()),
            ]
        );
        assert_eq!(patterns[0].court_name, "Court Three");
    }

    // ── court catalog facade ─────────────────────────────────────────

    #[tokio::test]
    async fn court_lookup_hides_inactive_courts() {
        let (service, store) = fixture("2024-06-01");
        store.courts.lock().unwrap().push(Court {
            id: 9,
            name: "Closed Court".to_string(),
            category: "padel".to_string(),
            hourly_price: 5000.0,
            active: false,
        });

        assert_eq!(service.get_court(1).await.unwrap().name, "Court One");
        assert!(matches!(
            service.get_court(9).await.unwrap_err(),
            BookingError::NotFound(_)
        ));

        let active = service.list_courts().await.unwrap();
        assert_eq!(active.len(), 3);
        let padel = service.list_courts_by_category("padel").await.unwrap();
        assert_eq!(padel.len(), 2);
        assert_eq!(padel[0].name, "Court One");
    }
}
