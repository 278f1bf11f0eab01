//! services/api/src/adapters/db.rs
//!
//! The database adapter: the concrete implementation of the booking
//! core's `ReservationStore` and `CourtCatalog` ports on top of
//! PostgreSQL, using `sqlx`.

use async_trait::async_trait;
use chrono::NaiveDate;
use court_booking_core::domain::{
    Court, NewPattern, NewReservation, PatternWithCourt, PaymentState, RecurrencePattern,
    Reservation, ReservationFilter, ReservationKind, ReservationWithCourt,
};
use court_booking_core::ports::{BookingError, BookingResult, CourtCatalog, ReservationStore};
use sqlx::{FromRow, PgPool, QueryBuilder};

const RESERVATION_COLUMNS: &str = "id, court_id, date, start_time, end_time, client_name, \
     client_contact, payment_state, amount_due, amount_paid, kind, admin_notes, pattern_id";

const PATTERN_COLUMNS: &str =
    "id, court_id, client_name, client_contact, weekday, start_time, start_date, notes, active";

fn store_err(e: sqlx::Error) -> BookingError {
    BookingError::Store(e.to_string())
}

/// Maps an insert failure: a violation of the slot uniqueness
/// constraint is the authoritative conflict signal.
fn insert_err(e: sqlx::Error) -> BookingError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => BookingError::Conflict,
        _ => store_err(e),
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A Postgres-backed store implementing both booking ports.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ReservationRecord {
    id: i64,
    court_id: i64,
    date: NaiveDate,
    start_time: String,
    end_time: String,
    client_name: String,
    client_contact: String,
    payment_state: String,
    amount_due: f64,
    amount_paid: f64,
    kind: String,
    admin_notes: Option<String>,
    pattern_id: Option<i64>,
}

impl ReservationRecord {
    fn to_domain(self) -> BookingResult<Reservation> {
        let payment_state = PaymentState::parse(&self.payment_state).ok_or_else(|| {
            BookingError::Store(format!("unknown payment state '{}'", self.payment_state))
        })?;
        let kind = ReservationKind::parse(&self.kind).ok_or_else(|| {
            BookingError::Store(format!("unknown reservation kind '{}'", self.kind))
        })?;
        Ok(Reservation {
            id: self.id,
            court_id: self.court_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            client_name: self.client_name,
            client_contact: self.client_contact,
            payment_state,
            amount_due: self.amount_due,
            amount_paid: self.amount_paid,
            kind,
            admin_notes: self.admin_notes,
            pattern_id: self.pattern_id,
        })
    }
}

#[derive(FromRow)]
struct ReservationWithCourtRecord {
    #[sqlx(flatten)]
    reservation: ReservationRecord,
    court_name: String,
    court_category: String,
}

impl ReservationWithCourtRecord {
    fn to_domain(self) -> BookingResult<ReservationWithCourt> {
        Ok(ReservationWithCourt {
            reservation: self.reservation.to_domain()?,
            court_name: self.court_name,
            court_category: self.court_category,
        })
    }
}

#[derive(FromRow)]
struct PatternRecord {
    id: i64,
    court_id: i64,
    client_name: String,
    client_contact: String,
    weekday: i16,
    start_time: String,
    start_date: NaiveDate,
    notes: Option<String>,
    active: bool,
}

impl PatternRecord {
    fn to_domain(self) -> RecurrencePattern {
        RecurrencePattern {
            id: self.id,
            court_id: self.court_id,
            client_name: self.client_name,
            client_contact: self.client_contact,
            weekday: self.weekday as u8,
            start_time: self.start_time,
            start_date: self.start_date,
            notes: self.notes,
            active: self.active,
        }
    }
}

#[derive(FromRow)]
struct PatternWithCourtRecord {
    #[sqlx(flatten)]
    pattern: PatternRecord,
    court_name: String,
}

#[derive(FromRow)]
struct CourtRecord {
    id: i64,
    name: String,
    category: String,
    hourly_price: f64,
    active: bool,
}

impl CourtRecord {
    fn to_domain(self) -> Court {
        Court {
            id: self.id,
            name: self.name,
            category: self.category,
            hourly_price: self.hourly_price,
            active: self.active,
        }
    }
}

//=========================================================================================
// `ReservationStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReservationStore for PgStore {
    async fn find_by_slot(
        &self,
        court_id: i64,
        date: NaiveDate,
        start_time: &str,
    ) -> BookingResult<Option<Reservation>> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE court_id = $1 AND date = $2 AND left(start_time, 5) = left($3, 5)"
        ))
        .bind(court_id)
        .bind(date)
        .bind(start_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        record.map(ReservationRecord::to_domain).transpose()
    }

    async fn find_by_id(&self, id: i64) -> BookingResult<Option<Reservation>> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        record.map(ReservationRecord::to_domain).transpose()
    }

    async fn list_for_day(
        &self,
        court_id: i64,
        date: NaiveDate,
    ) -> BookingResult<Vec<Reservation>> {
        let records = sqlx::query_as::<_, ReservationRecord>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE court_id = $1 AND date = $2 ORDER BY start_time"
        ))
        .bind(court_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        records.into_iter().map(ReservationRecord::to_domain).collect()
    }

    async fn insert(&self, draft: NewReservation) -> BookingResult<Reservation> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "INSERT INTO reservations (court_id, date, start_time, end_time, client_name, \
             client_contact, payment_state, amount_due, amount_paid, kind, admin_notes, pattern_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(draft.court_id)
        .bind(draft.date)
        .bind(&draft.start_time)
        .bind(&draft.end_time)
        .bind(&draft.client_name)
        .bind(&draft.client_contact)
        .bind(draft.payment_state.as_str())
        .bind(draft.amount_due)
        .bind(draft.amount_paid)
        .bind(draft.kind.as_str())
        .bind(&draft.admin_notes)
        .bind(draft.pattern_id)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_err)?;
        record.to_domain()
    }

    async fn update_payment(
        &self,
        id: i64,
        state: PaymentState,
        amount_paid: f64,
    ) -> BookingResult<Reservation> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "UPDATE reservations SET payment_state = $1, amount_paid = $2 \
             WHERE id = $3 RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(state.as_str())
        .bind(amount_paid)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        record
            .ok_or_else(|| BookingError::NotFound(format!("reservation {id}")))?
            .to_domain()
    }

    async fn delete(&self, id: i64) -> BookingResult<()> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(BookingError::NotFound(format!("reservation {id}")));
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &ReservationFilter,
    ) -> BookingResult<Vec<ReservationWithCourt>> {
        let mut query = QueryBuilder::new(
            "SELECT r.id, r.court_id, r.date, r.start_time, r.end_time, r.client_name, \
             r.client_contact, r.payment_state, r.amount_due, r.amount_paid, r.kind, \
             r.admin_notes, r.pattern_id, c.name AS court_name, c.category AS court_category \
             FROM reservations r JOIN courts c ON c.id = r.court_id WHERE TRUE",
        );
        if let Some(date) = filter.date {
            query.push(" AND r.date = ").push_bind(date);
        }
        if let Some(court_id) = filter.court_id {
            query.push(" AND r.court_id = ").push_bind(court_id);
        }
        query.push(" ORDER BY r.date DESC, r.start_time ASC");

        let records = query
            .build_query_as::<ReservationWithCourtRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        records
            .into_iter()
            .map(ReservationWithCourtRecord::to_domain)
            .collect()
    }

    async fn insert_pattern(&self, draft: NewPattern) -> BookingResult<RecurrencePattern> {
        let record = sqlx::query_as::<_, PatternRecord>(&format!(
            "INSERT INTO recurrence_patterns (court_id, client_name, client_contact, weekday, \
             start_time, start_date, notes, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PATTERN_COLUMNS}"
        ))
        .bind(draft.court_id)
        .bind(&draft.client_name)
        .bind(&draft.client_contact)
        .bind(draft.weekday as i16)
        .bind(&draft.start_time)
        .bind(draft.start_date)
        .bind(&draft.notes)
        .bind(draft.active)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(record.to_domain())
    }

    async fn find_pattern(&self, id: i64) -> BookingResult<Option<RecurrencePattern>> {
        let record = sqlx::query_as::<_, PatternRecord>(&format!(
            "SELECT {PATTERN_COLUMNS} FROM recurrence_patterns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(record.map(PatternRecord::to_domain))
    }

    async fn delete_pattern(&self, id: i64) -> BookingResult<()> {
        let result = sqlx::query("DELETE FROM recurrence_patterns WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(BookingError::NotFound(format!("pattern {id}")));
        }
        Ok(())
    }

    async fn delete_future_instances(
        &self,
        pattern: &RecurrencePattern,
        from: NaiveDate,
    ) -> BookingResult<u64> {
        let result = sqlx::query(
            "DELETE FROM reservations \
             WHERE pattern_id = $1 AND court_id = $2 \
               AND left(start_time, 5) = left($3, 5) \
               AND kind = 'recurring_instance' AND date >= $4",
        )
        .bind(pattern.id)
        .bind(pattern.court_id)
        .bind(&pattern.start_time)
        .bind(from)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected())
    }

    async fn list_active_patterns(&self) -> BookingResult<Vec<PatternWithCourt>> {
        let records = sqlx::query_as::<_, PatternWithCourtRecord>(
            "SELECT p.id, p.court_id, p.client_name, p.client_contact, p.weekday, \
             p.start_time, p.start_date, p.notes, p.active, c.name AS court_name \
             FROM recurrence_patterns p JOIN courts c ON c.id = p.court_id \
             WHERE p.active ORDER BY p.weekday ASC, p.start_time ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(records
            .into_iter()
            .map(|r| PatternWithCourt {
                pattern: r.pattern.to_domain(),
                court_name: r.court_name,
            })
            .collect())
    }
}

//=========================================================================================
// `CourtCatalog` Trait Implementation
//=========================================================================================

#[async_trait]
impl CourtCatalog for PgStore {
    async fn find_court(&self, id: i64) -> BookingResult<Option<Court>> {
        let record = sqlx::query_as::<_, CourtRecord>(
            "SELECT id, name, category, hourly_price, active FROM courts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(record.map(CourtRecord::to_domain))
    }

    async fn list_active(&self) -> BookingResult<Vec<Court>> {
        let records = sqlx::query_as::<_, CourtRecord>(
            "SELECT id, name, category, hourly_price, active FROM courts \
             WHERE active ORDER BY category, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(records.into_iter().map(CourtRecord::to_domain).collect())
    }

    async fn list_active_by_category(&self, category: &str) -> BookingResult<Vec<Court>> {
        let records = sqlx::query_as::<_, CourtRecord>(
            "SELECT id, name, category, hourly_price, active FROM courts \
             WHERE active AND category = $1 ORDER BY name",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(records.into_iter().map(CourtRecord::to_domain).collect())
    }
}
