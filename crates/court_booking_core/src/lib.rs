pub mod domain;
pub mod ports;
pub mod service;
pub mod slots;

pub use domain::{
    Court, CreateManualReservation, CreateRecurring, CreateReservation, NewPattern,
    NewReservation, PatternWithCourt, PaymentState, RecurrenceOutcome, RecurrencePattern,
    Reservation, ReservationFilter, ReservationKind, ReservationWithCourt, SlotStatus,
};
pub use ports::{
    BookingError, BookingResult, Clock, CourtCatalog, ReservationStore, SystemClock,
};
pub use service::BookingService;
