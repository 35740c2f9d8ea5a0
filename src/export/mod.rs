pub mod calendar;
pub mod qr;

pub use calendar::{CalendarEvent, CalendarLinks};
pub use qr::{TicketQrPayload, TicketRequest};
