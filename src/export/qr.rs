//! Ticket QR payloads. The JSON text produced here is what gets handed to a
//! QR image encoder; rendering the image is not done in this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::sim::RandomSource;
use crate::state::EventProfile;

const SEAT_BLOCKS: &[&str] = &["A", "B", "C", "D", "E", "F"];

/// Body of `POST /events/:id/tickets`.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketRequest {
    pub holder: String,
    pub seat: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQrPayload {
    pub ticket_id: String,
    pub event_id: String,
    pub event_title: String,
    pub event_date: String,
    pub venue: String,
    pub seat: String,
    pub holder: String,
    pub booking_ref: String,
    /// Issue time, epoch millis.
    pub timestamp: i64,
    pub verification: String,
}

impl TicketQrPayload {
    /// Recomputes the verification code and compares it to the stored one.
    pub fn verify(&self) -> bool {
        verification_code(&self.ticket_id, &self.booking_ref, self.timestamp) == self.verification
    }

    /// JSON text to feed the QR encoder.
    pub fn to_qr_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// First 16 hex chars of SHA-256 over `ticket_id|booking_ref|timestamp`.
pub fn verification_code(ticket_id: &str, booking_ref: &str, timestamp: i64) -> String {
    let digest = Sha256::digest(format!("{ticket_id}|{booking_ref}|{timestamp}").as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Issue a mock ticket for `event`. Seat is drawn at random when not requested.
pub fn issue_ticket(
    event: &EventProfile,
    request: &TicketRequest,
    rng: &dyn RandomSource,
    issued_at: DateTime<Utc>,
) -> Result<TicketQrPayload> {
    let holder = request.holder.trim();
    if holder.is_empty() {
        return Err(AppError::Validation("holder must not be empty".to_string()));
    }

    let timestamp = issued_at.timestamp_millis();
    let ticket_id = format!("TKT-{timestamp}-{:04}", rng.uniform_int(0, 9_999));
    let booking_ref = format!("BK-{:08X}", rng.uniform_int(0, u32::MAX - 1));
    let seat = match request.seat.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => format!(
            "Block {}, Row {}, Seat {}",
            SEAT_BLOCKS[rng.uniform_int(0, SEAT_BLOCKS.len() as u32 - 1) as usize],
            rng.uniform_int(1, 30),
            rng.uniform_int(1, 40),
        ),
    };
    let verification = verification_code(&ticket_id, &booking_ref, timestamp);

    Ok(TicketQrPayload {
        ticket_id,
        event_id: event.id.to_string(),
        event_title: event.title.to_string(),
        event_date: event.kickoff.to_string(),
        venue: event.venue.to_string(),
        seat,
        holder: holder.to_string(),
        booking_ref,
        timestamp,
        verification,
    })
}
