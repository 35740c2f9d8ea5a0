//! ICS text and Google/Outlook deep links for a booked match.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

/// Every match is blocked out for exactly this long.
pub const MATCH_DURATION_HOURS: i64 = 3;

const GOOGLE_CALENDAR_URL: &str = "https://calendar.google.com/calendar/render";
const OUTLOOK_CALENDAR_URL: &str = "https://outlook.live.com/calendar/0/deeplink/compose";

/// Same unreserved set as JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub uid: String,
    pub title: String,
    pub venue: String,
    pub description: String,
    pub start: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::hours(MATCH_DURATION_HOURS)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarLinks {
    pub google: String,
    pub outlook: String,
}

/// Basic-format UTC stamp, e.g. `20261122T083000Z`.
fn ics_stamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// CRLF-terminated VCALENDAR with one VEVENT and a one-hour display alarm.
pub fn to_ics(event: &CalendarEvent, generated_at: DateTime<Utc>) -> String {
    let title = escape_text(&event.title);
    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Matchday Insights//Tickets//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", event.uid),
        format!("DTSTAMP:{}", ics_stamp(generated_at)),
        format!("DTSTART:{}", ics_stamp(event.start)),
        format!("DTEND:{}", ics_stamp(event.end())),
        format!("SUMMARY:{title}"),
        format!("DESCRIPTION:{}", escape_text(&event.description)),
        format!("LOCATION:{}", escape_text(&event.venue)),
        "STATUS:CONFIRMED".to_string(),
        "BEGIN:VALARM".to_string(),
        "TRIGGER:-PT1H".to_string(),
        "ACTION:DISPLAY".to_string(),
        format!("DESCRIPTION:Reminder: {title} starts in 1 hour"),
        "END:VALARM".to_string(),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ];

    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

pub fn google_link(event: &CalendarEvent) -> String {
    format!(
        "{GOOGLE_CALENDAR_URL}?action=TEMPLATE&text={}&dates={}/{}&details={}&location={}",
        encode(&event.title),
        ics_stamp(event.start),
        ics_stamp(event.end()),
        encode(&event.description),
        encode(&event.venue),
    )
}

pub fn outlook_link(event: &CalendarEvent) -> String {
    format!(
        "{OUTLOOK_CALENDAR_URL}?subject={}&startdt={}&enddt={}&body={}&location={}",
        encode(&event.title),
        encode(&event.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
        encode(&event.end().to_rfc3339_opts(SecondsFormat::Secs, true)),
        encode(&event.description),
        encode(&event.venue),
    )
}

pub fn links(event: &CalendarEvent) -> CalendarLinks {
    CalendarLinks {
        google: google_link(event),
        outlook: outlook_link(event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    fn final_match() -> CalendarEvent {
        CalendarEvent {
            uid: "cricket-final@matchday-insights".to_string(),
            title: "Cricket World Cup Final".to_string(),
            venue: "Narendra Modi Stadium, Ahmedabad".to_string(),
            description: "Gates open two hours before play".to_string(),
            start: Utc.with_ymd_and_hms(2026, 11, 22, 8, 30, 0).unwrap(),
        }
    }

    fn field<'a>(ics: &'a str, name: &str) -> &'a str {
        ics.split("\r\n")
            .find_map(|l| l.strip_prefix(name))
            .unwrap_or_else(|| panic!("missing {name}"))
    }

    #[test]
    fn ics_has_paired_blocks_and_three_hour_span() {
        let ics = to_ics(&final_match(), Utc::now());

        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
        assert_eq!(ics.matches("END:VEVENT").count(), 1);
        assert_eq!(ics.matches("BEGIN:VALARM").count(), ics.matches("END:VALARM").count());
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));

        let start = NaiveDateTime::parse_from_str(field(&ics, "DTSTART:"), "%Y%m%dT%H%M%SZ").unwrap();
        let end = NaiveDateTime::parse_from_str(field(&ics, "DTEND:"), "%Y%m%dT%H%M%SZ").unwrap();
        assert_eq!(end - start, Duration::hours(3));
        assert_eq!(field(&ics, "DTSTART:"), "20261122T083000Z");
    }

    #[test]
    fn ics_escapes_text_fields() {
        let ics = to_ics(&final_match(), Utc::now());
        assert_eq!(field(&ics, "LOCATION:"), "Narendra Modi Stadium\\, Ahmedabad");
    }

    #[test]
    fn google_link_query_schema() {
        let url = google_link(&final_match());
        assert!(url.starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE&"));
        assert!(url.contains("&text=Cricket%20World%20Cup%20Final&"));
        assert!(url.contains("&dates=20261122T083000Z/20261122T113000Z&"));
        assert!(url.contains("&location=Narendra%20Modi%20Stadium%2C%20Ahmedabad"));
    }

    #[test]
    fn outlook_link_uses_rfc3339() {
        let url = outlook_link(&final_match());
        assert!(url.starts_with("https://outlook.live.com/calendar/0/deeplink/compose?subject="));
        assert!(url.contains("&startdt=2026-11-22T08%3A30%3A00Z&"));
        assert!(url.contains("&enddt=2026-11-22T11%3A30%3A00Z&"));
    }
}
