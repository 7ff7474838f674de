use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::token::TokenError;

/// Lifetime of an issued token.
pub const TOKEN_TTL_DAYS: i64 = 14;

/// Date and time layout of `exp`, followed by ` UTC±HH`.
const EXPIRY_LAYOUT: &str = "%d.%m.%Y %H:%M:%S";

/// First token segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub exp: String,
}

/// Second token segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub username: String,
}

impl TokenHeader {
    pub fn expiring_at(at: DateTime<Utc>) -> Self {
        Self {
            exp: format_expiry(&at.fixed_offset()),
        }
    }

    pub fn issued_at(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self::expiring_at(now + ttl)
    }

    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        parse_expiry(&self.exp).map(|at| at.with_timezone(&Utc))
    }
}

/// Render `at` as `DD.MM.YYYY HH:MM:SS UTC±HH`, dropping sub-hour offsets.
pub fn format_expiry(at: &DateTime<FixedOffset>) -> String {
    let offset = at.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let hours = offset.abs() / 3600;
    format!("{} UTC{sign}{hours:02}", at.format(EXPIRY_LAYOUT))
}

/// Inverse of [`format_expiry`]. Anything else is malformed.
pub fn parse_expiry(raw: &str) -> Result<DateTime<FixedOffset>, TokenError> {
    let malformed = || TokenError::Malformed(format!("unparseable exp: {raw:?}"));

    let (datetime, zone) = raw.rsplit_once(" UTC").ok_or_else(malformed)?;
    let mut chars = zone.chars();
    let sign = match chars.next() {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Err(malformed()),
    };
    let digits = chars.as_str();
    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let hours: i32 = digits.parse().map_err(|_| malformed())?;
    let offset = FixedOffset::east_opt(sign * hours * 3600).ok_or_else(malformed)?;

    let naive = NaiveDateTime::parse_from_str(datetime, EXPIRY_LAYOUT).map_err(|_| malformed())?;
    offset.from_local_datetime(&naive).single().ok_or_else(malformed)
}

/// Expiry is exclusive: a token is dead at its `exp` instant.
pub fn check_expiry(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), TokenError> {
    if now >= expires_at {
        return Err(TokenError::Expired);
    }
    Ok(())
}
