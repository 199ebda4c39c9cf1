//! Mailbox time zone resolution
//!
//! Graph reports the mailbox time zone as a Windows display name
//! ("Pacific Standard Time"). The week-window math only needs the standard
//! UTC offset, so this table maps the common names to fixed offsets and
//! falls back to UTC for anything it does not know. DST-correct conversion
//! is the host's job.

use chrono::FixedOffset;
use tracing::warn;

/// Resolve a Windows time zone display name to its standard UTC offset.
///
/// Unknown names resolve to UTC with a warning.
pub fn resolve_offset(name: &str) -> FixedOffset {
    match standard_offset_minutes(name.trim()) {
        Some(minutes) => fixed_east(minutes * 60),
        None => {
            warn!(zone = name, "unknown mailbox time zone, falling back to UTC");
            fixed_east(0)
        }
    }
}

fn fixed_east(seconds: i32) -> FixedOffset {
    // table offsets are all within chrono's +/-24h bound
    FixedOffset::east_opt(seconds).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
}

fn standard_offset_minutes(name: &str) -> Option<i32> {
    let minutes = match name {
        "UTC" | "Coordinated Universal Time" => 0,
        "Samoa Standard Time" => -11 * 60,
        "Hawaiian Standard Time" => -10 * 60,
        "Alaskan Standard Time" => -9 * 60,
        "Pacific Standard Time" => -8 * 60,
        "Mountain Standard Time" | "US Mountain Standard Time" => -7 * 60,
        "Central Standard Time" | "Canada Central Standard Time" => -6 * 60,
        "Eastern Standard Time" | "US Eastern Standard Time" => -5 * 60,
        "Atlantic Standard Time" => -4 * 60,
        "Newfoundland Standard Time" => -3 * 60 - 30,
        "E. South America Standard Time" | "Argentina Standard Time" => -3 * 60,
        "Azores Standard Time" => -60,
        "GMT Standard Time" | "Greenwich Standard Time" => 0,
        "W. Europe Standard Time"
        | "Central Europe Standard Time"
        | "Central European Standard Time"
        | "Romance Standard Time"
        | "W. Central Africa Standard Time" => 60,
        "E. Europe Standard Time"
        | "FLE Standard Time"
        | "GTB Standard Time"
        | "Israel Standard Time"
        | "Egypt Standard Time"
        | "South Africa Standard Time" => 2 * 60,
        "Russian Standard Time" | "Arab Standard Time" | "E. Africa Standard Time" => 3 * 60,
        "Iran Standard Time" => 3 * 60 + 30,
        "Arabian Standard Time" | "Mauritius Standard Time" => 4 * 60,
        "Afghanistan Standard Time" => 4 * 60 + 30,
        "Pakistan Standard Time" | "West Asia Standard Time" => 5 * 60,
        "India Standard Time" | "Sri Lanka Standard Time" => 5 * 60 + 30,
        "Nepal Standard Time" => 5 * 60 + 45,
        "Bangladesh Standard Time" | "Central Asia Standard Time" => 6 * 60,
        "Myanmar Standard Time" => 6 * 60 + 30,
        "SE Asia Standard Time" => 7 * 60,
        "China Standard Time"
        | "Singapore Standard Time"
        | "Taipei Standard Time"
        | "W. Australia Standard Time" => 8 * 60,
        "Tokyo Standard Time" | "Korea Standard Time" => 9 * 60,
        "Cen. Australia Standard Time" | "AUS Central Standard Time" => 9 * 60 + 30,
        "AUS Eastern Standard Time" | "E. Australia Standard Time" => 10 * 60,
        "Central Pacific Standard Time" => 11 * 60,
        "New Zealand Standard Time" | "Fiji Standard Time" => 12 * 60,
        _ => return None,
    };
    Some(minutes)
}
