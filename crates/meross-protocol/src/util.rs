//! Small value encodings shared by several feature modules: timer
//! clock/weekday fields (`timer`/`trigger` namespaces) and light RGB packing
//! (`light` namespace). Kept here rather than in `meross-registry` because
//! both the feature modules and the wire envelope tests need them.

use crate::error::{ErrorKind, MerossError, MerossResult};

const WEEKDAYS: [&str; 7] = ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];

/// Parse `"HH:MM"` into minutes since midnight. `"24:00"` and anything
/// outside `00:00..=23:59` is rejected (scenario §8.1).
pub fn time_to_minutes(s: &str) -> MerossResult<u32> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| MerossError::new(ErrorKind::Validation, format!("not an HH:MM time: {s}")))?;
    let hour: u32 = h.parse().map_err(|_| MerossError::new(ErrorKind::Validation, format!("bad hour in {s}")))?;
    let minute: u32 = m.parse().map_err(|_| MerossError::new(ErrorKind::Validation, format!("bad minute in {s}")))?;
    if hour > 23 || minute > 59 {
        return Err(MerossError::new(ErrorKind::Validation, format!("time out of range: {s}")));
    }
    Ok(hour * 60 + minute)
}

/// Format minutes since midnight as `"HH:MM"`.
pub fn minutes_to_time(total_minutes: u32) -> String {
    format!("{:02}:{:02}", (total_minutes / 60) % 24, total_minutes % 60)
}

/// Pack a set of weekday names into the vendor's day bitmask. Bit 0 is
/// Monday; when `repeat` is true each selected day also sets its companion
/// "repeat" high bit, matching the firmware's weekly-cycle encoding
/// (scenario §8.2).
pub fn days_to_week_mask(days: &[impl AsRef<str>], repeat: bool) -> u16 {
    let mut mask: u16 = 0;
    for day in days {
        if let Some(bit) = WEEKDAYS.iter().position(|w| w.eq_ignore_ascii_case(day.as_ref())) {
            mask |= 1 << bit;
        }
    }
    if repeat {
        mask |= 1 << 7;
    }
    mask
}

/// Pack an `[r, g, b]` triple (0..=255 each) into a single 24-bit integer.
pub fn rgb_to_int(rgb: [u8; 3]) -> u32 {
    ((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | (rgb[2] as u32)
}

/// Unpack a 24-bit integer into an `[r, g, b]` triple.
pub fn int_to_rgb(packed: u32) -> [u8; 3] {
    [((packed >> 16) & 0xFF) as u8, ((packed >> 8) & 0xFF) as u8, (packed & 0xFF) as u8]
}
