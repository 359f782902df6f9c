// src/gps/nmea.rs
//! NMEA field parsing and per-sentence handlers

use super::{data::NavState, dispatch::SentenceHandler};
use chrono::Utc;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// A field that could not be used. The update it belonged to is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {field}: {value:?}")]
    Invalid { field: &'static str, value: String },

    #[error("{field} out of range: {value:?}")]
    OutOfRange { field: &'static str, value: String },

    #[error("receiver reports no valid fix")]
    NoFix,
}

impl FieldError {
    fn invalid(field: &'static str, value: &str) -> Self {
        FieldError::Invalid {
            field,
            value: value.to_string(),
        }
    }

    fn out_of_range(field: &'static str, value: &str) -> Self {
        FieldError::OutOfRange {
            field,
            value: value.to_string(),
        }
    }
}

fn field<'a>(fields: &[&'a str], index: usize, name: &'static str) -> Result<&'a str, FieldError> {
    fields.get(index).copied().ok_or(FieldError::Missing(name))
}

/// Parse `HHMMSS` (an optional `.sss` suffix is ignored) into seconds since midnight.
pub fn parse_time_of_day(token: &str) -> Result<u32, FieldError> {
    const NAME: &str = "time of day";

    if token.is_empty() {
        return Err(FieldError::Missing(NAME));
    }
    let bytes = token.as_bytes();
    if bytes.len() < 6 || !bytes[..6].iter().all(u8::is_ascii_digit) {
        return Err(FieldError::invalid(NAME, token));
    }
    match &bytes[6..] {
        [] => {}
        [b'.', frac @ ..] if frac.iter().all(u8::is_ascii_digit) => {}
        _ => return Err(FieldError::invalid(NAME, token)),
    }

    let pair = |i: usize| u32::from(bytes[i] - b'0') * 10 + u32::from(bytes[i + 1] - b'0');
    let (hours, minutes, seconds) = (pair(0), pair(2), pair(4));
    if hours > 23 || minutes > 59 || seconds > 60 {
        return Err(FieldError::out_of_range(NAME, token));
    }

    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Parse a `DDDMM.MMMM` magnitude plus hemisphere letter into signed decimal degrees.
///
/// The minutes are the two digits before the decimal point and the fraction
/// after it, everything further left is whole degrees.
pub fn parse_coordinate(
    token: &str,
    hemisphere: &str,
    name: &'static str,
    negative: &str,
    positive: &str,
    max_degrees: f64,
) -> Result<f64, FieldError> {
    if token.is_empty() {
        return Err(FieldError::Missing(name));
    }
    if token.len() < 5 || !token.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(FieldError::invalid(name, token));
    }

    let int_len = token.find('.').unwrap_or(token.len());
    if int_len < 3 {
        return Err(FieldError::invalid(name, token));
    }
    let (deg_str, min_str) = token.split_at(int_len - 2);

    let degrees: f64 = deg_str.parse().map_err(|_| FieldError::invalid(name, token))?;
    let minutes: f64 = min_str.parse().map_err(|_| FieldError::invalid(name, token))?;
    if minutes >= 60.0 {
        return Err(FieldError::out_of_range(name, token));
    }

    let value = degrees + minutes / 60.0;
    if value > max_degrees {
        return Err(FieldError::out_of_range(name, token));
    }

    if hemisphere == negative {
        Ok(-value)
    } else if hemisphere == positive {
        Ok(value)
    } else if hemisphere.is_empty() {
        Err(FieldError::Missing(name))
    } else {
        Err(FieldError::invalid(name, hemisphere))
    }
}

pub fn parse_latitude(token: &str, hemisphere: &str) -> Result<f64, FieldError> {
    parse_coordinate(token, hemisphere, "latitude", "S", "N", 90.0)
}

pub fn parse_longitude(token: &str, hemisphere: &str) -> Result<f64, FieldError> {
    parse_coordinate(token, hemisphere, "longitude", "W", "E", 180.0)
}

/// Empty fields are `None`; anything else must parse.
fn parse_optional<T: FromStr>(token: &str, name: &'static str) -> Result<Option<T>, FieldError> {
    if token.is_empty() {
        return Ok(None);
    }
    token
        .parse()
        .map(Some)
        .map_err(|_| FieldError::invalid(name, token))
}

/// GGA - Global Positioning System Fix Data
///
/// `time, lat, N/S, lon, E/W, quality, satellites, hdop, altitude, M, geoid sep, M, ...`
#[derive(Debug, Clone, Copy, Default)]
pub struct GgaHandler;

impl SentenceHandler for GgaHandler {
    fn handle(&self, fields: &[&str], state: &NavState) -> Result<(), FieldError> {
        let time = parse_time_of_day(field(fields, 0, "time of day")?)?;
        let lat = parse_latitude(field(fields, 1, "latitude")?, field(fields, 2, "latitude")?)?;
        let lon = parse_longitude(field(fields, 3, "longitude")?, field(fields, 4, "longitude")?)?;
        let quality = parse_optional::<u8>(fields.get(5).copied().unwrap_or(""), "fix quality")?;
        let satellites = parse_optional::<u8>(fields.get(6).copied().unwrap_or(""), "satellites")?;
        let hdop = parse_optional::<f64>(fields.get(7).copied().unwrap_or(""), "hdop")?;
        let altitude = parse_optional::<f64>(fields.get(8).copied().unwrap_or(""), "altitude")?;
        let geoid = parse_optional::<f64>(fields.get(10).copied().unwrap_or(""), "geoid separation")?;

        state.update(|nav| {
            nav.fix_time_secs = Some(time);
            nav.latitude = Some(lat);
            nav.longitude = Some(lon);
            nav.fix_quality = quality;
            nav.satellites = satellites;
            nav.hdop = hdop;
            nav.altitude = altitude;
            nav.geoid_separation = geoid;
            nav.last_fix = Some(Utc::now());
        });

        debug!(time, lat, lon, "position fix");
        Ok(())
    }
}

/// RMC - Recommended Minimum Specific GNSS Data
///
/// `time, status, lat, N/S, lon, E/W, speed (knots), course, date, ...`
#[derive(Debug, Clone, Copy, Default)]
pub struct RmcHandler;

impl SentenceHandler for RmcHandler {
    fn handle(&self, fields: &[&str], state: &NavState) -> Result<(), FieldError> {
        match field(fields, 1, "status")? {
            "A" => {}
            "V" => return Err(FieldError::NoFix),
            other => return Err(FieldError::invalid("status", other)),
        }

        let time = parse_time_of_day(field(fields, 0, "time of day")?)?;
        let lat = parse_latitude(field(fields, 2, "latitude")?, field(fields, 3, "latitude")?)?;
        let lon = parse_longitude(field(fields, 4, "longitude")?, field(fields, 5, "longitude")?)?;
        let speed = parse_optional::<f64>(fields.get(6).copied().unwrap_or(""), "ground speed")?;
        let course = parse_optional::<f64>(fields.get(7).copied().unwrap_or(""), "true course")?;

        state.update(|nav| {
            let now = Utc::now();
            nav.fix_time_secs = Some(time);
            nav.latitude = Some(lat);
            nav.longitude = Some(lon);
            nav.last_fix = Some(now);
            nav.ground_speed = speed;
            nav.true_course = course;
            nav.last_ground_track = Some(now);
        });

        debug!(time, lat, lon, ?speed, ?course, "ground track");
        Ok(())
    }
}
