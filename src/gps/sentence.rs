// src/gps/sentence.rs
//! NMEA sentence framing: checksum validation for inbound lines and
//! framing for outbound receiver commands.

use thiserror::Error;

/// Why a raw line was rejected. The `Display` text is meant for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SentenceError {
    #[error("Invalid NMEA message: missing '$' start marker")]
    MissingStart,

    #[error("Invalid NMEA message: missing '*' checksum separator")]
    MissingSeparator,

    #[error("Invalid NMEA message: more than one '*' separator")]
    ExtraSeparator,

    #[error("Missing checksum. Fewer than two bytes after asterisk")]
    MissingChecksum,

    #[error("Invalid checksum digits {0:?}")]
    InvalidChecksum(String),

    #[error("Checksum failed. Calculated {calculated:#04X}; expected {expected:#04X}")]
    Mismatch { calculated: u8, expected: u8 },
}

/// XOR of every byte, in order.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Validate a `$<payload>*<hh>` line and return the payload bytes.
///
/// The checksum covers the payload exactly as received. Only the first two
/// bytes after `*` are read as the checksum, so a trailing `\r` or other
/// suffix does not affect the result. Never panics, whatever the input.
pub fn validate(line: &[u8]) -> Result<&[u8], SentenceError> {
    let body = match line.split_first() {
        Some((b'$', body)) => body,
        _ => return Err(SentenceError::MissingStart),
    };

    let mut parts = body.split(|&b| b == b'*');
    let payload = parts.next().unwrap_or_default();
    let digits = parts.next().ok_or(SentenceError::MissingSeparator)?;
    if parts.next().is_some() {
        return Err(SentenceError::ExtraSeparator);
    }

    if digits.len() < 2 {
        return Err(SentenceError::MissingChecksum);
    }

    let expected = match (hex_value(digits[0]), hex_value(digits[1])) {
        (Some(hi), Some(lo)) => (hi << 4) | lo,
        _ => {
            return Err(SentenceError::InvalidChecksum(
                String::from_utf8_lossy(&digits[..2]).into_owned(),
            ))
        }
    };

    let calculated = checksum(payload);
    if calculated != expected {
        return Err(SentenceError::Mismatch {
            calculated,
            expected,
        });
    }

    Ok(payload)
}

/// Frame a payload for transmission: `$<payload>*<HH>\r\n`.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 6);
    out.push(b'$');
    out.extend_from_slice(payload);
    out.extend_from_slice(format!("*{:02X}\r\n", checksum(payload)).as_bytes());
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const GGA: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    fn framable(byte: u8) -> bool {
        !matches!(byte, b'$' | b'*' | b'\r' | b'\n')
    }

    #[test]
    fn test_validate_strips_framing() {
        let payload = validate(GGA).unwrap();
        assert_eq!(payload, b"GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
    }

    #[test]
    fn test_validate_accepts_lowercase_and_trailing_cr() {
        assert!(validate(b"$GPGSV,3,1,12,01,40,083,46*44\r").is_ok());
        assert!(validate(b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6a").is_ok());
    }

    #[test]
    fn test_frame_baud_command() {
        assert_eq!(frame(b"PMTK251,38400"), b"$PMTK251,38400*27\r\n".to_vec());
        assert_eq!(frame(b"PMTK251,9600"), b"$PMTK251,9600*17\r\n".to_vec());
    }

    #[test]
    fn test_frame_then_validate_every_byte() {
        let all: Vec<u8> = (0..=u8::MAX).filter(|&b| framable(b)).collect();
        for byte in &all {
            let payload = [*byte];
            assert_eq!(validate(&frame(&payload)), Ok(&payload[..]), "byte {:#04X}", byte);
        }
        assert_eq!(validate(&frame(&all)), Ok(&all[..]));
        assert_eq!(validate(&frame(b"")), Ok(&b""[..]));
    }

    #[test]
    fn test_frame_then_validate_random_payloads() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let len = rng.gen_range(0..120);
            let payload: Vec<u8> = (0..len)
                .map(|_| rng.gen::<u8>())
                .filter(|&b| framable(b))
                .collect();
            assert_eq!(validate(&frame(&payload)), Ok(&payload[..]), "payload {:?}", payload);
        }
    }

    #[test]
    fn test_non_utf8_payload_is_checked_as_received() {
        let framed = frame(b"PGRMT,GPS 18x,T,25\xb0C");
        assert_eq!(validate(&framed), Ok(&b"PGRMT,GPS 18x,T,25\xb0C"[..]));
    }

    #[test]
    fn test_missing_markers() {
        assert_eq!(validate(b""), Err(SentenceError::MissingStart));
        assert_eq!(validate(b"GPGGA,123519*47"), Err(SentenceError::MissingStart));
        assert_eq!(validate(b" $GPGGA,123519*47"), Err(SentenceError::MissingStart));
        assert_eq!(validate(b"$GPGGA,123519"), Err(SentenceError::MissingSeparator));
        assert_eq!(validate(b"$"), Err(SentenceError::MissingSeparator));
        assert_eq!(validate(b"$A*41*41"), Err(SentenceError::ExtraSeparator));
    }

    #[test]
    fn test_short_or_bad_checksum() {
        assert_eq!(validate(b"$GPGGA*"), Err(SentenceError::MissingChecksum));
        assert_eq!(validate(b"$GPGGA*4"), Err(SentenceError::MissingChecksum));
        assert!(matches!(validate(b"$GPGGA*G1"), Err(SentenceError::InvalidChecksum(_))));
        assert!(matches!(validate(b"$GPGGA*+1"), Err(SentenceError::InvalidChecksum(_))));
        assert!(matches!(validate(b"$A*\xc3\xa9"), Err(SentenceError::InvalidChecksum(_))));
    }

    #[test]
    fn test_garbage_never_panics() {
        let mut rng = rand::thread_rng();
        let fixed: [&[u8]; 5] = [b"\xff\xfe*", b"$*\x80", b"$\x00\x00*00", b"*$", b"$$$***"];
        for line in fixed {
            let _ = validate(line);
        }
        for _ in 0..500 {
            let len = rng.gen_range(0..40);
            let line: Vec<u8> = (0..len).map(|_| rng.gen::<u8>()).collect();
            let _ = validate(&line);
        }
    }

    #[test]
    fn test_flipped_bit_reports_both_values() {
        // '0' -> '1' flips the low bit of the payload checksum
        let err = validate(b"$PMTK251,38401*27").unwrap_err();
        assert_eq!(
            err,
            SentenceError::Mismatch {
                calculated: 0x26,
                expected: 0x27
            }
        );
        assert_eq!(err.to_string(), "Checksum failed. Calculated 0x26; expected 0x27");
    }
}
