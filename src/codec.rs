//! # Accession codec
//!
//! Read names in flowgram archives follow the 14-character "universal accession"
//! convention, e.g. `C3U5GWL01CBXT2`:
//!
//! | Characters | Field     | Encoding                                   |
//! | ---------- | --------- | ------------------------------------------ |
//! | 0..6       | timestamp | base-36 of the run start time              |
//! | 6          | hash      | base-36 digit hashed from the run name     |
//! | 7..9       | region    | two decimal digits                         |
//! | 9..14      | x, y      | base-36 of `x * 4096 + y`                  |
//!
//! The base-36 alphabet maps the values 0-25 to `A`-`Z` and 26-35 to `0`-`9`,
//! so `A` is the zero digit. Accessions are case-insensitive.

use std::fmt;

use crate::error::{AccessionError, Result};

/// The base-36 digit alphabet
pub const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a universal accession name
pub const ACCESSION_LEN: usize = 14;

/// Width of the encoded timestamp field
pub const TIMESTAMP_WIDTH: usize = 6;

/// Width of the encoded coordinate field
pub const XY_WIDTH: usize = 5;

/// Coordinates are packed as `x * XY_STRIDE + y`
pub const XY_STRIDE: u64 = 4096;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const SECONDS_PER_MONTH: u64 = 32 * SECONDS_PER_DAY;
const SECONDS_PER_YEAR: u64 = 13 * SECONDS_PER_MONTH;

/// Prime used to reduce the run-name hash
const HASH_MODULUS: u32 = 31;

/// Maps a value in `0..36` to its base-36 digit
fn digit(value: u64) -> char {
    char::from(ALPHABET[value as usize])
}

/// Maps a base-36 digit back to its value
fn digit_value(c: char) -> Result<u64> {
    match c.to_ascii_uppercase() {
        c @ 'A'..='Z' => Ok(u64::from(c as u8 - b'A')),
        c @ '0'..='9' => Ok(u64::from(c as u8 - b'0') + 26),
        _ => Err(AccessionError::InvalidCharacter(c).into()),
    }
}

/// Encodes an integer as a base-36 string, most significant digit first
///
/// Zero encodes to the single zero digit `"A"`.
#[must_use]
pub fn base36_encode(mut n: u64) -> String {
    if n == 0 {
        return digit(0).to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(digit(n % 36));
        n /= 36;
    }
    digits.iter().rev().collect()
}

/// Encodes an integer as exactly `width` base-36 digits
///
/// Shorter encodings are left-padded with the zero digit; longer ones keep only
/// the `width` least significant digits.
#[must_use]
pub fn base36_encode_fixed(n: u64, width: usize) -> String {
    let encoded = base36_encode(n);
    if encoded.len() >= width {
        encoded[encoded.len() - width..].to_string()
    } else {
        let mut padded = String::with_capacity(width);
        (encoded.len()..width).for_each(|_| padded.push(digit(0)));
        padded.push_str(&encoded);
        padded
    }
}

/// Decodes a base-36 string (case-insensitive)
pub fn base36_decode(s: &str) -> Result<u64> {
    s.chars().try_fold(0u64, |total, c| -> Result<u64> {
        let value = digit_value(c)?;
        total
            .checked_mul(36)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(|| AccessionError::Overflow(s.to_string()).into())
    })
}

/// Acquisition time of a sequencing run
///
/// Months and days are stored as given (the encoding reserves 13 month and 32 day
/// slots), the year must be at least 2000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}
impl Timestamp {
    #[must_use]
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Number of seconds the encoding assigns to this timestamp
    fn total(&self) -> Result<u64> {
        let in_range = self.year >= 2000
            && self.month < 13
            && self.day < 32
            && self.hour < 24
            && self.minute < 60
            && self.second < 60;
        if !in_range {
            return Err(AccessionError::TimestampOutOfRange(self.to_string()).into());
        }
        Ok(u64::from(self.year - 2000) * SECONDS_PER_YEAR
            + u64::from(self.month) * SECONDS_PER_MONTH
            + u64::from(self.day) * SECONDS_PER_DAY
            + u64::from(self.hour) * 60 * 60
            + u64::from(self.minute) * 60
            + u64::from(self.second))
    }
}
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Encodes a timestamp as the six-character accession prefix
///
/// Shorter totals are left-padded with `A`. A total of `36^6` or more is an error
/// rather than being truncated to its six low digits, since the truncated prefix
/// would decode to a different timestamp. Callers that want the truncating form
/// can use [`base36_encode_fixed`] directly.
///
/// Fails if a component is outside its slot or the total does not fit in six digits.
pub fn timestamp_encode(timestamp: Timestamp) -> Result<String> {
    let total = timestamp.total()?;
    if total >= 36u64.pow(TIMESTAMP_WIDTH as u32) {
        return Err(AccessionError::TimestampOutOfRange(timestamp.to_string()).into());
    }
    Ok(base36_encode_fixed(total, TIMESTAMP_WIDTH))
}

/// Decodes a base-36 timestamp by successive divmod by 60, 60, 24, 32 and 13
pub fn timestamp_decode(s: &str) -> Result<Timestamp> {
    let total = base36_decode(s)?;
    let (total, second) = (total / 60, total % 60);
    let (total, minute) = (total / 60, total % 60);
    let (total, hour) = (total / 24, total % 24);
    let (total, day) = (total / 32, total % 32);
    let (years, month) = (total / 13, total % 13);
    let year = u16::try_from(years + 2000)
        .map_err(|_| AccessionError::TimestampOutOfRange(s.to_string()))?;
    Ok(Timestamp::new(
        year,
        month as u8,
        day as u8,
        hour as u8,
        minute as u8,
        second as u8,
    ))
}

/// Encodes a well location as `base36(x * 4096 + y)`
///
/// `y` must be below 4096; the result is unpadded (see [`Accession::encode`] for
/// the fixed-width form).
pub fn xy_encode(x: u32, y: u32) -> Result<String> {
    if u64::from(y) >= XY_STRIDE {
        return Err(AccessionError::CoordinatesOutOfRange(x, y).into());
    }
    Ok(base36_encode(u64::from(x) * XY_STRIDE + u64::from(y)))
}

/// Decodes a base-36 well location into `(x, y)`
pub fn xy_decode(s: &str) -> Result<(u32, u32)> {
    let xy = base36_decode(s)?;
    let x = u32::try_from(xy / XY_STRIDE).map_err(|_| AccessionError::Overflow(s.to_string()))?;
    Ok((x, (xy % XY_STRIDE) as u32))
}

/// Hashes a run name to the single disambiguating accession character
///
/// Character codes are summed and reduced modulo 31 (the largest prime below 36)
/// at every step, then mapped through the base-36 alphabet.
#[must_use]
pub fn name_hash(run_name: &str) -> char {
    let value = run_name
        .chars()
        .fold(0u32, |acc, c| (acc + u32::from(c)) % HASH_MODULUS);
    digit(u64::from(value))
}

/// A decoded universal accession name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Accession {
    pub timestamp: Timestamp,
    pub hash: char,
    pub region: u8,
    pub x: u32,
    pub y: u32,
}
impl Accession {
    /// Parses a 14-character accession
    ///
    /// Names that do not follow the convention fail with an [`AccessionError`];
    /// callers treat that as "coordinates unavailable".
    pub fn parse(name: &str) -> Result<Self> {
        if name.len() != ACCESSION_LEN || !name.is_ascii() {
            return Err(AccessionError::InvalidLength(name.to_string()).into());
        }
        let timestamp = timestamp_decode(&name[..6])?;
        let hash = char::from(name.as_bytes()[6]).to_ascii_uppercase();
        digit_value(hash)?;
        let region_str = &name[7..9];
        if !region_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccessionError::InvalidRegion(region_str.to_string()).into());
        }
        let region = region_str
            .parse()
            .map_err(|_| AccessionError::InvalidRegion(region_str.to_string()))?;
        let (x, y) = xy_decode(&name[9..])?;
        Ok(Self {
            timestamp,
            hash,
            region,
            x,
            y,
        })
    }

    /// Renders the accession back to its 14-character form
    pub fn encode(&self) -> Result<String> {
        if self.region > 99 {
            return Err(AccessionError::InvalidRegion(self.region.to_string()).into());
        }
        if u64::from(self.y) >= XY_STRIDE {
            return Err(AccessionError::CoordinatesOutOfRange(self.x, self.y).into());
        }
        let xy = u64::from(self.x) * XY_STRIDE + u64::from(self.y);
        if xy >= 36u64.pow(XY_WIDTH as u32) {
            return Err(AccessionError::CoordinatesOutOfRange(self.x, self.y).into());
        }
        let mut name = timestamp_encode(self.timestamp)?;
        name.push(self.hash);
        name.push_str(&format!("{:02}", self.region));
        name.push_str(&base36_encode_fixed(xy, XY_WIDTH));
        Ok(name)
    }
}
