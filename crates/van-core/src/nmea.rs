//! NMEA 0183 sentence parsing
//!
//! Only the two sentence kinds the monitor consumes are understood:
//!
//! - `RMC` (recommended minimum): position, speed, course, time and date
//! - `GGA` (fix data): fix quality, satellites in use and altitude
//!
//! Both `$GP` (GPS) and `$GN` (multi-constellation) talkers are accepted.
//! Every sentence must carry a valid `*hh` checksum; anything else is a
//! [`ParseError`], never a panic.

use core::fmt;

use crate::error::ParseError;
use crate::geo::Coordinate;

/// Knots to km/h
pub const KNOTS_TO_KMH: f32 = 1.852;

/// Speeds at or below this are reported as stationary
pub const SPEED_DEADBAND_KMH: f32 = 1.0;

/// Upper bound on comma-separated fields we ever look at
const MAX_FIELDS: usize = 16;

/// RMC field count range, NMEA 2.x (12) through 4.1 (14)
const RMC_FIELDS: (usize, usize) = (12, 14);

/// GGA field count range. Altitude is field 9, the full sentence has 15.
const GGA_FIELDS: (usize, usize) = (10, 15);

/// Which constellation talker produced the sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Talker {
    Gps,
    Gnss,
}

/// UTC time of day as reported by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millis: u16,
}

impl TimeOfDay {
    pub const MILLIS_PER_DAY: u32 = 86_400_000;

    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
            millis: 0,
        }
    }

    pub const fn millis_of_day(&self) -> u32 {
        ((self.hour as u32 * 60 + self.minute as u32) * 60 + self.second as u32) * 1000
            + self.millis as u32
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// UTC calendar date from an RMC sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

/// Fix quality indicator from GGA field 6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixQuality {
    #[default]
    NoFix,
    Gps,
    Dgps,
    Pps,
    Rtk,
    FloatRtk,
    Estimated,
    Manual,
    Simulation,
    Other(u8),
}

impl FixQuality {
    pub const fn from_indicator(value: u8) -> Self {
        match value {
            0 => Self::NoFix,
            1 => Self::Gps,
            2 => Self::Dgps,
            3 => Self::Pps,
            4 => Self::Rtk,
            5 => Self::FloatRtk,
            6 => Self::Estimated,
            7 => Self::Manual,
            8 => Self::Simulation,
            other => Self::Other(other),
        }
    }

    pub const fn has_fix(self) -> bool {
        !matches!(self, Self::NoFix)
    }
}

/// Position, speed and time from an RMC sentence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSentence {
    pub talker: Talker,
    pub time: Option<TimeOfDay>,
    /// Status field: `A` is valid, `V` is a receiver warning
    pub valid: bool,
    /// `None` when the receiver has no position yet (empty fields).
    /// Never `Some(0, 0)` as a stand-in for unknown.
    pub position: Option<Coordinate>,
    pub speed_kmh: f32,
    pub course_deg: Option<f32>,
    pub date: Option<Date>,
}

/// Fix quality, satellites and altitude from a GGA sentence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteSentence {
    pub talker: Talker,
    pub time: Option<TimeOfDay>,
    pub quality: FixQuality,
    pub satellites: Option<u8>,
    pub altitude_m: Option<f32>,
}

/// A successfully parsed sentence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sentence {
    Position(PositionSentence),
    Satellites(SatelliteSentence),
}

#[derive(Clone, Copy)]
enum Kind {
    Rmc,
    Gga,
}

/// Parse and validate one line of receiver output.
///
/// Trailing CR/LF and surrounding whitespace are ignored.
pub fn parse(line: &[u8]) -> Result<Sentence, ParseError> {
    if !line.is_ascii() {
        return Err(ParseError::NotAscii);
    }
    let line = core::str::from_utf8(line).map_err(|_| ParseError::NotAscii)?;
    parse_str(line)
}

/// [`parse`] for text that is already a `&str`
pub fn parse_str(line: &str) -> Result<Sentence, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let body = line.strip_prefix('$').ok_or(ParseError::MissingPrefix)?;
    let (talker, kind) = identify(body)?;

    let (body, checksum) = body.split_once('*').ok_or(ParseError::MissingChecksum)?;
    let expected = parse_checksum(checksum)?;
    let computed = checksum_of(body);
    if expected != computed {
        return Err(ParseError::ChecksumMismatch { expected, computed });
    }

    let (min, max) = match kind {
        Kind::Rmc => RMC_FIELDS,
        Kind::Gga => GGA_FIELDS,
    };
    let found = body.split(',').count();
    if found < min || found > max {
        return Err(ParseError::FieldCount { min, max, found });
    }
    let fields: heapless::Vec<&str, MAX_FIELDS> = body.split(',').take(MAX_FIELDS).collect();

    match kind {
        Kind::Rmc => parse_rmc(talker, &fields).map(Sentence::Position),
        Kind::Gga => parse_gga(talker, &fields).map(Sentence::Satellites),
    }
}

/// XOR of every byte between `$` and `*`
pub fn checksum_of(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

fn identify(body: &str) -> Result<(Talker, Kind), ParseError> {
    let id = body.split([',', '*']).next().unwrap_or("");
    let talker = match id.get(..2) {
        Some("GP") => Talker::Gps,
        Some("GN") => Talker::Gnss,
        _ => return Err(ParseError::UnsupportedSentence),
    };
    let kind = match id.get(2..) {
        Some("RMC") => Kind::Rmc,
        Some("GGA") => Kind::Gga,
        _ => return Err(ParseError::UnsupportedSentence),
    };
    Ok((talker, kind))
}

fn parse_checksum(text: &str) -> Result<u8, ParseError> {
    if text.len() != 2 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::MalformedChecksum);
    }
    u8::from_str_radix(text, 16).map_err(|_| ParseError::MalformedChecksum)
}

fn parse_rmc(talker: Talker, fields: &[&str]) -> Result<PositionSentence, ParseError> {
    let time = parse_time(fields[1])?;
    let valid = match fields[2] {
        "A" => true,
        "V" => false,
        _ => return Err(ParseError::InvalidField { field: "status" }),
    };
    let position = parse_position(fields[3], fields[4], fields[5], fields[6])?;
    if valid && position.is_none() {
        return Err(ParseError::InvalidField { field: "latitude" });
    }

    let speed_kmh = match fields[7] {
        "" => 0.0,
        text => {
            let knots: f32 = text
                .parse()
                .map_err(|_| ParseError::InvalidField { field: "speed" })?;
            if !knots.is_finite() || knots < 0.0 {
                return Err(ParseError::InvalidField { field: "speed" });
            }
            let kmh = knots * KNOTS_TO_KMH;
            if kmh > SPEED_DEADBAND_KMH { kmh } else { 0.0 }
        }
    };

    let course_deg = optional_number::<f32>(fields[8], "course")?;
    let date = parse_date(fields[9])?;

    Ok(PositionSentence {
        talker,
        time,
        valid,
        position,
        speed_kmh,
        course_deg,
        date,
    })
}

fn parse_gga(talker: Talker, fields: &[&str]) -> Result<SatelliteSentence, ParseError> {
    let time = parse_time(fields[1])?;
    let indicator: u8 = fields[6]
        .parse()
        .map_err(|_| ParseError::InvalidField { field: "fix quality" })?;
    let satellites = optional_number::<u8>(fields[7], "satellites")?;
    let altitude_m = optional_number::<f32>(fields[9], "altitude")?;

    Ok(SatelliteSentence {
        talker,
        time,
        quality: FixQuality::from_indicator(indicator),
        satellites,
        altitude_m,
    })
}

fn optional_number<T: core::str::FromStr>(
    text: &str,
    field: &'static str,
) -> Result<Option<T>, ParseError> {
    if text.is_empty() {
        return Ok(None);
    }
    text.parse()
        .map(Some)
        .map_err(|_| ParseError::InvalidField { field })
}

/// `hhmmss[.sss]`
fn parse_time(text: &str) -> Result<Option<TimeOfDay>, ParseError> {
    const FIELD: ParseError = ParseError::InvalidField { field: "time" };
    if text.is_empty() {
        return Ok(None);
    }
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.len() != 6 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FIELD);
    }
    let hour: u8 = whole[0..2].parse().map_err(|_| FIELD)?;
    let minute: u8 = whole[2..4].parse().map_err(|_| FIELD)?;
    let second: u8 = whole[4..6].parse().map_err(|_| FIELD)?;
    if hour > 23 || minute > 59 || second > 60 {
        return Err(FIELD);
    }

    let mut millis = 0u16;
    let mut scale = 100u16;
    for b in fraction.bytes().take(3) {
        if !b.is_ascii_digit() {
            return Err(FIELD);
        }
        millis += (b - b'0') as u16 * scale;
        scale /= 10;
    }

    Ok(Some(TimeOfDay {
        hour,
        minute,
        second,
        millis,
    }))
}

/// `ddmmyy`
fn parse_date(text: &str) -> Result<Option<Date>, ParseError> {
    const FIELD: ParseError = ParseError::InvalidField { field: "date" };
    if text.is_empty() {
        return Ok(None);
    }
    if text.len() != 6 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FIELD);
    }
    let day: u8 = text[0..2].parse().map_err(|_| FIELD)?;
    let month: u8 = text[2..4].parse().map_err(|_| FIELD)?;
    let year: u16 = text[4..6].parse().map_err(|_| FIELD)?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(FIELD);
    }
    Ok(Some(Date {
        day,
        month,
        year: 2000 + year,
    }))
}

fn parse_position(
    lat: &str,
    lat_hemisphere: &str,
    lon: &str,
    lon_hemisphere: &str,
) -> Result<Option<Coordinate>, ParseError> {
    if lat.is_empty() && lon.is_empty() {
        return Ok(None);
    }

    let latitude = degrees_minutes(lat, 90.0, "latitude")?;
    let latitude = match lat_hemisphere {
        "N" => latitude,
        "S" => -latitude,
        _ => return Err(ParseError::InvalidField { field: "latitude hemisphere" }),
    };

    let longitude = degrees_minutes(lon, 180.0, "longitude")?;
    let longitude = match lon_hemisphere {
        "E" => longitude,
        "W" => -longitude,
        _ => return Err(ParseError::InvalidField { field: "longitude hemisphere" }),
    };

    Ok(Some(Coordinate::new(latitude, longitude)))
}

/// `(d)ddmm.mmmm` to unsigned decimal degrees
fn degrees_minutes(text: &str, max_degrees: f64, field: &'static str) -> Result<f64, ParseError> {
    let raw: f64 = text
        .parse()
        .map_err(|_| ParseError::InvalidField { field })?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(ParseError::InvalidField { field });
    }

    let degrees = libm::trunc(raw / 100.0);
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(ParseError::InvalidField { field });
    }

    let value = degrees + minutes / 60.0;
    if value > max_degrees {
        return Err(ParseError::InvalidField { field });
    }
    Ok(value)
}
