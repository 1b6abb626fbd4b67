//! Scalar payload values.
//!
//! - [`PrimitiveKind`] - the closed set of scalar kinds a payload can be decoded to
//! - [`PrimitiveValue`] - a decoded scalar
//! - [`Primitive`] - maps a Rust type to its kind
//! - [`Decimal`] - arbitrary-precision decimal number kept in its textual form

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use derive_more::Display;
use uuid::Uuid;

use crate::{Error, ParseNode, Result};

// ============================================================================
// Kinds and values
// ============================================================================

/// Kind of a scalar payload value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PrimitiveKind {
    /// `true` or `false`.
    Boolean,
    /// Signed 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Short,
    /// Signed 32-bit integer.
    Int,
    /// Signed 64-bit integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Arbitrary-precision decimal.
    Decimal,
    /// Text.
    String,
    /// UUID.
    Uuid,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time with a UTC offset.
    DateTimeOffset,
    /// Signed duration.
    Duration,
    /// Base64-encoded bytes.
    ByteArray,
}

/// A decoded scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// Boolean value.
    Boolean(bool),
    /// Byte value.
    Byte(i8),
    /// Short value.
    Short(i16),
    /// Int value.
    Int(i32),
    /// Long value.
    Long(i64),
    /// Float value.
    Float(f32),
    /// Double value.
    Double(f64),
    /// Decimal value.
    Decimal(Decimal),
    /// String value.
    String(String),
    /// UUID value.
    Uuid(Uuid),
    /// Date value.
    Date(NaiveDate),
    /// Time value.
    Time(NaiveTime),
    /// Date-time value.
    DateTimeOffset(DateTime<FixedOffset>),
    /// Duration value.
    Duration(TimeDelta),
    /// Byte array value.
    ByteArray(Vec<u8>),
}

impl PrimitiveValue {
    /// Kind of this value.
    #[must_use]
    pub const fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Boolean(_) => PrimitiveKind::Boolean,
            Self::Byte(_) => PrimitiveKind::Byte,
            Self::Short(_) => PrimitiveKind::Short,
            Self::Int(_) => PrimitiveKind::Int,
            Self::Long(_) => PrimitiveKind::Long,
            Self::Float(_) => PrimitiveKind::Float,
            Self::Double(_) => PrimitiveKind::Double,
            Self::Decimal(_) => PrimitiveKind::Decimal,
            Self::String(_) => PrimitiveKind::String,
            Self::Uuid(_) => PrimitiveKind::Uuid,
            Self::Date(_) => PrimitiveKind::Date,
            Self::Time(_) => PrimitiveKind::Time,
            Self::DateTimeOffset(_) => PrimitiveKind::DateTimeOffset,
            Self::Duration(_) => PrimitiveKind::Duration,
            Self::ByteArray(_) => PrimitiveKind::ByteArray,
        }
    }

    /// Decodes a value of `kind` from a parse node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not hold a value of that kind.
    pub fn read(node: &dyn ParseNode, kind: PrimitiveKind) -> Result<Option<Self>> {
        let value = match kind {
            PrimitiveKind::Boolean => node.bool_value()?.map(Self::Boolean),
            PrimitiveKind::Byte => node.byte_value()?.map(Self::Byte),
            PrimitiveKind::Short => node.short_value()?.map(Self::Short),
            PrimitiveKind::Int => node.int_value()?.map(Self::Int),
            PrimitiveKind::Long => node.long_value()?.map(Self::Long),
            PrimitiveKind::Float => node.float_value()?.map(Self::Float),
            PrimitiveKind::Double => node.double_value()?.map(Self::Double),
            PrimitiveKind::Decimal => node.decimal_value()?.map(Self::Decimal),
            PrimitiveKind::String => node.string_value()?.map(Self::String),
            PrimitiveKind::Uuid => node.uuid_value()?.map(Self::Uuid),
            PrimitiveKind::Date => node.date_value()?.map(Self::Date),
            PrimitiveKind::Time => node.time_value()?.map(Self::Time),
            PrimitiveKind::DateTimeOffset => node.date_time_value()?.map(Self::DateTimeOffset),
            PrimitiveKind::Duration => node.duration_value()?.map(Self::Duration),
            PrimitiveKind::ByteArray => node.bytes_value()?.map(Self::ByteArray),
        };
        Ok(value)
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::DateTimeOffset(v) => f.write_str(&v.to_rfc3339()),
            Self::Duration(v) => f.write_str(&format_duration(*v)),
            Self::ByteArray(v) => f.write_str(&STANDARD.encode(v)),
        }
    }
}

// ============================================================================
// Primitive trait
// ============================================================================

/// A Rust type that a scalar payload can be decoded into.
///
/// # Example
///
/// ```
/// use grapnel_core::{Primitive, PrimitiveKind, PrimitiveValue};
///
/// assert_eq!(i32::KIND, PrimitiveKind::Int);
/// assert_eq!(i32::from_value(PrimitiveValue::Int(7)), Some(7));
/// assert_eq!(i32::from_value(PrimitiveValue::Long(7)), None);
/// ```
pub trait Primitive: Sized + Send + 'static {
    /// Kind requested from the payload.
    const KIND: PrimitiveKind;

    /// Converts a decoded value; `None` if the value has another kind.
    fn from_value(value: PrimitiveValue) -> Option<Self>;

    /// Like [`Primitive::from_value`], failing with
    /// [`Error::UnsupportedPrimitive`] on a mismatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted.
    fn try_from_value(value: PrimitiveValue) -> Result<Self> {
        Self::from_value(value).ok_or(Error::UnsupportedPrimitive {
            type_name: std::any::type_name::<Self>(),
        })
    }
}

macro_rules! impl_primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const KIND: PrimitiveKind = PrimitiveKind::$kind;

                fn from_value(value: PrimitiveValue) -> Option<Self> {
                    match value {
                        PrimitiveValue::$kind(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_primitive! {
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    DateTime<FixedOffset> => DateTimeOffset,
    TimeDelta => Duration,
    Vec<u8> => ByteArray,
}

// ============================================================================
// Decimal
// ============================================================================

/// Arbitrary-precision decimal number.
///
/// The number is validated and kept verbatim, so no precision is lost.
///
/// ```
/// use grapnel_core::Decimal;
///
/// let value: Decimal = "12345678901234567890.000000000001".parse().expect("decimal");
/// assert_eq!(value.as_str(), "12345678901234567890.000000000001");
/// assert!("1.2.3".parse::<Decimal>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct Decimal(String);

impl Decimal {
    /// Textual form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Closest `f64`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.0.parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if is_decimal(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::deserialization("", format!("invalid decimal number {s:?}")))
        }
    }
}

/// `[+-]digits[.digits][(e|E)[+-]digits]`
fn is_decimal(s: &str) -> bool {
    fn digits(s: &str) -> (usize, &str) {
        let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        (end, s.get(end..).unwrap_or_default())
    }

    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (integer, rest) = digits(s);
    let (fraction, rest) = match rest.strip_prefix('.') {
        Some(rest) => {
            let (count, rest) = digits(rest);
            if count == 0 {
                return false;
            }
            (count, rest)
        }
        None => (0, rest),
    };
    if integer + fraction == 0 {
        return false;
    }
    match rest.strip_prefix(['e', 'E']) {
        Some(exponent) => {
            let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
            let (count, rest) = digits(exponent);
            count > 0 && rest.is_empty()
        }
        None => rest.is_empty(),
    }
}

// ============================================================================
// ISO 8601 durations
// ============================================================================

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Parses an ISO 8601 duration such as `P1DT2H30M` or `-PT0.5S`.
///
/// Weeks, days, hours, minutes and (fractional) seconds are supported.
/// Years and months have no fixed length and are rejected.
///
/// # Errors
///
/// Returns an error if the text is not a supported duration.
pub fn parse_duration(text: &str) -> Result<TimeDelta> {
    let invalid = |reason: &str| Error::deserialization("", format!("invalid duration {text:?}: {reason}"));

    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let rest = rest
        .strip_prefix(['P', 'p'])
        .ok_or_else(|| invalid("missing 'P' designator"))?;

    let mut seconds: i64 = 0;
    let mut nanos: u32 = 0;
    let mut in_time = false;
    let mut last_unit = i64::MAX;
    let mut components = 0;
    let mut time_components = 0;
    let mut number = String::new();

    for c in rest.chars() {
        match c.to_ascii_uppercase() {
            'T' if !in_time && number.is_empty() => in_time = true,
            d if d.is_ascii_digit() || d == '.' || d == ',' => number.push(if d == ',' { '.' } else { d }),
            designator => {
                let unit = match (in_time, designator) {
                    (false, 'W') => SECONDS_PER_WEEK,
                    (false, 'D') => SECONDS_PER_DAY,
                    (true, 'H') => SECONDS_PER_HOUR,
                    (true, 'M') => SECONDS_PER_MINUTE,
                    (true, 'S') => 1,
                    (false, 'Y' | 'M') => return Err(invalid("years and months are not supported")),
                    _ => return Err(invalid("unexpected designator")),
                };
                if unit >= last_unit {
                    return Err(invalid("designators must be unique and in descending order"));
                }
                last_unit = unit;
                let (whole, fraction) = match number.split_once('.') {
                    Some((whole, fraction)) if unit == 1 => (whole, Some(fraction)),
                    Some(_) => return Err(invalid("only seconds may have a fraction")),
                    None => (number.as_str(), None),
                };
                let whole: i64 = whole.parse().map_err(|_| invalid("missing value"))?;
                seconds = whole
                    .checked_mul(unit)
                    .and_then(|s| seconds.checked_add(s))
                    .ok_or_else(|| invalid("out of range"))?;
                if let Some(fraction) = fraction {
                    nanos = parse_nanos(fraction).ok_or_else(|| invalid("invalid fraction"))?;
                }
                number.clear();
                components += 1;
                if in_time {
                    time_components += 1;
                }
            }
        }
    }

    if !number.is_empty() {
        return Err(invalid("missing designator"));
    }
    if components == 0 || (in_time && time_components == 0) {
        return Err(invalid("no components"));
    }

    let delta = TimeDelta::new(seconds, nanos).ok_or_else(|| invalid("out of range"))?;
    Ok(if negative { -delta } else { delta })
}

fn parse_nanos(fraction: &str) -> Option<u32> {
    if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let padded: String = fraction.chars().chain(std::iter::repeat('0')).take(9).collect();
    padded.parse().ok()
}

/// Formats a duration as ISO 8601, e.g. `P1DT2H30M` or `-PT0.5S`.
#[must_use]
pub fn format_duration(delta: TimeDelta) -> String {
    let sign = if delta < TimeDelta::zero() { "-" } else { "" };
    let delta = delta.abs();
    let total = delta.num_seconds();
    let nanos = delta.subsec_nanos();

    let days = total / SECONDS_PER_DAY;
    let hours = (total % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = total % SECONDS_PER_MINUTE;

    let mut out = format!("{sign}P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || nanos > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            out.push_str(&format!("{seconds}.{}S", fraction.trim_end_matches('0')));
        } else if seconds > 0 || (hours == 0 && minutes == 0) {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}

// ============================================================================
// String decoders shared by parse nodes
// ============================================================================

pub(crate) fn decode_uuid(path: &str, text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| Error::deserialization(path, e.to_string()))
}

pub(crate) fn decode_date(path: &str, text: &str) -> Result<NaiveDate> {
    text.parse()
        .map_err(|e: chrono::ParseError| Error::deserialization(path, e.to_string()))
}

pub(crate) fn decode_time(path: &str, text: &str) -> Result<NaiveTime> {
    text.parse()
        .map_err(|e: chrono::ParseError| Error::deserialization(path, e.to_string()))
}

pub(crate) fn decode_date_time(path: &str, text: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).map_err(|e| Error::deserialization(path, e.to_string()))
}

pub(crate) fn decode_duration(path: &str, text: &str) -> Result<TimeDelta> {
    parse_duration(text).map_err(|e| match e {
        Error::Deserialization { message, .. } => Error::deserialization(path, message),
        other => other,
    })
}

pub(crate) fn decode_bytes(path: &str, text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| Error::deserialization(path, e.to_string()))
}

pub(crate) fn decode_decimal(path: &str, text: &str) -> Result<Decimal> {
    text.parse::<Decimal>().map_err(|e| match e {
        Error::Deserialization { message, .. } => Error::deserialization(path, message),
        other => other,
    })
}
