//! Purpose: Decode/encode the recursive claim-condition expression tree.
//! Exports: `Predicate`.
//! Role: Dual codec (human-facing JSON, compact binary) with exact round-trips.
//! Invariants: Decode never defaults to `Unconditional` on malformed input; every
//! rejection carries a distinct reason.
//! Invariants: Recursion is depth-bounded on both decode paths.
//! Invariants: `abs_before_epoch` is authoritative when present; a disagreeing
//! `abs_before` display string is logged and ignored.

use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::core::error::{Error, ErrorKind};

/// Nesting allowed before a decode is rejected as pathological. Real claim
/// conditions are shallow; the ledger itself refuses trees deeper than a handful
/// of levels.
const MAX_DEPTH: usize = 64;

const TAG_UNCONDITIONAL: u32 = 0;
const TAG_AND: u32 = 1;
const TAG_OR: u32 = 2;
const TAG_NOT: u32 = 3;
const TAG_ABS_BEFORE: u32 = 4;
const TAG_REL_BEFORE: u32 = 5;

/// A boolean expression over time conditions gating when a conditional balance
/// becomes claimable. Compared by structural equality; immutable once built.
///
/// The absolute timestamp is carried as an `i128` so far-future epochs coming in
/// as decimal strings survive intact; it is narrowed to 64 bits only at the
/// binary-encode boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    Unconditional,
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    /// Claimable strictly before this many seconds since the epoch.
    AbsBefore(i128),
    /// Claimable within this many seconds of the balance entry's creation.
    RelBefore(i64),
}

impl Predicate {
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        Self::from_json_at(value, 0)
    }

    fn from_json_at(value: &Value, depth: usize) -> Result<Self, Error> {
        if depth > MAX_DEPTH {
            return Err(invalid(format!(
                "predicate nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        let Some(obj) = value.as_object() else {
            return Err(invalid("predicate must be a JSON object"));
        };
        for key in obj.keys() {
            if !matches!(
                key.as_str(),
                "unconditional" | "and" | "or" | "not" | "abs_before" | "abs_before_epoch"
                    | "rel_before"
            ) {
                return Err(invalid(format!("unknown predicate key {key:?}")));
            }
        }

        let mut present: Vec<&str> = obj.keys().map(String::as_str).collect();
        // abs_before and abs_before_epoch are two spellings of one variant
        if present.contains(&"abs_before") && present.contains(&"abs_before_epoch") {
            present.retain(|key| *key != "abs_before");
        }
        if present.len() != 1 {
            return Err(invalid(format!(
                "predicate object must carry exactly one variant key, got {:?}",
                obj.keys().collect::<Vec<_>>()
            )));
        }

        match present[0] {
            "unconditional" => match &obj["unconditional"] {
                Value::Bool(true) => Ok(Self::Unconditional),
                other => Err(invalid(format!(
                    "unconditional must be `true`, got {other}"
                ))),
            },
            key @ ("and" | "or") => {
                let Some(pair) = obj[key].as_array() else {
                    return Err(invalid(format!("{key} expects an array")).with_field(key));
                };
                if pair.len() != 2 {
                    return Err(invalid(format!(
                        "{key} expects exactly 2 operands, got {}",
                        pair.len()
                    ))
                    .with_field(key));
                }
                let left = Box::new(Self::from_json_at(&pair[0], depth + 1)?);
                let right = Box::new(Self::from_json_at(&pair[1], depth + 1)?);
                Ok(if key == "and" {
                    Self::And(left, right)
                } else {
                    Self::Or(left, right)
                })
            }
            "not" => Ok(Self::Not(Box::new(Self::from_json_at(
                &obj["not"],
                depth + 1,
            )?))),
            "abs_before" | "abs_before_epoch" => Ok(Self::AbsBefore(decode_abs_before(obj)?)),
            "rel_before" => {
                let seconds = decode_integer(&obj["rel_before"], "rel_before")?;
                let seconds = i64::try_from(seconds).map_err(|_| {
                    invalid(format!("rel_before {seconds} does not fit in 64 bits"))
                        .with_field("rel_before")
                })?;
                Ok(Self::RelBefore(seconds))
            }
            _ => unreachable!("key set validated above"),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Unconditional => json!({ "unconditional": true }),
            Self::And(left, right) => json!({ "and": [left.to_json(), right.to_json()] }),
            Self::Or(left, right) => json!({ "or": [left.to_json(), right.to_json()] }),
            Self::Not(inner) => json!({ "not": inner.to_json() }),
            Self::AbsBefore(epoch) => {
                // the display spelling is omitted for epochs beyond the
                // formattable calendar range; the epoch field is authoritative
                let mut obj = Map::new();
                if let Some(display) = display_timestamp(*epoch) {
                    obj.insert("abs_before".to_string(), Value::String(display));
                }
                obj.insert(
                    "abs_before_epoch".to_string(),
                    Value::String(epoch.to_string()),
                );
                Value::Object(obj)
            }
            Self::RelBefore(seconds) => json!({ "rel_before": seconds.to_string() }),
        }
    }

    /// Encodes the fixed tag + payload binary form. Fails only when an
    /// `AbsBefore` epoch does not fit the 64-bit wire field.
    pub fn to_binary(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.write_binary(&mut out)?;
        Ok(out)
    }

    fn write_binary(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            Self::Unconditional => out.extend_from_slice(&TAG_UNCONDITIONAL.to_be_bytes()),
            Self::And(left, right) | Self::Or(left, right) => {
                let tag = if matches!(self, Self::And(..)) {
                    TAG_AND
                } else {
                    TAG_OR
                };
                out.extend_from_slice(&tag.to_be_bytes());
                out.extend_from_slice(&2u32.to_be_bytes());
                left.write_binary(out)?;
                right.write_binary(out)?;
            }
            Self::Not(inner) => {
                out.extend_from_slice(&TAG_NOT.to_be_bytes());
                out.extend_from_slice(&1u32.to_be_bytes());
                inner.write_binary(out)?;
            }
            Self::AbsBefore(epoch) => {
                let seconds = i64::try_from(*epoch).map_err(|_| {
                    invalid(format!("abs_before epoch {epoch} does not fit in 64 bits"))
                        .with_field("abs_before_epoch")
                })?;
                out.extend_from_slice(&TAG_ABS_BEFORE.to_be_bytes());
                out.extend_from_slice(&seconds.to_be_bytes());
            }
            Self::RelBefore(seconds) => {
                out.extend_from_slice(&TAG_REL_BEFORE.to_be_bytes());
                out.extend_from_slice(&seconds.to_be_bytes());
            }
        }
        Ok(())
    }

    /// Decodes the binary form, requiring every input byte to be consumed.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader { bytes, pos: 0 };
        let predicate = Self::read_binary(&mut reader, 0)?;
        if reader.pos != bytes.len() {
            return Err(invalid(format!(
                "{} trailing bytes after predicate",
                bytes.len() - reader.pos
            )));
        }
        Ok(predicate)
    }

    fn read_binary(reader: &mut Reader<'_>, depth: usize) -> Result<Self, Error> {
        if depth > MAX_DEPTH {
            return Err(invalid(format!(
                "predicate nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        let tag = reader.read_u32()?;
        match tag {
            TAG_UNCONDITIONAL => Ok(Self::Unconditional),
            TAG_AND | TAG_OR => {
                let count = reader.read_u32()?;
                if count != 2 {
                    return Err(invalid(format!(
                        "and/or operand count must be 2, got {count}"
                    )));
                }
                let left = Box::new(Self::read_binary(reader, depth + 1)?);
                let right = Box::new(Self::read_binary(reader, depth + 1)?);
                Ok(if tag == TAG_AND {
                    Self::And(left, right)
                } else {
                    Self::Or(left, right)
                })
            }
            TAG_NOT => {
                let present = reader.read_u32()?;
                if present != 1 {
                    return Err(invalid(format!(
                        "not expects a present inner predicate, got flag {present}"
                    )));
                }
                Ok(Self::Not(Box::new(Self::read_binary(reader, depth + 1)?)))
            }
            TAG_ABS_BEFORE => Ok(Self::AbsBefore(reader.read_i64()? as i128)),
            TAG_REL_BEFORE => Ok(Self::RelBefore(reader.read_i64()?)),
            other => Err(invalid(format!("unknown binary predicate tag {other}"))),
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, len: usize) -> Result<&[u8], Error> {
        if self.pos + len > self.bytes.len() {
            return Err(invalid("truncated binary predicate"));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().expect("len 4")))
    }

    fn read_i64(&mut self) -> Result<i64, Error> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().expect("len 8")))
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidPredicate).with_message(message)
}

/// Numeric fields arrive as decimal strings on the wire; plain JSON integers are
/// tolerated as well.
fn decode_integer(value: &Value, field: &str) -> Result<i128, Error> {
    match value {
        Value::String(text) => text.parse::<i128>().map_err(|_| {
            invalid(format!("{field} is not a decimal integer: {text:?}")).with_field(field)
        }),
        Value::Number(num) => num
            .as_i64()
            .map(i128::from)
            .or_else(|| num.as_u64().map(i128::from))
            .ok_or_else(|| invalid(format!("{field} is not an integer: {num}")).with_field(field)),
        other => Err(invalid(format!("{field} must be a string or integer, got {other}"))
            .with_field(field)),
    }
}

fn decode_abs_before(obj: &Map<String, Value>) -> Result<i128, Error> {
    let from_epoch = match obj.get("abs_before_epoch") {
        Some(value) => Some(decode_integer(value, "abs_before_epoch")?),
        None => None,
    };
    let from_display = match obj.get("abs_before") {
        Some(Value::String(text)) => match OffsetDateTime::parse(text, &Rfc3339) {
            Ok(parsed) => Some(parsed.unix_timestamp() as i128),
            // servers render far-future epochs in non-calendar spellings; the
            // epoch field carries the real value when both are present
            Err(_) if from_epoch.is_some() => None,
            Err(err) => {
                return Err(
                    invalid(format!("abs_before is not an ISO-8601 timestamp: {text:?}"))
                        .with_field("abs_before")
                        .with_source(err),
                );
            }
        },
        Some(other) => {
            return Err(invalid(format!("abs_before must be a string, got {other}"))
                .with_field("abs_before"));
        }
        None => None,
    };
    match (from_epoch, from_display) {
        (Some(epoch), Some(shown)) => {
            if epoch != shown {
                warn!(
                    abs_before_epoch = %epoch,
                    abs_before = %shown,
                    "abs_before disagrees with abs_before_epoch; using the epoch value"
                );
            }
            Ok(epoch)
        }
        (Some(epoch), None) => Ok(epoch),
        (None, Some(shown)) => Ok(shown),
        (None, None) => unreachable!("caller checked key presence"),
    }
}

/// Formats the display timestamp; `None` for epochs outside the formattable
/// calendar range.
fn display_timestamp(epoch: i128) -> Option<String> {
    let seconds = i64::try_from(epoch).ok()?;
    let datetime = OffsetDateTime::from_unix_timestamp(seconds).ok()?;
    datetime.format(&Rfc3339).ok()
}
