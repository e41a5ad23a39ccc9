//! Purpose: Shared JSON field-extraction helpers for record decoders.
//! Exports: crate-internal accessors (`obj`, `req_str`, `muxed_sibling`, ...).
//! Role: One seam for field errors so every decoder reports the offending field.
//! Invariants: Absent optional fields are `None`, never defaults.
//! Invariants: Muxed sibling fields (`X_muxed`, `X_muxed_id`) collapse into one
//! `Option<MuxedAccount>`; a lone sibling or a disagreeing id is an error.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::asset::{AccountId, Asset};
use crate::core::error::{Error, ErrorKind};
use crate::core::muxed::MuxedAccount;
use crate::core::predicate::Predicate;

pub(crate) fn obj(value: &Value) -> Result<&Map<String, Value>, Error> {
    value
        .as_object()
        .ok_or_else(|| Error::new(ErrorKind::Malformed).with_message("record must be a JSON object"))
}

pub(crate) fn req<'a>(map: &'a Map<String, Value>, field: &str) -> Result<&'a Value, Error> {
    map.get(field).ok_or_else(|| {
        Error::new(ErrorKind::Malformed)
            .with_message("missing required field")
            .with_field(field)
    })
}

pub(crate) fn req_str<'a>(map: &'a Map<String, Value>, field: &str) -> Result<&'a str, Error> {
    req(map, field)?.as_str().ok_or_else(|| {
        Error::new(ErrorKind::Malformed)
            .with_message("expected a string")
            .with_field(field)
    })
}

pub(crate) fn opt_str<'a>(
    map: &'a Map<String, Value>,
    field: &str,
) -> Result<Option<&'a str>, Error> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(_) => Err(Error::new(ErrorKind::Malformed)
            .with_message("expected a string")
            .with_field(field)),
    }
}

pub(crate) fn req_string(map: &Map<String, Value>, field: &str) -> Result<String, Error> {
    Ok(req_str(map, field)?.to_string())
}

pub(crate) fn opt_string(map: &Map<String, Value>, field: &str) -> Result<Option<String>, Error> {
    Ok(opt_str(map, field)?.map(str::to_string))
}

pub(crate) fn req_bool(map: &Map<String, Value>, field: &str) -> Result<bool, Error> {
    req(map, field)?.as_bool().ok_or_else(|| {
        Error::new(ErrorKind::Malformed)
            .with_message("expected a boolean")
            .with_field(field)
    })
}

pub(crate) fn opt_bool(map: &Map<String, Value>, field: &str) -> Result<Option<bool>, Error> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(_) => Err(Error::new(ErrorKind::Malformed)
            .with_message("expected a boolean")
            .with_field(field)),
    }
}

/// Integers arrive either as JSON numbers or as decimal strings; both spellings
/// are accepted everywhere one appears.
pub(crate) fn req_i64(map: &Map<String, Value>, field: &str) -> Result<i64, Error> {
    integer(req(map, field)?, field)
}

pub(crate) fn opt_u32(map: &Map<String, Value>, field: &str) -> Result<Option<u32>, Error> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let wide = integer(value, field)?;
            u32::try_from(wide).map(Some).map_err(|_| {
                Error::new(ErrorKind::Malformed)
                    .with_message(format!("{wide} does not fit in 32 bits"))
                    .with_field(field)
            })
        }
    }
}

fn integer(value: &Value, field: &str) -> Result<i64, Error> {
    match value {
        Value::Number(num) => num.as_i64().ok_or_else(|| {
            Error::new(ErrorKind::Malformed)
                .with_message(format!("{num} is not a 64-bit integer"))
                .with_field(field)
        }),
        Value::String(text) => text.parse::<i64>().map_err(|_| {
            Error::new(ErrorKind::Malformed)
                .with_message(format!("{text:?} is not a decimal integer"))
                .with_field(field)
        }),
        other => Err(Error::new(ErrorKind::Malformed)
            .with_message(format!("expected an integer, got {other}"))
            .with_field(field)),
    }
}

pub(crate) fn account_id(map: &Map<String, Value>, field: &str) -> Result<AccountId, Error> {
    req_str(map, field)?
        .parse::<AccountId>()
        .map_err(|err| err.with_field(field))
}

pub(crate) fn opt_account_id(
    map: &Map<String, Value>,
    field: &str,
) -> Result<Option<AccountId>, Error> {
    match opt_str(map, field)? {
        None => Ok(None),
        Some(text) => text
            .parse::<AccountId>()
            .map(Some)
            .map_err(|err| err.with_field(field)),
    }
}

/// Collapses the `{base}_muxed` / `{base}_muxed_id` sibling pair into one
/// optional composite. When the plain `{base}` field is present its key must
/// match the muxed address's base key.
pub(crate) fn muxed_sibling(
    map: &Map<String, Value>,
    base: &str,
) -> Result<Option<MuxedAccount>, Error> {
    let address_field = format!("{base}_muxed");
    let id_field = format!("{base}_muxed_id");
    let address = opt_str(map, &address_field)?;
    let id = opt_str(map, &id_field)?;
    let (address, id) = match (address, id) {
        (None, None) => return Ok(None),
        (Some(address), Some(id)) => (address, id),
        _ => {
            return Err(Error::new(ErrorKind::InvalidMuxedAccount)
                .with_message(format!(
                    "{address_field} and {id_field} must appear together"
                ))
                .with_field(address_field));
        }
    };

    let muxed = MuxedAccount::decode(address).map_err(|err| err.with_field(&address_field))?;
    let Some(sub_id) = muxed.sub_id else {
        return Err(Error::new(ErrorKind::InvalidMuxedAccount)
            .with_message("sibling address is not in the muxed form")
            .with_field(address_field));
    };
    let declared: u64 = id.parse().map_err(|_| {
        Error::new(ErrorKind::InvalidMuxedAccount)
            .with_message(format!("{id:?} is not an unsigned 64-bit integer"))
            .with_field(&id_field)
    })?;
    if declared != sub_id {
        return Err(Error::new(ErrorKind::InvalidMuxedAccount)
            .with_message(format!(
                "{id_field} {declared} disagrees with the address sub-id {sub_id}"
            ))
            .with_field(id_field));
    }
    if let Some(plain) = opt_str(map, base)? {
        if muxed.unmuxed_address() != plain {
            return Err(Error::new(ErrorKind::InvalidMuxedAccount)
                .with_message(format!("{address_field} does not extend {base}"))
                .with_field(address_field));
        }
    }
    Ok(Some(muxed))
}

/// Decodes the `{prefix}_type` / `{prefix}_code` / `{prefix}_issuer` triple
/// (plus `liquidity_pool_id` for pool shares) into an [`Asset`]. An empty
/// prefix reads the bare `asset_type` family.
pub(crate) fn asset_prefixed(map: &Map<String, Value>, prefix: &str) -> Result<Asset, Error> {
    let name = |suffix: &str| {
        if prefix.is_empty() {
            format!("asset_{suffix}")
        } else {
            format!("{prefix}_{suffix}")
        }
    };
    let type_field = name("type");
    match req_str(map, &type_field)? {
        "native" => Ok(Asset::Native),
        "credit_alphanum4" | "credit_alphanum12" => {
            let code = req_string(map, &name("code"))?;
            let issuer = account_id(map, &name("issuer"))?;
            Asset::credit(code, issuer).map_err(|err| err.with_field(name("code")))
        }
        "liquidity_pool_shares" => Ok(Asset::LiquidityPoolShare {
            pool_id: hex_hash(map, "liquidity_pool_id")?,
        }),
        other => Err(Error::new(ErrorKind::UnknownVariant)
            .with_message("unrecognized asset type")
            .with_field(type_field)
            .with_tag(other)),
    }
}

pub(crate) fn hex_hash(map: &Map<String, Value>, field: &str) -> Result<[u8; 32], Error> {
    let text = req_str(map, field)?;
    // from_str_radix tolerates a sign, so every character is vetted first
    if text.len() != 64 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::new(ErrorKind::Malformed)
            .with_message("expected 64 hex digits")
            .with_field(field));
    }
    let mut out = [0u8; 32];
    for (i, chunk) in text.as_bytes().chunks(2).enumerate() {
        let digits = std::str::from_utf8(chunk).expect("ascii verified above");
        out[i] = u8::from_str_radix(digits, 16).expect("hex digits verified above");
    }
    Ok(out)
}

pub(crate) fn predicate(map: &Map<String, Value>, field: &str) -> Result<Predicate, Error> {
    Predicate::from_json(req(map, field)?).map_err(|err| {
        if err.field().is_some() {
            err
        } else {
            err.with_field(field)
        }
    })
}

pub(crate) fn timestamp(map: &Map<String, Value>, field: &str) -> Result<OffsetDateTime, Error> {
    let text = req_str(map, field)?;
    OffsetDateTime::parse(text, &Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Malformed)
            .with_message(format!("{text:?} is not an ISO-8601 timestamp"))
            .with_field(field)
            .with_source(err)
    })
}

pub(crate) fn opt_timestamp(
    map: &Map<String, Value>,
    field: &str,
) -> Result<Option<OffsetDateTime>, Error> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => timestamp(map, field).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::{asset_prefixed, hex_hash, muxed_sibling, opt_u32, req_i64};
    use crate::core::asset::Asset;
    use crate::core::error::ErrorKind;
    use serde_json::{Map, Value, json};

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().expect("object").clone()
    }

    const PLAIN: &str = "GAQAA5L65LSYH7CQ3VTJ7F3HHLGCL3DSLAR2Y47263D56MNNGHSQSTVY";
    const MUXED: &str = "MAQAA5L65LSYH7CQ3VTJ7F3HHLGCL3DSLAR2Y47263D56MNNGHSQSAAAAAAAAAAE2LP26";

    #[test]
    fn integers_accept_both_spellings() {
        let record = map(json!({ "a": "42", "b": 42 }));
        assert_eq!(req_i64(&record, "a").expect("string"), 42);
        assert_eq!(req_i64(&record, "b").expect("number"), 42);
    }

    #[test]
    fn opt_u32_bounds_checked() {
        let record = map(json!({ "ledger": "5000000000" }));
        let err = opt_u32(&record, "ledger").expect_err("too wide");
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn absent_siblings_decode_to_none() {
        let record = map(json!({ "from": PLAIN }));
        assert_eq!(muxed_sibling(&record, "from").expect("none"), None);
    }

    #[test]
    fn present_siblings_combine() {
        let record = map(json!({
            "from": PLAIN,
            "from_muxed": MUXED,
            "from_muxed_id": "1234",
        }));
        let combined = muxed_sibling(&record, "from").expect("decode").expect("some");
        assert_eq!(combined.sub_id, Some(1234));
        assert_eq!(combined.unmuxed_address(), PLAIN);
    }

    #[test]
    fn lone_sibling_is_rejected() {
        let record = map(json!({ "from": PLAIN, "from_muxed_id": "1234" }));
        let err = muxed_sibling(&record, "from").expect_err("lone id");
        assert_eq!(err.kind(), ErrorKind::InvalidMuxedAccount);
    }

    #[test]
    fn disagreeing_sibling_id_is_rejected() {
        let record = map(json!({
            "from": PLAIN,
            "from_muxed": MUXED,
            "from_muxed_id": "99",
        }));
        let err = muxed_sibling(&record, "from").expect_err("id mismatch");
        assert_eq!(err.kind(), ErrorKind::InvalidMuxedAccount);
    }

    #[test]
    fn prefixed_asset_dispatches_on_type() {
        let native = map(json!({ "asset_type": "native" }));
        assert_eq!(asset_prefixed(&native, "").expect("native"), Asset::Native);

        let credit = map(json!({
            "sold_asset_type": "credit_alphanum4",
            "sold_asset_code": "USD",
            "sold_asset_issuer": PLAIN,
        }));
        let asset = asset_prefixed(&credit, "sold_asset").expect("credit");
        assert_eq!(asset.wire_type(), "credit_alphanum4");

        let pool = map(json!({
            "asset_type": "liquidity_pool_shares",
            "liquidity_pool_id": "dd7b1ab831c273310ddbec6f97870aa83c2fbd78ce22aded37ecbf4f3380fac7",
        }));
        assert!(matches!(
            asset_prefixed(&pool, "").expect("pool"),
            Asset::LiquidityPoolShare { .. }
        ));

        let unknown = map(json!({ "asset_type": "seashells" }));
        let err = asset_prefixed(&unknown, "").expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::UnknownVariant);
        assert_eq!(err.tag(), Some("seashells"));
    }

    #[test]
    fn hex_hash_rejects_bad_input() {
        let record = map(json!({ "id": "zz7b" }));
        assert_eq!(
            hex_hash(&record, "id").expect_err("short").kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn hex_hash_rejects_signed_digit_pairs() {
        // 64 chars, but "+f" and "-1" are not hex digit pairs
        for prefix in ["+f", "-1"] {
            let id = format!("{prefix}{}", "ab".repeat(31));
            let record = map(json!({ "id": id }));
            assert_eq!(
                hex_hash(&record, "id").expect_err("signed pair").kind(),
                ErrorKind::Malformed
            );
        }
    }
}
