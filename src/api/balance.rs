//! Purpose: Decode balance lines, reserve lines, claimants, and claimable balances.
//! Exports: `Balance`, `balance_registry`, `Reserve`, `Claimant`, `ClaimableBalance`.
//! Role: The smaller record families keyed by `asset_type` or decoded inline.
//! Invariants: Balance lines carry the asset variant matching their tag.
//! Invariants: Claimant predicates round-trip through the predicate codec.

use serde_json::Value;

use crate::api::fields;
use crate::api::registry::Registry;
use crate::core::asset::{AccountId, Asset};
use crate::core::error::{Error, ErrorKind};
use crate::core::predicate::Predicate;

/// One line of an account's balance list.
#[derive(Clone, Debug, PartialEq)]
pub struct Balance {
    pub asset: Asset,
    pub balance: String,
    pub limit: Option<String>,
    pub buying_liabilities: Option<String>,
    pub selling_liabilities: Option<String>,
    pub is_authorized: Option<bool>,
    pub is_authorized_to_maintain_liabilities: Option<bool>,
    pub last_modified_ledger: Option<u32>,
}

fn balance_line(value: &Value) -> Result<Balance, Error> {
    let map = fields::obj(value)?;
    Ok(Balance {
        asset: fields::asset_prefixed(map, "")?,
        balance: fields::req_string(map, "balance")?,
        limit: fields::opt_string(map, "limit")?,
        buying_liabilities: fields::opt_string(map, "buying_liabilities")?,
        selling_liabilities: fields::opt_string(map, "selling_liabilities")?,
        is_authorized: fields::opt_bool(map, "is_authorized")?,
        is_authorized_to_maintain_liabilities: fields::opt_bool(
            map,
            "is_authorized_to_maintain_liabilities",
        )?,
        last_modified_ledger: fields::opt_u32(map, "last_modified_ledger")?,
    })
}

/// Builds the balance-line registry, keyed by `asset_type`. All four tags share
/// one decoder body; the asset extraction dispatches on the same tag.
pub fn balance_registry() -> Registry<Balance> {
    let mut registry = Registry::new("asset_type");
    for tag in [
        "native",
        "credit_alphanum4",
        "credit_alphanum12",
        "liquidity_pool_shares",
    ] {
        registry.register(tag, balance_line);
    }
    registry
}

/// An (asset, amount) pair inside liquidity-pool operations. The asset arrives
/// in the compact colon grammar.
#[derive(Clone, Debug, PartialEq)]
pub struct Reserve {
    pub asset: Asset,
    pub amount: String,
}

impl Reserve {
    pub fn decode(value: &Value) -> Result<Self, Error> {
        let map = fields::obj(value)?;
        Ok(Self {
            asset: Asset::parse(fields::req_str(map, "asset")?)
                .map_err(|err| err.with_field("asset"))?,
            amount: fields::req_string(map, "amount")?,
        })
    }

    pub(crate) fn decode_list(
        map: &serde_json::Map<String, Value>,
        field: &str,
    ) -> Result<Vec<Self>, Error> {
        let Some(list) = fields::req(map, field)?.as_array() else {
            return Err(Error::new(ErrorKind::Malformed)
                .with_message("expected an array of reserves")
                .with_field(field));
        };
        list.iter().map(Self::decode).collect()
    }
}

/// A party allowed to claim a conditional balance, gated by a predicate.
#[derive(Clone, Debug, PartialEq)]
pub struct Claimant {
    pub destination: AccountId,
    pub predicate: Predicate,
}

impl Claimant {
    pub fn decode(value: &Value) -> Result<Self, Error> {
        let map = fields::obj(value)?;
        Ok(Self {
            destination: fields::account_id(map, "destination")?,
            predicate: fields::predicate(map, "predicate")?,
        })
    }

    pub(crate) fn decode_list(
        map: &serde_json::Map<String, Value>,
        field: &str,
    ) -> Result<Vec<Self>, Error> {
        let Some(list) = fields::req(map, field)?.as_array() else {
            return Err(Error::new(ErrorKind::Malformed)
                .with_message("expected an array of claimants")
                .with_field(field));
        };
        list.iter().map(Self::decode).collect()
    }
}

/// A conditional balance entry awaiting one of its claimants.
#[derive(Clone, Debug, PartialEq)]
pub struct ClaimableBalance {
    pub id: String,
    pub paging_token: String,
    pub asset: Asset,
    pub amount: String,
    pub sponsor: Option<AccountId>,
    pub last_modified_ledger: Option<u32>,
    pub claimants: Vec<Claimant>,
}

impl ClaimableBalance {
    pub fn decode(value: &Value) -> Result<Self, Error> {
        let map = fields::obj(value)?;
        Ok(Self {
            id: fields::req_string(map, "id")?,
            paging_token: fields::req_string(map, "paging_token")?,
            asset: Asset::parse(fields::req_str(map, "asset")?)
                .map_err(|err| err.with_field("asset"))?,
            amount: fields::req_string(map, "amount")?,
            sponsor: fields::opt_account_id(map, "sponsor")?,
            last_modified_ledger: fields::opt_u32(map, "last_modified_ledger")?,
            claimants: Claimant::decode_list(map, "claimants")?,
        })
    }
}
