//! Purpose: Decode the operation record family (submitted ledger operations).
//! Exports: `Operation`, `OperationDetail`, `operation_registry`.
//! Role: The largest polymorphic family; keyed by the `type` tag.
//! Invariants: Muxed sibling fields always collapse next to their plain field.
//! Invariants: Assets arrive prefixed (`asset_type`, `selling_asset_type`, ...)
//! except inside claimable-balance operations, which use the colon grammar.

use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::api::balance::{Claimant, Reserve};
use crate::api::fields;
use crate::api::registry::Registry;
use crate::core::asset::{AccountId, Asset};
use crate::core::error::{Error, ErrorKind};
use crate::core::muxed::MuxedAccount;

/// One decoded operation: the envelope shared by every variant plus the
/// variant-specific detail.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub id: String,
    pub paging_token: String,
    pub source_account: AccountId,
    pub source_account_muxed: Option<MuxedAccount>,
    pub created_at: Option<OffsetDateTime>,
    pub transaction_hash: String,
    pub transaction_successful: Option<bool>,
    pub detail: OperationDetail,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OperationDetail {
    CreateAccount {
        account: AccountId,
        funder: AccountId,
        funder_muxed: Option<MuxedAccount>,
        starting_balance: String,
    },
    Payment {
        asset: Asset,
        from: AccountId,
        from_muxed: Option<MuxedAccount>,
        to: AccountId,
        to_muxed: Option<MuxedAccount>,
        amount: String,
    },
    PathPaymentStrictReceive {
        asset: Asset,
        from: AccountId,
        from_muxed: Option<MuxedAccount>,
        to: AccountId,
        to_muxed: Option<MuxedAccount>,
        amount: String,
        path: Vec<Asset>,
        source_asset: Asset,
        source_amount: String,
        source_max: String,
    },
    PathPaymentStrictSend {
        asset: Asset,
        from: AccountId,
        from_muxed: Option<MuxedAccount>,
        to: AccountId,
        to_muxed: Option<MuxedAccount>,
        amount: String,
        path: Vec<Asset>,
        source_asset: Asset,
        source_amount: String,
        destination_min: String,
    },
    ManageSellOffer {
        offer_id: String,
        amount: String,
        price: String,
        buying: Asset,
        selling: Asset,
    },
    ManageBuyOffer {
        offer_id: String,
        amount: String,
        price: String,
        buying: Asset,
        selling: Asset,
    },
    CreatePassiveSellOffer {
        amount: String,
        price: String,
        buying: Asset,
        selling: Asset,
    },
    SetOptions {
        home_domain: Option<String>,
        inflation_dest: Option<AccountId>,
        master_key_weight: Option<u32>,
        low_threshold: Option<u32>,
        med_threshold: Option<u32>,
        high_threshold: Option<u32>,
        signer_key: Option<String>,
        signer_weight: Option<u32>,
        set_flags: Vec<String>,
        clear_flags: Vec<String>,
    },
    ChangeTrust {
        asset: Asset,
        trustor: AccountId,
        trustor_muxed: Option<MuxedAccount>,
        trustee: Option<AccountId>,
        limit: String,
    },
    AllowTrust {
        asset: Asset,
        trustor: AccountId,
        trustee: AccountId,
        trustee_muxed: Option<MuxedAccount>,
        authorize: bool,
    },
    AccountMerge {
        account: AccountId,
        account_muxed: Option<MuxedAccount>,
        into: AccountId,
        into_muxed: Option<MuxedAccount>,
    },
    Inflation,
    ManageData {
        name: String,
        value: Option<String>,
    },
    BumpSequence {
        bump_to: i64,
    },
    CreateClaimableBalance {
        sponsor: Option<AccountId>,
        asset: Asset,
        amount: String,
        claimants: Vec<Claimant>,
    },
    ClaimClaimableBalance {
        balance_id: String,
        claimant: AccountId,
        claimant_muxed: Option<MuxedAccount>,
    },
    Clawback {
        asset: Asset,
        from: AccountId,
        from_muxed: Option<MuxedAccount>,
        amount: String,
    },
    ClawbackClaimableBalance {
        balance_id: String,
    },
    LiquidityPoolDeposit {
        liquidity_pool_id: [u8; 32],
        reserves_max: Vec<Reserve>,
        min_price: String,
        max_price: String,
        reserves_deposited: Vec<Reserve>,
        shares_received: String,
    },
    LiquidityPoolWithdraw {
        liquidity_pool_id: [u8; 32],
        reserves_min: Vec<Reserve>,
        shares: String,
        reserves_received: Vec<Reserve>,
    },
}

type Obj = Map<String, Value>;

fn envelope(map: &Obj, detail: OperationDetail) -> Result<Operation, Error> {
    Ok(Operation {
        id: fields::req_string(map, "id")?,
        paging_token: fields::req_string(map, "paging_token")?,
        source_account: fields::account_id(map, "source_account")?,
        source_account_muxed: fields::muxed_sibling(map, "source_account")?,
        created_at: fields::opt_timestamp(map, "created_at")?,
        transaction_hash: fields::req_string(map, "transaction_hash")?,
        transaction_successful: fields::opt_bool(map, "transaction_successful")?,
        detail,
    })
}

fn operation<F>(detail: F) -> impl Fn(&Value) -> Result<Operation, Error> + Send + Sync
where
    F: Fn(&Obj) -> Result<OperationDetail, Error> + Send + Sync,
{
    move |value| {
        let map = fields::obj(value)?;
        envelope(map, detail(map)?)
    }
}

/// The `path` field of path payments: an array of prefixed asset objects.
fn asset_path(map: &Obj, field: &str) -> Result<Vec<Asset>, Error> {
    let Some(list) = fields::req(map, field)?.as_array() else {
        return Err(Error::new(ErrorKind::Malformed)
            .with_message("expected an array of assets")
            .with_field(field));
    };
    list.iter()
        .map(|hop| fields::asset_prefixed(fields::obj(hop)?, ""))
        .collect()
}

fn flag_list(map: &Obj, field: &str) -> Result<Vec<String>, Error> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(list)) => list
            .iter()
            .map(|flag| {
                flag.as_str().map(str::to_string).ok_or_else(|| {
                    Error::new(ErrorKind::Malformed)
                        .with_message("expected an array of strings")
                        .with_field(field)
                })
            })
            .collect(),
        Some(_) => Err(Error::new(ErrorKind::Malformed)
            .with_message("expected an array of strings")
            .with_field(field)),
    }
}

struct PathPaymentParts {
    asset: Asset,
    from: AccountId,
    from_muxed: Option<MuxedAccount>,
    to: AccountId,
    to_muxed: Option<MuxedAccount>,
    amount: String,
    path: Vec<Asset>,
    source_asset: Asset,
    source_amount: String,
}

fn path_payment(map: &Obj) -> Result<PathPaymentParts, Error> {
    Ok(PathPaymentParts {
        asset: fields::asset_prefixed(map, "")?,
        from: fields::account_id(map, "from")?,
        from_muxed: fields::muxed_sibling(map, "from")?,
        to: fields::account_id(map, "to")?,
        to_muxed: fields::muxed_sibling(map, "to")?,
        amount: fields::req_string(map, "amount")?,
        path: asset_path(map, "path")?,
        source_asset: fields::asset_prefixed(map, "source_asset")?,
        source_amount: fields::req_string(map, "source_amount")?,
    })
}

fn offer(map: &Obj) -> Result<(String, String, Asset, Asset), Error> {
    Ok((
        fields::req_string(map, "amount")?,
        fields::req_string(map, "price")?,
        fields::asset_prefixed(map, "buying_asset")?,
        fields::asset_prefixed(map, "selling_asset")?,
    ))
}

/// Builds the operation registry. Construct once at startup and share by
/// reference; later registrations for a tag overwrite.
pub fn operation_registry() -> Registry<Operation> {
    let mut registry = Registry::new("type");

    registry.register(
        "create_account",
        operation(|map| {
            Ok(OperationDetail::CreateAccount {
                account: fields::account_id(map, "account")?,
                funder: fields::account_id(map, "funder")?,
                funder_muxed: fields::muxed_sibling(map, "funder")?,
                starting_balance: fields::req_string(map, "starting_balance")?,
            })
        }),
    );

    registry.register(
        "payment",
        operation(|map| {
            Ok(OperationDetail::Payment {
                asset: fields::asset_prefixed(map, "")?,
                from: fields::account_id(map, "from")?,
                from_muxed: fields::muxed_sibling(map, "from")?,
                to: fields::account_id(map, "to")?,
                to_muxed: fields::muxed_sibling(map, "to")?,
                amount: fields::req_string(map, "amount")?,
            })
        }),
    );

    registry.register(
        "path_payment_strict_receive",
        operation(|map| {
            let parts = path_payment(map)?;
            Ok(OperationDetail::PathPaymentStrictReceive {
                asset: parts.asset,
                from: parts.from,
                from_muxed: parts.from_muxed,
                to: parts.to,
                to_muxed: parts.to_muxed,
                amount: parts.amount,
                path: parts.path,
                source_asset: parts.source_asset,
                source_amount: parts.source_amount,
                source_max: fields::req_string(map, "source_max")?,
            })
        }),
    );
    registry.register(
        "path_payment_strict_send",
        operation(|map| {
            let parts = path_payment(map)?;
            Ok(OperationDetail::PathPaymentStrictSend {
                asset: parts.asset,
                from: parts.from,
                from_muxed: parts.from_muxed,
                to: parts.to,
                to_muxed: parts.to_muxed,
                amount: parts.amount,
                path: parts.path,
                source_asset: parts.source_asset,
                source_amount: parts.source_amount,
                destination_min: fields::req_string(map, "destination_min")?,
            })
        }),
    );

    registry.register(
        "manage_sell_offer",
        operation(|map| {
            let (amount, price, buying, selling) = offer(map)?;
            Ok(OperationDetail::ManageSellOffer {
                offer_id: fields::req_string(map, "offer_id")?,
                amount,
                price,
                buying,
                selling,
            })
        }),
    );
    registry.register(
        "manage_buy_offer",
        operation(|map| {
            let (amount, price, buying, selling) = offer(map)?;
            Ok(OperationDetail::ManageBuyOffer {
                offer_id: fields::req_string(map, "offer_id")?,
                amount,
                price,
                buying,
                selling,
            })
        }),
    );
    registry.register(
        "create_passive_sell_offer",
        operation(|map| {
            let (amount, price, buying, selling) = offer(map)?;
            Ok(OperationDetail::CreatePassiveSellOffer {
                amount,
                price,
                buying,
                selling,
            })
        }),
    );

    registry.register(
        "set_options",
        operation(|map| {
            Ok(OperationDetail::SetOptions {
                home_domain: fields::opt_string(map, "home_domain")?,
                inflation_dest: fields::opt_account_id(map, "inflation_dest")?,
                master_key_weight: fields::opt_u32(map, "master_key_weight")?,
                low_threshold: fields::opt_u32(map, "low_threshold")?,
                med_threshold: fields::opt_u32(map, "med_threshold")?,
                high_threshold: fields::opt_u32(map, "high_threshold")?,
                signer_key: fields::opt_string(map, "signer_key")?,
                signer_weight: fields::opt_u32(map, "signer_weight")?,
                set_flags: flag_list(map, "set_flags_s")?,
                clear_flags: flag_list(map, "clear_flags_s")?,
            })
        }),
    );

    registry.register(
        "change_trust",
        operation(|map| {
            Ok(OperationDetail::ChangeTrust {
                asset: fields::asset_prefixed(map, "")?,
                trustor: fields::account_id(map, "trustor")?,
                trustor_muxed: fields::muxed_sibling(map, "trustor")?,
                trustee: fields::opt_account_id(map, "trustee")?,
                limit: fields::req_string(map, "limit")?,
            })
        }),
    );
    registry.register(
        "allow_trust",
        operation(|map| {
            Ok(OperationDetail::AllowTrust {
                asset: fields::asset_prefixed(map, "")?,
                trustor: fields::account_id(map, "trustor")?,
                trustee: fields::account_id(map, "trustee")?,
                trustee_muxed: fields::muxed_sibling(map, "trustee")?,
                authorize: fields::req_bool(map, "authorize")?,
            })
        }),
    );

    registry.register(
        "account_merge",
        operation(|map| {
            Ok(OperationDetail::AccountMerge {
                account: fields::account_id(map, "account")?,
                account_muxed: fields::muxed_sibling(map, "account")?,
                into: fields::account_id(map, "into")?,
                into_muxed: fields::muxed_sibling(map, "into")?,
            })
        }),
    );
    registry.register("inflation", operation(|_| Ok(OperationDetail::Inflation)));

    registry.register(
        "manage_data",
        operation(|map| {
            Ok(OperationDetail::ManageData {
                name: fields::req_string(map, "name")?,
                value: fields::opt_string(map, "value")?,
            })
        }),
    );
    registry.register(
        "bump_sequence",
        operation(|map| {
            Ok(OperationDetail::BumpSequence {
                bump_to: fields::req_i64(map, "bump_to")?,
            })
        }),
    );

    registry.register(
        "create_claimable_balance",
        operation(|map| {
            Ok(OperationDetail::CreateClaimableBalance {
                sponsor: fields::opt_account_id(map, "sponsor")?,
                asset: Asset::parse(fields::req_str(map, "asset")?)
                    .map_err(|err| err.with_field("asset"))?,
                amount: fields::req_string(map, "amount")?,
                claimants: Claimant::decode_list(map, "claimants")?,
            })
        }),
    );
    registry.register(
        "claim_claimable_balance",
        operation(|map| {
            Ok(OperationDetail::ClaimClaimableBalance {
                balance_id: fields::req_string(map, "balance_id")?,
                claimant: fields::account_id(map, "claimant")?,
                claimant_muxed: fields::muxed_sibling(map, "claimant")?,
            })
        }),
    );

    registry.register(
        "clawback",
        operation(|map| {
            Ok(OperationDetail::Clawback {
                asset: fields::asset_prefixed(map, "")?,
                from: fields::account_id(map, "from")?,
                from_muxed: fields::muxed_sibling(map, "from")?,
                amount: fields::req_string(map, "amount")?,
            })
        }),
    );
    registry.register(
        "clawback_claimable_balance",
        operation(|map| {
            Ok(OperationDetail::ClawbackClaimableBalance {
                balance_id: fields::req_string(map, "balance_id")?,
            })
        }),
    );

    registry.register(
        "liquidity_pool_deposit",
        operation(|map| {
            Ok(OperationDetail::LiquidityPoolDeposit {
                liquidity_pool_id: fields::hex_hash(map, "liquidity_pool_id")?,
                reserves_max: Reserve::decode_list(map, "reserves_max")?,
                min_price: fields::req_string(map, "min_price")?,
                max_price: fields::req_string(map, "max_price")?,
                reserves_deposited: Reserve::decode_list(map, "reserves_deposited")?,
                shares_received: fields::req_string(map, "shares_received")?,
            })
        }),
    );
    registry.register(
        "liquidity_pool_withdraw",
        operation(|map| {
            Ok(OperationDetail::LiquidityPoolWithdraw {
                liquidity_pool_id: fields::hex_hash(map, "liquidity_pool_id")?,
                reserves_min: Reserve::decode_list(map, "reserves_min")?,
                shares: fields::req_string(map, "shares")?,
                reserves_received: Reserve::decode_list(map, "reserves_received")?,
            })
        }),
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::{OperationDetail, operation_registry};
    use crate::core::asset::Asset;
    use crate::core::error::ErrorKind;
    use serde_json::{Value, json};

    const ACCOUNT: &str = "GAQAA5L65LSYH7CQ3VTJ7F3HHLGCL3DSLAR2Y47263D56MNNGHSQSTVY";
    const MUXED: &str = "MAQAA5L65LSYH7CQ3VTJ7F3HHLGCL3DSLAR2Y47263D56MNNGHSQSAAAAAAAAAAE2LP26";

    fn payment(extra: Value) -> Value {
        let mut record = json!({
            "id": "3936840037961729",
            "paging_token": "3936840037961729",
            "source_account": ACCOUNT,
            "created_at": "2021-04-24T06:19:26Z",
            "transaction_hash": "f94c338370839a598753221714de0b0193d4fc56ea369db6efe88f18669cc5a1",
            "transaction_successful": true,
            "type": "payment",
            "asset_type": "native",
            "from": ACCOUNT,
            "to": ACCOUNT,
            "amount": "100.0",
        });
        record
            .as_object_mut()
            .expect("object")
            .extend(extra.as_object().expect("object").clone());
        record
    }

    #[test]
    fn payment_without_muxed_siblings() {
        let registry = operation_registry();
        let operation = registry.decode(&payment(json!({}))).expect("decode");
        assert_eq!(operation.transaction_successful, Some(true));
        match operation.detail {
            OperationDetail::Payment {
                asset, from_muxed, ..
            } => {
                assert_eq!(asset, Asset::Native);
                assert_eq!(from_muxed, None);
            }
            other => panic!("wrong detail: {other:?}"),
        }
    }

    #[test]
    fn payment_with_muxed_siblings() {
        let registry = operation_registry();
        let operation = registry
            .decode(&payment(json!({
                "from_muxed": MUXED,
                "from_muxed_id": "1234",
            })))
            .expect("decode");
        match operation.detail {
            OperationDetail::Payment {
                from, from_muxed, ..
            } => {
                let muxed = from_muxed.expect("muxed");
                assert_eq!(muxed.sub_id, Some(1234));
                assert_eq!(muxed.unmuxed_address(), from.address());
            }
            other => panic!("wrong detail: {other:?}"),
        }
    }

    #[test]
    fn create_claimable_balance_with_claimants() {
        let registry = operation_registry();
        let operation = registry
            .decode(&json!({
                "id": "124922916260433921",
                "paging_token": "124922916260433921",
                "source_account": ACCOUNT,
                "transaction_hash": "f94c338370839a598753221714de0b0193d4fc56ea369db6efe88f18669cc5a1",
                "type": "create_claimable_balance",
                "asset": format!("USDC:{ACCOUNT}"),
                "amount": "1.0",
                "claimants": [
                    { "destination": ACCOUNT, "predicate": { "unconditional": true } },
                ],
            }))
            .expect("decode");
        match operation.detail {
            OperationDetail::CreateClaimableBalance { claimants, .. } => {
                assert_eq!(claimants.len(), 1);
            }
            other => panic!("wrong detail: {other:?}"),
        }
    }

    #[test]
    fn path_payment_decodes_hops() {
        let registry = operation_registry();
        let operation = registry
            .decode(&json!({
                "id": "1",
                "paging_token": "1",
                "source_account": ACCOUNT,
                "transaction_hash": "ab",
                "type": "path_payment_strict_receive",
                "asset_type": "credit_alphanum4",
                "asset_code": "EUR",
                "asset_issuer": ACCOUNT,
                "from": ACCOUNT,
                "to": ACCOUNT,
                "amount": "10.0",
                "path": [
                    { "asset_type": "native" },
                    { "asset_type": "credit_alphanum4", "asset_code": "USD", "asset_issuer": ACCOUNT },
                ],
                "source_asset_type": "native",
                "source_amount": "10.0",
                "source_max": "10.5",
            }))
            .expect("decode");
        match operation.detail {
            OperationDetail::PathPaymentStrictReceive { path, .. } => {
                assert_eq!(path.len(), 2);
                assert_eq!(path[0], Asset::Native);
            }
            other => panic!("wrong detail: {other:?}"),
        }
    }

    #[test]
    fn liquidity_pool_deposit_reserves() {
        let registry = operation_registry();
        let operation = registry
            .decode(&json!({
                "id": "1",
                "paging_token": "1",
                "source_account": ACCOUNT,
                "transaction_hash": "ab",
                "type": "liquidity_pool_deposit",
                "liquidity_pool_id": "dd7b1ab831c273310ddbec6f97870aa83c2fbd78ce22aded37ecbf4f3380fac7",
                "reserves_max": [
                    { "asset": format!("USDC:{ACCOUNT}"), "amount": "1000.0" },
                    { "asset": "native", "amount": "3000.0" },
                ],
                "min_price": "0.2680000",
                "max_price": "0.3680000",
                "reserves_deposited": [
                    { "asset": format!("USDC:{ACCOUNT}"), "amount": "983.0" },
                    { "asset": "native", "amount": "2378.0" },
                ],
                "shares_received": "1000.0",
            }))
            .expect("decode");
        match operation.detail {
            OperationDetail::LiquidityPoolDeposit { reserves_max, .. } => {
                assert_eq!(reserves_max.len(), 2);
                assert_eq!(reserves_max[1].asset, Asset::Native);
            }
            other => panic!("wrong detail: {other:?}"),
        }
    }

    #[test]
    fn unknown_operation_tag_is_rejected() {
        let registry = operation_registry();
        let err = registry
            .decode(&json!({ "type": "warp_drive" }))
            .expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::UnknownVariant);
    }
}
