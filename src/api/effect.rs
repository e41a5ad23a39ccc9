//! Purpose: Decode the effect record family (ledger-history side effects).
//! Exports: `Effect`, `EffectDetail`, `effect_registry`.
//! Role: Largest polymorphic family after operations; keyed by the `type` tag.
//! Invariants: Common envelope fields decode once; each variant owns its own
//! attribute set.

use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::api::fields;
use crate::api::registry::Registry;
use crate::core::asset::{AccountId, Asset};
use crate::core::error::Error;
use crate::core::muxed::MuxedAccount;
use crate::core::predicate::Predicate;

/// One decoded effect: the envelope shared by every variant plus the
/// variant-specific detail.
#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    pub id: String,
    pub paging_token: String,
    pub account: Option<AccountId>,
    pub account_muxed: Option<MuxedAccount>,
    pub created_at: Option<OffsetDateTime>,
    pub detail: EffectDetail,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EffectDetail {
    AccountCreated {
        starting_balance: String,
    },
    AccountRemoved,
    AccountCredited {
        asset: Asset,
        amount: String,
    },
    AccountDebited {
        asset: Asset,
        amount: String,
    },
    AccountThresholdsUpdated {
        low_threshold: u32,
        med_threshold: u32,
        high_threshold: u32,
    },
    AccountHomeDomainUpdated {
        home_domain: String,
    },
    AccountFlagsUpdated {
        auth_required: Option<bool>,
        auth_revocable: Option<bool>,
    },
    SignerCreated {
        weight: u32,
        public_key: String,
    },
    SignerRemoved {
        weight: u32,
        public_key: String,
    },
    SignerUpdated {
        weight: u32,
        public_key: String,
    },
    TrustlineCreated {
        asset: Asset,
        limit: String,
    },
    TrustlineRemoved {
        asset: Asset,
        limit: String,
    },
    TrustlineUpdated {
        asset: Asset,
        limit: String,
    },
    OfferCreated,
    OfferRemoved,
    OfferUpdated,
    Trade {
        seller: AccountId,
        seller_muxed: Option<MuxedAccount>,
        offer_id: String,
        sold_amount: String,
        sold_asset: Asset,
        bought_amount: String,
        bought_asset: Asset,
    },
    DataCreated {
        name: String,
        value: String,
    },
    DataRemoved {
        name: String,
    },
    DataUpdated {
        name: String,
        value: String,
    },
    SequenceBumped {
        new_seq: i64,
    },
    ClaimableBalanceCreated {
        balance_id: String,
        asset: Asset,
        amount: String,
    },
    ClaimableBalanceClaimantCreated {
        balance_id: String,
        asset: Asset,
        amount: String,
        predicate: Predicate,
    },
    ClaimableBalanceClaimed {
        balance_id: String,
        asset: Asset,
        amount: String,
    },
}

type Obj = Map<String, Value>;

fn envelope(map: &Obj, detail: EffectDetail) -> Result<Effect, Error> {
    Ok(Effect {
        id: fields::req_string(map, "id")?,
        paging_token: fields::req_string(map, "paging_token")?,
        account: fields::opt_account_id(map, "account")?,
        account_muxed: fields::muxed_sibling(map, "account")?,
        created_at: fields::opt_timestamp(map, "created_at")?,
        detail,
    })
}

/// Lifts a detail decoder over the shared envelope.
fn effect<F>(detail: F) -> impl Fn(&Value) -> Result<Effect, Error> + Send + Sync
where
    F: Fn(&Obj) -> Result<EffectDetail, Error> + Send + Sync,
{
    move |value| {
        let map = fields::obj(value)?;
        envelope(map, detail(map)?)
    }
}

fn signer(map: &Obj) -> Result<(u32, String), Error> {
    let weight = fields::opt_u32(map, "weight")?.unwrap_or(0);
    Ok((weight, fields::req_string(map, "public_key")?))
}

fn trustline(map: &Obj) -> Result<(Asset, String), Error> {
    Ok((
        fields::asset_prefixed(map, "")?,
        fields::req_string(map, "limit")?,
    ))
}

fn claimable(map: &Obj) -> Result<(String, Asset, String), Error> {
    Ok((
        fields::req_string(map, "balance_id")?,
        Asset::parse(fields::req_str(map, "asset")?).map_err(|err| err.with_field("asset"))?,
        fields::req_string(map, "amount")?,
    ))
}

/// Builds the effect registry. Construct once at startup and share by
/// reference; later registrations for a tag overwrite.
pub fn effect_registry() -> Registry<Effect> {
    let mut registry = Registry::new("type");

    registry.register(
        "account_created",
        effect(|map| {
            Ok(EffectDetail::AccountCreated {
                starting_balance: fields::req_string(map, "starting_balance")?,
            })
        }),
    );
    registry.register("account_removed", effect(|_| Ok(EffectDetail::AccountRemoved)));
    registry.register(
        "account_credited",
        effect(|map| {
            Ok(EffectDetail::AccountCredited {
                asset: fields::asset_prefixed(map, "")?,
                amount: fields::req_string(map, "amount")?,
            })
        }),
    );
    registry.register(
        "account_debited",
        effect(|map| {
            Ok(EffectDetail::AccountDebited {
                asset: fields::asset_prefixed(map, "")?,
                amount: fields::req_string(map, "amount")?,
            })
        }),
    );
    registry.register(
        "account_thresholds_updated",
        effect(|map| {
            Ok(EffectDetail::AccountThresholdsUpdated {
                low_threshold: fields::opt_u32(map, "low_threshold")?.unwrap_or(0),
                med_threshold: fields::opt_u32(map, "med_threshold")?.unwrap_or(0),
                high_threshold: fields::opt_u32(map, "high_threshold")?.unwrap_or(0),
            })
        }),
    );
    registry.register(
        "account_home_domain_updated",
        effect(|map| {
            Ok(EffectDetail::AccountHomeDomainUpdated {
                home_domain: fields::req_string(map, "home_domain")?,
            })
        }),
    );
    registry.register(
        "account_flags_updated",
        effect(|map| {
            Ok(EffectDetail::AccountFlagsUpdated {
                auth_required: fields::opt_bool(map, "auth_required_flag")?,
                auth_revocable: fields::opt_bool(map, "auth_revokable_flag")?,
            })
        }),
    );

    registry.register(
        "signer_created",
        effect(|map| {
            let (weight, public_key) = signer(map)?;
            Ok(EffectDetail::SignerCreated { weight, public_key })
        }),
    );
    registry.register(
        "signer_removed",
        effect(|map| {
            let (weight, public_key) = signer(map)?;
            Ok(EffectDetail::SignerRemoved { weight, public_key })
        }),
    );
    registry.register(
        "signer_updated",
        effect(|map| {
            let (weight, public_key) = signer(map)?;
            Ok(EffectDetail::SignerUpdated { weight, public_key })
        }),
    );

    registry.register(
        "trustline_created",
        effect(|map| {
            let (asset, limit) = trustline(map)?;
            Ok(EffectDetail::TrustlineCreated { asset, limit })
        }),
    );
    registry.register(
        "trustline_removed",
        effect(|map| {
            let (asset, limit) = trustline(map)?;
            Ok(EffectDetail::TrustlineRemoved { asset, limit })
        }),
    );
    registry.register(
        "trustline_updated",
        effect(|map| {
            let (asset, limit) = trustline(map)?;
            Ok(EffectDetail::TrustlineUpdated { asset, limit })
        }),
    );

    registry.register("offer_created", effect(|_| Ok(EffectDetail::OfferCreated)));
    registry.register("offer_removed", effect(|_| Ok(EffectDetail::OfferRemoved)));
    registry.register("offer_updated", effect(|_| Ok(EffectDetail::OfferUpdated)));

    registry.register(
        "trade",
        effect(|map| {
            Ok(EffectDetail::Trade {
                seller: fields::account_id(map, "seller")?,
                seller_muxed: fields::muxed_sibling(map, "seller")?,
                offer_id: fields::req_string(map, "offer_id")?,
                sold_amount: fields::req_string(map, "sold_amount")?,
                sold_asset: fields::asset_prefixed(map, "sold_asset")?,
                bought_amount: fields::req_string(map, "bought_amount")?,
                bought_asset: fields::asset_prefixed(map, "bought_asset")?,
            })
        }),
    );

    registry.register(
        "data_created",
        effect(|map| {
            Ok(EffectDetail::DataCreated {
                name: fields::req_string(map, "name")?,
                value: fields::req_string(map, "value")?,
            })
        }),
    );
    registry.register(
        "data_removed",
        effect(|map| {
            Ok(EffectDetail::DataRemoved {
                name: fields::req_string(map, "name")?,
            })
        }),
    );
    registry.register(
        "data_updated",
        effect(|map| {
            Ok(EffectDetail::DataUpdated {
                name: fields::req_string(map, "name")?,
                value: fields::req_string(map, "value")?,
            })
        }),
    );

    registry.register(
        "sequence_bumped",
        effect(|map| {
            Ok(EffectDetail::SequenceBumped {
                new_seq: fields::req_i64(map, "new_seq")?,
            })
        }),
    );

    registry.register(
        "claimable_balance_created",
        effect(|map| {
            let (balance_id, asset, amount) = claimable(map)?;
            Ok(EffectDetail::ClaimableBalanceCreated {
                balance_id,
                asset,
                amount,
            })
        }),
    );
    registry.register(
        "claimable_balance_claimant_created",
        effect(|map| {
            let (balance_id, asset, amount) = claimable(map)?;
            Ok(EffectDetail::ClaimableBalanceClaimantCreated {
                balance_id,
                asset,
                amount,
                predicate: fields::predicate(map, "predicate")?,
            })
        }),
    );
    registry.register(
        "claimable_balance_claimed",
        effect(|map| {
            let (balance_id, asset, amount) = claimable(map)?;
            Ok(EffectDetail::ClaimableBalanceClaimed {
                balance_id,
                asset,
                amount,
            })
        }),
    );

    registry
}
