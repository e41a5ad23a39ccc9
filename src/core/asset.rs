//! Purpose: Define account and asset value types plus the compact asset grammar.
//! Exports: `AccountId`, `Asset`.
//! Role: Leaf vocabulary used by every record decoder in the crate.
//! Invariants: `Credit` codes are 1..=12 chars; the wire tag matches the length
//! class on encode and is accepted either way on decode.
//! Invariants: Liquidity-pool shares have no colon form; `format` refuses them.

use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind};
use crate::core::strkey::{self, VERSION_ACCOUNT_ID};

/// A 32-byte ed25519 public key, carried as a checksummed `G...` string at the
/// wire boundary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The checksummed text form of this key.
    pub fn address(&self) -> String {
        strkey::encode(VERSION_ACCOUNT_ID, &self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.address())
    }
}

impl FromStr for AccountId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = strkey::decode(s, VERSION_ACCOUNT_ID, 32)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&payload);
        Ok(Self(bytes))
    }
}

/// An asset descriptor: the native token, an issued credit, or a share in a
/// liquidity pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Asset {
    Native,
    Credit { code: String, issuer: AccountId },
    LiquidityPoolShare { pool_id: [u8; 32] },
}

impl Asset {
    /// Builds an issued-credit asset, validating the code length.
    pub fn credit(code: impl Into<String>, issuer: AccountId) -> Result<Self, Error> {
        let code = code.into();
        if code.is_empty() || code.len() > 12 {
            return Err(Error::new(ErrorKind::InvalidAsset).with_message(format!(
                "asset code must be 1..=12 characters, got {}",
                code.len()
            )));
        }
        Ok(Self::Credit { code, issuer })
    }

    /// Parses the compact colon grammar: `native` or `CODE:ISSUER`.
    ///
    /// Liquidity-pool shares cannot be expressed in this grammar; callers that
    /// hold a discriminator field must dispatch on it instead of string parsing.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut parts = s.splitn(3, ':');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) if first == "native" => Ok(Self::Native),
            (None, _) => Err(Error::new(ErrorKind::InvalidAsset)
                .with_message(format!("expected `native` or `CODE:ISSUER`, got {s:?}"))),
            (Some(issuer), None) => {
                let issuer: AccountId = issuer.parse().map_err(|err: Error| {
                    Error::new(ErrorKind::InvalidAsset)
                        .with_message(format!("bad issuer in {s:?}"))
                        .with_source(err)
                })?;
                Self::credit(first, issuer)
            }
            (Some(_), Some(_)) => Err(Error::new(ErrorKind::InvalidAsset)
                .with_message(format!("too many `:` separators in {s:?}"))),
        }
    }

    /// The inverse of [`Asset::parse`]. Fails for pool shares, which have no
    /// string form.
    pub fn format(&self) -> Result<String, Error> {
        match self {
            Self::Native => Ok("native".to_string()),
            Self::Credit { code, issuer } => Ok(format!("{code}:{issuer}")),
            Self::LiquidityPoolShare { .. } => Err(Error::new(ErrorKind::InvalidAsset)
                .with_message("liquidity pool shares have no colon string form")),
        }
    }

    /// The discriminator tag this asset carries on the wire. The credit tag is
    /// chosen by code length: 1..=4 is `credit_alphanum4`, 5..=12 is
    /// `credit_alphanum12`.
    pub fn wire_type(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Credit { code, .. } if code.len() <= 4 => "credit_alphanum4",
            Self::Credit { .. } => "credit_alphanum12",
            Self::LiquidityPoolShare { .. } => "liquidity_pool_shares",
        }
    }
}
