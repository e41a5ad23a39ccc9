//! Purpose: Build and decompose composite (account key, sub-id) identities.
//! Exports: `MuxedAccount`.
//! Role: Text codec for the `G...`/`M...` address pair over the strkey scheme.
//! Invariants: A plain address decodes to `sub_id = None`; the plain and muxed
//! forms use distinct version bytes and are never confusable.
//! Invariants: `decode(encode(m)) == m` and `encode(decode(s)) == s` for valid `s`.

use std::fmt;
use std::str::FromStr;

use crate::core::asset::AccountId;
use crate::core::error::{Error, ErrorKind};
use crate::core::strkey::{self, VERSION_ACCOUNT_ID, VERSION_MUXED_ACCOUNT};

/// A base account key plus an optional 64-bit sub-account id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MuxedAccount {
    pub account_id: AccountId,
    pub sub_id: Option<u64>,
}

impl MuxedAccount {
    pub fn new(account_id: AccountId, sub_id: Option<u64>) -> Self {
        Self { account_id, sub_id }
    }

    /// Encodes to the muxed `M...` form when a sub-id is present, the plain
    /// `G...` form otherwise.
    pub fn address(&self) -> String {
        match self.sub_id {
            None => self.account_id.address(),
            Some(id) => {
                let mut payload = Vec::with_capacity(40);
                payload.extend_from_slice(self.account_id.as_bytes());
                payload.extend_from_slice(&id.to_be_bytes());
                strkey::encode(VERSION_MUXED_ACCOUNT, &payload)
            }
        }
    }

    /// The plain `G...` encoding of the base key, discarding any sub-id.
    pub fn unmuxed_address(&self) -> String {
        self.account_id.address()
    }

    /// Decodes either address form. The plain version byte is tried first; a
    /// version mismatch falls through to the muxed form, and a second failure
    /// reports `InvalidMuxedAccount`.
    pub fn decode(s: &str) -> Result<Self, Error> {
        match strkey::decode(s, VERSION_ACCOUNT_ID, 32) {
            Ok(payload) => {
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&payload);
                Ok(Self::new(AccountId::new(bytes), None))
            }
            Err(err) if err.kind() == ErrorKind::VersionMismatch => {
                let payload = strkey::decode(s, VERSION_MUXED_ACCOUNT, 40).map_err(|err| {
                    Error::new(ErrorKind::InvalidMuxedAccount)
                        .with_message(format!("{s:?} is neither a plain nor a muxed address"))
                        .with_source(err)
                })?;
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&payload[..32]);
                let mut id = [0u8; 8];
                id.copy_from_slice(&payload[32..]);
                Ok(Self::new(
                    AccountId::new(bytes),
                    Some(u64::from_be_bytes(id)),
                ))
            }
            Err(err) => Err(err),
        }
    }
}

impl From<AccountId> for MuxedAccount {
    fn from(account_id: AccountId) -> Self {
        Self::new(account_id, None)
    }
}

impl fmt::Display for MuxedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

impl FromStr for MuxedAccount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
