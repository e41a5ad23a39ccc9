//! Purpose: Define the stable public Rust API boundary for Ledgerwire.
//! Exports: Record families, registries, pages, and the transport seam.
//! Role: Public, additive-only surface; hides field-extraction internals.
//! Invariants: This module is the only public path to the record decoders.
//! Invariants: Internal helpers remain private and are not directly exposed.

mod balance;
mod effect;
mod fields;
mod operation;
mod page;
mod registry;
mod transport;

pub use crate::core::asset::{AccountId, Asset};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::muxed::MuxedAccount;
pub use crate::core::predicate::Predicate;
pub use balance::{Balance, Claimant, ClaimableBalance, Reserve, balance_registry};
pub use effect::{Effect, EffectDetail, effect_registry};
pub use operation::{Operation, OperationDetail, operation_registry};
pub use page::{Page, RecordFailure};
pub use registry::Registry;
pub use transport::{HttpTransport, Transport};
