// Core modules implementing the pure codecs and error modeling.
pub mod asset;
pub mod error;
pub mod muxed;
pub mod predicate;
pub mod strkey;
