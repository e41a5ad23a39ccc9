//! Purpose: Table-driven dispatch from a discriminator tag to a variant decoder.
//! Exports: `Registry`.
//! Role: The decode engine behind every polymorphic record family.
//! Invariants: Unknown tags fail with `UnknownVariant`; no fallback is invented.
//! Invariants: Registration is a one-time setup step; decode is a pure read and
//! safe to call concurrently from many threads.

use std::collections::HashMap;

use serde_json::Value;

use crate::api::fields;
use crate::core::error::{Error, ErrorKind};

type Decoder<T> = Box<dyn Fn(&Value) -> Result<T, Error> + Send + Sync>;

/// Maps discriminator values (the family's `type` or `asset_type` field) to
/// decode functions. Built once, then shared by reference.
pub struct Registry<T> {
    tag_field: &'static str,
    decoders: HashMap<String, Decoder<T>>,
}

impl<T> Registry<T> {
    pub fn new(tag_field: &'static str) -> Self {
        Self {
            tag_field,
            decoders: HashMap::new(),
        }
    }

    /// The discriminator field this registry reads.
    pub fn tag_field(&self) -> &'static str {
        self.tag_field
    }

    /// Registers a decoder for `tag`. A later registration for the same tag
    /// overwrites the earlier one, which is how protocol-version-evolved shapes
    /// replace their predecessors.
    pub fn register<F>(&mut self, tag: impl Into<String>, decoder: F)
    where
        F: Fn(&Value) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.decoders.insert(tag.into(), Box::new(decoder));
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Dispatches on the record's discriminator field.
    pub fn decode(&self, value: &Value) -> Result<T, Error> {
        let map = fields::obj(value)?;
        let tag = fields::req_str(map, self.tag_field)?;
        let Some(decoder) = self.decoders.get(tag) else {
            return Err(Error::new(ErrorKind::UnknownVariant)
                .with_message("no decoder registered for this tag")
                .with_field(self.tag_field)
                .with_tag(tag));
        };
        decoder(value)
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn dispatches_on_the_tag_field() {
        let mut registry: Registry<&'static str> = Registry::new("type");
        registry.register("left", |_| Ok("left"));
        registry.register("right", |_| Ok("right"));
        assert_eq!(registry.decode(&json!({ "type": "right" })).expect("ok"), "right");
    }

    #[test]
    fn unknown_tag_is_rejected_not_defaulted() {
        let registry: Registry<()> = Registry::new("type");
        let err = registry
            .decode(&json!({ "type": "wormhole_opened" }))
            .expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::UnknownVariant);
        assert_eq!(err.tag(), Some("wormhole_opened"));
    }

    #[test]
    fn missing_tag_field_names_the_field() {
        let registry: Registry<()> = Registry::new("asset_type");
        let err = registry.decode(&json!({})).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(err.field(), Some("asset_type"));
    }

    #[test]
    fn later_registration_overwrites() {
        let mut registry: Registry<u32> = Registry::new("type");
        registry.register("evolved", |_| Ok(1));
        registry.register("evolved", |_| Ok(2));
        assert_eq!(registry.decode(&json!({ "type": "evolved" })).expect("ok"), 2);
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry<()>>();
    }
}
