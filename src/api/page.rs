//! Purpose: Decode cursor-paginated collections and follow their links.
//! Exports: `Page`, `RecordFailure`.
//! Role: Generic container over any record type; navigation replays the
//! server's opaque cursor links verbatim through a `Transport`.
//! Invariants: Record order matches the server's `_embedded.records` order.
//! Invariants: A missing next link means end-of-collection (`Ok(None)`), never
//! an error; transport failures always propagate as errors.

use serde_json::{Map, Value};
use url::Url;

use crate::api::fields;
use crate::api::transport::Transport;
use crate::core::error::{Error, ErrorKind};

/// One page of a collection: the decoded records plus the navigation links the
/// server handed back. The link URLs embed a cursor the client never parses.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub self_link: Url,
    pub next_link: Option<Url>,
    pub prev_link: Option<Url>,
}

/// A record that failed to decode during a lenient page decode, with its
/// position in the server's ordering.
#[derive(Debug)]
pub struct RecordFailure {
    pub index: usize,
    pub error: Error,
}

impl<T> Page<T> {
    /// Decodes a page envelope, failing on the first record that does not
    /// decode. The failed record's index is attached to the error.
    pub fn decode<F>(value: &Value, item_decoder: &F) -> Result<Self, Error>
    where
        F: Fn(&Value) -> Result<T, Error>,
    {
        let (links, records) = envelope(value)?;
        let mut decoded = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            decoded.push(item_decoder(record).map_err(|err| err.with_record(index))?);
        }
        Ok(Self::assemble(links, decoded))
    }

    /// Decodes a page envelope, collecting per-record failures instead of
    /// stopping at the first. The envelope itself must still be well-formed.
    pub fn decode_partial<F>(
        value: &Value,
        item_decoder: &F,
    ) -> Result<(Self, Vec<RecordFailure>), Error>
    where
        F: Fn(&Value) -> Result<T, Error>,
    {
        let (links, records) = envelope(value)?;
        let mut decoded = Vec::with_capacity(records.len());
        let mut failures = Vec::new();
        for (index, record) in records.iter().enumerate() {
            match item_decoder(record) {
                Ok(record) => decoded.push(record),
                Err(error) => failures.push(RecordFailure {
                    index,
                    error: error.with_record(index),
                }),
            }
        }
        Ok((Self::assemble(links, decoded), failures))
    }

    /// Follows the next link, if any. `Ok(None)` means the collection is
    /// exhausted; a fetch whose body is not a page fails with `Pagination`.
    pub fn next<F>(&self, transport: &dyn Transport, item_decoder: &F) -> Result<Option<Self>, Error>
    where
        F: Fn(&Value) -> Result<T, Error>,
    {
        self.follow(self.next_link.as_ref(), transport, item_decoder)
    }

    /// Follows the previous link, if any, with the same contract as `next`.
    pub fn prev<F>(&self, transport: &dyn Transport, item_decoder: &F) -> Result<Option<Self>, Error>
    where
        F: Fn(&Value) -> Result<T, Error>,
    {
        self.follow(self.prev_link.as_ref(), transport, item_decoder)
    }

    fn follow<F>(
        &self,
        link: Option<&Url>,
        transport: &dyn Transport,
        item_decoder: &F,
    ) -> Result<Option<Self>, Error>
    where
        F: Fn(&Value) -> Result<T, Error>,
    {
        let Some(url) = link else {
            return Ok(None);
        };
        let body = transport.get(url)?;
        let page = Self::decode(&body, item_decoder).map_err(|err| {
            Error::new(ErrorKind::Pagination)
                .with_message(format!("fetched body is not a page: {err}"))
                .with_source(err)
        })?;
        Ok(Some(page))
    }

    fn assemble(links: Links, records: Vec<T>) -> Self {
        Self {
            records,
            self_link: links.self_link,
            next_link: links.next_link,
            prev_link: links.prev_link,
        }
    }
}

struct Links {
    self_link: Url,
    next_link: Option<Url>,
    prev_link: Option<Url>,
}

fn envelope(value: &Value) -> Result<(Links, &Vec<Value>), Error> {
    let map = fields::obj(value)?;

    let Some(links) = fields::req(map, "_links")?.as_object() else {
        return Err(Error::new(ErrorKind::Malformed)
            .with_message("expected an object")
            .with_field("_links"));
    };
    let Some(self_link) = link(links, "self")? else {
        return Err(Error::new(ErrorKind::Malformed)
            .with_message("page is missing its self link")
            .with_field("_links.self"));
    };
    let links = Links {
        self_link,
        next_link: link(links, "next")?,
        prev_link: link(links, "prev")?,
    };

    let Some(embedded) = fields::req(map, "_embedded")?.as_object() else {
        return Err(Error::new(ErrorKind::Malformed)
            .with_message("expected an object")
            .with_field("_embedded"));
    };
    let Some(records) = fields::req(embedded, "records")?.as_array() else {
        return Err(Error::new(ErrorKind::Malformed)
            .with_message("expected an array of records")
            .with_field("_embedded.records"));
    };

    Ok((links, records))
}

fn link(links: &Map<String, Value>, name: &str) -> Result<Option<Url>, Error> {
    let Some(entry) = links.get(name) else {
        return Ok(None);
    };
    if entry.is_null() {
        return Ok(None);
    }
    let Some(entry) = entry.as_object() else {
        return Err(Error::new(ErrorKind::Malformed)
            .with_message("expected a link object")
            .with_field(format!("_links.{name}")));
    };
    let href = fields::req_str(entry, "href")
        .map_err(|err| err.with_field(format!("_links.{name}.href")))?;
    let url = Url::parse(href).map_err(|err| {
        Error::new(ErrorKind::Malformed)
            .with_message("link href is not an absolute url")
            .with_field(format!("_links.{name}.href"))
            .with_source(err)
    })?;
    Ok(Some(url))
}

#[cfg(test)]
mod tests {
    use super::Page;
    use crate::api::transport::Transport;
    use crate::core::error::{Error, ErrorKind};
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use url::Url;

    fn amount(value: &Value) -> Result<u64, Error> {
        value["amount"].as_u64().ok_or_else(|| {
            Error::new(ErrorKind::Malformed)
                .with_message("expected a number")
                .with_field("amount")
        })
    }

    fn page_body(records: Value, next: Option<&str>) -> Value {
        let mut links = json!({
            "self": { "href": "https://ledger.example/payments?cursor=1" },
        });
        if let Some(next) = next {
            links["next"] = json!({ "href": next });
        }
        json!({ "_links": links, "_embedded": { "records": records } })
    }

    struct FakeTransport {
        responses: HashMap<String, Value>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeTransport {
        fn new(responses: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(url, body)| (url.to_string(), body))
                    .collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for FakeTransport {
        fn get(&self, url: &Url) -> Result<Value, Error> {
            self.calls.borrow_mut().push(url.to_string());
            self.responses
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| Error::new(ErrorKind::Transport).with_message("connection refused"))
        }
    }

    #[test]
    fn decode_preserves_server_order() {
        let body = page_body(json!([{ "amount": 3 }, { "amount": 1 }, { "amount": 2 }]), None);
        let page = Page::decode(&body, &amount).expect("page");
        assert_eq!(page.records, vec![3, 1, 2]);
        assert_eq!(page.next_link, None);
        assert_eq!(page.prev_link, None);
    }

    #[test]
    fn decode_fails_fast_and_names_the_record() {
        let body = page_body(json!([{ "amount": 3 }, { "amount": "oops" }]), None);
        let err = Page::decode(&body, &amount).expect_err("bad record");
        assert_eq!(err.record(), Some(1));
    }

    #[test]
    fn decode_partial_collects_failures() {
        let body = page_body(
            json!([{ "amount": 3 }, { "amount": "oops" }, { "amount": 2 }]),
            None,
        );
        let (page, failures) = Page::decode_partial(&body, &amount).expect("page");
        assert_eq!(page.records, vec![3, 2]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
    }

    #[test]
    fn missing_next_link_ends_the_collection_without_a_fetch() {
        let body = page_body(json!([]), None);
        let page = Page::decode(&body, &amount).expect("page");
        let transport = FakeTransport::new([]);
        let next = page.next(&transport, &amount).expect("next");
        assert!(next.is_none());
        assert!(transport.calls.borrow().is_empty());
    }

    #[test]
    fn next_replays_the_link_verbatim() {
        let next_url = "https://ledger.example/payments?cursor=3936840037961729&order=asc";
        let body = page_body(json!([{ "amount": 1 }]), Some(next_url));
        let page = Page::decode(&body, &amount).expect("page");
        let transport = FakeTransport::new([(
            next_url,
            page_body(json!([{ "amount": 2 }]), None),
        )]);
        let next = page
            .next(&transport, &amount)
            .expect("fetch")
            .expect("page");
        assert_eq!(next.records, vec![2]);
        assert_eq!(transport.calls.borrow().as_slice(), [next_url]);
    }

    #[test]
    fn transport_failure_propagates_rather_than_ending() {
        let body = page_body(
            json!([]),
            Some("https://ledger.example/payments?cursor=9"),
        );
        let page = Page::decode(&body, &amount).expect("page");
        let transport = FakeTransport::new([]);
        let err = page.next(&transport, &amount).expect_err("down");
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn non_page_body_is_a_pagination_error() {
        let next_url = "https://ledger.example/payments?cursor=9";
        let body = page_body(json!([]), Some(next_url));
        let page = Page::decode(&body, &amount).expect("page");
        let transport = FakeTransport::new([(next_url, json!({ "status": 429 }))]);
        let err = page.next(&transport, &amount).expect_err("not a page");
        assert_eq!(err.kind(), ErrorKind::Pagination);
    }

    #[test]
    fn missing_self_link_is_rejected() {
        let body = json!({
            "_links": {},
            "_embedded": { "records": [] },
        });
        let err = Page::<u64>::decode(&body, &amount).expect_err("no self");
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(err.field(), Some("_links.self"));
    }
}
