//! Query-string parsing with bracketed-key nesting.
//!
//! `form[name]=jim` becomes `{"form":{"name":"jim"}}`; `tag[]=a&tag[]=b`
//! and repeated flat keys collect into arrays. Pair tokenization and
//! percent-decoding are delegated to `url`; only the bracket walk lives
//! here.

use serde_json::{Map, Value};
use url::Url;

/// Base used to resolve relative request targets before reading the query
/// component. Never observable in results.
const PLACEHOLDER_BASE: &str = "https://placeholder.invalid/";

/// Extracts the raw query component of `target`, resolving relative targets
/// against a placeholder base.
pub(crate) fn target_query(target: &str) -> Result<String, url::ParseError> {
    let base = Url::parse(PLACEHOLDER_BASE).expect("placeholder base url is valid");
    let url = Url::options().base_url(Some(&base)).parse(target)?;
    Ok(url.query().unwrap_or("").to_owned())
}

/// Parses a raw query string into a nested parameter tree.
pub(crate) fn parse(query: &str) -> Value {
    let mut root = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let segments = segments(&key);
        insert(&mut root, &segments, Value::String(value.into_owned()));
    }
    Value::Object(root)
}

enum Segment<'a> {
    Key(&'a str),
    Append,
}

/// Splits a key into its bracket path. Malformed bracket syntax (or an
/// append segment anywhere but last) degrades to a single flat key.
fn segments(key: &str) -> Vec<Segment<'_>> {
    let flat = || vec![Segment::Key(key)];
    let Some(open) = key.find('[') else {
        return flat();
    };
    if open == 0 {
        return flat();
    }
    let mut parts = vec![Segment::Key(&key[..open])];
    let mut rest = &key[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return flat();
        }
        let Some(close) = rest.find(']') else {
            return flat();
        };
        let inner = &rest[1..close];
        parts.push(if inner.is_empty() {
            Segment::Append
        } else {
            Segment::Key(inner)
        });
        rest = &rest[close + 1..];
    }
    if parts
        .iter()
        .rev()
        .skip(1)
        .any(|segment| matches!(segment, Segment::Append))
    {
        return flat();
    }
    parts
}

fn insert(map: &mut Map<String, Value>, segments: &[Segment<'_>], value: Value) {
    match segments {
        [Segment::Key(key)] => match map.get_mut(*key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let prior = existing.take();
                *existing = Value::Array(vec![prior, value]);
            }
            None => {
                map.insert((*key).to_owned(), value);
            }
        },
        [Segment::Key(key), Segment::Append] => {
            let slot = map
                .entry((*key).to_owned())
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(items) => items.push(value),
                other => {
                    let prior = other.take();
                    *other = Value::Array(vec![prior, value]);
                }
            }
        }
        [Segment::Key(key), rest @ ..] => {
            let slot = map
                .entry((*key).to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                insert(inner, rest, value);
            }
        }
        _ => {}
    }
}
