//! 🔄 Transforms: BSON goes in, an Elasticsearch-ready JSON body comes out.
//!
//! 🎬 COLD OPEN. A raw BSON document arrives from the cursor. It has an `_id`.
//! It has nested documents. It has a date it is very proud of.
//! It is about to lose the `_id` (that becomes the URL) and have its date
//! translated into a string. It does not know this yet. 🦆
//!
//! Three steps, each one a place a document can fall out of the pipeline:
//!
//! ```text
//!  RawDocumentBuf ──decode──▶ Document ──take _id──▶ (hex id, Document) ──render──▶ JSON bytes
//!        │                        │                                        │
//!     Decode                MissingId / IdNotObjectId                  Serialize
//! ```

use mongodb::bson::{Bson, Document, RawDocumentBuf};
use serde_json::{Map, Number, Value};

use crate::report::SkipReason;

/// 🏷️ The field that becomes the Elasticsearch document id.
pub(crate) const ID_FIELD: &str = "_id";

/// 📦 Unwrap the raw BSON into a walkable document.
pub(crate) fn decode_document(raw: &RawDocumentBuf) -> Result<Document, SkipReason> {
    raw.to_document()
        .map_err(|err| SkipReason::Decode(err.to_string()))
}

/// 🎯 Remove `_id` from the body and return its hex form.
///
/// Only ObjectIds qualify. A string `_id` that happens to look like hex still gets skipped,
/// because reusing it verbatim would break the one-key-per-document promise for mixed collections.
pub(crate) fn take_document_id(document: &mut Document) -> Result<String, SkipReason> {
    match document.remove(ID_FIELD) {
        Some(Bson::ObjectId(oid)) => Ok(oid.to_hex()),
        Some(other) => Err(SkipReason::IdNotObjectId {
            found: format!("{:?}", other.element_type()),
        }),
        None => Err(SkipReason::MissingId),
    }
}

/// 📤 Render what's left of the document as a JSON object body.
pub(crate) fn render_body(document: Document) -> Result<Vec<u8>, SkipReason> {
    let body = document_to_json(document)?;
    serde_json::to_vec(&body).map_err(|err| SkipReason::Serialize(err.to_string()))
}

fn document_to_json(document: Document) -> Result<Value, SkipReason> {
    let mut object = Map::with_capacity(document.len());
    for (key, value) in document {
        let converted = bson_to_json(value).map_err(|reason| match reason {
            // -- 🧭 tack the field name on so the log line points somewhere useful
            SkipReason::Serialize(msg) => SkipReason::Serialize(format!("field '{key}': {msg}")),
            other => other,
        })?;
        object.insert(key, converted);
    }
    Ok(Value::Object(object))
}

/// 🔬 One BSON value to one JSON value.
///
/// The common types map to their obvious JSON twins. ObjectIds turn into hex strings and dates
/// into RFC 3339, which is what a search index actually wants to see. The exotic stuff
/// (binary, regex, timestamps, decimal128, ...) falls back to relaxed Extended JSON.
fn bson_to_json(value: Bson) -> Result<Value, SkipReason> {
    Ok(match value {
        Bson::Double(number) => Number::from_f64(number).map(Value::Number).ok_or_else(|| {
            SkipReason::Serialize(format!("unsupported value: {number} (JSON has no NaN or Infinity)"))
        })?,
        Bson::String(text) => Value::String(text),
        Bson::Boolean(flag) => Value::Bool(flag),
        Bson::Null => Value::Null,
        Bson::Int32(number) => Value::from(number),
        Bson::Int64(number) => Value::from(number),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::Array(items) => Value::Array(
            items
                .into_iter()
                .map(bson_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Bson::Document(document) => document_to_json(document)?,
        Bson::DateTime(date) => match date.try_to_rfc3339_string() {
            Ok(text) => Value::String(text),
            // -- 📅 year 10000 and friends: RFC 3339 can't say it, extended JSON can
            Err(_) => Bson::DateTime(date).into_relaxed_extjson(),
        },
        other => other.into_relaxed_extjson(),
    })
}
