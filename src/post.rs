//! Inbound API data and its classification into [`Batch`]es.

use crate::Error;
use core::fmt;
use serde::Deserialize;
use tracing::{trace, warn};
use wasm_bindgen::JsValue;

/// Stable identity of a post, as found in `data-js-post-id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);
impl PostId {
	#[must_use]
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl fmt::Display for PostId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
impl From<&str> for PostId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

/// Either an ISO 8601 string or epoch milliseconds, depending on the API version.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
	Millis(f64),
	Text(String),
}
impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Timestamp::Millis(millis) => write!(f, "{}", millis),
			Timestamp::Text(text) => f.write_str(text),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
	Create,
	Update,
	Delete,
}
impl Default for Operation {
	fn default() -> Self {
		Self::Create
	}
}

/// A single post as delivered by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
	#[serde(rename = "_id")]
	pub id: PostId,
	#[serde(default)]
	pub operation: Operation,
	#[serde(rename = "_created", default)]
	pub created: Option<Timestamp>,
	/// Pre-rendered body markup. Templates may ignore it.
	#[serde(default)]
	pub html: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RequestMeta {
	#[serde(rename = "fromDate", default)]
	pub from_date: Option<Timestamp>,
}

/// One response of the polling collaborator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiResponse {
	#[serde(rename = "_items", default)]
	pub items: Vec<Item>,
	#[serde(rename = "requestOpts", default)]
	pub request_meta: RequestMeta,
}
impl ApiResponse {
	/// # Errors
	///
	/// Iff `value` doesn't have the shape of an API response.
	pub fn from_js(value: JsValue) -> Result<Self, Error> {
		serde_wasm_bindgen::from_value(value).map_err(|error| Error::decode("API response", error))
	}
}

/// Post changes of exactly one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
	Create { items: Vec<Item>, meta: RequestMeta },
	Update(Item),
	Delete(PostId),
}
impl Batch {
	/// Splits a response into homogeneous batches, preserving order.
	///
	/// Consecutive creates are grouped. Each update or delete becomes its own batch.
	#[must_use]
	pub fn split(response: ApiResponse) -> Vec<Batch> {
		let ApiResponse { items, request_meta } = response;
		let mut batches = Vec::new();
		let mut creates = Vec::new();
		let mut kinds = 0_u8;

		for item in items {
			kinds |= 1 << item.operation as u8;
			match item.operation {
				Operation::Create => {
					creates.push(item);
					continue;
				}
				Operation::Update | Operation::Delete => {}
			}
			if !creates.is_empty() {
				batches.push(Batch::Create { items: core::mem::take(&mut creates), meta: request_meta.clone() });
			}
			batches.push(match item.operation {
				Operation::Update => Batch::Update(item),
				Operation::Delete | Operation::Create => Batch::Delete(item.id),
			});
		}
		if !creates.is_empty() {
			batches.push(Batch::Create { items: creates, meta: request_meta });
		}

		if kinds.count_ones() > 1 {
			warn!("Response mixes operation kinds; applying {} batches in order.", batches.len());
		}
		trace!("Split response into {} batch(es).", batches.len());
		batches
	}
}
