//! The permalink parameter: `liveblog._id=<post ID>__<sort order>`.

use crate::{
	post::PostId,
	settings::{Settings, SortOrder},
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{NoExpand, Regex};
use std::sync::OnceLock;
use tracing::{trace, warn};

/// Name of the URL parameter holding the permalink.
pub const PARAM_NAME: &str = "liveblog._id";

const SEPARATOR: &str = "__";

/// What `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'!').remove(b'~').remove(b'*').remove(b'\'').remove(b'(').remove(b')');

fn param_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(&format!("{}=([^&#]*)", regex::escape(PARAM_NAME))).expect("valid permalink pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed {
	/// No href has been received yet.
	NotReady,
	/// The href carries no usable permalink.
	Absent,
	Found,
}

/// Permalink state of one page, derived from its href.
#[derive(Debug, Clone, Default)]
pub struct Permalink {
	href: String,
	post_id: Option<PostId>,
	sort_changed: bool,
}
impl Permalink {
	#[must_use]
	pub fn href(&self) -> &str {
		&self.href
	}

	pub fn set_href(&mut self, href: impl Into<String>) {
		self.href = href.into();
	}

	/// The focused post, if a permalink was found.
	#[must_use]
	pub fn post_id(&self) -> Option<&PostId> {
		self.post_id.as_ref()
	}

	/// Whether a parsed permalink switched the sort order since the last call.
	///
	/// The caller is expected to re-fetch the timeline when this returns `true`.
	pub fn take_sort_change(&mut self) -> bool {
		core::mem::take(&mut self.sort_changed)
	}

	/// Reads the permalink from the current href.
	///
	/// Malformed values count as [`Parsed::Absent`] and leave the state untouched.
	pub fn parse(&mut self, settings: &mut Settings) -> Parsed {
		if self.href.is_empty() {
			return Parsed::NotReady;
		}

		let raw = match param_regex().captures(&self.href).and_then(|captures| captures.get(1)) {
			Some(raw) if !raw.as_str().is_empty() => raw.as_str(),
			_ => return Parsed::Absent,
		};
		let value = match percent_decode_str(raw).decode_utf8() {
			Ok(value) => value,
			Err(error) => {
				warn!("Permalink value isn't valid UTF-8 ({}). Ignoring it.", error);
				return Parsed::Absent;
			}
		};

		let mut parts = value.split(SEPARATOR);
		let id = match parts.next() {
			Some(id) if !id.is_empty() => id,
			_ => return Parsed::Absent,
		};
		self.post_id = Some(PostId::new(id));

		if let Some(order) = parts.next().filter(|order| !order.is_empty()) {
			if settings.set_post_order(SortOrder::new(order)) {
				self.sort_changed = true;
			}
		}
		trace!(post_id = id, sort_changed = self.sort_changed, "Parsed permalink.");
		Parsed::Found
	}

	/// Builds the href that focuses `id` under the current sort order.
	///
	/// An existing parameter is replaced in place, wherever it sits. Otherwise the parameter is
	/// appended after the configured delimiter, or after `&` if the href already contains that delimiter.
	#[must_use]
	pub fn build_url(&self, id: &PostId, settings: &Settings) -> String {
		let param = format!(
			"{}={}{}{}",
			PARAM_NAME,
			utf8_percent_encode(id.as_str(), COMPONENT),
			SEPARATOR,
			utf8_percent_encode(settings.post_order().as_str(), COMPONENT),
		);
		let delimiter = settings.permalink_delimiter().as_char();

		if param_regex().is_match(&self.href) {
			param_regex().replace(&self.href, NoExpand(&param)).into_owned()
		} else if !self.href.contains(delimiter) {
			format!("{}{}{}", self.href, delimiter, param)
		} else {
			format!("{}&{}", self.href, param)
		}
	}
}
