use crate::Error;
use core::{cell::RefCell, fmt, mem};
use serde::Deserialize;
use tracing::{debug, trace};
use wasm_bindgen::JsValue;

/// Name of a sort order, e.g. `newest_first`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct SortOrder(String);
impl SortOrder {
	#[must_use]
	pub fn new(order: impl Into<String>) -> Self {
		Self(order.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Default for SortOrder {
	fn default() -> Self {
		Self::new("newest_first")
	}
}
impl fmt::Display for SortOrder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Separates the permalink parameter from the rest of the page URL when there is none yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Delimiter {
	#[serde(rename = "?")]
	Query,
	#[serde(rename = "#")]
	Fragment,
}
impl Delimiter {
	#[must_use]
	pub fn as_char(self) -> char {
		match self {
			Delimiter::Query => '?',
			Delimiter::Fragment => '#',
		}
	}
}
impl Default for Delimiter {
	fn default() -> Self {
		Self::Query
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Values {
	post_order: SortOrder,
	permalink_delimiter: Delimiter,
	auto_apply_updates: bool,
	href_timeout_ms: f64,
}
impl Default for Values {
	fn default() -> Self {
		Self {
			post_order: SortOrder::default(),
			permalink_delimiter: Delimiter::default(),
			auto_apply_updates: true,
			href_timeout_ms: 3000.0,
		}
	}
}

type SortListener = Box<dyn FnMut(&SortOrder)>;

/// Widget configuration, owned by the embedding code and passed to whatever needs it.
///
/// Sort order changes are recorded by [`Settings::set_post_order`] and delivered to subscribers
/// later, by [`Settings::notify_sort_change`] or [`Settings::notify_shared`], so that subscribers
/// are free to read the settings again.
#[derive(Default)]
pub struct Settings {
	values: Values,
	sort_listeners: Vec<SortListener>,
	sort_change_pending: bool,
}
impl fmt::Debug for Settings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Settings")
			.field("values", &self.values)
			.field("sort_listeners", &self.sort_listeners.len())
			.field("sort_change_pending", &self.sort_change_pending)
			.finish()
	}
}
impl Settings {
	/// Reads the host's settings object. Missing keys take their defaults.
	///
	/// # Errors
	///
	/// Iff a present key has the wrong type or `permalinkDelimiter` is neither `"?"` nor `"#"`.
	pub fn from_js(value: JsValue) -> Result<Self, Error> {
		if value.is_undefined() || value.is_null() {
			return Ok(Self::default());
		}
		let values = serde_wasm_bindgen::from_value(value).map_err(|error| Error::decode("settings", error))?;
		debug!(?values, "Loaded settings.");
		Ok(Self {
			values,
			..Self::default()
		})
	}

	#[must_use]
	pub fn post_order(&self) -> &SortOrder {
		&self.values.post_order
	}

	/// Returns whether the order changed.
	///
	/// Subscribers aren't called here. A change stays pending until the next notification.
	pub fn set_post_order(&mut self, order: SortOrder) -> bool {
		if self.values.post_order == order {
			return false;
		}
		trace!(from = %self.values.post_order, to = %order, "Sort order changed.");
		self.values.post_order = order;
		self.sort_change_pending = true;
		true
	}

	/// Registers `listener` to be called with the new order whenever it changes.
	pub fn on_sort_change(&mut self, listener: impl FnMut(&SortOrder) + 'static) {
		self.sort_listeners.push(Box::new(listener));
	}

	/// Calls subscribers once with the current order, if it changed since the last notification.
	pub fn notify_sort_change(&mut self) {
		if !mem::take(&mut self.sort_change_pending) {
			return;
		}
		let order = self.values.post_order.clone();
		for listener in &mut self.sort_listeners {
			listener(&order);
		}
	}

	/// Like [`Settings::notify_sort_change`], but no borrow of `settings` is held while subscribers run.
	///
	/// Subscribers may borrow `settings` again, even mutably. Ones they register are kept but not called this round.
	pub fn notify_shared(settings: &RefCell<Self>) {
		let (order, mut listeners) = {
			let mut settings = settings.borrow_mut();
			if !mem::take(&mut settings.sort_change_pending) {
				return;
			}
			(settings.values.post_order.clone(), mem::take(&mut settings.sort_listeners))
		};
		for listener in &mut listeners {
			listener(&order);
		}
		let mut settings = settings.borrow_mut();
		let added = mem::replace(&mut settings.sort_listeners, listeners);
		settings.sort_listeners.extend(added);
	}

	#[must_use]
	pub fn permalink_delimiter(&self) -> Delimiter {
		self.values.permalink_delimiter
	}

	pub fn set_permalink_delimiter(&mut self, delimiter: Delimiter) {
		self.values.permalink_delimiter = delimiter;
	}

	#[must_use]
	pub fn auto_apply_updates(&self) -> bool {
		self.values.auto_apply_updates
	}

	/// How long (in milliseconds) to wait for the parent frame to answer an href request.
	#[must_use]
	pub fn href_timeout_ms(&self) -> f64 {
		self.values.href_timeout_ms
	}
}
