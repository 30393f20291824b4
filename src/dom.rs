//! [`TimelineView`] and [`EmbedProvider`] on top of the browser DOM.

use crate::{
	post::PostId,
	redact::Redacted,
	timeline::{EmbedProvider, Position, TimelineView},
	Error,
};
use js_sys::{Function, Reflect};
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{css, Document, Element, Window};

/// Attribute marking the root element of each post.
pub const POST_ID_ATTRIBUTE: &str = "data-js-post-id";

/// Class of the timeline container.
pub const TIMELINE_CLASS: &str = "lb-posts";

/// Attached to the timeline container element, this `struct` applies post mutations to its children.
#[derive(Debug, Clone)]
pub struct DomTimeline {
	container: Element,
}
impl DomTimeline {
	#[must_use]
	pub fn new(container: Element) -> Self {
		Self { container }
	}

	/// Uses the first element with class [`TIMELINE_CLASS`].
	///
	/// # Errors
	///
	/// Iff there is no such element.
	pub fn find(document: &Document) -> Result<Self, Error> {
		document
			.get_elements_by_class_name(TIMELINE_CLASS)
			.item(0)
			.map(Self::new)
			.ok_or(Error::Missing("timeline container"))
	}

	#[must_use]
	pub fn container(&self) -> &Element {
		&self.container
	}

	fn selector(id: &PostId) -> String {
		format!("[{}=\"{}\"]", POST_ID_ATTRIBUTE, css::escape(id.as_str()))
	}

	/// Inserting above the viewport would push the visible posts down, so scroll along by the height difference.
	fn keep_viewport_anchored(&self, insert: impl FnOnce()) {
		let window = self.container.owner_document().and_then(|document| document.default_view());
		let above_viewport = self.container.get_bounding_client_rect().top() < 0.0;
		let height_before = self.container.scroll_height();
		insert();
		let delta = self.container.scroll_height() - height_before;
		if let (true, Some(window), true) = (above_viewport, window, delta > 0) {
			trace!("Scrolling by {}px to keep the viewport in place.", delta);
			window.scroll_by_with_x_and_y(0.0, f64::from(delta));
		}
	}
}
impl TimelineView for DomTimeline {
	type Node = Element;

	#[instrument(skip(self, html), fields(len = html.len()))]
	fn replace_all(&mut self, html: &str) {
		self.container.set_inner_html(html);
	}

	#[instrument(skip(self, html), fields(len = html.len()))]
	fn insert_html(&mut self, position: Position, html: &str) {
		let container = &self.container;
		let insert = || {
			let where_ = match position {
				Position::Top => "afterbegin",
				Position::Bottom => "beforeend",
			};
			if let Err(error) = container.insert_adjacent_html(where_, html) {
				error!("Failed to insert posts: {:?}", error);
			}
		};
		match position {
			Position::Top => self.keep_viewport_anchored(insert),
			Position::Bottom => insert(),
		}
	}

	fn find_post(&self, id: &PostId) -> Option<Element> {
		match self.container.query_selector(&Self::selector(id)) {
			Ok(found) => found,
			Err(error) => {
				error!("Failed to look up post {}: {:?}", id, error);
				None
			}
		}
	}

	fn replace_post(&mut self, node: &Element, html: &str) {
		trace!(html = %Redacted(html), "Replacing post.");
		node.set_outer_html(html);
	}

	fn remove_post(&mut self, node: Element) {
		node.remove();
	}

	fn post_count(&self) -> usize {
		match self.container.query_selector_all(&format!("[{}]", POST_ID_ATTRIBUTE)) {
			Ok(posts) => posts.length() as usize,
			Err(error) => {
				error!("Failed to count posts: {:?}", error);
				0
			}
		}
	}
}

/// Runs the Instagram and Twitter embed scripts, where loaded.
#[derive(Debug, Clone)]
pub struct WindowEmbeds {
	window: Window,
}
impl WindowEmbeds {
	#[must_use]
	pub fn new(window: Window) -> Self {
		Self { window }
	}

	/// Calls `window.<global>.<object>.<method>()` if every step of the path exists.
	fn call_path(&self, global: &str, object: &str, method: &str) {
		let this = match get(&self.window, global).and_then(|global| get(&global, object)) {
			Some(this) => this,
			None => return,
		};
		match get(&this, method).map(|value| value.dyn_into::<Function>()) {
			Some(Ok(method_fn)) => {
				if let Err(error) = method_fn.call0(&this) {
					warn!("{}.{}.{}() threw: {:?}", global, object, method, error);
				} else {
					trace!("Called {}.{}.{}().", global, object, method);
				}
			}
			Some(Err(not_a_function)) => warn!("{}.{}.{} is not a function but {:?}.", global, object, method, not_a_function),
			None => {}
		}
	}
}
impl EmbedProvider for WindowEmbeds {
	fn process(&self) {
		self.call_path("instgrm", "Embeds", "process");
		self.call_path("twttr", "widgets", "load");
	}
}

fn get(target: &JsValue, key: &str) -> Option<JsValue> {
	match Reflect::get(target, &JsValue::from_str(key)) {
		Ok(value) if !value.is_undefined() && !value.is_null() => Some(value),
		Ok(_) | Err(_) => None,
	}
}
