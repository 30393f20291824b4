//! Small interactive pieces around the timeline: sorting bar, "load more", new post reveal,
//! timestamps, the comment form and the image slideshow.

use crate::{
	dom::POST_ID_ATTRIBUTE, listener::EventListener, post::PostId, redact::Redacted, settings::SortOrder,
	template::escape, Error,
};
use regex::Regex;
use serde::Deserialize;
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
	sync::OnceLock,
};
use tracing::{debug, error, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, KeyboardEvent, Window};

const NEW_POST_CLASS: &str = "lb-post-new";
const HIDE_CLASS: &str = "hide";

fn query(root: &Document, selector: &str) -> Option<Element> {
	match root.query_selector(selector) {
		Ok(found) => found,
		Err(error) => {
			error!("Invalid selector {:?}: {:?}", selector, error);
			None
		}
	}
}

fn query_all(root: &Document, selector: &str) -> Vec<Element> {
	let nodes = match root.query_selector_all(selector) {
		Ok(nodes) => nodes,
		Err(error) => {
			error!("Invalid selector {:?}: {:?}", selector, error);
			return Vec::new();
		}
	};
	(0..nodes.length()).filter_map(|i| nodes.get(i)).filter_map(|node| node.dyn_into::<Element>().ok()).collect()
}

fn toggle_class(element: &Element, class: &str, force: Option<bool>) -> bool {
	let class_list = element.class_list();
	let toggled = match force {
		Some(force) => class_list.toggle_with_force(class, force),
		None => class_list.toggle(class),
	};
	toggled.unwrap_or_else(|error| {
		error!("Failed to toggle class {:?}: {:?}", class, error);
		class_list.contains(class)
	})
}

/// Marks the sorting button for `order` active and all others inactive.
///
/// A button belongs to an order if it carries a `data-js-orderby_<order>` attribute.
#[instrument(skip(document))]
pub fn toggle_sort_buttons(document: &Document, order: &SortOrder) {
	let marker = format!("data-js-orderby_{}", order);
	for button in query_all(document, ".sorting-bar__order") {
		let active = button.has_attribute(&marker);
		toggle_class(&button, "sorting-bar__order--active", Some(active));
	}
}

pub fn hide_load_more(document: &Document, hide: bool) {
	match document.get_elements_by_class_name("load-more-posts").item(0) {
		Some(button) => {
			toggle_class(&button, "mod--hide", Some(hide));
		}
		None => trace!("No load more button."),
	}
}

/// Reveals posts that were queued while updates weren't applied automatically.
pub fn display_new_posts(document: &Document) {
	let new_posts = query_all(document, &format!(".{}", NEW_POST_CLASS));
	for post in &new_posts {
		toggle_class(post, NEW_POST_CLASS, Some(false));
	}
	debug!("Revealed {} new post(s).", new_posts.len());
}

/// Human readable age of something `seconds` old.
#[must_use]
pub fn format_age(seconds: f64) -> String {
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn plural(count: f64, unit: &str) -> String {
		let count = count.floor() as u64;
		format!("{} {}{} ago", count, unit, if count == 1 { "" } else { "s" })
	}

	match seconds {
		s if !(s >= 60.0) => "just now".to_owned(),
		s if s < 3600.0 => plural(s / 60.0, "minute"),
		s if s < 86_400.0 => plural(s / 3600.0, "hour"),
		s => plural(s / 86_400.0, "day"),
	}
}

/// Parses `data-js-timestamp` values, which are epoch milliseconds or date strings.
fn timestamp_millis(timestamp: &str) -> Option<f64> {
	let millis = timestamp.parse::<f64>().unwrap_or_else(|_| js_sys::Date::parse(timestamp));
	(!millis.is_nan()).then(|| millis)
}

/// Refreshes the relative dates of all posts.
pub fn update_timestamps(document: &Document, now_millis: f64) {
	for element in query_all(document, ".lb-post-date") {
		let Some(timestamp) = element.get_attribute("data-js-timestamp") else {
			continue;
		};
		match timestamp_millis(&timestamp) {
			Some(millis) => element.set_text_content(Some(&format_age((now_millis - millis) / 1000.0))),
			None => warn!("Unreadable post timestamp {:?}.", timestamp),
		}
	}
}

/// Shows or hides the comment form. Returns whether it is visible now.
pub fn toggle_comment_dialog(document: &Document) -> bool {
	match query(document, "form.comment") {
		Some(form) => !toggle_class(&form, HIDE_CLASS, None),
		None => true,
	}
}

/// A validation message for one comment form field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormError {
	/// Selector of the offending field.
	pub id: String,
	pub msg: String,
}
impl FormError {
	/// # Errors
	///
	/// Iff `value` isn't an array of `{ id, msg }` objects.
	pub fn list_from_js(value: JsValue) -> Result<Vec<Self>, Error> {
		serde_wasm_bindgen::from_value(value).map_err(|error| Error::decode("comment form errors", error))
	}
}

pub fn clear_comment_form_errors(document: &Document) {
	let messages = query_all(document, "p.err-msg");
	for message in &messages {
		message.remove();
	}
	trace!("Cleared {} comment form error(s).", messages.len());
}

/// Inserts each message right after its field. Messages for missing fields are dropped.
pub fn display_comment_form_errors(document: &Document, errors: &[FormError]) {
	for form_error in errors {
		let Some(field) = query(document, &form_error.id) else {
			warn!("Comment form field {:?} not found.", form_error.id);
			continue;
		};
		debug!(field = %form_error.id, msg = %Redacted(&form_error.msg), "Showing comment form error.");
		let html = format!("<p class=\"err-msg\">{}</p>", escape(&form_error.msg));
		if let Err(error) = field.insert_adjacent_html("afterend", &html) {
			error!("Failed to show comment form error: {:?}", error);
		}
	}
}

/// How long the "comment sent" confirmation stays up.
pub const COMMENT_SENT_MILLIS: i32 = 5000;

pub fn show_success_comment_msg(window: &Window, document: &Document) {
	let Some(message) = query(document, "div.comment-sent") else {
		return warn!("No comment confirmation element.");
	};
	toggle_class(&message, HIDE_CLASS, None);
	let hide_again = Closure::once_into_js(move || {
		toggle_class(&message, HIDE_CLASS, None);
	});
	if let Err(error) = window.set_timeout_with_callback_and_timeout_and_arguments_0(hide_again.unchecked_ref(), COMMENT_SENT_MILLIS) {
		error!("Failed to schedule hiding the comment confirmation: {:?}", error);
	}
}

/// Image URLs of one slideshow picture, in `srcset` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renditions {
	pub base_image: String,
	pub thumbnail: String,
	pub view_image: String,
}

/// Extracts the first three width-descriptor candidates of a `srcset`.
#[must_use]
pub fn parse_srcset(srcset: &str) -> Option<Renditions> {
	static RE: OnceLock<Regex> = OnceLock::new();
	let re = RE.get_or_init(|| Regex::new(r"(\S+)\s\d+w").expect("valid srcset pattern"));
	let mut urls = re.captures_iter(srcset).filter_map(|captures| captures.get(1)).map(|url| url.as_str().trim_end_matches(',').to_owned());
	Some(Renditions {
		base_image: urls.next()?,
		thumbnail: urls.next()?,
		view_image: urls.next()?,
	})
}

/// The ID of the slideshow post `target` is part of.
#[must_use]
pub fn post_id_of(target: &Element) -> Option<PostId> {
	let article = target.closest("article.slideshow").ok().flatten()?;
	article.get_attribute(POST_ID_ATTRIBUTE).map(PostId::new)
}

/// A full-screen slideshow of the images in one post.
///
/// Keyboard navigation is unregistered when the slideshow is closed or this value is dropped.
#[derive(Debug)]
pub struct Slideshow {
	index: Rc<Cell<u32>>,
	closed: Rc<Cell<bool>>,
	keydown: Rc<RefCell<Option<EventListener>>>,
}
impl Slideshow {
	/// Opens the slideshow for the post containing `target`.
	///
	/// # Errors
	///
	/// Iff `target` isn't inside a slideshow post or the page lacks a timeline.
	#[instrument(skip(window, document, target))]
	pub fn start(window: &Window, document: &Document, target: &Element) -> Result<Self, Error> {
		let article = target.closest("article.slideshow").ok().flatten().ok_or(Error::Missing("slideshow post"))?;
		let images = match article.query_selector_all(".lb-item img") {
			Ok(images) => images,
			Err(_) => return Err(Error::Missing("slideshow images")),
		};
		let renditions: Vec<Renditions> = (0..images.length())
			.filter_map(|i| images.get(i))
			.filter_map(|image| image.dyn_into::<Element>().ok())
			.filter_map(|image| image.get_attribute("srcset"))
			.filter_map(|srcset| parse_srcset(&srcset))
			.collect();
		debug!("Slideshow with {} image(s).", renditions.len());

		let timeline = query(document, "div.lb-timeline").ok_or(Error::Missing("timeline"))?;
		if let Err(error) = timeline.insert_adjacent_html("afterend", &Self::render(&renditions)) {
			error!("Failed to insert slideshow: {:?}", error);
			return Err(Error::Missing("slideshow"));
		}

		let index = Rc::new(Cell::new(0));
		let closed = Rc::new(Cell::new(false));
		let keydown = Rc::new(RefCell::new(None));
		let listener = EventListener::new(window.as_ref(), "keydown", {
			let document = document.clone();
			let index = Rc::clone(&index);
			let closed = Rc::clone(&closed);
			// Weak, or the listener would keep itself alive.
			let keydown = Rc::downgrade(&keydown);
			move |event| {
				if closed.get() {
					return;
				}
				let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
					return;
				};
				match event.key().as_str() {
					"ArrowRight" => Self::advance(&document, &index),
					"ArrowLeft" | "Escape" => {
						if let Some(slideshow) = query(&document, "#slideshow") {
							slideshow.remove();
						}
						closed.set(true);
						let listener = keydown.upgrade().and_then(|keydown| keydown.borrow_mut().take());
						drop(listener);
						trace!("Slideshow closed.");
					}
					_ => {}
				}
			}
		});
		*keydown.borrow_mut() = Some(listener);

		Ok(Self { index, closed, keydown })
	}

	#[must_use]
	pub fn index(&self) -> u32 {
		self.index.get()
	}

	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.closed.get()
	}

	/// Whether keyboard navigation is still registered.
	#[must_use]
	pub fn is_listening(&self) -> bool {
		self.keydown.borrow().is_some()
	}

	fn render(renditions: &[Renditions]) -> String {
		let mut html = String::from("<div id=\"slideshow\"><div class=\"container\">");
		for rendition in renditions {
			html.push_str(&format!(
				"<img src=\"{}\" data-base-image=\"{}\" data-thumbnail=\"{}\">",
				escape(&rendition.view_image),
				escape(&rendition.base_image),
				escape(&rendition.thumbnail),
			));
		}
		html.push_str("</div></div>");
		html
	}

	/// Shows the next picture, wrapping around at the end.
	fn advance(document: &Document, index: &Cell<u32>) {
		let Some(container) = query(document, "#slideshow .container").and_then(|container| container.dyn_into::<HtmlElement>().ok()) else {
			return warn!("Slideshow container is gone.");
		};
		let count = container.query_selector_all("img").map(|images| images.length()).unwrap_or(0);
		if count == 0 {
			return;
		}
		let next = (index.get() + 1) % count;
		index.set(next);
		#[allow(clippy::cast_possible_wrap)]
		let step = container.offset_height() / count as i32;
		if let Err(error) = container.style().set_property("margin-top", &format!("-{}px", step * next as i32)) {
			error!("Failed to move slideshow: {:?}", error);
		}
	}
}
