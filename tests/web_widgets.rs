use liveblog_dom::{
	post::PostId,
	settings::SortOrder,
	widgets::{self, FormError, Slideshow},
};
use std::sync::Once;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Document, Element, KeyboardEvent, KeyboardEventInit};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INIT: Once = Once::new();

/// Puts `html` into a fresh element appended to the body.
fn fixture(html: &str) -> (Document, Element) {
	LOG_INIT.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let root = document.create_element("div").unwrap();
	root.set_inner_html(html);
	document.body().unwrap().append_child(&root).unwrap();
	(document, root)
}

fn has_class(root: &Element, selector: &str, class: &str) -> bool {
	root.query_selector(selector).unwrap().unwrap().class_list().contains(class)
}

#[wasm_bindgen_test]
fn sort_buttons() {
	let (document, root) = fixture(
		r#"<button class="sorting-bar__order sorting-bar__order--active" id="a" data-js-orderby_newest_first></button>
		<button class="sorting-bar__order" id="b" data-js-orderby_oldest_first></button>"#,
	);

	widgets::toggle_sort_buttons(&document, &SortOrder::new("oldest_first"));
	assert!(!has_class(&root, "#a", "sorting-bar__order--active"));
	assert!(has_class(&root, "#b", "sorting-bar__order--active"));

	root.remove();
}

#[wasm_bindgen_test]
fn load_more_and_new_posts() {
	let (document, root) = fixture(
		r#"<button class="load-more-posts"></button>
		<article class="lb-post lb-post-new" id="p1"></article>
		<article class="lb-post lb-post-new" id="p2"></article>"#,
	);

	widgets::hide_load_more(&document, true);
	assert!(has_class(&root, ".load-more-posts", "mod--hide"));
	widgets::hide_load_more(&document, false);
	assert!(!has_class(&root, ".load-more-posts", "mod--hide"));

	widgets::display_new_posts(&document);
	assert!(root.query_selector(".lb-post-new").unwrap().is_none());

	root.remove();
}

#[wasm_bindgen_test]
fn timestamps() {
	let (document, root) = fixture(r#"<span class="lb-post-date" data-js-timestamp="1000"></span>"#);

	widgets::update_timestamps(&document, 1000.0 + 180_000.0);
	assert_eq!(root.text_content().unwrap(), "3 minutes ago");

	root.remove();
}

#[wasm_bindgen_test]
fn comment_form() {
	let (document, root) = fixture(
		r#"<form class="comment hide"><input id="comment-name"><textarea id="comment-content"></textarea></form>
		<div class="comment-sent hide"></div>"#,
	);

	assert!(widgets::toggle_comment_dialog(&document));
	assert!(!widgets::toggle_comment_dialog(&document));

	let errors = FormError::list_from_js(
		js_sys::JSON::parse(r##"[{"id": "#comment-name", "msg": "<b>Name</b> missing"}, {"id": "#nope", "msg": "lost"}]"##).unwrap(),
	)
	.unwrap();
	widgets::display_comment_form_errors(&document, &errors);
	let message = root.query_selector("#comment-name + p.err-msg").unwrap().unwrap();
	assert_eq!(message.text_content().unwrap(), "<b>Name</b> missing");
	assert_eq!(root.query_selector_all("p.err-msg").unwrap().length(), 1);

	widgets::clear_comment_form_errors(&document);
	assert!(root.query_selector("p.err-msg").unwrap().is_none());

	widgets::show_success_comment_msg(&window().unwrap(), &document);
	assert!(!has_class(&root, "div.comment-sent", "hide"));

	root.remove();
}

#[wasm_bindgen_test]
fn slideshow() {
	let (document, root) = fixture(
		r#"<div class="lb-timeline"></div>
		<article class="slideshow" data-js-post-id="post-1">
			<div class="lb-item"><img srcset="b1.jpg 1200w, t1.jpg 200w, v1.jpg 800w"></div>
			<div class="lb-item"><img srcset="b2.jpg 1200w, t2.jpg 200w, v2.jpg 800w"><button id="open"></button></div>
		</article>"#,
	);
	let window = window().unwrap();
	let target = root.query_selector("#open").unwrap().unwrap();
	assert_eq!(widgets::post_id_of(&target), Some(PostId::from("post-1")));

	let slideshow = Slideshow::start(&window, &document, &target).unwrap();
	assert_eq!(document.query_selector_all("#slideshow img").unwrap().length(), 2);
	assert_eq!(document.query_selector("#slideshow img").unwrap().unwrap().get_attribute("src").unwrap(), "v1.jpg");

	let press = |key: &str| {
		let init = KeyboardEventInit::new();
		init.set_key(key);
		let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
		window.dispatch_event(&event).unwrap();
	};

	press("ArrowRight");
	assert_eq!(slideshow.index(), 1);
	assert!(slideshow.is_listening());
	press("Escape");
	assert!(slideshow.is_closed());
	assert!(!slideshow.is_listening());
	assert!(document.query_selector("#slideshow").unwrap().is_none());

	// Reopening while the closed one is still alive: only the new one reacts.
	let reopened = Slideshow::start(&window, &document, &target).unwrap();
	press("ArrowRight");
	press("ArrowRight");
	assert_eq!(reopened.index(), 0);
	assert_eq!(slideshow.index(), 1);
	press("Escape");
	assert!(!reopened.is_listening());
	assert!(document.query_selector("#slideshow").unwrap().is_none());

	drop(slideshow);
	drop(reopened);
	assert!(Slideshow::start(&window, &document, &root).is_err());

	root.remove();
}
