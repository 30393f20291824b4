use crate::post::Item;
use core::fmt::Write as _;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderContext {
	/// The post arrived while updates aren't applied automatically and stays hidden until revealed.
	pub is_new: bool,
}

/// Turns an [`Item`] into the markup of one post node.
///
/// The root element of the output must carry `data-js-post-id` with the item's ID,
/// otherwise later updates and deletions can't find it.
pub trait PostTemplate {
	fn render(&self, item: &Item, context: RenderContext) -> String;
}
impl<F: Fn(&Item, RenderContext) -> String> PostTemplate for F {
	fn render(&self, item: &Item, context: RenderContext) -> String {
		self(item, context)
	}
}

/// Wraps [`Item::html`] in an `<article>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleTemplate;
impl PostTemplate for ArticleTemplate {
	fn render(&self, item: &Item, context: RenderContext) -> String {
		let mut html = String::with_capacity(item.html.len() + 96);
		html.push_str("<article class=\"lb-post");
		if context.is_new {
			html.push_str(" lb-post-new");
		}
		html.push_str("\" data-js-post-id=\"");
		escape_into(&mut html, item.id.as_str());
		html.push('"');
		if let Some(created) = &item.created {
			html.push_str(" data-js-timestamp=\"");
			escape_into(&mut html, &created.to_string());
			html.push('"');
		}
		html.push('>');
		html.push_str(&item.html);
		html.push_str("</article>");
		html
	}
}

/// Escapes `text` for use in element content or a double-quoted attribute value.
#[must_use]
pub fn escape(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	escape_into(&mut escaped, text);
	escaped
}

fn escape_into(target: &mut String, text: &str) {
	for c in text.chars() {
		match c {
			'&' => target.push_str("&amp;"),
			'<' => target.push_str("&lt;"),
			'>' => target.push_str("&gt;"),
			'"' => target.push_str("&quot;"),
			'\'' => target.push_str("&#39;"),
			c if c.is_control() && !c.is_whitespace() => {
				write!(target, "&#{};", c as u32).ok();
			}
			c => target.push(c),
		}
	}
}
