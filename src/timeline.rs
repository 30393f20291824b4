//! Incremental reconciliation of the on-screen post list.

use crate::{
	post::{ApiResponse, Batch, Item, PostId},
	template::{PostTemplate, RenderContext},
};
use tracing::{instrument, trace, warn};

/// Where a block of new posts goes within the timeline container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
	/// Before the first existing post.
	Top,
	/// After the last existing post.
	Bottom,
}

/// The timeline container as seen by the [`Reconciler`].
///
/// Post nodes are identified by their `data-js-post-id` marker.
pub trait TimelineView {
	type Node;

	/// Discards all post nodes and replaces them with `html`.
	fn replace_all(&mut self, html: &str);
	fn insert_html(&mut self, position: Position, html: &str);
	fn find_post(&self, id: &PostId) -> Option<Self::Node>;
	/// Replaces `node` with the markup in `html`, at the same position.
	fn replace_post(&mut self, node: &Self::Node, html: &str);
	fn remove_post(&mut self, node: Self::Node);
	fn post_count(&self) -> usize;
}

/// Post-processing of third party embeds.
///
/// Must be idempotent and safe to call when no embeds are present.
pub trait EmbedProvider {
	fn process(&self);
}
impl EmbedProvider for () {
	fn process(&self) {}
}

/// What [`Reconciler::apply`] did. Callers may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "only informative, but usually worth a log line"]
pub enum Outcome {
	Inserted(usize),
	Updated,
	Deleted,
	/// The targeted post isn't on screen.
	Missing,
	Empty,
}

#[derive(Debug)]
pub struct Reconciler<V, T, E> {
	view: V,
	template: T,
	embeds: E,
	auto_apply_updates: bool,
}
impl<V: TimelineView, T: PostTemplate, E: EmbedProvider> Reconciler<V, T, E> {
	pub fn new(view: V, template: T, embeds: E) -> Self {
		Self {
			view,
			template,
			embeds,
			auto_apply_updates: true,
		}
	}

	/// When disabled, created posts are rendered as new (hidden) until they are revealed.
	pub fn set_auto_apply_updates(&mut self, auto_apply_updates: bool) {
		self.auto_apply_updates = auto_apply_updates;
	}

	pub fn view(&self) -> &V {
		&self.view
	}

	/// Replaces the whole timeline with `items`, in the given order.
	#[instrument(skip(self, items), fields(count = items.len()))]
	pub fn render_timeline(&mut self, items: &[Item]) {
		let html: String = items.iter().map(|item| self.template.render(item, RenderContext::default())).collect();
		self.view.replace_all(&html);
		self.embeds.process();
	}

	/// Applies every batch of `response` in order.
	pub fn apply_response(&mut self, response: ApiResponse) -> Vec<Outcome> {
		Batch::split(response).iter().map(|batch| self.apply(batch)).collect()
	}

	#[instrument(skip(self, batch))]
	pub fn apply(&mut self, batch: &Batch) -> Outcome {
		match batch {
			Batch::Create { items, .. } if items.is_empty() => Outcome::Empty,
			Batch::Create { items, meta } => {
				let context = RenderContext { is_new: !self.auto_apply_updates };
				let mut rendered: Vec<String> = items.iter().map(|item| self.template.render(item, context)).collect();
				let position = if meta.from_date.is_some() { Position::Top } else { Position::Bottom };
				if position == Position::Top {
					rendered.reverse();
				}
				self.view.insert_html(position, &rendered.concat());
				trace!("Inserted {} post(s) at {:?}.", rendered.len(), position);
				self.embeds.process();
				Outcome::Inserted(rendered.len())
			}
			Batch::Update(item) => match self.view.find_post(&item.id) {
				Some(node) => {
					let html = self.template.render(item, RenderContext::default());
					self.view.replace_post(&node, &html);
					trace!("Updated post {}.", item.id);
					Outcome::Updated
				}
				None => {
					warn!("Post {} to update isn't on screen. Ignoring.", item.id);
					Outcome::Missing
				}
			},
			Batch::Delete(id) => match self.view.find_post(id) {
				Some(node) => {
					self.view.remove_post(node);
					trace!("Deleted post {}.", id);
					Outcome::Deleted
				}
				None => {
					warn!("Post {} to delete isn't on screen. Ignoring.", id);
					Outcome::Missing
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::post::{Operation, RequestMeta, Timestamp};
	use std::cell::Cell;

	/// Keeps `(id, html)` pairs. Inserted markup is split on the `|` separator the test template emits.
	#[derive(Default)]
	struct MemoryView(Vec<(String, String)>);
	impl MemoryView {
		fn parse(html: &str) -> Vec<(String, String)> {
			html.split_terminator('|')
				.map(|post| {
					let (id, body) = post.split_once(':').unwrap();
					(id.to_owned(), body.to_owned())
				})
				.collect()
		}

		fn ids(&self) -> Vec<&str> {
			self.0.iter().map(|(id, _)| id.as_str()).collect()
		}
	}
	impl TimelineView for MemoryView {
		type Node = usize;

		fn replace_all(&mut self, html: &str) {
			self.0 = Self::parse(html);
		}

		fn insert_html(&mut self, position: Position, html: &str) {
			let posts = Self::parse(html);
			match position {
				Position::Top => {
					self.0.splice(0..0, posts);
				}
				Position::Bottom => self.0.extend(posts),
			}
		}

		fn find_post(&self, id: &PostId) -> Option<usize> {
			self.0.iter().position(|(existing, _)| existing == id.as_str())
		}

		fn replace_post(&mut self, node: &usize, html: &str) {
			let mut posts = Self::parse(html);
			self.0[*node] = posts.remove(0);
		}

		fn remove_post(&mut self, node: usize) {
			self.0.remove(node);
		}

		fn post_count(&self) -> usize {
			self.0.len()
		}
	}

	#[derive(Default)]
	struct CountingEmbeds(Cell<usize>);
	impl EmbedProvider for &CountingEmbeds {
		fn process(&self) {
			self.0.set(self.0.get() + 1);
		}
	}

	fn template(item: &Item, context: RenderContext) -> String {
		format!("{}:{}{}|", item.id, if context.is_new { "new " } else { "" }, item.html)
	}

	fn item(id: &str, html: &str) -> Item {
		Item {
			id: PostId::from(id),
			operation: Operation::Create,
			created: None,
			html: html.to_owned(),
		}
	}

	fn create(ids: &[&str], from_date: bool) -> Batch {
		Batch::Create {
			items: ids.iter().map(|id| item(id, "body")).collect(),
			meta: RequestMeta {
				from_date: from_date.then(|| Timestamp::Millis(0.0)),
			},
		}
	}

	fn reconciler<'a>(embeds: &'a CountingEmbeds, ids: &[&str]) -> Reconciler<MemoryView, fn(&Item, RenderContext) -> String, &'a CountingEmbeds> {
		let mut reconciler = Reconciler::new(MemoryView::default(), template as fn(&Item, RenderContext) -> String, embeds);
		reconciler.render_timeline(&ids.iter().map(|id| item(id, "body")).collect::<Vec<_>>());
		reconciler
	}

	#[test]
	fn render_timeline_replaces_everything_in_order() {
		let embeds = CountingEmbeds::default();
		let mut reconciler = reconciler(&embeds, &["x", "y"]);
		reconciler.render_timeline(&[item("c", "1"), item("a", "2"), item("b", "3")]);
		assert_eq!(reconciler.view().ids(), ["c", "a", "b"]);
		assert_eq!(embeds.0.get(), 2);
	}

	#[test]
	fn create_at_top_reverses_input() {
		let embeds = CountingEmbeds::default();
		let mut reconciler = reconciler(&embeds, &["old"]);
		assert_eq!(reconciler.apply(&create(&["1", "2", "3"], true)), Outcome::Inserted(3));
		assert_eq!(reconciler.view().ids(), ["3", "2", "1", "old"]);
		assert_eq!(embeds.0.get(), 2);
	}

	#[test]
	fn create_at_bottom_keeps_input_order() {
		let embeds = CountingEmbeds::default();
		let mut reconciler = reconciler(&embeds, &["old"]);
		assert_eq!(reconciler.apply(&create(&["1", "2", "3"], false)), Outcome::Inserted(3));
		assert_eq!(reconciler.view().ids(), ["old", "1", "2", "3"]);
		assert_eq!(reconciler.view().post_count(), 4);
	}

	#[test]
	fn empty_create_is_a_no_op() {
		let embeds = CountingEmbeds::default();
		let mut reconciler = reconciler(&embeds, &["a"]);
		assert_eq!(reconciler.apply(&create(&[], true)), Outcome::Empty);
		assert_eq!(reconciler.view().ids(), ["a"]);
		assert_eq!(embeds.0.get(), 1);
	}

	#[test]
	fn update_replaces_content_in_place() {
		let embeds = CountingEmbeds::default();
		let mut reconciler = reconciler(&embeds, &["a", "b", "c"]);
		assert_eq!(reconciler.apply(&Batch::Update(item("b", "changed"))), Outcome::Updated);
		assert_eq!(reconciler.view().ids(), ["a", "b", "c"]);
		assert_eq!(reconciler.view().0[1].1, "changed");
		assert_eq!(reconciler.view().0[0].1, "body");
	}

	#[test]
	fn missing_targets_leave_the_timeline_unchanged() {
		let embeds = CountingEmbeds::default();
		let mut reconciler = reconciler(&embeds, &["a", "b"]);
		assert_eq!(reconciler.apply(&Batch::Update(item("zz", "changed"))), Outcome::Missing);
		assert_eq!(reconciler.apply(&Batch::Delete(PostId::from("zz"))), Outcome::Missing);
		assert_eq!(reconciler.view().0, [("a".to_owned(), "body".to_owned()), ("b".to_owned(), "body".to_owned())]);
	}

	#[test]
	fn delete_removes_only_the_target() {
		let embeds = CountingEmbeds::default();
		let mut reconciler = reconciler(&embeds, &["a", "b", "c"]);
		assert_eq!(reconciler.apply(&Batch::Delete(PostId::from("b"))), Outcome::Deleted);
		assert_eq!(reconciler.view().ids(), ["a", "c"]);
	}

	#[test]
	fn queued_posts_render_as_new() {
		let embeds = CountingEmbeds::default();
		let mut reconciler = reconciler(&embeds, &[]);
		reconciler.set_auto_apply_updates(false);
		let _ = reconciler.apply(&create(&["n"], false));
		assert_eq!(reconciler.view().0[0].1, "new body");
	}

	#[test]
	fn apply_response_runs_batches_in_order() {
		let embeds = CountingEmbeds::default();
		let mut reconciler = reconciler(&embeds, &["a", "b"]);
		let mut deleted = item("a", "");
		deleted.operation = Operation::Delete;
		let response = ApiResponse {
			items: vec![item("c", "body"), deleted],
			request_meta: RequestMeta::default(),
		};
		assert_eq!(reconciler.apply_response(response), [Outcome::Inserted(1), Outcome::Deleted]);
		assert_eq!(reconciler.view().ids(), ["b", "c"]);
	}
}
