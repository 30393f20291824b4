use crate::{
	frame::{FrameChannel, HrefRequest, Message, MessageListener, WindowChannel},
	permalink::{Parsed, Permalink},
	post::PostId,
	redact::Redacted,
	settings::Settings,
	Error,
};
use std::{cell::RefCell, rc::Rc};
use tracing::{debug, instrument, trace};
use web_sys::Window;

/// How the widget is embedded into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowsingContext {
	/// Not inside a frame, so the page's own href is available.
	TopLevel(String),
	/// Inside an iframe. The href has to be requested from the parent.
	Framed,
}
impl BrowsingContext {
	/// # Errors
	///
	/// Iff the top-level document's location can't be read.
	pub fn detect(window: &Window) -> Result<Self, Error> {
		let is_top_level = match window.parent() {
			Ok(Some(parent)) => js_sys::Object::is(window, &parent),
			Ok(None) | Err(_) => true,
		};
		if is_top_level {
			let href = window.location().href().map_err(|_| Error::Missing("document location"))?;
			Ok(Self::TopLevel(href))
		} else {
			Ok(Self::Framed)
		}
	}
}

/// Keeps the [`Permalink`] in sync with the hosting page's href.
#[derive(Debug)]
pub struct PermalinkSync<C> {
	permalink: Permalink,
	channel: C,
	request: HrefRequest,
}
impl<C: FrameChannel> PermalinkSync<C> {
	pub fn new(channel: C, settings: &Settings) -> Self {
		Self {
			permalink: Permalink::default(),
			channel,
			request: HrefRequest::new(settings.href_timeout_ms()),
		}
	}

	#[instrument(skip(self, settings))]
	pub fn initialize(&mut self, context: BrowsingContext, settings: &mut Settings, now: f64) -> Parsed {
		match context {
			BrowsingContext::TopLevel(href) => {
				self.permalink.set_href(href);
				self.parse(settings, now)
			}
			BrowsingContext::Framed => {
				self.request_href(now);
				Parsed::NotReady
			}
		}
	}

	/// Parses the current href, asking the parent for it again if it hasn't arrived yet.
	pub fn parse(&mut self, settings: &mut Settings, now: f64) -> Parsed {
		let parsed = self.permalink.parse(settings);
		if parsed == Parsed::NotReady {
			self.request_href(now);
		}
		parsed
	}

	/// Handles a frame message. Returns `None` if it was ignored.
	///
	/// A sort order taken from the href is only recorded in `settings`. Subscribers hear about it
	/// on the next [`Settings::notify_sort_change`], see also [`receive_shared`].
	#[instrument(skip(self, message, settings))]
	pub fn receive(&mut self, message: Message, settings: &mut Settings, now: f64) -> Option<Parsed> {
		match message {
			Message::PermalinkUrl { data, token } => {
				if !self.request.accept(token, now) {
					return None;
				}
				debug!(href = %Redacted(&data), "Received href.");
				self.permalink.set_href(data);
				Some(self.parse(settings, now))
			}
			Message::PermalinkInit { .. } => {
				trace!("Ignoring `permalink_init`, which is meant for the parent frame.");
				None
			}
		}
	}

	#[must_use]
	pub fn build_url(&self, id: &PostId, settings: &Settings) -> String {
		self.permalink.build_url(id, settings)
	}

	#[must_use]
	pub fn post_id(&self) -> Option<&PostId> {
		self.permalink.post_id()
	}

	/// See [`Permalink::take_sort_change`].
	pub fn take_sort_change(&mut self) -> bool {
		self.permalink.take_sort_change()
	}

	#[must_use]
	pub fn permalink(&self) -> &Permalink {
		&self.permalink
	}

	fn request_href(&mut self, now: f64) {
		if let Some(token) = self.request.issue(now) {
			self.channel.request_href(token);
		}
	}
}

/// [`PermalinkSync::receive`] for shared state, notifying sort order subscribers once both borrows are released.
pub fn receive_shared<C: FrameChannel>(
	sync: &RefCell<PermalinkSync<C>>,
	settings: &RefCell<Settings>,
	message: Message,
	now: f64,
) -> Option<Parsed> {
	let parsed = sync.borrow_mut().receive(message, &mut settings.borrow_mut(), now);
	Settings::notify_shared(settings);
	parsed
}

/// A [`PermalinkSync`] wired up to the browser window.
#[derive(Debug)]
pub struct AttachedPermalink {
	pub sync: Rc<RefCell<PermalinkSync<WindowChannel>>>,
	_listener: Option<MessageListener>,
}

/// Detects the browsing context, initialises permalink state and, when framed, listens for the parent's replies.
///
/// # Errors
///
/// Iff the browsing context can't be determined.
pub fn attach(window: &Window, settings: Rc<RefCell<Settings>>) -> Result<AttachedPermalink, Error> {
	let context = BrowsingContext::detect(window)?;
	let channel = match context {
		BrowsingContext::Framed => WindowChannel::for_parent_of(window)?,
		BrowsingContext::TopLevel(_) => WindowChannel::new(window.clone()),
	};
	let sync = Rc::new(RefCell::new(PermalinkSync::new(channel, &settings.borrow())));

	let listener = (context == BrowsingContext::Framed).then(|| {
		let sync = Rc::clone(&sync);
		let settings = Rc::clone(&settings);
		MessageListener::new(window, move |message| {
			let _ = receive_shared(&sync, &settings, message, js_sys::Date::now());
		})
	});

	let _ = sync.borrow_mut().initialize(context, &mut settings.borrow_mut(), js_sys::Date::now());
	Settings::notify_shared(&settings);
	Ok(AttachedPermalink { sync, _listener: listener })
}
