//! Href requests across the iframe boundary.
//!
//! An embedded widget can't read its host's address bar, so it asks the parent frame with
//! `permalink_init` and receives the href in a `permalink_url` message. Requests carry a
//! [`Token`] that a cooperating parent echoes back; only one request is in flight at a time.

use crate::{listener::EventListener, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{MessageEvent, Window};

/// Correlates a `permalink_url` reply with its `permalink_init` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
	PermalinkInit {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		token: Option<Token>,
	},
	PermalinkUrl {
		data: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		token: Option<Token>,
	},
}
impl Message {
	/// # Errors
	///
	/// Iff `value` isn't one of the two permalink messages. Pages receive plenty of unrelated ones.
	pub fn from_js(value: JsValue) -> Result<Self, Error> {
		serde_wasm_bindgen::from_value(value).map_err(|error| Error::decode("frame message", error))
	}

	/// # Errors
	///
	/// Only if serialisation into a JavaScript object fails.
	pub fn to_js(&self) -> Result<JsValue, Error> {
		serde_wasm_bindgen::to_value(self).map_err(|error| Error::decode("frame message", error))
	}
}

/// Where href requests are sent.
pub trait FrameChannel {
	fn request_href(&self, token: Token);
}

/// Posts requests to the parent window.
#[derive(Debug, Clone)]
pub struct WindowChannel {
	parent: Window,
}
impl WindowChannel {
	#[must_use]
	pub fn new(parent: Window) -> Self {
		Self { parent }
	}

	/// # Errors
	///
	/// Iff `window` has no parent browsing context.
	pub fn for_parent_of(window: &Window) -> Result<Self, Error> {
		match window.parent() {
			Ok(Some(parent)) => Ok(Self::new(parent)),
			Ok(None) | Err(_) => Err(Error::Missing("parent window")),
		}
	}
}
impl FrameChannel for WindowChannel {
	fn request_href(&self, token: Token) {
		let message = match (Message::PermalinkInit { token: Some(token) }).to_js() {
			Ok(message) => message,
			Err(error) => return error!("{}", error),
		};
		match self.parent.post_message(&message, "*") {
			Ok(()) => trace!(?token, "Requested href from parent frame."),
			Err(error) => error!("Failed to post `permalink_init`: {:?}", error),
		}
	}
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
	token: Token,
	deadline: f64,
	/// A token-less reply already delivered an href for this request.
	answered: bool,
}

/// Single-flight guard for href requests.
///
/// Times are milliseconds on any monotonic-enough clock, usually `Date.now()`.
#[derive(Debug, Clone)]
pub struct HrefRequest {
	next_token: u32,
	in_flight: Option<InFlight>,
	timeout_ms: f64,
}
impl HrefRequest {
	#[must_use]
	pub fn new(timeout_ms: f64) -> Self {
		Self {
			next_token: 1,
			in_flight: None,
			timeout_ms,
		}
	}

	/// Whether a request is out, unanswered and hasn't timed out at `now`.
	#[must_use]
	pub fn is_pending(&self, now: f64) -> bool {
		self.in_flight.map_or(false, |in_flight| !in_flight.answered && now < in_flight.deadline)
	}

	/// Starts a new request unless one is still pending.
	pub fn issue(&mut self, now: f64) -> Option<Token> {
		if self.is_pending(now) {
			trace!("Href request already in flight.");
			return None;
		}
		if let Some(expired) = self.in_flight.filter(|in_flight| !in_flight.answered) {
			warn!(token = ?expired.token, "Href request timed out. Retrying.");
		}
		let token = Token(self.next_token);
		self.next_token = self.next_token.wrapping_add(1).max(1);
		self.in_flight = Some(InFlight {
			token,
			deadline: now + self.timeout_ms,
			answered: false,
		});
		Some(token)
	}

	/// Decides whether an incoming href should be used.
	///
	/// A reply carrying the in-flight token is accepted even after the deadline and settles the request.
	/// A token-less reply, from a parent that doesn't echo tokens, is accepted only while a request is
	/// pending at `now`. It answers the request but keeps its token acceptable, so the tokened reply that
	/// may still follow isn't mistaken for a stale one. Anything else is dropped.
	pub fn accept(&mut self, token: Option<Token>, now: f64) -> bool {
		match token {
			None if self.is_pending(now) => {
				if let Some(in_flight) = &mut self.in_flight {
					in_flight.answered = true;
				}
				true
			}
			None => {
				debug!("Dropping unsolicited href message.");
				false
			}
			Some(token) if self.in_flight.map_or(false, |in_flight| in_flight.token == token) => {
				self.in_flight = None;
				true
			}
			Some(token) => {
				debug!(?token, "Dropping stale href reply.");
				false
			}
		}
	}
}

/// Delivers decoded frame messages received by `window` to `handler` while alive.
#[derive(Debug)]
pub struct MessageListener(EventListener);
impl MessageListener {
	pub fn new(window: &Window, mut handler: impl FnMut(Message) + 'static) -> Self {
		Self(EventListener::new(window.as_ref(), "message", move |event| {
			let event = match event.dyn_into::<MessageEvent>() {
				Ok(event) => event,
				Err(event) => return error!("Expected MessageEvent but received {:?}.", event),
			};
			match Message::from_js(event.data()) {
				Ok(message) => handler(message),
				Err(error) => trace!("Ignoring message: {}", error),
			}
		}))
	}
}
