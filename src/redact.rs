//! User content (post markup, page URLs, comment form input) only reaches logs with the
//! `dangerous-logging` feature enabled.

use core::fmt;

/// Displays the wrapped text with `dangerous-logging`, and only its length without.
#[derive(Clone, Copy)]
pub(crate) struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			f.write_str(self.0)
		} else {
			write!(f, "<{} bytes>", self.0.len())
		}
	}
}

impl fmt::Debug for Redacted<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			fmt::Debug::fmt(self.0, f)
		} else {
			fmt::Display::fmt(self, f)
		}
	}
}
