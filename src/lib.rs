#![doc(html_root_url = "https://docs.rs/liveblog-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod dom;
mod error;
pub mod frame;
mod listener;
pub mod permalink;
pub mod post;
mod redact;
pub mod settings;
pub mod sync;
pub mod template;
pub mod timeline;
pub mod widgets;

pub use error::Error;
pub use listener::EventListener;
