use thiserror::Error;

/// Failures while reading data handed over by the host page.
///
/// DOM mutations never produce this type. They log and carry on instead.
#[derive(Debug, Error)]
pub enum Error {
	#[error("could not decode {what}: {message}")]
	Decode { what: &'static str, message: String },

	#[error("{0} is not available")]
	Missing(&'static str),
}

impl Error {
	pub(crate) fn decode(what: &'static str, error: impl ToString) -> Self {
		Self::Decode { what, message: error.to_string() }
	}
}
