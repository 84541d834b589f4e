//! Response envelope shared by every API endpoint, plus pagination metadata.
//!
//! All responses wrap their payload as `{success, code, message, data, errors[]}`. The payload is
//! only meaningful when `success` is true; otherwise `message` and the field-level `errors` are
//! folded into a single [`ApiError`].

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Default number of records requested per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Standard success/error wrapper returned by the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
	/// Whether the call succeeded.
	pub success: bool,
	/// Numeric API status code.
	#[serde(default, deserialize_with = "null_as_default")]
	pub code: i64,
	/// Human-readable status message.
	#[serde(default, deserialize_with = "null_as_default")]
	pub message: String,
	/// Payload; ignored when `success` is false.
	pub data: Option<T>,
	/// Field-level validation errors.
	#[serde(default, deserialize_with = "null_as_default")]
	pub errors: Vec<FieldError>,
}
impl<T> Envelope<T> {
	/// Returns the aggregated failure for a `success: false` envelope.
	pub fn error(&self) -> Option<ApiError> {
		if self.success {
			return None;
		}

		Some(ApiError {
			code: self.code,
			message: if self.message.is_empty() { None } else { Some(self.message.clone()) },
			fields: self.errors.clone(),
		})
	}

	/// Consumes the envelope and yields the payload or the aggregated failure.
	///
	/// A successful envelope without `data` yields `None`.
	pub fn into_result(self) -> Result<Option<T>> {
		match self.error() {
			Some(err) => Err(err.into()),
			None => Ok(self.data),
		}
	}
}

/// Field-level error reported inside an envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
	/// Name of the offending field.
	#[serde(default)]
	pub field: String,
	/// Validation message for the field.
	#[serde(default)]
	pub message: String,
}
impl Display for FieldError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: {}", self.field, self.message)
	}
}

/// Aggregated failure built from a `success: false` envelope.
///
/// The rendered message lists the envelope message (when non-empty) followed by one line per
/// field error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
	/// Numeric API status code.
	pub code: i64,
	/// Top-level message, if the API supplied one.
	pub message: Option<String>,
	/// Field-level errors in the order reported.
	pub fields: Vec<FieldError>,
}
impl ApiError {
	/// Iterates over every individual message carried by the failure.
	pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
		self.message.iter().cloned().chain(self.fields.iter().map(ToString::to_string))
	}
}
impl Display for ApiError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut wrote = false;

		for line in self.messages() {
			if wrote {
				f.write_str("\n")?;
			}

			f.write_str(&line)?;

			wrote = true;
		}

		if !wrote {
			write!(f, "API reported a failure with code {}.", self.code)?;
		}

		Ok(())
	}
}
impl StdError for ApiError {}

/// Pagination metadata embedded in list payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
	/// Total number of records across all pages.
	#[serde(default)]
	pub total_records: u64,
	/// Total number of pages; zero when the API omits it.
	#[serde(default)]
	pub total_pages: u32,
	/// Echoed page number.
	#[serde(default)]
	pub page_no: u32,
	/// Echoed page size.
	#[serde(default)]
	pub page_limit: u32,
}

/// Page selection sent as `pageNo`/`pageLimit` query parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
	/// One-based page number.
	pub page_no: u32,
	/// Requested page size.
	pub page_limit: u32,
}
impl PageParams {
	/// Creates params for the provided page and size.
	pub const fn new(page_no: u32, page_limit: u32) -> Self {
		Self { page_no, page_limit }
	}

	/// Renders the params as query pairs, omitting zero values.
	pub fn to_query(&self) -> Vec<(&'static str, String)> {
		let mut query = Vec::with_capacity(2);

		if self.page_no > 0 {
			query.push(("pageNo", self.page_no.to_string()));
		}
		if self.page_limit > 0 {
			query.push(("pageLimit", self.page_limit.to_string()));
		}

		query
	}
}
impl Default for PageParams {
	fn default() -> Self {
		Self::new(1, DEFAULT_PAGE_LIMIT)
	}
}

/// Decodes an envelope body and returns its typed payload.
///
/// Malformed bodies fail with [`Error::Decode`]; `success: false` bodies fail with
/// [`Error::Api`] regardless of what `data` contains. A successful envelope whose `data` is
/// absent or `null` decodes `T` from JSON `null`, so `Option<_>` and `()` payloads work.
pub fn decode<T>(body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let envelope = decode_json::<Envelope<Value>>(body)?;
	let data = envelope.into_result()?.unwrap_or(Value::Null);

	Ok(serde_path_to_error::deserialize(data)?)
}

/// Decodes an envelope body while keeping the wrapper fields.
pub fn decode_envelope<T>(body: &[u8]) -> Result<Envelope<T>>
where
	T: DeserializeOwned,
{
	let envelope = decode_json::<Envelope<Value>>(body)?;
	let data = match (envelope.success, envelope.data) {
		(true, Some(value)) => Some(serde_path_to_error::deserialize(value)?),
		_ => None,
	};

	Ok(Envelope {
		success: envelope.success,
		code: envelope.code,
		message: envelope.message,
		data,
		errors: envelope.errors,
	})
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: serde::Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(<Option<T>>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn decode_json<T>(body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	Ok(serde_path_to_error::deserialize(&mut deserializer)?)
}
