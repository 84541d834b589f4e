//! Lazy page-by-page iteration over list endpoints.
//!
//! A page is fetched only when the consumer has drained the previous one and polls again.
//! Iteration ends after the page whose number reaches the reported `totalPages`; when the API
//! omits `totalPages` it ends at the first empty page instead. A fetch error is yielded once and
//! ends the stream. The fetch function receives the iteration's [`Context`] with every page
//! request; dropping the stream is how a consumer stops early.

// std
use std::vec::IntoIter;
// crates.io
use futures::{Stream, stream};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	client::Client,
	context::Context,
	envelope::{PageParams, Pagination},
	http::HttpTransport,
};

/// One fetched page: its items plus the pagination metadata reported alongside them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
	/// Items on this page, in API order.
	pub items: Vec<T>,
	/// Metadata reported with the page.
	pub pagination: Pagination,
}
impl<T> Page<T> {
	/// Creates a page from its parts.
	pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
		Self { items, pagination }
	}

	/// Splits a list payload whose pagination fields sit next to the `items_field` array.
	///
	/// A missing or `null` items field yields an empty page.
	pub fn from_list_payload(mut payload: Value, items_field: &str) -> Result<Self>
	where
		T: DeserializeOwned,
	{
		let items = match payload.get_mut(items_field).map(Value::take) {
			None | Some(Value::Null) => Vec::new(),
			Some(items) => serde_path_to_error::deserialize(items)?,
		};
		let pagination = serde_path_to_error::deserialize(payload)?;

		Ok(Self { items, pagination })
	}
}

enum Cursor<T> {
	Fetch(PageParams),
	Drain { items: IntoIter<T>, next: Option<PageParams> },
	Done,
}

/// Iterates every item across pages, starting at page 1 with the default page size.
pub fn paginate<T, F, Fut>(
	ctx: &Context,
	fetch: F,
) -> impl Stream<Item = Result<T>> + use<T, F, Fut>
where
	F: FnMut(Context, PageParams) -> Fut,
	Fut: Future<Output = Result<Page<T>>>,
{
	paginate_from(ctx, PageParams::default(), fetch)
}

/// Iterates every item across pages, starting at `start`.
///
/// The returned stream is not `Unpin`; pin it (for example with [`std::pin::pin!`]) before
/// polling it with [`futures::StreamExt::next`].
pub fn paginate_from<T, F, Fut>(
	ctx: &Context,
	start: PageParams,
	fetch: F,
) -> impl Stream<Item = Result<T>> + use<T, F, Fut>
where
	F: FnMut(Context, PageParams) -> Fut,
	Fut: Future<Output = Result<Page<T>>>,
{
	let state = (ctx.clone(), fetch, Cursor::Fetch(start));

	stream::unfold(state, |(ctx, mut fetch, mut cursor)| async move {
		loop {
			match cursor {
				Cursor::Done => return None,
				Cursor::Drain { mut items, next } => {
					if let Some(item) = items.next() {
						return Some((Ok(item), (ctx, fetch, Cursor::Drain { items, next })));
					}

					cursor = next.map_or(Cursor::Done, Cursor::Fetch);
				},
				Cursor::Fetch(params) => match fetch(ctx.clone(), params).await {
					Ok(page) => {
						let next = next_params(params, &page);

						cursor = Cursor::Drain { items: page.items.into_iter(), next };
					},
					Err(e) => return Some((Err(e), (ctx, fetch, Cursor::Done))),
				},
			}
		}
	})
}

fn next_params<T>(params: PageParams, page: &Page<T>) -> Option<PageParams> {
	let total_pages = page.pagination.total_pages;

	if total_pages > 0 && params.page_no >= total_pages {
		return None;
	}
	if page.items.is_empty() {
		return None;
	}

	Some(PageParams { page_no: params.page_no.checked_add(1)?, ..params })
}

impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Streams every item of a list endpoint.
	///
	/// Each page is fetched with `GET path?pageNo=..&pageLimit=..`; filters can be passed in
	/// the query string of `path`. The items are read from the `items_field` array of the
	/// payload, the pagination fields from the payload itself.
	pub fn paginate<R>(
		&self,
		ctx: &Context,
		path: &str,
		items_field: &'static str,
	) -> impl Stream<Item = Result<R>> + use<T, R>
	where
		R: DeserializeOwned,
	{
		let client = self.clone();
		let path = path.to_owned();

		paginate(ctx, move |ctx: Context, params: PageParams| {
			let client = client.clone();
			let path = path.clone();

			async move {
				let payload = client.get_json::<Value>(&ctx, &path, &params.to_query()).await?;

				Page::from_list_payload(payload, items_field)
			}
		})
	}
}
