//! Auth endpoint calls backing the client's [`TokenExchange`] implementation.

// crates.io
use http::Method;
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	auth::{ExchangeFuture, TokenExchange, TokenPair, TokenSecret},
	client::Client,
	context::Context,
	envelope,
	error::ConfigError,
	http::{HttpTransport, RequestBody},
};

const AUTH_PREFIX: [&str; 3] = ["fsa", "v1.1", "auth"];

/// Auth endpoint family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Grant {
	Create,
	Refresh,
}
impl Grant {
	fn as_str(self) -> &'static str {
		match self {
			Grant::Create => "create",
			Grant::Refresh => "refresh",
		}
	}
}

impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds `fsa/v1.1/auth/{grant}/{organization}/token`, escaping the organisation id.
	fn auth_url(&self, grant: Grant) -> Result<Url> {
		let mut url = self.base_url.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidBaseUrl { url: self.base_url.to_string() })?
			.pop_if_empty()
			.extend(AUTH_PREFIX)
			.extend([grant.as_str(), self.config.organization_id.as_str(), "token"]);

		Ok(url)
	}

	// Auth calls bypass the rate gate and carry no bearer token.
	async fn exchange(&self, ctx: &Context, grant: Grant, payload: Value) -> Result<TokenPair> {
		let url = self.auth_url(grant)?;
		let mut body = RequestBody::json(&payload)?;
		let request = self.build_request(Method::POST, &url, None, body.take())?;
		let response = self.dispatch(ctx, request).await?;

		if !response.status().is_success() {
			return Err(Error::unexpected_status(response.status()));
		}

		envelope::decode(response.body())
	}
}
impl<T> TokenExchange for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn create<'a>(&'a self, ctx: &'a Context, access_key: &'a TokenSecret) -> ExchangeFuture<'a> {
		Box::pin(self.exchange(ctx, Grant::Create, json!({ "access_key": access_key.expose() })))
	}

	fn refresh<'a>(
		&'a self,
		ctx: &'a Context,
		refresh_token: &'a TokenSecret,
	) -> ExchangeFuture<'a> {
		Box::pin(self.exchange(
			ctx,
			Grant::Refresh,
			json!({ "refresh_token": refresh_token.expose() }),
		))
	}
}
