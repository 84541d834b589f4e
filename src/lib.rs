//! Async client for the Fairgate Standard API: JWT lifecycle management, rate-limit aware
//! request execution, and lazy pagination.
//!
//! The crate focuses on the authenticated request pipeline. A [`Client`](client::Client) owns a
//! [`TokenStore`](auth::TokenStore) and a [`RateGate`](rate_gate::RateGate); every call waits
//! on the gate, makes sure a valid bearer token is held, dispatches through an
//! [`HttpTransport`](http::HttpTransport), and retries once per HTTP 429 after the server-declared
//! deadline. Resource-specific code plugs in through
//! [`Client::execute_json`](client::Client::execute_json) and
//! [`Client::paginate`](client::Client::paginate).

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod context;
pub mod envelope;
pub mod error;
pub mod http;
pub mod obs;
pub mod pagination;
pub mod rate_gate;
pub mod timestamp;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
pub use jsonwebtoken;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
