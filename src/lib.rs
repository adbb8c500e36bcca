//! Signed client-credential token acquirer: HMAC-signed token requests, jittered retries, and a
//! single-flight expiring token cache that hands out access tokens for outgoing calls.
//!
//! The usual wiring is a [`ClientCredentialsProvider`](provider::ClientCredentialsProvider)
//! feeding a [`TokenClient`](client::TokenClient), wrapped by a
//! [`SignInCache`](cache::SignInCache) that callers share:
//!
//! ```no_run
//! # #[cfg(feature = "reqwest")]
//! # async fn demo() -> token_acquirer::error::Result<()> {
//! use std::sync::Arc;
//!
//! use token_acquirer::{
//! 	auth::{Credentials, GrantRequest},
//! 	cache::{CacheConfig, SignInCache},
//! 	client::TokenClient,
//! 	provider::ClientCredentialsProvider,
//! };
//!
//! let credentials = Credentials::new("https://auth.example.com", "key-id", "key-secret")?;
//! let client = Arc::new(TokenClient::new(ClientCredentialsProvider::new(credentials)?)?);
//! let cache =
//! 	SignInCache::signing_in(client, GrantRequest::ClientCredentials, CacheConfig::default())?;
//! let token = cache.get_token().await?;
//!
//! println!("{}", token.bearer_header());
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod clock;
pub mod error;
pub mod ext;
pub mod http;
pub mod obs;
pub mod provider;
pub mod retry;
pub mod sign;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
