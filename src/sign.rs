//! HMAC request signing for token endpoint calls.
//!
//! The canonical string joins the upper-cased method, the full URL, the sorted form encoding of
//! the grant parameters, the timestamp, and the nonce with newlines. Its HMAC-SHA256 digest is
//! keyed by the access-key secret and rendered as:
//!
//! ```text
//! HMAC-SHA256 Credential=<access key id>, Timestamp=<unix ms>, Nonce=<nonce>, Signature=<base64>
//! ```

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use oauth2::http::Method;
use rand::{Rng, distr::Alphanumeric};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenSecret},
	clock::{Clock, SystemClock},
	error::ConfigError,
};

type HmacSha256 = Hmac<Sha256>;

/// Authorization scheme label prefixed to every signature.
pub const SIGNATURE_SCHEME: &str = "HMAC-SHA256";

const NONCE_LEN: usize = 24;

/// Everything that feeds one signature; two equal inputs always produce the same header.
#[derive(Clone, Debug)]
pub struct SigningInput<'a> {
	/// HTTP method of the token request.
	pub method: &'a Method,
	/// Full token endpoint URL.
	pub url: &'a Url,
	/// Grant parameters; the map order is the canonical order.
	pub form_params: &'a BTreeMap<String, String>,
	/// Unix milliseconds taken from the signer's clock.
	pub timestamp_millis: i64,
	/// Per-request random value.
	pub nonce: &'a str,
}

/// Computes `Authorization` header values for token requests.
#[derive(Clone)]
pub struct RequestSigner {
	access_key_id: String,
	access_key_secret: TokenSecret,
	clock: Arc<dyn Clock>,
}
impl RequestSigner {
	/// Creates a signer for the given key pair using the system clock.
	pub fn new(
		access_key_id: impl Into<String>,
		access_key_secret: impl Into<TokenSecret>,
	) -> Result<Self, ConfigError> {
		let access_key_id = access_key_id.into();
		let access_key_secret = access_key_secret.into();

		if access_key_id.trim().is_empty() {
			return Err(ConfigError::MissingField { field: "access_key_id" });
		}
		if access_key_secret.is_empty() {
			return Err(ConfigError::MissingField { field: "access_key_secret" });
		}

		Ok(Self { access_key_id, access_key_secret, clock: Arc::new(SystemClock) })
	}

	/// Creates a signer from validated credentials.
	pub fn from_credentials(credentials: &Credentials) -> Result<Self, ConfigError> {
		Self::new(credentials.access_key_id(), credentials.access_key_secret().clone())
	}

	/// Replaces the clock that supplies signature timestamps.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Access-key identifier embedded in every header.
	pub fn access_key_id(&self) -> &str {
		&self.access_key_id
	}

	/// Signs a request using the clock's current time and a fresh nonce.
	pub fn authorize(
		&self,
		method: &Method,
		url: &Url,
		form_params: &BTreeMap<String, String>,
	) -> Result<String, ConfigError> {
		let nonce = generate_nonce();

		self.sign(&SigningInput {
			method,
			url,
			form_params,
			timestamp_millis: self.clock.now_millis(),
			nonce: &nonce,
		})
	}

	/// Deterministically signs fully specified input.
	pub fn sign(&self, input: &SigningInput) -> Result<String, ConfigError> {
		let key = self.access_key_secret.expose().as_bytes();
		let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
			.map_err(|_| ConfigError::InvalidSigningKey)?;

		mac.update(canonical_string(input).as_bytes());

		let signature = STANDARD.encode(mac.finalize().into_bytes());

		Ok(format!(
			"{SIGNATURE_SCHEME} Credential={}, Timestamp={}, Nonce={}, Signature={signature}",
			self.access_key_id, input.timestamp_millis, input.nonce,
		))
	}
}
impl Debug for RequestSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestSigner")
			.field("access_key_id", &self.access_key_id)
			.field("access_key_secret", &"<redacted>")
			.finish()
	}
}

/// Builds the newline-joined string that gets MAC'd.
pub fn canonical_string(input: &SigningInput) -> String {
	let params = url::form_urlencoded::Serializer::new(String::new())
		.extend_pairs(input.form_params.iter())
		.finish();

	format!(
		"{}\n{}\n{params}\n{}\n{}",
		input.method.as_str().to_ascii_uppercase(),
		input.url.as_str(),
		input.timestamp_millis,
		input.nonce,
	)
}

/// Random alphanumeric nonce.
pub fn generate_nonce() -> String {
	rand::rng().sample_iter(&Alphanumeric).take(NONCE_LEN).map(char::from).collect()
}
