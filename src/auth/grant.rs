//! Grant variants accepted by the token endpoint and their body encodings.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Grant kinds supported by the acquirer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// App-only token for the configured access key.
	ClientCredentials,
	/// Resource-owner password grant.
	Password,
	/// Exchange of a previously issued refresh token.
	RefreshToken,
	/// Workload identity token for a pod running as a service identity.
	IdentityToken,
}
impl GrantType {
	/// Returns the wire identifier for the grant type.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::ClientCredentials => "client_credentials",
			GrantType::Password => "password",
			GrantType::RefreshToken => "refresh_token",
			GrantType::IdentityToken => "identity_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Body encoding used for token requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
	/// `application/json` with a `grantType` discriminator.
	#[default]
	Json,
	/// `application/x-www-form-urlencoded` with a `grant_type` discriminator.
	Form,
}
impl ContentType {
	/// MIME type sent in the `Content-Type` header.
	pub const fn mime(self) -> &'static str {
		match self {
			ContentType::Json => "application/json",
			ContentType::Form => "application/x-www-form-urlencoded",
		}
	}
}

/// A token request, one variant per grant with its own field set.
#[derive(Clone, PartialEq, Eq)]
pub enum GrantRequest {
	/// `client_credentials`; the signed access key is the only credential.
	ClientCredentials,
	/// `password` grant.
	Password {
		/// Account email.
		email: String,
		/// Account password.
		password: TokenSecret,
	},
	/// `refresh_token` grant.
	RefreshToken {
		/// Access token being refreshed.
		access_token: TokenSecret,
		/// Refresh token issued alongside it.
		refresh_token: TokenSecret,
	},
	/// Identity token grant for workloads.
	IdentityToken {
		/// Identity the workload runs as.
		run_as_id: String,
		/// Namespace the workload runs in.
		namespace: String,
		/// Display name of the run-as identity.
		run_as_id_name: String,
		/// Pod name.
		pod_name: String,
		/// Pod UID.
		pod_uid: String,
	},
}
impl GrantRequest {
	/// Builds a `password` grant.
	pub fn password(email: impl Into<String>, password: impl Into<TokenSecret>) -> Self {
		Self::Password { email: email.into(), password: password.into() }
	}

	/// Builds a `refresh_token` grant.
	pub fn refresh_token(
		access_token: impl Into<TokenSecret>,
		refresh_token: impl Into<TokenSecret>,
	) -> Self {
		Self::RefreshToken {
			access_token: access_token.into(),
			refresh_token: refresh_token.into(),
		}
	}

	/// Grant kind of this request.
	pub fn grant_type(&self) -> GrantType {
		match self {
			Self::ClientCredentials => GrantType::ClientCredentials,
			Self::Password { .. } => GrantType::Password,
			Self::RefreshToken { .. } => GrantType::RefreshToken,
			Self::IdentityToken { .. } => GrantType::IdentityToken,
		}
	}

	/// Grant-specific fields, excluding the grant discriminator.
	pub fn fields(&self) -> Vec<(&'static str, &str)> {
		match self {
			Self::ClientCredentials => Vec::new(),
			Self::Password { email, password } =>
				vec![("email", email.as_str()), ("password", password.expose())],
			Self::RefreshToken { access_token, refresh_token } => vec![
				("access_token", access_token.expose()),
				("refresh_token", refresh_token.expose()),
			],
			Self::IdentityToken { run_as_id, namespace, run_as_id_name, pod_name, pod_uid } => vec![
				("runAsId", run_as_id.as_str()),
				("namespace", namespace.as_str()),
				("runAsIdName", run_as_id_name.as_str()),
				("podName", pod_name.as_str()),
				("podUid", pod_uid.as_str()),
			],
		}
	}

	/// Form parameters (sorted by key) including `grant_type`; these are what gets signed.
	pub fn form_params(&self) -> BTreeMap<String, String> {
		let mut form = BTreeMap::new();

		form.insert("grant_type".into(), self.grant_type().as_str().into());

		for (key, value) in self.fields() {
			form.insert(key.into(), value.into());
		}

		form
	}

	/// JSON body using `grantType` as the discriminator.
	pub fn json_body(&self) -> serde_json::Value {
		let mut body = serde_json::Map::new();

		body.insert("grantType".into(), self.grant_type().as_str().into());

		for (key, value) in self.fields() {
			body.insert(key.into(), value.into());
		}

		serde_json::Value::Object(body)
	}

	/// Encodes the request body for `content_type`.
	pub fn encode(&self, content_type: ContentType) -> Result<Vec<u8>, serde_json::Error> {
		match content_type {
			ContentType::Json => serde_json::to_vec(&self.json_body()),
			ContentType::Form => Ok(url::form_urlencoded::Serializer::new(String::new())
				.extend_pairs(self.form_params())
				.finish()
				.into_bytes()),
		}
	}
}
impl Debug for GrantRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::ClientCredentials => f.write_str("GrantRequest::ClientCredentials"),
			Self::Password { email, .. } => f
				.debug_struct("GrantRequest::Password")
				.field("email", email)
				.field("password", &"<redacted>")
				.finish(),
			Self::RefreshToken { .. } => f
				.debug_struct("GrantRequest::RefreshToken")
				.field("access_token", &"<redacted>")
				.field("refresh_token", &"<redacted>")
				.finish(),
			Self::IdentityToken { run_as_id, namespace, run_as_id_name, pod_name, pod_uid } => f
				.debug_struct("GrantRequest::IdentityToken")
				.field("run_as_id", run_as_id)
				.field("namespace", namespace)
				.field("run_as_id_name", run_as_id_name)
				.field("pod_name", pod_name)
				.field("pod_uid", pod_uid)
				.finish(),
		}
	}
}
