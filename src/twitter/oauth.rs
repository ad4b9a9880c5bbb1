use std::time::{SystemTime, UNIX_EPOCH};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;

// RFC 3986 unreserved characters pass through, everything else is escaped
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'.')
	.remove(b'_')
	.remove(b'~');

pub fn encode(value: &str) -> String {
	utf8_percent_encode(value, UNRESERVED).to_string()
}

/// User context credentials for OAuth 1.0a HMAC-SHA1 request signing.
#[derive(Debug, Clone)]
pub struct OAuth1Credentials {
	pub consumer_key: String,
	pub consumer_secret: String,
	pub token: String,
	pub token_secret: String,
}

impl OAuth1Credentials {
	/// Build an `Authorization` header value for a request.
	///
	/// `params` are the query and form body parameters that must be signed,
	/// unencoded. JSON bodies are not part of the signature.
	pub fn authorization(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
		let nonce = uuid::Uuid::new_v4().simple().to_string();
		let timestamp = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_secs())
			.unwrap_or_default();
		self.authorization_with(method, url, params, &nonce, timestamp)
	}

	pub fn authorization_with(&self, method: &str, url: &str, params: &[(&str, &str)], nonce: &str, timestamp: u64) -> String {
		let timestamp = timestamp.to_string();
		let mut oauth = self.oauth_params(nonce, &timestamp);
		let signature = self.sign(&signature_base(method, url, &oauth, params));
		oauth.push(("oauth_signature", &signature));
		oauth.sort();

		let fields = oauth
			.iter()
			.map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
			.collect::<Vec<_>>()
			.join(", ");
		format!("OAuth {}", fields)
	}

	fn oauth_params<'a>(&'a self, nonce: &'a str, timestamp: &'a str) -> Vec<(&'a str, &'a str)> {
		vec![
			("oauth_consumer_key", self.consumer_key.as_str()),
			("oauth_nonce", nonce),
			("oauth_signature_method", "HMAC-SHA1"),
			("oauth_timestamp", timestamp),
			("oauth_token", self.token.as_str()),
			("oauth_version", "1.0"),
		]
	}

	pub fn sign(&self, base: &str) -> String {
		let key = format!("{}&{}", encode(&self.consumer_secret), encode(&self.token_secret));
		let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
			.expect("HMAC can take a key of any size");
		mac.update(base.as_bytes());
		STANDARD.encode(mac.finalize().into_bytes())
	}
}

/// The string that gets signed: method, base url and the sorted, encoded parameters.
pub fn signature_base(method: &str, url: &str, oauth: &[(&str, &str)], params: &[(&str, &str)]) -> String {
	let mut pairs: Vec<(String, String)> = oauth
		.iter()
		.chain(params.iter())
		.map(|(k, v)| (encode(k), encode(v)))
		.collect();
	pairs.sort();
	let joined = pairs
		.iter()
		.map(|(k, v)| format!("{}={}", k, v))
		.collect::<Vec<_>>()
		.join("&");
	format!("{}&{}&{}", method.to_ascii_uppercase(), encode(url), encode(&joined))
}
