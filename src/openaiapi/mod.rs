use serde_derive::{Deserialize, Serialize};
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

use crate::config::{ApiKey, LlmEndpoint};

#[derive(Debug, Error)]
pub enum ChatError {
	#[error("request failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error("could not parse response: {0}")]
	Serde(#[from] serde_json::Error),
	#[error("{0}")]
	Malformed(&'static str),
	#[error("the model returned an empty message")]
	Empty,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Message {
	pub role: String,
	pub content: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl Message {
	pub fn user(content: &str) -> Self {
		Message{ role: "user".to_string(), content: Some(content.to_string()), name: None }
	}
}

#[derive(Serialize)]
struct Chat<'a> {
	model: &'a str,
	messages: Vec<Message>,
}

/// A one-shot chat completion against an OpenAI compatible endpoint.
pub struct ChatClient {
	client: reqwest::Client,
	endpoint: LlmEndpoint,
	api_key: ApiKey,
}

impl ChatClient {
	pub fn new(client: reqwest::Client, endpoint: LlmEndpoint, api_key: ApiKey) -> Self {
		ChatClient { client, endpoint, api_key }
	}

	/// Send `prompt` as a single user message and return the reply text.
	pub async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
		let chat = Chat { model: &self.endpoint.model, messages: vec![Message::user(prompt)] };
		let serialised = serde_json::to_string(&chat)?;
		let req = self.client
			.post(self.endpoint.url.clone())
			.header(CONTENT_TYPE, "application/json")
			.body(serialised);
		let req = match &self.api_key {
			ApiKey::Bearer(key) => req.bearer_auth(key),
			ApiKey::Azure(key) => req.header("api-key", key),
		};
		let body = req.send().await?.error_for_status()?.text().await?;
		debug!(bytes = body.len(), model = %self.endpoint.model, "chat completion received");
		let response = Self::parse_response(&body)?;
		match response.content {
			Some(content) if !content.trim().is_empty() => Ok(content),
			_ => Err(ChatError::Empty),
		}
	}

	pub fn parse_response(response: &str) -> Result<Message, ChatError> {
		let mut json: serde_json::Value = serde_json::from_str(response)?;
		let message = json
			.get_mut("choices").ok_or(ChatError::Malformed("No choices in the return object"))?
			.get_mut(0).ok_or(ChatError::Malformed("No element 0 in the choices object"))?
			.get_mut("message").ok_or(ChatError::Malformed("No message in the choices element 0"))?
			.take();
		Ok(serde_json::from_value(message)?)
	}
}
