use std::path::Path;
use bytes::Bytes;
use futures_util::StreamExt;
use serde_derive::Deserialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub const SEARCH_URL: &str = "https://api.giphy.com/v1/gifs/search";
pub const MEDIA_BASE: &str = "https://i.giphy.com/media";
const SEARCH_LIMIT: u32 = 25;

#[derive(Debug, Error)]
pub enum GiphyError {
	#[error("giphy request failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error("could not write gif: {0}")]
	Io(#[from] std::io::Error),
	#[error("no gifs found for {query:?} at offset {offset}")]
	NoResults { query: String, offset: u32 },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Gif {
	pub id: String,
	#[serde(default)]
	pub title: String,
}

#[derive(Deserialize)]
struct SearchResponse {
	data: Vec<Gif>,
}

pub struct GiphyClient {
	client: reqwest::Client,
	api_key: String,
	search_url: String,
	media_base: String,
}

impl GiphyClient {
	pub fn new(client: reqwest::Client, api_key: &str) -> Self {
		GiphyClient {
			client,
			api_key: api_key.to_string(),
			search_url: SEARCH_URL.to_string(),
			media_base: MEDIA_BASE.to_string(),
		}
	}

	pub fn with_endpoints(mut self, search_url: &str, media_base: &str) -> Self {
		self.search_url = search_url.to_string();
		self.media_base = media_base.trim_end_matches('/').to_string();
		self
	}

	pub async fn search(&self, query: &str, offset: u32) -> Result<Vec<Gif>, GiphyError> {
		let limit = SEARCH_LIMIT.to_string();
		let offset = offset.to_string();
		let results: SearchResponse = self.client
			.get(&self.search_url)
			.query(&[
				("api_key", self.api_key.as_str()),
				("q", query),
				("limit", limit.as_str()),
				("offset", offset.as_str()),
				("rating", "g"),
				("lang", "en"),
				("bundle", "messaging_non_clips"),
			])
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		Ok(results.data)
	}

	/// Stream the animated gif for `id` into `path`, returning the byte count.
	pub async fn download(&self, id: &str, path: &Path) -> Result<u64, GiphyError> {
		let response = self.client
			.get(format!("{}/{}/giphy.gif", self.media_base, id))
			.send()
			.await?
			.error_for_status()?;

		let mut file = tokio::fs::File::create(path).await?;
		let mut stream = response.bytes_stream();
		let mut written = 0u64;
		while let Some(chunk) = stream.next().await {
			let chunk: Bytes = chunk?;
			file.write_all(&chunk).await?;
			written += chunk.len() as u64;
		}
		file.flush().await?;
		Ok(written)
	}

	/// Download the top search result to `path`.
	pub async fn fetch_first(&self, query: &str, offset: u32, path: &Path) -> Result<Gif, GiphyError> {
		let gif = self.search(query, offset).await?
			.into_iter()
			.next()
			.ok_or_else(|| GiphyError::NoResults { query: query.to_string(), offset })?;
		let written = self.download(&gif.id, path).await?;
		debug!(id = %gif.id, title = %gif.title, bytes = written, path = %path.display(), "gif downloaded");
		Ok(gif)
	}
}
