//! Tree dump download
//!
//! [`TreeFetcher`] is the HTTP capability the pipeline consumes;
//! [`HttpTreeFetcher`] implements it with reqwest. [`fetch_sources`] downloads
//! every configured source into its raw file and reports progress.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::config::Credentials;
use crate::error::SyncError;
use crate::logging::*;
use crate::progress::{scaled, ProgressSink, Stage, BYTES_PER_MB, FETCH_END_PERCENT, FETCH_START_PERCENT};

/// Identifier of each source slot, in merge order
pub const SOURCE_IDS: [&str; 2] = ["primary", "secondary"];

/// Byte progress callback: `(bytes_received, total_bytes_if_known)`
pub type ByteProgress<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// Why a download failed
#[derive(Debug)]
pub enum FetchFailure {
	/// Server answered with a non-success status
	Status { status: u16, reason: String },

	/// Connection, TLS, timeout or body streaming failure
	Transport { message: String },

	/// Writing the downloaded bytes failed
	Io(std::io::Error),
}

impl fmt::Display for FetchFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FetchFailure::Status { status, reason } => write!(f, "HTTP {} {}", status, reason),
			FetchFailure::Transport { message } => write!(f, "transport error: {}", message),
			FetchFailure::Io(e) => write!(f, "cannot store download: {}", e),
		}
	}
}

impl std::error::Error for FetchFailure {}

impl From<std::io::Error> for FetchFailure {
	fn from(e: std::io::Error) -> Self {
		FetchFailure::Io(e)
	}
}

fn transport(e: reqwest::Error) -> FetchFailure {
	let message = if e.is_timeout() {
		"request timed out".to_string()
	} else if e.is_connect() {
		format!("connection failed: {}", e)
	} else {
		e.to_string()
	};
	FetchFailure::Transport { message }
}

/// Streams a URL into a local file
#[async_trait]
pub trait TreeFetcher: Send + Sync {
	/// Download `url` into `dest`, returning the number of bytes written
	async fn fetch(
		&self,
		url: &str,
		credentials: Option<&Credentials>,
		dest: &Path,
		progress: ByteProgress<'_>,
	) -> Result<u64, FetchFailure>;
}

/// Reqwest-based fetcher
pub struct HttpTreeFetcher {
	client: Client,
}

impl HttpTreeFetcher {
	/// Create a fetcher whose whole request (including the body) is bounded by `timeout`
	pub fn new(timeout: Duration) -> Result<Self, SyncError> {
		let client = Client::builder()
			.timeout(timeout)
			.connect_timeout(Duration::from_secs(10))
			.user_agent(concat!("strmsync/", env!("CARGO_PKG_VERSION")))
			.build()
			.map_err(|e| SyncError::config(format!("cannot build HTTP client: {}", e)))?;
		Ok(Self { client })
	}

	pub fn with_client(client: Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl TreeFetcher for HttpTreeFetcher {
	async fn fetch(
		&self,
		url: &str,
		credentials: Option<&Credentials>,
		dest: &Path,
		progress: ByteProgress<'_>,
	) -> Result<u64, FetchFailure> {
		let mut request = self.client.get(url);
		if let Some(creds) = credentials {
			request = request.basic_auth(&creds.username, Some(&creds.password));
		}

		debug!(url = %url, "Requesting tree dump");
		let response = request.send().await.map_err(transport)?;
		let status = response.status();
		if !status.is_success() {
			return Err(FetchFailure::Status {
				status: status.as_u16(),
				reason: status.canonical_reason().unwrap_or("").to_string(),
			});
		}

		let part = dest.with_extension("part");
		match download_to(response, &part, dest, progress).await {
			Ok(received) => Ok(received),
			Err(e) => {
				// Never leave a truncated download behind
				if let Err(rm) = tokio::fs::remove_file(&part).await {
					if rm.kind() != std::io::ErrorKind::NotFound {
						warn!("Cannot remove {}: {}", part.display(), rm);
					}
				}
				Err(e)
			}
		}
	}
}

/// Stream the body into `part`, then move it to `dest`
async fn download_to(
	response: reqwest::Response,
	part: &Path,
	dest: &Path,
	progress: ByteProgress<'_>,
) -> Result<u64, FetchFailure> {
	let total = response.content_length();
	let mut file = tokio::fs::File::create(part).await?;
	let mut stream = response.bytes_stream();
	let mut received = 0u64;
	progress(0, total);

	while let Some(chunk) = stream.next().await {
		let chunk = chunk.map_err(transport)?;
		file.write_all(&chunk).await?;
		received += chunk.len() as u64;
		progress(received, total);
	}
	file.flush().await?;
	drop(file);

	tokio::fs::rename(part, dest).await?;
	Ok(received)
}

/// One configured source slot
#[derive(Debug, Clone)]
pub struct SourceSpec {
	pub id: &'static str,
	pub url: Option<String>,
	pub dest: PathBuf,
}

/// Download every configured source
///
/// Unset slots are skipped and their stale raw file from an earlier run is
/// removed, so it cannot leak into the merged document. Returns the raw files
/// that were downloaded, in source order.
pub async fn fetch_sources(
	fetcher: &dyn TreeFetcher,
	sources: &[SourceSpec],
	credentials: Option<&Credentials>,
	sink: &dyn ProgressSink,
) -> Result<Vec<PathBuf>, SyncError> {
	let active = sources.iter().filter(|s| s.url.is_some()).count().max(1) as f64;
	let span = (FETCH_END_PERCENT - FETCH_START_PERCENT) / active;
	let mut fetched = Vec::new();

	for source in sources {
		let Some(url) = source.url.as_deref() else {
			if source.dest.exists() {
				debug!("Removing stale download {}", source.dest.display());
				std::fs::remove_file(&source.dest)?;
			}
			continue;
		};

		if let Some(parent) = source.dest.parent() {
			std::fs::create_dir_all(parent)?;
		}

		let start = FETCH_START_PERCENT + span * fetched.len() as f64;
		let id = source.id;
		sink.progress(Stage::Downloading, start, &format!("Downloading {} tree", id));

		let on_bytes = move |received: u64, total: Option<u64>| {
			let (percent, detail) = match total {
				Some(total) if total > 0 => (
					scaled(start, start + span, received, total),
					format!(
						"{}: {:.1}/{:.1} MB ({}%)",
						id,
						received as f64 / BYTES_PER_MB,
						total as f64 / BYTES_PER_MB,
						received * 100 / total
					),
				),
				_ => (start, format!("{}: {:.1} MB", id, received as f64 / BYTES_PER_MB)),
			};
			sink.progress(Stage::Downloading, percent, &detail);
		};

		let bytes = fetcher
			.fetch(url, credentials, &source.dest, &on_bytes)
			.await
			.map_err(|e| SyncError::fetch(id, e.to_string()))?;

		info!("Downloaded {} tree ({} bytes)", id, bytes);
		sink.log(&format!("Downloaded {} tree ({:.1} MB)", id, bytes as f64 / BYTES_PER_MB));
		fetched.push(source.dest.clone());
	}

	Ok(fetched)
}


// vim: ts=4
