//! Azure File service SAS signing and seekable file channels.
//!
//! This crate provides:
//! - Service SAS (share and file scope) and account SAS generation
//! - Shared Key, SAS token and bearer token request signing
//! - A [`FileChannel`] that maps reads, writes and seeks onto ranged
//!   uploads and downloads of a remote file
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chrono::{TimeDelta, Utc};
//! use fileshare_azure_file::sas::{ShareFileSasPermission, ShareServiceSasSignatureValues};
//! use fileshare_azure_file::{Config, FileChannel, ShareFileClient, WriteOptions};
//! use fileshare_core::{Context, OsEnv, Result};
//! use fileshare_http_send_reqwest::ReqwestHttpSend;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new()
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!     let config = Config::default().from_env(&ctx);
//!
//!     // Hand out read access to a single file for one hour.
//!     let token = ShareServiceSasSignatureValues::new("share")
//!         .with_file_path("dir/report.csv")
//!         .with_file_permissions(ShareFileSasPermission::new().with_read(true))
//!         .with_expiry(Utc::now() + TimeDelta::hours(1))
//!         .sign("account", "<base64 account key>")?;
//!     println!("https://account.file.core.windows.net/share/dir/report.csv?{token}");
//!
//!     // Write a file through a channel.
//!     let client = ShareFileClient::new(ctx, &config, "share", "dir/report.csv")?;
//!     let mut channel =
//!         FileChannel::open_write(Arc::new(client), WriteOptions::overwrite(11)).await?;
//!     channel.write(b"hello world").await?;
//!     channel.close().await?;
//!
//!     Ok(())
//! }
//! ```

mod constants;

mod config;
pub use config::Config;

mod connection_string;

mod credential;
pub use credential::Credential;

pub mod sas;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;

mod range;
pub use range::{
    is_invalid_range, FileProperties, FileRangeClient, LastWrittenMode, RangeDownload,
    RequestConditions, UploadRangeOptions, INVALID_RANGE,
};

mod client;
pub use client::ShareFileClient;

mod memory;
pub use memory::{MemoryFileClient, RangeCall};

mod channel;
pub use channel::{
    BlockingFileChannel, ChannelMode, FileChannel, ReadBehavior, ReadOptions, WriteBehavior,
    WriteMode, WriteOptions, DEFAULT_CHUNK_SIZE,
};
