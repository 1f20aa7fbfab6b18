// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The ranged remote operations a [`FileChannel`](crate::FileChannel) is built on.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use fileshare_core::time::DateTime;
use fileshare_core::{Error, Result};
use http::StatusCode;

/// Optimistic concurrency conditions sent with a range call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConditions {
    /// The call only succeeds if this lease is active on the file.
    pub lease_id: Option<String>,
    /// The call only succeeds if the file still has this etag.
    pub if_match: Option<String>,
}

impl RequestConditions {
    /// Require the given lease.
    pub fn with_lease_id(mut self, lease_id: impl Into<String>) -> Self {
        self.lease_id = Some(lease_id.into());
        self
    }

    /// Require the given etag.
    pub fn with_if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }
}

/// Whether a range upload updates the file's last write time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LastWrittenMode {
    /// Set the last write time to the time of the upload.
    #[default]
    Now,
    /// Keep the existing last write time.
    Preserve,
}

impl LastWrittenMode {
    /// Value of the `x-ms-file-last-write-time` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            LastWrittenMode::Now => "now",
            LastWrittenMode::Preserve => "preserve",
        }
    }
}

/// Options forwarded with every range upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRangeOptions {
    /// Conditions for the upload.
    pub conditions: RequestConditions,
    /// Last write time handling.
    pub last_written_mode: LastWrittenMode,
}

/// Properties of a remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProperties {
    /// Declared size in bytes.
    pub size: u64,
    /// Current etag.
    pub etag: Option<String>,
    /// Last modified time.
    pub last_modified: Option<DateTime>,
}

/// The result of a ranged download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeDownload {
    /// Bytes returned, possibly fewer than requested near the end of the file.
    pub data: Bytes,
    /// Total size of the file at the time of the download.
    pub file_size: u64,
}

/// A remote file that can only be accessed by offset-bounded ranges.
#[async_trait]
pub trait FileRangeClient: Debug + Send + Sync + 'static {
    /// Fetch the file's current properties.
    async fn get_properties(&self, conditions: &RequestConditions) -> Result<FileProperties>;

    /// Create the file, or replace an existing one, with the given size.
    async fn create(&self, size: u64, conditions: &RequestConditions) -> Result<FileProperties>;

    /// Upload `data` to the range starting at `offset`.
    ///
    /// The range must lie within the file's declared size.
    async fn upload_range(
        &self,
        offset: u64,
        data: Bytes,
        options: &UploadRangeOptions,
    ) -> Result<()>;

    /// Download at most `len` bytes starting at `offset`.
    ///
    /// An offset at or past the end of the file fails with
    /// `416 Range Not Satisfiable`.
    async fn download_range(
        &self,
        offset: u64,
        len: u64,
        conditions: &RequestConditions,
    ) -> Result<RangeDownload>;
}

#[async_trait]
impl<T: FileRangeClient + ?Sized> FileRangeClient for Arc<T> {
    async fn get_properties(&self, conditions: &RequestConditions) -> Result<FileProperties> {
        self.as_ref().get_properties(conditions).await
    }

    async fn create(&self, size: u64, conditions: &RequestConditions) -> Result<FileProperties> {
        self.as_ref().create(size, conditions).await
    }

    async fn upload_range(
        &self,
        offset: u64,
        data: Bytes,
        options: &UploadRangeOptions,
    ) -> Result<()> {
        self.as_ref().upload_range(offset, data, options).await
    }

    async fn download_range(
        &self,
        offset: u64,
        len: u64,
        conditions: &RequestConditions,
    ) -> Result<RangeDownload> {
        self.as_ref().download_range(offset, len, conditions).await
    }
}

/// Error code the service uses for an unsatisfiable range.
pub const INVALID_RANGE: &str = "InvalidRange";

/// Returns true if the error means the requested range starts past the end.
pub fn is_invalid_range(err: &Error) -> bool {
    err.status() == Some(StatusCode::RANGE_NOT_SATISFIABLE) || err.code() == Some(INVALID_RANGE)
}
