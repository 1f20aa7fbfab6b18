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

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use fileshare_core::time::{now, DateTime};
use fileshare_core::{Error, Result};
use http::StatusCode;

use crate::range::*;

/// A call received by a [`MemoryFileClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeCall {
    /// `get_properties`
    GetProperties {
        /// Conditions sent with the call.
        conditions: RequestConditions,
    },
    /// `create`
    Create {
        /// Declared size.
        size: u64,
        /// Conditions sent with the call.
        conditions: RequestConditions,
    },
    /// `upload_range`
    UploadRange {
        /// Range start.
        offset: u64,
        /// Uploaded bytes.
        data: Bytes,
        /// Options sent with the call.
        options: UploadRangeOptions,
    },
    /// `download_range`
    DownloadRange {
        /// Range start.
        offset: u64,
        /// Requested length.
        len: u64,
        /// Conditions sent with the call.
        conditions: RequestConditions,
    },
}

/// An in-memory [`FileRangeClient`] holding a single file.
///
/// Every call is recorded and can be inspected through [`MemoryFileClient::calls`].
/// Clones share the same file, so a test can keep one handle while a channel
/// owns another.
///
/// ```
/// use fileshare_azure_file::{FileRangeClient, MemoryFileClient, RequestConditions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> fileshare_core::Result<()> {
/// let client = MemoryFileClient::with_content(b"hello world".to_vec());
/// let download = client
///     .download_range(6, 100, &RequestConditions::default())
///     .await?;
/// assert_eq!(&download.data[..], b"world");
/// assert_eq!(download.file_size, 11);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFileClient {
    state: Arc<Mutex<MemoryFile>>,
}

#[derive(Debug, Default)]
struct MemoryFile {
    content: Option<Vec<u8>>,
    version: u64,
    last_modified: Option<DateTime>,
    lease_id: Option<String>,
    calls: Vec<RangeCall>,
    failures: VecDeque<Error>,
}

impl MemoryFile {
    fn etag(&self) -> String {
        format!("\"0x{:X}\"", self.version)
    }

    fn touch(&mut self) {
        self.version += 1;
        self.last_modified = Some(now());
    }

    fn properties(&self, content: &[u8]) -> FileProperties {
        FileProperties {
            size: content.len() as u64,
            etag: Some(self.etag()),
            last_modified: self.last_modified,
        }
    }

    /// Record the call and apply scripted failures and conditions.
    fn begin(&mut self, call: RangeCall, conditions: &RequestConditions) -> Result<()> {
        self.calls.push(call);

        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }

        if let Some(lease_id) = &self.lease_id {
            match &conditions.lease_id {
                None => {
                    return Err(Error::service(
                        StatusCode::PRECONDITION_FAILED,
                        Some("LeaseIdMissing".to_string()),
                    ))
                }
                Some(v) if v != lease_id => {
                    return Err(Error::service(
                        StatusCode::PRECONDITION_FAILED,
                        Some("LeaseIdMismatchWithFileOperation".to_string()),
                    ))
                }
                Some(_) => {}
            }
        } else if conditions.lease_id.is_some() {
            return Err(Error::service(
                StatusCode::PRECONDITION_FAILED,
                Some("LeaseNotPresentWithFileOperation".to_string()),
            ));
        }

        if let Some(etag) = &conditions.if_match {
            if self.content.is_some() && etag != "*" && *etag != self.etag() {
                return Err(Error::service(
                    StatusCode::PRECONDITION_FAILED,
                    Some("ConditionNotMet".to_string()),
                ));
            }
        }

        Ok(())
    }

    fn content(&self) -> Result<&Vec<u8>> {
        self.content.as_ref().ok_or_else(|| {
            Error::service(StatusCode::NOT_FOUND, Some("ResourceNotFound".to_string()))
        })
    }
}

impl MemoryFileClient {
    /// A client whose file does not exist yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose file exists with the given content.
    pub fn with_content(content: impl Into<Vec<u8>>) -> Self {
        let client = Self::default();
        {
            let mut state = client.state();
            state.content = Some(content.into());
            state.touch();
        }
        client
    }

    /// Put an active lease on the file. Calls must then carry this lease id.
    pub fn with_lease(self, lease_id: impl Into<String>) -> Self {
        self.state().lease_id = Some(lease_id.into());
        self
    }

    /// Current content of the file, if it exists.
    pub fn content(&self) -> Option<Vec<u8>> {
        self.state().content.clone()
    }

    /// Current etag of the file.
    pub fn etag(&self) -> String {
        self.state().etag()
    }

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<RangeCall> {
        self.state().calls.clone()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Make the next call fail with the given error.
    ///
    /// Failures queue up and are consumed one per call.
    pub fn fail_next(&self, err: Error) {
        self.state().failures.push_back(err);
    }

    fn state(&self) -> MutexGuard<'_, MemoryFile> {
        // The state stays consistent across a panic in a test assertion.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl FileRangeClient for MemoryFileClient {
    async fn get_properties(&self, conditions: &RequestConditions) -> Result<FileProperties> {
        let mut state = self.state();
        state.begin(
            RangeCall::GetProperties {
                conditions: conditions.clone(),
            },
            conditions,
        )?;

        let content = state.content()?;
        Ok(state.properties(content))
    }

    async fn create(&self, size: u64, conditions: &RequestConditions) -> Result<FileProperties> {
        let mut state = self.state();
        state.begin(
            RangeCall::Create {
                size,
                conditions: conditions.clone(),
            },
            conditions,
        )?;

        let size = usize::try_from(size)
            .map_err(|e| Error::request_invalid("file size is too large").with_source(e))?;
        state.content = Some(vec![0; size]);
        state.touch();

        let content = state.content()?;
        Ok(state.properties(content))
    }

    async fn upload_range(
        &self,
        offset: u64,
        data: Bytes,
        options: &UploadRangeOptions,
    ) -> Result<()> {
        let mut state = self.state();
        state.begin(
            RangeCall::UploadRange {
                offset,
                data: data.clone(),
                options: options.clone(),
            },
            &options.conditions,
        )?;

        let size = state.content()?.len() as u64;
        let end = offset + data.len() as u64;
        if data.is_empty() || end > size {
            return Err(Error::service(
                StatusCode::RANGE_NOT_SATISFIABLE,
                Some(INVALID_RANGE.to_string()),
            ));
        }

        let preserve = options.last_written_mode == LastWrittenMode::Preserve;
        let last_modified = state.last_modified;
        if let Some(content) = state.content.as_mut() {
            content[offset as usize..end as usize].copy_from_slice(&data);
        }
        state.touch();
        if preserve {
            state.last_modified = last_modified;
        }

        Ok(())
    }

    async fn download_range(
        &self,
        offset: u64,
        len: u64,
        conditions: &RequestConditions,
    ) -> Result<RangeDownload> {
        let mut state = self.state();
        state.begin(
            RangeCall::DownloadRange {
                offset,
                len,
                conditions: conditions.clone(),
            },
            conditions,
        )?;

        let content = state.content()?;
        let size = content.len() as u64;
        if offset >= size {
            return Err(Error::service(
                StatusCode::RANGE_NOT_SATISFIABLE,
                Some(INVALID_RANGE.to_string()),
            ));
        }

        let end = size.min(offset.saturating_add(len));
        Ok(RangeDownload {
            data: Bytes::copy_from_slice(&content[offset as usize..end as usize]),
            file_size: size,
        })
    }
}
