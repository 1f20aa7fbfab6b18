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

use std::sync::Arc;

use bytes::Bytes;
use fileshare_core::{Error, Result};
use log::debug;

use crate::range::{FileRangeClient, UploadRangeOptions};

/// Ranged writes against a remote file of fixed size.
///
/// The file size is declared before writing starts and can not change while
/// the behavior is alive.
#[derive(Debug)]
pub struct WriteBehavior {
    client: Arc<dyn FileRangeClient>,
    options: UploadRangeOptions,
    size: Option<u64>,
}

impl WriteBehavior {
    /// Create a write behavior.
    ///
    /// `size` is the declared size if it is already known. Otherwise it is
    /// fetched from the service the first time it is needed.
    pub fn new(
        client: Arc<dyn FileRangeClient>,
        options: UploadRangeOptions,
        size: Option<u64>,
    ) -> Self {
        Self {
            client,
            options,
            size,
        }
    }

    /// Upload `data` at `offset` with a single range call.
    pub async fn write(&mut self, offset: u64, data: Bytes) -> Result<()> {
        debug!("uploading {} bytes at offset {offset}", data.len());
        self.client.upload_range(offset, data, &self.options).await
    }

    /// Check that `position` lies within `[0, size]`.
    pub async fn assert_can_seek(&mut self, position: i64) -> Result<()> {
        if position < 0 {
            return Err(Error::request_invalid(format!(
                "position {position} must not be negative"
            )));
        }

        let size = self.size().await?;
        if position as u64 > size {
            return Err(Error::unsupported(format!(
                "position {position} is beyond the declared file size {size}"
            )));
        }
        Ok(())
    }

    /// Changing the size of an open file is not supported.
    pub async fn resize(&mut self, size: u64) -> Result<()> {
        Err(Error::unsupported(format!(
            "resizing to {size} is not supported while the file is open for writing"
        )))
    }

    /// The declared file size, fetched from the service if not known yet.
    pub async fn size(&mut self) -> Result<u64> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let props = self
            .client
            .get_properties(&self.options.conditions)
            .await?;
        self.size = Some(props.size);
        Ok(props.size)
    }
}
