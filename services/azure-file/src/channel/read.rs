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
use fileshare_core::Result;
use log::debug;

use crate::range::{is_invalid_range, FileRangeClient, RequestConditions};

/// Ranged reads against a remote file.
///
/// Keeps the most recently observed file size, refreshed by every download
/// and by the properties call that follows an unsatisfiable range.
#[derive(Debug)]
pub struct ReadBehavior {
    client: Arc<dyn FileRangeClient>,
    conditions: RequestConditions,
    last_known_size: Option<u64>,
}

impl ReadBehavior {
    /// Create a read behavior sending `conditions` with every call.
    pub fn new(client: Arc<dyn FileRangeClient>, conditions: RequestConditions) -> Self {
        Self {
            client,
            conditions,
            last_known_size: None,
        }
    }

    /// Download up to `len` bytes at `offset`.
    ///
    /// Returns empty bytes once `offset` is at or past the end of the file.
    pub async fn read(&mut self, offset: u64, len: u64) -> Result<Bytes> {
        match self
            .client
            .download_range(offset, len, &self.conditions)
            .await
        {
            Ok(download) => {
                debug!(
                    "downloaded {} bytes at offset {offset} of {}",
                    download.data.len(),
                    download.file_size
                );
                self.last_known_size = Some(download.file_size);
                Ok(download.data)
            }
            Err(err) if is_invalid_range(&err) => {
                let props = self.client.get_properties(&self.conditions).await?;
                debug!("offset {offset} is past the end of file, size is {}", props.size);
                self.last_known_size = Some(props.size);
                Ok(Bytes::new())
            }
            Err(err) => Err(err),
        }
    }

    /// The file size, fetched from the service if nothing is known yet.
    pub async fn size(&mut self) -> Result<u64> {
        if let Some(size) = self.last_known_size {
            return Ok(size);
        }
        let props = self.client.get_properties(&self.conditions).await?;
        self.last_known_size = Some(props.size);
        Ok(props.size)
    }

    /// The most recently observed file size.
    pub fn last_known_size(&self) -> Option<u64> {
        self.last_known_size
    }
}
