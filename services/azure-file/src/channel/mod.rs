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

//! A seekable byte channel over a remote file.
//!
//! The service only offers ranged uploads and downloads, so the channel
//! keeps one chunk of the file in memory and maps reads, writes and seeks
//! onto whole-chunk range calls. A channel is opened either for reading or
//! for writing and keeps that mode for its lifetime.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use fileshare_core::{Error, Result};
use log::{debug, warn};

use crate::range::{FileRangeClient, LastWrittenMode, RequestConditions, UploadRangeOptions};

mod read;
pub use read::ReadBehavior;

mod write;
pub use write::WriteBehavior;

mod blocking;
pub use blocking::BlockingFileChannel;

/// Default size of the in-memory chunk, 4 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Options for [`FileChannel::open_read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Bytes requested by each download.
    pub chunk_size: usize,
    /// Conditions sent with every call.
    pub conditions: RequestConditions,
    /// Position of the first read.
    pub initial_position: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            conditions: RequestConditions::default(),
            initial_position: 0,
        }
    }
}

impl ReadOptions {
    /// Set the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the request conditions.
    pub fn with_conditions(mut self, conditions: RequestConditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Set the initial position.
    pub fn with_initial_position(mut self, position: u64) -> Self {
        self.initial_position = position;
        self
    }
}

/// How the size of the file is established when opening for write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the file, replacing any existing one, with the given size.
    Overwrite {
        /// Declared size of the new file.
        size: u64,
    },
    /// Write into an existing file, keeping its current size.
    Existing,
}

/// Options for [`FileChannel::open_write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Bytes buffered before an upload is issued.
    pub chunk_size: usize,
    /// Conditions sent with every call.
    pub conditions: RequestConditions,
    /// Last write time handling for uploads.
    pub last_written_mode: LastWrittenMode,
    /// How the file size is established.
    pub mode: WriteMode,
    /// Position of the first write.
    pub initial_position: u64,
}

impl WriteOptions {
    /// Create the file with the given size and write into it.
    pub fn overwrite(size: u64) -> Self {
        Self::with_mode(WriteMode::Overwrite { size })
    }

    /// Write into an existing file.
    pub fn existing() -> Self {
        Self::with_mode(WriteMode::Existing)
    }

    fn with_mode(mode: WriteMode) -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            conditions: RequestConditions::default(),
            last_written_mode: LastWrittenMode::default(),
            mode,
            initial_position: 0,
        }
    }

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the request conditions.
    pub fn with_conditions(mut self, conditions: RequestConditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Set the last write time handling.
    pub fn with_last_written_mode(mut self, mode: LastWrittenMode) -> Self {
        self.last_written_mode = mode;
        self
    }

    /// Set the initial position.
    pub fn with_initial_position(mut self, position: u64) -> Self {
        self.initial_position = position;
        self
    }
}

/// The behavior a channel was opened with.
#[derive(Debug)]
pub enum ChannelMode {
    /// Read-only channel.
    Read(ReadBehavior),
    /// Write-only channel.
    Write(WriteBehavior),
}

/// A seekable channel over a remote file.
///
/// The channel is not synchronized. Callers that share it must serialize
/// access themselves. If a call is cancelled midway the buffer state is
/// undefined and the channel should be discarded.
///
/// Data written but not yet uploaded is lost unless [`FileChannel::flush`]
/// or [`FileChannel::close`] is called.
///
/// ```
/// use std::sync::Arc;
/// use fileshare_azure_file::{FileChannel, MemoryFileClient, ReadOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> fileshare_core::Result<()> {
/// let client = MemoryFileClient::with_content(b"hello world".to_vec());
/// let mut channel = FileChannel::open_read(Arc::new(client), ReadOptions::default())?;
///
/// channel.seek(6).await?;
/// let mut buf = [0; 16];
/// let n = channel.read(&mut buf).await?;
/// assert_eq!(&buf[..n], b"world");
/// assert_eq!(channel.read(&mut buf).await?, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileChannel {
    mode: ChannelMode,
    chunk_size: usize,
    position: u64,
    /// Offset of the first buffered byte.
    buffer_start: u64,
    /// Downloaded bytes in read mode.
    read_buffer: Bytes,
    /// Pending bytes in write mode.
    write_buffer: BytesMut,
    open: bool,
}

fn check_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::request_invalid("chunk size must be greater than zero"));
    }
    Ok(())
}

impl FileChannel {
    fn new(mode: ChannelMode, chunk_size: usize, position: u64) -> Self {
        Self {
            mode,
            chunk_size,
            position,
            buffer_start: position,
            read_buffer: Bytes::new(),
            write_buffer: BytesMut::new(),
            open: true,
        }
    }

    /// Open a channel that reads the file.
    ///
    /// No call is made until the first read.
    pub fn open_read(client: Arc<dyn FileRangeClient>, options: ReadOptions) -> Result<Self> {
        check_chunk_size(options.chunk_size)?;

        let behavior = ReadBehavior::new(client, options.conditions);
        Ok(Self::new(
            ChannelMode::Read(behavior),
            options.chunk_size,
            options.initial_position,
        ))
    }

    /// Open a channel that writes the file.
    ///
    /// With [`WriteMode::Overwrite`] the file is created with its final size
    /// before this returns.
    pub async fn open_write(
        client: Arc<dyn FileRangeClient>,
        options: WriteOptions,
    ) -> Result<Self> {
        check_chunk_size(options.chunk_size)?;

        let size = match options.mode {
            WriteMode::Overwrite { size } => {
                client.create(size, &options.conditions).await?;
                Some(size)
            }
            WriteMode::Existing => None,
        };

        let mut behavior = WriteBehavior::new(
            client,
            UploadRangeOptions {
                conditions: options.conditions,
                last_written_mode: options.last_written_mode,
            },
            size,
        );
        behavior
            .assert_can_seek(to_signed(options.initial_position)?)
            .await?;

        Ok(Self::new(
            ChannelMode::Write(behavior),
            options.chunk_size,
            options.initial_position,
        ))
    }

    /// The behavior this channel was opened with.
    pub fn mode(&self) -> &ChannelMode {
        &self.mode
    }

    /// Returns true until the channel is closed.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.open {
            return Err(Error::unsupported("channel is closed"));
        }
        Ok(())
    }

    /// The offset the next read or write starts at.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move to `position`.
    ///
    /// A read channel may seek past the end, where reads return nothing.
    /// A write channel flushes pending data and only accepts positions
    /// within the declared size.
    pub async fn seek(&mut self, position: u64) -> Result<u64> {
        self.ensure_open()?;

        match &mut self.mode {
            ChannelMode::Read(_) => {}
            ChannelMode::Write(behavior) => {
                behavior.assert_can_seek(to_signed(position)?).await?;
                self.flush_write_buffer().await?;
                self.buffer_start = position;
            }
        }

        self.position = position;
        Ok(position)
    }

    /// The size of the file.
    ///
    /// For a write channel this is the declared size.
    pub async fn size(&mut self) -> Result<u64> {
        self.ensure_open()?;

        match &mut self.mode {
            ChannelMode::Read(behavior) => behavior.size().await,
            ChannelMode::Write(behavior) => behavior.size().await,
        }
    }

    /// Changing the size of the file through a channel is not supported.
    pub async fn truncate(&mut self, size: u64) -> Result<()> {
        self.ensure_open()?;

        match &mut self.mode {
            ChannelMode::Read(_) => Err(Error::unsupported(
                "truncate is not supported on a channel opened for reading",
            )),
            ChannelMode::Write(behavior) => behavior.resize(size).await,
        }
    }

    /// Read into `buf`, returning the number of bytes read.
    ///
    /// Returns `0` at the end of the file.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;

        let ChannelMode::Read(behavior) = &mut self.mode else {
            return Err(Error::unsupported(
                "read is not supported on a channel opened for writing",
            ));
        };
        if buf.is_empty() {
            return Ok(0);
        }

        let buffer_end = self.buffer_start + self.read_buffer.len() as u64;
        if self.position < self.buffer_start || self.position >= buffer_end {
            if let Some(size) = behavior.last_known_size() {
                if self.position >= size {
                    return Ok(0);
                }
            }

            debug!("refilling read buffer at offset {}", self.position);
            self.read_buffer = behavior
                .read(self.position, self.chunk_size as u64)
                .await?;
            self.buffer_start = self.position;
            if self.read_buffer.is_empty() {
                return Ok(0);
            }
        }

        let offset = (self.position - self.buffer_start) as usize;
        let available = &self.read_buffer[offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n as u64;
        Ok(n)
    }

    /// Write `buf` at the current position, returning how many bytes were
    /// accepted.
    ///
    /// Data is uploaded once a full chunk is buffered. Writing past the
    /// declared size fails before anything is buffered. If an upload fails
    /// after part of `buf` went out, the accepted prefix is returned and the
    /// rest is left to the caller. If nothing was accepted the error is
    /// returned and the position is unchanged.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;

        let ChannelMode::Write(behavior) = &mut self.mode else {
            return Err(Error::unsupported(
                "write is not supported on a channel opened for reading",
            ));
        };

        let size = behavior.size().await?;
        let end = self.position + buf.len() as u64;
        if end > size {
            return Err(Error::unsupported(format!(
                "write of {} bytes at {} goes beyond the declared file size {size}",
                buf.len(),
                self.position
            )));
        }

        let mut accepted = 0;
        while accepted < buf.len() {
            let n = (self.chunk_size - self.write_buffer.len()).min(buf.len() - accepted);
            self.write_buffer.extend_from_slice(&buf[accepted..accepted + n]);
            self.position += n as u64;

            if self.write_buffer.len() == self.chunk_size {
                if let Err(err) = self.flush_write_buffer().await {
                    // Give back the bytes taken in this round; bytes buffered
                    // by earlier calls stay pending.
                    self.write_buffer.truncate(self.write_buffer.len() - n);
                    self.position -= n as u64;
                    if accepted == 0 {
                        return Err(err);
                    }
                    warn!(
                        "upload at offset {} failed after accepting {accepted} bytes: {err}",
                        self.buffer_start
                    );
                    return Ok(accepted);
                }
            }
            accepted += n;
        }

        Ok(accepted)
    }

    async fn flush_write_buffer(&mut self) -> Result<()> {
        let ChannelMode::Write(behavior) = &mut self.mode else {
            return Ok(());
        };

        if !self.write_buffer.is_empty() {
            let data = self.write_buffer.split().freeze();
            if let Err(err) = behavior.write(self.buffer_start, data.clone()).await {
                // Keep the data so a later flush can retry.
                self.write_buffer = BytesMut::from(&data[..]);
                return Err(err);
            }
        }
        self.buffer_start = self.position;
        Ok(())
    }

    /// Upload any pending data.
    pub async fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flush_write_buffer().await
    }

    /// Upload any pending data and close the channel.
    ///
    /// Closing a closed channel does nothing. If the final upload fails
    /// the channel stays open.
    pub async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }

        self.flush_write_buffer().await?;
        self.read_buffer = Bytes::new();
        self.open = false;
        Ok(())
    }
}

impl Drop for FileChannel {
    fn drop(&mut self) {
        if self.open && !self.write_buffer.is_empty() {
            warn!(
                "file channel dropped with {} bytes not uploaded, call close before dropping it",
                self.write_buffer.len()
            );
        }
    }
}

fn to_signed(position: u64) -> Result<i64> {
    i64::try_from(position)
        .map_err(|e| Error::request_invalid(format!("position {position} is too large")).with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryFileClient, RangeCall};
    use fileshare_core::ErrorKind;
    use http::StatusCode;
    use pretty_assertions::assert_eq;

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn uploads(client: &MemoryFileClient) -> Vec<(u64, usize)> {
        client
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                RangeCall::UploadRange { offset, data, .. } => Some((offset, data.len())),
                _ => None,
            })
            .collect()
    }

    fn downloads(client: &MemoryFileClient) -> Vec<(u64, u64)> {
        client
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                RangeCall::DownloadRange { offset, len, .. } => Some((offset, len)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_zero_chunk_size_is_rejected() {
        let client = Arc::new(MemoryFileClient::with_content(content(4)));

        let err = FileChannel::open_read(client.clone(), ReadOptions::default().with_chunk_size(0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);

        let err = FileChannel::open_write(client, WriteOptions::existing().with_chunk_size(0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }

    #[tokio::test]
    async fn test_read_is_served_from_buffer() {
        let _ = env_logger::builder().is_test(true).try_init();

        let data = content(25);
        let client = MemoryFileClient::with_content(data.clone());
        let mut channel = FileChannel::open_read(
            Arc::new(client.clone()),
            ReadOptions::default().with_chunk_size(10),
        )
        .unwrap();

        let mut out = Vec::new();
        let mut buf = [0; 4];
        loop {
            let n = channel.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }

        assert_eq!(out, data);
        assert_eq!(channel.position(), 25);
        assert_eq!(downloads(&client), vec![(0, 10), (10, 10), (20, 10)]);
    }

    #[tokio::test]
    async fn test_read_past_end_returns_available_then_eof() {
        let client = MemoryFileClient::with_content(b"0123456789".to_vec());
        let mut channel = FileChannel::open_read(
            Arc::new(client.clone()),
            ReadOptions::default().with_initial_position(7),
        )
        .unwrap();

        let mut buf = [0; 8];
        assert_eq!(channel.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], b"789");
        assert_eq!(channel.read(&mut buf).await.unwrap(), 0);
        assert_eq!(channel.read(&mut buf).await.unwrap(), 0);
        assert_eq!(downloads(&client).len(), 1);
    }

    #[tokio::test]
    async fn test_read_seek_past_end() {
        let client = MemoryFileClient::with_content(b"0123456789".to_vec());
        let mut channel =
            FileChannel::open_read(Arc::new(client.clone()), ReadOptions::default()).unwrap();

        assert_eq!(channel.seek(42).await.unwrap(), 42);
        let mut buf = [0; 8];
        assert_eq!(channel.read(&mut buf).await.unwrap(), 0);
        assert_eq!(channel.size().await.unwrap(), 10);

        // The size is now known, so reading at the end needs no call.
        client.clear_calls();
        channel.seek(10).await.unwrap();
        assert_eq!(channel.read(&mut buf).await.unwrap(), 0);
        assert!(client.calls().is_empty());

        channel.seek(2).await.unwrap();
        assert_eq!(channel.read(&mut buf).await.unwrap(), 8);
        assert_eq!(&buf, b"23456789");
    }

    #[tokio::test]
    async fn test_read_channel_rejects_writes() {
        let client = MemoryFileClient::with_content(b"abc".to_vec());
        let mut channel = FileChannel::open_read(Arc::new(client.clone()), ReadOptions::default())
            .unwrap();

        let err = channel.write(b"x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = channel.truncate(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(matches!(channel.mode(), ChannelMode::Read(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_write_flushes_full_chunks() {
        let client = MemoryFileClient::new();
        let data = content(25);
        let mut channel = FileChannel::open_write(
            Arc::new(client.clone()),
            WriteOptions::overwrite(25).with_chunk_size(10),
        )
        .await
        .unwrap();

        assert_eq!(channel.write(&data[..7]).await.unwrap(), 7);
        assert!(uploads(&client).is_empty());
        assert_eq!(channel.write(&data[7..]).await.unwrap(), 18);
        assert_eq!(uploads(&client), vec![(0, 10), (10, 10)]);

        channel.close().await.unwrap();
        assert_eq!(uploads(&client), vec![(0, 10), (10, 10), (20, 5)]);
        assert_eq!(client.content().unwrap(), data);
        assert!(!channel.is_open());
    }

    #[tokio::test]
    async fn test_write_forwards_conditions_and_mode() {
        let client = MemoryFileClient::with_content(vec![0; 16]).with_lease("lease-1");
        let conditions = RequestConditions::default().with_lease_id("lease-1");
        let mut channel = FileChannel::open_write(
            Arc::new(client.clone()),
            WriteOptions::existing()
                .with_conditions(conditions.clone())
                .with_last_written_mode(LastWrittenMode::Preserve)
                .with_initial_position(4),
        )
        .await
        .unwrap();

        channel.write(b"abcdef").await.unwrap();
        channel.flush().await.unwrap();

        let last = client.calls().pop().unwrap();
        assert_eq!(
            last,
            RangeCall::UploadRange {
                offset: 4,
                data: Bytes::from_static(b"abcdef"),
                options: UploadRangeOptions {
                    conditions,
                    last_written_mode: LastWrittenMode::Preserve,
                },
            }
        );
    }

    #[tokio::test]
    async fn test_write_seek_flushes_and_checks_bounds() {
        let client = MemoryFileClient::new();
        let mut channel =
            FileChannel::open_write(Arc::new(client.clone()), WriteOptions::overwrite(10))
                .await
                .unwrap();

        channel.write(b"ab").await.unwrap();
        channel.seek(8).await.unwrap();
        assert_eq!(uploads(&client), vec![(0, 2)]);
        channel.write(b"yz").await.unwrap();

        let err = channel.seek(11).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(channel.position(), 10);

        let err = channel.write(b"!").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        channel.close().await.unwrap();
        assert_eq!(client.content().unwrap(), b"ab\0\0\0\0\0\0yz".to_vec());
    }

    #[tokio::test]
    async fn test_open_write_beyond_size() {
        let client = MemoryFileClient::with_content(vec![0; 4]);
        let err = FileChannel::open_write(
            Arc::new(client),
            WriteOptions::existing().with_initial_position(5),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_truncate_is_rejected() {
        let client = MemoryFileClient::new();
        let mut channel =
            FileChannel::open_write(Arc::new(client.clone()), WriteOptions::overwrite(10))
                .await
                .unwrap();

        for size in [0, 5, 10, 20] {
            let err = channel.truncate(size).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unsupported);
        }
        assert_eq!(channel.size().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_data() {
        let client = MemoryFileClient::new();
        let mut channel =
            FileChannel::open_write(Arc::new(client.clone()), WriteOptions::overwrite(4))
                .await
                .unwrap();
        channel.write(b"abcd").await.unwrap();

        client.fail_next(Error::service(
            StatusCode::SERVICE_UNAVAILABLE,
            Some("ServerBusy".to_string()),
        ));
        let err = channel.close().await.unwrap_err();
        assert!(err.is_service_error());
        assert!(channel.is_open());

        channel.close().await.unwrap();
        assert_eq!(client.content().unwrap(), b"abcd".to_vec());
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let client = MemoryFileClient::with_content(b"abc".to_vec());
        let mut channel =
            FileChannel::open_read(Arc::new(client.clone()), ReadOptions::default()).unwrap();

        channel.close().await.unwrap();
        channel.close().await.unwrap();
        assert!(!channel.is_open());

        let mut buf = [0; 3];
        let err = channel.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = channel.seek(0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(client.calls().is_empty());
    }

    fn server_busy() -> Error {
        Error::service(
            StatusCode::SERVICE_UNAVAILABLE,
            Some("ServerBusy".to_string()),
        )
    }

    /// Fails the first upload at `offset`, delegating everything else.
    #[derive(Debug)]
    struct FailUploadAt {
        inner: MemoryFileClient,
        offset: u64,
        failed: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl FileRangeClient for FailUploadAt {
        async fn get_properties(
            &self,
            conditions: &RequestConditions,
        ) -> Result<crate::range::FileProperties> {
            self.inner.get_properties(conditions).await
        }

        async fn create(
            &self,
            size: u64,
            conditions: &RequestConditions,
        ) -> Result<crate::range::FileProperties> {
            self.inner.create(size, conditions).await
        }

        async fn upload_range(
            &self,
            offset: u64,
            data: Bytes,
            options: &UploadRangeOptions,
        ) -> Result<()> {
            if offset == self.offset
                && !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst)
            {
                return Err(server_busy());
            }
            self.inner.upload_range(offset, data, options).await
        }

        async fn download_range(
            &self,
            offset: u64,
            len: u64,
            conditions: &RequestConditions,
        ) -> Result<crate::range::RangeDownload> {
            self.inner.download_range(offset, len, conditions).await
        }
    }

    #[tokio::test]
    async fn test_failed_upload_rejects_whole_write() {
        let client = MemoryFileClient::new();
        let mut channel = FileChannel::open_write(
            Arc::new(client.clone()),
            WriteOptions::overwrite(8).with_chunk_size(4),
        )
        .await
        .unwrap();

        client.fail_next(server_busy());
        let err = channel.write(b"abcdefgh").await.unwrap_err();
        assert!(err.is_service_error());
        assert_eq!(channel.position(), 0);

        assert_eq!(channel.write(b"abcdefgh").await.unwrap(), 8);
        channel.close().await.unwrap();
        assert_eq!(client.content().unwrap(), b"abcdefgh".to_vec());
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_earlier_pending_bytes() {
        let client = MemoryFileClient::new();
        let mut channel = FileChannel::open_write(
            Arc::new(client.clone()),
            WriteOptions::overwrite(8).with_chunk_size(4),
        )
        .await
        .unwrap();

        assert_eq!(channel.write(b"ab").await.unwrap(), 2);
        client.fail_next(server_busy());
        channel.write(b"cdefgh").await.unwrap_err();
        assert_eq!(channel.position(), 2);

        assert_eq!(channel.write(b"cdefgh").await.unwrap(), 6);
        channel.close().await.unwrap();
        assert_eq!(client.content().unwrap(), b"abcdefgh".to_vec());
        // The failed upload is recorded too.
        assert_eq!(uploads(&client), vec![(0, 4), (0, 4), (4, 4)]);
    }

    #[tokio::test]
    async fn test_failed_upload_returns_short_write() {
        let memory = MemoryFileClient::new();
        let client = FailUploadAt {
            inner: memory.clone(),
            offset: 4,
            failed: Default::default(),
        };
        let mut channel = FileChannel::open_write(
            Arc::new(client),
            WriteOptions::overwrite(12).with_chunk_size(4),
        )
        .await
        .unwrap();

        let data = b"abcdefghijkl";
        let n = channel.write(data).await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(channel.position(), 4);

        assert_eq!(channel.write(&data[n..]).await.unwrap(), 8);
        channel.close().await.unwrap();
        assert_eq!(memory.content().unwrap(), data.to_vec());
    }
}
