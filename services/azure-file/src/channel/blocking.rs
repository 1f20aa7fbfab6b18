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

use std::io;
use std::sync::Arc;

use fileshare_core::{Error, ErrorKind, Result};
use tokio::runtime::{Builder, Runtime};

use super::{FileChannel, ReadOptions, WriteOptions};
use crate::range::FileRangeClient;

/// A blocking [`FileChannel`] implementing [`io::Read`], [`io::Write`] and [`io::Seek`].
///
/// Each call drives the async channel to completion on a private
/// current-thread runtime, so it must not be used from within an async
/// context.
#[derive(Debug)]
pub struct BlockingFileChannel {
    channel: FileChannel,
    runtime: Runtime,
}

impl BlockingFileChannel {
    /// Wrap an already opened channel.
    pub fn new(channel: FileChannel) -> Result<Self> {
        Ok(Self {
            channel,
            runtime: build_runtime()?,
        })
    }

    /// Open a blocking channel that reads the file.
    pub fn open_read(client: Arc<dyn FileRangeClient>, options: ReadOptions) -> Result<Self> {
        Self::new(FileChannel::open_read(client, options)?)
    }

    /// Open a blocking channel that writes the file.
    pub fn open_write(client: Arc<dyn FileRangeClient>, options: WriteOptions) -> Result<Self> {
        let runtime = build_runtime()?;
        let channel = runtime.block_on(FileChannel::open_write(client, options))?;
        Ok(Self { channel, runtime })
    }

    /// See [`FileChannel::position`].
    pub fn position(&self) -> u64 {
        self.channel.position()
    }

    /// See [`FileChannel::size`].
    pub fn size(&mut self) -> Result<u64> {
        self.runtime.block_on(self.channel.size())
    }

    /// See [`FileChannel::truncate`].
    pub fn truncate(&mut self, size: u64) -> Result<()> {
        self.runtime.block_on(self.channel.truncate(size))
    }

    /// See [`FileChannel::close`].
    pub fn close(&mut self) -> Result<()> {
        self.runtime.block_on(self.channel.close())
    }

    /// See [`FileChannel::is_open`].
    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    /// Return the inner async channel.
    pub fn into_inner(self) -> FileChannel {
        self.channel
    }
}

impl io::Read for BlockingFileChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.runtime
            .block_on(self.channel.read(buf))
            .map_err(to_io_error)
    }
}

impl io::Write for BlockingFileChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.runtime
            .block_on(self.channel.write(buf))
            .map_err(to_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.runtime
            .block_on(self.channel.flush())
            .map_err(to_io_error)
    }
}

impl io::Seek for BlockingFileChannel {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(n) => Some(n),
            io::SeekFrom::Current(delta) => self.channel.position().checked_add_signed(delta),
            io::SeekFrom::End(delta) => {
                let size = self.size().map_err(to_io_error)?;
                size.checked_add_signed(delta)
            }
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;

        self.runtime
            .block_on(self.channel.seek(target))
            .map_err(to_io_error)
    }
}

fn build_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::unexpected("failed to build runtime").with_source(e))
}

fn to_io_error(err: Error) -> io::Error {
    let kind = match err.kind() {
        ErrorKind::Unsupported => io::ErrorKind::Unsupported,
        ErrorKind::RequestInvalid | ErrorKind::ConfigInvalid => io::ErrorKind::InvalidInput,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, err)
}
