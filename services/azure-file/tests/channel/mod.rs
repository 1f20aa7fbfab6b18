use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use bytes::Bytes;
use fileshare_azure_file::*;
use fileshare_core::{ErrorKind, Result};
use pretty_assertions::assert_eq;

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn uploads(client: &MemoryFileClient) -> Vec<(u64, Bytes)> {
    client
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RangeCall::UploadRange { offset, data, .. } => Some((offset, data)),
            _ => None,
        })
        .collect()
}

fn downloads(client: &MemoryFileClient) -> usize {
    client
        .calls()
        .iter()
        .filter(|call| matches!(call, RangeCall::DownloadRange { .. }))
        .count()
}

#[tokio::test]
async fn test_copy_between_channels() -> Result<()> {
    let content = sample(10_000);
    let source = MemoryFileClient::with_content(content.clone());
    let target = MemoryFileClient::new();

    let mut reader = FileChannel::open_read(
        Arc::new(source.clone()),
        ReadOptions::default().with_chunk_size(1024),
    )?;
    let size = reader.size().await?;
    let mut writer = FileChannel::open_write(
        Arc::new(target.clone()),
        WriteOptions::overwrite(size).with_chunk_size(3000),
    )
    .await?;

    let mut buf = vec![0; 700];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write(&buf[..n]).await?;
    }
    reader.close().await?;
    writer.close().await?;

    assert_eq!(target.content(), Some(content));
    // Every upload but the last one is a full chunk.
    let uploads = uploads(&target);
    assert_eq!(uploads.len(), 4);
    assert!(uploads[..3].iter().all(|(_, data)| data.len() == 3000));
    assert_eq!(uploads[3], (9000, Bytes::from(sample(10_000)[9000..].to_vec())));
    Ok(())
}

#[tokio::test]
async fn test_read_at_end_makes_no_call() -> Result<()> {
    let client = MemoryFileClient::with_content(b"0123456789".to_vec());
    let mut channel = FileChannel::open_read(
        Arc::new(client.clone()),
        ReadOptions::default().with_chunk_size(4),
    )?;

    let mut out = Vec::new();
    let mut buf = [0; 3];
    loop {
        let n = channel.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, b"0123456789");

    let calls = client.calls().len();
    assert_eq!(channel.read(&mut buf).await?, 0);
    assert_eq!(channel.read(&mut buf).await?, 0);
    assert_eq!(client.calls().len(), calls);
    Ok(())
}

#[tokio::test]
async fn test_read_from_position_past_end() -> Result<()> {
    let client = MemoryFileClient::with_content(b"0123456789".to_vec());
    let mut channel = FileChannel::open_read(
        Arc::new(client.clone()),
        ReadOptions::default().with_initial_position(42),
    )?;

    let mut buf = [0; 8];
    assert_eq!(channel.read(&mut buf).await?, 0);
    // The failed range request teaches the channel the size.
    assert_eq!(channel.size().await?, 10);
    assert_eq!(downloads(&client), 1);

    channel.seek(6).await?;
    assert_eq!(channel.read(&mut buf).await?, 4);
    assert_eq!(&buf[..4], b"6789");
    Ok(())
}

#[tokio::test]
async fn test_seek_within_buffer_reuses_data() -> Result<()> {
    let client = MemoryFileClient::with_content(sample(64));
    let mut channel = FileChannel::open_read(
        Arc::new(client.clone()),
        ReadOptions::default().with_chunk_size(64),
    )?;

    let mut buf = [0; 16];
    channel.read(&mut buf).await?;
    channel.seek(40).await?;
    channel.read(&mut buf).await?;
    assert_eq!(buf.to_vec(), sample(64)[40..56].to_vec());
    channel.seek(0).await?;
    channel.read(&mut buf).await?;
    assert_eq!(buf.to_vec(), sample(64)[..16].to_vec());

    assert_eq!(downloads(&client), 1);
    Ok(())
}

#[tokio::test]
async fn test_write_past_declared_size_uploads_nothing() -> Result<()> {
    let client = MemoryFileClient::new();
    let mut channel = FileChannel::open_write(
        Arc::new(client.clone()),
        WriteOptions::overwrite(8).with_chunk_size(4),
    )
    .await?;

    channel.write(b"0123").await?;
    client.clear_calls();

    let err = channel.write(b"45678").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert_eq!(channel.position(), 4);
    assert!(client.calls().is_empty());

    let err = channel.seek(9).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    channel.write(b"4567").await?;
    channel.close().await?;
    assert_eq!(client.content(), Some(b"01234567".to_vec()));
    Ok(())
}

#[tokio::test]
async fn test_write_existing_file_with_lease() -> Result<()> {
    let client = MemoryFileClient::with_content(b"hello world".to_vec()).with_lease("lease");
    let conditions = RequestConditions::default().with_lease_id("lease");

    let mut channel = FileChannel::open_write(
        Arc::new(client.clone()),
        WriteOptions::existing()
            .with_conditions(conditions.clone())
            .with_last_written_mode(LastWrittenMode::Preserve)
            .with_initial_position(6),
    )
    .await?;
    assert_eq!(channel.size().await?, 11);

    channel.write(b"earth").await?;
    channel.close().await?;
    assert_eq!(client.content(), Some(b"hello earth".to_vec()));

    let expected = UploadRangeOptions {
        conditions,
        last_written_mode: LastWrittenMode::Preserve,
    };
    assert_eq!(
        uploads(&client),
        vec![(6, Bytes::from_static(b"earth"))],
    );
    assert!(client.calls().iter().any(|call| matches!(
        call,
        RangeCall::UploadRange { options, .. } if *options == expected
    )));
    Ok(())
}

#[tokio::test]
async fn test_write_without_lease_is_rejected() -> Result<()> {
    let client = MemoryFileClient::with_content(b"hello".to_vec()).with_lease("lease");

    let err = FileChannel::open_write(Arc::new(client.clone()), WriteOptions::existing())
        .await
        .unwrap_err();
    assert!(err.is_service_error());
    assert_eq!(client.content(), Some(b"hello".to_vec()));
    Ok(())
}

#[tokio::test]
async fn test_stale_etag_fails_read() -> Result<()> {
    let client = MemoryFileClient::with_content(b"hello".to_vec());
    let etag = client.etag();

    let mut writer = FileChannel::open_write(Arc::new(client.clone()), WriteOptions::existing())
        .await?;
    writer.write(b"HELLO").await?;
    writer.close().await?;

    let mut reader = FileChannel::open_read(
        Arc::new(client),
        ReadOptions::default().with_conditions(RequestConditions::default().with_if_match(etag)),
    )?;
    let mut buf = [0; 5];
    let err = reader.read(&mut buf).await.unwrap_err();
    assert!(err.is_service_error());
    Ok(())
}

#[tokio::test]
async fn test_closed_channel_rejects_io() -> Result<()> {
    let client = MemoryFileClient::with_content(b"hello".to_vec());
    let mut channel = FileChannel::open_read(Arc::new(client), ReadOptions::default())?;

    channel.close().await?;
    channel.close().await?;
    assert!(!channel.is_open());

    let mut buf = [0; 5];
    assert_eq!(
        channel.read(&mut buf).await.unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    assert_eq!(
        channel.seek(0).await.unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    Ok(())
}

#[test]
fn test_blocking_channel_with_std_io() -> Result<()> {
    let content = sample(5000);
    let source = MemoryFileClient::with_content(content.clone());
    let target = MemoryFileClient::new();

    let mut reader = BlockingFileChannel::open_read(
        Arc::new(source),
        ReadOptions::default().with_chunk_size(512),
    )?;
    let mut writer = BlockingFileChannel::open_write(
        Arc::new(target.clone()),
        WriteOptions::overwrite(content.len() as u64).with_chunk_size(2048),
    )?;

    let copied = std::io::copy(&mut reader, &mut writer).unwrap();
    assert_eq!(copied, content.len() as u64);
    writer.close()?;
    assert_eq!(target.content(), Some(content.clone()));

    assert_eq!(reader.seek(SeekFrom::End(-10)).unwrap(), 4990);
    let mut tail = Vec::new();
    reader.read_to_end(&mut tail).unwrap();
    assert_eq!(tail, content[4990..].to_vec());

    let err = reader.seek(SeekFrom::Current(-6000)).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    Ok(())
}

#[test]
fn test_blocking_write_past_size() -> Result<()> {
    let client = MemoryFileClient::new();
    let mut writer =
        BlockingFileChannel::open_write(Arc::new(client.clone()), WriteOptions::overwrite(4))?;

    writer.write_all(b"abcd").unwrap();
    let err = writer.write(b"e").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
    writer.flush().unwrap();
    assert_eq!(client.content(), Some(b"abcd".to_vec()));
    Ok(())
}
