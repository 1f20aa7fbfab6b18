use std::env;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{TimeDelta, Utc};
use fileshare_azure_file::sas::ShareServiceSasSignatureValues;
use fileshare_azure_file::*;
use fileshare_core::time::format_iso8601;
use fileshare_core::{Context, Error, OsEnv, Result, Signer};
use fileshare_http_send_reqwest::ReqwestHttpSend;
use log::warn;
use pretty_assertions::assert_eq;

struct Live {
    ctx: Context,
    config: Config,
    share: String,
}

fn init_live() -> Option<Live> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("FILESHARE_AZURE_FILE_TEST").unwrap_or_default() != "on" {
        warn!("FILESHARE_AZURE_FILE_TEST is not set, skipped");
        return None;
    }

    let config = Config {
        account_name: env::var("FILESHARE_AZURE_FILE_ACCOUNT_NAME").ok(),
        account_key: env::var("FILESHARE_AZURE_FILE_ACCOUNT_KEY").ok(),
        endpoint: env::var("FILESHARE_AZURE_FILE_ENDPOINT").ok(),
        ..Default::default()
    };
    let share = env::var("FILESHARE_AZURE_FILE_SHARE").expect("env FILESHARE_AZURE_FILE_SHARE must set");

    Some(Live {
        ctx: Context::new()
            .with_http_send(ReqwestHttpSend::default())
            .with_env(OsEnv),
        config,
        share,
    })
}

fn unique_path(prefix: &str) -> String {
    format!("{prefix}-{}.bin", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[tokio::test]
async fn test_live_write_then_read() -> Result<()> {
    let Some(live) = init_live() else {
        return Ok(());
    };

    let path = unique_path("channel");
    let client = Arc::new(ShareFileClient::new(
        live.ctx.clone(),
        &live.config,
        &live.share,
        &path,
    )?);

    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
    let mut writer = FileChannel::open_write(
        client.clone(),
        WriteOptions::overwrite(content.len() as u64).with_chunk_size(4096),
    )
    .await?;
    writer.write(&content).await?;
    writer.close().await?;

    let mut reader = FileChannel::open_read(client, ReadOptions::default().with_chunk_size(3000))?;
    assert_eq!(reader.size().await?, content.len() as u64);

    let mut out = Vec::new();
    let mut buf = vec![0; 1024];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, content);

    reader.seek(content.len() as u64 + 100).await?;
    assert_eq!(reader.read(&mut buf).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_live_read_with_service_sas() -> Result<()> {
    let Some(live) = init_live() else {
        return Ok(());
    };

    let path = unique_path("sas");
    let client = Arc::new(ShareFileClient::new(
        live.ctx.clone(),
        &live.config,
        &live.share,
        &path,
    )?);
    let mut writer = FileChannel::open_write(client, WriteOptions::overwrite(5)).await?;
    writer.write(b"hello").await?;
    writer.close().await?;

    let account_name = live.config.account_name.clone().unwrap_or_default();
    let account_key = live.config.account_key.clone().unwrap_or_default();
    let token = ShareServiceSasSignatureValues::new(&live.share)
        .with_file_path(&path)
        .with_permissions("r")
        .with_expiry(Utc::now() + TimeDelta::minutes(10))
        .sign(&account_name, &account_key)?;

    let sas_config = Config {
        account_name: Some(account_name),
        sas_token: Some(token.encode()),
        endpoint: live.config.endpoint.clone(),
        ..Default::default()
    };
    let sas_client = Arc::new(ShareFileClient::new(
        live.ctx.clone(),
        &sas_config,
        &live.share,
        &path,
    )?);

    let mut reader = FileChannel::open_read(sas_client.clone(), ReadOptions::default())?;
    let mut buf = [0; 5];
    assert_eq!(reader.read(&mut buf).await?, 5);
    assert_eq!(&buf, b"hello");

    // A read-only token cannot write.
    let err = sas_client
        .upload_range(0, Bytes::from_static(b"HELLO"), &UploadRangeOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_service_error());
    Ok(())
}

/// Send a request authorized with the account key.
async fn send_with_shared_key(
    live: &Live,
    method: http::Method,
    url: &str,
    body: Bytes,
) -> Result<http::Response<Bytes>> {
    let signer = Signer::new(
        live.ctx.clone(),
        StaticCredentialProvider::new_shared_key(
            live.config.account_name.as_deref().unwrap_or_default(),
            live.config.account_key.as_deref().unwrap_or_default(),
        ),
        RequestSigner::new(),
    );

    let req = http::Request::builder()
        .method(method)
        .uri(url)
        .header("x-ms-version", "2021-06-08")
        .header(http::header::CONTENT_LENGTH, body.len())
        .body(body)?;
    let (mut parts, body) = req.into_parts();
    signer.sign(&mut parts, None).await?;

    let resp = live
        .ctx
        .http_send(http::Request::from_parts(parts, body))
        .await?;
    if !resp.status().is_success() {
        return Err(Error::service(resp.status(), None));
    }
    Ok(resp)
}

/// Replace the stored access policies of the share.
async fn set_share_policies(live: &Live, policies: &[(&str, &str)]) -> Result<()> {
    let start = format_iso8601(Utc::now() - TimeDelta::minutes(5));
    let expiry = format_iso8601(Utc::now() + TimeDelta::hours(1));

    let mut body = String::from(r#"<?xml version="1.0" encoding="utf-8"?><SignedIdentifiers>"#);
    for (id, permissions) in policies {
        body.push_str(&format!(
            "<SignedIdentifier><Id>{id}</Id><AccessPolicy><Start>{start}</Start>\
             <Expiry>{expiry}</Expiry><Permission>{permissions}</Permission>\
             </AccessPolicy></SignedIdentifier>"
        ));
    }
    body.push_str("</SignedIdentifiers>");

    let url = format!(
        "{}/{}?restype=share&comp=acl",
        live.config.endpoint()?,
        live.share
    );
    send_with_shared_key(live, http::Method::PUT, &url, Bytes::from(body)).await?;
    Ok(())
}

/// Overwrites the stored access policies of the test share.
#[tokio::test]
async fn test_live_stored_policy_grants_create_and_delete() -> Result<()> {
    let Some(live) = init_live() else {
        return Ok(());
    };

    let policy_id = "fileshare-live-rcwdl";
    set_share_policies(&live, &[(policy_id, "rcwdl")]).await?;
    // The service takes up to 30 seconds to apply a new policy.
    tokio::time::sleep(Duration::from_secs(30)).await;

    let token = ShareServiceSasSignatureValues::new(&live.share)
        .with_identifier(policy_id)
        .sign(
            live.config.account_name.as_deref().unwrap_or_default(),
            live.config.account_key.as_deref().unwrap_or_default(),
        )?;
    assert_eq!(token.permissions(), None);
    assert_eq!(token.expiry_time(), None);

    let sas_config = Config {
        account_name: live.config.account_name.clone(),
        sas_token: Some(token.encode()),
        endpoint: live.config.endpoint.clone(),
        ..Default::default()
    };
    let path = unique_path("policy");
    let client = Arc::new(ShareFileClient::new(
        live.ctx.clone(),
        &sas_config,
        &live.share,
        &path,
    )?);

    let mut writer = FileChannel::open_write(client.clone(), WriteOptions::overwrite(5)).await?;
    writer.write(b"hello").await?;
    writer.close().await?;

    let delete = http::Request::delete(format!("{}?{}", client.url(), token))
        .header("x-ms-version", "2021-06-08")
        .body(Bytes::new())?;
    let resp = live.ctx.http_send(delete).await?;
    assert!(resp.status().is_success(), "delete failed: {}", resp.status());

    let err = client
        .get_properties(&RequestConditions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(http::StatusCode::NOT_FOUND));

    set_share_policies(&live, &[]).await?;
    Ok(())
}
