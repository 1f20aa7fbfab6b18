use std::sync::Arc;

use anyhow::Result;
use chrono::{TimeDelta, Utc};
use fileshare_azure_file::sas::ShareServiceSasSignatureValues;
use fileshare_azure_file::{Config, FileChannel, ShareFileClient, WriteOptions};
use fileshare_core::{Context, OsEnv};
use fileshare_http_send_reqwest::ReqwestHttpSend;

/// Upload a local file to a share and print a read-only link to it.
///
/// Usage: `upload_file <local path> <share> <remote path>`
#[tokio::main]
async fn main() -> Result<()> {
    let _ = env_logger::builder().try_init();

    let args: Vec<String> = std::env::args().collect();
    let [_, local, share, remote] = args.as_slice() else {
        anyhow::bail!("usage: upload_file <local path> <share> <remote path>");
    };

    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    // AZURE_STORAGE_ACCOUNT_NAME, AZURE_STORAGE_ACCOUNT_KEY and friends.
    let config = Config::default().from_env(&ctx);

    let content = tokio::fs::read(local).await?;
    let client = Arc::new(ShareFileClient::new(ctx, &config, share, remote)?);
    let url = client.url().to_string();

    let mut channel =
        FileChannel::open_write(client, WriteOptions::overwrite(content.len() as u64)).await?;
    channel.write(&content).await?;
    channel.close().await?;
    println!("uploaded {} bytes to {url}", content.len());

    if let (Some(account_name), Some(account_key)) = (&config.account_name, &config.account_key) {
        let token = ShareServiceSasSignatureValues::new(share.as_str())
            .with_file_path(remote.as_str())
            .with_permissions("r")
            .with_expiry(Utc::now() + TimeDelta::hours(1))
            .sign(account_name, account_key)?;
        println!("read-only link: {url}?{token}");
    }

    Ok(())
}
