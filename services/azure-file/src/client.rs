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

use async_trait::async_trait;
use bytes::Bytes;
use fileshare_core::time::parse_http_date;
use fileshare_core::utils::RedactUri;
use fileshare_core::{Context, Error, Result, Signer};
use http::header::{CONTENT_LENGTH, CONTENT_RANGE, ETAG, IF_MATCH, LAST_MODIFIED};
use http::{HeaderMap, Method, Request, Response};
use log::debug;
use percent_encoding::utf8_percent_encode;

use crate::constants::*;
use crate::provide_credential::ConfigCredentialProvider;
use crate::range::*;
use crate::{Config, Credential, RequestSigner};

/// A [`FileRangeClient`] talking to the Azure File REST API.
///
/// Every request is signed with the credential in the [`Config`] and sent
/// through the [`Context`]'s http client.
///
/// ```no_run
/// use fileshare_azure_file::{Config, ShareFileClient};
/// use fileshare_core::{Context, OsEnv};
/// use fileshare_http_send_reqwest::ReqwestHttpSend;
///
/// let ctx = Context::new()
///     .with_http_send(ReqwestHttpSend::default())
///     .with_env(OsEnv);
/// let config = Config::default().from_env(&ctx);
/// let client = ShareFileClient::new(ctx, &config, "share", "dir/report.csv").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ShareFileClient {
    url: String,
    signer: Signer<Credential>,
}

impl ShareFileClient {
    /// Build a client for `file_path` in `share_name`.
    ///
    /// The credential configuration is validated here.
    pub fn new(ctx: Context, config: &Config, share_name: &str, file_path: &str) -> Result<Self> {
        if share_name.is_empty() {
            return Err(Error::config_invalid("share name must not be empty"));
        }
        let file_path = file_path.trim_start_matches('/');
        if file_path.is_empty() {
            return Err(Error::config_invalid("file path must not be empty"));
        }

        let loader = ConfigCredentialProvider::new(config)?;
        let url = format!(
            "{}/{}/{}",
            config.endpoint()?,
            utf8_percent_encode(share_name, &PATH_ENCODE_SET),
            utf8_percent_encode(file_path, &PATH_ENCODE_SET)
        );

        Ok(Self {
            url,
            signer: Signer::new(ctx, loader, RequestSigner::new()),
        })
    }

    /// Url of the file, without any credential.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, method: Method, query: &str, conditions: &RequestConditions) -> http::request::Builder {
        let uri = if query.is_empty() {
            self.url.clone()
        } else {
            format!("{}?{}", self.url, query)
        };

        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(X_MS_VERSION, FILE_SERVICE_VERSION);
        if let Some(lease_id) = &conditions.lease_id {
            req = req.header(X_MS_LEASE_ID, lease_id);
        }
        if let Some(etag) = &conditions.if_match {
            req = req.header(IF_MATCH, etag);
        }
        req
    }

    async fn send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let (mut parts, body) = req.into_parts();
        self.signer.sign(&mut parts, None).await?;
        debug!("sending {} {}", parts.method, RedactUri(&parts.uri));

        let resp = self
            .signer
            .context()
            .http_send(Request::from_parts(parts, body))
            .await?;
        if resp.status().is_success() {
            return Ok(resp);
        }

        let code = resp
            .headers()
            .get(X_MS_ERROR_CODE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        Err(Error::service(resp.status(), code))
    }
}

#[async_trait]
impl FileRangeClient for ShareFileClient {
    async fn get_properties(&self, conditions: &RequestConditions) -> Result<FileProperties> {
        let req = self
            .request(Method::HEAD, "", conditions)
            .body(Bytes::new())?;
        let resp = self.send(req).await?;

        Ok(FileProperties {
            size: parse_content_length(resp.headers())?,
            etag: parse_etag(resp.headers()),
            last_modified: parse_last_modified(resp.headers())?,
        })
    }

    async fn create(&self, size: u64, conditions: &RequestConditions) -> Result<FileProperties> {
        let req = self
            .request(Method::PUT, "", conditions)
            .header(X_MS_TYPE, "file")
            .header(X_MS_CONTENT_LENGTH, size)
            .header(CONTENT_LENGTH, 0)
            .header(X_MS_FILE_ATTRIBUTES, "None")
            .header(X_MS_FILE_CREATION_TIME, "now")
            .header(X_MS_FILE_LAST_WRITE_TIME, "now")
            .header(X_MS_FILE_PERMISSION, "inherit")
            .body(Bytes::new())?;
        let resp = self.send(req).await?;

        Ok(FileProperties {
            size,
            etag: parse_etag(resp.headers()),
            last_modified: parse_last_modified(resp.headers())?,
        })
    }

    async fn upload_range(
        &self,
        offset: u64,
        data: Bytes,
        options: &UploadRangeOptions,
    ) -> Result<()> {
        if data.is_empty() {
            return Err(Error::request_invalid("upload range must not be empty"));
        }

        let req = self
            .request(Method::PUT, "comp=range", &options.conditions)
            .header(X_MS_RANGE, format_range(offset, data.len() as u64))
            .header(X_MS_WRITE, "update")
            .header(X_MS_FILE_LAST_WRITE_TIME, options.last_written_mode.as_str())
            .header(CONTENT_LENGTH, data.len())
            .body(data)?;
        self.send(req).await?;
        Ok(())
    }

    async fn download_range(
        &self,
        offset: u64,
        len: u64,
        conditions: &RequestConditions,
    ) -> Result<RangeDownload> {
        if len == 0 {
            return Err(Error::request_invalid("download range must not be empty"));
        }

        let req = self
            .request(Method::GET, "", conditions)
            .header(X_MS_RANGE, format_range(offset, len))
            .body(Bytes::new())?;
        let resp = self.send(req).await?;

        let file_size = match resp.headers().get(CONTENT_RANGE) {
            Some(v) => parse_content_range(v.to_str()?)?,
            None => parse_content_length(resp.headers())?,
        };
        Ok(RangeDownload {
            data: resp.into_body(),
            file_size,
        })
    }
}

/// Inclusive `x-ms-range` for `len` bytes at `offset`, clamped to `u64::MAX`.
fn format_range(offset: u64, len: u64) -> String {
    let end = offset.saturating_add(len.saturating_sub(1));
    format!("bytes={offset}-{end}")
}

/// Parse the total size out of `Content-Range: bytes 0-9/100`.
fn parse_content_range(v: &str) -> Result<u64> {
    let invalid = || Error::unexpected(format!("invalid content-range header: {v}"));

    let (_, total) = v
        .trim()
        .strip_prefix("bytes ")
        .and_then(|v| v.split_once('/'))
        .ok_or_else(invalid)?;
    total.parse().map_err(|e| invalid().with_source(e))
}

fn parse_content_length(headers: &HeaderMap) -> Result<u64> {
    let v = headers
        .get(CONTENT_LENGTH)
        .ok_or_else(|| Error::unexpected("response has no content-length header"))?
        .to_str()?;
    v.parse().map_err(|e| {
        Error::unexpected(format!("invalid content-length header: {v}")).with_source(e)
    })
}

fn parse_etag(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn parse_last_modified(headers: &HeaderMap) -> Result<Option<fileshare_core::time::DateTime>> {
    headers
        .get(LAST_MODIFIED)
        .map(|v| parse_http_date(v.to_str()?))
        .transpose()
}
