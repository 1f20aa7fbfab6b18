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

use std::fmt::Write;
use std::time::Duration;

use async_trait::async_trait;
use fileshare_core::hash::base64_hmac_sha256;
use fileshare_core::time::{format_http_date, now, DateTime};
use fileshare_core::{Context, Error, Result, SignRequest, SigningMethod, SigningRequest};
use http::request::Parts;
use http::{header, HeaderName, HeaderValue};
use log::debug;
use percent_encoding::percent_encode;

use crate::constants::*;
use crate::credential::decode_account_key;
use crate::sas::{
    AccountSasPermission, AccountSasResourceType, AccountSasService, AccountSasSignatureValues,
};
use crate::Credential;

/// RequestSigner that implements the Azure File authorization schemes.
///
/// - [Authorize with Shared Key](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
/// - SAS tokens are appended to the query as they are.
/// - Bearer tokens are sent in the `Authorization` header.
///
/// Without a credential the request is left untouched and sent anonymously.
#[derive(Debug, Default)]
pub struct RequestSigner {
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new request signer.
    pub fn new() -> Self {
        Self { time: None }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            debug!("no credential configured, request is sent anonymously");
            return Ok(());
        };

        let method = match expires_in {
            Some(d) => SigningMethod::Query(d),
            None => SigningMethod::Header,
        };
        let now_time = self.time.unwrap_or_else(now);

        let mut ctx = SigningRequest::build(req)?;

        // Values parsed from the uri are decoded, so encode them again before
        // anything pre-encoded is appended.
        for (_, v) in ctx.query.iter_mut() {
            *v = percent_encode(v.as_bytes(), &AZURE_QUERY_ENCODE_SET).to_string();
        }

        match (cred, method) {
            (Credential::SasToken { token }, _) => {
                ctx.query_append(token);
            }
            (Credential::BearerToken { .. }, SigningMethod::Query(_)) => {
                return Err(Error::request_invalid(
                    "bearer token can't be used in query string",
                ));
            }
            (Credential::BearerToken { token, .. }, SigningMethod::Header) => {
                ctx.headers
                    .insert(X_MS_DATE, format_http_date(now_time).parse()?);
                ctx.headers
                    .insert(header::AUTHORIZATION, sensitive(format!("Bearer {token}"))?);
            }
            (
                Credential::SharedKey {
                    account_name,
                    account_key,
                },
                SigningMethod::Query(d),
            ) => {
                let expiry = now_time
                    + chrono::TimeDelta::from_std(d).map_err(|e| {
                        Error::request_invalid("signing duration is out of range").with_source(e)
                    })?;
                let token = AccountSasSignatureValues::new(
                    expiry,
                    AccountSasPermission::new()
                        .with_read(true)
                        .with_write(true)
                        .with_delete(true)
                        .with_list(true)
                        .with_create(true),
                    AccountSasService::new().with_file(true),
                    AccountSasResourceType::new()
                        .with_service(true)
                        .with_container(true)
                        .with_object(true),
                )
                .sign(account_name, account_key)?;
                ctx.query_append(&token.encode());
            }
            (
                Credential::SharedKey {
                    account_name,
                    account_key,
                },
                SigningMethod::Header,
            ) => {
                ctx.headers
                    .insert(X_MS_DATE, format_http_date(now_time).parse()?);
                let string_to_sign = string_to_sign(&ctx, account_name)?;
                let key = decode_account_key(account_key)?;
                let signature = base64_hmac_sha256(&key, string_to_sign.as_bytes());

                ctx.headers.insert(
                    header::AUTHORIZATION,
                    sensitive(format!("SharedKey {account_name}:{signature}"))?,
                );
            }
        }

        ctx.apply(req)
    }
}

fn sensitive(value: String) -> Result<HeaderValue> {
    let mut value: HeaderValue = value.parse()?;
    value.set_sensitive(true);
    Ok(value)
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// CanonicalizedHeaders +
/// CanonicalizedResource;
/// ```
///
/// ## Reference
///
/// - [Blob, Queue, and File Services (Shared Key authorization)](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
fn string_to_sign(ctx: &SigningRequest, account_name: &str) -> Result<String> {
    let mut s = String::with_capacity(128);

    writeln!(&mut s, "{}", ctx.method.as_str())?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_ENCODING)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_LANGUAGE)?)?;
    writeln!(&mut s, "{}", {
        let content_length = ctx.header_get_or_default(&header::CONTENT_LENGTH)?;
        if content_length == "0" {
            ""
        } else {
            content_length
        }
    })?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&HeaderName::from_static(CONTENT_MD5))?
    )?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_TYPE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::DATE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_MODIFIED_SINCE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_MATCH)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_NONE_MATCH)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_UNMODIFIED_SINCE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::RANGE)?)?;
    writeln!(&mut s, "{}", canonicalize_header(ctx)?)?;
    write!(&mut s, "{}", canonicalize_resource(ctx, account_name))?;

    debug!("string to sign: {:?}", &s);

    Ok(s)
}

/// ## Reference
///
/// - [Constructing the canonicalized headers string](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-headers-string)
fn canonicalize_header(ctx: &SigningRequest) -> Result<String> {
    Ok(SigningRequest::header_to_string(
        ctx.header_to_vec_with_prefix("x-ms-")?,
        ":",
        "\n",
    ))
}

/// ## Reference
///
/// - [Constructing the canonicalized resource string](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-resource-string)
fn canonicalize_resource(ctx: &SigningRequest, account_name: &str) -> String {
    if ctx.query.is_empty() {
        return format!("/{}{}", account_name, ctx.path);
    }

    let query = ctx
        .query
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();

    format!(
        "/{}{}\n{}",
        account_name,
        ctx.path,
        SigningRequest::query_to_percent_decoded_string(query, ":", "\n")
    )
}
