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

use fileshare_core::hash::base64_hmac_sha256;
use fileshare_core::time::{format_iso8601, DateTime};
use fileshare_core::{Error, Result};
use log::debug;

use super::{or_empty, SasIpRange, SasProtocol, SasQueryParameters};
use super::{ShareFileSasPermission, ShareSasPermission};
use crate::constants::SERVICE_SAS_VERSION;
use crate::credential::decode_account_key;

/// Values used to sign a service SAS for a share or for a single file in it.
///
/// The scope is either explicit (permissions + expiry, optional start) or a
/// reference to a stored access policy on the share through an identifier.
/// With an identifier alone the permission and time fields are signed as
/// empty placeholders and the service resolves them from the policy.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use fileshare_azure_file::sas::{ShareFileSasPermission, ShareServiceSasSignatureValues};
///
/// let token = ShareServiceSasSignatureValues::new("share")
///     .with_file_path("dir/report.csv")
///     .with_file_permissions(ShareFileSasPermission::new().with_read(true))
///     .with_expiry(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
///     .sign("account", "a2V5")
///     .unwrap();
/// assert_eq!(token.resource(), Some("f"));
/// ```
#[derive(Debug, Clone)]
pub struct ShareServiceSasSignatureValues {
    version: String,
    protocol: Option<SasProtocol>,
    start: Option<DateTime>,
    expiry: Option<DateTime>,
    permissions: Option<String>,
    ip_range: Option<SasIpRange>,
    identifier: Option<String>,
    share_name: String,
    file_path: Option<String>,
    cache_control: Option<String>,
    content_disposition: Option<String>,
    content_encoding: Option<String>,
    content_language: Option<String>,
    content_type: Option<String>,
}

impl ShareServiceSasSignatureValues {
    /// Start building a SAS scoped to the given share.
    pub fn new(share_name: impl Into<String>) -> Self {
        Self {
            version: SERVICE_SAS_VERSION.to_string(),
            protocol: None,
            start: None,
            expiry: None,
            permissions: None,
            ip_range: None,
            identifier: None,
            share_name: share_name.into(),
            file_path: None,
            cache_control: None,
            content_disposition: None,
            content_encoding: None,
            content_language: None,
            content_type: None,
        }
    }

    /// Narrow the scope to a file inside the share.
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Grant share level permissions.
    pub fn with_share_permissions(mut self, permissions: ShareSasPermission) -> Self {
        self.permissions = Some(permissions.to_string());
        self
    }

    /// Grant file level permissions.
    pub fn with_file_permissions(mut self, permissions: ShareFileSasPermission) -> Self {
        self.permissions = Some(permissions.to_string());
        self
    }

    /// Grant permissions given as a string such as `"rcw"`.
    ///
    /// The string is validated and put in canonical order when signing.
    pub fn with_permissions(mut self, permissions: impl Into<String>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }

    /// Set the time the SAS becomes valid.
    pub fn with_start(mut self, start: DateTime) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the time the SAS expires.
    pub fn with_expiry(mut self, expiry: DateTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Reference a stored access policy on the share.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Restrict the allowed protocols.
    pub fn with_protocol(mut self, protocol: SasProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Restrict the allowed client ip addresses.
    pub fn with_ip_range(mut self, ip_range: SasIpRange) -> Self {
        self.ip_range = Some(ip_range);
        self
    }

    /// Override the signed service version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Cache-Control header returned when the resource is read with this SAS.
    pub fn with_cache_control(mut self, v: impl Into<String>) -> Self {
        self.cache_control = Some(v.into());
        self
    }

    /// Content-Disposition header returned when the resource is read with this SAS.
    pub fn with_content_disposition(mut self, v: impl Into<String>) -> Self {
        self.content_disposition = Some(v.into());
        self
    }

    /// Content-Encoding header returned when the resource is read with this SAS.
    pub fn with_content_encoding(mut self, v: impl Into<String>) -> Self {
        self.content_encoding = Some(v.into());
        self
    }

    /// Content-Language header returned when the resource is read with this SAS.
    pub fn with_content_language(mut self, v: impl Into<String>) -> Self {
        self.content_language = Some(v.into());
        self
    }

    /// Content-Type header returned when the resource is read with this SAS.
    pub fn with_content_type(mut self, v: impl Into<String>) -> Self {
        self.content_type = Some(v.into());
        self
    }

    /// Check the scope and bring permissions into canonical order.
    fn canonical_permissions(&self) -> Result<Option<String>> {
        if self.share_name.is_empty() {
            return Err(Error::request_invalid("share name is required to sign a SAS"));
        }

        if self.identifier.is_none() {
            if self.expiry.is_none() {
                return Err(Error::request_invalid(
                    "expiry is required when no stored access policy identifier is set",
                ));
            }
            if self.permissions.as_deref().unwrap_or_default().is_empty() {
                return Err(Error::request_invalid(
                    "permissions are required when no stored access policy identifier is set",
                ));
            }
        }

        let Some(permissions) = self.permissions.as_deref().filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        let canonical = if self.file_path.is_some() {
            permissions.parse::<ShareFileSasPermission>()?.to_string()
        } else {
            permissions.parse::<ShareSasPermission>()?.to_string()
        };
        Ok(Some(canonical))
    }

    fn canonicalized_resource(&self, account_name: &str) -> String {
        match &self.file_path {
            Some(path) => format!(
                "/file/{}/{}/{}",
                account_name,
                self.share_name,
                path.replace('\\', "/").trim_start_matches('/')
            ),
            None => format!("/file/{}/{}", account_name, self.share_name),
        }
    }

    fn signed_resource(&self) -> &'static str {
        if self.file_path.is_some() {
            "f"
        } else {
            "s"
        }
    }

    /// Build the canonical string-to-sign.
    ///
    /// ## Format
    ///
    /// ```text
    /// signedPermissions + "\n" +
    /// signedStart + "\n" +
    /// signedExpiry + "\n" +
    /// canonicalizedResource + "\n" +
    /// signedIdentifier + "\n" +
    /// signedIP + "\n" +
    /// signedProtocol + "\n" +
    /// signedVersion + "\n" +
    /// rscc + "\n" +
    /// rscd + "\n" +
    /// rsce + "\n" +
    /// rscl + "\n" +
    /// rsct
    /// ```
    ///
    /// Absent fields keep their line as an empty string.
    pub fn string_to_sign(&self, account_name: &str) -> Result<String> {
        let permissions = self.canonical_permissions()?;

        Ok([
            permissions.unwrap_or_default(),
            self.start.map(format_iso8601).unwrap_or_default(),
            self.expiry.map(format_iso8601).unwrap_or_default(),
            self.canonicalized_resource(account_name),
            or_empty(&self.identifier),
            or_empty(&self.ip_range),
            or_empty(&self.protocol),
            self.version.clone(),
            or_empty(&self.cache_control),
            or_empty(&self.content_disposition),
            or_empty(&self.content_encoding),
            or_empty(&self.content_language),
            or_empty(&self.content_type),
        ]
        .join("\n"))
    }

    /// Sign with the account's shared key and return the query parameters.
    pub fn sign(&self, account_name: &str, account_key: &str) -> Result<SasQueryParameters> {
        let string_to_sign = self.string_to_sign(account_name)?;
        debug!("service sas string to sign: {:?}", &string_to_sign);

        let key = decode_account_key(account_key)?;
        let signature = base64_hmac_sha256(&key, string_to_sign.as_bytes());

        let mut params = SasQueryParameters::default();
        params.push("sv", self.version.clone());
        params.push("spr", or_empty(&self.protocol));
        params.push("st", self.start.map(format_iso8601).unwrap_or_default());
        params.push("se", self.expiry.map(format_iso8601).unwrap_or_default());
        params.push("sip", or_empty(&self.ip_range));
        params.push("si", or_empty(&self.identifier));
        params.push("sr", self.signed_resource());
        params.push("sp", self.canonical_permissions()?.unwrap_or_default());
        params.push("sig", signature);
        params.push("rscc", or_empty(&self.cache_control));
        params.push("rscd", or_empty(&self.content_disposition));
        params.push("rsce", or_empty(&self.content_encoding));
        params.push("rscl", or_empty(&self.content_language));
        params.push("rsct", or_empty(&self.content_type));

        Ok(params)
    }
}
