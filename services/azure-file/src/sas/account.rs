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
use super::{AccountSasPermission, AccountSasResourceType, AccountSasService};
use crate::constants::{ACCOUNT_SAS_ENCRYPTION_SCOPE_VERSION, ACCOUNT_SAS_VERSION};
use crate::credential::decode_account_key;

/// Values used to sign an account SAS.
///
/// Refer to [Create an account SAS](https://learn.microsoft.com/en-us/rest/api/storageservices/create-account-sas).
#[derive(Debug, Clone)]
pub struct AccountSasSignatureValues {
    version: String,
    protocol: Option<SasProtocol>,
    start: Option<DateTime>,
    expiry: DateTime,
    permissions: AccountSasPermission,
    services: AccountSasService,
    resource_types: AccountSasResourceType,
    ip_range: Option<SasIpRange>,
    encryption_scope: Option<String>,
}

impl AccountSasSignatureValues {
    /// Create account SAS values with the required fields.
    pub fn new(
        expiry: DateTime,
        permissions: AccountSasPermission,
        services: AccountSasService,
        resource_types: AccountSasResourceType,
    ) -> Self {
        Self {
            version: ACCOUNT_SAS_VERSION.to_string(),
            protocol: None,
            start: None,
            expiry,
            permissions,
            services,
            resource_types,
            ip_range: None,
            encryption_scope: None,
        }
    }

    /// Set the time the SAS becomes valid.
    pub fn with_start(mut self, start: DateTime) -> Self {
        self.start = Some(start);
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

    /// Set the encryption scope. Only signed for versions that support it.
    pub fn with_encryption_scope(mut self, scope: impl Into<String>) -> Self {
        self.encryption_scope = Some(scope.into());
        self
    }

    fn signs_encryption_scope(&self) -> bool {
        // Versions are ISO dates, so lexical order is chronological.
        self.version.as_str() >= ACCOUNT_SAS_ENCRYPTION_SCOPE_VERSION
    }

    fn validate(&self) -> Result<()> {
        if self.permissions.is_empty() {
            return Err(Error::request_invalid("account sas requires at least one permission"));
        }
        if self.services.is_empty() {
            return Err(Error::request_invalid("account sas requires at least one service"));
        }
        if self.resource_types.is_empty() {
            return Err(Error::request_invalid(
                "account sas requires at least one resource type",
            ));
        }
        Ok(())
    }

    /// Build the canonical string-to-sign for the given account.
    pub fn string_to_sign(&self, account_name: &str) -> Result<String> {
        self.validate()?;

        let mut s = format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n",
            account_name,
            self.permissions,
            self.services,
            self.resource_types,
            self.start.map(format_iso8601).unwrap_or_default(),
            format_iso8601(self.expiry),
            or_empty(&self.ip_range),
            or_empty(&self.protocol),
            self.version,
        );
        if self.signs_encryption_scope() {
            s.push_str(&or_empty(&self.encryption_scope));
            s.push('\n');
        }
        Ok(s)
    }

    /// Sign with the account's shared key and return the query parameters.
    pub fn sign(&self, account_name: &str, account_key: &str) -> Result<SasQueryParameters> {
        let string_to_sign = self.string_to_sign(account_name)?;
        debug!("account sas string to sign: {:?}", &string_to_sign);

        let key = decode_account_key(account_key)?;
        let signature = base64_hmac_sha256(&key, string_to_sign.as_bytes());

        let mut params = SasQueryParameters::default();
        params.push("sv", self.version.clone());
        params.push("ss", self.services.to_string());
        params.push("srt", self.resource_types.to_string());
        params.push("spr", or_empty(&self.protocol));
        params.push("st", self.start.map(format_iso8601).unwrap_or_default());
        params.push("se", format_iso8601(self.expiry));
        params.push("sip", or_empty(&self.ip_range));
        params.push("sp", self.permissions.to_string());
        if self.signs_encryption_scope() {
            params.push("ses", or_empty(&self.encryption_scope));
        }
        params.push("sig", signature);

        Ok(params)
    }
}
