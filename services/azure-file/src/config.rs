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

use std::fmt::{Debug, Formatter};

use fileshare_core::utils::Redact;
use fileshare_core::{Context, Error, Result};

use crate::connection_string;
use crate::constants::*;
use crate::Credential;

/// Config carries all the configuration for the Azure File service.
///
/// At most one credential kind may be set. The check runs in
/// [`Config::credential`], which clients call once at construction.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZURE_STORAGE_ACCOUNT_NAME`
    pub account_name: Option<String>,
    /// `account_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZURE_STORAGE_ACCOUNT_KEY`
    pub account_key: Option<String>,
    /// `sas_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZURE_STORAGE_SAS_TOKEN`
    pub sas_token: Option<String>,
    /// `bearer_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZURE_STORAGE_BEARER_TOKEN`
    pub bearer_token: Option<String>,
    /// The file service endpoint, like `https://account.file.core.windows.net`.
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZURE_STORAGE_FILE_ENDPOINT`
    pub endpoint: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .field("sas_token", &Redact::from(&self.sas_token))
            .field("bearer_token", &Redact::from(&self.bearer_token))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Config {
    /// Load config from env.
    ///
    /// Values already set on the config are kept.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let load = |slot: &mut Option<String>, key: &str| {
            if slot.is_none() {
                *slot = ctx.env_var(key).filter(|v| !v.is_empty());
            }
        };

        load(&mut self.account_name, AZURE_STORAGE_ACCOUNT_NAME);
        load(&mut self.account_key, AZURE_STORAGE_ACCOUNT_KEY);
        load(&mut self.sas_token, AZURE_STORAGE_SAS_TOKEN);
        load(&mut self.bearer_token, AZURE_STORAGE_BEARER_TOKEN);
        load(&mut self.endpoint, AZURE_STORAGE_FILE_ENDPOINT);

        self
    }

    /// Parses an [Azure connection string][1] into a configuration object.
    ///
    /// The connection string doesn't have to specify all required parameters
    /// because the user is still allowed to set them later directly on the object.
    ///
    /// An example of a connection string looks like:
    ///
    /// ```txt
    /// AccountName=mystorageaccount;
    /// AccountKey=Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==;
    /// FileEndpoint=https://mystorageaccount.file.core.windows.net
    /// ```
    ///
    /// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
    pub fn try_from_connection_string(conn_str: &str) -> Result<Self> {
        connection_string::parse(conn_str)
    }

    /// Resolve the single credential this config describes.
    ///
    /// Returns `Ok(None)` when no credential is configured, which means
    /// anonymous access. More than one credential kind is an error.
    pub fn credential(&self) -> Result<Option<Credential>> {
        let shared_key = self.account_key.is_some();
        let configured = [shared_key, self.sas_token.is_some(), self.bearer_token.is_some()]
            .into_iter()
            .filter(|v| *v)
            .count();
        if configured > 1 {
            return Err(Error::config_invalid(
                "only one of account key, sas token and bearer token can be configured",
            ));
        }

        if let Some(account_key) = &self.account_key {
            let Some(account_name) = &self.account_name else {
                return Err(Error::config_invalid(
                    "account name is required when account key is configured",
                ));
            };
            return Ok(Some(Credential::with_shared_key(account_name, account_key)));
        }
        if let Some(token) = &self.sas_token {
            return Ok(Some(Credential::with_sas_token(token)));
        }
        if let Some(token) = &self.bearer_token {
            return Ok(Some(Credential::with_bearer_token(token, None)));
        }
        Ok(None)
    }

    /// The configured endpoint, or the public cloud endpoint of the account.
    pub fn endpoint(&self) -> Result<String> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }
        match &self.account_name {
            Some(account_name) => Ok(format!("https://{account_name}.file.core.windows.net")),
            None => Err(Error::config_invalid(
                "either endpoint or account name must be configured",
            )),
        }
    }
}
