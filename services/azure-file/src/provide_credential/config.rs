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
use fileshare_core::{Context, ProvideCredential, Result};

use crate::{Config, Credential};

/// Provide the credential described by a [`Config`].
///
/// The config is validated when the provider is built, so conflicting
/// credentials fail before any request is made.
#[derive(Clone, Debug)]
pub struct ConfigCredentialProvider {
    credential: Option<Credential>,
}

impl ConfigCredentialProvider {
    /// Validate the config and build a provider from it.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            credential: config.credential()?,
        })
    }
}

#[async_trait]
impl ProvideCredential for ConfigCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(self.credential.clone())
    }
}
