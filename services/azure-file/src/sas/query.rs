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
use std::fmt;
use std::str::FromStr;

use fileshare_core::time::{parse_iso8601, DateTime};
use fileshare_core::utils::Redact;
use fileshare_core::{Error, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode};

use super::{SasIpRange, SasProtocol};
use crate::constants::SAS_QUERY_ENCODE_SET;

/// The signed query parameters of a shared access signature.
///
/// Produced by the signers or parsed from an existing token. The signing key
/// can never be recovered from it; it only carries what must be attached to
/// a request url.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SasQueryParameters {
    version: Option<String>,
    services: Option<String>,
    resource_types: Option<String>,
    protocol: Option<String>,
    start: Option<String>,
    expiry: Option<String>,
    ip_range: Option<String>,
    identifier: Option<String>,
    resource: Option<String>,
    permissions: Option<String>,
    encryption_scope: Option<String>,
    signature: Option<String>,
    cache_control: Option<String>,
    content_disposition: Option<String>,
    content_encoding: Option<String>,
    content_language: Option<String>,
    content_type: Option<String>,
    unknown: Vec<(String, String)>,
}

impl SasQueryParameters {
    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        let slot = match key {
            "sv" => &mut self.version,
            "ss" => &mut self.services,
            "srt" => &mut self.resource_types,
            "spr" => &mut self.protocol,
            "st" => &mut self.start,
            "se" => &mut self.expiry,
            "sip" => &mut self.ip_range,
            "si" => &mut self.identifier,
            "sr" => &mut self.resource,
            "sp" => &mut self.permissions,
            "ses" => &mut self.encryption_scope,
            "sig" => &mut self.signature,
            "rscc" => &mut self.cache_control,
            "rscd" => &mut self.content_disposition,
            "rsce" => &mut self.content_encoding,
            "rscl" => &mut self.content_language,
            "rsct" => &mut self.content_type,
            _ => return None,
        };
        Some(slot)
    }

    /// Set a parameter by its query key. Empty values are treated as absent.
    pub(crate) fn push(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }

        match self.slot(key) {
            Some(slot) => *slot = Some(value),
            None => self.unknown.push((key.to_string(), value)),
        }
    }

    /// All present parameters in encoding order, values not yet encoded.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let known = [
            ("sv", &self.version),
            ("ss", &self.services),
            ("srt", &self.resource_types),
            ("spr", &self.protocol),
            ("st", &self.start),
            ("se", &self.expiry),
            ("sip", &self.ip_range),
            ("si", &self.identifier),
            ("sr", &self.resource),
            ("sp", &self.permissions),
            ("ses", &self.encryption_scope),
            ("sig", &self.signature),
            ("rscc", &self.cache_control),
            ("rscd", &self.content_disposition),
            ("rsce", &self.content_encoding),
            ("rscl", &self.content_language),
            ("rsct", &self.content_type),
        ];

        known
            .into_iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k, v)))
            .chain(self.unknown.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .collect()
    }

    /// Encode into a url query string without leading `?`.
    pub fn encode(&self) -> String {
        self.pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, &SAS_QUERY_ENCODE_SET)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Service version the token was signed with (`sv`).
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Account SAS services (`ss`).
    pub fn services(&self) -> Option<&str> {
        self.services.as_deref()
    }

    /// Account SAS resource types (`srt`).
    pub fn resource_types(&self) -> Option<&str> {
        self.resource_types.as_deref()
    }

    /// Allowed protocols (`spr`).
    pub fn protocol(&self) -> Option<SasProtocol> {
        self.protocol.as_deref().and_then(|v| v.parse().ok())
    }

    /// Start of the validity window (`st`).
    pub fn start_time(&self) -> Option<DateTime> {
        self.start.as_deref().and_then(|v| parse_iso8601(v).ok())
    }

    /// End of the validity window (`se`).
    pub fn expiry_time(&self) -> Option<DateTime> {
        self.expiry.as_deref().and_then(|v| parse_iso8601(v).ok())
    }

    /// Allowed ip range (`sip`).
    pub fn ip_range(&self) -> Option<SasIpRange> {
        self.ip_range.as_deref().and_then(|v| v.parse().ok())
    }

    /// Stored access policy identifier (`si`).
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Signed resource: `s` for a share, `f` for a file (`sr`).
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Permission string (`sp`).
    pub fn permissions(&self) -> Option<&str> {
        self.permissions.as_deref()
    }

    /// Encryption scope of an account SAS (`ses`).
    pub fn encryption_scope(&self) -> Option<&str> {
        self.encryption_scope.as_deref()
    }

    /// Base64 signature (`sig`).
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Cache-Control response override (`rscc`).
    pub fn cache_control(&self) -> Option<&str> {
        self.cache_control.as_deref()
    }

    /// Content-Disposition response override (`rscd`).
    pub fn content_disposition(&self) -> Option<&str> {
        self.content_disposition.as_deref()
    }

    /// Content-Encoding response override (`rsce`).
    pub fn content_encoding(&self) -> Option<&str> {
        self.content_encoding.as_deref()
    }

    /// Content-Language response override (`rscl`).
    pub fn content_language(&self) -> Option<&str> {
        self.content_language.as_deref()
    }

    /// Content-Type response override (`rsct`).
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl fmt::Debug for SasQueryParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SasQueryParameters")
            .field("version", &self.version)
            .field("resource", &self.resource)
            .field("permissions", &self.permissions)
            .field("identifier", &self.identifier)
            .field("start", &self.start)
            .field("expiry", &self.expiry)
            .field("signature", &Redact::from(&self.signature))
            .finish_non_exhaustive()
    }
}

impl fmt::Display for SasQueryParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for SasQueryParameters {
    type Err = Error;

    /// Parse an encoded token such as `sv=...&sp=r&sig=...`.
    ///
    /// Keys are matched case-insensitively, unknown keys are kept in order
    /// and typed fields are validated.
    fn from_str(s: &str) -> Result<Self> {
        let mut params = SasQueryParameters::default();

        for pair in s.trim().trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = percent_decode_str(value)
                .decode_utf8()
                .map_err(|e| {
                    Error::request_invalid(format!("SAS parameter {key} is not valid utf-8"))
                        .with_source(e)
                })?
                .into_owned();
            params.push(&key.to_lowercase(), value);
        }

        if let Some(v) = &params.start {
            parse_iso8601(v)?;
        }
        if let Some(v) = &params.expiry {
            parse_iso8601(v)?;
        }
        if let Some(v) = &params.protocol {
            v.parse::<SasProtocol>()?;
        }
        if let Some(v) = &params.ip_range {
            v.parse::<SasIpRange>()?;
        }
        if params.signature.is_none() {
            return Err(Error::request_invalid("SAS token without signature"));
        }

        Ok(params)
    }
}
