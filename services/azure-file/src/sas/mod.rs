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
//! Shared Access Signature generation.
//!
//! Two independent signers live here:
//!
//! - [`AccountSasSignatureValues`] signs an account SAS scoped by service,
//!   resource type and account permissions.
//!   ([Azure documentation](https://learn.microsoft.com/en-us/rest/api/storageservices/create-account-sas))
//! - [`ShareServiceSasSignatureValues`] signs a service SAS scoped to a share
//!   or a single file, optionally through a stored access policy.
//!   ([Azure documentation](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas))
//!
//! Both only share the permission codecs in [`permission`] and the keyed hash
//! from `fileshare_core::hash`. Signing is a pure function of its inputs:
//! no clock is read, so the same values and key always yield the same token.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use fileshare_core::{Error, Result};

mod account;
pub use account::AccountSasSignatureValues;

pub mod permission;
pub use permission::{
    AccountSasPermission, AccountSasResourceType, AccountSasService, ShareFileSasPermission,
    ShareSasPermission,
};

mod query;
pub use query::SasQueryParameters;

mod service;
pub use service::ShareServiceSasSignatureValues;

/// Specifies the protocol permitted for a request made with the SAS ([Azure documentation](https://docs.microsoft.com/rest/api/storageservices/create-service-sas#specifying-the-http-protocol)).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SasProtocol {
    /// Only https requests are permitted.
    Https,
    /// Both https and http requests are permitted.
    HttpsHttp,
}

impl fmt::Display for SasProtocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SasProtocol::Https => write!(f, "https"),
            SasProtocol::HttpsHttp => write!(f, "https,http"),
        }
    }
}

impl FromStr for SasProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "https" => Ok(SasProtocol::Https),
            "https,http" | "http,https" => Ok(SasProtocol::HttpsHttp),
            v => Err(Error::request_invalid(format!("invalid SAS protocol: {v}"))),
        }
    }
}

/// An IP address, or an inclusive range of addresses, a SAS is restricted to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SasIpRange {
    start: IpAddr,
    end: Option<IpAddr>,
}

impl SasIpRange {
    /// Restrict to a single address.
    pub fn single(ip: IpAddr) -> Self {
        Self {
            start: ip,
            end: None,
        }
    }

    /// Restrict to the inclusive range `[start, end]`.
    pub fn range(start: IpAddr, end: IpAddr) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// First address of the range.
    pub fn start(&self) -> IpAddr {
        self.start
    }

    /// Last address of the range, if this is a range.
    pub fn end(&self) -> Option<IpAddr> {
        self.end
    }
}

impl fmt::Display for SasIpRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}", self.start),
        }
    }
}

impl FromStr for SasIpRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |v: &str| {
            IpAddr::from_str(v.trim())
                .map_err(|e| Error::request_invalid(format!("invalid SAS ip range: {s}")).with_source(e))
        };

        match s.split_once('-') {
            Some((start, end)) => Ok(Self::range(parse(start)?, parse(end)?)),
            None => Ok(Self::single(parse(s)?)),
        }
    }
}

/// Render an optional value as its canonical string, or the empty placeholder.
fn or_empty<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(|v| v.to_string()).unwrap_or_default()
}
