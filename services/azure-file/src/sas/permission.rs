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
//! Permission bitsets and their canonical string codec.
//!
//! Every set serializes its flags in one fixed, service defined order no
//! matter the order they were set in, and parses any order, any case and
//! repeated characters. A character outside the alphabet is rejected.

use std::fmt;
use std::fmt::Write;
use std::str::FromStr;

use fileshare_core::{Error, Result};

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident as $what:literal {
            $( $(#[$fmeta:meta])* $field:ident, $setter:ident = $ch:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            $( $field: bool, )+
        }

        impl $name {
            /// Create a set with no flag enabled.
            pub fn new() -> Self {
                Self::default()
            }

            $(
                $(#[$fmeta])*
                pub fn $field(&self) -> bool {
                    self.$field
                }

                #[doc = concat!("Enable or disable the `", $ch, "` flag.")]
                pub fn $setter(mut self, enabled: bool) -> Self {
                    self.$field = enabled;
                    self
                }
            )+

            /// Returns true when no flag is enabled.
            pub fn is_empty(&self) -> bool {
                $( !self.$field && )+ true
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                $(
                    if self.$field {
                        f.write_char($ch)?;
                    }
                )+
                Ok(())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let mut v = Self::default();
                for c in s.chars() {
                    match c.to_ascii_lowercase() {
                        $( $ch => v.$field = true, )+
                        _ => {
                            return Err(Error::request_invalid(format!(
                                "invalid {} character '{c}' in \"{s}\"",
                                $what
                            )))
                        }
                    }
                }
                Ok(v)
            }
        }
    };
}

flag_set! {
    /// Permissions of a service SAS scoped to a single file.
    ///
    /// Canonical order: `rcwd`.
    pub struct ShareFileSasPermission as "file permission" {
        /// Read the content, properties and metadata.
        read, with_read = 'r';
        /// Create a new file or copy a file to it.
        create, with_create = 'c';
        /// Write content, properties or metadata; resize the file.
        write, with_write = 'w';
        /// Delete the file.
        delete, with_delete = 'd';
    }
}

flag_set! {
    /// Permissions of a service SAS scoped to a whole share.
    ///
    /// Canonical order: `rcwdl`.
    pub struct ShareSasPermission as "share permission" {
        /// Read any file in the share.
        read, with_read = 'r';
        /// Create files in the share.
        create, with_create = 'c';
        /// Write any file in the share.
        write, with_write = 'w';
        /// Delete any file in the share.
        delete, with_delete = 'd';
        /// List files and directories in the share.
        list, with_list = 'l';
    }
}

flag_set! {
    /// Permissions of an account SAS.
    ///
    /// Canonical order: `rwdxlacuptfiy`.
    pub struct AccountSasPermission as "account permission" {
        /// Read.
        read, with_read = 'r';
        /// Write.
        write, with_write = 'w';
        /// Delete.
        delete, with_delete = 'd';
        /// Delete a version.
        delete_version, with_delete_version = 'x';
        /// List.
        list, with_list = 'l';
        /// Add.
        add, with_add = 'a';
        /// Create.
        create, with_create = 'c';
        /// Update.
        update, with_update = 'u';
        /// Process messages.
        process, with_process = 'p';
        /// Read and write tags.
        tag, with_tag = 't';
        /// Filter by tags.
        filter, with_filter = 'f';
        /// Set immutability policy.
        immutability_policy, with_immutability_policy = 'i';
        /// Permanently delete.
        permanent_delete, with_permanent_delete = 'y';
    }
}

flag_set! {
    /// Resource types an account SAS grants access to.
    ///
    /// Canonical order: `sco`.
    pub struct AccountSasResourceType as "resource type" {
        /// Service level APIs such as get/set service properties and list shares.
        service, with_service = 's';
        /// Share and directory level APIs.
        container, with_container = 'c';
        /// File level APIs.
        object, with_object = 'o';
    }
}

flag_set! {
    /// Services an account SAS grants access to.
    ///
    /// Canonical order: `bfqt`.
    pub struct AccountSasService as "service" {
        /// Blob service.
        blob, with_blob = 'b';
        /// File service.
        file, with_file = 'f';
        /// Queue service.
        queue, with_queue = 'q';
        /// Table service.
        table, with_table = 't';
    }
}
