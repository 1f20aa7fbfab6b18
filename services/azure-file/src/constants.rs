use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

// Headers used by the file service.
pub const X_MS_DATE: &str = "x-ms-date";
pub const X_MS_VERSION: &str = "x-ms-version";
pub const X_MS_RANGE: &str = "x-ms-range";
pub const X_MS_WRITE: &str = "x-ms-write";
pub const X_MS_TYPE: &str = "x-ms-type";
pub const X_MS_CONTENT_LENGTH: &str = "x-ms-content-length";
pub const X_MS_LEASE_ID: &str = "x-ms-lease-id";
pub const X_MS_ERROR_CODE: &str = "x-ms-error-code";
pub const X_MS_FILE_ATTRIBUTES: &str = "x-ms-file-attributes";
pub const X_MS_FILE_CREATION_TIME: &str = "x-ms-file-creation-time";
pub const X_MS_FILE_LAST_WRITE_TIME: &str = "x-ms-file-last-write-time";
pub const X_MS_FILE_PERMISSION: &str = "x-ms-file-permission";
pub const CONTENT_MD5: &str = "content-md5";

/// REST version sent with every file service request.
pub const FILE_SERVICE_VERSION: &str = "2021-06-08";

/// Version used when signing service SAS tokens.
pub const SERVICE_SAS_VERSION: &str = "2021-06-08";

/// Version used when signing account SAS tokens.
pub const ACCOUNT_SAS_VERSION: &str = "2018-11-09";

/// Account SAS versions from this one on carry an encryption scope line.
pub const ACCOUNT_SAS_ENCRYPTION_SCOPE_VERSION: &str = "2020-12-06";

// Env values used by the file service config.
pub const AZURE_STORAGE_ACCOUNT_NAME: &str = "AZURE_STORAGE_ACCOUNT_NAME";
pub const AZURE_STORAGE_ACCOUNT_KEY: &str = "AZURE_STORAGE_ACCOUNT_KEY";
pub const AZURE_STORAGE_SAS_TOKEN: &str = "AZURE_STORAGE_SAS_TOKEN";
pub const AZURE_STORAGE_BEARER_TOKEN: &str = "AZURE_STORAGE_BEARER_TOKEN";
pub const AZURE_STORAGE_FILE_ENDPOINT: &str = "AZURE_STORAGE_FILE_ENDPOINT";

/// Encode set for query values in signed requests.
pub static AZURE_QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'/')
    .remove(b'~');

/// Encode set for SAS token values: only RFC 3986 unreserved characters stay as is.
pub static SAS_QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Encode set for file and directory paths in request uris.
pub static PATH_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'/')
    .remove(b'~');
