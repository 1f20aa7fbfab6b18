use chrono::{TimeDelta, TimeZone, Utc};
use fileshare_azure_file::sas::*;
use fileshare_azure_file::{RequestSigner, StaticCredentialProvider};
use fileshare_core::hash::base64_encode;
use fileshare_core::time::DateTime;
use fileshare_core::{Context, ErrorKind, Signer};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn test_time() -> DateTime {
    Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap()
}

fn account_key() -> String {
    base64_encode(b"key")
}

#[test]
fn test_file_permission_round_trip() {
    for bits in 0u8..16 {
        let p = ShareFileSasPermission::new()
            .with_read(bits & 1 != 0)
            .with_create(bits & 2 != 0)
            .with_write(bits & 4 != 0)
            .with_delete(bits & 8 != 0);
        let s = p.to_string();
        assert_eq!(s.parse::<ShareFileSasPermission>().unwrap(), p, "{s}");
    }

    for bits in 0u8..32 {
        let p = ShareSasPermission::new()
            .with_read(bits & 1 != 0)
            .with_create(bits & 2 != 0)
            .with_write(bits & 4 != 0)
            .with_delete(bits & 8 != 0)
            .with_list(bits & 16 != 0);
        let s = p.to_string();
        assert_eq!(s.parse::<ShareSasPermission>().unwrap(), p, "{s}");
    }
}

#[test_case("rcwd"; "canonical")]
#[test_case("dcwr"; "reversed")]
#[test_case("WDRC"; "upper case")]
#[test_case("rrccwwdd"; "duplicates")]
fn test_file_permission_canonical_order(input: &str) {
    let p: ShareFileSasPermission = input.parse().unwrap();
    assert_eq!(p.to_string(), "rcwd");
}

#[test_case("r"; "read")]
#[test_case("c"; "create")]
#[test_case("w"; "write")]
#[test_case("d"; "delete")]
fn test_single_file_permission(input: &str) {
    let p: ShareFileSasPermission = input.parse().unwrap();
    assert_eq!(p.to_string(), input);
}

#[test]
fn test_invalid_permissions_are_rejected() {
    let err = "rwaq".parse::<ShareFileSasPermission>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    let err = "rwaq".parse::<ShareSasPermission>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
}

#[test]
fn test_service_sas_is_deterministic() {
    let values = ShareServiceSasSignatureValues::new("share")
        .with_file_path("dir/file.txt")
        .with_file_permissions(ShareFileSasPermission::new().with_read(true))
        .with_start(test_time())
        .with_expiry(test_time() + TimeDelta::hours(1))
        .with_protocol(SasProtocol::Https)
        .with_ip_range("168.1.5.60-168.1.5.70".parse().unwrap())
        .with_cache_control("no-cache")
        .with_content_disposition("attachment")
        .with_content_encoding("gzip")
        .with_content_language("en-US")
        .with_content_type("text/csv");

    let first = values.sign("account", &account_key()).unwrap();
    let second = values.sign("account", &account_key()).unwrap();
    assert_eq!(first.encode(), second.encode());

    let later = values
        .clone()
        .with_expiry(test_time() + TimeDelta::hours(2))
        .sign("account", &account_key())
        .unwrap();
    assert_ne!(first.signature(), later.signature());

    let other_key = values.sign("account", &base64_encode(b"other")).unwrap();
    assert_ne!(first.signature(), other_key.signature());
}

#[test]
fn test_service_sas_token_round_trips() {
    let token = ShareServiceSasSignatureValues::new("share")
        .with_file_path("dir/file.txt")
        .with_permissions("rw")
        .with_expiry(test_time())
        .with_protocol(SasProtocol::HttpsHttp)
        .with_content_disposition("attachment; filename=\"a b.txt\"")
        .sign("account", &account_key())
        .unwrap();

    let encoded = token.encode();
    let parsed: SasQueryParameters = encoded.parse().unwrap();
    assert_eq!(parsed, token);
    assert_eq!(parsed.encode(), encoded);
    assert_eq!(parsed.expiry_time(), Some(test_time()));
    assert_eq!(parsed.protocol(), Some(SasProtocol::HttpsHttp));
    assert!(encoded.contains("spr=https%2Chttp"));
}

#[test]
fn test_identifier_scope_carries_no_explicit_fields() {
    let token = ShareServiceSasSignatureValues::new("share")
        .with_identifier("full-access")
        .sign("account", &account_key())
        .unwrap();

    let parsed: SasQueryParameters = token.encode().parse().unwrap();
    assert_eq!(parsed.identifier(), Some("full-access"));
    assert_eq!(parsed.permissions(), None);
    assert_eq!(parsed.expiry_time(), None);
    assert_eq!(parsed.start_time(), None);
    assert!(!token.encode().contains("sp="));
    assert!(!token.encode().contains("se="));
}

#[test]
fn test_explicit_scope_requires_expiry_and_permissions() {
    let err = ShareServiceSasSignatureValues::new("share")
        .with_permissions("r")
        .sign("account", &account_key())
        .unwrap_err();
    assert!(err.is_validation_error());

    let err = ShareServiceSasSignatureValues::new("share")
        .with_expiry(test_time())
        .sign("account", &account_key())
        .unwrap_err();
    assert!(err.is_validation_error());
}

#[test]
fn test_account_sas() {
    let token = AccountSasSignatureValues::new(
        test_time() + TimeDelta::minutes(5),
        "rwdlacu".parse().unwrap(),
        "bqtf".parse().unwrap(),
        "sco".parse().unwrap(),
    )
    .sign("account", &account_key())
    .unwrap();

    assert_eq!(
        token.to_string(),
        "sv=2018-11-09&ss=bfqt&srt=sco&se=2022-03-01T08%3A17%3A34Z&sp=rwdlacu&sig=9jgXWZQ6xhcMgfBH4bbLYHrJdjUdLLTavjzBU5iKh4I%3D"
    );
    assert_eq!(token.services(), Some("bfqt"));
    assert_eq!(token.resource_types(), Some("sco"));
}

#[tokio::test]
async fn test_signer_with_shared_key_query() {
    let signer = Signer::new(
        Context::new(),
        StaticCredentialProvider::new_shared_key("account", &account_key()),
        RequestSigner::new(),
    );

    let mut parts = http::Request::get("https://account.file.core.windows.net/share/file.txt")
        .body(())
        .unwrap()
        .into_parts()
        .0;
    signer
        .sign(&mut parts, Some(std::time::Duration::from_secs(300)))
        .await
        .unwrap();

    let query = parts.uri.query().unwrap();
    let token: SasQueryParameters = query.parse().unwrap();
    assert_eq!(token.services(), Some("f"));
    assert_eq!(token.resource_types(), Some("sco"));
    assert_eq!(token.permissions(), Some("rwdlc"));
    assert!(token.expiry_time().unwrap() > Utc::now());
}
