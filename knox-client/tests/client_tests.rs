//! Protocol client tests against a recording transport

mod common;

use common::RecordingTransport;
use knox_client::{
    Access, AccessType, Acl, Key, KeyVersion, KeyVersionList, KnoxClient, KnoxError,
    PrincipalType, ResponseCode, VersionStatus,
};
use reqwest::Method;

fn valid_acl() -> Acl {
    vec![Access::new(PrincipalType::User, "test", AccessType::Read)].into()
}

fn invalid_acl() -> Acl {
    vec![Access::new(
        PrincipalType::from_code(233),
        "test",
        AccessType::from_code(80927),
    )]
    .into()
}

#[tokio::test]
async fn test_get_key() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    let expected = Key {
        id: "testkey".to_string(),
        acl: Acl::new(),
        version_list: KeyVersionList::default(),
        version_hash: "VersionHash".to_string(),
        path: None,
    };
    transport.respond_ok(&expected);

    let key = client.get_key("testkey").await.unwrap();
    assert_eq!(key.id, expected.id);
    assert_eq!(key.acl.len(), expected.acl.len());
    assert_eq!(key.version_list.len(), expected.version_list.len());
    assert_eq!(key.version_hash, expected.version_hash);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].path, "/v0/keys/testkey/");
    assert!(requests[0].query.is_empty());
}

#[tokio::test]
async fn test_get_key_with_status() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_ok(Key {
        id: "testkey".to_string(),
        acl: Acl::new(),
        version_list: vec![
            KeyVersion::new(1, b"old".to_vec(), VersionStatus::Inactive),
            KeyVersion::new(2, b"new".to_vec(), VersionStatus::Primary),
        ]
        .into(),
        version_hash: String::new(),
        path: None,
    });

    let key = client
        .get_key_with_status("testkey", VersionStatus::Inactive)
        .await
        .unwrap();
    assert_eq!(key.version_list.len(), 2);

    let request = &transport.requests()[0];
    assert_eq!(request.path, "/v0/keys/testkey/");
    assert_eq!(
        request.query,
        vec![("status".to_string(), "\"Inactive\"".to_string())]
    );
}

#[tokio::test]
async fn test_get_keys_preserves_order() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_ok(vec!["a", "b", "c"]);

    let keys = client.get_keys([("y", "x")]).await.unwrap();
    assert_eq!(keys, vec!["a", "b", "c"]);

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/v0/keys/");
    assert_eq!(request.query, vec![("y".to_string(), "x".to_string())]);
}

#[tokio::test]
async fn test_get_keys_without_params() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_ok(Vec::<String>::new());

    let keys = client.get_keys(Vec::<(String, String)>::new()).await.unwrap();
    assert!(keys.is_empty());
    assert!(transport.requests()[0].query.is_empty());
}

#[tokio::test]
async fn test_create_key() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());

    let err = client
        .create_key("testkey", b"data", &invalid_acl())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(transport.request_count(), 0);

    transport.respond_ok(123_u64);
    let version = client.create_key("testkey", b"data", &valid_acl()).await.unwrap();
    assert_eq!(version, 123);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/v0/keys/");
    assert_eq!(request.form_value("id"), Some("testkey"));
    assert_eq!(request.form_value("data"), Some("ZGF0YQ=="));
    let acl: Acl = serde_json::from_str(request.form_value("acl").unwrap()).unwrap();
    assert_eq!(acl, valid_acl());
}

#[tokio::test]
async fn test_create_key_with_empty_acl() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_ok(1_u64);

    client.create_key("testkey", b"data", &Acl::new()).await.unwrap();
    assert_eq!(transport.requests()[0].form_value("acl"), Some("[]"));
}

#[tokio::test]
async fn test_create_key_duplicate_is_server_error() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_error(2, "Key identifier exists");

    let err = client
        .create_key("testkey", b"data", &valid_acl())
        .await
        .unwrap_err();
    assert!(!err.is_validation());
    assert_eq!(err.server_code(), Some(ResponseCode::KeyIdentifierExists));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_add_version() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_ok(123_u64);

    let version = client.add_version("testkey", b"data").await.unwrap();
    assert_eq!(version, 123);

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/v0/keys/testkey/versions/");
    assert_eq!(request.form_value("data"), Some("ZGF0YQ=="));
}

#[tokio::test]
async fn test_delete_key() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_ok("");

    client.delete_key("testkey").await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.path, "/v0/keys/testkey/");
    assert!(request.form.is_empty());
}

#[tokio::test]
async fn test_update_version() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());

    let err = client
        .update_version("testkey", 123, VersionStatus::from_code(2342))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(transport.request_count(), 0);

    transport.respond_ok("");
    client
        .update_version("testkey", 123, VersionStatus::Primary)
        .await
        .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.path, "/v0/keys/testkey/versions/123/");
    assert_eq!(request.form_value("status"), Some("\"Primary\""));
}

#[tokio::test]
async fn test_update_version_illegal_transition_is_server_error() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_error(11, "Primary key can only be demoted by promoting another key");

    let err = client
        .update_version("testkey", 1, VersionStatus::Inactive)
        .await
        .unwrap_err();
    match err {
        KnoxError::Server { code, message } => {
            assert_eq!(code, ResponseCode::BadRequestData);
            assert!(message.contains("Primary"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_put_access() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());

    let bad = Access::new(PrincipalType::from_code(233), "test", AccessType::from_code(80927));
    let err = client.put_access("testkey", &bad).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(transport.request_count(), 0);

    transport.respond_ok("");
    let good = Access::new(PrincipalType::User, "test", AccessType::Read);
    client.put_access("testkey", &good).await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.path, "/v0/keys/testkey/access/");
    let sent: Access = serde_json::from_str(request.form_value("access").unwrap()).unwrap();
    assert_eq!(sent, good);
}

#[tokio::test]
async fn test_get_acl() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_ok(valid_acl());

    let acl = client.get_acl("testkey").await.unwrap();
    assert_eq!(acl, valid_acl());
    assert_eq!(transport.requests()[0].path, "/v0/keys/testkey/access/");
}

#[tokio::test]
async fn test_bad_key_ids_never_reach_the_network() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());

    assert!(client.get_key("").await.unwrap_err().is_validation());
    assert!(client.delete_key("../admin").await.unwrap_err().is_validation());
    assert!(client.add_version("a b", b"x").await.unwrap_err().is_validation());
    assert!(client.get_acl("a?b").await.unwrap_err().is_validation());
    assert!(client.delete_key(".").await.unwrap_err().is_validation());
    assert!(client.delete_key("..").await.unwrap_err().is_validation());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_transport_failure_is_not_retried() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.fail_with("connection refused");
    transport.respond_ok("");

    let err = client.delete_key("testkey").await.unwrap_err();
    assert!(matches!(err, KnoxError::Transport(_)));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_mismatched_payload_is_decode_error() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_ok(vec!["not", "a", "number"]);
    transport.respond_raw("upstream timeout");

    assert!(matches!(
        client.add_version("testkey", b"data").await,
        Err(KnoxError::Decode(_))
    ));
    assert!(matches!(
        client.get_key("testkey").await,
        Err(KnoxError::Decode(_))
    ));
}

#[tokio::test]
async fn test_not_found() {
    let transport = RecordingTransport::new();
    let client = KnoxClient::new(transport.clone());
    transport.respond_error(4, "Key identifier does not exist");

    let err = client.get_key("missing").await.unwrap_err();
    assert!(err.is_not_found());
}
