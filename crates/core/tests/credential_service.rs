use ixinventory_core::credential::{
    CredentialError, CredentialMap, CredentialRecord, CredentialResolver, CredentialSourceKind,
    FileCredentialSource, ResolverSettings, ServiceCredentialSource,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn file_source(dir: &tempfile::TempDir, entries: &[(&str, &str, &str)]) -> FileCredentialSource {
    let source = FileCredentialSource::new(dir.path().join("credentials.json"));
    let map: CredentialMap = entries
        .iter()
        .map(|(ip, user, pw)| (ip.to_string(), CredentialRecord::new(*ip, *user, *pw)))
        .collect();
    source.write_map(&map).expect("write credential file");
    source
}

fn resolver_for(server: &MockServer, file: FileCredentialSource, timeout: Duration) -> CredentialResolver {
    let service = ServiceCredentialSource::new(Some(format!("{}/credentials", server.uri())), timeout);
    CredentialResolver::new(
        ResolverSettings::new(Duration::from_secs(300), 0.5),
        Arc::new(service),
        Arc::new(file),
    )
}

#[tokio::test]
async fn test_service_credentials_are_resolved() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "credentials": [
                {"ip": "10.0.0.1", "username": "admin", "password": "p1"},
                {"ip": "10.0.0.4"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = resolver_for(
        &mock_server,
        file_source(&dir, &[("10.0.0.1", "file", "file")]),
        Duration::from_secs(2),
    );

    let found = resolver.resolve("10.0.0.1").await.unwrap();
    assert_eq!(found.username, "admin");
    assert_eq!(found.password, "p1");

    let defaults = resolver.resolve("10.0.0.4").await.unwrap();
    assert_eq!(defaults.username, "");

    assert_eq!(
        resolver.resolve("10.0.0.2").await,
        Err(CredentialError::NotFound("10.0.0.2".to_string()))
    );
}

#[tokio::test]
async fn test_server_error_falls_back_to_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = resolver_for(
        &mock_server,
        file_source(&dir, &[("10.0.0.7", "ops", "file-pw")]),
        Duration::from_secs(2),
    );

    let outcome = resolver.refresh().await;
    assert_eq!(outcome.source, CredentialSourceKind::File);
    assert_eq!(outcome.entries["10.0.0.7"].password, "file-pw");

    let status = resolver.status().await;
    assert!(!status.service_available);
    assert_eq!(status.source, Some(CredentialSourceKind::File));
    assert_eq!(status.chassis_count, 1);
}

#[tokio::test]
async fn test_unsuccessful_or_malformed_body_falls_back() {
    for body in [
        json!({"success": false, "credentials": []}),
        json!({"success": true}),
        json!(["10.0.0.1"]),
    ] {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver_for(
            &mock_server,
            file_source(&dir, &[("10.0.0.1", "file", "file")]),
            Duration::from_secs(2),
        );

        let outcome = resolver.refresh().await;
        assert_eq!(outcome.source, CredentialSourceKind::File);
        assert_eq!(outcome.entries["10.0.0.1"].username, "file");
    }
}

#[tokio::test]
async fn test_slow_service_times_out_to_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "credentials": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = resolver_for(
        &mock_server,
        file_source(&dir, &[("10.0.0.9", "slow", "path")]),
        Duration::from_millis(200),
    );

    let found = resolver.resolve("10.0.0.9").await.unwrap();
    assert_eq!(found.username, "slow");
}

#[tokio::test]
async fn test_cached_load_does_not_call_service_again() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "credentials": [{"ip": "10.0.0.1", "username": "admin", "password": "p1"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = resolver_for(&mock_server, file_source(&dir, &[]), Duration::from_secs(2));

    let first = resolver.load(false).await;
    let second = resolver.load(false).await;
    assert_eq!(first, second);
}
