use super::github::{decode_content_blob, github_api_url};
use super::local::{LocalKind, classify, load_extracted_manifest};
use super::*;
use crate::archive;
use crate::core::{AppsRoot, ErrorKind};
use crate::test_utils::http::{github_blob, github_error, json_response};
use crate::test_utils::{MockHttpClient, TarBuilder, manifest_json, sample_app_tar};
use serde_json::json;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

const MANIFEST_URL: &str = "https://github.com/acme/apps/blob/master/clock/clock.manifest";
const MANIFEST_API: &str = "https://api.github.com/repos/acme/apps/contents/clock/clock.manifest";
const APP_JS_API: &str = "https://api.github.com/repos/acme/apps/contents/clock/app.js";

fn clock_manifest(version: &str) -> serde_json::Value {
    json!({"name": "clock", "version": version, "files": ["clock.manifest", "app.js"]})
}

fn github_with(client: &Arc<MockHttpClient>) -> GithubSource {
    GithubSource::new(client.clone(), None)
}

#[test]
fn test_github_api_url_rewrite() {
    assert_eq!(github_api_url(MANIFEST_URL).unwrap(), MANIFEST_API);
    assert_eq!(
        github_api_url("https://github.com/acme/apps/tree/dev/clock/lib/app.js").unwrap(),
        "https://api.github.com/repos/acme/apps/contents/clock/lib/app.js?ref=dev"
    );
}

#[test]
fn test_github_api_url_rejects_bad_urls() {
    for url in [
        "https://gitlab.com/acme/apps/blob/master/a.manifest",
        "https://github.com/acme/apps",
        "https://github.com/acme/apps/blob/master/",
        "not a url",
        "",
    ] {
        let err = github_api_url(url).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{url}: {err:?}");
    }
}

#[test]
fn test_dir_url_and_file_name() {
    assert_eq!(dir_url("http://host/apps/clock/clock.manifest?x=1").unwrap(), "http://host/apps/clock/");
    assert_eq!(url_file_name("http://host/apps/clock/clock.manifest").unwrap(), "clock.manifest");
}

#[test]
fn test_http_date_format() {
    let time = UNIX_EPOCH + Duration::from_secs(1_704_067_200);
    assert_eq!(http_date(time), "Mon, 01 Jan 2024 00:00:00 GMT");
}

#[test]
fn test_basic_auth_header() {
    assert_eq!(basic_auth_header("user", "pass"), "Basic dXNlcjpwYXNz");
}

#[test]
fn test_decode_content_blob() {
    let body = serde_json::to_vec(&json!({"type": "file", "content": "aGVs\nbG8=\n"})).unwrap();
    assert_eq!(decode_content_blob("u", &body).unwrap(), b"hello");

    let dir = serde_json::to_vec(&json!({"type": "dir"})).unwrap();
    let err = decode_content_blob("u", &dir).unwrap_err();
    assert!(err.to_string().contains("type => dir"));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let listing = serde_json::to_vec(&json!([{"name": "a"}])).unwrap();
    assert!(decode_content_blob("u", &listing).is_err());

    let missing = serde_json::to_vec(&json!({"type": "file"})).unwrap();
    assert!(matches!(decode_content_blob("u", &missing), Err(AppError::InvalidManifest { .. })));
}

#[tokio::test]
async fn test_github_fetch_manifest_records_meta_url() {
    let client = Arc::new(MockHttpClient::new());
    client.respond(MANIFEST_API, github_blob(&serde_json::to_vec(&clock_manifest("1.2")).unwrap()));

    let fetched = github_with(&client).fetch_manifest(MANIFEST_URL, None).await.unwrap();
    let FetchedManifest::Manifest(manifest) = fetched else {
        panic!("expected a manifest");
    };
    assert_eq!(manifest.name, "clock");
    assert_eq!(manifest.source_url.as_deref(), Some(MANIFEST_URL));

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header_value("If-Modified-Since"), None);
}

#[tokio::test]
async fn test_github_conditional_fetch_not_modified() {
    let client = Arc::new(MockHttpClient::new());
    client.respond(MANIFEST_API, HttpResponse::new(304, Vec::new()));

    let since = UNIX_EPOCH + Duration::from_secs(1_704_067_200);
    let fetched = github_with(&client).fetch_manifest(MANIFEST_URL, Some(since)).await.unwrap();
    assert_eq!(fetched, FetchedManifest::NotModified);
    assert_eq!(
        client.requests()[0].header_value("If-Modified-Since"),
        Some("Mon, 01 Jan 2024 00:00:00 GMT")
    );
}

#[tokio::test]
async fn test_github_sends_token() {
    let client = Arc::new(MockHttpClient::new());
    client.respond(MANIFEST_API, github_blob(&serde_json::to_vec(&clock_manifest("1")).unwrap()));

    let source = GithubSource::new(client.clone(), Some("secret".to_string()));
    source.fetch_manifest(MANIFEST_URL, None).await.unwrap();
    assert_eq!(client.requests()[0].header_value("Authorization"), Some("token secret"));
}

#[tokio::test]
async fn test_github_error_message_surfaced() {
    let client = Arc::new(MockHttpClient::new());
    client.respond(MANIFEST_API, github_error(403, "API rate limit exceeded"));

    let err = github_with(&client).fetch_manifest(MANIFEST_URL, None).await.unwrap_err();
    match &err {
        AppError::Transport { status, message, .. } => {
            assert_eq!(*status, Some(403));
            assert_eq!(
                message.as_deref(),
                Some("API rate limit exceeded More info : https://docs.github.com/rest")
            );
        }
        other => panic!("Expected Transport, got {other:?}"),
    }
    assert!(err.to_string().starts_with("Github API error: API rate limit exceeded"));
}

#[tokio::test]
async fn test_github_invalid_manifest_rejected() {
    let client = Arc::new(MockHttpClient::new());
    client.respond(MANIFEST_API, github_blob(br#"{"name": "clock", "files": []}"#));

    let err = github_with(&client).fetch_manifest(MANIFEST_URL, None).await.unwrap_err();
    assert!(matches!(err, AppError::MissingField { ref field } if field == "version"));
}

#[tokio::test]
async fn test_github_fetch_file_relative_to_manifest() {
    let client = Arc::new(MockHttpClient::new());
    client.respond(MANIFEST_API, github_blob(&serde_json::to_vec(&clock_manifest("1")).unwrap()));
    client.respond(APP_JS_API, github_blob(b"console.log(1);"));

    let source = github_with(&client);
    let bytes = source.fetch_file(MANIFEST_URL, "app.js").await.unwrap();
    assert_eq!(bytes, b"console.log(1);");
}

#[tokio::test]
async fn test_web_fetch_manifest_and_files() {
    let url = "http://apps.example.com/clock/clock.manifest";
    let client = Arc::new(
        MockHttpClient::new()
            .with(url, json_response(&clock_manifest("2.0")))
            .with("http://apps.example.com/clock/app.js", HttpResponse::new(200, b"js".to_vec())),
    );
    let auth = crate::config::WebAuth {
        username: "user".to_string(),
        password: "pass".to_string(),
    };
    let source = WebSource::new(client.clone(), Some(auth));

    let FetchedManifest::Manifest(manifest) = source.fetch_manifest(url, None).await.unwrap() else {
        panic!("expected a manifest");
    };
    assert_eq!(manifest.source_url.as_deref(), Some(url));
    assert_eq!(source.fetch_file(url, "app.js").await.unwrap(), b"js");

    for request in client.requests() {
        assert_eq!(request.header_value("Authorization"), Some("Basic dXNlcjpwYXNz"));
    }
}

#[tokio::test]
async fn test_web_files_follow_fetch_url_not_declared_meta_url() {
    let url = "http://apps.example.com/clock/clock.manifest";
    let mirror = "http://other.example.net/mirror/clock.manifest";
    let mut document = clock_manifest("2.0");
    document["app-meta-url"] = json!(mirror);
    let client = Arc::new(
        MockHttpClient::new()
            .with(url, json_response(&document))
            .with("http://apps.example.com/clock/app.js", HttpResponse::new(200, b"js".to_vec())),
    );
    let source = WebSource::new(client.clone(), None);

    let FetchedManifest::Manifest(manifest) = source.fetch_manifest(url, None).await.unwrap() else {
        panic!("expected a manifest");
    };
    assert_eq!(manifest.source_url.as_deref(), Some(mirror));
    assert_eq!(source.fetch_file(url, "app.js").await.unwrap(), b"js");
    assert_eq!(client.requested_urls(), vec![url, "http://apps.example.com/clock/app.js"]);
}

#[tokio::test]
async fn test_web_status_error_and_unreachable() {
    let url = "http://apps.example.com/clock/clock.manifest";
    let client = Arc::new(MockHttpClient::new());
    let source = WebSource::new(client.clone(), None);

    let err = source.fetch_manifest(url, None).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP error : 404 Not Found");

    client.unreachable(url);
    let err = source.fetch_manifest(url, None).await.unwrap_err();
    assert!(matches!(err, AppError::Transport { status: None, .. }));
}

#[tokio::test]
async fn test_web_conditional_fetch() {
    let url = "http://apps.example.com/clock/clock.manifest";
    let client = Arc::new(MockHttpClient::new().with(url, HttpResponse::new(304, Vec::new())));
    let source = WebSource::new(client.clone(), None);

    let fetched = source.fetch_manifest(url, Some(UNIX_EPOCH)).await.unwrap();
    assert_eq!(fetched, FetchedManifest::NotModified);
    assert_eq!(
        client.requests()[0].header_value("If-Modified-Since"),
        Some("Thu, 01 Jan 1970 00:00:00 GMT")
    );
}

#[test]
fn test_remote_source_selection() {
    let client: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());
    let config = AppsConfig::default();
    let github = remote_source_for(MANIFEST_URL, client.clone(), &config).unwrap();
    assert_eq!(github.kind(), SourceKind::Github);
    let web = remote_source_for("https://example.com/a/a.manifest", client.clone(), &config).unwrap();
    assert_eq!(web.kind(), SourceKind::WebServer);
    assert!(remote_source_for("", client.clone(), &config).is_err());
    assert!(remote_source_for("ftp://example.com/a", client, &config).is_err());
}

#[test]
fn test_classify_local_paths() {
    let temp = TempDir::new().unwrap();
    let root = AppsRoot::new(temp.path().join("apps"), "manifest");

    let tar = sample_app_tar("clock", "1", "manifest").write_to(temp.path(), "clock.upload");
    assert_eq!(classify(&tar, &root).unwrap(), LocalKind::Archive(archive::ArchiveFormat::Tar));

    let manifest = temp.path().join("clock.manifest");
    std::fs::write(&manifest, manifest_json("clock", "1", &["clock.manifest"])).unwrap();
    assert_eq!(
        classify(&manifest, &root).unwrap(),
        LocalKind::Manifest {
            app_name: "clock".to_string()
        }
    );

    let other = temp.path().join("notes.txt");
    std::fs::write(&other, "hello").unwrap();
    assert!(matches!(classify(&other, &root), Err(AppError::UnsupportedFormat { .. })));

    assert!(matches!(classify(&temp.path().join("nope"), &root), Err(AppError::FileNotFound { .. })));
}

#[test]
fn test_load_extracted_manifest_checks() {
    let temp = TempDir::new().unwrap();
    let root = AppsRoot::new(temp.path().join("apps"), "manifest");
    root.ensure_exists().unwrap();

    let ok = sample_app_tar("clock", "1", "manifest").write_to(temp.path(), "ok.tar");
    let extracted = archive::extract(&ok, &root).unwrap();
    assert_eq!(load_extracted_manifest(&root, &extracted).unwrap().name, "clock");
    std::fs::remove_dir_all(&extracted.staging_dir).unwrap();

    let no_manifest = TarBuilder::new()
        .dir("clock/")
        .file("clock/app.js", b"x")
        .write_to(temp.path(), "nomanifest.tar");
    let extracted = archive::extract(&no_manifest, &root).unwrap();
    assert!(matches!(
        load_extracted_manifest(&root, &extracted),
        Err(AppError::FileNotFound { .. })
    ));
    std::fs::remove_dir_all(&extracted.staging_dir).unwrap();

    let wrong_name = TarBuilder::new()
        .dir("clock/")
        .file("clock/clock.manifest", &manifest_json("other", "1", &["clock.manifest"]))
        .write_to(temp.path(), "wrong.tar");
    let extracted = archive::extract(&wrong_name, &root).unwrap();
    assert!(matches!(
        load_extracted_manifest(&root, &extracted),
        Err(AppError::InvalidManifest { .. })
    ));
    std::fs::remove_dir_all(&extracted.staging_dir).unwrap();

    let missing_file = TarBuilder::new()
        .dir("clock/")
        .file("clock/clock.manifest", &manifest_json("clock", "1", &["clock.manifest", "gone.js"]))
        .write_to(temp.path(), "missing.tar");
    let extracted = archive::extract(&missing_file, &root).unwrap();
    match load_extracted_manifest(&root, &extracted) {
        Err(AppError::FileNotFound { path, .. }) => assert!(path.ends_with("gone.js")),
        other => panic!("Expected FileNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_local_dir_source_reads_neighbours() {
    let temp = TempDir::new().unwrap();
    let manifest_path = temp.path().join("clock.manifest");
    std::fs::write(&manifest_path, manifest_json("clock", "1", &["clock.manifest", "lib/app.js"])).unwrap();
    std::fs::create_dir(temp.path().join("lib")).unwrap();
    std::fs::write(temp.path().join("lib").join("app.js"), "js").unwrap();

    let source = LocalDirSource::for_manifest(&manifest_path);
    let locator = manifest_path.to_string_lossy();
    let FetchedManifest::Manifest(manifest) = source.fetch_manifest(&locator, None).await.unwrap() else {
        panic!("expected a manifest");
    };
    assert_eq!(manifest.name, "clock");
    assert_eq!(source.fetch_file(&locator, "lib/app.js").await.unwrap(), b"js");
    assert!(matches!(
        source.fetch_file(&locator, "missing.js").await,
        Err(AppError::FileNotFound { .. })
    ));
}
