//! End-to-end mirror runs against a mock release server.

use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha512};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use specular_core::{Channel, ErrorVerdict, Mirror, MirrorError, MirrorOptions, Origin};

const TEST_SEED: [u8; 32] = [7; 32];

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&TEST_SEED)
}

fn sign(content: &[u8]) -> String {
    let mut digest = Sha512::new();
    digest.update(content);
    let signature = signing_key().sign_prehashed(digest, None).expect("sign");
    base64::engine::general_purpose::STANDARD.encode(signature.to_bytes())
}

fn mirror_for(server_url: &str, dest: &Path, options: MirrorOptions) -> Mirror {
    let origin = Origin::path_style(server_url).expect("origin");
    Mirror::with_trust_anchor(origin, dest, options, signing_key().verifying_key())
}

fn stable_only() -> MirrorOptions {
    MirrorOptions {
        channels: vec![Channel::Stable],
        ..MirrorOptions::default()
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_mirrors_files_and_updates_pointer() {
    let mut server = mockito::Server::new_async().await;
    let content = b"release payload";

    server
        .mock("GET", "/stable/current/version.txt")
        .with_body("COREOS_VERSION_ID=1234.5.0\n")
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/")
        .with_body(concat!(
            r#"<html><body><a href="../">up</a>"#,
            r#"<a href="update.bin">content</a>"#,
            r#"<a href="update.bin.sig">sig</a>"#,
            r#"<a href="notes.txt">notes</a></body></html>"#,
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/update.bin.sig")
        .with_body(sign(content))
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/update.bin")
        .with_body(content.as_slice())
        .create_async()
        .await;

    let dest = TempDir::new().unwrap();
    let mirror = mirror_for(&server.url(), dest.path(), stable_only());
    mirror.run(&CancellationToken::new()).await.expect("run");

    let version_dir = dest.path().join("all/1234.5.0");
    assert_eq!(fs::read(version_dir.join("update.bin")).unwrap(), content);
    assert_eq!(
        fs::read(version_dir.join("update.bin.sig")).unwrap(),
        sign(content).into_bytes()
    );
    assert_eq!(entries(&version_dir), ["update.bin", "update.bin.sig"]);

    let current = dest.path().join("stable/current");
    assert_eq!(
        fs::read_link(&current).unwrap(),
        Path::new("../all/1234.5.0")
    );
}

#[tokio::test]
async fn test_existing_files_are_never_refetched() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/stable/current/version.txt")
        .with_body("COREOS_VERSION_ID=1234.5.0\n")
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/")
        .with_body(r#"<a href="update.bin.sig">sig</a>"#)
        .create_async()
        .await;
    let content_mock = server
        .mock("GET", "/stable/1234.5.0/update.bin")
        .expect(0)
        .create_async()
        .await;
    let sig_mock = server
        .mock("GET", "/stable/1234.5.0/update.bin.sig")
        .expect(0)
        .create_async()
        .await;

    let dest = TempDir::new().unwrap();
    let version_dir = dest.path().join("all/1234.5.0");
    fs::create_dir_all(&version_dir).unwrap();
    fs::write(version_dir.join("update.bin"), b"installed earlier").unwrap();

    let mirror = mirror_for(&server.url(), dest.path(), stable_only());
    mirror.run(&CancellationToken::new()).await.expect("run");

    content_mock.assert_async().await;
    sig_mock.assert_async().await;
    assert_eq!(
        fs::read(version_dir.join("update.bin")).unwrap(),
        b"installed earlier"
    );
}

#[tokio::test]
async fn test_failed_verification_leaves_no_trace() {
    let mut server = mockito::Server::new_async().await;
    let content = b"release payload";

    server
        .mock("GET", "/stable/current/version.txt")
        .with_body("COREOS_VERSION_ID=1234.5.0\n")
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/")
        .with_body(r#"<a href="update.bin.sig">sig</a>"#)
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/update.bin.sig")
        .with_body(sign(b"something else entirely"))
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/update.bin")
        .with_body(content.as_slice())
        .create_async()
        .await;

    let dest = TempDir::new().unwrap();
    let options = MirrorOptions {
        on_error: Box::new(|_| ErrorVerdict::Skip),
        ..stable_only()
    };
    let mirror = mirror_for(&server.url(), dest.path(), options);
    mirror.run(&CancellationToken::new()).await.expect("run");

    // neither the pair nor any scratch entry may remain
    assert_eq!(
        entries(&dest.path().join("all/1234.5.0")),
        Vec::<String>::new()
    );
    // the channel itself still completes and repoints
    assert_eq!(
        fs::read_link(dest.path().join("stable/current")).unwrap(),
        Path::new("../all/1234.5.0")
    );
}

#[tokio::test]
async fn test_fatal_verification_failure_aborts_run() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/stable/current/version.txt")
        .with_body("COREOS_VERSION_ID=1234.5.0\n")
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/")
        .with_body(r#"<a href="update.bin.sig">sig</a>"#)
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/update.bin.sig")
        .with_body("not a signature")
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/update.bin")
        .with_body("payload")
        .create_async()
        .await;

    let dest = TempDir::new().unwrap();
    let mirror = mirror_for(&server.url(), dest.path(), stable_only());
    let err = mirror.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, MirrorError::SignatureVerification { .. }));
    // a fatal file failure stops before the channel pointer is installed
    assert!(fs::read_link(dest.path().join("stable/current")).is_err());
}

#[tokio::test]
async fn test_filter_prunes_candidates() {
    let mut server = mockito::Server::new_async().await;
    let content = b"release payload";

    server
        .mock("GET", "/stable/current/version.txt")
        .with_body("COREOS_VERSION_ID=1234.5.0\n")
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/")
        .with_body(concat!(
            r#"<a href="update.bin.sig">a</a>"#,
            r#"<a href="update.torrent.sig">b</a>"#,
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/update.bin.sig")
        .with_body(sign(content))
        .create_async()
        .await;
    server
        .mock("GET", "/stable/1234.5.0/update.bin")
        .with_body(content.as_slice())
        .create_async()
        .await;
    let torrent_mock = server
        .mock("GET", "/stable/1234.5.0/update.torrent.sig")
        .expect(0)
        .create_async()
        .await;

    let dest = TempDir::new().unwrap();
    let options = MirrorOptions {
        filter: Box::new(|name| !name.ends_with(".torrent")),
        ..stable_only()
    };
    let mirror = mirror_for(&server.url(), dest.path(), options);
    mirror.run(&CancellationToken::new()).await.expect("run");

    torrent_mock.assert_async().await;
    assert_eq!(
        entries(&dest.path().join("all/1234.5.0")),
        ["update.bin", "update.bin.sig"]
    );
}

#[tokio::test]
async fn test_non_fatal_channel_failure_continues() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/stable/current/version.txt")
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", "/beta/current/version.txt")
        .with_body("COREOS_VERSION_ID=2.0.0\n")
        .create_async()
        .await;
    server
        .mock("GET", "/beta/2.0.0/")
        .with_body("<html></html>")
        .create_async()
        .await;

    let dest = TempDir::new().unwrap();
    let options = MirrorOptions {
        channels: vec![Channel::Stable, Channel::Beta],
        on_error: Box::new(|_| ErrorVerdict::Skip),
        ..MirrorOptions::default()
    };
    let mirror = mirror_for(&server.url(), dest.path(), options);
    mirror.run(&CancellationToken::new()).await.expect("run");

    assert_eq!(
        fs::read_link(dest.path().join("beta/current")).unwrap(),
        Path::new("../all/2.0.0")
    );
    assert!(!dest.path().join("stable").exists());
}

#[tokio::test]
async fn test_cancelled_token_aborts_run() {
    let dest = TempDir::new().unwrap();
    let mirror = mirror_for("http://127.0.0.1:9/", dest.path(), stable_only());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = mirror.run(&cancel).await.unwrap_err();
    assert!(matches!(err, MirrorError::Cancelled));
}
