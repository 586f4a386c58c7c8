//! Signature-gated download of a content/signature pair.
//!
//! The signature resource is fetched first and kept for verification; the
//! content then streams chunk-by-chunk into a scratch file while the
//! verifier accumulates its prehash, so large files never sit in memory.
//! Nothing reaches its public name until the signature checks out, and a
//! failed attempt leaves the destination untouched.

use std::io::Write;
use std::path::Path;

use ed25519_dalek::VerifyingKey;
use futures::StreamExt;
use reqwest::{Client, Url};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::MirrorError;
use crate::links::SIG_SUFFIX;
use crate::verify::StreamVerifier;

/// Fetch `url` and its detached signature, verify, and install both under
/// `dst` as `name` and `name.sig`.
///
/// The caller is expected to have applied the immutable-skip check already;
/// this function always fetches. On any failure the scratch files are
/// removed and the destination shows no trace of the attempt.
pub(crate) async fn fetch_signed(
    client: &Client,
    anchor: &VerifyingKey,
    dst: &Path,
    url: Url,
    name: &str,
    cancel: &CancellationToken,
) -> Result<(), MirrorError> {
    let mut sig_url = url.clone();
    sig_url.set_path(&format!("{}{SIG_SUFFIX}", url.path()));

    let sig_name = format!("{name}{SIG_SUFFIX}");
    let mut sig_scratch = scratch_in(dst, &sig_name)?;
    let sig_body = fetch_bytes(client, sig_url, cancel).await?;
    sig_scratch.write_all(&sig_body)?;

    let content_scratch = scratch_in(dst, name)?;
    let mut file = tokio::fs::File::from_std(content_scratch.reopen()?);
    let mut verifier = StreamVerifier::new();

    let response = send(client, url, cancel).await?;
    let mut stream = response.bytes_stream();
    loop {
        let chunk = tokio::select! {
            () = cancel.cancelled() => return Err(MirrorError::Cancelled),
            next = stream.next() => match next {
                Some(chunk) => chunk?,
                None => break,
            },
        };
        file.write_all(&chunk).await?;
        verifier.update(&chunk);
    }
    file.flush().await?;
    drop(file);

    verifier.verify(anchor, &sig_body, name)?;

    // Signature first: a crash between the renames leaves no content file,
    // so the next run's existence check still re-fetches the pair.
    crate::atomic::install_file(sig_scratch, &dst.join(sig_name))?;
    crate::atomic::install_file(content_scratch, &dst.join(name))?;
    Ok(())
}

/// Fetch a small resource fully into memory, observing cancellation.
pub(crate) async fn fetch_bytes(
    client: &Client,
    url: Url,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, MirrorError> {
    let response = send(client, url, cancel).await?;
    let body = tokio::select! {
        () = cancel.cancelled() => return Err(MirrorError::Cancelled),
        body = response.bytes() => body?,
    };
    Ok(body.to_vec())
}

async fn send(
    client: &Client,
    url: Url,
    cancel: &CancellationToken,
) -> Result<reqwest::Response, MirrorError> {
    let request = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT);
    let response = tokio::select! {
        () = cancel.cancelled() => return Err(MirrorError::Cancelled),
        response = request.send() => response?,
    };
    Ok(response.error_for_status()?)
}

/// A uniquely-named dotted scratch file inside `dir`, removed on drop.
fn scratch_in(dir: &Path, name: &str) -> Result<NamedTempFile, MirrorError> {
    Ok(tempfile::Builder::new()
        .prefix(&format!(".{name}.tmp."))
        .tempfile_in(dir)?)
}
