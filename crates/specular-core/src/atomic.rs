//! Atomic filesystem installation primitives.
//!
//! Both primitives follow the same pattern: create the entry under a name no
//! other actor is using, then publish it with a single rename. No external
//! observer ever sees a half-written directory entry, and interleaved runs
//! from independent processes leave exactly one valid result.

use std::path::Path;

use rand::Rng;
use tempfile::NamedTempFile;

use crate::error::MirrorError;

/// Attempt bound for finding an unused scratch-link name.
const MAX_LINK_ATTEMPTS: u32 = 10_000;

/// Publish a scratch file under its final name.
///
/// The scratch file must already live in the destination's directory so the
/// rename stays on one filesystem. Any prior file at `dst` is replaced
/// atomically.
///
/// # Errors
///
/// Returns [`MirrorError::Filesystem`] when the rename fails; the scratch
/// file is removed either way.
pub fn install_file(scratch: NamedTempFile, dst: &Path) -> Result<(), MirrorError> {
    scratch
        .persist(dst)
        .map_err(|err| MirrorError::Filesystem(err.error))?;
    Ok(())
}

/// Atomically create or replace `dst` as a symbolic link to `target`.
///
/// The link is first created under `.<name>.<suffix>.tmp` in the
/// destination's parent directory, where the suffix is 8 random bytes
/// hex-encoded; a colliding scratch name is retried with a fresh suffix.
/// The final rename replaces any existing link at `dst`.
///
/// # Errors
///
/// Returns [`MirrorError::NameCollisionExhausted`] when every tried scratch
/// name already existed, and [`MirrorError::Filesystem`] for any other
/// failure; a scratch link left behind by a failed rename is removed before
/// the error is returned.
pub fn symlink(target: &Path, dst: &Path) -> Result<(), MirrorError> {
    let dir = dst.parent().unwrap_or_else(|| Path::new(""));
    let name = dst
        .file_name()
        .ok_or_else(|| {
            MirrorError::Filesystem(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("link destination {} has no file name", dst.display()),
            ))
        })?
        .to_string_lossy();

    for _ in 0..MAX_LINK_ATTEMPTS {
        let suffix: [u8; 8] = rand::rng().random();
        let scratch = dir.join(format!(".{name}.{}.tmp", hex::encode(suffix)));
        match std::os::unix::fs::symlink(target, &scratch) {
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
            Ok(()) => {}
        }
        if let Err(err) = std::fs::rename(&scratch, dst) {
            let _ = std::fs::remove_file(&scratch);
            return Err(err.into());
        }
        return Ok(());
    }
    Err(MirrorError::NameCollisionExhausted {
        dest: dst.to_path_buf(),
    })
}
