use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use tokio::{
    fs::{self, File},
    io::{self, AsyncWriteExt},
};
use tracing::debug;

/// Sibling path used to stage a write before it gets published over `path`.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `contents` into the staging sibling of `path` and syncs it to disk. The file at `path`
/// itself is not touched.
pub async fn write_temp(path: &Path, contents: &[u8]) -> Result<PathBuf, io::Error> {
    let temp = temp_sibling(path);
    let mut file = File::create(&temp).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(temp)
}

/// Renames a staged file over its destination. Readers observe either the old or the new file,
/// never a partial one.
pub async fn publish(temp: &Path, path: &Path) -> Result<(), io::Error> {
    fs::rename(temp, path).await
}

/// Replaces the contents of `path` atomically.
pub async fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let temp = write_temp(path, contents).await?;
    if let Err(e) = publish(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }
    debug!("Published {path:?}");
    Ok(())
}

/// Moves a damaged file out of the way, keeping it for inspection. `2024-01-01.json` becomes
/// `2024-01-01.corrupt.json`. When that name is already taken by an earlier quarantine the
/// current unix time is added so older copies are never overwritten.
pub async fn quarantine(path: &Path) -> Result<PathBuf, io::Error> {
    let stem = path
        .file_stem()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|v| format!(".{}", v.to_string_lossy()))
        .unwrap_or_default();

    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|v| v.as_secs())
        .unwrap_or_default();

    let candidates = std::iter::once(format!("{stem}.corrupt{extension}"))
        .chain(std::iter::once(format!("{stem}.corrupt-{seconds}{extension}")))
        .chain((1..).map(|n| format!("{stem}.corrupt-{seconds}-{n}{extension}")));

    for candidate in candidates {
        let target = path.with_file_name(candidate);
        match fs::symlink_metadata(&target).await {
            Ok(_) => continue,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::rename(path, &target).await?;
                return Ok(target);
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("candidate names are unbounded")
}
