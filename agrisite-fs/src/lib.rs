//! Capability-based filesystem helpers shared by the agrisite crates.
//!
//! Paths are UTF-8 (`camino`) and every operation resolves an ambient
//! directory handle through `cap-std` before touching the file itself.
#![forbid(unsafe_code)]

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io::{self, Write};

/// Suffix appended to the staging file used by [`write_atomic`].
const STAGING_SUFFIX: &str = ".partial";

/// Open a UTF-8 file path for reading using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Open the directory containing `path` and return it with the file name.
pub fn parent_dir_and_name(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Create the parent directory of `path` when it does not exist yet.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (anchor, remainder) = anchor_and_remainder(parent)?;
    if remainder.as_str().is_empty() {
        return Ok(());
    }
    anchor.create_dir_all(&remainder)
}

/// Return whether a path exists and is a regular file.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = parent_dir_and_name(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}

/// Read a file to a string, returning `None` when it does not exist.
pub fn read_utf8_if_present(path: &Utf8Path) -> io::Result<Option<String>> {
    let (dir, name) = match parent_dir_and_name(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    match dir.read_to_string(name.as_str()) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Replace the contents of `path` without exposing a half-written file.
///
/// The bytes go to a sibling staging file which is synced and then renamed
/// over the target. Readers observe either the old or the new contents.
/// Missing parent directories are created first.
pub fn write_atomic(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let (dir, name) = parent_dir_and_name(path)?;
    let staging = format!(".{name}{STAGING_SUFFIX}");

    let written = stage(&dir, &staging, contents);
    if let Err(err) = written {
        // The staging file is scratch space; a failed cleanup changes nothing.
        drop(dir.remove_file(staging.as_str()));
        return Err(err);
    }
    dir.rename(staging.as_str(), &dir, name.as_str())
}

fn stage(dir: &fs_utf8::Dir, staging: &str, contents: &[u8]) -> io::Result<()> {
    let mut file = dir.create(staging)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Split `parent` into the directory it hangs from and the rest of it.
///
/// Rooted paths hang from the filesystem root (the drive root on Windows);
/// anything else hangs from the working directory.
fn anchor_and_remainder(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let anchor = match parent.components().next() {
        Some(Utf8Component::Prefix(prefix)) => {
            Utf8PathBuf::from(format!("{}{}", prefix.as_str(), std::path::MAIN_SEPARATOR))
        }
        Some(Utf8Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR_STR),
        _ => Utf8PathBuf::from("."),
    };
    let remainder: Utf8PathBuf = parent
        .components()
        .filter(|part| !matches!(part, Utf8Component::Prefix(_) | Utf8Component::RootDir))
        .collect();
    let dir = fs_utf8::Dir::open_ambient_dir(&anchor, ambient_authority())?;
    Ok((dir, remainder))
}
