//! Byte-level file access shared by drivers
//!
//! Paths under `/vsimem/` live in a process-wide in-memory store; every other
//! path goes to the local filesystem. Drivers read and write through these
//! functions so that in-memory and on-disk resources behave the same.

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};

use crate::errors::{GeoDataError, Result};

const MEM_PREFIX: &str = "/vsimem";

static MEM_FILES: LazyLock<Mutex<BTreeMap<PathBuf, Vec<u8>>>> = LazyLock::new(Default::default);

fn mem_files() -> MutexGuard<'static, BTreeMap<PathBuf, Vec<u8>>> {
    match MEM_FILES.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn mem_not_found(path: &Path) -> GeoDataError {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
    .into()
}

/// Returns `true` for paths served by the in-memory store.
pub fn is_mem_path<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().starts_with(MEM_PREFIX)
}

/// Read the file names from a directory with optional recursion.
///
/// Returned names are relative to `path`.
pub fn read_dir<P: AsRef<Path>>(path: P, recursive: bool) -> Result<Vec<PathBuf>> {
    _read_dir(path.as_ref(), recursive)
}

fn _read_dir(path: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if is_mem_path(path) {
        let files = mem_files();
        let mut names: Vec<PathBuf> = files
            .keys()
            .filter_map(|name| name.strip_prefix(path).ok())
            .filter(|rel| recursive || rel.components().count() == 1)
            .map(Path::to_path_buf)
            .collect();
        names.dedup();
        return Ok(names);
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let name = PathBuf::from(entry.file_name());
        if recursive && entry.file_type()?.is_dir() {
            for child in _read_dir(&entry.path(), true)? {
                paths.push(name.join(child));
            }
        }
        paths.push(name);
    }
    Ok(paths)
}

/// Creates a new in-memory file from a given buffer, replacing any previous content.
pub fn create_mem_file<P: AsRef<Path>>(file_name: P, data: Vec<u8>) -> Result<()> {
    let file_name = file_name.as_ref();
    if !is_mem_path(file_name) {
        return Err(GeoDataError::BadArgument(format!(
            "'{}' is not under {MEM_PREFIX}",
            file_name.display()
        )));
    }
    mem_files().insert(file_name.to_path_buf(), data);
    Ok(())
}

/// Unlink a memory file.
pub fn unlink_mem_file<P: AsRef<Path>>(file_name: P) -> Result<()> {
    let file_name = file_name.as_ref();
    match mem_files().remove(file_name) {
        Some(_) => Ok(()),
        None => Err(mem_not_found(file_name)),
    }
}

/// Takes the content of a memory file and unlinks it.
pub fn get_vsi_mem_file_bytes_owned<P: AsRef<Path>>(file_name: P) -> Result<Vec<u8>> {
    let file_name = file_name.as_ref();
    mem_files()
        .remove(file_name)
        .ok_or_else(|| mem_not_found(file_name))
}

/// Returns `true` if `path` names an existing file.
pub fn exists<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if is_mem_path(path) {
        mem_files().contains_key(path)
    } else {
        path.is_file()
    }
}

/// Reads a whole file.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    if is_mem_path(path) {
        return mem_files()
            .get(path)
            .cloned()
            .ok_or_else(|| mem_not_found(path));
    }
    Ok(std::fs::read(path)?)
}

/// Reads at most `max_bytes` from the start of a file.
pub fn read_header<P: AsRef<Path>>(path: P, max_bytes: usize) -> Result<Vec<u8>> {
    let path = path.as_ref();
    if is_mem_path(path) {
        let files = mem_files();
        let data = files.get(path).ok_or_else(|| mem_not_found(path))?;
        return Ok(data[..data.len().min(max_bytes)].to_vec());
    }
    let file = std::fs::File::open(path)?;
    let mut header = Vec::with_capacity(max_bytes);
    file.take(max_bytes as u64).read_to_end(&mut header)?;
    Ok(header)
}

/// Writes a whole file, replacing any previous content.
pub fn write_file<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if is_mem_path(path) {
        return create_mem_file(path, data.to_vec());
    }
    Ok(std::fs::write(path, data)?)
}

/// Removes a file.
pub fn unlink<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if is_mem_path(path) {
        return unlink_mem_file(path);
    }
    Ok(std::fs::remove_file(path)?)
}

/// Renames a file. Both paths must live on the same side (memory or disk).
pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    match (is_mem_path(from), is_mem_path(to)) {
        (true, true) => {
            let mut files = mem_files();
            let data = files.remove(from).ok_or_else(|| mem_not_found(from))?;
            files.insert(to.to_path_buf(), data);
            Ok(())
        }
        (false, false) => Ok(std::fs::rename(from, to)?),
        _ => {
            copy_file(from, to)?;
            unlink(from)
        }
    }
}

/// Copies a file.
pub fn copy_file<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    let data = read_file(from)?;
    write_file(to, &data)
}
