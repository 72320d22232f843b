//! Per-user storage directory and on-disk token persistence.

use directories::UserDirs;
use getrandom::fill;
use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, VaultError};

/// Name of the vault directory inside the user's documents folder.
pub const STORE_DIR_NAME: &str = "SecureVault";

/// File extension used for stored tokens.
pub const TOKEN_EXT: &str = "vault";

/// Returns the per-user storage directory.
///
/// When the directory is missing it is created if `create` is true;
/// otherwise this fails with [`io::ErrorKind::NotFound`].
pub fn resolve_path(create: bool) -> Result<PathBuf> {
    let user_dirs = UserDirs::new().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "could not determine home directory")
    })?;

    let documents = user_dirs
        .document_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| user_dirs.home_dir().join("Documents"));

    resolve_in(&documents, create)
}

fn resolve_in(base: &Path, create: bool) -> Result<PathBuf> {
    let path = base.join(STORE_DIR_NAME);

    if !path.is_dir() {
        if !create {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("storage directory {} does not exist", path.display()),
            )
            .into());
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }
        builder.create(&path)?;
        debug!(path = %path.display(), "created storage directory");
    }

    Ok(path)
}

/// Persists tokens as text files inside one directory.
#[derive(Debug, Clone)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    /// Creates a store rooted at `dir`. Nothing is touched on disk.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Opens the store in the per-user storage directory.
    pub fn open_default(create: bool) -> Result<Self> {
        Ok(Self::new(resolve_path(create)?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns `true` if a token with this name exists.
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name)?.is_file())
    }

    /// Loads a stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the file cannot be read.
    pub fn load(&self, name: &str) -> Result<String> {
        let contents = fs::read_to_string(self.path_for(name)?)?;
        Ok(contents.trim_end().to_string())
    }

    /// Lists stored token names in sorted order.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TOKEN_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Saves a token using atomic write.
    ///
    /// This method ensures crash-safety by:
    /// 1. Writing data to a temporary file with random name
    /// 2. Syncing the temporary file to disk
    /// 3. Atomically replacing the old file with the new one
    /// 4. Syncing the parent directory to ensure the rename is persisted
    ///
    /// Creates the store directory if it doesn't exist.
    pub fn save(&self, name: &str, token: &str) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;

        let tmp_path = random_tmp_path(&path)?;

        // fail if the temp file already exists
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        tmp_file.write_all(token.as_bytes())?;
        tmp_file.write_all(b"\n")?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = atomic_replace(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        // fsync directory
        #[cfg(not(target_os = "windows"))]
        {
            File::open(&self.dir)?.sync_all()?;
        }

        debug!(name, "saved token");
        Ok(())
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{TOKEN_EXT}")))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(VaultError::Parameter(format!("invalid token name: {name:?}")))
    }
}

/// Generates a unique temporary file path next to `path`.
///
/// Format: `filename.tmp.<randomhex>`
fn random_tmp_path(path: &Path) -> Result<PathBuf> {
    let mut buf = [0u8; 8]; // 64 bit entropy
    fill(&mut buf).map_err(|_| VaultError::Randomness)?;

    let rand_string = buf.iter().map(|b| format!("{b:02x}")).collect::<String>();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(path.with_file_name(format!("{file_name}.tmp.{rand_string}")))
}

/// Atomically replaces `target` with `tmp_path`.
///
/// Uses Windows `ReplaceFileW` with `REPLACEFILE_WRITE_THROUGH` when the
/// target already exists; `ReplaceFileW` refuses a missing target, so a
/// first write falls back to a plain rename.
#[cfg(target_os = "windows")]
fn atomic_replace(tmp_path: &Path, target: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

    if !target.exists() {
        fs::rename(tmp_path, target)?;
        return Ok(());
    }

    fn to_wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let target_w = to_wide(target.as_os_str());
    let tmp_w = to_wide(tmp_path.as_os_str());

    // SAFETY:
    // - Strings are valid UTF-16 and null-terminated
    // - Pointers remain valid during the call
    // - Windows does not retain the pointers after return
    let result = unsafe {
        ReplaceFileW(
            target_w.as_ptr(),
            tmp_w.as_ptr(),
            std::ptr::null(),
            REPLACEFILE_WRITE_THROUGH,
            std::ptr::null(),
            std::ptr::null(),
        )
    };

    if result == 0 {
        return Err(io::Error::last_os_error().into());
    }

    Ok(())
}

/// On Unix, `rename()` is atomic when both paths are on the same filesystem.
#[cfg(not(target_os = "windows"))]
fn atomic_replace(tmp_path: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp_path, target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // --------------------------------------------------
    // PATH RESOLUTION
    // --------------------------------------------------

    #[test]
    fn resolve_without_create_fails_when_missing() {
        let dir = tempdir().unwrap();

        match resolve_in(dir.path(), false) {
            Err(VaultError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected NotFound, got: {other:?}"),
        }
        assert!(!dir.path().join(STORE_DIR_NAME).exists());
    }

    #[test]
    fn resolve_with_create_makes_directory() {
        let dir = tempdir().unwrap();

        let path = resolve_in(dir.path(), true).unwrap();

        assert_eq!(path, dir.path().join(STORE_DIR_NAME));
        assert!(path.is_dir());
    }

    #[test]
    fn resolve_finds_existing_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(STORE_DIR_NAME)).unwrap();

        assert!(resolve_in(dir.path(), false).is_ok());
    }

    #[test]
    fn resolve_creates_missing_parents() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("home").join("Documents");

        let path = resolve_in(&base, true).unwrap();
        assert!(path.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn created_directory_is_not_group_writable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = resolve_in(dir.path(), true).unwrap();
        let mode = fs::metadata(path).unwrap().permissions().mode();

        assert_eq!(mode & 0o022, 0);
    }

    // --------------------------------------------------
    // TOKEN STORE
    // --------------------------------------------------

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens"));

        store.save("github", "AQIDBA==").unwrap();

        assert!(store.exists("github").unwrap());
        assert_eq!(store.load("github").unwrap(), "AQIDBA==");
    }

    #[test]
    fn load_missing_fails() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());

        assert!(matches!(store.load("missing"), Err(VaultError::Io(_))));
        assert!(!store.exists("missing").unwrap());
    }

    #[test]
    fn save_replaces_existing_token() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());

        store.save("a", "first").unwrap();
        store.save("a", "second").unwrap();

        assert_eq!(store.load("a").unwrap(), "second");
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());
        store.save("a", "data").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "a.vault");
    }

    #[test]
    fn list_returns_sorted_names() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());

        store.save("zeta", "1").unwrap();
        store.save("alpha", "2").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn list_of_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nope"));

        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());

        for name in ["", ".hidden", "../escape", "a/b", "sp ace"] {
            assert!(
                matches!(store.save(name, "x"), Err(VaultError::Parameter(_))),
                "name {name:?} was accepted"
            );
        }
    }

    #[test]
    fn tmp_names_are_unique() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.vault");

        let a = random_tmp_path(&path).unwrap();
        let b = random_tmp_path(&path).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
    }
}
