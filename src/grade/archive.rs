#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use tempfile::TempDir;
use walkdir::{DirEntry, WalkDir};
use zip::ZipArchive;

use crate::{constants::EXTRACT_DIR_PREFIX, process::run_collect, util::rar_extractor};

/// Submitted base names (extension stripped, case kept) to extracted paths,
/// in the order they were discovered. The first file seen for a base name
/// wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoundFiles {
    /// Discovered entries, in discovery order.
    entries: Vec<(String, PathBuf)>,
}

impl FoundFiles {
    /// Adds an entry unless the base name is already present. Returns
    /// whether it was added.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> bool {
        let name = name.into();
        if self.get(&name).is_some() {
            return false;
        }
        self.entries.push((name, path.into()));
        true
    }

    /// Path of the file with exactly this base name.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.get_key_value(name).map(|(_, path)| path)
    }

    /// Stored base name and path for exactly this base name.
    pub fn get_key_value(&self, name: &str) -> Option<(&str, &Path)> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(n, p)| (n.as_str(), p.as_path()))
    }

    /// Iterates over base names and paths in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p.as_path()))
    }

    /// Number of discovered files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no source file was found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, PathBuf)> for FoundFiles {
    fn from_iter<T: IntoIterator<Item = (String, PathBuf)>>(iter: T) -> Self {
        let mut found = FoundFiles::default();
        for (name, path) in iter {
            found.insert(name, path);
        }
        found
    }
}

/// An unpacked submission. The sandbox directory is deleted when this is
/// dropped.
#[derive(Debug)]
pub struct Extraction {
    /// Owned sandbox directory.
    dir:   TempDir,
    /// Source files discovered in the sandbox.
    found: FoundFiles,
}

impl Extraction {
    /// Root of the sandbox the archive was unpacked into.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Source files discovered in the archive.
    pub fn found(&self) -> &FoundFiles {
        &self.found
    }
}

/// Container formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    /// Zip, also tried for unknown extensions.
    Zip,
    /// Rar, unpacked by an external program.
    Rar,
}

impl ArchiveFormat {
    /// Picks the format from the archive's extension.
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("rar") => ArchiveFormat::Rar,
            _ => ArchiveFormat::Zip,
        }
    }
}

/// Unpacks `archive` into a fresh sandbox and indexes the files ending in
/// `file_ext`.
///
/// A corrupt, unreadable or empty archive is not an error: it yields an
/// empty index, which grades as "nothing submitted". Only failing to create
/// the sandbox itself is reported as an error.
pub async fn extract_archive(archive: &Path, file_ext: &str) -> Result<Extraction> {
    let dir = tempfile::Builder::new()
        .prefix(EXTRACT_DIR_PREFIX)
        .tempdir()
        .context("Could not create extraction directory")?;

    let unpacked = match ArchiveFormat::from_path(archive) {
        ArchiveFormat::Rar => unpack_rar(archive, dir.path()).await,
        ArchiveFormat::Zip => {
            let source = archive.to_path_buf();
            let dest = dir.path().to_path_buf();
            tokio::task::spawn_blocking(move || unpack_zip(&source, &dest))
                .await
                .context("zip extraction task failed")?
        }
    };

    if let Err(e) = unpacked {
        tracing::warn!("Could not unpack {}: {e:#}", archive.display());
        return Ok(Extraction {
            dir,
            found: FoundFiles::default(),
        });
    }

    let (root, ext) = (dir.path().to_path_buf(), file_ext.to_string());
    let found = tokio::task::spawn_blocking(move || collect_sources(&root, &ext))
        .await
        .context("source indexing task failed")?;
    tracing::debug!("Found {} {file_ext} files in {}", found.len(), archive.display());
    Ok(Extraction { dir, found })
}

/// Unpacks a zip archive into `dest`, one entry at a time. Entries whose
/// path would land outside `dest`, or that cannot be read, are skipped.
fn unpack_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("Could not open {}", archive.display()))?;
    let mut zip = ZipArchive::new(file).context("Not a readable zip archive")?;

    for index in 0..zip.len() {
        let mut entry = match zip.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable zip entry {index}: {e}");
                continue;
            }
        };
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping zip entry with unsafe path {}", entry.name());
            continue;
        };

        let out = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out)
                .with_context(|| format!("Could not create {}", out.display()))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        let mut target =
            File::create(&out).with_context(|| format!("Could not create {}", out.display()))?;
        if let Err(e) = std::io::copy(&mut entry, &mut target) {
            tracing::warn!("Skipping corrupt zip entry {}: {e}", entry.name());
        }
    }
    Ok(())
}

/// Unpacks a rar archive into `dest` with the first extractor on `PATH`.
async fn unpack_rar(archive: &Path, dest: &Path) -> Result<()> {
    let (name, program) =
        rar_extractor().context("No .rar extractor (unrar, unar, bsdtar) found on PATH")?;

    let args = rar_args(name, archive, dest);
    let out = run_collect(&program, &args, None, None).await?;
    if !out.status.success() {
        bail!("{name} exited with {}: {}", out.status, out.combined());
    }
    Ok(())
}

/// Command line for extracting `archive` into `dest` with the named tool.
fn rar_args(tool: &str, archive: &Path, dest: &Path) -> Vec<OsString> {
    let archive = archive.as_os_str().to_os_string();
    let dest = dest.as_os_str().to_os_string();
    match tool {
        "unrar" => vec!["x".into(), "-o+".into(), "-inul".into(), archive, dest],
        "unar" => vec!["-q".into(), "-f".into(), "-o".into(), dest, archive],
        _ => vec!["-xf".into(), archive, "-C".into(), dest],
    }
}

/// True for dot-files and `__MACOSX`-style system entries.
fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.') || name.starts_with("__"))
}

/// Strips `ext` from the end of `file_name` as many times as it appears,
/// ignoring case. Returns `None` when the name does not end in `ext`.
fn base_name<'n>(file_name: &'n str, ext: &str) -> Option<&'n str> {
    let ends_with_ext = |name: &str| {
        let cut = name.len().saturating_sub(ext.len());
        !ext.is_empty()
            && name.len() >= ext.len()
            && name
                .get(cut..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(ext))
    };

    if !ends_with_ext(file_name) {
        return None;
    }
    let mut name = file_name;
    while ends_with_ext(name) {
        name = &name[..name.len() - ext.len()];
    }
    Some(name)
}

/// Walks the sandbox in file-name order and indexes matching sources.
fn collect_sources(root: &Path, file_ext: &str) -> FoundFiles {
    let mut found = FoundFiles::default();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if let Some(name) = base_name(file_name, file_ext)
            && !name.is_empty()
        {
            found.insert(name, entry.path());
        }
    }

    found
}
