//! Archive unpacking for verified sdists.
//!
//! Only archives that already passed digest verification reach this module.
//! Unpacking runs on the blocking thread pool; tar and zip extraction are
//! CPU/IO bound and the archives are modest in size.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Supported archive formats for source distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (`.tar.gz` / `.tgz`) — the common sdist form.
    TarGz,
    /// Zip archive.
    Zip,
}

impl ArchiveFormat {
    /// Infer the format from a URL or filename.
    pub fn detect(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Errors from unpacking an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem failure while unpacking.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip archive is malformed.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The URL does not name a supported archive format.
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// The archive unpacked to nothing.
    #[error("archive is empty: {0}")]
    Empty(PathBuf),
}

/// Unpack a verified archive into `dest` and return the project root
/// directory (the directory holding `setup.py`/`pyproject.toml`).
///
/// Sdists conventionally wrap their contents in a single `name-version/`
/// directory; that directory is returned when present.
///
/// # Errors
///
/// Returns [`ExtractError::UnsupportedFormat`] when the URL names neither a
/// tarball nor a zip, or an I/O / zip error from extraction.
pub async fn unpack_sdist(archive: &Path, url: &str, dest: &Path) -> Result<PathBuf, ExtractError> {
    let format = ArchiveFormat::detect(url)
        .ok_or_else(|| ExtractError::UnsupportedFormat(crate::filename_from_url(url).to_string()))?;

    let archive = archive.to_path_buf();
    let dest_owned = dest.to_path_buf();
    tokio::task::spawn_blocking(move || unpack_blocking(&archive, format, &dest_owned))
        .await
        .map_err(std::io::Error::other)??;

    project_root(dest)
}

fn unpack_blocking(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<(), ExtractError> {
    std::fs::create_dir_all(dest)?;
    match format {
        ArchiveFormat::TarGz => {
            let file = std::fs::File::open(archive)?;
            let decoder = flate2::read::GzDecoder::new(file);
            let mut tarball = tar::Archive::new(decoder);
            tarball.unpack(dest)?;
        }
        ArchiveFormat::Zip => {
            let file = std::fs::File::open(archive)?;
            let mut zipfile = zip::ZipArchive::new(file)?;
            zipfile.extract(dest)?;
        }
    }
    Ok(())
}

/// Locate the project root inside an unpacked archive.
///
/// If the directory holds exactly one entry and it is a directory, descend
/// into it; otherwise the unpack directory itself is the root.
///
/// # Errors
///
/// Returns [`ExtractError::Empty`] if the archive unpacked to nothing.
pub fn project_root(dir: &Path) -> Result<PathBuf, ExtractError> {
    let entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    match entries.as_slice() {
        [] => Err(ExtractError::Empty(dir.to_path_buf())),
        [only] if only.file_type()?.is_dir() => Ok(only.path()),
        _ => Ok(dir.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn make_sdist_targz(dest: &Path, root: &str) {
        let file = std::fs::File::create(dest).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let setup = b"from setuptools import setup\nsetup()\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(setup.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{root}/setup.py"), &setup[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn make_sdist_zip(dest: &Path, root: &str) {
        let file = std::fs::File::create(dest).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer
            .start_file(format!("{root}/setup.py"), options)
            .unwrap();
        writer.write_all(b"from setuptools import setup\nsetup()\n").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn detects_formats() {
        assert_eq!(
            ArchiveFormat::detect("https://x/aiohttp-3.9.5.tar.gz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(ArchiveFormat::detect("pkg.TGZ"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect("pkg.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::detect("pkg.dmg"), None);
    }

    #[tokio::test]
    async fn unpacks_targz_and_finds_root() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pydantic-2.7.0.tar.gz");
        make_sdist_targz(&archive, "pydantic-2.7.0");

        let out = dir.path().join("out");
        let root = unpack_sdist(&archive, "https://x/pydantic-2.7.0.tar.gz", &out)
            .await
            .unwrap();
        assert!(root.ends_with("pydantic-2.7.0"));
        assert!(root.join("setup.py").is_file());
    }

    #[tokio::test]
    async fn unpacks_zip_and_finds_root() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("mcp-1.8.0.zip");
        make_sdist_zip(&archive, "mcp-1.8.0");

        let out = dir.path().join("out");
        let root = unpack_sdist(&archive, "https://x/mcp-1.8.0.zip", &out)
            .await
            .unwrap();
        assert!(root.ends_with("mcp-1.8.0"));
        assert!(root.join("setup.py").is_file());
    }

    #[tokio::test]
    async fn rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg.dmg");
        std::fs::write(&archive, b"not an archive").unwrap();

        let err = unpack_sdist(&archive, "https://x/pkg.dmg", &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn project_root_of_flat_archive_is_dest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("setup.py"), b"").unwrap();
        std::fs::write(dir.path().join("README"), b"").unwrap();
        assert_eq!(project_root(dir.path()).unwrap(), dir.path());
    }
}
