use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use zip::{read::ZipArchive, write::FileOptions, CompressionMethod, ZipWriter};

#[must_use]
pub fn archive_path(root: &Path, dataset: &str) -> PathBuf {
    root.join(format!("{dataset}.zip"))
}

/// Zips the files directly inside `root/<dataset>` into `root/<dataset>.zip`.
/// Entries carry bare file names, without the dataset directory.
pub fn archive_dataset(root: &Path, dataset: &str) -> Result<PathBuf> {
    let source = root.join(dataset);
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(&source).with_context(|| format!("read {}", source.display()))? {
        let entry = entry.context("read dataset entry")?;
        if entry.file_type().context("stat dataset entry")?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let target = archive_path(root, dataset);
    let archive = File::create(&target).with_context(|| format!("create {}", target.display()))?;
    let mut writer = ZipWriter::new(archive);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("{} is not a utf-8 file name", path.display()))?;
        writer
            .start_file(name, options)
            .with_context(|| format!("add {name} to archive"))?;
        let mut input = File::open(path).with_context(|| format!("open {}", path.display()))?;
        io::copy(&mut input, &mut writer).with_context(|| format!("write {name} to archive"))?;
    }
    writer.finish().context("finish archive")?;

    tracing::debug!(archive = %target.display(), files = files.len(), "dataset archived");
    Ok(target)
}

/// Extracts every entry of `archive` into `destination`, replacing files with
/// the same name. Returns the number of files written.
pub fn extract_archive(archive: &Path, destination: &Path) -> Result<usize> {
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    let mut archive = ZipArchive::new(file).context("open zip archive")?;
    fs::create_dir_all(destination).context("create extraction directory")?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).context("read zip entry")?;
        let relative = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("zip entry {:?} escapes the dataset", entry.name()))?;
        let dest = destination.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&dest).context("create zip dir")?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).context("create zip file parent")?;
            }
            let mut outfile = File::create(&dest).context("create zip file")?;
            io::copy(&mut entry, &mut outfile).context("write zip file")?;
            written += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.is_file())
            .map(|path| {
                (
                    path.file_name().unwrap().to_string_lossy().into_owned(),
                    fs::read(&path).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn archive_then_extract_reproduces_files() {
        let root = TempDir::new().unwrap();
        let dataset = root.path().join("myset");
        fs::create_dir(&dataset).unwrap();
        fs::write(dataset.join("img1.png"), [0x89, b'P', b'N', b'G', 0, 1, 2]).unwrap();
        fs::write(dataset.join("img1.txt"), b"a photo of a cat").unwrap();

        let archive = archive_dataset(root.path(), "myset").unwrap();
        assert_eq!(archive, root.path().join("myset.zip"));

        let restored = root.path().join("restored");
        let written = extract_archive(&archive, &restored).unwrap();

        assert_eq!(written, 2);
        assert_eq!(snapshot(&restored), snapshot(&dataset));
    }

    #[test]
    fn entries_are_flat() {
        let root = TempDir::new().unwrap();
        let dataset = root.path().join("flat");
        fs::create_dir(&dataset).unwrap();
        fs::write(dataset.join("a.png"), b"a").unwrap();

        let archive = archive_dataset(root.path(), "flat").unwrap();
        let mut zip = ZipArchive::new(File::open(archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
        assert_eq!(zip.by_index(0).unwrap().name(), "a.png");
    }

    #[test]
    fn extract_overwrites_existing_files() {
        let root = TempDir::new().unwrap();
        let dataset = root.path().join("set");
        fs::create_dir(&dataset).unwrap();
        fs::write(dataset.join("a.txt"), b"edited caption").unwrap();
        let archive = archive_dataset(root.path(), "set").unwrap();

        fs::write(dataset.join("a.txt"), b"original caption").unwrap();
        extract_archive(&archive, &dataset).unwrap();

        assert_eq!(fs::read(dataset.join("a.txt")).unwrap(), b"edited caption");
    }
}
