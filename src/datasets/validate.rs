use std::{
    collections::{HashMap, HashSet},
    ffi::OsString,
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use thiserror::Error;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "svg", "webp"];
const CAPTION_EXTENSION: &str = "txt";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDataset {
    #[error("no image files")]
    NoImages,
    #[error("no caption files")]
    NoCaptions,
    #[error("{images} images but {captions} captions")]
    CountMismatch { images: usize, captions: usize },
    #[error("image '{0}' has no caption")]
    MissingCaption(String),
    #[error("more than one {kind} named '{stem}'")]
    DuplicateStem { kind: &'static str, stem: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetCheck {
    Valid { pairs: usize },
    Invalid(InvalidDataset),
}

impl DatasetCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, DatasetCheck::Valid { .. })
    }
}

enum FileKind {
    Image,
    Caption,
    Other,
}

fn classify(path: &Path) -> FileKind {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return FileKind::Other;
    };
    let extension = extension.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Image
    } else if extension == CAPTION_EXTENSION {
        FileKind::Caption
    } else {
        FileKind::Other
    }
}

/// Checks that the direct children of `dir` pair up one image per caption.
/// Files of other types are ignored.
pub fn validate_dataset(dir: &Path) -> Result<DatasetCheck> {
    let mut images: HashMap<OsString, String> = HashMap::new();
    let mut captions: HashSet<OsString> = HashSet::new();

    for entry in fs::read_dir(dir).with_context(|| format!("read dataset {}", dir.display()))? {
        let entry = entry.context("read dataset entry")?;
        if !entry.file_type().context("stat dataset entry")?.is_file() {
            continue;
        }
        let path = entry.path();
        let kind = classify(&path);
        let Some(stem) = path.file_stem().map(|stem| stem.to_os_string()) else {
            continue;
        };
        let duplicate = match kind {
            FileKind::Image => {
                let name = entry.file_name().to_string_lossy().into_owned();
                images.insert(stem.clone(), name).is_some().then_some("image")
            }
            FileKind::Caption => (!captions.insert(stem.clone())).then_some("caption"),
            FileKind::Other => None,
        };
        if let Some(kind) = duplicate {
            return Ok(DatasetCheck::Invalid(InvalidDataset::DuplicateStem {
                kind,
                stem: stem.to_string_lossy().into_owned(),
            }));
        }
    }

    if images.is_empty() {
        return Ok(DatasetCheck::Invalid(InvalidDataset::NoImages));
    }
    if captions.is_empty() {
        return Ok(DatasetCheck::Invalid(InvalidDataset::NoCaptions));
    }
    if images.len() != captions.len() {
        return Ok(DatasetCheck::Invalid(InvalidDataset::CountMismatch {
            images: images.len(),
            captions: captions.len(),
        }));
    }
    // Equal counts of unique stems: every image having a caption means the
    // two sets are identical.
    let mut unpaired: Vec<&String> = images
        .iter()
        .filter(|(stem, _)| !captions.contains(*stem))
        .map(|(_, name)| name)
        .collect();
    unpaired.sort();
    if let Some(name) = unpaired.first() {
        return Ok(DatasetCheck::Invalid(InvalidDataset::MissingCaption(
            (*name).clone(),
        )));
    }

    Ok(DatasetCheck::Valid {
        pairs: images.len(),
    })
}

/// Names of the immediate subdirectories of `root` that are valid datasets,
/// sorted by name.
pub fn eligible_datasets(root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry.context("read directory entry")?;
        if !entry.file_type().context("stat directory entry")?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        match validate_dataset(&entry.path()) {
            Ok(check) if check.is_valid() => names.push(name),
            Ok(DatasetCheck::Invalid(reason)) => {
                tracing::debug!(dataset = %name, "not a dataset: {reason}");
            }
            Ok(_) => {}
            Err(error) => tracing::warn!(dataset = %name, "Failed to scan directory: {error:#}"),
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dataset(files: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for file in files {
            fs::write(temp.path().join(file), file.as_bytes()).unwrap();
        }
        temp
    }

    #[test]
    fn accepts_exact_pairs() {
        let dir = dataset(&["a.png", "a.txt", "b.jpg", "b.txt"]);
        assert_eq!(
            validate_dataset(dir.path()).unwrap(),
            DatasetCheck::Valid { pairs: 2 }
        );
    }

    #[test]
    fn extensions_are_case_insensitive() {
        let dir = dataset(&["a.PNG", "a.txt", "b.WebP", "b.TXT"]);
        assert!(validate_dataset(dir.path()).unwrap().is_valid());
    }

    #[test]
    fn rejects_stem_mismatch() {
        let dir = dataset(&["a.png", "b.txt"]);
        assert_eq!(
            validate_dataset(dir.path()).unwrap(),
            DatasetCheck::Invalid(InvalidDataset::MissingCaption("a.png".into()))
        );
    }

    #[test]
    fn rejects_unpaired_image() {
        let dir = dataset(&["a.png", "a.txt", "b.png"]);
        assert_eq!(
            validate_dataset(dir.path()).unwrap(),
            DatasetCheck::Invalid(InvalidDataset::CountMismatch {
                images: 2,
                captions: 1
            })
        );
    }

    #[test]
    fn shared_image_stem_cannot_hide_orphan_caption() {
        let dir = dataset(&["a.png", "a.jpg", "a.txt", "b.txt"]);
        assert_eq!(
            validate_dataset(dir.path()).unwrap(),
            DatasetCheck::Invalid(InvalidDataset::DuplicateStem {
                kind: "image",
                stem: "a".into()
            })
        );
    }

    #[test]
    fn rejects_empty_directory() {
        let dir = dataset(&[]);
        assert_eq!(
            validate_dataset(dir.path()).unwrap(),
            DatasetCheck::Invalid(InvalidDataset::NoImages)
        );
    }

    #[test]
    fn rejects_captions_only() {
        let dir = dataset(&["a.txt"]);
        assert_eq!(
            validate_dataset(dir.path()).unwrap(),
            DatasetCheck::Invalid(InvalidDataset::NoImages)
        );
        let dir = dataset(&["a.png"]);
        assert_eq!(
            validate_dataset(dir.path()).unwrap(),
            DatasetCheck::Invalid(InvalidDataset::NoCaptions)
        );
    }

    #[test]
    fn nested_directories_are_not_scanned() {
        let dir = dataset(&["a.png", "a.txt"]);
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("b.png"), b"b").unwrap();
        assert!(validate_dataset(dir.path()).unwrap().is_valid());
    }

    #[test]
    fn lists_only_valid_subdirectories() {
        let root = TempDir::new().unwrap();
        for (name, files) in [
            ("zeta", &["z.png", "z.txt"][..]),
            ("alpha", &["a.jpg", "a.txt"][..]),
            ("broken", &["a.png"][..]),
        ] {
            let dir = root.path().join(name);
            fs::create_dir(&dir).unwrap();
            for file in files {
                fs::write(dir.join(file), b"x").unwrap();
            }
        }
        fs::write(root.path().join("loose.png"), b"x").unwrap();

        assert_eq!(eligible_datasets(root.path()).unwrap(), ["alpha", "zeta"]);
    }
}
