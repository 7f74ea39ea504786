use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::catalog::ModelType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Checkpoints,
    Embeddings,
    Lora,
}

impl Destination {
    /// Path below the web UI root.
    #[must_use]
    pub fn relative_path(&self) -> &'static Path {
        match self {
            Destination::Checkpoints => Path::new("models/Stable-diffusion"),
            Destination::Embeddings => Path::new("embeddings"),
            Destination::Lora => Path::new("models/Lora"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Install(Destination),
    Unsupported,
    Unknown,
}

pub fn route(model_type: &ModelType) -> Route {
    match model_type {
        ModelType::Checkpoint => Route::Install(Destination::Checkpoints),
        ModelType::TextualInversion => Route::Install(Destination::Embeddings),
        ModelType::Lora => Route::Install(Destination::Lora),
        ModelType::Hypernetwork
        | ModelType::AestheticGradient
        | ModelType::Controlnet
        | ModelType::Poses => Route::Unsupported,
        ModelType::Other(_) => Route::Unknown,
    }
}

/// Working directory plus the web UI tree models are installed into.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: PathBuf,
    webui: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: PathBuf, webui_dir: &Path) -> Self {
        let webui = if webui_dir.is_absolute() {
            webui_dir.to_path_buf()
        } else {
            root.join(webui_dir)
        };
        Self { root, webui }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub fn webui(&self) -> &Path {
        self.webui.as_path()
    }

    #[must_use]
    pub fn destination_dir(&self, destination: Destination) -> PathBuf {
        self.webui.join(destination.relative_path())
    }

    pub fn staging_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

/// True when `name` is a single path component, so joining it to a
/// directory cannot leave that directory.
pub fn is_plain_name(name: &str) -> bool {
    Path::new(name)
        .file_name()
        .map(|file_name| file_name == name)
        .unwrap_or(false)
}

/// Moves `staged` into `dir`, replacing a file of the same name.
pub fn place(staged: &Path, dir: &Path) -> Result<PathBuf> {
    let file_name = staged
        .file_name()
        .with_context(|| format!("{} has no file name", staged.display()))?;
    let target = dir.join(file_name);

    if target.is_file() {
        fs::remove_file(&target)
            .with_context(|| format!("remove existing {}", target.display()))?;
    }

    if let Err(error) = fs::rename(staged, &target) {
        tracing::debug!("rename failed ({error}), falling back to copy");
        fs::copy(staged, &target)
            .with_context(|| format!("copy {} to {}", staged.display(), target.display()))?;
        fs::remove_file(staged).with_context(|| format!("remove {}", staged.display()))?;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn routes_installable_types() {
        assert_eq!(
            route(&ModelType::Checkpoint),
            Route::Install(Destination::Checkpoints)
        );
        assert_eq!(
            route(&ModelType::TextualInversion),
            Route::Install(Destination::Embeddings)
        );
        assert_eq!(route(&ModelType::Lora), Route::Install(Destination::Lora));
    }

    #[test]
    fn routes_unsupported_and_unknown_types() {
        for model_type in [
            ModelType::Hypernetwork,
            ModelType::AestheticGradient,
            ModelType::Controlnet,
            ModelType::Poses,
        ] {
            assert_eq!(route(&model_type), Route::Unsupported);
        }
        assert_eq!(route(&ModelType::Other("Wildcards".into())), Route::Unknown);
    }

    #[test]
    fn layout_resolves_relative_webui() {
        let layout = WorkspaceLayout::new(
            PathBuf::from("/workspace"),
            Path::new("stable-diffusion-webui"),
        );
        assert_eq!(
            layout.destination_dir(Destination::Lora),
            PathBuf::from("/workspace/stable-diffusion-webui/models/Lora")
        );
        assert_eq!(
            layout.staging_path("a.safetensors"),
            PathBuf::from("/workspace/a.safetensors")
        );
    }

    #[test]
    fn place_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("m.bin"), b"old").unwrap();
        let staged = temp.path().join("m.bin");
        fs::write(&staged, b"new").unwrap();

        let placed = place(&staged, &dest).unwrap();

        assert_eq!(placed, dest.join("m.bin"));
        assert_eq!(fs::read(&placed).unwrap(), b"new");
        assert!(!staged.exists());
    }

    #[test]
    fn plain_names_stay_in_their_directory() {
        assert!(is_plain_name("myset"));
        assert!(is_plain_name("model.safetensors"));
        for name in ["", ".", "..", "../x", "a/b", "/tmp/x"] {
            assert!(!is_plain_name(name), "{name}");
        }
    }
}
