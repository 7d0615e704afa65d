//! Project-relative asset path resolution.
//!
//! Scene files reference external assets (meshes, textures) by path. So a
//! project stays portable, paths inside the project root are persisted
//! relative to it and resolved back to absolute paths on load. Paths
//! outside the root pass through unchanged.

use std::path::{Path, PathBuf};

/// Maps between absolute and project-relative asset paths.
pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Strips the project root from `path` if it lies inside it.
    pub fn to_relative(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.root) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => path.to_path_buf(),
        }
    }

    /// Joins a persisted relative path back onto the project root.
    /// Absolute paths pass through unchanged.
    pub fn to_absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inside_root_round_trips_relative() {
        let resolver = AssetResolver::new("/project");
        let relative = resolver.to_relative(Path::new("/project/meshes/cube.glb"));
        assert_eq!(relative, Path::new("meshes/cube.glb"));
        assert_eq!(
            resolver.to_absolute(&relative),
            Path::new("/project/meshes/cube.glb")
        );
    }

    #[test]
    fn outside_root_passes_through() {
        let resolver = AssetResolver::new("/project");
        let outside = Path::new("/elsewhere/tex.png");
        assert_eq!(resolver.to_relative(outside), outside);
        assert_eq!(resolver.to_absolute(outside), outside);
    }
}
