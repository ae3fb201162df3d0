use crate::error::{surface_error, Error};
use crate::render::{Binding, Rendered};
use dashmap::DashMap;
use log::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Named anchors into which rendered fragments are mounted.
pub trait Surface: Send + Sync {
    /// Replace the anchor's content and bindings. Fails when the anchor no
    /// longer exists.
    fn mount(&self, anchor: &str, rendered: &Rendered) -> Result<(), Error>;
}

#[derive(Debug, Clone, Default)]
struct Mounted {
    html: String,
    bindings: Vec<Binding>,
    mounts: u64,
}

/// In-memory surface with a fixed set of anchors.
#[derive(Debug, Default)]
pub struct MemorySurface {
    anchors: DashMap<String, Mounted>,
}

impl MemorySurface {
    pub fn with_anchors(anchors: &[&str]) -> Self {
        let surface = Self::default();
        for anchor in anchors {
            surface.anchors.insert(anchor.to_string(), Mounted::default());
        }
        surface
    }

    /// Remove an anchor, as when a panel is navigated away from.
    pub fn detach(&self, anchor: &str) {
        self.anchors.remove(anchor);
    }

    pub fn html(&self, anchor: &str) -> Option<String> {
        self.anchors.get(anchor).map(|m| m.html.clone())
    }

    pub fn bindings(&self, anchor: &str) -> Vec<Binding> {
        self.anchors
            .get(anchor)
            .map(|m| m.bindings.clone())
            .unwrap_or_default()
    }

    pub fn mount_count(&self, anchor: &str) -> u64 {
        self.anchors.get(anchor).map(|m| m.mounts).unwrap_or(0)
    }
}

impl Surface for MemorySurface {
    fn mount(&self, anchor: &str, rendered: &Rendered) -> Result<(), Error> {
        let mut mounted = self
            .anchors
            .get_mut(anchor)
            .ok_or_else(|| surface_error(&format!("anchor {anchor} is not attached")))?;
        mounted.html = rendered.html.clone();
        mounted.bindings = rendered.bindings.clone();
        mounted.mounts += 1;
        Ok(())
    }
}

/// Writes each anchor to `<dir>/<anchor>.html`.
#[derive(Debug, Clone)]
pub struct DirectorySurface {
    dir: PathBuf,
}

impl DirectorySurface {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Mounting panels into {}", dir.display());
        Ok(Self { dir })
    }

    pub fn path_for(&self, anchor: &str) -> PathBuf {
        self.dir.join(format!("{anchor}.html"))
    }
}

impl Surface for DirectorySurface {
    fn mount(&self, anchor: &str, rendered: &Rendered) -> Result<(), Error> {
        if !self.dir.is_dir() {
            return Err(surface_error(&format!(
                "output directory {} is gone",
                self.dir.display()
            )));
        }
        // Bindings follow the fragment as HTML comments.
        let mut contents = rendered.html.clone();
        for binding in &rendered.bindings {
            contents.push_str(&format!(
                "\n<!-- binding {} -> {} -->",
                binding.target, binding.action
            ));
        }
        fs::write(self.path_for(anchor), contents)?;
        trace!("Mounted {anchor}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(html: &str, bindings: usize) -> Rendered {
        Rendered {
            html: html.to_string(),
            bindings: (0..bindings)
                .map(|i| Binding::new(format!("row-{i}"), "open"))
                .collect(),
        }
    }

    #[test]
    fn memory_surface_replaces_content_and_bindings() {
        let surface = MemorySurface::with_anchors(&["requests"]);
        surface.mount("requests", &fragment("<ul></ul>", 3)).unwrap();
        surface.mount("requests", &fragment("<ul></ul>", 3)).unwrap();

        assert_eq!(surface.bindings("requests").len(), 3);
        assert_eq!(surface.mount_count("requests"), 2);
        assert_eq!(surface.html("requests").as_deref(), Some("<ul></ul>"));
    }

    #[test]
    fn mounting_into_a_detached_anchor_fails() {
        let surface = MemorySurface::with_anchors(&["dashboard"]);
        surface.detach("dashboard");

        assert!(surface.mount("dashboard", &fragment("<p></p>", 0)).is_err());
        assert!(surface.mount("unknown", &fragment("<p></p>", 0)).is_err());
    }

    #[test]
    fn directory_surface_writes_one_file_per_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let surface = DirectorySurface::new(dir.path().join("panels")).unwrap();

        surface
            .mount("activity", &fragment("<ol><li>x</li></ol>", 1))
            .unwrap();

        let written = fs::read_to_string(surface.path_for("activity")).unwrap();
        assert!(written.starts_with("<ol><li>x</li></ol>"));
        assert!(written.contains("binding row-0 -> open"));
    }

    #[test]
    fn directory_surface_fails_once_the_directory_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let panels = dir.path().join("panels");
        let surface = DirectorySurface::new(&panels).unwrap();
        fs::remove_dir_all(&panels).unwrap();

        assert!(surface.mount("activity", &fragment("<ol></ol>", 0)).is_err());
    }
}
