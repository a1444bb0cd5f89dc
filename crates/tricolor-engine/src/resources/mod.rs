//! Finds resource files (shaders) under a set of content roots.
//!
//! Roots are indexed recursively by file name. Lookups take either a bare
//! `name.ext` or `parent/name.ext` when several roots contain the same file
//! name; the first indexed match wins.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension for shader sources.
pub const SHADER_EXTENSION: &str = ".wgsl";

#[derive(Debug)]
pub enum ResourceError {
    /// No indexed file matches the requested name.
    NotFound(String),
    /// A content root does not exist or is not a directory.
    NotADirectory(PathBuf),
    /// Reading a directory or file failed.
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound(name) => write!(f, "unable to locate resource {name:?}"),
            ResourceError::NotADirectory(path) => {
                write!(f, "content root {} is not a directory", path.display())
            }
            ResourceError::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// File-name index over one or more root directories.
#[derive(Debug, Clone)]
pub struct ContentRoots {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
    cache: Index,
}

impl Default for ContentRoots {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extensions: vec![SHADER_EXTENSION.to_string()],
            cache: Index::new(),
        }
    }
}

impl ContentRoots {
    /// Indexes `roots` for the default extensions.
    pub fn new<I, P>(roots: I) -> Result<Self, ResourceError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut this = Self::default();
        this.add_roots(roots)?;
        Ok(this)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Replaces all roots and rebuilds the index from scratch.
    pub fn set_roots<I, P>(&mut self, roots: I) -> Result<(), ResourceError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.roots.clear();
        self.cache.clear();
        self.add_roots(roots)
    }

    /// Adds roots without discarding what is already indexed.
    ///
    /// Each root is indexed in full before it is committed; a root that fails
    /// leaves no entries behind. Roots before it stay added.
    pub fn add_roots<I, P>(&mut self, roots: I) -> Result<(), ResourceError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for root in roots {
            let root = root.into();
            let mut found = Index::new();
            index_directory(&root, &self.extensions, &mut found)?;
            self.merge(found);
            self.roots.push(root);
        }
        Ok(())
    }

    /// Starts indexing additional extensions (`"png"` and `".png"` are equivalent)
    /// and rescans the existing roots for them.
    ///
    /// On error nothing changes: neither the extension list nor the index.
    pub fn add_extensions<I, S>(&mut self, extensions: I) -> Result<(), ResourceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = normalize_extension(ext.as_ref());
            if !self.extensions.contains(&ext) && !added.contains(&ext) {
                added.push(ext);
            }
        }
        if added.is_empty() {
            return Ok(());
        }

        let mut found = Index::new();
        for root in &self.roots {
            index_directory(root, &added, &mut found)?;
        }
        self.merge(found);
        self.extensions.extend(added);
        Ok(())
    }

    /// Path of `name` (`"file.ext"` or `"parent/file.ext"`).
    pub fn get_file(&self, name: &str) -> Result<&Path, ResourceError> {
        let (parent, file) = match name.rsplit_once(['/', '\\']) {
            Some((parent, file)) => (Some(parent), file),
            None => (None, name),
        };

        let candidates = self.cache.get(file).map(Vec::as_slice).unwrap_or_default();
        let found = match parent {
            None => candidates.first(),
            Some(parent) => candidates.iter().find(|p| {
                p.parent()
                    .and_then(Path::file_name)
                    .is_some_and(|n| n == parent)
            }),
        };

        found
            .map(PathBuf::as_path)
            .ok_or_else(|| ResourceError::NotFound(name.to_string()))
    }

    /// Path of a shader given with or without its `.wgsl` extension.
    pub fn get_shader_file(&self, name: &str) -> Result<&Path, ResourceError> {
        if name.ends_with(SHADER_EXTENSION) {
            self.get_file(name)
        } else {
            self.get_file(&format!("{name}{SHADER_EXTENSION}"))
        }
    }

    /// Reads a shader's source text.
    pub fn read_shader(&self, name: &str) -> Result<String, ResourceError> {
        let path = self.get_shader_file(name)?;
        fs::read_to_string(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn merge(&mut self, found: Index) {
        for (name, paths) in found {
            self.cache.entry(name).or_default().extend(paths);
        }
    }
}

type Index = HashMap<String, Vec<PathBuf>>;

fn index_directory(dir: &Path, exts: &[String], into: &mut Index) -> Result<(), ResourceError> {
    if !dir.is_dir() {
        return Err(ResourceError::NotADirectory(dir.to_path_buf()));
    }

    let io_err = |source: std::io::Error| ResourceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    // read_dir order is platform-defined; sort so "first match" is stable.
    entries.sort();

    for path in entries {
        if path.is_dir() {
            index_directory(&path, exts, into)?;
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if exts.iter().any(|ext| file_name.ends_with(ext.as_str())) {
            log::trace!("indexed resource {}", path.display());
            into.entry(file_name.to_string()).or_default().push(path);
        }
    }
    Ok(())
}

fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn finds_shader_with_or_without_extension() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "shaders/fixture.wgsl", "// fixture");

        let roots = ContentRoots::new([tmp.path()]).unwrap();
        let a = roots.get_shader_file("fixture").unwrap();
        let b = roots.get_shader_file("fixture.wgsl").unwrap();
        assert_eq!(a, b);
        assert_eq!(roots.read_shader("fixture").unwrap(), "// fixture");
    }

    #[test]
    fn unsupported_extensions_are_not_indexed() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "notes.txt", "");

        let roots = ContentRoots::new([tmp.path()]).unwrap();
        assert!(matches!(roots.get_file("notes.txt"), Err(ResourceError::NotFound(_))));
    }

    #[test]
    fn parent_directory_disambiguates() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a/water.wgsl", "a");
        touch(tmp.path(), "b/water.wgsl", "b");

        let roots = ContentRoots::new([tmp.path()]).unwrap();
        assert!(roots.get_file("b/water.wgsl").unwrap().ends_with("b/water.wgsl"));
        assert!(roots.get_file("a/water.wgsl").unwrap().ends_with("a/water.wgsl"));
        // Bare name: first in sorted order.
        assert!(roots.get_file("water.wgsl").unwrap().ends_with("a/water.wgsl"));
        assert!(roots.get_file("c/water.wgsl").is_err());
    }

    #[test]
    fn added_extensions_rescan_existing_roots() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "img/logo.png", "");

        let mut roots = ContentRoots::new([tmp.path()]).unwrap();
        assert!(roots.get_file("logo.png").is_err());

        roots.add_extensions(["png"]).unwrap();
        assert!(roots.get_file("logo.png").is_ok());
    }

    #[test]
    fn set_roots_clears_previous_index() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(first.path(), "old.wgsl", "");
        touch(second.path(), "new.wgsl", "");

        let mut roots = ContentRoots::new([first.path()]).unwrap();
        roots.set_roots([second.path()]).unwrap();
        assert!(roots.get_shader_file("old").is_err());
        assert!(roots.get_shader_file("new").is_ok());
        assert_eq!(roots.roots(), &[second.path().to_path_buf()]);
    }

    #[test]
    fn add_roots_keeps_previous_index() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(first.path(), "old.wgsl", "");
        touch(second.path(), "new.wgsl", "");

        let mut roots = ContentRoots::new([first.path()]).unwrap();
        roots.add_roots([second.path()]).unwrap();
        assert!(roots.get_shader_file("old").is_ok());
        assert!(roots.get_shader_file("new").is_ok());
    }

    #[test]
    fn missing_root_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            ContentRoots::new([missing]),
            Err(ResourceError::NotADirectory(_))
        ));
    }

    #[test]
    fn failed_extension_rescan_changes_nothing() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(first.path(), "img/logo.png", "");

        let mut roots = ContentRoots::new([first.path(), second.path()]).unwrap();
        let second_path = second.path().to_path_buf();
        drop(second);

        // The first root scans fine, the second is gone.
        assert!(matches!(
            roots.add_extensions(["png"]),
            Err(ResourceError::NotADirectory(p)) if p == second_path
        ));
        assert!(roots.get_file("logo.png").is_err());

        // "png" was not recorded, so a later retry rescans.
        fs::create_dir_all(&second_path).unwrap();
        roots.add_extensions(["png"]).unwrap();
        assert!(roots.get_file("logo.png").is_ok());
        fs::remove_dir_all(&second_path).unwrap();
    }

    #[test]
    fn roots_added_before_a_failing_root_are_kept() {
        let good = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        touch(good.path(), "ok.wgsl", "");

        let mut roots = ContentRoots::default();
        assert!(roots.add_roots([good.path().to_path_buf(), tmp.path().join("nope")]).is_err());
        assert_eq!(roots.roots(), &[good.path().to_path_buf()]);
        assert!(roots.get_shader_file("ok").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_leaves_no_partial_index() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a/early.wgsl", "");
        let locked = tmp.path().join("b");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read it anyway; nothing to check then.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut roots = ContentRoots::default();
        let result = roots.add_roots([tmp.path()]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(ResourceError::Io { .. })));
        assert!(roots.roots().is_empty());
        assert!(roots.get_shader_file("early").is_err());
    }

    #[test]
    fn extension_normalization() {
        assert_eq!(normalize_extension("png"), ".png");
        assert_eq!(normalize_extension(".png"), ".png");
    }
}
