use std::fs;
use std::path::{Path, PathBuf};

use ignore::{DirEntry, Walk, WalkBuilder};

use crate::entry::{Entry, EntryKind};
use crate::error::RummageError;
use crate::traits::Source;

// ---------------------------------------------------------------------------
// WalkConfig
// ---------------------------------------------------------------------------

/// Traversal parameters handed to a [`Source`].
///
/// Built from [`SearchOptions`](crate::request::SearchOptions) by the task;
/// construct one directly only when driving a [`Walker`](crate::walker::Walker)
/// yourself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkConfig {
    /// Maximum traversal depth. `None` is unlimited; `Some(1)` lists only the
    /// root's immediate children.
    pub max_depth: Option<usize>,

    /// Descend through symbolic links. Loops are detected and skipped.
    pub follow_links: bool,
}

// ---------------------------------------------------------------------------
// DirectorySource
// ---------------------------------------------------------------------------

/// Depth-first filesystem traversal rooted at one directory.
///
/// Built on `ignore`'s sequential walker with every filter switched off:
/// hidden files, `.gitignore`d files and other filesystems are all visited.
/// Entries come out in the order the OS lists them. The root itself is not
/// yielded.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn build(&self, config: &WalkConfig) -> Walk {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .ignore(false)
            .parents(false)
            .hidden(false)
            .follow_links(config.follow_links)
            .same_file_system(false)
            .max_depth(config.max_depth);
        builder.build()
    }
}

impl Source for DirectorySource {
    fn walk(&self, config: &WalkConfig) -> Box<dyn Iterator<Item = Result<Entry, RummageError>> + '_> {
        let entries = self
            .build(config)
            .filter_map(|res| match res {
                Ok(entry) if entry.depth() == 0 => None,
                Ok(entry) => convert(entry).map(Ok),
                Err(e)    => Some(Err(map_ignore_error(e))),
            });
        Box::new(entries)
    }
}

fn convert(entry: DirEntry) -> Option<Entry> {
    // stdin is the only entry without a file type; never produced for a real root.
    let ft = entry.file_type()?;

    let kind = if ft.is_dir() {
        EntryKind::Dir
    } else if ft.is_file() {
        EntryKind::File
    } else if ft.is_symlink() {
        link_kind(entry.path())
    } else {
        EntryKind::Other
    };

    let name = entry
        .file_name()
        .to_string_lossy()
        .into_owned();

    Some(Entry {
        depth: entry.depth(),
        path:  entry.into_path(),
        name,
        kind,
    })
}

/// Classify a link that was not followed by what it points at, so a link to
/// a file is searched like the file. Links to directories are never entered.
fn link_kind(path: &Path) -> EntryKind {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir()  => EntryKind::Symlink,
        Ok(meta) if meta.is_file() => EntryKind::File,
        _ => EntryKind::Other,
    }
}

// ---------------------------------------------------------------------------
// Map ignore::Error to RummageError
// ---------------------------------------------------------------------------

fn map_ignore_error(e: ignore::Error) -> RummageError {
    match e {
        ignore::Error::WithDepth { err, .. } => map_ignore_error(*err),
        ignore::Error::WithLineNumber { err, .. } => map_ignore_error(*err),
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Io(io_err) => RummageError::from_io(path, io_err),
            ignore::Error::Loop { child, .. } => RummageError::SymlinkLoop(child),
            other => RummageError::Source(format!("{}: {}", path.display(), other)),
        },
        ignore::Error::Loop { child, .. } => RummageError::SymlinkLoop(child),
        ignore::Error::Io(io_err) => RummageError::from_io(PathBuf::new(), io_err),
        other => RummageError::Source(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn yields_everything_but_the_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        fs::write(dir.path().join("kept.log"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("inner.txt"), "").unwrap();

        let source = DirectorySource::new(dir.path());
        let mut names: Vec<String> = source
            .walk(&WalkConfig::default())
            .map(|e| e.unwrap().name)
            .collect();
        names.sort();

        assert_eq!(names, vec![".gitignore", ".hidden", "inner.txt", "kept.log", "sub"]);
    }

    #[test]
    fn max_depth_limits_descent() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a").join("b")).unwrap();
        fs::write(dir.path().join("a").join("b").join("deep.txt"), "").unwrap();

        let source = DirectorySource::new(dir.path());
        let config = WalkConfig { max_depth: Some(2), ..WalkConfig::default() };
        let entries: Vec<Entry> = source.walk(&config).map(Result::unwrap).collect();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.kind == EntryKind::Dir));
        assert!(entries.iter().all(|e| e.depth <= 2));
    }

    #[test]
    fn paths_are_joined_to_the_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f.txt"), "").unwrap();

        let source = DirectorySource::new(dir.path());
        let entry = source.walk(&WalkConfig::default()).next().unwrap().unwrap();

        assert_eq!(entry.path, dir.path().join("f.txt"));
        assert_eq!(entry.depth, 1);
        assert!(entry.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn unfollowed_links_take_their_target_kind() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        symlink(dir.path().join("a.txt"), dir.path().join("to-file")).unwrap();
        symlink(dir.path().join("sub"), dir.path().join("to-dir")).unwrap();
        symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        let source = DirectorySource::new(dir.path());
        let kind_of = |name: &str| {
            source
                .walk(&WalkConfig::default())
                .map(Result::unwrap)
                .find(|e| e.name == name)
                .map(|e| e.kind)
        };

        assert_eq!(kind_of("to-file"), Some(EntryKind::File));
        assert_eq!(kind_of("to-dir"), Some(EntryKind::Symlink));
        assert_eq!(kind_of("dangling"), Some(EntryKind::Other));
    }
}
