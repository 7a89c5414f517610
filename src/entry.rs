use std::path::PathBuf;

/// A single item produced by a [`Source`](crate::traits::Source) during traversal.
///
/// `name` is the base name the matcher tests; `path` is what gets reported
/// when the entry matches. Sources that are not backed by a real filesystem
/// can still produce entries, which keeps the walker testable without disk I/O.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Full path to the entry. Absolute when produced by a
    /// [`DirectorySource`](crate::source::DirectorySource) rooted at an absolute path.
    pub path: PathBuf,

    /// The entry's base name (lossily converted to UTF-8).
    pub name: String,

    /// What kind of entry this is.
    pub kind: EntryKind,

    /// How deep in the traversal this entry was found. Root = 0.
    pub depth: usize,
}

impl Entry {
    /// Build a file entry, taking the name from the last path component.
    pub fn file(path: impl Into<PathBuf>, depth: usize) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name, kind: EntryKind::File, depth }
    }

    /// Build a directory entry, taking the name from the last path component.
    pub fn dir(path: impl Into<PathBuf>, depth: usize) -> Self {
        Self { kind: EntryKind::Dir, ..Self::file(path, depth) }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// The kind of a traversed entry.
///
/// Filesystem sources map `DirEntry` file types to these variants; a link
/// that is not followed takes the kind of its target. Everything except
/// [`EntryKind::Dir`] and [`EntryKind::Symlink`] is tested against the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file, or an unfollowed link to one.
    File,

    /// A directory.
    Dir,

    /// A symbolic link to a directory that was not followed.
    Symlink,

    /// Anything else: device files, pipes, sockets and dangling links.
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_comes_from_last_component() {
        let e = Entry::file("/tmp/deep/report.txt", 2);
        assert_eq!(e.name, "report.txt");
        assert!(e.is_file());

        let d = Entry::dir("/tmp/deep", 1);
        assert_eq!(d.name, "deep");
        assert_eq!(d.kind, EntryKind::Dir);
    }
}
