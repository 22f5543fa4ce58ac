//! Materializes a filtered directory tree.
//!
//! Single-threaded depth-first construction; the ignore predicate is the
//! one shared with the scanner, layered with the extension allow-list (any
//! depth) and the root-folder allow-list (depth 1 only). Filtering removes
//! entries, never their non-empty ancestors, so a directory emptied purely
//! by filtering stays in the tree as a leaf.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::rules::IgnoreRules;
use super::CoreError;
use crate::utils::extensions::{normalize_allowlist_entry, normalized_extension};
use crate::utils::hidden::is_os_hidden;

/// One node of the filtered tree. Built fresh per invocation and never
/// mutated afterwards; mirroring into a mutable view model is the
/// consumer's business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub is_access_denied: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(name: String, path: PathBuf, is_directory: bool) -> Self {
        Self {
            name,
            path,
            is_directory,
            is_access_denied: false,
            children: Vec::new(),
        }
    }
}

/// Counters accumulated during construction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeStats {
    pub directories: usize,
    pub files: usize,
    pub access_denied: usize,
}

/// Allow-lists plus the ignore rules driving one build.
#[derive(Debug, Clone, Default)]
pub struct TreeBuildOptions {
    allowed_extensions: Option<HashSet<String>>,
    allowed_root_folders: Option<HashSet<String>>,
    pub ignore_rules: IgnoreRules,
}

impl TreeBuildOptions {
    pub fn new(ignore_rules: IgnoreRules) -> Self {
        Self {
            allowed_extensions: None,
            allowed_root_folders: None,
            ignore_rules,
        }
    }

    /// Restricts files (at any depth) to the given extensions. Entries are
    /// normalized, so `rs`, `.RS` and `*.rs` all mean `.rs`.
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = Some(
            extensions
                .into_iter()
                .map(|e| normalize_allowlist_entry(e.as_ref()))
                .collect(),
        );
        self
    }

    /// Restricts the immediate child folders of the tree root to the given
    /// names. Deeper folders are unaffected.
    pub fn with_allowed_root_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_root_folders = Some(
            folders
                .into_iter()
                .map(|f| f.as_ref().to_string())
                .collect(),
        );
        self
    }

    fn extension_allowed(&self, file_name: &str) -> bool {
        match &self.allowed_extensions {
            None => true,
            Some(allowed) => normalized_extension(file_name)
                .map(|ext| allowed.contains(&ext))
                .unwrap_or(false),
        }
    }

    fn root_folder_allowed(&self, folder_name: &str) -> bool {
        match &self.allowed_root_folders {
            None => true,
            Some(allowed) => allowed.contains(folder_name),
        }
    }
}

/// The completed build: the root node plus counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeBuildOutcome {
    pub root: TreeNode,
    pub stats: TreeStats,
}

/// Stateless recursive tree construction; methods are associated functions.
pub struct TreeBuilder;

impl TreeBuilder {
    /// Builds the filtered tree rooted at `root`.
    ///
    /// A missing root yields a childless root node; an unreadable root
    /// yields a root node flagged access-denied. Cancellation is the only
    /// error.
    pub fn build(
        root: &Path,
        options: &TreeBuildOptions,
        cancel_flag: &Arc<AtomicBool>,
    ) -> Result<TreeBuildOutcome, CoreError> {
        let root_name = root
            .file_name()
            .unwrap_or(root.as_os_str())
            .to_string_lossy()
            .into_owned();
        let mut root_node = TreeNode::leaf(root_name, root.to_path_buf(), true);
        let mut stats = TreeStats::default();

        match Self::build_children(root, 1, options, cancel_flag, &mut stats) {
            Ok(children) => root_node.children = children,
            Err(BuildError::Cancelled) => return Err(CoreError::Cancelled),
            Err(BuildError::AccessDenied) => {
                root_node.is_access_denied = true;
                stats.access_denied += 1;
            }
            Err(BuildError::Missing) => {
                tracing::debug!("Tree root {:?} unavailable, returning empty tree", root);
            }
        }

        Ok(TreeBuildOutcome {
            root: root_node,
            stats,
        })
    }

    fn build_children(
        dir: &Path,
        depth: usize,
        options: &TreeBuildOptions,
        cancel_flag: &Arc<AtomicBool>,
        stats: &mut TreeStats,
    ) -> Result<Vec<TreeNode>, BuildError> {
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(BuildError::Cancelled);
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(BuildError::AccessDenied)
            }
            Err(_) => return Err(BuildError::Missing),
        };

        let mut children = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else {
                stats.access_denied += 1;
                continue;
            };
            let Ok(metadata) = entry.metadata() else {
                stats.access_denied += 1;
                continue;
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let is_directory = metadata.is_dir();
            let path = entry.path();

            // Allow-list membership and the ignore predicate are
            // independently necessary; neither overrides the other.
            if options.ignore_rules.is_entry_ignored(
                &path,
                &name,
                is_directory,
                is_os_hidden(&metadata),
            ) {
                continue;
            }
            if is_directory {
                if depth == 1 && !options.root_folder_allowed(&name) {
                    continue;
                }
            } else if !options.extension_allowed(&name) {
                continue;
            }

            if is_directory {
                let mut node = TreeNode::leaf(name, path, true);
                stats.directories += 1;
                match Self::build_children(&node.path, depth + 1, options, cancel_flag, stats) {
                    Ok(grandchildren) => node.children = grandchildren,
                    Err(BuildError::Cancelled) => return Err(BuildError::Cancelled),
                    Err(BuildError::AccessDenied) => {
                        // Local failure: keep the node, mark it, move on.
                        node.is_access_denied = true;
                        stats.access_denied += 1;
                    }
                    Err(BuildError::Missing) => {
                        // Vanished between enumeration and descent.
                        tracing::debug!("Directory {:?} vanished during build", node.path);
                    }
                }
                children.push(node);
            } else {
                stats.files += 1;
                children.push(TreeNode::leaf(name, path, false));
            }
        }

        // Directories first, then lexicographic, mirroring the UI ordering.
        children.sort_by(|a, b| match (a.is_directory, b.is_directory) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name.cmp(&b.name),
        });

        Ok(children)
    }
}

enum BuildError {
    Cancelled,
    AccessDenied,
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{IgnoreOptionId, IgnoreRulesService};
    use crate::utils::test_helpers::setup_test_logging;
    use std::fs;
    use tempfile::TempDir;

    fn create_file(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "content").unwrap();
    }

    fn no_cancel() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    fn child_names(node: &TreeNode) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    fn find_child<'a>(node: &'a TreeNode, name: &str) -> &'a TreeNode {
        node.children
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("missing child {name:?}"))
    }

    #[test]
    fn children_are_ordered_directories_first() {
        setup_test_logging();
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "b.txt");
        create_file(dir.path(), "a.txt");
        fs::create_dir(dir.path().join("zdir")).unwrap();

        let options = TreeBuildOptions::new(IgnoreRules::default());
        let outcome = TreeBuilder::build(dir.path(), &options, &no_cancel()).unwrap();

        assert_eq!(child_names(&outcome.root), vec!["zdir", "a.txt", "b.txt"]);
        assert_eq!(outcome.stats.directories, 1);
        assert_eq!(outcome.stats.files, 2);
    }

    #[test]
    fn gitignore_scenario_bin_obj_src() {
        setup_test_logging();
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "bin/\nobj/").unwrap();
        create_file(dir.path(), "bin/Debug/app.dll");
        create_file(dir.path(), "obj/app.csproj.nuget.dgspec.json");
        create_file(dir.path(), "src/app.cs");

        let service = IgnoreRulesService::default();

        let with_git = service.build(dir.path(), &[IgnoreOptionId::GitIgnore], None);
        let outcome = TreeBuilder::build(
            dir.path(),
            &TreeBuildOptions::new(with_git),
            &no_cancel(),
        )
        .unwrap();
        let dirs: Vec<&str> = outcome
            .root
            .children
            .iter()
            .filter(|c| c.is_directory)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(dirs, vec!["src"]);

        let without_git = service.build(dir.path(), &[], None);
        let outcome = TreeBuilder::build(
            dir.path(),
            &TreeBuildOptions::new(without_git),
            &no_cancel(),
        )
        .unwrap();
        let dirs: Vec<&str> = outcome
            .root
            .children
            .iter()
            .filter(|c| c.is_directory)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(dirs, vec!["bin", "obj", "src"]);
    }

    #[test]
    fn root_folder_allowlist_applies_only_at_depth_one() {
        setup_test_logging();
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "keep/nested/skip/inner.txt");
        create_file(dir.path(), "skip/outer.txt");

        let options = TreeBuildOptions::new(IgnoreRules::default())
            .with_allowed_root_folders(["keep"]);
        let outcome = TreeBuilder::build(dir.path(), &options, &no_cancel()).unwrap();

        // The depth-1 `skip` is excluded entirely; the deeper folder with
        // the same name is unaffected.
        assert_eq!(child_names(&outcome.root), vec!["keep"]);
        let nested = find_child(find_child(&outcome.root, "keep"), "nested");
        assert_eq!(child_names(nested), vec!["skip"]);
    }

    #[test]
    fn allowlisted_root_folder_still_subject_to_ignore_rules() {
        setup_test_logging();
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), ".dotted/file.txt");
        create_file(dir.path(), "plain/file.txt");

        let service = IgnoreRulesService::default();
        let rules = service.build(dir.path(), &[IgnoreOptionId::DotFolders], None);
        let options =
            TreeBuildOptions::new(rules).with_allowed_root_folders([".dotted", "plain"]);
        let outcome = TreeBuilder::build(dir.path(), &options, &no_cancel()).unwrap();

        // Allow-list membership and the ignore predicate are both
        // necessary; the allow-list does not resurrect an ignored folder.
        assert_eq!(child_names(&outcome.root), vec!["plain"]);
    }

    #[test]
    fn extension_allowlist_applies_at_any_depth() {
        setup_test_logging();
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "top.rs");
        create_file(dir.path(), "top.md");
        create_file(dir.path(), "deep/inner.rs");
        create_file(dir.path(), "deep/inner.md");

        let options =
            TreeBuildOptions::new(IgnoreRules::default()).with_allowed_extensions(["rs"]);
        let outcome = TreeBuilder::build(dir.path(), &options, &no_cancel()).unwrap();

        assert_eq!(child_names(&outcome.root), vec!["deep", "top.rs"]);
        assert_eq!(child_names(find_child(&outcome.root, "deep")), vec!["inner.rs"]);
    }

    #[test]
    fn directory_emptied_by_filtering_remains_as_leaf() {
        setup_test_logging();
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "docs/readme.md");
        create_file(dir.path(), "src/main.rs");

        let options =
            TreeBuildOptions::new(IgnoreRules::default()).with_allowed_extensions([".rs"]);
        let outcome = TreeBuilder::build(dir.path(), &options, &no_cancel()).unwrap();

        let docs = find_child(&outcome.root, "docs");
        assert!(docs.is_directory);
        assert!(docs.children.is_empty());
        assert!(!docs.is_access_denied);
    }

    #[test]
    fn extensionless_files_filtered_when_option_set() {
        setup_test_logging();
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "Makefile");
        create_file(dir.path(), "LICENSE");
        create_file(dir.path(), ".env");
        create_file(dir.path(), "main.rs");

        let service = IgnoreRulesService::default();
        let rules = service.build(dir.path(), &[IgnoreOptionId::ExtensionlessFiles], None);
        let outcome =
            TreeBuilder::build(dir.path(), &TreeBuildOptions::new(rules), &no_cancel()).unwrap();

        // `.env` keeps its dot-name extension; `Makefile` and `LICENSE`
        // are extensionless and go.
        assert_eq!(child_names(&outcome.root), vec![".env", "main.rs"]);
    }

    #[test]
    fn missing_root_yields_childless_root_node() {
        setup_test_logging();
        let options = TreeBuildOptions::new(IgnoreRules::default());
        let outcome =
            TreeBuilder::build(Path::new("/no/such/root"), &options, &no_cancel()).unwrap();
        assert!(outcome.root.children.is_empty());
        assert!(!outcome.root.is_access_denied);
        assert_eq!(outcome.stats, TreeStats::default());
    }

    #[test]
    fn pre_cancelled_build_reports_cancellation() {
        setup_test_logging();
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a.txt");
        let options = TreeBuildOptions::new(IgnoreRules::default());
        let cancel = Arc::new(AtomicBool::new(true));
        assert!(matches!(
            TreeBuilder::build(dir.path(), &options, &cancel),
            Err(CoreError::Cancelled)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_becomes_access_denied_leaf() {
        use crate::utils::test_helpers::running_as_root;
        use std::os::unix::fs::PermissionsExt;

        setup_test_logging();
        if running_as_root() {
            return; // Root bypasses permission bits.
        }

        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "open/file.txt");
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let options = TreeBuildOptions::new(IgnoreRules::default());
        let outcome = TreeBuilder::build(dir.path(), &options, &no_cancel()).unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let locked_node = find_child(&outcome.root, "locked");
        assert!(locked_node.is_access_denied);
        assert!(locked_node.children.is_empty());
        assert_eq!(outcome.stats.access_denied, 1);
        assert!(!find_child(&outcome.root, "open").is_access_denied);
    }
}
