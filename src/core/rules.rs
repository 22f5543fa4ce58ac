//! Builds immutable [`IgnoreRules`] values from the user's option selection
//! and the on-disk `.gitignore`/marker situation.
//!
//! A single opened folder may contain several independent sub-projects.
//! Git-ignore matching is therefore scoped per candidate folder (a selected
//! root folder, or the opened root itself), and smart-ignore steps in only
//! for candidates that bring no `.gitignore` of their own. The two
//! mechanisms are complementary per project, never globally additive.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::pattern::PatternMatcher;
use super::smart_ignore::SmartIgnoreService;
use crate::utils::extensions::is_extensionless;

/// The selectable ignore options. Ids map 1:1 onto the [`IgnoreRules`]
/// flags; the wire form used by the UI layer is the kebab-case id string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IgnoreOptionId {
    HiddenFolders,
    HiddenFiles,
    DotFolders,
    DotFiles,
    ExtensionlessFiles,
    GitIgnore,
    SmartIgnore,
}

impl IgnoreOptionId {
    pub const ALL: [IgnoreOptionId; 7] = [
        IgnoreOptionId::HiddenFolders,
        IgnoreOptionId::HiddenFiles,
        IgnoreOptionId::DotFolders,
        IgnoreOptionId::DotFiles,
        IgnoreOptionId::ExtensionlessFiles,
        IgnoreOptionId::GitIgnore,
        IgnoreOptionId::SmartIgnore,
    ];
}

/// Which ignore toggles are worth presenting for the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreOptionsAvailability {
    pub include_git_ignore: bool,
    pub include_smart_ignore: bool,
}

/// The immutable per-entry ignore decision table.
///
/// Built fresh on every option change; a previously returned value is never
/// mutated, so in-flight scans can keep reading their own copy safely.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    pub ignore_hidden_folders: bool,
    pub ignore_hidden_files: bool,
    pub ignore_dot_folders: bool,
    pub ignore_dot_files: bool,
    pub ignore_extensionless_files: bool,
    pub use_git_ignore: bool,
    pub use_smart_ignore: bool,
    /// Lowercased folder names contributed by smart-ignore rules.
    pub smart_ignored_folders: HashSet<String>,
    /// Lowercased file names contributed by smart-ignore rules.
    pub smart_ignored_files: HashSet<String>,
    /// `(scope root, matcher)` pairs, sorted deepest-first for
    /// longest-prefix resolution.
    scoped_git_matchers: Vec<(PathBuf, Arc<PatternMatcher>)>,
    /// Candidate folders that were smart-ignore eligible at build time.
    smart_ignore_scopes: Vec<PathBuf>,
}

impl IgnoreRules {
    /// Returns the matcher of the scope whose root is the longest path
    /// prefix of `path`, or the empty matcher if no scope covers it.
    pub fn resolve_git_ignore_matcher(&self, path: &Path) -> Arc<PatternMatcher> {
        for (scope_root, matcher) in &self.scoped_git_matchers {
            if path.starts_with(scope_root) {
                return matcher.clone();
            }
        }
        PatternMatcher::empty()
    }

    /// True iff smart-ignore is enabled and `path` falls under a candidate
    /// folder that was eligible when the rules were built.
    pub fn should_apply_smart_ignore(&self, path: &Path) -> bool {
        self.use_smart_ignore
            && self
                .smart_ignore_scopes
                .iter()
                .any(|scope| path.starts_with(scope))
    }

    /// The single per-entry predicate shared by the scanner and the tree
    /// builder: the logical OR of every enabled mechanism that matches.
    pub fn is_entry_ignored(
        &self,
        path: &Path,
        entry_name: &str,
        is_directory: bool,
        is_os_hidden: bool,
    ) -> bool {
        if is_directory {
            if self.ignore_hidden_folders && is_os_hidden {
                return true;
            }
            if self.ignore_dot_folders && entry_name.starts_with('.') {
                return true;
            }
        } else {
            if self.ignore_hidden_files && is_os_hidden {
                return true;
            }
            if self.ignore_dot_files && entry_name.starts_with('.') {
                return true;
            }
            if self.ignore_extensionless_files && is_extensionless(entry_name) {
                return true;
            }
        }

        if self.use_git_ignore
            && self
                .resolve_git_ignore_matcher(path)
                .is_ignored(path, is_directory, entry_name)
        {
            return true;
        }

        if self.use_smart_ignore && self.should_apply_smart_ignore(path) {
            let lowered = entry_name.to_lowercase();
            let names = if is_directory {
                &self.smart_ignored_folders
            } else {
                &self.smart_ignored_files
            };
            if names.contains(&lowered) {
                return true;
            }
        }

        false
    }

    #[cfg(test)]
    pub(crate) fn git_scope_roots(&self) -> Vec<&Path> {
        self.scoped_git_matchers
            .iter()
            .map(|(root, _)| root.as_path())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn smart_scope_roots(&self) -> Vec<&Path> {
        self.smart_ignore_scopes.iter().map(PathBuf::as_path).collect()
    }
}

/// Builds [`IgnoreRules`] and answers the option-availability query.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRulesService {
    smart_ignore: SmartIgnoreService,
}

impl IgnoreRulesService {
    pub fn new(smart_ignore: SmartIgnoreService) -> Self {
        Self { smart_ignore }
    }

    /// Builds a fresh `IgnoreRules` value for `root_path` from the selected
    /// option ids and root folders.
    ///
    /// Scopes are rediscovered on every call; nothing is cached across
    /// builds. I/O problems degrade to "mechanism unavailable here" rather
    /// than failing the build.
    pub fn build(
        &self,
        root_path: &Path,
        selected_option_ids: &[IgnoreOptionId],
        selected_root_folders: Option<&[String]>,
    ) -> IgnoreRules {
        let selected: HashSet<IgnoreOptionId> = selected_option_ids.iter().copied().collect();
        let mut rules = IgnoreRules {
            ignore_hidden_folders: selected.contains(&IgnoreOptionId::HiddenFolders),
            ignore_hidden_files: selected.contains(&IgnoreOptionId::HiddenFiles),
            ignore_dot_folders: selected.contains(&IgnoreOptionId::DotFolders),
            ignore_dot_files: selected.contains(&IgnoreOptionId::DotFiles),
            ignore_extensionless_files: selected.contains(&IgnoreOptionId::ExtensionlessFiles),
            use_git_ignore: selected.contains(&IgnoreOptionId::GitIgnore),
            use_smart_ignore: selected.contains(&IgnoreOptionId::SmartIgnore),
            ..IgnoreRules::default()
        };

        if !rules.use_git_ignore && !rules.use_smart_ignore {
            return rules;
        }

        for candidate in candidate_folders(root_path, selected_root_folders) {
            let gitignore_path = candidate.join(".gitignore");
            let owns_gitignore = gitignore_path.is_file();

            if rules.use_git_ignore && owns_gitignore {
                match fs::read_to_string(&gitignore_path) {
                    Ok(contents) => {
                        let matcher = PatternMatcher::build(&candidate, contents.lines());
                        rules
                            .scoped_git_matchers
                            .push((candidate.clone(), Arc::new(matcher)));
                    }
                    Err(e) => {
                        tracing::warn!("Could not read {:?}: {e}", gitignore_path);
                    }
                }
            }

            // A folder with its own .gitignore relies on git-ignore; the
            // heuristics only add value where one is missing.
            if rules.use_smart_ignore && !owns_gitignore {
                let result = self.smart_ignore.evaluate_all(&candidate);
                rules.smart_ignored_folders.extend(result.folders);
                rules.smart_ignored_files.extend(result.files);
                rules.smart_ignore_scopes.push(candidate);
            }
        }

        // Deepest scope first, so prefix resolution finds the nearest
        // enclosing project root.
        rules
            .scoped_git_matchers
            .sort_by_key(|(root, _)| std::cmp::Reverse(root.components().count()));

        rules
    }

    /// Decides which ignore toggles the UI should offer for a selection.
    ///
    /// Git-ignore is offered iff at least one candidate folder owns a
    /// `.gitignore`; smart-ignore iff at least one candidate lacks one.
    /// Any read error degrades to `{false, false}`.
    pub fn ignore_options_availability(
        &self,
        root_path: &Path,
        selected_root_folders: Option<&[String]>,
    ) -> IgnoreOptionsAvailability {
        if !root_path.is_dir() {
            return IgnoreOptionsAvailability::default();
        }

        let mut availability = IgnoreOptionsAvailability::default();
        for candidate in candidate_folders(root_path, selected_root_folders) {
            if !candidate.is_dir() {
                continue;
            }
            if candidate.join(".gitignore").is_file() {
                availability.include_git_ignore = true;
            } else {
                availability.include_smart_ignore = true;
            }
        }
        availability
    }
}

/// The folders whose `.gitignore`/marker situation drives scope discovery:
/// the selected root folders, or the opened root itself when none are
/// selected. Discovery stays relative to the selection, never the whole
/// subtree.
fn candidate_folders(root_path: &Path, selected_root_folders: Option<&[String]>) -> Vec<PathBuf> {
    match selected_root_folders {
        Some(folders) if !folders.is_empty() => {
            folders.iter().map(|name| root_path.join(name)).collect()
        }
        _ => vec![root_path.to_path_buf()],
    }
}
