//! Gitignore-style pattern matching scoped to a single anchor directory.
//!
//! This is a practical subset of the gitignore language, kept as a closed
//! rule set: `*`, `?` and bracket classes in pattern bodies, `#` comments,
//! blank lines, leading `!` negation, trailing `/` directory-only markers,
//! and `/`-anchoring. Evaluation is source order with last-match-wins.
//! Recursive `**` bodies beyond the generated descendant globs are not part
//! of the subset.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use globset::{GlobBuilder, GlobMatcher};

/// One compiled pattern line.
#[derive(Debug, Clone)]
struct CompiledRule {
    negated: bool,
    dir_only: bool,
    /// Anchored rules match against the path relative to the matcher root;
    /// unanchored rules match the entry name at any depth.
    anchored: bool,
    glob: GlobMatcher,
    /// For anchored rules, matches everything below a matched directory
    /// (`bin` also compiles `bin/**`), so containment ignores descendants.
    descendant_glob: Option<GlobMatcher>,
}

impl CompiledRule {
    fn matches(&self, rel_path: &Path, is_directory: bool, entry_name: &str) -> bool {
        if self.anchored {
            if self.glob.is_match(rel_path) {
                return !self.dir_only || is_directory;
            }
            // An entry inside a matched directory is covered regardless of
            // its own kind.
            if let Some(descendants) = &self.descendant_glob {
                if descendants.is_match(rel_path) {
                    return true;
                }
            }
            return false;
        }

        // Unanchored: check the entry itself, then ancestor path segments
        // (a segment other than the last is necessarily a directory).
        if self.glob.is_match(entry_name) && (!self.dir_only || is_directory) {
            return true;
        }
        let mut components = rel_path.components().peekable();
        while let Some(component) = components.next() {
            let is_last = components.peek().is_none();
            if is_last {
                break;
            }
            if self.glob.is_match(component.as_os_str().to_string_lossy().as_ref()) {
                return true;
            }
        }
        false
    }
}

/// An immutable matcher for one scope: an ordered list of compiled rules
/// bound to the directory the patterns were read from.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    root: std::path::PathBuf,
    rules: Vec<CompiledRule>,
}

static EMPTY_MATCHER: OnceLock<Arc<PatternMatcher>> = OnceLock::new();

impl PatternMatcher {
    /// Compiles a list of gitignore-style pattern lines anchored at
    /// `root_dir`. Comment and blank lines are skipped; a line whose glob
    /// body fails to compile is treated as a no-op pattern rather than
    /// failing the whole matcher.
    pub fn build<P, I, S>(root_dir: P, patterns: I) -> Self
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for line in patterns {
            if let Some(rule) = Self::compile_line(line.as_ref()) {
                rules.push(rule);
            }
        }
        Self {
            root: root_dir.as_ref().to_path_buf(),
            rules,
        }
    }

    /// The distinguished empty matcher: always reports "not ignored". Used
    /// for scopes without a `.gitignore` and as the safe default.
    pub fn empty() -> Arc<Self> {
        EMPTY_MATCHER
            .get_or_init(|| {
                Arc::new(Self {
                    root: std::path::PathBuf::new(),
                    rules: Vec::new(),
                })
            })
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns whether `path` is ignored under this scope.
    ///
    /// All rules are evaluated in source order; each matching rule sets the
    /// running verdict to its (non-)negated value, so a later `!` rule
    /// overrides an earlier match. A path outside the matcher root is never
    /// ignored.
    pub fn is_ignored(&self, path: &Path, is_directory: bool, entry_name: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let Ok(rel_path) = path.strip_prefix(&self.root) else {
            return false;
        };

        let mut ignored = false;
        for rule in &self.rules {
            if rule.matches(rel_path, is_directory, entry_name) {
                ignored = !rule.negated;
            }
        }
        ignored
    }

    fn compile_line(line: &str) -> Option<CompiledRule> {
        let mut body = line.trim();
        if body.is_empty() || body.starts_with('#') {
            return None;
        }

        let negated = if let Some(rest) = body.strip_prefix('!') {
            body = rest;
            true
        } else {
            false
        };
        let dir_only = if let Some(rest) = body.strip_suffix('/') {
            body = rest;
            true
        } else {
            false
        };
        // A leading slash only anchors; it is not part of the glob body.
        let mut anchored = false;
        if let Some(rest) = body.strip_prefix('/') {
            body = rest;
            anchored = true;
        }
        if body.is_empty() {
            return None;
        }
        anchored |= body.contains('/');

        let glob = Self::compile_glob(body)?;
        // Unanchored rules cover descendants through segment matching;
        // anchored rules need the explicit containment glob.
        let descendant_glob = if anchored {
            Self::compile_glob(&format!("{body}/**"))
        } else {
            None
        };

        Some(CompiledRule {
            negated,
            dir_only,
            anchored,
            glob,
            descendant_glob,
        })
    }

    fn compile_glob(body: &str) -> Option<GlobMatcher> {
        match GlobBuilder::new(body).literal_separator(true).build() {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(e) => {
                tracing::debug!("Skipping malformed ignore pattern {body:?}: {e}");
                None
            }
        }
    }
}
