//! Heuristic "smart ignore" rules for projects without their own
//! `.gitignore`.
//!
//! Each rule inspects a root directory for marker files and contributes
//! folder/file names to ignore; results are unioned with no precedence
//! between rules. A missing root or marker yields an empty result, never an
//! error.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Name sets contributed by one rule evaluation. Names are stored
/// lowercased; comparisons are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmartIgnoreResult {
    pub folders: HashSet<String>,
    pub files: HashSet<String>,
}

impl SmartIgnoreResult {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Unions another result into this one. Duplicates are idempotent.
    pub fn merge(&mut self, other: SmartIgnoreResult) {
        self.folders.extend(other.folders);
        self.files.extend(other.files);
    }
}

/// The built-in rule kinds. The set is fixed, so a closed enum beats
/// trait objects here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartIgnoreRule {
    /// Unconditional OS/editor junk files. VCS/IDE folders are governed by
    /// the dot-folder option instead, so this rule contributes no folders.
    Common,
    /// Frontend build artifacts, gated on a JS package manifest.
    FrontendArtifacts,
    /// .NET build artifacts, gated on a project or solution file.
    DotNetArtifacts,
}

const COMMON_JUNK_FILES: &[&str] = &["thumbs.db", ".ds_store", "desktop.ini"];
const FRONTEND_ARTIFACT_FOLDERS: &[&str] = &["node_modules", "dist", "build", "out", "coverage"];
const DOTNET_ARTIFACT_FOLDERS: &[&str] = &["bin", "obj"];

impl SmartIgnoreRule {
    /// Evaluates this rule against one root path.
    pub fn evaluate(&self, root_path: &Path) -> SmartIgnoreResult {
        match self {
            SmartIgnoreRule::Common => SmartIgnoreResult {
                folders: HashSet::new(),
                files: name_set(COMMON_JUNK_FILES),
            },
            SmartIgnoreRule::FrontendArtifacts => {
                if root_path.join("package.json").is_file() {
                    SmartIgnoreResult {
                        folders: name_set(FRONTEND_ARTIFACT_FOLDERS),
                        files: HashSet::new(),
                    }
                } else {
                    SmartIgnoreResult::default()
                }
            }
            SmartIgnoreRule::DotNetArtifacts => {
                if has_dotnet_marker(root_path) {
                    SmartIgnoreResult {
                        folders: name_set(DOTNET_ARTIFACT_FOLDERS),
                        files: HashSet::new(),
                    }
                } else {
                    SmartIgnoreResult::default()
                }
            }
        }
    }
}

fn name_set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_lowercase()).collect()
}

/// A .NET project announces itself through a project or solution file
/// directly in the root directory.
fn has_dotnet_marker(root_path: &Path) -> bool {
    let Ok(entries) = fs::read_dir(root_path) else {
        return false;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.ends_with(".csproj") || name.ends_with(".fsproj") || name.ends_with(".sln") {
            return true;
        }
    }
    false
}

/// Holds the ordered rule list and unions all evaluations for a root.
#[derive(Debug, Clone)]
pub struct SmartIgnoreService {
    rules: Vec<SmartIgnoreRule>,
}

impl Default for SmartIgnoreService {
    fn default() -> Self {
        Self {
            rules: vec![
                SmartIgnoreRule::Common,
                SmartIgnoreRule::FrontendArtifacts,
                SmartIgnoreRule::DotNetArtifacts,
            ],
        }
    }
}

impl SmartIgnoreService {
    pub fn new(rules: Vec<SmartIgnoreRule>) -> Self {
        Self { rules }
    }

    /// Evaluates every rule against `root_path` and unions the results.
    pub fn evaluate_all(&self, root_path: &Path) -> SmartIgnoreResult {
        let mut combined = SmartIgnoreResult::default();
        for rule in &self.rules {
            combined.merge(rule.evaluate(root_path));
        }
        combined
    }
}
