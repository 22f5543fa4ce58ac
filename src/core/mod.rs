pub mod error;
pub mod pattern;
pub mod rules;
pub mod scanner;
pub mod smart_ignore;
pub mod tree_builder;

use serde::{Deserialize, Serialize};

/// The outcome of a scan over one root, carrying the accumulated value plus
/// access-denied markers.
///
/// `root_access_denied` means the scan root itself could not be read (the
/// caller may retry with elevated privileges); `had_access_denied` means at
/// least one descendant directory was unreadable and its subtree was
/// skipped while the scan continued.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanResult<T> {
    pub value: T,
    pub root_access_denied: bool,
    pub had_access_denied: bool,
}

impl<T: Default> ScanResult<T> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn denied_root() -> Self {
        Self {
            value: T::default(),
            root_access_denied: true,
            had_access_denied: false,
        }
    }
}

pub use error::CoreError;
pub use pattern::PatternMatcher;
pub use rules::{IgnoreOptionId, IgnoreOptionsAvailability, IgnoreRules, IgnoreRulesService};
pub use scanner::FileSystemScanner;
pub use smart_ignore::{SmartIgnoreResult, SmartIgnoreRule, SmartIgnoreService};
pub use tree_builder::{TreeBuildOptions, TreeBuildOutcome, TreeBuilder, TreeNode, TreeStats};
