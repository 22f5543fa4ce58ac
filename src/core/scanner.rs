//! Enumerates extensions and root-level folder names under a root,
//! applying the same per-entry ignore predicate as the tree builder so the
//! UI never offers an option the filtered tree would render empty.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use walkdir::WalkDir;

use super::rules::IgnoreRules;
use super::{CoreError, ScanResult};
use crate::utils::extensions::normalized_extension;
use crate::utils::hidden::is_os_hidden;

/// Minimum number of concurrent branches for the recursive extension scan.
const MIN_SCAN_THREADS: usize = 4;

/// Stateless scanning facade; methods are associated functions.
pub struct FileSystemScanner;

impl FileSystemScanner {
    /// Collects the normalized extensions of every non-ignored file under
    /// `root`, recursing into subfolders.
    ///
    /// Depth-1 subtrees fan out across a bounded rayon pool; each branch
    /// accumulates into a private set and merges it under a single lock at
    /// completion, so there is no per-entry synchronization.
    pub fn extensions(
        root: &Path,
        rules: &IgnoreRules,
        cancel_flag: &Arc<AtomicBool>,
    ) -> Result<ScanResult<BTreeSet<String>>, CoreError> {
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(CoreError::Cancelled);
        }

        let top_level = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => return Ok(read_dir_failure(root, &e)),
        };

        let merged = Mutex::new(BTreeSet::new());
        let had_access_denied = AtomicBool::new(false);
        let mut branch_roots = Vec::new();

        {
            let mut root_level = BTreeSet::new();
            for entry in top_level {
                let Ok(entry) = entry else {
                    had_access_denied.store(true, Ordering::Relaxed);
                    continue;
                };
                match classify(&entry, rules) {
                    Classified::IgnoredOrUnreadable => {}
                    Classified::Directory => branch_roots.push(entry.path()),
                    Classified::File(name) => {
                        if let Some(ext) = normalized_extension(&name) {
                            root_level.insert(ext);
                        }
                    }
                }
            }
            merged.lock().expect("scan merge lock poisoned").extend(root_level);
        }

        let pool = scan_pool();
        let cancelled = pool.install(|| {
            branch_roots
                .par_iter()
                .map(|branch| {
                    let mut branch_extensions = BTreeSet::new();
                    let outcome = scan_branch(
                        branch,
                        rules,
                        cancel_flag,
                        &had_access_denied,
                        &mut branch_extensions,
                    );
                    merged
                        .lock()
                        .expect("scan merge lock poisoned")
                        .extend(branch_extensions);
                    outcome
                })
                .any(|outcome| outcome == BranchOutcome::Cancelled)
        });

        if cancelled || cancel_flag.load(Ordering::Relaxed) {
            tracing::info!("Extension scan cancelled under {:?}", root);
            return Err(CoreError::Cancelled);
        }

        let value = merged.into_inner().expect("scan merge lock poisoned");
        tracing::debug!(
            "Extension scan under {:?} found {} extensions",
            root,
            value.len()
        );
        Ok(ScanResult {
            value,
            root_access_denied: false,
            had_access_denied: had_access_denied.load(Ordering::Relaxed),
        })
    }

    /// Lists the non-ignored directory names directly under `root`, sorted,
    /// for populating the root-folder allow-list UI.
    pub fn root_folder_names(
        root: &Path,
        rules: &IgnoreRules,
        cancel_flag: &Arc<AtomicBool>,
    ) -> Result<ScanResult<Vec<String>>, CoreError> {
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(CoreError::Cancelled);
        }

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => return Ok(read_dir_failure(root, &e)),
        };

        let mut result = ScanResult::<Vec<String>>::empty();
        for entry in entries {
            let Ok(entry) = entry else {
                result.had_access_denied = true;
                continue;
            };
            if let Classified::Directory = classify(&entry, rules) {
                result.value.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        result.value.sort();
        Ok(result)
    }

    /// Collects the extensions of non-ignored files directly under `root`.
    /// Used for extensionless handling at the root level without paying for
    /// a recursive scan.
    pub fn root_file_extensions(
        root: &Path,
        rules: &IgnoreRules,
        cancel_flag: &Arc<AtomicBool>,
    ) -> Result<ScanResult<BTreeSet<String>>, CoreError> {
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(CoreError::Cancelled);
        }

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => return Ok(read_dir_failure(root, &e)),
        };

        let mut result = ScanResult::<BTreeSet<String>>::empty();
        for entry in entries {
            let Ok(entry) = entry else {
                result.had_access_denied = true;
                continue;
            };
            if let Classified::File(name) = classify(&entry, rules) {
                if let Some(ext) = normalized_extension(&name) {
                    result.value.insert(ext);
                }
            }
        }
        Ok(result)
    }
}

#[derive(PartialEq, Eq)]
enum BranchOutcome {
    Completed,
    Cancelled,
}

/// Walks one depth-1 subtree, accumulating extensions into the branch's
/// private set. Unreadable descendants set the shared access-denied marker
/// and their subtrees are skipped; the walk itself keeps going.
fn scan_branch(
    branch_root: &Path,
    rules: &IgnoreRules,
    cancel_flag: &Arc<AtomicBool>,
    had_access_denied: &AtomicBool,
    branch_extensions: &mut BTreeSet<String>,
) -> BranchOutcome {
    let walker = WalkDir::new(branch_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_walk_entry_ignored(entry, rules));

    let mut previous_depth = 0;
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::PermissionDenied) {
                    had_access_denied.store(true, Ordering::Relaxed);
                }
                continue;
            }
        };

        // Directory boundary: every descent or ascent re-checks the flag.
        if entry.depth() != previous_depth {
            previous_depth = entry.depth();
            if cancel_flag.load(Ordering::Relaxed) {
                return BranchOutcome::Cancelled;
            }
        }

        if entry.file_type().is_file() {
            if let Some(ext) = normalized_extension(entry.file_name().to_string_lossy().as_ref()) {
                branch_extensions.insert(ext);
            }
        }
    }

    if cancel_flag.load(Ordering::Relaxed) {
        return BranchOutcome::Cancelled;
    }
    BranchOutcome::Completed
}

enum Classified {
    Directory,
    File(String),
    IgnoredOrUnreadable,
}

fn classify(entry: &fs::DirEntry, rules: &IgnoreRules) -> Classified {
    let Ok(metadata) = entry.metadata() else {
        return Classified::IgnoredOrUnreadable;
    };
    let name = entry.file_name().to_string_lossy().into_owned();
    let is_directory = metadata.is_dir();
    if rules.is_entry_ignored(&entry.path(), &name, is_directory, is_os_hidden(&metadata)) {
        return Classified::IgnoredOrUnreadable;
    }
    if is_directory {
        Classified::Directory
    } else {
        Classified::File(name)
    }
}

fn is_walk_entry_ignored(entry: &walkdir::DirEntry, rules: &IgnoreRules) -> bool {
    let is_directory = entry.file_type().is_dir();
    let name = entry.file_name().to_string_lossy();
    let os_hidden = entry
        .metadata()
        .map(|metadata| is_os_hidden(&metadata))
        .unwrap_or(false);
    rules.is_entry_ignored(entry.path(), name.as_ref(), is_directory, os_hidden)
}

/// A missing root is an empty-but-valid result; an unreadable root is
/// flagged so the caller can attempt an elevated retry.
fn read_dir_failure<T: Default>(root: &Path, error: &io::Error) -> ScanResult<T> {
    if error.kind() == io::ErrorKind::PermissionDenied {
        tracing::warn!("Scan root {:?} is not readable", root);
        ScanResult::denied_root()
    } else {
        tracing::debug!("Scan root {:?} unavailable: {error}", root);
        ScanResult::empty()
    }
}

/// The shared pool for branch fan-out, sized to the machine but never
/// below [`MIN_SCAN_THREADS`].
fn scan_pool() -> &'static rayon::ThreadPool {
    use std::sync::OnceLock;
    static POOL: OnceLock<rayon::ThreadPool> = OnceLock::new();
    POOL.get_or_init(|| {
        let threads = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(MIN_SCAN_THREADS)
            .max(MIN_SCAN_THREADS);
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("scopetree-scan-{i}"))
            .build()
            .expect("failed to build scan thread pool")
    })
}
