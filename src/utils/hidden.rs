//! OS hidden-attribute detection.
//!
//! The hidden-file/folder ignore options are driven by the platform
//! attribute, not by the leading-dot convention; dot names have their own
//! pair of options. On Unix there is no distinct hidden attribute, so the
//! probe reports `false` and the two option pairs stay independent.

use std::fs::Metadata;

#[cfg(windows)]
pub fn is_os_hidden(metadata: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(not(windows))]
pub fn is_os_hidden(_metadata: &Metadata) -> bool {
    false
}
