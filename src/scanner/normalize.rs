//! Path normalization policy: NFC validation, and (when enabled) a
//! bottom-up repair pass that renames non-conforming files on disk.

use unicode_normalization::UnicodeNormalization;

use super::errors::ScanWarning;

/// Report of what the scanner found and, if `normalize=true`, fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub warnings: Vec<ScanWarning>,
    /// `(original_relative_path, new_relative_path)`, in the order
    /// renames were applied (bottom-up: children before parents).
    pub renames: Vec<(String, String)>,
}

impl NormalizationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Deterministically rewrite a single path component that failed
/// validation: illegal characters become `_`, reserved basenames are
/// suffixed with `_renamed`, and a trailing `~`/`.` backup suffix is
/// stripped. Applied component-by-component so a rewrite of one
/// component can't accidentally introduce a path separator.
pub fn repair_component(component: &str) -> String {
    let nfc: String = component.nfc().collect();

    let mut out = String::with_capacity(nfc.len());
    for c in nfc.chars() {
        if c.is_control() || "<>:\"|?*\\/".contains(c) {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    while out.ends_with('~') || out.ends_with('.') || out.ends_with(' ') {
        out.pop();
    }
    if out.is_empty() {
        out.push('_');
    }

    let bare = out.split('.').next().unwrap_or(&out).to_ascii_uppercase();
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    if RESERVED.contains(&bare.as_str()) {
        out.push_str("_renamed");
    }

    out
}

/// Sort candidate rename targets so renaming proceeds bottom-up:
/// deepest paths first, so a child is renamed while its parent
/// directory still exists under its original name.
pub fn order_bottom_up(mut candidates: Vec<String>) -> Vec<String> {
    candidates.sort_by_key(|p| std::cmp::Reverse(p.matches('/').count()));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_replaces_illegal_characters() {
        assert_eq!(repair_component("bad:name?.txt"), "bad_name_.txt");
    }

    #[test]
    fn repair_strips_trailing_backup_suffix() {
        assert_eq!(repair_component("file.txt~"), "file.txt");
        assert_eq!(repair_component("file.txt."), "file.txt");
    }

    #[test]
    fn repair_suffixes_reserved_basenames() {
        assert_eq!(repair_component("CON"), "CON_renamed");
        assert_eq!(repair_component("nul"), "nul_renamed");
    }

    #[test]
    fn repair_normalizes_to_nfc() {
        let nfd = "kilo\u{0301}metro";
        let repaired = repair_component(nfd);
        assert_eq!(repaired, "kil\u{00f3}metro");
    }

    #[test]
    fn bottom_up_orders_deepest_first() {
        let candidates = vec!["a".to_string(), "a/b/c".to_string(), "a/b".to_string()];
        let ordered = order_bottom_up(candidates);
        assert_eq!(ordered, vec!["a/b/c", "a/b", "a"]);
    }
}
