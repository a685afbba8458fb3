//! Rules for merging embedded dependency jars into a bundle.
//!
//! Embedded jars contribute every entry except signatures, their own
//! manifest, module descriptors and Maven metadata. Service registrations
//! under `META-INF/services/` are concatenated line by line. Any other
//! collision keeps the entry already present; identical bytes collapse
//! silently while differing bytes are reported.

use super::{JarContents, MANIFEST_ENTRY};
use glob::{MatchOptions, Pattern};
use log::{debug, warn};
use std::sync::OnceLock;

const SERVICES_PREFIX: &str = "META-INF/services/";

const EXCLUDED_ENTRIES: &[&str] = &[
    "META-INF/*.SF",
    "META-INF/*.RSA",
    "META-INF/*.DSA",
    "META-INF/*.EC",
    MANIFEST_ENTRY,
    "module-info.class",
    "META-INF/versions/*/module-info.class",
    "META-INF/maven/**",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

fn excluded_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        EXCLUDED_ENTRIES
            .iter()
            .filter_map(|pattern| Pattern::new(pattern).ok())
            .collect()
    })
}

/// Whether an embedded jar entry is dropped during merging.
#[must_use]
pub fn is_excluded(name: &str) -> bool {
    excluded_patterns()
        .iter()
        .any(|pattern| pattern.matches_with(name, MATCH_OPTIONS))
}

/// What happened while merging one jar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Entries copied into the bundle.
    pub added: usize,
    /// Entries dropped by the exclusion rules.
    pub excluded: usize,
    /// Identical duplicates collapsed into the existing entry.
    pub collapsed: usize,
    /// Differing duplicates where the existing entry was kept.
    pub conflicts: usize,
    /// Service files merged line by line.
    pub services_merged: usize,
}

/// Merge `source` into `target`, applying the embedded-jar rules.
///
/// `origin` names the source jar in log messages.
pub fn merge_embedded(target: &mut JarContents, source: &JarContents, origin: &str) -> MergeStats {
    let mut stats = MergeStats::default();
    for (name, bytes) in source.iter() {
        if is_excluded(name) {
            stats.excluded += 1;
            continue;
        }
        let Some(existing) = target.get(name) else {
            target.insert(name, bytes.to_vec());
            stats.added += 1;
            continue;
        };
        if existing == bytes {
            stats.collapsed += 1;
        } else if name.starts_with(SERVICES_PREFIX) {
            let merged = merge_service_lines(existing, bytes);
            target.insert(name, merged);
            stats.services_merged += 1;
        } else {
            warn!("duplicate entry {name} from {origin} differs from the bundled copy; keeping the first");
            stats.conflicts += 1;
        }
    }
    debug!(
        "merged {origin}: {} added, {} excluded, {} collapsed, {} conflicting",
        stats.added, stats.excluded, stats.collapsed, stats.conflicts
    );
    stats
}

/// Union of two service files, preserving first-seen order.
#[must_use]
pub fn merge_service_lines(first: &[u8], second: &[u8]) -> Vec<u8> {
    let text_first = String::from_utf8_lossy(first);
    let text_second = String::from_utf8_lossy(second);
    let mut lines: Vec<&str> = Vec::new();
    for line in text_first.lines().chain(text_second.lines()) {
        let trimmed = line.trim();
        if trimmed.is_empty() || lines.contains(&trimmed) {
            continue;
        }
        lines.push(trimmed);
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("META-INF/PANDALIB.SF", true)]
    #[case("META-INF/pandalib.rsa", true)]
    #[case("META-INF/MANIFEST.MF", true)]
    #[case("module-info.class", true)]
    #[case("META-INF/versions/17/module-info.class", true)]
    #[case("META-INF/maven/me.pandamods/pandalib/pom.xml", true)]
    #[case("META-INF/services/a.B", false)]
    #[case("META-INF/sub/x.SF", false)]
    #[case("me/pandamods/pandalib/Lib.class", false)]
    fn exclusion_rules(#[case] name: &str, #[case] excluded: bool) {
        assert_eq!(is_excluded(name), excluded);
    }

    #[rstest]
    fn keeps_first_entry_and_counts_outcomes() {
        let mut target: JarContents = [
            ("a/A.class".to_owned(), vec![1]),
            ("a/B.class".to_owned(), vec![2]),
        ]
        .into_iter()
        .collect();
        let source: JarContents = [
            ("a/A.class".to_owned(), vec![1]),
            ("a/B.class".to_owned(), vec![9]),
            ("lib/C.class".to_owned(), vec![3]),
            ("META-INF/LIB.SF".to_owned(), vec![4]),
        ]
        .into_iter()
        .collect();

        let stats = merge_embedded(&mut target, &source, "lib.jar");
        assert_eq!(
            stats,
            MergeStats {
                added: 1,
                excluded: 1,
                collapsed: 1,
                conflicts: 1,
                services_merged: 0,
            }
        );
        assert_eq!(target.get("a/B.class"), Some([2_u8].as_slice()));
        assert!(target.contains("lib/C.class"));
        assert!(!target.contains("META-INF/LIB.SF"));
    }

    #[rstest]
    fn merges_service_registrations() {
        let name = "META-INF/services/me.pandamods.Platform";
        let mut target: JarContents = [(name.to_owned(), b"a.One\nb.Two\n".to_vec())]
            .into_iter()
            .collect();
        let source: JarContents = [(name.to_owned(), b"b.Two\nc.Three\n".to_vec())]
            .into_iter()
            .collect();

        let stats = merge_embedded(&mut target, &source, "lib.jar");
        assert_eq!(stats.services_merged, 1);
        assert_eq!(target.get(name), Some(b"a.One\nb.Two\nc.Three\n".as_slice()));
    }
}
