//! Artifact name derivation
//!
//! `v2.3-beta` with product `Product` becomes `Product-2.3-beta`. Dots and
//! hyphens survive because they belong to version identifiers; every other
//! run of non-alphanumeric characters collapses into one `-`.

/// Separator used for normalized characters and between product and version
pub const SEPARATOR: char = '-';

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.'
}

/// Normalize separators, then strip one leading `v`/`V` when a digit follows.
///
/// Stripping after normalization keeps the function idempotent for inputs
/// such as `-v1`.
pub fn sanitize_version(tag: &str) -> String {
    let normalized = normalize(tag);
    match normalized.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest.to_string(),
        _ => normalized,
    }
}

fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.chars() {
        if is_kept(c) {
            if pending_separator && !out.is_empty() {
                out.push(SEPARATOR);
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
    }

    out
}

/// `<product>-<sanitized version>`
pub fn artifact_name(product: &str, tag: &str) -> String {
    let version = sanitize_version(tag);
    if version.is_empty() {
        product.to_string()
    } else {
        format!("{}{}{}", product, SEPARATOR, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_beta_tag() {
        assert_eq!(sanitize_version("v2.3-beta"), "2.3-beta");
        assert_eq!(artifact_name("Product", "v2.3-beta"), "Product-2.3-beta");
    }

    #[test]
    fn test_only_one_prefix_stripped() {
        assert_eq!(sanitize_version("V1.0"), "1.0");
        assert_eq!(sanitize_version("1.0"), "1.0");
        // Not a version prefix: no digit follows
        assert_eq!(sanitize_version("vnext"), "vnext");
    }

    #[test]
    fn test_runs_collapse_to_single_separator() {
        assert_eq!(sanitize_version("v1.0+build/5"), "1.0-build-5");
        assert_eq!(sanitize_version("v1.0 -- rc  1"), "1.0-rc-1");
        assert_eq!(sanitize_version("v1.0--beta"), "1.0-beta");
    }

    #[test]
    fn test_prefix_after_leading_junk() {
        assert_eq!(sanitize_version("-v1.2"), "1.2");
        assert_eq!(sanitize_version(sanitize_version("-v1.2").as_str()), "1.2");
    }

    #[test]
    fn test_edges_trimmed() {
        assert_eq!(sanitize_version("v1.0-"), "1.0");
        assert_eq!(sanitize_version("__1.0__"), "1.0");
        assert_eq!(artifact_name("Product", "!!!"), "Product");
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(tag in "[vV]?[0-9A-Za-z._+/ -]{0,24}") {
            let once = sanitize_version(&tag);
            prop_assert_eq!(sanitize_version(&once), once.clone());
        }

        #[test]
        fn prop_output_alphabet(tag in "\\PC{0,24}") {
            let out = sanitize_version(&tag);
            prop_assert!(out.chars().all(|c| is_kept(c) || c == SEPARATOR));
            prop_assert!(!out.contains("--"));
            prop_assert!(!out.starts_with(SEPARATOR) && !out.ends_with(SEPARATOR));
        }

        #[test]
        fn prop_artifact_name_is_pure(tag in "v[0-9]{1,3}(\\.[0-9]{1,3}){0,2}(-[a-z]{1,6})?") {
            prop_assert_eq!(artifact_name("Product", &tag), artifact_name("Product", &tag));
            prop_assert!(artifact_name("Product", &tag).starts_with("Product-"));
        }
    }
}
