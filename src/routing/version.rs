//! Dotted version comparison.

use std::cmp::Ordering;

/// Compare two dotted versions component by component.
///
/// Components are compared as integers; if either side of a pair is not a
/// number the pair falls back to string order. When one version is a prefix
/// of the other they compare equal (`"1.8"` == `"1.8.29"`).
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    for (l, r) in left.split('.').zip(right.split('.')) {
        let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            _ => l.cmp(r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// `version >= minimum` under [`compare_versions`].
pub fn at_least(version: &str, minimum: &str) -> bool {
    compare_versions(version, minimum) != Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert_eq!(compare_versions("1.8.29", "1.8.29"), Ordering::Equal);
        assert_eq!(compare_versions("1.8.30", "1.8.29"), Ordering::Greater);
        assert_eq!(compare_versions("1.9.0", "1.8.29"), Ordering::Greater);
        assert_eq!(compare_versions("1.8.3", "1.8.29"), Ordering::Less);
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(compare_versions("1.10.0", "1.9.5"), Ordering::Greater);
        assert_eq!(compare_versions("10.0", "9.99"), Ordering::Greater);
        assert_eq!(compare_versions("6.5", "6.40"), Ordering::Less);
    }

    #[test]
    fn test_prefix_is_equal() {
        assert_eq!(compare_versions("1.8", "1.8.29"), Ordering::Equal);
        assert_eq!(compare_versions("6.40.2", "6.40"), Ordering::Equal);
    }

    #[test]
    fn test_at_least() {
        assert!(at_least("6.40", "6.40"));
        assert!(at_least("7.0", "6.40"));
        assert!(!at_least("6.39", "6.40"));
    }
}
