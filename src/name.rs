//! Canonical, case-insensitive DNS owner names and the label-reversed
//! iteration the cache tree is built on (spec §3, Invariant 1).

use std::fmt;

/// A canonically-lowercased DNS owner name with no trailing dot.
///
/// The root name is represented as the empty string. Equality, hashing
/// and ordering are all performed on the lowercased form, so
/// `OwnerName::new("EXAMPLE.com")` and `OwnerName::new("example.COM")`
/// compare equal (Invariant 1).
#[derive(Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct OwnerName(String);

impl OwnerName {
    pub fn new(name: &str) -> Self {
        let trimmed = name.strip_suffix('.').unwrap_or(name);
        Self(trimmed.to_ascii_lowercase())
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Labels from the root down to the leaf (authority order), e.g.
    /// `www.example.com` yields `["com", "example", "www"]`. This is
    /// the order the cache tree is indexed by.
    pub fn labels_authority_order(&self) -> Vec<&str> {
        if self.is_root() {
            return Vec::new();
        }
        let mut labels: Vec<&str> = self.0.split('.').collect();
        labels.reverse();
        labels
    }

    /// Number of labels (0 for the root).
    pub fn label_count(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.split('.').count()
        }
    }

    /// The immediate parent name, or `None` for the root.
    pub fn parent(&self) -> Option<OwnerName> {
        if self.is_root() {
            return None;
        }
        match self.0.split_once('.') {
            Some((_, rest)) => Some(OwnerName(rest.to_string())),
            None => Some(OwnerName::root()),
        }
    }

    /// True iff `self` is a strict descendant of `other` (not equal).
    pub fn is_subdomain_of(&self, other: &OwnerName) -> bool {
        if self == other {
            return false;
        }
        if other.is_root() {
            return !self.is_root();
        }
        self.0
            .strip_suffix(other.0.as_str())
            .map(|prefix| prefix.ends_with('.'))
            .unwrap_or(false)
    }

    /// True iff `self` equals `other` or is a strict descendant of it.
    pub fn covers(&self, other: &OwnerName) -> bool {
        self == other || self.is_subdomain_of(other)
    }

    /// Wire-format length in octets: each label contributes its byte
    /// length plus one length-prefix byte, plus a one-byte root
    /// terminator. Used to detect DNAME substitutions that overflow
    /// the 255-octet name limit.
    pub fn wire_len(&self) -> usize {
        if self.is_root() {
            return 1;
        }
        self.0.split('.').map(|l| l.len() + 1).sum::<usize>() + 1
    }

    pub fn is_valid_wire_length(&self) -> bool {
        self.wire_len() <= 255
    }

    /// Replace the `old_suffix` tail of `self` with `new_suffix`, as
    /// DNAME substitution requires. Returns `None` if `self` does not
    /// end in `old_suffix`, or if the substituted name would exceed
    /// the 255-octet wire limit.
    pub fn substitute_suffix(&self, old_suffix: &OwnerName, new_suffix: &OwnerName) -> Option<OwnerName> {
        if !self.covers(old_suffix) {
            return None;
        }
        let prefix_len = self.0.len().saturating_sub(old_suffix.0.len());
        let prefix = &self.0[..prefix_len.saturating_sub(if prefix_len > 0 { 1 } else { 0 })];
        let substituted = if prefix.is_empty() {
            new_suffix.0.clone()
        } else if new_suffix.is_root() {
            prefix.to_string()
        } else {
            format!("{prefix}.{}", new_suffix.0)
        };
        let result = OwnerName(substituted);
        if result.is_valid_wire_length() {
            Some(result)
        } else {
            None
        }
    }
}

impl fmt::Display for OwnerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for OwnerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerName({:?})", self.0)
    }
}

impl From<&str> for OwnerName {
    fn from(s: &str) -> Self {
        OwnerName::new(s)
    }
}

impl From<String> for OwnerName {
    fn from(s: String) -> Self {
        OwnerName::new(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_equality() {
        assert_eq!(OwnerName::new("EXAMPLE.COM"), OwnerName::new("example.com"));
        assert_eq!(OwnerName::new("example.com."), OwnerName::new("example.com"));
    }

    #[test]
    fn authority_order_labels() {
        assert_eq!(
            OwnerName::new("www.example.com").labels_authority_order(),
            vec!["com", "example", "www"]
        );
        assert!(OwnerName::root().labels_authority_order().is_empty());
    }

    #[test]
    fn parent_walks_up_to_root() {
        let name = OwnerName::new("host.old.test");
        let p1 = name.parent().unwrap();
        assert_eq!(p1, OwnerName::new("old.test"));
        let p2 = p1.parent().unwrap();
        assert_eq!(p2, OwnerName::new("test"));
        let p3 = p2.parent().unwrap();
        assert!(p3.is_root());
        assert!(p3.parent().is_none());
    }

    #[test]
    fn subdomain_detection() {
        let parent = OwnerName::new("test");
        let child = OwnerName::new("host.test");
        assert!(child.is_subdomain_of(&parent));
        assert!(!parent.is_subdomain_of(&child));
        assert!(!parent.is_subdomain_of(&parent));
        assert!(child.covers(&parent) == false);
        assert!(child.covers(&child));
    }

    #[test]
    fn dname_substitution() {
        let old = OwnerName::new("old.test");
        let new = OwnerName::new("new.test");
        let question = OwnerName::new("host.old.test");
        let substituted = question.substitute_suffix(&old, &new).unwrap();
        assert_eq!(substituted, OwnerName::new("host.new.test"));
    }

    #[test]
    fn dname_substitution_rejects_non_suffix() {
        let old = OwnerName::new("old.test");
        let new = OwnerName::new("new.test");
        let question = OwnerName::new("host.other.test");
        assert!(question.substitute_suffix(&old, &new).is_none());
    }

    #[test]
    fn dname_substitution_rejects_oversize_names() {
        let old = OwnerName::new("old.test");
        let long_label = "a".repeat(63);
        let mut new_name = String::new();
        for _ in 0..4 {
            new_name.push_str(&long_label);
            new_name.push('.');
        }
        new_name.push_str("new-long-suffix-test");
        let new = OwnerName::new(&new_name);
        let question = OwnerName::new("host.old.test");
        assert!(question.substitute_suffix(&old, &new).is_none());
    }
}
