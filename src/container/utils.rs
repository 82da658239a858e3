use std::sync::LazyLock;

use regex::Regex;

/// Length of a full docker container id in hex characters.
pub(super) const FULL_ID_LEN: usize = 64;

static FULL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("[a-f0-9]{{{FULL_ID_LEN}}}")).expect("static container id pattern")
});

static SYSTEMD_SCOPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^docker-[a-f0-9]+\.scope$").expect("static systemd scope pattern")
});

/// Returns the first 64-character lowercase hex run in `src`, if any.
pub(super) fn find_full_id(src: &str) -> Option<&str> {
    FULL_ID.find(src).map(|m| m.as_str())
}

/// Returns true if `name` looks like a systemd scope created for a docker container,
/// e.g. `docker-<id>.scope`.
pub fn is_systemd_scope(name: &str) -> bool {
    SYSTEMD_SCOPE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "4f1d7c8b2a3e4f5061728394a5b6c7d8e9f00112233445566778899aabbccdd";

    #[test]
    fn test_find_full_id_in_scope_name() {
        let name = format!("docker-{ID}.scope");
        assert_eq!(find_full_id(&name), Some(ID));
    }

    #[test]
    fn test_find_full_id_too_short() {
        assert_eq!(find_full_id("docker-abc123.scope"), None);
    }

    #[test]
    fn test_find_full_id_ignores_uppercase() {
        assert_eq!(find_full_id(&ID.to_uppercase()), None);
    }

    #[test]
    fn test_is_systemd_scope() {
        assert!(is_systemd_scope(&format!("docker-{ID}.scope")));
        assert!(is_systemd_scope("docker-abc.scope"));
        assert!(!is_systemd_scope("containerd.service"));
        assert!(!is_systemd_scope("docker-XYZ.scope"));
        assert!(!is_systemd_scope(&format!("docker-{ID}.scope.bak")));
    }
}
