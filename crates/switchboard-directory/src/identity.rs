//! Process identity used as the machine segment of directory keys.

use rand::Rng;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

static MACHINE_IDENTITY: OnceLock<String> = OnceLock::new();

/// Identity of this process: `<hostname>-<pid>-<unix seconds>-<XXXX>`.
///
/// Computed once and stable for the life of the process. The random suffix
/// keeps two processes started in the same second on the same host apart.
pub fn machine_identity() -> &'static str {
    MACHINE_IDENTITY.get_or_init(generate)
}

fn generate() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let suffix: u16 = rand::thread_rng().gen();

    format!(
        "{}-{}-{}-{:04X}",
        sanitize(&host),
        std::process::id(),
        started,
        suffix
    )
}

/// Key segments must not contain the path separator.
fn sanitize(host: &str) -> String {
    let cleaned: String = host
        .chars()
        .map(|c| if c == '/' || c.is_whitespace() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_stable() {
        assert_eq!(machine_identity(), machine_identity());
    }

    #[test]
    fn test_identity_shape() {
        let id = generate();
        let parts: Vec<&str> = id.rsplitn(4, '-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].len(), 4);
        assert!(parts[0].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[1].parse::<u64>().is_ok());
        assert_eq!(parts[2].parse::<u32>().unwrap(), std::process::id());
        assert!(!id.contains('/'));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a/b c"), "a_b_c");
        assert_eq!(sanitize(""), "unknown");
    }
}
