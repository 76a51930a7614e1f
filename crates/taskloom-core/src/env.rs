//! Environment variable utilities
//!
//! Small parse-with-default helpers used by the runtime config.

use std::env;
use std::str::FromStr;

/// Read an environment variable and parse it, falling back to `default`
/// when unset or unparseable.
pub fn env_get<T: FromStr>(name: &str, default: T) -> T {
    env_get_opt(name).unwrap_or(default)
}

/// Read an environment variable and parse it, `None` when unset or
/// unparseable.
pub fn env_get_opt<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_when_unset() {
        assert_eq!(env_get::<usize>("LOOM_TEST_UNSET_VAR", 7), 7);
        assert_eq!(env_get_opt::<usize>("LOOM_TEST_UNSET_VAR"), None);
    }

    #[test]
    fn test_parse_set_var() {
        env::set_var("LOOM_TEST_SET_VAR", " 42 ");
        assert_eq!(env_get::<u64>("LOOM_TEST_SET_VAR", 0), 42);
        env::remove_var("LOOM_TEST_SET_VAR");
    }

    #[test]
    fn test_unparseable_falls_back() {
        env::set_var("LOOM_TEST_BAD_VAR", "not-a-number");
        assert_eq!(env_get::<u32>("LOOM_TEST_BAD_VAR", 9), 9);
        env::remove_var("LOOM_TEST_BAD_VAR");
    }
}
