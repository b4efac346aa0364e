//! Shared utility functions for provider adapters.

use sh_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Upstream`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Upstream(e.to_string())
    }
}

/// Resolve an API key from the named environment variable. Providers are
/// lazy singletons (§9): a missing key surfaces here, at first use, not
/// at process start.
pub(crate) fn resolve_api_key(env_var: &str) -> Result<String> {
    std::env::var(env_var).map_err(|_| {
        Error::Internal(format!(
            "environment variable '{env_var}' not set or not valid UTF-8"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_reads_env_var() {
        let var_name = "SH_TEST_RESOLVE_ENV_KEY";
        std::env::set_var(var_name, "secret-value");
        assert_eq!(resolve_api_key(var_name).unwrap(), "secret-value");
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_errors_when_missing() {
        let err = resolve_api_key("SH_TEST_NONEXISTENT_VAR").unwrap_err();
        assert!(err.to_string().contains("SH_TEST_NONEXISTENT_VAR"));
    }
}
