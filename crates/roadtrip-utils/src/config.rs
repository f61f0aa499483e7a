//! Configuration utilities

/// Load configuration from environment
pub fn load_env() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    Ok(())
}

/// Read an environment variable, falling back to `default` when unset
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_default() {
        assert_eq!(env_or("ROADTRIP_UTILS_UNSET_VAR", "fallback"), "fallback");
    }
}
