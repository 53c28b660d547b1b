use crate::config::env_parse_or;

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub salt_length: usize,
    pub key_length: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 2,
            salt_length: 16,
            key_length: 32,
        }
    }
}

impl HashConfig {
    /// Reads `MEMORY` (MiB), `ITERATIONS`, `PARALLELISM`, `SALT_LENGTH` and `KEY_LENGTH`.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let memory_mib: u32 = env_parse_or(lookup, "MEMORY", defaults.memory_kib / 1024);

        Self {
            memory_kib: memory_mib.saturating_mul(1024),
            iterations: env_parse_or(lookup, "ITERATIONS", defaults.iterations),
            parallelism: env_parse_or(lookup, "PARALLELISM", defaults.parallelism),
            salt_length: env_parse_or(lookup, "SALT_LENGTH", defaults.salt_length),
            key_length: env_parse_or(lookup, "KEY_LENGTH", defaults.key_length),
        }
    }
}
