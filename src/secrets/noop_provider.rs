//! Secret manager used when no backend is enabled.

use super::types::SecretManager;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Never fetches anything.
#[derive(Debug, Default)]
pub struct NoOpSecretManager;

impl NoOpSecretManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretManager for NoOpSecretManager {
    fn name(&self) -> &str {
        "none"
    }

    async fn get_secret(&self, _key: &str) -> Result<String> {
        Err(Error::NotConfigured)
    }

    async fn get_secrets(&self, _prefix: Option<&str>) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}
