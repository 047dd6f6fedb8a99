// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Environment-based credentials

/// Read a required environment variable.
pub fn require_env(name: &str) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => anyhow::bail!("environment variable {name} is empty"),
        Err(_) => anyhow::bail!("environment variable {name} is not set"),
    }
}

/// Azure OpenAI connection settings
#[derive(Debug, Clone)]
pub struct AzureSettings {
    /// `AZURE_OPENAI_API_KEY`
    pub api_key: String,
    /// `AZURE_OPENAI_ENDPOINT`
    pub endpoint: String,
    /// `AZURE_OPENAI_API_VERSION`
    pub api_version: String,
    /// `AZURE_OPENAI_MODEL`, the deployment name
    pub deployment: String,
}

impl AzureSettings {
    /// Read all four `AZURE_OPENAI_*` variables, failing on the first missing one.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_key: require_env("AZURE_OPENAI_API_KEY")?,
            deployment: require_env("AZURE_OPENAI_MODEL")?,
            endpoint: require_env("AZURE_OPENAI_ENDPOINT")?,
            api_version: require_env("AZURE_OPENAI_API_VERSION")?,
        })
    }
}
