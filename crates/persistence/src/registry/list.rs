//! Provider list parsing and formatting.

use std::collections::HashSet;

use crate::config::ConfigError;
use crate::types::ProviderType;

/// Parses a comma-separated provider list such as `"MongoDb, Sqlite, Ipfs"`.
///
/// Every unknown name is reported in one error. Duplicates are dropped,
/// keeping the first occurrence.
pub fn parse_provider_list(list: &str) -> Result<Vec<ProviderType>, ConfigError> {
    let mut providers = Vec::new();
    let mut invalid = Vec::new();

    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match name.parse::<ProviderType>() {
            Ok(provider) => providers.push(provider),
            Err(_) => invalid.push(name.to_string()),
        }
    }

    if !invalid.is_empty() {
        return Err(ConfigError::InvalidProviderList { invalid });
    }

    Ok(dedupe_providers(providers))
}

/// Removes duplicate providers, keeping the first occurrence.
pub fn dedupe_providers(providers: impl IntoIterator<Item = ProviderType>) -> Vec<ProviderType> {
    let mut seen = HashSet::new();
    providers.into_iter().filter(|p| seen.insert(*p)).collect()
}

/// Formats providers for messages as `"a, b & c"`.
pub fn format_provider_list(providers: &[ProviderType]) -> String {
    match providers {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => {
            let head: Vec<String> = init.iter().map(ToString::to_string).collect();
            format!("{} & {}", head.join(", "), last)
        }
    }
}
