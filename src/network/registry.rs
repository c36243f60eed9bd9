use std::collections::BTreeSet;

use reqwest::Url;

use crate::error::RegistryError;

/// Known peers, stored as normalized `scheme://host:port` strings.
/// Ordered, so iteration (and tie-breaking during resolution) is deterministic.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: BTreeSet<String>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer by full URL or bare `host:port`. Re-registering is a no-op.
    /// Returns the normalized address.
    pub fn register(&mut self, address: &str) -> Result<String, RegistryError> {
        let normalized = normalize_address(address)?;
        self.nodes.insert(normalized.clone());
        Ok(normalized)
    }

    /// Registered peers in lexicographic order.
    pub fn nodes(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Reduce an address to `scheme://host[:port]`, defaulting the scheme to `http`.
pub fn normalize_address(address: &str) -> Result<String, RegistryError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::InvalidAddress(address.to_string()));
    }

    // "host:port" either fails to parse or parses as a scheme with no host.
    let url = match Url::parse(trimmed) {
        Ok(url) if url.host_str().is_some() => url,
        _ => Url::parse(&format!("http://{trimmed}"))
            .map_err(|_| RegistryError::InvalidAddress(address.to_string()))?,
    };

    let host = url
        .host_str()
        .ok_or_else(|| RegistryError::InvalidAddress(address.to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}
