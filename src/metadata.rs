use std::collections::BTreeMap;

use crate::errors::Result;
use crate::string_list::NameValueList;

/// Metadata items grouped into named domains.
///
/// The default domain is the empty string.
pub trait Metadata {
    /// Names of the domains holding at least one item.
    fn metadata_domains(&self) -> Vec<String>;

    /// All items of `domain`, or `None` if the domain is empty.
    fn metadata_domain(&self, domain: &str) -> Option<NameValueList>;

    fn metadata_item(&self, key: &str, domain: &str) -> Option<String> {
        self.metadata_domain(domain)
            .and_then(|items| items.fetch_name_value(key).map(str::to_string))
    }

    fn set_metadata_item(&mut self, key: &str, value: &str, domain: &str) -> Result<()>;
}

/// Plain in-memory storage for [`Metadata`], used by driver implementations.
#[derive(Clone, Debug, Default)]
pub struct MetadataStore {
    domains: BTreeMap<String, NameValueList>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domains(&self) -> Vec<String> {
        self.domains
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn domain(&self, domain: &str) -> Option<&NameValueList> {
        self.domains.get(domain).filter(|items| !items.is_empty())
    }

    pub fn item(&self, key: &str, domain: &str) -> Option<&str> {
        self.domains.get(domain)?.fetch_name_value(key)
    }

    pub fn set_item(&mut self, key: &str, value: &str, domain: &str) -> Result<()> {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .set_name_value(key, value)
    }
}
