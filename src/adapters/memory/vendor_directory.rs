//! In-memory vendor directory.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::foundation::{DomainError, VendorId};
use crate::ports::VendorDirectory;

/// Fixed set of known vendors.
#[derive(Default)]
pub struct InMemoryVendorDirectory {
    vendors: HashSet<String>,
}

impl InMemoryVendorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vendors<I, S>(vendors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vendors: vendors.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl VendorDirectory for InMemoryVendorDirectory {
    async fn vendor_exists(&self, vendor_id: &VendorId) -> Result<bool, DomainError> {
        Ok(self.vendors.contains(vendor_id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_directory_knows_nobody() {
        let directory = InMemoryVendorDirectory::new();

        assert!(!directory.vendor_exists(&VendorId::new("V1").unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn knows_only_registered_vendors() {
        let directory = InMemoryVendorDirectory::with_vendors(["V1", "V2"]);

        assert!(directory.vendor_exists(&VendorId::new("V1").unwrap()).await.unwrap());
        assert!(directory.vendor_exists(&VendorId::new("V2").unwrap()).await.unwrap());
        assert!(!directory.vendor_exists(&VendorId::new("V3").unwrap()).await.unwrap());
    }
}
