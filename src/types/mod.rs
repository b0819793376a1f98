pub mod change;
pub mod error;
pub mod reference;
pub mod verdict;

pub use change::*;
pub use error::{ApiError, ErrorCategory, ErrorClassifier, GuardError, Result, ResultExt};
pub use reference::*;
pub use verdict::*;

// =============================================================================
// Domain Newtypes
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository coordinates on the code host
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`
    pub fn parse(full_name: &str) -> Result<Self> {
        match full_name.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(GuardError::Validation(format!(
                "Invalid repository '{}', expected owner/name",
                full_name
            ))),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_parse() {
        let repo = RepoRef::parse("Azure/azureml-examples").unwrap();
        assert_eq!(repo.owner, "Azure");
        assert_eq!(repo.name, "azureml-examples");
        assert_eq!(repo.to_string(), "Azure/azureml-examples");
    }

    #[test]
    fn test_repo_ref_parse_rejects_bad_input() {
        assert!(RepoRef::parse("no-slash").is_err());
        assert!(RepoRef::parse("/name").is_err());
        assert!(RepoRef::parse("a/b/c").is_err());
    }
}
