//! Operation catalog
//!
//! Descriptors live in JSON. The built-in catalog is compiled into the
//! binary; a user catalog file can replace it.

use super::error::UsageError;
use super::protocol::OperationDescriptor;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const BUILTIN_CATALOG: &str = include_str!("../../catalog/operations.json");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    operations: Vec<OperationDescriptor>,
}

#[derive(Debug, Clone)]
pub struct OperationCatalog {
    operations: Vec<OperationDescriptor>,
}

impl OperationCatalog {
    /// The catalog shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG).context("built-in catalog is invalid")
    }

    /// Load a catalog file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read catalog {:?}", path))?;
        let catalog =
            Self::from_json(&content).with_context(|| format!("Invalid catalog {:?}", path))?;
        debug!(
            "Loaded {} operations from {:?}",
            catalog.operations.len(),
            path
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)?;
        let catalog = Self {
            operations: file.operations,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for op in &self.operations {
            if op.command.is_empty() || op.service.is_empty() || op.action.is_empty() {
                bail!("operation entries need command, service and action");
            }
            if !seen.insert(op.command.to_ascii_lowercase()) {
                bail!("duplicate command '{}'", op.command);
            }

            let declared = |name: &str| op.field(name).is_some();
            if let Some(pagination) = &op.pagination {
                for name in [&pagination.input_token, &pagination.max_results_param]
                    .into_iter()
                    .flatten()
                {
                    if !declared(name.as_str()) {
                        bail!(
                            "{}: pagination field '{}' is not a declared field",
                            op.command,
                            name
                        );
                    }
                }
                if pagination.input_token.is_some() != pagination.output_token.is_some() {
                    bail!(
                        "{}: pagination needs both input_token and output_token",
                        op.command
                    );
                }
            }
            if let Some(target) = &op.target_field {
                if !declared(target.as_str()) {
                    bail!(
                        "{}: target field '{}' is not a declared field",
                        op.command,
                        target
                    );
                }
            }
        }
        Ok(())
    }

    /// Look up by command name (case-insensitive) or `service:Action`
    pub fn get(&self, name: &str) -> Result<&OperationDescriptor, UsageError> {
        let by_command = self
            .operations
            .iter()
            .find(|op| op.command.eq_ignore_ascii_case(name));

        let by_action = || {
            let (service, action) = name.split_once(':')?;
            self.operations.iter().find(|op| {
                op.service.eq_ignore_ascii_case(service) && op.action.eq_ignore_ascii_case(action)
            })
        };

        by_command
            .or_else(by_action)
            .ok_or_else(|| UsageError::UnknownCommand(name.to_string()))
    }

    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Resolve the catalog to use: a user file if given, else the built-in one
pub fn load_catalog(path: Option<&Path>) -> Result<OperationCatalog> {
    match path {
        Some(path) => OperationCatalog::from_path(path),
        None => OperationCatalog::builtin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::protocol::{ApiProtocol, ConfirmImpact};
    use std::io::Write;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = OperationCatalog::builtin().unwrap();
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_builtin_mutating_ops_name_a_target() {
        let catalog = OperationCatalog::builtin().unwrap();
        for op in catalog.operations() {
            if op.confirm_impact.is_mutating() {
                assert!(op.target_field.is_some(), "{} has no target", op.command);
            }
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = OperationCatalog::builtin().unwrap();
        let op = catalog.get("get-sqsqueue").unwrap();
        assert_eq!(op.action, "ListQueues");
        assert_eq!(op.protocol, ApiProtocol::Query);
    }

    #[test]
    fn test_lookup_by_service_action() {
        let catalog = OperationCatalog::builtin().unwrap();
        let op = catalog.get("dynamodb:DeleteTable").unwrap();
        assert_eq!(op.command, "Remove-DDBTable");
        assert_eq!(op.confirm_impact, ConfirmImpact::High);
    }

    #[test]
    fn test_unknown_command() {
        let catalog = OperationCatalog::builtin().unwrap();
        assert_eq!(
            catalog.get("Get-Nothing").unwrap_err(),
            UsageError::UnknownCommand("Get-Nothing".to_string())
        );
    }

    #[test]
    fn test_rejects_duplicate_commands() {
        let json = r#"{"operations": [
            {"command": "Get-A", "service": "s", "action": "A"},
            {"command": "get-a", "service": "s", "action": "B"}
        ]}"#;
        let err = OperationCatalog::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate command"));
    }

    #[test]
    fn test_rejects_undeclared_cursor_field() {
        let json = r#"{"operations": [
            {"command": "Get-A", "service": "s", "action": "A",
             "pagination": {"input_token": "NextToken", "output_token": "/NextToken"}}
        ]}"#;
        let err = OperationCatalog::from_json(json).unwrap_err();
        assert!(err.to_string().contains("not a declared field"));
    }

    #[test]
    fn test_rejects_half_pagination() {
        let json = r#"{"operations": [
            {"command": "Get-A", "service": "s", "action": "A",
             "fields": [{"name": "NextToken"}],
             "pagination": {"input_token": "NextToken"}}
        ]}"#;
        assert!(OperationCatalog::from_json(json).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"operations": [{{"command": "Get-Widget", "service": "widgets", "action": "ListWidgets", "protocol": "json"}}]}}"#
        )
        .unwrap();

        let catalog = load_catalog(Some(file.path())).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("Get-Widget").unwrap().protocol, ApiProtocol::Json);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = load_catalog(Some(Path::new("/nonexistent/catalog.json"))).unwrap_err();
        assert!(err.to_string().contains("Could not read catalog"));
    }
}
