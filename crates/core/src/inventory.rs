// crates/core/src/inventory.rs
//! Work items and the inventory document they are extracted from.
//!
//! Catalog extraction writes an inventory document listing every table, view
//! and stored procedure of the source database along with its SQL. A
//! migration job never talks to the source database itself; it receives the
//! fully materialised list of [`WorkItem`]s produced from that document.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::InventoryError;

/// Kind of schema object being migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Table,
    View,
    Procedure,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Procedure => "procedure",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One schema object to migrate, with its source SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(default)]
    pub schema: String,
    pub name: String,
    pub object_type: ObjectType,
    #[serde(default)]
    pub source_sql: String,
}

impl WorkItem {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        object_type: ObjectType,
        source_sql: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            object_type,
            source_sql: source_sql.into(),
        }
    }

    /// `schema.name`, or just `name` when the schema is unknown.
    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    /// True when there is no SQL to translate.
    pub fn has_source_sql(&self) -> bool {
        !self.source_sql.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ddl: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionEntry {
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub definition: String,
}

/// Extracted catalog contents, grouped by object kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryObjects {
    #[serde(default)]
    pub tables: Vec<TableEntry>,
    #[serde(default)]
    pub views: Vec<DefinitionEntry>,
    #[serde(default)]
    pub stored_procedures: Vec<DefinitionEntry>,
}

/// The inventory document written by catalog extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub inventory: InventoryObjects,
}

impl Inventory {
    /// Flatten into work items: tables, then views, then procedures.
    ///
    /// Tables without captured DDL get a placeholder comment so they are
    /// still reported; the placeholder is sent to translation like any
    /// other SQL.
    pub fn work_items(&self) -> Vec<WorkItem> {
        let objects = &self.inventory;
        let tables = objects.tables.iter().map(|t| {
            let ddl = t
                .ddl
                .clone()
                .unwrap_or_else(|| format!("-- DDL for {}", non_empty(&t.name, "unknown")));
            WorkItem::new(&t.schema, &t.name, ObjectType::Table, ddl)
        });
        let views = objects
            .views
            .iter()
            .map(|v| WorkItem::new(&v.schema, &v.name, ObjectType::View, &v.definition));
        let procedures = objects
            .stored_procedures
            .iter()
            .map(|p| WorkItem::new(&p.schema, &p.name, ObjectType::Procedure, &p.definition));

        tables.chain(views).chain(procedures).collect()
    }
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Where a migration gets its inventory from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventorySource {
    /// Document supplied in the request body.
    Inline(Inventory),
    /// Path to an inventory JSON file on the server.
    File(PathBuf),
}

/// Produces the ordered, fully materialised list of work items for a job.
#[async_trait]
pub trait WorkItemSource: Send + Sync {
    async fn extract(&self, source: &InventorySource) -> Result<Vec<WorkItem>, InventoryError>;
}

/// Reads inventory documents, inline or from disk.
#[derive(Debug, Clone, Default)]
pub struct InventoryExtractor;

impl InventoryExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Load and parse an inventory file.
    pub async fn load(path: &std::path::Path) -> Result<Inventory, InventoryError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| InventoryError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| InventoryError::Malformed {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl WorkItemSource for InventoryExtractor {
    async fn extract(&self, source: &InventorySource) -> Result<Vec<WorkItem>, InventoryError> {
        let items = match source {
            InventorySource::Inline(inventory) => inventory.work_items(),
            InventorySource::File(path) => Self::load(path).await?.work_items(),
        };
        tracing::debug!(count = items.len(), "Extracted work items from inventory");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "source_type": "oracle",
            "inventory": {
                "tables": [
                    {"schema": "SALES", "name": "ORDERS", "ddl": "CREATE TABLE ORDERS (ID NUMBER)"},
                    {"schema": "SALES", "name": "ITEMS"}
                ],
                "views": [
                    {"schema": "SALES", "name": "V_TOTALS", "definition": "SELECT 1 FROM DUAL"}
                ],
                "stored_procedures": [
                    {"schema": "", "name": "P_LOAD", "definition": "BEGIN NULL; END;"}
                ]
            }
        }"#
    }

    #[test]
    fn test_work_items_order_and_names() {
        let inventory: Inventory = serde_json::from_str(sample_json()).unwrap();
        let items = inventory.work_items();

        let names: Vec<String> = items.iter().map(|i| i.qualified_name()).collect();
        assert_eq!(
            names,
            vec!["SALES.ORDERS", "SALES.ITEMS", "SALES.V_TOTALS", "P_LOAD"]
        );
        assert_eq!(items[0].object_type, ObjectType::Table);
        assert_eq!(items[2].object_type, ObjectType::View);
        assert_eq!(items[3].object_type, ObjectType::Procedure);
    }

    #[test]
    fn test_table_without_ddl_gets_placeholder() {
        let inventory: Inventory = serde_json::from_str(sample_json()).unwrap();
        let items = inventory.work_items();
        assert_eq!(items[1].source_sql, "-- DDL for ITEMS");
        assert!(items[1].has_source_sql());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let inventory: Inventory = serde_json::from_str(r#"{"inventory": {}}"#).unwrap();
        assert!(inventory.work_items().is_empty());
        let inventory: Inventory = serde_json::from_str("{}").unwrap();
        assert!(inventory.work_items().is_empty());
    }

    #[test]
    fn test_has_source_sql_whitespace() {
        let item = WorkItem::new("s", "v", ObjectType::View, "   \n ");
        assert!(!item.has_source_sql());
    }

    #[tokio::test]
    async fn test_extract_inline() {
        let inventory: Inventory = serde_json::from_str(sample_json()).unwrap();
        let items = InventoryExtractor::new()
            .extract(&InventorySource::Inline(inventory))
            .await
            .unwrap();
        assert_eq!(items.len(), 4);
    }

    #[tokio::test]
    async fn test_extract_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();

        let items = InventoryExtractor::new()
            .extract(&InventorySource::File(file.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].source_sql, "CREATE TABLE ORDERS (ID NUMBER)");
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let err = InventoryExtractor::new()
            .extract(&InventorySource::File(PathBuf::from("/nonexistent/inventory.json")))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_extract_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();

        let err = InventoryExtractor::new()
            .extract(&InventorySource::File(file.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Malformed { .. }));
    }

    #[test]
    fn test_inventory_source_serde() {
        let source: InventorySource =
            serde_json::from_str(r#"{"file": "/data/inventory.json"}"#).unwrap();
        assert_eq!(source, InventorySource::File(PathBuf::from("/data/inventory.json")));
    }
}
