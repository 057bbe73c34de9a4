// crates/core/src/dialect.rs
//! Source warehouse SQL dialects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Legacy warehouse a migration reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum SourceDialect {
    Oracle,
    Snowflake,
    SqlServer,
    Teradata,
    Netezza,
    Synapse,
    Redshift,
    MySql,
}

impl SourceDialect {
    pub const ALL: [SourceDialect; 8] = [
        Self::Oracle,
        Self::Snowflake,
        Self::SqlServer,
        Self::Teradata,
        Self::Netezza,
        Self::Synapse,
        Self::Redshift,
        Self::MySql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::Snowflake => "snowflake",
            Self::SqlServer => "sqlserver",
            Self::Teradata => "teradata",
            Self::Netezza => "netezza",
            Self::Synapse => "synapse",
            Self::Redshift => "redshift",
            Self::MySql => "mysql",
        }
    }

    /// Name used in translation prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Oracle => "Oracle",
            Self::Snowflake => "Snowflake",
            Self::SqlServer => "SQL Server",
            Self::Teradata => "Teradata",
            Self::Netezza => "Netezza",
            Self::Synapse => "Azure Synapse",
            Self::Redshift => "Amazon Redshift",
            Self::MySql => "MySQL",
        }
    }
}

impl FromStr for SourceDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '_', '-'], "").as_str() {
            "oracle" => Ok(Self::Oracle),
            "snowflake" => Ok(Self::Snowflake),
            "sqlserver" | "mssql" | "tsql" => Ok(Self::SqlServer),
            "teradata" => Ok(Self::Teradata),
            "netezza" => Ok(Self::Netezza),
            "synapse" | "azuresynapse" => Ok(Self::Synapse),
            "redshift" | "amazonredshift" => Ok(Self::Redshift),
            "mysql" => Ok(Self::MySql),
            other => Err(format!("Unsupported source dialect: {}", other)),
        }
    }
}

impl fmt::Display for SourceDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
