//! DDL statement helpers.
//!
//! These produce statement text only; execution is the coordinator's job.

use crate::expr::quote_ident;

/// Options for [`create_table_as`].
#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    /// Emit `CREATE OR REPLACE` instead of `IF NOT EXISTS`.
    pub replace: bool,
    /// Emit a `TEMP` table.
    pub temp: bool,
    /// Emit a view instead of a table.
    pub view: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            replace: false,
            temp: true,
            view: false,
        }
    }
}

/// `CREATE TABLE <name> AS <query>` with the given options. The table name is
/// emitted verbatim, so callers may pass schema-qualified names.
pub fn create_table_as(name: &str, query: &str, options: CreateOptions) -> String {
    format!(
        "CREATE {}{}{}{}{name} AS {query}",
        if options.replace { "OR REPLACE " } else { "" },
        if options.temp { "TEMP " } else { "" },
        if options.view { "VIEW" } else { "TABLE" },
        if options.replace {
            " "
        } else {
            " IF NOT EXISTS "
        },
    )
}

/// `CREATE SCHEMA IF NOT EXISTS "<name>"`.
pub fn create_schema(name: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(name))
}

/// `DROP SCHEMA IF EXISTS "<name>" CASCADE`.
pub fn drop_schema_cascade(name: &str) -> String {
    format!("DROP SCHEMA IF EXISTS {} CASCADE", quote_ident(name))
}
