use crate::error::{DashError, DashResult};
use crate::sanitizer::present_text;
use crate::spreadsheet::Workbook;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Who is making the current request.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<String>;
}

/// An identity fixed up front, e.g. taken from a request header.
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity(Option<String>);

impl FixedIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        if identity.trim().is_empty() {
            FixedIdentity(None)
        } else {
            FixedIdentity(Some(identity.trim().to_string()))
        }
    }

    pub fn anonymous() -> Self {
        FixedIdentity(None)
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_identity(&self) -> Option<String> {
        self.0.clone()
    }
}

/// One row of the permissions sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub identity: String,
    pub role: String,
}

/// Role lookup against the permissions sheet. The sheet is re-read on every
/// check so revoked roles take effect immediately.
#[derive(Clone)]
pub struct AccessGate {
    workbook: Arc<dyn Workbook>,
    sheet_name: String,
}

impl AccessGate {
    pub fn new(workbook: Arc<dyn Workbook>, sheet_name: impl Into<String>) -> Self {
        AccessGate {
            workbook,
            sheet_name: sheet_name.into(),
        }
    }

    /// Every (identity, role) row below the header. Rows missing either
    /// value are skipped.
    pub fn permission_records(&self) -> DashResult<Vec<PermissionRecord>> {
        let table = self
            .workbook
            .table(&self.sheet_name)
            .ok_or_else(|| DashError::SourceNotFound(self.sheet_name.clone()))?;
        let last_row = table.last_row_index();
        if last_row < 2 {
            return Ok(Vec::new());
        }

        let rows = table.read_range(2, 1, last_row - 1, 2)?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let identity = present_text(row.first()?)?;
                let role = present_text(row.get(1)?)?;
                Some(PermissionRecord { identity, role })
            })
            .collect())
    }

    /// Role of `identity` (matched case-insensitively), or `None` when there
    /// is no match or the permissions sheet cannot be read.
    pub fn resolve_role(&self, identity: &str) -> Option<String> {
        let wanted = identity.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let records = match self.permission_records() {
            Ok(records) => records,
            Err(e) => {
                warn!("permission lookup failed: {}", e);
                return None;
            }
        };
        records
            .into_iter()
            .find(|r| r.identity.to_lowercase() == wanted)
            .map(|r| r.role)
    }

    /// True only if the resolved role equals `required_role` exactly.
    pub fn authorize(&self, identity: &str, required_role: &str) -> bool {
        let granted = self
            .resolve_role(identity)
            .is_some_and(|role| role == required_role);
        debug!(
            "authorize '{}' for role '{}': {}",
            identity, required_role, granted
        );
        granted
    }

    pub fn has_any_access(&self, identity: &str) -> bool {
        self.resolve_role(identity).is_some()
    }
}
