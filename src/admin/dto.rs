use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    pub target_user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDeletion {
    pub table: String,
    pub column: String,
    pub rows: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageFailure {
    pub bucket: String,
    pub key: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct DeletionReport {
    pub success: bool,
    pub user_id: Uuid,
    pub tables: Vec<TableDeletion>,
    pub storage_deleted: usize,
    pub storage_failures: Vec<StorageFailure>,
}
