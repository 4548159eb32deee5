use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{DeletionReport, StorageFailure};
use crate::{
    auth::{Role, User},
    error::ApiError,
    state::AppState,
    storage::{StorageClient, USER_BUCKETS},
};

/// Checks whether `caller` may delete `target_id`. `target` is the looked-up
/// account, `None` when it does not exist.
pub fn authorize_deletion(
    caller: &User,
    target_id: Uuid,
    target: Option<&User>,
) -> Result<(), ApiError> {
    let caller_role = caller.role();
    if !caller_role.is_elevated() {
        return Err(ApiError::Forbidden("Admin role required".into()));
    }
    if caller.id == target_id {
        return Err(ApiError::Forbidden("Cannot delete your own account".into()));
    }
    let target = target.ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let target_role = target.role();
    if target_role == Role::Owner || target_role >= caller_role {
        return Err(ApiError::Forbidden(format!(
            "Cannot delete a user with role {}",
            target_role.as_str()
        )));
    }
    Ok(())
}

/// Removes every object under `{user_id}/` in the user buckets. Failures are
/// collected, never abort the sweep.
pub async fn purge_storage(
    storage: &dyn StorageClient,
    user_id: Uuid,
) -> (usize, Vec<StorageFailure>) {
    let prefix = format!("{user_id}/");
    let mut deleted = 0;
    let mut failures = Vec::new();

    for bucket in USER_BUCKETS {
        let keys = match storage.list_objects(bucket, &prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(bucket, error = %e, "listing user objects failed");
                failures.push(StorageFailure {
                    bucket: bucket.into(),
                    key: prefix.clone(),
                    error: format!("{e:#}"),
                });
                continue;
            }
        };
        for key in keys {
            match storage.delete_object(bucket, &key).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(bucket, key = %key, error = %e, "deleting user object failed");
                    failures.push(StorageFailure {
                        bucket: bucket.into(),
                        key,
                        error: format!("{e:#}"),
                    });
                }
            }
        }
    }
    (deleted, failures)
}

#[instrument(skip(st))]
pub async fn delete_user(
    st: &AppState,
    caller_id: Uuid,
    target_id: Uuid,
) -> Result<DeletionReport, ApiError> {
    let caller = st
        .users
        .find_by_id(caller_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown caller".into()))?;
    let target = st.users.find_by_id(target_id).await?;
    authorize_deletion(&caller, target_id, target.as_ref())?;

    let tables = st.admin.purge_user(target_id).await?;
    let (storage_deleted, storage_failures) = purge_storage(st.storage.as_ref(), target_id).await;

    info!(
        target_user = %target_id,
        storage_deleted,
        storage_failures = storage_failures.len(),
        "user purged"
    );
    Ok(DeletionReport {
        success: true,
        user_id: target_id,
        tables,
        storage_deleted,
        storage_failures,
    })
}
