//! Archive indexing.
//!
//! Walks the archive's scan listings for each configured project and inserts
//! the scans the local store has not seen yet. Existing rows, including any
//! cached payloads, are left alone.

use std::collections::HashSet;

use thiserror::Error;
use tracing::info;

use crate::archive::{ArchiveClient, ArchiveError, ScanKey};
use crate::store::{ScanFilter, ScanRecord, ScanStore, StoreError};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Index the given projects, returning the number of newly inserted scans.
pub async fn index_projects(
    archive: &dyn ArchiveClient,
    store: &dyn ScanStore,
    projects: &[String],
) -> Result<usize, IndexError> {
    let mut inserted = 0;
    for project in projects {
        let listings = archive.list_scans(project).await?;
        let known: HashSet<ScanKey> = store
            .find_scans(&ScanFilter::new().with_project(project))?
            .into_iter()
            .map(|record| record.key)
            .collect();

        let fresh: Vec<ScanRecord> = listings
            .into_iter()
            .filter(|listing| !known.contains(&listing.key))
            .map(|listing| ScanRecord {
                key: listing.key,
                modality: listing.modality,
                scan_type: listing.scan_type,
                quality_report: None,
                acquisition_profile: None,
            })
            .collect();

        let count = store.insert_scans(&fresh)?;
        info!(project = %project, new_scans = count, "indexed project");
        inserted += count;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteScanStore;
    use crate::testing::{fixtures, MockArchive};

    #[tokio::test]
    async fn test_indexes_only_unknown_scans() {
        let archive = MockArchive::new();
        let store = SqliteScanStore::in_memory().unwrap();

        let known_key = fixtures::scan_key("p1", "s1", "e1", "10");
        let new_key = fixtures::scan_key("p1", "s1", "e1", "11");
        store
            .insert_scans(&[fixtures::scan_record(known_key.clone(), "MR")])
            .unwrap();
        archive
            .set_scans(
                "p1",
                vec![
                    fixtures::scan_listing(known_key.clone(), "MR"),
                    fixtures::scan_listing(new_key.clone(), "CT"),
                ],
            )
            .await;

        let inserted = index_projects(&archive, &store, &["p1".to_string()])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        let record = store.get(&new_key).unwrap().unwrap();
        assert_eq!(record.modality, "CT");
        assert!(record.quality_report.is_none());
    }

    #[tokio::test]
    async fn test_reindexing_is_idempotent() {
        let archive = MockArchive::new();
        let store = SqliteScanStore::in_memory().unwrap();
        let key = fixtures::scan_key("p1", "s1", "e1", "10");
        archive
            .set_scans("p1", vec![fixtures::scan_listing(key.clone(), "MR")])
            .await;

        let projects = vec!["p1".to_string()];
        assert_eq!(index_projects(&archive, &store, &projects).await.unwrap(), 1);
        // Second pass sees the scan in the store and inserts nothing.
        assert_eq!(index_projects(&archive, &store, &projects).await.unwrap(), 0);
    }
}
