//! SQLite-backed scan store implementation.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, params_from_iter, Connection};

use super::types::{ScanFilter, ScanRecord};
use super::{ScanStore, StoreError};
use crate::archive::ScanKey;

/// SQLite-backed scan store.
///
/// Every store instance owns an exclusive connection behind a mutex, so one
/// instance never issues interleaved writes; concurrent scan workers open
/// their own instances against the same database file.
pub struct SqliteScanStore {
    conn: Mutex<Connection>,
}

impl SqliteScanStore {
    /// Open (and initialize if needed) the scan database at `path`.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize(conn: &Connection) -> Result<(), StoreError> {
        // Multiple worker connections may write to the same file.
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS scans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id TEXT NOT NULL,
                project_name TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                subject_label TEXT NOT NULL,
                experiment_id TEXT NOT NULL,
                experiment_label TEXT NOT NULL,
                scan_id TEXT NOT NULL,
                scan_modality TEXT NOT NULL,
                scan_type TEXT NOT NULL,
                quality_report TEXT,
                acquisition_profile TEXT,
                UNIQUE(project_id, subject_id, experiment_id, scan_id)
            );

            CREATE INDEX IF NOT EXISTS idx_scans_project ON scans(project_id);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ScanRecord> {
        Ok(ScanRecord {
            key: ScanKey {
                project_id: row.get(0)?,
                project_name: row.get(1)?,
                subject_id: row.get(2)?,
                subject_label: row.get(3)?,
                experiment_id: row.get(4)?,
                experiment_label: row.get(5)?,
                scan_id: row.get(6)?,
            },
            modality: row.get(7)?,
            scan_type: row.get(8)?,
            quality_report: row.get(9)?,
            acquisition_profile: row.get(10)?,
        })
    }

    fn update_field(&self, key: &ScanKey, field: &str, payload: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Database(e.to_string()))?;
        let sql = format!(
            "UPDATE scans SET {} = ?1
             WHERE project_id = ?2 AND subject_id = ?3 AND experiment_id = ?4 AND scan_id = ?5",
            field
        );
        let changed = conn
            .execute(
                &sql,
                params![
                    payload,
                    key.project_id,
                    key.subject_id,
                    key.experiment_id,
                    key.scan_id
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if changed == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }
}

const SELECT_COLUMNS: &str = "project_id, project_name, subject_id, subject_label, \
     experiment_id, experiment_label, scan_id, scan_modality, scan_type, \
     quality_report, acquisition_profile";

impl ScanStore for SqliteScanStore {
    fn insert_scans(&self, scans: &[ScanRecord]) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Database(e.to_string()))?;
        let mut inserted = 0;
        for scan in scans {
            let changed = conn
                .execute(
                    "INSERT OR IGNORE INTO scans (
                        project_id, project_name, subject_id, subject_label,
                        experiment_id, experiment_label, scan_id, scan_modality, scan_type
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        scan.key.project_id,
                        scan.key.project_name,
                        scan.key.subject_id,
                        scan.key.subject_label,
                        scan.key.experiment_id,
                        scan.key.experiment_label,
                        scan.key.scan_id,
                        scan.modality,
                        scan.scan_type
                    ],
                )
                .map_err(|e| StoreError::Database(e.to_string()))?;
            inserted += changed;
        }
        Ok(inserted)
    }

    fn find_scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Database(e.to_string()))?;

        let mut clauses = Vec::new();
        let mut bindings: Vec<&String> = Vec::new();
        if let Some(ref project) = filter.project {
            clauses.push(format!("project_id = ?{}", bindings.len() + 1));
            bindings.push(project);
        }
        if let Some(ref subject) = filter.subject {
            clauses.push(format!("subject_id = ?{}", bindings.len() + 1));
            bindings.push(subject);
        }
        if let Some(ref experiment) = filter.experiment {
            clauses.push(format!("experiment_id = ?{}", bindings.len() + 1));
            bindings.push(experiment);
        }
        if let Some(ref scan) = filter.scan {
            clauses.push(format!("scan_id = ?{}", bindings.len() + 1));
            bindings.push(scan);
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("SELECT {} FROM scans{} ORDER BY id", SELECT_COLUMNS, where_clause);

        let mut stmt = stmt_or_db_err(&conn, &sql)?;
        let rows = stmt
            .query_map(params_from_iter(bindings.iter()), Self::row_to_record)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(records)
    }

    fn get(&self, key: &ScanKey) -> Result<Option<ScanRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Database(e.to_string()))?;
        let sql = format!(
            "SELECT {} FROM scans
             WHERE project_id = ?1 AND subject_id = ?2 AND experiment_id = ?3 AND scan_id = ?4",
            SELECT_COLUMNS
        );
        let mut stmt = stmt_or_db_err(&conn, &sql)?;
        let mut rows = stmt
            .query_map(
                params![key.project_id, key.subject_id, key.experiment_id, key.scan_id],
                Self::row_to_record,
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(|e| StoreError::Database(e.to_string()))?)),
            None => Ok(None),
        }
    }

    fn update_quality_report(&self, key: &ScanKey, payload: &str) -> Result<(), StoreError> {
        self.update_field(key, "quality_report", payload)
    }

    fn update_acquisition_profile(&self, key: &ScanKey, payload: &str) -> Result<(), StoreError> {
        self.update_field(key, "acquisition_profile", payload)
    }
}

fn stmt_or_db_err<'c>(
    conn: &'c Connection,
    sql: &str,
) -> Result<rusqlite::Statement<'c>, StoreError> {
    conn.prepare(sql).map_err(|e| StoreError::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(project: &str, subject: &str, scan: &str, modality: &str) -> ScanRecord {
        ScanRecord {
            key: ScanKey {
                project_id: project.to_string(),
                project_name: format!("{}-name", project),
                subject_id: subject.to_string(),
                subject_label: format!("{}-label", subject),
                experiment_id: "E1".to_string(),
                experiment_label: "E1-label".to_string(),
                scan_id: scan.to_string(),
            },
            modality: modality.to_string(),
            scan_type: "T1w".to_string(),
            quality_report: None,
            acquisition_profile: None,
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let store = SqliteScanStore::in_memory().unwrap();
        let scans = vec![record("P1", "S1", "1", "MR"), record("P1", "S1", "2", "CT")];
        assert_eq!(store.insert_scans(&scans).unwrap(), 2);
        assert_eq!(store.insert_scans(&scans).unwrap(), 0);
        assert_eq!(store.find_scans(&ScanFilter::new()).unwrap().len(), 2);
    }

    #[test]
    fn test_find_scans_filters() {
        let store = SqliteScanStore::in_memory().unwrap();
        store
            .insert_scans(&[
                record("P1", "S1", "1", "MR"),
                record("P1", "S2", "1", "MR"),
                record("P2", "S1", "1", "CT"),
            ])
            .unwrap();

        let all = store.find_scans(&ScanFilter::new()).unwrap();
        assert_eq!(all.len(), 3);

        let p1 = store
            .find_scans(&ScanFilter::new().with_project("P1"))
            .unwrap();
        assert_eq!(p1.len(), 2);

        let p1s2 = store
            .find_scans(&ScanFilter::new().with_project("P1").with_subject("S2"))
            .unwrap();
        assert_eq!(p1s2.len(), 1);
        assert_eq!(p1s2[0].key.subject_id, "S2");
    }

    #[test]
    fn test_payload_updates_are_independent() {
        let store = SqliteScanStore::in_memory().unwrap();
        let scan = record("P1", "S1", "1", "MR");
        store.insert_scans(&[scan.clone()]).unwrap();

        store
            .update_quality_report(&scan.key, r#"{"average_piqe_score": 12.0}"#)
            .unwrap();
        let fetched = store.get(&scan.key).unwrap().unwrap();
        assert!(fetched.quality_report.is_some());
        assert!(fetched.acquisition_profile.is_none());

        store
            .update_acquisition_profile(&scan.key, r#"{"Modality": "MR"}"#)
            .unwrap();
        let fetched = store.get(&scan.key).unwrap().unwrap();
        assert!(fetched.quality_report.is_some());
        assert!(fetched.acquisition_profile.is_some());
    }

    #[test]
    fn test_update_missing_scan_fails() {
        let store = SqliteScanStore::in_memory().unwrap();
        let scan = record("P1", "S1", "1", "MR");
        let err = store.update_quality_report(&scan.key, "{}").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = SqliteScanStore::in_memory().unwrap();
        assert!(store.get(&record("P", "S", "9", "MR").key).unwrap().is_none());
    }
}
