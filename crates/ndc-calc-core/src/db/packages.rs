//! NDC package storage.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{PackageRecord, PackageSet, PackageStatus};
use crate::vocabulary::Ndc;

const DATE_FORMAT: &str = "%Y-%m-%d";

const PACKAGE_COLUMNS: &str = "code, manufacturer, package_size, dosage_form, strength, \
                               status, marketing_start, marketing_end";

impl Database {
    /// Insert or update a package under a concept.
    ///
    /// Packages are keyed by [`Ndc::key`], so the same package published
    /// under a different hyphenation replaces the existing row.
    pub fn upsert_package(&self, rxcui: &str, package: &PackageRecord) -> DbResult<()> {
        let key = Ndc::parse(&package.code)?.key();

        self.conn.execute(
            r#"
            INSERT INTO ndc_packages (
                ndc_key, code, rxcui, manufacturer, package_size, dosage_form,
                strength, status, marketing_start, marketing_end, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, datetime('now'))
            ON CONFLICT(ndc_key) DO UPDATE SET
                code = excluded.code,
                rxcui = excluded.rxcui,
                manufacturer = excluded.manufacturer,
                package_size = excluded.package_size,
                dosage_form = excluded.dosage_form,
                strength = excluded.strength,
                status = excluded.status,
                marketing_start = excluded.marketing_start,
                marketing_end = excluded.marketing_end,
                updated_at = datetime('now')
            "#,
            params![
                key,
                package.code,
                rxcui,
                package.manufacturer,
                package.package_size,
                package.dosage_form,
                package.strength,
                package.status.as_str(),
                package.marketing_start.map(|d| d.format(DATE_FORMAT).to_string()),
                package.marketing_end.map(|d| d.format(DATE_FORMAT).to_string()),
            ],
        )?;
        Ok(())
    }

    /// Get a package by NDC in any accepted layout.
    pub fn get_package(&self, ndc: &str) -> DbResult<Option<PackageRecord>> {
        let key = Ndc::parse(ndc)?.key();

        let result = self
            .conn
            .query_row(
                &format!("SELECT {PACKAGE_COLUMNS} FROM ndc_packages WHERE ndc_key = ?"),
                [key],
                package_row,
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// All packages for a concept, split by status.
    pub fn packages_for_concept(&self, rxcui: &str) -> DbResult<PackageSet> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM ndc_packages WHERE rxcui = ? ORDER BY ndc_key"
        ))?;
        let rows = stmt.query_map([rxcui], package_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(PackageRecord::try_from(row?)?);
        }
        Ok(PackageSet::from_records(records))
    }

    /// The package for an NDC together with its siblings under the same concept.
    ///
    /// Returns an empty set when the NDC is unknown.
    pub fn packages_for_ndc(&self, ndc: &str) -> DbResult<PackageSet> {
        match self.concept_for_ndc(ndc)? {
            Some(rxcui) => self.packages_for_concept(&rxcui),
            None => Ok(PackageSet::default()),
        }
    }

    /// Concept an NDC belongs to, if the package is known.
    pub fn concept_for_ndc(&self, ndc: &str) -> DbResult<Option<String>> {
        let key = Ndc::parse(ndc)?.key();
        Ok(self
            .conn
            .query_row(
                "SELECT rxcui FROM ndc_packages WHERE ndc_key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Delete a package.
    pub fn delete_package(&self, ndc: &str) -> DbResult<bool> {
        let key = Ndc::parse(ndc)?.key();
        let rows_affected = self
            .conn
            .execute("DELETE FROM ndc_packages WHERE ndc_key = ?", [key])?;
        Ok(rows_affected > 0)
    }
}

fn package_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PackageRow> {
    Ok(PackageRow {
        code: row.get(0)?,
        manufacturer: row.get(1)?,
        package_size: row.get(2)?,
        dosage_form: row.get(3)?,
        strength: row.get(4)?,
        status: row.get(5)?,
        marketing_start: row.get(6)?,
        marketing_end: row.get(7)?,
    })
}

/// Intermediate row struct for database mapping.
struct PackageRow {
    code: String,
    manufacturer: String,
    package_size: u32,
    dosage_form: String,
    strength: String,
    status: String,
    marketing_start: Option<String>,
    marketing_end: Option<String>,
}

impl TryFrom<PackageRow> for PackageRecord {
    type Error = DbError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "active" => PackageStatus::Active,
            "inactive" => PackageStatus::Inactive,
            other => return Err(DbError::InvalidData(format!("package status {other:?}"))),
        };

        Ok(PackageRecord {
            code: row.code,
            manufacturer: row.manufacturer,
            package_size: row.package_size,
            dosage_form: row.dosage_form,
            strength: row.strength,
            status,
            marketing_start: parse_date(row.marketing_start)?,
            marketing_end: parse_date(row.marketing_end)?,
        })
    }
}

fn parse_date(value: Option<String>) -> DbResult<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map_err(|e| DbError::InvalidData(format!("date {s:?}: {e}")))
        })
        .transpose()
}
