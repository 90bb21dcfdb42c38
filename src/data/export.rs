use anyhow::{Context, Result};

use super::table::ExportTable;

/// Fixed download name offered in the save dialog.
pub const EXPORT_FILE_NAME: &str = "export_derby.csv";

/// Encode the export table as a UTF-8 CSV byte stream: header row with the
/// projected column names, comma-delimited, no index column.
pub fn to_csv_bytes(export: &ExportTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&export.columns)
        .context("writing CSV header")?;

    for cells in &export.rows {
        let record: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        writer.write_record(&record).context("writing CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV output: {e}"))
}
