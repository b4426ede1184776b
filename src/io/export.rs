//! CSV export for stored device consumption history.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;
use crate::store::{DeviceId, DeviceStore};

/// Column header for consumption export.
const HEADER: &str = "device_id,timestamp,power_w,energy_kwh,powered_on";

/// Exports the consumption history of the given devices to a CSV file.
///
/// # Arguments
///
/// * `store` - Store holding the history
/// * `ids` - Devices to export, written in the given order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns `SimError::Export` if file creation or writing fails, or
/// `SimError::Store` if a history cannot be read.
pub fn export_consumption_csv(
    store: &dyn DeviceStore,
    ids: &[DeviceId],
    path: &Path,
) -> Result<()> {
    let file = File::create(path).map_err(csv::Error::from)?;
    write_consumption_csv(store, ids, io::BufWriter::new(file))
}

/// Writes consumption history as CSV to any writer.
///
/// One row per stored record, oldest first within each device. Timestamps
/// are RFC 3339 in UTC.
///
/// # Errors
///
/// Returns `SimError::Export` if writing fails, or `SimError::Store` if a
/// history cannot be read.
pub fn write_consumption_csv(
    store: &dyn DeviceStore,
    ids: &[DeviceId],
    writer: impl Write,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(','))?;

    for id in ids {
        for r in store.consumption_history(id)? {
            wtr.write_record(&[
                id.to_string(),
                r.timestamp.to_rfc3339(),
                format!("{:.3}", r.power_w),
                format!("{:.6}", r.energy_kwh),
                r.powered_on.to_string(),
            ])?;
        }
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}
