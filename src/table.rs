use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::expand::OutputRow;
use crate::order::OrderId;

/// Byte order mark, so spreadsheet software picks UTF-8.
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column names. The first, unnamed column is the row index.
const HEADER: [&str; 12] = [
    "",
    "Id_pedido",
    "Data",
    "Item",
    "Quantidade",
    "Valor Unitario",
    "Subtotal",
    "Nome",
    "Filial",
    "Canal",
    "Pagamento",
    "Status",
];

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write the rows as CSV, header first, each row prefixed with its index.
pub fn write_rows(rows: &[OutputRow], writer: impl Write) -> Result<(), csv::Error> {
    #[derive(Serialize)]
    struct Record<'a> {
        index: usize,
        order_id: &'a OrderId,
        date: &'a str,
        item: &'a str,
        quantity: u32,
        unit_price: f64,
        subtotal: f64,
        customer: &'a str,
        account: &'a str,
        channel: &'a str,
        payment_method: &'a str,
        status: &'a str,
    }

    // The header is written by hand so that an empty export still has one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(HEADER)?;
    for (index, row) in rows.iter().enumerate() {
        writer.serialize(Record {
            index,
            order_id: &row.order_id,
            date: &row.date,
            item: &row.item,
            quantity: row.quantity,
            unit_price: row.unit_price,
            subtotal: row.subtotal,
            customer: &row.customer,
            account: &row.account,
            channel: row.channel,
            payment_method: &row.payment_method,
            status: row.status,
        })?;
    }
    Ok(writer.flush()?)
}

/// Replace the file at `path` with the export.
///
/// The data goes to a temporary file next to `path` first and is renamed
/// over it only once fully written, so a failed write leaves any previous
/// file untouched.
pub fn write(rows: &[OutputRow], path: &Path) -> Result<(), TableError> {
    let tmp = temp_path(path);
    let io_err = |source: std::io::Error| TableError::Io {
        path: tmp.clone(),
        source,
    };

    let result = (|| -> Result<(), TableError> {
        let mut out = BufWriter::new(File::create(&tmp).map_err(io_err)?);
        out.write_all(BOM).map_err(io_err)?;
        write_rows(rows, &mut out)?;
        out.into_inner()
            .map_err(|e| io_err(e.into_error()))?
            .sync_all()
            .map_err(io_err)
    })();
    if let Err(e) = result {
        // The temporary file may not even exist; either way it is garbage.
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
