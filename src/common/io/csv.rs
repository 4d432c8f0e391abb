//! CSV writing operations.

use std::path::Path;

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::CsvWriter};

use crate::common::write_artifact;

/// Write a DataFrame to CSV bytes.
pub(crate) fn write_csv_bytes(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    CsvWriter::new(&mut out)
        .finish(df)
        .context("[io::csv] Failed to write CSV to bytes")?;
    Ok(out)
}

/// Write a DataFrame to a CSV artifact (atomically).
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let bytes = write_csv_bytes(df)?;
    write_artifact(path, &bytes)
}

#[cfg(test)]
mod tests {
    use polars::prelude::{Column, DataFrame};

    use super::*;

    #[test]
    fn csv_has_header_and_rows() {
        let mut df = DataFrame::new(vec![
            Column::new("cell_id".into(), vec!["a", "b"]),
            Column::new("rank".into(), vec![1u32, 2]),
        ]).unwrap();
        let text = String::from_utf8(write_csv_bytes(&mut df).unwrap()).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines, vec!["cell_id,rank", "a,1", "b,2"]);
    }
}
