// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use brainconn_structures::{ConnectionTable, ConnectivityError, ConnectivityResult};

const HEADER: [&str; 3] = ["region_a", "region_b", "weight"];

/// Encode the connection table as CSV with header `region_a,region_b,weight`
pub fn connection_table_csv(table: &ConnectionTable) -> ConnectivityResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());

    // Serialized rows carry their own header; an empty table still gets one
    if table.is_empty() {
        writer.write_record(HEADER).map_err(csv_error)?;
    }
    for row in table.rows() {
        writer.serialize(row).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ConnectivityError::Artifact(format!("Failed to flush CSV: {}", e)))
}

fn csv_error(err: csv::Error) -> ConnectivityError {
    ConnectivityError::Artifact(format!("Failed to write CSV: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use brainconn_structures::ConnectivityMatrix;
    use ndarray::array;

    #[test]
    fn test_header_and_quoting() {
        let matrix = ConnectivityMatrix::try_new(array![
            [1.0, 0.25, -0.5],
            [0.25, 1.0, 0.0],
            [-0.5, 0.0, 1.0]
        ])
        .unwrap();
        let names = vec![
            "Left Thalamus".to_string(),
            "Brain-Stem".to_string(),
            "Region, odd".to_string(),
        ];
        let table = ConnectionTable::from_matrix(&matrix, &names).unwrap();
        let text = String::from_utf8(connection_table_csv(&table).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "region_a,region_b,weight");
        assert_eq!(lines[1], "Left Thalamus,Brain-Stem,0.25");
        assert_eq!(lines[2], "Left Thalamus,\"Region, odd\",-0.5");
        assert_eq!(lines[3], "Brain-Stem,\"Region, odd\",0.0");
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let text = String::from_utf8(connection_table_csv(&ConnectionTable::default()).unwrap()).unwrap();
        assert_eq!(text, "region_a,region_b,weight\n");
    }
}
