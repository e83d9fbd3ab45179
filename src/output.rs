use anyhow::{Context, Result};
use growth_common::Snapshot;
use log::{error, info};
use ndarray::{ArrayD, Dimension};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes `snapshots` as `<base>_snapshots.<ext>` in the requested format
/// ("json", "bincode" or "messagepack"; anything else falls back to JSON).
pub fn save_snapshots(snapshots: &[Snapshot], base_filename: &str, format: &str) -> Result<PathBuf> {
    let (extension, format) = match format {
        "json" => ("json", "json"),
        "bincode" => ("bin", "bincode"),
        "messagepack" => ("msgpack", "messagepack"),
        other => {
            error!("Unknown output format: {}. Using JSON instead.", other);
            ("json", "json")
        }
    };
    let filename = PathBuf::from(format!("{}_snapshots.{}", base_filename, extension));
    let file = File::create(&filename)
        .with_context(|| format!("Error creating snapshot file '{}'", filename.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        "bincode" => write_snapshot_stream(&mut writer, snapshots)?,
        "messagepack" => rmp_serde::encode::write(&mut writer, snapshots)
            .context("Error serializing snapshots to MessagePack")?,
        _ => serde_json::to_writer(&mut writer, snapshots).context("Error serializing snapshots to JSON")?,
    }
    writer.flush()?;

    info!("{} snapshots saved to {} ({} format)", snapshots.len(), filename.display(), format);
    Ok(filename)
}

/// Binary stream read by the visualizer: a `u32` count followed by each
/// bincode-encoded snapshot.
pub fn write_snapshot_stream<W: Write>(mut writer: W, snapshots: &[Snapshot]) -> Result<()> {
    let count = u32::try_from(snapshots.len()).context("Too many snapshots for the stream header")?;
    bincode::serialize_into(&mut writer, &count).context("Error writing snapshot count")?;
    for snapshot in snapshots {
        bincode::serialize_into(&mut writer, snapshot).context("Error serializing snapshot to bincode")?;
    }
    Ok(())
}

/// One CSV row per cell: lattice indices, then `phi` and `nutrient`.
pub fn write_final_fields<W: Write>(writer: W, phi: &ArrayD<f64>, nutrient: &ArrayD<f64>) -> Result<()> {
    if phi.shape() != nutrient.shape() {
        anyhow::bail!("phi {:?} and nutrient {:?} shapes differ", phi.shape(), nutrient.shape());
    }
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = ["x", "y", "z"].iter().take(phi.ndim()).map(|s| s.to_string()).collect();
    header.push("phi".to_string());
    header.push("nutrient".to_string());
    csv_writer.write_record(&header)?;

    for ((index, p), n) in phi.indexed_iter().zip(nutrient.iter()) {
        let mut record: Vec<String> = index.slice().iter().map(|i| i.to_string()).collect();
        record.push(format!("{:.6e}", p));
        record.push(format!("{:.6e}", n));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes `<base>_final_fields.csv`.
pub fn save_final_fields(base_filename: &str, phi: &ArrayD<f64>, nutrient: &ArrayD<f64>) -> Result<PathBuf> {
    let filename = PathBuf::from(format!("{}_final_fields.csv", base_filename));
    let file = File::create(&filename)
        .with_context(|| format!("Error creating CSV file '{}'", filename.display()))?;
    write_final_fields(BufWriter::new(file), phi, nutrient)?;
    info!("Final fields saved to {}", filename.display());
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use std::io::Cursor;

    fn snapshot(step: usize) -> Snapshot {
        Snapshot::new(step, step as f64 * 0.01, vec![2], vec![0.0, 1.0], vec![0.5, 0.25])
    }

    #[test]
    fn snapshot_stream_has_count_header() {
        let mut buffer = Vec::new();
        write_snapshot_stream(&mut buffer, &[snapshot(0), snapshot(5)]).unwrap();

        let mut reader = Cursor::new(buffer);
        let count: u32 = bincode::deserialize_from(&mut reader).unwrap();
        assert_eq!(count, 2);
        let first: Snapshot = bincode::deserialize_from(&mut reader).unwrap();
        let second: Snapshot = bincode::deserialize_from(&mut reader).unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(second.step, 5);
        assert_eq!(second.nutrient, vec![0.5, 0.25]);
    }

    #[test]
    fn final_fields_csv_lists_every_cell() {
        let phi = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![0.0, 1.0, 0.5, 0.25]).unwrap();
        let nutrient = ArrayD::from_elem(IxDyn(&[2, 2]), 0.1);
        let mut buffer = Vec::new();
        write_final_fields(&mut buffer, &phi, &nutrient).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "x,y,phi,nutrient");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2], "0,1,1.000000e0,1.000000e-1");
    }

    #[test]
    fn final_fields_reject_shape_mismatch() {
        let phi = ArrayD::zeros(IxDyn(&[2, 2]));
        let nutrient = ArrayD::zeros(IxDyn(&[4]));
        assert!(write_final_fields(Vec::new(), &phi, &nutrient).is_err());
    }
}
