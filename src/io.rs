// src/io.rs - CSV input of demonstrations and output of generated trajectories
use std::path::Path;

use csv::{ReaderBuilder, Trim, Writer};
use thiserror::Error;

use crate::dmp::{DemoTrajectory, DmpError, OutputTrajectory};

#[derive(Debug, Error)]
pub enum TrajectoryIoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: u64, message: String },
    #[error("Invalid demonstration: {0}")]
    Demo(#[from] DmpError),
}

/// Read a demonstration from CSV.
///
/// With `sample_interval` every column is a coordinate and rows are spaced by
/// that interval. Without it the first column is the timestamp. A leading
/// non-numeric row is treated as a header; lines starting with `#` are skipped.
pub fn read_demo_csv(
    path: impl AsRef<Path>,
    sample_interval: Option<f64>,
) -> Result<DemoTrajectory, TrajectoryIoError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_path(path)?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(index as u64 + 1);
        let parsed: Result<Vec<f64>, _> = record.iter().map(|field| field.parse::<f64>()).collect();
        match parsed {
            Ok(row) => rows.push(row),
            Err(_) if index == 0 => {
                tracing::debug!("Skipping header row in {}", path.display());
            }
            Err(e) => {
                return Err(TrajectoryIoError::Parse {
                    line,
                    message: e.to_string(),
                });
            }
        }
    }

    let demo = match sample_interval {
        Some(interval) => DemoTrajectory::from_uniform(rows, interval)?,
        None => {
            let mut times = Vec::with_capacity(rows.len());
            let mut positions = Vec::with_capacity(rows.len());
            for (i, mut row) in rows.into_iter().enumerate() {
                if row.len() < 2 {
                    return Err(TrajectoryIoError::Parse {
                        line: i as u64 + 1,
                        message: "expected a time column and at least one coordinate".to_string(),
                    });
                }
                times.push(row.remove(0));
                positions.push(row);
            }
            DemoTrajectory::new(times, positions)?
        }
    };
    tracing::debug!(
        "Read demonstration from {}: {} samples, {} dof",
        path.display(),
        demo.len(),
        demo.dof()
    );
    Ok(demo)
}

/// Header row for a trajectory with `dof` coordinates.
pub fn trajectory_header(dof: usize) -> Vec<String> {
    let mut header = vec!["time".to_string(), "phase".to_string()];
    for prefix in ["pos", "vel", "acc"] {
        header.extend((0..dof).map(|d| format!("{}_{}", prefix, d)));
    }
    header
}

pub fn write_trajectory_csv(
    path: impl AsRef<Path>,
    trajectory: &OutputTrajectory,
) -> Result<(), TrajectoryIoError> {
    let mut wtr = Writer::from_path(path.as_ref())?;
    wtr.write_record(trajectory_header(trajectory.dof()))?;
    for point in trajectory.points() {
        let mut record = Vec::with_capacity(2 + 3 * trajectory.dof());
        record.push(point.time.to_string());
        record.push(point.phase.to_string());
        for series in [&point.position, &point.velocity, &point.acceleration] {
            record.extend(series.iter().map(|v| v.to_string()));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmp::TrajectoryPoint;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_uniform_csv_with_header_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "demo.csv", "x,y\n# recorded by hand\n0.0,0.0\n0.5,0.25\n1.0,1.0\n");
        let demo = read_demo_csv(&path, Some(0.01)).unwrap();
        assert_eq!(demo.len(), 3);
        assert_eq!(demo.dof(), 2);
        assert_eq!(demo.goal(), &[1.0, 1.0]);
        assert!((demo.duration() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_read_timed_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "timed.csv", "0.0, 1.0\n0.2, 2.0\n0.5, 4.0\n");
        let demo = read_demo_csv(&path, None).unwrap();
        assert_eq!(demo.times(), &[0.0, 0.2, 0.5]);
        assert_eq!(demo.dof(), 1);
        assert_eq!(demo.start(), &[1.0]);
    }

    #[test]
    fn test_bad_value_after_first_row_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.csv", "0.0,0.0\n1.0,oops\n");
        assert!(matches!(
            read_demo_csv(&path, Some(0.1)),
            Err(TrajectoryIoError::Parse { .. })
        ));
    }

    #[test]
    fn test_single_row_is_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "short.csv", "1.0,2.0\n");
        assert!(matches!(
            read_demo_csv(&path, Some(0.1)),
            Err(TrajectoryIoError::Demo(DmpError::InsufficientDemonstration(_)))
        ));
    }

    #[test]
    fn test_write_trajectory_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut traj = OutputTrajectory::with_capacity(2, 2);
        for k in 0..2 {
            traj.push(TrajectoryPoint {
                time: k as f64 * 0.5,
                phase: 1.0,
                position: vec![k as f64, 2.0],
                velocity: vec![0.0, 0.0],
                acceleration: vec![0.0, 0.0],
            });
        }
        write_trajectory_csv(&path, &traj).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "time,phase,pos_0,pos_1,vel_0,vel_1,acc_0,acc_1"
        );
        assert_eq!(lines.next().unwrap(), "0,1,0,2,0,0,0,0");
        assert_eq!(lines.next().unwrap(), "0.5,1,1,2,0,0,0,0");
        assert!(lines.next().is_none());
    }
}
