#![warn(missing_docs)]
//! Reading design records and writing ranked results as CSV files.
//!
//! All lengths are stored in millimeters. A design file has a header row with the columns
//! `PrimaryDiameter, SecondaryDiameter, PrimaryR, SecondaryR, PrimaryF, SecondaryF, PrimaryK, SecondaryK,
//! MirrorSeparation, SystemFocalLength`. A result file additionally carries the rank, the score, the metrics of the
//! best secondary position and the row index of the design in its source file.
use std::{fs::File, path::Path};

use csv::{ReaderBuilder, Trim, Writer};
use log::info;
use nalgebra::point;
use serde::{Deserialize, Serialize};

use crate::{
    error::{CassegrainError, CsgResult},
    evaluator::{BatchResult, OpticalConfiguration, StoredMetrics},
    millimeter,
    utils::length_in_mm,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct DesignRecord {
    #[serde(rename = "PrimaryDiameter")]
    primary_diameter: f64,
    #[serde(rename = "SecondaryDiameter")]
    secondary_diameter: f64,
    #[serde(rename = "PrimaryR")]
    primary_radius: f64,
    #[serde(rename = "SecondaryR")]
    secondary_radius: f64,
    #[serde(rename = "PrimaryF")]
    primary_focal_length: f64,
    #[serde(rename = "SecondaryF")]
    secondary_focal_length: f64,
    #[serde(rename = "PrimaryK")]
    primary_conic: f64,
    #[serde(rename = "SecondaryK")]
    secondary_conic: f64,
    #[serde(rename = "MirrorSeparation")]
    mirror_separation: f64,
    #[serde(rename = "SystemFocalLength")]
    system_focal_length: f64,
}
impl DesignRecord {
    fn into_configuration(self, row_index: usize) -> CsgResult<OpticalConfiguration> {
        let values = [
            self.primary_diameter,
            self.secondary_diameter,
            self.primary_radius,
            self.secondary_radius,
            self.primary_focal_length,
            self.secondary_focal_length,
            self.primary_conic,
            self.secondary_conic,
            self.mirror_separation,
            self.system_focal_length,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CassegrainError::Io(format!(
                "row {row_index}: design values must be finite"
            )));
        }
        Ok(OpticalConfiguration {
            primary_diameter: millimeter!(self.primary_diameter),
            secondary_diameter: millimeter!(self.secondary_diameter),
            primary_radius: millimeter!(self.primary_radius),
            secondary_radius: millimeter!(self.secondary_radius),
            primary_focal_length: millimeter!(self.primary_focal_length),
            secondary_focal_length: millimeter!(self.secondary_focal_length),
            primary_conic: self.primary_conic,
            secondary_conic: self.secondary_conic,
            mirror_separation: millimeter!(self.mirror_separation),
            system_focal_length: millimeter!(self.system_focal_length),
            row_index,
            best_alignment: None,
            metrics: None,
        })
    }
}
impl From<&OpticalConfiguration> for DesignRecord {
    fn from(c: &OpticalConfiguration) -> Self {
        Self {
            primary_diameter: length_in_mm(c.primary_diameter),
            secondary_diameter: length_in_mm(c.secondary_diameter),
            primary_radius: length_in_mm(c.primary_radius),
            secondary_radius: length_in_mm(c.secondary_radius),
            primary_focal_length: length_in_mm(c.primary_focal_length),
            secondary_focal_length: length_in_mm(c.secondary_focal_length),
            primary_conic: c.primary_conic,
            secondary_conic: c.secondary_conic,
            mirror_separation: length_in_mm(c.mirror_separation),
            system_focal_length: length_in_mm(c.system_focal_length),
        }
    }
}

// csv cannot (de)serialize flattened structs, so the design columns are repeated here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ResultRecord {
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "Score")]
    score: f64,
    #[serde(rename = "CameraHits")]
    camera_hits: usize,
    #[serde(rename = "HitPercentage")]
    hit_percentage: f64,
    #[serde(rename = "RMSSpotSize")]
    rms_spot_size: f64,
    #[serde(rename = "BestSecondaryX")]
    best_secondary_x: f64,
    #[serde(rename = "BestSecondaryY")]
    best_secondary_y: f64,
    #[serde(rename = "PrimaryDiameter")]
    primary_diameter: f64,
    #[serde(rename = "SecondaryDiameter")]
    secondary_diameter: f64,
    #[serde(rename = "PrimaryR")]
    primary_radius: f64,
    #[serde(rename = "SecondaryR")]
    secondary_radius: f64,
    #[serde(rename = "PrimaryF")]
    primary_focal_length: f64,
    #[serde(rename = "SecondaryF")]
    secondary_focal_length: f64,
    #[serde(rename = "PrimaryK")]
    primary_conic: f64,
    #[serde(rename = "SecondaryK")]
    secondary_conic: f64,
    #[serde(rename = "MirrorSeparation")]
    mirror_separation: f64,
    #[serde(rename = "SystemFocalLength")]
    system_focal_length: f64,
    #[serde(rename = "OriginalRowIndex")]
    original_row_index: usize,
}
impl ResultRecord {
    fn new(rank: usize, result: &BatchResult) -> Self {
        let design = DesignRecord::from(&result.configuration);
        let optimization = &result.optimization;
        Self {
            rank,
            score: result.score,
            camera_hits: optimization.hits,
            hit_percentage: optimization.hit_percentage,
            rms_spot_size: optimization.rms_spot_size,
            best_secondary_x: optimization.best_position.x,
            best_secondary_y: optimization.best_position.y,
            primary_diameter: design.primary_diameter,
            secondary_diameter: design.secondary_diameter,
            primary_radius: design.primary_radius,
            secondary_radius: design.secondary_radius,
            primary_focal_length: design.primary_focal_length,
            secondary_focal_length: design.secondary_focal_length,
            primary_conic: design.primary_conic,
            secondary_conic: design.secondary_conic,
            mirror_separation: design.mirror_separation,
            system_focal_length: design.system_focal_length,
            original_row_index: result.configuration.row_index,
        }
    }
    fn into_configuration(self) -> CsgResult<OpticalConfiguration> {
        let design = DesignRecord {
            primary_diameter: self.primary_diameter,
            secondary_diameter: self.secondary_diameter,
            primary_radius: self.primary_radius,
            secondary_radius: self.secondary_radius,
            primary_focal_length: self.primary_focal_length,
            secondary_focal_length: self.secondary_focal_length,
            primary_conic: self.primary_conic,
            secondary_conic: self.secondary_conic,
            mirror_separation: self.mirror_separation,
            system_focal_length: self.system_focal_length,
        };
        let mut configuration = design.into_configuration(self.original_row_index)?;
        configuration.best_alignment = Some(point![self.best_secondary_x, self.best_secondary_y]);
        configuration.metrics = Some(StoredMetrics {
            score: self.score,
            hits: self.camera_hits,
            hit_percentage: self.hit_percentage,
            rms_spot_size: self.rms_spot_size,
        });
        Ok(configuration)
    }
}

fn open_reader(path: &Path) -> CsgResult<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| {
        CassegrainError::Io(format!("could not open file {}: {e}", path.display()))
    })?;
    Ok(ReaderBuilder::new().trim(Trim::All).from_reader(file))
}

/// Load design records from a CSV file.
///
/// The row index of each returned [`OpticalConfiguration`] is its (zero based) data row in the file.
///
/// # Errors
///
/// This function returns an error if
///  - the file cannot be opened
///  - a row cannot be parsed (missing column, non-numeric value)
///  - a value is not finite
pub fn load_configurations(path: &Path) -> CsgResult<Vec<OpticalConfiguration>> {
    let mut reader = open_reader(path)?;
    let mut configurations = Vec::new();
    for (row_index, record) in reader.deserialize::<DesignRecord>().enumerate() {
        configurations.push(record?.into_configuration(row_index)?);
    }
    info!(
        "loaded {} configurations from {}",
        configurations.len(),
        path.display()
    );
    Ok(configurations)
}

/// Write ranked results to a CSV file.
///
/// The results are expected in rank order. Ranks start at 1.
///
/// # Errors
///
/// This function returns an error if the file cannot be created or written.
pub fn save_results(path: &Path, results: &[BatchResult]) -> CsgResult<()> {
    let mut writer = Writer::from_path(path).map_err(|e| {
        CassegrainError::Io(format!("could not create file {}: {e}", path.display()))
    })?;
    for (idx, result) in results.iter().enumerate() {
        writer.serialize(ResultRecord::new(idx + 1, result))?;
    }
    writer.flush()?;
    info!("saved {} results to {}", results.len(), path.display());
    Ok(())
}

/// Load a result file written by [`save_results`].
///
/// The returned configurations carry their original row index, the stored best secondary position and the stored
/// metrics. They are returned in file order.
///
/// # Errors
///
/// This function returns an error if the file cannot be opened or a row cannot be parsed.
pub fn load_results(path: &Path) -> CsgResult<Vec<OpticalConfiguration>> {
    let mut reader = open_reader(path)?;
    reader
        .deserialize::<ResultRecord>()
        .map(|record| record?.into_configuration())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::optimizer::OptimizationResult;
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const HEADER: &str = "PrimaryDiameter,SecondaryDiameter,PrimaryR,SecondaryR,PrimaryF,SecondaryF,PrimaryK,SecondaryK,MirrorSeparation,SystemFocalLength";

    fn design_file(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file
    }
    #[test]
    fn load() {
        let file = design_file(&[
            "300,100,1600,-600,800,-300,-1,-3.5,450,2000",
            " 250.5, 80, 1400, -500, 700, -250, -1.0, -2.8, 400, 1800",
        ]);
        let configurations = load_configurations(file.path()).unwrap();
        assert_eq!(configurations.len(), 2);
        assert_eq!(configurations[0], OpticalConfiguration::default());
        let second = &configurations[1];
        assert_eq!(second.row_index, 1);
        assert_abs_diff_eq!(length_in_mm(second.primary_diameter), 250.5, epsilon = 1e-9);
        assert_abs_diff_eq!(second.secondary_conic, -2.8);
        assert_abs_diff_eq!(length_in_mm(second.mirror_separation), 400.0, epsilon = 1e-9);
        assert!(second.best_alignment.is_none());
        assert!(second.metrics.is_none());
    }
    #[test]
    fn load_empty() {
        let file = design_file(&[]);
        assert!(load_configurations(file.path()).unwrap().is_empty());
    }
    #[test]
    fn load_invalid() {
        assert_matches!(
            load_configurations(Path::new("./this_file_does_not_exist.csv")),
            Err(CassegrainError::Io(_))
        );
        let file = design_file(&["300,100,1600,-600,800,-300,-1,-3.5,450"]);
        assert_matches!(load_configurations(file.path()), Err(CassegrainError::Io(_)));
        let file = design_file(&["300,100,1600,-600,800,-300,-1,abc,450,2000"]);
        assert_matches!(load_configurations(file.path()), Err(CassegrainError::Io(_)));
        let file = design_file(&["300,100,1600,-600,800,-300,-1,NaN,450,2000"]);
        assert_matches!(load_configurations(file.path()), Err(CassegrainError::Io(_)));
    }
    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        let results = vec![
            BatchResult {
                configuration: OpticalConfiguration {
                    row_index: 7,
                    ..OpticalConfiguration::default()
                },
                optimization: OptimizationResult {
                    best_position: point![232.0, 0.0],
                    hits: 272,
                    hit_percentage: 93.15,
                    rms_spot_size: 0.063,
                    ..OptimizationResult::default()
                },
                score: 9314.937,
            },
            BatchResult {
                configuration: OpticalConfiguration {
                    mirror_separation: millimeter!(350.0),
                    row_index: 2,
                    ..OpticalConfiguration::default()
                },
                optimization: OptimizationResult::default(),
                score: 0.0,
            },
        ];
        save_results(&path, &results).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert!(header.starts_with(
            "Rank,Score,CameraHits,HitPercentage,RMSSpotSize,BestSecondaryX,BestSecondaryY,PrimaryDiameter"
        ));
        assert!(header.ends_with("SystemFocalLength,OriginalRowIndex"));
        assert_eq!(content.lines().count(), 3);
        assert!(content.lines().nth(1).unwrap().starts_with("1,"));

        let restored = load_results(&path).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].row_index, 7);
        assert_eq!(restored[0].best_alignment, Some(point![232.0, 0.0]));
        let metrics = restored[0].metrics.unwrap();
        assert_eq!(metrics.hits, 272);
        assert_abs_diff_eq!(metrics.score, 9314.937);
        assert_abs_diff_eq!(metrics.rms_spot_size, 0.063);
        assert_eq!(restored[1].row_index, 2);
        assert_abs_diff_eq!(length_in_mm(restored[1].mirror_separation), 350.0, epsilon = 1e-9);
        // a result file is a valid design file as well
        let designs = load_configurations(&path).unwrap();
        assert_eq!(designs.len(), 2);
        assert_eq!(designs[0].row_index, 0);
    }
    #[test]
    fn save_invalid_path() {
        assert_matches!(
            save_results(Path::new("./this_dir_does_not_exist/results.csv"), &[]),
            Err(CassegrainError::Io(_))
        );
    }
}
