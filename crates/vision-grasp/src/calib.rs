//! Hand-eye calibration files (end-effector -> camera).

use crate::{GraspError, Result};
use arm_link::frames::{matrix_from_rows, matrix_to_rows};
use arm_link::Matrix4;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandEyeCalibration {
    pub hand_eye_transformation_matrix: Vec<Vec<f64>>,
}

pub fn parse_hand_eye(yaml: &str) -> Result<Matrix4> {
    let calib: HandEyeCalibration =
        serde_yaml::from_str(yaml).map_err(|e| GraspError::Io(e.to_string()))?;
    Ok(matrix_from_rows(&calib.hand_eye_transformation_matrix)?)
}

pub fn load_hand_eye(path: impl AsRef<Path>) -> Result<Matrix4> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .map_err(|e| GraspError::Io(format!("{}: {e}", path.display())))?;
    parse_hand_eye(&raw)
}

pub fn write_hand_eye(m: &Matrix4, path: impl AsRef<Path>) -> Result<()> {
    let calib = HandEyeCalibration {
        hand_eye_transformation_matrix: matrix_to_rows(m),
    };
    let s = serde_yaml::to_string(&calib).map_err(|e| GraspError::Io(e.to_string()))?;
    fs::write(path.as_ref(), s).map_err(|e| GraspError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_link::TransformError;

    #[test]
    fn parses_nested_matrix() {
        let yaml = "hand_eye_transformation_matrix:\n  - [1.0, 0.0, 0.0, 0.03]\n  - [0.0, 1.0, 0.0, -0.01]\n  - [0.0, 0.0, 1.0, 0.08]\n  - [0.0, 0.0, 0.0, 1.0]\n";
        let m = parse_hand_eye(yaml).unwrap();
        assert!((m[(0, 3)] - 0.03).abs() < 1e-12);
        assert!((m[(2, 3)] - 0.08).abs() < 1e-12);
    }

    #[test]
    fn wrong_shape_is_a_transform_error() {
        let yaml = "hand_eye_transformation_matrix:\n  - [1.0, 0.0, 0.0]\n  - [0.0, 1.0, 0.0]\n  - [0.0, 0.0, 1.0]\n";
        assert!(matches!(
            parse_hand_eye(yaml),
            Err(GraspError::Transform(TransformError::Shape { rows: 3, cols: 3 }))
        ));
    }

    #[test]
    fn missing_key_is_an_io_error() {
        assert!(matches!(
            parse_hand_eye("matrix: []\n"),
            Err(GraspError::Io(_))
        ));
    }

    #[test]
    fn written_file_loads_back() {
        let mut m = Matrix4::identity();
        m[(1, 3)] = 0.042;
        let path = std::env::temp_dir().join(format!("hand_eye_{}.yaml", std::process::id()));
        write_hand_eye(&m, &path).unwrap();
        let back = load_hand_eye(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert!((back - m).amax() < 1e-12);
    }
}
