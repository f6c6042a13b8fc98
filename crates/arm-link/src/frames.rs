//! Pose and homogeneous-transform helpers.
//!
//! Euler angles are always extrinsic x-y-z in degrees, i.e. `R = Rz(yaw) * Ry(pitch) * Rx(roll)`.
//! Homogeneous matrices carry translation in metres; `Pose6D` carries millimetres.
//! Frame chains compose left to right: `T(base->camera) = T(base->effector) * T(effector->camera)`.

use crate::Pose6D;
use nalgebra::{Matrix3, Rotation3, Vector4};
use thiserror::Error;

pub type Matrix4 = nalgebra::Matrix4<f64>;

const MM_PER_M: f64 = 1000.0;
const RIGID_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("expected a 4x4 matrix, got {rows}x{cols}")]
    Shape { rows: usize, cols: usize },
    #[error("matrix contains non-finite values")]
    NonFinite,
    #[error("bottom row is not [0, 0, 0, 1]")]
    NotHomogeneous,
    #[error("rotation block is not a proper rotation")]
    NotRigid,
}

/// Rotation matrix for extrinsic x-y-z Euler angles in degrees.
pub fn rotation_from_rpy(rpy_deg: [f64; 3]) -> Matrix3<f64> {
    Rotation3::from_euler_angles(
        rpy_deg[0].to_radians(),
        rpy_deg[1].to_radians(),
        rpy_deg[2].to_radians(),
    )
    .into_inner()
}

pub fn pose_to_matrix(pose: &Pose6D) -> Matrix4 {
    let r = rotation_from_rpy(pose.rpy());
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    m[(0, 3)] = pose.x / MM_PER_M;
    m[(1, 3)] = pose.y / MM_PER_M;
    m[(2, 3)] = pose.z / MM_PER_M;
    m
}

/// Inverse of [`pose_to_matrix`]. Rejects anything that is not a rigid transform.
pub fn matrix_to_pose(m: &Matrix4) -> Result<Pose6D, TransformError> {
    check_rigid(m)?;
    let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let (roll, pitch, yaw) = Rotation3::from_matrix_unchecked(r).euler_angles();
    Ok(Pose6D::new(
        m[(0, 3)] * MM_PER_M,
        m[(1, 3)] * MM_PER_M,
        m[(2, 3)] * MM_PER_M,
        roll.to_degrees(),
        pitch.to_degrees(),
        yaw.to_degrees(),
    ))
}

/// Build a matrix from nested rows, as stored in calibration files.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<Matrix4, TransformError> {
    let cols = rows
        .iter()
        .map(Vec::len)
        .find(|&n| n != 4)
        .or_else(|| rows.first().map(Vec::len))
        .unwrap_or(0);
    if rows.len() != 4 || cols != 4 {
        return Err(TransformError::Shape {
            rows: rows.len(),
            cols,
        });
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let m = Matrix4::from_row_slice(&flat);
    if m.iter().any(|v| !v.is_finite()) {
        return Err(TransformError::NonFinite);
    }
    Ok(m)
}

pub fn matrix_to_rows(m: &Matrix4) -> Vec<Vec<f64>> {
    (0..4)
        .map(|r| (0..4).map(|c| m[(r, c)]).collect())
        .collect()
}

/// `a * b`: apply `b` first, then `a`.
pub fn compose(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    a * b
}

pub fn transform_point(m: &Matrix4, p: [f64; 3]) -> [f64; 3] {
    let h = m * Vector4::new(p[0], p[1], p[2], 1.0);
    [h[0], h[1], h[2]]
}

pub fn check_rigid(m: &Matrix4) -> Result<(), TransformError> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(TransformError::NonFinite);
    }
    let bottom = [m[(3, 0)], m[(3, 1)], m[(3, 2)], m[(3, 3)]];
    let expected = [0.0, 0.0, 0.0, 1.0];
    if bottom
        .iter()
        .zip(expected.iter())
        .any(|(a, b)| (a - b).abs() > RIGID_TOLERANCE)
    {
        return Err(TransformError::NotHomogeneous);
    }
    let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let ortho = (r.transpose() * r - Matrix3::identity()).amax();
    if ortho > RIGID_TOLERANCE || (r.determinant() - 1.0).abs() > RIGID_TOLERANCE {
        return Err(TransformError::NotRigid);
    }
    Ok(())
}
