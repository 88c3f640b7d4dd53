//! 3D rigid transforms: translation + unit quaternion, the `Rigid3d` type
//! the underlying cartographer engine uses for poses everywhere.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rigid3(Isometry3<f64>);

impl Rigid3 {
    pub fn identity() -> Self {
        Rigid3(Isometry3::identity())
    }

    pub fn new(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Rigid3(Isometry3::from_parts(Translation3::from(translation), rotation))
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    pub fn rotation(&self) -> UnitQuaternion<f64> {
        self.0.rotation
    }

    /// `self * other`, matching `cartographer::transform::Rigid3d`'s
    /// `operator*` composition used to derive the global pose from the
    /// local-to-global transform and the latest local pose.
    pub fn compose(&self, other: &Rigid3) -> Rigid3 {
        Rigid3(self.0 * other.0)
    }

    pub fn is_identity(&self) -> bool {
        *self == Rigid3::identity()
    }
}

impl Default for Rigid3 {
    fn default() -> Self {
        Rigid3::identity()
    }
}
