use bevy::prelude::{GlobalTransform, Quat, Transform, Vec3};

/// Space the pivot point is expressed in.
pub enum PivotSpace<'a> {
    /// Pivot is in the object's parent's local space (the common case for
    /// limb joints).
    Parent,
    /// Pivot is in world space; the object's position is converted through
    /// the given parent transform before and after the rotation.
    World(&'a GlobalTransform),
}

/// Rotates a transform's position about an arbitrary pivot point and axis,
/// and rotates its orientation by the same axis/angle. Nothing else on the
/// transform is touched.
pub fn rotate_about_pivot(
    transform: &mut Transform,
    pivot: Vec3,
    axis: Vec3,
    angle: f32,
    space: PivotSpace,
) {
    let rotation = Quat::from_axis_angle(axis.normalize(), angle);
    match space {
        PivotSpace::Parent => {
            transform.translation = rotation * (transform.translation - pivot) + pivot;
        }
        PivotSpace::World(parent) => {
            let world = parent.transform_point(transform.translation);
            let rotated = rotation * (world - pivot) + pivot;
            transform.translation = parent.affine().inverse().transform_point3(rotated);
        }
    }
    // Axis is interpreted in object space for the orientation part, matching
    // a scene-graph rotate-on-axis.
    transform.rotation *= rotation;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn position_orbits_the_pivot() {
        let mut t = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        rotate_about_pivot(&mut t, Vec3::ZERO, Vec3::Y, FRAC_PI_2, PivotSpace::Parent);
        assert!(close(t.translation, Vec3::new(0.0, 0.0, -1.0)));

        // Distance to the pivot is preserved over many steps.
        let pivot = Vec3::new(0.0, -2.4, 0.0);
        let mut t = Transform::from_translation(Vec3::new(0.5, 0.0, 0.0));
        let before = (t.translation - pivot).length();
        for _ in 0..100 {
            rotate_about_pivot(&mut t, pivot, Vec3::X, 0.07, PivotSpace::Parent);
        }
        assert!(((t.translation - pivot).length() - before).abs() < 1e-4);
    }

    #[test]
    fn orientation_accumulates() {
        let mut t = Transform::IDENTITY;
        for _ in 0..4 {
            rotate_about_pivot(&mut t, Vec3::ZERO, Vec3::Y, FRAC_PI_2, PivotSpace::Parent);
        }
        // Four quarter turns come back to identity.
        assert!(t.rotation.angle_between(Quat::IDENTITY) < 1e-4);
    }

    #[test]
    fn zero_angle_is_identity() {
        let mut t = Transform::from_translation(Vec3::new(3.0, 1.0, -2.0));
        let before = t;
        rotate_about_pivot(&mut t, Vec3::new(0.0, -12.0, 0.0), Vec3::X, 0.0, PivotSpace::Parent);
        assert!(close(t.translation, before.translation));
        assert!(t.rotation.angle_between(before.rotation) < 1e-6);
    }

    #[test]
    fn world_pivot_converts_through_parent() {
        // Parent shifted +10 on x; object at local origin sits at world (10, 0, 0).
        let parent = GlobalTransform::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let mut t = Transform::IDENTITY;
        // Rotate half a turn about the world origin: world (10,0,0) -> (-10,0,0),
        // which is local (-20, 0, 0).
        rotate_about_pivot(&mut t, Vec3::ZERO, Vec3::Y, PI, PivotSpace::World(&parent));
        assert!(close(t.translation, Vec3::new(-20.0, 0.0, 0.0)));
    }
}
