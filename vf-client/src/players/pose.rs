use bevy::math::EulerRot;
use bevy::prelude::{Quat, Transform, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6, FRAC_PI_8};

/// World units per voxel block. Rig part offsets are expressed in the same
/// scale the server uses for positions.
pub const BLOCK_SCALE: f32 = 16.0;

pub const ARM_SIZE: f32 = 4.8;
pub const LEG_SIZE: f32 = 4.8;
pub const ARM_HEIGHT: f32 = 12.8;

/// Shoulder joint pivot relative to the arm's local origin.
pub const ARM_PIVOT: Vec3 = Vec3::new(0.0, -0.15 * BLOCK_SCALE, 0.0);
/// Hip joint pivot relative to the hip group's local origin.
pub const LEG_PIVOT: Vec3 = Vec3::new(0.0, -0.75 * BLOCK_SCALE, 0.0);

/// Small forward lean applied to both shoulders while sneaking.
pub const SNEAK_SHOULDER_LEAN: f32 = FRAC_PI_8 / 2.0;

pub const NAME_TAG_OFFSET: Vec3 = Vec3::new(0.0, 8.0, 0.0);

/// Local transforms of every rig joint the animator drives. Plain data; a
/// sync system copies these onto the scene-graph entities once per frame,
/// so the animator itself never touches the ECS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigPose {
    pub root: Transform,
    pub skeleton: Transform,
    pub neck: Transform,
    pub head: Transform,
    pub body: Transform,
    pub left_shoulder: Transform,
    pub right_shoulder: Transform,
    pub left_arm: Transform,
    pub right_arm: Transform,
    pub left_hip: Transform,
    pub right_hip: Transform,
    pub left_leg: Transform,
    pub right_leg: Transform,
    pub hand: Transform,
    pub name_tag: Transform,
}

impl Default for RigPose {
    fn default() -> Self {
        let mut pose = Self {
            root: Transform::IDENTITY,
            skeleton: Transform::IDENTITY,
            neck: Transform::IDENTITY,
            head: Transform::IDENTITY,
            body: Transform::IDENTITY,
            left_shoulder: Transform::IDENTITY,
            right_shoulder: Transform::IDENTITY,
            left_arm: Transform::IDENTITY,
            right_arm: Transform::IDENTITY,
            left_hip: Transform::IDENTITY,
            right_hip: Transform::IDENTITY,
            left_leg: Transform::IDENTITY,
            right_leg: Transform::IDENTITY,
            hand: held_item_pose(HeldPose::Tool),
            name_tag: Transform::from_translation(NAME_TAG_OFFSET),
        };
        apply_stance(&mut pose, false);
        pose
    }
}

/// Applies the standing or sneaking pose preset: joint local positions and
/// the body pitch. Limb swing rotations are left alone; the gait owns those.
pub fn apply_stance(pose: &mut RigPose, sneaking: bool) {
    let shift = BLOCK_SCALE / 8.0;
    if sneaking {
        pose.body.rotation = Quat::from_rotation_x(-FRAC_PI_8);
        pose.head.translation = Vec3::ZERO;
        pose.body.translation = Vec3::new(0.0, -BLOCK_SCALE * 0.55, shift);

        let leg_y = -BLOCK_SCALE * 0.45 - BLOCK_SCALE * 0.9 + shift;
        pose.left_leg.translation = Vec3::new(-LEG_SIZE / 2.0, leg_y, shift * 2.0);
        pose.right_leg.translation = Vec3::new(LEG_SIZE / 2.0, leg_y, shift * 2.0);

        pose.left_arm.translation = Vec3::new(-5.45, -BLOCK_SCALE * 0.45 - shift, 0.0);
        pose.right_arm.translation = Vec3::new(-0.55, -BLOCK_SCALE * 0.3 - shift, 0.0);

        pose.left_shoulder.rotation = Quat::from_rotation_x(SNEAK_SHOULDER_LEAN);
    } else {
        pose.body.rotation = Quat::IDENTITY;
        pose.head.translation = Vec3::new(0.0, BLOCK_SCALE * 0.175, 0.0);
        pose.body.translation = Vec3::new(0.0, -BLOCK_SCALE * 0.45, 0.0);

        let leg_y = -BLOCK_SCALE * 0.45 - BLOCK_SCALE * 0.75;
        pose.left_leg.translation = Vec3::new(-LEG_SIZE / 2.0, leg_y, 0.0);
        pose.right_leg.translation = Vec3::new(LEG_SIZE / 2.0, leg_y, 0.0);

        pose.left_arm.translation = Vec3::new(-5.45, -BLOCK_SCALE * 0.45, 0.0);
        pose.right_arm.translation = Vec3::new(-0.55, -BLOCK_SCALE * 0.3, 0.0);

        pose.left_shoulder.rotation = Quat::IDENTITY;
    }
}

/// Which fixed preset the held item mesh takes this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeldPose {
    /// Defensive pose while blocking.
    Blocking,
    /// Eating/drinking style pose for class "item".
    Consumable,
    /// Everything else: tools and blocks.
    Tool,
}

pub fn held_item_pose(kind: HeldPose) -> Transform {
    match kind {
        HeldPose::Blocking => Transform {
            translation: Vec3::new(-4.0, -2.0, -3.0),
            rotation: Quat::from_euler(EulerRot::XYZ, 0.0, -FRAC_PI_8, 0.0),
            ..Transform::IDENTITY
        },
        HeldPose::Consumable => Transform {
            translation: Vec3::new(0.0, -4.0, -8.0),
            rotation: Quat::from_euler(EulerRot::XYZ, -FRAC_PI_2 - FRAC_PI_6, FRAC_PI_2, 0.0),
            ..Transform::IDENTITY
        },
        HeldPose::Tool => Transform {
            translation: Vec3::new(-3.0, -ARM_HEIGHT / 2.0, -ARM_SIZE),
            rotation: Quat::from_euler(EulerRot::XYZ, 0.0, FRAC_PI_4, 0.0),
            ..Transform::IDENTITY
        },
    }
}
