use bevy::math::EulerRot;
use bevy::prelude::{Quat, Transform, Vec3};
use std::f32::consts::{FRAC_PI_3, FRAC_PI_6, TAU};
use vf_utils::ItemClass;

use super::RemotePlayerRecord;
use super::pivot::{PivotSpace, rotate_about_pivot};
use super::pose::{ARM_PIVOT, HeldPose, LEG_PIVOT, SNEAK_SHOULDER_LEAN, apply_stance, held_item_pose};

/// Body catches up to the head look, per second.
pub const BODY_FOLLOW_RATE: f32 = 5.0;
/// Body turns into the travel direction while walking, per second.
pub const VELOCITY_FACE_RATE: f32 = 10.0;
/// Orientation dot above which the body stops chasing the head. Stops the
/// rig micro-correcting when already looking roughly where it faces.
pub const FOLLOW_DOT_THRESHOLD: f32 = 0.92;

pub const WALK_SWING_RATE: f32 = 10.0;
pub const SNEAK_SWING_RATE: f32 = 3.0;
pub const WALK_MAX_SWING: f32 = FRAC_PI_3;
pub const SNEAK_MAX_SWING: f32 = FRAC_PI_6;

/// Punch cycle phase advance per second.
pub const PUNCH_PHASE_RATE: f32 = 5.0;

/// Advances one remote player's rig pose by one render frame. Every step is
/// driven only by the record's reconciled fields and `dt`; calling with
/// `dt == 0` after a settled frame changes nothing.
pub fn animate(record: &mut RemotePlayerRecord, dt: f32, camera_rotation: Quat) {
    // Position is authoritative, no smoothing.
    record.pose.root.translation = record.pos;

    // Look pitch goes on the neck; yaw is handled by steering the body.
    record.pose.neck.rotation = Quat::from_rotation_x(record.dir.y);

    let head_yaw = Quat::from_rotation_y(record.dir.x);
    if record.pose.skeleton.rotation.dot(head_yaw).abs() < FOLLOW_DOT_THRESHOLD {
        record.pose.skeleton.rotation = record
            .pose
            .skeleton
            .rotation
            .slerp(head_yaw, (BODY_FOLLOW_RATE * dt).min(1.0));
    }

    if record.walking {
        let horizontal = Vec3::new(record.vel.x, 0.0, record.vel.z);
        if horizontal.length_squared() > 1e-8 {
            let facing = -horizontal.normalize();
            let travel_yaw = Quat::from_rotation_y(facing.x.atan2(facing.z));
            record.pose.skeleton.rotation = record
                .pose
                .skeleton
                .rotation
                .slerp(travel_yaw, (VELOCITY_FACE_RATE * dt).min(1.0));
        }
    }

    apply_stance(&mut record.pose, record.sneaking);

    // Swing rate and amplitude scale with actual horizontal speed, so the
    // limbs go still when the player is pushed against a wall.
    let mut speed_scalar = Vec3::new(record.vel.x, 0.0, record.vel.z)
        .length()
        .clamp(0.0, 1.0);
    if record.sneaking {
        speed_scalar *= 2.0;
    }
    let (swing_rate, max_swing) = if record.sneaking {
        (SNEAK_SWING_RATE, SNEAK_MAX_SWING)
    } else {
        (WALK_SWING_RATE, WALK_MAX_SWING)
    };
    let step = dt * swing_rate * speed_scalar;
    let swing_limit = max_swing * speed_scalar;

    if record.walking {
        if record.swing.left_arm < -swing_limit {
            record.extend_body = false;
        } else if record.swing.left_arm > swing_limit {
            record.extend_body = true;
        }

        let s = if record.extend_body { step } else { -step };
        swing_limb(&mut record.pose.right_arm, ARM_PIVOT, s, &mut record.swing.right_arm);
        swing_limb(&mut record.pose.left_arm, ARM_PIVOT, -s, &mut record.swing.left_arm);
        swing_limb(&mut record.pose.right_hip, LEG_PIVOT, -s, &mut record.swing.right_hip);
        swing_limb(&mut record.pose.left_hip, LEG_PIVOT, s, &mut record.swing.left_hip);
    } else {
        // Full deflection cancels in one frame, not an exponential settle.
        cancel_swing(&mut record.pose.right_arm, ARM_PIVOT, &mut record.swing.right_arm);
        cancel_swing(&mut record.pose.left_arm, ARM_PIVOT, &mut record.swing.left_arm);
        cancel_swing(&mut record.pose.right_hip, LEG_PIVOT, &mut record.swing.right_hip);
        cancel_swing(&mut record.pose.left_hip, LEG_PIVOT, &mut record.swing.left_hip);
    }

    if let Some(hand) = record.hand.as_ref() {
        let kind = if record.blocking {
            HeldPose::Blocking
        } else if hand.class == ItemClass::Item {
            HeldPose::Consumable
        } else {
            HeldPose::Tool
        };
        record.pose.hand = held_item_pose(kind);
    }

    // Punch phase repeats while punching, otherwise finishes the current
    // half-swing and freezes at 1.
    if record.punching {
        record.punching_t += dt * PUNCH_PHASE_RATE;
        if record.punching_t > 1.0 {
            record.punching_t = 0.0;
        }
    } else if record.punching_t < 1.0 {
        record.punching_t = (record.punching_t + dt * PUNCH_PHASE_RATE).min(1.0);
    }

    let phase = record.punching_t * TAU;
    let punch_swing = (-phase.cos() + 1.0) / 2.0;
    let punch_twist = phase.sin() / 2.0;
    let lean = if record.sneaking { SNEAK_SHOULDER_LEAN } else { 0.0 };
    record.pose.right_shoulder.rotation =
        Quat::from_euler(EulerRot::XYZ, lean + punch_swing, 0.0, punch_twist);

    // Name tags always billboard to the camera.
    record.pose.name_tag.rotation = camera_rotation;
}

fn swing_limb(transform: &mut Transform, pivot: Vec3, angle: f32, accumulated: &mut f32) {
    rotate_about_pivot(transform, pivot, Vec3::X, angle, PivotSpace::Parent);
    *accumulated += angle;
}

fn cancel_swing(transform: &mut Transform, pivot: Vec3, accumulated: &mut f32) {
    if *accumulated != 0.0 {
        rotate_about_pivot(transform, pivot, Vec3::X, -*accumulated, PivotSpace::Parent);
        *accumulated = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vf_utils::{GameMode, ItemSlot, PlayerSnapshot, WireVec3};

    fn record() -> RemotePlayerRecord {
        let snap = PlayerSnapshot {
            id: "p1".to_string(),
            pos: WireVec3::default(),
            rot: WireVec3::default(),
            dir: WireVec3::default(),
            vel: WireVec3::default(),
            hp: 20.0,
            hunger: None,
            oxygen: None,
            mode: GameMode::Survival,
            operator: false,
            curr_slot: 0,
            toolbar: vec![None; 9],
            ping: 0,
            walking: false,
            sneaking: false,
            punching: false,
            blocking: false,
            fps: 60.0,
            name: "steve".to_string(),
            armor: None,
        };
        RemotePlayerRecord::from_snapshot(&snap)
    }

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn zero_delta_is_idempotent() {
        let mut r = record();
        r.walking = true;
        r.vel = Vec3::new(1.0, 0.0, 0.0);
        for _ in 0..30 {
            animate(&mut r, DT, Quat::IDENTITY);
        }
        r.walking = false;
        // One frame settles the limbs; after that dt=0 changes nothing.
        animate(&mut r, 0.0, Quat::IDENTITY);
        let settled = r.clone();
        animate(&mut r, 0.0, Quat::IDENTITY);
        assert_eq!(r.pose, settled.pose);
        assert_eq!(r.swing, settled.swing);
        assert_eq!(r.punching_t, settled.punching_t);
    }

    #[test]
    fn gait_arms_are_anti_phase() {
        let mut r = record();
        r.walking = true;
        r.vel = Vec3::new(0.0, 0.0, 1.0);
        for _ in 0..200 {
            animate(&mut r, DT, Quat::IDENTITY);
            assert!(
                (r.swing.right_arm + r.swing.left_arm).abs() < 1e-4,
                "arms must stay equal magnitude, opposite sign"
            );
            // Opposite-side arm and leg swing in phase.
            assert!((r.swing.left_arm - r.swing.right_hip).abs() < 1e-4);
        }
    }

    #[test]
    fn gait_hysteresis_bounds_the_swing() {
        let mut r = record();
        r.walking = true;
        r.vel = Vec3::new(1.0, 0.0, 0.0);
        let mut toggles = 0;
        let mut last_extend = r.extend_body;
        for _ in 0..600 {
            animate(&mut r, DT, Quat::IDENTITY);
            // One frame of overshoot past the threshold is the most the
            // toggle allows.
            assert!(r.swing.left_arm.abs() <= WALK_MAX_SWING + WALK_SWING_RATE * DT + 1e-4);
            if r.extend_body != last_extend {
                toggles += 1;
                last_extend = r.extend_body;
            }
        }
        assert!(toggles >= 2, "swing direction must keep reversing");
    }

    #[test]
    fn stopping_cancels_limb_deflection_in_one_frame() {
        let mut r = record();
        r.walking = true;
        r.vel = Vec3::new(1.0, 0.0, 0.0);
        for _ in 0..20 {
            animate(&mut r, DT, Quat::IDENTITY);
        }
        assert!(r.swing.left_arm != 0.0);
        let hip_home = {
            let mut fresh = record();
            animate(&mut fresh, DT, Quat::IDENTITY);
            fresh.pose.left_hip.translation
        };

        r.walking = false;
        animate(&mut r, DT, Quat::IDENTITY);
        assert_eq!(r.swing, super::super::SwingState::default());
        assert!((r.pose.left_hip.translation - hip_home).length() < 1e-3);
    }

    #[test]
    fn zero_speed_means_zero_swing() {
        let mut r = record();
        r.walking = true;
        r.vel = Vec3::ZERO;
        for _ in 0..60 {
            animate(&mut r, DT, Quat::IDENTITY);
        }
        assert_eq!(r.swing.left_arm, 0.0);
        assert_eq!(r.swing.right_hip, 0.0);
    }

    #[test]
    fn sneaking_halves_the_swing_limit() {
        let mut r = record();
        r.walking = true;
        r.sneaking = true;
        r.vel = Vec3::new(0.4, 0.0, 0.0);
        // Sneak speed scalar doubles: 0.8 of the sneak limit.
        let limit = SNEAK_MAX_SWING * 0.8;
        for _ in 0..600 {
            animate(&mut r, DT, Quat::IDENTITY);
            assert!(r.swing.left_arm.abs() <= limit + SNEAK_SWING_RATE * DT + 1e-4);
        }
    }

    #[test]
    fn punch_phase_wraps_while_punching_and_holds_at_rest() {
        let mut r = record();
        r.punching = true;
        let mut wrapped = false;
        let mut prev = r.punching_t;
        for _ in 0..60 {
            animate(&mut r, DT, Quat::IDENTITY);
            assert!((0.0..=1.0).contains(&r.punching_t));
            if r.punching_t < prev {
                wrapped = true;
            }
            prev = r.punching_t;
        }
        assert!(wrapped, "phase must cycle while punching");

        r.punching = false;
        for _ in 0..60 {
            animate(&mut r, DT, Quat::IDENTITY);
        }
        assert_eq!(r.punching_t, 1.0);
        // Phase 1 maps the shoulder back to rest (plus no sneak lean here).
        let (x, _, z) = r
            .pose
            .right_shoulder
            .rotation
            .to_euler(EulerRot::XYZ);
        assert!(x.abs() < 1e-4);
        assert!(z.abs() < 1e-4);
    }

    #[test]
    fn body_turns_to_face_travel_direction() {
        let mut r = record();
        r.walking = true;
        r.vel = Vec3::new(0.0, 0.0, 1.0);
        for _ in 0..300 {
            animate(&mut r, DT, Quat::IDENTITY);
        }
        // Facing is the negated travel direction.
        let expected = Quat::from_rotation_y((-0.0f32).atan2(-1.0));
        assert!(r.pose.skeleton.rotation.dot(expected).abs() > 0.999);
    }

    #[test]
    fn blocking_overrides_consumable_hand_pose() {
        let mut r = record();
        r.hand = Some(ItemSlot {
            v: 3,
            class: ItemClass::Item,
            c: 1,
        });
        animate(&mut r, DT, Quat::IDENTITY);
        assert_eq!(r.pose.hand, held_item_pose(HeldPose::Consumable));

        r.blocking = true;
        animate(&mut r, DT, Quat::IDENTITY);
        assert_eq!(r.pose.hand, held_item_pose(HeldPose::Blocking));
    }

    #[test]
    fn name_tag_copies_camera_orientation() {
        let mut r = record();
        let cam = Quat::from_rotation_y(1.1) * Quat::from_rotation_x(-0.3);
        animate(&mut r, DT, cam);
        assert_eq!(r.pose.name_tag.rotation, cam);
    }
}
