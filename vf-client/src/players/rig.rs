use std::collections::HashMap;

use bevy::prelude::*;
use vf_utils::{ArmorSnapshot, GameMode, ItemClass};

use super::RemotePlayers;
use super::pose::{ARM_HEIGHT, ARM_SIZE, LEG_SIZE, NAME_TAG_OFFSET, RigPose};
use super::reconcile::{VisualUpdate, VisualUpdateQueue};

const HEAD_SIZE: f32 = 8.0;
const BODY_WIDTH: f32 = 8.0;
const BODY_HEIGHT: f32 = 12.0;
const BODY_DEPTH: f32 = 4.0;

const SKIN_COLOR: Color = Color::srgb(0.85, 0.72, 0.58);
const SHIRT_COLOR: Color = Color::srgb(0.25, 0.55, 0.85);
const PANTS_COLOR: Color = Color::srgb(0.25, 0.28, 0.45);
const ARMORED_COLOR: Color = Color::srgb(0.65, 0.68, 0.72);

/// Scene-graph handles for one remote player's biped rig. Populated once at
/// spawn; the pose sync system only writes transforms through these.
pub struct RigEntities {
    pub root: Entity,
    pub skeleton: Entity,
    pub neck: Entity,
    pub head: Entity,
    pub body: Entity,
    pub left_shoulder: Entity,
    pub right_shoulder: Entity,
    pub left_arm: Entity,
    pub right_arm: Entity,
    pub left_hip: Entity,
    pub right_hip: Entity,
    pub left_leg: Entity,
    pub right_leg: Entity,
    pub hand_mount: Entity,
    pub hand: Option<Entity>,
    pub name_tag: Entity,
    pub body_material: Handle<StandardMaterial>,
    pub hidden_by_mode: bool,
}

#[derive(Resource, Default)]
pub struct RigRegistry {
    pub by_player_id: HashMap<String, RigEntities>,
}

/// Floating label state read by the overlay painter. Text and color only
/// change through visual updates, never per frame.
#[derive(Component, Debug, Clone)]
pub struct NameTagText {
    pub text: String,
    pub color: Color,
}

pub fn spawn_player_rigs(
    mut commands: Commands,
    players: Res<RemotePlayers>,
    mut registry: ResMut<RigRegistry>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (id, record) in players.records.iter() {
        if registry.by_player_id.contains_key(id) {
            continue;
        }
        let rig = build_rig(
            &mut commands,
            meshes.as_mut(),
            materials.as_mut(),
            id,
            &record.name,
            &record.pose,
        );
        registry.by_player_id.insert(id.clone(), rig);
    }
}

pub fn despawn_player_rigs(
    mut commands: Commands,
    players: Res<RemotePlayers>,
    mut registry: ResMut<RigRegistry>,
) {
    registry.by_player_id.retain(|id, rig| {
        if players.records.contains_key(id) {
            return true;
        }
        commands.entity(rig.root).despawn();
        false
    });
}

/// Copies the animated pose onto the scene graph, one write per joint.
pub fn sync_rig_poses(
    players: Res<RemotePlayers>,
    registry: Res<RigRegistry>,
    mut transforms: Query<&mut Transform>,
    mut visibilities: Query<&mut Visibility>,
) {
    for (id, record) in players.records.iter() {
        let Some(rig) = registry.by_player_id.get(id) else {
            continue;
        };
        let pose = &record.pose;
        for (entity, transform) in [
            (rig.root, &pose.root),
            (rig.skeleton, &pose.skeleton),
            (rig.neck, &pose.neck),
            (rig.head, &pose.head),
            (rig.body, &pose.body),
            (rig.left_shoulder, &pose.left_shoulder),
            (rig.right_shoulder, &pose.right_shoulder),
            (rig.left_arm, &pose.left_arm),
            (rig.right_arm, &pose.right_arm),
            (rig.left_hip, &pose.left_hip),
            (rig.right_hip, &pose.right_hip),
            (rig.left_leg, &pose.left_leg),
            (rig.right_leg, &pose.right_leg),
            (rig.hand_mount, &pose.hand),
            (rig.name_tag, &pose.name_tag),
        ] {
            if let Ok(mut target) = transforms.get_mut(entity) {
                *target = *transform;
            }
        }
        if let Ok(mut visibility) = visibilities.get_mut(rig.root) {
            *visibility = if record.visible && !rig.hidden_by_mode {
                Visibility::Visible
            } else {
                Visibility::Hidden
            };
        }
    }
}

/// Drains the reconciler's queued side effects into the scene graph.
pub fn apply_visual_updates(
    mut commands: Commands,
    mut queue: ResMut<VisualUpdateQueue>,
    mut registry: ResMut<RigRegistry>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut name_tags: Query<&mut NameTagText>,
) {
    for update in queue.drain() {
        match update {
            VisualUpdate::Armor { id, armor } => {
                if let Some(rig) = registry.by_player_id.get(&id) {
                    if let Some(material) = materials.get_mut(&rig.body_material) {
                        material.base_color = if has_chest_armor(armor.as_ref()) {
                            ARMORED_COLOR
                        } else {
                            SHIRT_COLOR
                        };
                    }
                }
            }
            VisualUpdate::NameTag {
                id,
                text,
                operator,
                ..
            } => {
                if let Some(rig) = registry.by_player_id.get(&id) {
                    if let Ok(mut tag) = name_tags.get_mut(rig.name_tag) {
                        tag.text = text;
                        tag.color = name_tag_color(operator);
                    }
                }
            }
            VisualUpdate::Gamemode { id, mode } => {
                if let Some(rig) = registry.by_player_id.get_mut(&id) {
                    rig.hidden_by_mode =
                        matches!(mode, GameMode::Spectator | GameMode::Camera);
                }
            }
            VisualUpdate::DetachHand { id } => {
                if let Some(rig) = registry.by_player_id.get_mut(&id) {
                    if let Some(hand) = rig.hand.take() {
                        commands.entity(hand).despawn();
                    }
                }
            }
            VisualUpdate::MountHand { id, slot } => {
                if let Some(rig) = registry.by_player_id.get_mut(&id) {
                    if let Some(old) = rig.hand.take() {
                        commands.entity(old).despawn();
                    }
                    let mesh = meshes.add(hand_mesh(slot.class));
                    let material = materials.add(StandardMaterial {
                        base_color: hand_color(slot.v),
                        perceptual_roughness: 0.95,
                        metallic: 0.0,
                        ..Default::default()
                    });
                    let hand = commands
                        .spawn((
                            Name::new(format!("PlayerHand[{id}]")),
                            Mesh3d(mesh),
                            MeshMaterial3d(material),
                            Transform::IDENTITY,
                            GlobalTransform::default(),
                            Visibility::Inherited,
                            InheritedVisibility::default(),
                            ViewVisibility::default(),
                        ))
                        .id();
                    commands.entity(rig.hand_mount).add_child(hand);
                    rig.hand = Some(hand);
                }
            }
        }
    }
}

fn has_chest_armor(armor: Option<&ArmorSnapshot>) -> bool {
    armor.is_some_and(|a| a.chestplate.is_some())
}

fn name_tag_color(operator: bool) -> Color {
    if operator {
        Color::srgb(1.0, 0.75, 0.2)
    } else {
        Color::WHITE
    }
}

fn hand_mesh(class: ItemClass) -> Mesh {
    match class {
        ItemClass::Block => Mesh::from(Cuboid::new(ARM_SIZE, ARM_SIZE, ARM_SIZE)),
        _ => Mesh::from(Cuboid::new(1.2, ARM_HEIGHT * 0.6, 1.2)),
    }
}

fn hand_color(item_value: i32) -> Color {
    // Stable per-item tint until textured items land.
    let hue = (item_value as f32 * 47.0) % 360.0;
    Color::hsl(hue, 0.5, 0.55)
}

fn build_rig(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    id: &str,
    name: &str,
    pose: &RigPose,
) -> RigEntities {
    let skin = materials.add(StandardMaterial {
        base_color: SKIN_COLOR,
        perceptual_roughness: 0.95,
        metallic: 0.0,
        ..Default::default()
    });
    let shirt = materials.add(StandardMaterial {
        base_color: SHIRT_COLOR,
        perceptual_roughness: 0.95,
        metallic: 0.0,
        ..Default::default()
    });
    let pants = materials.add(StandardMaterial {
        base_color: PANTS_COLOR,
        perceptual_roughness: 0.95,
        metallic: 0.0,
        ..Default::default()
    });

    let root = spawn_joint(commands, format!("PlayerRig[{id}]"), pose.root);
    let skeleton = spawn_joint(commands, format!("PlayerSkeleton[{id}]"), pose.skeleton);
    commands.entity(root).add_child(skeleton);

    let neck = spawn_joint(commands, format!("PlayerNeck[{id}]"), pose.neck);
    commands.entity(skeleton).add_child(neck);
    let head = spawn_part(
        commands,
        meshes,
        skin.clone(),
        format!("PlayerHead[{id}]"),
        pose.head,
        Cuboid::new(HEAD_SIZE, HEAD_SIZE, HEAD_SIZE),
    );
    commands.entity(neck).add_child(head);

    let body = spawn_part(
        commands,
        meshes,
        shirt.clone(),
        format!("PlayerBody[{id}]"),
        pose.body,
        Cuboid::new(BODY_WIDTH, BODY_HEIGHT, BODY_DEPTH),
    );
    commands.entity(skeleton).add_child(body);

    let left_shoulder = spawn_joint(commands, format!("PlayerLShoulder[{id}]"), pose.left_shoulder);
    let right_shoulder =
        spawn_joint(commands, format!("PlayerRShoulder[{id}]"), pose.right_shoulder);
    commands.entity(skeleton).add_child(left_shoulder);
    commands.entity(skeleton).add_child(right_shoulder);

    let left_arm = spawn_part(
        commands,
        meshes,
        skin.clone(),
        format!("PlayerLArm[{id}]"),
        pose.left_arm,
        Cuboid::new(ARM_SIZE, ARM_HEIGHT, ARM_SIZE),
    );
    let right_arm = spawn_part(
        commands,
        meshes,
        skin,
        format!("PlayerRArm[{id}]"),
        pose.right_arm,
        Cuboid::new(ARM_SIZE, ARM_HEIGHT, ARM_SIZE),
    );
    commands.entity(left_shoulder).add_child(left_arm);
    commands.entity(right_shoulder).add_child(right_arm);

    let hand_mount = spawn_joint(commands, format!("PlayerHandMount[{id}]"), pose.hand);
    commands.entity(right_arm).add_child(hand_mount);

    let left_hip = spawn_joint(commands, format!("PlayerLHip[{id}]"), pose.left_hip);
    let right_hip = spawn_joint(commands, format!("PlayerRHip[{id}]"), pose.right_hip);
    commands.entity(skeleton).add_child(left_hip);
    commands.entity(skeleton).add_child(right_hip);

    let left_leg = spawn_part(
        commands,
        meshes,
        pants.clone(),
        format!("PlayerLLeg[{id}]"),
        pose.left_leg,
        Cuboid::new(LEG_SIZE, ARM_HEIGHT, LEG_SIZE),
    );
    let right_leg = spawn_part(
        commands,
        meshes,
        pants,
        format!("PlayerRLeg[{id}]"),
        pose.right_leg,
        Cuboid::new(LEG_SIZE, ARM_HEIGHT, LEG_SIZE),
    );
    commands.entity(left_hip).add_child(left_leg);
    commands.entity(right_hip).add_child(right_leg);

    let name_tag = commands
        .spawn((
            Name::new(format!("PlayerNameTag[{id}]")),
            NameTagText {
                text: name.to_string(),
                color: Color::WHITE,
            },
            Transform::from_translation(NAME_TAG_OFFSET),
            GlobalTransform::default(),
            Visibility::Inherited,
            InheritedVisibility::default(),
            ViewVisibility::default(),
        ))
        .id();
    commands.entity(root).add_child(name_tag);

    RigEntities {
        root,
        skeleton,
        neck,
        head,
        body,
        left_shoulder,
        right_shoulder,
        left_arm,
        right_arm,
        left_hip,
        right_hip,
        left_leg,
        right_leg,
        hand_mount,
        hand: None,
        name_tag,
        body_material: shirt,
        hidden_by_mode: false,
    }
}

fn spawn_joint(commands: &mut Commands, name: String, transform: Transform) -> Entity {
    commands
        .spawn((
            Name::new(name),
            transform,
            GlobalTransform::default(),
            Visibility::Inherited,
            InheritedVisibility::default(),
            ViewVisibility::default(),
        ))
        .id()
}

fn spawn_part(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: Handle<StandardMaterial>,
    name: String,
    transform: Transform,
    shape: Cuboid,
) -> Entity {
    commands
        .spawn((
            Name::new(name),
            Mesh3d(meshes.add(Mesh::from(shape))),
            MeshMaterial3d(material),
            transform,
            GlobalTransform::default(),
            Visibility::Inherited,
            InheritedVisibility::default(),
            ViewVisibility::default(),
        ))
        .id()
}
