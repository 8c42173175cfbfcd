use std::collections::{HashMap, VecDeque};

use bevy::prelude::*;
use vf_utils::{EntitySnapshot, ItemClass};

/// Entity kinds that always orient toward the local player.
const THROWN_KINDS: &[&str] = &["ender_pearl", "fireball", "snowball", "egg"];

/// Resting bob for dropped items: amplitude in world units, full cycle per
/// two seconds, offset so the part sits at or below its rest height.
const BOB_PHASE_OFFSET_MS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Faces the local player every frame, no smoothing.
    Thrown,
    /// Orientation chases the velocity direction.
    Arrow,
    /// Spins about +Y and bobs while resting.
    Generic,
}

pub fn classify(name: &str) -> EntityKind {
    if THROWN_KINDS.contains(&name) {
        EntityKind::Thrown
    } else if name == "arrow" {
        EntityKind::Arrow
    } else {
        EntityKind::Generic
    }
}

/// Local animation state for one world entity between server updates.
#[derive(Debug, Clone)]
pub struct RemoteEntityRecord {
    pub name: String,
    pub class: ItemClass,
    pub kind: EntityKind,
    pub target_pos: Vec3,
    pub rendered_pos: Vec3,
    pub vel: Vec3,
    pub on_object: bool,
    pub spawn_ms: f64,
    pub orientation: Quat,
    /// Accumulated spin angle for generic entities.
    pub spin: f32,
    pub primary_offset: Vec3,
    pub secondary_offset: Vec3,
}

impl RemoteEntityRecord {
    pub fn from_snapshot(snap: &EntitySnapshot) -> Self {
        let pos = Vec3::from(snap.pos);
        Self {
            name: snap.name.clone(),
            class: snap.class,
            kind: classify(&snap.name),
            target_pos: pos,
            // First spawn renders in place; only later updates are smoothed.
            rendered_pos: pos,
            vel: snap.vel.into(),
            on_object: snap.on_object,
            spawn_ms: snap.spawn_ms,
            orientation: Quat::IDENTITY,
            spin: 0.0,
            primary_offset: Vec3::ZERO,
            secondary_offset: Vec3::ZERO,
        }
    }

    pub fn apply_update(&mut self, snap: &EntitySnapshot) {
        self.target_pos = snap.pos.into();
        self.vel = snap.vel.into();
        self.on_object = snap.on_object;
    }
}

/// Advances one entity's animation by one frame. `now_ms` is wall-clock
/// milliseconds, matched against the server spawn timestamp for bob phase.
pub fn animate_entity(record: &mut RemoteEntityRecord, dt: f32, now_ms: f64, player_pos: Vec3) {
    match record.kind {
        EntityKind::Thrown => {
            let to_player = player_pos - record.rendered_pos;
            if to_player.length_squared() > 1e-8 {
                record.orientation =
                    Transform::IDENTITY.looking_at(to_player, Vec3::Y).rotation;
            }
        }
        EntityKind::Generic => {
            record.spin += dt;
            record.orientation = Quat::from_rotation_y(record.spin);

            if record.on_object {
                let phase =
                    (now_ms - record.spawn_ms + BOB_PHASE_OFFSET_MS) / 1000.0 * std::f64::consts::PI;
                let bob = (phase.sin() * 2.0 - 2.0) as f32;
                let target = match record.class {
                    ItemClass::Block => Vec3::new(-2.0, 2.0 + bob, -2.0),
                    _ => Vec3::new(0.0, bob, 0.0),
                };
                record.secondary_offset = record
                    .secondary_offset
                    .lerp(target, (dt * 10.0).min(1.0));
                record.primary_offset = Vec3::new(0.0, record.secondary_offset.y, 0.0);
            } else {
                record.secondary_offset.y = 0.0;
            }
        }
        EntityKind::Arrow => {
            if record.vel.length_squared() > 1e-8 {
                let heading = Transform::IDENTITY
                    .looking_to(record.vel.normalize(), Vec3::Y)
                    .rotation;
                record.orientation = record.orientation.slerp(heading, dt.min(1.0));
            }
        }
    }

    record.rendered_pos = record
        .rendered_pos
        .lerp(record.target_pos, (dt * 10.0).min(1.0));
}

#[derive(Debug)]
pub enum EntityEvent {
    Spawn(EntitySnapshot),
    Update(EntitySnapshot),
    Despawn { id: String },
    /// Connection teardown: every record and visual goes away at once.
    Clear,
}

#[derive(Resource, Default)]
pub struct EntityEventQueue {
    events: VecDeque<EntityEvent>,
}

impl EntityEventQueue {
    pub fn push(&mut self, event: EntityEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, EntityEvent> {
        self.events.drain(..)
    }
}

#[derive(Resource, Default)]
pub struct RemoteEntities {
    pub records: HashMap<String, RemoteEntityRecord>,
}

/// Scene handles per entity id: a root plus the two parts the bob drives.
pub struct EntityVisual {
    pub root: Entity,
    pub primary: Entity,
    pub secondary: Entity,
}

#[derive(Resource, Default)]
pub struct EntityVisualRegistry {
    pub by_id: HashMap<String, EntityVisual>,
}

pub fn apply_entity_events(
    mut commands: Commands,
    mut queue: ResMut<EntityEventQueue>,
    mut entities: ResMut<RemoteEntities>,
    mut registry: ResMut<EntityVisualRegistry>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for event in queue.drain() {
        match event {
            EntityEvent::Spawn(snap) => {
                let record = RemoteEntityRecord::from_snapshot(&snap);
                let visual = spawn_entity_visual(
                    &mut commands,
                    meshes.as_mut(),
                    materials.as_mut(),
                    &snap.id,
                    &record,
                );
                registry.by_id.insert(snap.id.clone(), visual);
                entities.records.insert(snap.id, record);
            }
            EntityEvent::Update(snap) => {
                if let Some(record) = entities.records.get_mut(&snap.id) {
                    record.apply_update(&snap);
                }
            }
            EntityEvent::Despawn { id } => {
                entities.records.remove(&id);
                if let Some(visual) = registry.by_id.remove(&id) {
                    commands.entity(visual.root).despawn();
                }
            }
            EntityEvent::Clear => {
                entities.records.clear();
                for (_, visual) in registry.by_id.drain() {
                    commands.entity(visual.root).despawn();
                }
            }
        }
    }
}

pub fn animate_entities_system(
    mut entities: ResMut<RemoteEntities>,
    time: Res<Time>,
    camera_query: Query<&GlobalTransform, With<Camera3d>>,
) {
    let player_pos = camera_query
        .single()
        .map(|t| t.translation())
        .unwrap_or(Vec3::ZERO);
    let dt = time.delta_secs();
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0);
    for record in entities.records.values_mut() {
        animate_entity(record, dt, now_ms, player_pos);
    }
}

pub fn sync_entity_visuals(
    entities: Res<RemoteEntities>,
    registry: Res<EntityVisualRegistry>,
    mut transforms: Query<&mut Transform>,
) {
    for (id, record) in entities.records.iter() {
        let Some(visual) = registry.by_id.get(id) else {
            continue;
        };
        if let Ok(mut transform) = transforms.get_mut(visual.root) {
            transform.translation = record.rendered_pos;
            transform.rotation = record.orientation;
        }
        if let Ok(mut transform) = transforms.get_mut(visual.primary) {
            transform.translation = record.primary_offset;
        }
        if let Ok(mut transform) = transforms.get_mut(visual.secondary) {
            transform.translation = record.secondary_offset;
        }
    }
}

fn spawn_entity_visual(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    id: &str,
    record: &RemoteEntityRecord,
) -> EntityVisual {
    let size = match record.class {
        ItemClass::Block => 4.0,
        _ => 2.0,
    };
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.8, 0.8, 0.8),
        perceptual_roughness: 0.95,
        metallic: 0.0,
        ..Default::default()
    });

    let root = commands
        .spawn((
            Name::new(format!("WorldEntity[{id}]")),
            Transform::from_translation(record.rendered_pos),
            GlobalTransform::default(),
            Visibility::Visible,
            InheritedVisibility::default(),
            ViewVisibility::default(),
        ))
        .id();

    let primary = commands
        .spawn((
            Name::new(format!("WorldEntityPrimary[{id}]")),
            Mesh3d(meshes.add(Mesh::from(Cuboid::new(size, size, size)))),
            MeshMaterial3d(material.clone()),
            Transform::IDENTITY,
            GlobalTransform::default(),
            Visibility::Inherited,
            InheritedVisibility::default(),
            ViewVisibility::default(),
        ))
        .id();
    let secondary = commands
        .spawn((
            Name::new(format!("WorldEntitySecondary[{id}]")),
            Mesh3d(meshes.add(Mesh::from(Cuboid::new(size * 0.5, size * 0.5, size * 0.5)))),
            MeshMaterial3d(material),
            Transform::IDENTITY,
            GlobalTransform::default(),
            Visibility::Inherited,
            InheritedVisibility::default(),
            ViewVisibility::default(),
        ))
        .id();
    commands.entity(root).add_child(primary);
    commands.entity(root).add_child(secondary);

    EntityVisual {
        root,
        primary,
        secondary,
    }
}
