use std::collections::{HashMap, VecDeque};

use bevy::prelude::*;
use vf_utils::{GameMode, ItemSlot, PingWindow, PlayerSnapshot};

pub mod animate;
pub mod pivot;
pub mod pose;
pub mod reconcile;
pub mod rig;
pub mod tab;

use pose::RigPose;
use reconcile::VisualUpdateQueue;

/// Accumulated limb swing angles, radians about the lateral axis. Source of
/// truth for the gait hysteresis; the pose transforms carry the same
/// rotation applied incrementally.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwingState {
    pub left_arm: f32,
    pub right_arm: f32,
    pub left_hip: f32,
    pub right_hip: f32,
}

/// Local mutable state for one remote player, merged from server snapshots
/// and animated between them.
#[derive(Debug, Clone)]
pub struct RemotePlayerRecord {
    pub pos: Vec3,
    /// Body euler angles as sent by the server.
    pub rot: Vec3,
    /// Head look angles: x = yaw, y = pitch.
    pub dir: Vec3,
    pub vel: Vec3,
    pub hp: f32,
    /// Health before the most recent drop; the HUD draws fading hearts
    /// between this and `hp`.
    pub last_hp: Option<f32>,
    /// Network tick of the last observed health change.
    pub heart_blink: u64,
    pub hunger: Option<f32>,
    pub oxygen: Option<f32>,
    pub mode: GameMode,
    pub operator: bool,
    pub curr_slot: usize,
    pub toolbar: Vec<Option<ItemSlot>>,
    pub walking: bool,
    pub sneaking: bool,
    pub punching: bool,
    pub blocking: bool,
    pub fps: f32,
    pub name: String,
    pub ping: PingWindow,
    pub visible: bool,
    /// Punching cycle phase, 0..=1. 1 means at rest.
    pub punching_t: f32,
    /// Gait direction toggle; flips at the swing extremes.
    pub extend_body: bool,
    /// Currently mounted hand item, if any.
    pub hand: Option<ItemSlot>,
    pub swing: SwingState,
    pub pose: RigPose,
}

impl RemotePlayerRecord {
    pub fn from_snapshot(snap: &PlayerSnapshot) -> Self {
        let mut pose = RigPose::default();
        pose.root.translation = snap.pos.into();
        pose.skeleton.rotation = Quat::from_rotation_y(snap.rot.y);
        Self {
            pos: snap.pos.into(),
            rot: snap.rot.into(),
            dir: snap.dir.into(),
            vel: snap.vel.into(),
            hp: snap.hp,
            last_hp: None,
            heart_blink: 0,
            hunger: snap.hunger,
            oxygen: snap.oxygen,
            mode: snap.mode,
            operator: snap.operator,
            curr_slot: snap.curr_slot,
            toolbar: snap.toolbar.clone(),
            walking: snap.walking,
            sneaking: snap.sneaking,
            punching: snap.punching,
            blocking: snap.blocking,
            fps: snap.fps,
            name: snap.name.clone(),
            ping: PingWindow::default(),
            visible: snap.hp > 0.0,
            punching_t: 1.0,
            extend_body: false,
            hand: None,
            swing: SwingState::default(),
            pose,
        }
    }
}

#[derive(Resource, Default)]
pub struct RemotePlayers {
    pub records: HashMap<String, RemotePlayerRecord>,
}

/// Server snapshots queued by the message handler, reconciled in order
/// before the animation pass runs for the frame.
#[derive(Resource, Default)]
pub struct PendingSnapshots {
    queue: VecDeque<HashMap<String, PlayerSnapshot>>,
}

impl PendingSnapshots {
    pub fn push(&mut self, snapshot: HashMap<String, PlayerSnapshot>) {
        self.queue.push_back(snapshot);
    }

    pub fn drain(
        &mut self,
    ) -> std::collections::vec_deque::Drain<'_, HashMap<String, PlayerSnapshot>> {
        self.queue.drain(..)
    }
}

/// Network tick counter, stamps damage flashes.
#[derive(Resource, Default)]
pub struct NetTick(pub u64);

pub fn reconcile_players_system(
    mut players: ResMut<RemotePlayers>,
    mut pending: ResMut<PendingSnapshots>,
    mut visuals: ResMut<VisualUpdateQueue>,
    tick: Res<NetTick>,
) {
    for snapshot in pending.drain() {
        reconcile::reconcile(&mut players.records, &snapshot, visuals.as_mut(), tick.0);
    }
}

pub fn animate_players_system(
    mut players: ResMut<RemotePlayers>,
    time: Res<Time>,
    camera_query: Query<&GlobalTransform, With<Camera3d>>,
) {
    let camera_rotation = camera_query
        .single()
        .map(|t| t.to_scale_rotation_translation().1)
        .unwrap_or(Quat::IDENTITY);
    let dt = time.delta_secs();
    for record in players.records.values_mut() {
        animate::animate(record, dt, camera_rotation);
    }
}
