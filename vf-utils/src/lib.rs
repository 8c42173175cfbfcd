use std::collections::{HashMap, VecDeque};

use bevy::ecs::resource::Resource;
use bevy::prelude::Vec3;
use crossbeam::channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

pub mod lifecycle;
pub use lifecycle::{ConnectionLifecycle, ConnectionStage, LifecycleEvent};

/// Round-trip samples kept per remote player for the tab list average.
pub const PING_WINDOW: usize = 10;

/// Wire-format 3-vector. The server sends plain `{x, y, z}` objects.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WireVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<WireVec3> for Vec3 {
    fn from(v: WireVec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for WireVec3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Survival,
    Creative,
    Camera,
    Spectator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemClass {
    Item,
    Block,
    #[serde(other)]
    Other,
}

/// One toolbar slot. Field names follow the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSlot {
    pub v: i32,
    pub class: ItemClass,
    pub c: i32,
}

impl ItemSlot {
    /// Identity used for change detection: two slots with the same
    /// (value, class, count) triple are the same for visual purposes.
    pub fn same_as(&self, other: &ItemSlot) -> bool {
        self.v == other.v && self.class == other.class && self.c == other.c
    }
}

/// Armor slots as reported by the server. Diffing these is the armor
/// collaborator's job, the reconciler only forwards them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorSnapshot {
    pub helmet: Option<i32>,
    pub chestplate: Option<i32>,
    pub leggings: Option<i32>,
    pub boots: Option<i32>,
}

/// Per-player entry of the server snapshot, one per network tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub pos: WireVec3,
    pub rot: WireVec3,
    pub dir: WireVec3,
    pub vel: WireVec3,
    pub hp: f32,
    #[serde(default)]
    pub hunger: Option<f32>,
    #[serde(default)]
    pub oxygen: Option<f32>,
    pub mode: GameMode,
    pub operator: bool,
    #[serde(rename = "currSlot")]
    pub curr_slot: usize,
    pub toolbar: Vec<Option<ItemSlot>>,
    pub ping: u32,
    pub walking: bool,
    pub sneaking: bool,
    pub punching: bool,
    pub blocking: bool,
    pub fps: f32,
    pub name: String,
    #[serde(default)]
    pub armor: Option<ArmorSnapshot>,
}

/// World-entity update (thrown items, dropped blocks, arrows).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: String,
    pub name: String,
    pub class: ItemClass,
    pub pos: WireVec3,
    pub vel: WireVec3,
    #[serde(rename = "onObject")]
    pub on_object: bool,
    /// Spawn timestamp in milliseconds, phases the bob animation.
    #[serde(rename = "t")]
    pub spawn_ms: f64,
}

/// Static region server directory shown on the server-select screen.
pub const REGION_SERVERS: &[(&str, &str)] = &[
    ("NA East", "na-east.voxelfront.net:6530"),
    ("NA West", "na-west.voxelfront.net:6530"),
    ("EU", "eu.voxelfront.net:6530"),
];

pub enum ToNetMessage {
    Connect { address: String, username: String },
    Join { username: String },
    Disconnect,
    Shutdown,
}

pub enum FromNetMessage {
    Connected,
    ConnectFailed(String),
    Disconnected,
    PlayerJoin(PlayerSnapshot),
    PlayerLeave { id: String },
    PlayerStates(HashMap<String, PlayerSnapshot>),
    EntitySpawn(EntitySnapshot),
    EntityUpdate(EntitySnapshot),
    EntityDespawn { id: String },
    LoadProgress,
    ChunkLoaded,
    ChunkUnloaded,
    ServerMessageText(String),
}

#[derive(Resource)]
pub struct ToNet(pub Sender<ToNetMessage>);

#[derive(Resource)]
pub struct FromNet(pub Receiver<FromNetMessage>);

/// Bounded history of recent round-trip samples.
#[derive(Debug, Clone, Default)]
pub struct PingWindow(VecDeque<u32>);

impl PingWindow {
    pub fn push(&mut self, sample: u32) {
        self.0.push_back(sample);
        while self.0.len() > PING_WINDOW {
            self.0.pop_front();
        }
    }

    /// Average of the retained samples, `None` when no sample has arrived
    /// yet (the tab list renders that as "disc").
    pub fn average(&self) -> Option<u32> {
        if self.0.is_empty() {
            return None;
        }
        let sum: u64 = self.0.iter().map(|s| *s as u64).sum();
        Some((sum / self.0.len() as u64) as u32)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
