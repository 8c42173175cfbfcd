use std::collections::HashMap;

use bevy::prelude::*;

use crate::players::pose::BLOCK_SCALE;

/// Bot physics runs on a fixed logical timestep, independent of frame rate.
pub const BOT_TICK_SECONDS: f64 = 0.05;
/// Downward acceleration in world units per second squared.
pub const GRAVITY: f32 = -9.81 * BLOCK_SCALE;
/// Distance from a bot's reference position down to its feet, in voxel
/// grid units.
pub const EYE_TO_FEET: f32 = 1.6;

/// Voxel occupancy the bot stepper queries. Coordinates are in voxel grid
/// units and may be fractional; the implementation decides how to sample.
pub trait VoxelSampler {
    fn voxel_at(&self, x: f32, y: f32, z: f32) -> u8;
}

/// 0 and 1 are the reserved empty/special sentinels, 255 is water.
pub fn is_solid(voxel: u8) -> bool {
    voxel > 1 && voxel != 255
}

#[derive(Debug, Clone, Default)]
pub struct BotState {
    pub pos: Vec3,
    pub vel: Vec3,
    pub punching: bool,
}

/// One fixed-timestep integration: gravity, foot probe at the candidate
/// position, vertical clamp on contact. The clamp only zeroes velocity, it
/// never corrects position, so a fast bot can sink a step into the surface
/// before stopping.
pub fn step(bot: &mut BotState, world: &dyn VoxelSampler) {
    let dt = BOT_TICK_SECONDS as f32;

    let mut vel = bot.vel;
    vel.y += GRAVITY * dt;

    let candidate = (bot.pos + vel * dt) / BLOCK_SCALE;
    if is_solid(world.voxel_at(candidate.x, candidate.y - EYE_TO_FEET, candidate.z)) {
        vel.y = 0.0;
    }

    bot.pos += vel * dt;
    bot.vel = vel;
    bot.punching = true;
}

#[derive(Resource, Default)]
pub struct Bots {
    pub by_id: HashMap<String, BotState>,
}

/// Occupancy source for bot collision. The world streamer swaps in a real
/// sampler once chunks arrive; the default sees only air.
#[derive(Resource)]
pub struct WorldVoxels(pub Box<dyn VoxelSampler + Send + Sync>);

impl Default for WorldVoxels {
    fn default() -> Self {
        struct Empty;
        impl VoxelSampler for Empty {
            fn voxel_at(&self, _x: f32, _y: f32, _z: f32) -> u8 {
                0
            }
        }
        Self(Box::new(Empty))
    }
}

pub fn step_bots_system(mut bots: ResMut<Bots>, world: Res<WorldVoxels>) {
    for bot in bots.by_id.values_mut() {
        step(bot, world.0.as_ref());
    }
}
