use bevy::prelude::*;
use bevy::time::Fixed;
use bevy_egui::EguiPrimaryContextPass;
use std::sync::Mutex;

use vf_utils::{ConnectionLifecycle, FromNet, ToNet};

use crate::bot;
use crate::entities;
use crate::message_handler;
use crate::players;
use crate::players::{reconcile::VisualUpdateQueue, rig, tab};

/// Owns the channel endpoints until the app takes them. Bevy plugins are
/// built from `&self`, so single-use resources ride in behind a mutex.
pub struct ClientCorePlugin {
    to_net: Mutex<Option<ToNet>>,
    from_net: Mutex<Option<FromNet>>,
}

impl ClientCorePlugin {
    pub fn new(to_net: ToNet, from_net: FromNet) -> Self {
        Self {
            to_net: Mutex::new(Some(to_net)),
            from_net: Mutex::new(Some(from_net)),
        }
    }
}

impl Plugin for ClientCorePlugin {
    fn build(&self, app: &mut App) {
        let to_net = self
            .to_net
            .lock()
            .expect("ToNet lock poisoned")
            .take()
            .expect("ToNet already consumed");
        let from_net = self
            .from_net
            .lock()
            .expect("FromNet lock poisoned")
            .take()
            .expect("FromNet already consumed");

        app.insert_resource(to_net)
            .insert_resource(from_net)
            .insert_resource(ConnectionLifecycle::default())
            .insert_resource(players::RemotePlayers::default())
            .insert_resource(players::PendingSnapshots::default())
            .insert_resource(players::NetTick::default())
            .insert_resource(VisualUpdateQueue::default())
            .insert_resource(rig::RigRegistry::default())
            .insert_resource(entities::EntityEventQueue::default())
            .insert_resource(entities::RemoteEntities::default())
            .insert_resource(entities::EntityVisualRegistry::default())
            .insert_resource(bot::Bots::default())
            .insert_resource(bot::WorldVoxels::default());
    }
}

pub struct ClientNetPlugin;

impl Plugin for ClientNetPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, message_handler::handle_messages);
    }
}

pub struct ClientPlayerPlugin;

impl Plugin for ClientPlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                players::reconcile_players_system.after(message_handler::handle_messages),
                rig::spawn_player_rigs.after(players::reconcile_players_system),
                rig::despawn_player_rigs.after(rig::spawn_player_rigs),
                rig::apply_visual_updates.after(rig::spawn_player_rigs),
                players::animate_players_system.after(players::reconcile_players_system),
                rig::sync_rig_poses
                    .after(players::animate_players_system)
                    .after(rig::apply_visual_updates),
            ),
        )
        .add_systems(EguiPrimaryContextPass, (tab::draw_player_name_tags, tab::draw_player_tab));
    }
}

pub struct ClientEntityPlugin;

impl Plugin for ClientEntityPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                entities::apply_entity_events.after(message_handler::handle_messages),
                entities::animate_entities_system.after(entities::apply_entity_events),
                entities::sync_entity_visuals.after(entities::animate_entities_system),
            ),
        );
    }
}

pub struct ClientBotPlugin;

impl Plugin for ClientBotPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_seconds(bot::BOT_TICK_SECONDS))
            .add_systems(FixedUpdate, bot::step_bots_system);
    }
}
