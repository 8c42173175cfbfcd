use bevy::prelude::*;
use tracing::info;
use vf_ui::MenuUiState;
use vf_utils::{
    ConnectionLifecycle, FromNet, FromNetMessage, LifecycleEvent, PlayerSnapshot, ToNet,
    ToNetMessage,
};

use crate::bot::Bots;
use crate::entities::{EntityEvent, EntityEventQueue};
use crate::players::reconcile::{PlayerVisuals, VisualUpdateQueue};
use crate::players::{NetTick, PendingSnapshots, RemotePlayerRecord, RemotePlayers};

/// Drains the network channel and routes each message: snapshots to the
/// reconciler queue, entity events to the entity queue, lifecycle signals to
/// the state machine. Runs before reconciliation each frame.
pub fn handle_messages(
    from_net: Res<FromNet>,
    to_net: Res<ToNet>,
    mut lifecycle: ResMut<ConnectionLifecycle>,
    mut menu: ResMut<MenuUiState>,
    mut players: ResMut<RemotePlayers>,
    mut pending: ResMut<PendingSnapshots>,
    mut tick: ResMut<NetTick>,
    mut entity_events: ResMut<EntityEventQueue>,
    mut visuals: ResMut<VisualUpdateQueue>,
    mut bots: ResMut<Bots>,
) {
    while let Ok(msg) = from_net.0.try_recv() {
        match msg {
            FromNetMessage::Connected => {
                info!("Socket connected");
                lifecycle.advance(LifecycleEvent::SocketConnected);
            }
            FromNetMessage::ConnectFailed(reason) => {
                info!("Connect failed: {}", reason);
                menu.status = format!("Could not connect: {reason}");
                lifecycle.advance(LifecycleEvent::SocketLost);
                clear_session(&mut players, &mut bots, &mut entity_events);
            }
            FromNetMessage::Disconnected => {
                info!("Socket closed");
                lifecycle.advance(LifecycleEvent::SocketLost);
                clear_session(&mut players, &mut bots, &mut entity_events);
            }
            FromNetMessage::PlayerJoin(snap) => {
                let record = register_join(&snap, visuals.as_mut());
                players.records.insert(snap.id.clone(), record);
            }
            FromNetMessage::PlayerLeave { id } => {
                players.records.remove(&id);
                bots.by_id.remove(&id);
            }
            FromNetMessage::PlayerStates(snapshot) => {
                tick.0 += 1;
                pending.push(snapshot);
            }
            FromNetMessage::EntitySpawn(snap) => {
                entity_events.push(EntityEvent::Spawn(snap));
            }
            FromNetMessage::EntityUpdate(snap) => {
                entity_events.push(EntityEvent::Update(snap));
            }
            FromNetMessage::EntityDespawn { id } => {
                entity_events.push(EntityEvent::Despawn { id });
            }
            FromNetMessage::LoadProgress => {
                lifecycle.note_load_progress();
            }
            FromNetMessage::ChunkLoaded => {
                lifecycle.note_chunk_loaded();
            }
            FromNetMessage::ChunkUnloaded => {
                lifecycle.note_chunk_unloaded();
            }
            FromNetMessage::ServerMessageText(text) => {
                menu.status = text;
            }
        }
    }

    if lifecycle.take_join_handshake() {
        info!("Sending join handshake as {}", menu.username);
        let _ = to_net.0.send(ToNetMessage::Join {
            username: menu.username.clone(),
        });
    }
}

/// Builds the record for a newly announced player and primes the visuals
/// the reconciler only fires on change: the held item, the name tag, and
/// the gamemode. A player who appears already in spectator mode must start
/// hidden, and an operator's tag must start recolored.
fn register_join(
    snap: &PlayerSnapshot,
    visuals: &mut dyn PlayerVisuals,
) -> RemotePlayerRecord {
    let mut record = RemotePlayerRecord::from_snapshot(snap);
    if let Some(slot) = snap.toolbar.get(snap.curr_slot).and_then(|s| s.as_ref()) {
        if slot.c > 0 {
            visuals.mount_hand(&snap.id, slot);
            record.hand = Some(slot.clone());
        }
    }
    visuals.update_name_tag(&snap.id, &record);
    visuals.set_gamemode(&snap.id, record.mode);
    record
}

/// Connection teardown clears every record synchronously; the despawn
/// systems sweep the matching visuals on the same frame.
fn clear_session(players: &mut RemotePlayers, bots: &mut Bots, entity_events: &mut EntityEventQueue) {
    players.records.clear();
    bots.by_id.clear();
    entity_events.push(EntityEvent::Clear);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::reconcile::VisualUpdate;
    use vf_utils::{GameMode, ItemClass, ItemSlot, WireVec3};

    fn snapshot(mode: GameMode, operator: bool) -> PlayerSnapshot {
        PlayerSnapshot {
            id: "p1".to_string(),
            pos: WireVec3::default(),
            rot: WireVec3::default(),
            dir: WireVec3::default(),
            vel: WireVec3::default(),
            hp: 20.0,
            hunger: None,
            oxygen: None,
            mode,
            operator,
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
        }
    }

    #[test]
    fn join_in_spectator_primes_gamemode_and_tag() {
        let mut visuals = VisualUpdateQueue::default();
        let snap = snapshot(GameMode::Spectator, true);
        let record = register_join(&snap, &mut visuals);
        assert_eq!(record.mode, GameMode::Spectator);

        let events: Vec<_> = visuals.drain().collect();
        assert!(events.contains(&VisualUpdate::Gamemode {
            id: "p1".to_string(),
            mode: GameMode::Spectator,
        }));
        assert!(events.iter().any(|e| matches!(
            e,
            VisualUpdate::NameTag { id, operator: true, .. } if id == "p1"
        )));
    }

    #[test]
    fn join_mounts_the_held_item() {
        let mut visuals = VisualUpdateQueue::default();
        let mut snap = snapshot(GameMode::Survival, false);
        snap.toolbar[0] = Some(ItemSlot {
            v: 5,
            class: ItemClass::Block,
            c: 3,
        });
        let record = register_join(&snap, &mut visuals);
        assert!(record.hand.is_some());
        let events: Vec<_> = visuals.drain().collect();
        assert!(events.iter().any(|e| matches!(
            e,
            VisualUpdate::MountHand { id, slot } if id == "p1" && slot.v == 5
        )));
    }

    #[test]
    fn join_with_empty_hand_mounts_nothing() {
        let mut visuals = VisualUpdateQueue::default();
        let record = register_join(&snapshot(GameMode::Survival, false), &mut visuals);
        assert!(record.hand.is_none());
        let events: Vec<_> = visuals.drain().collect();
        assert!(!events.iter().any(|e| matches!(e, VisualUpdate::MountHand { .. })));
    }
}
