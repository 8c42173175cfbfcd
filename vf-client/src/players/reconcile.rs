use std::collections::{HashMap, VecDeque};

use bevy::prelude::Resource;
use vf_utils::{ArmorSnapshot, GameMode, ItemSlot, PlayerSnapshot};

use super::RemotePlayerRecord;

/// Outward seam for the visual side effects of reconciliation. Name-tag
/// rendering in particular is expensive and must only run on real change,
/// so the reconciler decides *when* and the implementation decides *how*.
pub trait PlayerVisuals {
    fn update_armor(&mut self, id: &str, armor: Option<&ArmorSnapshot>);
    fn update_name_tag(&mut self, id: &str, record: &RemotePlayerRecord);
    fn set_gamemode(&mut self, id: &str, mode: GameMode);
    fn detach_hand(&mut self, id: &str);
    fn mount_hand(&mut self, id: &str, slot: &ItemSlot);
}

/// Merges one server snapshot into the local player records.
///
/// Ids present on only one side are skipped; join/leave lifecycle is handled
/// elsewhere. Kinematic fields are copied verbatim, everything with a visual
/// cost goes through change detection first.
pub fn reconcile(
    records: &mut HashMap<String, RemotePlayerRecord>,
    snapshot: &HashMap<String, PlayerSnapshot>,
    visuals: &mut dyn PlayerVisuals,
    tick: u64,
) {
    for (id, record) in records.iter_mut() {
        let Some(snap) = snapshot.get(id) else {
            continue;
        };

        record.pos = snap.pos.into();
        record.rot = snap.rot.into();
        record.dir = snap.dir.into();
        record.vel = snap.vel.into();

        if snap.hp != record.hp {
            record.heart_blink = tick;
            if record.last_hp.is_none() || snap.hp > record.hp {
                record.last_hp = Some(record.hp);
            }
        }
        record.hp = snap.hp;
        record.visible = record.hp > 0.0;

        if let Some(hunger) = snap.hunger {
            record.hunger = Some(hunger);
        }
        if let Some(oxygen) = snap.oxygen {
            record.oxygen = Some(oxygen);
        }

        visuals.update_armor(id, snap.armor.as_ref());

        if record.mode != snap.mode || record.operator != snap.operator {
            record.operator = snap.operator;
            record.mode = snap.mode;
            visuals.update_name_tag(id, record);
            visuals.set_gamemode(id, snap.mode);
        }

        reconcile_hand(id, record, snap, visuals);

        record.ping.push(snap.ping);
        record.toolbar = snap.toolbar.clone();
        record.walking = snap.walking;
        record.sneaking = snap.sneaking;
        record.punching = snap.punching;
        record.blocking = snap.blocking;
        record.fps = snap.fps;

        if record.name != snap.name {
            record.name = snap.name.clone();
            visuals.update_name_tag(id, record);
            visuals.set_gamemode(id, record.mode);
        }
    }
}

/// Remounts the hand visual only when the equipped slot actually changed:
/// same (value, class, count) triple, or both slots absent, is no change.
fn reconcile_hand(
    id: &str,
    record: &mut RemotePlayerRecord,
    snap: &PlayerSnapshot,
    visuals: &mut dyn PlayerVisuals,
) {
    let local_slot = record.toolbar.get(snap.curr_slot).and_then(|s| s.as_ref());
    let remote_slot = snap.toolbar.get(snap.curr_slot).and_then(|s| s.as_ref());
    let same = matches!((local_slot, remote_slot), (Some(a), Some(b)) if a.same_as(b));
    let both_absent = local_slot.is_none() && remote_slot.is_none();

    if record.curr_slot == snap.curr_slot && (same || both_absent) {
        return;
    }

    if record.hand.is_some() {
        visuals.detach_hand(id);
        record.hand = None;
    }
    record.curr_slot = snap.curr_slot;

    let remote_slot = snap.toolbar.get(snap.curr_slot).and_then(|s| s.as_ref());
    if let Some(slot) = remote_slot {
        if slot.c > 0 {
            visuals.mount_hand(id, slot);
            record.hand = Some(slot.clone());
        }
    }
}

/// Queued visual side effects. Implements [`PlayerVisuals`] by recording
/// typed events; a scene system drains them once reconciliation is done.
#[derive(Resource, Default)]
pub struct VisualUpdateQueue {
    events: VecDeque<VisualUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisualUpdate {
    Armor {
        id: String,
        armor: Option<ArmorSnapshot>,
    },
    NameTag {
        id: String,
        text: String,
        operator: bool,
        mode: GameMode,
    },
    Gamemode {
        id: String,
        mode: GameMode,
    },
    DetachHand {
        id: String,
    },
    MountHand {
        id: String,
        slot: ItemSlot,
    },
}

impl VisualUpdateQueue {
    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, VisualUpdate> {
        self.events.drain(..)
    }
}

impl PlayerVisuals for VisualUpdateQueue {
    fn update_armor(&mut self, id: &str, armor: Option<&ArmorSnapshot>) {
        self.events.push_back(VisualUpdate::Armor {
            id: id.to_string(),
            armor: armor.cloned(),
        });
    }

    fn update_name_tag(&mut self, id: &str, record: &RemotePlayerRecord) {
        self.events.push_back(VisualUpdate::NameTag {
            id: id.to_string(),
            text: record.name.clone(),
            operator: record.operator,
            mode: record.mode,
        });
    }

    fn set_gamemode(&mut self, id: &str, mode: GameMode) {
        self.events.push_back(VisualUpdate::Gamemode {
            id: id.to_string(),
            mode,
        });
    }

    fn detach_hand(&mut self, id: &str) {
        self.events
            .push_back(VisualUpdate::DetachHand { id: id.to_string() });
    }

    fn mount_hand(&mut self, id: &str, slot: &ItemSlot) {
        self.events.push_back(VisualUpdate::MountHand {
            id: id.to_string(),
            slot: slot.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::prelude::Vec3;
    use vf_utils::{ItemClass, WireVec3};

    #[derive(Default)]
    struct RecordingVisuals {
        name_tags: Vec<String>,
        gamemodes: Vec<(String, GameMode)>,
        detaches: Vec<String>,
        mounts: Vec<(String, ItemSlot)>,
        armor_calls: usize,
    }

    impl PlayerVisuals for RecordingVisuals {
        fn update_armor(&mut self, _id: &str, _armor: Option<&ArmorSnapshot>) {
            self.armor_calls += 1;
        }
        fn update_name_tag(&mut self, id: &str, _record: &RemotePlayerRecord) {
            self.name_tags.push(id.to_string());
        }
        fn set_gamemode(&mut self, id: &str, mode: GameMode) {
            self.gamemodes.push((id.to_string(), mode));
        }
        fn detach_hand(&mut self, id: &str) {
            self.detaches.push(id.to_string());
        }
        fn mount_hand(&mut self, id: &str, slot: &ItemSlot) {
            self.mounts.push((id.to_string(), slot.clone()));
        }
    }

    fn base_snapshot(id: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            id: id.to_string(),
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
            ping: 30,
            walking: false,
            sneaking: false,
            punching: false,
            blocking: false,
            fps: 60.0,
            name: "steve".to_string(),
            armor: None,
        }
    }

    fn setup(id: &str) -> (HashMap<String, RemotePlayerRecord>, PlayerSnapshot) {
        let snap = base_snapshot(id);
        let mut records = HashMap::new();
        records.insert(id.to_string(), RemotePlayerRecord::from_snapshot(&snap));
        (records, snap)
    }

    fn run(
        records: &mut HashMap<String, RemotePlayerRecord>,
        snap: &PlayerSnapshot,
        tick: u64,
    ) -> RecordingVisuals {
        let mut visuals = RecordingVisuals::default();
        let mut snapshot = HashMap::new();
        snapshot.insert(snap.id.clone(), snap.clone());
        reconcile(records, &snapshot, &mut visuals, tick);
        visuals
    }

    fn slot(v: i32, class: ItemClass, c: i32) -> Option<ItemSlot> {
        Some(ItemSlot { v, class, c })
    }

    #[test]
    fn kinematics_pass_through_verbatim() {
        let (mut records, mut snap) = setup("p1");
        snap.pos = WireVec3 {
            x: 4.25,
            y: 63.0,
            z: -8.5,
        };
        snap.vel = WireVec3 {
            x: -0.5,
            y: 0.0,
            z: 1.25,
        };
        run(&mut records, &snap, 1);
        let r = &records["p1"];
        assert_eq!(r.pos, Vec3::new(4.25, 63.0, -8.5));
        assert_eq!(r.vel, Vec3::new(-0.5, 0.0, 1.25));
    }

    #[test]
    fn identical_toolbar_slot_never_remounts() {
        let (mut records, mut snap) = setup("p1");
        snap.toolbar[0] = slot(5, ItemClass::Block, 3);
        let visuals = run(&mut records, &snap, 1);
        assert_eq!(visuals.mounts.len(), 1);

        // Same (value, class, count) triple at the same index: no change.
        let visuals = run(&mut records, &snap, 2);
        assert!(visuals.detaches.is_empty());
        assert!(visuals.mounts.is_empty());
    }

    #[test]
    fn both_absent_slots_are_equal() {
        let (mut records, snap) = setup("p1");
        let visuals = run(&mut records, &snap, 1);
        assert!(visuals.detaches.is_empty());
        assert!(visuals.mounts.is_empty());
    }

    #[test]
    fn slot_index_change_remounts() {
        let (mut records, mut snap) = setup("p1");
        snap.toolbar[0] = slot(5, ItemClass::Block, 3);
        snap.toolbar[1] = slot(7, ItemClass::Item, 1);
        run(&mut records, &snap, 1);

        snap.curr_slot = 1;
        let visuals = run(&mut records, &snap, 2);
        assert_eq!(visuals.detaches, vec!["p1"]);
        assert_eq!(visuals.mounts.len(), 1);
        assert_eq!(visuals.mounts[0].1.v, 7);
        assert_eq!(records["p1"].curr_slot, 1);
    }

    #[test]
    fn emptied_slot_detaches_without_mounting() {
        let (mut records, mut snap) = setup("p1");
        snap.toolbar[0] = slot(5, ItemClass::Block, 3);
        run(&mut records, &snap, 1);

        snap.toolbar[0] = slot(5, ItemClass::Block, 0);
        let visuals = run(&mut records, &snap, 2);
        assert_eq!(visuals.detaches, vec!["p1"]);
        assert!(visuals.mounts.is_empty());
        assert!(records["p1"].hand.is_none());
    }

    #[test]
    fn health_high_water_mark_sequence() {
        // Health goes 20 -> 14 -> 14 -> 18.
        let (mut records, mut snap) = setup("p1");

        snap.hp = 14.0;
        run(&mut records, &snap, 1);
        assert_eq!(records["p1"].last_hp, Some(20.0));
        assert_eq!(records["p1"].hp, 14.0);
        assert_eq!(records["p1"].heart_blink, 1);

        run(&mut records, &snap, 2);
        assert_eq!(records["p1"].heart_blink, 1, "no change, no flash");

        snap.hp = 18.0;
        run(&mut records, &snap, 3);
        assert_eq!(records["p1"].heart_blink, 3);
        assert_eq!(records["p1"].last_hp, Some(14.0));
        assert_eq!(records["p1"].hp, 18.0);
    }

    #[test]
    fn health_sign_drives_visibility() {
        let (mut records, mut snap) = setup("p1");
        snap.hp = 0.0;
        run(&mut records, &snap, 1);
        assert!(!records["p1"].visible);
        snap.hp = 6.0;
        run(&mut records, &snap, 2);
        assert!(records["p1"].visible);
    }

    #[test]
    fn missing_counterparts_are_skipped() {
        let (mut records, _) = setup("p1");
        let before = records["p1"].clone();

        // Snapshot for a player we do not track: nothing is created.
        let stranger = base_snapshot("p2");
        let mut snapshot = HashMap::new();
        snapshot.insert("p2".to_string(), stranger);
        let mut visuals = RecordingVisuals::default();
        reconcile(&mut records, &snapshot, &mut visuals, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records["p1"].hp, before.hp);
        assert_eq!(records["p1"].heart_blink, before.heart_blink);
    }

    #[test]
    fn name_change_reruns_tag_and_gamemode_once() {
        let (mut records, mut snap) = setup("p1");
        let visuals = run(&mut records, &snap, 1);
        assert!(visuals.name_tags.is_empty(), "unchanged name is free");

        snap.name = "alex".to_string();
        let visuals = run(&mut records, &snap, 2);
        assert_eq!(visuals.name_tags.len(), 1);
        assert_eq!(visuals.gamemodes.len(), 1);
        assert_eq!(records["p1"].name, "alex");
    }

    #[test]
    fn gamemode_or_operator_change_updates_visuals() {
        let (mut records, mut snap) = setup("p1");
        snap.mode = GameMode::Creative;
        snap.operator = true;
        let visuals = run(&mut records, &snap, 1);
        assert_eq!(visuals.gamemodes, vec![("p1".to_string(), GameMode::Creative)]);
        assert_eq!(visuals.name_tags.len(), 1);
        assert!(records["p1"].operator);
        assert_eq!(records["p1"].mode, GameMode::Creative);
    }

    #[test]
    fn absent_optional_fields_keep_previous_values() {
        let (mut records, mut snap) = setup("p1");
        snap.hunger = Some(9.0);
        run(&mut records, &snap, 1);
        assert_eq!(records["p1"].hunger, Some(9.0));

        snap.hunger = None;
        run(&mut records, &snap, 2);
        assert_eq!(records["p1"].hunger, Some(9.0), "absent means no update");
    }

    #[test]
    fn ping_and_flags_always_pass_through() {
        let (mut records, mut snap) = setup("p1");
        snap.walking = true;
        snap.sneaking = true;
        snap.ping = 77;
        run(&mut records, &snap, 1);
        let r = &records["p1"];
        assert!(r.walking);
        assert!(r.sneaking);
        assert_eq!(r.ping.average(), Some(77));
    }
}
