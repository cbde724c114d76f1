//! End-to-end crypt playthrough driven through the engine's host callbacks.

mod common;

use common::{
    Harness, boss_center, exit_point, lich_lair, player, quiet_crypt, room_1_center,
};
use dungeon_core::{PortalState, RoomState, RunId, RunState};
use instance_runtime::lock_run;

#[test]
fn crypt_playthrough() {
    let harness = Harness::crypt();
    let engine = &harness.engine;
    let run_id = RunId::from("crypt_1");

    // Portal opens on Alice's shard, the second click lets her in.
    harness.enter(&["alice"]);
    assert_eq!(harness.inventory.holding("alice", "crypt_shard"), 0);
    assert_eq!(
        engine.gate().portal_state("crypt").unwrap(),
        Some(PortalState::Active)
    );
    assert!(harness.messenger.received("alice", "Entering crypt..."));
    assert_eq!(harness.messenger.teleports_for("alice"), [common::entry_point()]);

    let run = engine.registry().get(&run_id).unwrap().unwrap();
    {
        let run = lock_run(&run).unwrap();
        assert_eq!(run.state(), RunState::Active);
        assert!(run.started_at().is_some());
        assert_eq!(run.members(), [player("alice")]);
    }

    // First room spawns three skeletons.
    harness.walk_into("alice", room_1_center());
    let skeletons = harness.world.spawned("skeleton");
    assert_eq!(skeletons.len(), 3);
    assert_eq!(lock_run(&run).unwrap().state(), RunState::InProgress);

    // Clearing it cascades through the empty second room to the boss.
    harness.kill_all("skeleton", "alice");
    {
        let run = lock_run(&run).unwrap();
        assert!(run.rooms().rooms().iter().all(|room| room.state() == RoomState::Cleared));
        assert_eq!(run.boss().unwrap().state(), RoomState::Unlocked);
        assert_eq!(run.tracker().binding_count(), 0);
    }
    assert!(harness
        .messenger
        .received("alice", "All rooms cleared. The guardian awaits."));

    // Walking into the boss room spawns exactly one lich.
    harness.walk_into("alice", boss_center());
    let lich = harness.world.spawned("lich");
    assert_eq!(lich.len(), 1);
    assert_eq!(lock_run(&run).unwrap().state(), RunState::BossFight);
    assert_eq!(harness.messenger.boss_bars_for("alice"), [true]);

    // Walking in again does not spawn a second one.
    harness.walk_into("alice", boss_center());
    assert_eq!(harness.world.spawned("lich").len(), 1);

    // The kill wins the run once, even when the death is reported twice.
    engine.on_entity_death(lich[0], Some(player("alice"))).unwrap();
    engine.on_entity_death(lich[0], Some(player("alice"))).unwrap();
    assert_eq!(lock_run(&run).unwrap().state(), RunState::Completing);
    assert_eq!(harness.rewards.total(), 1);
    assert_eq!(harness.rewards.grants_for("alice")[0].item_id, "gold");
    assert_eq!(engine.completion().remaining(&run_id).unwrap(), Some(5));
    assert_eq!(
        engine.gate().portal_state("crypt").unwrap(),
        Some(PortalState::Closing)
    );
    assert!(harness.messenger.received("alice", "alice has slain the guardian!"));
    assert!(harness
        .messenger
        .messages_for("alice")
        .iter()
        .any(|message| message.starts_with("DUNGEON COMPLETED in ")));
    assert_eq!(harness.messenger.boss_bars_for("alice"), [true, false]);

    // Four ticks count down, the fifth tears the run down.
    harness.tick(4);
    assert_eq!(engine.completion().remaining(&run_id).unwrap(), Some(1));
    assert!(engine.registry().get(&run_id).unwrap().is_some());
    assert!(harness
        .messenger
        .received("alice", "Returning to the surface in 4 seconds..."));

    harness.tick(1);
    assert!(engine.registry().get(&run_id).unwrap().is_none());
    assert_eq!(lock_run(&run).unwrap().state(), RunState::Closed);
    assert_eq!(
        harness.messenger.teleports_for("alice").last(),
        Some(&exit_point())
    );
    assert_eq!(engine.registry().player_run(&player("alice")).unwrap(), None);
    assert_eq!(
        engine.gate().portal_state("crypt").unwrap(),
        Some(PortalState::Inactive)
    );
    assert_eq!(engine.completion().pending().unwrap(), 0);
}

#[test]
fn titles_mark_every_tenth_and_final_seconds() {
    let harness = Harness::new(vec![common::crypt().with_countdown(25)]);
    harness.inventory.put("alice", "crypt_shard", 1);
    harness.enter(&["alice"]);
    harness.walk_into("alice", room_1_center());
    harness.kill_all("skeleton", "alice");
    harness.walk_into("alice", boss_center());
    harness.kill_all("lich", "alice");

    harness.tick(24);
    let subtitles: Vec<String> = harness
        .messenger
        .titles_for("alice")
        .into_iter()
        .filter(|(title, _)| title == "DUNGEON COMPLETE!")
        .map(|(_, subtitle)| subtitle)
        .collect();
    let mut expected = vec!["Returning in 20 seconds".to_owned()];
    expected.extend((1..=10).rev().map(|s| format!("Returning in {s} seconds")));
    assert_eq!(subtitles, expected);
}

#[test]
fn snapshot_reports_progress() {
    let harness = Harness::crypt();
    harness.enter(&["alice"]);
    harness.walk_into("alice", room_1_center());

    let skeletons = harness.world.spawned("skeleton");
    harness
        .engine
        .on_entity_death(skeletons[0], Some(player("alice")))
        .unwrap();

    let snapshot = harness
        .engine
        .snapshot(&RunId::from("crypt_1"))
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.state, RunState::InProgress);
    assert_eq!(snapshot.members, [player("alice")]);
    assert_eq!(snapshot.current_room, 0);
    assert_eq!(snapshot.cleared_rooms, 0);
    assert_eq!(snapshot.total_rooms, 2);
    assert_eq!(snapshot.remaining_enemies, 2);
    assert!(!snapshot.boss_alive);
    assert_eq!(snapshot.countdown, None);
    assert_eq!(harness.engine.snapshots().unwrap().len(), 1);
}

#[test]
fn unrelated_deaths_are_ignored() {
    let harness = Harness::crypt();
    harness.enter(&["alice"]);
    harness
        .engine
        .on_entity_death(dungeon_core::EntityId(999), None)
        .unwrap();
    assert!(harness.messenger.messages_for("alice").iter().all(|m| !m.contains("cleared")));
}

#[test]
fn empty_last_room_raises_an_eager_boss() {
    let harness = Harness::new(vec![quiet_crypt()]);
    harness.inventory.put("alice", "crypt_shard", 1);
    harness.enter(&["alice"]);

    harness.walk_into("alice", room_1_center());
    assert_eq!(harness.world.spawned("lich").len(), 1);
    let run = harness
        .engine
        .registry()
        .get(&RunId::from("crypt_1"))
        .unwrap()
        .unwrap();
    assert_eq!(lock_run(&run).unwrap().state(), RunState::BossFight);
    assert!(harness
        .messenger
        .titles_for("alice")
        .contains(&("BOSS FIGHT!".to_owned(), "lich".to_owned())));

    // Stepping into the boss room afterwards changes nothing.
    harness.walk_into("alice", boss_center());
    assert_eq!(harness.world.spawned("lich").len(), 1);
}

#[test]
fn roomless_run_raises_an_eager_boss_on_start() {
    let harness = Harness::new(vec![lich_lair()]);
    harness.inventory.put("alice", "crypt_shard", 1);
    harness.enter(&["alice"]);

    assert_eq!(harness.world.spawned("lich").len(), 1);
    let run = harness
        .engine
        .registry()
        .get(&RunId::from("crypt_1"))
        .unwrap()
        .unwrap();
    assert_eq!(lock_run(&run).unwrap().state(), RunState::BossFight);
    assert_eq!(harness.messenger.boss_bars_for("alice"), [true]);

    // The kill still completes the run.
    harness.kill_all("lich", "alice");
    assert_eq!(lock_run(&run).unwrap().state(), RunState::Completing);
}
