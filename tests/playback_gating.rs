use bevy::prelude::*;

use nebula_mapper::beatmap::note::{CutDirection, NoteData, NoteKind};
use nebula_mapper::config::{Playback, Sys};
use nebula_mapper::plugins::note_collection::{MapRefreshRequested, NoteCollection, PlaceNote};
use nebula_mapper::plugins::playback_clock::{PlayToggled, SeekTo};
use nebula_mapper::plugins::{
    ChunkLoadingPlugin, NoteCollectionPlugin, PlaybackClockPlugin, SpawnGatePlugin,
};
use nebula_mapper::schedule::SchedulePlugin;

/// 无界面编辑器逻辑栈，BPM 取近零值让节拍位置在测试期间保持不动
fn editor_app() -> App {
    let config = Sys {
        playback: Playback {
            bpm: 0.001,
            ..Playback::default()
        },
        ..Sys::default()
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(config)
        .add_plugins((
            SchedulePlugin,
            NoteCollectionPlugin,
            PlaybackClockPlugin,
            SpawnGatePlugin,
            ChunkLoadingPlugin,
        ));
    app
}

fn place(app: &mut App, beat: f32, line_index: i32, kind: NoteKind) {
    app.world_mut().write_message(PlaceNote {
        data: NoteData::new(beat, line_index, 0, kind, CutDirection::Down),
        resolve_conflicts: false,
        refresh: false,
    });
}

fn active_flags(app: &App) -> Vec<bool> {
    app.world()
        .resource::<NoteCollection>()
        .notes()
        .iter()
        .map(|note| note.active)
        .collect()
}

#[test]
fn refresh_sorts_and_assigns_dense_ids() {
    let mut app = editor_app();
    for (beat, lane) in [(5.0, 2), (1.0, 0), (30.0, 3), (3.0, 1)] {
        place(&mut app, beat, lane, NoteKind::Left);
    }
    app.world_mut().write_message(MapRefreshRequested);
    app.update();

    let collection = app.world().resource::<NoteCollection>();
    let beats: Vec<f32> = collection.notes().iter().map(|n| n.data.beat).collect();
    assert_eq!(beats, vec![1.0, 3.0, 5.0, 30.0]);
    let ids: Vec<u32> = collection.notes().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
}

#[test]
fn playing_activates_exactly_the_gate_window() {
    let mut app = editor_app();
    for (beat, lane) in [(5.0, 2), (1.0, 0), (30.0, 3), (3.0, 1)] {
        place(&mut app, beat, lane, NoteKind::Left);
    }
    app.world_mut().write_message(MapRefreshRequested);
    app.update();

    // 播放从节拍 0 开始：窗口 [0-2, 0+4] 命中 1.0 与 3.0
    app.world_mut().write_message(PlayToggled(true));
    app.update();
    assert_eq!(active_flags(&app), vec![true, true, false, false]);
}

#[test]
fn stopping_loads_chunks_around_the_playhead() {
    let mut app = editor_app();
    for (beat, lane) in [(5.0, 2), (1.0, 0), (30.0, 3), (3.0, 1)] {
        place(&mut app, beat, lane, NoteKind::Left);
    }
    app.world_mut().write_message(MapRefreshRequested);
    app.update();

    app.world_mut().write_message(PlayToggled(true));
    app.update();
    app.world_mut().write_message(PlayToggled(false));
    app.update();
    // 停止于节拍 ~0：最近块 0，窗口覆盖块 -2..=2，节拍 30（块 6）除外
    assert_eq!(active_flags(&app), vec![true, true, true, false]);

    // 停止状态下跳转到节拍 29：最近块 6，窗口覆盖块 4..=8
    app.world_mut().write_message(SeekTo { beat: 29.0 });
    app.update();
    assert_eq!(active_flags(&app), vec![false, false, false, true]);
}

#[test]
fn conflicting_placement_is_resolved_during_refresh() {
    let mut app = editor_app();
    place(&mut app, 2.0, 1, NoteKind::Left);
    place(&mut app, 4.0, 2, NoteKind::Right);
    app.world_mut().write_message(MapRefreshRequested);
    app.update();

    // 同键位再放置：旧对象被移除，总数不变
    app.world_mut().write_message(PlaceNote {
        data: NoteData::new(2.0, 1, 0, NoteKind::Left, CutDirection::Up),
        resolve_conflicts: true,
        refresh: true,
    });
    app.update();

    let collection = app.world().resource::<NoteCollection>();
    assert_eq!(collection.len(), 2);
    let ids: Vec<u32> = collection.notes().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![0, 1]);
    let first = collection.notes().first().expect("有音符");
    assert_eq!(first.data.cut_direction, CutDirection::Up);
    // 新放置的音符带描边高亮
    assert!(first.outline.is_some());
}
