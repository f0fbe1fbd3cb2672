//! 生成/消失门限插件
//!
//! 播放时沿有序集合推进两个游标，产生单点越线消息；
//! 播放开始、跳转或重排后整体重算游标并广播活动区间。

use bevy::prelude::*;

use crate::config::{Playback, Sys};
use crate::plugins::note_collection::{MapRefreshRequested, NoteCollection};
use crate::plugins::playback_clock::{PlayToggled, PlaybackSet, PlaybackState, SeekTo};
use crate::schedule::PlaybackSchedule;

/// 条目越过生成门限（进入可见窗口）
#[derive(Message, Clone, Copy, Debug)]
pub struct ObjectPassedSpawnPoint {
    /// 越线条目的下标
    pub index: usize,
}

/// 条目越过消失门限（离开可见窗口）
#[derive(Message, Clone, Copy, Debug)]
pub struct ObjectPassedDespawnPoint {
    /// 越线条目的下标
    pub index: usize,
}

/// 游标整体重算后的活动区间
#[derive(Message, Clone, Copy, Debug)]
pub struct ActiveRangeChanged {
    /// 区间下界（含）
    pub despawn_index: usize,
    /// 区间上界（不含）
    pub spawn_index: usize,
}

/// 生成/消失游标
///
/// 两个游标都指向"下一个将越线的条目下标"，
/// 活动区间是半开的 `[despawn_next, spawn_next)`。
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct GateCursors {
    /// 下一个将进入可见窗口的条目
    pub spawn_next: usize,
    /// 下一个将离开可见窗口的条目
    pub despawn_next: usize,
}

impl GateCursors {
    /// 按当前节拍与窗口偏移重算两个游标
    ///
    /// 在按规范键有序的集合上二分定位。生成门限为
    /// `beat <= current + spawn_offset`，消失门限为
    /// `beat <= current - despawn_offset`，两端都含边界。
    pub fn recalc(&mut self, collection: &NoteCollection, current_beat: f32, playback: &Playback) {
        let spawn_threshold = current_beat + playback.spawn_offset_beats;
        let despawn_threshold = current_beat - playback.despawn_offset_beats;
        self.spawn_next = collection
            .notes()
            .partition_point(|n| n.data.beat <= spawn_threshold);
        self.despawn_next = collection
            .notes()
            .partition_point(|n| n.data.beat <= despawn_threshold);
    }
}

/// 生成/消失门限插件
pub struct SpawnGatePlugin;

impl Plugin for SpawnGatePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GateCursors>()
            .add_message::<ObjectPassedSpawnPoint>()
            .add_message::<ObjectPassedDespawnPoint>()
            .add_message::<ActiveRangeChanged>()
            .add_systems(
                PlaybackSchedule,
                (recalc_gate_cursors, advance_gate_cursors)
                    .chain()
                    .in_set(PlaybackSet::Gates),
            );
    }
}

/// 播放开始、跳转或重排后整体重算游标
///
/// 停止状态下静默重算，不广播区间：暂停态可见性由分块窗口负责。
fn recalc_gate_cursors(
    state: Res<PlaybackState>,
    config: Res<Sys>,
    collection: Res<NoteCollection>,
    mut cursors: ResMut<GateCursors>,
    mut toggle_msgs: MessageReader<PlayToggled>,
    mut seek_msgs: MessageReader<SeekTo>,
    mut refresh_msgs: MessageReader<MapRefreshRequested>,
    mut range_writer: MessageWriter<ActiveRangeChanged>,
) {
    let play_started = toggle_msgs.read().any(|m| m.0);
    let seeked = !seek_msgs.is_empty();
    seek_msgs.clear();
    let resorted = !refresh_msgs.is_empty();
    refresh_msgs.clear();
    if !(play_started || seeked || resorted) {
        return;
    }
    cursors.recalc(&collection, state.current_beat(), &config.playback);
    if state.is_playing() {
        range_writer.write(ActiveRangeChanged {
            despawn_index: cursors.despawn_next,
            spawn_index: cursors.spawn_next,
        });
    }
}

/// 播放中的自然越线：每越过一个条目发出一条单点消息
fn advance_gate_cursors(
    state: Res<PlaybackState>,
    config: Res<Sys>,
    collection: Res<NoteCollection>,
    mut cursors: ResMut<GateCursors>,
    mut spawn_writer: MessageWriter<ObjectPassedSpawnPoint>,
    mut despawn_writer: MessageWriter<ObjectPassedDespawnPoint>,
) {
    if !state.is_playing() {
        return;
    }
    let spawn_threshold = state.current_beat() + config.playback.spawn_offset_beats;
    let despawn_threshold = state.current_beat() - config.playback.despawn_offset_beats;
    while let Some(note) = collection.notes().get(cursors.spawn_next) {
        if note.data.beat > spawn_threshold {
            break;
        }
        spawn_writer.write(ObjectPassedSpawnPoint {
            index: cursors.spawn_next,
        });
        cursors.spawn_next += 1;
    }
    while let Some(note) = collection.notes().get(cursors.despawn_next) {
        if note.data.beat > despawn_threshold {
            break;
        }
        despawn_writer.write(ObjectPassedDespawnPoint {
            index: cursors.despawn_next,
        });
        cursors.despawn_next += 1;
    }
}
