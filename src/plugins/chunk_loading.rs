//! 分块加载插件
//!
//! 停止播放时集合的可见性由分块窗口决定：以距播放头最近的分块
//! 为中心，把配置距离内的分块设为可见。播放中由门限游标接管。

use bevy::prelude::*;

use crate::config::Sys;
use crate::plugins::note_collection::{MapRefreshRequested, NoteCollection};
use crate::plugins::playback_clock::{PlayToggled, PlaybackSet, PlaybackState, SeekTo};
use crate::schedule::PlaybackSchedule;

/// 对象所属的分块
#[must_use]
pub fn chunk_of(beat: f32, chunk_size: f32) -> i32 {
    (beat / chunk_size).floor() as i32
}

/// 距播放头最近的分块
///
/// 四舍五入，中点远离零（`f32::round` 的行为）。
#[must_use]
pub fn nearest_chunk(beat: f32, chunk_size: f32) -> i32 {
    (beat / chunk_size).round() as i32
}

/// 分块加载插件
pub struct ChunkLoadingPlugin;

impl Plugin for ChunkLoadingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PlaybackSchedule,
            update_chunk_window.in_set(PlaybackSet::Chunks),
        );
    }
}

/// 停止、跳转或重排后刷新分块窗口
///
/// 首次排序启用分块加载之前保持沉默；播放中同样不做任何事。
fn update_chunk_window(
    state: Res<PlaybackState>,
    config: Res<Sys>,
    mut collection: ResMut<NoteCollection>,
    mut toggle_msgs: MessageReader<PlayToggled>,
    mut seek_msgs: MessageReader<SeekTo>,
    mut refresh_msgs: MessageReader<MapRefreshRequested>,
) {
    let stopped_now = toggle_msgs.read().any(|m| !m.0);
    let seeked = !seek_msgs.is_empty();
    seek_msgs.clear();
    let resorted = !refresh_msgs.is_empty();
    refresh_msgs.clear();
    if state.is_playing() || !collection.chunk_loading_armed() {
        return;
    }
    if !(stopped_now || seeked || resorted) {
        return;
    }
    let chunks = &config.chunks;
    let nearest = nearest_chunk(state.current_beat(), chunks.chunk_size);
    for note in collection.notes_mut() {
        let chunk = chunk_of(note.data.beat, chunks.chunk_size);
        note.active = (chunk - nearest).abs() <= chunks.chunk_distance;
    }
    debug!("分块窗口已更新: 中心={nearest} 距离={}", chunks.chunk_distance);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_membership_floors() {
        assert_eq!(chunk_of(0.0, 5.0), 0);
        assert_eq!(chunk_of(4.99, 5.0), 0);
        assert_eq!(chunk_of(5.0, 5.0), 1);
        assert_eq!(chunk_of(-0.1, 5.0), -1);
    }

    #[test]
    fn test_nearest_chunk_rounds_half_away_from_zero() {
        assert_eq!(nearest_chunk(12.4, 5.0), 2);
        // 中点 2.5 远离零取 3
        assert_eq!(nearest_chunk(12.5, 5.0), 3);
        assert_eq!(nearest_chunk(7.5, 5.0), 2);
        assert_eq!(nearest_chunk(2.5, 5.0), 1);
        // 负方向中点同样远离零
        assert_eq!(nearest_chunk(-12.5, 5.0), -3);
    }

    #[test]
    fn test_window_membership() {
        // 中心块 2、距离 1：块 1..=3 在窗口内
        let in_window = |beat: f32| (chunk_of(beat, 5.0) - 2).abs() <= 1;
        assert!(in_window(5.0));
        assert!(in_window(12.0));
        assert!(in_window(19.9));
        assert!(!in_window(4.9));
        assert!(!in_window(20.0));
    }
}
