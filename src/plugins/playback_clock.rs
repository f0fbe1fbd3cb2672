//! 播放时钟插件
//!
//! 维护播放状态与当前节拍位置。谱面 `.dat` 不携带速度信息，
//! 节拍由墙上时间与配置的 BPM 推导。

use bevy::prelude::*;
use gametime::{TimeSpan, TimeStamp};

use crate::config::Sys;
use crate::resources::NowStamp;
use crate::schedule::PlaybackSchedule;

/// 播放推进内部系统集合
///
/// 时钟 -> 游标 -> 标志应用 -> 分块窗口，链式执行。
#[derive(SystemSet, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum PlaybackSet {
    /// 推进播放时钟
    Clock,
    /// 推进生成/消失游标
    Gates,
    /// 应用可见标志到集合
    Apply,
    /// 暂停态分块窗口
    Chunks,
}

/// 播放开关消息
#[derive(Message, Clone, Copy, Debug)]
pub struct PlayToggled(pub bool);

/// 跳转播放头
#[derive(Message, Clone, Copy, Debug)]
pub struct SeekTo {
    /// 目标节拍
    pub beat: f32,
}

/// 播放状态
#[derive(Resource)]
pub struct PlaybackState {
    playing: bool,
    bpm: f32,
    current_beat: f32,
    started_at: Option<TimeStamp>,
    start_beat: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            playing: false,
            bpm: 120.0,
            current_beat: 0.0,
            started_at: None,
            start_beat: 0.0,
        }
    }
}

impl PlaybackState {
    /// 是否正在播放
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// 当前 BPM
    #[must_use]
    pub const fn bpm(&self) -> f32 {
        self.bpm
    }

    /// 当前节拍位置
    #[must_use]
    pub const fn current_beat(&self) -> f32 {
        self.current_beat
    }

    /// 开始播放：记录开始时刻与起始节拍
    pub fn begin_play(&mut self, now: TimeStamp) {
        self.playing = true;
        self.started_at = Some(now);
        self.start_beat = self.current_beat;
    }

    /// 停止播放：播放头停在当前节拍
    pub fn stop_play(&mut self) {
        self.playing = false;
        self.started_at = None;
    }

    /// 跳转播放头（下限为 0）；播放中跳转会重置计时起点
    pub fn seek(&mut self, beat: f32, now: TimeStamp) {
        self.current_beat = beat.max(0.0);
        self.start_beat = self.current_beat;
        if self.playing {
            self.started_at = Some(now);
        }
    }

    /// 将当前节拍推进到给定时刻
    pub fn advance_to(&mut self, now: TimeStamp) {
        let Some(started) = self.started_at else {
            return;
        };
        let elapsed = now.checked_elapsed_since(started).unwrap_or(TimeSpan::ZERO);
        let seconds = elapsed.as_nanos().max(0) as f64 / 1_000_000_000.0;
        self.current_beat = beat_at(self.start_beat, seconds, self.bpm);
    }
}

/// 由起始节拍、经过秒数与 BPM 推导节拍位置
#[must_use]
fn beat_at(start_beat: f32, elapsed_seconds: f64, bpm: f32) -> f32 {
    start_beat + (elapsed_seconds * f64::from(bpm) / 60.0) as f32
}

/// 播放时钟插件
pub struct PlaybackClockPlugin;

impl Plugin for PlaybackClockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NowStamp>()
            .init_resource::<PlaybackState>()
            .add_message::<PlayToggled>()
            .add_message::<SeekTo>()
            .configure_sets(
                PlaybackSchedule,
                (
                    PlaybackSet::Clock,
                    PlaybackSet::Gates,
                    PlaybackSet::Apply,
                    PlaybackSet::Chunks,
                )
                    .chain(),
            )
            .add_systems(Startup, apply_config_bpm)
            .add_systems(
                PlaybackSchedule,
                (
                    update_now_stamp,
                    handle_play_toggles,
                    handle_seeks,
                    advance_clock,
                )
                    .chain()
                    .in_set(PlaybackSet::Clock),
            );
    }
}

/// 将配置的 BPM 写入播放状态
fn apply_config_bpm(mut state: ResMut<PlaybackState>, config: Res<Sys>) {
    state.bpm = config.playback.bpm;
}

/// 刷新当前时间戳
fn update_now_stamp(mut now: ResMut<NowStamp>) {
    now.0 = TimeStamp::now();
}

/// 处理播放开关；重复的同向开关不重置计时起点
fn handle_play_toggles(
    now: Res<NowStamp>,
    mut state: ResMut<PlaybackState>,
    mut toggle_msgs: MessageReader<PlayToggled>,
) {
    for msg in toggle_msgs.read() {
        if msg.0 == state.playing {
            continue;
        }
        if msg.0 {
            state.begin_play(now.0);
            info!("▶ 开始播放预览: beat={:.2} bpm={}", state.current_beat(), state.bpm());
        } else {
            state.stop_play();
            info!("⏸ 停止播放预览: beat={:.2}", state.current_beat());
        }
    }
}

/// 处理播放头跳转
fn handle_seeks(
    now: Res<NowStamp>,
    mut state: ResMut<PlaybackState>,
    mut seek_msgs: MessageReader<SeekTo>,
) {
    for msg in seek_msgs.read() {
        state.seek(msg.beat, now.0);
    }
}

/// 播放中按墙上时间推进节拍
fn advance_clock(now: Res<NowStamp>, mut state: ResMut<PlaybackState>) {
    if !state.is_playing() {
        return;
    }
    state.advance_to(now.0);
}
