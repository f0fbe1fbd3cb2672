//! 自定义 Schedule 定义
//!
//! 用于分离 编辑处理、播放推进、音频播放与渲染同步

use bevy::app::MainScheduleOrder;
use bevy::ecs::schedule::ScheduleLabel;
use bevy::prelude::*;

/// 编辑逻辑 Schedule
///
/// 负责谱面文件载入、音符放置、排序与自动保存
#[derive(ScheduleLabel, Debug, Hash, PartialEq, Eq, Clone)]
pub struct EditSchedule;

/// 播放推进 Schedule
///
/// 负责播放时钟、生成/消失游标与可见范围应用
#[derive(ScheduleLabel, Debug, Hash, PartialEq, Eq, Clone)]
pub struct PlaybackSchedule;

/// 音频处理 Schedule
///
/// 负责歌曲预览播放控制
#[derive(ScheduleLabel, Debug, Hash, PartialEq, Eq, Clone)]
pub struct AudioSchedule;

/// 渲染同步 Schedule
///
/// 负责音符实体维护、可见性镜像、材质状态与辅助线绘制
#[derive(ScheduleLabel, Debug, Hash, PartialEq, Eq, Clone)]
pub struct RenderSchedule;

/// 注册自定义 Schedule 并按固定顺序挂接到主循环
///
/// 顺序：`Update` → 编辑 → 播放推进 → 音频 → 渲染同步。
pub struct SchedulePlugin;

impl Plugin for SchedulePlugin {
    fn build(&self, app: &mut App) {
        app.init_schedule(EditSchedule)
            .init_schedule(PlaybackSchedule)
            .init_schedule(AudioSchedule)
            .init_schedule(RenderSchedule);
        let mut order = app.world_mut().resource_mut::<MainScheduleOrder>();
        order.insert_after(Update, EditSchedule);
        order.insert_after(EditSchedule, PlaybackSchedule);
        order.insert_after(PlaybackSchedule, AudioSchedule);
        order.insert_after(AudioSchedule, RenderSchedule);
    }
}
