//! 共享资源定义
//!
//! 定义所有跨插件使用的Resource类型

use std::path::PathBuf;

use bevy::platform::collections::HashSet;
use bevy::prelude::*;
use clap::Parser;
use gametime::TimeStamp;

/// 命令行参数
#[derive(Parser, Resource)]
#[command(author, version, about, long_about = None)]
pub struct ExecArgs {
    /// 谱面文件路径（v2 `.dat`）
    #[arg(long)]
    pub map: Option<PathBuf>,
    /// 歌曲音频文件路径
    #[arg(long)]
    pub song: Option<PathBuf>,
    /// 编辑器配置文件路径（TOML）
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// 载入完成后立即开始播放预览
    #[arg(long)]
    pub preview: bool,
    /// 启动时打开挥动方向可视化
    #[arg(long)]
    pub show_arcs: bool,
    /// 无窗口模式：检查谱面并输出报告后退出
    #[arg(long)]
    pub check_map: bool,
}

/// 当前时间戳
#[derive(Resource, Clone, Copy, Debug)]
pub struct NowStamp(pub TimeStamp);

impl Default for NowStamp {
    fn default() -> Self {
        Self(TimeStamp::start())
    }
}

/// 当前选中的音符实体集合
///
/// 完整的选择/撤销子系统在本 crate 之外，这里只维护排序时
/// 判断"条目是否被选中"所需的最小集合。
#[derive(Resource, Default)]
pub struct SelectionState {
    /// 被选中的音符实体
    pub selected: HashSet<Entity>,
}

impl SelectionState {
    /// 判断条目关联的实体是否被选中
    ///
    /// 尚未生成实体的条目视为未选中。
    #[must_use]
    pub fn is_selected(&self, entity: Option<Entity>) -> bool {
        entity.is_some_and(|e| self.selected.contains(&e))
    }
}
