//! 跨插件组件定义
//!
//! 定义所有跨插件使用的Component类型

use bevy::prelude::*;

/// 音符标记组件
///
/// 挂在渲染器为集合条目生成的四边形实体上。
#[derive(Component)]
pub struct NoteMarker;
