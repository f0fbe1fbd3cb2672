//! Nebula Mapper 谱面编辑器库
//!
//! 核心结构：
//! - [`beatmap`]：音符领域类型与 `.dat` 谱面文件格式
//! - [`plugins`]：集合整理、播放门限、分块加载、渲染与文件读写等功能插件
//! - [`schedule`]：编辑 → 播放 → 音频 → 渲染的帧内调度顺序

pub mod beatmap;
pub mod components;
pub mod config;
pub mod plugins;
pub mod resources;
pub mod schedule;
