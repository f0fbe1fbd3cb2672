//! 编辑器配置定义与解析

use std::path::Path;

use anyhow::Result;
use bevy::prelude::Resource;
use serde::Deserialize;

/// 编辑器运行时配置
#[derive(Deserialize, Resource, Clone, Default)]
pub struct Sys {
    /// 网格尺寸配置
    #[serde(default)]
    pub grid: Grid,
    /// 显示分块配置
    #[serde(default)]
    pub chunks: Chunks,
    /// 播放预览配置
    #[serde(default)]
    pub playback: Playback,
    /// 编辑行为配置
    #[serde(default)]
    pub editor: Editor,
    /// 音符配色配置
    #[serde(default)]
    pub colors: Colors,
}

/// 网格尺寸
#[derive(Deserialize, Clone)]
pub struct Grid {
    /// 轨道数（标准谱面为 4）
    #[serde(default = "default_lanes")]
    pub lanes: i32,
    /// 每轨道的层数（标准谱面为 3）
    #[serde(default = "default_layers")]
    pub layers: i32,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            lanes: default_lanes(),
            layers: default_layers(),
        }
    }
}

/// 显示分块
#[derive(Deserialize, Clone)]
pub struct Chunks {
    /// 每块覆盖的节拍数
    #[serde(default = "default_chunk_size")]
    pub chunk_size: f32,
    /// 暂停时以最近块为中心、向两侧加载的块数
    #[serde(default = "default_chunk_distance")]
    pub chunk_distance: i32,
}

impl Default for Chunks {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_distance: default_chunk_distance(),
        }
    }
}

/// 播放预览
#[derive(Deserialize, Clone)]
pub struct Playback {
    /// 曲目 BPM（音符 `.dat` 不携带速度信息）
    #[serde(default = "default_bpm")]
    pub bpm: f32,
    /// 音符在命中前多少节拍进入可见窗口
    #[serde(default = "default_spawn_offset")]
    pub spawn_offset_beats: f32,
    /// 音符在命中后多少节拍离开可见窗口
    #[serde(default = "default_despawn_offset")]
    pub despawn_offset_beats: f32,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            spawn_offset_beats: default_spawn_offset(),
            despawn_offset_beats: default_despawn_offset(),
        }
    }
}

/// 编辑行为
#[derive(Deserialize, Clone)]
pub struct Editor {
    /// 是否以描边高亮最近放置的音符
    #[serde(default = "default_highlight")]
    pub highlight_last_placed: bool,
    /// 自动保存间隔（秒），0 表示关闭
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: f32,
}

impl Default for Editor {
    fn default() -> Self {
        Self {
            highlight_last_placed: default_highlight(),
            autosave_interval_secs: default_autosave_interval(),
        }
    }
}

/// 音符配色（sRGB 三分量）
#[derive(Deserialize, Clone)]
pub struct Colors {
    /// 左手音符底色
    #[serde(default = "default_left_color")]
    pub left: [f32; 3],
    /// 右手音符底色
    #[serde(default = "default_right_color")]
    pub right: [f32; 3],
    /// 炸弹底色
    #[serde(default = "default_bomb_color")]
    pub bomb: [f32; 3],
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            left: default_left_color(),
            right: default_right_color(),
            bomb: default_bomb_color(),
        }
    }
}

fn default_lanes() -> i32 {
    4
}

fn default_layers() -> i32 {
    3
}

fn default_chunk_size() -> f32 {
    5.0
}

fn default_chunk_distance() -> i32 {
    2
}

fn default_bpm() -> f32 {
    120.0
}

fn default_spawn_offset() -> f32 {
    4.0
}

fn default_despawn_offset() -> f32 {
    2.0
}

fn default_highlight() -> bool {
    true
}

fn default_autosave_interval() -> f32 {
    300.0
}

fn default_left_color() -> [f32; 3] {
    [0.78, 0.15, 0.15]
}

fn default_right_color() -> [f32; 3] {
    [0.15, 0.42, 0.86]
}

fn default_bomb_color() -> [f32; 3] {
    [0.16, 0.16, 0.18]
}

/// 从 TOML 字符串解析编辑器配置
///
/// # Errors
///
/// - TOML 解析失败
/// - 配置字段反序列化失败
pub fn parse_sys_str(s: &str) -> Result<Sys> {
    let cfg: Sys = toml::from_str(s)?;
    Ok(cfg)
}

/// 从指定路径加载编辑器配置（TOML）
///
/// # Errors
///
/// - 读取文件失败
/// - TOML 解析失败
/// - 配置字段反序列化失败
#[cfg(any(not(target_arch = "wasm32"), target_os = "wasi"))]
pub fn load_sys(path: &Path) -> Result<Sys> {
    let s = std::fs::read_to_string(path)?;
    parse_sys_str(&s)
}

/// 从指定路径加载编辑器配置（TOML）
///
/// # Errors
///
/// - WASM 目标不支持直接读取本地文件
#[cfg(all(target_arch = "wasm32", not(target_os = "wasi")))]
pub fn load_sys(_path: &Path) -> Result<Sys> {
    anyhow::bail!("load_sys is not available on wasm")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_yields_defaults() {
        let cfg = parse_sys_str("").expect("空配置使用默认值");
        assert_eq!(cfg.grid.lanes, 4);
        assert_eq!(cfg.grid.layers, 3);
        assert_eq!(cfg.chunks.chunk_size, 5.0);
        assert_eq!(cfg.chunks.chunk_distance, 2);
        assert_eq!(cfg.playback.bpm, 120.0);
        assert!(cfg.editor.highlight_last_placed);
    }

    #[test]
    fn test_partial_override() {
        let cfg = parse_sys_str(
            r#"
            [chunks]
            chunk_size = 8.0

            [playback]
            bpm = 174.0
            spawn_offset_beats = 6.0

            [editor]
            highlight_last_placed = false
            "#,
        )
        .expect("合法 TOML");
        assert_eq!(cfg.chunks.chunk_size, 8.0);
        // 未覆盖的字段仍为默认值
        assert_eq!(cfg.chunks.chunk_distance, 2);
        assert_eq!(cfg.playback.bpm, 174.0);
        assert_eq!(cfg.playback.spawn_offset_beats, 6.0);
        assert_eq!(cfg.playback.despawn_offset_beats, 2.0);
        assert!(!cfg.editor.highlight_last_placed);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(parse_sys_str("[grid\nlanes = 4").is_err());
    }
}
