//! v2 `.dat` 谱面文件的解析与写出
//!
//! 只解释 `_notes` 段；其余段（`_obstacles`、`_events` 等）原样保留，
//! 编辑与保存不会丢弃未知内容。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_fs as afs;
use serde::{Deserialize, Serialize};

use crate::beatmap::note::{CutDirection, NoteData, NoteKind};

/// 谱面文件（v2）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatMap {
    /// 格式版本号
    #[serde(rename = "_version", default = "default_version")]
    pub version: String,
    /// 音符段
    #[serde(rename = "_notes", default)]
    pub notes: Vec<DatNote>,
    /// 其余段原样保留
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl DatMap {
    /// 以给定音符列表构建新文件，保留 `rest` 中的既有段
    #[must_use]
    pub fn with_notes(
        version: String,
        notes: Vec<DatNote>,
        rest: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self { version, notes, rest }
    }
}

/// 音符段中的一项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatNote {
    /// 节拍位置
    #[serde(rename = "_time")]
    pub time: f32,
    /// 轨道索引
    #[serde(rename = "_lineIndex")]
    pub line_index: i32,
    /// 轨道层
    #[serde(rename = "_lineLayer")]
    pub line_layer: i32,
    /// 音符类型编码
    #[serde(rename = "_type")]
    pub kind: u8,
    /// 切方向编码
    #[serde(rename = "_cutDirection")]
    pub cut_direction: u8,
    /// 自定义数据段，原样保留
    #[serde(
        rename = "_customData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_data: Option<serde_json::Value>,
}

impl DatNote {
    /// 转换为领域音符；未知编码视为文件错误
    ///
    /// # Errors
    ///
    /// - `_type` 不在 {0, 1, 3} 中
    /// - `_cutDirection` 不在 0..=8 中
    pub fn into_note_data(self) -> Result<NoteData> {
        let kind = NoteKind::from_wire(self.kind)
            .with_context(|| format!("未知音符类型编码 {}（节拍 {}）", self.kind, self.time))?;
        let cut_direction = CutDirection::from_wire(self.cut_direction).with_context(|| {
            format!(
                "未知切方向编码 {}（节拍 {}）",
                self.cut_direction, self.time
            )
        })?;
        Ok(NoteData {
            beat: self.time,
            line_index: self.line_index,
            line_layer: self.line_layer,
            kind,
            cut_direction,
            custom_data: self.custom_data,
        })
    }

    /// 从领域音符生成文件项
    #[must_use]
    pub fn from_note_data(data: &NoteData) -> Self {
        Self {
            time: data.beat,
            line_index: data.line_index,
            line_layer: data.line_layer,
            kind: data.kind.wire_value(),
            cut_direction: data.cut_direction.wire_value(),
            custom_data: data.custom_data.clone(),
        }
    }
}

fn default_version() -> String {
    "2.0.0".to_string()
}

/// 解析 `.dat` 字符串
///
/// # Errors
///
/// - JSON 解析失败
pub fn parse_map_str(s: &str) -> Result<DatMap> {
    let map: DatMap = serde_json::from_str(s)?;
    Ok(map)
}

/// 写出 `.dat` 字符串（紧凑 JSON，与谱面文件的惯常形态一致）
///
/// # Errors
///
/// - JSON 序列化失败
pub fn render_map_string(map: &DatMap) -> Result<String> {
    let s = serde_json::to_string(map)?;
    Ok(s)
}

/// 异步加载谱面文件并转换为领域音符
///
/// # Errors
///
/// - 读取文件失败
/// - JSON 解析失败
/// - 音符段含未知编码
pub async fn load_map(path: PathBuf) -> Result<(DatMap, Vec<NoteData>)> {
    let bytes = afs::read(&path)
        .await
        .with_context(|| format!("读取谱面文件失败: {}", path.display()))?;
    let text = String::from_utf8(bytes).context("谱面文件不是合法的 UTF-8")?;
    let map = parse_map_str(&text)?;
    let notes = map
        .notes
        .iter()
        .cloned()
        .map(DatNote::into_note_data)
        .collect::<Result<Vec<_>>>()?;
    Ok((map, notes))
}

/// 异步保存谱面文件
///
/// # Errors
///
/// - JSON 序列化失败
/// - 写入文件失败
pub async fn save_map(path: &Path, map: &DatMap) -> Result<()> {
    let text = render_map_string(map)?;
    afs::write(path, text.as_bytes())
        .await
        .with_context(|| format!("写入谱面文件失败: {}", path.display()))?;
    Ok(())
}
