//! 音符领域类型：类型、切方向与网格位置
//!
//! 排序键为 `(beat, line_index, line_layer, kind)`，冲突键与排序键一致。

use std::cmp::Ordering;

/// 音符类型
///
/// 声明顺序即排序顺序（红 -> 蓝 -> 炸弹），与线格编码的数值顺序一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoteKind {
    /// 左手（红色）音符
    Left,
    /// 右手（蓝色）音符
    Right,
    /// 炸弹
    Bomb,
}

impl NoteKind {
    /// `.dat` 文件中的数值编码（2 为历史保留值，未使用）
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Bomb => 3,
        }
    }

    /// 从 `.dat` 数值解码，未知值返回 `None`
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            3 => Some(Self::Bomb),
            _ => None,
        }
    }

    /// 是否为可切的彩色音符（非炸弹）
    #[must_use]
    pub const fn is_color_note(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

/// 切方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutDirection {
    /// 上
    Up,
    /// 下
    Down,
    /// 左
    Left,
    /// 右
    Right,
    /// 左上
    UpLeft,
    /// 右上
    UpRight,
    /// 左下
    DownLeft,
    /// 右下
    DownRight,
    /// 任意方向（圆点）
    Any,
}

impl CutDirection {
    /// `.dat` 文件中的数值编码
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
            Self::UpLeft => 4,
            Self::UpRight => 5,
            Self::DownLeft => 6,
            Self::DownRight => 7,
            Self::Any => 8,
        }
    }

    /// 从 `.dat` 数值解码，未知值返回 `None`
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Up),
            1 => Some(Self::Down),
            2 => Some(Self::Left),
            3 => Some(Self::Right),
            4 => Some(Self::UpLeft),
            5 => Some(Self::UpRight),
            6 => Some(Self::DownLeft),
            7 => Some(Self::DownRight),
            8 => Some(Self::Any),
            _ => None,
        }
    }

    /// 挥动方向的单位向量（编辑器平面，+y 朝上）；`Any` 无方向
    #[must_use]
    pub fn swing_vector(self) -> Option<(f32, f32)> {
        const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;
        match self {
            Self::Up => Some((0.0, 1.0)),
            Self::Down => Some((0.0, -1.0)),
            Self::Left => Some((-1.0, 0.0)),
            Self::Right => Some((1.0, 0.0)),
            Self::UpLeft => Some((-DIAG, DIAG)),
            Self::UpRight => Some((DIAG, DIAG)),
            Self::DownLeft => Some((-DIAG, -DIAG)),
            Self::DownRight => Some((DIAG, -DIAG)),
            Self::Any => None,
        }
    }
}

/// 一个放置在时间线/网格上的音符的数据部分
///
/// 顺序 ID 不在此处：它由集合在每次排序时重新分配，不随数据持久化。
#[derive(Debug, Clone, PartialEq)]
pub struct NoteData {
    /// 节拍位置（`.dat` 的 `_time`）
    pub beat: f32,
    /// 轨道索引（0 -> 3，Mapping Extensions 谱面可能超出）
    pub line_index: i32,
    /// 轨道层（0 -> 2）
    pub line_layer: i32,
    /// 音符类型
    pub kind: NoteKind,
    /// 切方向（不参与排序键与冲突键）
    pub cut_direction: CutDirection,
    /// `_customData` 原样保留的 JSON 段
    pub custom_data: Option<serde_json::Value>,
}

impl NoteData {
    /// 创建一个无自定义数据的音符
    #[must_use]
    pub const fn new(
        beat: f32,
        line_index: i32,
        line_layer: i32,
        kind: NoteKind,
        cut_direction: CutDirection,
    ) -> Self {
        Self {
            beat,
            line_index,
            line_layer,
            kind,
            cut_direction,
            custom_data: None,
        }
    }

    /// 规范排序：节拍 -> 轨道索引 -> 轨道层 -> 类型
    ///
    /// 节拍比较使用 `total_cmp` 以获得全序；其余字段按元组顺序破平。
    #[must_use]
    pub fn grid_order(&self, other: &Self) -> Ordering {
        self.beat
            .total_cmp(&other.beat)
            .then_with(|| self.line_index.cmp(&other.line_index))
            .then_with(|| self.line_layer.cmp(&other.line_layer))
            .then_with(|| self.kind.cmp(&other.kind))
    }

    /// 冲突键：与另一音符在 `(beat, line_index, line_layer, kind)` 上完全相同
    ///
    /// 节拍使用精确相等，放置时的节拍均已对齐到网格。
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.beat == other.beat
            && self.line_index == other.line_index
            && self.line_layer == other.line_layer
            && self.kind == other.kind
    }
}
