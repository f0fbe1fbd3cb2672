//! 音符集合管理插件
//!
//! 维护谱面内音符/炸弹的有序列表：
//! - 按规范键排序并重新分配连续 ID
//! - 放置时消解同位置冲突并对外通报
//! - 将生成/消失门限消息投影为条目的可见标志

use bevy::prelude::*;

use crate::beatmap::note::NoteData;
use crate::config::Sys;
use crate::plugins::playback_clock::PlaybackSet;
use crate::plugins::spawn_gate::{
    ActiveRangeChanged, ObjectPassedDespawnPoint, ObjectPassedSpawnPoint,
};
use crate::resources::SelectionState;
use crate::schedule::{EditSchedule, PlaybackSchedule};

/// 新放置音符的描边高亮色
const HIGHLIGHT_COLOR: Color = Color::srgb(1.0, 0.0, 1.0);

/// 编辑处理系统集合
#[derive(SystemSet, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EditSet {
    /// 谱面文件载入与任务轮询
    Io,
    /// 放置与冲突消解
    Place,
    /// 排序刷新
    Refresh,
    /// 自动保存
    Autosave,
}

/// 集合中的一个已放置对象
///
/// `id` 仅在两次排序之间有意义；`entity` 由渲染器在生成实体后回填。
#[derive(Clone, Debug)]
pub struct PlacedNote {
    /// 音符数据
    pub data: NoteData,
    /// 排序后分配的连续 ID
    pub id: u32,
    /// 渲染器生成的实体（生成前为 `None`）
    pub entity: Option<Entity>,
    /// 可见标志，由门限/分块系统维护
    pub active: bool,
    /// 描边颜色（无描边为 `None`）
    pub outline: Option<Color>,
}

/// 音符集合资源
///
/// 所有集合操作都在主世界内同步执行，条目顺序是唯一的共享状态。
#[derive(Resource, Default)]
pub struct NoteCollection {
    notes: Vec<PlacedNote>,
    chunk_loading_armed: bool,
    pending_despawns: Vec<Entity>,
    dirty: bool,
}

impl NoteCollection {
    /// 当前条目（排序后按规范键有序）
    #[must_use]
    pub fn notes(&self) -> &[PlacedNote] {
        &self.notes
    }

    /// 条目数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// 集合是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// 按下标取可变条目，越界返回 `None`
    pub fn note_mut(&mut self, index: usize) -> Option<&mut PlacedNote> {
        self.notes.get_mut(index)
    }

    /// 条目的可变迭代器
    pub fn notes_mut(&mut self) -> impl Iterator<Item = &mut PlacedNote> {
        self.notes.iter_mut()
    }

    /// 分块加载是否已启用（首次排序后生效）
    #[must_use]
    pub const fn chunk_loading_armed(&self) -> bool {
        self.chunk_loading_armed
    }

    /// 自上次保存以来集合内容是否有变化
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 保存完成后清除修改标志
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// 保存失败后恢复修改标志，让下一轮自动保存重试
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// 整体重排集合
    ///
    /// 稳定排序：节拍 -> 轨道索引 -> 轨道层 -> 类型；随后按新顺序
    /// 重新分配 `0..N-1` 的连续 ID，并清除未选中条目的描边。
    /// 首次排序同时启用分块加载。
    pub fn sort_objects(&mut self, selection: &SelectionState) {
        self.notes.sort_by(|a, b| a.data.grid_order(&b.data));
        for (id, note) in self.notes.iter_mut().enumerate() {
            note.id = id as u32;
            // 尚无实体的新条目保留描边，实体回填后的下一次重排再参与清理
            if note.entity.is_some()
                && note.outline.is_some()
                && !selection.is_selected(note.entity)
            {
                note.outline = None;
            }
        }
        self.chunk_loading_armed = true;
    }

    /// 查找与 `data` 位置冲突的第一个条目下标
    #[must_use]
    pub fn conflict_of(&self, data: &NoteData) -> Option<usize> {
        self.notes.iter().position(|n| n.data.conflicts_with(data))
    }

    /// 放置一个音符
    ///
    /// `resolve_conflicts` 为真时，先移除与其位置键完全相同的第一个
    /// 既有条目并将其返回（恰好移除一个；无冲突时不移除任何条目）。
    /// 新条目追加到列表尾部，放置本身不排序。
    pub fn spawn_object(
        &mut self,
        data: NoteData,
        resolve_conflicts: bool,
        outline: Option<Color>,
    ) -> (usize, Option<PlacedNote>) {
        let removed = if resolve_conflicts {
            let beat = data.beat;
            self.conflict_of(&data)
                .and_then(|index| self.delete_object(index, &format!("与节拍 {beat} 的新对象冲突")))
        } else {
            None
        };
        // 排序前的临时 ID，下一次 sort_objects 重新分配
        let id = self.notes.len() as u32;
        self.notes.push(PlacedNote {
            data,
            id,
            entity: None,
            active: true,
            outline,
        });
        self.dirty = true;
        (self.notes.len() - 1, removed)
    }

    /// 移除指定下标的条目并返回它
    ///
    /// 条目已有实体时将其排入待销毁队列，由渲染器在下一帧回收。
    /// 越界下标返回 `None`。
    pub fn delete_object(&mut self, index: usize, reason: &str) -> Option<PlacedNote> {
        if index >= self.notes.len() {
            return None;
        }
        let note = self.notes.remove(index);
        if let Some(entity) = note.entity {
            self.pending_despawns.push(entity);
        }
        debug!("移除音符 beat={}（{reason}）", note.data.beat);
        self.dirty = true;
        Some(note)
    }

    /// 设置单个条目的可见标志，越界静默跳过
    pub fn set_active(&mut self, index: usize, active: bool) {
        if let Some(note) = self.notes.get_mut(index) {
            note.active = active;
        }
    }

    /// 将可见标志投影为半开区间：下标 `i` 可见当且仅当
    /// `despawn_index <= i < spawn_index`
    pub fn apply_active_range(&mut self, despawn_index: usize, spawn_index: usize) {
        for (i, note) in self.notes.iter_mut().enumerate() {
            note.active = i >= despawn_index && i < spawn_index;
        }
    }

    /// 取走待销毁的实体队列
    pub fn take_pending_despawns(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.pending_despawns)
    }

    /// 统计冲突对象数（多余重复的条目数）
    ///
    /// 冲突键是排序键的前缀，排序后冲突条目必然相邻，
    /// 因此只做相邻扫描；须在 `sort_objects` 之后调用。
    #[must_use]
    pub fn count_conflicts(&self) -> usize {
        self.notes
            .iter()
            .zip(self.notes.iter().skip(1))
            .filter(|(a, b)| a.data.conflicts_with(&b.data))
            .count()
    }
}

/// 放置音符请求
#[derive(Message, Clone, Debug)]
pub struct PlaceNote {
    /// 音符数据
    pub data: NoteData,
    /// 是否移除位置冲突的旧对象
    pub resolve_conflicts: bool,
    /// 放置后是否触发整体刷新（重排）
    pub refresh: bool,
}

/// 对象被移除的通知
///
/// 供外部选择/撤销子系统消费；本 crate 仅记录日志。
#[derive(Message, Clone, Debug)]
pub struct ObjectRemoved {
    /// 被移除的音符数据
    pub data: NoteData,
    /// 移除原因
    pub reason: String,
}

/// 请求整体重排集合
#[derive(Message, Clone, Debug)]
pub struct MapRefreshRequested;

/// 谱面载入完成
#[derive(Message, Clone, Debug)]
pub struct MapLoaded {
    /// 载入的音符数量
    pub notes: usize,
}

/// 音符集合管理插件
pub struct NoteCollectionPlugin;

impl Plugin for NoteCollectionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NoteCollection>()
            .init_resource::<SelectionState>()
            .add_message::<PlaceNote>()
            .add_message::<ObjectRemoved>()
            .add_message::<MapRefreshRequested>()
            .add_message::<MapLoaded>()
            .configure_sets(
                EditSchedule,
                (
                    EditSet::Io,
                    EditSet::Place,
                    EditSet::Refresh,
                    EditSet::Autosave,
                )
                    .chain(),
            )
            .add_systems(
                EditSchedule,
                (handle_place_messages, log_removed_objects)
                    .chain()
                    .in_set(EditSet::Place),
            )
            .add_systems(
                EditSchedule,
                handle_refresh_requests.in_set(EditSet::Refresh),
            )
            .add_systems(
                PlaybackSchedule,
                apply_gate_messages.in_set(PlaybackSet::Apply),
            );
    }
}

/// 处理放置请求：冲突消解、追加条目、按需请求刷新
fn handle_place_messages(
    mut collection: ResMut<NoteCollection>,
    config: Res<Sys>,
    mut place_msgs: MessageReader<PlaceNote>,
    mut removed_writer: MessageWriter<ObjectRemoved>,
    mut refresh_writer: MessageWriter<MapRefreshRequested>,
) {
    let mut refresh = false;
    for msg in place_msgs.read() {
        let outline = config
            .editor
            .highlight_last_placed
            .then_some(HIGHLIGHT_COLOR);
        let (_, removed) =
            collection.spawn_object(msg.data.clone(), msg.resolve_conflicts, outline);
        if let Some(removed) = removed {
            removed_writer.write(ObjectRemoved {
                data: removed.data,
                reason: format!("与节拍 {} 的新对象冲突", msg.data.beat),
            });
        }
        refresh |= msg.refresh;
    }
    if refresh {
        refresh_writer.write(MapRefreshRequested);
    }
}

/// 记录被移除的对象
fn log_removed_objects(mut removed_msgs: MessageReader<ObjectRemoved>) {
    for msg in removed_msgs.read() {
        info!(
            "移除音符: beat={} index={} layer={}（{}）",
            msg.data.beat, msg.data.line_index, msg.data.line_layer, msg.reason
        );
    }
}

/// 处理刷新请求：同帧多次请求只重排一次
fn handle_refresh_requests(
    mut collection: ResMut<NoteCollection>,
    selection: Res<SelectionState>,
    mut refresh_msgs: MessageReader<MapRefreshRequested>,
) {
    if refresh_msgs.is_empty() {
        return;
    }
    refresh_msgs.clear();
    collection.sort_objects(&selection);
}

/// 将门限消息应用到集合的可见标志
///
/// 整体范围消息先于单点消息处理：范围重算发生在播放开始/跳转，
/// 单点消息是播放中的自然越线。
fn apply_gate_messages(
    mut collection: ResMut<NoteCollection>,
    mut range_msgs: MessageReader<ActiveRangeChanged>,
    mut spawn_msgs: MessageReader<ObjectPassedSpawnPoint>,
    mut despawn_msgs: MessageReader<ObjectPassedDespawnPoint>,
) {
    for msg in range_msgs.read() {
        collection.apply_active_range(msg.despawn_index, msg.spawn_index);
    }
    for msg in spawn_msgs.read() {
        collection.set_active(msg.index, true);
    }
    for msg in despawn_msgs.read() {
        collection.set_active(msg.index, false);
    }
}
