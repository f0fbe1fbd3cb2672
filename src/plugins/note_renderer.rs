//! 音符渲染插件
//!
//! 负责音符实体的生成与回收、集合可见标志到 `Visibility` 的镜像、
//! 共享材质的播放状态着色，以及描边/挥动方向的辅助线绘制。
//!
//! 同类型音符共用一份 `ColorMaterial`：改一份材质即改到所有实体。

use bevy::color::Luminance;
use bevy::prelude::*;

use crate::beatmap::note::{NoteData, NoteKind};
use crate::components::NoteMarker;
use crate::config::{Grid, Sys};
use crate::plugins::note_collection::NoteCollection;
use crate::plugins::playback_clock::{PlayToggled, PlaybackState};
use crate::resources::ExecArgs;
use crate::schedule::RenderSchedule;

/// 行高
const ROW_HEIGHT: f32 = 26.0;
/// 行间距
const ROW_GAP: f32 = 4.0;
/// 每节拍的横向像素数
const BEAT_WIDTH: f32 = 110.0;
/// 播放头的 X 坐标
const PLAYHEAD_X: f32 = -360.0;
/// 音符四边形边长
const NOTE_SIZE: f32 = 22.0;
/// 背景条带宽度
const VIEW_WIDTH: f32 = 1400.0;
/// 描边相对音符的外扩量
const OUTLINE_MARGIN: f32 = 4.0;
/// 挥动方向箭头长度
const ARC_LENGTH: f32 = 18.0;
/// 挥动方向箭头颜色
const ARC_COLOR: Color = Color::srgb(1.0, 0.85, 0.3);
/// 停止状态下基准色的提亮量
const EDITOR_LIGHTEN: f32 = 0.12;

/// 共享渲染资源缓存
///
/// 每种音符类型一份共享材质、全体音符一份共享网格；
/// 基准色是播放状态着色的输入。
#[derive(Resource, Default)]
pub struct NoteAppearance {
    /// 左手音符共享材质
    pub left: Option<Handle<ColorMaterial>>,
    /// 右手音符共享材质
    pub right: Option<Handle<ColorMaterial>>,
    /// 炸弹共享材质
    pub bomb: Option<Handle<ColorMaterial>>,
    /// 音符四边形共享网格
    pub quad: Option<Handle<Mesh>>,
    /// 左手基准色
    pub left_base: Color,
    /// 右手基准色
    pub right_base: Color,
    /// 炸弹基准色
    pub bomb_base: Color,
}

impl NoteAppearance {
    /// 指定类型的共享材质
    #[must_use]
    pub fn handle_for(&self, kind: NoteKind) -> Option<Handle<ColorMaterial>> {
        match kind {
            NoteKind::Left => self.left.clone(),
            NoteKind::Right => self.right.clone(),
            NoteKind::Bomb => self.bomb.clone(),
        }
    }

    /// 缓存的材质句柄与对应基准色
    fn entries(&self) -> impl Iterator<Item = (&Handle<ColorMaterial>, Color)> {
        [
            (self.left.as_ref(), self.left_base),
            (self.right.as_ref(), self.right_base),
            (self.bomb.as_ref(), self.bomb_base),
        ]
        .into_iter()
        .filter_map(|(handle, base)| handle.map(|h| (h, base)))
    }

    /// 将播放状态广播到缓存的所有共享材质
    ///
    /// 尚未载入的材质直接跳过。
    pub fn apply_play_state(&self, playing: bool, materials: &mut Assets<ColorMaterial>) {
        for (handle, base) in self.entries() {
            let Some(material) = materials.get_mut(handle) else {
                continue;
            };
            material.color = editor_shade(base, playing);
        }
    }

    /// 更新左右手基准色并立即按当前播放状态重染材质
    pub fn update_color(
        &mut self,
        left: Color,
        right: Color,
        playing: bool,
        materials: &mut Assets<ColorMaterial>,
    ) {
        self.left_base = left;
        self.right_base = right;
        self.apply_play_state(playing, materials);
    }
}

/// 挥动方向可视化开关
#[derive(Resource, Default)]
pub struct ArcVisualizerState {
    /// 是否绘制方向箭头
    pub show: bool,
}

/// 更新左右手音符基准色
#[derive(Message, Clone, Copy, Debug)]
pub struct NoteColorsChanged {
    /// 左手（红色）基准色
    pub left: Color,
    /// 右手（蓝色）基准色
    pub right: Color,
}

/// 切换挥动方向可视化
#[derive(Message, Clone, Copy, Debug)]
pub struct ToggleArcVisualizer;

/// 音符渲染插件
pub struct NoteRendererPlugin;

impl Plugin for NoteRendererPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NoteAppearance>()
            .init_resource::<ArcVisualizerState>()
            .add_message::<NoteColorsChanged>()
            .add_message::<ToggleArcVisualizer>()
            .add_systems(Startup, (setup_editor_scene, install_note_materials))
            .add_systems(
                RenderSchedule,
                (
                    sync_note_entities,
                    update_note_transforms,
                    mirror_visibility,
                    apply_play_state_to_materials,
                    handle_color_updates,
                    handle_arc_toggles,
                    draw_note_gizmos,
                )
                    .chain(),
            )
            .add_systems(RenderSchedule, print_editor_status);
    }
}

/// 编辑/播放着色：播放中用基准色，停止时提亮为编辑色
#[must_use]
fn editor_shade(base: Color, playing: bool) -> Color {
    if playing {
        base
    } else {
        base.lighter(EDITOR_LIGHTEN)
    }
}

/// 音符行号：每条轨道按层展开
const fn grid_row(line_index: i32, line_layer: i32, layers: i32) -> i32 {
    line_index * layers + line_layer
}

/// 行的 Y 坐标（网格纵向居中）
const fn row_y(row: i32, grid: &Grid) -> f32 {
    let rows = grid.lanes * grid.layers;
    let total = rows as f32 * (ROW_HEIGHT + ROW_GAP) - ROW_GAP;
    -total / 2.0 + ROW_HEIGHT / 2.0 + row as f32 * (ROW_HEIGHT + ROW_GAP)
}

/// 音符数据对应的 Y 坐标
const fn note_row_y(data: &NoteData, grid: &Grid) -> f32 {
    row_y(grid_row(data.line_index, data.line_layer, grid.layers), grid)
}

/// 节拍相对播放头的 X 坐标
const fn beat_x(beat: f32, current_beat: f32) -> f32 {
    PLAYHEAD_X + (beat - current_beat) * BEAT_WIDTH
}

/// 搭建编辑器场景：相机、轨道背景条带与播放头
fn setup_editor_scene(mut commands: Commands, config: Res<Sys>) {
    commands.spawn((Camera2d, Transform::default(), GlobalTransform::default()));

    let grid = &config.grid;
    let strip_height = grid.layers as f32 * (ROW_HEIGHT + ROW_GAP) - ROW_GAP;
    for lane in 0..grid.lanes {
        let first = row_y(grid_row(lane, 0, grid.layers), grid);
        let last = row_y(grid_row(lane, grid.layers - 1, grid.layers), grid);
        commands.spawn((
            Sprite {
                color: Color::srgb(0.15, 0.15, 0.18),
                custom_size: Some(Vec2::new(VIEW_WIDTH, strip_height)),
                ..Default::default()
            },
            Transform::from_xyz(0.0, (first + last) / 2.0, 0.0),
            GlobalTransform::default(),
            Visibility::default(),
            InheritedVisibility::default(),
        ));
    }

    let rows = grid.lanes * grid.layers;
    let grid_height = rows as f32 * (ROW_HEIGHT + ROW_GAP) + ROW_GAP;
    commands.spawn((
        Sprite {
            color: Color::srgb(0.9, 0.9, 0.9),
            custom_size: Some(Vec2::new(4.0, grid_height)),
            ..Default::default()
        },
        Transform::from_xyz(PLAYHEAD_X, 0.0, 1.0),
        GlobalTransform::default(),
        Visibility::default(),
        InheritedVisibility::default(),
    ));
}

/// 装配共享网格与材质，并从配置色发出首次染色消息
fn install_note_materials(
    args: Res<ExecArgs>,
    config: Res<Sys>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut appearance: ResMut<NoteAppearance>,
    mut arcs: ResMut<ArcVisualizerState>,
    mut color_writer: MessageWriter<NoteColorsChanged>,
) {
    let left = Color::srgb_from_array(config.colors.left);
    let right = Color::srgb_from_array(config.colors.right);
    let bomb = Color::srgb_from_array(config.colors.bomb);

    appearance.quad = Some(meshes.add(Rectangle::new(NOTE_SIZE, NOTE_SIZE)));
    appearance.left = Some(materials.add(ColorMaterial::from(editor_shade(left, false))));
    appearance.right = Some(materials.add(ColorMaterial::from(editor_shade(right, false))));
    appearance.bomb = Some(materials.add(ColorMaterial::from(editor_shade(bomb, false))));
    appearance.bomb_base = bomb;
    arcs.show = args.show_arcs;

    color_writer.write(NoteColorsChanged { left, right });
    println!("✓ 共享音符材质已装配");
}

/// 为新条目生成实体、回收已删除条目的实体
fn sync_note_entities(
    mut commands: Commands,
    config: Res<Sys>,
    appearance: Res<NoteAppearance>,
    mut collection: ResMut<NoteCollection>,
) {
    for entity in collection.take_pending_despawns() {
        commands.entity(entity).despawn();
    }
    let Some(quad) = appearance.quad.clone() else {
        return;
    };
    for note in collection.notes_mut() {
        if note.entity.is_some() {
            continue;
        }
        let Some(material) = appearance.handle_for(note.data.kind) else {
            continue;
        };
        let entity = commands
            .spawn((
                Mesh2d(quad.clone()),
                MeshMaterial2d(material),
                Transform::from_xyz(0.0, note_row_y(&note.data, &config.grid), 2.0),
                GlobalTransform::default(),
                Visibility::Hidden,
                InheritedVisibility::default(),
                NoteMarker,
            ))
            .id();
        note.entity = Some(entity);
    }
}

/// 按播放头位置更新音符实体的变换
fn update_note_transforms(
    config: Res<Sys>,
    state: Res<PlaybackState>,
    collection: Res<NoteCollection>,
    mut q_notes: Query<&mut Transform, With<NoteMarker>>,
) {
    for note in collection.notes() {
        let Some(entity) = note.entity else {
            continue;
        };
        let Ok(mut tf) = q_notes.get_mut(entity) else {
            continue;
        };
        tf.translation.x = beat_x(note.data.beat, state.current_beat());
        tf.translation.y = note_row_y(&note.data, &config.grid);
    }
}

/// 将集合的可见标志镜像到实体的 `Visibility`
fn mirror_visibility(
    collection: Res<NoteCollection>,
    mut q_notes: Query<&mut Visibility, With<NoteMarker>>,
) {
    for note in collection.notes() {
        let Some(entity) = note.entity else {
            continue;
        };
        let Ok(mut visibility) = q_notes.get_mut(entity) else {
            continue;
        };
        *visibility = if note.active {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
    }
}

/// 播放开关时把布尔状态广播到共享材质
fn apply_play_state_to_materials(
    appearance: Res<NoteAppearance>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut toggle_msgs: MessageReader<PlayToggled>,
) {
    for msg in toggle_msgs.read() {
        appearance.apply_play_state(msg.0, &mut materials);
    }
}

/// 处理基准色更新
fn handle_color_updates(
    state: Res<PlaybackState>,
    mut appearance: ResMut<NoteAppearance>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut color_msgs: MessageReader<NoteColorsChanged>,
) {
    for msg in color_msgs.read() {
        appearance.update_color(msg.left, msg.right, state.is_playing(), &mut materials);
    }
}

/// 处理挥动方向可视化开关
fn handle_arc_toggles(
    mut arcs: ResMut<ArcVisualizerState>,
    mut toggle_msgs: MessageReader<ToggleArcVisualizer>,
) {
    for _ in toggle_msgs.read() {
        arcs.show = !arcs.show;
        info!("挥动方向可视化: {}", arcs.show);
    }
}

/// 绘制描边与挥动方向箭头
fn draw_note_gizmos(
    mut gizmos: Gizmos,
    config: Res<Sys>,
    state: Res<PlaybackState>,
    arcs: Res<ArcVisualizerState>,
    collection: Res<NoteCollection>,
) {
    for note in collection.notes() {
        if !note.active {
            continue;
        }
        let x = beat_x(note.data.beat, state.current_beat());
        let y = note_row_y(&note.data, &config.grid);
        if let Some(color) = note.outline {
            gizmos.rect_2d(
                Isometry2d::from_translation(Vec2::new(x, y)),
                Vec2::splat(NOTE_SIZE + OUTLINE_MARGIN),
                color,
            );
        }
        if arcs.show
            && note.data.kind.is_color_note()
            && let Some((dx, dy)) = note.data.cut_direction.swing_vector()
        {
            let start = Vec2::new(x, y);
            gizmos.arrow_2d(start, start + Vec2::new(dx, dy) * ARC_LENGTH, ARC_COLOR);
        }
    }
}

/// 周期性输出编辑器状态
fn print_editor_status(
    state: Res<PlaybackState>,
    collection: Res<NoteCollection>,
    time: Res<Time>,
    mut timer: Local<f32>,
) {
    *timer += time.delta_secs();
    if *timer >= 5.0 {
        *timer = 0.0;
        let active = collection.notes().iter().filter(|n| n.active).count();
        println!(
            "📊 编辑器状态 | beat: {:.2} | 可见: {} | 总数: {} | 播放中: {}",
            state.current_beat(),
            active,
            collection.len(),
            state.is_playing()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_shade_uses_base_while_playing() {
        let base = Color::srgb(0.78, 0.15, 0.15);
        assert_eq!(editor_shade(base, true), base);
        // 停止时提亮，与基准色不同
        assert_ne!(editor_shade(base, false), base);
    }

    #[test]
    fn test_apply_play_state_skips_missing_assets() {
        let mut materials = Assets::<ColorMaterial>::default();
        let base = Color::srgb(0.2, 0.4, 0.8);
        let left = materials.add(ColorMaterial::from(Color::WHITE));
        let dangling = materials.add(ColorMaterial::from(Color::WHITE));
        materials.remove(&dangling);

        let appearance = NoteAppearance {
            left: Some(left.clone()),
            right: Some(dangling),
            left_base: base,
            right_base: base,
            ..Default::default()
        };
        // 缺失的材质被跳过，不会中断广播
        appearance.apply_play_state(true, &mut materials);
        let color = materials.get(&left).map(|m| m.color);
        assert_eq!(color, Some(base));
    }

    #[test]
    fn test_update_color_recolors_both_hands() {
        let mut materials = Assets::<ColorMaterial>::default();
        let left = materials.add(ColorMaterial::from(Color::WHITE));
        let right = materials.add(ColorMaterial::from(Color::WHITE));
        let mut appearance = NoteAppearance {
            left: Some(left.clone()),
            right: Some(right.clone()),
            ..Default::default()
        };

        let red = Color::srgb(0.9, 0.1, 0.1);
        let blue = Color::srgb(0.1, 0.2, 0.9);
        appearance.update_color(red, blue, true, &mut materials);
        assert_eq!(materials.get(&left).map(|m| m.color), Some(red));
        assert_eq!(materials.get(&right).map(|m| m.color), Some(blue));
    }

    #[test]
    fn test_grid_rows_expand_layers_per_lane() {
        assert_eq!(grid_row(0, 0, 3), 0);
        assert_eq!(grid_row(0, 2, 3), 2);
        assert_eq!(grid_row(1, 0, 3), 3);
        assert_eq!(grid_row(3, 2, 3), 11);
    }

    #[test]
    fn test_arc_toggle_flips_state() {
        let mut app = App::new();
        app.add_message::<ToggleArcVisualizer>()
            .init_resource::<ArcVisualizerState>()
            .add_systems(Update, handle_arc_toggles);
        app.world_mut().write_message(ToggleArcVisualizer);
        app.update();
        assert!(app.world().resource::<ArcVisualizerState>().show);
        app.world_mut().write_message(ToggleArcVisualizer);
        app.update();
        assert!(!app.world().resource::<ArcVisualizerState>().show);
    }
}
