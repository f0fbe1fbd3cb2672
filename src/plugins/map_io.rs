//! 谱面文件处理插件
//!
//! 负责谱面文件的异步加载、装入集合，以及脏状态驱动的定时自动保存。

use std::path::{Path, PathBuf};

use anyhow::Result;
use bevy::{
    prelude::*,
    tasks::{IoTaskPool, Task, futures::check_ready},
};

use crate::beatmap::dat::{self, DatMap, DatNote};
use crate::beatmap::note::NoteData;
use crate::config::Sys;
use crate::plugins::note_collection::{
    EditSet, MapLoaded, MapRefreshRequested, NoteCollection, PlaceNote, PlacedNote,
};
use crate::plugins::playback_clock::PlayToggled;
use crate::resources::ExecArgs;
use crate::schedule::EditSchedule;

/// 谱面加载任务
#[derive(Resource)]
pub struct MapLoadTask {
    /// 后台解析任务
    task: Task<Result<(DatMap, Vec<NoteData>)>>,
    /// 正在加载的文件路径
    path: PathBuf,
}

/// 进行中的自动保存任务
#[derive(Resource)]
pub struct MapSaveTask(pub Task<Result<PathBuf>>);

/// 当前打开的谱面文件
///
/// 记录路径与非音符段，保存时与集合内容合并写出。
#[derive(Resource)]
pub struct MapDocument {
    /// 谱面文件路径
    pub path: PathBuf,
    /// 格式版本号
    pub version: String,
    /// 非音符段，保存时原样写回
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// 谱面文件处理插件
pub struct MapIoPlugin;

impl Plugin for MapIoPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, begin_map_load)
            .add_systems(
                EditSchedule,
                (poll_map_load_task, poll_map_save_task).in_set(EditSet::Io),
            )
            .add_systems(
                EditSchedule,
                (finish_map_load, autosave_map)
                    .chain()
                    .in_set(EditSet::Autosave),
            );
    }
}

/// 自动保存文件路径：与谱面同目录，扩展名换成 `autosave.dat`
#[must_use]
fn autosave_path(map_path: &Path) -> PathBuf {
    map_path.with_extension("autosave.dat")
}

/// 以当前集合内容生成待写出的谱面文件
///
/// 写出顺序始终为规范排序，与集合此刻是否整理过无关。
#[must_use]
fn snapshot_map(document: &MapDocument, collection: &NoteCollection) -> DatMap {
    let mut entries: Vec<&PlacedNote> = collection.notes().iter().collect();
    entries.sort_by(|a, b| a.data.grid_order(&b.data));
    let notes = entries
        .into_iter()
        .map(|note| DatNote::from_note_data(&note.data))
        .collect();
    DatMap::with_notes(document.version.clone(), notes, document.rest.clone())
}

/// 启动谱面文件加载
fn begin_map_load(mut commands: Commands, args: Res<ExecArgs>) {
    let Some(map_path) = args.map.clone() else {
        return;
    };
    let pool = IoTaskPool::get();
    let task = pool.spawn(dat::load_map(map_path.clone()));
    commands.insert_resource(MapLoadTask {
        task,
        path: map_path,
    });
}

/// 轮询加载任务；完成后把音符批量写入放置消息并请求整理
fn poll_map_load_task(
    mut commands: Commands,
    args: Res<ExecArgs>,
    task_res: Option<ResMut<MapLoadTask>>,
    mut place_msgs: MessageWriter<PlaceNote>,
    mut refresh_msgs: MessageWriter<MapRefreshRequested>,
    mut loaded_msgs: MessageWriter<MapLoaded>,
    mut play_msgs: MessageWriter<PlayToggled>,
) {
    let Some(mut task_res) = task_res else {
        return;
    };
    let Some(result) = check_ready(&mut task_res.task) else {
        return;
    };
    match result {
        Ok((map, notes)) => {
            println!(
                "✓ 谱面已加载: {} 个音符 ({})",
                notes.len(),
                task_res.path.display()
            );
            let count = notes.len();
            for data in notes {
                // 文件内容原样装入，不做冲突解决
                place_msgs.write(PlaceNote {
                    data,
                    resolve_conflicts: false,
                    refresh: false,
                });
            }
            refresh_msgs.write(MapRefreshRequested);
            loaded_msgs.write(MapLoaded { notes: count });
            if args.preview {
                play_msgs.write(PlayToggled(true));
            }
            commands.insert_resource(MapDocument {
                path: task_res.path.clone(),
                version: map.version,
                rest: map.rest,
            });
        }
        Err(e) => {
            eprintln!("谱面加载失败: {e:#}");
        }
    }
    commands.remove_resource::<MapLoadTask>();
}

/// 加载完成后清除脏标记：刚装入的谱面与磁盘一致
fn finish_map_load(
    mut collection: ResMut<NoteCollection>,
    mut loaded_msgs: MessageReader<MapLoaded>,
) {
    for msg in loaded_msgs.read() {
        collection.mark_saved();
        debug!("谱面装载完成，共 {} 个音符", msg.notes);
    }
}

/// 定时自动保存
///
/// 间隔为 0 时禁用；集合无改动或已有保存任务在途时跳过本轮。
fn autosave_map(
    mut commands: Commands,
    config: Res<Sys>,
    time: Res<Time>,
    document: Option<Res<MapDocument>>,
    mut collection: ResMut<NoteCollection>,
    save_task: Option<Res<MapSaveTask>>,
    mut timer: Local<f32>,
) {
    let interval = config.editor.autosave_interval_secs;
    if interval <= 0.0 {
        return;
    }
    *timer += time.delta_secs();
    if *timer < interval {
        return;
    }
    *timer = 0.0;

    let Some(document) = document else {
        return;
    };
    if save_task.is_some() || !collection.is_dirty() {
        return;
    }

    let map = snapshot_map(&document, &collection);
    let path = autosave_path(&document.path);
    let pool = IoTaskPool::get();
    let task = pool.spawn(async move {
        dat::save_map(&path, &map).await?;
        Ok(path)
    });
    commands.insert_resource(MapSaveTask(task));
    // 快照已捕获当前内容，之后的编辑会重新置脏
    collection.mark_saved();
}

/// 轮询保存任务并汇报结果
fn poll_map_save_task(
    mut commands: Commands,
    mut collection: ResMut<NoteCollection>,
    task_res: Option<ResMut<MapSaveTask>>,
) {
    let Some(mut task_res) = task_res else {
        return;
    };
    let Some(result) = check_ready(&mut task_res.0) else {
        return;
    };
    match result {
        Ok(path) => println!("✓ 自动保存完成: {}", path.display()),
        Err(e) => {
            eprintln!("自动保存失败: {e:#}");
            // 磁盘内容未更新，恢复脏标志让下一轮重试
            collection.mark_dirty();
        }
    }
    commands.remove_resource::<MapSaveTask>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::note::{CutDirection, NoteKind};

    #[test]
    fn test_autosave_path_replaces_extension() {
        assert_eq!(
            autosave_path(Path::new("maps/Expert.dat")),
            PathBuf::from("maps/Expert.autosave.dat")
        );
        assert_eq!(
            autosave_path(Path::new("Expert")),
            PathBuf::from("Expert.autosave.dat")
        );
    }

    #[test]
    fn test_snapshot_preserves_document_sections() {
        let mut rest = serde_json::Map::new();
        rest.insert("_events".to_string(), serde_json::Value::Array(Vec::new()));
        let document = MapDocument {
            path: PathBuf::from("Expert.dat"),
            version: "2.0.0".to_string(),
            rest,
        };

        let mut collection = NoteCollection::default();
        collection.spawn_object(
            NoteData::new(2.0, 1, 0, NoteKind::Left, CutDirection::Down),
            false,
            None,
        );
        collection.spawn_object(
            NoteData::new(1.0, 0, 0, NoteKind::Right, CutDirection::Up),
            false,
            None,
        );

        // 集合尚未整理，快照仍按规范排序写出
        let map = snapshot_map(&document, &collection);
        assert_eq!(map.version, "2.0.0");
        assert_eq!(map.notes.len(), 2);
        let first = map.notes.first().expect("有音符");
        assert!((first.time - 1.0).abs() < f32::EPSILON);
        assert!(map.rest.contains_key("_events"));
    }
}
