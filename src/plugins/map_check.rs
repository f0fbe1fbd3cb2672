//! 谱面检查插件
//!
//! `--check-map` 无界面模式：等待谱面装入并整理完成，
//! 输出检查报告后退出进程。

use bevy::app::AppExit;
use bevy::prelude::*;

use crate::plugins::map_io::{MapDocument, MapLoadTask};
use crate::plugins::note_collection::{EditSet, NoteCollection};
use crate::resources::ExecArgs;
use crate::schedule::EditSchedule;

/// 谱面检查插件
pub struct MapCheckPlugin;

impl Plugin for MapCheckPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, require_map_argument)
            .add_systems(EditSchedule, report_and_exit.in_set(EditSet::Autosave));
    }
}

/// 检查模式必须指定谱面文件
fn require_map_argument(args: Res<ExecArgs>, mut exit: MessageWriter<AppExit>) {
    if args.map.is_none() {
        eprintln!("谱面检查需要 --map 指定谱面文件");
        exit.write(AppExit::error());
    }
}

/// 装载完成后输出检查报告并退出
///
/// 集合在同一帧内已完成放置与整理，报告直接读取最终状态。
fn report_and_exit(
    args: Res<ExecArgs>,
    document: Option<Res<MapDocument>>,
    load_task: Option<Res<MapLoadTask>>,
    collection: Res<NoteCollection>,
    mut exit: MessageWriter<AppExit>,
) {
    if args.map.is_none() || load_task.is_some() {
        return;
    }
    if document.is_none() {
        // 任务已结束但没有产出文件：加载失败
        eprintln!("谱面检查失败: 谱面未能加载");
        exit.write(AppExit::error());
        return;
    }

    let total = collection.len();
    let conflicts = collection.count_conflicts();
    let dense = collection
        .notes()
        .iter()
        .enumerate()
        .all(|(index, note)| note.id == index as u32);
    println!(
        "📊 谱面检查 | 音符: {} | 冲突: {} | ID 连续: {}",
        total,
        conflicts,
        if dense { "是" } else { "否" }
    );
    if let (Some(first), Some(last)) = (collection.notes().first(), collection.notes().last()) {
        println!("📊 节拍范围: {:.2} .. {:.2}", first.data.beat, last.data.beat);
    }
    exit.write(AppExit::Success);
}
