//! # Nebula Mapper 主程序

#![warn(missing_docs)]
#![warn(clippy::must_use_candidate)]
#![warn(clippy::must_use_unit)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::redundant_else)]
#![warn(clippy::redundant_feature_names)]

use bevy::{
    asset::{AssetPlugin, UnapprovedPathMode, io::AssetSourceBuilder},
    prelude::*,
};
use bevy_kira_audio::AudioPlugin as KiraAudioPlugin;
use clap::Parser;

use nebula_mapper::config::{Sys, load_sys};
use nebula_mapper::plugins::{
    ChunkLoadingPlugin, MapCheckPlugin, MapIoPlugin, NoteCollectionPlugin, NoteRendererPlugin,
    PlaybackClockPlugin, SongAudioPlugin, SpawnGatePlugin,
};
use nebula_mapper::resources::ExecArgs;
use nebula_mapper::schedule::SchedulePlugin;

fn main() {
    let args = ExecArgs::parse();
    let config = load_config(&args);

    // 检查模式下使用 MinimalPlugins，否则使用 DefaultPlugins
    if args.check_map {
        App::new()
            .insert_resource(args)
            .insert_resource(config)
            .add_plugins(MinimalPlugins)
            .add_plugins((
                SchedulePlugin,
                NoteCollectionPlugin,
                PlaybackClockPlugin,
                SpawnGatePlugin,
                ChunkLoadingPlugin,
                MapIoPlugin,
                MapCheckPlugin,
            ))
            .run();
        return;
    }

    // 正常模式下使用 DefaultPlugins
    let mut app = App::new();
    app.register_asset_source("fs", AssetSourceBuilder::platform_default(".", None));
    app.insert_resource(args)
        .insert_resource(config)
        .add_plugins(DefaultPlugins.set(AssetPlugin {
            unapproved_path_mode: UnapprovedPathMode::Deny,
            ..Default::default()
        }))
        .add_plugins(KiraAudioPlugin)
        .add_plugins((
            SchedulePlugin,
            NoteCollectionPlugin,
            PlaybackClockPlugin,
            SpawnGatePlugin,
            ChunkLoadingPlugin,
            MapIoPlugin,
            NoteRendererPlugin,
            SongAudioPlugin,
        ))
        .run();
}

/// 读取配置文件；未指定时直接使用默认配置，读取失败时警告后回退
fn load_config(args: &ExecArgs) -> Sys {
    let Some(config_path) = args.config.as_ref() else {
        return Sys::default();
    };
    load_sys(config_path).unwrap_or_else(|e| {
        eprintln!("配置读取失败，使用默认配置: {e:#}");
        Sys::default()
    })
}
