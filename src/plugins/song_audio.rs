//! 歌曲音频插件
//!
//! 负责歌曲音轨的加载，并随播放开关启停。

use bevy::{asset::AssetPath, prelude::*};
use bevy_kira_audio::{AudioApp, AudioChannel, AudioControl, AudioSource as KiraAudioSource};

use crate::plugins::playback_clock::PlayToggled;
use crate::resources::ExecArgs;
use crate::schedule::AudioSchedule;

/// 歌曲音轨通道标记
#[derive(Resource)]
pub struct SongChannel;

/// 歌曲音轨状态
#[derive(Resource, Default)]
pub struct SongTrack {
    /// 音轨句柄
    pub handle: Option<Handle<KiraAudioSource>>,
    /// 是否已警告资源未就绪
    warned_missing: bool,
}

/// 歌曲音频插件
pub struct SongAudioPlugin;

impl Plugin for SongAudioPlugin {
    fn build(&self, app: &mut App) {
        app.add_audio_channel::<SongChannel>()
            .init_resource::<SongTrack>()
            .add_systems(Startup, load_song_track)
            .add_systems(AudioSchedule, sync_song_playback);
    }
}

/// 启动歌曲音轨加载
fn load_song_track(
    args: Res<ExecArgs>,
    asset_server: Res<AssetServer>,
    mut track: ResMut<SongTrack>,
) {
    let Some(song_path) = args.song.as_ref() else {
        return;
    };
    let asset_str = format!("fs://{}", song_path.to_string_lossy());
    let ap = AssetPath::parse(&asset_str);
    track.handle = Some(asset_server.load_override(ap));
    println!("✓ 歌曲音轨开始加载: {}", song_path.display());
}

/// 随播放开关启停歌曲
///
/// 音轨尚未载入时跳过播放并警告一次，不阻塞编辑器其余部分。
fn sync_song_playback(
    mut track: ResMut<SongTrack>,
    assets: Res<Assets<KiraAudioSource>>,
    channel: Res<AudioChannel<SongChannel>>,
    mut toggle_msgs: MessageReader<PlayToggled>,
) {
    for msg in toggle_msgs.read() {
        if !msg.0 {
            channel.stop();
            continue;
        }
        let Some(handle) = track.handle.clone() else {
            continue;
        };
        if assets.get(&handle).is_none() {
            if !track.warned_missing {
                eprintln!("歌曲音轨尚未载入，本次播放无音频");
                track.warned_missing = true;
            }
            continue;
        }
        track.warned_missing = false;
        channel.play(handle);
    }
}
