//! 插件模块
//!
//! 包含所有功能插件的实现

pub mod chunk_loading;
pub mod map_check;
pub mod map_io;
pub mod note_collection;
pub mod note_renderer;
pub mod playback_clock;
pub mod song_audio;
pub mod spawn_gate;

pub use chunk_loading::ChunkLoadingPlugin;
pub use map_check::MapCheckPlugin;
pub use map_io::MapIoPlugin;
pub use note_collection::NoteCollectionPlugin;
pub use note_renderer::NoteRendererPlugin;
pub use playback_clock::PlaybackClockPlugin;
pub use song_audio::SongAudioPlugin;
pub use spawn_gate::SpawnGatePlugin;
