//! 谱面数据模块入口
//!
//! 提供两个子模块：
//! - `note`：音符领域类型、排序键与冲突键
//! - `dat`：v2 `.dat` 谱面文件的解析与写出

pub mod dat;
pub mod note;
