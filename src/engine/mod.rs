// engine/mod.rs - 查询转换层
//! 文本、语法树与查询对象之间的转换、合并和构建

pub mod core;
pub mod merge;
pub mod projection;
pub mod builder;

pub use self::core::*;
pub use merge::*;
pub use projection::*;
pub use builder::*;
