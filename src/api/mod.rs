// api/mod.rs - API 模块
//! REST 查询参数和 URL 过滤器状态

pub mod request;
pub mod url;

pub use request::*;
pub use url::*;
