// query/mod.rs - 查询模块
//! PQL 语法、语法树类型和过滤器操作

mod parser;
pub mod filter;
pub mod types;

pub use parser::*;
pub use filter::*;
pub use types::*;
