// 配置模块 - 支持外部配置文件
use anyhow::{Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 配置文件路径
const CONFIG_FILE: &str = "./pql.toml";

// ============== 配置结构体 ==============

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PqlConfig {
    pub projection: ProjectionConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProjectionConfig {
    /// 允许通过 select() 投影的关联字段
    pub whitelist: Vec<String>,
}

// ============== 默认配置 ==============

impl Default for PqlConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig {
                whitelist: vec![
                    "transcripts".to_string(),
                    "consequences".to_string(),
                    "occurrences".to_string(),
                    "specimen".to_string(),
                    "observation".to_string(),
                    "projects".to_string(),
                ],
            },
        }
    }
}

// ============== 配置加载 ==============

impl PqlConfig {
    /// 从配置文件加载，失败则使用默认配置
    pub fn load() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_else(|e| {
            warn!("[Config] 无法加载配置文件 '{}': {:#}", CONFIG_FILE, e);
            warn!("[Config] 使用默认配置");
            Self::default()
        })
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: PqlConfig = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// 生成默认配置文件
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let default_content = include_str!("../pql.toml");
        fs::write(path, default_content)?;
        Ok(())
    }
}

// ============== 全局配置实例 ==============

/// 全局配置实例 (懒加载)
pub static CONFIG: Lazy<PqlConfig> = Lazy::new(|| {
    let config = PqlConfig::load();
    info!("[Config] 配置已加载，可投影字段: {:?}", config.projection.whitelist);
    config
});
