// engine/projection.rs - 投影管理
//! 维护可投影的关联字段白名单，修改 PQL 中的 select / facets

use log::debug;

use super::core::{from_text, to_text, PqlResult};
use crate::config::CONFIG;
use crate::query::WILDCARD;

/// 投影管理器
#[derive(Debug, Clone)]
pub struct ProjectionManager {
    whitelist: Vec<String>,
}

impl ProjectionManager {
    pub fn new(whitelist: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { whitelist: whitelist.into_iter().map(Into::into).collect() }
    }

    /// 使用全局配置中的白名单
    pub fn from_config() -> Self {
        Self::new(CONFIG.projection.whitelist.iter().cloned())
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    pub fn is_projectable(&self, field: &str) -> bool {
        field != WILDCARD && self.whitelist.iter().any(|w| w == field)
    }

    pub fn add_projection(&self, pql: &str, field: &str) -> PqlResult<String> {
        self.add_projections(pql, &[field])
    }

    /// 只保留白名单内的字段；一个都不剩时原样返回输入
    pub fn add_projections(&self, pql: &str, fields: &[&str]) -> PqlResult<String> {
        let accepted: Vec<&str> = fields.iter().copied().filter(|f| self.is_projectable(f)).collect();
        if accepted.is_empty() {
            debug!("no projectable fields in {:?}", fields);
            return Ok(pql.to_string());
        }

        let mut query = from_text(pql)?;
        // 通配符只由 select_all 表达，不能混进自定义投影
        query.params.custom_selects.retain(|s| s != WILDCARD);
        for field in accepted {
            if !query.params.custom_selects.iter().any(|s| s == field) {
                query.params.custom_selects.push(field.to_string());
            }
        }
        Ok(to_text(&query))
    }

    pub fn remove_projection(&self, pql: &str, field: &str) -> PqlResult<String> {
        let mut query = from_text(pql)?;
        let before = query.params.custom_selects.len();
        query.params.custom_selects.retain(|s| s != field);
        if query.params.custom_selects.len() == before {
            return Ok(pql.to_string());
        }
        // 去掉最后一个自定义投影后回到默认投影
        if query.params.custom_selects.is_empty() {
            query.params.select_all = true;
        }
        Ok(to_text(&query))
    }
}

impl Default for ProjectionManager {
    fn default() -> Self {
        Self::from_config()
    }
}

/// 打开 facets 聚合
pub fn includes_facets(pql: &str) -> PqlResult<String> {
    let mut query = from_text(pql)?;
    query.params.facets = true;
    Ok(to_text(&query))
}
