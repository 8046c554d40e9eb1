// engine/builder.rs - PQL 构建器
//! 使用 Builder 模式在 PQL 字符串上连续应用过滤器修改
//!
//! 每一步都会 解析 -> 修改 filters -> 重新序列化，解析错误直接向上传播。

use log::debug;

use super::core::{from_text, to_text, PqlResult};
use crate::query::{self, CanonicalFilter, FilterMutation, Scalar};

/// PQL 构建器
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PqlBuilder {
    pql: String,
}

impl PqlBuilder {
    pub fn new(pql: impl Into<String>) -> Self {
        Self { pql: pql.into() }
    }

    /// 当前的 PQL 文本
    pub fn pql(&self) -> &str {
        &self.pql
    }

    fn update<F>(mut self, mutate: F) -> PqlResult<Self>
    where
        F: FnOnce(&CanonicalFilter) -> CanonicalFilter,
    {
        let mut query = from_text(&self.pql)?;
        query.filters = mutate(&query.filters);
        self.pql = to_text(&query);
        debug!("builder pql: {}", self.pql);
        Ok(self)
    }

    pub fn add_term(self, category: &str, facet: &str, term: impl Into<Scalar>) -> PqlResult<Self> {
        let term = term.into();
        self.update(|filters| query::add_term(category, facet, &term, filters))
    }

    pub fn add_terms(self, category: &str, facet: &str, terms: &[Scalar]) -> PqlResult<Self> {
        self.update(|filters| query::add_multiple_terms(category, facet, terms, filters))
    }

    pub fn remove_term(self, category: &str, facet: &str, term: impl Into<Scalar>) -> PqlResult<Self> {
        let term = term.into();
        self.update(|filters| query::remove_term(category, facet, &term, filters))
    }

    pub fn remove_facet(self, category: &str, facet: &str) -> PqlResult<Self> {
        self.update(|filters| query::remove_facet(category, facet, filters))
    }

    pub fn overwrite(self, category: &str, facet: &str, term: impl Into<Scalar>) -> PqlResult<Self> {
        let term = term.into();
        self.update(|filters| query::overwrite(category, facet, &term, filters))
    }

    pub fn overwrite_terms(self, category: &str, facet: &str, terms: &[Scalar]) -> PqlResult<Self> {
        self.update(|filters| query::overwrite_terms(category, facet, terms, filters))
    }

    pub fn toggle_term(self, category: &str, facet: &str, term: impl Into<Scalar>) -> PqlResult<Self> {
        let term = term.into();
        self.update(|filters| query::toggle_term(category, facet, &term, filters))
    }

    /// 应用一个带目标字段的修改
    pub fn apply(self, mutation: &FilterMutation) -> PqlResult<Self> {
        self.update(|filters| mutation.apply(filters).filter)
    }

    /// 返回最终的 PQL 文本
    pub fn build(self) -> String {
        self.pql
    }
}
