// api/request.rs - REST 查询参数
//! 将查询对象转换为 REST 查询层需要的参数

use serde::{Deserialize, Serialize};

use crate::engine::{from_text, PqlResult};
use crate::query::{CanonicalFilter, QueryObject};

/// REST 请求参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestQuery {
    /// 规范过滤器（JSON 形式传给服务端）
    pub filters: CanonicalFilter,

    /// 排序，逗号分隔的带符号字段，例如 "+donor.age,-donor.gender"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// 跳过的结果数量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,

    /// 返回结果数量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// 额外返回的关联字段，facets 开启时包含 "facets"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

impl RestQuery {
    pub fn from_query(query: &QueryObject) -> Self {
        let params = &query.params;

        let sort = if params.sort.is_empty() {
            None
        } else {
            let specs: Vec<String> = params.sort.iter().map(|s| s.to_string()).collect();
            Some(specs.join(","))
        };

        let mut include = params.custom_selects.clone();
        if params.facets {
            include.push("facets".to_string());
        }

        Self {
            filters: query.filters.clone(),
            sort,
            from: params.limit.from,
            size: params.limit.size,
            include,
        }
    }

    pub fn from_pql(pql: &str) -> PqlResult<Self> {
        Ok(Self::from_query(&from_text(pql)?))
    }

    /// 转换为 URL 查询参数对，空值不输出
    pub fn to_query_pairs(&self) -> PqlResult<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        if !self.filters.is_empty() {
            pairs.push(("filters".to_string(), serde_json::to_string(&self.filters)?));
        }
        if let Some(ref sort) = self.sort {
            pairs.push(("sort".to_string(), sort.clone()));
        }
        if let Some(from) = self.from {
            pairs.push(("from".to_string(), from.to_string()));
        }
        if let Some(size) = self.size {
            pairs.push(("size".to_string(), size.to_string()));
        }
        if !self.include.is_empty() {
            pairs.push(("include".to_string(), self.include.join(",")));
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_query_from_pql() {
        let rest = RestQuery::from_pql(
            r#"select(*),select(transcripts),facets(*),eq(donor.gender,"male"),sort(+donor.age,-donor.id),limit(10,20)"#,
        )
        .unwrap();
        assert_eq!(rest.sort.as_deref(), Some("+donor.age,-donor.id"));
        assert_eq!(rest.from, Some(10));
        assert_eq!(rest.size, Some(20));
        assert_eq!(rest.include, vec!["transcripts", "facets"]);

        let pairs = rest.to_query_pairs().unwrap();
        assert_eq!(pairs[0], ("filters".to_string(), r#"{"donor":{"gender":{"is":["male"]}}}"#.to_string()));
        assert_eq!(pairs.len(), 5);
    }

    #[test]
    fn test_empty_rest_query() {
        let rest = RestQuery::from_pql("").unwrap();
        assert_eq!(rest, RestQuery::default());
        assert!(rest.to_query_pairs().unwrap().is_empty());
        assert_eq!(serde_json::to_string(&rest).unwrap(), r#"{"filters":{}}"#);
    }
}
