// api/url.rs - URL 过滤器状态
//! 地址栏中以 JSON 保存的过滤器
//!
//! 解码结果必须与等价 PQL 解析出的过滤器一致（键顺序除外）。

use crate::engine::{filter_to_tree, from_text, PqlResult};
use crate::query::{self, CanonicalFilter};

/// 过滤器 -> URL 中的 JSON 文本
pub fn encode_filters(filters: &CanonicalFilter) -> PqlResult<String> {
    Ok(serde_json::to_string(filters)?)
}

/// URL 中的 JSON 文本 -> 过滤器，空文本视为无过滤
pub fn decode_filters(json: &str) -> PqlResult<CanonicalFilter> {
    let json = json.trim();
    if json.is_empty() {
        return Ok(CanonicalFilter::new());
    }
    let filters: CanonicalFilter = serde_json::from_str(json)?;
    Ok(filters.normalized())
}

/// URL 中的 JSON 过滤器 -> 等价的 PQL
pub fn filters_json_to_pql(json: &str) -> PqlResult<String> {
    let filters = decode_filters(json)?;
    Ok(query::serialize(&filter_to_tree(&filters)))
}

/// PQL -> URL 中的 JSON 过滤器
pub fn pql_to_filters_json(pql: &str) -> PqlResult<String> {
    encode_filters(&from_text(pql)?.filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PqlError;

    #[test]
    fn test_json_and_pql_decode_to_same_filters() {
        let json = r#"{"donor":{"gender":{"is":["male","female"]},"age":{"is":[22]}}}"#;
        let pql = r#"and(eq(donor.age,22),in(donor.gender,"male","female"))"#;
        assert_eq!(decode_filters(json).unwrap(), from_text(pql).unwrap().filters);
    }

    #[test]
    fn test_json_pql_conversions() {
        let json = r#"{"donor":{"gender":{"is":["male"]}},"gene":{"id":{"is":["ENSG1","ENSG2"]}}}"#;
        let pql = filters_json_to_pql(json).unwrap();
        assert_eq!(pql, r#"and(eq(donor.gender,"male"),in(gene.id,"ENSG1","ENSG2"))"#);
        assert_eq!(pql_to_filters_json(&pql).unwrap(), json);
    }

    #[test]
    fn test_decode_empty_and_invalid() {
        assert!(decode_filters("").unwrap().is_empty());
        assert!(decode_filters("{}").unwrap().is_empty());
        assert!(matches!(decode_filters("{\"donor\":"), Err(PqlError::Json(_))));
        assert!(matches!(decode_filters(r#"{"donor":{"gender":"male"}}"#), Err(PqlError::Json(_))));
    }
}
