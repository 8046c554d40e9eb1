// engine/merge.rs - 查询合并
//! 合并来自不同界面入口（高级搜索、实体集合、外部链接）的查询
//!
//! 冲突规则：从左到右合并，后者覆盖前者。
//! 过滤器中某个 facet 的 `is` 数组整体替换，不做并集
//! （与 `add_multiple_terms` 的并集语义相反）。

use indexmap::IndexSet;
use log::debug;
use serde_json::{Map, Value};

use super::core::{from_text, to_text, PqlResult};
use crate::query::{CanonicalFilter, QueryObject, QueryParams};

/// 通用 JSON 深度合并
///
/// 非对象参数被丢弃；没有对象时返回 `{}`，只有一个时原样返回。
pub fn merge_values(values: &[Value]) -> Value {
    let objects: Vec<&Value> = values.iter().filter(|v| v.is_object()).collect();
    match objects.as_slice() {
        [] => Value::Object(Map::new()),
        [only] => (*only).clone(),
        _ => objects
            .iter()
            .fold(Value::Object(Map::new()), |acc, value| deep_merge(acc, value)),
    }
}

fn deep_merge(mut base: Value, overlay: &Value) -> Value {
    let (Value::Object(base_map), Value::Object(overlay_map)) = (&mut base, overlay) else {
        return overlay.clone();
    };
    for (key, value) in overlay_map {
        match base_map.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                let taken = existing.take();
                *existing = deep_merge(taken, value);
            }
            // 标量和数组：后者整体覆盖
            Some(existing) => *existing = value.clone(),
            None => {
                base_map.insert(key.clone(), value.clone());
            }
        }
    }
    base
}

/// 合并规范过滤器，同一 facet 的取值以后者为准
pub fn merge_filters(filters: &[CanonicalFilter]) -> CanonicalFilter {
    let mut merged = CanonicalFilter::new();
    for filter in filters {
        for (category, facets) in filter.iter() {
            for (facet, terms) in facets {
                merged.set_terms(category, facet, terms.clone());
            }
        }
    }
    merged
}

/// 合并查询对象
pub fn merge_queries(queries: &[QueryObject]) -> Option<QueryObject> {
    match queries {
        [] => None,
        [only] => Some(only.clone()),
        _ => {
            let filters: Vec<CanonicalFilter> = queries.iter().map(|q| q.filters.clone()).collect();
            let params = queries
                .iter()
                .skip(1)
                .fold(queries[0].params.clone(), |acc, q| merge_params(acc, &q.params));
            Some(QueryObject { params, filters: merge_filters(&filters) })
        }
    }
}

/// 标量和数组以后者为准（即使为空或 false），只有 limit 按字段合并
fn merge_params(mut base: QueryParams, overlay: &QueryParams) -> QueryParams {
    base.select_all = overlay.select_all;
    base.custom_selects = overlay.custom_selects.clone();
    base.facets = overlay.facets;
    base.sort = overlay.sort.clone();
    if overlay.limit.from.is_some() {
        base.limit.from = overlay.limit.from;
    }
    if overlay.limit.size.is_some() {
        base.limit.size = overlay.limit.size;
    }
    base
}

/// 合并多个 PQL 字符串
///
/// 只剩一个输入时原样返回，不经过对象模型，避免格式被改写。
pub fn merge_pqls(pqls: &[&str]) -> PqlResult<String> {
    let unique: IndexSet<&str> = pqls
        .iter()
        .map(|pql| pql.trim())
        .filter(|pql| !pql.is_empty())
        .collect();

    match unique.len() {
        0 => Ok(String::new()),
        1 => Ok(unique[0].to_string()),
        _ => {
            let queries = unique
                .iter()
                .map(|pql| from_text(pql))
                .collect::<PqlResult<Vec<_>>>()?;
            let merged = merge_queries(&queries).unwrap_or_default();
            let pql = to_text(&merged);
            debug!("merged {} queries into `{}`", queries.len(), pql);
            Ok(pql)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PqlError;
    use crate::query::{Limit, Scalar, SortSpec};
    use serde_json::json;

    #[test]
    fn test_merge_values_later_wins() {
        let merged = merge_values(&[
            json!({"donor": {"gender": {"is": ["female"]}}}),
            json!({"donor": {"gender": {"is": ["male"]}}}),
        ]);
        assert_eq!(merged, json!({"donor": {"gender": {"is": ["male"]}}}));
    }

    #[test]
    fn test_merge_values_deep() {
        let merged = merge_values(&[
            json!({"donor": {"gender": {"is": ["female", "male"]}}, "gene": {"id": {"is": ["A"]}}}),
            json!("not an object"),
            json!({"donor": {"age": {"is": [1]}}, "gene": {"id": {"is": ["B"]}}}),
        ]);
        assert_eq!(
            merged,
            json!({
                "donor": {"gender": {"is": ["female", "male"]}, "age": {"is": [1]}},
                "gene": {"id": {"is": ["B"]}}
            })
        );
    }

    #[test]
    fn test_merge_values_edge_counts() {
        assert_eq!(merge_values(&[]), json!({}));
        assert_eq!(merge_values(&[json!(1), json!([1, 2])]), json!({}));
        let only = json!({"a": {"b": 1}});
        assert_eq!(merge_values(&[json!(null), only.clone()]), only);
    }

    #[test]
    fn test_merge_filters_replaces_terms() {
        let first: CanonicalFilter = serde_json::from_value(json!({"donor": {"gender": {"is": ["female"]}}})).unwrap();
        let second: CanonicalFilter = serde_json::from_value(json!({"donor": {"gender": {"is": ["male"]}}})).unwrap();
        let merged = merge_filters(&[first, second.clone()]);
        assert_eq!(merged, second);
    }

    #[test]
    fn test_merge_queries_params() {
        let a = from_text("select(transcripts),facets(*),eq(donor.age,1),sort(+donor.age),limit(0,10)").unwrap();
        let b = from_text(r#"eq(donor.gender,"male"),limit(20)"#).unwrap();
        let merged = merge_queries(&[a.clone(), b.clone()]).unwrap();
        // 后者的空投影、空排序和关闭的 facets 同样覆盖前者
        assert!(merged.params.select_all);
        assert!(merged.params.custom_selects.is_empty());
        assert!(!merged.params.facets);
        assert!(merged.params.sort.is_empty());
        assert_eq!(merged.params.limit, Limit::new(20, 10));
        assert_eq!(merged.filters.facet_count(), 2);

        let merged = merge_queries(&[b, a]).unwrap();
        assert!(!merged.params.select_all);
        assert_eq!(merged.params.custom_selects, vec!["transcripts"]);
        assert!(merged.params.facets);
        assert_eq!(merged.params.sort, vec![SortSpec::asc("donor.age")]);
        assert_eq!(merged.params.limit, Limit::new(0, 10));
        assert!(merge_queries(&[]).is_none());
    }

    #[test]
    fn test_merge_pqls_later_params_replace_earlier() {
        let merged = merge_pqls(&["select(transcripts),facets(*),eq(a.b,1),sort(+a.b)", "eq(a.c,2)"]).unwrap();
        assert_eq!(merged, "and(eq(a.b,1),eq(a.c,2))");
        let query = from_text(&merged).unwrap();
        assert!(query.params.sort.is_empty());
        assert!(!query.params.facets);
        assert!(query.params.custom_selects.is_empty());
    }

    #[test]
    fn test_merge_pqls() {
        let merged = merge_pqls(&["eq(donor.age,123)", r#"in(donor.gender,"male","female")"#]).unwrap();
        let filters = from_text(&merged).unwrap().filters;
        let expected: CanonicalFilter = serde_json::from_value(json!({
            "donor": {"age": {"is": [123]}, "gender": {"is": ["male", "female"]}}
        }))
        .unwrap();
        assert_eq!(filters, expected);
        assert_eq!(filters.terms("donor", "age"), Some(&[Scalar::from(123)][..]));
    }

    #[test]
    fn test_merge_pqls_single_input_is_verbatim() {
        assert_eq!(merge_pqls(&[]).unwrap(), "");
        assert_eq!(merge_pqls(&["  ", ""]).unwrap(), "");
        let raw = "eq( donor.age , 123 )";
        assert_eq!(merge_pqls(&[raw, "", "  eq( donor.age , 123 ) "]).unwrap(), raw);
    }

    #[test]
    fn test_merge_pqls_later_wins() {
        let merged = merge_pqls(&[r#"eq(donor.gender,"female")"#, r#"eq(donor.gender,"male")"#]).unwrap();
        assert_eq!(merged, r#"eq(donor.gender,"male")"#);
    }

    #[test]
    fn test_merge_pqls_propagates_parse_errors() {
        let result = merge_pqls(&["eq(donor.age,1)", "eq(donor."]);
        assert!(matches!(result, Err(PqlError::Parse { .. })));
    }
}
