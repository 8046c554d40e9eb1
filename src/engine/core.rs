// engine/core.rs - 查询对象转换核心
//! 语法树 <-> 查询对象 的双向转换

use log::debug;

use crate::query::{
    self, CanonicalFilter, FacetTerms, Identifier, Limit, Node, QueryObject, QueryParams,
    SortSpec, TermOp, WILDCARD,
};

/// 查询引擎错误类型
#[derive(Debug, thiserror::Error)]
pub enum PqlError {
    #[error("PQL parse error at {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PqlError {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        PqlError::Parse { position, message: message.into() }
    }
}

pub type PqlResult<T> = Result<T, PqlError>;

/// 空查询对象
pub fn empty_query_object() -> QueryObject {
    QueryObject::default()
}

/// 解析 PQL 文本为查询对象
pub fn from_text(pql: &str) -> PqlResult<QueryObject> {
    let pql = pql.trim();
    if pql.is_empty() {
        return Ok(empty_query_object());
    }
    let tree = query::parse(pql)?;
    Ok(tree_to_query_object(&tree))
}

/// `from_text` 的别名
pub fn get_query(pql: &str) -> PqlResult<QueryObject> {
    from_text(pql)
}

/// 将顶层节点折叠为查询对象
pub fn tree_to_query_object(nodes: &[Node]) -> QueryObject {
    // 有 and() 时只看它的子节点，否则顶层节点本身就是候选过滤项
    let candidates = nodes
        .iter()
        .find_map(|node| match node {
            Node::And(values) => Some(values.as_slice()),
            _ => None,
        })
        .unwrap_or(nodes);

    let filters = fold_terms(candidates);

    let selects: Vec<&Vec<String>> = nodes
        .iter()
        .filter_map(|node| match node {
            Node::Select(values) => Some(values),
            _ => None,
        })
        .collect();

    let custom_selects = selects
        .iter()
        .find(|values| !is_default_projection(values))
        .map(|values| values.to_vec())
        .unwrap_or_default();

    let select_all = selects.is_empty() || selects.iter().any(|values| is_default_projection(values));

    let facets = nodes.iter().any(|node| matches!(node, Node::Facets(_)));

    let sort = nodes
        .iter()
        .find_map(|node| match node {
            Node::Sort(specs) => Some(specs.clone()),
            _ => None,
        })
        .unwrap_or_default();

    let limit = nodes
        .iter()
        .find_map(|node| match node {
            Node::Limit(limit) => Some(*limit),
            _ => None,
        })
        .unwrap_or_default();

    QueryObject {
        params: QueryParams { select_all, custom_selects, facets, sort, limit },
        filters,
    }
}

fn is_default_projection(values: &[String]) -> bool {
    values.len() == 1 && values[0] == WILDCARD
}

/// 同一个 `category.facet` 出现多次时，后出现的整体覆盖先出现的
fn fold_terms(nodes: &[Node]) -> CanonicalFilter {
    let mut filters = CanonicalFilter::new();
    for node in nodes {
        let Node::Term { field, values, .. } = node else {
            continue;
        };
        if values.is_empty() {
            continue;
        }
        let Some(id) = Identifier::split(field) else {
            debug!("dropping term with malformed field `{}`", field);
            continue;
        };
        filters.set_terms(&id.category, &id.facet, FacetTerms::from_values(values.iter().cloned()));
    }
    filters
}

/// 将查询对象序列化为 PQL 文本
pub fn to_text(query: &QueryObject) -> String {
    query::serialize(&tree_from_query_object(query))
}

/// 查询对象 -> 顶层节点
///
/// 输出顺序固定: select(*), select(自定义), facets(*), 过滤项, sort, limit。
/// 没有自定义投影时 select(*) 是隐含的默认值，不输出。
pub fn tree_from_query_object(query: &QueryObject) -> Vec<Node> {
    let params = &query.params;
    let mut nodes = Vec::new();

    if params.select_all && !params.custom_selects.is_empty() {
        nodes.push(Node::select_all());
    }
    if !params.custom_selects.is_empty() {
        nodes.push(Node::Select(params.custom_selects.clone()));
    }
    if params.facets {
        nodes.push(Node::Facets(vec![WILDCARD.to_string()]));
    }
    nodes.extend(filter_to_tree(&query.filters));
    if !params.sort.is_empty() {
        nodes.push(Node::Sort(params.sort.clone()));
    }
    if !params.limit.is_empty() {
        nodes.push(Node::Limit(params.limit));
    }

    nodes
}

/// 规范过滤器 -> 过滤节点
///
/// 多于一个过滤项时包进单个 and()，只有一个时直接输出。
pub fn filter_to_tree(filter: &CanonicalFilter) -> Vec<Node> {
    let mut terms = Vec::new();
    for (category, facets) in filter.iter() {
        for (facet, terms_of_facet) in facets {
            let op = if terms_of_facet.is.len() == 1 { TermOp::Eq } else { TermOp::In };
            terms.push(Node::Term {
                op,
                field: format!("{}.{}", category, facet),
                values: terms_of_facet.is.clone(),
            });
        }
    }

    if terms.len() > 1 {
        vec![Node::And(terms)]
    } else {
        terms
    }
}

/// 生成只统计数量的查询：去掉投影、排序和分页
pub fn to_count_statement(pql: &str) -> PqlResult<String> {
    let filters = from_text(pql)?.filters;
    if filters.is_empty() {
        return Ok(String::new());
    }
    let statement = query::serialize(&[Node::Count(filter_to_tree(&filters))]);
    debug!("count statement for `{}`: {}", pql, statement);
    Ok(statement)
}

pub fn get_filters(pql: &str) -> PqlResult<CanonicalFilter> {
    Ok(from_text(pql)?.filters)
}

pub fn get_sort(pql: &str) -> PqlResult<Vec<SortSpec>> {
    Ok(from_text(pql)?.params.sort)
}

pub fn get_limit(pql: &str) -> PqlResult<Limit> {
    Ok(from_text(pql)?.params.limit)
}
