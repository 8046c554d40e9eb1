// query/types.rs - 查询相关类型定义
//! 定义 PQL 语法树节点、规范过滤器和查询对象

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::engine::PqlError;

/// 默认投影（select 全部字段）
pub const WILDCARD: &str = "*";

/// 过滤条件中的单个取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// 空字符串视为缺失值，过滤器操作会忽略它
    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Str(s) if s.is_empty())
    }
}

impl fmt::Display for Scalar {
    /// 输出 PQL 字面量形式
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(n) => write!(f, "{}", n),
            // Debug 格式保留小数点，重新解析后仍是浮点数
            Scalar::Float(x) => write!(f, "{:?}", x),
            Scalar::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        _ => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Int(n as i64)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "+")]
    Asc,
    #[serde(rename = "-")]
    Desc,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Asc
    }
}

impl Direction {
    pub fn sign(&self) -> char {
        match self {
            Direction::Asc => '+',
            Direction::Desc => '-',
        }
    }
}

/// 排序条件，列表中的顺序即优先级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: Direction,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Desc }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.direction.sign(), self.field)
    }
}

/// 分页参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Limit {
    pub fn new(from: u64, size: u64) -> Self {
        Self { from: Some(from), size: Some(size) }
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.size.is_none()
    }
}

/// 过滤项操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOp {
    Eq,
    In,
}

impl TermOp {
    pub fn name(&self) -> &'static str {
        match self {
            TermOp::Eq => "eq",
            TermOp::In => "in",
        }
    }
}

/// PQL 语法树节点
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    And(Vec<Node>),
    Term {
        op: TermOp,
        field: String,
        values: Vec<Scalar>,
    },
    Select(Vec<String>),
    Facets(Vec<String>),
    Sort(Vec<SortSpec>),
    Limit(Limit),
    /// 只能出现在顶层
    Count(Vec<Node>),
}

impl Node {
    pub fn eq(field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Node::Term { op: TermOp::Eq, field: field.into(), values: vec![value.into()] }
    }

    pub fn in_list(field: impl Into<String>, values: Vec<Scalar>) -> Self {
        Node::Term { op: TermOp::In, field: field.into(), values }
    }

    pub fn select_all() -> Self {
        Node::Select(vec![WILDCARD.to_string()])
    }
}

/// 过滤字段标识 `category.facet`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub category: String,
    pub facet: String,
}

impl Identifier {
    /// 按第一个 `.` 拆分，两部分都不能为空
    pub fn split(field: &str) -> Option<Self> {
        let (category, facet) = field.split_once('.')?;
        if category.is_empty() || facet.is_empty() {
            return None;
        }
        Some(Self { category: category.to_string(), facet: facet.to_string() })
    }
}

impl FromStr for Identifier {
    type Err = PqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::split(s.trim()).ok_or_else(|| {
            PqlError::Validation(format!("expected `category.facet`, found `{}`", s))
        })
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.facet)
    }
}

/// 某个 facet 下的取值集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetTerms {
    pub is: Vec<Scalar>,
}

impl FacetTerms {
    /// 去重，保留首次出现的顺序
    pub fn from_values(values: impl IntoIterator<Item = Scalar>) -> Self {
        let mut is: Vec<Scalar> = Vec::new();
        for value in values {
            if !is.contains(&value) {
                is.push(value);
            }
        }
        Self { is }
    }

    pub fn contains(&self, term: &Scalar) -> bool {
        self.is.contains(term)
    }
}

pub type FacetMap = IndexMap<String, FacetTerms>;

/// 规范过滤器: category -> facet -> { is: [...] }
///
/// 不变量：不存在空的 `is`，也不存在没有 facet 的 category。
/// 相等比较忽略键顺序，但 `is` 中的顺序有意义。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalFilter(IndexMap<String, FacetMap>);

impl CanonicalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, category: &str, facet: &str) -> Option<&FacetTerms> {
        self.0.get(category)?.get(facet)
    }

    pub fn terms(&self, category: &str, facet: &str) -> Option<&[Scalar]> {
        self.get(category, facet).map(|t| t.is.as_slice())
    }

    pub fn category(&self, category: &str) -> Option<&FacetMap> {
        self.0.get(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FacetMap)> {
        self.0.iter()
    }

    /// facet 总数
    pub fn facet_count(&self) -> usize {
        self.0.values().map(|facets| facets.len()).sum()
    }

    /// 整体替换某个 facet 的取值；空集合会删除该 facet
    pub fn set_terms(&mut self, category: &str, facet: &str, terms: FacetTerms) {
        if terms.is.is_empty() {
            self.remove(category, facet);
            return;
        }
        self.0
            .entry(category.to_string())
            .or_default()
            .insert(facet.to_string(), terms);
    }

    pub(crate) fn terms_mut(&mut self, category: &str, facet: &str) -> &mut FacetTerms {
        self.0
            .entry(category.to_string())
            .or_default()
            .entry(facet.to_string())
            .or_default()
    }

    /// 删除 facet，category 变空时一并删除
    pub(crate) fn remove(&mut self, category: &str, facet: &str) {
        if let Some(facets) = self.0.get_mut(category) {
            facets.shift_remove(facet);
            if facets.is_empty() {
                self.0.shift_remove(category);
            }
        }
    }

    /// 修复外部输入（如 URL 中的 JSON）可能破坏的不变量
    pub fn normalized(self) -> Self {
        let mut result = CanonicalFilter::new();
        for (category, facets) in self.0 {
            for (facet, terms) in facets {
                let terms = FacetTerms::from_values(
                    terms.is.into_iter().filter(|t| !t.is_blank()),
                );
                result.set_terms(&category, &facet, terms);
            }
        }
        result
    }
}

/// 查询参数（投影、facets、排序、分页）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub select_all: bool,
    /// 白名单内的关联投影，不含通配符
    pub custom_selects: Vec<String>,
    pub facets: bool,
    pub sort: Vec<SortSpec>,
    pub limit: Limit,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            select_all: true,
            custom_selects: Vec::new(),
            facets: false,
            sort: Vec::new(),
            limit: Limit::default(),
        }
    }
}

/// 查询对象：UI 层参数 + 规范过滤器
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryObject {
    pub params: QueryParams,
    pub filters: CanonicalFilter,
}

impl QueryObject {
    pub fn with_filters(filters: CanonicalFilter) -> Self {
        Self { params: QueryParams::default(), filters }
    }
}
