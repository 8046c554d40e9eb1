// query/filter.rs - 规范过滤器操作
//! 对 CanonicalFilter 的纯函数式修改
//!
//! 所有操作都返回新的过滤器，不修改输入。
//! 缺失或非法的 category / facet / term 一律静默忽略。

use super::types::*;

fn keys_valid(category: &str, facet: &str) -> bool {
    !category.is_empty() && !facet.is_empty()
}

/// 添加单个取值
pub fn add_term(category: &str, facet: &str, term: &Scalar, filter: &CanonicalFilter) -> CanonicalFilter {
    if term.is_blank() {
        return filter.clone();
    }
    add_multiple_terms(category, facet, std::slice::from_ref(term), filter)
}

/// 并集式添加多个取值，保留首次出现的顺序
pub fn add_multiple_terms(category: &str, facet: &str, terms: &[Scalar], filter: &CanonicalFilter) -> CanonicalFilter {
    let mut result = filter.clone();
    add_in_place(&mut result, category, facet, terms);
    result
}

/// 删除单个取值，facet 为空时级联删除
pub fn remove_term(category: &str, facet: &str, term: &Scalar, filter: &CanonicalFilter) -> CanonicalFilter {
    let mut result = filter.clone();
    remove_in_place(&mut result, category, facet, std::slice::from_ref(term));
    result
}

/// 删除整个 facet，category 为空时一并删除
pub fn remove_facet(category: &str, facet: &str, filter: &CanonicalFilter) -> CanonicalFilter {
    let mut result = filter.clone();
    result.remove(category, facet);
    result
}

/// 用单个取值替换 facet 的全部取值
pub fn overwrite(category: &str, facet: &str, term: &Scalar, filter: &CanonicalFilter) -> CanonicalFilter {
    overwrite_terms(category, facet, std::slice::from_ref(term), filter)
}

/// 用一组取值替换 facet 的全部取值
pub fn overwrite_terms(category: &str, facet: &str, terms: &[Scalar], filter: &CanonicalFilter) -> CanonicalFilter {
    apply_updators(&[Updator::RemoveFacet, Updator::AddTerms], category, facet, terms, filter)
}

/// 已存在则删除，不存在则添加
pub fn toggle_term(category: &str, facet: &str, term: &Scalar, filter: &CanonicalFilter) -> CanonicalFilter {
    apply_updators(&[Updator::Toggle], category, facet, std::slice::from_ref(term), filter)
}

fn add_in_place(filter: &mut CanonicalFilter, category: &str, facet: &str, terms: &[Scalar]) {
    if !keys_valid(category, facet) {
        return;
    }
    let terms: Vec<&Scalar> = terms.iter().filter(|t| !t.is_blank()).collect();
    if terms.is_empty() {
        return;
    }
    let entry = filter.terms_mut(category, facet);
    for term in terms {
        if !entry.contains(term) {
            entry.is.push(term.clone());
        }
    }
}

fn remove_in_place(filter: &mut CanonicalFilter, category: &str, facet: &str, terms: &[Scalar]) {
    let Some(existing) = filter.get(category, facet) else {
        return;
    };
    let remaining = existing.is.iter().filter(|t| !terms.contains(t)).cloned();
    let remaining = FacetTerms::from_values(remaining);
    // set_terms 在集合为空时会删除 facet 和空的 category
    filter.set_terms(category, facet, remaining);
}

/// 单步更新操作，按顺序作用于同一组 (category, facet, terms, filter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Updator {
    AddTerms,
    RemoveTerms,
    RemoveFacet,
    Toggle,
}

impl Updator {
    fn apply_in_place(self, filter: &mut CanonicalFilter, category: &str, facet: &str, terms: &[Scalar]) {
        match self {
            Updator::AddTerms => add_in_place(filter, category, facet, terms),
            Updator::RemoveTerms => remove_in_place(filter, category, facet, terms),
            Updator::RemoveFacet => filter.remove(category, facet),
            Updator::Toggle => {
                for term in terms {
                    let present = filter
                        .get(category, facet)
                        .is_some_and(|existing| existing.contains(term));
                    if present {
                        remove_in_place(filter, category, facet, std::slice::from_ref(term));
                    } else {
                        add_in_place(filter, category, facet, std::slice::from_ref(term));
                    }
                }
            }
        }
    }
}

/// 依次应用一组更新操作，返回新的过滤器
pub fn apply_updators(
    updators: &[Updator],
    category: &str,
    facet: &str,
    terms: &[Scalar],
    filter: &CanonicalFilter,
) -> CanonicalFilter {
    let mut result = filter.clone();
    for updator in updators {
        updator.apply_in_place(&mut result, category, facet, terms);
    }
    result
}

/// 带目标字段的过滤器修改
#[derive(Debug, Clone, PartialEq)]
pub enum FilterMutation {
    AddTerms { target: Identifier, terms: Vec<Scalar> },
    RemoveTerm { target: Identifier, term: Scalar },
    RemoveFacet { target: Identifier },
    Overwrite { target: Identifier, terms: Vec<Scalar> },
    Toggle { target: Identifier, term: Scalar },
}

/// 修改结果：新的过滤器，以及它是否与输入不同
#[derive(Debug, Clone, PartialEq)]
pub struct Mutated {
    pub filter: CanonicalFilter,
    pub changed: bool,
}

impl FilterMutation {
    pub fn target(&self) -> &Identifier {
        match self {
            FilterMutation::AddTerms { target, .. }
            | FilterMutation::RemoveTerm { target, .. }
            | FilterMutation::RemoveFacet { target }
            | FilterMutation::Overwrite { target, .. }
            | FilterMutation::Toggle { target, .. } => target,
        }
    }

    pub fn apply(&self, filter: &CanonicalFilter) -> Mutated {
        let Identifier { category, facet } = self.target();
        let result = match self {
            FilterMutation::AddTerms { terms, .. } => add_multiple_terms(category, facet, terms, filter),
            FilterMutation::RemoveTerm { term, .. } => remove_term(category, facet, term, filter),
            FilterMutation::RemoveFacet { .. } => remove_facet(category, facet, filter),
            FilterMutation::Overwrite { terms, .. } => overwrite_terms(category, facet, terms, filter),
            FilterMutation::Toggle { term, .. } => toggle_term(category, facet, term, filter),
        };
        // 比较时 is 的顺序也算在内
        let changed = !same_layout(&result, filter);
        Mutated { filter: result, changed }
    }
}

fn same_layout(a: &CanonicalFilter, b: &CanonicalFilter) -> bool {
    a == b
        && a.iter().zip(b.iter()).all(|((ca, fa), (cb, fb))| {
            ca == cb && fa.keys().eq(fb.keys())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Scalar {
        Scalar::from(v)
    }

    #[test]
    fn test_add_term_creates_entries() {
        let empty = CanonicalFilter::new();
        let filter = add_term("donor", "gender", &s("male"), &empty);
        assert_eq!(filter.terms("donor", "gender"), Some(&[s("male")][..]));
        // 输入不被修改
        assert!(empty.is_empty());
    }

    #[test]
    fn test_add_multiple_terms_is_a_union() {
        let filter = add_multiple_terms("donor", "gender", &[s("male"), s("female")], &CanonicalFilter::new());
        let filter = add_multiple_terms("donor", "gender", &[s("female"), s("other"), s("male")], &filter);
        assert_eq!(filter.terms("donor", "gender"), Some(&[s("male"), s("female"), s("other")][..]));
    }

    #[test]
    fn test_blank_inputs_are_ignored() {
        let filter = CanonicalFilter::new();
        assert!(add_term("donor", "gender", &s(""), &filter).is_empty());
        assert!(add_multiple_terms("donor", "gender", &[], &filter).is_empty());
        assert!(add_multiple_terms("donor", "gender", &[s("")], &filter).is_empty());
        assert!(add_term("", "gender", &s("male"), &filter).is_empty());
        assert!(add_term("donor", "", &s("male"), &filter).is_empty());
        assert!(remove_term("donor", "gender", &s("male"), &filter).is_empty());
        assert!(remove_facet("donor", "gender", &filter).is_empty());
    }

    #[test]
    fn test_remove_term_cascades() {
        let filter = add_term("donor", "gender", &s("male"), &CanonicalFilter::new());
        let filter = add_term("donor", "age", &Scalar::from(22), &filter);

        let filter = remove_term("donor", "gender", &s("male"), &filter);
        assert!(filter.get("donor", "gender").is_none());
        assert!(filter.category("donor").is_some());

        let filter = remove_term("donor", "age", &Scalar::from(22), &filter);
        assert!(filter.category("donor").is_none());
        assert!(filter.is_empty());
    }

    #[test]
    fn test_add_then_remove_cancels() {
        let base = add_multiple_terms("donor", "gender", &[s("male")], &CanonicalFilter::new());
        let base = add_term("gene", "id", &s("ENSG1"), &base);
        for (category, facet) in [("donor", "gender"), ("donor", "age"), ("mutation", "type")] {
            let added = add_term(category, facet, &s("new"), &base);
            assert_ne!(added, base);
            assert_eq!(remove_term(category, facet, &s("new"), &added), base);
        }
    }

    #[test]
    fn test_overwrite_replaces_not_unions() {
        let filter = overwrite_terms("donor", "gender", &[s("x"), s("y")], &CanonicalFilter::new());
        let filter = overwrite_terms("donor", "gender", &[s("z")], &filter);
        assert_eq!(filter.terms("donor", "gender"), Some(&[s("z")][..]));

        let filter = overwrite("donor", "gender", &s("w"), &filter);
        assert_eq!(filter.terms("donor", "gender"), Some(&[s("w")][..]));
    }

    #[test]
    fn test_overwrite_with_nothing_clears_facet() {
        let filter = add_term("donor", "gender", &s("male"), &CanonicalFilter::new());
        assert!(overwrite_terms("donor", "gender", &[], &filter).is_empty());
    }

    #[test]
    fn test_toggle_term() {
        let filter = toggle_term("donor", "gender", &s("male"), &CanonicalFilter::new());
        assert_eq!(filter.terms("donor", "gender"), Some(&[s("male")][..]));
        let filter = toggle_term("donor", "gender", &s("female"), &filter);
        assert_eq!(filter.terms("donor", "gender"), Some(&[s("male"), s("female")][..]));
        let filter = toggle_term("donor", "gender", &s("male"), &filter);
        let filter = toggle_term("donor", "gender", &s("female"), &filter);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_apply_updators_in_order() {
        let filter = add_multiple_terms("donor", "gender", &[s("a"), s("b")], &CanonicalFilter::new());
        let result = apply_updators(&[Updator::RemoveTerms, Updator::AddTerms], "donor", "gender", &[s("a")], &filter);
        assert_eq!(result.terms("donor", "gender"), Some(&[s("b"), s("a")][..]));
    }

    #[test]
    fn test_mutation_reports_change() {
        let target: Identifier = "donor.gender".parse().unwrap();
        let add = FilterMutation::AddTerms { target: target.clone(), terms: vec![s("male")] };

        let first = add.apply(&CanonicalFilter::new());
        assert!(first.changed);
        let second = add.apply(&first.filter);
        assert!(!second.changed);
        assert_eq!(second.filter, first.filter);

        let remove = FilterMutation::RemoveFacet { target: "gene.id".parse().unwrap() };
        assert!(!remove.apply(&first.filter).changed);

        let overwrite = FilterMutation::Overwrite { target, terms: vec![s("female")] };
        let replaced = overwrite.apply(&first.filter);
        assert!(replaced.changed);
        assert_eq!(replaced.filter.terms("donor", "gender"), Some(&[s("female")][..]));
    }
}
