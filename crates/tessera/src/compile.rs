//! Lookup-name compilation.
//!
//! Every non-anonymous field has an own name per location. A directive's
//! fully-qualified name joins, root to parent, each ancestor's own name for
//! the same location and then the field's own name. Anonymous ancestors have
//! no entry and empty names add no segment.

use crate::plan::FieldPlan;
use crate::{ErrorFactory, Location};
use indexmap::IndexMap;
use std::collections::HashMap;

type OwnNames = [String; Location::COUNT];

/// Resolves the name path and errors of every directive in `params`.
pub(crate) fn compile(params: &mut IndexMap<String, FieldPlan>, factory: &ErrorFactory) {
    let names: HashMap<String, OwnNames> = params
        .values()
        .filter(|plan| !plan.is_anonymous())
        .map(|plan| {
            let own = Location::ALL.map(|location| plan.own_name(location));
            (plan.selector().to_owned(), own)
        })
        .collect();

    for plan in params.values_mut() {
        let resolved: Vec<String> = plan
            .directives()
            .iter()
            .map(|directive| {
                let location = directive.location();
                let ancestors = ancestor_names(plan.selector(), location, &names);
                join_segments(&ancestors, &plan.own_name(location))
            })
            .collect();

        for (directive, name_path) in plan.directives_mut().iter_mut().zip(resolved) {
            directive.resolve(name_path, factory);
        }
    }
}

/// Own names at `location` of every named ancestor of `selector`, root first.
fn ancestor_names<'a>(
    selector: &str,
    location: Location,
    names: &'a HashMap<String, OwnNames>,
) -> Vec<&'a str> {
    selector
        .match_indices('.')
        .filter_map(|(idx, _)| names.get(&selector[..idx]))
        .map(|own| own[location.index()].as_str())
        .collect()
}

/// Joins ancestor segments and the own name with `.`, skipping empty segments.
pub(crate) fn join_segments(ancestors: &[&str], own: &str) -> String {
    let mut name_path = String::new();
    for segment in ancestors.iter().copied().filter(|s| !s.is_empty()) {
        name_path.push_str(segment);
        name_path.push('.');
    }
    name_path.push_str(own);
    name_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindConfig;
    use crate::plan::Receiver;
    use crate::{default_error_factory, ErrorKind, FieldDescriptor};
    use crate::binding::DeclaredField;
    use proptest::prelude::*;

    fn receiver_with(fields: Vec<(&str, FieldDescriptor)>) -> Receiver {
        let config = BindConfig::default();
        let mut receiver = Receiver::new("T");
        for (selector, descriptor) in fields {
            receiver.register(
                DeclaredField {
                    selector: selector.to_string(),
                    index_path: Vec::new(),
                    descriptor,
                },
                &config,
            );
        }
        receiver
    }

    fn compiled(fields: Vec<(&str, FieldDescriptor)>) -> IndexMap<String, FieldPlan> {
        let receiver = receiver_with(fields);
        let mut params: IndexMap<String, FieldPlan> = receiver
            .params()
            .map(|plan| (plan.selector().to_string(), plan.clone()))
            .collect();
        compile(&mut params, &default_error_factory());
        params
    }

    fn name_path(params: &IndexMap<String, FieldPlan>, selector: &str, location: Location) -> String {
        params[selector]
            .directives()
            .iter()
            .find(|d| d.location() == location)
            .map(|d| d.name_path().to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_nested_prefix_for_same_location() {
        let params = compiled(vec![
            (
                "inner",
                FieldDescriptor::nested("inner", 0).directive(Location::Header, Some("x"), false),
            ),
            (
                "inner.token",
                FieldDescriptor::leaf("token", 0).directive(Location::Header, Some("token"), true),
            ),
        ]);

        assert_eq!(name_path(&params, "inner.token", Location::Header), "x.token");
        let err = params["inner.token"].directives()[0].error(ErrorKind::MissingRequired);
        assert_eq!(err.field(), "x.token");
    }

    #[test]
    fn test_ancestor_defaults_to_declared_name() {
        let params = compiled(vec![
            (
                "filter",
                FieldDescriptor::nested("filter", 0).directive(Location::Header, Some("x"), false),
            ),
            (
                "filter.limit",
                FieldDescriptor::leaf("limit", 0).directive(Location::Query, None, false),
            ),
        ]);

        // The header prefix does not apply to the query location.
        assert_eq!(name_path(&params, "filter.limit", Location::Query), "filter.limit");
    }

    #[test]
    fn test_anonymous_ancestor_is_transparent() {
        let params = compiled(vec![
            ("meta", FieldDescriptor::nested("meta", 0).anonymous()),
            (
                "meta.request_id",
                FieldDescriptor::leaf("request_id", 0).directive(Location::Header, None, false),
            ),
        ]);

        assert_eq!(
            name_path(&params, "meta.request_id", Location::Header),
            "request-id"
        );
    }

    #[test]
    fn test_deep_nesting() {
        let params = compiled(vec![
            (
                "a",
                FieldDescriptor::nested("a", 0).directive(Location::Form, Some("outer"), false),
            ),
            ("a.b", FieldDescriptor::nested("b", 0).anonymous()),
            (
                "a.b.c",
                FieldDescriptor::nested("c", 0).directive(Location::Form, Some("mid"), false),
            ),
            (
                "a.b.c.d",
                FieldDescriptor::leaf("d", 0).directive(Location::Form, None, false),
            ),
        ]);

        assert_eq!(name_path(&params, "a.b.c.d", Location::Form), "outer.mid.d");
    }

    #[test]
    fn test_compile_is_stable() {
        let fields = || {
            vec![
                (
                    "inner",
                    FieldDescriptor::nested("inner", 0).directive(Location::Query, Some("q"), false),
                ),
                (
                    "inner.page",
                    FieldDescriptor::leaf("page", 0).directive(Location::Query, None, false),
                ),
            ]
        };
        let first = compiled(fields());
        let mut second = first.clone();
        compile(&mut second, &default_error_factory());

        assert_eq!(first, second);
        assert_eq!(name_path(&second, "inner.page", Location::Query), "q.page");
    }

    #[test]
    fn test_join_skips_empty_segments() {
        assert_eq!(join_segments(&["", "a", "", "b"], "c"), "a.b.c");
        assert_eq!(join_segments(&[], "c"), "c");
    }

    proptest! {
        #[test]
        fn join_matches_filtered_segments(
            ancestors in prop::collection::vec("[a-z]{0,4}", 0..6),
            own in "[a-z]{1,6}",
        ) {
            let refs: Vec<&str> = ancestors.iter().map(String::as_str).collect();
            let joined = join_segments(&refs, &own);

            let mut expected: Vec<&str> = refs.iter().copied().filter(|s| !s.is_empty()).collect();
            expected.push(&own);
            prop_assert_eq!(&joined, &expected.join("."));
            prop_assert_eq!(joined, join_segments(&refs, &own));
        }
    }
}
