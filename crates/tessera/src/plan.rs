//! Per-type binding plans.
//!
//! A [`Receiver`] is built once per destination type from the field
//! declarations produced by [`Binding::describe`]. It records which request
//! sources any field needs, and one [`FieldPlan`] per declared field with
//! compiled lookup names and pre-built errors.

use crate::binding::{declared_fields, Binding, DeclaredField};
use crate::compile;
use crate::config::{BindConfig, DirectiveOrder};
use crate::{ErrorFactory, ErrorKind, FieldError, Location, LocationSet};
use indexmap::IndexMap;

/// The four field-scoped errors of one directive, bound to its compiled name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    missing_required: FieldError,
    type_mismatch: FieldError,
    cannot_bind: FieldError,
    unsupported_content_type: FieldError,
}

impl FieldErrors {
    /// Builds all four errors for `field` through `factory`.
    #[must_use]
    pub fn new(factory: &ErrorFactory, field: &str) -> Self {
        Self {
            missing_required: factory(ErrorKind::MissingRequired, field),
            type_mismatch: factory(ErrorKind::TypeMismatch, field),
            cannot_bind: factory(ErrorKind::CannotBind, field),
            unsupported_content_type: factory(ErrorKind::UnsupportedContentType, field),
        }
    }

    /// The error for `kind`.
    #[must_use]
    pub fn get(&self, kind: ErrorKind) -> &FieldError {
        match kind {
            ErrorKind::MissingRequired => &self.missing_required,
            ErrorKind::TypeMismatch => &self.type_mismatch,
            ErrorKind::CannotBind => &self.cannot_bind,
            ErrorKind::UnsupportedContentType => &self.unsupported_content_type,
        }
    }
}

/// One location a field is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    location: Location,
    name_override: Option<String>,
    implicit: bool,
    name_path: String,
    errors: Option<FieldErrors>,
}

impl Directive {
    fn new(location: Location, name_override: Option<String>, implicit: bool) -> Self {
        Self {
            location,
            name_override,
            implicit,
            name_path: String::new(),
            errors: None,
        }
    }

    /// The location read from.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    /// The explicit lookup name, if one was declared.
    #[must_use]
    pub fn name_override(&self) -> Option<&str> {
        self.name_override.as_deref()
    }

    /// Returns true for directives added by default binding.
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// The fully-qualified lookup name (`x.token`).
    #[must_use]
    pub fn name_path(&self) -> &str {
        &self.name_path
    }

    /// The pre-built error of `kind` for this directive.
    #[must_use]
    pub fn error(&self, kind: ErrorKind) -> FieldError {
        match &self.errors {
            Some(errors) => errors.get(kind).clone(),
            None => FieldError::new(kind, &self.name_path),
        }
    }

    pub(crate) fn resolve(&mut self, name_path: String, factory: &ErrorFactory) {
        self.errors = Some(FieldErrors::new(factory, &name_path));
        self.name_path = name_path;
    }
}

/// Compiled binding metadata for one declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    selector: String,
    index_path: Vec<usize>,
    name: &'static str,
    anonymous: bool,
    nested: bool,
    omit: LocationSet,
    directives: Vec<Directive>,
    validation: Option<&'static str>,
}

impl FieldPlan {
    fn from_declared(field: DeclaredField, config: &BindConfig) -> Self {
        let descriptor = field.descriptor;

        let mut omit = LocationSet::new();
        let mut directives: Vec<Directive> = descriptor
            .directives
            .into_iter()
            .map(|decl| {
                if !(decl.required || descriptor.required) {
                    omit.insert(decl.location);
                }
                Directive::new(decl.location, decl.name, false)
            })
            .collect();

        if directives.is_empty() && !descriptor.nested && config.default_binding {
            for &location in config.precedence() {
                if descriptor.excluded.contains(location) {
                    continue;
                }
                if !descriptor.required {
                    omit.insert(location);
                }
                directives.push(Directive::new(location, None, true));
            }
        }

        if config.directive_order == DirectiveOrder::Precedence {
            directives.sort_by_key(|directive| config.rank(directive.location));
        }

        Self {
            selector: field.selector,
            index_path: field.index_path,
            name: descriptor.name,
            anonymous: descriptor.anonymous,
            nested: descriptor.nested,
            omit,
            directives,
            validation: descriptor.validation,
        }
    }

    /// Dotted structural path of declared names; unique within a type.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Field indices from the root type.
    #[must_use]
    pub fn index_path(&self) -> &[usize] {
        &self.index_path
    }

    /// The declared field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true for embedded fields, which add no name segment.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Returns true for containers; they are never bound themselves.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    /// Returns true if absence at `location` is tolerated.
    #[must_use]
    pub fn is_omitted(&self, location: Location) -> bool {
        self.omit.contains(location)
    }

    /// Directives in evaluation order.
    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub(crate) fn directives_mut(&mut self) -> &mut [Directive] {
        &mut self.directives
    }

    /// The field's own lookup name at `location`: the override of its
    /// directive for that location if any, else the location default.
    #[must_use]
    pub fn own_name(&self, location: Location) -> String {
        self.directives
            .iter()
            .find(|directive| directive.location == location)
            .and_then(Directive::name_override)
            .map_or_else(|| location.default_name(self.name), str::to_owned)
    }

    /// The attached validation expression.
    #[must_use]
    pub fn validation(&self) -> Option<&'static str> {
        self.validation
    }
}

/// Binding state of one destination type: needs flags plus field plans.
#[derive(Debug, Clone, Default)]
pub struct Receiver {
    type_name: &'static str,
    has_path: bool,
    has_query: bool,
    has_body: bool,
    has_cookie: bool,
    has_validation: bool,
    params: IndexMap<String, FieldPlan>,
}

impl Receiver {
    /// Creates an empty receiver for `type_name`.
    #[must_use]
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            ..Self::default()
        }
    }

    /// Walks `T`, registers every declared field and compiles lookup names.
    #[must_use]
    pub fn build<T: Binding>(config: &BindConfig, factory: &ErrorFactory) -> Self {
        let mut receiver = Self::new(std::any::type_name::<T>());
        for field in declared_fields::<T>() {
            receiver.register(field, config);
        }
        if T::BULK_BODY {
            receiver.has_body = true;
        }
        compile::compile(&mut receiver.params, factory);

        tracing::debug!(
            type_name = receiver.type_name,
            plans = receiver.params.len(),
            path = receiver.has_path,
            query = receiver.has_query,
            body = receiver.has_body,
            cookie = receiver.has_cookie,
            "compiled binding plan"
        );
        receiver
    }

    /// Registers a declared field and records the sources its directives need.
    ///
    /// Containers contribute names only, so they set no needs flags.
    pub fn register(&mut self, field: DeclaredField, config: &BindConfig) {
        let plan = self.get_or_add_param(field, config);
        if plan.nested {
            return;
        }

        let needed: LocationSet = plan.directives.iter().map(Directive::location).collect();
        let validated = plan.validation.is_some();
        for location in needed.iter() {
            self.mark_needed(location);
        }
        if validated {
            self.has_validation = true;
        }
    }

    /// Returns the plan registered under `field`'s selector, adding it first
    /// if absent. Registering the same selector twice returns the same plan.
    pub fn get_or_add_param(&mut self, field: DeclaredField, config: &BindConfig) -> &mut FieldPlan {
        self.params
            .entry(field.selector.clone())
            .or_insert_with(|| FieldPlan::from_declared(field, config))
    }

    /// Looks a plan up by selector.
    #[must_use]
    pub fn get_param(&self, selector: &str) -> Option<&FieldPlan> {
        self.params.get(selector)
    }

    /// Records that some field reads from `location`. Flags never reset.
    pub fn mark_needed(&mut self, location: Location) {
        match location {
            Location::Path => self.has_path = true,
            Location::Query => self.has_query = true,
            Location::Form | Location::Json | Location::Protobuf | Location::RawBody => {
                self.has_body = true;
            }
            Location::Cookie => self.has_cookie = true,
            Location::Header => {}
        }
    }

    /// Name of the destination type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if any field reads path parameters.
    #[must_use]
    pub fn needs_path(&self) -> bool {
        self.has_path
    }

    /// Returns true if any field reads the query string.
    #[must_use]
    pub fn needs_query(&self) -> bool {
        self.has_query
    }

    /// Returns true if any field reads the body.
    #[must_use]
    pub fn needs_body(&self) -> bool {
        self.has_body
    }

    /// Returns true if any field reads cookies.
    #[must_use]
    pub fn needs_cookie(&self) -> bool {
        self.has_cookie
    }

    /// Returns true if any field carries a validation expression.
    #[must_use]
    pub fn needs_validation(&self) -> bool {
        self.has_validation
    }

    /// All plans, parents before children, in declaration order.
    pub fn params(&self) -> impl Iterator<Item = &FieldPlan> {
        self.params.values()
    }

    /// Plans that carry a validation expression.
    pub fn validated_params(&self) -> impl Iterator<Item = &FieldPlan> {
        self.params().filter(|plan| plan.validation.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{default_error_factory, FieldDescriptor};

    fn declared(selector: &str, descriptor: FieldDescriptor) -> DeclaredField {
        DeclaredField {
            selector: selector.to_string(),
            index_path: vec![0],
            descriptor,
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let config = BindConfig::default();
        let mut receiver = Receiver::new("T");

        let first = FieldDescriptor::leaf("id", 0).directive(Location::Query, Some("id"), false);
        receiver.register(declared("id", first), &config);

        let second = FieldDescriptor::leaf("id", 0).directive(Location::Header, None, true);
        let plan = receiver.get_or_add_param(declared("id", second), &config);
        assert_eq!(plan.directives().len(), 1);
        assert_eq!(plan.directives()[0].location(), Location::Query);

        assert_eq!(receiver.params().count(), 1);
        assert!(receiver.get_param("id").is_some());
        assert!(receiver.get_param("other").is_none());
    }

    #[test]
    fn test_needs_flags_are_monotone() {
        let config = BindConfig::default();
        let mut receiver = Receiver::new("T");
        assert!(!receiver.needs_body());

        receiver.register(
            declared(
                "payload",
                FieldDescriptor::leaf("payload", 0).directive(Location::Json, None, false),
            ),
            &config,
        );
        assert!(receiver.needs_body());

        receiver.register(
            declared(
                "token",
                FieldDescriptor::leaf("token", 1).directive(Location::Header, None, true),
            ),
            &config,
        );
        assert!(receiver.needs_body());
        assert!(!receiver.needs_query());
        assert!(!receiver.needs_cookie());
        assert!(!receiver.needs_path());
    }

    #[test]
    fn test_containers_set_no_needs() {
        let config = BindConfig::default();
        let mut receiver = Receiver::new("T");
        receiver.register(
            declared(
                "inner",
                FieldDescriptor::nested("inner", 0).directive(Location::Form, Some("x"), false),
            ),
            &config,
        );
        assert!(!receiver.needs_body());
    }

    #[test]
    fn test_omit_set_tracks_required() {
        let config = BindConfig::default();
        let descriptor = FieldDescriptor::leaf("id", 0)
            .directive(Location::Query, None, false)
            .directive(Location::Header, None, true);
        let mut receiver = Receiver::new("T");
        let plan = receiver.get_or_add_param(declared("id", descriptor), &config);

        assert!(plan.is_omitted(Location::Query));
        assert!(!plan.is_omitted(Location::Header));
    }

    #[test]
    fn test_directives_sorted_by_precedence() {
        let config = BindConfig::default();
        let descriptor = FieldDescriptor::leaf("id", 0)
            .directive(Location::Header, None, false)
            .directive(Location::Cookie, None, false)
            .directive(Location::Query, None, false);
        let mut receiver = Receiver::new("T");
        let plan = receiver.get_or_add_param(declared("id", descriptor), &config);

        let order: Vec<_> = plan.directives().iter().map(Directive::location).collect();
        assert_eq!(order, vec![Location::Query, Location::Cookie, Location::Header]);
    }

    #[test]
    fn test_declaration_order_kept() {
        let config = BindConfig {
            directive_order: DirectiveOrder::Declaration,
            ..BindConfig::default()
        };
        let descriptor = FieldDescriptor::leaf("id", 0)
            .directive(Location::Header, None, false)
            .directive(Location::Query, None, false);
        let mut receiver = Receiver::new("T");
        let plan = receiver.get_or_add_param(declared("id", descriptor), &config);

        let order: Vec<_> = plan.directives().iter().map(Directive::location).collect();
        assert_eq!(order, vec![Location::Header, Location::Query]);
    }

    #[test]
    fn test_default_binding_skips_excluded() {
        let config = BindConfig::default();
        let descriptor = FieldDescriptor::leaf("name", 0)
            .exclude(Location::Cookie)
            .exclude(Location::Header);
        let mut receiver = Receiver::new("T");
        let plan = receiver.get_or_add_param(declared("name", descriptor), &config);

        let order: Vec<_> = plan.directives().iter().map(Directive::location).collect();
        assert_eq!(
            order,
            vec![Location::Path, Location::Query, Location::Form, Location::Json, Location::Protobuf]
        );
        assert!(plan.directives().iter().all(Directive::is_implicit));
        assert!(plan.is_omitted(Location::Path));
    }

    #[test]
    fn test_default_binding_disabled() {
        let config = BindConfig {
            default_binding: false,
            ..BindConfig::default()
        };
        let mut receiver = Receiver::new("T");
        receiver.register(declared("name", FieldDescriptor::leaf("name", 0)), &config);

        assert!(receiver.get_param("name").is_some_and(|p| p.directives().is_empty()));
        assert!(!receiver.needs_body());
        assert!(!receiver.needs_path());
    }

    #[test]
    fn test_unresolved_directive_error_falls_back() {
        let directive = Directive::new(Location::Query, None, false);
        assert_eq!(directive.error(ErrorKind::TypeMismatch).kind(), ErrorKind::TypeMismatch);

        let mut directive = directive;
        directive.resolve("a.b".to_string(), &default_error_factory());
        assert_eq!(directive.name_path(), "a.b");
        assert_eq!(directive.error(ErrorKind::CannotBind).field(), "a.b");
    }

    #[test]
    fn test_validation_flag() {
        let config = BindConfig::default();
        let mut receiver = Receiver::new("T");
        receiver.register(
            declared(
                "age",
                FieldDescriptor::leaf("age", 0)
                    .directive(Location::Query, None, false)
                    .validate("$ >= 0"),
            ),
            &config,
        );
        assert!(receiver.needs_validation());
        assert_eq!(receiver.validated_params().count(), 1);
    }
}
