//! The [`Binding`] trait and the field declarations it produces.
//!
//! A bindable type describes its fields once through a [`FieldWalker`]
//! (usually generated by `#[derive(Bind)]`) and exposes a setter addressed
//! by structural index path. The binder compiles the description into a
//! plan and never inspects the type again.

use crate::{ConvertError, Location, LocationSet, RawValue};

/// A type whose fields can be bound from a request.
///
/// # Implementing `Binding`
///
/// Most types derive it:
///
/// ```rust
/// use tessera::Bind;
///
/// #[derive(Debug, Default, Bind)]
/// struct GetUser {
///     #[bind(path = "id")]
///     id: u64,
///     #[bind(query, header = "x-verbose")]
///     verbose: Option<bool>,
/// }
/// ```
///
/// A manual implementation declares each field and routes assignments by
/// index:
///
/// ```rust
/// use tessera::{Binding, ConvertError, FieldDescriptor, FieldWalker, Location, RawValue};
///
/// #[derive(Default)]
/// struct Page {
///     limit: u32,
/// }
///
/// impl Binding for Page {
///     fn describe(walker: &mut FieldWalker) {
///         walker.field(FieldDescriptor::leaf("limit", 0).directive(Location::Query, None, false));
///     }
///
///     fn assign(&mut self, path: &[usize], raw: RawValue<'_>, loose_zero: bool) -> Result<(), ConvertError> {
///         match path {
///             [0] => self.limit = tessera::convert(raw, loose_zero)?,
///             _ => return Err(ConvertError::Unsupported),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Binding: 'static {
    /// True when the type decodes the whole request body itself, so the
    /// body is fetched even if no field declares a body location.
    const BULK_BODY: bool = false;

    /// Declares this type's fields, recursing into nested bindable fields.
    fn describe(walker: &mut FieldWalker);

    /// Assigns a raw value to the field at `path` (field indices from this type).
    fn assign(
        &mut self,
        path: &[usize],
        raw: RawValue<'_>,
        loose_zero: bool,
    ) -> Result<(), ConvertError>;

    /// Bulk JSON decode run before field-by-field binding.
    ///
    /// The default does nothing; JSON directives then read from the parsed
    /// document. `#[bind(json_bulk)]` replaces the whole value through serde.
    fn prebind_json(&mut self, _body: &[u8]) -> Result<(), serde_json::Error> {
        Ok(())
    }

    /// The protobuf capability of this value, if it has one.
    fn as_protobuf(&mut self) -> Option<&mut dyn ProtobufMessage> {
        None
    }
}

/// A destination that can decode a whole protobuf body into itself.
///
/// Implemented for every [`prost::Message`].
pub trait ProtobufMessage {
    /// Replaces the contents of `self` with the message decoded from `bytes`.
    fn decode_from(&mut self, bytes: &[u8]) -> Result<(), prost::DecodeError>;
}

impl<M: prost::Message> ProtobufMessage for M {
    fn decode_from(&mut self, bytes: &[u8]) -> Result<(), prost::DecodeError> {
        self.clear();
        self.merge(bytes)
    }
}

/// One directive as declared on a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveDecl {
    /// Location to read from.
    pub location: Location,
    /// Explicit lookup name, overriding the location default.
    pub name: Option<String>,
    /// Whether absence at this location is an error.
    pub required: bool,
}

/// Declaration of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub(crate) name: &'static str,
    pub(crate) index: usize,
    pub(crate) nested: bool,
    pub(crate) anonymous: bool,
    pub(crate) required: bool,
    pub(crate) directives: Vec<DirectiveDecl>,
    pub(crate) excluded: LocationSet,
    pub(crate) validation: Option<&'static str>,
}

impl FieldDescriptor {
    /// Declares a value field.
    #[must_use]
    pub fn leaf(name: &'static str, index: usize) -> Self {
        Self {
            name,
            index,
            nested: false,
            anonymous: false,
            required: false,
            directives: Vec::new(),
            excluded: LocationSet::new(),
            validation: None,
        }
    }

    /// Declares a field whose type is itself bindable.
    ///
    /// Its directives only contribute name prefixes for its children.
    #[must_use]
    pub fn nested(name: &'static str, index: usize) -> Self {
        Self {
            nested: true,
            ..Self::leaf(name, index)
        }
    }

    /// Marks a nested field as embedded: it adds no name segment of its own.
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Marks every directive of the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Adds a directive.
    #[must_use]
    pub fn directive(mut self, location: Location, name: Option<&str>, required: bool) -> Self {
        self.directives.push(DirectiveDecl {
            location,
            name: name.filter(|n| !n.is_empty()).map(str::to_owned),
            required,
        });
        self
    }

    /// Excludes a location (`"-"`), so default binding never reads it.
    #[must_use]
    pub fn exclude(mut self, location: Location) -> Self {
        self.excluded.insert(location);
        self
    }

    /// Attaches a validation expression.
    #[must_use]
    pub fn validate(mut self, expression: &'static str) -> Self {
        self.validation = Some(expression);
        self
    }

    /// The declared field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared directives, in declaration order.
    #[must_use]
    pub fn directives(&self) -> &[DirectiveDecl] {
        &self.directives
    }
}

/// A field declaration positioned within its root type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredField {
    /// Dotted structural path of declared names (`inner.token`).
    pub selector: String,
    /// Field indices from the root type.
    pub index_path: Vec<usize>,
    /// The declaration.
    pub descriptor: FieldDescriptor,
}

/// Collects field declarations across nested types.
#[derive(Debug, Default)]
pub struct FieldWalker {
    names: Vec<&'static str>,
    indices: Vec<usize>,
    fields: Vec<DeclaredField>,
}

impl FieldWalker {
    /// Declares a field of the type currently being described.
    pub fn field(&mut self, descriptor: FieldDescriptor) {
        let mut selector = self.names.join(".");
        if !selector.is_empty() {
            selector.push('.');
        }
        selector.push_str(descriptor.name);

        let mut index_path = self.indices.clone();
        index_path.push(descriptor.index);

        self.fields.push(DeclaredField {
            selector,
            index_path,
            descriptor,
        });
    }

    /// Declares a nested field and walks its type.
    pub fn nested<T: Binding>(&mut self, descriptor: FieldDescriptor) {
        let (name, index) = (descriptor.name, descriptor.index);
        self.field(FieldDescriptor {
            nested: true,
            ..descriptor
        });

        self.names.push(name);
        self.indices.push(index);
        T::describe(self);
        self.names.pop();
        self.indices.pop();
    }

    /// Declared fields, parents before their children.
    #[must_use]
    pub fn into_fields(self) -> Vec<DeclaredField> {
        self.fields
    }
}

/// Walks `T` and returns its flattened field declarations.
#[must_use]
pub fn declared_fields<T: Binding>() -> Vec<DeclaredField> {
    let mut walker = FieldWalker::default();
    T::describe(&mut walker);
    walker.into_fields()
}
