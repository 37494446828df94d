//! Parsing of `#[bind(...)]` attributes.

use syn::{
    punctuated::Punctuated, spanned::Spanned, Attribute, Data, DeriveInput, Expr, ExprLit, Fields,
    Generics, Ident, Lit, Member, Meta, Token, Type,
};

/// Attribute keys that declare a directive.
pub const LOCATIONS: [&str; 8] = [
    "path", "form", "query", "cookie", "header", "protobuf", "json", "raw_body",
];

/// A parsed directive on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveAttr {
    /// Location tag (`query`, `header`, ...).
    pub location: String,
    /// Explicit lookup name.
    pub name: Option<String>,
    /// Whether the directive was declared `"name,required"`.
    pub required: bool,
}

/// How a field takes part in binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A value converted from one location.
    Leaf,
    /// A bindable container; `anonymous` containers add no name segment.
    Nested {
        /// Declared with `flatten`.
        anonymous: bool,
    },
    /// Excluded with `skip`.
    Skip,
}

/// A parsed struct field.
#[derive(Debug)]
pub struct BindField {
    /// How to reach the field on `self`.
    pub member: Member,
    /// Declared name used for default lookup names.
    pub name: String,
    /// The field type.
    pub ty: Type,
    /// Position among the struct's fields.
    pub index: usize,
    /// Leaf, container or skipped.
    pub kind: FieldKind,
    /// `required` on the field: every directive is required.
    pub required: bool,
    /// Declared directives, in order.
    pub directives: Vec<DirectiveAttr>,
    /// Locations excluded with `"-"`.
    pub excluded: Vec<String>,
    /// Validation expression from `vd = "..."`.
    pub validation: Option<String>,
}

/// A parsed `#[derive(Bind)]` input.
#[derive(Debug)]
pub struct BindStruct {
    /// The struct name.
    pub ident: Ident,
    /// The struct generics.
    pub generics: Generics,
    /// `#[bind(protobuf)]`: the struct is a protobuf message.
    pub protobuf: bool,
    /// `#[bind(json_bulk)]`: JSON bodies are decoded into the whole struct.
    pub json_bulk: bool,
    /// The struct's fields.
    pub fields: Vec<BindField>,
}

impl BindStruct {
    /// Parses a derive input.
    pub fn parse(input: DeriveInput) -> syn::Result<Self> {
        let Data::Struct(data) = input.data else {
            return Err(syn::Error::new(
                input.ident.span(),
                "Bind can only be derived for structs",
            ));
        };

        let mut protobuf = false;
        let mut json_bulk = false;
        for meta in bind_metas(&input.attrs)? {
            match meta {
                Meta::Path(path) if path.is_ident("protobuf") => protobuf = true,
                Meta::Path(path) if path.is_ident("json_bulk") => json_bulk = true,
                other => {
                    return Err(syn::Error::new(
                        other.span(),
                        "expected `protobuf` or `json_bulk` on a struct",
                    ))
                }
            }
        }

        let fields = match data.fields {
            Fields::Named(named) => named.named.into_iter().collect::<Vec<_>>(),
            Fields::Unnamed(unnamed) => unnamed.unnamed.into_iter().collect(),
            Fields::Unit => Vec::new(),
        };

        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(index, field)| {
                let (member, name) = match &field.ident {
                    Some(ident) => (
                        Member::Named(ident.clone()),
                        ident.to_string().trim_start_matches("r#").to_string(),
                    ),
                    None => (Member::Unnamed(index.into()), index.to_string()),
                };
                BindField::parse(member, name, field.ty, index, &field.attrs)
            })
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(Self {
            ident: input.ident,
            generics: input.generics,
            protobuf,
            json_bulk,
            fields,
        })
    }
}

impl BindField {
    fn parse(
        member: Member,
        name: String,
        ty: Type,
        index: usize,
        attrs: &[Attribute],
    ) -> syn::Result<Self> {
        let mut field = Self {
            member,
            name,
            ty,
            index,
            kind: FieldKind::Leaf,
            required: false,
            directives: Vec::new(),
            excluded: Vec::new(),
            validation: None,
        };

        for meta in bind_metas(attrs)? {
            let key = meta
                .path()
                .get_ident()
                .ok_or_else(|| syn::Error::new(meta.path().span(), "expected identifier"))?
                .to_string();

            match (key.as_str(), &meta) {
                ("nested", Meta::Path(_)) => field.kind = FieldKind::Nested { anonymous: false },
                ("flatten", Meta::Path(_)) => field.kind = FieldKind::Nested { anonymous: true },
                ("skip", Meta::Path(_)) => field.kind = FieldKind::Skip,
                ("required", Meta::Path(_)) => field.required = true,
                ("vd", Meta::NameValue(nv)) => field.validation = Some(string_value(&nv.value)?),
                (location, Meta::Path(_)) if LOCATIONS.contains(&location) => {
                    field.directives.push(DirectiveAttr {
                        location: key,
                        name: None,
                        required: false,
                    });
                }
                (location, Meta::NameValue(nv)) if LOCATIONS.contains(&location) => {
                    let value = string_value(&nv.value)?;
                    if value == "-" {
                        field.excluded.push(key);
                    } else {
                        field.directives.push(parse_directive(key, &value, nv.value.span())?);
                    }
                }
                _ => {
                    return Err(syn::Error::new(
                        meta.span(),
                        format!("unknown bind attribute: {key}"),
                    ))
                }
            }
        }

        Ok(field)
    }
}

/// Parses `"name"`, `"name,required"` or `",required"`.
fn parse_directive(
    location: String,
    value: &str,
    span: proc_macro2::Span,
) -> syn::Result<DirectiveAttr> {
    let mut parts = value.split(',');
    let name = parts.next().unwrap_or_default().trim();
    let mut required = false;
    for flag in parts {
        match flag.trim() {
            "required" => required = true,
            other => {
                return Err(syn::Error::new(
                    span,
                    format!("unknown directive flag: {other}"),
                ))
            }
        }
    }

    Ok(DirectiveAttr {
        location,
        name: (!name.is_empty()).then(|| name.to_string()),
        required,
    })
}

/// Collects the comma-separated items of every `#[bind(...)]` attribute.
fn bind_metas(attrs: &[Attribute]) -> syn::Result<Vec<Meta>> {
    let mut metas = Vec::new();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("bind")) {
        let list = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        metas.extend(list);
    }
    Ok(metas)
}

fn string_value(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(syn::Error::new(expr.span(), "expected string literal")),
    }
}
