//! The binding engine.
//!
//! A [`Binder`] owns the configuration, the error factory and a type-keyed
//! cache of compiled [`Receiver`]s. Binding a request negotiates the body
//! codec, fetches only the sources the receiver needs and then walks the
//! field plans in declaration order, stopping at the first failure.

use bytes::Bytes;
use dashmap::DashMap;
use http::HeaderMap;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::binding::{Binding, ProtobufMessage};
use crate::cookie::Cookie;
use crate::plan::{Directive, FieldPlan, Receiver};
use crate::{
    default_error_factory, json, BindConfig, BindError, BodyCodec, ConvertError, ErrorFactory,
    ErrorKind, Location, PathParams, RawValue, Request, Values,
};

/// Checks a bound value against the validation expressions of its fields.
///
/// Expression evaluation is left to the implementation; the binder only
/// calls it after a successful bind of a type that declares expressions.
pub trait Validator: Send + Sync {
    /// Validates `value` given the plans that carry an expression.
    ///
    /// # Errors
    ///
    /// Returns a description of the first failed rule.
    fn validate(&self, value: &dyn Any, fields: &[&FieldPlan]) -> Result<(), String>;
}

/// Binds requests into [`Binding`] types.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use tessera::{Bind, Binder, Request};
///
/// #[derive(Debug, Default, Bind)]
/// struct Search {
///     #[bind(query = "q", required)]
///     term: String,
///     #[bind(query)]
///     page: Option<u32>,
/// }
///
/// let binder = Binder::new();
/// let mut request = Request::builder().method(Method::GET).uri("/search?q=rust&page=2").build();
///
/// let mut search = Search::default();
/// binder.bind(&mut request, &mut search).unwrap();
/// assert_eq!(search.term, "rust");
/// assert_eq!(search.page, Some(2));
/// ```
pub struct Binder {
    config: BindConfig,
    error_factory: ErrorFactory,
    validator: Option<Arc<dyn Validator>>,
    receivers: DashMap<TypeId, Arc<Receiver>>,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("config", &self.config)
            .field("validator", &self.validator.is_some())
            .field("receivers", &self.receivers.len())
            .finish_non_exhaustive()
    }
}

impl Binder {
    /// Creates a binder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BindConfig::default())
    }

    /// Creates a binder with `config`.
    #[must_use]
    pub fn with_config(config: BindConfig) -> Self {
        Self {
            config,
            error_factory: default_error_factory(),
            validator: None,
            receivers: DashMap::new(),
        }
    }

    /// Replaces the error factory used when plans are compiled.
    #[must_use]
    pub fn with_error_factory(mut self, factory: ErrorFactory) -> Self {
        self.error_factory = factory;
        self
    }

    /// Installs a validator.
    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    /// Returns the compiled receiver for `T`, building it on first use.
    ///
    /// Concurrent first callers share a single build.
    pub fn receiver<T: Binding>(&self) -> Arc<Receiver> {
        let key = TypeId::of::<T>();
        if let Some(receiver) = self.receivers.get(&key) {
            return Arc::clone(receiver.value());
        }

        let entry = self
            .receivers
            .entry(key)
            .or_insert_with(|| Arc::new(Receiver::build::<T>(&self.config, &self.error_factory)));
        Arc::clone(entry.value())
    }

    /// Binds `request` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns the first field failure, a verbatim body decode error, or a
    /// request-level error (body read, form size, malformed form or query).
    pub fn bind<T: Binding>(&self, request: &mut Request, dest: &mut T) -> Result<(), BindError> {
        let receiver = self.receiver::<T>();
        let codec = BodyCodec::negotiate(request.content_type());

        let body = if !receiver.needs_body() {
            None
        } else if codec == BodyCodec::Form {
            request
                .buffer_body_within(self.config.max_form_memory)?
                .filter(|bytes| !bytes.is_empty())
        } else {
            request.buffer_body()?.filter(|bytes| !bytes.is_empty())
        };

        let mut document = None;
        if let Some(bytes) = &body {
            match codec {
                BodyCodec::Json => {
                    dest.prebind_json(bytes)?;
                    document = Some(serde_json::from_slice::<Value>(bytes)?);
                }
                BodyCodec::Protobuf => {
                    let message = dest.as_protobuf().ok_or(BindError::ProtobufUnsupported {
                        type_name: receiver.type_name(),
                    })?;
                    message.decode_from(bytes)?;
                }
                BodyCodec::Form => {
                    request.parse_post_form(self.config.max_form_memory)?;
                }
                BodyCodec::Unsupported => {}
            }
        }

        let request = &*request;
        let sources = Sources {
            codec,
            headers: request.headers(),
            path: receiver.needs_path().then(|| request.path_params()),
            query: if receiver.needs_query() {
                Some(request.query()?)
            } else {
                None
            },
            cookies: if receiver.needs_cookie() {
                request.cookies()
            } else {
                Vec::new()
            },
            form: request.post_form(),
            body,
            document,
        };

        for plan in receiver.params().filter(|plan| !plan.is_nested()) {
            if let Err(err) = self.bind_field(plan, &sources, dest) {
                tracing::trace!(
                    type_name = receiver.type_name(),
                    field = plan.selector(),
                    kind = ?err.kind(),
                    "field binding failed"
                );
                return Err(err);
            }
        }

        if receiver.needs_validation() {
            if let Some(validator) = &self.validator {
                let fields: Vec<&FieldPlan> = receiver.validated_params().collect();
                validator
                    .validate(&*dest, &fields)
                    .map_err(BindError::Validation)?;
            }
        }

        Ok(())
    }

    fn bind_field<T: Binding>(
        &self,
        plan: &FieldPlan,
        sources: &Sources<'_>,
        dest: &mut T,
    ) -> Result<(), BindError> {
        let mut first_required: Option<&Directive> = None;

        for directive in plan.directives() {
            let raw = match sources.lookup(directive) {
                Lookup::Found(raw) => raw,
                Lookup::Decoded => return Ok(()),
                Lookup::Absent => {
                    if first_required.is_none() && !plan.is_omitted(directive.location()) {
                        first_required = Some(directive);
                    }
                    continue;
                }
                Lookup::CodecMismatch if directive.is_implicit() => continue,
                Lookup::CodecMismatch => {
                    return Err(directive.error(ErrorKind::UnsupportedContentType).into());
                }
            };

            return match dest.assign(plan.index_path(), raw, self.config.loose_zero_mode) {
                Ok(()) => Ok(()),
                Err(ConvertError::Mismatch(detail)) => {
                    tracing::trace!(field = directive.name_path(), %detail, "conversion failed");
                    Err(directive.error(ErrorKind::TypeMismatch).into())
                }
                Err(ConvertError::Unsupported) => Err(directive.error(ErrorKind::CannotBind).into()),
            };
        }

        match first_required {
            Some(directive) => Err(directive.error(ErrorKind::MissingRequired).into()),
            None => Ok(()),
        }
    }
}

/// Outcome of looking one directive up in the fetched sources.
enum Lookup<'a> {
    Found(RawValue<'a>),
    /// Already populated by the bulk protobuf decode.
    Decoded,
    Absent,
    CodecMismatch,
}

/// Raw request data fetched once per bind.
struct Sources<'r> {
    codec: BodyCodec,
    headers: &'r HeaderMap,
    path: Option<&'r PathParams>,
    query: Option<Values>,
    cookies: Vec<Cookie>,
    form: Option<&'r Values>,
    body: Option<Bytes>,
    document: Option<Value>,
}

impl Sources<'_> {
    fn lookup(&self, directive: &Directive) -> Lookup<'_> {
        let name = directive.name_path();
        let location = directive.location();

        // A request without a body and without a known codec is not a mismatch.
        if matches!(location, Location::Form | Location::Json | Location::Protobuf)
            && !self.codec.serves(location)
        {
            if self.codec == BodyCodec::Unsupported && self.body.is_none() {
                return Lookup::Absent;
            }
            return Lookup::CodecMismatch;
        }

        let found = match location {
            Location::Path => self
                .path
                .and_then(|params| params.get(name))
                .map(|value| RawValue::Text(vec![value])),
            Location::Query => text(self.query.as_ref().and_then(|q| q.get_all(name))),
            Location::Form => text(self.form.and_then(|f| f.get_all(name))),
            Location::Cookie => {
                let values: Vec<&str> = self
                    .cookies
                    .iter()
                    .filter(|cookie| cookie.name() == name)
                    .map(Cookie::value)
                    .collect();
                (!values.is_empty()).then_some(RawValue::Text(values))
            }
            Location::Header => {
                let values: Vec<&str> = self
                    .headers
                    .get_all(name)
                    .iter()
                    .filter_map(|value| value.to_str().ok())
                    .collect();
                (!values.is_empty()).then_some(RawValue::Text(values))
            }
            Location::Json => self
                .document
                .as_ref()
                .and_then(|doc| json::lookup(doc, name))
                .map(RawValue::Json),
            Location::Protobuf => {
                return if self.body.is_some() {
                    Lookup::Decoded
                } else {
                    Lookup::Absent
                };
            }
            Location::RawBody => self.body.as_ref().map(RawValue::Bytes),
        };

        found.map_or(Lookup::Absent, Lookup::Found)
    }
}

fn text(values: Option<&[String]>) -> Option<RawValue<'_>> {
    values
        .filter(|values| !values.is_empty())
        .map(|values| RawValue::Text(values.iter().map(String::as_str).collect()))
}

/// The process-wide binder used by [`bind`].
pub fn default_binder() -> &'static Binder {
    static DEFAULT: OnceLock<Binder> = OnceLock::new();
    DEFAULT.get_or_init(Binder::new)
}

/// Binds `request` into `dest` with the default binder.
///
/// # Errors
///
/// See [`Binder::bind`].
pub fn bind<T: Binding>(request: &mut Request, dest: &mut T) -> Result<(), BindError> {
    default_binder().bind(request, dest)
}
