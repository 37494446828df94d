//! Derive macro for Tessera request binding.
//!
//! `#[derive(Bind)]` turns `#[bind(...)]` field attributes into an
//! implementation of `tessera::Binding`: a static description of every
//! field plus a setter that routes converted values to the right field.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera::Bind;
//!
//! #[derive(Default, Bind)]
//! struct ListOrders {
//!     #[bind(path = "customer")]
//!     customer_id: u64,
//!     #[bind(query, header = "x-page-size")]
//!     page_size: Option<u32>,
//!     #[bind(cookie = "session,required")]
//!     session: String,
//!     #[bind(flatten)]
//!     filter: OrderFilter,
//! }
//! ```
//!
//! # Field Attributes
//!
//! - `path`, `query`, `form`, `json`, `protobuf`, `cookie`, `header`,
//!   `raw_body`: bind from that location. A bare key uses the default
//!   lookup name; `key = "name"` overrides it; `key = "name,required"`
//!   makes that directive required; `key = "-"` excludes the location
//!   from default binding.
//! - `required`: every directive of the field is required.
//! - `nested`: the field is itself `Bind`; its name prefixes its fields.
//! - `flatten`: like `nested` but adds no name segment.
//! - `skip`: the field is never bound.
//! - `vd = "expr"`: a validation expression handed to the validator.
//!
//! # Struct Attributes
//!
//! - `protobuf`: the struct is a `prost::Message`; protobuf bodies decode
//!   into it whole.
//! - `json_bulk`: the struct is `Deserialize`; JSON bodies decode into it
//!   whole before per-field binding.

mod expand;
mod parse;

use proc_macro::TokenStream;

/// Derives `tessera::Binding` for a struct.
///
/// See the crate documentation for the accepted `#[bind(...)]` keys.
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    expand::expand_bind(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
