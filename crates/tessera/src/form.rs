//! Form body parsing (urlencoded and multipart).

use bytes::Bytes;
use futures::executor::block_on;
use multer::{Constraints, Multipart, SizeLimit};
use std::io;

use crate::codec::{media_type, MULTIPART_FORM};
use crate::{BindError, Values};

/// Default upper bound for in-memory form parsing (32 MiB).
pub const DEFAULT_MAX_MEMORY: usize = 32 << 20;

/// Parses a form body into [`Values`].
///
/// Multipart bodies keep only their text parts; file parts are skipped.
/// Any other content type is parsed as urlencoded.
///
/// # Errors
///
/// Returns [`BindError::PayloadTooLarge`] if `body` exceeds `max_memory`,
/// [`BindError::Multipart`] for a malformed multipart body and
/// [`BindError::Urlencoded`] for malformed urlencoded data.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use tessera::{parse_form, DEFAULT_MAX_MEMORY};
///
/// let body = Bytes::from_static(b"username=alice&remember=on");
/// let form = parse_form(Some("application/x-www-form-urlencoded"), &body, DEFAULT_MAX_MEMORY).unwrap();
/// assert_eq!(form.get("username"), Some("alice"));
/// ```
pub fn parse_form(
    content_type: Option<&str>,
    body: &Bytes,
    max_memory: usize,
) -> Result<Values, BindError> {
    if body.len() > max_memory {
        return Err(BindError::PayloadTooLarge { limit: max_memory });
    }

    match content_type {
        Some(ct) if media_type(ct) == MULTIPART_FORM => parse_multipart(ct, body, max_memory),
        _ => Ok(Values::from_urlencoded_bytes(body)?),
    }
}

fn parse_multipart(
    content_type: &str,
    body: &Bytes,
    max_memory: usize,
) -> Result<Values, BindError> {
    let boundary = multer::parse_boundary(content_type)?;
    let body = body.clone();
    let stream = futures::stream::once(async move { Ok::<_, io::Error>(body) });
    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(max_memory as u64));
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    block_on(async {
        let mut values = Values::new();
        while let Some(field) = multipart.next_field().await? {
            if field.file_name().is_some() {
                continue;
            }
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let text = field.text().await?;
            values.add(name, text);
        }
        Ok::<_, BindError>(values)
    })
}
