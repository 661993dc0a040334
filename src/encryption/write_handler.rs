//! Object-level encryption walk.
//!
//! Strings and stream data within an indirect object are encrypted with the
//! key of the containing object; everything else is copied as is.

use super::SecurityHandler;
use crate::error::Result;
use crate::object::{Dict, Object};
use bytes::Bytes;

/// Encrypt every string and stream payload in `obj` on behalf of object `obj_num`.
pub fn encrypt_object<H: SecurityHandler + ?Sized>(
    handler: &H,
    obj: &Object,
    obj_num: u32,
    gen_num: u16,
) -> Result<Object> {
    Ok(match obj {
        Object::String(s) => Object::String(handler.encrypt_string(s, obj_num, gen_num)?),
        Object::Array(arr) => Object::Array(
            arr.iter()
                .map(|item| encrypt_object(handler, item, obj_num, gen_num))
                .collect::<Result<Vec<_>>>()?,
        ),
        Object::Dictionary(dict) => {
            Object::Dictionary(encrypt_dictionary(handler, dict, obj_num, gen_num)?)
        },
        Object::Stream { dict, data } => {
            let encrypted = handler.encrypt_stream(data, obj_num, gen_num)?;
            let mut dict = encrypt_dictionary(handler, dict, obj_num, gen_num)?;
            dict.insert("Length".to_string(), Object::Integer(encrypted.len() as i64));
            Object::Stream {
                dict,
                data: Bytes::from(encrypted),
            }
        },
        other => other.clone(),
    })
}

fn encrypt_dictionary<H: SecurityHandler + ?Sized>(
    handler: &H,
    dict: &Dict,
    obj_num: u32,
    gen_num: u16,
) -> Result<Dict> {
    dict.iter()
        .map(|(k, v)| Ok((k.clone(), encrypt_object(handler, v, obj_num, gen_num)?)))
        .collect()
}
