use prost::Message;

use crate::Any;

/// Encode `msg` into an `Any` tagged with `type_url`.
pub fn pack<M: Message>(type_url: &str, msg: &M) -> Any {
    Any {
        type_url: type_url.to_string(),
        value: msg.encode_to_vec(),
    }
}

/// Decode the payload of `any` as `M`.
///
/// The type URL is not checked; callers that care compare it first.
pub fn unpack<M: Message + Default>(any: &Any) -> Result<M, prost::DecodeError> {
    M::decode(any.value.as_slice())
}
