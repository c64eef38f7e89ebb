use sha2::{Digest, Sha256, Sha384, Sha512};

use super::{Category, FunctionDef, Signature, text, text_arg};
use crate::value::Val;

const DEFAULT_ALGORITHM: &str = "SHA-256";

pub(crate) fn definitions() -> Vec<FunctionDef> {
    vec![
        FunctionDef::new("hash", Category::String)
            .signature(Signature::scalar(
                vec![text("value")],
                "string",
                "Hex SHA-256 digest of the value",
                |args, _| hash(args),
            ))
            .signature(Signature::scalar(
                vec![text("value"), text("algorithm")],
                "string",
                "Hex digest of the value using MD5, SHA-256, SHA-384 or SHA-512",
                |args, _| hash(args),
            ))
            .signature(Signature::scalar(
                vec![text("value"), text("algorithm"), text("salt")],
                "string",
                "Hex digest of the salt followed by the value",
                |args, _| hash(args),
            )),
    ]
}

fn hash(args: &[Val]) -> Val {
    let Some(value) = text_arg(args, 0) else {
        return Val::Null;
    };
    let algorithm = text_arg(args, 1).unwrap_or_else(|| DEFAULT_ALGORITHM.to_string());
    let salt = text_arg(args, 2).unwrap_or_default();
    let mut input = salt.into_bytes();
    input.extend_from_slice(value.as_bytes());

    match digest(&algorithm, &input) {
        Some(bytes) => Val::String(hex::encode(bytes)),
        None => Val::error(format!("{} digest is not available", algorithm)),
    }
}

fn digest(algorithm: &str, input: &[u8]) -> Option<Vec<u8>> {
    let normalized = algorithm.to_uppercase().replace('-', "");
    match normalized.as_str() {
        "MD5" => Some(md5::compute(input).0.to_vec()),
        "SHA256" => Some(Sha256::digest(input).to_vec()),
        "SHA384" => Some(Sha384::digest(input).to_vec()),
        "SHA512" => Some(Sha512::digest(input).to_vec()),
        _ => None,
    }
}
