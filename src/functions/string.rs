//! String functions.
//!
//! Positions are character offsets, zero-based. A Null subject yields Null,
//! except for `concat` where Null contributes nothing.

use regex::Regex;
use url::form_urlencoded;

use super::{Category, FunctionDef, Signature, arg, number, text, text_arg};
use crate::value::Val;

pub(crate) fn definitions() -> Vec<FunctionDef> {
    vec![
        FunctionDef::new("concat", Category::String).signature(
            Signature::scalar(vec![arg("value")], "string", "Join the arguments into one string", |args, _| {
                Val::String(args.iter().map(Val::to_text).collect())
            })
            .variadic(arg("value")),
        ),
        FunctionDef::new("substring", Category::String).signature(Signature::scalar(
            vec![text("value"), number("start"), number("end")],
            "string",
            "Characters from start (inclusive) to end (exclusive)",
            |args, _| substring(args),
        )),
        FunctionDef::new("substringBefore", Category::String).signature(Signature::scalar(
            vec![text("value"), text("delimiter")],
            "string",
            "Text before the first delimiter, empty if absent",
            |args, _| with_delimiter(args, |s, d| s.find(d).map(|i| s[..i].to_string())),
        )),
        FunctionDef::new("substringAfter", Category::String).signature(Signature::scalar(
            vec![text("value"), text("delimiter")],
            "string",
            "Text after the first delimiter, empty if absent",
            |args, _| with_delimiter(args, |s, d| s.find(d).map(|i| s[i + d.len()..].to_string())),
        )),
        FunctionDef::new("stringLength", Category::String).signature(Signature::scalar(
            vec![text("value")],
            "integer",
            "Number of characters",
            |args, _| {
                map_text(args, |s| {
                    Val::Integer(i32::try_from(s.chars().count()).unwrap_or(i32::MAX))
                })
            },
        )),
        FunctionDef::new("upperCase", Category::String).signature(Signature::scalar(
            vec![text("value")],
            "string",
            "Upper-case form",
            |args, _| map_text(args, |s| Val::String(s.to_uppercase())),
        )),
        FunctionDef::new("lowerCase", Category::String).signature(Signature::scalar(
            vec![text("value")],
            "string",
            "Lower-case form",
            |args, _| map_text(args, |s| Val::String(s.to_lowercase())),
        )),
        FunctionDef::new("replace", Category::String).signature(Signature::scalar(
            vec![text("value"), text("pattern"), text("replacement")],
            "string",
            "Replace every match of the regex pattern",
            |args, _| replace(args),
        )),
        FunctionDef::new("decode", Category::String).signature(
            Signature::scalar(
                vec![text("value"), text("pattern"), arg("result"), arg("otherwise")],
                "any",
                "Result for the first pattern that matches the whole value, else otherwise",
                |args, _| decode(args),
            )
            .variadic(arg("pattern, result")),
        ),
        FunctionDef::new("match", Category::String).signature(Signature::scalar(
            vec![text("value"), text("pattern")],
            "boolean",
            "Whether the regex pattern matches the whole value",
            |args, _| {
                let (Some(value), Some(pattern)) = (text_arg(args, 0), text_arg(args, 1)) else {
                    return Val::Null;
                };
                match full_match(&pattern) {
                    Ok(re) => Val::Boolean(re.is_match(&value)),
                    Err(e) => e,
                }
            },
        )),
        FunctionDef::new("include", Category::String).signature(
            Signature::scalar(
                vec![text("value"), text("pattern")],
                "string",
                "The value if any pattern matches it, else null",
                |args, _| filter(args, true),
            )
            .variadic(text("pattern")),
        ),
        FunctionDef::new("exclude", Category::String).signature(
            Signature::scalar(
                vec![text("value"), text("pattern")],
                "string",
                "Null if any pattern matches the value, else the value",
                |args, _| filter(args, false),
            )
            .variadic(text("pattern")),
        ),
        FunctionDef::new("contains", Category::String).signature(Signature::scalar(
            vec![text("value"), text("substring")],
            "boolean",
            "Whether the value contains the substring",
            |args, _| match (text_arg(args, 0), text_arg(args, 1)) {
                (Some(s), Some(sub)) => Val::Boolean(s.contains(&sub)),
                _ => Val::Null,
            },
        )),
        FunctionDef::new("indexOf", Category::String).signature(Signature::scalar(
            vec![text("value"), text("substring")],
            "integer",
            "Position of the first occurrence, -1 if absent",
            |args, _| position(args, |s, sub| s.find(sub)),
        )),
        FunctionDef::new("lastIndexOf", Category::String).signature(Signature::scalar(
            vec![text("value"), text("substring")],
            "integer",
            "Position of the last occurrence, -1 if absent",
            |args, _| position(args, |s, sub| s.rfind(sub)),
        )),
        FunctionDef::new("encodeUrl", Category::String).signature(Signature::scalar(
            vec![text("value")],
            "string",
            "Form-encode the value for use in a URL",
            |args, _| map_text(args, |s| Val::String(form_urlencoded::byte_serialize(s.as_bytes()).collect())),
        )),
        FunctionDef::new("decodeUrl", Category::String).signature(Signature::scalar(
            vec![text("value")],
            "string",
            "Decode a form-encoded URL value",
            |args, _| map_text(args, |s| Val::String(decode_url(s))),
        )),
    ]
}

fn map_text(args: &[Val], f: impl Fn(&str) -> Val) -> Val {
    match text_arg(args, 0) {
        Some(s) => f(&s),
        None => Val::Null,
    }
}

fn with_delimiter(args: &[Val], f: fn(&str, &str) -> Option<String>) -> Val {
    match (text_arg(args, 0), text_arg(args, 1)) {
        (Some(s), Some(d)) => Val::String(f(&s, &d).unwrap_or_default()),
        _ => Val::Null,
    }
}

/// Byte offset of a match converted to a character position.
fn position(args: &[Val], find: fn(&str, &str) -> Option<usize>) -> Val {
    match (text_arg(args, 0), text_arg(args, 1)) {
        (Some(s), Some(sub)) => match find(&s, &sub) {
            Some(byte) => Val::Integer(i32::try_from(s[..byte].chars().count()).unwrap_or(i32::MAX)),
            None => Val::Integer(-1),
        },
        _ => Val::Null,
    }
}

/// Form-decode a whole value. Separators are escaped first so the value
/// decodes as a single key.
fn decode_url(s: &str) -> String {
    let escaped = s.replace('&', "%26").replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

fn substring(args: &[Val]) -> Val {
    let Some(s) = text_arg(args, 0) else {
        return Val::Null;
    };
    let (Some(start), Some(end)) = (args[1].to_long(), args[2].to_long()) else {
        return Val::error("substring expects numeric start and end positions");
    };
    if start < 0 {
        return Val::error(format!("substring start {} is negative", start));
    }
    let start = start as usize;
    let end = end.max(0) as usize;
    if start >= end {
        return Val::String(String::new());
    }
    Val::String(s.chars().skip(start).take(end - start).collect())
}

/// Compile a pattern that must match the whole input.
fn full_match(pattern: &str) -> Result<Regex, Val> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| Val::error(format!("Invalid pattern '{}': {}", pattern, e)))
}

fn replace(args: &[Val]) -> Val {
    let (Some(s), Some(pattern)) = (text_arg(args, 0), text_arg(args, 1)) else {
        return Val::Null;
    };
    let replacement = text_arg(args, 2).unwrap_or_default();
    match Regex::new(&pattern) {
        Ok(re) => Val::String(re.replace_all(&s, replacement.as_str()).into_owned()),
        Err(e) => Val::error(format!("Invalid pattern '{}': {}", pattern, e)),
    }
}

fn decode(args: &[Val]) -> Val {
    if args.len() % 2 != 0 {
        return Val::error("decode expects a value, pattern/result pairs and an otherwise value");
    }
    let Some(s) = text_arg(args, 0) else {
        return Val::Null;
    };
    let otherwise = args.len() - 1;
    for pair in args[1..otherwise].chunks(2) {
        let pattern = pair[0].to_text();
        match full_match(&pattern) {
            Ok(re) if re.is_match(&s) => return pair[1].clone(),
            Ok(_) => {}
            Err(e) => return e,
        }
    }
    args[otherwise].clone()
}

fn filter(args: &[Val], include: bool) -> Val {
    let Some(s) = text_arg(args, 0) else {
        return Val::Null;
    };
    for pattern in &args[1..] {
        match full_match(&pattern.to_text()) {
            Ok(re) if re.is_match(&s) => {
                return if include { Val::String(s) } else { Val::Null };
            }
            Ok(_) => {}
            Err(e) => return e,
        }
    }
    if include { Val::Null } else { Val::String(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Val {
        Val::from(v)
    }

    #[test]
    fn test_substring_clamps() {
        assert_eq!(substring(&[s("this"), Val::Double(1.0), Val::Double(2.0)]), s("h"));
        assert_eq!(substring(&[s("his"), Val::Double(2.0), Val::Double(99.0)]), s("s"));
        assert_eq!(substring(&[s("his"), Val::Double(7.0), Val::Double(9.0)]), s(""));
        assert!(substring(&[s("his"), Val::Integer(-1), Val::Double(2.0)]).is_error());
    }

    #[test]
    fn test_decode() {
        let args = [s("fred"), s("fr.+"), s("freda"), s("freddy")];
        assert_eq!(decode(&args), s("freda"));
        let args = [s("alfred"), s("fr.+"), s("freda"), s("freddy")];
        assert_eq!(decode(&args), s("freddy"));
        assert!(decode(&[s("a"), s("b"), s("c")]).is_error());
    }

    #[test]
    fn test_include_exclude() {
        assert_eq!(filter(&[s("this"), s("t.*"), s("x")], true), s("this"));
        assert_eq!(filter(&[s("this"), s("x")], true), Val::Null);
        assert_eq!(filter(&[s("this"), s("t.*")], false), Val::Null);
    }

    #[test]
    fn test_decode_url() {
        assert_eq!(decode_url("a+b%26c"), "a b&c");
        assert_eq!(decode_url("x=1&y"), "x=1&y");
        assert_eq!(decode_url(""), "");
    }

    #[test]
    fn test_position_counts_characters() {
        assert_eq!(position(&[s("héllo"), s("l")], |a, b| a.find(b)), Val::Integer(2));
        assert_eq!(position(&[s("hello"), s("q")], |a, b| a.find(b)), Val::Integer(-1));
    }
}
