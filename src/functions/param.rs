use super::{Category, EvalEnv, FunctionDef, Signature, text, text_arg};
use crate::value::Val;

pub(crate) fn definitions() -> Vec<FunctionDef> {
    vec![
        FunctionDef::new("param", Category::Param).signature(Signature::scalar(
            vec![text("key")],
            "string",
            "Value of a named parameter, null when it is not set",
            |args, env| param(args, env),
        )),
        FunctionDef::new("params", Category::Param).signature(Signature::scalar(
            vec![],
            "string",
            "Every parameter as key=\"value\", space separated in key order",
            |_, env| Val::String(params(env)),
        )),
    ]
}

fn param(args: &[Val], env: &EvalEnv) -> Val {
    text_arg(args, 0)
        .and_then(|key| env.params.get(&key).cloned())
        .map_or(Val::Null, Val::String)
}

pub(crate) fn params(env: &EvalEnv) -> String {
    env.params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}
