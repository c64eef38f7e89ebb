//! Documentation content for the stroomql CLI, generated from the function
//! registry.

use std::fmt::Write;

use super::CliError;
use crate::functions::{Category, FunctionDef, FunctionKind, registry};

const LANGUAGE_OVERVIEW: &str = r#"STROOMQL DOCUMENTATION

Expressions compute a value for each group of rows. Field values are read
with ${name}, functions are called by name (case-insensitive) and operators
combine values.

OPERATORS (tightest first)

  -x                Unary minus
  ^                 Power
  * / %             Multiply, divide, modulus
  + -               Add (concatenates text), subtract
  = != < <= > >=    Comparison, not chained
  and               Both true
  or                Either true

LITERALS

  42  1.5  1e3      Numbers (doubles)
  'text'  "text"    Strings, double the quote to embed it: 'it''s'
  true() false()    Booleans
  null() err()      Null and error values
"#;

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> String {
    let mut out = String::from(LANGUAGE_OVERVIEW);
    out.push_str("\nFUNCTION CATEGORIES\n\n");
    for category in Category::ALL {
        let _ = writeln!(
            out,
            "  {:<16}  {} ({} functions)",
            category.name(),
            category.description(),
            registry().by_category(category).len()
        );
    }
    out.push_str("\nRun 'stroomql doc <category>' for the functions of a category.\n");
    out
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<String, CliError> {
    let category = Category::from_name(name).ok_or_else(|| CliError::UnknownCategory(name.to_string()))?;

    let mut out = String::new();
    let _ = writeln!(out, "{}\n\n{}\n", category.name().to_uppercase(), category.description());
    for def in registry().by_category(category) {
        write_function(&mut out, def);
    }
    Ok(out)
}

fn write_function(out: &mut String, def: &FunctionDef) {
    let _ = writeln!(out, "{}", def.name);
    if !def.aliases.is_empty() {
        let _ = writeln!(out, "  aliases: {}", def.aliases.join(", "));
    }
    for signature in &def.signatures {
        let kind = match signature.kind() {
            FunctionKind::Scalar => "",
            FunctionKind::Aggregate => " [aggregate]",
            FunctionKind::Selector => " [selector]",
        };
        let _ = writeln!(
            out,
            "  {} -> {}{}\n      {}",
            signature.usage(def.name),
            signature.returns,
            kind,
            signature.description
        );
    }
    out.push('\n');
}
