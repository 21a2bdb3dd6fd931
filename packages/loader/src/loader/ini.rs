//! INI parameter files.
//!
//! Only the `[parameters]` section is read; other sections are syntax
//! checked and skipped.
//!
//! ```ini
//! ; comment
//! [parameters]
//! foo = bar
//! quoted = "true"
//! values[] = 1
//! values[] = 2
//! mailer[host] = localhost
//! ```

use std::path::Path;

use super::{has_extension, read_file, FileLoader, LoadContext};
use crate::configuration::Configuration;
use crate::error::{LoaderError, Result};
use crate::value::{coerce_scalar, Collection, Key, Value};

const PARAMETERS_SECTION: &str = "parameters";

/// Loads `.ini` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct IniFileLoader;

impl FileLoader for IniFileLoader {
    fn name(&self) -> &'static str {
        "ini"
    }

    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["ini"])
    }

    fn load(&self, path: &Path, _context: &mut LoadContext<'_>) -> Result<Configuration> {
        let content = read_file(path)?;
        let parameters = parse_parameters(path, &content)?;

        let mut configuration = Configuration::new();
        configuration.add_resource(path);
        configuration.add_parameters(parameters);

        tracing::debug!(
            path = %path.display(),
            parameters = configuration.parameters().len(),
            "Parsed INI file"
        );
        Ok(configuration)
    }
}

fn parse_parameters(path: &Path, content: &str) -> Result<Collection> {
    let syntax = |line: usize, message: &str| LoaderError::IniSyntax {
        path: path.to_path_buf(),
        line,
        message: message.to_string(),
    };

    let mut parameters = Collection::new();
    let mut in_parameters = false;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .ok_or_else(|| syntax(line_no, "unterminated section header"))?;
            let name = name.trim();
            in_parameters = name.eq_ignore_ascii_case(PARAMETERS_SECTION);
            if !in_parameters {
                tracing::warn!(section = name, path = %path.display(), "Ignoring INI section");
            }
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| syntax(line_no, "expected \"key = value\""))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(syntax(line_no, "empty key"));
        }

        let value = parse_value(value.trim()).ok_or_else(|| syntax(line_no, "unterminated quote"))?;
        if in_parameters {
            insert(&mut parameters, key, value).map_err(|message| syntax(line_no, message))?;
        }
    }

    Ok(parameters)
}

/// Quoted values stay strings; bare values lose trailing comments and are
/// coerced.
fn parse_value(raw: &str) -> Option<Value> {
    for quote in ['"', '\''] {
        if let Some(rest) = raw.strip_prefix(quote) {
            let end = rest.find(quote)?;
            return Some(Value::String(rest[..end].to_string()));
        }
    }

    let bare = raw.split(';').next().unwrap_or_default().trim_end();
    Some(coerce_scalar(bare))
}

/// Store a value under `name`, `name[]` or `name[sub]`.
fn insert(
    parameters: &mut Collection,
    key: &str,
    value: Value,
) -> std::result::Result<(), &'static str> {
    let Some((name, rest)) = key.split_once('[') else {
        parameters.insert(Key::parse(key), value);
        return Ok(());
    };

    let sub = rest.strip_suffix(']').ok_or("malformed key")?.trim();
    let name = Key::parse(name.trim());

    if !matches!(parameters.get(name.clone()), Some(Value::Collection(_))) {
        parameters.insert(name.clone(), Collection::new());
    }
    if let Some(Value::Collection(entry)) = parameters.get_mut(name) {
        if sub.is_empty() {
            entry.push(value).ok_or("no index left for \"[]\"")?;
        } else {
            entry.insert(Key::parse(sub), value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(content: &str) -> Result<Collection> {
        parse_parameters(Path::new("test.ini"), content)
    }

    #[test]
    fn test_parameters_section() {
        let parameters = parse(
            "; leading comment\n\
             [other]\n\
             ignored = 1\n\
             \n\
             [parameters]\n\
             foo = bar\n\
             # another comment\n\
             enabled = true\n\
             port = 8080 ; inline comment\n\
             quoted = \"on\"\n\
             single = 'a ; b'\n",
        )
        .unwrap();

        assert_eq!(parameters.len(), 5);
        assert_eq!(parameters.get("foo"), Some(&Value::from("bar")));
        assert_eq!(parameters.get("enabled"), Some(&Value::Bool(true)));
        assert_eq!(parameters.get("port"), Some(&Value::Int(8080)));
        assert_eq!(parameters.get("quoted"), Some(&Value::from("on")));
        assert_eq!(parameters.get("single"), Some(&Value::from("a ; b")));
        assert!(!parameters.contains_key("ignored"));
    }

    #[test]
    fn test_array_keys() {
        let parameters = parse(
            "[parameters]\n\
             values[] = true\n\
             values[] = false\n\
             mailer[host] = localhost\n\
             mailer[port] = 25\n",
        )
        .unwrap();

        assert_eq!(
            parameters.get("values"),
            Some(&Value::list([true, false]))
        );
        let mailer = parameters.get("mailer").unwrap().as_collection().unwrap();
        assert_eq!(mailer.get("host"), Some(&Value::from("localhost")));
        assert_eq!(mailer.get("port"), Some(&Value::Int(25)));
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let err = parse("[parameters]\nfoo\n").unwrap_err();
        assert!(matches!(err, LoaderError::IniSyntax { line: 2, .. }));

        let err = parse("[parameters\n").unwrap_err();
        assert!(matches!(err, LoaderError::IniSyntax { line: 1, .. }));

        let err = parse("[parameters]\nfoo = \"open\n").unwrap_err();
        assert!(matches!(err, LoaderError::IniSyntax { line: 2, .. }));
    }

    #[test]
    fn test_append_after_max_index_is_rejected() {
        let err = parse(
            "[parameters]\n\
             values[9223372036854775807] = first\n\
             values[] = second\n",
        )
        .unwrap_err();

        assert!(matches!(err, LoaderError::IniSyntax { line: 3, .. }));
        assert!(err.to_string().contains("no index left"));
    }

    #[test]
    fn test_xml_content_is_rejected() {
        let err = parse("<?xml version=\"1.0\"?>\n<container/>\n").unwrap_err();
        assert!(matches!(err, LoaderError::IniSyntax { line: 2, .. }));
    }
}
