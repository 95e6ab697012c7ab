pub mod functions;

use crate::{
    core::{
        error::{DothttpError, FileKind},
        paths::relative_to,
    },
    property::{json_eval, PropertyResolver},
    syntax::{
        analyze::read_source,
        ast::{Document, VarBody, VarDecl},
        parse, RequestNode,
    },
};
use indexmap::IndexSet;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads `path` with its imports and evaluates every `var` into `resolver`.
pub fn load_file(
    path: &Path,
    resolver: &mut PropertyResolver,
) -> Result<Vec<RequestNode>, DothttpError> {
    let source = read_source(path, FileKind::Http)?;
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    load_content(&source, Some(&canonical), resolver)
}

/// Like [`load_file`] for in-memory content. `path` anchors relative imports.
pub fn load_content(
    content: &str,
    path: Option<&Path>,
    resolver: &mut PropertyResolver,
) -> Result<Vec<RequestNode>, DothttpError> {
    let doc = parse(content, path)?;
    let mut visited = IndexSet::new();
    if let Some(p) = path {
        visited.insert(p.to_path_buf());
    }
    let requests = load_document(doc, content, resolver, &mut visited)?;
    check_names(&requests)?;
    Ok(requests)
}

fn load_document(
    doc: Document,
    source: &str,
    resolver: &mut PropertyResolver,
    visited: &mut IndexSet<PathBuf>,
) -> Result<Vec<RequestNode>, DothttpError> {
    let Document {
        imports,
        vars,
        requests,
        source_path,
    } = doc;
    let mut requests: Vec<RequestNode> = requests
        .into_iter()
        .map(|mut r| {
            r.source_path = source_path.clone();
            r
        })
        .collect();

    for import in &imports {
        let target = resolve_import(source_path.as_deref(), &import.path)?;
        let canonical = target.canonicalize().unwrap_or(target);
        if !visited.insert(canonical.clone()) {
            debug!("import `{}` already loaded", canonical.display());
            continue;
        }
        debug!("importing `{}`", canonical.display());
        let text = read_source(&canonical, FileKind::Import)?;
        let imported = parse(&text, Some(&canonical))?;
        requests.extend(load_document(imported, &text, resolver, visited)?);
    }

    resolver.add_infile_properties(source);
    for var in &vars {
        evaluate_var(var, resolver)?;
    }
    Ok(requests)
}

fn resolve_import(importer: Option<&Path>, path: &str) -> Result<PathBuf, DothttpError> {
    let direct = relative_to(importer, path);
    if direct.is_file() {
        return Ok(direct);
    }
    let with_suffix = relative_to(importer, &format!("{path}.http"));
    if with_suffix.is_file() {
        return Ok(with_suffix);
    }
    Err(DothttpError::file_not_found(FileKind::Import, path))
}

/// Evaluates a `var` declaration once and stores it as an in-file property.
pub fn evaluate_var(var: &VarDecl, resolver: &mut PropertyResolver) -> Result<(), DothttpError> {
    let value = match &var.body {
        VarBody::Value(ast) => match json_eval::evaluate(ast, resolver)? {
            Value::String(s) => s,
            other => other.to_string(),
        },
        VarBody::Function { name, args } => {
            let args = args
                .iter()
                .map(|a| resolver.get_updated_content(a))
                .collect::<Result<Vec<_>, _>>()?;
            functions::call(name, &args)
                .map_err(|e| DothttpError::Generic(format!("var `{}`: {e}", var.name)))?
        }
        VarBody::Template(template) => resolver.format_template(template),
    };
    debug!("var `{}` = `{value}`", var.name);
    resolver.add_infile_property_from_var(&var.name, value, true);
    Ok(())
}

/// Every request is addressable by its name or 1-based index; both must be unique.
pub fn check_names(requests: &[RequestNode]) -> Result<(), DothttpError> {
    let mut seen = IndexSet::new();
    for (index, req) in requests.iter().enumerate() {
        let position = (index + 1).to_string();
        let mut names = vec![position.clone()];
        if let Some(name) = &req.name {
            if *name != position {
                names.push(name.clone());
            }
        }
        for name in names {
            if !seen.insert(name.clone()) {
                return Err(DothttpError::DuplicateTarget(name));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn names(requests: &[RequestNode]) -> Vec<String> {
        requests
            .iter()
            .map(|r| r.name.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_imports_are_appended_depth_first() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("base.http"),
            "import \"deep\";\n@name(\"base\")\nGET \"https://base\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("deep.http"), "@name(\"deep\")\n\"https://deep\"\n").unwrap();
        let main = dir.path().join("main.http");
        fs::write(&main, "import \"base.http\";\n@name(\"main\")\n\"https://main\"\n").unwrap();

        let mut r = PropertyResolver::new(None);
        let requests = load_file(&main, &mut r).unwrap();
        assert_eq!(names(&requests), vec!["main", "base", "deep"]);
        assert_eq!(
            requests[2].source_path.as_ref().unwrap().file_name().unwrap(),
            "deep.http"
        );
    }

    #[test]
    fn test_import_cycle_loads_once() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.http");
        fs::write(&a, "import \"b\";\n@name(\"a\")\n\"https://a\"\n").unwrap();
        fs::write(dir.path().join("b.http"), "import \"a\";\n@name(\"b\")\n\"https://b\"\n").unwrap();
        let mut r = PropertyResolver::new(None);
        assert_eq!(names(&load_file(&a, &mut r).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_import() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("main.http");
        fs::write(&main, "import \"missing.http\";\n\"https://main\"\n").unwrap();
        let mut r = PropertyResolver::new(None);
        let err = load_file(&main, &mut r).unwrap_err();
        assert_eq!(err.to_string(), "import file: `missing.http` not found");
    }

    #[test]
    fn test_imported_vars_and_defaults_are_visible() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("vars.http"),
            "var host = \"example.com\";\n\"https://{{scheme=https}}\"\n",
        )
        .unwrap();
        let main = dir.path().join("main.http");
        fs::write(&main, "import \"vars\";\nvar url = p\"{host}/v1\";\n\"https://{{url}}\"\n").unwrap();
        let mut r = PropertyResolver::new(None);
        load_file(&main, &mut r).unwrap();
        assert_eq!(
            r.resolve_property_string("url").unwrap(),
            Some("example.com/v1".to_string())
        );
        assert_eq!(
            r.resolve_property_string("scheme").unwrap(),
            Some("https".to_string())
        );
    }

    #[test]
    fn test_var_forms() {
        let mut r = PropertyResolver::new(None);
        r.add_command_line_property("name", "ada");
        load_content(
            "var token = \"abc\";\n\
             var obj = {\"a\": [1, 2, {\"b\": token}]};\n\
             var sec = 60 * 60;\n\
             var id = $randomStr(8);\n\
             var greeting = p\"hello {name}\";\n",
            None,
            &mut r,
        )
        .unwrap();
        let get = |r: &PropertyResolver, k: &str| r.resolve_property_string(k).unwrap().unwrap();
        assert_eq!(get(&r, "token"), "abc");
        assert_eq!(get(&r, "obj"), r#"{"a":[1,2,{"b":"abc"}]}"#);
        assert_eq!(get(&r, "sec"), "3600");
        assert_eq!(get(&r, "id").len(), 8);
        assert_eq!(get(&r, "greeting"), "hello ada");
        // evaluated once
        assert_eq!(get(&r, "id"), get(&r, "id"));
    }

    #[test]
    fn test_duplicate_names() {
        let mut r = PropertyResolver::new(None);
        let err = load_content(
            "@name(\"a\")\n\"https://x\"\n@name(\"a\")\n\"https://y\"\n",
            None,
            &mut r,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "target: `a` appeared twice or more");

        let err = load_content("\"https://x\"\n@name(\"1\")\n\"https://y\"\n", None, &mut r)
            .unwrap_err();
        assert!(matches!(err, DothttpError::DuplicateTarget(n) if n == "1"));
    }
}
