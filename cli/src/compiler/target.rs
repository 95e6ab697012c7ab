use crate::{
    core::error::DothttpError,
    syntax::{position::display_name, RequestNode},
};

pub const DEFAULT_TARGET: &str = "1";

fn find_by_name(requests: &[RequestNode], name: &str) -> Option<usize> {
    requests
        .iter()
        .enumerate()
        .position(|(i, r)| display_name(r, i) == name)
}

/// A decimal target is a 1-based index; anything else, or an index out of
/// range, is looked up by name.
pub fn select_target(requests: &[RequestNode], target: &str) -> Result<usize, DothttpError> {
    let target = target.trim();
    if let Ok(n) = target.parse::<usize>() {
        if (1..=requests.len()).contains(&n) {
            return Ok(n - 1);
        }
    }
    find_by_name(requests, target).ok_or_else(|| DothttpError::TargetNotFound(target.to_string()))
}

/// Indices of the request and its ancestors, child first.
pub fn resolve_chain(requests: &[RequestNode], index: usize) -> Result<Vec<usize>, DothttpError> {
    let mut chain = vec![index];
    loop {
        let current = chain[chain.len() - 1];
        let Some(base) = requests[current].base.as_deref() else {
            break;
        };
        let name = display_name(&requests[current], current);
        let parent = find_by_name(requests, base).ok_or_else(|| DothttpError::UndefinedBase {
            name: name.clone(),
            base: base.to_string(),
        })?;
        if chain.contains(&parent) {
            let mut names: Vec<String> = chain
                .iter()
                .map(|i| display_name(&requests[*i], *i))
                .collect();
            names.push(base.to_string());
            return Err(DothttpError::CircularBase { chain: names });
        }
        chain.push(parent);
    }
    Ok(chain)
}

pub fn is_absolute(url: &str) -> bool {
    ["http://", "https://", "http+unix://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

/// Joins `next` onto `base`. An absolute `next` replaces the base. A leading
/// `/` replaces the path of a base ending in `/`; any other relative `next`
/// is appended with a single `/`.
pub fn join_url(base: &str, next: &str) -> String {
    if base.is_empty() || is_absolute(next) {
        return next.to_string();
    }
    if next.is_empty() {
        return base.to_string();
    }
    if next.starts_with('/') && base.ends_with('/') {
        let authority_start = base.find("://").map(|i| i + 3).unwrap_or(0);
        let path_start = base[authority_start..]
            .find(['/', '?'])
            .map(|i| i + authority_start)
            .unwrap_or(base.len());
        return format!("{}{next}", &base[..path_start]);
    }
    format!("{}/{}", base.trim_end_matches('/'), next.trim_start_matches('/'))
}

pub fn with_default_scheme(url: &str) -> String {
    if is_absolute(url) {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn requests(text: &str) -> Vec<RequestNode> {
        parse(text, None).unwrap().requests
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://h/a/", "/b/c"), "https://h/b/c");
        assert_eq!(join_url("https://h/a", "b"), "https://h/a/b");
        assert_eq!(join_url("https://h/a/", "b"), "https://h/a/b");
        assert_eq!(join_url("https://h", "/b"), "https://h/b");
        assert_eq!(join_url("https://h/v1", "/things"), "https://h/v1/things");
        assert_eq!(join_url("https://h/a", "http://other/x"), "http://other/x");
        assert_eq!(join_url("", "/b"), "/b");
        assert_eq!(join_url("localhost:8000/api/", "/v2"), "localhost:8000/v2");
    }

    #[test]
    fn test_default_scheme() {
        assert_eq!(with_default_scheme("localhost/x"), "http://localhost/x");
        assert_eq!(with_default_scheme("https://h"), "https://h");
        assert_eq!(
            with_default_scheme("localhost/cb?next=http://a"),
            "http://localhost/cb?next=http://a"
        );
    }

    #[test]
    fn test_select_target() {
        let reqs = requests("@name(\"a\")\n\"https://a\"\n\"https://b\"\n@name(\"c\")\n\"https://c\"\n");
        assert_eq!(select_target(&reqs, "1").unwrap(), 0);
        assert_eq!(select_target(&reqs, "2").unwrap(), 1);
        assert_eq!(select_target(&reqs, "c").unwrap(), 2);
        assert!(matches!(
            select_target(&reqs, "9"),
            Err(DothttpError::TargetNotFound(t)) if t == "9"
        ));
        assert!(matches!(
            select_target(&reqs, "zzz"),
            Err(DothttpError::TargetNotFound(_))
        ));
    }

    #[test]
    fn test_chain_errors() {
        let reqs = requests("@name(\"a\") : \"b\"\n\"https://a\"\n@name(\"b\") : \"a\"\n\"https://b\"\n");
        let err = resolve_chain(&reqs, 0).unwrap_err();
        assert_eq!(err.to_string(), "circular inheritance detected: a -> b -> a");

        let reqs = requests("@name(\"a\") : \"a\"\n\"https://a\"\n");
        assert!(matches!(
            resolve_chain(&reqs, 0),
            Err(DothttpError::CircularBase { .. })
        ));

        let reqs = requests("@name(\"a\") : \"ghost\"\n\"https://a\"\n");
        assert_eq!(
            resolve_chain(&reqs, 0).unwrap_err().to_string(),
            "request `a` extends `ghost`, which is not defined"
        );
    }

    #[test]
    fn test_chain_order() {
        let reqs = requests(
            "@name(\"root\")\n\"https://h\"\n@name(\"mid\") : \"root\"\n\"a\"\n@name(\"leaf\") : \"mid\"\n\"b\"\n",
        );
        assert_eq!(resolve_chain(&reqs, 2).unwrap(), vec![2, 1, 0]);
    }
}
