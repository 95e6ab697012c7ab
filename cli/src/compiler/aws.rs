use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

pub const DEFAULT_REGION: &str = "us-east-1";

lazy_static! {
    static ref REGION_REGEX: Regex =
        Regex::new(r"^[a-z]{2}(?:-gov|-iso[a-z]?)?-[a-z]+-\d+$").unwrap();
    static ref LEGACY_REGEX: Regex =
        Regex::new(r"^(.+)-([a-z]{2}(?:-gov)?-[a-z]+-\d+)$").unwrap();
}

/// Service and region encoded in an `amazonaws.com` host name.
pub fn infer_from_host(host: &str) -> (Option<String>, Option<String>) {
    let host = host.to_ascii_lowercase();
    let Some(prefix) = host
        .strip_suffix(".amazonaws.com.cn")
        .or_else(|| host.strip_suffix(".amazonaws.com"))
    else {
        return (None, None);
    };
    let labels: Vec<&str> = prefix.split('.').collect();

    if let Some(pos) = labels.iter().rposition(|l| REGION_REGEX.is_match(l)) {
        let service = pos.checked_sub(1).map(|i| labels[i].to_string());
        return (service, Some(labels[pos].to_string()));
    }
    if let Some(last) = labels.last() {
        if let Some(caps) = LEGACY_REGEX.captures(last) {
            return (Some(caps[1].to_string()), Some(caps[2].to_string()));
        }
        return (Some(last.to_string()), None);
    }
    (None, None)
}

/// Fills a missing service or region from the URL. A URL-derived value
/// replaces a conflicting explicit one.
pub fn resolve_service_region(
    url: &str,
    service: Option<String>,
    region: Option<String>,
) -> (String, String) {
    if let (Some(s), Some(r)) = (&service, &region) {
        return (s.clone(), r.clone());
    }
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    let (inferred_service, inferred_region) = infer_from_host(&host);

    let pick = |what: &str, explicit: Option<String>, inferred: Option<String>| match (explicit, inferred) {
        (Some(e), Some(i)) if e != i => {
            warn!("aws {what} `{e}` differs from `{i}` in the url, using `{i}`");
            Some(i)
        }
        (Some(e), _) => Some(e),
        (None, i) => i,
    };
    let service = pick("service", service, inferred_service).unwrap_or_default();
    let region = pick("region", region, inferred_region).unwrap_or_else(|| DEFAULT_REGION.to_string());
    (service, region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(host: &str) -> (Option<String>, Option<String>) {
        infer_from_host(host)
    }

    #[test]
    fn test_host_patterns() {
        assert_eq!(infer("s3.amazonaws.com"), (Some("s3".into()), None));
        assert_eq!(
            infer("s3.us-west-2.amazonaws.com"),
            (Some("s3".into()), Some("us-west-2".into()))
        );
        assert_eq!(
            infer("s3-us-west-2.amazonaws.com"),
            (Some("s3".into()), Some("us-west-2".into()))
        );
        assert_eq!(
            infer("api.ecr.us-east-1.amazonaws.com"),
            (Some("ecr".into()), Some("us-east-1".into()))
        );
        assert_eq!(infer("example.com"), (None, None));
    }

    #[test]
    fn test_resolve_defaults_and_conflicts() {
        assert_eq!(
            resolve_service_region("https://s3.amazonaws.com/bucket", None, None),
            ("s3".to_string(), "us-east-1".to_string())
        );
        assert_eq!(
            resolve_service_region(
                "https://s3.eu-west-1.amazonaws.com/",
                Some("s3".into()),
                None
            ),
            ("s3".to_string(), "eu-west-1".to_string())
        );
        assert_eq!(
            resolve_service_region(
                "https://ecr.us-east-2.amazonaws.com/",
                None,
                Some("us-west-1".into())
            ),
            ("ecr".to_string(), "us-east-2".to_string())
        );
        assert_eq!(
            resolve_service_region("https://x.example.com/", Some("s3".into()), Some("eu-west-1".into())),
            ("s3".to_string(), "eu-west-1".to_string())
        );
    }
}
