use super::ast::{
    AuthAst, AzureAuthAst, CertAst, Document, JsonAst, JsonKey, PayloadAst, QuoteKind,
    RequestNode, ScriptLang, StrLit, VarBody,
};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Quotes a value: double quotes unless the value holds a double quote and no
/// single quote. With both present single quotes are escaped.
pub fn quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    let has_double = escaped.contains('"');
    let has_single = escaped.contains('\'');
    match (has_double, has_single) {
        (false, _) => format!("\"{escaped}\""),
        (true, false) => format!("'{escaped}'"),
        (true, true) => format!("'{}'", escaped.replace('\'', "\\'")),
    }
}

/// Triple quotes are kept only when the delimiter cannot end the chunk early.
fn quote_lit(lit: &StrLit) -> String {
    if lit.quote == QuoteKind::Triple {
        let value = &lit.value;
        if !value.contains("\"\"\"") && !value.ends_with('"') {
            return format!("\"\"\"{value}\"\"\"");
        }
        if !value.contains("'''") && !value.ends_with('\'') {
            return format!("'''{value}'''");
        }
    }
    quote(&lit.value)
}

pub fn format_document(doc: &Document) -> String {
    let mut out = String::new();
    for import in &doc.imports {
        let _ = writeln!(out, "import {};", quote(&import.path));
    }
    for var in &doc.vars {
        let _ = writeln!(out, "var {} = {};", var.name, format_var_body(&var.body));
    }
    if !out.is_empty() {
        out.push('\n');
    }
    for req in &doc.requests {
        out.push_str(&format_request(req));
    }
    out
}

fn format_var_body(body: &VarBody) -> String {
    match body {
        VarBody::Value(json) => format_json(json, 0),
        VarBody::Function { name, args } => {
            let args: Vec<String> = args
                .iter()
                .map(|a| {
                    if a.parse::<f64>().is_ok() || a.starts_with("{{") {
                        a.clone()
                    } else {
                        quote(a)
                    }
                })
                .collect();
            format!("${name}({})", args.join(", "))
        }
        VarBody::Template(t) => format!("p{}", quote(t)),
    }
}

/// Renders one request block, terminated by two blank lines.
pub fn format_request(req: &RequestNode) -> String {
    let mut out = String::new();
    if let Some(desc) = &req.description {
        for line in desc.lines() {
            let _ = writeln!(out, "// {line}");
        }
    }
    if let Some(name) = &req.name {
        match &req.base {
            Some(base) => {
                let _ = writeln!(out, "@name({}) : {}", quote(name), quote(base));
            }
            None => {
                let _ = writeln!(out, "@name({})", quote(name));
            }
        }
    }
    if req.flags.clear {
        out.push_str("@clear\n");
    }
    if req.flags.insecure {
        out.push_str("@insecure\n");
    }
    if req.flags.no_parent_script {
        out.push_str("@no-parent-script\n");
    }
    for (key, value) in &req.named_args {
        let _ = writeln!(out, "@{key}({})", quote(value));
    }
    match &req.method {
        Some(m) => {
            let _ = writeln!(out, "{} {}", m.as_str(), quote(&req.url));
        }
        None => {
            let _ = writeln!(out, "{}", quote(&req.url));
        }
    }
    if let Some(auth) = &req.auth {
        let _ = writeln!(out, "{}", format_auth(auth));
    }
    if let Some(cert) = &req.certificate {
        let _ = writeln!(out, "{}", format_certificate(cert));
    }
    for (k, v) in &req.headers {
        let _ = writeln!(out, "{}: {}", quote(k), quote(v));
    }
    for (k, v) in &req.queries {
        let _ = writeln!(out, "? {}= {}", quote(k), quote(v));
    }
    if let Some(payload) = &req.payload {
        let _ = writeln!(out, "{}", format_payload(payload));
    }
    if let Some(output) = &req.output {
        let _ = writeln!(out, "output({})", quote(output));
    }
    if let Some(script) = &req.script {
        let lang = match script.lang {
            ScriptLang::JavaScript => "",
            ScriptLang::Python => " python",
        };
        let _ = writeln!(out, "> {{%{lang}\n{}\n%}}", script.source);
    }
    out.push_str("\n\n");
    out
}

fn named(func: &str, args: &[(&str, Option<&String>)]) -> String {
    let parts: Vec<String> = args
        .iter()
        .filter_map(|(k, v)| v.map(|v| format!("{k}={}", quote(v))))
        .collect();
    format!("{func}({})", parts.join(", "))
}

pub fn format_auth(auth: &AuthAst) -> String {
    match auth {
        AuthAst::Basic { user, pass } => format!("basicauth({}, {})", quote(user), quote(pass)),
        AuthAst::Digest { user, pass } => format!("digestauth({}, {})", quote(user), quote(pass)),
        AuthAst::Ntlm { user, pass } => format!("ntlmauth({}, {})", quote(user), quote(pass)),
        AuthAst::Hawk { id, key, algorithm } => match algorithm {
            Some(algo) => format!("hawkauth({}, {}, {})", quote(id), quote(key), quote(algo)),
            None => format!("hawkauth({}, {})", quote(id), quote(key)),
        },
        AuthAst::AwsV4 {
            access_id,
            secret_key,
            service,
            region,
            session_token,
        } => named(
            "awsauth",
            &[
                ("access_id", Some(access_id)),
                ("secret_key", Some(secret_key)),
                ("service", service.as_ref()),
                ("region", region.as_ref()),
                ("session_token", session_token.as_ref()),
            ],
        ),
        AuthAst::Azure(AzureAuthAst::ServicePrincipal {
            tenant_id,
            client_id,
            client_secret,
            scope,
        }) => named(
            "azurespsecret",
            &[
                ("tenant_id", Some(tenant_id)),
                ("client_id", Some(client_id)),
                ("client_secret", Some(client_secret)),
                ("scope", scope.as_ref()),
            ],
        ),
        AuthAst::Azure(AzureAuthAst::Certificate {
            tenant_id,
            client_id,
            certificate_path,
            certificate_password,
            scope,
        }) => named(
            "azurespcert",
            &[
                ("tenant_id", Some(tenant_id)),
                ("client_id", Some(client_id)),
                ("certificate_path", Some(certificate_path)),
                ("certificate_password", certificate_password.as_ref()),
                ("scope", scope.as_ref()),
            ],
        ),
        AuthAst::Azure(AzureAuthAst::Cli { scope }) => {
            named("azurecli", &[("scope", scope.as_ref())])
        }
        AuthAst::Azure(AzureAuthAst::DeviceCode { scope }) => {
            named("azuredevicecode", &[("scope", scope.as_ref())])
        }
    }
}

pub fn format_certificate(cert: &CertAst) -> String {
    match cert {
        CertAst::Pem { cert_path, key_path } => named(
            "certificate",
            &[("cert", Some(cert_path)), ("key", key_path.as_ref())],
        ),
        CertAst::P12 { path, password } => named(
            "p12",
            &[("file", Some(path)), ("password", password.as_ref())],
        ),
    }
}

pub fn format_payload(payload: &PayloadAst) -> String {
    match payload {
        PayloadAst::Raw { chunks, mime } => {
            let body: Vec<String> = chunks.iter().map(quote_lit).collect();
            match mime {
                Some(m) => format!("data({}, {})", body.join(" "), quote(m)),
                None => format!("data({})", body.join(" ")),
            }
        }
        PayloadAst::FormEncoded(json) => format!("urlencoded({})", format_json(json, 0)),
        PayloadAst::Json(json) => format!("json({})", format_json(json, 0)),
        PayloadAst::File { path, mime } => match mime {
            Some(m) => format!("fileinput({}, {})", quote(path), quote(m)),
            None => format!("fileinput({})", quote(path)),
        },
        PayloadAst::Multipart(parts) => {
            let mut out = String::from("files(\n");
            for part in parts {
                let _ = write!(out, "{INDENT}{} < {}", quote(&part.name), quote(&part.source));
                if let Some(m) = &part.mime {
                    let _ = write!(out, " ; {}", quote(m));
                }
                out.push_str(",\n");
            }
            out.push(')');
            out
        }
    }
}

/// Pretty-prints a JSON AST with four-space indentation.
pub fn format_json(json: &JsonAst, depth: usize) -> String {
    let pad = INDENT.repeat(depth + 1);
    let close = INDENT.repeat(depth);
    match json {
        JsonAst::Null => "null".into(),
        JsonAst::Bool(b) => b.to_string(),
        JsonAst::Number(n) => n.clone(),
        JsonAst::Str(s) => quote_lit(s),
        JsonAst::VarRef(v) => v.clone(),
        JsonAst::Expr(e) => e.clone(),
        JsonAst::Array(items) if items.is_empty() => "[]".into(),
        JsonAst::Object(members) if members.is_empty() => "{}".into(),
        JsonAst::Array(items) => {
            let inner: Vec<String> = items
                .iter()
                .map(|i| format!("{pad}{}", format_json(i, depth + 1)))
                .collect();
            format!("[\n{}\n{close}]", inner.join(",\n"))
        }
        JsonAst::Object(members) => {
            let inner: Vec<String> = members
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        JsonKey::Str(s) => quote_lit(s),
                        JsonKey::Var(v) => v.clone(),
                    };
                    format!("{pad}{key}: {}", format_json(v, depth + 1))
                })
                .collect();
            format!("{{\n{}\n{close}}}", inner.join(",\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::analyze::parse;
    use pretty_assertions::assert_eq;

    fn canonical(src: &str) -> String {
        format_document(&parse(src, None).unwrap())
    }

    #[test]
    fn test_quote_rule() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("say \"hi\""), "'say \"hi\"'");
        assert_eq!(quote("it's \"x\""), "'it\\'s \"x\"'");
        assert_eq!(quote("it's"), "\"it's\"");
        assert_eq!(quote("a\nb"), "\"a\\nb\"");
    }

    #[test]
    fn test_triple_chunk_with_both_delimiters() {
        let lit = StrLit {
            value: "a \"\"\" b ''' c".into(),
            quote: QuoteKind::Triple,
        };
        let out = quote_lit(&lit);
        assert_eq!(out, r#"'a """ b \'\'\' c'"#);

        let src = format!("POST \"http://h/\"\ndata({out})\n");
        let once = canonical(&src);
        assert_eq!(canonical(&once), once);
        match &parse(&once, None).unwrap().requests[0].payload {
            Some(PayloadAst::Raw { chunks, .. }) => assert_eq!(chunks[0].value, lit.value),
            other => panic!("unexpected payload {other:?}"),
        }

        let trailing = StrLit {
            value: "say \"hi\"".into(),
            quote: QuoteKind::Triple,
        };
        assert_eq!(quote_lit(&trailing), r#"'''say "hi"'''"#);
    }

    #[test]
    fn test_canonical_request() {
        let src = "@name('child'):'parent'\nPOST  'https://x/y'\n? 'a' = 'b'\n'h':'v'\nbasicauth('u','p')\njson({\"k\": [1, 2], \"e\": {}})\n";
        let expected = r#"@name("child") : "parent"
POST "https://x/y"
basicauth("u", "p")
"h": "v"
? "a"= "b"
json({
    "k": [
        1,
        2
    ],
    "e": {}
})


"#;
        assert_eq!(canonical(src), expected);
    }

    #[test]
    fn test_format_is_fixed_point() {
        let src = r#"import "common.http";
var token = "abc";
var obj = {"a": [1, {"b": token}], "sum": 1 + 2};
var id = $randomStr(8);
var greet = p"hello {name}";

// create a thing
@name("create")
@insecure
@http.proxy("http://proxy:3128")
POST "https://api/things"
awsauth(access_id="AK", secret_key="SK", region="us-east-1")
p12(file="id.p12", password="pw")
"Content-Type": 'text/"x"'
? "q" = "{{ q = 'default' }}"
data("line one" """raw "quoted"
text""", "text/plain")
>> out.txt
> {% python
def test_ok():
    client.log("ok")
%}

GET "https://api/upload"
files("f" < "a.txt" ; "text/plain", "note" < "inline")
"#;
        let once = canonical(src);
        let twice = canonical(&once);
        assert_eq!(once, twice);
        let strip = |doc: Document| -> Vec<RequestNode> {
            doc.requests
                .into_iter()
                .map(|mut r| {
                    r.spans = Default::default();
                    r
                })
                .collect()
        };
        assert_eq!(
            strip(parse(src, None).unwrap()),
            strip(parse(&once, None).unwrap())
        );
    }
}
