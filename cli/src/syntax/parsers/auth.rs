use super::utils::{arg, parse_call_args, required_arg};
use crate::syntax::{
    ast::{AuthAst, AzureAuthAst, CertAst},
    error::SyntaxError,
    keywords::{
        AUTH_FUNCTIONS, FN_AWS_AUTH, FN_AZURE_CLI, FN_AZURE_DEVICE_CODE, FN_AZURE_SP_CERT,
        FN_AZURE_SP_SECRET, FN_BASIC_AUTH, FN_CERTIFICATE, FN_DIGEST_AUTH, FN_HAWK_AUTH,
        FN_NTLM_AUTH, FN_P12, PUNC_LPAREN,
    },
    reader::TokenReader,
    token::TokenType,
};

fn is_call_to(r: &TokenReader, names: &[&str]) -> bool {
    match r.cur() {
        Some(t) if t.token_type == TokenType::Identifier => {
            names.contains(&t.value.as_str())
                && r
                    .peek_significant()
                    .map(|n| n.is(TokenType::Punctuation, PUNC_LPAREN))
                    .unwrap_or(false)
        }
        _ => false,
    }
}

pub fn can_parse_auth(r: &TokenReader) -> bool {
    is_call_to(r, AUTH_FUNCTIONS)
}

pub fn can_parse_certificate(r: &TokenReader) -> bool {
    is_call_to(r, &[FN_CERTIFICATE, FN_P12])
}

pub fn parse_auth(r: &mut TokenReader) -> Result<AuthAst, SyntaxError> {
    let Some(func) = r.cur().cloned() else {
        return Err(r.eof_error("Expected auth function"));
    };
    r.advance();
    r.skip_ignorable();
    let args = parse_call_args(r)?;
    let req = |name: &str, pos: usize| required_arg(r, &args, name, pos, &func);

    let auth = match func.value.as_str() {
        FN_BASIC_AUTH => AuthAst::Basic {
            user: req("username", 0)?,
            pass: req("password", 1)?,
        },
        FN_DIGEST_AUTH => AuthAst::Digest {
            user: req("username", 0)?,
            pass: req("password", 1)?,
        },
        FN_NTLM_AUTH => AuthAst::Ntlm {
            user: req("username", 0)?,
            pass: req("password", 1)?,
        },
        FN_HAWK_AUTH => AuthAst::Hawk {
            id: req("id", 0)?,
            key: req("key", 1)?,
            algorithm: arg(&args, "algorithm", 2),
        },
        FN_AWS_AUTH => AuthAst::AwsV4 {
            access_id: req("access_id", 0)?,
            secret_key: req("secret_key", 1)?,
            service: arg(&args, "service", 2),
            region: arg(&args, "region", 3),
            session_token: arg(&args, "session_token", 4),
        },
        FN_AZURE_SP_SECRET => AuthAst::Azure(AzureAuthAst::ServicePrincipal {
            tenant_id: req("tenant_id", 0)?,
            client_id: req("client_id", 1)?,
            client_secret: req("client_secret", 2)?,
            scope: arg(&args, "scope", 3),
        }),
        FN_AZURE_SP_CERT => AuthAst::Azure(AzureAuthAst::Certificate {
            tenant_id: req("tenant_id", 0)?,
            client_id: req("client_id", 1)?,
            certificate_path: req("certificate_path", 2)?,
            certificate_password: arg(&args, "certificate_password", 3),
            scope: arg(&args, "scope", 4),
        }),
        FN_AZURE_CLI => AuthAst::Azure(AzureAuthAst::Cli {
            scope: arg(&args, "scope", 0),
        }),
        FN_AZURE_DEVICE_CODE => AuthAst::Azure(AzureAuthAst::DeviceCode {
            scope: arg(&args, "scope", 0),
        }),
        other => {
            return Err(r.create_error_with_file(
                format!("Unknown auth function '{other}'"),
                func.span.clone(),
            ))
        }
    };
    Ok(auth)
}

pub fn parse_certificate(r: &mut TokenReader) -> Result<CertAst, SyntaxError> {
    let Some(func) = r.cur().cloned() else {
        return Err(r.eof_error("Expected certificate"));
    };
    r.advance();
    r.skip_ignorable();
    let args = parse_call_args(r)?;
    if func.value == FN_P12 {
        return Ok(CertAst::P12 {
            path: required_arg(r, &args, "file", 0, &func)?,
            password: arg(&args, "password", 1),
        });
    }
    Ok(CertAst::Pem {
        cert_path: required_arg(r, &args, "cert", 0, &func)?,
        key_path: arg(&args, "key", 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenize::tokenize;
    use std::path::PathBuf;

    fn reader(src: &str) -> TokenReader {
        TokenReader::new(tokenize(src).unwrap(), PathBuf::new(), src.to_string())
    }

    #[test]
    fn test_basic_auth() {
        let mut r = reader(r#"basicauth("u", "p")"#);
        assert!(can_parse_auth(&r));
        assert_eq!(
            parse_auth(&mut r).unwrap(),
            AuthAst::Basic {
                user: "u".into(),
                pass: "p".into()
            }
        );
    }

    #[test]
    fn test_aws_named_arguments() {
        let mut r = reader(
            r#"awsauth(access_id="AK", secret_key="SK", region="eu-west-1")"#,
        );
        assert_eq!(
            parse_auth(&mut r).unwrap(),
            AuthAst::AwsV4 {
                access_id: "AK".into(),
                secret_key: "SK".into(),
                service: None,
                region: Some("eu-west-1".into()),
                session_token: None,
            }
        );
    }

    #[test]
    fn test_missing_argument() {
        let mut r = reader(r#"hawkauth("id")"#);
        let err = parse_auth(&mut r).unwrap_err();
        assert_eq!(err.message, "hawkauth: missing argument `key`");
    }

    #[test]
    fn test_azure_cli_without_scope() {
        let mut r = reader("azurecli()");
        assert_eq!(
            parse_auth(&mut r).unwrap(),
            AuthAst::Azure(AzureAuthAst::Cli { scope: None })
        );
    }

    #[test]
    fn test_certificates() {
        let mut r = reader(r#"certificate(cert="c.pem", key="k.pem")"#);
        assert!(can_parse_certificate(&r));
        assert_eq!(
            parse_certificate(&mut r).unwrap(),
            CertAst::Pem {
                cert_path: "c.pem".into(),
                key_path: Some("k.pem".into())
            }
        );
        let mut r = reader(r#"p12("id.p12", "pw")"#);
        assert_eq!(
            parse_certificate(&mut r).unwrap(),
            CertAst::P12 {
                path: "id.p12".into(),
                password: Some("pw".into())
            }
        );
    }
}
