use super::traits::VarFunction;
use chrono::{Local, Utc};

pub struct Timestamp;

impl VarFunction for Timestamp {
    fn name(&self) -> &str {
        "timestamp"
    }

    fn execute(&self, _args: &[String]) -> Result<String, String> {
        Ok(Utc::now().timestamp().to_string())
    }
}

/// `$now()` or `$now("yyyy-MM-dd")`.
pub struct Now;

impl VarFunction for Now {
    fn name(&self) -> &str {
        "now"
    }

    fn validate_args(&self, args: &[String]) -> Result<(), String> {
        if args.len() > 1 {
            return Err("$now takes at most one argument (format)".to_string());
        }
        Ok(())
    }

    fn execute(&self, args: &[String]) -> Result<String, String> {
        let now = Local::now();
        match args.first() {
            None => Ok(now.format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string()),
            Some(format) => {
                let format = format
                    .replace("yyyy", "%Y")
                    .replace("MM", "%m")
                    .replace("dd", "%d")
                    .replace("HH", "%H")
                    .replace("mm", "%M")
                    .replace("ss", "%S");
                Ok(now.format(&format).to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_with_format() {
        let v = Now.execute(&["yyyy".into()]).unwrap();
        assert_eq!(v.len(), 4);
        assert!(v.chars().all(|c| c.is_ascii_digit()));
        assert!(Now.validate_args(&["a".into(), "b".into()]).is_err());
    }

    #[test]
    fn test_timestamp_is_numeric() {
        assert!(Timestamp.execute(&[]).unwrap().parse::<i64>().is_ok());
    }
}
