use super::traits::{length_arg, VarFunction};
use crate::property::generators;

pub struct RandomStr;

impl VarFunction for RandomStr {
    fn name(&self) -> &str {
        "randomStr"
    }

    fn validate_args(&self, args: &[String]) -> Result<(), String> {
        length_arg(self.name(), args).map(|_| ())
    }

    fn execute(&self, args: &[String]) -> Result<String, String> {
        Ok(generators::random_str(length_arg(self.name(), args)?))
    }
}

pub struct RandomInt;

impl VarFunction for RandomInt {
    fn name(&self) -> &str {
        "randomInt"
    }

    fn validate_args(&self, args: &[String]) -> Result<(), String> {
        length_arg(self.name(), args).map(|_| ())
    }

    fn execute(&self, args: &[String]) -> Result<String, String> {
        Ok(generators::random_int(length_arg(self.name(), args)?))
    }
}

pub struct RandomFloat;

impl VarFunction for RandomFloat {
    fn name(&self) -> &str {
        "randomFloat"
    }

    fn execute(&self, _args: &[String]) -> Result<String, String> {
        Ok(generators::random_float())
    }
}

pub struct RandomBool;

impl VarFunction for RandomBool {
    fn name(&self) -> &str {
        "randomBool"
    }

    fn execute(&self, _args: &[String]) -> Result<String, String> {
        Ok(generators::random_bool())
    }
}

pub struct RandomSlug;

impl VarFunction for RandomSlug {
    fn name(&self) -> &str {
        "randomSlug"
    }

    fn validate_args(&self, args: &[String]) -> Result<(), String> {
        length_arg(self.name(), args).map(|_| ())
    }

    fn execute(&self, args: &[String]) -> Result<String, String> {
        Ok(generators::random_slug(length_arg(self.name(), args)?))
    }
}

pub struct Guid(pub &'static str);

impl VarFunction for Guid {
    fn name(&self) -> &str {
        self.0
    }

    fn execute(&self, _args: &[String]) -> Result<String, String> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_str_length() {
        let v = RandomStr.execute(&["8".into()]).unwrap();
        assert_eq!(v.len(), 8);
        assert!(v.chars().next().unwrap().is_ascii_alphabetic());
    }

    #[test]
    fn test_random_int_rejects_bad_length() {
        assert!(RandomInt.validate_args(&["abc".into()]).is_err());
        assert!(RandomInt.validate_args(&["1".into(), "2".into()]).is_err());
        assert_eq!(RandomInt.execute(&["3".into()]).unwrap().len(), 3);
    }

    #[test]
    fn test_guid_is_uuid() {
        let v = Guid("guid").execute(&[]).unwrap();
        assert!(uuid::Uuid::parse_str(&v).is_ok());
    }
}
