use crate::client::{DothttpConfig, Source};
use crate::commands::validators;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct PropertyArgs {
    #[arg(
        short = 'e',
        long = "env",
        alias = "environment",
        help = "Environments from the property file, later ones win",
        value_parser = validators::validate_name
    )]
    pub env: Vec<String>,

    #[arg(
        short = 'p',
        long = "property",
        value_name = "NAME=VALUE",
        help = "Property overriding every other source",
        value_parser = validators::validate_property
    )]
    pub property: Vec<(String, String)>,

    #[arg(long = "property-file", help = "Property file, defaults to .dothttp.json next to the source")]
    pub property_file: Option<PathBuf>,
}

impl PropertyArgs {
    pub fn config(&self, source: Source, target: &str) -> DothttpConfig {
        let mut config = DothttpConfig::new(source);
        config.target = target.to_string();
        config.envs = self.env.clone();
        config.properties = self.property.clone();
        config.property_file = self.property_file.clone();
        config
    }
}
