//! Profile command - print the resolved configuration

use clap::Args;

use crate::error::CliResult;
use crate::settings::Settings;

/// Arguments for the profile command
#[derive(Args, Debug, Default)]
pub struct ProfileArgs {}

pub async fn execute(_args: ProfileArgs, settings: Settings) -> CliResult<()> {
    println!("# profile: {}", settings.profile);
    print!("{}", serde_yaml::to_string(&settings.config)?);
    Ok(())
}
