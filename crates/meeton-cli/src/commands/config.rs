use meeton_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            request_timeout_secs,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            api_base_url,
            request_timeout_secs,
            no_activate,
        ),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(url) = normalize_text_option(api_base_url) {
        profile.api_base_url = Some(url);
    }
    if let Some(timeout) = request_timeout_secs {
        profile.request_timeout_secs = Some(timeout);
    }
    profile.validate().map_err(CliError::Config)?;
    let ready = profile.api_base_url().is_some();

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );
    if ready {
        println!(
            "Profile '{profile_name}' is ready. Run `meeton login --email <email> --password <password>`."
        );
    } else {
        println!("Profile '{profile_name}' is missing: api_base_url");
    }
    Ok(())
}
