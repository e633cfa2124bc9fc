use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sbdlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: sbdlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", option_env!("SBDLINK_BUILD_TARGET").unwrap_or("unknown"));
    println!("profile: {}", option_env!("SBDLINK_BUILD_PROFILE").unwrap_or("unknown"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "default_baud: {}",
        sbdlink_transport::SerialStream::DEFAULT_BAUD_RATE
    );
    println!("mo_max_bytes: {}", sbdlink_modem::MAX_MO_LEN);
    println!("mt_max_bytes: {}", sbdlink_modem::MAX_MT_LEN);
    println!("features: modem={}, cli=true", cfg!(feature = "modem"));
    Ok(SUCCESS)
}
