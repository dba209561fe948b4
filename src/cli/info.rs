use anyhow::Result;
use cdp_adapter::detect_chrome_executable;

use super::context::CliContext;

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();

    println!("kofia-fundstat");
    println!("==============");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!();

    println!("Portal: {}", config.site.base_url);
    let browser = config
        .browser
        .executable
        .clone()
        .or_else(detect_chrome_executable);
    match browser {
        Some(path) => println!("Browser: {}", path.display()),
        None => println!("Browser: not found (set browser.executable)"),
    }
    println!("Headless: {}", config.browser.headless);
    println!("Sessions: {}", config.sessions.count);
    println!();

    println!("Paths:");
    println!("- Downloads: {}", config.paths.download_dir.display());
    println!("- Output: {}", config.paths.output_dir.display());
    println!("- Artifacts: {}", config.paths.artifact_dir.display());
    println!("- Logs: {}", config.paths.log_dir.display());
    Ok(())
}
