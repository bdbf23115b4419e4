use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use console::Term;
use std::process;

use web_cloner::logger::init_logger;
use web_cloner::{AssetLocalizer, CloneCommand, LogProgress, ProgressSink, SpinnerProgress};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CloneCommand::parse();
    init_logger(args.log_level).context("Failed to initialize logger")?;

    let progress: Box<dyn ProgressSink> = if args.quiet || !Term::stderr().is_term() {
        Box::new(LogProgress)
    } else {
        Box::new(SpinnerProgress::new())
    };

    if !args.json {
        println!("🌐 Cloning website: {}", args.url.cyan());
    }
    let mut localizer = AssetLocalizer::new(args.cloner_config(), progress)?;

    match localizer.clone_site(&args.url).await {
        Ok(summary) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("\n{}", "🎉 Website cloned!".green());
            println!("{}", "📊 Statistics:".cyan());
            println!("   • Total assets: {}", summary.total_assets_discovered);
            println!("   • Downloaded: {}", summary.downloaded_count);
            println!("   • Failed: {}", summary.failed_count);
            for failed in &summary.failures {
                println!(
                    "     {} {}",
                    "✗".red(),
                    failed.remote_url.yellow()
                );
            }
            println!("{}", "📁 Output:".cyan());
            println!("   • Folder: {}", summary.site_dir.display());
            println!("   • HTML: {}", summary.index_path.display());
            println!("   • Report: {}", summary.manifest_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "❌ Failed to clone website:".red(), e);
            process::exit(1);
        }
    }
}
