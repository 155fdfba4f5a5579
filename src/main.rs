use clap::Parser;
use patch_digest::core::RunMode;
use patch_digest::utils::{logger, validation::Validate};
use patch_digest::{
    CliArgs, Crawler, DigestConfig, DigestEngine, DigestError, Fetcher, HealthProbe,
    LmsBackend, LocalStorage, OpenAiCompatClient, PromptFile, ServiceSupervisor,
};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting patch-digest");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = run(&args).await {
        tracing::error!(
            "❌ Fatal error: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    tracing::info!("✅ Complete!");
}

async fn run(args: &CliArgs) -> Result<(), DigestError> {
    // 配置只載入一次，之後一路傳遞
    let config = DigestConfig::from_file(&args.config)?;
    config.validate()?;
    tracing::debug!("Config: {:?}", config);

    let prompt_path = config.prompt_file.clone();

    let backend = LmsBackend::new(
        HealthProbe::new(patch_digest::adapters::lms::DEFAULT_HOST, config.health_timeout()),
        config.readiness_policy(),
        config.command_timeout(),
    );
    let mut supervisor =
        ServiceSupervisor::new(backend, config.model_name.clone(), config.lm_studio_port);
    let generator = OpenAiCompatClient::for_local_port(config.lm_studio_port, &config.model_name);

    let fetcher = Fetcher::new(config.retry_policy());
    let engine = DigestEngine::new(LocalStorage::new("."), Crawler::new(config, fetcher));

    let summary = match args.mode() {
        RunMode::ScrapeOnly => {
            let dates = engine.scrape().await?;
            println!("✅ Saved content for {} dates", dates.len());
            return Ok(());
        }
        RunMode::ProcessOnly => {
            let prompt = PromptFile::from_file(&prompt_path)?;
            engine
                .process_saved(&mut supervisor, &generator, &prompt)
                .await?
        }
        RunMode::Full => {
            let prompt = PromptFile::from_file(&prompt_path)?;
            engine
                .run_full(&mut supervisor, &generator, &prompt)
                .await?
        }
    };

    println!(
        "✅ Processed {}/{} dates ({} failed)",
        summary.succeeded, summary.total, summary.failed
    );
    Ok(())
}
