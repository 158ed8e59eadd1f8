use crate::report::{SiteCrawlReport, aggregate, save_report};
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use pagewarden_scanner::{
    AnalyzerSet, BrowserContext, CrawlConfig, Crawler, HttpBrowser, PageStatus, PageTester,
    ProgressCallback,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub config: CrawlConfig,
    pub show_progress_bars: bool,
}

/// A finished run and where its report landed.
#[derive(Debug)]
pub struct CrawlRun {
    pub report: SiteCrawlReport,
    pub report_path: PathBuf,
}

/// Crawl the site, test every page that was reached, and aggregate.
///
/// Only setup problems (bad start URL, bad pattern) are returned as errors;
/// per-page failures are recorded in the report.
pub async fn crawl<C: BrowserContext>(
    config: &CrawlConfig,
    context: &C,
    analyzers: &AnalyzerSet,
    progress: Option<ProgressCallback>,
) -> Result<SiteCrawlReport> {
    let started = Utc::now();

    let mut crawler = Crawler::new(context, config).context("Invalid crawl configuration")?;
    if let Some(ref callback) = progress {
        crawler = crawler.with_progress_callback(callback.clone());
    }
    let outcome = crawler.crawl().await.context("Crawl failed")?;

    let tested: Vec<_> = outcome
        .registry
        .pages()
        .filter(|p| p.status == PageStatus::Tested)
        .cloned()
        .collect();
    info!(
        "Crawl visited {} pages, testing {}",
        outcome.visited,
        tested.len()
    );

    let mut tester = PageTester::new(context, config, analyzers);
    if let Some(callback) = progress {
        tester = tester.with_progress_callback(callback);
    }
    let results = tester.test_all(&tested).await;

    Ok(aggregate(
        config,
        outcome.registry.into_pages(),
        results,
        started,
        Utc::now(),
    ))
}

/// Execute a crawl with the given options over plain HTTP and save the
/// report files into the configured output directory.
pub async fn execute_crawl(options: CrawlOptions) -> Result<CrawlRun> {
    let CrawlOptions {
        config,
        show_progress_bars,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .context("Invalid progress template")?,
        );
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let progress: Option<ProgressCallback> = progress_bar.clone().map(|pb| {
        Arc::new(move |message: String, current: usize, total: usize| {
            if total > 0 {
                pb.set_message(format!("[{}/{}] {}", current, total, message));
            } else {
                pb.set_message(message);
            }
            pb.tick();
        }) as ProgressCallback
    });

    let browser = HttpBrowser::new().context("Failed to build HTTP client")?;
    let analyzers = AnalyzerSet::builtin();
    let report = crawl(&config, &browser, &analyzers, progress).await?;

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Crawl complete! {} pages tested",
            report.page_results.len()
        ));
    }

    let report_path = save_report(&report, &config.output_directory)?;
    info!("Report saved to {}", report_path.display());

    Ok(CrawlRun {
        report,
        report_path,
    })
}
