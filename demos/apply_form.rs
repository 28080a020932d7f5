use std::path::PathBuf;
use std::sync::Arc;

use applyfill::{wait_for_submission, FillerBuilder, Page, Profile, Submission, YamlAnswerStore};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

/// Usage: apply_form <profiles-dir> <profile-id> <url> [company] [title]
#[tokio::main]
async fn main() -> applyfill::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <profiles-dir> <profile-id> <url> [company] [title]", args[0]);
        std::process::exit(2);
    }
    let root = PathBuf::from(&args[1]);
    let profile_id = args[2].clone();
    let url = &args[3];
    let company = args.get(4).cloned().unwrap_or_default();
    let title = args.get(5).cloned().unwrap_or_default();

    let profile = Profile::load(root.join(&profile_id).join("profile.yaml"))?;

    let config = BrowserConfig::builder()
        .with_head()
        .no_sandbox()
        .arg("disable-site-isolation-trials")
        .arg(("disable-features", "IsolateOrigins,site-per-process"))
        .build()
        .map_err(applyfill::Error::NavigationError)?;
    let (browser, mut handler) = Browser::launch(config).await?;
    let handler_task = tokio::spawn(async move {
        while let Some(_event) = handler.next().await {}
    });

    let cr_page = browser.new_page(url.as_str()).await?;
    let page = Arc::new(Page::new(cr_page));

    let mut filler = FillerBuilder::new()
        .job(company, title)
        .answer_store(Arc::new(YamlAnswerStore::new(&root)), profile_id)
        .build(page.clone(), Arc::new(profile));
    let report = filler.fill_all().await;

    println!("Filled {}/{} fields ({})", report.filled().count(), report.fields.len(), report.ats.ats);
    for entry in report.high_risk() {
        println!("  review: {} = {}", entry.field.label, entry.value);
    }
    for entry in report.failed_required() {
        println!("  missing required: {}", entry.field.label);
    }
    for pending in &report.pending {
        println!("  needs an answer: {}", pending.question);
    }

    match wait_for_submission(page.as_ref(), &report.url, filler.config()).await {
        Submission::Detected { url } => println!("Submitted, now at {url}"),
        Submission::AssumedAfterTimeout => println!("No navigation seen; assuming submitted"),
    }

    handler_task.abort();
    Ok(())
}
