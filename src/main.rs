use std::sync::Arc;
use std::time::Duration;

use maildrip::campaign::{CampaignStatus, CampaignStore, DripInterval, SendMode};
use maildrip::compose::ComposeSession;
use maildrip::config::EngineConfig;
use maildrip::delivery::{Delivery, SimulatedDelivery, SmtpConfig, SmtpDelivery};
use maildrip::dispatch::DispatchEngine;
use maildrip::recipients::RecipientTable;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let csv_path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: maildrip <recipients.csv>");
        eprintln!("  Campaign settings are read from MAILDRIP_* environment variables.");
        std::process::exit(2);
    });

    let subject = std::env::var("MAILDRIP_SUBJECT").unwrap_or_else(|_| {
        eprintln!("Error: MAILDRIP_SUBJECT not set");
        eprintln!("  export MAILDRIP_SUBJECT='Hi {{firstName}}, let us connect!'");
        std::process::exit(2);
    });

    let body = match std::env::var("MAILDRIP_BODY_FILE") {
        Ok(path) => tokio::fs::read_to_string(&path).await?,
        Err(_) => std::env::var("MAILDRIP_BODY").unwrap_or_default(),
    };

    let mode = match std::env::var("MAILDRIP_MODE").as_deref() {
        Ok("batch") => SendMode::Batch,
        Ok("drip") => SendMode::Drip,
        _ => SendMode::Bulk,
    };
    let drip_interval = match std::env::var("MAILDRIP_DRIP_INTERVAL").as_deref() {
        Ok("hourly") => DripInterval::Hourly,
        _ => DripInterval::Daily,
    };

    let input = tokio::fs::read_to_string(&csv_path).await?;
    let recipients = RecipientTable::from_csv(&input)?;

    eprintln!("📮 maildrip v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Recipients: {} ({})", recipients.len(), csv_path);
    if recipients.override_column().is_some() {
        eprintln!("   Custom per-recipient content detected");
    }

    let delivery: Arc<dyn Delivery> = match SmtpConfig::from_env() {
        Some(config) => {
            eprintln!("   Delivery: smtp://{}:{}", config.host, config.port);
            Arc::new(SmtpDelivery::new(config))
        }
        None => {
            let rate = std::env::var("MAILDRIP_SIM_FAILURE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.05);
            eprintln!("   Delivery: simulated ({:.0}% failure rate)", rate * 100.0);
            Arc::new(SimulatedDelivery::new(rate))
        }
    };

    let mut session = ComposeSession::new(recipients);
    session.subject = subject;
    session.body = body;
    session.mode = mode;
    session.batch_size = env_usize("MAILDRIP_BATCH_SIZE", session.batch_size);
    session.drip_rate = env_usize("MAILDRIP_DRIP_RATE", session.drip_rate);
    session.drip_interval = drip_interval;

    if let Some(preview) = session.preview() {
        eprintln!("   Preview subject: {}", preview.subject);
    }
    eprintln!("   Send mode: {}\n", session.config().mode_summary());

    let store = CampaignStore::new();
    let engine = DispatchEngine::new(Arc::clone(&store), delivery, EngineConfig::from_env());

    let (id, mut report) = engine.launch(&session).await?;

    match mode {
        SendMode::Bulk => {}
        // One chunk per trigger; the CLI is the external trigger, so keep
        // activating until everyone is accounted.
        SendMode::Batch => {
            while report.status == CampaignStatus::Sending {
                report = engine.activate(id).await?;
            }
        }
        // Continuations are scheduled by the engine; wait for the last one.
        SendMode::Drip => {
            while store
                .get(id)
                .await
                .is_some_and(|c| c.status == CampaignStatus::Sending)
            {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }
    }

    for summary in store.list().await {
        eprintln!(
            "   {} — {} | {} recipients, {} sent, {} errored ({}% success) | {}",
            summary.subject,
            summary.status,
            summary.total_recipients,
            summary.sent,
            summary.errored,
            summary.success_rate,
            summary.mode_summary,
        );
    }

    if let Some(campaign) = store.get(id).await {
        let errored = campaign.ledger.errored_keys();
        if !errored.is_empty() {
            eprintln!("\n   Errors ({}):", errored.len());
            for key in errored.iter().take(5) {
                if let Some(maildrip::campaign::Outcome::Errored(detail)) =
                    campaign.ledger.lookup(key).map(|r| &r.outcome)
                {
                    eprintln!("     {key}: {detail}");
                }
            }
            if errored.len() > 5 {
                eprintln!("     And {} more...", errored.len() - 5);
            }
        }
    }

    if std::env::var("MAILDRIP_JSON").is_ok() {
        println!("{}", serde_json::to_string_pretty(&store.list().await)?);
    }

    Ok(())
}

fn env_usize(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
