use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use payflow::application::service::PaymentService;
use payflow::application::session::{SessionConfig, SessionEvent};
use payflow::domain::interaction::{ContinuationData, InteractionRequest};
use payflow::infrastructure::scripted::{ScriptedGateway, StaticAuthorizationSource};
use payflow::interfaces::json::scenario_reader::Scenario;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file: the payment request plus scripted gateway outcomes
    scenario: PathBuf,

    /// Maximum interaction rounds before the session gives up
    #[arg(long, default_value_t = 10)]
    max_rounds: usize,

    /// Seconds to wait for each interaction step
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let file = File::open(&cli.scenario).into_diagnostic()?;
    let scenario = Scenario::from_reader(file).into_diagnostic()?;

    let gateway = Arc::new(ScriptedGateway::new(scenario.gateway_script()));
    let auth_source = Arc::new(StaticAuthorizationSource::default());
    let config = SessionConfig {
        max_interaction_rounds: cli.max_rounds,
        interaction_timeout_secs: cli.timeout_secs,
        ..SessionConfig::default()
    };
    let service = PaymentService::with_config(gateway, auth_source, config);

    let mut redirect_tokens = scenario.redirect_tokens().into_iter();
    let mut handle = service.submit(scenario.request).await;

    while let Some(event) = handle.next_event().await {
        match event {
            SessionEvent::Interaction(InteractionRequest::PresentController {
                style, ..
            }) => {
                println!("interaction: present controller ({style:?})");
                handle
                    .complete_interaction(ContinuationData::default())
                    .into_diagnostic()?;
            }
            SessionEvent::Interaction(InteractionRequest::ExternalRedirect { target }) => {
                println!("interaction: external redirect to {target}");
                let token = redirect_tokens
                    .next()
                    .ok_or_else(|| miette!("scenario has no token for this redirect"))?;
                let callback: Url = format!("merchantapp://payments/return?token={token}")
                    .parse()
                    .into_diagnostic()?;
                println!("callback handled: {}", service.handle_external_callback(&callback));
            }
            SessionEvent::Completed { status, error } => match error {
                Some(error) => println!("completed: {status:?} ({error})"),
                None => println!("completed: {status:?}"),
            },
        }
    }

    Ok(())
}
