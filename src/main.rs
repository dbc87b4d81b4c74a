use intake_desk::api::{ApiClient, ReqwestHttpClient};
use intake_desk::config::Config;
use intake_desk::flow::{FlowSettings, RequestSubmissionFlow};
use intake_desk::presenter::TerminalPresenter;
use intake_desk::session::Session;
use intake_desk::telemetry::init_telemetry;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        api_base_url = %config.api_base_url,
        public_origin = %config.public_origin,
        attach_policy = %config.attach_policy,
        environment = %config.environment,
        "Starting intake-desk"
    );

    let http = ReqwestHttpClient::new(&config.api_base_url).with_timeout(config.request_timeout);
    let flow = RequestSubmissionFlow::new(
        ApiClient::new(http),
        TerminalPresenter::stdout(),
        FlowSettings::from(&config),
    );

    let mut session = Session::new(flow, BufReader::new(tokio::io::stdin()));
    let result = session.run().await;

    telemetry_guard.shutdown();

    result
}
