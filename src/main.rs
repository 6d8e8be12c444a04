use aws_config::{BehaviorVersion, Region};
use eyre::{Result, WrapErr};
use rslist::aws::RedshiftClient;
use rslist::error::{Error, WalkError};
use rslist::resources::{self, PagingOpts, Resource};
use rslist::writer::{OutputFormat, Writer};
use rslist::Cancellation;
use std::time::Duration;
use structopt::StructOpt;
use termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

#[derive(StructOpt)]
#[structopt(about = "List Redshift clusters, snapshots and related resources")]
struct Opts {
    /// AWS region, defaults to the environment or profile setting
    #[structopt(long, global = true)]
    region: Option<String>,

    /// Named profile from the shared AWS config
    #[structopt(long, global = true)]
    profile: Option<String>,

    /// "table" or "text"
    #[structopt(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Give up retrying throttled or timed out calls after this long
    #[structopt(long, global = true, default_value = "2m", parse(try_from_str = humantime::parse_duration))]
    max_retry_time: Duration,

    #[structopt(flatten)]
    paging: PagingOpts,

    #[structopt(subcommand)]
    resource: Resource,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    color_eyre::install()?;

    let opts = Opts::from_args();

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = opts.region.clone() {
        loader = loader.region(Region::new(region));
    }
    if let Some(profile) = opts.profile.as_deref() {
        loader = loader.profile_name(profile);
    }
    let config = loader.load().await;
    tracing::debug!(region = ?config.region(), "chosen region");

    let client = RedshiftClient::new(aws_sdk_redshift::Client::new(&config), opts.max_retry_time);

    let (handle, cancel) = Cancellation::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current page");
            handle.cancel();
        }
    });

    let stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut writer = Writer::new(stdout.lock(), opts.output);

    match resources::list(&client, opts.resource, &opts.paging, cancel, &mut writer).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => match e.downcast_ref::<Error>() {
            Some(Error::EmptyStartingToken) => {
                eprintln!("--starting-token must not be empty");
                std::process::exit(2);
            }
            Some(Error::MaxItemsWithoutPagination) => {
                eprintln!("--max-items only applies when paginating, drop --no-paginate");
                std::process::exit(2);
            }
            Some(Error::Incomplete(WalkError::InvalidConfiguration(msg))) => {
                eprintln!("invalid paging options: {}", msg);
                std::process::exit(2);
            }
            _ => Err(e).wrap_err("listing failed"),
        },
    }
}
