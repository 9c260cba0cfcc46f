use tracing::{Instrument, trace_span};
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};
use xcrud::{Completion, Result, session::Pipeline};

mod document;
mod table;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::Registry::default()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    table::main().instrument(trace_span!("table")).await?;
    document::main().instrument(trace_span!("document")).await?;

    Ok(())
}

/// Print queued frames, then answer every pending command.
pub fn flush(pipeline: &mut Pipeline, affected: u64) {
    let frames = pipeline.take_outgoing();
    println!("{} bytes: {}", frames.len(), frames.escape_ascii());
    while pipeline.complete(Completion::affected(affected)) { }
}
