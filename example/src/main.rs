use tracing::trace_span;
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use pgcast::Result;

mod catalog;
mod literal;
mod session;

fn main() -> Result<()> {
    tracing_subscriber::Registry::default()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    trace_span!("literal").in_scope(literal::main)?;
    trace_span!("session").in_scope(session::main)?;

    Ok(())
}
