use clap::Parser;
use credit_delegation::{Env, launch, setup_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed_env = Env::parse();
    let ctx = parsed_env.into_ctx()?;
    setup_tracing(&ctx.log_level);

    launch(ctx, &mut std::io::stdout()).await?;
    Ok(())
}
