use rollcall_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = rollcall_api::setup::initialize_app(config.clone()).await?;

    rollcall_api::setup::server::start_server(&config, router, state).await?;

    Ok(())
}
