use anyhow::Result;
use std::sync::Arc;
use swap_router::{
    QuoteEngine,
    config::{ChainConfig, QuoteArgs, RouterConfig},
    dex::{UniswapV2Venue, UniswapV3Venue, VenueClient, VenueRegistry},
    report::TracingSink,
    utils,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let chain = ChainConfig::load()?;
    let router_config = RouterConfig::load()?;
    let args = QuoteArgs::load()?;

    tracing::info!(
        rpc = %chain.rpc_url,
        fee_tiers = ?router_config.fee_tiers,
        include_v2 = router_config.include_constant_product,
        "[INIT] swap-router starting"
    );

    let provider = chain.connect().await?;
    let v2: Option<Arc<dyn VenueClient>> = if router_config.include_constant_product {
        Some(Arc::new(UniswapV2Venue::new(
            provider.clone(),
            chain.v2_factory,
            chain.v2_router,
        )))
    } else {
        None
    };
    let v3: Arc<dyn VenueClient> = Arc::new(UniswapV3Venue::new(
        provider,
        chain.v3_factory,
        chain.v3_quoter,
        chain.v3_router,
    ));
    let venues = VenueRegistry::uniswap(v2, v3, &router_config.fee_tiers);
    let engine = QuoteEngine::from_config(venues, &router_config, Arc::new(TracingSink));

    let request = args.request();
    let report = engine.quote_with_report(&request).await?;

    tracing::info!("=== Pool Analysis Results ===");
    for quote in &report.quotes {
        tracing::info!(
            venue = %quote.venue,
            amount_out = %utils::format_units(quote.amount_out, args.decimals_out),
            "[POOL]"
        );
    }
    tracing::info!(
        venue = %report.best.venue,
        amount_out = %utils::format_units(report.best.amount_out, args.decimals_out),
        "[BEST] best pool"
    );

    tracing::info!(
        slippage_bps = args.slippage_bps,
        min_amount_out = %utils::format_units(report.min_amount_out, args.decimals_out),
        raw = %report.min_amount_out,
        "[BEST] minimum amount out"
    );
    Ok(())
}
