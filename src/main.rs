use anyhow::{Context, Result};
use hydrogen_lcox::{config::Config, pipeline::Pipeline, telemetry::init_tracing};
use hydrogen_lcox::pipeline::ModelPlugins;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    init_tracing();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| hydrogen_lcox::config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&path).with_context(|| format!("loading {}", path))?;

    if cfg.plants.is_empty() {
        anyhow::bail!("no plants configured in {}", path);
    }
    if cfg.credentials.api_key()?.is_none() {
        warn!("ARCGIS_API_KEY not set - location lookups are unavailable");
    }

    let mut plugins = ModelPlugins::new();
    if let Some(locations) = cfg.model_locations()? {
        plugins = plugins.with_locations(locations);
    }
    let pipeline = Pipeline::default().with_plugins(plugins);

    info!(plants = cfg.plants.len(), config = %path, "starting hydrogen-lcox");

    let mut results = serde_json::Map::new();
    for (label, plant) in &cfg.plants {
        match pipeline.run_full_model(plant, &cfg.run) {
            Ok((capacity, costs, finance)) => {
                info!(plant = %label, price = ?finance.price(), "plant solved");
                results.insert(
                    label.clone(),
                    serde_json::json!({
                        "capacity": capacity,
                        "costs": costs,
                        "finance": finance,
                    }),
                );
            }
            Err(e) => {
                error!(plant = %label, kind = e.kind(), error = %e, "plant failed");
                return Err(e).with_context(|| format!("plant `{}`", label));
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
