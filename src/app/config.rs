use std::path::Path;

use crate::config::ResolvedConfig;
use crate::duration::format_duration;
use crate::nft::Tier;

pub fn config_output(config_path: &Path, config: &ResolvedConfig) -> serde_json::Value {
    let (tier, limit) = match config.tier {
        Tier::Premium => ("premium", None),
        Tier::Free { limit } => ("free", Some(limit)),
    };
    serde_json::json!({
        "config_file": config_path.display().to_string(),
        "data_directory": config.data_dir.display().to_string(),
        "tier": tier,
        "free_limit": limit,
        "native_currency": config.native_currency,
        "ignored": config.ignored,
        "opensea": {
            "base_url": config.opensea.base_url,
            "has_api_key": config.opensea.api_key.is_some(),
            "timeout": format_duration(config.opensea.timeout)
        },
        "coingecko": {
            "base_url": config.coingecko.base_url,
            "timeout": format_duration(config.coingecko.timeout)
        }
    })
}
