use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nftbook::app::{self, IgnoredView, StoredQueryArgs};
use nftbook::config::{default_config_path, ResolvedConfig};
use nftbook::models::{Address, LpHandling};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nftbook")]
#[command(about = "NFT holdings sync and valuation")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,

    /// List NFTs held by the given addresses
    Holdings {
        #[arg(required = true)]
        addresses: Vec<Address>,

        /// Query the provider even if a cached result exists
        #[arg(long)]
        refresh: bool,
    },

    /// Value NFTs held by the given addresses and update the stored table
    Balances {
        #[arg(required = true)]
        addresses: Vec<Address>,

        #[arg(long)]
        include_zero: bool,

        #[arg(long)]
        refresh: bool,
    },

    /// Stored NFT prices converted to USD
    Prices {
        #[arg(long)]
        id: Option<String>,

        #[arg(long, value_enum, default_value_t = LpsArg::All)]
        lps: LpsArg,
    },

    /// Set a manual price for a stored NFT
    SetPrice {
        identifier: String,
        /// Asset the price is given in (e.g. ETH, USD)
        asset: String,
        amount: String,
    },

    /// Remove the stored price of an NFT
    ClearPrice { identifier: String },

    /// Query the stored NFT table
    Stored {
        #[arg(long = "owner")]
        owners: Vec<Address>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        collection: Option<String>,

        #[arg(long, value_enum, default_value_t = LpsArg::All)]
        lps: LpsArg,

        #[arg(long, value_enum, default_value_t = IgnoredArg::Hide)]
        ignored: IgnoredArg,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LpsArg {
    All,
    Only,
    Exclude,
}

impl From<LpsArg> for LpHandling {
    fn from(arg: LpsArg) -> Self {
        match arg {
            LpsArg::All => LpHandling::AllNfts,
            LpsArg::Only => LpHandling::OnlyLps,
            LpsArg::Exclude => LpHandling::ExcludeLps,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum IgnoredArg {
    Hide,
    Show,
    Only,
}

impl From<IgnoredArg> for IgnoredView {
    fn from(arg: IgnoredArg) -> Self {
        match arg {
            IgnoredArg::Hide => IgnoredView::Hide,
            IgnoredArg::Show => IgnoredView::Show,
            IgnoredArg::Only => IgnoredView::Only,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load nftbook config: {}", config_path.display()))?;

    let service = app::build_service(&config)?;
    match cli.command {
        Command::Config => print_json(&app::config_output(&config_path, &config)),
        Command::Holdings { addresses, refresh } => {
            print_json(&app::holdings(&service, &addresses, refresh).await?)
        }
        Command::Balances {
            addresses,
            include_zero,
            refresh,
        } => print_json(&app::balances(&service, &addresses, include_zero, refresh).await?),
        Command::Prices { id, lps } => {
            print_json(&app::prices(&service, id.as_deref(), lps.into()).await?)
        }
        Command::SetPrice {
            identifier,
            asset,
            amount,
        } => print_json(&app::set_price(&service, &identifier, &asset, &amount).await?),
        Command::ClearPrice { identifier } => {
            print_json(&app::clear_price(&service, &identifier).await?)
        }
        Command::Stored {
            owners,
            name,
            collection,
            lps,
            ignored,
            limit,
            offset,
        } => {
            let args = StoredQueryArgs {
                owners,
                name,
                collection,
                lp_handling: lps.into(),
                ignored: ignored.into(),
                limit,
                offset,
            };
            print_json(&app::stored(&service, args).await?)
        }
    }
}
