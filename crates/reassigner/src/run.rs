use {
    crate::{cli, config},
    anyhow::{Context, Result},
    bid_sharing::{
        Auction,
        Bid,
        BoundedStore,
        CachedOptimizer,
        Lookup,
        Optimizer,
        Outcome,
        Sha256Fingerprinter,
        Store,
        UnboundedStore,
    },
    clap::Parser,
    serde::{Deserialize, Serialize},
    std::io::{Read, Write},
};

pub fn start(args: impl Iterator<Item = String>) {
    let args = cli::Args::parse_from(args);
    let mut observe = observe::Config::default()
        .with_env_filter(&args.log)
        .with_stderr_only();
    if args.log_json {
        observe = observe.with_json_format();
    }
    observe::tracing::initialize(&observe);
    tracing::info!("running reassigner with {args:#?}");

    let stdout = std::io::stdout();
    if let Err(err) = run(&args, stdout.lock()) {
        tracing::error!(?err, "reassigner failed");
        std::process::exit(1);
    }
}

/// Optimizes every auction of the input and writes one JSON report per
/// auction and line to `out`.
pub fn run(args: &cli::Args, mut out: impl Write) -> Result<()> {
    let config = config::file::load(&args.config)?;
    tracing::debug!(?config, "loaded configuration");

    let auctions = read_auctions(args)?;
    let store: Box<dyn Store> = match config.cache_capacity {
        Some(capacity) => Box::new(BoundedStore::new(capacity)),
        None => Box::new(UnboundedStore::new()),
    };
    let optimizer = CachedOptimizer::new(
        Optimizer::new(config.optimizer.clone()),
        Sha256Fingerprinter,
        store,
    );
    let strategies = config.strategies();

    for (index, auction) in auctions.iter().enumerate() {
        let _span = tracing::info_span!("auction", index).entered();
        let lookup = optimizer.optimize(auction, strategies);
        let report = match &lookup {
            Lookup::Hit(winning_bids) => Report::Hit { winning_bids },
            Lookup::Miss(outcome) => Report::Miss(outcome),
        };
        serde_json::to_writer(&mut out, &report).context("failed to write report")?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// One auction or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    Many(Vec<Auction>),
    One(Box<Auction>),
}

fn read_auctions(args: &cli::Args) -> Result<Vec<Auction>> {
    let data = match &args.auctions {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("I/O error while reading {path:?}"))?,
        None => {
            let mut data = String::new();
            std::io::stdin()
                .read_to_string(&mut data)
                .context("I/O error while reading stdin")?;
            data
        }
    };
    let auctions = match serde_json::from_str(&data).context("malformed auctions")? {
        Input::Many(auctions) => auctions,
        Input::One(auction) => vec![*auction],
    };
    tracing::info!(count = auctions.len(), "read auctions");
    Ok(auctions)
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case", tag = "cache")]
enum Report<'a> {
    #[serde(rename_all = "camelCase")]
    Hit { winning_bids: &'a [Bid] },
    Miss(&'a Outcome),
}
