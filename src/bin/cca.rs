use cca_client::blockchain::{BlockchainClient, TransactionSubmitter};
use cca_client::codec::{decode_price, encode_price_with_decimals, format_wei, parse_units};
use cca_client::config::WatchConfig;
use cca_client::contracts::addresses;
use cca_client::core::{
    bids_of_owner, describe_auctions, list_auctions, AuctionSource, AuctionWatcher,
};
use cca_client::encoding::{
    claim_tokens, claim_tokens_batch, compute_spans, decode_schedule, exit_bid, submit_bid,
    AuctionDraft, TokenLaunch,
};
use cca_client::CcaError;
use clap::{Args, Parser, Subcommand};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use std::path::PathBuf;
use std::sync::Arc;

/// Continuous Clearing Auction client - watch, launch and bid
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Connection {
    /// HTTP RPC URL
    #[arg(short, long, env = "CCA_RPC_URL", default_value = "https://ethereum-sepolia-rpc.publicnode.com")]
    rpc: String,
}

#[derive(Args, Debug)]
struct Wallet {
    /// Signing key
    #[arg(long, env = "CCA_PRIVATE_KEY", hide_env_values = true)]
    private_key: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync an auction and follow it live until Ctrl-C
    Watch {
        #[arg(value_name = "AUCTION")]
        auction: String,

        #[command(flatten)]
        connection: Connection,

        /// WebSocket URL for eth_subscribe; polls over HTTP without it
        #[arg(long, env = "CCA_WS_URL")]
        ws: Option<String>,

        /// First block of the historical fetch (defaults to the auction start)
        #[arg(long)]
        from_block: Option<u64>,

        /// Watcher settings as JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print snapshots as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a launch draft and print the encoded parameters
    Encode {
        #[arg(value_name = "DRAFT_JSON")]
        draft: PathBuf,
    },

    /// List auctions created by the factory
    List {
        #[command(flatten)]
        connection: Connection,

        /// Factory address
        #[arg(long)]
        factory: Option<String>,

        #[arg(long, default_value_t = 0)]
        from_block: u64,

        #[arg(long)]
        json: bool,
    },

    /// Submit a bid (single attempt) with the key in CCA_PRIVATE_KEY
    Bid {
        #[arg(value_name = "AUCTION")]
        auction: String,

        #[command(flatten)]
        connection: Connection,

        /// Max price, currency per token
        #[arg(long)]
        price: f64,

        /// Budget in currency, e.g. 0.5
        #[arg(long)]
        amount: String,

        #[command(flatten)]
        wallet: Wallet,
    },

    /// Mint a token through the launcher and start its auction from a draft
    Launch {
        #[arg(value_name = "DRAFT_JSON")]
        draft: PathBuf,

        #[command(flatten)]
        connection: Connection,

        /// Token name
        #[arg(long)]
        name: String,

        /// Token symbol
        #[arg(long)]
        symbol: String,

        /// Total supply in whole tokens, all of it auctioned
        #[arg(long)]
        supply: String,

        #[command(flatten)]
        wallet: Wallet,
    },

    /// Exit a bid while the auction runs
    Exit {
        #[arg(value_name = "AUCTION")]
        auction: String,

        #[arg(value_name = "BID_ID")]
        bid_id: String,

        #[command(flatten)]
        connection: Connection,

        #[command(flatten)]
        wallet: Wallet,
    },

    /// Claim tokens for one or more bids after the claim block
    Claim {
        #[arg(value_name = "AUCTION")]
        auction: String,

        #[arg(value_name = "BID_ID", required = true, num_args = 1..)]
        bid_ids: Vec<String>,

        #[command(flatten)]
        connection: Connection,

        #[command(flatten)]
        wallet: Wallet,
    },

    /// List one owner's open bids across every factory auction
    MyBids {
        #[command(flatten)]
        connection: Connection,

        /// Bidder address (defaults to the CCA_PRIVATE_KEY account)
        #[arg(long)]
        owner: Option<String>,

        #[arg(long, env = "CCA_PRIVATE_KEY", hide_env_values = true)]
        private_key: Option<String>,

        /// Factory address
        #[arg(long)]
        factory: Option<String>,

        #[arg(long, default_value_t = 0)]
        from_block: u64,

        #[arg(long)]
        json: bool,
    },
}

type Signing = SignerMiddleware<Provider<Http>, LocalWallet>;

fn parse_address(value: &str) -> Result<Address, CcaError> {
    value.parse().map_err(|_| CcaError::InvalidAddress(value.to_string()))
}

fn parse_bid_id(value: &str) -> Result<U256, CcaError> {
    U256::from_dec_str(value.trim())
        .map_err(|_| CcaError::invalid("bid id", format!("'{}' is not a decimal integer", value)))
}

fn load_wallet(private_key: &str, chain_id: u64) -> Result<LocalWallet, CcaError> {
    Ok(private_key
        .parse::<LocalWallet>()
        .map_err(|_| CcaError::invalid("private key", "not a hex secp256k1 key"))?
        .with_chain_id(chain_id))
}

/// Submitter signing with `wallet`, plus the signing address
fn signing_submitter(
    client: &BlockchainClient,
    wallet: &Wallet,
) -> Result<(TransactionSubmitter<Signing>, Address), CcaError> {
    let wallet = load_wallet(&wallet.private_key, client.chain_id())?;
    let owner = wallet.address();
    let signer = SignerMiddleware::new((*client.provider).clone(), wallet);
    Ok((TransactionSubmitter::new(Arc::new(signer)), owner))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("cca_client=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("cca_client=info")
            .init();
    }

    match cli.command {
        Command::Watch { auction, connection, ws, from_block, config, json } => {
            watch(auction, connection, ws, from_block, config, json).await
        }
        Command::Encode { draft } => encode(draft),
        Command::List { connection, factory, from_block, json } => {
            list(connection, factory, from_block, json).await
        }
        Command::Bid { auction, connection, price, amount, wallet } => {
            bid(auction, connection, price, amount, wallet).await
        }
        Command::Launch { draft, connection, name, symbol, supply, wallet } => {
            let token = TokenLaunch { name, symbol, total_supply: supply };
            launch(draft, connection, token, wallet).await
        }
        Command::Exit { auction, bid_id, connection, wallet } => {
            exit(auction, bid_id, connection, wallet).await
        }
        Command::Claim { auction, bid_ids, connection, wallet } => {
            claim(auction, bid_ids, connection, wallet).await
        }
        Command::MyBids { connection, owner, private_key, factory, from_block, json } => {
            my_bids(connection, owner, private_key, factory, from_block, json).await
        }
    }
}

async fn watch(
    auction: String,
    connection: Connection,
    ws: Option<String>,
    from_block: Option<u64>,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let auction = parse_address(&auction)?;
    let mut config = match config {
        Some(path) => WatchConfig::load(path)?,
        None => WatchConfig::default(),
    };
    if from_block.is_some() {
        config.from_block = from_block;
    }

    println!("\n🔨 CCA Watcher");
    println!("================================\n");
    println!("🎯 Auction: {:?}", auction);
    println!("📡 RPC: {}\n", connection.rpc);

    let mut client = BlockchainClient::new(&connection.rpc)
        .await?
        .with_live_poll(config.live_poll_interval());
    if let Some(ws) = ws {
        client = client.with_ws(ws);
    }
    println!("✅ Connected to {}", client.chain_name());

    let watcher = AuctionWatcher::new(Arc::new(client), auction, config);
    let subscription = watcher.start().await?;
    let mut updates = watcher.updates();
    let mut last_printed = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if let Some(snapshot) = watcher.snapshot().await {
            let key = (snapshot.state.current_block, snapshot.bids.len(), snapshot.checkpoints.len());
            if last_printed != Some(key) {
                last_printed = Some(key);
                if json {
                    println!("{}", serde_json::to_string(&snapshot)?);
                } else {
                    println!("{}", snapshot);
                }
            }
        }

        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    subscription.unsubscribe().await;
    Ok(())
}

fn encode(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&path)?;
    let draft: AuctionDraft = serde_json::from_str(&text)?;

    let params = match draft.build() {
        Ok(params) => params,
        Err(e) => {
            println!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let spans = compute_spans(&draft.release_schedule, draft.duration())?;
    let steps = decode_schedule(&params.auction_steps_data)?;

    println!("═══ RELEASE SCHEDULE ({} blocks) ═══", draft.duration());
    for (i, (segment, span)) in draft.release_schedule.iter().zip(&spans).enumerate() {
        println!("   {}. {:>6.2}% over {} blocks", i + 1, segment.percentage, span);
    }
    println!();
    for step in &steps {
        println!("   mps {:>8} × {:>8} blocks = {}", step.mps, step.block_delta, step.released());
    }

    println!("\n═══ PARAMETERS ═══");
    println!("Floor price:  {} (Q96 {})", decode_price(params.floor_price), params.floor_price);
    println!("Blocks:       {} → {} (claim {})", params.start_block, params.end_block, params.claim_block);
    println!("Schedule:     0x{}", hex::encode(&params.auction_steps_data));
    println!("configData:   0x{}", hex::encode(params.encode()));
    Ok(())
}

async fn list(
    connection: Connection,
    factory: Option<String>,
    from_block: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let factory = match factory {
        Some(factory) => parse_address(&factory)?,
        None => addresses::cca_factory(),
    };

    let client = BlockchainClient::new(&connection.rpc).await?;
    if !addresses::supports_cca(client.chain_id()) {
        println!("⚠️  No known CCA factory deployment on {} ({})", client.chain_name(), client.chain_id());
    }

    let listings = list_auctions(&client, factory, from_block, &WatchConfig::default()).await?;
    let overviews = describe_auctions(&client, listings).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&overviews)?);
    } else if overviews.is_empty() {
        println!("No auctions found.");
    } else {
        for overview in &overviews {
            println!("{}", overview);
        }
    }
    Ok(())
}

async fn bid(
    auction: String,
    connection: Connection,
    price: f64,
    amount: String,
    wallet: Wallet,
) -> Result<(), Box<dyn std::error::Error>> {
    let auction = parse_address(&auction)?;
    let client = BlockchainClient::new(&connection.rpc).await?;

    let scalars = client.read_scalars(auction).await?;
    let current_block = client.block_number().await?;
    if current_block < scalars.start_block || current_block >= scalars.end_block {
        println!("❌ Auction is not live at block {} (live {} to {})", current_block, scalars.start_block, scalars.end_block);
        std::process::exit(1);
    }

    let token_decimals = client.token_metadata(scalars.token).await?.decimals;
    let currency_decimals = if scalars.is_native_currency() {
        18
    } else {
        client.token_metadata(scalars.currency).await?.decimals
    };

    let max_price = encode_price_with_decimals(price, token_decimals, currency_decimals)?;
    let budget = parse_units(&amount, currency_decimals)?;

    let (submitter, owner) = signing_submitter(&client, &wallet)?;

    let call = submit_bid(auction, max_price, budget, owner, scalars.is_native_currency())?;
    if !scalars.is_native_currency() {
        println!("⚠️  ERC20 auction: the currency must already be approved for the auction");
    }

    println!("📤 Bidding {} at max price {} from {:?}", format_wei(budget, currency_decimals), price, owner);

    let outcome = submitter.submit_and_wait(&call).await?;

    if outcome.success {
        println!("✅ Bid confirmed in block {:?}: {:?}", outcome.block_number, outcome.tx_hash);
        Ok(())
    } else {
        println!("❌ Bid reverted: {:?}", outcome.tx_hash);
        std::process::exit(2);
    }
}

async fn launch(
    path: PathBuf,
    connection: Connection,
    token: TokenLaunch,
    wallet: Wallet,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&path)?;
    let draft: AuctionDraft = serde_json::from_str(&text)?;

    let checked = draft.build().and_then(|params| {
        token.validate(draft.token_decimals)?;
        Ok(params)
    });
    let params = match checked {
        Ok(params) => params,
        Err(e) => {
            println!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let client = BlockchainClient::new(&connection.rpc).await?;
    if !addresses::supports_token_creation(client.chain_id()) {
        println!("❌ Token creation is not available on {} ({})", client.chain_name(), client.chain_id());
        std::process::exit(1);
    }

    let (submitter, owner) = signing_submitter(&client, &wallet)?;
    let nonce = client.provider.get_transaction_count(owner, None).await?;

    println!("
🚀 Launching {} ({}) from {:?}", token.name, token.symbol, owner);
    println!("   Blocks {} → {}, supply {}
", draft.start_block, draft.end_block, token.total_supply);

    let launched = submitter
        .launch_auction(&token, &params, draft.token_decimals, owner, nonce)
        .await?;

    println!("✅ Token:   {:?} (tx {:?})", launched.token, launched.create_tx);
    println!("✅ Auction: {:?} (tx {:?})", launched.auction, launched.distribute_tx);
    Ok(())
}

async fn exit(
    auction: String,
    bid_id: String,
    connection: Connection,
    wallet: Wallet,
) -> Result<(), Box<dyn std::error::Error>> {
    let auction = parse_address(&auction)?;
    let bid_id = parse_bid_id(&bid_id)?;
    let client = BlockchainClient::new(&connection.rpc).await?;
    let (submitter, _) = signing_submitter(&client, &wallet)?;

    println!("📤 Exiting bid {} on {:?}", bid_id, auction);
    let outcome = submitter.submit_and_wait(&exit_bid(auction, bid_id)).await?;

    if outcome.success {
        println!("✅ Bid exited in block {:?}: {:?}", outcome.block_number, outcome.tx_hash);
        Ok(())
    } else {
        println!("❌ Exit reverted: {:?}", outcome.tx_hash);
        std::process::exit(2);
    }
}

async fn claim(
    auction: String,
    bid_ids: Vec<String>,
    connection: Connection,
    wallet: Wallet,
) -> Result<(), Box<dyn std::error::Error>> {
    let auction = parse_address(&auction)?;
    let bid_ids = bid_ids
        .iter()
        .map(|id| parse_bid_id(id))
        .collect::<Result<Vec<_>, _>>()?;
    let client = BlockchainClient::new(&connection.rpc).await?;
    let (submitter, owner) = signing_submitter(&client, &wallet)?;

    let call = match bid_ids.as_slice() {
        [bid_id] => claim_tokens(auction, *bid_id),
        _ => claim_tokens_batch(auction, owner, bid_ids.clone()),
    };

    println!("📤 Claiming {} bid(s) on {:?}", bid_ids.len(), auction);
    let outcome = submitter.submit_and_wait(&call).await?;

    if outcome.success {
        println!("✅ Tokens claimed in block {:?}: {:?}", outcome.block_number, outcome.tx_hash);
        Ok(())
    } else {
        println!("❌ Claim reverted: {:?}", outcome.tx_hash);
        std::process::exit(2);
    }
}

async fn my_bids(
    connection: Connection,
    owner: Option<String>,
    private_key: Option<String>,
    factory: Option<String>,
    from_block: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = BlockchainClient::new(&connection.rpc).await?;
    let owner = match (owner, private_key) {
        (Some(owner), _) => parse_address(&owner)?,
        (None, Some(key)) => load_wallet(&key, client.chain_id())?.address(),
        (None, None) => {
            return Err(CcaError::invalid("owner", "pass --owner or set CCA_PRIVATE_KEY").into());
        }
    };
    let factory = match factory {
        Some(factory) => parse_address(&factory)?,
        None => addresses::cca_factory(),
    };

    let config = WatchConfig::default();
    let listings = list_auctions(&client, factory, from_block, &config).await?;
    let owned = bids_of_owner(&client, &listings, owner, &config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&owned)?);
    } else if owned.is_empty() {
        println!("No open bids for {:?}.", owner);
    } else {
        println!("═══ OPEN BIDS OF {:?} ═══", owner);
        for bid in &owned {
            println!("{}", bid);
        }
    }
    Ok(())
}
