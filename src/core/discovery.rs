//! Auction discovery from factory events

use ethers::contract::{parse_log, EthEvent};
use ethers::types::{Address, Filter, Log, H256};
use futures_util::future::join_all;
use crate::codec::decode_price;
use crate::config::WatchConfig;
use crate::contracts::AuctionCreatedFilter;
use crate::encoding::AuctionParameters;
use crate::events::{auction_filter, EventReconstructor};
use crate::models::{AuctionListing, AuctionOverview, AuctionPhase, FillStatus, OwnedBid};
use crate::utils::{CcaError, Result};
use super::history::fetch_chunked;
use super::projector::project_state;
use super::traits::AuctionSource;

/// Every auction the factory announced between `from_block` and the chain head
pub async fn list_auctions<S>(
    source: &S,
    factory: Address,
    from_block: u64,
    config: &WatchConfig,
) -> Result<Vec<AuctionListing>>
where
    S: AuctionSource + ?Sized,
{
    let head = source.block_number().await?;
    let filter = Filter::new()
        .address(factory)
        .topic0(AuctionCreatedFilter::signature());

    tracing::info!("🔍 Scanning factory {:?} from block {} to {}", factory, from_block, head);

    let logs = fetch_chunked(source, &filter, from_block, head, config)
        .await
        .into_logs()?;

    let listings = logs.iter().map(parse_listing).collect::<Result<Vec<_>>>()?;
    tracing::info!("✅ Found {} auctions", listings.len());
    Ok(listings)
}

/// Decode one `AuctionCreated` log
pub fn parse_listing(log: &Log) -> Result<AuctionListing> {
    let event: AuctionCreatedFilter = parse_log(log.clone())
        .map_err(|e| CcaError::MalformedLog(format!("AuctionCreated: {}", e)))?;

    let parameters = match AuctionParameters::decode(&event.config_data) {
        Ok(params) => Some(params),
        Err(e) => {
            tracing::debug!("configData of {:?} did not decode: {}", event.auction, e);
            None
        }
    };

    Ok(AuctionListing {
        auction: event.auction,
        token: event.token,
        amount: event.amount,
        parameters,
        created_at: log.block_number.map(|b| b.as_u64()).unwrap_or_default(),
    })
}

/// Read state for every listing concurrently; failed reads leave `state` empty
pub async fn describe_auctions<S>(
    source: &S,
    listings: Vec<AuctionListing>,
) -> Result<Vec<AuctionOverview>>
where
    S: AuctionSource + ?Sized,
{
    let current_block = source.block_number().await?;

    let overviews = listings.into_iter().map(|listing| async move {
        let state = match source.read_scalars(listing.auction).await {
            Ok(scalars) => {
                let token = source.token_metadata(scalars.token).await.unwrap_or_default();
                Some(project_state(listing.auction, current_block, &scalars, &token))
            }
            Err(e) => {
                tracing::warn!("Could not read auction {:?}: {}", listing.auction, e);
                None
            }
        };
        AuctionOverview { listing, state }
    });

    Ok(join_all(overviews).await)
}

/// Every unexited bid `owner` holds across `listings`, grouped by auction in listing order.
///
/// Auctions without a bid from `owner` are skipped before any state is read.
/// A failed log fetch fails the whole query; a failed state read only drops
/// that auction.
pub async fn bids_of_owner<S>(
    source: &S,
    listings: &[AuctionListing],
    owner: Address,
    config: &WatchConfig,
) -> Result<Vec<OwnedBid>>
where
    S: AuctionSource + ?Sized,
{
    let head = source.block_number().await?;

    let per_auction = listings
        .iter()
        .map(|listing| owned_bids_in(source, listing, owner, head, config));

    let owned = join_all(per_auction)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    tracing::info!("✅ {:?} holds {} open bids", owner, owned.len());
    Ok(owned)
}

async fn owned_bids_in<S>(
    source: &S,
    listing: &AuctionListing,
    owner: Address,
    head: u64,
    config: &WatchConfig,
) -> Result<Vec<OwnedBid>>
where
    S: AuctionSource + ?Sized,
{
    let filter = auction_filter(listing.auction).topic2(H256::from(owner));
    let logs = fetch_chunked(source, &filter, listing.created_at, head, config)
        .await
        .into_logs()?;

    let mut events = EventReconstructor::new(listing.auction);
    events.apply_batch(&logs)?;
    let bids = events.bids_of(owner);
    if bids.is_empty() {
        return Ok(Vec::new());
    }

    let scalars = match source.read_scalars(listing.auction).await {
        Ok(scalars) => scalars,
        Err(e) => {
            tracing::warn!("Could not read auction {:?}: {}", listing.auction, e);
            return Ok(Vec::new());
        }
    };
    let token = source.token_metadata(scalars.token).await.unwrap_or_default();
    let clearing = decode_price(scalars.clearing_price);
    let phase = AuctionPhase::at(head, scalars.start_block, scalars.end_block);

    Ok(bids
        .into_iter()
        .map(|bid| OwnedBid {
            auction: listing.auction,
            token_symbol: token.symbol.clone(),
            fill: FillStatus::classify(bid.price_human(), clearing),
            bid: bid.clone(),
            clearing_price_human: clearing,
            phase,
            claimable: head >= scalars.claim_block,
        })
        .collect())
}
