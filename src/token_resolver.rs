use crate::contracts::{AggregatorV3Interface, Erc20};
use crate::multicall::{Call, Multicall};
use crate::types::conversions::string_to_address;
use crate::types::{OracleReading, Token};
use anyhow::Result;
use ethers::abi::{Function, Token as AbiToken};
use ethers::providers::Middleware;
use ethers::types::{Address, Bytes, I256};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Slots of one token's reads inside the batch.
struct TokenSlots {
    token: Address,
    feed: Address,
    symbol: usize,
    decimals: usize,
    /// `(latestAnswer, decimals)` on the feed, absent when the token has no feed
    oracle: Option<(usize, usize)>,
}

/// Resolves ERC-20 metadata and oracle USD prices for a set of tokens.
///
/// All reads for all tokens (`symbol`, `decimals`, and the feed's
/// `latestAnswer` / `decimals`) travel in one multicall round trip. Feeds come
/// from a static token -> aggregator table; tokens outside it get price 0.
#[derive(Debug, Clone)]
pub struct TokenResolver<M: Middleware> {
    provider: Arc<M>,
    multicall: Arc<Multicall<M>>,
    price_feeds: Arc<HashMap<Address, Address>>,
}

impl<M: Middleware + 'static> TokenResolver<M> {
    pub fn new(
        provider: Arc<M>,
        multicall: Arc<Multicall<M>>,
        price_feeds: Arc<HashMap<Address, Address>>,
    ) -> Self {
        Self {
            provider,
            multicall,
            price_feeds,
        }
    }

    /// Feed configured for `token`, or the zero address.
    pub fn feed_for(&self, token: &Address) -> Address {
        self.price_feeds.get(token).copied().unwrap_or_else(Address::zero)
    }

    /// Same as [`TokenResolver::resolve`] for raw address strings; malformed ones are dropped.
    pub async fn resolve_strs<S: AsRef<str>>(&self, addresses: &[S]) -> HashMap<Address, Token> {
        let parsed: Vec<Address> = addresses
            .iter()
            .filter_map(|s| string_to_address(s.as_ref()).ok())
            .collect();
        self.resolve(&parsed).await
    }

    /// Resolves every distinct address.
    ///
    /// Tokens whose own `symbol()`/`decimals()` cannot be read are left out.
    /// If the batch request fails the result is empty rather than partial.
    pub async fn resolve(&self, addresses: &[Address]) -> HashMap<Address, Token> {
        let mut seen = HashSet::new();
        let unique: Vec<Address> = addresses
            .iter()
            .copied()
            .filter(|a| !a.is_zero() && seen.insert(*a))
            .collect();

        if unique.is_empty() {
            return HashMap::new();
        }

        match self.try_resolve(&unique).await {
            Ok(tokens) => {
                info!(
                    "TokenResolver: resolved {}/{} tokens",
                    tokens.len(),
                    unique.len()
                );
                tokens
            }
            Err(e) => {
                warn!(
                    "TokenResolver: batch read for {} tokens failed: {:#}",
                    unique.len(),
                    e
                );
                HashMap::new()
            }
        }
    }

    async fn try_resolve(&self, tokens: &[Address]) -> Result<HashMap<Address, Token>> {
        let erc20 = Erc20::new(Address::zero(), self.provider.clone());
        let symbol_fn = erc20.abi().function("symbol")?;
        let decimals_fn = erc20.abi().function("decimals")?;
        let aggregator = AggregatorV3Interface::new(Address::zero(), self.provider.clone());
        let answer_fn = aggregator.abi().function("latestAnswer")?;
        let feed_decimals_fn = aggregator.abi().function("decimals")?;

        let symbol_data = symbol_fn.encode_input(&[])?;
        let decimals_data = decimals_fn.encode_input(&[])?;
        let answer_data = answer_fn.encode_input(&[])?;
        let feed_decimals_data = feed_decimals_fn.encode_input(&[])?;

        let mut calls: Vec<Call> = Vec::with_capacity(tokens.len() * 4);
        let mut slots = Vec::with_capacity(tokens.len());
        for &token in tokens {
            let feed = self.feed_for(&token);

            let symbol = calls.len();
            calls.push(Call::new(token, symbol_data.clone()));
            let decimals = calls.len();
            calls.push(Call::new(token, decimals_data.clone()));

            let oracle = if feed.is_zero() {
                debug!("No price feed configured for {:?}, price will be 0", token);
                None
            } else {
                let answer = calls.len();
                calls.push(Call::new(feed, answer_data.clone()));
                let feed_decimals = calls.len();
                calls.push(Call::new(feed, feed_decimals_data.clone()));
                Some((answer, feed_decimals))
            };

            slots.push(TokenSlots {
                token,
                feed,
                symbol,
                decimals,
                oracle,
            });
        }

        let results = self.multicall.run(calls, None).await?;

        let mut resolved = HashMap::with_capacity(slots.len());
        for slot in slots {
            let symbol = decode_first(symbol_fn, &results[slot.symbol]).and_then(AbiToken::into_string);
            let decimals = decode_first(decimals_fn, &results[slot.decimals])
                .and_then(AbiToken::into_uint)
                .and_then(|d| u8::try_from(d).ok());

            let (symbol, decimals) = match (symbol, decimals) {
                (Some(s), Some(d)) => (s, d),
                _ => {
                    warn!("TokenResolver: {:?} does not expose ERC-20 metadata", slot.token);
                    continue;
                }
            };

            let reading = match slot.oracle {
                Some((answer_idx, feed_decimals_idx)) => OracleReading {
                    feed: slot.feed,
                    raw_answer: decode_first(answer_fn, &results[answer_idx])
                        .and_then(AbiToken::into_int)
                        .map(I256::from_raw),
                    feed_decimals: decode_first(feed_decimals_fn, &results[feed_decimals_idx])
                        .and_then(AbiToken::into_uint)
                        .and_then(|d| u8::try_from(d).ok()),
                },
                None => OracleReading::unavailable(),
            };

            let price = reading.price();
            debug!("TokenResolver: {} ({:?}) decimals={} price={}", symbol, slot.token, decimals, price);
            resolved.insert(slot.token, Token::new(slot.token, symbol, decimals, price));
        }

        Ok(resolved)
    }
}

fn decode_first(function: &Function, raw: &Option<Bytes>) -> Option<AbiToken> {
    let bytes = raw.as_ref()?;
    function.decode_output(bytes).ok()?.into_iter().next()
}
