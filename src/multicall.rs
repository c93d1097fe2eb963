pub use anyhow::Result;
use ethers::abi::{Function, Param, ParamType, StateMutability, Token};
use ethers::prelude::*;
use log::{debug, warn};
use std::sync::Arc;

/// A single contract read to be batched in a multicall.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Call {
    /// Target contract address
    pub target: Address,
    /// Encoded function call data
    pub call_data: Bytes,
}

impl Call {
    pub fn new(target: Address, call_data: impl Into<Bytes>) -> Self {
        Self {
            target,
            call_data: call_data.into(),
        }
    }
}

/// Multicall3 batch executor.
///
/// Batches many read-only calls into a single `aggregate3` `eth_call`, so
/// every result in one chunk is read from the same block. Each call is sent
/// with `allowFailure = true`: a reverting call yields `None` in its slot
/// instead of failing the whole batch. An `Err` from [`Multicall::run`] means
/// the batch request itself failed.
///
/// ## Example
///
/// ```rust,ignore
/// let multicall = Multicall::new(provider, multicall_address, 100);
/// let calls = vec![
///     Call::new(pool_address, slot0_calldata),
///     Call::new(pool_address, liquidity_calldata),
/// ];
/// let results = multicall.run(calls, None).await?;
/// ```
#[derive(Clone, Debug)]
pub struct Multicall<M: Middleware> {
    pub provider: Arc<M>,
    multicall_address: Address,
    batch_size: usize,
}

impl<M: Middleware + 'static> Multicall<M> {
    pub fn new(provider: Arc<M>, multicall_address: Address, batch_size: usize) -> Self {
        // RPC providers reject very large aggregate3 payloads
        let validated_batch_size = batch_size.clamp(1, 200);

        if batch_size > 200 {
            warn!(
                "Batch size {} exceeds recommended maximum (200), capping to 200",
                batch_size
            );
        }

        Self {
            provider,
            multicall_address,
            batch_size: validated_batch_size,
        }
    }

    /// Runs a batch of calls, optionally at a specific block.
    ///
    /// Results come back in the order of `calls`; `None` marks a call that
    /// reverted.
    pub async fn run(&self, calls: Vec<Call>, block: Option<BlockId>) -> Result<Vec<Option<Bytes>>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        // Coalesce identical calls to reduce load
        let mut unique_calls = indexmap::IndexSet::new();
        let mut original_indices = Vec::with_capacity(calls.len());
        for call in &calls {
            let (index, _) = unique_calls.insert_full(call.clone());
            original_indices.push(index);
        }
        let unique_call_vec: Vec<Call> = unique_calls.into_iter().collect();
        debug!(
            "Multicall coalesced {} calls into {}",
            calls.len(),
            unique_call_vec.len()
        );

        let mut all_results_unique: Vec<Option<Bytes>> = Vec::with_capacity(unique_call_vec.len());
        for call_chunk in unique_call_vec.chunks(self.batch_size) {
            let return_data = self.execute_aggregate3(call_chunk, block).await?;
            if return_data.len() != call_chunk.len() {
                anyhow::bail!(
                    "Multicall returned {} results for {} calls",
                    return_data.len(),
                    call_chunk.len()
                );
            }
            all_results_unique.extend(return_data);
        }

        // Reconstruct the full result set in the original order
        Ok(original_indices
            .into_iter()
            .map(|index| all_results_unique[index].clone())
            .collect())
    }

    async fn execute_aggregate3(
        &self,
        calls: &[Call],
        block: Option<BlockId>,
    ) -> Result<Vec<Option<Bytes>>> {
        let calldata = encode_aggregate3(calls)?;

        let tx_request = TransactionRequest::new()
            .to(self.multicall_address)
            .data(calldata);
        let typed_tx: ethers::types::transaction::eip2718::TypedTransaction = tx_request.into();
        let response = self.provider.call(&typed_tx, block).await?;

        decode_aggregate3(&response)
    }
}

fn call3_param_type() -> ParamType {
    // Call3 struct: (address target, bool allowFailure, bytes callData)
    ParamType::Tuple(vec![ParamType::Address, ParamType::Bool, ParamType::Bytes])
}

fn result_param_type() -> ParamType {
    // Result struct: (bool success, bytes returnData)
    ParamType::Tuple(vec![ParamType::Bool, ParamType::Bytes])
}

#[allow(deprecated)]
fn aggregate3_function() -> Function {
    Function {
        name: "aggregate3".to_string(),
        inputs: vec![Param {
            name: "calls".to_string(),
            kind: ParamType::Array(Box::new(call3_param_type())),
            internal_type: None,
        }],
        outputs: vec![Param {
            name: "returnData".to_string(),
            kind: ParamType::Array(Box::new(result_param_type())),
            internal_type: None,
        }],
        constant: None,
        state_mutability: StateMutability::Payable,
    }
}

/// ABI-encodes `aggregate3(Call3[])` with `allowFailure = true` on every call.
pub fn encode_aggregate3(calls: &[Call]) -> Result<Bytes> {
    let call_tokens = calls
        .iter()
        .map(|call| {
            Token::Tuple(vec![
                Token::Address(call.target),
                Token::Bool(true),
                Token::Bytes(call.call_data.to_vec()),
            ])
        })
        .collect();

    let encoded = aggregate3_function().encode_input(&[Token::Array(call_tokens)])?;
    Ok(Bytes::from(encoded))
}

/// Decodes an `aggregate3` response into per-call return data.
pub fn decode_aggregate3(response: &[u8]) -> Result<Vec<Option<Bytes>>> {
    let decoded = ethers::abi::decode(
        &[ParamType::Array(Box::new(result_param_type()))],
        response,
    )?;

    let results_array = decoded
        .into_iter()
        .next()
        .and_then(|t| t.into_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid multicall response format"))?;

    let mut return_data = Vec::with_capacity(results_array.len());
    for result_token in results_array {
        let mut fields = result_token
            .into_tuple()
            .ok_or_else(|| anyhow::anyhow!("Invalid multicall result entry"))?;
        if fields.len() != 2 {
            anyhow::bail!("Invalid multicall result entry with {} fields", fields.len());
        }
        let data = fields.remove(1).into_bytes();
        let success = fields.remove(0).into_bool().unwrap_or(false);
        return_data.push(match (success, data) {
            (true, Some(bytes)) => Some(Bytes::from(bytes)),
            _ => None,
        });
    }

    Ok(return_data)
}

/// Canned-response helpers for reader tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use ethers::providers::{MockProvider, Provider};

    pub(crate) type MockClient = Provider<MockProvider>;

    pub(crate) fn mocked() -> (Arc<MockClient>, MockProvider, Arc<Multicall<MockClient>>) {
        let (provider, mock) = Provider::mocked();
        let provider = Arc::new(provider);
        let multicall = Arc::new(Multicall::new(
            provider.clone(),
            Address::from_low_u64_be(0xca11),
            100,
        ));
        (provider, mock, multicall)
    }

    /// `aggregate3` return data; `None` is a reverted call.
    pub(crate) fn aggregate3_reply(entries: &[Option<Vec<u8>>]) -> Bytes {
        let tokens = entries
            .iter()
            .map(|entry| match entry {
                Some(data) => Token::Tuple(vec![Token::Bool(true), Token::Bytes(data.clone())]),
                None => Token::Tuple(vec![Token::Bool(false), Token::Bytes(Vec::new())]),
            })
            .collect();
        Bytes::from(ethers::abi::encode(&[Token::Array(tokens)]))
    }

    /// Queues `eth_call` replies in request order. The mock answers last-pushed first.
    pub(crate) fn queue(mock: &MockProvider, replies: Vec<Bytes>) {
        for reply in replies.into_iter().rev() {
            mock.push::<Bytes, _>(reply).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{aggregate3_reply, mocked, queue};
    use super::*;

    fn result_tokens(entries: &[(bool, &[u8])]) -> Vec<u8> {
        let tokens = entries
            .iter()
            .map(|(ok, data)| Token::Tuple(vec![Token::Bool(*ok), Token::Bytes(data.to_vec())]))
            .collect();
        ethers::abi::encode(&[Token::Array(tokens)])
    }

    #[tokio::test]
    async fn identical_calls_are_sent_once_and_fanned_back_out() {
        let (_provider, mock, multicall) = mocked();
        let target = Address::from_low_u64_be(7);
        queue(&mock, vec![aggregate3_reply(&[Some(vec![1]), None])]);

        let calls = vec![
            Call::new(target, vec![0xaau8]),
            Call::new(target, vec![0xbbu8]),
            Call::new(target, vec![0xaau8]),
        ];
        let results = multicall.run(calls, None).await.unwrap();
        assert_eq!(
            results,
            vec![Some(Bytes::from(vec![1u8])), None, Some(Bytes::from(vec![1u8]))]
        );
    }

    #[tokio::test]
    async fn short_reply_is_an_error() {
        let (_provider, mock, multicall) = mocked();
        queue(&mock, vec![aggregate3_reply(&[Some(vec![1])])]);

        let target = Address::from_low_u64_be(7);
        let calls = vec![Call::new(target, vec![0xaau8]), Call::new(target, vec![0xbbu8])];
        assert!(multicall.run(calls, None).await.is_err());
    }

    #[test]
    fn decode_keeps_order_and_marks_failures() {
        let response = result_tokens(&[(true, &[1, 2, 3]), (false, &[0xde, 0xad]), (true, &[])]);
        let decoded = decode_aggregate3(&response).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0], Some(Bytes::from(vec![1u8, 2, 3])));
        assert_eq!(decoded[1], None);
        assert_eq!(decoded[2], Some(Bytes::from(Vec::<u8>::new())));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_aggregate3(&[0u8; 3]).is_err());
    }

    #[test]
    fn encode_uses_aggregate3_selector() {
        let calls = vec![Call::new(Address::from_low_u64_be(1), vec![0x38u8, 0x50, 0xc7, 0xbd])];
        let encoded = encode_aggregate3(&calls).unwrap();
        // keccak256("aggregate3((address,bool,bytes)[])")[..4]
        assert_eq!(&encoded[..4], &[0x82, 0xad, 0x56, 0xcb]);
    }
}
