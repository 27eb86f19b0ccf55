//! Bridge relay
//!
//! Deposits made on the settlement chain reach the pool through the omni
//! bridge, which approves the pool for the delivered tokens and then calls
//! [`Pool::on_bridged_deposit`] with the payload produced by
//! [`encode_for_bridge`]. The payload carries the whole transaction, so the
//! proof is checked on this side exactly as for a direct call.
//!
//! Payload layout:
//!
//! ```text
//! "SPB" || version (1) || SCALE(proof) || SCALE(ext data)
//! ```

use contract_types::{Address, CodecError, ExtData, Proof};
use parity_scale_codec::{Decode, Encode};

use crate::pool::{Error, Funding, Pool, PoolState};

/// Leading bytes of every bridge payload
pub const PAYLOAD_MAGIC: &[u8; 3] = b"SPB";

/// Payload version produced by [`encode_for_bridge`]
pub const PAYLOAD_VERSION: u8 = 1;

/// Encode a transaction for delivery through the bridge
pub fn encode_for_bridge(proof: &Proof, ext_data: &ExtData) -> Vec<u8> {
    let mut payload = PAYLOAD_MAGIC.to_vec();
    payload.push(PAYLOAD_VERSION);
    (proof, ext_data).encode_to(&mut payload);
    payload
}

/// Decode a payload produced by [`encode_for_bridge`]
///
/// The whole input must be consumed.
pub fn decode_bridge_payload(payload: &[u8]) -> Result<(Proof, ExtData), CodecError> {
    let body = payload
        .strip_prefix(PAYLOAD_MAGIC.as_slice())
        .ok_or(CodecError::BadMagic)?;
    let mut body = match body.split_first() {
        Some((&PAYLOAD_VERSION, rest)) => rest,
        Some((&other, _)) => return Err(CodecError::UnsupportedVersion(Some(other))),
        None => return Err(CodecError::UnsupportedVersion(None)),
    };
    let decoded = <(Proof, ExtData)>::decode(&mut body)?;
    if !body.is_empty() {
        return Err(CodecError::TrailingBytes(body.len()));
    }
    Ok(decoded)
}

impl Pool {
    /// Apply a transaction delivered by the omni bridge
    ///
    /// The bridge has approved the pool for `amount` of `token`. The pool
    /// pulls exactly that amount under its lock, so a delivery is never
    /// mixed up with tokens moved by other transactions, and then applies the
    /// transaction without pulling its deposit again.
    ///
    /// Any failure after the pull forwards the pulled tokens to the multisig
    /// and returns the error, so a replayed message credits nothing. Tokens
    /// delivered beyond the deposit are forwarded to the multisig as well.
    ///
    /// # Arguments
    ///
    /// * `caller` - Contract invoking the pool; must be the omni bridge
    /// * `token` - Token delivered by the bridge
    /// * `amount` - Amount delivered by the bridge
    /// * `payload` - Transaction encoded with [`encode_for_bridge`]
    pub fn on_bridged_deposit(
        &self,
        caller: &Address,
        token: &Address,
        amount: u128,
        payload: &[u8],
    ) -> Result<(), Error> {
        if *caller != self.config().omni_bridge {
            return Err(Error::Unauthorized);
        }
        let mut state = self.lock()?;
        state.limits()?;
        if *token != self.config().token {
            return Err(Error::UnsupportedToken);
        }
        self.token()
            .transfer_from(&self.address(), caller, &self.address(), amount)?;

        match self.apply_bridged(&mut state, amount, payload) {
            Ok(deposit) => {
                let excess = amount.saturating_sub(deposit);
                self.forward_to_multisig(&mut state, excess);
                Ok(())
            }
            Err(e) => {
                log::warn!("bridged deposit of {amount} rejected: {e}");
                self.forward_to_multisig(&mut state, amount);
                Err(e)
            }
        }
    }

    /// Decode and apply the delivered transaction, returning its deposit
    fn apply_bridged(&self, state: &mut PoolState, amount: u128, payload: &[u8]) -> Result<u128, Error> {
        let (proof, ext_data) = decode_bridge_payload(payload)?;
        let deposit = if ext_data.ext_amount > 0 {
            ext_data.ext_amount.unsigned_abs()
        } else {
            0
        };
        if amount < deposit {
            return Err(Error::InsufficientBridgedAmount);
        }
        log::debug!("applying bridged deposit of {deposit} ({amount} delivered)");
        self.apply_transaction(state, Funding::Bridged, &proof, &ext_data)?;
        Ok(deposit)
    }

    fn forward_to_multisig(&self, state: &mut PoolState, amount: u128) {
        if amount > 0 {
            let multisig = self.config().multisig;
            match self.token().transfer(&self.address(), &multisig, amount) {
                Ok(()) => log::info!("forwarded {amount} to multisig {multisig}"),
                Err(e) => log::error!("forwarding {amount} to multisig failed: {e}"),
            }
        }
        state.last_balance = self.token().balance_of(&self.address());
    }
}
