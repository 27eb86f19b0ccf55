//! Shielded Pool
//!
//! This module implements a privacy-preserving transaction pool. It enables
//! users to deposit, transfer, and withdraw tokens while maintaining
//! transaction privacy through zero-knowledge proofs.
//!
//! # Architecture
//!
//! The pool maintains:
//! - A Merkle tree of commitments (via `MerkleTreeWithHistory`)
//! - A nullifier set to track spent UTXOs
//! - Token integration for deposits and withdrawals
//! - The token balance recorded after the last applied transaction
//! - Whether an upgrade has retired this instance
//!
//! All of it lives behind a single lock. Mutating entry points hold the lock
//! for their whole duration, so transactions are applied one at a time and a
//! rejected call leaves no trace.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ark_bn254::Fr;
use contract_types::{
    Address, CircuitId, CodecError, CommitmentTree, ExtData, MerklePath, NewCommitment, PoolEvent,
    Proof, TransactionAccepted,
};
use pool_utils::{HashError, Token, TokenError};
use thiserror::Error;
use tx_verifier::ProofSystem;

use crate::config::{Limits, PoolConfig};
use crate::merkle_with_history::{Error as MerkleError, MerkleTreeWithHistory};

/// Pool error types
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// Pool has not been initialized with limits yet
    #[error("pool is not initialized")]
    NotInitialized,
    /// Pool has already been initialized
    #[error("pool is already initialized")]
    AlreadyInitialized,
    /// Caller is not authorized to perform this operation
    #[error("caller is not authorized")]
    Unauthorized,
    /// Provided Merkle root is not in the recent history
    #[error("unknown merkle root")]
    UnknownRoot,
    /// Nullifier has already been spent or appears twice (double-spend attempt)
    #[error("input is already spent")]
    AlreadySpent,
    /// Zero-knowledge proof verification failed or proof is empty
    #[error("invalid transaction proof")]
    InvalidProof,
    /// External data hash does not match the provided data
    #[error("incorrect external data hash")]
    WrongExtHash,
    /// Public amount does not match `ext_amount - fee`
    #[error("invalid public amount")]
    WrongPublicAmount,
    /// Nullifier and commitment counts match no circuit
    #[error("{inputs} inputs and {outputs} outputs match no circuit")]
    WrongArity {
        /// Input nullifiers supplied
        inputs: usize,
        /// Output commitments supplied
        outputs: usize,
    },
    /// Deposit exceeds the configured maximum
    #[error("amount is larger than maximum deposit")]
    AboveMaxDeposit,
    /// Withdrawal is smaller than the configured minimum
    #[error("amount is lower than minimum withdrawal")]
    BelowMinWithdraw,
    /// Withdrawal or fee goes to the zero address
    #[error("withdrawal recipient is not set")]
    InvalidRecipient,
    /// Settlement chain fee exceeds the bridged amount
    #[error("l1 fee exceeds the withdrawn amount")]
    WrongL1Fee,
    /// Merkle tree has reached maximum capacity
    #[error("merkle tree is full")]
    CapacityExceeded,
    /// An output commitment is already in the tree
    #[error("commitment already inserted")]
    DuplicateCommitment,
    /// Invalid Merkle tree levels configuration
    #[error("invalid merkle tree levels")]
    WrongLevels,
    /// Configuration rejected at deployment
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Token is not the pool token
    #[error("token is not supported by this pool")]
    UnsupportedToken,
    /// Bridge delivered less than the deposit requires
    #[error("bridged amount does not cover the deposit")]
    InsufficientBridgedAmount,
    /// Bridge payload could not be decoded
    #[error("malformed bridge payload: {0}")]
    MalformedPayload(#[from] CodecError),
    /// A token transfer failed
    #[error("token transfer failed: {0}")]
    Token(#[from] TokenError),
    /// Upgrade does not move to a newer compatible config
    #[error("upgrade config is not newer or not compatible")]
    StaleConfig,
    /// This instance was replaced by an upgrade and accepts no more calls
    #[error("pool has been retired by an upgrade")]
    Retired,
    /// A thread panicked while holding the pool state
    #[error("pool state lock poisoned")]
    StatePoisoned,
    /// Hashing failed
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Conversion from MerkleTreeWithHistory errors to pool errors
impl From<MerkleError> for Error {
    fn from(e: MerkleError) -> Self {
        match e {
            MerkleError::WrongLevels => Error::WrongLevels,
            MerkleError::CapacityExceeded => Error::CapacityExceeded,
            MerkleError::DuplicateCommitment => Error::DuplicateCommitment,
            MerkleError::WrongBatchSize(n) => Error::WrongArity {
                inputs: 0,
                outputs: n,
            },
            MerkleError::Hash(e) => Error::Hash(e),
        }
    }
}

/// User account registration data
///
/// Used for registering a user's public key to enable encrypted communication
/// for receiving transfers.
/// Not required to interact with the pool. But facilitates in-pool transfers via events.
/// As parties can learn about each other public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Owner address of the account
    pub owner: Address,
    /// Public key material for receiving encrypted outputs
    pub public_key: Vec<u8>,
}

/// Origin of a cross-chain governance call as reported by the AMB
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrossChainOrigin {
    /// Contract invoking the pool; must be the AMB
    pub caller: Address,
    /// Sender of the message on the source chain
    pub message_sender: Address,
    /// Source chain of the message
    pub source_chain_id: u64,
}

/// Where the deposited tokens of a transaction come from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Funding {
    /// Pulled from the sender's allowance
    Pull(Address),
    /// Already delivered by the omni bridge
    Bridged,
}

#[derive(Clone, Debug)]
pub(crate) struct PoolState {
    pub(crate) limits: Option<Limits>,
    pub(crate) tree: MerkleTreeWithHistory,
    pub(crate) nullifiers: HashSet<Fr>,
    pub(crate) last_balance: u128,
    pub(crate) events: Vec<PoolEvent>,
    pub(crate) retired: bool,
}

impl PoolState {
    pub(crate) fn limits(&self) -> Result<Limits, Error> {
        self.limits.ok_or(Error::NotInitialized)
    }
}

/// Token movement that can be reversed if a later one fails
#[derive(Clone, Copy, Debug)]
struct Transfer {
    from: Address,
    to: Address,
    amount: u128,
}

/// Shielded Pool
///
/// Implements a private transaction pool.
/// Users can deposit tokens, perform private transfers, and withdraw while
/// maintaining transaction privacy through zero-knowledge proofs.
pub struct Pool {
    address: Address,
    config: PoolConfig,
    token: Arc<dyn Token>,
    verifier: Arc<dyn ProofSystem>,
    state: Mutex<PoolState>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("address", &self.address)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pool {
    /// Deploy an uninitialized pool
    ///
    /// # Arguments
    ///
    /// * `address` - Account holding the pool's tokens
    /// * `config` - Pool configuration (levels, collaborators, version)
    /// * `token` - Token collaborator; must be the configured token
    /// * `verifier` - Proof system checking transaction proofs
    pub fn deploy(
        address: Address,
        config: PoolConfig,
        token: Arc<dyn Token>,
        verifier: Arc<dyn ProofSystem>,
    ) -> Result<Self, Error> {
        config
            .validate()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if token.address() != config.token {
            return Err(Error::UnsupportedToken);
        }
        let tree = MerkleTreeWithHistory::init(config.levels, config.root_history_size)?;
        let last_balance = token.balance_of(&address);
        log::info!(
            "deployed pool v{} at {address} with {} levels",
            config.version,
            config.levels
        );

        Ok(Self {
            address,
            config,
            token,
            verifier,
            state: Mutex::new(PoolState {
                limits: None,
                tree,
                nullifiers: HashSet::new(),
                last_balance,
                events: Vec::new(),
                retired: false,
            }),
        })
    }

    /// Set the deposit and withdrawal limits
    ///
    /// This function can only be called once.
    pub fn initialize(&self, limits: Limits) -> Result<(), Error> {
        let mut state = self.lock()?;
        if state.limits.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        state.limits = Some(limits);
        log::info!(
            "pool initialized: max deposit {}, min withdrawal {}",
            limits.max_deposit,
            limits.min_withdraw
        );
        Ok(())
    }

    /// Execute a shielded transaction with deposit handling
    ///
    /// This is the main entry point for users to interact with the pool.
    /// If `ext_amount > 0`, tokens are pulled from `sender` (who must have
    /// approved the pool) after every check has passed.
    ///
    /// # Arguments
    ///
    /// * `sender` - Account funding a deposit
    /// * `proof` - Zero-knowledge proof and public inputs
    /// * `ext_data` - External transaction data
    pub fn transact(&self, sender: &Address, proof: &Proof, ext_data: &ExtData) -> Result<(), Error> {
        let mut state = self.lock()?;
        self.apply_transaction(&mut state, Funding::Pull(*sender), proof, ext_data)
    }

    /// Process a private transaction
    ///
    /// Validates the proof and all public inputs, moves tokens, marks
    /// nullifiers as spent and inserts new commitments into the Merkle tree.
    ///
    /// # Validation Steps
    ///
    /// 1. Verify Merkle root is in recent history
    /// 2. Verify no nullifiers have been spent
    /// 3. Verify external data hash, public amount and arity
    /// 4. Verify zero-knowledge proof
    /// 5. Move tokens (deposit, withdrawal, relayer fee)
    pub(crate) fn apply_transaction(
        &self,
        state: &mut PoolState,
        funding: Funding,
        proof: &Proof,
        ext_data: &ExtData,
    ) -> Result<(), Error> {
        let limits = state.limits()?;
        let public = &proof.public;

        // 1. Merkle root check
        if !state.tree.is_known_root(&public.root) {
            return Err(Error::UnknownRoot);
        }

        // 2. Nullifier checks (prevent double-spending)
        for (i, n) in public.input_nullifiers.iter().enumerate() {
            if state.nullifiers.contains(n) || public.input_nullifiers[..i].contains(n) {
                return Err(Error::AlreadySpent);
            }
        }

        // 3. External data hash, public amount and circuit arity
        if ext_data.hash() != public.ext_data_hash {
            return Err(Error::WrongExtHash);
        }
        if ext_data.public_amount() != public.public_amount {
            return Err(Error::WrongPublicAmount);
        }
        let circuit = public.circuit().ok_or(Error::WrongArity {
            inputs: public.input_nullifiers.len(),
            outputs: public.output_commitments.len(),
        })?;

        // 4. ZK proof verification
        if !self.verify_proof(circuit, proof) {
            return Err(Error::InvalidProof);
        }
        state.tree.check_insert(&public.output_commitments)?;

        // 5. Value movement; every limit is checked before the first transfer
        let plan = self.plan_transfers(&limits, funding, ext_data)?;
        let mut done = Vec::with_capacity(plan.len());
        for transfer in plan {
            if let Err(e) = self.execute(funding, &transfer) {
                log::warn!("transfer of {} to {} failed: {e}", transfer.amount, transfer.to);
                self.rollback(&done);
                return Err(e.into());
            }
            done.push(transfer);
        }

        // 6. Insert new commitments into Merkle tree
        let (first_index, root) = match state.tree.insert_leaves(&public.output_commitments) {
            Ok(inserted) => inserted,
            Err(e) => {
                self.rollback(&done);
                return Err(e.into());
            }
        };

        // 7. Mark nullifiers as spent
        state.nullifiers.extend(public.input_nullifiers.iter().copied());

        // 8. Record balance and emit events
        state.last_balance = self.token.balance_of(&self.address);
        if ext_data.is_l1_withdrawal && ext_data.ext_amount < 0 {
            state.events.push(PoolEvent::L1WithdrawalRequested {
                recipient: ext_data.recipient,
                unwrapper: self.config.l1_unwrapper,
                amount: ext_data.ext_amount.unsigned_abs(),
                l1_fee: ext_data.l1_fee,
            });
        }
        let commitments = public
            .output_commitments
            .iter()
            .zip(first_index..)
            .enumerate()
            .map(|(i, (commitment, index))| NewCommitment {
                commitment: *commitment,
                index,
                encrypted_output: ext_data.encrypted_outputs.get(i).cloned().unwrap_or_default(),
            })
            .collect();
        state
            .events
            .push(PoolEvent::TransactionAccepted(TransactionAccepted {
                root,
                nullifiers: public.input_nullifiers.clone(),
                commitments,
            }));
        log::info!(
            "applied {circuit:?} transaction: ext amount {}, leaves {first_index}..{}",
            ext_data.ext_amount,
            state.tree.next_index()
        );

        Ok(())
    }

    /// Verify a zero-knowledge proof
    ///
    /// Public inputs follow the circuit order:
    /// `[root, publicAmount, extDataHash, inputNullifier..., outputCommitment...]`
    fn verify_proof(&self, circuit: CircuitId, proof: &Proof) -> bool {
        if proof.proof.is_empty() {
            return false;
        }
        let public_inputs = proof.public.to_field_elements();
        match self.verifier.verify(circuit, &proof.proof, &public_inputs) {
            Ok(valid) => valid,
            Err(e) => {
                log::debug!("verifier rejected proof: {e}");
                false
            }
        }
    }

    fn plan_transfers(
        &self,
        limits: &Limits,
        funding: Funding,
        ext_data: &ExtData,
    ) -> Result<Vec<Transfer>, Error> {
        let mut plan = Vec::new();

        if ext_data.ext_amount > 0 {
            let amount = ext_data.ext_amount.unsigned_abs();
            if amount > limits.max_deposit {
                return Err(Error::AboveMaxDeposit);
            }
            if let Funding::Pull(sender) = funding {
                plan.push(Transfer {
                    from: sender,
                    to: self.address,
                    amount,
                });
            }
        } else if ext_data.ext_amount < 0 {
            let amount = ext_data.ext_amount.unsigned_abs();
            if ext_data.recipient.is_zero() {
                return Err(Error::InvalidRecipient);
            }
            if amount < limits.min_withdraw && !ext_data.is_full_withdrawal {
                return Err(Error::BelowMinWithdraw);
            }
            let to = if ext_data.is_l1_withdrawal {
                if ext_data.l1_fee > amount {
                    return Err(Error::WrongL1Fee);
                }
                self.config.omni_bridge
            } else {
                ext_data.recipient
            };
            plan.push(Transfer {
                from: self.address,
                to,
                amount,
            });
        }

        if ext_data.fee > 0 {
            if ext_data.relayer.is_zero() {
                return Err(Error::InvalidRecipient);
            }
            plan.push(Transfer {
                from: self.address,
                to: ext_data.relayer,
                amount: ext_data.fee,
            });
        }
        Ok(plan)
    }

    fn execute(&self, funding: Funding, transfer: &Transfer) -> Result<(), TokenError> {
        match funding {
            Funding::Pull(sender) if transfer.from == sender && transfer.to == self.address => self
                .token
                .transfer_from(&self.address, &transfer.from, &transfer.to, transfer.amount),
            _ => self
                .token
                .transfer(&transfer.from, &transfer.to, transfer.amount),
        }
    }

    fn rollback(&self, done: &[Transfer]) {
        for transfer in done.iter().rev() {
            if let Err(e) = self
                .token
                .transfer(&transfer.to, &transfer.from, transfer.amount)
            {
                log::error!(
                    "rollback of {} from {} failed: {e}",
                    transfer.amount,
                    transfer.to
                );
            }
        }
    }

    /// Register a user's public encryption key
    ///
    /// Allows users to publish their public key so others can send them
    /// encrypted outputs for private transfers.
    /// The account owner must be the caller.
    pub fn register(&self, caller: &Address, account: Account) -> Result<(), Error> {
        if *caller != account.owner {
            return Err(Error::Unauthorized);
        }
        let mut state = self.lock()?;
        state.limits()?;
        state.events.push(PoolEvent::PublicKeyRegistered {
            owner: account.owner,
            key: account.public_key,
        });
        Ok(())
    }

    /// Replace the deposit and withdrawal limits
    ///
    /// Only callable by governance through the AMB.
    pub fn configure_limits(&self, origin: &CrossChainOrigin, limits: Limits) -> Result<(), Error> {
        self.check_governance(origin)?;
        let mut state = self.lock()?;
        state.limits()?;
        state.limits = Some(limits);
        log::info!(
            "limits updated: max deposit {}, min withdrawal {}",
            limits.max_deposit,
            limits.min_withdraw
        );
        Ok(())
    }

    /// Build the next version of this pool
    ///
    /// Only callable by governance through the AMB. The returned instance
    /// carries the full state over under `config`, which must have a higher
    /// version with the same levels and token. The caller replaces its
    /// instance with the returned one.
    ///
    /// This instance is retired in the same critical section: every later
    /// mutating call on it fails with [`Error::Retired`], so a nullifier spent
    /// on the new instance cannot be spent again here.
    pub fn upgrade(&self, origin: &CrossChainOrigin, config: PoolConfig) -> Result<Pool, Error> {
        self.check_governance(origin)?;
        config
            .validate()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if config.version <= self.config.version
            || config.levels != self.config.levels
            || config.token != self.config.token
            || config.root_history_size != self.config.root_history_size
        {
            return Err(Error::StaleConfig);
        }
        let mut current = self.lock()?;
        current.limits()?;
        let mut state = current.clone();
        current.retired = true;
        state.last_balance = self.token.balance_of(&self.address);
        log::info!(
            "upgrading pool at {} from v{} to v{}",
            self.address,
            self.config.version,
            config.version
        );

        Ok(Pool {
            address: self.address,
            config,
            token: Arc::clone(&self.token),
            verifier: Arc::clone(&self.verifier),
            state: Mutex::new(state),
        })
    }

    fn check_governance(&self, origin: &CrossChainOrigin) -> Result<(), Error> {
        if origin.caller != self.config.amb
            || origin.message_sender != self.config.governance
            || origin.source_chain_id != self.config.l1_chain_id
        {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    /// State of a live pool, for mutation
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, PoolState>, Error> {
        let state = self.state.lock().map_err(|_| Error::StatePoisoned)?;
        if state.retired {
            return Err(Error::Retired);
        }
        Ok(state)
    }

    // Read-only views tolerate poisoning; mutations never leave partial state
    fn view(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== Read access ==========

    /// Account holding the pool's tokens
    pub fn address(&self) -> Address {
        self.address
    }

    /// Active configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Token collaborator
    pub fn token(&self) -> &Arc<dyn Token> {
        &self.token
    }

    /// Current limits, `None` before initialization
    pub fn limits(&self) -> Option<Limits> {
        self.view().limits
    }

    /// Current Merkle root
    pub fn last_root(&self) -> Fr {
        self.view().tree.last_root()
    }

    /// Whether `root` is within the root history window
    pub fn is_known_root(&self, root: &Fr) -> bool {
        self.view().tree.is_known_root(root)
    }

    /// Path of an inserted leaf in the current tree
    pub fn path_to(&self, leaf_index: u64) -> Option<MerklePath> {
        self.view().tree.path_to(leaf_index)
    }

    /// Index the next inserted leaf will occupy
    pub fn next_index(&self) -> u64 {
        self.view().tree.next_index()
    }

    /// Whether a nullifier has been spent
    pub fn is_spent(&self, nullifier: &Fr) -> bool {
        self.view().nullifiers.contains(nullifier)
    }

    /// Token balance recorded after the last applied transaction
    pub fn last_balance(&self) -> u128 {
        self.view().last_balance
    }

    /// Every event published so far
    pub fn events(&self) -> Vec<PoolEvent> {
        self.view().events.clone()
    }

    /// Number of events published so far
    pub fn event_count(&self) -> usize {
        self.view().events.len()
    }

    /// Whether an upgrade has replaced this instance
    pub fn is_retired(&self) -> bool {
        self.view().retired
    }

    /// Events published after the first `cursor` ones
    pub fn events_since(&self, cursor: usize) -> Vec<PoolEvent> {
        self.view().events.get(cursor..).unwrap_or_default().to_vec()
    }

    /// Consistent copy of the commitment tree
    ///
    /// Proof builders running alongside transactions should read roots and
    /// paths from one snapshot rather than from the live pool.
    pub fn tree_snapshot(&self) -> MerkleTreeWithHistory {
        self.view().tree.clone()
    }
}

impl CommitmentTree for Pool {
    fn levels(&self) -> u32 {
        self.config.levels
    }

    fn root(&self) -> Fr {
        self.last_root()
    }

    fn leaf_index(&self, commitment: &Fr) -> Option<u64> {
        self.view().tree.position_of(commitment)
    }

    fn path(&self, leaf_index: u64) -> Option<MerklePath> {
        self.path_to(leaf_index)
    }
}
