//! Utility functions and types for end-to-end tests

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use contract_types::{Address, PoolEvent};
use pool::config::TOKEN_DECIMALS;
use pool::{CrossChainOrigin, Limits, Pool, PoolConfig, encode_for_bridge, parse_units};
use pool_utils::{MemoryToken, Token};
use prover::{Keypair, PreparedTransaction, TransactionRequest, prepare_transaction};
use tx_verifier::ReferenceBackend;

/// Number of levels in the pool's commitment Merkle tree
pub const LEVELS: u32 = 5;

/// Chain id of the settlement chain governance lives on
pub const L1_CHAIN_ID: u64 = 1;

/// Parse a decimal token amount into base units
pub fn ether(value: &str) -> u128 {
    parse_units(value, TOKEN_DECIMALS).expect("valid amount")
}

/// Pool configuration as an operator would write it
fn config_json(root_history_size: u32) -> String {
    format!(
        r#"{{
            "version": 1,
            "levels": {LEVELS},
            "root_history_size": {root_history_size},
            "token": "{}",
            "omni_bridge": "{}",
            "amb": "{}",
            "l1_unwrapper": "{}",
            "governance": "{}",
            "l1_chain_id": {L1_CHAIN_ID},
            "multisig": "{}"
        }}"#,
        Address::from_label("token"),
        Address::from_label("omni-bridge"),
        Address::from_label("amb"),
        Address::from_label("l1-unwrapper"),
        Address::from_label("governance"),
        Address::from_label("multisig"),
    )
}

/// Everything deployed for one test
pub struct Deployment {
    /// The pool under test
    pub pool: Pool,
    /// Token held by the pool
    pub token: Arc<MemoryToken>,
    /// Proof system shared by clients and the pool
    pub backend: Arc<ReferenceBackend>,
    /// Bridge between the settlement chain and the pool
    pub bridge: MockOmniBridge,
}

impl Deployment {
    /// Tokens escrowed by the shielded pool on behalf of unspent notes
    pub fn custody(&self) -> u128 {
        self.token.balance_of(&self.pool.address())
    }

    /// Build and prove a transaction against the current pool state
    pub fn prepare(&self, request: TransactionRequest) -> Result<PreparedTransaction> {
        let tree = self.pool.tree_snapshot();
        Ok(prepare_transaction(&tree, self.backend.as_ref(), request)?)
    }

    /// Origin of a governance call relayed through the AMB
    pub fn governance(&self) -> CrossChainOrigin {
        let config = self.pool.config();
        CrossChainOrigin {
            caller: config.amb,
            message_sender: config.governance,
            source_chain_id: config.l1_chain_id,
        }
    }

    /// Register `keypair` for `owner`
    pub fn register(&self, owner: Address, keypair: &Keypair) -> Result<()> {
        let account = pool::Account {
            owner,
            public_key: keypair.address().into_bytes(),
        };
        Ok(self.pool.register(&owner, account)?)
    }

    /// Receiving keypair registered by `owner`
    pub fn lookup(&self, owner: Address) -> Result<Keypair> {
        let key = self
            .pool
            .events()
            .into_iter()
            .find_map(|event| match event {
                PoolEvent::PublicKeyRegistered { owner: o, key } if o == owner => Some(key),
                _ => None,
            })
            .ok_or_else(|| anyhow!("{owner} has not registered a key"))?;
        let address = String::from_utf8(key).context("registered key is not an address")?;
        Ok(Keypair::from_address(&address)?)
    }
}

/// Deploy and initialize a pool with its token, prover and bridge
///
/// Limits are the defaults used when `MINIMUM_WITHDRAWAL_AMOUNT` and
/// `MAXIMUM_DEPOSIT_AMOUNT` are unset: 0.05 and 1.
pub fn deploy(root_history_size: u32) -> Result<Deployment> {
    let config = PoolConfig::from_json(&config_json(root_history_size))?;
    let token = Arc::new(MemoryToken::new(config.token));
    let backend = Arc::new(ReferenceBackend::setup()?);
    let bridge = MockOmniBridge::new(config.omni_bridge, Arc::clone(&token));

    let pool = Pool::deploy(
        Address::from_label("pool"),
        config,
        token.clone(),
        backend.clone(),
    )?;
    let limits = Limits::from_lookup(|_| None)?;
    pool.initialize(limits)?;

    Ok(Deployment {
        pool,
        token,
        backend,
        bridge,
    })
}

/// A message queued on the bridge
#[derive(Clone, Debug)]
pub enum BridgeMessage {
    /// Tokens locked on the settlement chain together with a pool call
    Deposit {
        /// Amount locked
        amount: u128,
        /// Encoded transaction for the pool
        payload: Vec<u8>,
    },
    /// Tokens handed over by the pool for delivery on the settlement chain
    Withdrawal {
        /// Final recipient
        recipient: Address,
        /// Contract unwrapping the tokens
        unwrapper: Address,
        /// Amount handed over
        amount: u128,
        /// Part of `amount` kept by the unwrapper
        l1_fee: u128,
    },
}

/// Omni bridge emulation
///
/// Both chains share one token ledger. Deposits are made into the L1 pool
/// account on the settlement chain, which hands them to the bridge right
/// away; the bridge account holds whatever is in flight. On
/// [`MockOmniBridge::execute`] the bridge approves the shielded pool for each
/// delivery and calls it, then pays out the L1 withdrawals the pool has
/// requested since the last run.
pub struct MockOmniBridge {
    address: Address,
    l1_pool: Address,
    token: Arc<MemoryToken>,
    pending: Vec<BridgeMessage>,
    cursor: usize,
}

impl MockOmniBridge {
    /// Bridge operating from `address`
    pub fn new(address: Address, token: Arc<MemoryToken>) -> Self {
        Self {
            address,
            l1_pool: Address::from_label("l1-pool"),
            token,
            pending: Vec::new(),
            cursor: 0,
        }
    }

    /// Tokens currently held by the bridge
    pub fn in_flight(&self) -> u128 {
        self.token.balance_of(&self.address)
    }

    /// Tokens left in the L1 pool account
    pub fn l1_pool_balance(&self) -> u128 {
        self.token.balance_of(&self.l1_pool)
    }

    /// Deposit `prepared`'s amount from `sender` into the L1 pool, hand it to
    /// the bridge and queue the pool call
    pub fn relay_tokens_and_call(
        &mut self,
        sender: &Address,
        prepared: &PreparedTransaction,
    ) -> Result<()> {
        let amount = u128::try_from(prepared.ext_data.ext_amount)
            .context("bridged transaction must be a deposit")?;
        self.token.transfer(sender, &self.l1_pool, amount)?;
        self.token.transfer(&self.l1_pool, &self.address, amount)?;
        self.pending.push(BridgeMessage::Deposit {
            amount,
            payload: encode_for_bridge(&prepared.proof, &prepared.ext_data),
        });
        Ok(())
    }

    /// Deliver every queued message
    ///
    /// Returns the pool's answer to each delivered deposit, in order.
    pub fn execute(&mut self, pool: &Pool) -> Result<Vec<Result<(), pool::Error>>> {
        for event in pool.events_since(self.cursor) {
            if let PoolEvent::L1WithdrawalRequested {
                recipient,
                unwrapper,
                amount,
                l1_fee,
            } = event
            {
                self.pending.push(BridgeMessage::Withdrawal {
                    recipient,
                    unwrapper,
                    amount,
                    l1_fee,
                });
            }
        }
        self.cursor = pool.event_count();

        let mut answers = Vec::new();
        for message in std::mem::take(&mut self.pending) {
            match message {
                BridgeMessage::Deposit { amount, payload } => {
                    self.token.approve(&self.address, &pool.address(), amount);
                    let answer =
                        pool.on_bridged_deposit(&self.address, &self.token.address(), amount, &payload);
                    log::info!("bridged deposit of {amount}: {answer:?}");
                    answers.push(answer);
                }
                BridgeMessage::Withdrawal {
                    recipient,
                    unwrapper,
                    amount,
                    l1_fee,
                } => {
                    let net = amount.checked_sub(l1_fee).context("l1 fee above amount")?;
                    self.token.transfer(&self.address, &recipient, net)?;
                    self.token.transfer(&self.address, &unwrapper, l1_fee)?;
                    log::info!("delivered {net} to {recipient} on the settlement chain");
                }
            }
        }
        Ok(answers)
    }
}
