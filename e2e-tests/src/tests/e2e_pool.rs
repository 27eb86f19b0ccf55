//! End-to-end tests for direct pool transactions
//!
//! Notes are built and proven by the client, submitted to the pool and
//! rediscovered from the pool's events, covering both circuit sizes.
use super::utils::{Deployment, deploy, ether};
use anyhow::Result;
use contract_types::{Address, CircuitId};
use pool::{Error, Limits};
use pool_utils::Token;
use prover::{Keypair, Note, NoteScanner, TransactionRequest, verify_transaction};

/// Deposit `amount` for `owner`, pulled from `sender`
fn deposit(dep: &Deployment, sender: &Address, owner: &Keypair, amount: u128) -> Result<Note> {
    dep.token.approve(sender, &dep.pool.address(), amount);
    let tx = dep.prepare(TransactionRequest {
        outputs: vec![Note::new(amount, owner.clone())?],
        ..Default::default()
    })?;
    dep.pool.transact(sender, &tx.proof, &tx.ext_data)?;
    Ok(tx.outputs[0].clone())
}

/// One real input and one real output are padded to the 2x2 circuit
#[test]
fn test_e2e_single_note_padding() -> Result<()> {
    let dep = deploy(100)?;
    let alice_addr = Address::from_label("alice");
    dep.token.mint(&alice_addr, ether("1"))?;
    let alice = Keypair::generate()?;

    let note = deposit(&dep, &alice_addr, &alice, ether("0.05"))?;
    assert_eq!(dep.pool.next_index(), 2);

    println!("Moving the note to a fresh one...");
    let tx = dep.prepare(TransactionRequest {
        inputs: vec![note],
        outputs: vec![Note::new(ether("0.05"), alice.clone())?],
        ..Default::default()
    })?;
    assert_eq!(tx.circuit, CircuitId::Transaction2);
    assert_eq!(tx.proof.public.input_nullifiers.len(), 2);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[1].amount(), 0);
    assert_eq!(tx.ext_data.ext_amount, 0);
    assert!(verify_transaction(dep.backend.as_ref(), &tx.proof)?);

    dep.pool.transact(&alice_addr, &tx.proof, &tx.ext_data)?;
    assert_eq!(dep.pool.next_index(), 4);
    assert_eq!(dep.token.balance_of(&dep.pool.address()), ether("0.05"));

    let mut scanner = NoteScanner::new(alice)?;
    scanner.sync(&dep.pool.events());
    assert_eq!(scanner.unspent()?.len(), 1);
    assert_eq!(scanner.balance()?, ether("0.05"));

    Ok(())
}

/// Three inputs select the 16x16 circuit
#[test]
fn test_e2e_sixteen_input_circuit() -> Result<()> {
    let dep = deploy(100)?;
    let alice_addr = Address::from_label("alice");
    let recipient = Address::from_label("recipient");
    dep.token.mint(&alice_addr, ether("1"))?;
    let alice = Keypair::generate()?;

    let notes = vec![
        deposit(&dep, &alice_addr, &alice, ether("0.1"))?,
        deposit(&dep, &alice_addr, &alice, ether("0.2"))?,
        deposit(&dep, &alice_addr, &alice, ether("0.3"))?,
    ];
    assert_eq!(dep.pool.next_index(), 6);

    println!("Merging three notes...");
    let merge = dep.prepare(TransactionRequest {
        inputs: notes,
        outputs: vec![Note::new(ether("0.6"), alice.clone())?],
        ..Default::default()
    })?;
    assert_eq!(merge.circuit, CircuitId::Transaction16);
    assert_eq!(merge.proof.public.to_field_elements().len(), 35);
    dep.pool
        .transact(&alice_addr, &merge.proof, &merge.ext_data)?;
    assert_eq!(dep.pool.next_index(), 22);

    let mut scanner = NoteScanner::new(alice)?;
    scanner.sync(&dep.pool.events());
    let unspent = scanner.unspent()?;
    assert_eq!(unspent.len(), 1);
    assert_eq!(unspent[0].index(), Some(6));

    let exit = dep.prepare(TransactionRequest {
        inputs: unspent,
        recipient,
        ..Default::default()
    })?;
    assert_eq!(exit.circuit, CircuitId::Transaction2);
    dep.pool.transact(&recipient, &exit.proof, &exit.ext_data)?;
    assert_eq!(dep.token.balance_of(&recipient), ether("0.6"));
    assert_eq!(dep.token.balance_of(&dep.pool.address()), 0);

    Ok(())
}

/// A proof built against a root that has left the window is rebuilt
#[test]
fn test_e2e_expired_root_requires_rebuild() -> Result<()> {
    let dep = deploy(3)?;
    let alice_addr = Address::from_label("alice");
    let bob_addr = Address::from_label("bob");
    let recipient = Address::from_label("recipient");
    dep.token.mint(&alice_addr, ether("1"))?;
    dep.token.mint(&bob_addr, ether("1"))?;
    let alice = Keypair::generate()?;
    let bob = Keypair::generate()?;

    let note = deposit(&dep, &alice_addr, &alice, ether("0.5"))?;
    let request = TransactionRequest {
        inputs: vec![note],
        recipient,
        ..Default::default()
    };
    let stale = dep.prepare(request.clone())?;

    for _ in 0..3 {
        deposit(&dep, &bob_addr, &bob, ether("0.1"))?;
    }
    assert_eq!(
        dep.pool.transact(&recipient, &stale.proof, &stale.ext_data),
        Err(Error::UnknownRoot)
    );

    println!("Rebuilding against the current root...");
    let fresh = dep.prepare(request)?;
    assert_eq!(
        fresh.proof.public.input_nullifiers[0],
        stale.proof.public.input_nullifiers[0]
    );
    dep.pool.transact(&recipient, &fresh.proof, &fresh.ext_data)?;
    assert_eq!(dep.token.balance_of(&recipient), ether("0.5"));

    Ok(())
}

/// Governance raises the deposit limit, then swaps in an upgraded pool
#[test]
fn test_e2e_governance_limits_and_upgrade() -> Result<()> {
    let dep = deploy(100)?;
    let alice_addr = Address::from_label("alice");
    let recipient = Address::from_label("recipient");
    dep.token.mint(&alice_addr, ether("5"))?;
    let alice = Keypair::generate()?;

    assert_eq!(
        deposit(&dep, &alice_addr, &alice, ether("2")).map_err(|e| e.downcast::<Error>().ok()),
        Err(Some(Error::AboveMaxDeposit))
    );

    dep.pool.configure_limits(
        &dep.governance(),
        Limits {
            min_withdraw: ether("0.01"),
            max_deposit: ether("5"),
        },
    )?;
    let note = deposit(&dep, &alice_addr, &alice, ether("2"))?;

    let mut next = dep.pool.config().clone();
    next.version = 2;
    let upgraded = dep.pool.upgrade(&dep.governance(), next)?;
    assert!(dep.pool.is_retired());
    assert_eq!(upgraded.last_root(), dep.pool.last_root());
    assert_eq!(upgraded.last_balance(), ether("2"));

    let tree = upgraded.tree_snapshot();
    let exit = prover::prepare_transaction(
        &tree,
        dep.backend.as_ref(),
        TransactionRequest {
            inputs: vec![note],
            recipient,
            ..Default::default()
        },
    )?;
    upgraded.transact(&recipient, &exit.proof, &exit.ext_data)?;
    assert_eq!(dep.token.balance_of(&recipient), ether("2"));
    assert!(upgraded.is_spent(&exit.proof.public.input_nullifiers[0]));
    assert_eq!(
        dep.pool.transact(&recipient, &exit.proof, &exit.ext_data),
        Err(Error::Retired)
    );

    Ok(())
}
