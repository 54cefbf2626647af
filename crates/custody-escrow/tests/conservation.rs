//! Property tests: random deposit/withdraw sequences by the owner and by an
//! outside principal, against ordinary and custody accounts alike, never
//! create or destroy tokens, and every escrow balance always equals its
//! custody account balance.

mod common;

use custody_core::{AccountAddress, PrincipalId};
use custody_escrow::ErrorKind;
use custody_ledger::TokenLedger;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Counterparty {
    OwnerAccount,
    OutsiderAccount,
    OwnCustody,
    NeighbourCustody,
}

#[derive(Debug, Clone)]
struct Op {
    deposit: bool,
    amount: u64,
    by_owner: bool,
    counterparty: Counterparty,
}

fn counterparty() -> impl Strategy<Value = Counterparty> {
    prop_oneof![
        4 => Just(Counterparty::OwnerAccount),
        2 => Just(Counterparty::OutsiderAccount),
        1 => Just(Counterparty::OwnCustody),
        1 => Just(Counterparty::NeighbourCustody),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    (any::<bool>(), 0u64..1_500, any::<bool>(), counterparty()).prop_map(
        |(deposit, amount, by_owner, counterparty)| Op {
            deposit,
            amount,
            by_owner,
            counterparty,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn operations_conserve_tokens(minted in 0u64..5_000, ops in prop::collection::vec(op(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let h = common::in_memory();
            let escrow = h.open_escrow().await;
            h.ledger.mint_to(escrow.owner_account, minted).unwrap();

            // A second escrow holding tokens of its own.
            let neighbour = h.open_escrow().await;
            h.ledger.mint_to(neighbour.owner_account, 200).unwrap();
            h.service
                .deposit(neighbour.id, neighbour.owner, neighbour.owner_account, 200)
                .await
                .unwrap();

            let outsider = PrincipalId::new();
            let outsider_account = h
                .ledger
                .create_account(outsider, common::spl())
                .await
                .unwrap();
            h.ledger.mint_to(outsider_account, 1_000).unwrap();
            let supply = h.ledger.total_supply(&common::spl());

            for op in ops {
                let before = h.escrow_balance(escrow.id).await;
                let caller = if op.by_owner { escrow.owner } else { outsider };
                let account: AccountAddress = match op.counterparty {
                    Counterparty::OwnerAccount => escrow.owner_account,
                    Counterparty::OutsiderAccount => outsider_account,
                    Counterparty::OwnCustody => escrow.custody_account,
                    Counterparty::NeighbourCustody => neighbour.custody_account,
                };
                let to_custody = matches!(
                    op.counterparty,
                    Counterparty::OwnCustody | Counterparty::NeighbourCustody
                );

                let result = if op.deposit {
                    h.service.deposit(escrow.id, caller, account, op.amount).await
                } else {
                    h.service.withdraw(escrow.id, caller, account, op.amount).await
                };

                let after = h.escrow_balance(escrow.id).await;
                match result {
                    Ok(balance) => {
                        prop_assert!(op.by_owner);
                        prop_assert!(op.amount > 0);
                        prop_assert!(!to_custody);
                        let expected = if op.deposit {
                            before + op.amount
                        } else {
                            before - op.amount
                        };
                        prop_assert_eq!(balance, expected);
                        prop_assert_eq!(after, expected);
                    }
                    Err(e) => {
                        if !op.by_owner {
                            prop_assert_eq!(e.kind(), ErrorKind::Unauthorized);
                        } else if to_custody && op.amount > 0 && (op.deposit || op.amount <= before) {
                            prop_assert_eq!(e.kind(), ErrorKind::InvalidCounterparty);
                        }
                        prop_assert_eq!(after, before);
                    }
                }

                prop_assert_eq!(after, h.balance(escrow.custody_account).await);
                prop_assert_eq!(h.escrow_balance(neighbour.id).await, 200);
                prop_assert_eq!(h.balance(neighbour.custody_account).await, 200);
                prop_assert_eq!(
                    u128::from(h.balance(escrow.owner_account).await)
                        + u128::from(h.balance(outsider_account).await)
                        + u128::from(after),
                    u128::from(minted) + 1_000
                );
                prop_assert_eq!(h.ledger.total_supply(&common::spl()), supply);
            }
            Ok(())
        })?;
    }
}
