//! Handler tests
//!
//! Run against the in-memory ledger, lock manager and a fixed clock.

#[cfg(test)]
mod tests {
    use crate::balance::{BalanceValidator, INSUFFICIENT_BALANCE};
    use crate::domain::{
        Account, AccountBalanceSnapshot, AccountMovement, Amount, Balance, FixedClock,
        MovementType,
    };
    use crate::error::LedgerError;
    use crate::handlers::{CreateMovementCommand, CreateMovementHandler, LedgerQueries};
    use crate::lock::{account_lock_key, InMemoryLockManager, LockManager, LockSettings};
    use crate::store::{FaultMode, InMemoryLedger, PageRequest};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    struct Fixture {
        ledger: InMemoryLedger,
        locks: Arc<InMemoryLockManager>,
        clock: Arc<FixedClock>,
        handler: CreateMovementHandler<InMemoryLedger, InMemoryLockManager>,
        queries: LedgerQueries<InMemoryLedger>,
        account_id: Uuid,
        business_id: Uuid,
    }

    impl Fixture {
        fn lock_key(&self) -> String {
            account_lock_key(self.account_id)
        }

        async fn credit(&self, amount: rust_decimal::Decimal) -> AccountMovement {
            self.handler
                .execute(CreateMovementCommand::credit(
                    self.account_id,
                    self.business_id,
                    amount,
                ))
                .await
                .unwrap()
        }

        async fn debit(
            &self,
            amount: rust_decimal::Decimal,
        ) -> Result<AccountMovement, LedgerError> {
            self.handler
                .execute(CreateMovementCommand::debit(
                    self.account_id,
                    self.business_id,
                    amount,
                ))
                .await
        }
    }

    // Wednesday 10:00 UTC: business-hours tier
    fn business_hours() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 14, 10, 0, 0).unwrap()
    }

    fn fixture() -> Fixture {
        let ledger = InMemoryLedger::new();
        let business_id = Uuid::new_v4();
        let account = Account::new(Uuid::new_v4(), business_id, "operating");
        let account_id = account.id;
        ledger.insert_account(account);

        // single attempt: a held lock fails fast
        let locks = Arc::new(InMemoryLockManager::new(LockSettings {
            max_attempts: 1,
            retry_delay: std::time::Duration::from_millis(1),
            ..LockSettings::default()
        }));
        let clock = Arc::new(FixedClock::new(business_hours()));
        let transactions = Arc::new(ledger.clone());

        let handler = CreateMovementHandler::new(
            Arc::clone(&transactions),
            Arc::clone(&locks),
            BalanceValidator::default(),
            clock.clone(),
        );
        let queries = LedgerQueries::new(transactions, BalanceValidator::default(), clock.clone());

        Fixture {
            ledger,
            locks,
            clock,
            handler,
            queries,
            account_id,
            business_id,
        }
    }

    // =========================================================================
    // Movement creation
    // =========================================================================

    #[tokio::test]
    async fn test_credit_is_appended_and_lock_released() {
        let fx = fixture();

        let movement = fx
            .handler
            .execute(
                CreateMovementCommand::credit(fx.account_id, fx.business_id, dec!(250.50))
                    .with_description("invoice 42"),
            )
            .await
            .unwrap();

        assert_eq!(movement.movement_type(), MovementType::Credit);
        assert_eq!(movement.amount().value(), dec!(250.50));
        assert_eq!(movement.description(), Some("invoice 42"));
        assert_eq!(movement.created_at(), business_hours());
        assert_eq!(fx.ledger.movements(fx.account_id), vec![movement]);
        assert!(!fx.locks.is_held(&fx.lock_key()));
        assert_eq!(fx.locks.release_count(), 1);
    }

    #[tokio::test]
    async fn test_debit_with_funds_succeeds() {
        let fx = fixture();
        fx.credit(dec!(3000)).await;

        let movement = fx.debit(dec!(2000)).await.unwrap();

        assert!(movement.is_debit());
        assert_eq!(fx.ledger.movements(fx.account_id).len(), 2);
    }

    #[tokio::test]
    async fn test_debit_without_funds_is_invalid_operation() {
        let fx = fixture();
        fx.credit(dec!(100)).await;

        let err = fx.debit(dec!(150)).await.unwrap_err();

        match err {
            LedgerError::InvalidOperation(reason) => assert_eq!(reason, INSUFFICIENT_BALANCE),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(fx.ledger.movements(fx.account_id).len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_before_locking() {
        let fx = fixture();

        for amount in [dec!(0), dec!(-5)] {
            let err = fx
                .handler
                .execute(CreateMovementCommand::credit(fx.account_id, fx.business_id, amount))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidOperation(_)));
        }
        assert_eq!(fx.locks.release_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_account_not_found() {
        let fx = fixture();

        let err = fx
            .handler
            .execute(CreateMovementCommand::credit(Uuid::new_v4(), fx.business_id, dec!(10)))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::ResourceNotFound(_)));
        assert_eq!(fx.locks.release_count(), 1);
    }

    #[tokio::test]
    async fn test_other_tenant_not_allowed() {
        let fx = fixture();

        let err = fx
            .handler
            .execute(CreateMovementCommand::credit(fx.account_id, Uuid::new_v4(), dec!(10)))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::NotAllowed(_)));
        assert!(fx.ledger.movements(fx.account_id).is_empty());
    }

    // =========================================================================
    // Withdrawal policy through the handler
    // =========================================================================

    #[tokio::test]
    async fn test_third_large_debit_hits_daily_cap() {
        let fx = fixture();
        fx.credit(dec!(10000)).await;

        fx.debit(dec!(1800)).await.unwrap();
        fx.clock.advance(Duration::minutes(30));
        fx.debit(dec!(1800)).await.unwrap();
        fx.clock.advance(Duration::minutes(30));
        let err = fx.debit(dec!(1800)).await.unwrap_err();

        match err {
            LedgerError::InvalidOperation(reason) => {
                assert!(reason.contains("daily withdrawal limit"))
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // next local day resets the allowance
        fx.clock.set(Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap());
        fx.debit(dec!(1800)).await.unwrap();
    }

    #[tokio::test]
    async fn test_blackout_debit_rejected_but_credit_accepted() {
        let fx = fixture();
        fx.credit(dec!(500)).await;
        fx.clock.set(Utc.with_ymd_and_hms(2026, 1, 14, 23, 0, 0).unwrap());

        let err = fx.debit(dec!(50)).await.unwrap_err();
        match err {
            LedgerError::InvalidOperation(reason) => assert!(reason.contains("22:00")),
            other => panic!("unexpected error: {:?}", other),
        }

        fx.credit(dec!(10)).await;
    }

    // =========================================================================
    // Lock lifecycle
    // =========================================================================

    #[tokio::test]
    async fn test_busy_lock_fails_without_writing() {
        let fx = fixture();
        assert!(fx.locks.acquire(&fx.lock_key()).await.unwrap());

        let err = fx
            .handler
            .execute(CreateMovementCommand::credit(fx.account_id, fx.business_id, dec!(10)))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::LockAcquisitionFailed(_)));
        assert!(fx.ledger.movements(fx.account_id).is_empty());
        // the lock belongs to someone else and must not be released
        assert!(fx.locks.is_held(&fx.lock_key()));
        assert_eq!(fx.locks.release_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_validation_releases_lock_for_next_call() {
        let fx = fixture();

        assert!(fx.debit(dec!(100)).await.is_err());
        assert!(!fx.locks.is_held(&fx.lock_key()));

        // max_attempts is 1, so this only passes if the lock was freed
        fx.credit(dec!(100)).await;
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_and_releases_lock() {
        let fx = fixture();
        fx.credit(dec!(500)).await;
        fx.ledger.inject_fault(fx.account_id, FaultMode::Error);

        let err = fx.debit(dec!(100)).await.unwrap_err();

        assert!(matches!(err, LedgerError::InternalServerError(_)));
        assert!(!fx.locks.is_held(&fx.lock_key()));
        assert_eq!(fx.ledger.movements(fx.account_id).len(), 1);
    }

    #[tokio::test]
    async fn test_panic_is_internal_and_releases_lock() {
        let fx = fixture();
        fx.credit(dec!(500)).await;
        fx.ledger.inject_fault(fx.account_id, FaultMode::Panic);

        let err = fx.debit(dec!(100)).await.unwrap_err();

        assert!(matches!(err, LedgerError::InternalServerError(_)));
        assert!(!fx.locks.is_held(&fx.lock_key()));
        assert_eq!(fx.ledger.movements(fx.account_id).len(), 1);

        fx.ledger.clear_faults();
        fx.debit(dec!(100)).await.unwrap();
    }

    #[tokio::test]
    async fn test_release_failure_does_not_change_outcome() {
        let fx = fixture();
        fx.locks.set_fail_release(true);

        let movement = fx.credit(dec!(40)).await;
        assert_eq!(fx.ledger.movements(fx.account_id), vec![movement]);

        let err = fx.debit(dec!(500)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOperation(_)));
        assert_eq!(fx.locks.release_count(), 2);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[tokio::test]
    async fn test_get_movement_checks_tenant() {
        let fx = fixture();
        let movement = fx.credit(dec!(75)).await;

        let found = fx
            .queries
            .get_movement(movement.id(), fx.business_id)
            .await
            .unwrap();
        assert_eq!(found, movement);

        let err = fx
            .queries
            .get_movement(movement.id(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotAllowed(_)));

        let err = fx
            .queries
            .get_movement(Uuid::new_v4(), fx.business_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_movements_newest_first() {
        let fx = fixture();
        for amount in [dec!(10), dec!(20), dec!(30)] {
            fx.credit(amount).await;
            fx.clock.advance(Duration::minutes(1));
        }

        let page = fx
            .queries
            .list_movements(fx.account_id, fx.business_id, &PageRequest::new(1, 2))
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages(), 2);
        let amounts: Vec<_> = page.items.iter().map(|m| m.amount().value()).collect();
        assert_eq!(amounts, vec![dec!(30), dec!(20)]);
    }

    #[tokio::test]
    async fn test_current_balance_uses_snapshot() {
        let fx = fixture();
        let month_start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        fx.ledger.seed_snapshot(AccountBalanceSnapshot::new(
            fx.account_id,
            Balance::new(dec!(100)),
            1,
            2026,
            month_start,
            None,
        ));
        for (kind, amount, days) in [(MovementType::Credit, 50, 2), (MovementType::Debit, 30, 5)] {
            fx.ledger.seed_movement(AccountMovement::new(
                fx.account_id,
                kind,
                Amount::from_integer(amount).unwrap(),
                None,
                month_start + Duration::days(days),
            ));
        }

        let balance = fx
            .queries
            .current_balance(fx.account_id, fx.business_id)
            .await
            .unwrap();

        assert_eq!(balance.balance.value(), dec!(120));
        assert_eq!(balance.snapshot_period, Some((2026, 1)));
        assert_eq!(balance.as_of, business_hours());
    }

    #[tokio::test]
    async fn test_validate_balance_is_advisory() {
        let fx = fixture();
        fx.credit(dec!(1000)).await;

        let validation = fx
            .queries
            .validate_balance(fx.account_id, fx.business_id, dec!(600))
            .await
            .unwrap();
        assert!(validation.is_valid);
        assert_eq!(validation.available_balance, dec!(1000));

        // nothing written
        assert_eq!(fx.ledger.movements(fx.account_id).len(), 1);

        let err = fx
            .queries
            .validate_balance(fx.account_id, Uuid::new_v4(), dec!(600))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotAllowed(_)));
    }
}
