//! # Customer Repository
//!
//! Store operations for customers and their payment history.
//!
//! The balance adjuster mirrors the stock adjuster's read-modify-write
//! shape, but with no lower bound: a negative balance means the customer is
//! in credit with the store.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use tally_core::{Customer, CustomerPayment};

/// Repository for customer store operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, balance_cents, credit_limit_cents, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by ID, failing with NotFound when absent.
    pub async fn require(&self, id: &str) -> StoreResult<Customer> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Customer", id))
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> StoreResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, balance_cents, credit_limit_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(customer.balance_cents)
        .bind(customer.credit_limit_cents)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Adjusts the running balance by `delta` cents, returning the updated
    /// customer.
    ///
    /// Read-modify-write like `adjust_stock`, but with no bound in either
    /// direction.
    pub async fn adjust_balance(&self, id: &str, delta_cents: i64) -> StoreResult<Customer> {
        debug!(id = %id, delta = %delta_cents, "Adjusting customer balance");

        let mut customer = self.require(id).await?;
        let new_balance = customer.balance_cents + delta_cents;

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE customers
            SET balance_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(new_balance)
        .bind(now)
        .execute(&self.pool)
        .await?;

        customer.balance_cents = new_balance;
        customer.updated_at = now;
        Ok(customer)
    }

    /// Overwrites the running balance with an authoritative value.
    ///
    /// Used by the balance recalculator after rebuilding the balance from
    /// the sale and payment history.
    pub async fn set_balance(&self, id: &str, balance_cents: i64) -> StoreResult<Customer> {
        debug!(id = %id, balance = %balance_cents, "Setting customer balance");

        let mut customer = self.require(id).await?;

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE customers
            SET balance_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(balance_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        customer.balance_cents = balance_cents;
        customer.updated_at = now;
        Ok(customer)
    }

    /// Records a payment against a customer's balance.
    ///
    /// Writes the history row only; callers pair this with `adjust_balance`.
    pub async fn add_payment(&self, payment: &CustomerPayment) -> StoreResult<()> {
        debug!(customer_id = %payment.customer_id, amount = %payment.amount_cents, "Recording customer payment");

        sqlx::query(
            r#"
            INSERT INTO customer_payments (id, customer_id, amount_cents, note, paid_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.customer_id)
        .bind(payment.amount_cents)
        .bind(&payment.note)
        .bind(payment.paid_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Sums all recorded payments for a customer, in cents.
    pub async fn sum_payments(&self, customer_id: &str) -> StoreResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount_cents)
            FROM customer_payments
            WHERE customer_id = ?1
            "#,
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::LedgerStore;
    use uuid::Uuid;

    fn sample_customer() -> Customer {
        let now = Utc::now();
        Customer {
            id: Uuid::new_v4().to_string(),
            name: "Ada".to_string(),
            balance_cents: 0,
            credit_limit_cents: 100_000,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_adjust_balance_both_directions() {
        let store = LedgerStore::in_memory().await.unwrap();
        let customer = sample_customer();
        store.customers().insert(&customer).await.unwrap();

        let up = store
            .customers()
            .adjust_balance(&customer.id, 15_000)
            .await
            .unwrap();
        assert_eq!(up.balance_cents, 15_000);

        // No lower bound: balance may go negative (customer in credit)
        let down = store
            .customers()
            .adjust_balance(&customer.id, -20_000)
            .await
            .unwrap();
        assert_eq!(down.balance_cents, -5_000);
    }

    #[tokio::test]
    async fn test_payments_sum() {
        let store = LedgerStore::in_memory().await.unwrap();
        let customer = sample_customer();
        store.customers().insert(&customer).await.unwrap();

        for amount in [8_000, 2_500] {
            let payment = CustomerPayment {
                id: Uuid::new_v4().to_string(),
                customer_id: customer.id.clone(),
                amount_cents: amount,
                note: None,
                paid_at: Utc::now(),
            };
            store.customers().add_payment(&payment).await.unwrap();
        }

        let total = store.customers().sum_payments(&customer.id).await.unwrap();
        assert_eq!(total, 10_500);

        // Unknown customer sums to zero, not an error
        let none = store.customers().sum_payments("missing").await.unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_set_balance() {
        let store = LedgerStore::in_memory().await.unwrap();
        let customer = sample_customer();
        store.customers().insert(&customer).await.unwrap();

        let updated = store
            .customers()
            .set_balance(&customer.id, 12_345)
            .await
            .unwrap();
        assert_eq!(updated.balance_cents, 12_345);
    }
}
